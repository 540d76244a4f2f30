//! Application configuration module / 应用配置模块
//!
//! Loads the disk table from config.json.
//! Creates default config file on first run / 首次运行时创建默认配置文件

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file path / 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "BUCKET_DRIVE_CONFIG";

/// Application configuration / 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Disks to mount / 需要挂载的磁盘
    #[serde(default)]
    pub disks: Vec<DiskConfig>,
    /// Disk used when none is named / 默认磁盘
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_disk: Option<String>,
}

/// One disk entry / 磁盘配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    pub name: String,
    pub driver_type: String,
    /// Driver-specific config, handed to the factory as is / 驱动配置
    #[serde(default)]
    pub config: Value,
}

impl AppConfig {
    /// Look up a disk entry by name / 按名称查找磁盘
    pub fn disk(&self, name: &str) -> Option<&DiskConfig> {
        self.disks.iter().find(|d| d.name == name)
    }

    /// Name of the default disk, falling back to the first one / 默认磁盘名
    pub fn default_disk_name(&self) -> Option<&str> {
        self.default_disk
            .as_deref()
            .or_else(|| self.disks.first().map(|d| d.name.as_str()))
    }
}

/// Get the config file path / 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config(config_path: &Path) -> Result<AppConfig> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: AppConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config(config_path, &config)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config(config_path: &Path, config: &AppConfig) -> Result<()> {
    let content = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config(&path).unwrap();
        assert!(config.disks.is_empty());
        assert!(path.exists());

        // Second load reads the file just written
        let again = load_config(&path).unwrap();
        assert!(again.default_disk.is_none());
    }

    #[test]
    fn test_load_disks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "disks": [
                    {
                        "name": "media",
                        "driver_type": "supabase",
                        "config": { "url": "https://xyz.supabase.co", "key": "k", "bucket": "media" }
                    },
                    { "name": "archive", "driver_type": "supabase" }
                ],
                "default_disk": "archive"
            }"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.disks.len(), 2);
        assert_eq!(config.disk("media").unwrap().config["bucket"], "media");
        assert!(config.disk("archive").unwrap().config.is_null());
        assert_eq!(config.default_disk_name(), Some("archive"));
    }

    #[test]
    fn test_default_disk_falls_back_to_first() {
        let config = AppConfig {
            disks: vec![DiskConfig {
                name: "first".to_string(),
                driver_type: "supabase".to_string(),
                config: Value::Null,
            }],
            default_disk: None,
        };
        assert_eq!(config.default_disk_name(), Some("first"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
