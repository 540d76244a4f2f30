//! Supabase driver configuration / Supabase 驱动配置

use serde::{Deserialize, Serialize};

/// Default access for objects on a disk / 磁盘对象的默认访问权限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessControl {
    /// Objects are reachable through public URLs / 公开
    #[default]
    Public,
    /// Only signed URLs work / 私有，仅签名链接
    Private,
}

/// Supabase configuration / Supabase 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. https://xyz.supabase.co / 项目地址
    pub url: String,
    /// Service role or anon key / 密钥
    pub key: String,
    /// Bucket name / 存储桶名称
    pub bucket: String,
    /// Key prefix every operation is confined to / 根目录前缀
    #[serde(default)]
    pub root_path: String,
    #[serde(default)]
    pub access_control: Option<AccessControl>,
}

impl SupabaseConfig {
    pub fn access_control(&self) -> AccessControl {
        self.access_control.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_defaults() {
        let config: SupabaseConfig = serde_json::from_value(serde_json::json!({
            "url": "https://xyz.supabase.co",
            "key": "secret",
            "bucket": "media",
        }))
        .unwrap();
        assert_eq!(config.root_path, "");
        assert_eq!(config.access_control(), AccessControl::Public);
    }

    #[test]
    fn test_deserialize_private() {
        let config: SupabaseConfig = serde_json::from_value(serde_json::json!({
            "url": "https://xyz.supabase.co",
            "key": "secret",
            "bucket": "media",
            "root_path": "assets",
            "access_control": "private",
        }))
        .unwrap();
        assert_eq!(config.root_path, "assets");
        assert_eq!(config.access_control(), AccessControl::Private);
    }
}
