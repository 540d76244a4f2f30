use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use serde_json::Value;

use super::{Storage, DriverConfig, DriverInfo, ConfigItem, get_common_items};

pub type DiskBox = Arc<Box<dyn Storage>>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// Create a disk instance from its JSON config / 创建磁盘实例
    fn create_driver(&self, config: Value) -> Result<Box<dyn Storage>>;

    /// Return driver basic config / 返回驱动基本配置
    fn driver_config(&self) -> DriverConfig;

    /// Return driver specific config items / 返回驱动特有配置项
    fn additional_items(&self) -> Vec<ConfigItem>;

    /// Generate complete driver info (auto merge common + additional) / 生成完整的驱动信息
    fn driver_info(&self) -> DriverInfo {
        let config = self.driver_config();
        let common = get_common_items(&config);
        let additional = self.additional_items();
        DriverInfo { common, additional, config }
    }
}

/// Storage manager (named disks) / 存储管理器
#[derive(Clone, Default)]
pub struct StorageManager {
    disks: Arc<RwLock<HashMap<String, DiskBox>>>,
    factories: Arc<RwLock<HashMap<String, Arc<Box<dyn DriverFactory>>>>>,
    /// Disk error status (name -> error message) / 磁盘错误状态
    disk_errors: Arc<RwLock<HashMap<String, String>>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register driver factory / 注册驱动工厂
    pub async fn register_factory(&self, factory: Box<dyn DriverFactory>) -> Result<()> {
        let driver_type = factory.driver_type().to_string();
        let factory_box = Arc::new(factory);

        let mut factories = self.factories.write().await;
        factories.insert(driver_type.clone(), factory_box);

        tracing::info!("Driver factory registered: {}", driver_type);
        Ok(())
    }

    /// Create disk (verify on success, record error on failure) / 创建磁盘
    ///
    /// Verification pulls the first listing entry. A failed verification is
    /// recorded but the disk stays mounted.
    pub async fn create_disk(&self, name: String, driver_type: &str, config: Value) -> Result<String> {
        let factory = {
            let factories = self.factories.read().await;
            factories.get(driver_type)
                .cloned()
                .ok_or_else(|| anyhow!("Driver type not found: {}", driver_type))?
        };

        match factory.create_driver(config) {
            Ok(driver) => {
                let disk: DiskBox = Arc::new(driver);

                // Verify disk: try to read the root listing / 验证磁盘
                let validation_result = match disk.flat_list(None).next().await {
                    Some(Err(e)) => Err(e),
                    _ => Ok(()),
                };

                self.disks.write().await.insert(name.clone(), disk);

                match validation_result {
                    Ok(()) => {
                        self.disk_errors.write().await.remove(&name);
                        tracing::info!("Disk created and verified: {} ({})", name, driver_type);
                    }
                    Err(e) => {
                        let error_msg = e.to_string();
                        self.disk_errors.write().await.insert(name.clone(), error_msg.clone());
                        tracing::warn!("Disk created but verification failed: {} ({}) - {}", name, driver_type, error_msg);
                    }
                }

                Ok(name)
            }
            Err(e) => {
                let error_msg = e.to_string();
                self.disk_errors.write().await.insert(name.clone(), error_msg.clone());

                tracing::error!("Disk creation failed: {} ({}) - {}", name, driver_type, error_msg);
                Err(e)
            }
        }
    }

    /// Set disk error status / 设置磁盘错误状态
    pub async fn set_disk_error(&self, name: &str, error: String) {
        self.disk_errors.write().await.insert(name.to_string(), error);
    }

    /// Get disk error status / 获取磁盘错误状态
    pub async fn get_disk_error(&self, name: &str) -> Option<String> {
        self.disk_errors.read().await.get(name).cloned()
    }

    /// Get disk instance / 获取磁盘实例
    pub async fn get_disk(&self, name: &str) -> Option<DiskBox> {
        self.disks.read().await.get(name).cloned()
    }

    /// Remove disk instance / 移除磁盘实例
    pub async fn remove_disk(&self, name: &str) -> Result<()> {
        self.disks.write().await
            .remove(name)
            .ok_or_else(|| anyhow!("Disk not found: {}", name))?;
        self.disk_errors.write().await.remove(name);

        tracing::info!("Disk removed: {}", name);
        Ok(())
    }

    /// List all disks / 列出所有磁盘
    pub async fn list_disks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.disks.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// List all available driver types / 列出所有可用的驱动类型
    pub async fn list_driver_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.factories.read().await.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get driver info by type / 获取驱动信息
    pub async fn driver_info(&self, driver_type: &str) -> Option<DriverInfo> {
        self.factories.read().await.get(driver_type).map(|f| f.driver_info())
    }
}
