//! Supabase Storage 驱动
//!
//! Adapts a Supabase bucket to the generic `Storage` interface.

pub mod api;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod stream;
#[cfg(test)]
pub mod testing;

pub use api::{BucketApi, ProviderError};
pub use config::{AccessControl, SupabaseConfig};
pub use driver::SupabaseDriver;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::storage::{ConfigItem, DriverConfig, DriverFactory, Storage};

/// Supabase驱动工厂
pub struct SupabaseDriverFactory;

impl DriverFactory for SupabaseDriverFactory {
    fn driver_type(&self) -> &'static str {
        "supabase"
    }

    fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            name: "Supabase".to_string(),
            public_urls: true,
            signed_urls: true,
            default_root: Some("".to_string()),
        }
    }

    fn additional_items(&self) -> Vec<ConfigItem> {
        vec![
            ConfigItem::new("url", "string")
                .title("项目地址")
                .help("Supabase project URL, e.g. https://xyz.supabase.co")
                .required(),
            ConfigItem::new("key", "password")
                .title("密钥")
                .help("Service role or anon key")
                .required(),
            ConfigItem::new("bucket", "string")
                .title("存储桶名称")
                .required(),
            ConfigItem::new("access_control", "select")
                .title("访问权限")
                .options("public,private")
                .default("public")
                .help("Private disks only hand out signed URLs"),
        ]
    }

    fn create_driver(&self, config: Value) -> Result<Box<dyn Storage>> {
        let config: SupabaseConfig = serde_json::from_value(config)
            .map_err(|e| anyhow!("配置解析失败: {}", e))?;
        Ok(Box::new(SupabaseDriver::new(config)?))
    }
}
