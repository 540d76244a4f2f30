// Driver package / 驱动包
pub mod supabase;

use crate::storage::StorageManager;

/// Register all drivers to StorageManager / 注册所有驱动
pub async fn register_all(manager: &StorageManager) -> anyhow::Result<()> {
    // Register Supabase Storage driver / 注册Supabase存储驱动
    manager.register_factory(Box::new(supabase::SupabaseDriverFactory)).await?;
    Ok(())
}
