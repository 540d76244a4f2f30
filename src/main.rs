use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bucket_drive::config;
use bucket_drive::storage::StorageManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bucket_drive=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("bucket-drive {} (built {})", env!("CARGO_PKG_VERSION"), env!("BUILD_TIME"));

    // Load configuration / 加载配置
    let app_config = config::load_config(&config::get_config_path())?;

    let manager = StorageManager::new();

    // Register all storage driver factories / 注册所有存储驱动工厂
    bucket_drive::register_storage_drivers(&manager).await?;

    let failed = bucket_drive::mount_disks(&manager, &app_config).await;

    for name in manager.list_disks().await {
        match manager.get_disk_error(&name).await {
            Some(err) => tracing::warn!("Disk {}: unhealthy - {}", name, err),
            None => tracing::info!("Disk {}: ok", name),
        }
    }

    if let Some(name) = app_config.default_disk_name() {
        tracing::info!("Default disk: {}", name);
    }

    if !failed.is_empty() {
        anyhow::bail!("Disks failed to mount: {}", failed.join(", "));
    }
    tracing::info!("{} disks mounted", app_config.disks.len());
    Ok(())
}
