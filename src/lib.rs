use std::time::Duration;

pub mod config;
pub mod utils;
pub mod storage;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

const MOUNT_ATTEMPTS: u32 = 3;
const MOUNT_TIMEOUT: Duration = Duration::from_secs(30);
const MOUNT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Register all storage drivers / 注册所有存储驱动
pub async fn register_storage_drivers(manager: &storage::StorageManager) -> anyhow::Result<()> {
    drivers::register_all(manager).await
}

/// Mount one disk, retrying on timeout (max 3 attempts, 30s each) / 挂载磁盘，超时重试
///
/// Config errors are not retried. A disk that mounts but fails
/// verification counts as mounted; its error stays on the manager.
pub async fn mount_disk(manager: &storage::StorageManager, disk: &config::DiskConfig) -> bool {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match tokio::time::timeout(
            MOUNT_TIMEOUT,
            manager.create_disk(disk.name.clone(), &disk.driver_type, disk.config.clone()),
        )
        .await
        {
            Ok(Ok(_)) => {
                if attempt > 1 {
                    tracing::info!("Disk {} mounted after {} attempts", disk.name, attempt);
                }
                return true;
            }
            Ok(Err(e)) => {
                tracing::error!("Disk {} mount failed: {}", disk.name, e);
                return false;
            }
            Err(_) => {
                if attempt < MOUNT_ATTEMPTS {
                    tracing::warn!("Disk {} mount timeout (attempt {}/{}), retrying in 5s...", disk.name, attempt, MOUNT_ATTEMPTS);
                    tokio::time::sleep(MOUNT_RETRY_DELAY).await;
                } else {
                    tracing::error!("Disk {} mount timeout after {} attempts", disk.name, MOUNT_ATTEMPTS);
                    manager.set_disk_error(&disk.name, format!("Mount timeout after {} attempts", MOUNT_ATTEMPTS)).await;
                    return false;
                }
            }
        }
    }
}

/// Mount every configured disk; returns the names that failed / 挂载所有磁盘，返回失败的名称
pub async fn mount_disks(manager: &storage::StorageManager, config: &config::AppConfig) -> Vec<String> {
    let mut failed = Vec::new();
    for disk in &config.disks {
        if !mount_disk(manager, disk).await {
            failed.push(disk.name.clone());
        }
    }
    failed
}
