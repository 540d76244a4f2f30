//! Portable storage errors / 可移植的存储错误
//!
//! Drivers translate their provider-specific failures into these variants so
//! callers can match on a small taxonomy without knowing the backend.

use thiserror::Error;

/// Boxed original cause / 原始错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The configured bucket does not exist / 存储桶不存在
    #[error("bucket not found: {bucket} (path: {path})")]
    BucketNotFound {
        bucket: String,
        path: String,
        #[source]
        source: BoxError,
    },

    /// The requested object does not exist / 对象不存在
    #[error("object not found: {path}")]
    ObjectNotFound {
        path: String,
        #[source]
        source: BoxError,
    },

    /// Access to the object is denied / 无权访问
    #[error("permission denied: {path}")]
    PermissionDenied {
        path: String,
        #[source]
        source: BoxError,
    },

    /// Anything else, tagged with the provider's error name / 其他错误
    #[error("unknown error {name}: {path}")]
    Unknown {
        name: String,
        path: String,
        #[source]
        source: BoxError,
    },
}

impl StorageError {
    /// Location the failed operation was working on / 出错的路径
    pub fn path(&self) -> &str {
        match self {
            StorageError::BucketNotFound { path, .. }
            | StorageError::ObjectNotFound { path, .. }
            | StorageError::PermissionDenied { path, .. }
            | StorageError::Unknown { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::ObjectNotFound { .. })
    }

    /// Wrap into an io::Error for byte streams / 包装为 io::Error 供字节流使用
    ///
    /// The original `StorageError` stays reachable through `get_ref()`.
    pub fn into_io(self) -> std::io::Error {
        let kind = match &self {
            StorageError::ObjectNotFound { .. } | StorageError::BucketNotFound { .. } => {
                std::io::ErrorKind::NotFound
            }
            StorageError::PermissionDenied { .. } => std::io::ErrorKind::PermissionDenied,
            StorageError::Unknown { .. } => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, self)
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
