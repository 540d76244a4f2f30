//! Provider error translation / 错误转换

use crate::storage::StorageError;
use super::api::ProviderError;

const BUCKET_MISSING: &[&str] = &["NoSuchBucket", "Bucket not found"];
const KEY_MISSING: &[&str] = &["NoSuchKey", "not_found", "Not found"];
const ACCESS_REVOKED: &[&str] = &["AllAccessDisabled", "AccessDenied"];

/// Map a provider error to the portable taxonomy / 转换为可移植错误
pub fn translate(error: ProviderError, path: &str, bucket: &str) -> StorageError {
    let name = error.name.as_str();
    if BUCKET_MISSING.contains(&name) {
        StorageError::BucketNotFound {
            bucket: bucket.to_string(),
            path: path.to_string(),
            source: Box::new(error),
        }
    } else if KEY_MISSING.contains(&name) {
        StorageError::ObjectNotFound {
            path: path.to_string(),
            source: Box::new(error),
        }
    } else if ACCESS_REVOKED.contains(&name) {
        StorageError::PermissionDenied {
            path: path.to_string(),
            source: Box::new(error),
        }
    } else {
        StorageError::Unknown {
            name: error.name.clone(),
            path: path.to_string(),
            source: Box::new(error),
        }
    }
}

/// Whether the error means "this key does not exist" / 是否为对象不存在
///
/// A bare 404 counts unless the name says the bucket is missing.
pub fn is_object_missing(error: &ProviderError) -> bool {
    let name = error.name.as_str();
    if BUCKET_MISSING.contains(&name) {
        return false;
    }
    KEY_MISSING.contains(&name) || error.status == Some(404)
}
