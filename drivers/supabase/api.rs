//! Bucket API capability / 存储桶 API 能力
//!
//! The driver only talks to the bucket service through this trait, so the
//! HTTP client can be swapped for an in-memory fake in tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde_json::{json, Value};
use thiserror::Error;

/// Error reported by the bucket service / 存储服务返回的错误
#[derive(Debug, Clone, Error)]
#[error("{name}: {message}")]
pub struct ProviderError {
    /// Symbolic error name, e.g. `NoSuchKey` / 错误名称
    pub name: String,
    /// HTTP status when known / HTTP 状态码
    pub status: Option<u16>,
    pub message: String,
}

impl ProviderError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Raw payload form, attached to results that swallow the error / 原始形式
    pub fn to_raw(&self) -> Value {
        json!({
            "error": self.name,
            "statusCode": self.status,
            "message": self.message,
        })
    }
}

pub type ApiResult<T> = std::result::Result<T, ProviderError>;

/// Object body as it arrives from the service / 对象内容字节流
pub type ByteChunks = BoxStream<'static, ApiResult<Bytes>>;

/// Downloaded object / 下载的对象
#[derive(Debug, Clone)]
pub struct Download {
    pub body: Bytes,
    pub content_type: Option<String>,
}

impl Download {
    pub fn raw(&self) -> Value {
        json!({
            "size": self.body.len(),
            "contentType": self.content_type,
        })
    }
}

/// Object metadata / 对象元数据
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    pub size: u64,
    /// None when the service does not report it / 服务未返回时为 None
    pub modified: Option<DateTime<Utc>>,
    pub raw: Value,
}

/// One page of a listing call / 一页列表结果
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    /// Native entries, each with at least a `name` field / 原始条目
    pub objects: Vec<Value>,
    /// Continuation token for the next page / 下一页的续传令牌
    pub next: Option<String>,
}

/// The bucket service as the driver sees it.
///
/// There is no rename primitive here: `Storage::move_item` is built from
/// `copy_object` followed by `remove`, and is therefore not atomic.
#[async_trait]
pub trait BucketApi: Send + Sync {
    /// Server-side copy, the source is left in place / 服务端复制
    async fn copy_object(&self, src_key: &str, dest_key: &str) -> ApiResult<Value>;

    /// Remove objects / 删除对象
    async fn remove(&self, keys: &[String]) -> ApiResult<Value>;

    /// Download a whole object / 下载完整对象
    async fn download(&self, key: &str) -> ApiResult<Download>;

    /// Download an object as a chunk stream / 流式下载对象
    ///
    /// Errors before the first byte (missing key, missing bucket) come back
    /// as `Err`; later transport errors come through the stream.
    async fn download_stream(&self, key: &str) -> ApiResult<ByteChunks>;

    /// Object metadata without fetching the body / 对象元数据
    async fn stat(&self, key: &str) -> ApiResult<ObjectMeta>;

    /// Time-limited URL, returned with its native payload / 签名链接
    async fn create_signed_url(&self, key: &str, ttl_secs: u64) -> ApiResult<(String, Value)>;

    /// Public URL, derived without I/O / 公开链接
    fn public_url(&self, key: &str) -> ApiResult<String>;

    /// Create or overwrite an object / 上传对象
    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> ApiResult<Value>;

    /// One folder level under a prefix, one page at a time / 列出前缀下的一页条目
    ///
    /// Folders come back as entries whose `id` is null.
    async fn list(&self, prefix: &str, continuation: Option<String>) -> ApiResult<ListPage>;
}
