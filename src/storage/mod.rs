use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ops::Range;
use tokio::io::AsyncRead;

pub mod error;
pub mod manager;

pub use error::{BoxError, StorageError, StorageResult};
pub use manager::{DiskBox, DriverFactory, StorageManager};

/// Readable byte stream handed to callers / 返回给调用方的字节流
pub type ByteReader = Box<dyn AsyncRead + Unpin + Send>;

/// Lazy listing sequence / 惰性列表序列
pub type FileListStream = BoxStream<'static, StorageResult<FileListResponse>>;

/// Byte range for partial reads (end exclusive) / 读取范围（不含结尾）
pub type ByteRange = Range<u64>;

/// Configuration item definition / 配置项定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    pub name: String,
    /// Display title (friendly name) / 显示标题
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigItem {
    pub fn new(name: &str, item_type: &str) -> Self {
        Self {
            name: name.to_string(),
            title: None,
            item_type: item_type.to_string(),
            default: None,
            options: None,
            required: false,
            help: None,
        }
    }

    pub fn title(mut self, val: &str) -> Self {
        self.title = Some(val.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, val: &str) -> Self {
        self.default = Some(val.to_string());
        self
    }

    pub fn help(mut self, val: &str) -> Self {
        self.help = Some(val.to_string());
        self
    }

    pub fn options(mut self, val: &str) -> Self {
        self.options = Some(val.to_string());
        self
    }
}

/// Driver configuration information / 驱动配置信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    pub name: String,
    /// Driver can hand out public URLs / 支持公开链接
    #[serde(default)]
    pub public_urls: bool,
    /// Driver can sign temporary URLs / 支持签名链接
    #[serde(default)]
    pub signed_urls: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_root: Option<String>,
}

/// Complete driver information / 驱动完整信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Common configuration items (shared by all drivers) / 通用配置项
    pub common: Vec<ConfigItem>,
    /// Driver-specific configuration items / 驱动特有配置项
    pub additional: Vec<ConfigItem>,
    /// Basic driver configuration / 驱动基本配置
    pub config: DriverConfig,
}

/// Generate common configuration items / 生成通用配置项
pub fn get_common_items(config: &DriverConfig) -> Vec<ConfigItem> {
    let mut items = vec![
        ConfigItem::new("name", "string")
            .required()
            .help("Disk name, must be unique"),
        ConfigItem::new("remark", "text").help("Remark/Notes"),
    ];

    if let Some(root) = &config.default_root {
        items.push(
            ConfigItem::new("root_path", "string")
                .default(root)
                .help("Key prefix every operation is confined to"),
        );
    }

    items
}

/// Plain result carrying only the provider payload / 仅包含原始响应
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub raw: Value,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteResponse {
    pub raw: Value,
    /// None when the backend cannot tell / 后端无法判断时为 None
    pub was_deleted: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ExistsResponse {
    pub exists: bool,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct ContentResponse<T> {
    pub content: T,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct SignedUrlResponse {
    pub signed_url: String,
    pub raw: Value,
}

#[derive(Debug, Clone)]
pub struct StatResponse {
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub raw: Value,
}

/// One listing entry / 列表条目
#[derive(Debug, Clone)]
pub struct FileListResponse {
    pub raw: Value,
    /// Path relative to the disk root / 相对磁盘根目录的路径
    pub path: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignedUrlOptions {
    /// Lifetime in seconds; driver default when unset / 有效期（秒）
    pub expires_in: Option<u64>,
}

/// Content accepted by `put` / `put` 接受的内容
pub enum PutContent {
    Bytes(Bytes),
    Text(String),
    Reader(ByteReader),
}

impl From<Bytes> for PutContent {
    fn from(value: Bytes) -> Self {
        PutContent::Bytes(value)
    }
}

impl From<Vec<u8>> for PutContent {
    fn from(value: Vec<u8>) -> Self {
        PutContent::Bytes(Bytes::from(value))
    }
}

impl From<String> for PutContent {
    fn from(value: String) -> Self {
        PutContent::Text(value)
    }
}

impl From<&str> for PutContent {
    fn from(value: &str) -> Self {
        PutContent::Text(value.to_string())
    }
}

impl PutContent {
    /// Collect content into memory / 读入内存
    pub async fn into_bytes(self) -> std::io::Result<Bytes> {
        match self {
            PutContent::Bytes(b) => Ok(b),
            PutContent::Text(s) => Ok(Bytes::from(s)),
            PutContent::Reader(mut reader) => {
                use tokio::io::AsyncReadExt;
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// Generic storage interface / 通用存储接口
///
/// Every location argument is a path relative to the disk root.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// Copy an object, leaving the source in place / 复制对象
    async fn copy(&self, src: &str, dest: &str) -> StorageResult<Response>;

    /// Delete a single object / 删除对象
    async fn delete(&self, location: &str) -> StorageResult<DeleteResponse>;

    /// Check whether an object exists / 判断对象是否存在
    async fn exists(&self, location: &str) -> StorageResult<ExistsResponse>;

    /// Read an object as text / 以文本读取
    /// `encoding` is a WHATWG label such as `utf-8` or `gbk`.
    async fn get(&self, location: &str, encoding: &str) -> StorageResult<ContentResponse<String>>;

    /// Read an object fully into memory / 读取完整内容
    async fn get_buffer(&self, location: &str) -> StorageResult<ContentResponse<Bytes>>;

    /// Create a time-limited URL / 生成签名链接
    async fn get_signed_url(
        &self,
        location: &str,
        options: SignedUrlOptions,
    ) -> StorageResult<SignedUrlResponse>;

    /// Object size and modification time / 对象大小和修改时间
    async fn get_stat(&self, location: &str) -> StorageResult<StatResponse>;

    /// Open a byte stream; failures surface as read errors / 打开字节流
    fn get_stream(&self, location: &str, range: Option<ByteRange>) -> ByteReader;

    /// Public URL of an object / 公开链接
    fn get_url(&self, location: &str) -> StorageResult<String>;

    /// Move an object / 移动对象
    async fn move_item(&self, src: &str, dest: &str) -> StorageResult<Response>;

    /// Create or overwrite an object / 写入对象
    async fn put(&self, location: &str, content: PutContent) -> StorageResult<Response>;

    /// List every object under a prefix / 列出前缀下的所有对象
    fn flat_list(&self, prefix: Option<&str>) -> FileListStream;
}
