//! Supabase Storage HTTP client / Supabase 存储 HTTP 客户端
//!
//! Speaks the `/storage/v1/object` REST API with reqwest. Building the client
//! performs no network I/O.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use serde_json::{json, Value};

use super::api::{ApiResult, BucketApi, ByteChunks, Download, ListPage, ObjectMeta, ProviderError};

const LIST_PAGE_SIZE: usize = 100;
const UPLOAD_CACHE_CONTROL: &str = "max-age=3600";

/// Supabase Storage client bound to one bucket / 绑定单个存储桶的客户端
pub struct SupabaseClient {
    client: Client,
    /// `{project_url}/storage/v1`
    base: String,
    key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "statusCode", default)]
    status_code: Option<Value>,
}

/// `GET /object/info` payload; older servers only fill `metadata` / 对象信息
#[derive(Debug, Default, Deserialize)]
struct ObjectInfo {
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SignedUrlBody {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseClient {
    pub fn new(url: &str, key: &str, bucket: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .pool_max_idle_per_host(4)
            .build()
            .context("创建HTTP客户端失败")?;

        Ok(Self {
            client,
            base: format!("{}/storage/v1", url.trim_end_matches('/')),
            key: key.to_string(),
            bucket: bucket.to_string(),
        })
    }

    /// Build `{base}/object/{scope}/{bucket}/{key}`, empty scope allowed / 构建对象URL
    fn object_url(&self, scope: &str, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if scope.is_empty() {
            format!("{}/object/{}/{}", self.base, self.bucket, encoded)
        } else {
            format!("{}/object/{}/{}/{}", self.base, scope, self.bucket, encoded)
        }
    }

    fn auth(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(header::AUTHORIZATION, format!("Bearer {}", self.key))
            .header("apikey", &self.key)
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self.auth(request).send().await.map_err(fetch_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(parse_error(status.as_u16(), &body))
    }

    async fn send_json(&self, request: RequestBuilder) -> ApiResult<Value> {
        self.send(request)
            .await?
            .json::<Value>()
            .await
            .map_err(fetch_error)
    }
}

fn fetch_error(e: reqwest::Error) -> ProviderError {
    let err = ProviderError::new("FetchError", e.to_string());
    match e.status() {
        Some(status) => err.with_status(status.as_u16()),
        None => err,
    }
}

/// Turn an error response into a ProviderError / 解析错误响应
///
/// The service answers most failures with HTTP 400 and the real status in
/// the body's `statusCode`, which wins. Bodiless responses fall back to a
/// name derived from the HTTP status.
fn parse_error(status: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    let status = parsed
        .as_ref()
        .and_then(|b| b.status_code.as_ref())
        .and_then(|v| match v {
            Value::String(s) => s.parse::<u16>().ok(),
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        })
        .unwrap_or(status);

    let (name, message) = match parsed {
        Some(ErrorBody { error: Some(error), message, .. }) => (error, message.unwrap_or_default()),
        Some(ErrorBody { message, .. }) => (status_name(status), message.unwrap_or_default()),
        None => (status_name(status), body.to_string()),
    };

    ProviderError::new(name, message).with_status(status)
}

fn status_name(status: u16) -> String {
    match status {
        404 => "NoSuchKey".to_string(),
        403 => "AccessDenied".to_string(),
        _ => format!("HttpError{}", status),
    }
}

/// Next page token: the next offset, only after a full page / 下一页令牌
fn next_token(offset: usize, returned: usize) -> Option<String> {
    if returned >= LIST_PAGE_SIZE {
        Some((offset + returned).to_string())
    } else {
        None
    }
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_rfc2822(value))
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Build metadata from an object info payload / 从对象信息构建元数据
fn object_meta(raw: Value) -> ApiResult<ObjectMeta> {
    let info: ObjectInfo = serde_json::from_value(raw.clone())
        .map_err(|e| ProviderError::new("InvalidResponse", e.to_string()))?;

    let size = info
        .size
        .or_else(|| {
            info.metadata
                .as_ref()
                .and_then(|m| m.get("size"))
                .and_then(Value::as_u64)
        })
        .unwrap_or(0);
    let modified = info
        .last_modified
        .as_deref()
        .or(info.updated_at.as_deref())
        .and_then(parse_time);

    Ok(ObjectMeta { size, modified, raw })
}

fn header_str<'a>(response: &'a Response, name: header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl BucketApi for SupabaseClient {
    async fn copy_object(&self, src_key: &str, dest_key: &str) -> ApiResult<Value> {
        tracing::debug!("Supabase copy: bucket={}, src={}, dest={}", self.bucket, src_key, dest_key);
        let request = self.client
            .post(format!("{}/object/copy", self.base))
            .json(&json!({
                "bucketId": self.bucket,
                "sourceKey": src_key,
                "destinationKey": dest_key,
            }));
        self.send_json(request).await
    }

    async fn remove(&self, keys: &[String]) -> ApiResult<Value> {
        tracing::debug!("Supabase remove: bucket={}, keys={:?}", self.bucket, keys);
        let request = self.client
            .delete(format!("{}/object/{}", self.base, self.bucket))
            .json(&json!({ "prefixes": keys }));
        self.send_json(request).await
    }

    async fn download(&self, key: &str) -> ApiResult<Download> {
        tracing::debug!("Supabase download: bucket={}, key={}", self.bucket, key);
        let response = self.send(self.client.get(self.object_url("", key))).await?;
        let content_type = header_str(&response, header::CONTENT_TYPE).map(str::to_string);
        let body = response.bytes().await.map_err(fetch_error)?;
        Ok(Download { body, content_type })
    }

    async fn download_stream(&self, key: &str) -> ApiResult<ByteChunks> {
        tracing::debug!("Supabase download stream: bucket={}, key={}", self.bucket, key);
        let response = self.send(self.client.get(self.object_url("", key))).await?;
        Ok(response.bytes_stream().map_err(fetch_error).boxed())
    }

    async fn stat(&self, key: &str) -> ApiResult<ObjectMeta> {
        tracing::debug!("Supabase info: bucket={}, key={}", self.bucket, key);
        let raw = self.send_json(self.client.get(self.object_url("info", key))).await?;
        object_meta(raw)
    }

    async fn create_signed_url(&self, key: &str, ttl_secs: u64) -> ApiResult<(String, Value)> {
        tracing::debug!("Supabase sign: bucket={}, key={}, ttl={}", self.bucket, key, ttl_secs);
        let request = self.client
            .post(self.object_url("sign", key))
            .json(&json!({ "expiresIn": ttl_secs }));
        let raw = self.send_json(request).await?;
        let body: SignedUrlBody = serde_json::from_value(raw.clone())
            .map_err(|e| ProviderError::new("InvalidResponse", e.to_string()))?;
        Ok((format!("{}{}", self.base, body.signed_url), raw))
    }

    fn public_url(&self, key: &str) -> ApiResult<String> {
        if key.is_empty() {
            return Err(ProviderError::new("InvalidKey", "public URL needs an object key"));
        }
        Ok(self.object_url("public", key))
    }

    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> ApiResult<Value> {
        tracing::debug!("Supabase upload: bucket={}, key={}, size={}", self.bucket, key, body.len());
        let request = self.client
            .post(self.object_url("", key))
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, UPLOAD_CACHE_CONTROL)
            .header("x-upsert", "true")
            .body(body);
        self.send_json(request).await
    }

    async fn list(&self, prefix: &str, continuation: Option<String>) -> ApiResult<ListPage> {
        let offset = match continuation {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| ProviderError::new("InvalidContinuationToken", token.clone()))?,
            None => 0,
        };
        tracing::debug!("Supabase list: bucket={}, prefix={}, offset={}", self.bucket, prefix, offset);

        let request = self.client
            .post(format!("{}/object/list/{}", self.base, self.bucket))
            .json(&json!({
                "prefix": prefix,
                "limit": LIST_PAGE_SIZE,
                "offset": offset,
                "sortBy": { "column": "name", "order": "asc" },
            }));
        let objects = match self.send_json(request).await? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(ProviderError::new(
                    "InvalidResponse",
                    format!("expected a JSON array, got {}", other),
                ))
            }
        };

        let next = next_token(offset, objects.len());
        Ok(ListPage { objects, next })
    }
}
