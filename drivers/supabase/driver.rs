//! Supabase驱动核心实现
//!
//! Every location is resolved against `root_path` before it reaches the
//! bucket API, and every provider failure is translated before it leaves.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;

use crate::storage::{
    ByteRange, ByteReader, ContentResponse, DeleteResponse, ExistsResponse, FileListResponse,
    FileListStream, PutContent, Response, SignedUrlOptions, SignedUrlResponse, StatResponse,
    Storage, StorageError, StorageResult,
};
use crate::utils::{clean_key, join_key};
use super::api::{BucketApi, ProviderError};
use super::client::SupabaseClient;
use super::config::{AccessControl, SupabaseConfig};
use super::error::{is_object_missing, translate};
use super::stream::open_stream;

/// Default signed URL lifetime / 默认签名链接有效期
const SIGNED_URL_TTL_SECS: u64 = 900;

/// Supabase驱动
pub struct SupabaseDriver {
    config: SupabaseConfig,
    api: Arc<dyn BucketApi>,
}

impl SupabaseDriver {
    /// 创建新的驱动实例（不发起网络请求）
    pub fn new(config: SupabaseConfig) -> Result<Self> {
        let client = SupabaseClient::new(&config.url, &config.key, &config.bucket)?;
        Ok(Self::with_api(config, Arc::new(client)))
    }

    /// Build a driver on top of any bucket API / 使用指定的存储桶 API
    pub fn with_api(config: SupabaseConfig, api: Arc<dyn BucketApi>) -> Self {
        Self { config, api }
    }

    /// 获取完整的对象键
    pub fn full_path(&self, relative: &str) -> String {
        join_key(&self.config.root_path, relative)
    }

    fn translate(&self, error: ProviderError, key: &str) -> StorageError {
        translate(error, key, &self.config.bucket)
    }

    async fn copy_key(&self, src_key: &str, dest_key: &str) -> StorageResult<Response> {
        let raw = self.api
            .copy_object(src_key, dest_key)
            .await
            .map_err(|e| self.translate(e, src_key))?;
        Ok(Response { raw })
    }

    async fn delete_key(&self, key: &str) -> StorageResult<DeleteResponse> {
        let raw = self.api
            .remove(&[key.to_string()])
            .await
            .map_err(|e| self.translate(e, key))?;
        Ok(DeleteResponse { raw, was_deleted: None })
    }
}

fn local_error(name: &str, path: &str, message: String) -> StorageError {
    StorageError::Unknown {
        name: name.to_string(),
        path: path.to_string(),
        source: message.into(),
    }
}

#[async_trait]
impl Storage for SupabaseDriver {
    fn name(&self) -> &str {
        "Supabase"
    }

    async fn copy(&self, src: &str, dest: &str) -> StorageResult<Response> {
        let src_key = self.full_path(src);
        let dest_key = self.full_path(dest);
        self.copy_key(&src_key, &dest_key).await
    }

    async fn delete(&self, location: &str) -> StorageResult<DeleteResponse> {
        let key = self.full_path(location);
        self.delete_key(&key).await
    }

    async fn exists(&self, location: &str) -> StorageResult<ExistsResponse> {
        let key = self.full_path(location);
        match self.api.stat(&key).await {
            Ok(meta) => Ok(ExistsResponse { exists: true, raw: meta.raw }),
            Err(e) if is_object_missing(&e) => Ok(ExistsResponse { exists: false, raw: e.to_raw() }),
            Err(e) => Err(self.translate(e, &key)),
        }
    }

    async fn get(&self, location: &str, encoding: &str) -> StorageResult<ContentResponse<String>> {
        let encoder = encoding_rs::Encoding::for_label(encoding.as_bytes()).ok_or_else(|| {
            local_error(
                "UnsupportedEncoding",
                &self.full_path(location),
                format!("unknown text encoding: {}", encoding),
            )
        })?;

        let ContentResponse { content, raw } = self.get_buffer(location).await?;
        // The caller's encoding is authoritative; a BOM is just more bytes
        let (text, _) = encoder.decode_without_bom_handling(&content);
        Ok(ContentResponse { content: text.into_owned(), raw })
    }

    async fn get_buffer(&self, location: &str) -> StorageResult<ContentResponse<Bytes>> {
        let key = self.full_path(location);
        let download = self.api
            .download(&key)
            .await
            .map_err(|e| self.translate(e, &key))?;
        let raw = download.raw();
        Ok(ContentResponse { content: download.body, raw })
    }

    async fn get_signed_url(
        &self,
        location: &str,
        options: SignedUrlOptions,
    ) -> StorageResult<SignedUrlResponse> {
        let key = self.full_path(location);
        let ttl = options.expires_in.unwrap_or(SIGNED_URL_TTL_SECS);
        let (signed_url, raw) = self.api
            .create_signed_url(&key, ttl)
            .await
            .map_err(|e| self.translate(e, &key))?;
        Ok(SignedUrlResponse { signed_url, raw })
    }

    async fn get_stat(&self, location: &str) -> StorageResult<StatResponse> {
        let key = self.full_path(location);
        let meta = self.api
            .stat(&key)
            .await
            .map_err(|e| self.translate(e, &key))?;
        Ok(StatResponse {
            size: meta.size,
            modified: meta.modified.unwrap_or_else(Utc::now),
            raw: meta.raw,
        })
    }

    fn get_stream(&self, location: &str, range: Option<ByteRange>) -> ByteReader {
        open_stream(
            self.api.clone(),
            self.config.bucket.clone(),
            self.full_path(location),
            range,
        )
    }

    fn get_url(&self, location: &str) -> StorageResult<String> {
        let key = self.full_path(location);
        if self.config.access_control() == AccessControl::Private {
            return Err(StorageError::PermissionDenied {
                path: key,
                source: "disk is private, use a signed URL".into(),
            });
        }
        self.api.public_url(&key).map_err(|e| self.translate(e, &key))
    }

    async fn move_item(&self, src: &str, dest: &str) -> StorageResult<Response> {
        let src_key = self.full_path(src);
        let dest_key = self.full_path(dest);
        tracing::debug!("Supabase移动: src_key={}, dest_key={}", src_key, dest_key);

        self.copy_key(&src_key, &dest_key).await?;

        // Not atomic: a failed delete leaves the object at both keys
        if let Err(e) = self.delete_key(&src_key).await {
            tracing::warn!(
                "Supabase move left a duplicate: copied {} to {} but delete failed: {}",
                src_key, dest_key, e
            );
            return Err(e);
        }

        Ok(Response { raw: Value::Null })
    }

    async fn put(&self, location: &str, content: PutContent) -> StorageResult<Response> {
        let key = self.full_path(location);
        let body = content
            .into_bytes()
            .await
            .map_err(|e| local_error("ReadError", &key, e.to_string()))?;
        let content_type = mime_guess::from_path(&key).first_or_octet_stream();

        let raw = self.api
            .upload(&key, body, content_type.as_ref())
            .await
            .map_err(|e| self.translate(e, &key))?;
        Ok(Response { raw })
    }

    fn flat_list(&self, prefix: Option<&str>) -> FileListStream {
        let api = self.api.clone();
        let bucket = self.config.bucket.clone();
        let root = self.config.root_path.clone();

        // Folders still to walk, each with its next page token / 待遍历的目录及续传令牌
        let pending = VecDeque::from([(clean_key(prefix.unwrap_or("")), None::<String>)]);

        stream::try_unfold(pending, move |mut pending| {
            let api = api.clone();
            let bucket = bucket.clone();
            let root = root.clone();
            async move {
                let (dir, token) = match pending.pop_front() {
                    Some(next) => next,
                    None => return Ok(None),
                };
                let key_prefix = join_key(&root, &dir);
                let page = match api.list(&key_prefix, token).await {
                    Ok(page) => page,
                    Err(e) => return Err(translate(e, &key_prefix, &bucket)),
                };
                if let Some(next) = page.next {
                    pending.push_front((dir.clone(), Some(next)));
                }

                let mut files = Vec::new();
                for raw in page.objects {
                    let name = raw.get("name").and_then(Value::as_str).unwrap_or_default();
                    if name.is_empty() {
                        continue;
                    }
                    let path = join_key(&dir, name);
                    if matches!(raw.get("id"), Some(Value::Null)) {
                        pending.push_back((path, None));
                    } else {
                        files.push(FileListResponse { raw, path });
                    }
                }
                Ok(Some((files, pending)))
            }
        })
        .map_ok(|files| stream::iter(files.into_iter().map(Ok::<FileListResponse, StorageError>)))
        .try_flatten()
        .boxed()
    }
}
