//! Test doubles / 测试替身
//!
//! `MemoryBucket` follows the service's wire conventions as `SupabaseClient`
//! decodes them: missing keys are `not_found` with status 404, a missing
//! bucket is `Bucket not found`, listings return one folder level with
//! folders as `id: null` entries. `http_stub` serves canned HTTP responses
//! to exercise the client itself.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::api::{ApiResult, BucketApi, ByteChunks, Download, ListPage, ObjectMeta, ProviderError};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Clone)]
struct StoredObject {
    body: Bytes,
    content_type: String,
    modified: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    failures: Mutex<HashMap<&'static str, ProviderError>>,
    calls: Mutex<Vec<String>>,
    bucket_missing: Mutex<bool>,
    page_size: Mutex<Option<usize>>,
    chunk_size: Mutex<Option<usize>>,
    chunks_served: Arc<AtomicUsize>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, body: impl Into<Bytes>) {
        self.store(key, body.into(), "application/octet-stream", Some(Utc::now()));
    }

    /// Insert an object whose metadata carries no timestamp / 无修改时间的对象
    pub fn insert_untimed(&self, key: &str, body: impl Into<Bytes>) {
        self.store(key, body.into(), "application/octet-stream", None);
    }

    fn store(&self, key: &str, body: Bytes, content_type: &str, modified: Option<DateTime<Utc>>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject { body, content_type: content_type.to_string(), modified },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|o| o.content_type.clone())
    }

    pub fn modified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.objects.lock().unwrap().get(key).and_then(|o| o.modified)
    }

    /// Make one operation fail with the given error / 让某个操作失败
    pub fn fail_on(&self, operation: &'static str, error: ProviderError) {
        self.failures.lock().unwrap().insert(operation, error);
    }

    pub fn set_bucket_missing(&self) {
        *self.bucket_missing.lock().unwrap() = true;
    }

    pub fn set_page_size(&self, size: usize) {
        *self.page_size.lock().unwrap() = Some(size);
    }

    /// Chunk size used by `download_stream` / 流式下载的分块大小
    pub fn set_chunk_size(&self, size: usize) {
        *self.chunk_size.lock().unwrap() = Some(size);
    }

    /// Chunks pulled from `download_stream` bodies so far / 已被拉取的分块数
    pub fn chunks_served(&self) -> usize {
        self.chunks_served.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn enter(&self, operation: &'static str, call: String) -> ApiResult<()> {
        self.calls.lock().unwrap().push(call);
        if *self.bucket_missing.lock().unwrap() {
            return Err(ProviderError::new("Bucket not found", "Bucket not found").with_status(404));
        }
        match self.failures.lock().unwrap().get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn object(&self, key: &str) -> ApiResult<StoredObject> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ProviderError::new("not_found", "Object not found").with_status(404))
    }
}

#[async_trait]
impl BucketApi for MemoryBucket {
    async fn copy_object(&self, src_key: &str, dest_key: &str) -> ApiResult<Value> {
        self.enter("copy", format!("copy {} -> {}", src_key, dest_key))?;
        let entry = self.object(src_key)?;
        self.objects.lock().unwrap().insert(dest_key.to_string(), entry);
        Ok(json!({ "Key": dest_key }))
    }

    async fn remove(&self, keys: &[String]) -> ApiResult<Value> {
        self.enter("remove", format!("remove {}", keys.join(",")))?;
        let mut objects = self.objects.lock().unwrap();
        let removed: Vec<Value> = keys
            .iter()
            .filter(|k| objects.remove(k.as_str()).is_some())
            .map(|k| json!({ "name": k }))
            .collect();
        Ok(Value::Array(removed))
    }

    async fn download(&self, key: &str) -> ApiResult<Download> {
        self.enter("download", format!("download {}", key))?;
        let object = self.object(key)?;
        Ok(Download { body: object.body, content_type: Some(object.content_type) })
    }

    async fn download_stream(&self, key: &str) -> ApiResult<ByteChunks> {
        self.enter("download", format!("download {}", key))?;
        let body = self.object(key)?.body;
        let size = self.chunk_size.lock().unwrap().unwrap_or(DEFAULT_CHUNK_SIZE);

        let chunks: Vec<Bytes> = (0..body.len())
            .step_by(size)
            .map(|start| body.slice(start..(start + size).min(body.len())))
            .collect();
        let served = self.chunks_served.clone();
        Ok(stream::iter(chunks)
            .map(move |chunk| {
                served.fetch_add(1, Ordering::SeqCst);
                Ok(chunk)
            })
            .boxed())
    }

    async fn stat(&self, key: &str) -> ApiResult<ObjectMeta> {
        self.enter("stat", format!("stat {}", key))?;
        let object = self.object(key)?;
        let size = object.body.len() as u64;
        Ok(ObjectMeta {
            size,
            modified: object.modified,
            raw: json!({
                "name": key,
                "size": size,
                "content_type": object.content_type,
                "last_modified": object.modified.map(|t| t.to_rfc3339()),
            }),
        })
    }

    async fn create_signed_url(&self, key: &str, ttl_secs: u64) -> ApiResult<(String, Value)> {
        self.enter("sign", format!("sign {}", key))?;
        self.object(key)?;
        let url = format!("https://fake.local/sign/{}?ttl={}", key, ttl_secs);
        Ok((url.clone(), json!({ "signedURL": url })))
    }

    fn public_url(&self, key: &str) -> ApiResult<String> {
        self.enter("public_url", format!("public_url {}", key))?;
        Ok(format!("https://fake.local/public/{}", key))
    }

    async fn upload(&self, key: &str, body: Bytes, content_type: &str) -> ApiResult<Value> {
        self.enter("upload", format!("upload {}", key))?;
        self.store(key, body, content_type, Some(Utc::now()));
        Ok(json!({ "Key": key }))
    }

    async fn list(&self, prefix: &str, continuation: Option<String>) -> ApiResult<ListPage> {
        self.enter("list", format!("list {}", prefix))?;
        let dir = if prefix.is_empty() { String::new() } else { format!("{}/", prefix) };

        // One level only: deeper keys collapse into their first folder
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        for (key, object) in self.objects.lock().unwrap().iter() {
            let rest = match key.strip_prefix(dir.as_str()) {
                Some(rest) if !rest.is_empty() => rest,
                _ => continue,
            };
            match rest.split_once('/') {
                Some((folder, _)) => {
                    entries
                        .entry(folder.to_string())
                        .or_insert_with(|| json!({ "name": folder, "id": null, "metadata": null }));
                }
                None => {
                    entries.insert(
                        rest.to_string(),
                        json!({ "name": rest, "id": key, "metadata": { "size": object.body.len() } }),
                    );
                }
            }
        }
        let entries: Vec<Value> = entries.into_values().collect();

        let offset = continuation.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
        let page_size = self.page_size.lock().unwrap().unwrap_or(usize::MAX);
        let page: Vec<Value> = entries.iter().skip(offset).take(page_size).cloned().collect();
        let end = offset + page.len();
        let next = if end < entries.len() { Some(end.to_string()) } else { None };

        Ok(ListPage { objects: page, next })
    }
}

/// Serve every request with the same response; returns the base URL / HTTP 桩服务
pub async fn http_stub(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_request(&mut socket).await;
                let response = format!(
                    "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Consume one request, headers and body / 读完整个请求
async fn read_request(socket: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}
