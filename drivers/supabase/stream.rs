//! Stream bridge / 流桥接
//!
//! The reader is returned before the download starts. A background task opens
//! the object's chunk stream and forwards it through a channel of capacity
//! one, so errors reach the caller as read errors on that same reader and a
//! dropped reader stops the download.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::io::StreamReader;

use crate::storage::{ByteRange, ByteReader};
use super::api::{BucketApi, ByteChunks};
use super::error::translate;

const BRIDGE_CAPACITY: usize = 1;

/// Open a reader for `key` without waiting for any I/O / 立即返回读取器
///
/// Must be called from within a Tokio runtime.
pub fn open_stream(
    api: Arc<dyn BucketApi>,
    bucket: String,
    key: String,
    range: Option<ByteRange>,
) -> ByteReader {
    spawn_bridge(api, bucket, key, range).0
}

fn spawn_bridge(
    api: Arc<dyn BucketApi>,
    bucket: String,
    key: String,
    range: Option<ByteRange>,
) -> (ByteReader, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<std::io::Result<Bytes>>(BRIDGE_CAPACITY);

    let handle = tokio::spawn(async move {
        tracing::debug!("Stream bridge download: bucket={}, key={}", bucket, key);
        let chunks = match api.download_stream(&key).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::debug!("Stream bridge download failed: key={}, error={}", key, e);
                // The reader may already be gone; nobody left to tell
                let _ = tx.send(Err(translate(e, &key, &bucket).into_io())).await;
                return;
            }
        };
        pipe(chunks, range, &tx, &key, &bucket).await;
    });

    (Box::new(StreamReader::new(ReceiverStream::new(rx))), handle)
}

/// Part of a chunk starting at `start` that falls inside the range / 截取分块中落在范围内的部分
fn clip_chunk(chunk: Bytes, start: u64, range: Option<&ByteRange>) -> Bytes {
    let r = match range {
        None => return chunk,
        Some(r) => r,
    };
    let end = start + chunk.len() as u64;
    let from = r.start.max(start).min(end);
    let to = r.end.min(end).max(from);
    chunk.slice((from - start) as usize..(to - start) as usize)
}

/// Forward chunks until the body, the range or the reader ends / 转发分块
async fn pipe(
    mut chunks: ByteChunks,
    range: Option<ByteRange>,
    tx: &mpsc::Sender<std::io::Result<Bytes>>,
    key: &str,
    bucket: &str,
) {
    let mut position = 0u64;
    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(translate(e, key, bucket).into_io())).await;
                return;
            }
        };

        let start = position;
        position += chunk.len() as u64;
        let piece = clip_chunk(chunk, start, range.as_ref());
        if !piece.is_empty() && tx.send(Ok(piece)).await.is_err() {
            tracing::debug!("Stream bridge reader dropped at offset {}", start);
            return;
        }
        if range.as_ref().map_or(false, |r| position >= r.end) {
            return;
        }
    }
}
