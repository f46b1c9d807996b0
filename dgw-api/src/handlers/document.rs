// Copyright 2026 DGW Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Document upload, download, and delete.
//!
//! Upload and download are fully streaming: bodies flow between client and
//! backend in bounded chunks, never materialized in memory. Every await on
//! these paths races the request's cancellation context.

use axum::body::Body;
use axum::extract::Multipart;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::lifecycle::cancel_aware_stream;
use crate::middleware::RequestContext;
use crate::server::AppState;
use dgw_core::{DocumentKey, DocumentTags, StorageError};

/// Upload chunk channel depth. Bounds the bytes buffered between the
/// client read side and the backend write side.
const UPLOAD_CHANNEL_DEPTH: usize = 16;

/// Streams a multipart upload into the backend.
///
/// The first file part of the body is stored; non-file parts are skipped.
/// The client read side and the backend write side run concurrently,
/// coupled through a bounded channel, so neither side buffers the document.
pub async fn create_document(
    state: &AppState,
    ctx: &RequestContext,
    key: DocumentKey,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.file_name().is_some() => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return Err(ApiError::FileRead("no file part found".to_string())),
            Err(err) => return Err(ApiError::FileRead(err.to_string())),
        }
    };

    let filename = match field.file_name() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => format!("doc-{}", Utc::now().timestamp()),
    };
    let tags = DocumentTags::for_upload(&key, &filename, Utc::now());

    let (tx, rx) = tokio::sync::mpsc::channel(UPLOAD_CHANNEL_DEPTH);
    let body = ReceiverStream::new(rx).boxed();

    // Pump multipart chunks into the channel while the backend consumes the
    // other end. Both sides must be driven together or the bounded channel
    // deadlocks.
    let feed = async move {
        let mut field = field;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    if tx.send(Ok(chunk)).await.is_err() {
                        // Backend side gave up; its error is reported below.
                        return Ok(());
                    }
                }
                Ok(None) => return Ok(()),
                Err(err) => {
                    let _ = tx
                        .send(Err(StorageError::Stream(err.to_string())))
                        .await;
                    return Err(ApiError::FileRead(err.to_string()));
                }
            }
        }
        // tx drops here, ending the backend-side stream.
    };

    let put = state
        .store
        .put_object(&key.repository, &key.doc_id, body, tags.as_map());

    let (put_result, feed_result) = tokio::select! {
        _ = ctx.token.cancelled() => {
            warn!(request_id = %ctx.id, doc_id = %key.doc_id, "CANCELLED upload");
            return Err(ApiError::Cancelled("upload cancelled"));
        }
        results = async { tokio::join!(put, feed) } => results,
    };

    feed_result?;
    put_result.map_err(|err| ApiError::write_failure(err, "upload cancelled", "upload failed"))?;

    info!(
        request_id = %ctx.id,
        repository = %key.repository,
        doc_id = %key.doc_id,
        filename = %filename,
        "UPLOADED"
    );
    Ok((StatusCode::OK, format!("OK {filename}")).into_response())
}

/// Streams a document back to the client.
///
/// Metadata is fetched first to recover the original filename for the
/// attachment disposition; the body then streams through a cancel-aware
/// wrapper so an in-progress download stops when the context fires.
pub async fn get_document(
    state: &AppState,
    ctx: &RequestContext,
    key: DocumentKey,
) -> Result<Response, ApiError> {
    let info = tokio::select! {
        _ = ctx.token.cancelled() => {
            return Err(ApiError::Cancelled("download cancelled"));
        }
        result = state.store.head_object(&key.repository, &key.doc_id) => {
            result.map_err(|err| ApiError::read_failure(err, "download cancelled"))?
        }
    };
    let filename = info.filename().unwrap_or(&key.doc_id).to_string();

    let (_, stream) = tokio::select! {
        _ = ctx.token.cancelled() => {
            return Err(ApiError::Cancelled("download cancelled"));
        }
        result = state.store.get_object(&key.repository, &key.doc_id) => {
            result.map_err(|err| ApiError::read_failure(err, "download cancelled"))?
        }
    };

    info!(
        request_id = %ctx.id,
        repository = %key.repository,
        doc_id = %key.doc_id,
        size = info.size,
        "SERVED"
    );

    let body = Body::from_stream(cancel_aware_stream(ctx.token.clone(), stream));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, info.content_type)
        .header(header::CONTENT_LENGTH, info.size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", quote_filename(&filename)),
        )
        .body(body)
        .map_err(|err| ApiError::Internal(err.to_string()))
}

// Stored filenames are arbitrary client input; backslashes and quotes must
// be escaped before going into a quoted-string header value.
fn quote_filename(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Deletes a document from the backend.
pub async fn delete_document(
    state: &AppState,
    ctx: &RequestContext,
    key: DocumentKey,
) -> Result<Response, ApiError> {
    tokio::select! {
        _ = ctx.token.cancelled() => {
            return Err(ApiError::Cancelled("delete cancelled"));
        }
        result = state.store.delete_object(&key.repository, &key.doc_id) => {
            result.map_err(|err| {
                ApiError::write_failure(err, "delete cancelled", "delete failed")
            })?;
        }
    }

    info!(
        request_id = %ctx.id,
        repository = %key.repository,
        doc_id = %key.doc_id,
        "DELETED"
    );
    Ok((StatusCode::OK, format!("DELETED {}", key.doc_id)).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_filename_passthrough() {
        assert_eq!(quote_filename("report.pdf"), "report.pdf");
    }

    #[test]
    fn test_quote_filename_escapes_quotes_and_backslashes() {
        assert_eq!(quote_filename("a\"b.txt"), "a\\\"b.txt");
        assert_eq!(quote_filename("a\\b.txt"), "a\\\\b.txt");
        assert_eq!(quote_filename("\"\\"), "\\\"\\\\");
    }
}
