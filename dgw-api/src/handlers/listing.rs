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

//! Document metadata and repository enumeration.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::RequestContext;
use crate::server::{AppState, ListErrorPolicy};
use dgw_core::DocumentKey;

/// Metadata document returned by the `info` verb.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentInfoBody {
    doc_id: String,
    size: u64,
    last_modified: DateTime<Utc>,
    content_type: String,
    etag: String,
}

/// Returns a document's metadata as JSON.
pub async fn document_info(
    state: &AppState,
    ctx: &RequestContext,
    key: DocumentKey,
) -> Result<Response, ApiError> {
    let info = tokio::select! {
        _ = ctx.token.cancelled() => {
            return Err(ApiError::Cancelled("request cancelled"));
        }
        result = state.store.head_object(&key.repository, &key.doc_id) => {
            result.map_err(|err| ApiError::read_failure(err, "request cancelled"))?
        }
    };

    info!(
        request_id = %ctx.id,
        repository = %key.repository,
        doc_id = %key.doc_id,
        "INFO"
    );
    let body = DocumentInfoBody {
        doc_id: key.doc_id,
        size: info.size,
        last_modified: info.last_modified,
        content_type: info.content_type,
        etag: info.etag,
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Enumerates all document keys of a repository.
///
/// Cancellation always surfaces as 408. Other listing failures follow the
/// configured policy; the legacy default reports them as an empty result.
pub async fn list_documents(
    state: &AppState,
    ctx: &RequestContext,
    repository: &str,
) -> Result<Response, ApiError> {
    let result = tokio::select! {
        _ = ctx.token.cancelled() => {
            return Err(ApiError::Cancelled("request cancelled"));
        }
        result = state.store.list_objects(repository) => result,
    };

    match result {
        Ok(keys) => {
            info!(request_id = %ctx.id, %repository, count = keys.len(), "LIST");
            Ok((StatusCode::OK, Json(keys)).into_response())
        }
        Err(err) if err.is_cancelled() => Err(ApiError::Cancelled("request cancelled")),
        Err(err) => match state.list_error_policy {
            ListErrorPolicy::EmptyResult => {
                warn!(request_id = %ctx.id, %repository, error = %err, "list failed");
                Ok((StatusCode::OK, Json(Vec::<String>::new())).into_response())
            }
            ListErrorPolicy::Propagate => {
                Err(ApiError::Internal(format!("list failed: {err}")))
            }
        },
    }
}
