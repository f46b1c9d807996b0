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

//! Protocol error taxonomy and wire responses.
//!
//! Every error is translated into an HTTP outcome at the request boundary;
//! nothing propagates past it and nothing is retried. Response bodies are
//! the plain-text phrases legacy callers match on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use dgw_core::StorageError;

/// Errors surfaced to protocol clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The `contRep` query parameter is missing or empty.
    #[error("missing contRep")]
    MissingContRep,

    /// The `docId` query parameter is missing or empty.
    #[error("missing docId")]
    MissingDocId,

    /// No recognized verb flag in the query string.
    #[error("unknown action")]
    UnknownAction,

    /// The multipart payload is malformed or carries no file part.
    #[error("file read error: {0}")]
    FileRead(String),

    /// The backend reports object absence (or an unclassified read failure,
    /// which the legacy contract also reports as not-found).
    #[error("not found: {0}")]
    NotFound(String),

    /// The request's execution context was cancelled mid-operation. The
    /// message names the operation ("upload cancelled", "request
    /// cancelled", ...), matching the legacy wire text.
    #[error("{0}")]
    Cancelled(&'static str),

    /// Any other backend failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingContRep => StatusCode::BAD_REQUEST,
            ApiError::MissingDocId => StatusCode::BAD_REQUEST,
            ApiError::UnknownAction => StatusCode::BAD_REQUEST,
            ApiError::FileRead(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classifies a storage failure observed on a read path, where the
    /// legacy contract reports any non-cancellation failure as not-found.
    pub fn read_failure(err: StorageError, cancelled_text: &'static str) -> Self {
        if err.is_cancelled() {
            ApiError::Cancelled(cancelled_text)
        } else {
            ApiError::NotFound(err.to_string())
        }
    }

    /// Classifies a storage failure observed on a write/delete path.
    pub fn write_failure(
        err: StorageError,
        cancelled_text: &'static str,
        prefix: &str,
    ) -> Self {
        if err.is_cancelled() {
            ApiError::Cancelled(cancelled_text)
        } else {
            ApiError::Internal(format!("{prefix}: {err}"))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::MissingContRep.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::UnknownAction.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::NotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Cancelled("request cancelled").status_code(),
            StatusCode::REQUEST_TIMEOUT
        );
        assert_eq!(
            ApiError::Internal("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wire_texts() {
        assert_eq!(ApiError::MissingContRep.to_string(), "missing contRep");
        assert_eq!(ApiError::MissingDocId.to_string(), "missing docId");
        assert_eq!(ApiError::UnknownAction.to_string(), "unknown action");
        assert_eq!(
            ApiError::Cancelled("upload cancelled").to_string(),
            "upload cancelled"
        );
    }

    #[test]
    fn test_read_failure_distinguishes_cancellation() {
        let cancelled = ApiError::read_failure(StorageError::Cancelled, "request cancelled");
        assert!(matches!(cancelled, ApiError::Cancelled("request cancelled")));

        let absent = ApiError::read_failure(
            StorageError::ObjectNotFound {
                key: "ABC".to_string(),
            },
            "request cancelled",
        );
        assert!(matches!(absent, ApiError::NotFound(_)));
    }
}
