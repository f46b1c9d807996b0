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

//! Error types for backend storage operations.

use thiserror::Error;

/// Errors that can occur when talking to the object-storage backend.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend reports that the object does not exist.
    #[error("Object not found: {key}")]
    ObjectNotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// The operation was abandoned because its execution context was
    /// cancelled (shutdown or client disconnect).
    #[error("Operation cancelled")]
    Cancelled,

    /// The inbound byte stream failed mid-transfer.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Any other backend failure. Never retried; surfaced to the caller.
    #[error("Backend error: {0}")]
    Backend(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// True if this error means the object is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::ObjectNotFound { .. })
    }

    /// True if this error is a cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        let err = StorageError::ObjectNotFound {
            key: "ABC".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_cancelled_classification() {
        assert!(StorageError::Cancelled.is_cancelled());
        assert!(!StorageError::Backend("boom".to_string()).is_cancelled());
    }
}
