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

//! Protocol verb dispatch.
//!
//! The legacy endpoint selects its operation through query-string flags
//! (case-sensitive names). This module is pure routing and validation: it
//! inspects the parameter set, applies the fixed verb precedence, and
//! rejects malformed requests before any backend call is made.

use std::collections::HashMap;

use crate::error::ApiError;
use dgw_core::DocumentKey;

/// Verb flag names. Presence selects the verb; values are ignored.
const FLAG_GET: &str = "get";
const FLAG_INFO: &str = "info";
const FLAG_LIST: &str = "list";
const FLAG_SERVER_INFO: &str = "serverInfo";

/// Query parameter names.
const PARAM_REPOSITORY: &str = "contRep";
const PARAM_DOC_ID: &str = "docId";

/// The operation a request resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Upload a document (POST with multipart body).
    Create(DocumentKey),
    /// Download a document body.
    Get(DocumentKey),
    /// Fetch document metadata.
    Info(DocumentKey),
    /// Enumerate all document keys of a repository.
    List {
        /// Repository to enumerate.
        repository: String,
    },
    /// Report gateway runtime statistics.
    ServerInfo,
    /// Delete a document.
    Delete(DocumentKey),
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    // An empty value counts as missing, matching the legacy contract.
    params.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Validates the parameter pair required by keyed operations. Missing
/// repository is always reported before missing docId.
fn document_key(params: &HashMap<String, String>) -> Result<DocumentKey, ApiError> {
    let repository = param(params, PARAM_REPOSITORY).ok_or(ApiError::MissingContRep)?;
    let doc_id = param(params, PARAM_DOC_ID).ok_or(ApiError::MissingDocId)?;
    Ok(DocumentKey::new(repository, doc_id))
}

/// Routes a GET request by its verb flags.
///
/// Precedence is fixed: `get` > `info` > `list` > `serverInfo`; a request
/// with no recognized flag is rejected as an unknown action. `serverInfo`
/// requires no parameters at all.
pub fn dispatch_get(params: &HashMap<String, String>) -> Result<Operation, ApiError> {
    if params.contains_key(FLAG_GET) {
        document_key(params).map(Operation::Get)
    } else if params.contains_key(FLAG_INFO) {
        document_key(params).map(Operation::Info)
    } else if params.contains_key(FLAG_LIST) {
        let repository = param(params, PARAM_REPOSITORY).ok_or(ApiError::MissingContRep)?;
        Ok(Operation::List {
            repository: repository.to_string(),
        })
    } else if params.contains_key(FLAG_SERVER_INFO) {
        Ok(Operation::ServerInfo)
    } else {
        Err(ApiError::UnknownAction)
    }
}

/// Routes a POST request (document creation).
pub fn dispatch_create(params: &HashMap<String, String>) -> Result<Operation, ApiError> {
    document_key(params).map(Operation::Create)
}

/// Routes a DELETE request.
pub fn dispatch_delete(params: &HashMap<String, String>) -> Result<Operation, ApiError> {
    document_key(params).map(Operation::Delete)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_get_verb() {
        let op = dispatch_get(&params(&[("get", ""), ("contRep", "a"), ("docId", "x")])).unwrap();
        assert_eq!(op, Operation::Get(DocumentKey::new("a", "x")));
    }

    #[test]
    fn test_precedence_get_over_info_and_list() {
        let op = dispatch_get(&params(&[
            ("get", ""),
            ("info", ""),
            ("list", ""),
            ("contRep", "a"),
            ("docId", "x"),
        ]))
        .unwrap();
        assert!(matches!(op, Operation::Get(_)));
    }

    #[test]
    fn test_precedence_info_over_list() {
        let op = dispatch_get(&params(&[
            ("info", ""),
            ("list", ""),
            ("contRep", "a"),
            ("docId", "x"),
        ]))
        .unwrap();
        assert!(matches!(op, Operation::Info(_)));
    }

    #[test]
    fn test_list_needs_no_doc_id() {
        let op = dispatch_get(&params(&[("list", ""), ("contRep", "a")])).unwrap();
        assert_eq!(
            op,
            Operation::List {
                repository: "a".to_string()
            }
        );
    }

    #[test]
    fn test_server_info_needs_no_params() {
        let op = dispatch_get(&params(&[("serverInfo", "")])).unwrap();
        assert_eq!(op, Operation::ServerInfo);
    }

    #[test]
    fn test_unknown_action() {
        let err = dispatch_get(&params(&[("contRep", "a")])).unwrap_err();
        assert!(matches!(err, ApiError::UnknownAction));
    }

    #[test]
    fn test_flag_names_are_case_sensitive() {
        let err = dispatch_get(&params(&[("GET", ""), ("contRep", "a"), ("docId", "x")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::UnknownAction));
    }

    #[test]
    fn test_missing_repository_reported_before_missing_doc_id() {
        // Both are missing; contRep wins.
        let err = dispatch_get(&params(&[("get", "")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingContRep));
    }

    #[test]
    fn test_missing_doc_id() {
        let err = dispatch_get(&params(&[("get", ""), ("contRep", "a")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingDocId));
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let err =
            dispatch_create(&params(&[("contRep", ""), ("docId", "x")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingContRep));

        let err = dispatch_create(&params(&[("contRep", "a"), ("docId", "")])).unwrap_err();
        assert!(matches!(err, ApiError::MissingDocId));
    }

    #[test]
    fn test_create_and_delete_normalize_doc_id() {
        let create = dispatch_create(&params(&[("contRep", "a"), ("docId", "abc")])).unwrap();
        assert_eq!(create, Operation::Create(DocumentKey::new("a", "ABC")));

        let delete = dispatch_delete(&params(&[("contRep", "a"), ("docId", "abc")])).unwrap();
        assert_eq!(delete, Operation::Delete(DocumentKey::new("a", "ABC")));
    }
}
