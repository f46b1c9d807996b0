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

//! Document keys and object metadata types.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Metadata tag names attached to every uploaded document.
pub const TAG_REPOSITORY: &str = "contRep";
/// Document id tag.
pub const TAG_DOC_ID: &str = "docId";
/// Original filename tag, recovered on download.
pub const TAG_FILENAME: &str = "filename";
/// Creation date tag (YYYY-MM-DD).
pub const TAG_DATE_CREATED: &str = "X-dateC";
/// Creation time tag (HH:MM:SS).
pub const TAG_TIME_CREATED: &str = "X-timeC";
/// Modification date tag (YYYY-MM-DD).
pub const TAG_DATE_MODIFIED: &str = "X-dateM";
/// Modification time tag (HH:MM:SS).
pub const TAG_TIME_MODIFIED: &str = "X-timeM";

/// Identifies a document within a repository.
///
/// The document id is uppercased before use as a storage key. Storage keys
/// are case-sensitive, so two ids differing only by case address the same
/// object. This is the legacy protocol's key policy and is irreversible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentKey {
    /// Logical namespace (bucket) the document belongs to.
    pub repository: String,
    /// Uppercased document id, used verbatim as the storage key.
    pub doc_id: String,
}

impl DocumentKey {
    /// Creates a key, applying uppercase normalization to the document id.
    pub fn new(repository: impl Into<String>, doc_id: &str) -> Self {
        Self {
            repository: repository.into(),
            doc_id: doc_id.to_uppercase(),
        }
    }
}

/// Metadata describing a stored object, as returned by a head lookup.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    /// Storage key of the object.
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Last modification timestamp.
    pub last_modified: DateTime<Utc>,
    /// MIME type reported by the backend.
    pub content_type: String,
    /// Integrity tag (etag-equivalent) reported by the backend.
    pub etag: String,
    /// Tag set attached at upload time.
    pub metadata: HashMap<String, String>,
}

impl ObjectInfo {
    /// Returns the original filename recorded at upload, if any.
    ///
    /// An empty tag value counts as absent so the caller can fall back to
    /// the document id.
    pub fn filename(&self) -> Option<&str> {
        self.metadata
            .get(TAG_FILENAME)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Tag set attached to a document at upload time.
///
/// Read-only after creation; tags are opaque metadata and never mutated
/// post-upload.
#[derive(Debug, Clone)]
pub struct DocumentTags(HashMap<String, String>);

impl DocumentTags {
    /// Builds the standard tag set for a fresh upload.
    ///
    /// Creation and modification timestamps are both set to `now`; this
    /// gateway never updates objects in place.
    pub fn for_upload(key: &DocumentKey, filename: &str, now: DateTime<Utc>) -> Self {
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M:%S").to_string();

        let mut tags = HashMap::new();
        tags.insert(TAG_REPOSITORY.to_string(), key.repository.clone());
        tags.insert(TAG_DOC_ID.to_string(), key.doc_id.clone());
        tags.insert(TAG_FILENAME.to_string(), filename.to_string());
        tags.insert(TAG_DATE_CREATED.to_string(), date.clone());
        tags.insert(TAG_TIME_CREATED.to_string(), time.clone());
        tags.insert(TAG_DATE_MODIFIED.to_string(), date);
        tags.insert(TAG_TIME_MODIFIED.to_string(), time);
        Self(tags)
    }

    /// Borrows the underlying tag map.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_doc_id_uppercase_normalization() {
        let key = DocumentKey::new("archive", "doc-123abc");
        assert_eq!(key.doc_id, "DOC-123ABC");
        assert_eq!(key.repository, "archive");
    }

    #[test]
    fn test_doc_id_normalization_idempotent() {
        let once = DocumentKey::new("archive", "abc");
        let twice = DocumentKey::new("archive", &once.doc_id);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upload_tags() {
        let key = DocumentKey::new("archive", "abc");
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        let tags = DocumentTags::for_upload(&key, "report.pdf", now);
        let map = tags.as_map();

        assert_eq!(map.get(TAG_REPOSITORY).unwrap(), "archive");
        assert_eq!(map.get(TAG_DOC_ID).unwrap(), "ABC");
        assert_eq!(map.get(TAG_FILENAME).unwrap(), "report.pdf");
        assert_eq!(map.get(TAG_DATE_CREATED).unwrap(), "2026-03-14");
        assert_eq!(map.get(TAG_TIME_CREATED).unwrap(), "09:26:53");
        assert_eq!(map.get(TAG_DATE_MODIFIED).unwrap(), "2026-03-14");
        assert_eq!(map.get(TAG_TIME_MODIFIED).unwrap(), "09:26:53");
    }

    #[test]
    fn test_filename_recovery_empty_falls_back() {
        let mut metadata = HashMap::new();
        metadata.insert(TAG_FILENAME.to_string(), String::new());
        let info = ObjectInfo {
            key: "ABC".to_string(),
            size: 0,
            last_modified: Utc::now(),
            content_type: "application/octet-stream".to_string(),
            etag: "etag".to_string(),
            metadata,
        };
        assert_eq!(info.filename(), None);
    }
}
