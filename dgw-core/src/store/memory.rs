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

//! In-memory, HashMap-based object store.
//!
//! Intended for tests and local development. Objects are held behind an
//! `RwLock` and cloned on read. Uploads are drained into memory, so this
//! store does not preserve the streaming guarantees of the S3 store — it
//! only has to be correct, not frugal.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::error::StorageError;
use crate::store::{BodyStream, ObjectStore};
use crate::types::ObjectInfo;

#[derive(Debug, Clone)]
struct StoredDocument {
    data: Bytes,
    last_modified: DateTime<Utc>,
    content_type: String,
    etag: String,
    metadata: HashMap<String, String>,
}

/// In-memory [`ObjectStore`] implementation.
pub struct InMemoryDocumentStore {
    objects: RwLock<HashMap<(String, String), StoredDocument>>,
    // Failure injection for the list-degradation behavior.
    fail_lists: AtomicBool,
}

impl InMemoryDocumentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            fail_lists: AtomicBool::new(false),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Makes every subsequent `list_objects` call fail with a backend error
    /// until called again with `false`. Used to exercise the protocol
    /// layer's partial-failure policy for listings.
    pub fn set_fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    fn etag_for(data: &Bytes) -> String {
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryDocumentStore {
    async fn put_object(
        &self,
        repository: &str,
        key: &str,
        mut body: BodyStream,
        tags: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk?);
        }
        let data = Bytes::from(data);

        let stored = StoredDocument {
            etag: Self::etag_for(&data),
            data,
            last_modified: Utc::now(),
            content_type: "application/octet-stream".to_string(),
            metadata: tags.clone(),
        };

        let mut map = self.objects.write().expect("lock poisoned");
        map.insert((repository.to_string(), key.to_string()), stored);
        Ok(())
    }

    async fn get_object(
        &self,
        repository: &str,
        key: &str,
    ) -> Result<(ObjectInfo, BodyStream), StorageError> {
        let info = self.head_object(repository, key).await?;
        let data = {
            let map = self.objects.read().expect("lock poisoned");
            map.get(&(repository.to_string(), key.to_string()))
                .map(|doc| doc.data.clone())
                .ok_or_else(|| StorageError::ObjectNotFound {
                    key: key.to_string(),
                })?
        };
        let stream: BodyStream = futures::stream::once(async move { Ok(data) }).boxed();
        Ok((info, stream))
    }

    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectInfo, StorageError> {
        let map = self.objects.read().expect("lock poisoned");
        let doc = map
            .get(&(repository.to_string(), key.to_string()))
            .ok_or_else(|| StorageError::ObjectNotFound {
                key: key.to_string(),
            })?;

        Ok(ObjectInfo {
            key: key.to_string(),
            size: doc.data.len() as u64,
            last_modified: doc.last_modified,
            content_type: doc.content_type.clone(),
            etag: doc.etag.clone(),
            metadata: doc.metadata.clone(),
        })
    }

    async fn delete_object(&self, repository: &str, key: &str) -> Result<(), StorageError> {
        let mut map = self.objects.write().expect("lock poisoned");
        map.remove(&(repository.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_objects(&self, repository: &str) -> Result<Vec<String>, StorageError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StorageError::Backend(
                "injected list failure".to_string(),
            ));
        }

        let map = self.objects.read().expect("lock poisoned");
        let mut keys: Vec<String> = map
            .keys()
            .filter(|(repo, _)| repo == repository)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn body_from(data: &'static [u8]) -> BodyStream {
        futures::stream::once(async move { Ok(Bytes::from_static(data)) }).boxed()
    }

    async fn collect(mut stream: BodyStream) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = InMemoryDocumentStore::new();
        let tags = HashMap::new();
        store
            .put_object("archive", "DOC1", body_from(b"hello world"), &tags)
            .await
            .unwrap();

        let (info, body) = store.get_object("archive", "DOC1").await.unwrap();
        assert_eq!(info.size, 11);
        assert_eq!(collect(body).await, b"hello world");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = InMemoryDocumentStore::new();
        store
            .put_object("archive", "DOC1", body_from(b"x"), &HashMap::new())
            .await
            .unwrap();
        store.delete_object("archive", "DOC1").await.unwrap();

        let err = store.get_object("archive", "DOC1").await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_scoped_to_repository() {
        let store = InMemoryDocumentStore::new();
        store
            .put_object("a", "K1", body_from(b"1"), &HashMap::new())
            .await
            .unwrap();
        store
            .put_object("a", "K2", body_from(b"2"), &HashMap::new())
            .await
            .unwrap();
        store
            .put_object("b", "K3", body_from(b"3"), &HashMap::new())
            .await
            .unwrap();

        assert_eq!(store.list_objects("a").await.unwrap(), vec!["K1", "K2"]);
        assert_eq!(store.list_objects("empty").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_list_failure_injection() {
        let store = InMemoryDocumentStore::new();
        store.set_fail_lists(true);
        assert!(store.list_objects("a").await.is_err());
        store.set_fail_lists(false);
        assert!(store.list_objects("a").await.is_ok());
    }
}
