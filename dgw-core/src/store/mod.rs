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

//! Object-store trait and implementations.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::types::ObjectInfo;

pub mod memory;
pub mod s3;

/// A live stream of object bytes, either inbound (upload) or outbound
/// (download). Never materialized in full by this crate.
pub type BodyStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// Interface to the object-storage backend.
///
/// The backend is an external collaborator assumed strongly consistent per
/// key. Implementations must not retry failed calls; failures are surfaced
/// to the protocol layer, which translates them into wire outcomes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores an object under `key` in `repository`, consuming `body` as it
    /// arrives and attaching `tags` as object metadata.
    async fn put_object(
        &self,
        repository: &str,
        key: &str,
        body: BodyStream,
        tags: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Opens an object for reading, returning its metadata and body stream.
    async fn get_object(
        &self,
        repository: &str,
        key: &str,
    ) -> Result<(ObjectInfo, BodyStream), StorageError>;

    /// Fetches an object's metadata without its body.
    async fn head_object(&self, repository: &str, key: &str) -> Result<ObjectInfo, StorageError>;

    /// Deletes an object.
    async fn delete_object(&self, repository: &str, key: &str) -> Result<(), StorageError>;

    /// Enumerates all keys in a repository, in backend order.
    async fn list_objects(&self, repository: &str) -> Result<Vec<String>, StorageError>;
}
