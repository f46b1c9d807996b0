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

//! DGW Core - Backend interface for the document gateway.
//!
//! This crate defines the contract between the protocol layer and the
//! object-storage backend:
//! - The [`ObjectStore`] trait (streaming put/get, head, delete, list)
//! - Document key and metadata types
//! - An in-memory store for tests and an S3 store for production

pub mod error;
pub mod store;
pub mod types;

pub use error::StorageError;
pub use store::memory::InMemoryDocumentStore;
pub use store::s3::{S3DocumentStore, S3Settings};
pub use store::{BodyStream, ObjectStore};
pub use types::{DocumentKey, DocumentTags, ObjectInfo};
