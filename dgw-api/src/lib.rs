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

//! DGW API Layer - legacy document-repository protocol over HTTP.
//!
//! This crate provides the protocol layer for the document gateway:
//! - The verb dispatcher for the single legacy endpoint
//! - The request lifecycle registry (cancellable contexts, drain)
//! - Streaming upload/download handlers against an [`dgw_core::ObjectStore`]
//! - Middleware for request ids, registration, and logging

pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod lifecycle;
pub mod mem;
pub mod middleware;
pub mod server;

pub use dispatch::Operation;
pub use error::ApiError;
pub use lifecycle::{RequestGuard, RequestLifecycleRegistry};
pub use middleware::RequestContext;
pub use server::{create_router, AppState, ListErrorPolicy, CONTENT_ROUTE};
