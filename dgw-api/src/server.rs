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

//! HTTP surface of the gateway.
//!
//! One legacy endpoint carries the whole document protocol; the verb is
//! selected by query-string flags, not by path. Two side endpoints expose
//! memory statistics and Prometheus metrics.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Extension, Multipart, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use crate::dispatch::{self, Operation};
use crate::handlers;
use crate::lifecycle::RequestLifecycleRegistry;
use crate::mem::MemoryWatermark;
use crate::middleware::{lifecycle_middleware, RequestContext};
use dgw_core::ObjectStore;

/// The single protocol endpoint, kept verbatim for legacy client
/// compatibility.
pub const CONTENT_ROUTE: &str = "/ContentServer/ContentServer.dll";

/// Default cap on upload body size (1 GiB).
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 1024 * 1024 * 1024;

/// What to do when a repository listing fails for a reason other than
/// cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListErrorPolicy {
    /// Report an empty result with status 200. This is the legacy
    /// behavior and the default.
    EmptyResult,
    /// Surface the failure as a 500.
    Propagate,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Storage backend.
    pub store: Arc<dyn ObjectStore>,
    /// In-flight request registry.
    pub registry: Arc<RequestLifecycleRegistry>,
    /// Process memory watermark.
    pub watermark: Arc<MemoryWatermark>,
    /// Listing failure policy.
    pub list_error_policy: ListErrorPolicy,
    /// Upload body size cap in bytes.
    pub max_upload_size: usize,
    /// Prometheus render handle, when the exporter is enabled.
    pub prometheus_handle: Option<PrometheusHandle>,
    /// Process start, for uptime reporting.
    pub start_time: Instant,
}

impl AppState {
    /// Creates state with the default list policy and upload cap.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            registry: Arc::new(RequestLifecycleRegistry::new()),
            watermark: Arc::new(MemoryWatermark::new()),
            list_error_policy: ListErrorPolicy::EmptyResult,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            prometheus_handle: None,
            start_time: Instant::now(),
        }
    }

    /// Overrides the listing failure policy.
    pub fn with_list_error_policy(mut self, policy: ListErrorPolicy) -> Self {
        self.list_error_policy = policy;
        self
    }

    /// Overrides the upload body size cap.
    pub fn with_max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = bytes;
        self
    }

    /// Attaches a Prometheus render handle.
    pub fn with_prometheus_handle(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus_handle = Some(handle);
        self
    }
}

/// Builds the gateway router with tracing and lifecycle middleware
/// installed.
pub fn create_router(state: AppState) -> Router {
    let max_upload_size = state.max_upload_size;
    Router::new()
        .route(
            CONTENT_ROUTE,
            get(content_get)
                .post(content_post)
                .delete(content_delete),
        )
        .route("/mem", get(handlers::mem_stats))
        .route("/metrics", get(handlers::prometheus_metrics))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            lifecycle_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(max_upload_size))
        .with_state(state)
}

async fn content_get(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let operation = match dispatch::dispatch_get(&params) {
        Ok(op) => op,
        Err(err) => return err.into_response(),
    };
    let result = match operation {
        Operation::Get(key) => handlers::get_document(&state, &ctx, key).await,
        Operation::Info(key) => handlers::document_info(&state, &ctx, key).await,
        Operation::List { repository } => {
            handlers::list_documents(&state, &ctx, &repository).await
        }
        Operation::ServerInfo => handlers::server_info(&state).await,
        // POST/DELETE verbs never come out of GET dispatch.
        Operation::Create(_) | Operation::Delete(_) => {
            Err(crate::error::ApiError::UnknownAction)
        }
    };
    match result {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn content_post(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> Response {
    let operation = match dispatch::dispatch_create(&params) {
        Ok(op) => op,
        Err(err) => return err.into_response(),
    };
    let result = match operation {
        Operation::Create(key) => handlers::create_document(&state, &ctx, key, multipart).await,
        _ => Err(crate::error::ApiError::UnknownAction),
    };
    match result {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn content_delete(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let operation = match dispatch::dispatch_delete(&params) {
        Ok(op) => op,
        Err(err) => return err.into_response(),
    };
    let result = match operation {
        Operation::Delete(key) => handlers::delete_document(&state, &ctx, key).await,
        _ => Err(crate::error::ApiError::UnknownAction),
    };
    match result {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}
