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

//! Request lifecycle middleware.
//!
//! Registers every inbound request in the lifecycle registry, threads the
//! cancellable context through as a request extension, echoes the request
//! id in a response header, and emits one structured log line per request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::lifecycle::RequestGuard;
use crate::server::AppState;

/// Response header echoing the generated request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request execution context, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Opaque request identifier, echoed in the response.
    pub id: Uuid,
    /// Cancellable context bound to this request's registry entry.
    pub token: CancellationToken,
}

/// Registers the request, runs the inner service, and logs the outcome.
///
/// Unregistration is tied to a guard that travels with the response body:
/// for streamed downloads the registry entry stays live until the last byte
/// is written (or the connection is torn down), preserving the
/// happens-after-completion ordering shutdown drain relies on.
pub async fn lifecycle_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let registered = state.registry.register();
    let guard = RequestGuard::new(state.registry.clone(), registered.id);
    state.watermark.update();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.to_string())
        .unwrap_or_else(|| "-".to_string());

    request.extensions_mut().insert(RequestContext {
        id: registered.id,
        token: registered.token.clone(),
    });

    let response = next.run(request).await;
    let status = response.status();
    let elapsed = start.elapsed();

    info!(
        request_id = %registered.id,
        %method,
        %path,
        %remote,
        status = status.as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "request"
    );
    metrics::counter!(
        "dgw_requests_total",
        "method" => method.to_string(),
        "status" => status.as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!("dgw_request_duration_seconds").record(elapsed.as_secs_f64());

    let (mut parts, body) = response.into_parts();
    if let Ok(value) = HeaderValue::try_from(registered.id.to_string()) {
        parts
            .headers
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    Response::from_parts(parts, guarded_body(body, guard))
}

// Moves the registry guard into the response body stream so it drops only
// once the body is fully consumed or abandoned.
fn guarded_body(body: Body, guard: RequestGuard) -> Body {
    let stream = body.into_data_stream();
    Body::from_stream(futures::stream::unfold(
        (stream, guard),
        |(mut stream, guard)| async move {
            stream.next().await.map(|item| (item, (stream, guard)))
        },
    ))
}
