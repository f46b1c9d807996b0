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

//! Runtime statistics endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::mem::current_rss_bytes;
use crate::server::AppState;

/// Body of the `serverInfo` verb.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInfoBody {
    version: &'static str,
    num_cpu: usize,
    in_flight: usize,
    uptime_seconds: u64,
    rss_bytes: u64,
    max_rss_bytes: u64,
}

/// Reports gateway runtime statistics as JSON.
pub async fn server_info(state: &AppState) -> Result<Response, ApiError> {
    let rss = state.watermark.update();
    let body = ServerInfoBody {
        version: env!("CARGO_PKG_VERSION"),
        num_cpu: std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(1),
        in_flight: state.registry.in_flight(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        rss_bytes: rss,
        max_rss_bytes: state.watermark.peak(),
    };
    Ok((StatusCode::OK, Json(body)).into_response())
}

/// Body of the `/mem` endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MemStatsBody {
    rss_bytes: u64,
    max_rss_bytes: u64,
    in_flight: usize,
}

/// Reports process memory use.
pub async fn mem_stats(State(state): State<AppState>) -> Response {
    state.watermark.update();
    let body = MemStatsBody {
        rss_bytes: current_rss_bytes(),
        max_rss_bytes: state.watermark.peak(),
        in_flight: state.registry.in_flight(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Renders Prometheus metrics, or 503 when the exporter is disabled.
pub async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus_handle {
        Some(handle) => (StatusCode::OK, handle.render()).into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics exporter disabled",
        )
            .into_response(),
    }
}
