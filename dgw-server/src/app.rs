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

//! Application initialization and runtime.
//!
//! This module handles:
//! - Storage backend initialization
//! - HTTP server setup and routing
//! - TLS/HTTPS configuration
//! - Graceful shutdown (listener close, cancel, drain)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use dgw_api::{create_router, AppState, ListErrorPolicy};
use dgw_core::S3DocumentStore;

use crate::config::Config;
use crate::shutdown::{shutdown_signal, ShutdownController};

/// Main application.
pub struct App {
    config: Config,
    store: Arc<S3DocumentStore>,
}

impl App {
    /// Creates a new application instance.
    ///
    /// Builds the storage client from configuration; no network calls are
    /// made until the first request.
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing document gateway...");

        let store = S3DocumentStore::new(config.s3.to_settings())
            .await
            .context("Failed to initialize storage backend")?;

        info!(
            endpoint = config.s3.endpoint.as_deref().unwrap_or("aws"),
            region = %config.s3.region,
            "Storage backend initialized"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// Runs the application (HTTP/HTTPS server) until a shutdown signal.
    pub async fn run(self) -> Result<()> {
        info!("Document gateway starting...");
        info!(
            "Max upload size: {} bytes ({:.2} GB)",
            self.config.server.max_upload_size,
            self.config.server.max_upload_size as f64 / (1024.0 * 1024.0 * 1024.0)
        );

        let addr: SocketAddr = self.config.server.bind.parse()?;

        let tls_config = if self.config.server.tls.enabled {
            Some(self.load_tls_config().await?)
        } else {
            None
        };

        // Initialize Prometheus metrics recorder if enabled
        let prometheus_handle = if self.config.metrics.prometheus_enabled {
            use metrics_exporter_prometheus::PrometheusBuilder;
            match PrometheusBuilder::new().install_recorder() {
                Ok(handle) => {
                    info!("Prometheus metrics enabled (available at /metrics)");
                    Some(handle)
                }
                Err(e) => {
                    warn!("Failed to install Prometheus recorder: {}. Metrics disabled.", e);
                    None
                }
            }
        } else {
            info!("Prometheus metrics disabled");
            None
        };

        let list_error_policy = if self.config.server.propagate_list_errors {
            ListErrorPolicy::Propagate
        } else {
            ListErrorPolicy::EmptyResult
        };

        let mut state = AppState::new(self.store.clone())
            .with_max_upload_size(self.config.server.max_upload_size)
            .with_list_error_policy(list_error_policy);
        if let Some(handle) = prometheus_handle {
            state = state.with_prometheus_handle(handle);
        }

        let registry = state.registry.clone();
        let router = create_router(state);

        // Phase one: stop accepting and give open connections a bounded
        // window to finish on their own.
        let handle = axum_server::Handle::new();
        let shutdown_handle = handle.clone();
        let listener_deadline = Duration::from_secs(self.config.shutdown.listener_deadline_secs);
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown_handle.graceful_shutdown(Some(listener_deadline));
        });

        let serve_result = if let Some(rustls_config) = tls_config {
            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, rustls_config)
                .handle(handle)
                .serve(router.into_make_service_with_connect_info::<SocketAddr>())
                .await
        } else {
            info!("Listening on http://{}", addr);
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service_with_connect_info::<SocketAddr>())
                .await
        };
        serve_result.context("Server error")?;

        // Phase two: cancel whatever is still running and wait for the
        // registry to empty.
        info!("Listener closed, draining in-flight requests");
        let controller = ShutdownController::new(registry, self.config.shutdown.clone());
        controller.drain().await;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Loads TLS configuration from certificate and key files.
    async fn load_tls_config(&self) -> Result<axum_server::tls_rustls::RustlsConfig> {
        use axum_server::tls_rustls::RustlsConfig;

        let tls_config = &self.config.server.tls;

        let cert_path =
            tls_config.cert_path.as_ref().context("TLS certificate path not configured")?;
        let key_path =
            tls_config.key_path.as_ref().context("TLS private key path not configured")?;

        info!("Loading TLS certificate from {:?}", cert_path);
        let rustls_config = RustlsConfig::from_pem_file(cert_path, key_path)
            .await
            .context("Failed to load TLS certificate and key")?;

        info!("TLS configured successfully");
        Ok(rustls_config)
    }
}
