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

//! Graceful shutdown sequencing.
//!
//! Shutdown moves through three states exactly once: the listener stops
//! accepting, every in-flight request context is cancelled, then the drain
//! loop waits for the registry to empty. The drain deadline bounds the
//! whole phase; on overrun the remaining requests are abandoned and the
//! process exits anyway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{error, info};

use dgw_api::RequestLifecycleRegistry;

use crate::config::ShutdownConfig;

/// Phase of the shutdown sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    /// Serving requests normally.
    Running,
    /// Listener closed, in-flight requests cancelled, drain in progress.
    Draining,
    /// Drain finished (cleanly or by deadline).
    Stopped,
}

/// Drives the cancel-and-drain phase of shutdown.
pub struct ShutdownController {
    registry: Arc<RequestLifecycleRegistry>,
    config: ShutdownConfig,
    state: Mutex<ShutdownState>,
}

impl ShutdownController {
    /// Binds the controller to the registry it will drain.
    pub fn new(registry: Arc<RequestLifecycleRegistry>, config: ShutdownConfig) -> Self {
        Self {
            registry,
            config,
            state: Mutex::new(ShutdownState::Running),
        }
    }

    /// Current phase of the shutdown sequence.
    pub fn state(&self) -> ShutdownState {
        *self.state.lock().expect("lock poisoned")
    }

    /// Cancels all in-flight requests and waits for them to unregister.
    ///
    /// Returns the terminal state. Runs at most once per process; callers
    /// invoke it only after the listener has stopped accepting.
    pub async fn drain(&self) -> ShutdownState {
        *self.state.lock().expect("lock poisoned") = ShutdownState::Draining;

        let in_flight = self.registry.in_flight();
        info!(in_flight, "cancelling in-flight requests");
        self.registry.cancel_all();

        let clean = self
            .registry
            .drain(
                Duration::from_millis(self.config.drain_poll_interval_ms),
                Duration::from_secs(self.config.drain_deadline_secs),
            )
            .await;

        if clean {
            info!("all requests drained, shutdown complete");
        } else {
            error!(
                remaining = self.registry.in_flight(),
                "drain deadline exceeded, abandoning remaining requests"
            );
        }
        *self.state.lock().expect("lock poisoned") = ShutdownState::Stopped;
        ShutdownState::Stopped
    }
}

/// Resolves when a shutdown signal (Ctrl+C or SIGTERM) arrives.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> ShutdownConfig {
        ShutdownConfig {
            listener_deadline_secs: 1,
            drain_poll_interval_ms: 5,
            drain_deadline_secs: 2,
        }
    }

    #[tokio::test]
    async fn test_drain_empty_registry() {
        let registry = Arc::new(RequestLifecycleRegistry::new());
        let controller = ShutdownController::new(registry, fast_config());
        assert_eq!(controller.state(), ShutdownState::Running);
        assert_eq!(controller.drain().await, ShutdownState::Stopped);
        assert_eq!(controller.state(), ShutdownState::Stopped);
    }

    #[tokio::test]
    async fn test_drain_waits_for_cancelled_requests() {
        let registry = Arc::new(RequestLifecycleRegistry::new());
        let controller = ShutdownController::new(registry.clone(), fast_config());

        let req = registry.register();
        let worker = {
            let registry = registry.clone();
            tokio::spawn(async move {
                req.token.cancelled().await;
                registry.unregister(req.id);
            })
        };

        assert_eq!(controller.drain().await, ShutdownState::Stopped);
        assert_eq!(registry.in_flight(), 0);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_gives_up_at_deadline() {
        let registry = Arc::new(RequestLifecycleRegistry::new());
        let config = ShutdownConfig {
            drain_deadline_secs: 0,
            ..fast_config()
        };
        let controller = ShutdownController::new(registry.clone(), config);

        // A request that never unregisters.
        let _stuck = registry.register();
        assert_eq!(controller.drain().await, ShutdownState::Stopped);
        assert_eq!(registry.in_flight(), 1);
    }
}
