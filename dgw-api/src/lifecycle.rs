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

//! Request lifecycle registry.
//!
//! Every inbound request is registered here with a fresh id and a
//! cancellable context derived from a process root token. Shutdown uses the
//! registry to cancel all in-flight work and wait for drain. The registry is
//! an explicitly owned instance (shared via `Arc`), never a process global,
//! so tests can run several independent registries side by side.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use dgw_core::StorageError;

/// A registered request: id, cancellation capability, entry timestamp.
#[derive(Debug)]
struct RequestHandle {
    cancel: CancellationToken,
    started_at: Instant,
}

/// What `register` hands back to the request path.
#[derive(Debug, Clone)]
pub struct RegisteredRequest {
    /// Opaque, collision-free request identifier.
    pub id: Uuid,
    /// Cancellable context for this request. Every suspension point on the
    /// request path must observe it.
    pub token: CancellationToken,
    /// When the request entered the registry.
    pub started_at: Instant,
}

/// Concurrent registry of in-flight requests.
///
/// Invariant: the in-flight counter always equals the number of stored
/// handles. Both are only mutated while holding the map lock; the counter
/// exists so `in_flight` and the drain loop can read without locking.
pub struct RequestLifecycleRegistry {
    handles: Mutex<HashMap<Uuid, RequestHandle>>,
    in_flight: AtomicUsize,
    root: CancellationToken,
}

impl RequestLifecycleRegistry {
    /// Creates an empty registry with a fresh root token.
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            root: CancellationToken::new(),
        }
    }

    /// Registers a new request: fresh id, child token of the root context,
    /// counter incremented. Safe under unbounded concurrent invocation.
    pub fn register(&self) -> RegisteredRequest {
        let id = Uuid::new_v4();
        let token = self.root.child_token();
        let started_at = Instant::now();

        let mut handles = self.handles.lock().expect("lock poisoned");
        handles.insert(
            id,
            RequestHandle {
                cancel: token.clone(),
                started_at,
            },
        );
        self.in_flight.store(handles.len(), Ordering::SeqCst);

        RegisteredRequest {
            id,
            token,
            started_at,
        }
    }

    /// Removes a request from the registry. Idempotent: unregistering an
    /// unknown id is a no-op, guarding duplicate cleanup paths.
    pub fn unregister(&self, id: Uuid) {
        let mut handles = self.handles.lock().expect("lock poisoned");
        handles.remove(&id);
        self.in_flight.store(handles.len(), Ordering::SeqCst);
    }

    /// Cancels every registered request's context. Entries are not removed;
    /// each request unregisters itself on its own completion path.
    pub fn cancel_all(&self) {
        let handles = self.handles.lock().expect("lock poisoned");
        for handle in handles.values() {
            handle.cancel.cancel();
        }
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Age of the oldest in-flight request, if any.
    pub fn oldest_age(&self) -> Option<Duration> {
        let handles = self.handles.lock().expect("lock poisoned");
        handles.values().map(|h| h.started_at.elapsed()).max()
    }

    /// Polls the in-flight counter until it reaches zero or `deadline`
    /// elapses. Returns whether the drain completed cleanly.
    pub async fn drain(&self, poll_interval: Duration, deadline: Duration) -> bool {
        let start = Instant::now();
        loop {
            let remaining = self.in_flight();
            if remaining == 0 {
                return true;
            }
            if start.elapsed() >= deadline {
                return false;
            }
            let oldest_secs = self.oldest_age().map(|age| age.as_secs()).unwrap_or(0);
            info!(remaining, oldest_secs, "waiting for active requests to finish");
            tokio::time::sleep(poll_interval).await;
        }
    }
}

impl Default for RequestLifecycleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped unregistration: drops exactly once on every exit path of the
/// request (success, error, panic, or a streamed body being torn down).
pub struct RequestGuard {
    registry: Arc<RequestLifecycleRegistry>,
    id: Uuid,
}

impl RequestGuard {
    /// Binds a registered id to its registry for cleanup on drop.
    pub fn new(registry: Arc<RequestLifecycleRegistry>, id: Uuid) -> Self {
        Self { registry, id }
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// Wraps an object byte stream so it observes a cancellation token at every
/// poll. Once the token fires, the stream yields a single cancellation
/// error and ends; the underlying backend stream is dropped with it.
pub fn cancel_aware_stream<S>(
    token: CancellationToken,
    stream: S,
) -> impl Stream<Item = Result<Bytes, StorageError>> + Send
where
    S: Stream<Item = Result<Bytes, StorageError>> + Send + Unpin + 'static,
{
    struct State<S> {
        stream: S,
        token: CancellationToken,
        done: bool,
    }

    futures::stream::unfold(
        State {
            stream,
            token,
            done: false,
        },
        |mut state| async move {
            if state.done {
                return None;
            }
            tokio::select! {
                _ = state.token.cancelled() => {
                    state.done = true;
                    Some((Err(StorageError::Cancelled), state))
                }
                item = state.stream.next() => item.map(|item| (item, state)),
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[test]
    fn test_register_unregister_counter() {
        let registry = RequestLifecycleRegistry::new();
        let a = registry.register();
        let b = registry.register();
        assert_eq!(registry.in_flight(), 2);

        registry.unregister(a.id);
        assert_eq!(registry.in_flight(), 1);

        // Idempotent: a second unregister of the same id is a no-op.
        registry.unregister(a.id);
        assert_eq!(registry.in_flight(), 1);

        registry.unregister(b.id);
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_oldest_age_tracks_registered_requests() {
        let registry = RequestLifecycleRegistry::new();
        assert!(registry.oldest_age().is_none());

        let req = registry.register();
        assert!(registry.oldest_age().is_some());

        registry.unregister(req.id);
        assert!(registry.oldest_age().is_none());
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let registry = RequestLifecycleRegistry::new();
        registry.unregister(Uuid::new_v4());
        assert_eq!(registry.in_flight(), 0);
    }

    #[test]
    fn test_cancel_all_cancels_without_removing() {
        let registry = RequestLifecycleRegistry::new();
        let a = registry.register();
        let b = registry.register();

        registry.cancel_all();
        assert!(a.token.is_cancelled());
        assert!(b.token.is_cancelled());
        // Removal happens via each request's own completion path.
        assert_eq!(registry.in_flight(), 2);
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let registry = Arc::new(RequestLifecycleRegistry::new());
        let req = registry.register();
        {
            let _guard = RequestGuard::new(registry.clone(), req.id);
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = Arc::new(RequestLifecycleRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..64 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let req = registry.register();
                tokio::task::yield_now().await;
                registry.unregister(req.id);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_drain_completes_when_cancelled_work_finishes() {
        let registry = Arc::new(RequestLifecycleRegistry::new());

        // N in-flight operations that finish only once they observe
        // cancellation.
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            let req = registry.register();
            tasks.push(tokio::spawn(async move {
                req.token.cancelled().await;
                registry.unregister(req.id);
            }));
        }
        assert_eq!(registry.in_flight(), 8);

        registry.cancel_all();
        let drained = registry
            .drain(Duration::from_millis(10), Duration::from_secs(5))
            .await;
        assert!(drained);
        assert_eq!(registry.in_flight(), 0);

        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_drain_reports_failure_on_deadline() {
        let registry = RequestLifecycleRegistry::new();
        let _stuck = registry.register();

        let drained = registry
            .drain(Duration::from_millis(5), Duration::from_millis(25))
            .await;
        assert!(!drained);
        assert_eq!(registry.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_cancel_aware_stream_passes_items_through() {
        let token = CancellationToken::new();
        let inner = stream::iter(vec![
            Ok(Bytes::from_static(b"a")),
            Ok(Bytes::from_static(b"b")),
        ]);
        let items: Vec<_> = cancel_aware_stream(token, inner).collect().await;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.is_ok()));
    }

    #[tokio::test]
    async fn test_cancel_aware_stream_yields_cancellation() {
        let token = CancellationToken::new();
        token.cancel();

        // The inner stream never ends on its own.
        let inner = stream::pending::<Result<Bytes, StorageError>>();
        let items: Vec<_> = cancel_aware_stream(token, inner).collect().await;

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(StorageError::Cancelled)));
    }
}
