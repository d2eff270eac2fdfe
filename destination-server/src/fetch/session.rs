//! Per-consumer fetch sessions.
//!
//! A session owns the consumer's visible `{data, loading, error}` view and
//! a monotonic generation counter. Every resolve call allocates a new
//! generation; a result is applied to the visible state only if its
//! generation is still the highest issued, so overlapping in-flight
//! requests can complete in any order without a stale response
//! overwriting a newer one. The shared [`ResponseCache`] is updated
//! unconditionally on success so other sessions still benefit from
//! superseded fetches.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::cache::{CacheEntry, DEFAULT_STALENESS, ResponseCache};
use super::error::FetchError;
use super::key::{CacheKey, RequestConfig};
use super::transport::Transport;

/// Consumer-visible fetch state.
///
/// `data` survives refreshes: a new resolve for the same consumer keeps
/// the previously displayed payload while `loading` is true.
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    /// The most recently applied payload, if any.
    pub data: Option<Arc<serde_json::Value>>,

    /// Whether the newest-generation request is still in flight.
    pub loading: bool,

    /// Error message from the newest-generation request, if it failed.
    pub error: Option<String>,
}

/// A request for [`FetchSession::resolve`].
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Resource URL. Empty means "no request": resolve short-circuits
    /// to an idle state.
    pub url: String,

    /// Request configuration (participates in cache identity).
    pub config: RequestConfig,

    /// Per-request staleness override. `None` uses [`DEFAULT_STALENESS`].
    pub staleness: Option<Duration>,
}

impl FetchRequest {
    /// A GET request with default configuration.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: RequestConfig::default(),
            staleness: None,
        }
    }

    /// A request with an explicit configuration.
    pub fn new(url: impl Into<String>, config: RequestConfig) -> Self {
        Self {
            url: url.into(),
            config,
            staleness: None,
        }
    }

    /// Override the staleness window for this request.
    pub fn with_staleness(mut self, staleness: Duration) -> Self {
        self.staleness = Some(staleness);
        self
    }

    fn staleness(&self) -> Duration {
        self.staleness.unwrap_or(DEFAULT_STALENESS)
    }
}

/// The call currently associated with the session.
struct Active {
    request: FetchRequest,
    /// Caller-supplied lifecycle token the call token was derived from.
    parent: CancellationToken,
    /// Token for the in-flight call itself.
    token: CancellationToken,
}

struct SessionInner {
    cache: ResponseCache,
    transport: Arc<dyn Transport>,
    generation: AtomicU64,
    state: RwLock<FetchState>,
    active: Mutex<Option<Active>>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Last session handle gone: tear down any in-flight call.
        if let Some(active) = self.active.get_mut() {
            active.token.cancel();
        }
    }
}

/// A consumer's handle onto the fetch cache.
///
/// Cheap to clone; clones share the same visible state and generation
/// counter. Dropping the last clone cancels any in-flight request.
#[derive(Clone)]
pub struct FetchSession {
    inner: Arc<SessionInner>,
}

impl FetchSession {
    /// Create a session over a shared cache and transport.
    pub fn new(cache: ResponseCache, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                cache,
                transport,
                generation: AtomicU64::new(0),
                state: RwLock::new(FetchState::default()),
                active: Mutex::new(None),
            }),
        }
    }

    /// Snapshot of the consumer-visible state.
    pub async fn state(&self) -> FetchState {
        self.inner.state.read().await.clone()
    }

    /// Resolve a request: serve it from the shared cache if fresh,
    /// otherwise fetch it over the transport.
    ///
    /// `cancel` is the caller's lifecycle token; triggering it makes the
    /// in-flight call vanish silently (no error, no data change; the
    /// loading flag is cleared if the call was still the newest).
    /// Issuing a new resolve cancels the previous in-flight call.
    /// Returns a snapshot of the visible state after this call settled.
    pub async fn resolve(&self, request: FetchRequest, cancel: CancellationToken) -> FetchState {
        if request.url.is_empty() {
            self.reset_to_idle().await;
            return self.state().await;
        }

        let key = CacheKey::derive(&request.url, &request.config);
        let staleness = request.staleness();
        let (my_gen, call_token) = self.begin_call(request.clone(), cancel).await;

        if let Some(entry) = self.inner.cache.get(&key).await
            && entry.is_fresh(staleness)
        {
            debug!(key = %key, "cache hit");
            self.apply(my_gen, |state| {
                state.data = Some(entry.payload.clone());
                state.loading = false;
                state.error = None;
            })
            .await;
            return self.state().await;
        }

        // Stale or missing: mark loading but keep the displayed data.
        self.apply(my_gen, |state| {
            state.loading = true;
            state.error = None;
        })
        .await;

        if call_token.is_cancelled() {
            return self.state().await;
        }

        debug!(key = %key, generation = my_gen, "fetching");

        let outcome = tokio::select! {
            _ = call_token.cancelled() => Err(FetchError::Cancelled),
            result = self.inner.transport.execute(&request.url, &request.config) => result,
        };

        match outcome {
            Ok(payload) => {
                let entry = CacheEntry::new(payload);
                let payload = entry.payload.clone();
                // Unconditional write: other sessions benefit even if
                // this call was superseded.
                self.inner.cache.insert(key, entry).await;
                self.apply(my_gen, |state| {
                    state.data = Some(payload);
                    state.loading = false;
                    state.error = None;
                })
                .await;
            }
            Err(err) if err.is_cancelled() => {
                debug!(generation = my_gen, "cancelled, discarding result");
                // Silent, but not inconsistent: stop the spinner if this
                // call is still the newest generation. Data and error
                // stay untouched.
                self.apply(my_gen, |state| state.loading = false).await;
            }
            Err(err) => {
                warn!(generation = my_gen, error = %err, "fetch failed");
                self.apply(my_gen, |state| {
                    state.error = Some(err.to_string());
                    state.loading = false;
                })
                .await;
            }
        }

        self.state().await
    }

    /// Drop the cached entry for (url, config), if present.
    pub async fn invalidate(&self, url: &str, config: &RequestConfig) {
        self.inner
            .cache
            .invalidate(&CacheKey::derive(url, config))
            .await;
    }

    /// Invalidate the current request's cache entry and resolve it again.
    ///
    /// No-op returning the current state if nothing has been resolved yet.
    pub async fn refetch(&self) -> FetchState {
        let current = {
            let active = self.inner.active.lock().await;
            active
                .as_ref()
                .map(|a| (a.request.clone(), a.parent.clone()))
        };

        let Some((request, parent)) = current else {
            return self.state().await;
        };

        let key = CacheKey::derive(&request.url, &request.config);
        self.inner.cache.invalidate(&key).await;
        self.resolve(request, parent).await
    }

    /// Cancel the in-flight call, if any (consumer teardown).
    pub async fn abort(&self) {
        let active = self.inner.active.lock().await;
        if let Some(active) = active.as_ref() {
            active.token.cancel();
        }
    }

    /// Allocate the next generation and install the new call as active,
    /// cancelling the previous in-flight call. Generation allocation and
    /// the token swap happen under one lock so they cannot interleave
    /// out of order across concurrent resolves.
    async fn begin_call(
        &self,
        request: FetchRequest,
        parent: CancellationToken,
    ) -> (u64, CancellationToken) {
        let mut active = self.inner.active.lock().await;
        let my_gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let token = parent.child_token();

        if let Some(previous) = active.replace(Active {
            request,
            parent,
            token: token.clone(),
        }) {
            previous.token.cancel();
        }

        (my_gen, token)
    }

    /// Empty-URL short circuit: cancel any in-flight call and return the
    /// visible state to idle. Allocates a generation so a late result
    /// from a previous call cannot resurface.
    async fn reset_to_idle(&self) {
        let my_gen = {
            let mut active = self.inner.active.lock().await;
            let my_gen = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(previous) = active.take() {
                previous.token.cancel();
            }
            my_gen
        };

        self.apply(my_gen, |state| *state = FetchState::default())
            .await;
    }

    /// Mutate the visible state, but only if `my_gen` is still the
    /// highest generation issued. The check happens under the state
    /// write lock so a newer generation cannot be overtaken.
    async fn apply<F>(&self, my_gen: u64, mutate: F) -> bool
    where
        F: FnOnce(&mut FetchState),
    {
        let mut state = self.inner.state.write().await;
        if my_gen != self.inner.generation.load(Ordering::SeqCst) {
            debug!(generation = my_gen, "superseded, discarding");
            return false;
        }
        mutate(&mut state);
        true
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::fetch::mock::MockTransport;

    fn session_with(transport: &MockTransport) -> (FetchSession, ResponseCache) {
        let cache = ResponseCache::default();
        let session = FetchSession::new(cache.clone(), Arc::new(transport.clone()));
        (session, cache)
    }

    #[tokio::test]
    async fn empty_url_is_an_idle_noop() {
        let transport = MockTransport::new();
        let (session, _) = session_with(&transport);

        let state = session
            .resolve(FetchRequest::get(""), CancellationToken::new())
            .await;

        assert!(state.data.is_none());
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(transport.requests_served(), 0);
    }

    #[tokio::test]
    async fn fetch_populates_state_and_cache() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/paris", json!({"city": "Paris"}));
        let (session, cache) = session_with(&transport);

        let state = session
            .resolve(
                FetchRequest::get("https://api.example.com/d/paris"),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(*state.data.unwrap(), json!({"city": "Paris"}));
        assert!(!state.loading);
        assert!(state.error.is_none());

        let key = CacheKey::derive("https://api.example.com/d/paris", &RequestConfig::new());
        assert!(cache.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn fresh_cache_entry_skips_the_network() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/rome", json!({"city": "Rome"}));
        let (session, _) = session_with(&transport);

        let request = FetchRequest::get("https://api.example.com/d/rome");
        session
            .resolve(request.clone(), CancellationToken::new())
            .await;
        let state = session.resolve(request, CancellationToken::new()).await;

        assert_eq!(transport.requests_served(), 1);
        assert_eq!(*state.data.unwrap(), json!({"city": "Rome"}));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_cache_entry_triggers_a_fetch() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/oslo", json!({"v": "old"}));
        let (session, _) = session_with(&transport);

        let request = FetchRequest::get("https://api.example.com/d/oslo");
        session
            .resolve(request.clone(), CancellationToken::new())
            .await;
        assert_eq!(transport.requests_served(), 1);

        // Age the entry past the default staleness window.
        tokio::time::advance(Duration::from_secs(10 * 60)).await;

        transport.respond("https://api.example.com/d/oslo", json!({"v": "new"}));
        let state = session.resolve(request, CancellationToken::new()).await;

        assert_eq!(transport.requests_served(), 2);
        assert_eq!(*state.data.unwrap(), json!({"v": "new"}));
    }

    #[tokio::test]
    async fn invalidate_then_resolve_hits_the_network_again() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/lima", json!(1));
        let (session, _) = session_with(&transport);

        let request = FetchRequest::get("https://api.example.com/d/lima");
        session
            .resolve(request.clone(), CancellationToken::new())
            .await;
        session
            .invalidate("https://api.example.com/d/lima", &RequestConfig::new())
            .await;
        session.resolve(request, CancellationToken::new()).await;

        assert_eq!(transport.requests_served(), 2);
    }

    #[tokio::test]
    async fn refetch_bypasses_a_fresh_entry() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/bern", json!({"v": 1}));
        let (session, _) = session_with(&transport);

        session
            .resolve(
                FetchRequest::get("https://api.example.com/d/bern"),
                CancellationToken::new(),
            )
            .await;

        transport.respond("https://api.example.com/d/bern", json!({"v": 2}));
        let state = session.refetch().await;

        assert_eq!(transport.requests_served(), 2);
        assert_eq!(*state.data.unwrap(), json!({"v": 2}));
    }

    #[tokio::test]
    async fn refetch_before_any_resolve_is_a_noop() {
        let transport = MockTransport::new();
        let (session, _) = session_with(&transport);

        let state = session.refetch().await;

        assert!(state.data.is_none());
        assert_eq!(transport.requests_served(), 0);
    }

    #[tokio::test]
    async fn failure_surfaces_error_and_preserves_data() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/kyiv", json!({"v": "shown"}));
        let (session, _) = session_with(&transport);

        session
            .resolve(
                FetchRequest::get("https://api.example.com/d/kyiv"),
                CancellationToken::new(),
            )
            .await;

        transport.fail(
            "https://api.example.com/d/kyiv",
            FetchError::Http {
                status: 500,
                message: "boom".into(),
            },
        );
        let state = session.refetch().await;

        assert_eq!(state.error.as_deref(), Some("HTTP error 500: boom"));
        assert!(!state.loading);
        // Previously displayed payload survives the failed refresh.
        assert_eq!(*state.data.unwrap(), json!({"v": "shown"}));
    }

    #[tokio::test]
    async fn failed_generation_recovers_on_refetch() {
        let transport = MockTransport::new();
        transport.fail(
            "https://api.example.com/d/baku",
            FetchError::Decode("bad json".into()),
        );
        let (session, _) = session_with(&transport);

        let state = session
            .resolve(
                FetchRequest::get("https://api.example.com/d/baku"),
                CancellationToken::new(),
            )
            .await;
        assert!(state.error.is_some());

        transport.respond("https://api.example.com/d/baku", json!({"ok": true}));
        let state = session.refetch().await;

        assert!(state.error.is_none());
        assert_eq!(*state.data.unwrap(), json!({"ok": true}));
    }

    #[tokio::test(start_paused = true)]
    async fn loading_keeps_previous_data_visible() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/riga", json!({"v": "old"}));
        let (session, _) = session_with(&transport);

        session
            .resolve(
                FetchRequest::get("https://api.example.com/d/riga"),
                CancellationToken::new(),
            )
            .await;

        transport.respond_after(
            "https://api.example.com/d/riga",
            json!({"v": "new"}),
            Duration::from_millis(100),
        );

        let refresher = {
            let session = session.clone();
            tokio::spawn(async move { session.refetch().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let during = session.state().await;
        assert!(during.loading);
        assert_eq!(*during.data.unwrap(), json!({"v": "old"}));

        let after = refresher.await.unwrap();
        assert!(!after.loading);
        assert_eq!(*after.data.unwrap(), json!({"v": "new"}));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_resolve_supersedes_an_in_flight_older_one() {
        let transport = MockTransport::new();
        transport.respond_after(
            "https://api.example.com/d/slow",
            json!({"from": "slow"}),
            Duration::from_millis(100),
        );
        transport.respond_after(
            "https://api.example.com/d/fast",
            json!({"from": "fast"}),
            Duration::from_millis(5),
        );
        let (session, _) = session_with(&transport);

        let older = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .resolve(
                        FetchRequest::get("https://api.example.com/d/slow"),
                        CancellationToken::new(),
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;

        let state = session
            .resolve(
                FetchRequest::get("https://api.example.com/d/fast"),
                CancellationToken::new(),
            )
            .await;
        older.await.unwrap();

        let final_state = session.state().await;
        assert_eq!(*final_state.data.unwrap(), json!({"from": "fast"}));
        assert!(final_state.error.is_none());
        assert!(!final_state.loading);
        assert_eq!(*state.data.unwrap(), json!({"from": "fast"}));
    }

    #[tokio::test]
    async fn superseded_generation_cannot_write_state() {
        let transport = MockTransport::new();
        let (session, _) = session_with(&transport);

        // Generation 1 issued, then generation 2 issued.
        let (gen1, _) = session
            .begin_call(FetchRequest::get("https://a"), CancellationToken::new())
            .await;
        let (gen2, _) = session
            .begin_call(FetchRequest::get("https://b"), CancellationToken::new())
            .await;

        // Generation 2 applies first, then generation 1 completes late.
        assert!(
            session
                .apply(gen2, |state| state.data = Some(Arc::new(json!("newest"))))
                .await
        );
        assert!(
            !session
                .apply(gen1, |state| state.data = Some(Arc::new(json!("stale"))))
                .await
        );

        let state = session.state().await;
        assert_eq!(*state.data.unwrap(), json!("newest"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_silent() {
        let transport = MockTransport::new();
        transport.respond_after(
            "https://api.example.com/d/never",
            json!({"v": 1}),
            Duration::from_secs(60),
        );
        let (session, cache) = session_with(&transport);

        let token = CancellationToken::new();
        let handle = {
            let session = session.clone();
            let token = token.clone();
            tokio::spawn(async move {
                session
                    .resolve(FetchRequest::get("https://api.example.com/d/never"), token)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        handle.await.unwrap();

        let state = session.state().await;
        assert!(state.error.is_none());
        assert!(state.data.is_none());
        // The cancelled call clears its own loading flag.
        assert!(!state.loading);

        // The cancelled request never populated the cache either.
        let key = CacheKey::derive("https://api.example.com/d/never", &RequestConfig::new());
        assert!(cache.get(&key).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn abort_cancels_the_in_flight_call() {
        let transport = MockTransport::new();
        transport.respond_after(
            "https://api.example.com/d/away",
            json!({"v": 1}),
            Duration::from_secs(60),
        );
        let (session, _) = session_with(&transport);

        let handle = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .resolve(
                        FetchRequest::get("https://api.example.com/d/away"),
                        CancellationToken::new(),
                    )
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.abort().await;
        handle.await.unwrap();

        let state = session.state().await;
        assert!(state.error.is_none());
        assert!(state.data.is_none());
        assert!(!state.loading);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_keeps_prior_cache_entry() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/kept", json!({"v": "cached"}));
        let (session, cache) = session_with(&transport);

        let request = FetchRequest::get("https://api.example.com/d/kept");
        session
            .resolve(request.clone(), CancellationToken::new())
            .await;

        // Re-resolve with a zero staleness window so the network is hit,
        // then cancel mid-flight.
        transport.respond_after(
            "https://api.example.com/d/kept",
            json!({"v": "never"}),
            Duration::from_secs(60),
        );
        let handle = {
            let session = session.clone();
            let request = request.clone().with_staleness(Duration::ZERO);
            tokio::spawn(async move { session.resolve(request, CancellationToken::new()).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        session.abort().await;
        handle.await.unwrap();

        let key = CacheKey::derive("https://api.example.com/d/kept", &RequestConfig::new());
        let entry = cache.get(&key).await.unwrap();
        assert_eq!(*entry.payload, json!({"v": "cached"}));
    }

    #[tokio::test]
    async fn empty_url_resets_previous_state() {
        let transport = MockTransport::new();
        transport.respond("https://api.example.com/d/gone", json!({"v": 1}));
        let (session, _) = session_with(&transport);

        session
            .resolve(
                FetchRequest::get("https://api.example.com/d/gone"),
                CancellationToken::new(),
            )
            .await;
        let state = session
            .resolve(FetchRequest::get(""), CancellationToken::new())
            .await;

        assert!(state.data.is_none());
        assert!(!state.loading);
        assert!(state.error.is_none());
    }
}
