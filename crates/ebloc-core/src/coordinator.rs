// ── Refresh coordinator ──
//
// Owns one account's session and published snapshot. Runs refresh
// cycles on a fixed period and on demand, never more than one at a
// time, and keeps the last good snapshot visible when a cycle fails.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use chrono::Utc;
use ebloc_api::{Endpoint, HomeRecord, MeterRecord, PortalClient, ReceiptRecord};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::error::CoreError;
use crate::fetcher::{Fetched, endpoint_params, fetch};
use crate::session::SessionManager;
use crate::snapshot::Snapshot;

/// Whether a refresh cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
}

type CycleOutcome = Result<Arc<Snapshot>, CoreError>;

/// State guarded by the flight lock. Holding the lock is what makes a
/// cycle single-flight.
struct Flight {
    session: SessionManager,
    last_outcome: Option<CycleOutcome>,
}

// ── RefreshCoordinator ───────────────────────────────────────────────

/// Periodic poller for one apartment account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Call
/// [`start()`](Self::start) for the first refresh and the background
/// schedule, then read through [`snapshot()`](Self::snapshot) or
/// [`subscribe()`](Self::subscribe).
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: PortalConfig,
    flight: Mutex<Flight>,
    snapshot: ArcSwapOption<Snapshot>,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    state: watch::Sender<RefreshState>,
    last_error: ArcSwapOption<CoreError>,
    /// Cycles that have run to completion, successful or not.
    completed: AtomicU64,
    /// Cycles that have begun. Merged triggers do not count.
    started: AtomicU64,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl RefreshCoordinator {
    /// Create a coordinator. Does NOT touch the network; call
    /// [`start()`](Self::start) to run the first refresh.
    pub fn new(config: PortalConfig) -> Self {
        let session = SessionManager::new(&config);
        let (snapshot_tx, _) = watch::channel(None);
        let (state, _) = watch::channel(RefreshState::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                flight: Mutex::new(Flight {
                    session,
                    last_outcome: None,
                }),
                snapshot: ArcSwapOption::empty(),
                snapshot_tx,
                state,
                last_error: ArcSwapOption::empty(),
                completed: AtomicU64::new(0),
                started: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run the first refresh, then spawn the periodic task.
    ///
    /// A failing first refresh fails start and no task is spawned.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.refresh().await?;

        let period = self.inner.config.refresh_interval;
        if period.is_zero() {
            debug!("periodic refresh disabled");
        } else {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.child_token();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(refresh_task(coordinator, period, cancel)));
            info!(interval_secs = period.as_secs(), "periodic refresh scheduled");
        }

        Ok(snapshot)
    }

    /// Stop background work and close the portal session.
    ///
    /// A cycle already in flight runs to completion first. Terminal: once
    /// this returns no further cycle starts and the session stays closed.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.inner.flight.lock().await.session.close();
        debug!("refresh coordinator shut down");
    }

    // ── Refresh ──────────────────────────────────────────────────────

    /// Run a refresh cycle now, or join the one already in flight.
    ///
    /// Triggers that arrive while a cycle runs wait for it and share its
    /// outcome instead of starting another. The cycle runs on its own
    /// task, so dropping this future does not abandon it half-way.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let seen = self.inner.completed.load(Ordering::Acquire);
        let coordinator = self.clone();
        tokio::spawn(async move { coordinator.refresh_after(seen).await })
            .await
            .unwrap_or_else(|e| Err(CoreError::Internal(format!("refresh task failed: {e}"))))
    }

    /// Cycle body. `seen` is the completed-cycle count observed by the
    /// trigger; a different count under the lock means a cycle finished
    /// while this one waited.
    async fn refresh_after(&self, seen: u64) -> CycleOutcome {
        let mut flight = self.inner.flight.lock().await;

        let finished_meanwhile = self.inner.completed.load(Ordering::Acquire) != seen;
        if let Some(outcome) = flight.last_outcome.clone().filter(|_| finished_meanwhile) {
            debug!("refresh merged into the cycle that just finished");
            return outcome;
        }
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ShutDown);
        }

        let cycle = self.inner.started.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.state.send_replace(RefreshState::Refreshing);
        debug!(cycle, "refresh cycle started");

        let outcome = self.run_cycle(&mut flight.session).await;
        match &outcome {
            Ok(snapshot) => self.publish(Arc::clone(snapshot)),
            Err(e) => {
                warn!(cycle, error = %e, "refresh failed, keeping previous snapshot");
                self.inner.last_error.store(Some(Arc::new(e.clone())));
            }
        }

        flight.last_outcome = Some(outcome.clone());
        self.inner.completed.fetch_add(1, Ordering::Release);
        self.inner.state.send_replace(RefreshState::Idle);
        outcome
    }

    /// Manual refresh in the background; merges with any cycle in flight.
    ///
    /// The task is tracked like the periodic one, so
    /// [`shutdown()`](Self::shutdown) waits for it.
    pub async fn request_refresh(&self) {
        if self.inner.cancel.is_cancelled() {
            debug!("refresh requested after shutdown, ignoring");
            return;
        }

        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = coordinator.refresh().await {
                debug!(error = %e, "requested refresh failed");
            }
        });

        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    async fn run_cycle(&self, session: &mut SessionManager) -> CycleOutcome {
        let config = &self.inner.config;
        let month = config.reading_month();

        session
            .ensure_session()
            .map_err(CoreError::refresh_failed)?;
        if !session.is_authenticated() {
            session
                .authenticate(&config.credentials)
                .await
                .map_err(CoreError::refresh_failed)?;
        }

        let client = session.client().map_err(CoreError::refresh_failed)?;
        let mut batch = fetch_all(client, config, &month).await;

        if batch.session_expired() {
            info!("portal session expired, logging in again");
            session.invalidate();
            session
                .authenticate(&config.credentials)
                .await
                .map_err(CoreError::refresh_failed)?;
            let client = session.client().map_err(CoreError::refresh_failed)?;
            batch = fetch_all(client, config, &month).await;
            if batch.session_expired() {
                warn!("session expired again right after login");
                session.invalidate();
            }
        }

        let snapshot = batch.into_snapshot();
        info!(
            home = snapshot.home.len(),
            index = snapshot.index.len(),
            receipts = snapshot.receipts.len(),
            failed = snapshot.failed.len(),
            "refresh complete"
        );
        Ok(Arc::new(snapshot))
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        self.inner.snapshot.store(Some(Arc::clone(&snapshot)));
        self.inner.snapshot_tx.send_replace(Some(snapshot));
        self.inner.last_error.store(None);
    }

    // ── Consumer surface ─────────────────────────────────────────────

    /// The last successfully published snapshot, if any.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.snapshot.load_full()
    }

    /// Watch channel carrying every newly published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn state(&self) -> RefreshState {
        *self.inner.state.borrow()
    }

    /// Watch channel for refresh state transitions.
    pub fn state_changes(&self) -> watch::Receiver<RefreshState> {
        self.inner.state.subscribe()
    }

    /// Error of the most recent cycle, cleared by the next success.
    pub fn last_error(&self) -> Option<CoreError> {
        self.inner.last_error.load_full().map(|e| (*e).clone())
    }

    /// Whether the portal session is currently logged in. Waits for a
    /// cycle in flight.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.flight.lock().await.session.is_authenticated()
    }

    /// Number of refresh cycles that have actually started.
    pub fn cycles_started(&self) -> u64 {
        self.inner.started.load(Ordering::Relaxed)
    }
}

// ── Cycle internals ──────────────────────────────────────────────────

struct FetchBatch {
    home: Fetched<HomeRecord>,
    index: Fetched<MeterRecord>,
    receipts: Fetched<ReceiptRecord>,
}

impl FetchBatch {
    fn session_expired(&self) -> bool {
        self.home.is_session_expired()
            || self.index.is_session_expired()
            || self.receipts.is_session_expired()
    }

    fn into_snapshot(self) -> Snapshot {
        let failed = [
            (Endpoint::HomeInfo, self.home.is_data()),
            (Endpoint::MeterIndex, self.index.is_data()),
            (Endpoint::Receipts, self.receipts.is_data()),
        ]
        .into_iter()
        .filter_map(|(endpoint, ok)| (!ok).then_some(endpoint))
        .collect();

        Snapshot {
            home: self.home.into_records(),
            index: self.index.into_records(),
            receipts: self.receipts.into_records(),
            fetched_at: Utc::now(),
            failed,
        }
    }
}

/// Fetch the three endpoints concurrently.
async fn fetch_all(client: &PortalClient, config: &PortalConfig, month: &str) -> FetchBatch {
    let creds = &config.credentials;
    let home_params = endpoint_params(Endpoint::HomeInfo, creds, month);
    let index_params = endpoint_params(Endpoint::MeterIndex, creds, month);
    let receipt_params = endpoint_params(Endpoint::Receipts, creds, month);

    let (home, index, receipts) = tokio::join!(
        fetch::<HomeRecord>(client, Endpoint::HomeInfo, &home_params),
        fetch::<MeterRecord>(client, Endpoint::MeterIndex, &index_params),
        fetch::<ReceiptRecord>(client, Endpoint::Receipts, &receipt_params),
    );

    FetchBatch {
        home,
        index,
        receipts,
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Periodic refresh. Failures are logged and the loop keeps going; the
/// last good snapshot stays published.
async fn refresh_task(coordinator: RefreshCoordinator, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = coordinator.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }

    debug!("refresh task stopped");
}
