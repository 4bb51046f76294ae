use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::source::{PollSource, PollStatus};
use super::worker::{poll_loop, WorkerContext};

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Drives one [`PollSource`] on a fixed interval, with manual refresh and
/// parameter reconfiguration.
///
/// Rules enforced here rather than in the sources:
/// - at most one fetch in flight per controller; a tick that would overlap
///   is skipped, and rapid manual refreshes coalesce into the in-flight one
/// - `reconfigure` supersedes the in-flight request: its eventual result is
///   discarded via a generation counter compared at resolution time, so the
///   stores only ever reflect the most recently requested parameter set
/// - a failed fetch keeps the last good data and retries on the next tick at
///   the same interval, surfacing a transient error flag in [`PollStatus`]
pub struct PollingController<S: PollSource> {
    source: Arc<S>,
    params_tx: watch::Sender<S::Params>,
    refresh: Arc<Notify>,
    generation: Arc<AtomicU64>,
    in_flight: Arc<AtomicBool>,
    status: Arc<Mutex<PollStatus>>,
    debounce: Duration,
    cancel: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
}

impl<S: PollSource> PollingController<S> {
    pub fn new(source: Arc<S>, initial_params: S::Params) -> Self {
        let (params_tx, _) = watch::channel(initial_params);
        Self {
            source,
            params_tx,
            refresh: Arc::new(Notify::new()),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(PollStatus::default())),
            debounce: DEFAULT_DEBOUNCE,
            cancel: None,
            handle: None,
        }
    }

    /// Shorten or lengthen the reconfigure debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start the poll loop. The first fetch fires immediately, then every
    /// `every` until [`stop`](Self::stop).
    pub fn start(&mut self, every: Duration) -> Result<()> {
        if self.handle.is_some() {
            bail!("poll loop already running");
        }

        // A fetch superseded by the previous stop() never cleared its flags.
        self.in_flight.store(false, Ordering::SeqCst);
        if let Ok(mut status) = self.status.lock() {
            status.fetching = false;
        }

        let cancel = CancellationToken::new();
        let ctx = WorkerContext {
            source: Arc::clone(&self.source),
            params_rx: self.params_tx.subscribe(),
            refresh: Arc::clone(&self.refresh),
            generation: Arc::clone(&self.generation),
            in_flight: Arc::clone(&self.in_flight),
            status: Arc::clone(&self.status),
            every,
            debounce: self.debounce,
            cancel: cancel.clone(),
        };

        self.handle = Some(tokio::spawn(poll_loop(ctx)));
        self.cancel = Some(cancel);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Force a fetch outside the schedule. Coalesces: while a fetch is in
    /// flight this is a no-op, so hammering refresh never stacks requests.
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    /// Swap the parameter set (a time-range change, a new subject roster).
    /// Any in-flight fetch is superseded immediately; after a short debounce
    /// the loop fetches with the latest parameters.
    pub fn reconfigure(&self, params: S::Params) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.params_tx.send_replace(params);
    }

    pub fn current_params(&self) -> S::Params {
        self.params_tx.borrow().clone()
    }

    pub fn status(&self) -> PollStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or_default()
    }

    /// Stop polling and cancel pending timers. Results of fetches that are
    /// still in flight will be discarded when they resolve. Safe to call
    /// repeatedly.
    pub async fn stop(&mut self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        if let Some(handle) = self.handle.take() {
            handle.await.context("poll loop task failed to join")?;
        }
        Ok(())
    }
}
