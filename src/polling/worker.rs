use chrono::Utc;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::source::{PollSource, PollStatus};

pub(super) struct WorkerContext<S: PollSource> {
    pub source: Arc<S>,
    pub params_rx: watch::Receiver<S::Params>,
    pub refresh: Arc<Notify>,
    pub generation: Arc<AtomicU64>,
    pub in_flight: Arc<AtomicBool>,
    pub status: Arc<Mutex<PollStatus>>,
    pub every: Duration,
    pub debounce: Duration,
    pub cancel: CancellationToken,
}

pub(super) async fn poll_loop<S: PollSource>(mut ctx: WorkerContext<S>) {
    let mut ticker = interval(ctx.every);
    // A tick that lands while a fetch is outstanding is skipped, not queued;
    // queued ticks would defeat the no-overlap rule on slow networks.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = ctx.cancel.cancelled() => {
                debug!("{}: poll loop shutting down", ctx.source.name());
                break;
            }
            _ = ctx.refresh.notified() => {
                // Manual refresh wins over a tick due at the same moment.
                spawn_fetch(&ctx, false);
                ticker.reset();
            }
            changed = ctx.params_rx.changed() => {
                if changed.is_err() {
                    debug!("{}: params channel closed, stopping", ctx.source.name());
                    break;
                }
                // Rapid reconfigurations (a user scrubbing through time
                // ranges) collapse into one fetch for the final value.
                loop {
                    match timeout(ctx.debounce, ctx.params_rx.changed()).await {
                        Ok(Ok(())) => continue,
                        Ok(Err(_)) | Err(_) => break,
                    }
                }
                let _ = ctx.params_rx.borrow_and_update();
                // The in-flight fetch, if any, was made stale by the
                // generation bump in reconfigure(); supersede it now.
                spawn_fetch(&ctx, true);
                ticker.reset();
            }
            _ = ticker.tick() => {
                spawn_fetch(&ctx, false);
            }
        }
    }
}

fn spawn_fetch<S: PollSource>(ctx: &WorkerContext<S>, supersede: bool) {
    if !supersede && ctx.in_flight.load(Ordering::SeqCst) {
        debug!("{}: fetch already in flight, skipping", ctx.source.name());
        return;
    }

    let generation = ctx.generation.load(Ordering::SeqCst);
    let params = ctx.params_rx.borrow().clone();

    ctx.in_flight.store(true, Ordering::SeqCst);
    if let Ok(mut status) = ctx.status.lock() {
        status.fetching = true;
    }

    let source = Arc::clone(&ctx.source);
    let generation_counter = Arc::clone(&ctx.generation);
    let in_flight = Arc::clone(&ctx.in_flight);
    let status = Arc::clone(&ctx.status);

    tokio::spawn(async move {
        let result = source.fetch(params.clone()).await;

        if generation_counter.load(Ordering::SeqCst) != generation {
            // Superseded while in flight; a newer request owns the flags now.
            debug!("{}: discarding stale response", source.name());
            return;
        }

        in_flight.store(false, Ordering::SeqCst);
        match result {
            Ok(payload) => {
                source.apply(&params, payload).await;
                if let Ok(mut status) = status.lock() {
                    status.fetching = false;
                    status.last_error = None;
                    status.last_success_at = Some(Utc::now());
                }
            }
            Err(err) => {
                // Previous data stays in place; the next tick retries at the
                // same interval.
                warn!("{}: fetch failed: {:#}", source.name(), err);
                if let Ok(mut status) = status.lock() {
                    status.fetching = false;
                    status.last_error = Some(err.to_string());
                }
            }
        }
    });
}
