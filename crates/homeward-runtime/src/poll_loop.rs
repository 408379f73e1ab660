//! Poll loop: wires stores → signal providers → detection cycle → dispatcher.
//! Runs as a tokio task, one cycle per interval, at most one cycle in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{Duration, MissedTickBehavior, interval};

use homeward_core::{RuleVerdict, run_cycle};
use homeward_store::{
    Dispatcher, LogDispatcher, OutboxDispatcher, RuleStore, SignalProvider, SnapshotFileProvider,
    StateStore, acquire,
};

use crate::cli::{DaemonOpts, SignalOpts};

/// Consecutive failed cycles before failures are logged at `error`.
const FAILURE_ESCALATION_THRESHOLD: u32 = 3;

/// The injected collaborators of a detection cycle.
#[derive(Clone)]
pub struct Collaborators {
    pub rules: Arc<dyn RuleStore>,
    pub state: Arc<dyn StateStore>,
    pub signals: Arc<dyn SignalProvider>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl Collaborators {
    /// File-backed collaborators for the CLI.
    pub fn from_opts(
        rules: Arc<dyn RuleStore>,
        state: Arc<dyn StateStore>,
        opts: &SignalOpts,
    ) -> Self {
        let mut provider = SnapshotFileProvider::new(&opts.signals);
        if let Some(secs) = opts.signals_max_age_secs {
            provider = provider.with_max_age(chrono::TimeDelta::seconds(i64::from(secs)));
        }
        let dispatcher: Arc<dyn Dispatcher> = match &opts.outbox {
            Some(path) => Arc::new(OutboxDispatcher::new(path)),
            None => Arc::new(LogDispatcher),
        };
        Self {
            rules,
            state,
            signals: Arc::new(provider),
            dispatcher,
        }
    }
}

/// Summary of one committed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub fired: Vec<String>,
    pub evaluated: usize,
    pub skipped_rules: usize,
    pub cooldown_blocked: Vec<String>,
    pub dispatch_failures: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    Completed(TickReport),
    /// A previous cycle was still running, or the daemon is shutting down.
    Skipped,
}

/// Orchestrates detection cycles. Owns no detector state: every cycle reads
/// it from the state store and commits its replacement there.
pub struct DetectionCycle {
    collab: Collaborators,
    /// Held for the whole of a cycle, commit and dispatch included.
    in_flight: Mutex<()>,
    closed: AtomicBool,
    consecutive_failures: AtomicU32,
}

impl DetectionCycle {
    pub fn new(collab: Collaborators) -> Self {
        Self {
            collab,
            in_flight: Mutex::new(()),
            closed: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    #[cfg(test)]
    fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Run one cycle at `now`, or skip it if another is in flight or the
    /// cycle has been shut down.
    ///
    /// On error nothing has been committed: the stored state is the one the
    /// previous successful cycle wrote.
    pub async fn tick(&self, now: DateTime<Utc>) -> anyhow::Result<TickResult> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            return Ok(TickResult::Skipped);
        };
        if self.closed.load(Ordering::SeqCst) {
            return Ok(TickResult::Skipped);
        }
        self.run(now).await.map(TickResult::Completed)
    }

    /// Refuse further ticks and wait for the one in flight, if any, to finish
    /// dispatching what it committed.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _guard = self.in_flight.lock().await;
    }

    /// [`tick`](Self::tick) with failures logged and counted instead of returned.
    pub async fn tick_logged(&self, now: DateTime<Utc>) -> Option<TickReport> {
        match self.tick(now).await {
            Ok(TickResult::Completed(report)) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                if !report.fired.is_empty() {
                    tracing::info!("fired: {}", report.fired.join(", "));
                }
                Some(report)
            }
            Ok(TickResult::Skipped) => {
                tracing::debug!("previous cycle still running, tick skipped");
                None
            }
            Err(e) => {
                let n = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                if n >= FAILURE_ESCALATION_THRESHOLD {
                    tracing::error!(
                        "detection cycle failed ({n} in a row), keeping previous state: {e:#}"
                    );
                } else {
                    tracing::warn!("detection cycle failed, keeping previous state: {e:#}");
                }
                None
            }
        }
    }

    async fn run(&self, now: DateTime<Utc>) -> anyhow::Result<TickReport> {
        // 1. Rules and previous state (blocking IO)
        let store = Arc::clone(&self.collab.rules);
        let rules = tokio::task::spawn_blocking(move || store.load_rules()).await??;

        let store = Arc::clone(&self.collab.state);
        let state = tokio::task::spawn_blocking(move || store.load_state()).await??;

        // 2. Signals; failures degrade to absent fields
        let provider = Arc::clone(&self.collab.signals);
        let snapshot = tokio::task::spawn_blocking(move || acquire(&*provider, now)).await?;

        // 3. Pure evaluation
        let outcome = run_cycle(&rules, &snapshot, &state, now);

        let mut report = TickReport {
            evaluated: outcome.evaluations.len(),
            skipped_rules: outcome.skipped,
            ..TickReport::default()
        };
        for (rule_id, verdict) in &outcome.verdicts {
            match verdict {
                RuleVerdict::CooldownBlocked { remaining_ms } => {
                    tracing::debug!("{rule_id}: entry blocked by cooldown ({remaining_ms}ms left)");
                    report.cooldown_blocked.push(rule_id.clone());
                }
                RuleVerdict::Exited => tracing::debug!("{rule_id}: left, re-armed"),
                _ => {}
            }
        }

        // 4. Commit before dispatching, so a failed save never double-notifies
        let store = Arc::clone(&self.collab.state);
        let next_state = outcome.next_state;
        tokio::task::spawn_blocking(move || store.save_state(&next_state)).await??;

        // 5. Fire and forget
        for rule in outcome.fired {
            report.fired.push(rule.id.clone());
            let dispatcher = Arc::clone(&self.collab.dispatcher);
            let rule_id = rule.id.clone();
            match tokio::task::spawn_blocking(move || dispatcher.notify(&rule, now)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!("dispatch failed for {rule_id}: {e}");
                    report.dispatch_failures += 1;
                }
                Err(e) => {
                    tracing::warn!("dispatch task failed for {rule_id}: {e}");
                    report.dispatch_failures += 1;
                }
            }
        }

        Ok(report)
    }
}

/// Run the daemon: validates configuration, then polls until shutdown.
pub async fn run_daemon(opts: DaemonOpts, collab: Collaborators) -> anyhow::Result<()> {
    // Fail fast on a broken rules file; later failures only skip cycles.
    let store = Arc::clone(&collab.rules);
    let rules = tokio::task::spawn_blocking(move || {
        let rules = store.load_rules()?;
        store.load_config()?;
        Ok::<_, homeward_store::StoreError>(rules)
    })
    .await??;
    tracing::info!(
        "loaded {} rules ({} active), polling every {}s",
        rules.len(),
        rules.iter().filter(|r| r.is_active()).count(),
        opts.interval_secs
    );

    let cycle = Arc::new(DetectionCycle::new(collab));
    let mut poll_handle = tokio::spawn(run_poll_loop(Arc::clone(&cycle), opts.interval_secs));

    tokio::select! {
        () = shutdown_signal() => {}
        _ = &mut poll_handle => {
            tracing::warn!("poll loop exited unexpectedly");
        }
    }

    poll_handle.abort();
    tracing::debug!("waiting for in-flight cycle");
    cycle.shutdown().await;
    tracing::info!("daemon stopped");
    Ok(())
}

async fn run_poll_loop(cycle: Arc<DetectionCycle>, interval_secs: u64) {
    let mut ticker = interval(Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        // Spawned so a slow cycle never delays the ticker; the in-flight
        // guard skips ticks that arrive while it is still running.
        let cycle = Arc::clone(&cycle);
        tokio::spawn(async move {
            cycle.tick_logged(Utc::now()).await;
        });
    }
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
                return;
            }
            Err(e) => tracing::warn!("cannot listen for SIGTERM: {e}"),
        }
    }

    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received ctrl-c, shutting down");
}

// ─── Tests ───────────────────────────────────────────────────────────
