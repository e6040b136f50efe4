// src/ingest/scheduler.rs
use metrics::counter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::ingest::Watcher;

/// At most one cycle in flight. Acquiring never waits.
#[derive(Debug, Default)]
pub struct CycleGate {
    busy: AtomicBool,
}

/// Held for the lifetime of a running cycle; releases the gate on drop
/// (including when the cycle task panics or is aborted).
#[derive(Debug)]
pub struct CyclePermit {
    gate: Arc<CycleGate>,
}

impl CycleGate {
    pub fn try_acquire(self: &Arc<Self>) -> Option<CyclePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CyclePermit { gate: self.clone() })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for CyclePermit {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Started,
    Skipped,
}

/// Start a cycle in the background unless one is still running.
/// Busy ticks are dropped, not queued.
pub fn trigger(gate: &Arc<CycleGate>, watcher: &Arc<Watcher>) -> TickOutcome {
    let Some(permit) = gate.try_acquire() else {
        counter!("discovery_ticks_skipped_total").increment(1);
        tracing::debug!(target: "ingest", "previous cycle still running, tick skipped");
        return TickOutcome::Skipped;
    };
    let watcher = watcher.clone();
    tokio::spawn(async move {
        let _permit = permit;
        watcher.run_cycle().await;
    });
    TickOutcome::Started
}

/// Fire `trigger` every `period`, first tick immediately. No catch-up.
pub fn spawn_scheduler(watcher: Arc<Watcher>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let gate = Arc::new(CycleGate::default());
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(target: "ingest", period_secs = period.as_secs(), "discovery scheduler started");
        loop {
            ticker.tick().await;
            trigger(&gate, &watcher);
        }
    })
}
