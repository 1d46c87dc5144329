//! [`ControlLoop`] – the fixed-rate owner of a [`BridgeNode`].
//!
//! Each tick drains the inbound queue (executing every command that was
//! waiting when the tick started) and then publishes the live state once.
//! [`ControlLoop::run`] repeats this on a tokio interval until a shutdown
//! flag is raised, then drops the node.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use roscom_middleware::BridgeNode;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Shortest accepted tick period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Outcome of a single [`ControlLoop::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Queued commands the engine accepted this tick.
    pub executed: usize,
    /// `false` when a transport fault cut the publish round short.
    pub pushed: bool,
}

/// Totals over a whole [`ControlLoop::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub executed: u64,
    pub failed_pushes: u64,
}

impl LoopStats {
    fn record(&mut self, report: TickReport) {
        self.ticks += 1;
        self.executed += report.executed as u64;
        if !report.pushed {
            self.failed_pushes += 1;
        }
    }
}

pub struct ControlLoop {
    node: BridgeNode,
}

impl ControlLoop {
    pub fn new(node: BridgeNode) -> Self {
        Self { node }
    }

    pub fn node(&self) -> &BridgeNode {
        &self.node
    }

    /// Drain the queue, then push once.
    ///
    /// Commands arriving while the queue is being drained wait for the next
    /// tick.
    pub fn tick(&mut self) -> TickReport {
        let waiting = self.node.pending();
        let mut executed = 0;
        for _ in 0..waiting {
            let Some(command) = self.node.poll() else {
                break;
            };
            if command.execute(self.node.engine().as_ref()) {
                executed += 1;
            }
        }
        let pushed = self.node.push();
        if !pushed {
            warn!("live state publish incomplete this tick");
        }
        TickReport { executed, pushed }
    }

    /// Tick every `period` until `shutdown` is set, then drop the node.
    pub async fn run(&mut self, shutdown: Arc<AtomicBool>, period: Duration) -> LoopStats {
        let period = period.max(MIN_PERIOD);
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis() as u64, "control loop started");

        let mut stats = LoopStats::default();
        while !shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;
            let report = self.tick();
            debug!(executed = report.executed, pushed = report.pushed, "tick");
            stats.record(report);
        }

        self.node.drop();
        info!(
            ticks = stats.ticks,
            executed = stats.executed,
            failed_pushes = stats.failed_pushes,
            "control loop stopped"
        );
        stats
    }
}
