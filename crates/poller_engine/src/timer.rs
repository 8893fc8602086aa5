use std::sync::mpsc;
use std::time::Duration;

use poller_logging::poller_debug;
use tokio::runtime::Handle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{EngineEvent, JobId};

/// Interval task that emits `EngineEvent::PollTick` for one job until
/// cancelled. Dropping the timer cancels it.
#[derive(Debug)]
pub struct PollTimer {
    job_id: JobId,
    token: CancellationToken,
}

impl PollTimer {
    /// Starts ticking on `runtime`. The first tick fires one `period` from now.
    pub fn spawn(
        runtime: &Handle,
        job_id: JobId,
        period: Duration,
        event_tx: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let token = CancellationToken::new();
        let child = token.child_token();

        runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            // A slow consumer gets one tick, not a burst of catch-up ticks.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if event_tx.send(EngineEvent::PollTick { job_id }).is_err() {
                            break;
                        }
                    }
                }
            }
            poller_debug!("poll timer for job_id={} stopped", job_id);
        });

        Self { job_id, token }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollTimer {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
