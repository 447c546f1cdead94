//! Periodic maintenance: stabilize, fix_finger, check_predecessor.
//!
//! Grounded on `legacy/node.go`'s `StabilizerJob`/`FixFingersInBackground`:
//! independent ticker loops, each stoppable without touching the others.
//! Here each loop is a `tokio::task` instead of a goroutine, and the stop
//! signal is a `tokio_util`-style boolean flag read each tick rather than a
//! channel, since a plain poll is enough for a fixed, small tick count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

use crate::ring_node::RingNode;

const STABILIZE_PERIOD: Duration = Duration::from_millis(100);
const FIX_FINGER_PERIOD: Duration = Duration::from_millis(150);
const CHECK_PREDECESSOR_PERIOD: Duration = Duration::from_millis(250);

/// Handle to the three background loops started for a `Member` node.
///
/// Dropping this handle does not stop the loops — call `stop_and_join`
/// explicitly, matching the leave protocol's "stop maintenance loops and
/// wait for them to quiesce" step.
pub struct Maintenance {
    stop: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Maintenance {
    /// Spawns the stabilize, fix_finger, and check_predecessor loops for
    /// `node`. Only valid while `node` is in the `Member` state.
    pub fn start(node: Arc<RingNode>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));

        let stabilize_task = tokio::spawn(run_loop(
            node.clone(),
            stop.clone(),
            STABILIZE_PERIOD,
            |n| async move { n.stabilize().await },
        ));

        let fix_finger_task = {
            let node = node.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                let mut ticker = interval(FIX_FINGER_PERIOD);
                let m = node.params().m;
                let mut i = 1u32;
                while !stop.load(Ordering::Relaxed) {
                    ticker.tick().await;
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = node.fix_finger(i).await {
                        debug!(error = %e, finger = i, "fix_finger failed");
                    }
                    i = i % m + 1;
                }
            })
        };

        let check_predecessor_task = tokio::spawn(run_loop(
            node,
            stop.clone(),
            CHECK_PREDECESSOR_PERIOD,
            |n| async move { n.check_predecessor().await },
        ));

        Self {
            stop,
            tasks: vec![stabilize_task, fix_finger_task, check_predecessor_task],
        }
    }

    /// Signals every loop to stop and waits for all three to exit.
    pub async fn stop_and_join(self) {
        self.stop.store(true, Ordering::Relaxed);
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

async fn run_loop<F, Fut>(node: Arc<RingNode>, stop: Arc<AtomicBool>, period: Duration, action: F)
where
    F: Fn(Arc<RingNode>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let mut ticker = interval(period);
    while !stop.load(Ordering::Relaxed) {
        ticker.tick().await;
        if stop.load(Ordering::Relaxed) {
            break;
        }
        action(node.clone()).await;
    }
}
