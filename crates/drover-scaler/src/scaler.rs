//! Size-driven group supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use drover_spi::{InstanceDescription, InstanceId};

use crate::error::ScalerError;
use crate::scaled::Scaled;

/// Action for one convergence pass, computed from a single observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalePlan {
    /// Observed membership matches the target.
    Hold,
    /// Provision this many new members.
    Create(u32),
    /// Destroy exactly these members.
    Destroy(Vec<InstanceId>),
}

/// Compute the action that converges `observed` onto `target` members.
///
/// Excess members are chosen by sorting identifiers ascending and taking
/// the lowest, so any process computing a plan over the same observation
/// picks the same victims instead of each picking its own.
pub fn plan(observed: &[InstanceDescription], target: u32) -> ScalePlan {
    let target = target as usize;
    match observed.len() {
        n if n == target => ScalePlan::Hold,
        n if n < target => ScalePlan::Create((target - n) as u32),
        n => {
            let mut ids: Vec<InstanceId> = observed.iter().map(|d| d.id.clone()).collect();
            ids.sort_unstable();
            ids.truncate(n - target);
            ScalePlan::Destroy(ids)
        }
    }
}

/// Supervisor that keeps a [`Scaled`] group at a fixed member count.
///
/// Construct it with [`new`](Scaler::new), drive it with
/// [`run`](Scaler::run), and end it with [`stop`](Scaler::stop). A scaler
/// runs at most once; after it stops, converging the group again takes a
/// fresh instance.
pub struct Scaler<S> {
    scaled: S,
    target: u32,
    poll_interval: Duration,
    buffer: u32,
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl<S: Scaled> Scaler<S> {
    /// Create a scaler that converges `scaled` on `target` members, one
    /// observation every `poll_interval`.
    ///
    /// `buffer` declares over-provisioning headroom. It is validated and
    /// carried on the scaler but does not currently alter the computed
    /// delta; see the note in [`run`](Scaler::run)'s pass logic.
    pub fn new(
        scaled: S,
        target: u32,
        poll_interval: Duration,
        buffer: u32,
    ) -> Result<Self, ScalerError> {
        if poll_interval.is_zero() {
            return Err(ScalerError::ZeroPollInterval);
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Self {
            scaled,
            target,
            poll_interval,
            buffer,
            started: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        })
    }

    /// Desired member count.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Configured over-provisioning headroom.
    pub fn buffer(&self) -> u32 {
        self.buffer
    }

    /// Drive convergence passes until [`stop`](Scaler::stop) is observed.
    ///
    /// The first pass runs immediately; afterwards the loop sleeps
    /// `poll_interval` between passes, waking early when stop is
    /// signaled. Stop is only checked at pass boundaries, so an in-flight
    /// pass always finishes its backend calls.
    ///
    /// Calling `run` a second time, or after `stop`, returns immediately
    /// without touching the backend.
    pub async fn run(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(desired = self.target, "scaler already ran once; ignoring");
            return;
        }

        info!(
            desired = self.target,
            buffer = self.buffer,
            interval = ?self.poll_interval,
            "scaler started"
        );

        let mut stop = self.stop_rx.clone();
        loop {
            if *stop.borrow() {
                break;
            }

            self.converge().await;

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = stop.wait_for(|stopped| *stopped) => break,
            }
        }

        info!(desired = self.target, "scaler stopped");
    }

    /// Request termination.
    ///
    /// Returns immediately, may be called from any task, any number of
    /// times, before or after [`run`](Scaler::run). After the signal is
    /// set, at most the pass already in flight completes.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// One observe/decide/act pass.
    async fn converge(&self) {
        let observed = match self.scaled.list().await {
            Ok(observed) => observed,
            Err(e) => {
                // Creating or destroying based on an observation we do
                // not have would be guesswork; wait for the next tick.
                warn!(error = %e, "failed to list group members, skipping pass");
                return;
            }
        };

        // TODO: fold `buffer` into the desired count once its headroom
        // semantics are settled; today the target alone drives the delta.
        match plan(&observed, self.target) {
            ScalePlan::Hold => {
                debug!(size = observed.len(), "group is at the target size");
            }
            ScalePlan::Create(missing) => {
                info!(
                    observed = observed.len(),
                    desired = self.target,
                    missing,
                    "group is below target, creating instances"
                );
                for _ in 0..missing {
                    if let Err(e) = self.scaled.create_one(None).await {
                        warn!(error = %e, "failed to create instance");
                    }
                }
            }
            ScalePlan::Destroy(ids) => {
                info!(
                    observed = observed.len(),
                    desired = self.target,
                    excess = ids.len(),
                    "group is above target, destroying instances"
                );
                for id in &ids {
                    if let Err(e) = self.scaled.destroy(id).await {
                        warn!(%id, error = %e, "failed to destroy instance");
                    }
                }
            }
        }
    }
}
