//! Identity-driven group supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use drover_spi::{InstanceSpec, LogicalId};

use crate::error::ScalerError;
use crate::scaled::Scaled;

/// Supervisor that keeps one group member per pinned logical identity.
///
/// Each pass destroys members whose identity is not in the expected set,
/// then provisions a member for each identity that has none. Members
/// carrying no identity at all are logged and left alone: the quorum
/// cannot tell a half-provisioned member from a foreign instance, and
/// destroying either would be wrong.
pub struct Quorum<S> {
    scaled: S,
    logical_ids: Vec<LogicalId>,
    poll_interval: Duration,
    started: AtomicBool,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl<S: Scaled> Quorum<S> {
    /// Create a quorum that converges `scaled` on the given identities,
    /// one observation every `poll_interval`.
    pub fn new(
        scaled: S,
        logical_ids: Vec<LogicalId>,
        poll_interval: Duration,
    ) -> Result<Self, ScalerError> {
        if poll_interval.is_zero() {
            return Err(ScalerError::ZeroPollInterval);
        }
        if logical_ids.is_empty() {
            return Err(ScalerError::EmptyQuorum);
        }
        let (stop_tx, stop_rx) = watch::channel(false);
        Ok(Self {
            scaled,
            logical_ids,
            poll_interval,
            started: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        })
    }

    /// The identities this quorum maintains.
    pub fn logical_ids(&self) -> &[LogicalId] {
        &self.logical_ids
    }

    /// Drive convergence passes until [`stop`](Quorum::stop) is observed.
    ///
    /// Same contract as [`Scaler::run`](crate::Scaler::run): first pass
    /// immediately, stop checked at pass boundaries, never restartable.
    pub async fn run(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(quorum = self.logical_ids.len(), "quorum already ran once; ignoring");
            return;
        }

        info!(
            quorum = self.logical_ids.len(),
            interval = ?self.poll_interval,
            "quorum started"
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

        info!(quorum = self.logical_ids.len(), "quorum stopped");
    }

    /// Request termination. Same contract as
    /// [`Scaler::stop`](crate::Scaler::stop).
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// One observe/decide/act pass.
    async fn converge(&self) {
        let observed = match self.scaled.list().await {
            Ok(observed) => observed,
            Err(e) => {
                warn!(error = %e, "failed to list group members, skipping pass");
                return;
            }
        };

        let mut unknown = Vec::new();
        for member in &observed {
            match &member.logical_id {
                Some(lid) if self.logical_ids.contains(lid) => {}
                Some(lid) => {
                    warn!(id = %member.id, logical_id = %lid, "member has an unknown identity");
                    unknown.push(&member.id);
                }
                None => {
                    warn!(id = %member.id, "member carries no logical identity, leaving it alone");
                }
            }
        }

        for id in unknown {
            info!(%id, "destroying member with unknown identity");
            if let Err(e) = self.scaled.destroy(id).await {
                warn!(%id, error = %e, "failed to destroy instance");
            }
        }

        let missing: Vec<&LogicalId> = self
            .logical_ids
            .iter()
            .filter(|expected| {
                !observed
                    .iter()
                    .any(|member| member.logical_id.as_ref() == Some(*expected))
            })
            .collect();

        if missing.is_empty() && observed.len() == self.logical_ids.len() {
            debug!(quorum = self.logical_ids.len(), "quorum is intact");
        }

        for lid in missing {
            info!(logical_id = %lid, "identity has no member, provisioning one");
            let overlay = InstanceSpec {
                logical_id: Some(lid.clone()),
                ..InstanceSpec::default()
            };
            if let Err(e) = self.scaled.create_one(Some(overlay)).await {
                warn!(logical_id = %lid, error = %e, "failed to create instance");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use tokio::time::timeout;

    use drover_spi::{InstanceDescription, InstanceId, SpiError, SpiResult};

    use super::*;

    fn lid(id: &str) -> LogicalId {
        LogicalId::from(id)
    }

    /// Live in-memory [`Scaled`] double: creates and destroys apply to a
    /// shared member table immediately, so the next `list` observes them.
    #[derive(Clone, Default)]
    struct FakeGroup {
        members: Arc<Mutex<BTreeMap<InstanceId, Option<LogicalId>>>>,
        next: Arc<AtomicU64>,
    }

    impl FakeGroup {
        async fn seed(&self, id: &str, logical_id: Option<&str>) {
            self.members
                .lock()
                .await
                .insert(InstanceId::from(id), logical_id.map(LogicalId::from));
        }

        async fn snapshot(&self) -> BTreeMap<InstanceId, Option<LogicalId>> {
            self.members.lock().await.clone()
        }

        async fn logical_ids(&self) -> Vec<LogicalId> {
            let mut ids: Vec<LogicalId> =
                self.members.lock().await.values().flatten().cloned().collect();
            ids.sort_unstable();
            ids
        }
    }

    #[async_trait]
    impl Scaled for FakeGroup {
        async fn list(&self) -> SpiResult<Vec<InstanceDescription>> {
            Ok(self
                .members
                .lock()
                .await
                .iter()
                .map(|(id, logical_id)| InstanceDescription {
                    id: id.clone(),
                    logical_id: logical_id.clone(),
                    tags: BTreeMap::new(),
                })
                .collect())
        }

        async fn create_one(&self, overlay: Option<InstanceSpec>) -> SpiResult<()> {
            let seq = self.next.fetch_add(1, Ordering::SeqCst);
            let id = InstanceId::new(format!("i-{seq:03}"));
            let logical_id = overlay.and_then(|spec| spec.logical_id);
            self.members.lock().await.insert(id, logical_id);
            Ok(())
        }

        async fn destroy(&self, id: &InstanceId) -> SpiResult<()> {
            match self.members.lock().await.remove(id) {
                Some(_) => Ok(()),
                None => Err(SpiError::NotFound(id.clone())),
            }
        }
    }

    // ── construction ────────────────────────────────────────────────────

    #[tokio::test]
    async fn rejects_empty_identity_set() {
        let result = Quorum::new(FakeGroup::default(), vec![], Duration::from_millis(1));
        assert!(matches!(result, Err(ScalerError::EmptyQuorum)));
    }

    #[tokio::test]
    async fn rejects_zero_poll_interval() {
        let result = Quorum::new(FakeGroup::default(), vec![lid("10.0.0.1")], Duration::ZERO);
        assert!(matches!(result, Err(ScalerError::ZeroPollInterval)));
    }

    #[test]
    fn carries_its_identity_set() {
        let ids = vec![lid("10.0.0.1"), lid("10.0.0.2")];
        let quorum = Quorum::new(FakeGroup::default(), ids.clone(), Duration::from_secs(1))
            .expect("valid config");
        assert_eq!(quorum.logical_ids(), ids.as_slice());
    }

    // ── single pass ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn pass_provisions_each_missing_identity() {
        let group = FakeGroup::default();
        group.seed("i-a", Some("10.0.0.1")).await;

        let quorum = Quorum::new(
            group.clone(),
            vec![lid("10.0.0.1"), lid("10.0.0.2"), lid("10.0.0.3")],
            Duration::from_millis(1),
        )
        .expect("valid config");

        quorum.converge().await;

        assert_eq!(
            group.logical_ids().await,
            vec![lid("10.0.0.1"), lid("10.0.0.2"), lid("10.0.0.3")]
        );
    }

    #[tokio::test]
    async fn pass_destroys_unknown_identities() {
        let group = FakeGroup::default();
        group.seed("i-a", Some("10.0.0.1")).await;
        group.seed("i-b", Some("10.9.9.9")).await;

        let quorum = Quorum::new(
            group.clone(),
            vec![lid("10.0.0.1")],
            Duration::from_millis(1),
        )
        .expect("valid config");

        quorum.converge().await;

        let snapshot = group.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&InstanceId::from("i-a")));
    }

    #[tokio::test]
    async fn pass_leaves_identity_less_members_alone() {
        let group = FakeGroup::default();
        group.seed("i-a", Some("10.0.0.1")).await;
        group.seed("i-limbo", None).await;

        let quorum = Quorum::new(
            group.clone(),
            vec![lid("10.0.0.1")],
            Duration::from_millis(1),
        )
        .expect("valid config");

        quorum.converge().await;

        assert!(group.snapshot().await.contains_key(&InstanceId::from("i-limbo")));
    }

    #[tokio::test]
    async fn pass_skips_entirely_when_observation_fails() {
        struct FailingList;

        #[async_trait]
        impl Scaled for FailingList {
            async fn list(&self) -> SpiResult<Vec<InstanceDescription>> {
                Err(SpiError::Backend(anyhow::anyhow!("provider down")))
            }

            async fn create_one(&self, _overlay: Option<InstanceSpec>) -> SpiResult<()> {
                panic!("unexpected create");
            }

            async fn destroy(&self, _id: &InstanceId) -> SpiResult<()> {
                panic!("unexpected destroy");
            }
        }

        let quorum = Quorum::new(FailingList, vec![lid("10.0.0.1")], Duration::from_millis(1))
            .expect("valid config");

        quorum.converge().await;
    }

    #[tokio::test]
    async fn pass_continues_batch_after_a_create_failure() {
        struct FlakyCreate {
            requested: Arc<std::sync::Mutex<Vec<LogicalId>>>,
        }

        #[async_trait]
        impl Scaled for FlakyCreate {
            async fn list(&self) -> SpiResult<Vec<InstanceDescription>> {
                Ok(vec![])
            }

            async fn create_one(&self, overlay: Option<InstanceSpec>) -> SpiResult<()> {
                let lid = overlay
                    .and_then(|spec| spec.logical_id)
                    .expect("quorum creates carry an identity");
                let mut requested = self.requested.lock().unwrap();
                requested.push(lid);
                if requested.len() == 1 {
                    Err(SpiError::Backend(anyhow::anyhow!("quota exceeded")))
                } else {
                    Ok(())
                }
            }

            async fn destroy(&self, _id: &InstanceId) -> SpiResult<()> {
                panic!("unexpected destroy");
            }
        }

        let requested = Arc::new(std::sync::Mutex::new(Vec::new()));
        let quorum = Quorum::new(
            FlakyCreate {
                requested: requested.clone(),
            },
            vec![lid("10.0.0.1"), lid("10.0.0.2")],
            Duration::from_millis(1),
        )
        .expect("valid config");

        quorum.converge().await;

        // The failed create for the first identity does not stop the second.
        assert_eq!(
            *requested.lock().unwrap(),
            vec![lid("10.0.0.1"), lid("10.0.0.2")]
        );
    }

    // ── full loop ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn loop_converges_on_the_expected_identities() {
        let group = FakeGroup::default();
        group.seed("i-intruder", Some("10.9.9.9")).await;
        group.seed("i-a", Some("10.0.0.1")).await;

        let expected = vec![lid("10.0.0.1"), lid("10.0.0.2")];
        let quorum = Arc::new(
            Quorum::new(group.clone(), expected.clone(), Duration::from_millis(1))
                .expect("valid config"),
        );

        let runner = tokio::spawn({
            let quorum = quorum.clone();
            async move { quorum.run().await }
        });

        let mut converged = false;
        for _ in 0..500 {
            if group.logical_ids().await == expected {
                converged = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        quorum.stop();
        timeout(Duration::from_secs(5), runner)
            .await
            .expect("quorum did not stop")
            .expect("quorum task panicked");

        assert!(converged, "quorum never reached the expected identity set");
        assert_eq!(group.logical_ids().await, expected);
    }
}
