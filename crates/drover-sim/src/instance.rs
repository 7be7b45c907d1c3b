//! In-memory instance backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use drover_spi::{
    InstanceDescription, InstanceId, InstancePlugin, InstanceSpec, SpiError, SpiResult, Tags,
};

#[derive(Debug, Clone)]
struct SimInstance {
    description: InstanceDescription,
    spec: InstanceSpec,
}

#[derive(Default)]
struct SimState {
    instances: Mutex<BTreeMap<InstanceId, SimInstance>>,
    next_id: AtomicU64,
}

/// Instance plugin that provisions into a process-local table.
///
/// Identifiers are sequential (`sim-0000`, `sim-0001`, ...), so tests
/// get a stable, orderable id space. Cheap to clone; clones share the
/// same table, the way separate clients of a real provider share its
/// state. The probe methods ([`instance_count`](Self::instance_count),
/// [`descriptions`](Self::descriptions), [`spec_of`](Self::spec_of))
/// expose the table for assertions and demo output.
#[derive(Clone, Default)]
pub struct SimInstancePlugin {
    state: Arc<SimState>,
}

impl SimInstancePlugin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live instances, group members or not.
    pub async fn instance_count(&self) -> usize {
        self.state.instances.lock().await.len()
    }

    /// Descriptions of every live instance, ordered by id.
    pub async fn descriptions(&self) -> Vec<InstanceDescription> {
        self.state
            .instances
            .lock()
            .await
            .values()
            .map(|instance| instance.description.clone())
            .collect()
    }

    /// The spec an instance was provisioned from, if it is still live.
    pub async fn spec_of(&self, id: &InstanceId) -> Option<InstanceSpec> {
        self.state
            .instances
            .lock()
            .await
            .get(id)
            .map(|instance| instance.spec.clone())
    }
}

#[async_trait]
impl InstancePlugin for SimInstancePlugin {
    async fn validate(&self, properties: &serde_json::Value) -> SpiResult<()> {
        if properties.is_object() {
            Ok(())
        } else {
            Err(SpiError::UnsupportedConfig(format!(
                "sim instance properties must be an object, got: {properties}"
            )))
        }
    }

    async fn provision(&self, spec: InstanceSpec) -> SpiResult<InstanceId> {
        let seq = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        let id = InstanceId::new(format!("sim-{seq:04}"));
        let description = InstanceDescription {
            id: id.clone(),
            logical_id: spec.logical_id.clone(),
            tags: spec.tags.clone(),
        };
        self.state
            .instances
            .lock()
            .await
            .insert(id.clone(), SimInstance { description, spec });
        debug!(%id, "sim instance provisioned");
        Ok(id)
    }

    async fn destroy(&self, id: &InstanceId) -> SpiResult<()> {
        match self.state.instances.lock().await.remove(id) {
            Some(_) => {
                debug!(%id, "sim instance destroyed");
                Ok(())
            }
            None => Err(SpiError::NotFound(id.clone())),
        }
    }

    async fn describe_instances(&self, tags: &Tags) -> SpiResult<Vec<InstanceDescription>> {
        Ok(self
            .state
            .instances
            .lock()
            .await
            .values()
            .filter(|instance| {
                tags.iter()
                    .all(|(key, value)| instance.description.tags.get(key) == Some(value))
            })
            .map(|instance| instance.description.clone())
            .collect())
    }
}
