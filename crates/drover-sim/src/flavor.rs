//! Vanilla flavor: static tags and init, no orchestration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use drover_spi::{
    Allocation, FlavorPlugin, Health, InstanceDescription, InstanceSpec, SpiError, SpiResult,
    Tags,
};

/// Properties document the vanilla flavor accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VanillaProperties {
    /// Tags merged into every prepared spec. Tags already on the spec
    /// win, so group bookkeeping tags cannot be overwritten from here.
    pub tags: Tags,
    /// Init script for specs that do not already carry one.
    pub init: String,
}

/// Flavor that stamps static configuration onto members and reports
/// every member healthy. Drain is a no-op: a vanilla instance
/// participates in nothing it would need to leave.
#[derive(Debug, Clone, Copy, Default)]
pub struct VanillaFlavor;

impl VanillaFlavor {
    pub fn new() -> Self {
        Self
    }

    fn parse(properties: &serde_json::Value) -> SpiResult<VanillaProperties> {
        serde_json::from_value(properties.clone()).map_err(|e| {
            SpiError::UnsupportedConfig(format!("vanilla flavor properties: {e}"))
        })
    }
}

#[async_trait]
impl FlavorPlugin for VanillaFlavor {
    async fn validate(
        &self,
        properties: &serde_json::Value,
        _allocation: &Allocation,
    ) -> SpiResult<()> {
        Self::parse(properties).map(|_| ())
    }

    async fn prepare(
        &self,
        properties: &serde_json::Value,
        mut spec: InstanceSpec,
        _allocation: &Allocation,
    ) -> SpiResult<InstanceSpec> {
        let vanilla = Self::parse(properties)?;
        for (key, value) in vanilla.tags {
            spec.tags.entry(key).or_insert(value);
        }
        if spec.init.is_empty() {
            spec.init = vanilla.init;
        }
        Ok(spec)
    }

    async fn healthy(
        &self,
        _properties: &serde_json::Value,
        _instance: &InstanceDescription,
    ) -> SpiResult<Health> {
        Ok(Health::Healthy)
    }

    async fn drain(
        &self,
        _properties: &serde_json::Value,
        _instance: &InstanceDescription,
    ) -> SpiResult<()> {
        Ok(())
    }
}
