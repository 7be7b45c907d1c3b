//! Production [`Scaled`] implementation.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use drover_scaler::Scaled;
use drover_spi::{
    FlavorPlugin, Health, InstanceDescription, InstanceId, InstancePlugin, InstanceSpec,
    SpiResult, Tags,
};

use crate::config::GroupConfig;
use crate::error::{GroupError, GroupResult};

/// One group, bound to its two plugins.
///
/// Translates the supervisor's group-level calls into plugin calls:
/// `list` enumerates by the group's membership tag, `create_one` runs
/// the flavor's prepare hook over the group's base spec before
/// provisioning, and `destroy` drains the member through the flavor
/// before terminating it.
pub struct ScaledGroup<I, F> {
    instances: I,
    flavor: F,
    config: GroupConfig,
    member_tags: Tags,
    member_filter: Tags,
}

impl<I: InstancePlugin, F: FlavorPlugin> ScaledGroup<I, F> {
    /// Bind a group definition to its plugins.
    pub fn new(instances: I, flavor: F, config: GroupConfig) -> GroupResult<Self> {
        let member_tags = config.member_tags()?;
        let member_filter = config.member_filter();
        Ok(Self {
            instances,
            flavor,
            config,
            member_tags,
            member_filter,
        })
    }

    /// The definition this group serves.
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Flavor health of one member.
    pub async fn health(&self, member: &InstanceDescription) -> SpiResult<Health> {
        self.flavor
            .healthy(&self.config.flavor_properties, member)
            .await
    }

    /// Provisioning spec for a new member before the flavor shapes it.
    fn base_spec(&self) -> InstanceSpec {
        InstanceSpec {
            properties: Some(self.config.instance_properties.clone()),
            tags: self.member_tags.clone(),
            init: String::new(),
            logical_id: None,
        }
    }

    /// Merge a partial spec over the base: overlay properties replace
    /// base properties wholesale, overlay tags win key by key, a
    /// non-empty overlay init replaces the base init, and an overlay
    /// logical id is adopted.
    fn merge_overlay(mut base: InstanceSpec, overlay: InstanceSpec) -> InstanceSpec {
        if overlay.properties.is_some() {
            base.properties = overlay.properties;
        }
        for (key, value) in overlay.tags {
            base.tags.insert(key, value);
        }
        if !overlay.init.is_empty() {
            base.init = overlay.init;
        }
        if overlay.logical_id.is_some() {
            base.logical_id = overlay.logical_id;
        }
        base
    }
}

#[async_trait]
impl<I: InstancePlugin, F: FlavorPlugin> Scaled for ScaledGroup<I, F> {
    async fn list(&self) -> SpiResult<Vec<InstanceDescription>> {
        self.instances.describe_instances(&self.member_filter).await
    }

    async fn create_one(&self, overlay: Option<InstanceSpec>) -> SpiResult<()> {
        let spec = match overlay {
            Some(overlay) => Self::merge_overlay(self.base_spec(), overlay),
            None => self.base_spec(),
        };

        let prepared = self
            .flavor
            .prepare(&self.config.flavor_properties, spec, &self.config.allocation)
            .await?;

        let id = self.instances.provision(prepared).await?;
        info!(group = %self.config.id, %id, "member provisioned");
        Ok(())
    }

    async fn destroy(&self, id: &InstanceId) -> SpiResult<()> {
        // Drain wants the full description, so look the member up first.
        match self.list().await {
            Ok(members) => match members.iter().find(|member| &member.id == id) {
                Some(member) => {
                    if let Err(e) = self
                        .flavor
                        .drain(&self.config.flavor_properties, member)
                        .await
                    {
                        // Drain is best effort; the destroy proceeds.
                        warn!(group = %self.config.id, %id, error = %e, "drain failed");
                    }
                }
                None => {
                    debug!(group = %self.config.id, %id, "member not found for drain");
                }
            },
            Err(e) => {
                warn!(group = %self.config.id, %id, error = %e, "could not look up member for drain");
            }
        }

        self.instances.destroy(id).await?;
        info!(group = %self.config.id, %id, "member destroyed");
        Ok(())
    }
}

/// Check a group definition against both plugins before anything runs.
///
/// Verifies interface compatibility first, then lets each plugin vet the
/// properties document meant for it.
pub async fn validate_group<I, F>(
    config: &GroupConfig,
    instances: &I,
    flavor: &F,
) -> GroupResult<()>
where
    I: InstancePlugin,
    F: FlavorPlugin,
{
    let offered = instances.interface_id();
    let required = drover_spi::instance::interface_id();
    if !offered.satisfies(&required) {
        return Err(GroupError::IncompatibleInterface { offered, required });
    }

    let offered = flavor.interface_id();
    let required = drover_spi::flavor::interface_id();
    if !offered.satisfies(&required) {
        return Err(GroupError::IncompatibleInterface { offered, required });
    }

    instances.validate(&config.instance_properties).await?;
    flavor
        .validate(&config.flavor_properties, &config.allocation)
        .await?;
    Ok(())
}
