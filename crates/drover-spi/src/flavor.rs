//! Flavor plugin contract: customizes what runs on a group's instances.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SpiResult;
use crate::ident::InterfaceId;
use crate::instance::{InstanceDescription, InstanceSpec, LogicalId};

/// Identity of the flavor plugin API.
pub fn interface_id() -> InterfaceId {
    InterfaceId::new("Flavor", "0.1.0")
}

/// How a group allocates its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Allocation {
    /// Maintain a fluid pool of `n` interchangeable members.
    Size(u32),
    /// Maintain exactly one member per pinned logical identity.
    LogicalIds(Vec<LogicalId>),
}

/// Health of the flavor as observed on one instance.
///
/// `Unknown` is distinct from `Unhealthy`: callers must not take
/// destructive action on a member whose health simply could not be
/// determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Health cannot currently be confirmed either way.
    Unknown,
    /// The flavor is confirmed working on this instance.
    Healthy,
    /// The flavor is confirmed broken on this instance.
    Unhealthy,
}

/// Hooks a flavor contributes to the lifecycle of a group's members.
///
/// The flavor never provisions anything itself; it shapes specs before
/// the instance plugin sees them and observes members afterwards.
#[async_trait]
pub trait FlavorPlugin: Send + Sync {
    /// The interface identity this implementation advertises.
    fn interface_id(&self) -> InterfaceId {
        interface_id()
    }

    /// Check a flavor properties document against an allocation before
    /// any group starts using it.
    async fn validate(
        &self,
        properties: &serde_json::Value,
        allocation: &Allocation,
    ) -> SpiResult<()>;

    /// Shape the provisioning spec for one new member, typically by
    /// adding tags and init commands.
    async fn prepare(
        &self,
        properties: &serde_json::Value,
        spec: InstanceSpec,
        allocation: &Allocation,
    ) -> SpiResult<InstanceSpec>;

    /// Report the flavor's health on one member.
    async fn healthy(
        &self,
        properties: &serde_json::Value,
        instance: &InstanceDescription,
    ) -> SpiResult<Health>;

    /// Give the member a chance to leave whatever it participates in
    /// before it is destroyed.
    async fn drain(
        &self,
        properties: &serde_json::Value,
        instance: &InstanceDescription,
    ) -> SpiResult<()>;
}
