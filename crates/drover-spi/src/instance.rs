//! Instance plugin contract: the provisioning backend drover drives.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SpiResult;
use crate::ident::InterfaceId;

/// Identity of the instance plugin API.
pub fn interface_id() -> InterfaceId {
    InterfaceId::new("Instance", "0.1.0")
}

/// Opaque unique identifier of a provisioned instance.
///
/// Identifiers sort lexicographically, giving callers a total order to
/// tie-break on when they must pick some instances over others.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Stable logical identity an instance may carry across re-provisioning,
/// such as an IP address or a hostname slot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(pub String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Key/value labels attached to instances, used for membership filtering.
pub type Tags = BTreeMap<String, String>;

/// Instructions for provisioning exactly one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Backend-specific provisioning document, opaque to everything but
    /// the instance plugin itself.
    pub properties: Option<serde_json::Value>,
    /// Tags to attach to the new instance.
    pub tags: Tags,
    /// Boot script to run when the instance first starts. Empty means
    /// none.
    pub init: String,
    /// Logical identity to assign, for groups that pin identities.
    pub logical_id: Option<LogicalId>,
}

/// One provisioned instance, as observed from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceDescription {
    pub id: InstanceId,
    pub logical_id: Option<LogicalId>,
    pub tags: Tags,
}

/// Vendor-agnostic contract for provisioning instances with an
/// infrastructure provider.
///
/// Implementations are shared services: every method takes `&self` and
/// must tolerate concurrent calls from multiple tasks.
#[async_trait]
pub trait InstancePlugin: Send + Sync {
    /// The interface identity this implementation advertises.
    fn interface_id(&self) -> InterfaceId {
        interface_id()
    }

    /// Check a properties document before any group starts using it.
    async fn validate(&self, properties: &serde_json::Value) -> SpiResult<()>;

    /// Provision one instance and return its identifier.
    async fn provision(&self, spec: InstanceSpec) -> SpiResult<InstanceId>;

    /// Terminate an instance.
    async fn destroy(&self, id: &InstanceId) -> SpiResult<()>;

    /// Describe all instances carrying every one of the given tags.
    async fn describe_instances(&self, tags: &Tags) -> SpiResult<Vec<InstanceDescription>>;
}
