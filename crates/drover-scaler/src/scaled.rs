//! The group contract the supervisors converge through.

use async_trait::async_trait;
use drover_spi::{InstanceDescription, InstanceId, InstanceSpec, SpiResult};

/// A group of instances that can be grown and shrunk one member at a
/// time.
///
/// This is the sole dependency of the convergence supervisors.
/// Production code implements it by composing an instance backend with a
/// flavor plugin (see `drover-group`); tests implement it with scripted
/// doubles.
///
/// Creation and destruction only need to become visible eventually:
/// supervisors tolerate `list` lagging behind their own calls and will
/// simply re-converge once the backend catches up.
#[async_trait]
pub trait Scaled: Send + Sync {
    /// Current observed membership of the group. Ordering carries no
    /// meaning; callers impose their own where they need one.
    async fn list(&self) -> SpiResult<Vec<InstanceDescription>>;

    /// Provision exactly one new member.
    ///
    /// `overlay`, when present, is merged over the group's base
    /// provisioning spec; `None` derives the spec entirely from group
    /// configuration.
    async fn create_one(&self, overlay: Option<InstanceSpec>) -> SpiResult<()>;

    /// Remove one member by identifier.
    async fn destroy(&self, id: &InstanceId) -> SpiResult<()>;
}
