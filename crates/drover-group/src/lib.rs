//! drover-group — composes plugins into a group the supervisors can
//! drive.
//!
//! A group is defined by a [`GroupConfig`]: an identifier, an allocation
//! (fixed size or pinned identities), and one opaque properties document
//! per plugin. [`ScaledGroup`] turns that definition plus an instance
//! plugin and a flavor plugin into the [`Scaled`](drover_scaler::Scaled)
//! contract:
//!
//! - `list` enumerates the backend by the group's membership tag,
//! - `create_one` runs the flavor's prepare hook over the group's base
//!   spec before provisioning,
//! - `destroy` drains the member through the flavor first, best effort.
//!
//! Members are tagged with the group id and a hash of the configuration
//! that produced them, so reconfigured groups can tell current members
//! from stale ones.

pub mod config;
pub mod error;
pub mod scaled;

pub use config::{GroupConfig, CONFIG_TAG, GROUP_TAG};
pub use error::{GroupError, GroupResult};
pub use scaled::{validate_group, ScaledGroup};
