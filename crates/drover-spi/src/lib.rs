//! drover-spi — plugin contracts for the drover group manager.
//!
//! Defines the two capability surfaces drover composes groups out of:
//!
//! - [`InstancePlugin`] is a vendor-agnostic provisioning backend:
//!   create, destroy, and enumerate instances by tag.
//! - [`FlavorPlugin`] customizes what runs on those instances: shaping
//!   the provisioning spec, reporting health, draining before destroy.
//!
//! Both contracts are named and versioned through [`InterfaceId`] so an
//! embedder can verify compatibility before invoking an implementation.
//! Plugin properties stay opaque (`serde_json::Value`) end to end; only
//! the plugin that owns a properties document interprets it.

pub mod error;
pub mod flavor;
pub mod ident;
pub mod instance;

pub use error::{SpiError, SpiResult};
pub use flavor::{Allocation, FlavorPlugin, Health};
pub use ident::InterfaceId;
pub use instance::{
    InstanceDescription, InstanceId, InstancePlugin, InstanceSpec, LogicalId, Tags,
};
