//! drover-sim — in-memory plugins for tests and demo runs.
//!
//! [`SimInstancePlugin`] provisions into a process-local table with
//! deterministic sequential identifiers; [`VanillaFlavor`] stamps static
//! tags and an init script onto members and reports them always healthy.
//! Together they let the full drover stack run and be observed without
//! an infrastructure provider behind it.

pub mod flavor;
pub mod instance;

pub use flavor::{VanillaFlavor, VanillaProperties};
pub use instance::SimInstancePlugin;
