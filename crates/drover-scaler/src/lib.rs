//! drover-scaler — convergence supervisors for drover groups.
//!
//! Two small control loops keep a group converged on its desired shape:
//!
//! - [`Scaler`] maintains a fluid pool at a fixed size, creating into a
//!   deficit and destroying out of an excess.
//! - [`Quorum`] maintains one member per pinned logical identity.
//!
//! # Convergence model
//!
//! ```text
//!   loop:
//!     observe    list() the group
//!     decide     compare observation against the desired shape
//!     act        issue create/destroy calls to close the gap
//!     sleep      poll interval, interruptible by stop()
//! ```
//!
//! Every pass recomputes its decision from a fresh observation. Nothing
//! is remembered between passes, so a create that silently failed, an
//! instance removed by hand, or any other backend drift is corrected by
//! the next observation rather than by retry bookkeeping. Observation
//! failures skip the pass entirely; destructive action is never taken on
//! data the supervisor could not read. No runtime error terminates a
//! running loop.
//!
//! Both supervisors converge through the [`Scaled`] contract, which is
//! the only thing they know about the group they manage.

pub mod error;
pub mod quorum;
pub mod scaled;
pub mod scaler;

pub use error::ScalerError;
pub use quorum::Quorum;
pub use scaled::Scaled;
pub use scaler::{plan, ScalePlan, Scaler};
