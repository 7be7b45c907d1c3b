//! Interface identity: a name plus semantic version for plugin APIs.

use std::fmt;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// Identity of a plugin-facing API.
///
/// Implementations advertise the identity they were written against;
/// callers compare it to the identity they require before invoking the
/// plugin, instead of discovering a mismatch mid-operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceId {
    /// Interface name, e.g. `"Instance"` or `"Flavor"`.
    pub name: String,
    /// Semantic version of the interface, e.g. `"0.1.0"`.
    pub version: String,
}

impl InterfaceId {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Whether an implementation advertising `self` can serve a caller
    /// that requires `required`.
    ///
    /// Names must match exactly. Versions follow cargo-style caret
    /// compatibility: a caller requiring `0.1.0` accepts `0.1.x` but not
    /// `0.2.0`. Unparseable versions never satisfy anything.
    pub fn satisfies(&self, required: &InterfaceId) -> bool {
        if self.name != required.name {
            return false;
        }
        let Ok(offered) = Version::parse(&self.version) else {
            return false;
        };
        let Ok(requirement) = VersionReq::parse(&format!("^{}", required.version)) else {
            return false;
        };
        requirement.matches(&offered)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}
