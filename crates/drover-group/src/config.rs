//! Group definition and member tagging.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use drover_spi::{Allocation, Tags};

use crate::error::GroupResult;

/// Tag key marking an instance as a member of a drover group. The value
/// is the group id.
pub const GROUP_TAG: &str = "drover.group";

/// Tag key carrying the hash of the configuration a member was
/// provisioned from.
pub const CONFIG_TAG: &str = "drover.config";

/// Definition of one managed group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Group identifier; becomes the `drover.group` tag on every member.
    pub id: String,
    /// How the group allocates its members.
    pub allocation: Allocation,
    /// Time between convergence passes.
    pub poll_interval: Duration,
    /// Over-provisioning headroom, forwarded to the size supervisor.
    pub buffer: u32,
    /// Properties document for the instance plugin.
    pub instance_properties: serde_json::Value,
    /// Properties document for the flavor plugin.
    pub flavor_properties: serde_json::Value,
}

impl GroupConfig {
    /// Hex-encoded SHA-256 of the canonical JSON encoding of this
    /// definition.
    ///
    /// Serialization is canonical because `serde_json` writes map keys
    /// in sorted order; two equal configs always hash identically.
    pub fn config_hash(&self) -> GroupResult<String> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Tags stamped onto every member this configuration provisions.
    pub fn member_tags(&self) -> GroupResult<Tags> {
        let mut tags = Tags::new();
        tags.insert(GROUP_TAG.to_string(), self.id.clone());
        tags.insert(CONFIG_TAG.to_string(), self.config_hash()?);
        Ok(tags)
    }

    /// Tag filter used to enumerate the group's members.
    ///
    /// Matches on the group tag only: members provisioned under an older
    /// configuration still count toward the observed membership, they
    /// just carry a different config hash.
    pub fn member_filter(&self) -> Tags {
        let mut tags = Tags::new();
        tags.insert(GROUP_TAG.to_string(), self.id.clone());
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> GroupConfig {
        GroupConfig {
            id: "web".to_string(),
            allocation: Allocation::Size(3),
            poll_interval: Duration::from_secs(10),
            buffer: 0,
            instance_properties: serde_json::json!({ "size": "small" }),
            flavor_properties: serde_json::json!({}),
        }
    }

    #[test]
    fn equal_configs_hash_identically() {
        let a = test_config().config_hash().expect("hashable");
        let b = test_config().config_hash().expect("hashable");
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_change_changes_the_hash() {
        let base = test_config().config_hash().expect("hashable");

        let mut resized = test_config();
        resized.allocation = Allocation::Size(4);
        assert_ne!(resized.config_hash().expect("hashable"), base);

        let mut retuned = test_config();
        retuned.instance_properties = serde_json::json!({ "size": "large" });
        assert_ne!(retuned.config_hash().expect("hashable"), base);
    }

    #[test]
    fn member_tags_carry_group_and_config() {
        let config = test_config();
        let tags = config.member_tags().expect("taggable");
        assert_eq!(tags.get(GROUP_TAG), Some(&"web".to_string()));
        assert_eq!(
            tags.get(CONFIG_TAG),
            Some(&config.config_hash().expect("hashable"))
        );
    }

    #[test]
    fn member_filter_ignores_the_config_hash() {
        let filter = test_config().member_filter();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get(GROUP_TAG), Some(&"web".to_string()));
    }
}
