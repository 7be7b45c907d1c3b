//! Group file parsing.
//!
//! droverd reads one TOML file describing the group to converge:
//!
//! ```text
//! [group]
//! id = "web"
//! target = 3             # or: logical-ids = ["10.0.0.1", "10.0.0.2"]
//! poll-interval = "5s"
//! buffer = 0
//!
//! [instance]
//! properties = { size = "small" }
//!
//! [flavor]
//! properties = { tags = { tier = "web" }, init = "systemctl start web" }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;

use drover_group::GroupConfig;
use drover_spi::{Allocation, LogicalId};

/// On-disk group definition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupFile {
    pub group: GroupSection,
    #[serde(default)]
    pub instance: PluginSection,
    #[serde(default)]
    pub flavor: PluginSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct GroupSection {
    pub id: String,
    /// Fluid pool size. Set exactly one of `target` and `logical-ids`.
    pub target: Option<u32>,
    /// Pinned member identities. Set exactly one of `target` and
    /// `logical-ids`.
    pub logical_ids: Option<Vec<String>>,
    /// Time between convergence passes, e.g. "5s", "500ms", "1m".
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
    /// Over-provisioning headroom for size-driven groups.
    #[serde(default)]
    pub buffer: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginSection {
    /// Opaque properties document handed to the plugin.
    #[serde(default = "empty_object")]
    pub properties: serde_json::Value,
}

impl Default for PluginSection {
    fn default() -> Self {
        Self {
            properties: empty_object(),
        }
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

fn default_poll_interval() -> String {
    "10s".to_string()
}

impl GroupFile {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading group file {}", path.display()))?;
        let file: GroupFile = toml::from_str(&content)
            .with_context(|| format!("parsing group file {}", path.display()))?;
        Ok(file)
    }

    /// Convert the on-disk form into the in-memory group definition.
    pub fn into_group_config(self) -> anyhow::Result<GroupConfig> {
        let allocation = match (self.group.target, self.group.logical_ids) {
            (Some(size), None) => Allocation::Size(size),
            (None, Some(ids)) if !ids.is_empty() => {
                Allocation::LogicalIds(ids.into_iter().map(LogicalId::new).collect())
            }
            (None, Some(_)) => bail!("logical-ids must name at least one identity"),
            (Some(_), Some(_)) => bail!("set either target or logical-ids, not both"),
            (None, None) => bail!("set target or logical-ids"),
        };

        let poll_interval = parse_duration(&self.group.poll_interval).with_context(|| {
            format!("invalid poll-interval {:?}", self.group.poll_interval)
        })?;

        Ok(GroupConfig {
            id: self.group.id,
            allocation,
            poll_interval,
            buffer: self.group.buffer,
            instance_properties: self.instance.properties,
            flavor_properties: self.flavor.properties,
        })
    }
}

/// Parse durations like "5s", "500ms", "2m". A bare number means
/// seconds.
fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (value, unit): (&str, fn(u64) -> Duration) = if let Some(v) = s.strip_suffix("ms") {
        (v, Duration::from_millis)
    } else if let Some(v) = s.strip_suffix('s') {
        (v, Duration::from_secs)
    } else if let Some(v) = s.strip_suffix('m') {
        (v, |m| Duration::from_secs(m.saturating_mul(60)))
    } else {
        (s, Duration::from_secs)
    };
    let value: u64 = value.trim().parse()?;
    Ok(unit(value))
}
