//! Caller-facing values decoded from service replies.
//!
//! Everything here is owned exclusively by the caller that received it; no
//! value is shared across calls.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A loaded launch file as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchDescriptor {
    pub package: String,
    /// File name of the launch file, e.g. `"demo.launch"`.
    pub launch: String,
    /// Resolved path on the service host.
    pub path: String,
    pub args: BTreeMap<String, String>,
    pub masteruri: String,
    pub host: String,
}

/// A capability a robot offers, together with the nodes that provide it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub namespace: String,
    pub cap_type: String,
    pub images: Vec<String>,
    pub description: String,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RobotDescription {
    pub machine: String,
    pub robot_name: String,
    pub robot_type: String,
    pub robot_images: Vec<String>,
    pub robot_descr: String,
    pub capabilities: Vec<Capability>,
}

/// Nodes of one loaded launch file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeListResult {
    pub path: String,
    pub masteruri: String,
    pub host: String,
    pub nodes: Vec<String>,
    pub robot_descriptions: Vec<RobotDescription>,
    /// Nodelet manager name → names of the nodes it hosts.
    pub nodelets: BTreeMap<String, Vec<String>>,
}

impl NodeListResult {
    /// The nodelet manager hosting `node`, if any.
    pub fn manager_of(&self, node: &str) -> Option<&str> {
        self.nodelets
            .iter()
            .find(|(_, nodes)| nodes.iter().any(|n| n == node))
            .map(|(manager, _)| manager.as_str())
    }
}

/// One file in a reconstructed include tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncludeNode {
    /// Line in the parent file that includes this one.
    pub line: u32,
    pub path: String,
    /// Whether `path` exists on the service host.
    pub exists: bool,
    pub children: Vec<IncludeNode>,
}

impl IncludeNode {
    pub fn new(line: u32, path: impl Into<String>, exists: bool) -> Self {
        Self {
            line,
            path: path.into(),
            exists,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<IncludeNode>) -> Self {
        self.children = children;
        self
    }

    /// Pre-order walk over this node and all of its descendants.
    pub fn iter(&self) -> IncludeIter<'_> {
        IncludeIter { stack: vec![self] }
    }
}

/// Pre-order iterator returned by [`IncludeNode::iter`].
pub struct IncludeIter<'a> {
    stack: Vec<&'a IncludeNode>,
}

impl<'a> Iterator for IncludeIter<'a> {
    type Item = &'a IncludeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Modification times of a launch file and the files it includes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LaunchMtimes {
    pub path: String,
    /// Seconds since the Unix epoch.
    pub mtime: f64,
    pub included_files: BTreeMap<String, f64>,
}

impl LaunchMtimes {
    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        mtime_to_datetime(self.mtime)
    }
}

/// Convert a service mtime (fractional seconds since the epoch) to UTC.
pub fn mtime_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let whole = secs.trunc();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

// ---------------------------------------------------------------------------
// Standalone start configuration
// ---------------------------------------------------------------------------

/// A parameter value; always transmitted as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Canonical text encoding: `true`/`false`, decimal numbers, `[a, b]`.
    pub fn to_text(&self) -> String {
        match self {
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            ParamValue::Text(s) => s.clone(),
            ParamValue::List(items) => {
                let inner: Vec<String> = items.iter().map(ParamValue::to_text).collect();
                format!("[{}]", inner.join(", "))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

/// Automatic restart rules for a started process.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RespawnPolicy {
    pub enabled: bool,
    /// Seconds to wait before restarting.
    pub delay: f64,
    /// Maximum number of restarts, `0` for unlimited.
    pub max: u32,
    /// Seconds a run must last before it counts against `max`.
    pub min_runtime: f64,
}

/// How to start a process that is not part of any loaded launch file.
///
/// Every optional field distinguishes "not provided" (`None`) from an
/// explicit value, including an explicitly empty one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartConfig {
    pub package: Option<String>,
    pub binary: Option<String>,
    pub binary_path: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub fullname: Option<String>,
    /// Command prefix, e.g. `"gdb -ex run --args"`.
    pub prefix: Option<String>,
    pub cwd: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
    /// From-name → to-name.
    pub remaps: Option<BTreeMap<String, String>>,
    pub params: Option<BTreeMap<String, ParamValue>>,
    pub clear_params: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub masteruri: Option<String>,
    pub loglevel: String,
    pub respawn: RespawnPolicy,
}

impl StartConfig {
    pub fn new(package: impl Into<String>, binary: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            binary: Some(binary.into()),
            ..Self::default()
        }
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_remap(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.remaps
            .get_or_insert_with(BTreeMap::new)
            .insert(from.into(), to.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    /// Human-readable `package/binary` label used in failure reports.
    pub fn binary_label(&self) -> String {
        format!(
            "{}/{}",
            self.package.as_deref().unwrap_or_default(),
            self.binary.as_deref().unwrap_or_default()
        )
    }
}
