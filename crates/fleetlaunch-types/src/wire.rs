//! Request and reply messages of the launch-service RPC surface.
//!
//! Field names follow the service's message schema.  Replies tolerate
//! missing fields (`#[serde(default)]`) because the service omits fields it
//! left at their default value.

use serde::{Deserialize, Serialize};

use crate::status::ReturnStatus;

/// The ten remote procedures exposed by the launch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    LoadLaunch,
    ReloadLaunch,
    GetLoadedFiles,
    GetMtime,
    GetChangedBinaries,
    UnloadLaunch,
    GetNodes,
    GetIncludedFiles,
    StartNode,
    StartStandaloneNode,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::LoadLaunch => "LoadLaunch",
            Method::ReloadLaunch => "ReloadLaunch",
            Method::GetLoadedFiles => "GetLoadedFiles",
            Method::GetMtime => "GetMtime",
            Method::GetChangedBinaries => "GetChangedBinaries",
            Method::UnloadLaunch => "UnloadLaunch",
            Method::GetNodes => "GetNodes",
            Method::GetIncludedFiles => "GetIncludedFiles",
            Method::StartNode => "StartNode",
            Method::StartStandaloneNode => "StartStandaloneNode",
        }
    }

    /// `true` for calls answered by a stream of replies.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Method::GetLoadedFiles | Method::GetNodes | Method::GetIncludedFiles | Method::StartNode
        )
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `name=value` pair (launch arguments, environment variables, parameters).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remapping {
    pub from_name: String,
    pub to_name: String,
}

// ---------------------------------------------------------------------------
// Launch files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadLaunchRequest {
    pub package: String,
    pub launch: String,
    pub path: String,
    pub args: Vec<Argument>,
    pub request_args: bool,
    pub masteruri: String,
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadLaunchReply {
    #[serde(default)]
    pub status: ReturnStatus,
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub changed_nodes: Vec<String>,
}

/// Request naming one loaded launch file; used by reload, unload and mtime.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchFile {
    pub path: String,
    #[serde(default)]
    pub masteruri: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LoadedFile {
    #[serde(default)]
    pub package: String,
    pub path: String,
    #[serde(default)]
    pub args: Vec<Argument>,
    #[serde(default)]
    pub masteruri: String,
    #[serde(default)]
    pub host: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileMtime {
    pub path: String,
    #[serde(default)]
    pub mtime: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MtimeReply {
    pub path: String,
    #[serde(default)]
    pub mtime: f64,
    #[serde(default)]
    pub included_files: Vec<FileMtime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodesRequest {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeMtime {
    pub name: String,
    #[serde(default)]
    pub mtime: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChangedBinariesReply {
    #[serde(default)]
    pub nodes: Vec<NodeMtime>,
}

// ---------------------------------------------------------------------------
// Node listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListNodesRequest {
    pub request_description: bool,
    pub masteruri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilityMsg {
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "type")]
    pub cap_type: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RobotDescriptionMsg {
    #[serde(default)]
    pub machine: String,
    #[serde(default)]
    pub robot_name: String,
    #[serde(default)]
    pub robot_type: String,
    #[serde(default)]
    pub robot_images: Vec<String>,
    #[serde(default)]
    pub robot_descr: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityMsg>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeletGroup {
    pub manager: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// One loaded launch file's worth of nodes, as streamed by `GetNodes`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListNodesReply {
    pub launch_file: String,
    #[serde(default)]
    pub masteruri: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub node: Vec<String>,
    #[serde(default)]
    pub description: Vec<RobotDescriptionMsg>,
    #[serde(default)]
    pub nodelets: Vec<NodeletGroup>,
}

// ---------------------------------------------------------------------------
// Included files
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncludedFilesRequest {
    pub path: String,
    pub recursive: bool,
    pub unique: bool,
    pub pattern: Vec<String>,
}

/// One flat record of the include stream: `path` is included from
/// `root_path` at line `linenr`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IncludedFilesReply {
    pub root_path: String,
    #[serde(default)]
    pub linenr: u32,
    pub path: String,
    #[serde(default)]
    pub exists: bool,
}

// ---------------------------------------------------------------------------
// Starting nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeStart {
    pub name: String,
    #[serde(default)]
    pub opt_binary: String,
    #[serde(default)]
    pub opt_launch: String,
    #[serde(default)]
    pub loglevel: String,
    #[serde(default)]
    pub logformat: String,
    #[serde(default)]
    pub masteruri: String,
    #[serde(default)]
    pub reload_global_param: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartNodeRequest {
    pub nodes: Vec<NodeStart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartNodeReply {
    #[serde(default)]
    pub status: ReturnStatus,
    #[serde(default)]
    pub name: String,
    /// Candidate binaries on `MULTIPLE_BINARIES`.
    #[serde(default)]
    pub path: Vec<String>,
    /// Candidate launch files on `MULTIPLE_LAUNCHES`.
    #[serde(default)]
    pub launch: Vec<String>,
}

/// Sparse standalone start request.  `None` fields are not transmitted at
/// all; the respawn block and the log level always are.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StartConfigRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<Vec<Argument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaps: Option<Vec<Remapping>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Argument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_params: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masteruri: Option<String>,
    #[serde(default)]
    pub loglevel: String,
    #[serde(default)]
    pub respawn: bool,
    #[serde(default)]
    pub respawn_delay: f64,
    #[serde(default)]
    pub respawn_max: u32,
    #[serde(default)]
    pub respawn_min_runtime: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StartStandaloneReply {
    #[serde(default)]
    pub status: ReturnStatus,
    #[serde(default)]
    pub path: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streaming_methods() {
        assert!(Method::GetNodes.is_streaming());
        assert!(Method::GetIncludedFiles.is_streaming());
        assert!(!Method::LoadLaunch.is_streaming());
        assert!(!Method::StartStandaloneNode.is_streaming());
    }

    #[test]
    fn capability_type_field_is_renamed() {
        let cap: CapabilityMsg =
            serde_json::from_str(r#"{"name":"nav","type":"navigation"}"#).unwrap();
        assert_eq!(cap.cap_type, "navigation");
        assert!(cap.nodes.is_empty());
    }

    #[test]
    fn empty_start_config_request_only_carries_always_present_fields() {
        let json = serde_json::to_value(StartConfigRequest::default()).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "loglevel",
                "respawn",
                "respawn_delay",
                "respawn_max",
                "respawn_min_runtime"
            ]
        );
    }

    #[test]
    fn reply_without_status_decodes_as_ok() {
        let reply: LoadLaunchReply = serde_json::from_str(r#"{"path":["/a.launch"]}"#).unwrap();
        assert!(reply.status.code.is_ok());
        assert_eq!(reply.path, vec!["/a.launch"]);
    }
}
