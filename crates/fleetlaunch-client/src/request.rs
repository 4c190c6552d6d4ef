//! Request builders.
//!
//! Unary and streaming requests are plain field-by-field constructions.  The
//! standalone start request is sparse: a field is transmitted only when the
//! caller provided it, because the service treats "unset" differently from
//! "set to empty".

use std::collections::BTreeMap;

use fleetlaunch_types::StartConfig;
use fleetlaunch_types::wire::{
    Argument, IncludedFilesRequest, LoadLaunchRequest, NodeStart, Remapping, StartConfigRequest,
    StartNodeRequest,
};
use serde::{Deserialize, Serialize};

/// What to do with a field the caller set to an empty value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyValuePolicy {
    /// Treat `Some("")` and empty collections like `None`.
    #[default]
    OmitEmpty,
    /// Transmit every provided field, even when empty.
    Transmit,
}

impl EmptyValuePolicy {
    fn text(self, value: &Option<String>) -> Option<String> {
        match value {
            Some(v) if v.is_empty() && self == EmptyValuePolicy::OmitEmpty => None,
            other => other.clone(),
        }
    }

    fn list<T>(self, value: Option<Vec<T>>) -> Option<Vec<T>> {
        match value {
            Some(v) if v.is_empty() && self == EmptyValuePolicy::OmitEmpty => None,
            other => other,
        }
    }
}

/// Build the sparse `StartStandaloneNode` request for `cfg`.
///
/// The log level and the whole respawn block are always transmitted; their
/// defaults (`""`, `false`, `0`) are meaningful to the service.
pub fn start_config_request(cfg: &StartConfig, policy: EmptyValuePolicy) -> StartConfigRequest {
    let env = cfg.env.as_ref().map(pairs);
    let remaps = cfg.remaps.as_ref().map(|remaps| {
        remaps
            .iter()
            .map(|(from, to)| Remapping {
                from_name: from.clone(),
                to_name: to.clone(),
            })
            .collect()
    });
    let params = cfg.params.as_ref().map(|params| {
        params
            .iter()
            .map(|(name, value)| Argument::new(name.clone(), value.to_text()))
            .collect()
    });

    StartConfigRequest {
        package: policy.text(&cfg.package),
        binary: policy.text(&cfg.binary),
        binary_path: policy.text(&cfg.binary_path),
        name: policy.text(&cfg.name),
        namespace: policy.text(&cfg.namespace),
        fullname: policy.text(&cfg.fullname),
        prefix: policy.text(&cfg.prefix),
        cwd: policy.text(&cfg.cwd),
        env: policy.list(env),
        remaps: policy.list(remaps),
        params: policy.list(params),
        clear_params: policy.list(cfg.clear_params.clone()),
        args: policy.list(cfg.args.clone()),
        masteruri: policy.text(&cfg.masteruri),
        loglevel: cfg.loglevel.clone(),
        respawn: cfg.respawn.enabled,
        respawn_delay: cfg.respawn.delay,
        respawn_max: cfg.respawn.max,
        respawn_min_runtime: cfg.respawn.min_runtime,
    }
}

fn pairs(map: &BTreeMap<String, String>) -> Vec<Argument> {
    map.iter()
        .map(|(name, value)| Argument::new(name.clone(), value.clone()))
        .collect()
}

/// Parameters of a `LoadLaunch` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadLaunchParams {
    pub package: String,
    pub launch: String,
    pub path: String,
    pub args: BTreeMap<String, String>,
    /// Ask the service to answer `PARAMS_REQUIRED` with the declared
    /// arguments instead of loading.
    pub request_args: bool,
    pub masteruri: String,
    pub host: String,
}

impl LoadLaunchParams {
    pub fn new(package: impl Into<String>, launch: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            launch: launch.into(),
            ..Self::default()
        }
    }

    /// Load by explicit path instead of package lookup.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// Resubmit with the argument values a `ParamsRequired` failure asked for.
    pub fn with_args(mut self, args: BTreeMap<String, String>) -> Self {
        self.args.extend(args);
        self.request_args = false;
        self
    }

    pub fn requesting_args(mut self) -> Self {
        self.request_args = true;
        self
    }

    pub fn on_master(mut self, masteruri: impl Into<String>) -> Self {
        self.masteruri = masteruri.into();
        self
    }

    pub fn to_request(&self) -> LoadLaunchRequest {
        LoadLaunchRequest {
            package: self.package.clone(),
            launch: self.launch.clone(),
            path: self.path.clone(),
            args: pairs(&self.args),
            request_args: self.request_args,
            masteruri: self.masteruri.clone(),
            host: self.host.clone(),
        }
    }
}

/// Parameters of a `StartNode` call for one node of a loaded launch file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartNodeParams {
    /// Full name of the node as declared in the launch file.
    pub name: String,
    /// Binary to use when the package has several with the same name.
    pub opt_binary: String,
    /// Launch file to use when several loaded files declare the node.
    pub opt_launch: String,
    pub loglevel: String,
    pub logformat: String,
    pub masteruri: String,
    pub reload_global_param: bool,
}

impl StartNodeParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Resubmit with a choice from a `BinarySelection` failure.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.opt_binary = binary.into();
        self
    }

    /// Resubmit with a choice from a `LaunchSelection` failure.
    pub fn with_launch(mut self, launch: impl Into<String>) -> Self {
        self.opt_launch = launch.into();
        self
    }

    pub fn with_loglevel(mut self, loglevel: impl Into<String>) -> Self {
        self.loglevel = loglevel.into();
        self
    }

    pub fn to_request(&self) -> StartNodeRequest {
        StartNodeRequest {
            nodes: vec![NodeStart {
                name: self.name.clone(),
                opt_binary: self.opt_binary.clone(),
                opt_launch: self.opt_launch.clone(),
                loglevel: self.loglevel.clone(),
                logformat: self.logformat.clone(),
                masteruri: self.masteruri.clone(),
                reload_global_param: self.reload_global_param,
            }],
        }
    }
}

pub fn included_files_request(
    path: &str,
    recursive: bool,
    unique: bool,
    patterns: &[String],
) -> IncludedFilesRequest {
    IncludedFilesRequest {
        path: path.to_string(),
        recursive,
        unique,
        pattern: patterns.to_vec(),
    }
}
