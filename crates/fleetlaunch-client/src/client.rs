//! [`LaunchClient`] – typed front door to a remote launch service.
//!
//! Every operation builds its request, issues it through the unary or
//! streaming call wrapper, and either maps the reply status to a typed
//! failure or funnels the streamed records through the include-tree
//! reconstructor or the node aggregator.
//!
//! # Example
//!
//! ```rust,no_run
//! use fleetlaunch_client::{ClientConfig, LaunchClient, LoadLaunchParams};
//! use fleetlaunch_types::LaunchError;
//!
//! # async fn run() -> Result<(), LaunchError> {
//! let client = LaunchClient::connect(&ClientConfig::default()).await?;
//! let params = LoadLaunchParams::new("demo_nodes", "talker_listener.launch");
//! match client.load_launch(&params).await {
//!     Ok((path, _args)) => println!("loaded {path}"),
//!     Err(LaunchError::ParamsRequired { params: defaults, .. }) => {
//!         client.load_launch(&params.clone().with_args(defaults)).await?;
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use fleetlaunch_types::wire::{
    ChangedBinariesReply, IncludedFilesReply, LaunchFile, ListNodesReply, ListNodesRequest,
    LoadLaunchReply, LoadedFile, MtimeReply, NodesRequest, StartNodeReply, StartStandaloneReply,
};
use fleetlaunch_types::{
    IncludeNode, LaunchDescriptor, LaunchError, LaunchMtimes, Method, NodeListResult, StartConfig,
    ReturnStatus, StatusCode, TransportError,
};
use futures_util::TryStreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::call::{self, TypedStream};
use crate::config::ClientConfig;
use crate::include_tree;
use crate::nodes;
use crate::request::{
    EmptyValuePolicy, LoadLaunchParams, StartNodeParams, included_files_request,
    start_config_request,
};
use crate::status_map::{self, FailureContext, check_status};
use crate::transport::LaunchTransport;
use crate::ws_transport::WsTransport;

/// Client for one launch service.
///
/// Cheap to clone; clones share the transport.  Calls issued concurrently on
/// one client rely on the transport to keep their replies apart.
#[derive(Clone)]
pub struct LaunchClient {
    transport: Arc<dyn LaunchTransport>,
    timeout: Duration,
    empty_values: EmptyValuePolicy,
}

impl LaunchClient {
    /// Create a client over `transport` with the shared per-call `timeout`.
    pub fn new(transport: Arc<dyn LaunchTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            empty_values: EmptyValuePolicy::default(),
        }
    }

    pub fn from_config(transport: Arc<dyn LaunchTransport>, config: &ClientConfig) -> Self {
        Self::new(transport, config.timeout()).with_empty_value_policy(config.empty_values)
    }

    /// Open a WebSocket connection to `config.endpoint`.
    pub async fn connect(config: &ClientConfig) -> Result<Self, LaunchError> {
        let transport = WsTransport::connect(&config.endpoint).await?;
        Ok(Self::from_config(Arc::new(transport), config))
    }

    pub fn with_empty_value_policy(mut self, policy: EmptyValuePolicy) -> Self {
        self.empty_values = policy;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // -----------------------------------------------------------------------
    // Launch files
    // -----------------------------------------------------------------------

    /// Load a launch file.  Returns the resolved path and the arguments the
    /// service used.
    ///
    /// # Errors
    ///
    /// [`LaunchError::LaunchSelection`] when the package holds several files
    /// of that name, [`LaunchError::ParamsRequired`] when arguments are
    /// missing (or were requested), [`LaunchError::AlreadyOpen`] when the
    /// file is already loaded.
    pub async fn load_launch(
        &self,
        params: &LoadLaunchParams,
    ) -> Result<(String, BTreeMap<String, String>), LaunchError> {
        let reply: LoadLaunchReply = self
            .unary(Method::LoadLaunch, &params.to_request())
            .await?;
        let subject = if params.path.is_empty() {
            params.launch.as_str()
        } else {
            params.path.as_str()
        };
        self.check(
            Method::LoadLaunch,
            &reply.status,
            status_map::LOAD_LAUNCH,
            FailureContext {
                subject,
                paths: &reply.path,
                launches: &reply.path,
                args: &reply.args,
            },
        )?;
        let path = first_path(Method::LoadLaunch, reply.path)?;
        let args = reply.args.into_iter().map(|a| (a.name, a.value)).collect();
        info!(path = %path, "launch file loaded");
        Ok((path, args))
    }

    /// Reload a loaded launch file.  Returns its path and the names of the
    /// nodes whose configuration changed.
    pub async fn reload_launch(
        &self,
        path: &str,
        masteruri: &str,
    ) -> Result<(String, Vec<String>), LaunchError> {
        let reply: LoadLaunchReply = self
            .unary(Method::ReloadLaunch, &launch_file(path, masteruri))
            .await?;
        self.check(
            Method::ReloadLaunch,
            &reply.status,
            status_map::LAUNCH_FILE,
            FailureContext {
                subject: path,
                ..FailureContext::default()
            },
        )?;
        let reloaded = reply.path.into_iter().next().unwrap_or_else(|| path.to_string());
        info!(path = %reloaded, changed = reply.changed_nodes.len(), "launch file reloaded");
        Ok((reloaded, reply.changed_nodes))
    }

    /// Unload a launch file; returns the path the service unloaded.
    pub async fn unload_launch(&self, path: &str, masteruri: &str) -> Result<String, LaunchError> {
        let reply: LoadLaunchReply = self
            .unary(Method::UnloadLaunch, &launch_file(path, masteruri))
            .await?;
        self.check(
            Method::UnloadLaunch,
            &reply.status,
            status_map::LAUNCH_FILE,
            FailureContext {
                subject: path,
                ..FailureContext::default()
            },
        )?;
        let unloaded = reply.path.into_iter().next().unwrap_or_else(|| path.to_string());
        info!(path = %unloaded, "launch file unloaded");
        Ok(unloaded)
    }

    /// All launch files currently loaded on the service.
    pub async fn get_loaded_files(&self) -> Result<Vec<LaunchDescriptor>, LaunchError> {
        let files: Vec<LoadedFile> = self
            .stream::<_, LoadedFile>(Method::GetLoadedFiles, &serde_json::json!({}))
            .await?
            .try_collect()
            .await?;
        Ok(files.into_iter().map(launch_descriptor).collect())
    }

    /// Modification times of `path` and every file it includes.
    pub async fn get_mtimes(&self, path: &str) -> Result<LaunchMtimes, LaunchError> {
        let reply: MtimeReply = self.unary(Method::GetMtime, &launch_file(path, "")).await?;
        Ok(LaunchMtimes {
            path: reply.path,
            mtime: reply.mtime,
            included_files: reply
                .included_files
                .into_iter()
                .map(|f| (f.path, f.mtime))
                .collect(),
        })
    }

    /// Of the given nodes, those whose binary changed since they were
    /// started, with the binary's modification time.
    pub async fn get_changed_binaries(
        &self,
        names: &[String],
    ) -> Result<BTreeMap<String, f64>, LaunchError> {
        let request = NodesRequest {
            names: names.to_vec(),
        };
        let reply: ChangedBinariesReply = self.unary(Method::GetChangedBinaries, &request).await?;
        let asked: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(reply
            .nodes
            .into_iter()
            .filter(|node| asked.contains(node.name.as_str()))
            .map(|node| (node.name, node.mtime))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    /// Nodes of every loaded launch file, one result per file.
    pub async fn get_nodes(
        &self,
        request_description: bool,
        masteruri: &str,
    ) -> Result<Vec<NodeListResult>, LaunchError> {
        let request = ListNodesRequest {
            request_description,
            masteruri: masteruri.to_string(),
        };
        let replies = self.stream::<_, ListNodesReply>(Method::GetNodes, &request).await?;
        Ok(nodes::collect_node_lists(replies).await?)
    }

    /// Start one node declared in a loaded launch file.
    ///
    /// # Errors
    ///
    /// [`LaunchError::BinarySelection`] / [`LaunchError::LaunchSelection`]
    /// carry the candidates to resubmit with via
    /// [`StartNodeParams::with_binary`] / [`StartNodeParams::with_launch`].
    pub async fn start_node(&self, params: &StartNodeParams) -> Result<(), LaunchError> {
        let mut replies = self
            .stream::<_, StartNodeReply>(Method::StartNode, &params.to_request())
            .await?;
        while let Some(reply) = replies.try_next().await? {
            self.check(
                Method::StartNode,
                &reply.status,
                status_map::START_NODE,
                FailureContext {
                    subject: &params.name,
                    paths: &reply.path,
                    launches: &reply.launch,
                    args: &[],
                },
            )?;
        }
        info!(node = %params.name, "node started");
        Ok(())
    }

    /// Start a process described entirely by `cfg`.
    pub async fn start_standalone_node(&self, cfg: &StartConfig) -> Result<(), LaunchError> {
        let request = start_config_request(cfg, self.empty_values);
        let reply: StartStandaloneReply =
            self.unary(Method::StartStandaloneNode, &request).await?;
        let label = cfg.binary_label();
        self.check(
            Method::StartStandaloneNode,
            &reply.status,
            status_map::START_STANDALONE,
            FailureContext {
                subject: &label,
                paths: &reply.path,
                ..FailureContext::default()
            },
        )?;
        info!(binary = %label, "standalone node started");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Included files
    // -----------------------------------------------------------------------

    /// Lazy stream of the raw include records for `root`.
    pub async fn included_files_stream(
        &self,
        root: &str,
        recursive: bool,
        unique: bool,
        patterns: &[String],
    ) -> Result<TypedStream<IncludedFilesReply>, LaunchError> {
        let request = included_files_request(root, recursive, unique, patterns);
        Ok(self.stream(Method::GetIncludedFiles, &request).await?)
    }

    /// The include tree of `root`: one [`IncludeNode`] per file `root`
    /// includes, each with its own includes as children.
    pub async fn get_included_files(
        &self,
        root: &str,
        recursive: bool,
        patterns: &[String],
    ) -> Result<Vec<IncludeNode>, LaunchError> {
        let records = self
            .included_files_stream(root, recursive, false, patterns)
            .await?;
        Ok(include_tree::rebuild_tree(root, records).await?)
    }

    /// Every distinct file included by `root`, directly or transitively.
    pub async fn get_included_files_set(
        &self,
        root: &str,
        recursive: bool,
        patterns: &[String],
    ) -> Result<BTreeSet<String>, LaunchError> {
        let records = self
            .included_files_stream(root, recursive, true, patterns)
            .await?;
        Ok(include_tree::collect_unique(records).await?)
    }

    /// Include references found in `text` (a file path or inline content),
    /// without descending into them.
    pub async fn get_included_path(
        &self,
        text: &str,
        patterns: &[String],
    ) -> Result<Vec<IncludeNode>, LaunchError> {
        let records = self
            .included_files_stream(text, false, false, patterns)
            .await?;
        Ok(include_tree::collect_flat(records).await?)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    async fn unary<Req, Resp>(&self, method: Method, request: &Req) -> Result<Resp, TransportError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        call::unary(self.transport.as_ref(), method, request, self.timeout).await
    }

    async fn stream<Req, Item>(
        &self,
        method: Method,
        request: &Req,
    ) -> Result<TypedStream<Item>, TransportError>
    where
        Req: Serialize,
        Item: DeserializeOwned + Send + 'static,
    {
        call::server_stream(self.transport.as_ref(), method, request, self.timeout).await
    }

    fn check(
        &self,
        method: Method,
        status: &ReturnStatus,
        recognized: &[StatusCode],
        ctx: FailureContext<'_>,
    ) -> Result<(), LaunchError> {
        check_status(status, recognized, &ctx).inspect_err(|e| {
            if e.is_recoverable() {
                debug!(method = %method, error = %e, "selection required");
            } else {
                warn!(method = %method, code = %status.code, error = %e, "call failed");
            }
        })
    }
}

fn launch_file(path: &str, masteruri: &str) -> LaunchFile {
    LaunchFile {
        path: path.to_string(),
        masteruri: masteruri.to_string(),
    }
}

fn first_path(method: Method, paths: Vec<String>) -> Result<String, TransportError> {
    paths
        .into_iter()
        .next()
        .ok_or_else(|| TransportError::Codec(format!("{method} reply without path")))
}

fn launch_descriptor(file: LoadedFile) -> LaunchDescriptor {
    let launch = Path::new(&file.path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    LaunchDescriptor {
        package: file.package,
        launch,
        path: file.path,
        args: file.args.into_iter().map(|a| (a.name, a.value)).collect(),
        masteruri: file.masteruri,
        host: file.host,
    }
}
