//! `fleetlaunch-client` – client adapter for a remote launch service.
//!
//! Wraps the service's ten remote procedures in typed operations: requests
//! are built from plain Rust values, replies are decoded and every non-OK
//! status becomes a [`LaunchError`](fleetlaunch_types::LaunchError) variant
//! the caller can match on.
//!
//! # Modules
//!
//! - [`client`] – [`LaunchClient`], one method per service operation.
//! - [`transport`] – the [`LaunchTransport`] seam calls are issued through.
//! - [`ws_transport`] – [`WsTransport`], JSON frames over one WebSocket.
//! - [`call`] – unary and streaming call wrappers with the shared timeout.
//! - [`status_map`] – status code → typed failure.
//! - [`request`] – request builders, including the sparse standalone start.
//! - [`include_tree`] – rebuilds the include tree from a flat record stream.
//! - [`nodes`] – per-launch-file node and capability aggregation.
//! - [`config`] – `~/.fleetlaunch/config.toml` and `FLEETLAUNCH_*` overrides.
//! - [`telemetry`] – `tracing` subscriber initialisation.

pub mod call;
pub mod client;
pub mod config;
pub mod include_tree;
pub mod nodes;
pub mod request;
pub mod status_map;
pub mod telemetry;
pub mod transport;
pub mod ws_transport;

#[cfg(test)]
mod mock;

pub use call::TypedStream;
pub use client::LaunchClient;
pub use config::{ClientConfig, ConfigError, LogFormat};
pub use include_tree::IncludeTreeBuilder;
pub use request::{EmptyValuePolicy, LoadLaunchParams, StartNodeParams};
pub use transport::{LaunchTransport, ReplyStream};
pub use ws_transport::WsTransport;
