//! `fleetlaunch-types` – shared vocabulary of the launch-service adapter.
//!
//! # Modules
//!
//! - [`status`] – the remote [`StatusCode`] taxonomy and the [`ReturnStatus`]
//!   block every reply carries.
//! - [`error`] – [`TransportError`] and the typed, retry-informing
//!   [`LaunchError`].
//! - [`model`] – caller-facing values: [`LaunchDescriptor`],
//!   [`RobotDescription`], [`NodeListResult`], [`IncludeNode`],
//!   [`StartConfig`].
//! - [`wire`] – request/reply messages of the RPC surface and the
//!   [`Method`] enumeration.

pub mod error;
pub mod model;
pub mod status;
pub mod wire;

pub use error::{LaunchError, TransportError};
pub use model::{
    Capability, IncludeNode, LaunchDescriptor, LaunchMtimes, NodeListResult, ParamValue,
    RespawnPolicy, RobotDescription, StartConfig, mtime_to_datetime,
};
pub use status::{ReturnStatus, StatusCode};
pub use wire::Method;
