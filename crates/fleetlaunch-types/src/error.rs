//! Failure types.
//!
//! Two disjoint layers:
//!
//! * [`TransportError`] – the call itself broke (timeout, lost connection,
//!   undecodable frame, inconsistent include stream).  Always fatal to the
//!   current call.
//! * [`LaunchError`] – the service answered with a non-OK [`StatusCode`].
//!   Each recoverable kind carries the data a caller needs to resubmit.

use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

use crate::status::StatusCode;
use crate::wire::Method;

/// The call could not be completed at the transport level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("{method} timed out after {after:?}")]
    Timeout { method: Method, after: Duration },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Codec error: {0}")]
    Codec(String),

    /// The service aborted the call without a status reply.
    #[error("{method} aborted by service: {message}")]
    Aborted { method: Method, message: String },

    /// An include record named a parent that is not open in the tree.
    #[error("Malformed include stream: unexpected root item {root_path}")]
    StreamConsistency { root_path: String },
}

/// Typed failure of a launch-service operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LaunchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Generic remote failure, also used for codes a call does not recognise.
    #[error("Remote error {code}: {message}")]
    Remote { code: StatusCode, message: String },

    #[error("Already open: {path}: {message}")]
    AlreadyOpen { path: String, message: String },

    /// Ambiguous executable; resubmit with one of `candidates`.
    #[error("Binary selection required ({} candidates): {message}", .candidates.len())]
    BinarySelection {
        candidates: Vec<String>,
        message: String,
    },

    /// Ambiguous launch file; resubmit with one of `candidates`.
    #[error("Launch selection required ({} candidates): {message}", .candidates.len())]
    LaunchSelection {
        candidates: Vec<String>,
        message: String,
    },

    /// Arguments missing; `params` holds each argument's current/default value.
    #[error("Parameters required ({} arguments): {message}", .params.len())]
    ParamsRequired {
        params: BTreeMap<String, String>,
        message: String,
    },

    #[error("Not found: {path}: {message}")]
    FileNotFound { path: String, message: String },

    #[error("Node not found: {message}")]
    NodeNotFound { message: String },
}

impl LaunchError {
    /// `true` when the caller can resubmit the same request with a
    /// disambiguating choice (binary, launch file or argument values).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LaunchError::BinarySelection { .. }
                | LaunchError::LaunchSelection { .. }
                | LaunchError::ParamsRequired { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, LaunchError::Transport(_))
    }

    /// The protocol status that produced this failure, `None` for transport
    /// failures.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            LaunchError::Transport(_) => None,
            LaunchError::Remote { code, .. } => Some(*code),
            LaunchError::AlreadyOpen { .. } => Some(StatusCode::AlreadyOpen),
            LaunchError::BinarySelection { .. } => Some(StatusCode::MultipleBinaries),
            LaunchError::LaunchSelection { .. } => Some(StatusCode::MultipleLaunches),
            LaunchError::ParamsRequired { .. } => Some(StatusCode::ParamsRequired),
            LaunchError::FileNotFound { .. } => Some(StatusCode::FileNotFound),
            LaunchError::NodeNotFound { .. } => Some(StatusCode::NodeNotFound),
        }
    }
}
