//! The remote outcome taxonomy.
//!
//! Every reply from the launch-management service carries exactly one
//! [`StatusCode`] plus a human-readable message, bundled as a
//! [`ReturnStatus`].

use serde::{Deserialize, Serialize};

/// Outcome code attached to every reply.
///
/// | Code | Meaning |
/// |---|---|
/// | [`StatusCode::Ok`] | operation succeeded |
/// | [`StatusCode::Error`] | generic remote failure |
/// | [`StatusCode::AlreadyOpen`] | resource already loaded elsewhere |
/// | [`StatusCode::MultipleBinaries`] | ambiguous executable |
/// | [`StatusCode::MultipleLaunches`] | ambiguous launch file |
/// | [`StatusCode::ParamsRequired`] | required arguments missing |
/// | [`StatusCode::FileNotFound`] | path does not resolve |
/// | [`StatusCode::NodeNotFound`] | named node does not exist |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    #[default]
    Ok,
    Error,
    AlreadyOpen,
    MultipleBinaries,
    MultipleLaunches,
    ParamsRequired,
    FileNotFound,
    NodeNotFound,
}

impl StatusCode {
    /// Every code, in wire order.
    pub const ALL: [StatusCode; 8] = [
        StatusCode::Ok,
        StatusCode::Error,
        StatusCode::AlreadyOpen,
        StatusCode::MultipleBinaries,
        StatusCode::MultipleLaunches,
        StatusCode::ParamsRequired,
        StatusCode::FileNotFound,
        StatusCode::NodeNotFound,
    ];

    /// The name used on the wire, e.g. `"MULTIPLE_BINARIES"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Error => "ERROR",
            StatusCode::AlreadyOpen => "ALREADY_OPEN",
            StatusCode::MultipleBinaries => "MULTIPLE_BINARIES",
            StatusCode::MultipleLaunches => "MULTIPLE_LAUNCHES",
            StatusCode::ParamsRequired => "PARAMS_REQUIRED",
            StatusCode::FileNotFound => "FILE_NOT_FOUND",
            StatusCode::NodeNotFound => "NODE_NOT_FOUND",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status block embedded in every reply.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReturnStatus {
    #[serde(default)]
    pub code: StatusCode,
    #[serde(default)]
    pub error_msg: String,
}

impl ReturnStatus {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn new(code: StatusCode, error_msg: impl Into<String>) -> Self {
        Self {
            code,
            error_msg: error_msg.into(),
        }
    }
}
