//! Mapping of reply status codes to typed failures.
//!
//! The vocabulary is shared by all calls; each call only declares which
//! codes it recognises.  A non-OK code outside that set becomes
//! [`LaunchError::Remote`] carrying the raw code, never a silent success.
//!
//! | Code | Failure |
//! |---|---|
//! | `ERROR` | [`LaunchError::Remote`] |
//! | `ALREADY_OPEN` | [`LaunchError::AlreadyOpen`] |
//! | `MULTIPLE_BINARIES` | [`LaunchError::BinarySelection`] |
//! | `MULTIPLE_LAUNCHES` | [`LaunchError::LaunchSelection`] |
//! | `PARAMS_REQUIRED` | [`LaunchError::ParamsRequired`] |
//! | `FILE_NOT_FOUND` | [`LaunchError::FileNotFound`] |
//! | `NODE_NOT_FOUND` | [`LaunchError::NodeNotFound`] |

use fleetlaunch_types::wire::Argument;
use fleetlaunch_types::{LaunchError, ReturnStatus, StatusCode};

/// Codes recognised by `LoadLaunch`.
pub const LOAD_LAUNCH: &[StatusCode] = &[
    StatusCode::MultipleLaunches,
    StatusCode::ParamsRequired,
    StatusCode::AlreadyOpen,
];

/// Codes recognised by `ReloadLaunch` and `UnloadLaunch`.
pub const LAUNCH_FILE: &[StatusCode] = &[StatusCode::FileNotFound];

/// Codes recognised by `StartNode`.
pub const START_NODE: &[StatusCode] = &[
    StatusCode::Error,
    StatusCode::NodeNotFound,
    StatusCode::MultipleBinaries,
    StatusCode::MultipleLaunches,
];

/// Codes recognised by `StartStandaloneNode`.
pub const START_STANDALONE: &[StatusCode] = &[
    StatusCode::MultipleBinaries,
    StatusCode::FileNotFound,
    StatusCode::Error,
];

/// Reply data a failure may need to carry.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailureContext<'a> {
    /// The path or binary the request was about.
    pub subject: &'a str,
    /// Candidate binaries, or resolved paths for `ALREADY_OPEN`.
    pub paths: &'a [String],
    /// Candidate launch files.
    pub launches: &'a [String],
    /// Argument names with their current/default values.
    pub args: &'a [Argument],
}

/// `Ok(())` for [`StatusCode::Ok`], the matching typed failure otherwise.
pub fn check_status(
    status: &ReturnStatus,
    recognized: &[StatusCode],
    ctx: &FailureContext<'_>,
) -> Result<(), LaunchError> {
    let code = status.code;
    let message = status.error_msg.clone();
    if code.is_ok() {
        return Ok(());
    }
    if !recognized.contains(&code) {
        return Err(LaunchError::Remote { code, message });
    }
    Err(match code {
        StatusCode::Ok => return Ok(()),
        StatusCode::Error => LaunchError::Remote { code, message },
        StatusCode::AlreadyOpen => LaunchError::AlreadyOpen {
            path: ctx
                .paths
                .first()
                .cloned()
                .unwrap_or_else(|| ctx.subject.to_string()),
            message,
        },
        StatusCode::MultipleBinaries => LaunchError::BinarySelection {
            candidates: ctx.paths.to_vec(),
            message,
        },
        StatusCode::MultipleLaunches => LaunchError::LaunchSelection {
            candidates: ctx.launches.to_vec(),
            message,
        },
        StatusCode::ParamsRequired => LaunchError::ParamsRequired {
            params: ctx
                .args
                .iter()
                .map(|a| (a.name.clone(), a.value.clone()))
                .collect(),
            message,
        },
        StatusCode::FileNotFound => LaunchError::FileNotFound {
            path: ctx.subject.to_string(),
            message,
        },
        StatusCode::NodeNotFound => LaunchError::NodeNotFound { message },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ok_is_success_for_every_call() {
        let ctx = FailureContext::default();
        for recognized in [LOAD_LAUNCH, LAUNCH_FILE, START_NODE, START_STANDALONE, &[][..]] {
            assert!(check_status(&ReturnStatus::ok(), recognized, &ctx).is_ok());
        }
    }

    #[test]
    fn every_code_maps_to_its_failure_kind() {
        let candidates = paths(&["/opt/a/bin", "/opt/b/bin", "/opt/c/bin"]);
        let launches = paths(&["/x/one.launch", "/y/one.launch"]);
        let args = vec![Argument::new("robot", "r1"), Argument::new("sim", "false")];
        let ctx = FailureContext {
            subject: "/x/one.launch",
            paths: &candidates,
            launches: &launches,
            args: &args,
        };
        let all = &StatusCode::ALL[..];

        for code in StatusCode::ALL.into_iter().filter(|c| !c.is_ok()) {
            let err = check_status(&ReturnStatus::new(code, "msg"), all, &ctx).unwrap_err();
            assert_eq!(err.status_code(), Some(code), "{code} mapped to {err:?}");
            match err {
                LaunchError::Remote { message, .. } => assert_eq!(message, "msg"),
                LaunchError::AlreadyOpen { path, message } => {
                    assert_eq!(path, "/opt/a/bin");
                    assert_eq!(message, "msg");
                }
                LaunchError::BinarySelection { candidates: c, .. } => assert_eq!(c, candidates),
                LaunchError::LaunchSelection { candidates: c, .. } => assert_eq!(c, launches),
                LaunchError::ParamsRequired { params, .. } => {
                    assert_eq!(params.len(), 2);
                    assert_eq!(params["robot"], "r1");
                    assert_eq!(params["sim"], "false");
                }
                LaunchError::FileNotFound { path, .. } => assert_eq!(path, "/x/one.launch"),
                LaunchError::NodeNotFound { message } => assert_eq!(message, "msg"),
                LaunchError::Transport(_) => panic!("status mapping never yields transport errors"),
            }
        }
    }

    #[test]
    fn binary_candidates_keep_received_order() {
        let candidates = paths(&["/z", "/a", "/m"]);
        let ctx = FailureContext {
            paths: &candidates,
            ..FailureContext::default()
        };
        let err = check_status(
            &ReturnStatus::new(StatusCode::MultipleBinaries, ""),
            START_STANDALONE,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LaunchError::BinarySelection {
                candidates: paths(&["/z", "/a", "/m"]),
                message: String::new(),
            }
        );
    }

    #[test]
    fn unrecognized_code_becomes_generic_remote_failure() {
        let ctx = FailureContext::default();
        let err = check_status(
            &ReturnStatus::new(StatusCode::NodeNotFound, "no such node"),
            LAUNCH_FILE,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LaunchError::Remote {
                code: StatusCode::NodeNotFound,
                message: "no such node".into(),
            }
        );
    }

    #[test]
    fn already_open_falls_back_to_subject() {
        let ctx = FailureContext {
            subject: "/requested.launch",
            ..FailureContext::default()
        };
        let err = check_status(
            &ReturnStatus::new(StatusCode::AlreadyOpen, "open"),
            LOAD_LAUNCH,
            &ctx,
        )
        .unwrap_err();
        assert!(matches!(err, LaunchError::AlreadyOpen { path, .. } if path == "/requested.launch"));
    }
}
