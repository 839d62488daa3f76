// Consistent exit codes for the wikiedit CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/argument error
//   11 = authentication error (stale token, identity changed)
//   12 = edit conflict
//   13 = network error
//   14 = content refused (spam blacklist, abuse filter, captcha)

use std::process;

use wikiedit_target::{ErrorKind, TargetError};

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    Auth = 11,
    Conflict = 12,
    Network = 13,
    Refused = 14,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if let Some(target_err) = cause.downcast_ref::<TargetError>() {
                return Self::from_kind(target_err.kind());
            }
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>() {
                return match io_err.kind() {
                    std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionRefused => {
                        Self::Network
                    }
                    _ => Self::Error,
                };
            }
        }
        Self::Error
    }

    pub fn from_kind(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::StaleToken | ErrorKind::IdentityChanged => Self::Auth,
            ErrorKind::EditConflict => Self::Conflict,
            ErrorKind::Transport | ErrorKind::EmptyResponse => Self::Network,
            ErrorKind::ContentPolicy | ErrorKind::CaptchaRequired => Self::Refused,
            ErrorKind::NotConfigured => Self::Usage,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}
