// Error taxonomy of the target.

use thiserror::Error;

use wikiedit_common::protocol::envelope::EnvelopeError;
use wikiedit_common::protocol::payload::Captcha;
use wikiedit_common::types::{OperationKind, UserIdentity};

use crate::document::DocumentError;
use crate::transport::TransportError;

/// Coarse classification of a [`TargetError`], stable enough to switch on
/// (exit codes, event payloads, telemetry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Busy,
    Transport,
    Protocol,
    Server,
    InvalidResponse,
    EditConflict,
    StaleToken,
    ContentPolicy,
    CaptchaRequired,
    IdentityChanged,
    EmptyResponse,
    Unknown,
    Document,
    NotLoaded,
    NotConfigured,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Server => "server",
            Self::InvalidResponse => "invalid_response",
            Self::EditConflict => "edit_conflict",
            Self::StaleToken => "stale_token",
            Self::ContentPolicy => "content_policy",
            Self::CaptchaRequired => "captcha_required",
            Self::IdentityChanged => "identity_changed",
            Self::EmptyResponse => "empty_response",
            Self::Unknown => "unknown",
            Self::Document => "document",
            Self::NotLoaded => "not_loaded",
            Self::NotConfigured => "not_configured",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the wiki refused content on policy grounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyBlock {
    /// The text matched the spam blacklist.
    SpamBlacklist { matches: String },
    /// An abuse filter tripped and asked the user to reconsider.
    AbuseFilter { info: String, warning: String },
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("a {0} request is already in flight")]
    Busy(OperationKind),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid response from server: {0}")]
    Protocol(#[from] EnvelopeError),
    #[error("unsuccessful request: {code}: {info}")]
    Server { code: String, info: String },
    #[error("{0}")]
    InvalidResponse(&'static str),
    #[error("edit conflict")]
    EditConflict,
    #[error("edit token expired and could not be refreshed")]
    StaleToken,
    #[error("edit blocked: {}", describe_block(.0))]
    ContentPolicy(PolicyBlock),
    #[error("a captcha must be solved before saving")]
    CaptchaRequired(Captcha),
    #[error("session now belongs to {user}")]
    IdentityChanged { user: UserIdentity },
    #[error("empty response from server")]
    EmptyResponse,
    #[error("save failed: {}", .info.as_deref().unwrap_or("unknown error"))]
    Unknown { code: Option<String>, info: Option<String> },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("no document has been loaded")]
    NotLoaded,
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

fn describe_block(block: &PolicyBlock) -> String {
    match block {
        PolicyBlock::SpamBlacklist { matches } => format!("spam blacklist matched {matches}"),
        PolicyBlock::AbuseFilter { info, .. } => info.clone(),
    }
}

impl TargetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Busy(_) => ErrorKind::Busy,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::Server { .. } => ErrorKind::Server,
            Self::InvalidResponse(_) => ErrorKind::InvalidResponse,
            Self::EditConflict => ErrorKind::EditConflict,
            Self::StaleToken => ErrorKind::StaleToken,
            Self::ContentPolicy(_) => ErrorKind::ContentPolicy,
            Self::CaptchaRequired(_) => ErrorKind::CaptchaRequired,
            Self::IdentityChanged { .. } => ErrorKind::IdentityChanged,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::Unknown { .. } => ErrorKind::Unknown,
            Self::Document(_) => ErrorKind::Document,
            Self::NotLoaded => ErrorKind::NotLoaded,
            Self::NotConfigured(_) => ErrorKind::NotConfigured,
        }
    }

    /// The `type` recorded with `performance.user.saveError`.
    pub fn save_failure_type(&self) -> &'static str {
        match self {
            Self::EmptyResponse => "empty",
            Self::ContentPolicy(PolicyBlock::SpamBlacklist { .. }) => "spamblacklist",
            Self::ContentPolicy(PolicyBlock::AbuseFilter { .. }) => "abusefilter",
            Self::StaleToken | Self::IdentityChanged { .. } => "badtoken",
            Self::CaptchaRequired(_) => "captcha",
            Self::Transport(_) => "network",
            _ => "unknown",
        }
    }
}
