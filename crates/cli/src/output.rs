// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

use wikiedit_target::{ErrorKind, PolicyBlock, TargetError};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Write a value to stdout in the selected format.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", human_fn(value))
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Write an error to stderr in the selected format.
pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line =
                render_human_stderr_line("error", message, io::stderr().is_terminal(), ANSI_RED);
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "error": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Write a warning to stderr in the selected format.
pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Human => {
            let line = render_human_stderr_line(
                "warning",
                message,
                io::stderr().is_terminal(),
                ANSI_YELLOW,
            );
            let _ = writeln!(err, "{line}");
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "warning": {
                    "code": code,
                    "message": message,
                }
            });
            let _ = serde_json::to_writer(&mut err, &obj);
            let _ = writeln!(err);
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    let message = format!("{error:#}");
    let Some(target_err) = error.chain().find_map(|cause| cause.downcast_ref::<TargetError>())
    else {
        return ("ERROR", message);
    };

    match target_err {
        TargetError::EditConflict => (
            "EDIT_CONFLICT",
            "Someone else edited the page since it was loaded. \
             Load it again and reapply your changes."
                .to_string(),
        ),
        TargetError::StaleToken => (
            "STALE_TOKEN",
            "The edit token was rejected and could not be refreshed. Log in again and retry."
                .to_string(),
        ),
        TargetError::IdentityChanged { user } => (
            "IDENTITY_CHANGED",
            format!("The session now belongs to {user}. Retry the save to continue as {user}."),
        ),
        TargetError::ContentPolicy(PolicyBlock::SpamBlacklist { matches }) => {
            ("SPAM_BLACKLIST", format!("The text matched the spam blacklist: {matches}"))
        }
        TargetError::ContentPolicy(PolicyBlock::AbuseFilter { info, .. }) => {
            ("ABUSE_FILTER", format!("An abuse filter blocked the edit: {info}"))
        }
        TargetError::CaptchaRequired(captcha) => (
            "CAPTCHA_REQUIRED",
            match &captcha.url {
                Some(url) => format!("A captcha must be solved before saving: {url}"),
                None => "A captcha must be solved before saving.".to_string(),
            },
        ),
        other => (error_code(other.kind()), message),
    }
}

fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Busy => "BUSY",
        ErrorKind::Transport => "NETWORK_ERROR",
        ErrorKind::EmptyResponse => "EMPTY_RESPONSE",
        ErrorKind::Server => "API_ERROR",
        ErrorKind::Protocol | ErrorKind::InvalidResponse => "INVALID_RESPONSE",
        ErrorKind::NotConfigured => "NOT_CONFIGURED",
        ErrorKind::Document => "INVALID_DOCUMENT",
        _ => "ERROR",
    }
}

fn render_human_stderr_line(label: &str, message: &str, is_tty: bool, color: &str) -> String {
    if is_tty {
        format!("{color}{label}:{ANSI_RESET} {message}")
    } else {
        format!("{label}: {message}")
    }
}
