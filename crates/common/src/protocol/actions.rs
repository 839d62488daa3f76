// API action names and parameter values used by the editor target.

// ── Actions ────────────────────────────────────────────────────────
pub const ACTION_VISUALEDITOR: &str = "visualeditor";
pub const ACTION_VISUALEDITOR_EDIT: &str = "visualeditoredit";
pub const ACTION_QUERY: &str = "query";
pub const ACTION_OPTIONS: &str = "options";
pub const ACTION_SUBMIT: &str = "submit";

// ── Sub-actions of `visualeditor` ──────────────────────────────────
pub const PACTION_PARSE: &str = "parse";
pub const PACTION_SERIALIZE_FOR_CACHE: &str = "serializeforcache";
pub const PACTION_DIFF: &str = "diff";
pub const PACTION_SERIALIZE: &str = "serialize";

// ── Response namespaces ────────────────────────────────────────────
pub const NS_VISUALEDITOR: &str = ACTION_VISUALEDITOR;
pub const NS_VISUALEDITOR_EDIT: &str = ACTION_VISUALEDITOR_EDIT;

// ── Error codes with dedicated handling ────────────────────────────
pub const ERROR_EDIT_CONFLICT: &str = "editconflict";
pub const ERROR_BAD_TOKEN: &str = "badtoken";
pub const ERROR_BAD_CACHE_KEY: &str = "badcachekey";

// ── Result values ──────────────────────────────────────────────────
pub const RESULT_SUCCESS: &str = "success";
pub const RESULT_ERROR: &str = "error";
pub const RESULT_NO_CHANGES: &str = "nochanges";

/// Prefix of `edit.info` when an abuse filter tripped.
pub const ABUSE_FILTER_INFO_PREFIX: &str = "Hit AbuseFilter:";

/// User option that hides the education popups for logged-in users.
pub const OPTION_HIDE_USER_EDUCATION: &str = "visualeditor-hideusered";

/// All `paction` values the target sends.
pub const PARSOID_ACTIONS: &[&str] =
    &[PACTION_PARSE, PACTION_SERIALIZE_FOR_CACHE, PACTION_DIFF, PACTION_SERIALIZE];
