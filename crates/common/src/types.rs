// Core domain types shared across the wikiedit crates.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::payload::UserInfo;

pub type RevisionId = u64;

/// A wiki page title as given by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageName(String);

impl PageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display form of the title: underscores become spaces, runs of
    /// whitespace collapse, and the first letter is upper-cased. Sending the
    /// normalised form keeps `normalized` blocks out of query replies.
    pub fn to_text(&self) -> String {
        let spaced = self.0.replace('_', " ");
        let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut chars = collapsed.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for PageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The account an editing session belongs to. Anonymous when `id` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Option<u64>,
    pub name: Option<String>,
}

impl UserIdentity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn named(id: u64, name: impl Into<String>) -> Self {
        Self { id: Some(id), name: Some(name.into()) }
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }

    /// Whether a fresh user-info reply still describes this account.
    /// Ids are compared rather than names, which survives renames and
    /// title normalisation.
    pub fn is_same_account(&self, info: &UserInfo) -> bool {
        if self.is_anonymous() {
            info.is_anonymous()
        } else {
            !info.is_anonymous() && self.id == Some(info.id)
        }
    }

    pub fn from_user_info(info: &UserInfo) -> Self {
        if info.is_anonymous() {
            Self::anonymous()
        } else {
            Self { id: Some(info.id), name: info.name.clone() }
        }
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.id, &self.name) {
            (None, _) => f.write_str("anonymous"),
            (Some(_), Some(name)) => f.write_str(name),
            (Some(id), None) => write!(f, "user #{id}"),
        }
    }
}

/// State of one editing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub page: PageName,
    pub revision_id: Option<RevisionId>,
    pub edit_token: String,
    pub base_timestamp: Option<String>,
    pub start_timestamp: Option<String>,
    /// True when the session was opened on an explicit (older) revision.
    pub restoring: bool,
}

impl Session {
    pub fn new(page: PageName, edit_token: impl Into<String>) -> Self {
        Self {
            page,
            revision_id: None,
            edit_token: edit_token.into(),
            base_timestamp: None,
            start_timestamp: None,
            restoring: false,
        }
    }

    /// Latest revision as known when the session was opened.
    pub fn with_current_revision(mut self, revision: RevisionId) -> Self {
        self.revision_id = Some(revision);
        self
    }

    /// Edit a specific revision; `load` will request it explicitly.
    pub fn restoring_revision(mut self, revision: RevisionId) -> Self {
        self.revision_id = Some(revision);
        self.restoring = true;
        self
    }
}

/// The operation kinds that each hold their own busy flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Load,
    Save,
    Diff,
    Serialize,
    Submit,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] =
        [Self::Load, Self::Save, Self::Diff, Self::Serialize, Self::Submit];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Diff => "diff",
            Self::Serialize => "serialize",
            Self::Submit => "submit",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
