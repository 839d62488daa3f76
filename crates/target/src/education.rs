// Education popups: "pulsating dot" tips attached to toolbar tools.
//
// Each tip shows a dot until the user opens it once. Opening any tip
// records that the user has seen the education, either as a user option
// (logged-in) or as a local flag (anonymous), so the dots stay hidden in
// later sessions. At most one popup is open at a time; the registry is
// the explicit owner of that state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use wikiedit_common::protocol::actions::OPTION_HIDE_USER_EDUCATION;
use wikiedit_common::types::UserIdentity;

use crate::error::TargetError;
use crate::target::Target;

/// Key of the anonymous "seen it" flag.
pub const LOCAL_FLAG_KEY: &str = "ve-hideusered";
/// Lifetime of the cookie written when the local flag cannot be stored.
pub const COOKIE_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("education store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("education store parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("education store serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum EducationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not save user option: {0}")]
    Api(#[from] TargetError),
}

/// Client-side persistence for anonymous users.
pub trait EducationStore: Send + Sync {
    fn local_flag(&self) -> Result<bool, StoreError>;
    fn set_local_flag(&self) -> Result<(), StoreError>;
    /// Whether an unexpired cookie flag exists at `now`.
    fn cookie_flag(&self, now: DateTime<Utc>) -> Result<bool, StoreError>;
    fn set_cookie_flag(&self, expires: DateTime<Utc>) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct StoredFlags {
    hide_user_education: bool,
    cookie_expires: Option<DateTime<Utc>>,
}

/// Stores the flags in a TOML file, `~/.wikiedit/education.toml` by default.
#[derive(Debug, Clone)]
pub struct FileEducationStore {
    path: PathBuf,
}

impl FileEducationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        crate::config::global_dir().map(|d| d.join("education.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoredFlags, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(toml::from_str(&contents)?),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Ok(StoredFlags::default())
            }
            Err(error) => Err(error.into()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut StoredFlags)) -> Result<(), StoreError> {
        let mut flags = self.read()?;
        apply(&mut flags);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string_pretty(&flags)?)?;
        Ok(())
    }
}

impl EducationStore for FileEducationStore {
    fn local_flag(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.hide_user_education)
    }

    fn set_local_flag(&self) -> Result<(), StoreError> {
        self.update(|flags| flags.hide_user_education = true)
    }

    fn cookie_flag(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self.read()?.cookie_expires.is_some_and(|expires| expires > now))
    }

    fn set_cookie_flag(&self, expires: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(|flags| flags.cookie_expires = Some(expires))
    }
}

/// Everything that decides whether tips are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EducationPrefs {
    pub anonymous: bool,
    /// The `visualeditor-hideusered` user option.
    pub hide_user_education: bool,
    pub local_flag: bool,
    pub cookie_flag: bool,
}

impl EducationPrefs {
    pub fn load(
        user: &UserIdentity,
        hide_user_education: bool,
        store: &dyn EducationStore,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let anonymous = user.is_anonymous();
        Ok(Self {
            anonymous,
            hide_user_education,
            local_flag: anonymous && store.local_flag()?,
            cookie_flag: anonymous && store.cookie_flag(now)?,
        })
    }

    /// Logged-in users follow their option; anonymous users the local
    /// flag or its cookie fallback.
    pub fn wants_education(&self) -> bool {
        if self.anonymous {
            !self.local_flag && !self.cookie_flag
        } else {
            !self.hide_user_education
        }
    }
}

pub fn should_show(has_dummy_toolbar: bool, prefs: &EducationPrefs) -> bool {
    !has_dummy_toolbar && prefs.wants_education()
}

/// How to remember that the user has seen the education.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    SaveUserOption,
    SetLocalFlag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TipId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EducationTip {
    pub name: String,
    pub title: String,
    pub text: String,
    dot_visible: bool,
    popup_open: bool,
    active: bool,
}

impl EducationTip {
    pub fn dot_visible(&self) -> bool {
        self.dot_visible
    }

    pub fn popup_open(&self) -> bool {
        self.popup_open
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

/// Result of selecting a tool that carries a tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The popup opened. `closed` is the tip that was open before.
    Opened { closed: Option<TipId>, persist: Option<Persistence> },
    /// No tip involvement; run the tool's normal action.
    PassThrough,
    /// The popup is already open.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct EducationRegistry {
    tips: Vec<EducationTip>,
    open: Option<TipId>,
    prefs: EducationPrefs,
    has_dummy_toolbar: bool,
}

impl EducationRegistry {
    pub fn new(prefs: EducationPrefs, has_dummy_toolbar: bool) -> Self {
        Self { tips: Vec::new(), open: None, prefs, has_dummy_toolbar }
    }

    /// Attach a tip to a tool. Returns `None` when tips are not shown for
    /// this user; the tool then behaves normally.
    pub fn register(&mut self, name: &str, title: &str, text: &str) -> Option<TipId> {
        if !should_show(self.has_dummy_toolbar, &self.prefs) {
            return None;
        }
        self.tips.push(EducationTip {
            name: name.to_string(),
            title: title.to_string(),
            text: text.to_string(),
            dot_visible: true,
            popup_open: false,
            active: false,
        });
        Some(TipId(self.tips.len() - 1))
    }

    pub fn tip(&self, id: TipId) -> Option<&EducationTip> {
        self.tips.get(id.0)
    }

    pub fn open_tip(&self) -> Option<TipId> {
        self.open
    }

    pub fn prefs(&self) -> &EducationPrefs {
        &self.prefs
    }

    pub fn select(&mut self, id: TipId) -> Selection {
        let Some(tip) = self.tips.get(id.0) else {
            return Selection::PassThrough;
        };
        if !tip.dot_visible {
            return if tip.popup_open { Selection::Ignored } else { Selection::PassThrough };
        }

        let closed = self.open.take();
        if let Some(previous) = closed.and_then(|prev| self.tips.get_mut(prev.0)) {
            previous.popup_open = false;
            previous.active = false;
            previous.dot_visible = true;
        }
        if let Some(tip) = self.tips.get_mut(id.0) {
            tip.dot_visible = false;
            tip.popup_open = true;
            tip.active = true;
            debug!(tip = %tip.name, "education popup opened");
        }
        self.open = Some(id);

        let persist = if self.prefs.anonymous {
            Some(Persistence::SetLocalFlag)
        } else if !self.prefs.hide_user_education {
            self.prefs.hide_user_education = true;
            Some(Persistence::SaveUserOption)
        } else {
            None
        };
        Selection::Opened { closed, persist }
    }

    /// The popup's dismiss button.
    pub fn dismiss(&mut self, id: TipId) {
        if let Some(tip) = self.tips.get_mut(id.0) {
            tip.popup_open = false;
            tip.active = false;
        }
        self.open = None;
    }
}

/// Carry out a [`Persistence`] returned by [`EducationRegistry::select`].
pub async fn persist(
    persistence: Persistence,
    target: &Target,
    store: &dyn EducationStore,
) -> Result<(), EducationError> {
    match persistence {
        Persistence::SaveUserOption => {
            target.save_user_option(OPTION_HIDE_USER_EDUCATION, "1").await?;
        }
        Persistence::SetLocalFlag => {
            if let Err(error) = store.set_local_flag() {
                info!(%error, "local flag unavailable, falling back to cookie");
                store.set_cookie_flag(Utc::now() + Duration::days(COOKIE_LIFETIME_DAYS))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn logged_in() -> EducationPrefs {
        EducationPrefs { anonymous: false, ..EducationPrefs::default() }
    }

    fn anonymous() -> EducationPrefs {
        EducationPrefs { anonymous: true, ..EducationPrefs::default() }
    }

    #[test]
    fn visibility_rules() {
        assert!(should_show(false, &logged_in()));
        assert!(!should_show(true, &logged_in()));
        assert!(!should_show(false, &EducationPrefs { hide_user_education: true, ..logged_in() }));
        assert!(should_show(false, &anonymous()));
        assert!(!should_show(false, &EducationPrefs { local_flag: true, ..anonymous() }));
        assert!(!should_show(false, &EducationPrefs { cookie_flag: true, ..anonymous() }));
        // The user option is irrelevant for anonymous users.
        assert!(should_show(false, &EducationPrefs { hide_user_education: true, ..anonymous() }));
    }

    #[test]
    fn hidden_tips_are_not_registered() {
        let mut registry = EducationRegistry::new(logged_in(), true);
        assert!(registry.register("link", "Links", "Add links").is_none());
    }

    #[test]
    fn opening_one_tip_closes_the_other() {
        let mut registry = EducationRegistry::new(anonymous(), false);
        let link = registry.register("link", "Links", "Add links").unwrap();
        let cite = registry.register("cite", "Citations", "Add references").unwrap();

        assert_eq!(
            registry.select(link),
            Selection::Opened { closed: None, persist: Some(Persistence::SetLocalFlag) }
        );
        assert!(registry.tip(link).unwrap().popup_open());
        assert!(!registry.tip(link).unwrap().dot_visible());

        assert!(matches!(
            registry.select(cite),
            Selection::Opened { closed: Some(id), .. } if id == link
        ));
        let link_tip = registry.tip(link).unwrap();
        assert!(!link_tip.popup_open());
        assert!(!link_tip.is_active());
        assert!(link_tip.dot_visible());
        assert_eq!(registry.open_tip(), Some(cite));
    }

    #[test]
    fn logged_in_user_saves_option_once() {
        let mut registry = EducationRegistry::new(logged_in(), false);
        let link = registry.register("link", "Links", "Add links").unwrap();
        let cite = registry.register("cite", "Citations", "Add references").unwrap();
        assert!(matches!(
            registry.select(link),
            Selection::Opened { persist: Some(Persistence::SaveUserOption), .. }
        ));
        assert!(registry.prefs().hide_user_education);
        assert!(matches!(registry.select(cite), Selection::Opened { persist: None, .. }));
    }

    #[test]
    fn select_after_dismiss_passes_through() {
        let mut registry = EducationRegistry::new(anonymous(), false);
        let link = registry.register("link", "Links", "Add links").unwrap();
        registry.select(link);
        assert_eq!(registry.select(link), Selection::Ignored);

        registry.dismiss(link);
        assert_eq!(registry.open_tip(), None);
        assert!(!registry.tip(link).unwrap().is_active());
        assert_eq!(registry.select(link), Selection::PassThrough);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileEducationStore::new(dir.path().join("state").join("education.toml"));
        let now = Utc::now();
        assert!(!store.local_flag().unwrap());
        assert!(!store.cookie_flag(now).unwrap());

        store.set_local_flag().unwrap();
        store.set_cookie_flag(now + Duration::days(COOKIE_LIFETIME_DAYS)).unwrap();
        assert!(store.local_flag().unwrap());
        assert!(store.cookie_flag(now).unwrap());
        assert!(!store.cookie_flag(now + Duration::days(31)).unwrap());
    }

    #[test]
    fn prefs_ignore_store_for_logged_in_users() {
        let dir = TempDir::new().unwrap();
        let store = FileEducationStore::new(dir.path().join("education.toml"));
        store.set_local_flag().unwrap();

        let ann = UserIdentity::named(3, "Ann");
        let prefs = EducationPrefs::load(&ann, false, &store, Utc::now()).unwrap();
        assert!(!prefs.local_flag);
        assert!(prefs.wants_education());

        let anon =
            EducationPrefs::load(&UserIdentity::anonymous(), false, &store, Utc::now()).unwrap();
        assert!(anon.local_flag);
        assert!(!anon.wants_education());
    }
}
