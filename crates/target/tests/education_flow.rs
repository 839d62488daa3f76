mod support;

use chrono::{DateTime, Utc};
use serde_json::json;
use tempfile::TempDir;

use wikiedit_common::types::UserIdentity;
use wikiedit_target::education::{
    persist, EducationPrefs, EducationRegistry, EducationStore, FileEducationStore, Persistence,
    Selection, StoreError,
};
use wikiedit_target::ErrorKind;

use support::*;

/// A store whose local flag cannot be written, like a browser with
/// storage disabled.
#[derive(Default)]
struct NoLocalStorage {
    cookie: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl EducationStore for NoLocalStorage {
    fn local_flag(&self) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn set_local_flag(&self) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::other("storage disabled")))
    }

    fn cookie_flag(&self, now: DateTime<Utc>) -> Result<bool, StoreError> {
        Ok(self.cookie.lock().unwrap().is_some_and(|expires| expires > now))
    }

    fn set_cookie_flag(&self, expires: DateTime<Utc>) -> Result<(), StoreError> {
        *self.cookie.lock().unwrap() = Some(expires);
        Ok(())
    }
}

#[tokio::test]
async fn logged_in_user_dismissal_saves_option() {
    let h = harness();
    let dir = TempDir::new().unwrap();
    let store = FileEducationStore::new(dir.path().join("education.toml"));
    let prefs = EducationPrefs::load(&h.target.user(), false, &store, Utc::now()).unwrap();
    let mut registry = EducationRegistry::new(prefs, false);
    let tip = registry.register("link", "Links", "Link to other pages").unwrap();

    let Selection::Opened { persist: Some(persistence), .. } = registry.select(tip) else {
        panic!("tip should open and ask to persist");
    };
    assert_eq!(persistence, Persistence::SaveUserOption);

    h.transport.reply("options", json!({ "options": "success" }));
    persist(persistence, &h.target, &store).await.unwrap();

    let call = &h.transport.calls_for("options")[0];
    assert_eq!(call.get("optionname"), Some("visualeditor-hideusered"));
    assert_eq!(call.get("optionvalue"), Some("1"));
    assert_eq!(call.get("token"), Some("token-1+\\"));
    assert!(!store.local_flag().unwrap(), "logged-in users do not touch local storage");
}

#[tokio::test]
async fn option_save_errors_surface() {
    let h = harness();
    let store = NoLocalStorage::default();
    h.transport
        .reply("options", json!({ "error": { "code": "notloggedin", "info": "Not logged in" } }));
    let error = persist(Persistence::SaveUserOption, &h.target, &store).await.unwrap_err();
    match error {
        wikiedit_target::education::EducationError::Api(error) => {
            assert_eq!(error.kind(), ErrorKind::Server)
        }
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn anonymous_dismissal_sets_local_flag() {
    let h = harness_for(session(), UserIdentity::anonymous());
    let dir = TempDir::new().unwrap();
    let store = FileEducationStore::new(dir.path().join("education.toml"));

    persist(Persistence::SetLocalFlag, &h.target, &store).await.unwrap();
    assert!(store.local_flag().unwrap());
    assert!(h.transport.calls().is_empty());

    let prefs =
        EducationPrefs::load(&UserIdentity::anonymous(), false, &store, Utc::now()).unwrap();
    let mut registry = EducationRegistry::new(prefs, false);
    assert!(registry.register("link", "Links", "Link to other pages").is_none());
}

#[tokio::test]
async fn cookie_fallback_expires_after_thirty_days() {
    let h = harness_for(session(), UserIdentity::anonymous());
    let store = NoLocalStorage::default();

    persist(Persistence::SetLocalFlag, &h.target, &store).await.unwrap();
    let now = Utc::now();
    assert!(store.cookie_flag(now).unwrap());
    assert!(store.cookie_flag(now + chrono::Duration::days(29)).unwrap());
    assert!(!store.cookie_flag(now + chrono::Duration::days(31)).unwrap());
}
