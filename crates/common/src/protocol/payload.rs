// Typed payloads for each API namespace.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::actions;
use super::lenient;

/// `visualeditor` payload of `paction=parse`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParsePayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub basetimestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub starttimestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient::revision")]
    pub oldid: Option<u64>,
    #[serde(default, deserialize_with = "lenient::string_values")]
    pub notices: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_values")]
    pub checkboxes: Vec<String>,
}

/// `visualeditoredit` payload of a save.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SavePayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub categorieshtml: Option<String>,
    #[serde(default, deserialize_with = "lenient::revision")]
    pub newrevid: Option<u64>,
    #[serde(default)]
    pub edit: Option<EditInfo>,
}

impl SavePayload {
    pub fn is_success(&self) -> bool {
        self.result.as_deref() == Some(actions::RESULT_SUCCESS)
    }
}

/// The nested `edit` object of a failed save: whatever the core edit API
/// and its extensions (spam blacklist, abuse filter, captcha) attached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditInfo {
    pub spam_blacklist: Option<String>,
    pub info: Option<String>,
    pub warning: Option<String>,
    pub captcha: Option<Captcha>,
    pub raw: Value,
}

impl EditInfo {
    pub fn from_value(raw: Value) -> Self {
        let spam_blacklist = raw
            .get("spamblacklist")
            .filter(|v| lenient::truthy(v))
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));
        let warning = raw
            .get("warning")
            .filter(|v| lenient::truthy(v))
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()));
        let captcha = raw
            .get("captcha")
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value::<Captcha>(v.clone()).ok());
        Self {
            spam_blacklist,
            info: lenient::string_field(&raw, "info"),
            warning,
            captcha,
            raw,
        }
    }

    /// Abuse filter hits carry an `info` prefix plus a warning message.
    pub fn is_abuse_filter_hit(&self) -> bool {
        self.warning.is_some()
            && self
                .info
                .as_deref()
                .is_some_and(|info| info.starts_with(actions::ABUSE_FILTER_INFO_PREFIX))
    }

    /// Only image captchas (those exposing a `url`) are supported.
    pub fn fancy_captcha(&self) -> Option<&Captcha> {
        self.captcha
            .as_ref()
            .filter(|captcha| captcha.url.as_deref().is_some_and(|u| !u.is_empty()))
    }
}

impl<'de> Deserialize<'de> for EditInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// A captcha challenge attached to a failed save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captcha {
    #[serde(default, deserialize_with = "lenient::string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient::string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub mime: Option<String>,
}

/// `visualeditor` payload of `paction=diff`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiffPayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub diff: Option<String>,
}

/// `visualeditor` payload of `paction=serialize`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SerializePayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub result: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub content: Option<String>,
}

/// `visualeditor` payload of `paction=serializeforcache`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CacheKeyPayload {
    #[serde(default, deserialize_with = "lenient::string")]
    pub cachekey: Option<String>,
}

/// `query` payload of `meta=userinfo&prop=info&intoken=edit`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    pub userinfo: Option<UserInfo>,
    #[serde(default)]
    pub pageids: Vec<Value>,
    #[serde(default)]
    pub pages: BTreeMap<String, PageInfo>,
}

impl QueryPayload {
    /// Edit token of the first (and only) queried page.
    pub fn edit_token(&self) -> Option<&str> {
        let first = self.pageids.first()?;
        let key = match first {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        self.pages.get(&key)?.edittoken.as_deref().filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: Option<String>,
    /// Present (usually as `""`) only for anonymous sessions.
    #[serde(default)]
    pub anon: Option<Value>,
}

impl UserInfo {
    pub fn is_anonymous(&self) -> bool {
        self.anon.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PageInfo {
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub edittoken: Option<String>,
}
