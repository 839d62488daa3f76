// Ordered form parameters for API requests.

use std::collections::BTreeMap;

use serde::Serialize;

use super::actions;

/// Form parameters sent to the API. Keys are kept sorted so requests are
/// reproducible in logs and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiParams(BTreeMap<String, String>);

impl ApiParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// `action=<action>&format=json`.
    pub fn action(action: &str) -> Self {
        Self::new().with("action", action).with("format", "json")
    }

    /// `action=visualeditor&paction=<paction>&format=json`.
    pub fn parsoid(paction: &str) -> Self {
        Self::action(actions::ACTION_VISUALEDITOR).with("paction", paction)
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key` only when `value` is present.
    pub fn with_opt<V: Into<String>>(mut self, key: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Copy every entry of `other` over this set.
    pub fn extend(&mut self, other: &ApiParams) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The `paction` if present, else the `action`. Used as a routing key
    /// by logs and test transports.
    pub fn operation(&self) -> &str {
        self.get("paction").or_else(|| self.get("action")).unwrap_or("")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ApiParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
