// Tagged-union decoding of API response envelopes.
//
// Every API reply is either `{ <namespace>: {...} }` or
// `{ error: { code, info } }`. The envelope is validated here, once, so
// callers never inspect raw JSON for `error` or payload fields themselves.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::lenient;

/// The `error` object of an API reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

impl ApiErrorBody {
    pub fn new(code: impl Into<String>, info: impl Into<String>) -> Self {
        Self { code: code.into(), info: info.into() }
    }

    fn from_value(value: &Value) -> Self {
        Self {
            code: lenient::string_field(value, "code").unwrap_or_default(),
            info: lenient::string_field(value, "info").unwrap_or_default(),
        }
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

/// A validated API reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse<T> {
    Payload(T),
    Error(ApiErrorBody),
}

impl<T> ApiResponse<T> {
    pub fn error(&self) -> Option<&ApiErrorBody> {
        match self {
            Self::Error(error) => Some(error),
            Self::Payload(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Neither the expected payload nor an error object is present.
    #[error("response has neither `{namespace}` nor `error`")]
    MissingPayload { namespace: String },
    #[error("malformed `{namespace}` payload: {source}")]
    Malformed {
        namespace: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode `body` as an envelope with payload under `namespace`.
///
/// An `error` object wins over a payload when both are present.
pub fn decode<T: DeserializeOwned>(
    namespace: &str,
    body: &Value,
) -> Result<ApiResponse<T>, EnvelopeError> {
    if let Some(error) = body.get("error").filter(|error| lenient::truthy(error)) {
        return Ok(ApiResponse::Error(ApiErrorBody::from_value(error)));
    }

    match body.get(namespace).filter(|payload| lenient::truthy(payload)) {
        Some(payload) => serde_json::from_value(payload.clone())
            .map(ApiResponse::Payload)
            .map_err(|source| EnvelopeError::Malformed {
                namespace: namespace.to_string(),
                source,
            }),
        None => Err(EnvelopeError::MissingPayload { namespace: namespace.to_string() }),
    }
}

/// Shortcut for replies that only matter when they carry an error code,
/// e.g. the `badcachekey` check.
pub fn error_code(body: &Value) -> Option<&str> {
    body.get("error").and_then(|error| error.get("code")).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::payload::SerializePayload;
    use serde_json::json;

    #[test]
    fn decodes_payload_under_namespace() {
        let body = json!({ "visualeditor": { "result": "success", "content": "''hi''" } });
        let decoded = decode::<SerializePayload>("visualeditor", &body).unwrap();
        match decoded {
            ApiResponse::Payload(payload) => {
                assert_eq!(payload.content.as_deref(), Some("''hi''"));
            }
            other => panic!("expected payload, got {other:?}"),
        }
    }

    #[test]
    fn error_object_takes_precedence() {
        let body = json!({
            "error": { "code": "badtoken", "info": "Invalid token" },
            "visualeditor": { "result": "success" }
        });
        let decoded = decode::<SerializePayload>("visualeditor", &body).unwrap();
        assert_eq!(decoded.error(), Some(&ApiErrorBody::new("badtoken", "Invalid token")));
    }

    #[test]
    fn missing_payload_and_error_is_protocol_violation() {
        let body = json!({ "warnings": {} });
        let error = decode::<SerializePayload>("visualeditor", &body).unwrap_err();
        assert!(matches!(error, EnvelopeError::MissingPayload { .. }));
    }

    #[test]
    fn null_payload_counts_as_missing() {
        let body = json!({ "visualeditor": null });
        assert!(decode::<SerializePayload>("visualeditor", &body).is_err());
    }

    #[test]
    fn non_object_payload_is_malformed() {
        let body = json!({ "visualeditor": "nope" });
        let error = decode::<SerializePayload>("visualeditor", &body).unwrap_err();
        assert!(matches!(error, EnvelopeError::Malformed { .. }));
    }

    #[test]
    fn error_code_reads_nested_code() {
        assert_eq!(error_code(&json!({ "error": { "code": "badcachekey" } })), Some("badcachekey"));
        assert_eq!(error_code(&json!({ "visualeditor": {} })), None);
    }
}
