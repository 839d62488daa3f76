// Maps decoded API replies to typed outcomes, one function per operation.

use serde_json::Value;

use wikiedit_common::protocol::actions::{
    ERROR_BAD_TOKEN, ERROR_EDIT_CONFLICT, NS_VISUALEDITOR, NS_VISUALEDITOR_EDIT, RESULT_ERROR,
    RESULT_NO_CHANGES, RESULT_SUCCESS,
};
use wikiedit_common::protocol::envelope::{self, ApiErrorBody, ApiResponse};
use wikiedit_common::protocol::payload::{
    CacheKeyPayload, DiffPayload, EditInfo, ParsePayload, SavePayload, SerializePayload,
};
use wikiedit_common::types::RevisionId;

use crate::error::{PolicyBlock, TargetError};

/// A successfully loaded page.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPage {
    pub content: String,
    pub base_timestamp: Option<String>,
    pub start_timestamp: Option<String>,
    pub oldid: Option<RevisionId>,
    pub notices: Vec<String>,
    pub checkboxes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub content: String,
    pub categories_html: Option<String>,
    pub new_revid: Option<RevisionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    Diff(String),
    NoChanges,
}

/// Outcome of a save request before token recovery.
#[derive(Debug)]
pub enum SaveReply {
    Saved(SaveOutcome),
    EditConflict,
    /// The edit token was rejected; the caller may refresh and replay.
    BadToken,
    Failed(TargetError),
}

fn server_error(error: ApiErrorBody) -> TargetError {
    TargetError::Server { code: error.code, info: error.info }
}

fn require_body(body: Option<&Value>) -> Result<&Value, TargetError> {
    body.ok_or(TargetError::EmptyResponse)
}

pub fn classify_load(body: Option<&Value>) -> Result<LoadedPage, TargetError> {
    let payload = match envelope::decode::<ParsePayload>(NS_VISUALEDITOR, require_body(body)?)? {
        ApiResponse::Error(error) => return Err(server_error(error)),
        ApiResponse::Payload(payload) => payload,
    };
    if payload.result.as_deref() == Some(RESULT_ERROR) {
        return Err(TargetError::Server { code: RESULT_ERROR.into(), info: "Server error".into() });
    }
    let content = payload
        .content
        .ok_or(TargetError::InvalidResponse("No HTML content in response from server"))?;
    Ok(LoadedPage {
        content,
        base_timestamp: payload.basetimestamp,
        start_timestamp: payload.starttimestamp,
        oldid: payload.oldid,
        notices: payload.notices,
        checkboxes: payload.checkboxes,
    })
}

pub fn classify_diff(body: Option<&Value>) -> Result<DiffOutcome, TargetError> {
    let payload = match envelope::decode::<DiffPayload>(NS_VISUALEDITOR, require_body(body)?)? {
        ApiResponse::Error(error) => return Err(server_error(error)),
        ApiResponse::Payload(payload) => payload,
    };
    match payload.result.as_deref() {
        Some(RESULT_NO_CHANGES) => return Ok(DiffOutcome::NoChanges),
        Some(RESULT_SUCCESS) => {}
        other => {
            return Err(TargetError::Server {
                code: other.unwrap_or_default().to_string(),
                info: format!("Failed request: {}", other.unwrap_or("no result")),
            })
        }
    }
    payload
        .diff
        .map(DiffOutcome::Diff)
        .ok_or(TargetError::InvalidResponse("Invalid HTML content in response from server"))
}

pub fn classify_serialize(body: Option<&Value>) -> Result<String, TargetError> {
    let decoded = envelope::decode::<SerializePayload>(NS_VISUALEDITOR, require_body(body)?)?;
    let payload = match decoded {
        ApiResponse::Error(error) => return Err(server_error(error)),
        ApiResponse::Payload(payload) => payload,
    };
    if payload.result.as_deref() == Some(RESULT_ERROR) {
        return Err(TargetError::Server { code: RESULT_ERROR.into(), info: "Server error".into() });
    }
    payload
        .content
        .ok_or(TargetError::InvalidResponse("No Wikitext content in response from server"))
}

/// The cache key of a `serializeforcache` reply, if it carries one.
pub fn classify_cache_key(body: Option<&Value>) -> Option<String> {
    let body = body?;
    match envelope::decode::<CacheKeyPayload>(NS_VISUALEDITOR, body).ok()? {
        ApiResponse::Payload(payload) => payload.cachekey,
        ApiResponse::Error(_) => None,
    }
}

pub fn classify_save(body: Option<&Value>) -> SaveReply {
    let Some(body) = body else {
        return SaveReply::Failed(TargetError::EmptyResponse);
    };
    match envelope::decode::<SavePayload>(NS_VISUALEDITOR_EDIT, body) {
        Ok(ApiResponse::Error(error)) if error.is(ERROR_EDIT_CONFLICT) => SaveReply::EditConflict,
        Ok(ApiResponse::Payload(payload)) if payload.is_success() => match payload.content {
            Some(content) => SaveReply::Saved(SaveOutcome {
                content,
                categories_html: payload.categorieshtml,
                new_revid: payload.newrevid,
            }),
            None => classify_save_failure(body),
        },
        _ => classify_save_failure(body),
    }
}

/// Failure classification, in order: spam blacklist, abuse filter, bad
/// token, image captcha, then anything else.
fn classify_save_failure(body: &Value) -> SaveReply {
    let edit = body
        .get(NS_VISUALEDITOR_EDIT)
        .and_then(|payload| payload.get("edit"))
        .filter(|edit| edit.is_object())
        .map(|edit| EditInfo::from_value(edit.clone()));
    let error = body.get("error");
    let error_code = envelope::error_code(body);

    if let Some(matches) = edit.as_ref().and_then(|edit| edit.spam_blacklist.clone()) {
        let block = PolicyBlock::SpamBlacklist { matches };
        return SaveReply::Failed(TargetError::ContentPolicy(block));
    }
    if let Some(edit) = edit.as_ref().filter(|edit| edit.is_abuse_filter_hit()) {
        return SaveReply::Failed(TargetError::ContentPolicy(PolicyBlock::AbuseFilter {
            info: edit.info.clone().unwrap_or_default(),
            warning: edit.warning.clone().unwrap_or_default(),
        }));
    }
    if error_code == Some(ERROR_BAD_TOKEN) {
        return SaveReply::BadToken;
    }
    if let Some(captcha) = edit.as_ref().and_then(EditInfo::fancy_captcha) {
        return SaveReply::Failed(TargetError::CaptchaRequired(captcha.clone()));
    }
    SaveReply::Failed(TargetError::Unknown {
        code: error_code.map(str::to_string),
        info: error
            .and_then(|error| error.get("info"))
            .or_else(|| edit.as_ref().and_then(|edit| edit.raw.get("info")))
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}
