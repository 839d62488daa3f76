// Classic edit-form submission of wikitext.

use url::Url;

use wikiedit_common::protocol::actions::ACTION_SUBMIT;
use wikiedit_common::protocol::params::ApiParams;
use wikiedit_common::types::{PageName, Session};

/// `<index>?title=<page>&action=submit`
pub fn submit_url(index: &Url, page: &PageName) -> Url {
    let mut url = index.clone();
    url.query_pairs_mut()
        .append_pair("title", page.as_str())
        .append_pair("action", ACTION_SUBMIT);
    url
}

/// Hidden fields of the edit form, overlaid with the caller's `fields`
/// (`wpSummary`, `wpMinoredit`, `wpSave`, `wpDiff`, ...).
pub fn form_fields(session: &Session, wikitext: &str, fields: &ApiParams) -> ApiParams {
    let mut form = ApiParams::new()
        .with("format", "text/x-wiki")
        .with("model", "wikitext")
        .with_opt("oldid", session.revision_id.map(|id| id.to_string()))
        .with_opt("wpStarttime", session.start_timestamp.clone())
        .with_opt("wpEdittime", session.base_timestamp.clone())
        .with("wpTextbox1", wikitext)
        .with("wpEditToken", session.edit_token.clone());
    form.extend(fields);
    form
}
