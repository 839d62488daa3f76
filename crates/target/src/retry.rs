// Recovery from a rejected edit token.
//
// When a save fails with `badtoken` the session may have expired or the
// user may have logged in or out in another tab. One query fetches both
// the current user and a fresh token for the page; what happens next
// depends on whether the account is still the same.

use serde_json::Value;

use wikiedit_common::protocol::actions::ACTION_QUERY;
use wikiedit_common::protocol::envelope::{self, ApiResponse};
use wikiedit_common::protocol::params::ApiParams;
use wikiedit_common::protocol::payload::QueryPayload;
use wikiedit_common::types::{PageName, UserIdentity};

/// What a token refresh found out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenRefresh {
    /// Same account: store the token and replay the save.
    SameUser { token: String },
    /// Another account (or anonymous) now owns the session.
    NewUser { user: UserIdentity, token: String },
    /// The reply lacked user info or a token.
    Unusable,
}

/// `action=query&meta=userinfo&prop=info&titles=<page>&indexpageids=&intoken=edit`
///
/// `meta=userinfo` cannot be combined with a token request, but it can be
/// combined with `prop=info`, which is why the page is queried too. The
/// normalised title keeps a `normalized` block out of the reply.
pub fn refresh_params(page: &PageName) -> ApiParams {
    ApiParams::action(ACTION_QUERY)
        .with("meta", "userinfo")
        .with("prop", "info")
        .with("titles", page.to_text())
        .with("indexpageids", "")
        .with("intoken", "edit")
}

pub fn interpret_refresh(current: &UserIdentity, body: Option<&Value>) -> TokenRefresh {
    let Some(ApiResponse::Payload(query)) =
        body.and_then(|body| envelope::decode::<QueryPayload>(ACTION_QUERY, body).ok())
    else {
        return TokenRefresh::Unusable;
    };
    let (Some(info), Some(token)) = (query.userinfo.as_ref(), query.edit_token()) else {
        return TokenRefresh::Unusable;
    };
    let token = token.to_string();
    if current.is_same_account(info) {
        TokenRefresh::SameUser { token }
    } else {
        TokenRefresh::NewUser { user: UserIdentity::from_user_info(info), token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(userinfo: Value) -> Value {
        json!({ "query": {
            "userinfo": userinfo,
            "pageids": ["12"],
            "pages": { "12": { "title": "Sandbox", "edittoken": "fresh+\\" } }
        }})
    }

    #[test]
    fn params_use_normalised_title() {
        let params = refresh_params(&PageName::new("user_talk:bob"));
        assert_eq!(params.get("titles"), Some("User talk:bob"));
        assert_eq!(params.get("intoken"), Some("edit"));
        assert_eq!(params.get("indexpageids"), Some(""));
    }

    #[test]
    fn same_user_gets_new_token() {
        let body = reply(json!({ "id": 5, "name": "Ann" }));
        assert_eq!(
            interpret_refresh(&UserIdentity::named(5, "Ann"), Some(&body)),
            TokenRefresh::SameUser { token: "fresh+\\".into() }
        );
    }

    #[test]
    fn logged_out_user_becomes_anonymous() {
        let body = reply(json!({ "id": 0, "name": "192.0.2.1", "anon": "" }));
        assert_eq!(
            interpret_refresh(&UserIdentity::named(5, "Ann"), Some(&body)),
            TokenRefresh::NewUser { user: UserIdentity::anonymous(), token: "fresh+\\".into() }
        );
    }

    #[test]
    fn anonymous_user_logged_in_elsewhere() {
        let body = reply(json!({ "id": 9, "name": "Cy" }));
        assert_eq!(
            interpret_refresh(&UserIdentity::anonymous(), Some(&body)),
            TokenRefresh::NewUser { user: UserIdentity::named(9, "Cy"), token: "fresh+\\".into() }
        );
    }

    #[test]
    fn missing_pieces_are_unusable() {
        let ann = UserIdentity::named(5, "Ann");
        let no_token = json!({ "query": {
            "userinfo": { "id": 5 }, "pageids": ["12"], "pages": { "12": {} }
        }});
        assert_eq!(interpret_refresh(&ann, Some(&no_token)), TokenRefresh::Unusable);

        let no_user =
            json!({ "query": { "pageids": ["12"], "pages": { "12": { "edittoken": "t" } } } });
        assert_eq!(interpret_refresh(&ann, Some(&no_user)), TokenRefresh::Unusable);

        assert_eq!(interpret_refresh(&UserIdentity::anonymous(), None), TokenRefresh::Unusable);
    }
}
