// Shared fixtures for the target integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;
use url::Url;

use wikiedit_common::protocol::params::ApiParams;
use wikiedit_common::types::{PageName, Session, UserIdentity};
use wikiedit_target::telemetry::{TrackData, Tracker};
use wikiedit_target::transport::{ApiReply, ApiTransport, FormReply, TransportError};
use wikiedit_target::Target;

pub const FORM_OPERATION: &str = "form";

enum Step {
    Reply(ApiReply),
    Fail,
    Hang,
    Gated(Arc<Notify>, ApiReply),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Post,
    Get,
    Form(String),
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub params: ApiParams,
}

/// Replies queued per operation (`paction`, else `action`), consumed in
/// order. Unscripted calls fail with a transport error.
#[derive(Default)]
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
    dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, operation: &str, step: Step) {
        self.queues.lock().unwrap().entry(operation.to_string()).or_default().push_back(step);
    }

    pub fn reply(&self, operation: &str, body: Value) {
        self.push(operation, Step::Reply(ApiReply::json(body)));
    }

    pub fn reply_with(&self, operation: &str, reply: ApiReply) {
        self.push(operation, Step::Reply(reply));
    }

    pub fn reply_empty(&self, operation: &str) {
        self.push(operation, Step::Reply(ApiReply::empty()));
    }

    pub fn fail(&self, operation: &str) {
        self.push(operation, Step::Fail);
    }

    /// The call never completes; dropping it is counted by [`dropped`](Self::dropped).
    pub fn hang(&self, operation: &str) {
        self.push(operation, Step::Hang);
    }

    /// The call completes with `body` once the returned handle is notified.
    pub fn gate(&self, operation: &str, body: Value) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(operation, Step::Gated(Arc::clone(&gate), ApiReply::json(body)));
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Parameters of every call to `operation`, in order.
    pub fn calls_for(&self, operation: &str) -> Vec<ApiParams> {
        self.calls()
            .into_iter()
            .filter(|call| match &call.method {
                Method::Form(_) => operation == FORM_OPERATION,
                _ => call.params.operation() == operation,
            })
            .map(|call| call.params)
            .collect()
    }

    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    async fn run(
        &self,
        method: Method,
        operation: &str,
        params: &ApiParams,
    ) -> Result<ApiReply, TransportError> {
        self.calls.lock().unwrap().push(Call { method, params: params.clone() });
        let step = self.queues.lock().unwrap().get_mut(operation).and_then(VecDeque::pop_front);
        match step {
            Some(Step::Reply(reply)) => Ok(reply),
            Some(Step::Fail) => Err(TransportError::Status { status: 503 }),
            Some(Step::Hang) => {
                let _counter = DropCounter(Arc::clone(&self.dropped));
                std::future::pending::<()>().await;
                Err(TransportError::Cancelled)
            }
            Some(Step::Gated(gate, reply)) => {
                gate.notified().await;
                Ok(reply)
            }
            None => Err(TransportError::Request(format!("no scripted reply for `{operation}`"))),
        }
    }
}

#[async_trait]
impl ApiTransport for ScriptedTransport {
    async fn post(&self, params: &ApiParams) -> Result<ApiReply, TransportError> {
        self.run(Method::Post, params.operation(), params).await
    }

    async fn get(&self, params: &ApiParams) -> Result<ApiReply, TransportError> {
        self.run(Method::Get, params.operation(), params).await
    }

    async fn submit_form(
        &self,
        url: &Url,
        fields: &ApiParams,
    ) -> Result<FormReply, TransportError> {
        self.run(Method::Form(url.to_string()), FORM_OPERATION, fields)
            .await
            .map(|_| FormReply { status: 200, final_url: url.to_string() })
    }
}

#[derive(Default)]
pub struct RecordingTracker {
    records: Mutex<Vec<(String, TrackData)>>,
}

impl RecordingTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn topics(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|(topic, _)| topic.clone()).collect()
    }

    pub fn records(&self, topic: &str) -> Vec<TrackData> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, data)| data.clone())
            .collect()
    }
}

impl Tracker for RecordingTracker {
    fn track(&self, topic: &str, data: &TrackData) {
        self.records.lock().unwrap().push((topic.to_string(), data.clone()));
    }
}

// ── Fixtures ───────────────────────────────────────────────────────

pub const PAGE_HTML: &str = "<!DOCTYPE html>\
<html prefix=\"dc: http://purl.org/dc/terms/\" about=\"./Sandbox\">\
<head><meta charset=\"utf-8\"><title>Sandbox</title></head>\
<body lang=\"en\" class=\"mw-body-content\">\
<p id=\"mwAQ\">Hello <b>world</b></p><p id=\"mwAg\">Second</p></body></html>";

pub fn alice() -> UserIdentity {
    UserIdentity::named(7, "Alice")
}

pub fn session() -> Session {
    Session::new(PageName::new("Sandbox"), "token-1+\\").with_current_revision(100)
}

pub struct Harness {
    pub target: Target,
    pub transport: Arc<ScriptedTransport>,
    pub tracker: Arc<RecordingTracker>,
}

pub fn harness() -> Harness {
    harness_for(session(), alice())
}

pub fn harness_for(session: Session, user: UserIdentity) -> Harness {
    let transport = ScriptedTransport::new();
    let tracker = RecordingTracker::new();
    let target = Target::new(session, user, transport.clone())
        .with_tracker(tracker.clone())
        .with_index_url(Url::parse("https://wiki.example.org/w/index.php").unwrap());
    Harness { target, transport, tracker }
}

pub fn parse_reply() -> Value {
    json!({ "visualeditor": {
        "result": "success",
        "content": PAGE_HTML,
        "basetimestamp": "20140101000000",
        "starttimestamp": "20140101000500",
        "oldid": 101,
        "notices": { "protected": "<div class=\"mw-warning\">This page is semi-protected.</div>" },
        "checkboxes": { "wpMinoredit": "<input id=\"wpMinoredit\" type=\"checkbox\">" }
    }})
}

pub fn save_success() -> Value {
    json!({ "visualeditoredit": {
        "result": "success",
        "content": "<p>saved</p>",
        "categorieshtml": "<div id=\"catlinks\"></div>",
        "newrevid": 102
    }})
}

pub fn bad_token() -> Value {
    json!({ "error": { "code": "badtoken", "info": "Invalid token" } })
}

pub fn token_refresh(userinfo: Value, token: &str) -> Value {
    json!({ "query": {
        "userinfo": userinfo,
        "pageids": ["55"],
        "pages": { "55": { "title": "Sandbox", "edittoken": token } }
    }})
}

/// Load the page through `harness`.
pub async fn loaded(harness: &Harness) {
    harness.transport.reply("parse", parse_reply());
    harness.target.load().await.unwrap();
}
