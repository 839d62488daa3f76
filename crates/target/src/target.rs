// The editing-session orchestrator.
//
// A `Target` owns one editing session of one page: it loads the page HTML,
// and later sends edited documents back for diffing, serialisation or
// saving. Every operation is guarded by its own busy flag, reports through
// a typed `Result`, and mirrors its outcome onto the event stream.
//
// Lock order: the cache-key cache before `state`. `state` is never held
// across an `.await`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use url::Url;

use wikiedit_common::protocol::actions::{
    ACTION_OPTIONS, ACTION_VISUALEDITOR_EDIT, ERROR_BAD_CACHE_KEY, PACTION_DIFF, PACTION_PARSE,
    PACTION_SERIALIZE, PACTION_SERIALIZE_FOR_CACHE,
};
use wikiedit_common::protocol::envelope::{self, ApiResponse};
use wikiedit_common::protocol::params::ApiParams;
use wikiedit_common::types::{OperationKind, Session, UserIdentity};

use crate::cache_key::{CacheKeyCache, PreparedCacheKey};
use crate::checkboxes::{apply_defaults, CheckboxDefaults};
use crate::classify::{
    classify_diff, classify_load, classify_save, classify_serialize, DiffOutcome, SaveOutcome,
    SaveReply,
};
use crate::coordinator::{lock, BusyFlags, EventBus, TargetEvent};
use crate::document::HtmlDocument;
use crate::error::TargetError;
use crate::notices::visible_notices;
use crate::retry::{interpret_refresh, refresh_params, TokenRefresh};
use crate::sanity::{compare_children, SanityStatus};
use crate::submit::{form_fields, submit_url};
use crate::telemetry::{
    system_topic, TrackData, Tracker, TracingTracker, BAD_CACHE_KEY, FAIL, TOPIC_DOM_LOAD,
    TOPIC_DOM_LOAD_FAIL, TOPIC_SAVE_ERROR, TOPIC_SUBMIT_FAIL, WITHOUT_CACHE_KEY, WITH_CACHE_KEY,
};
use crate::transport::{ApiReply, ApiTransport, FormReply};

/// Options of a save. `extra` is passed through to the API; the session
/// fields (`page`, `oldid`, timestamps, `token`) always win over it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveOptions {
    pub summary: Option<String>,
    pub minor: bool,
    pub watch: bool,
    pub extra: ApiParams,
}

impl SaveOptions {
    fn to_params(&self) -> ApiParams {
        let mut params = self.extra.clone();
        if let Some(summary) = &self.summary {
            params.set("summary", summary.clone());
        }
        if self.minor {
            params.set("minor", "1");
        }
        if self.watch {
            params.set("watch", "1");
        }
        params
    }
}

#[derive(Debug)]
struct TargetState {
    session: Session,
    user: UserIdentity,
    doc: Option<HtmlDocument>,
    original_html: Option<String>,
    remote_notices: Vec<String>,
    local_notice_messages: Vec<String>,
    edit_notices: Option<BTreeMap<usize, String>>,
    checkboxes: Vec<String>,
    sanity: SanityStatus,
}

impl TargetState {
    fn new(session: Session, user: UserIdentity) -> Self {
        Self {
            session,
            user,
            doc: None,
            original_html: None,
            remote_notices: Vec::new(),
            local_notice_messages: Vec::new(),
            edit_notices: None,
            checkboxes: Vec::new(),
            sanity: SanityStatus::default(),
        }
    }

    /// `page` plus `oldid` when known.
    fn page_params(&self, base: ApiParams) -> ApiParams {
        base.with("page", self.session.page.as_str())
            .with_opt("oldid", self.session.revision_id.map(|id| id.to_string()))
    }
}

pub struct Target {
    transport: Arc<dyn ApiTransport>,
    tracker: Arc<dyn Tracker>,
    busy: Arc<BusyFlags>,
    events: EventBus,
    cache: CacheKeyCache,
    state: Mutex<TargetState>,
    index_url: Option<Url>,
    checkbox_defaults: CheckboxDefaults,
}

impl Target {
    pub fn new(session: Session, user: UserIdentity, transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
            tracker: Arc::new(TracingTracker),
            busy: BusyFlags::new(),
            events: EventBus::new(),
            cache: CacheKeyCache::new(),
            state: Mutex::new(TargetState::new(session, user)),
            index_url: None,
            checkbox_defaults: CheckboxDefaults::default(),
        }
    }

    pub fn with_tracker(mut self, tracker: Arc<dyn Tracker>) -> Self {
        self.tracker = tracker;
        self
    }

    /// `index.php` endpoint used by [`submit`](Self::submit).
    pub fn with_index_url(mut self, index_url: Url) -> Self {
        self.index_url = Some(index_url);
        self
    }

    /// User options applied to the minor-edit and watch checkboxes on load.
    pub fn with_checkbox_defaults(mut self, defaults: CheckboxDefaults) -> Self {
        self.checkbox_defaults = defaults;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TargetEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> Session {
        lock(&self.state).session.clone()
    }

    pub fn user(&self) -> UserIdentity {
        lock(&self.state).user.clone()
    }

    /// The document as loaded from the server.
    pub fn document(&self) -> Option<HtmlDocument> {
        lock(&self.state).doc.clone()
    }

    pub fn original_html(&self) -> Option<String> {
        lock(&self.state).original_html.clone()
    }

    /// Checkbox HTML (minor edit, watch) offered by the server on load,
    /// checked according to the configured defaults.
    pub fn checkboxes(&self) -> Vec<String> {
        lock(&self.state).checkboxes.clone()
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.busy.is_busy(kind)
    }

    // ── Load ───────────────────────────────────────────────────────

    /// Fetch the page HTML. The latest revision is requested unless the
    /// session is restoring an explicit one.
    pub async fn load(&self) -> Result<HtmlDocument, TargetError> {
        let guard = self.busy.try_acquire(OperationKind::Load)?;
        let params = {
            let state = lock(&self.state);
            let session = &state.session;
            ApiParams::parsoid(PACTION_PARSE).with("page", session.page.as_str()).with_opt(
                "oldid",
                session.revision_id.filter(|_| session.restoring).map(|id| id.to_string()),
            )
        };

        let result = self.fetch_page(&params).await;
        drop(guard);
        match &result {
            Ok(_) => self.events.emit(TargetEvent::Loaded),
            Err(error) => {
                warn!(%error, "load failed");
                self.events.emit(TargetEvent::LoadError(error.kind()));
            }
        }
        result
    }

    async fn fetch_page(&self, params: &ApiParams) -> Result<HtmlDocument, TargetError> {
        let start = Instant::now();
        let reply = match self.transport.post(params).await {
            Ok(reply) => reply,
            Err(error) => {
                let error = TargetError::from(error);
                self.track_failure(TOPIC_DOM_LOAD_FAIL, &error, start);
                return Err(error);
            }
        };
        self.tracker.track(
            TOPIC_DOM_LOAD,
            &TrackData {
                bytes: Some(reply.bytes),
                cache_hit: Some(reply.cache_hit),
                parsoid: reply.parsoid.clone(),
                ..TrackData::timed(start.elapsed())
            },
        );

        let page = classify_load(reply.body.as_ref())?;
        let doc = HtmlDocument::parse(&page.content)?;
        let page_exists = page.oldid.is_some_and(|id| id > 0);
        let checkboxes = apply_defaults(&page.checkboxes, &self.checkbox_defaults, page_exists);

        let mut state = lock(&self.state);
        state.original_html = Some(page.content);
        state.doc = Some(doc.clone());
        state.remote_notices = page.notices;
        state.checkboxes = checkboxes;
        state.session.base_timestamp = page.base_timestamp;
        state.session.start_timestamp = page.start_timestamp;
        if let Some(oldid) = page.oldid {
            state.session.revision_id = Some(oldid);
        }
        let notices = visible_notices(&state.remote_notices, &state.local_notice_messages);
        state.edit_notices = Some(notices);
        info!(page = %state.session.page, revision = ?state.session.revision_id, "page loaded");
        Ok(doc)
    }

    /// Forget everything learned from the server so the target can be
    /// reused. The page, token and user stay.
    pub fn clear_state(&self) {
        self.clear_prepared_cache_key();
        self.busy.clear_all();
        let mut state = lock(&self.state);
        state.session.base_timestamp = None;
        state.session.start_timestamp = None;
        state.doc = None;
        state.original_html = None;
        state.edit_notices = None;
        state.checkboxes.clear();
        state.remote_notices.clear();
        state.local_notice_messages.clear();
        state.sanity = SanityStatus::default();
    }

    // ── Notices ────────────────────────────────────────────────────

    /// Queue a locally generated notice. Takes effect on the next load.
    pub fn add_local_notice(&self, message: impl Into<String>) {
        lock(&self.state).local_notice_messages.push(message.into());
    }

    /// Visible notices by merged index, or `None` before a load.
    pub fn edit_notices(&self) -> Option<BTreeMap<usize, String>> {
        lock(&self.state).edit_notices.clone()
    }

    // ── Outgoing HTML and cache keys ───────────────────────────────

    /// The full HTML to send for `doc`, with the loaded document's head
    /// and root attributes transplanted into it.
    pub fn compose_html(&self, doc: &HtmlDocument) -> String {
        match &lock(&self.state).doc {
            Some(loaded) => doc.clone().transplant_from(loaded).to_html(),
            None => doc.to_html(),
        }
    }

    /// Upload `doc` for later use by cache key. Returns the existing entry
    /// when `doc` is the document already prepared.
    ///
    /// The upload runs on a spawned task, so this must be called within a
    /// tokio runtime.
    pub fn prepare_cache_key(&self, doc: &HtmlDocument) -> PreparedCacheKey {
        self.cache.get_or_prepare(doc.id(), || {
            let html = self.compose_html(doc);
            let params = lock(&self.state)
                .page_params(ApiParams::parsoid(PACTION_SERIALIZE_FOR_CACHE))
                .with("html", html.clone());
            debug!(document = %doc.id(), "preparing cache key");
            PreparedCacheKey::spawn(
                doc.id(),
                html,
                params,
                Arc::clone(&self.transport),
                Arc::clone(&self.tracker),
            )
        })
    }

    /// The prepared entry for `doc`, without starting one.
    pub fn get_prepared_cache_key(&self, doc: &HtmlDocument) -> Option<PreparedCacheKey> {
        self.cache.get(doc.id())
    }

    pub fn clear_prepared_cache_key(&self) {
        self.cache.clear();
    }

    /// POST `params` for `doc`, sending the prepared cache key when one is
    /// available and the HTML otherwise. A `badcachekey` reply clears the
    /// cache and the request is repeated once with the HTML.
    ///
    /// With an `event` name, `performance.system.<event>.*` is tracked.
    pub async fn try_with_prepared_cache_key(
        &self,
        doc: &HtmlDocument,
        mut params: ApiParams,
        event: Option<&str>,
    ) -> Result<ApiReply, TargetError> {
        params.set("format", "json");
        let prepared = self.get_prepared_cache_key(doc);
        let cache_key = match &prepared {
            Some(entry) => entry.key().await,
            None => None,
        };

        if let Some(cache_key) = cache_key {
            params.set("cachekey", cache_key);
            let reply = self.post_tracked(&params, event).await?;
            if !rejects_cache_key(&reply) {
                return Ok(reply);
            }
            debug!("cache key rejected, resending html");
            self.clear_prepared_cache_key();
            params.remove("cachekey");
        }

        let html = match &prepared {
            Some(entry) => entry.html().to_string(),
            None => self.compose_html(doc),
        };
        params.set("html", html);
        self.post_tracked(&params, event).await
    }

    /// POST `params`, tracking `performance.system.<event>.<suffix>` for
    /// the reply, or `.fail` when the transfer itself failed.
    async fn post_tracked(
        &self,
        params: &ApiParams,
        event: Option<&str>,
    ) -> Result<ApiReply, TargetError> {
        let start = Instant::now();
        let result = self.transport.post(params).await.map_err(TargetError::from);
        let Some(event) = event else {
            return result;
        };
        match &result {
            Ok(reply) => {
                let suffix = if !params.contains("cachekey") {
                    WITHOUT_CACHE_KEY
                } else if rejects_cache_key(reply) {
                    BAD_CACHE_KEY
                } else {
                    WITH_CACHE_KEY
                };
                self.tracker.track(
                    &system_topic(event, suffix),
                    &TrackData {
                        bytes: Some(reply.bytes),
                        parsoid: reply.parsoid.clone(),
                        ..TrackData::timed(start.elapsed())
                    },
                );
            }
            Err(error) => self.track_failure(&system_topic(event, FAIL), error, start),
        }
        result
    }

    fn track_failure(&self, topic: &str, error: &TargetError, start: Instant) {
        self.tracker.track(
            topic,
            &TrackData { kind: Some(error.kind().as_str()), ..TrackData::timed(start.elapsed()) },
        );
    }

    // ── Save ───────────────────────────────────────────────────────

    /// Save `doc`. A rejected token is refreshed and the save replayed
    /// once, provided the session still belongs to the same user.
    pub async fn save(
        &self,
        doc: &HtmlDocument,
        options: &SaveOptions,
    ) -> Result<SaveOutcome, TargetError> {
        let guard = self.busy.try_acquire(OperationKind::Save)?;
        let start = Instant::now();
        let mut retries = 0u32;

        let result = loop {
            let params = self.save_params(options);
            let reply = match self.try_with_prepared_cache_key(doc, params, Some("save")).await {
                Ok(reply) => reply,
                Err(error) => break Err(error),
            };
            match classify_save(reply.body.as_ref()) {
                SaveReply::Saved(outcome) => break Ok(outcome),
                SaveReply::EditConflict => break Err(TargetError::EditConflict),
                SaveReply::Failed(error) => break Err(error),
                SaveReply::BadToken if retries > 0 => break Err(TargetError::StaleToken),
                SaveReply::BadToken => match self.refresh_token().await {
                    TokenRefresh::SameUser { .. } => {
                        retries += 1;
                        debug!(retries, "replaying save with fresh token");
                    }
                    TokenRefresh::NewUser { user, .. } => {
                        break Err(TargetError::IdentityChanged { user })
                    }
                    TokenRefresh::Unusable => break Err(TargetError::StaleToken),
                },
            }
        };
        drop(guard);

        match &result {
            Ok(outcome) => {
                info!(revision = ?outcome.new_revid, "saved");
                self.events.emit(TargetEvent::Saved {
                    content: outcome.content.clone(),
                    categories_html: outcome.categories_html.clone(),
                    new_revid: outcome.new_revid,
                });
            }
            Err(TargetError::EditConflict) => {
                info!("save hit an edit conflict");
                self.events.emit(TargetEvent::EditConflict);
            }
            Err(error) => {
                warn!(%error, retries, "save failed");
                self.tracker.track(
                    TOPIC_SAVE_ERROR,
                    &TrackData {
                        retries: Some(retries),
                        kind: Some(error.save_failure_type()),
                        ..TrackData::timed(start.elapsed())
                    },
                );
                self.events.emit(TargetEvent::SaveAsyncComplete);
                self.events.emit(TargetEvent::SaveError(error.kind()));
            }
        }
        result
    }

    fn save_params(&self, options: &SaveOptions) -> ApiParams {
        let state = lock(&self.state);
        let session = &state.session;
        let mut params = options.to_params();
        params.extend(
            &state
                .page_params(ApiParams::action(ACTION_VISUALEDITOR_EDIT))
                .with_opt("basetimestamp", session.base_timestamp.clone())
                .with_opt("starttimestamp", session.start_timestamp.clone())
                .with("token", session.edit_token.clone()),
        );
        params
    }

    /// Ask who owns the session now and fetch a fresh edit token. The token
    /// is stored whenever the reply is usable; a different user replaces
    /// the stored identity.
    async fn refresh_token(&self) -> TokenRefresh {
        self.events.emit(TargetEvent::SaveAsyncBegin);
        let (params, user) = {
            let state = lock(&self.state);
            (refresh_params(&state.session.page), state.user.clone())
        };
        let refresh = match self.transport.get(&params).await {
            Ok(reply) => interpret_refresh(&user, reply.body.as_ref()),
            Err(error) => {
                warn!(%error, "token refresh failed");
                TokenRefresh::Unusable
            }
        };
        self.events.emit(TargetEvent::SaveAsyncComplete);

        let mut state = lock(&self.state);
        match &refresh {
            TokenRefresh::SameUser { token } => state.session.edit_token = token.clone(),
            TokenRefresh::NewUser { user, token } => {
                info!(user = %user, "session now belongs to another user");
                state.session.edit_token = token.clone();
                state.user = user.clone();
            }
            TokenRefresh::Unusable => {}
        }
        refresh
    }

    // ── Diff and serialize ─────────────────────────────────────────

    /// Wikitext diff of `doc` against the loaded revision.
    pub async fn show_changes(&self, doc: &HtmlDocument) -> Result<DiffOutcome, TargetError> {
        let guard = self.busy.try_acquire(OperationKind::Diff)?;
        let params = lock(&self.state).page_params(ApiParams::parsoid(PACTION_DIFF));
        let result = self
            .try_with_prepared_cache_key(doc, params, Some("diff"))
            .await
            .and_then(|reply| classify_diff(reply.body.as_ref()));
        drop(guard);

        match &result {
            Ok(DiffOutcome::Diff(diff)) => self.events.emit(TargetEvent::ShowChanges(diff.clone())),
            Ok(DiffOutcome::NoChanges) => self.events.emit(TargetEvent::NoChanges),
            Err(error) => {
                warn!(%error, "diff failed");
                self.events.emit(TargetEvent::ShowChangesError(error.kind()));
            }
        }
        result
    }

    /// Convert `doc` to wikitext.
    pub async fn serialize(&self, doc: &HtmlDocument) -> Result<String, TargetError> {
        let guard = self.busy.try_acquire(OperationKind::Serialize)?;
        let params = lock(&self.state).page_params(ApiParams::parsoid(PACTION_SERIALIZE));
        let result = self
            .try_with_prepared_cache_key(doc, params, Some("serialize"))
            .await
            .and_then(|reply| classify_serialize(reply.body.as_ref()));
        drop(guard);

        match &result {
            Ok(wikitext) => self.events.emit(TargetEvent::Serialized(wikitext.clone())),
            Err(error) => {
                warn!(%error, "serialize failed");
                self.events.emit(TargetEvent::SerializeError(error.kind()));
            }
        }
        result
    }

    // ── Form submission ────────────────────────────────────────────

    /// Post `wikitext` through the classic edit form. Add `wpSave=1` to
    /// `fields` to save, or `wpDiff=1` to get the diff view.
    pub async fn submit(
        &self,
        wikitext: &str,
        fields: &ApiParams,
    ) -> Result<FormReply, TargetError> {
        let guard = self.busy.try_acquire(OperationKind::Submit)?;
        let start = Instant::now();
        let result = self.post_form(wikitext, fields).await;
        drop(guard);

        match &result {
            Ok(reply) => {
                info!(status = reply.status, url = %reply.final_url, "form submitted");
                self.events.emit(TargetEvent::Submitted);
            }
            Err(error) => {
                warn!(%error, "form submission failed");
                self.track_failure(TOPIC_SUBMIT_FAIL, error, start);
                self.events.emit(TargetEvent::SubmitError(error.kind()));
            }
        }
        result
    }

    async fn post_form(
        &self,
        wikitext: &str,
        fields: &ApiParams,
    ) -> Result<FormReply, TargetError> {
        let index = self.index_url.as_ref().ok_or(TargetError::NotConfigured("index url"))?;
        let (url, form) = {
            let state = lock(&self.state);
            let url = submit_url(index, &state.session.page);
            (url, form_fields(&state.session, wikitext, fields))
        };
        Ok(self.transport.submit_form(&url, &form).await?)
    }

    // ── Sanity check ───────────────────────────────────────────────

    /// Verify that `rebuild`, the editor's round trip of the loaded
    /// document, reproduces every body child. Runs on a blocking worker.
    pub async fn run_sanity_check<F>(&self, rebuild: F) -> Result<bool, TargetError>
    where
        F: FnOnce(HtmlDocument) -> HtmlDocument + Send + 'static,
    {
        let loaded = {
            let mut state = lock(&self.state);
            let loaded = state.doc.clone().ok_or(TargetError::NotLoaded)?;
            state.sanity = SanityStatus::default();
            loaded
        };

        let verified = match tokio::task::spawn_blocking(move || {
            let old_body = loaded.body.clone();
            let rebuilt = rebuild(loaded);
            compare_children(&old_body, &rebuilt.body)
        })
        .await
        {
            Ok(verified) => verified,
            Err(error) => {
                warn!(%error, "sanity check worker failed");
                false
            }
        };

        lock(&self.state).sanity = SanityStatus { finished: true, verified };
        debug!(verified, "sanity check complete");
        self.events.emit(TargetEvent::SanityCheckComplete { verified });
        Ok(verified)
    }

    pub fn sanity_status(&self) -> SanityStatus {
        lock(&self.state).sanity
    }

    // ── User options ───────────────────────────────────────────────

    /// `action=options`, authenticated with the session's token.
    pub async fn save_user_option(&self, name: &str, value: &str) -> Result<(), TargetError> {
        let token = lock(&self.state).session.edit_token.clone();
        let params = ApiParams::action(ACTION_OPTIONS)
            .with("optionname", name)
            .with("optionvalue", value)
            .with("token", token);
        let reply = self.transport.post(&params).await?;
        let body = reply.body.ok_or(TargetError::EmptyResponse)?;
        match envelope::decode::<serde_json::Value>(ACTION_OPTIONS, &body)? {
            ApiResponse::Payload(_) => Ok(()),
            ApiResponse::Error(error) => {
                Err(TargetError::Server { code: error.code, info: error.info })
            }
        }
    }
}

fn rejects_cache_key(reply: &ApiReply) -> bool {
    reply.body.as_ref().and_then(envelope::error_code) == Some(ERROR_BAD_CACHE_KEY)
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("state", &*lock(&self.state))
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
