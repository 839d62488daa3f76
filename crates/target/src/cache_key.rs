// Server-side serialisation cache.
//
// `serializeforcache` uploads a document's HTML ahead of time and returns a
// key that later diff/serialize/save requests can send instead of the HTML.
// At most one entry exists, tied to the identity of the prepared document.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wikiedit_common::protocol::params::ApiParams;

use crate::classify::classify_cache_key;
use crate::coordinator::lock;
use crate::document::DocumentId;
use crate::telemetry::{
    TrackData, Tracker, TOPIC_SERIALIZE_FOR_CACHE, TOPIC_SERIALIZE_FOR_CACHE_FAIL,
    TOPIC_SERIALIZE_FOR_CACHE_NO_KEY,
};
use crate::transport::ApiTransport;

type KeyFuture = Shared<BoxFuture<'static, Option<String>>>;

/// A pending or completed `serializeforcache` request.
///
/// Clones share the same underlying request; awaiting [`key`](Self::key)
/// from several places issues it only once.
#[derive(Clone)]
pub struct PreparedCacheKey {
    document: DocumentId,
    html: Arc<str>,
    key: KeyFuture,
    cancel: CancellationToken,
}

impl PreparedCacheKey {
    /// Spawn the upload of `html`. Must be called within a tokio runtime.
    pub fn spawn(
        document: DocumentId,
        html: String,
        params: ApiParams,
        transport: Arc<dyn ApiTransport>,
        tracker: Arc<dyn Tracker>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let start = Instant::now();
            tokio::select! {
                biased;
                _ = task_cancel.cancelled() => {
                    debug!(%document, "cache key request aborted");
                    None
                }
                reply = transport.post(&params) => {
                    let data = TrackData::timed(start.elapsed());
                    match reply {
                        Ok(reply) => {
                            let key = classify_cache_key(reply.body.as_ref());
                            let topic = if key.is_some() {
                                TOPIC_SERIALIZE_FOR_CACHE
                            } else {
                                TOPIC_SERIALIZE_FOR_CACHE_NO_KEY
                            };
                            tracker.track(topic, &data);
                            key
                        }
                        Err(error) => {
                            warn!(%document, %error, "cache key request failed");
                            tracker.track(TOPIC_SERIALIZE_FOR_CACHE_FAIL, &data);
                            None
                        }
                    }
                }
            }
        });
        let key = async move { handle.await.ok().flatten() }.boxed().shared();
        Self { document, html: html.into(), key, cancel }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// The HTML that was (or is being) uploaded.
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Resolves to the cache key, or `None` if the request failed, returned
    /// no key, or was aborted.
    pub async fn key(&self) -> Option<String> {
        self.key.clone().await
    }

    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for PreparedCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedCacheKey")
            .field("document", &self.document)
            .field("html_len", &self.html.len())
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// Holds the single prepared entry.
#[derive(Debug, Default)]
pub struct CacheKeyCache {
    entry: Mutex<Option<PreparedCacheKey>>,
}

impl CacheKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `document`, if that is the prepared one.
    pub fn get(&self, document: DocumentId) -> Option<PreparedCacheKey> {
        lock(&self.entry).as_ref().filter(|entry| entry.document == document).cloned()
    }

    /// Return the entry for `document`, or abort the current entry and
    /// install the one built by `prepare`.
    pub fn get_or_prepare(
        &self,
        document: DocumentId,
        prepare: impl FnOnce() -> PreparedCacheKey,
    ) -> PreparedCacheKey {
        let mut entry = lock(&self.entry);
        if let Some(existing) = entry.as_ref().filter(|entry| entry.document == document) {
            return existing.clone();
        }
        if let Some(previous) = entry.take() {
            previous.abort();
        }
        let prepared = prepare();
        *entry = Some(prepared.clone());
        prepared
    }

    /// Abort any in-flight request and forget the entry.
    pub fn clear(&self) {
        if let Some(previous) = lock(&self.entry).take() {
            debug!(document = %previous.document, "clearing prepared cache key");
            previous.abort();
        }
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entry).is_none()
    }
}
