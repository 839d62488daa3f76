mod support;

use std::time::Duration;

use serde_json::json;

use wikiedit_target::document::{Element, HtmlDocument, Node};
use wikiedit_target::telemetry::{
    TOPIC_SERIALIZE_FOR_CACHE, TOPIC_SERIALIZE_FOR_CACHE_FAIL, TOPIC_SERIALIZE_FOR_CACHE_NO_KEY,
};
use wikiedit_target::{ErrorKind, SaveOptions};

use support::*;

fn edited(harness: &Harness) -> HtmlDocument {
    let mut doc = harness.target.document().unwrap().fork();
    doc.body.push(Element::new("p").with_child(Node::text("More text")).into());
    doc
}

fn serialized(content: &str) -> serde_json::Value {
    json!({ "visualeditor": { "result": "success", "content": content } })
}

#[tokio::test]
async fn prepared_key_replaces_html() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.reply("serializeforcache", json!({ "visualeditor": { "cachekey": "ck-1" } }));
    let entry = h.target.prepare_cache_key(&doc);
    assert_eq!(entry.key().await.as_deref(), Some("ck-1"));

    // Same document, same entry: no second upload.
    h.target.prepare_cache_key(&doc);
    let uploads = h.transport.calls_for("serializeforcache");
    assert_eq!(uploads.len(), 1);
    let uploaded = uploads[0].get("html").unwrap();
    assert!(uploaded.contains("<meta charset=\"utf-8\">"), "loaded head is transplanted");
    assert!(uploaded.contains("More text"));
    assert_eq!(uploads[0].get("oldid"), Some("101"));

    h.transport.reply("visualeditoredit", save_success());
    h.target.save(&doc, &SaveOptions::default()).await.unwrap();

    let save = &h.transport.calls_for("visualeditoredit")[0];
    assert_eq!(save.get("cachekey"), Some("ck-1"));
    assert!(!save.contains("html"));
    assert!(h.tracker.topics().contains(&"performance.system.save.withCacheKey".to_string()));
    assert_eq!(h.tracker.records(TOPIC_SERIALIZE_FOR_CACHE).len(), 1);
}

#[tokio::test]
async fn clones_share_identity_forks_do_not() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);
    h.transport.reply("serializeforcache", json!({ "visualeditor": { "cachekey": "ck-1" } }));
    h.target.prepare_cache_key(&doc);

    assert!(h.target.get_prepared_cache_key(&doc.clone()).is_some());
    assert!(h.target.get_prepared_cache_key(&doc.fork()).is_none());
}

#[tokio::test]
async fn preparing_another_document_aborts_the_first() {
    let h = harness();
    loaded(&h).await;
    let first = edited(&h);
    let second = first.fork();

    h.transport.hang("serializeforcache");
    h.transport.reply("serializeforcache", json!({ "visualeditor": { "cachekey": "ck-2" } }));
    let first_entry = h.target.prepare_cache_key(&first);
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second_entry = h.target.prepare_cache_key(&second);

    assert_eq!(first_entry.key().await, None);
    assert_eq!(second_entry.key().await.as_deref(), Some("ck-2"));
    assert!(h.target.get_prepared_cache_key(&first).is_none());
}

#[tokio::test]
async fn bad_cache_key_retries_once_with_html() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.reply("serializeforcache", json!({ "visualeditor": { "cachekey": "stale" } }));
    let entry = h.target.prepare_cache_key(&doc);
    entry.key().await;

    let bad =
        json!({ "error": { "code": "badcachekey", "info": "No cached serialization found" } });
    h.transport.reply("serialize", bad);
    h.transport.reply("serialize", serialized("Hello '''world'''"));

    let wikitext = h.target.serialize(&doc).await.unwrap();
    assert_eq!(wikitext, "Hello '''world'''");

    let calls = h.transport.calls_for("serialize");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].get("cachekey"), Some("stale"));
    assert!(!calls[0].contains("html"));
    assert!(!calls[1].contains("cachekey"));
    assert_eq!(calls[1].get("html"), Some(entry.html()));

    assert!(h.target.get_prepared_cache_key(&doc).is_none(), "bad key is cleared");
    let topics = h.tracker.topics();
    assert!(topics.contains(&"performance.system.serialize.badCacheKey".to_string()));
    assert!(topics.contains(&"performance.system.serialize.withoutCacheKey".to_string()));
}

#[tokio::test]
async fn bad_cache_key_is_not_retried_twice() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.reply("serializeforcache", json!({ "visualeditor": { "cachekey": "stale" } }));
    h.target.prepare_cache_key(&doc).key().await;

    let bad =
        json!({ "error": { "code": "badcachekey", "info": "No cached serialization found" } });
    h.transport.reply("diff", bad.clone());
    h.transport.reply("diff", bad.clone());
    h.transport.reply("diff", bad);

    let error = h.target.show_changes(&doc).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Server);
    assert_eq!(h.transport.calls_for("diff").len(), 2);
}

#[tokio::test]
async fn missing_cache_key_falls_back_to_html() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.reply("serializeforcache", json!({ "visualeditor": { "result": "success" } }));
    let entry = h.target.prepare_cache_key(&doc);
    assert_eq!(entry.key().await, None);
    assert_eq!(h.tracker.records(TOPIC_SERIALIZE_FOR_CACHE_NO_KEY).len(), 1);

    h.transport.reply("visualeditoredit", save_success());
    h.target.save(&doc, &SaveOptions::default()).await.unwrap();
    let save = &h.transport.calls_for("visualeditoredit")[0];
    assert!(!save.contains("cachekey"));
    assert_eq!(save.get("html"), Some(entry.html()));
    assert!(h.tracker.topics().contains(&"performance.system.save.withoutCacheKey".to_string()));
}

#[tokio::test]
async fn failed_upload_falls_back_to_html() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.fail("serializeforcache");
    assert_eq!(h.target.prepare_cache_key(&doc).key().await, None);
    assert_eq!(h.tracker.records(TOPIC_SERIALIZE_FOR_CACHE_FAIL).len(), 1);

    h.transport.reply("serialize", serialized("x"));
    h.target.serialize(&doc).await.unwrap();
    assert!(h.transport.calls_for("serialize")[0].contains("html"));
}

#[tokio::test]
async fn clearing_cancels_in_flight_upload() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);

    h.transport.hang("serializeforcache");
    let entry = h.target.prepare_cache_key(&doc);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.transport.calls_for("serializeforcache").len(), 1);

    h.target.clear_prepared_cache_key();
    assert!(entry.is_aborted());
    assert_eq!(entry.key().await, None);
    assert_eq!(h.transport.dropped(), 1, "in-flight request is dropped");
    assert!(h.target.get_prepared_cache_key(&doc).is_none());
}

#[tokio::test]
async fn unprepared_document_sends_html() {
    let h = harness();
    loaded(&h).await;
    let doc = edited(&h);
    h.transport.reply("serialize", serialized("x"));
    h.target.serialize(&doc).await.unwrap();

    let call = &h.transport.calls_for("serialize")[0];
    assert_eq!(call.get("html").map(str::to_string), Some(h.target.compose_html(&doc)));
    assert_eq!(call.get("format"), Some("json"));
    assert!(h.transport.calls_for("serializeforcache").is_empty());
}
