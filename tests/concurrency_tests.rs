//! Concurrency and thread safety tests for docgate

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use docgate::{build_router, Document, DocumentStore, ServerConfig, ServerState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn memory_store() -> Arc<DocumentStore> {
    Arc::new(DocumentStore::open("memory://").expect("open in-memory store"))
}

fn doc(value: Value) -> Document {
    Document::try_from(value).expect("object")
}

async fn send(app: Router, method: Method, uri: String, body: Option<Value>) -> (StatusCode, Value) {
    let body = body
        .map(|v| Body::from(serde_json::to_vec(&v).expect("encode body")))
        .unwrap_or_else(Body::empty);
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .expect("build request");
    let response = app.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, json)
}

#[test]
fn concurrent_inserts_assign_unique_ids() {
    let store = memory_store();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let widgets = store.collection("widgets");
            thread::spawn(move || {
                (0..50)
                    .map(|i| {
                        widgets
                            .insert_one(doc(json!({ "thread": t, "i": i })))
                            .expect("insert should succeed")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("thread panicked") {
            assert!(ids.insert(id), "duplicate id {id}");
        }
    }

    let widgets = store.collection("widgets");
    assert_eq!(ids.len(), 400);
    assert_eq!(widgets.count().unwrap(), 400);
    assert_eq!(widgets.find_all().unwrap().len(), 400);
}

#[test]
fn concurrent_writers_on_separate_collections_do_not_interfere() {
    let store = memory_store();

    let handles: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|name| {
            let coll = store.collection(name);
            thread::spawn(move || {
                for i in 0..25 {
                    coll.insert_one(doc(json!({ "n": i })))
                        .expect("insert should succeed");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread panicked");
    }

    for name in ["alpha", "beta", "gamma"] {
        assert_eq!(store.collection(name).count().unwrap(), 25);
    }
    let mut names = store.collections().unwrap();
    names.sort();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);
}

#[test]
fn racing_deletes_remove_exactly_once() {
    let store = memory_store();
    let widgets = store.collection("widgets");
    let id = widgets.insert_one(doc(json!({ "name": "bolt" }))).unwrap();

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let widgets = widgets.clone();
            thread::spawn(move || widgets.delete_one(&id).expect("delete should not error"))
        })
        .collect();

    let removed = handles
        .into_iter()
        .map(|h| h.join().expect("thread panicked"))
        .filter(|deleted| *deleted)
        .count();
    assert_eq!(removed, 1);
    assert!(widgets.find_one(&id).unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_http_creates_are_all_visible() {
    let app = build_router(Arc::new(ServerState::with_store(
        ServerConfig::default(),
        memory_store(),
    )));

    let tasks: Vec<_> = (0..32)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                send(app, Method::PUT, "/widgets".into(), Some(json!({ "n": i }))).await
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        let (status, body) = task.await.expect("task panicked");
        assert_eq!(status, StatusCode::CREATED);
        ids.insert(body["_id"].as_str().expect("_id").to_string());
    }
    assert_eq!(ids.len(), 32);

    let (_, count) = send(app, Method::GET, "/widgets/count".into(), None).await;
    assert_eq!(count, json!({ "count": 32 }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_update_and_delete_never_fail_the_server() {
    let app = build_router(Arc::new(ServerState::with_store(
        ServerConfig::default(),
        memory_store(),
    )));
    let (_, created) = send(
        app.clone(),
        Method::PUT,
        "/widgets".into(),
        Some(json!({ "qty": 0 })),
    )
    .await;
    let id = created["_id"].as_str().expect("_id").to_string();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let app = app.clone();
        let uri = format!("/widgets/{id}");
        tasks.push(tokio::spawn(async move {
            if i % 4 == 3 {
                send(app, Method::DELETE, uri, None).await.0
            } else {
                send(app, Method::PUT, uri, Some(json!({ "qty": i }))).await.0
            }
        }));
    }

    for task in tasks {
        let status = task.await.expect("task panicked");
        assert!(
            matches!(
                status,
                StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
            ),
            "unexpected status {status}"
        );
    }

    let (status, _) = send(app, Method::GET, format!("/widgets/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
