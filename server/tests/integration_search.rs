use analytics::{EventRecorder, MemoryEventStore};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use search_core::catalog::Document;
use search_core::{InvertedIndex, RetrievalEngine, SynonymTable};
use serde_json::Value;
use server::{build_app, AppState, CatalogSource};
use std::sync::Arc;
use tower::ServiceExt;

fn doc(id: &str, title: &str, description: &str) -> Document {
    Document {
        id: id.into(),
        title: title.into(),
        description: description.into(),
        brand: "Acme".into(),
        category: "Clothing".into(),
        sub_category: String::new(),
        price: Some(999.0),
        rating: Some(4.1),
        url: None,
    }
}

fn tiny_state(catalog: Option<CatalogSource>) -> AppState {
    let index = InvertedIndex::build(vec![
        doc("D1", "Red Shoes", "canvas upper"),
        doc("D2", "Blue Shoes", "red laces red sole"),
        doc("D3", "Shoes", "red red red"),
        doc("D4", "Wool Scarf", "warm"),
    ]);
    AppState {
        engine: Arc::new(RetrievalEngine::new(index, SynonymTable::builtin())),
        recorder: Arc::new(EventRecorder::new(Arc::new(MemoryEventStore::new())).unwrap()),
        catalog,
        admin_token: Some("secret".into()),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).header("X-Client-Token", "tester").body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = build_app(tiny_state(None));
    let (status, json) = send(&app, get("/search?q=Red%20Shoes&k=2")).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], "D1");
    assert_eq!(arr[0]["rank"], 1);
    assert_eq!(arr[1]["rank"], 2);
    assert!(json["session_id"].is_string());
}

#[tokio::test]
async fn stopword_query_returns_empty() {
    let app = build_app(tiny_state(None));
    let (status, json) = send(&app, get("/search?q=the")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"], 0);
}

#[tokio::test]
async fn click_dwell_and_stats_flow() {
    let app = build_app(tiny_state(None));
    send(&app, get("/search?q=red%20shoes")).await;

    let (status, json) = send(&app, get("/doc/D1?q=red%20shoes&rank=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["doc"]["title"], "Red Shoes");
    let click_id = json["click_id"].as_u64().unwrap();

    let (status, json) = send(&app, post_json("/dwell", serde_json::json!({ "click_id": click_id, "dwell_secs": 42.0 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["outcome"], "recorded");
    let (_, json) = send(&app, post_json("/dwell", serde_json::json!({ "click_id": click_id, "dwell_secs": 99.0 }))).await;
    assert_eq!(json["outcome"], "already_completed");

    let (status, json) = send(&app, get("/stats?top=5")).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &json["stats"];
    assert_eq!(stats["total_sessions"], 1);
    assert_eq!(stats["total_requests"], 2);
    assert_eq!(stats["total_clicks"], 1);
    assert_eq!(stats["avg_dwell_secs"], 42.0);
    assert_eq!(stats["top_queries"][0]["key"], "red shoes");
    assert_eq!(json["titles"]["D1"], "Red Shoes");
}

#[tokio::test]
async fn bad_requests_are_reported() {
    let app = build_app(tiny_state(None));
    let (status, _) = send(&app, get("/doc/NOPE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, post_json("/dwell", serde_json::json!({ "click_id": 12345, "dwell_secs": 1.0 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, get("/doc/D4")).await;
    assert!(json["click_id"].is_null());
}

#[tokio::test]
async fn admin_reload_swaps_index() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, r#"[{"pid": "N1", "title": "Linen Shirt", "selling_price": "1,099"}, {"pid": "N2", "title": "Denim Jacket"}]"#).unwrap();
    let app = build_app(tiny_state(Some(CatalogSource { primary: path, fallback: None })));

    let unauthorized = Request::post("/admin/reload").body(Body::empty()).unwrap();
    assert_eq!(send(&app, unauthorized).await.0, StatusCode::UNAUTHORIZED);

    let req = Request::post("/admin/reload").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let (status, json) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_docs"], 2);

    let (_, json) = send(&app, get("/search?q=linen")).await;
    assert_eq!(json["results"][0]["doc_id"], "N1");
    assert_eq!(json["results"][0]["price"], 1099.0);
}
