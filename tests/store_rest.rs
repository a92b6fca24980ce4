// tests/store_rest.rs
//
// SupabaseStore against a local listener speaking PostgREST shapes.
// Credentials come from the environment, so these tests are serialized.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use serde_json::{json, Value};

use hn_problem_radar::config::{ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL};
use hn_problem_radar::error::RadarError;
use hn_problem_radar::passes::PassResult;
use hn_problem_radar::pipeline::EvaluationStore;
use hn_problem_radar::store::SupabaseStore;

#[derive(Default)]
struct Seen {
    inserts: Vec<Value>,
    api_key: Option<String>,
    queries: Vec<Vec<(String, String)>>,
}

type SharedSeen = Arc<Mutex<Seen>>;

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn rows() -> Value {
    json!([
        {
            "id": "11111111-1111-1111-1111-111111111111",
            "created_at": "2026-08-02T09:00:00Z",
            "evaluation_output": "narrative one",
            "model": "gemini-2.5-pro",
            "generated_at": "2026-08-02T08:59:00Z"
        },
        {
            "id": "22222222-2222-2222-2222-222222222222",
            "created_at": "2026-08-01T23:00:00Z",
            "evaluation_output": "narrative two",
            "model": "gemini-2.5-pro",
            "generated_at": "2026-08-01T22:59:00Z"
        }
    ])
}

fn postgrest_router(seen: SharedSeen, insert_status: StatusCode) -> Router {
    Router::new()
        .route(
            "/rest/v1/hn_evaluations",
            post(
                move |State(seen): State<SharedSeen>,
                      headers: HeaderMap,
                      Json(body): Json<Value>| async move {
                    let mut guard = seen.lock().unwrap();
                    guard.api_key = headers
                        .get("apikey")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    guard.inserts.push(body);
                    (insert_status, Json(json!({})))
                },
            )
            .get(
                |State(seen): State<SharedSeen>,
                 Query(q): Query<Vec<(String, String)>>| async move {
                    seen.lock().unwrap().queries.push(q.clone());
                    let filtered = q.iter().any(|(k, v)| k == "id" && v.starts_with("eq."));
                    if filtered {
                        let wanted = q
                            .iter()
                            .find(|(k, _)| k == "id")
                            .map(|(_, v)| v.trim_start_matches("eq.").to_string())
                            .unwrap_or_default();
                        let matching: Vec<Value> = rows()
                            .as_array()
                            .unwrap()
                            .iter()
                            .filter(|r| r["id"] == wanted.as_str())
                            .cloned()
                            .collect();
                        Json(json!(matching))
                    } else {
                        Json(rows())
                    }
                },
            ),
        )
        .with_state(seen)
}

fn set_env(base: &str) {
    std::env::set_var(ENV_SUPABASE_URL, base);
    std::env::set_var(ENV_SUPABASE_ANON_KEY, "anon-key");
}

fn clear_env() {
    std::env::remove_var(ENV_SUPABASE_URL);
    std::env::remove_var(ENV_SUPABASE_ANON_KEY);
}

fn pass_result() -> PassResult {
    PassResult {
        model: "gemini-2.5-pro".into(),
        generated_at: Utc.with_ymd_and_hms(2026, 8, 2, 8, 59, 0).unwrap(),
        output: "narrative one".into(),
        input_bytes: 42,
        output_bytes: 13,
        corpus_snippet_count: None,
    }
}

#[serial_test::serial]
#[tokio::test]
async fn persist_inserts_the_expected_columns() {
    let seen: SharedSeen = Arc::default();
    let base = spawn(postgrest_router(seen.clone(), StatusCode::CREATED)).await;
    set_env(&base);

    let store = SupabaseStore::new(Default::default());
    store.persist(&pass_result()).await.unwrap();

    let guard = seen.lock().unwrap();
    assert_eq!(guard.api_key.as_deref(), Some("anon-key"));
    let body = &guard.inserts[0];
    assert_eq!(body["evaluation_output"], "narrative one");
    assert_eq!(body["model"], "gemini-2.5-pro");
    assert!(body.get("generated_at").is_some());
    assert!(
        body.get("id").is_none(),
        "ids are minted by the store, not the client"
    );

    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn persist_failure_is_a_transport_error_naming_the_table() {
    let seen: SharedSeen = Arc::default();
    let base = spawn(postgrest_router(seen, StatusCode::UNAUTHORIZED)).await;
    set_env(&base);

    let store = SupabaseStore::new(Default::default());
    let err = store.persist(&pass_result()).await.unwrap_err();
    match err {
        RadarError::Transport { target, status, .. } => {
            assert_eq!(target, "hn_evaluations");
            assert_eq!(status, 401);
        }
        other => panic!("expected transport error, got {other:?}"),
    }

    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn list_orders_by_created_at_descending() {
    let seen: SharedSeen = Arc::default();
    let base = spawn(postgrest_router(seen.clone(), StatusCode::CREATED)).await;
    set_env(&base);

    let store = SupabaseStore::new(Default::default());
    let rows = store.list().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].evaluation_output, "narrative one");

    let guard = seen.lock().unwrap();
    assert!(guard.queries[0]
        .iter()
        .any(|(k, v)| k == "order" && v == "created_at.desc"));

    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn fetch_filters_by_id_and_misses_cleanly() {
    let seen: SharedSeen = Arc::default();
    let base = spawn(postgrest_router(seen, StatusCode::CREATED)).await;
    set_env(&base);

    let store = SupabaseStore::new(Default::default());

    let hit = store
        .fetch("11111111-1111-1111-1111-111111111111")
        .await
        .unwrap();
    assert_eq!(hit.unwrap().evaluation_output, "narrative one");

    let miss = store.fetch("not-a-row").await.unwrap();
    assert!(miss.is_none());

    clear_env();
}

#[serial_test::serial]
#[tokio::test]
async fn missing_store_credentials_fail_at_first_use() {
    clear_env();
    let store = SupabaseStore::new(Default::default());
    let err = store.list().await.unwrap_err();
    assert!(matches!(err, RadarError::MissingEnv { ref name } if name == ENV_SUPABASE_URL));
}
