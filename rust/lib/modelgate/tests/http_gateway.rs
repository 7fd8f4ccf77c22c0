//! End-to-end: a real axum server speaking the tunneled-verb protocol,
//! driven through `HttpTransport`, `Session` and the generated gateways.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use modelgate::{
    Envelope, HttpTransport, InstanceState, Method, NoAuth, RequestError, Session, SpecLoader,
    StaticToken, TransportError,
};

const TOKEN: &str = "gateway-test-token";

const MODELS_YAML: &str = "\
project:
  title: string
group.Widget:
  parent: project
  label: string
  weight: int
";

// =====================================================================
// Test server
// =====================================================================

#[derive(Default)]
struct Store {
    next_id: u64,
    /// (model, id) → (parent id, record)
    records: HashMap<(String, String), (String, Map<String, Value>)>,
}

type AppState = Arc<Mutex<Store>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "missing token").into_response()
}

async fn models_yaml() -> Response {
    ([(header::CONTENT_TYPE, "application/x-yaml")], MODELS_YAML).into_response()
}

/// Server-side normalisation so the client can observe server-wins.
fn canonical(id: &str, payload: &str) -> Map<String, Value> {
    let mut record: Map<String, Value> = serde_json::from_str(payload).unwrap_or_default();
    if let Some(Value::String(label)) = record.get("label").cloned() {
        record.insert("label".into(), Value::String(label.trim().to_string()));
    }
    record.insert("id".into(), Value::String(id.to_string()));
    record
}

async fn list_children(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path((_parent, parent_id, plural)): Path<(String, String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let model = plural.trim_end_matches('s');
    let store = st.lock().unwrap();
    let mut items: Vec<&Map<String, Value>> = store
        .records
        .iter()
        .filter(|((m, _), (pid, _))| m == model && *pid == parent_id)
        .map(|(_, (_, rec))| rec)
        .collect();
    items.sort_by_key(|r| r["id"].as_str().unwrap_or_default().to_string());
    Json(json!(items)).into_response()
}

async fn create_child(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path((_parent, parent_id, plural)): Path<(String, String, String)>,
    Json(env): Json<Envelope>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if env.method != Method::Post {
        return (StatusCode::METHOD_NOT_ALLOWED, "collection only accepts post").into_response();
    }
    let model = plural.trim_end_matches('s').to_string();
    let mut store = st.lock().unwrap();
    store.next_id += 1;
    let id = format!("w{}", store.next_id);
    let record = canonical(&id, &env.payload);
    store.records.insert((model, id), (parent_id, record.clone()));
    Json(Value::Object(record)).into_response()
}

async fn get_item(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path((model, id)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let store = st.lock().unwrap();
    match store.records.get(&(model, id)) {
        Some((_, rec)) => Json(Value::Object(rec.clone())).into_response(),
        None => (StatusCode::NOT_FOUND, "no such record").into_response(),
    }
}

async fn mutate_item(
    State(st): State<AppState>,
    headers: HeaderMap,
    Path((model, id)): Path<(String, String)>,
    Json(env): Json<Envelope>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if env.instid.as_deref() != Some(id.as_str()) {
        return (StatusCode::BAD_REQUEST, "instid does not match url").into_response();
    }
    let mut store = st.lock().unwrap();
    let key = (model, id.clone());
    match env.method {
        Method::Put => match store.records.get_mut(&key) {
            Some((_, rec)) => {
                *rec = canonical(&id, &env.payload);
                Json(Value::Object(rec.clone())).into_response()
            }
            None => (StatusCode::NOT_FOUND, "no such record").into_response(),
        },
        Method::Delete => match store.records.remove(&key) {
            Some(_) => Json(json!({"deleted": true})).into_response(),
            None => (StatusCode::NOT_FOUND, "no such record").into_response(),
        },
        Method::Post => (StatusCode::METHOD_NOT_ALLOWED, "item does not accept post").into_response(),
    }
}

struct TestServer {
    base_url: String,
}

async fn start_test_server() -> TestServer {
    let state: AppState = Arc::new(Mutex::new(Store::default()));
    let app = Router::new()
        .route("/configuration/models/models.yaml", get(models_yaml))
        .route("/:name/:id/:plural", get(list_children).post(create_child))
        .route("/:name/:id", get(get_item).post(mutate_item))
        .with_state(state);

    // Bind to random port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { base_url: format!("http://{}", addr) }
}

fn authed_session(server: &TestServer) -> Session {
    let transport = Arc::new(HttpTransport::new(
        &server.base_url,
        Arc::new(StaticToken::new(TOKEN)),
    ));
    Session::with_transport(transport)
}

// =====================================================================
// Tests
// =====================================================================

#[tokio::test]
async fn session_loads_yaml_specification() {
    let server = start_test_server().await;
    let session = authed_session(&server);

    let models = session.load().await.unwrap();
    assert_eq!(models.names(), vec!["Widget", "project"]);
    let widgets = models.gateway_for("Widget").unwrap();
    assert_eq!(widgets.parent_name(), "project");
    assert_eq!(widgets.collection_url("1"), "/project/1/Widgets");
    assert!(session.is_ready());
}

#[tokio::test]
async fn widget_crud_lifecycle() {
    let server = start_test_server().await;
    let session = authed_session(&server);
    let models = session.load().await.unwrap();
    let widgets = models.gateway_for("Widget").unwrap();

    // 1. Empty collection.
    assert!(widgets.get_all("p1").await.unwrap().is_empty());

    // 2. Create.
    let mut w = widgets.new_instance();
    w.set("label", "  bolt  ").unwrap();
    w.set("weight", 3).unwrap();
    w.set_local("selected", true);
    widgets.post("p1", &mut w).await.unwrap();
    let id = w.id().unwrap().to_string();
    assert_eq!(w.state(), InstanceState::Synced);
    assert_eq!(w.get("label"), Some(&json!("bolt")), "server state wins");

    // 3. Read back; local-only state never reached the server.
    let fetched = widgets.get(&id).await.unwrap();
    assert_eq!(fetched.get("weight"), Some(&json!(3)));
    assert!(fetched.local("selected").is_none());

    // 4. Update.
    w.set("weight", 9).unwrap();
    widgets.put(&mut w).await.unwrap();
    assert!(!w.is_dirty());
    assert_eq!(widgets.get(&id).await.unwrap().get("weight"), Some(&json!(9)));

    // 5. Scoped list: another parent sees nothing.
    assert_eq!(widgets.get_all("p1").await.unwrap().len(), 1);
    assert!(widgets.get_all("p2").await.unwrap().is_empty());

    // 6. Delete.
    widgets.del(&mut w).await.unwrap();
    assert_eq!(w.state(), InstanceState::Destroyed);

    // 7. Gone from every read.
    assert!(widgets.get_all("p1").await.unwrap().is_empty());
    match widgets.get(&id).await.unwrap_err() {
        RequestError::Transport(TransportError::Server { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected 404, got {:?}", other),
    }
}

#[tokio::test]
async fn failed_put_keeps_local_values() {
    let server = start_test_server().await;
    let session = authed_session(&server);
    let models = session.load().await.unwrap();
    let widgets = models.gateway_for("Widget").unwrap();

    let mut ghost = widgets.hydrate(&json!({"id": "missing", "label": "x"})).unwrap();
    ghost.set("label", "edited").unwrap();
    let err = widgets.put(&mut ghost).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::Transport(TransportError::Server { status: 404, .. })
    ));
    assert_eq!(ghost.get("label"), Some(&json!("edited")));
    assert!(ghost.is_dirty());
    assert!(!ghost.is_pending());
}

#[tokio::test]
async fn anonymous_requests_are_rejected_per_call() {
    let server = start_test_server().await;
    let transport = Arc::new(HttpTransport::new(&server.base_url, Arc::new(NoAuth)));
    // The specification itself is public.
    let session = Session::new(SpecLoader::new(transport.clone()), transport);
    let models = session.load().await.unwrap();

    let err = models.gateway_for("Widget").unwrap().get_all("p1").await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::Transport(TransportError::Server { status: 401, .. })
    ));
}

#[tokio::test]
async fn missing_specification_is_load_error() {
    let server = start_test_server().await;
    let transport = Arc::new(HttpTransport::new(&server.base_url, Arc::new(NoAuth)));
    let loader = SpecLoader::new(transport.clone()).with_path("/configuration/models/absent.yaml");
    let session = Session::new(loader, transport);

    assert!(session.load().await.is_err());
    assert!(session.factory().await.is_none());
}
