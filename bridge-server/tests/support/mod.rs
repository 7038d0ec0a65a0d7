//! In-process mock upstreams: a JSON-RPC ERP and an NGSI-LD broker.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use bridge_server::broker::BrokerClient;
use bridge_server::erp::ErpClient;
use bridge_server::resilience::{CircuitBreakerConfig, RetryPolicy};

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    }
}

pub fn lenient_breaker() -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_threshold: 100,
        timeout: Duration::from_millis(50),
    }
}

pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

// ---------------------------------------------------------------- ERP

#[derive(Default)]
pub struct ErpData {
    pub products: Vec<Value>,
    pub boms: Vec<Value>,
    pub bom_lines: Vec<Value>,
    pub quants: Vec<Value>,
}

#[derive(Default)]
pub struct MockErpState {
    pub data: Mutex<ErpData>,
    pub auth_count: AtomicU32,
    pub call_count: AtomicU32,
    pub session_valid: AtomicBool,
    pub next_quant_id: AtomicU32,
}

pub struct MockErp {
    pub url: String,
    pub state: Arc<MockErpState>,
}

impl MockErp {
    pub async fn start(data: ErpData) -> Self {
        let state = Arc::new(MockErpState {
            data: Mutex::new(data),
            session_valid: AtomicBool::new(false),
            next_quant_id: AtomicU32::new(10_000),
            ..MockErpState::default()
        });

        let app = Router::new()
            .route("/jsonrpc", post(jsonrpc))
            .with_state(state.clone());
        let url = serve(app).await;
        Self { url, state }
    }

    pub fn client(&self) -> ErpClient {
        ErpClient::new(
            &self.url,
            "test_db",
            "admin",
            "secret",
            "default_code",
            Duration::from_secs(5),
            lenient_breaker(),
            fast_retry(),
        )
    }

    /// Simulate a session invalidation on the ERP side
    pub fn expire_session(&self) {
        self.state.session_valid.store(false, Ordering::SeqCst);
    }
}

fn rpc_result(value: Value) -> Json<Value> {
    Json(json!({"jsonrpc": "2.0", "id": 1, "result": value}))
}

fn rpc_fault(message: &str) -> Json<Value> {
    Json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": {
            "code": 200,
            "message": message,
            "data": {"fault_string": message}
        }
    }))
}

async fn jsonrpc(State(state): State<Arc<MockErpState>>, Json(body): Json<Value>) -> Response {
    state.call_count.fetch_add(1, Ordering::SeqCst);
    let params = &body["params"];
    let service = params["service"].as_str().unwrap_or_default();
    let method = params["method"].as_str().unwrap_or_default();
    let args = params["args"].as_array().cloned().unwrap_or_default();

    match (service, method) {
        ("common", "version") => rpc_result(json!({"server_version": "17.0"})).into_response(),
        ("common", "authenticate") => {
            state.auth_count.fetch_add(1, Ordering::SeqCst);
            let password = args.get(2).and_then(Value::as_str);
            if password == Some("secret") {
                state.session_valid.store(true, Ordering::SeqCst);
                rpc_result(json!(2)).into_response()
            } else {
                rpc_result(json!(false)).into_response()
            }
        }
        ("object", "execute_kw") => {
            if !state.session_valid.load(Ordering::SeqCst) {
                return StatusCode::UNAUTHORIZED.into_response();
            }
            execute_kw(&state, &args).into_response()
        }
        _ => rpc_fault("unknown service").into_response(),
    }
}

fn execute_kw(state: &MockErpState, args: &[Value]) -> Json<Value> {
    let model = args.get(3).and_then(Value::as_str).unwrap_or_default();
    let method = args.get(4).and_then(Value::as_str).unwrap_or_default();
    let call_args = args.get(5).and_then(Value::as_array).cloned().unwrap_or_default();

    let mut data = state.data.lock();
    match (model, method) {
        ("product.product", "search_read") => {
            rpc_result(search(&data.products, call_args.first()))
        }
        ("mrp.bom", "search_read") => rpc_result(search(&data.boms, call_args.first())),
        ("mrp.bom.line", "read") => {
            let ids: Vec<i64> = call_args
                .first()
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default();
            let rows: Vec<Value> = data
                .bom_lines
                .iter()
                .filter(|row| ids.contains(&row["id"].as_i64().unwrap_or(-1)))
                .cloned()
                .collect();
            rpc_result(json!(rows))
        }
        ("stock.quant", "search_read") => rpc_result(search(&data.quants, call_args.first())),
        ("stock.quant", "create") => {
            let values = call_args.first().cloned().unwrap_or_default();
            let id = state.next_quant_id.fetch_add(1, Ordering::SeqCst) as i64;
            let mut row = json!({
                "id": id,
                "quantity": 0.0,
                "reserved_quantity": 0.0,
            });
            for key in ["product_id", "location_id", "quantity"] {
                if let Some(v) = values.get(key) {
                    row[key] = v.clone();
                }
            }
            data.quants.push(row);
            rpc_result(json!(id))
        }
        ("stock.quant", "write") => {
            let ids: Vec<i64> = call_args
                .first()
                .and_then(Value::as_array)
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default();
            let values = call_args.get(1).cloned().unwrap_or_default();
            for row in data.quants.iter_mut() {
                if ids.contains(&row["id"].as_i64().unwrap_or(-1)) {
                    if let Some(obj) = values.as_object() {
                        for (key, value) in obj {
                            row[key] = value.clone();
                        }
                    }
                }
            }
            rpc_result(json!(true))
        }
        _ => rpc_fault(&format!("unsupported call: {model}.{method}")),
    }
}

/// Evaluate a search_read domain against rows; `location_id.usage`
/// conditions always match (the mock has internal locations only).
fn search(rows: &[Value], domain: Option<&Value>) -> Value {
    let conditions = domain
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let matched: Vec<Value> = rows
        .iter()
        .filter(|row| conditions.iter().all(|c| matches_condition(row, c)))
        .cloned()
        .collect();
    json!(matched)
}

fn matches_condition(row: &Value, condition: &Value) -> bool {
    let Some(parts) = condition.as_array() else {
        return true;
    };
    let (Some(field), Some(op)) = (parts[0].as_str(), parts[1].as_str()) else {
        return true;
    };
    if field.contains('.') {
        return true;
    }
    let expected = &parts[2];
    let actual = row.get(field).unwrap_or(&Value::Null);
    // many2one fields compare on the id
    let actual = match actual {
        Value::Array(pair) if !pair.is_empty() => &pair[0],
        other => other,
    };
    match op {
        "=" => actual == expected,
        "!=" => actual != expected,
        "in" => expected
            .as_array()
            .is_some_and(|list| list.contains(actual)),
        "not in" => !expected
            .as_array()
            .is_some_and(|list| list.contains(actual)),
        _ => true,
    }
}

// -------------------------------------------------------------- Broker

#[derive(Default)]
pub struct MockBrokerState {
    pub entities: Mutex<HashMap<String, Value>>,
    pub subscriptions: Mutex<HashMap<String, Value>>,
    pub patch_count: AtomicU32,
    pub create_count: AtomicU32,
}

pub struct MockBroker {
    pub url: String,
    pub state: Arc<MockBrokerState>,
}

impl MockBroker {
    pub async fn start() -> Self {
        let state = Arc::new(MockBrokerState::default());
        let app = Router::new()
            .route("/version", get(version))
            .route("/ngsi-ld/v1/entities", post(create_entity).get(query_entities))
            .route(
                "/ngsi-ld/v1/entities/{id}",
                get(get_entity).delete(delete_entity),
            )
            .route("/ngsi-ld/v1/entities/{id}/attrs", axum::routing::patch(patch_entity))
            .route("/ngsi-ld/v1/subscriptions", post(create_subscription).get(list_subscriptions))
            .route(
                "/ngsi-ld/v1/subscriptions/{id}",
                get(get_subscription).delete(delete_subscription),
            )
            .with_state(state.clone());
        let url = serve(app).await;
        Self { url, state }
    }

    pub fn client(&self) -> BrokerClient {
        BrokerClient::new(
            &self.url,
            Some("manufacturing".to_string()),
            None,
            Duration::from_secs(5),
            lenient_breaker(),
            fast_retry(),
        )
    }

    pub fn entity(&self, id: &str) -> Option<Value> {
        self.state.entities.lock().get(id).cloned()
    }

    pub fn entity_count(&self) -> usize {
        self.state.entities.lock().len()
    }

    pub fn entities_of_type(&self, entity_type: &str) -> Vec<Value> {
        self.state
            .entities
            .lock()
            .values()
            .filter(|e| e["type"] == entity_type)
            .cloned()
            .collect()
    }
}

async fn version() -> Json<Value> {
    Json(json!({"orionld version": "1.5.1"}))
}

async fn create_entity(
    State(state): State<Arc<MockBrokerState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Some(id) = body["id"].as_str().map(str::to_string) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut entities = state.entities.lock();
    if entities.contains_key(&id) {
        return StatusCode::CONFLICT;
    }
    state.create_count.fetch_add(1, Ordering::SeqCst);
    entities.insert(id, body);
    StatusCode::CREATED
}

async fn get_entity(
    State(state): State<Arc<MockBrokerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.entities.lock().get(&id) {
        Some(entity) => Json(entity.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn patch_entity(
    State(state): State<Arc<MockBrokerState>>,
    Path(id): Path<String>,
    Json(attrs): Json<Value>,
) -> StatusCode {
    let mut entities = state.entities.lock();
    let Some(entity) = entities.get_mut(&id) else {
        return StatusCode::NOT_FOUND;
    };
    state.patch_count.fetch_add(1, Ordering::SeqCst);
    if let (Some(target), Some(patch)) = (entity.as_object_mut(), attrs.as_object()) {
        for (key, value) in patch {
            if key != "@context" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    StatusCode::NO_CONTENT
}

async fn delete_entity(
    State(state): State<Arc<MockBrokerState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.entities.lock().remove(&id).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn query_entities(State(state): State<Arc<MockBrokerState>>) -> Json<Value> {
    let entities: Vec<Value> = state.entities.lock().values().cloned().collect();
    Json(json!(entities))
}

async fn create_subscription(
    State(state): State<Arc<MockBrokerState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    let Some(id) = body["id"].as_str().map(str::to_string) else {
        return StatusCode::BAD_REQUEST;
    };
    let mut subscriptions = state.subscriptions.lock();
    if subscriptions.contains_key(&id) {
        return StatusCode::CONFLICT;
    }
    subscriptions.insert(id, body);
    StatusCode::CREATED
}

async fn get_subscription(
    State(state): State<Arc<MockBrokerState>>,
    Path(id): Path<String>,
) -> Response {
    match state.subscriptions.lock().get(&id) {
        Some(sub) => Json(sub.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn list_subscriptions(State(state): State<Arc<MockBrokerState>>) -> Json<Value> {
    let subs: Vec<Value> = state.subscriptions.lock().values().cloned().collect();
    Json(json!(subs))
}

async fn delete_subscription(
    State(state): State<Arc<MockBrokerState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.subscriptions.lock().remove(&id).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

// ------------------------------------------------------------ fixtures

/// Three-component BOM for a LED panel kit: 2x strip, 4x bracket, 1x PSU
pub fn led_panel_erp_data() -> ErpData {
    ErpData {
        products: vec![
            json!({"id": 1, "name": "LED Panel Kit", "default_code": "LED-PANEL-KIT", "active": true, "type": "product"}),
            json!({"id": 2, "name": "LED Strip 24V", "default_code": "LED-STRIP-24V", "active": true, "type": "product"}),
            json!({"id": 3, "name": "Steel Bracket", "default_code": "BRACKET-STEEL-001", "active": true, "type": "product"}),
            json!({"id": 4, "name": "Power Supply 150W", "default_code": "PSU-150W", "active": true, "type": "product"}),
        ],
        boms: vec![json!({
            "id": 10,
            "product_id": [1, "LED Panel Kit"],
            "product_qty": 1.0,
            "bom_line_ids": [101, 102, 103],
        })],
        bom_lines: vec![
            json!({"id": 101, "product_id": [2, "LED Strip 24V"], "product_qty": 2.0, "product_uom_id": [1, "Units"]}),
            json!({"id": 102, "product_id": [3, "Steel Bracket"], "product_qty": 4.0, "product_uom_id": [1, "Units"]}),
            json!({"id": 103, "product_id": [4, "Power Supply 150W"], "product_qty": 1.0, "product_uom_id": [1, "Units"]}),
        ],
        quants: vec![
            json!({"id": 201, "product_id": [2, "LED Strip 24V"], "location_id": [8, "WH/Stock"], "quantity": 10.0, "reserved_quantity": 0.0}),
            json!({"id": 202, "product_id": [3, "Steel Bracket"], "location_id": [8, "WH/Stock"], "quantity": 10.0, "reserved_quantity": 0.0}),
            json!({"id": 203, "product_id": [4, "Power Supply 150W"], "location_id": [8, "WH/Stock"], "quantity": 10.0, "reserved_quantity": 0.0}),
        ],
    }
}
