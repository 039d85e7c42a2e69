use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct TokenForm {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub grant_type: Option<String>,
}

type Records = HashMap<String, Vec<Value>>;
type ApiError = (StatusCode, Json<Value>);

struct Inner {
    client_id: String,
    client_secret: String,
    tokens: Mutex<HashSet<String>>,
    token_requests: AtomicUsize,
    resource_requests: AtomicUsize,
    records: RwLock<Records>,
}

/// Shared server state. Cloning shares the same store, so a test can keep a
/// handle to inspect counters or revoke tokens while the server runs.
#[derive(Clone)]
pub struct AppState(Arc<Inner>);

impl AppState {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self(Arc::new(Inner {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tokens: Mutex::new(HashSet::new()),
            token_requests: AtomicUsize::new(0),
            resource_requests: AtomicUsize::new(0),
            records: RwLock::new(HashMap::new()),
        }))
    }

    /// Number of `POST /v1/auth/token` calls received, successful or not.
    pub fn token_requests(&self) -> usize {
        self.0.token_requests.load(Ordering::SeqCst)
    }

    /// Number of resource calls received, authorized or not.
    pub fn resource_requests(&self) -> usize {
        self.0.resource_requests.load(Ordering::SeqCst)
    }

    /// Invalidate every issued token; later requests carrying one get 401.
    pub fn revoke_tokens(&self) {
        self.tokens().clear();
    }

    pub async fn seed(&self, resource: &str, record: Value) -> Value {
        let record = with_id(record);
        self.0
            .records
            .write()
            .await
            .entry(resource.to_string())
            .or_default()
            .push(record.clone());
        record
    }

    fn tokens(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.0.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        self.0.resource_requests.fetch_add(1, Ordering::SeqCst);
        let token = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match token {
            Some(token) if self.tokens().contains(token) => Ok(()),
            _ => Err(error(StatusCode::UNAUTHORIZED, "invalid or missing bearer token")),
        }
    }
}

fn error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "message": message })))
}

fn with_id(record: Value) -> Value {
    let mut record = match record {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    record
        .entry("id")
        .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
    Value::Object(record)
}

fn field_matches(record: &Value, key: &str, expected: &str) -> bool {
    match record.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/v1/auth/token", post(issue_token))
        .route("/v1/{resource}", get(list_records).post(create_record))
        .route(
            "/v1/{resource}/{id}",
            get(get_record)
                .put(replace_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

async fn issue_token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<Value>, ApiError> {
    state.0.token_requests.fetch_add(1, Ordering::SeqCst);

    if form.grant_type.as_deref() != Some("client_credentials") {
        return Err(error(StatusCode::BAD_REQUEST, "unsupported grant_type"));
    }
    if form.client_id.as_deref() != Some(state.0.client_id.as_str())
        || form.client_secret.as_deref() != Some(state.0.client_secret.as_str())
    {
        tracing::warn!("rejected client credentials");
        return Err(error(StatusCode::UNAUTHORIZED, "invalid client credentials"));
    }

    let token = Uuid::new_v4().simple().to_string();
    state.tokens().insert(token.clone());
    tracing::info!("issued access token");
    Ok(Json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": 3600,
    })))
}

async fn list_records(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    state.authorize(&headers)?;

    let limit = match params.get("limit") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| error(StatusCode::BAD_REQUEST, "limit must be a positive integer"))?,
        None => DEFAULT_LIMIT,
    };
    let offset = match params.get("pageCursor") {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| error(StatusCode::BAD_REQUEST, "invalid pageCursor"))?,
        None => 0,
    };

    let records = state.0.records.read().await;
    let all: &[Value] = records.get(&resource).map(Vec::as_slice).unwrap_or(&[]);
    let matching: Vec<&Value> = all
        .iter()
        .filter(|record| {
            params
                .iter()
                .filter(|(k, _)| k.as_str() != "limit" && k.as_str() != "pageCursor")
                .all(|(k, v)| field_matches(record, k, v))
        })
        .collect();

    let page: Vec<Value> = matching.iter().skip(offset).take(limit).map(|r| (*r).clone()).collect();
    let next = offset + page.len();
    let page_cursor = (next < matching.len()).then(|| next.to_string());

    Ok(Json(json!({
        "results": page,
        "pageCursor": page_cursor,
        "meta": { "limit": limit, "total": matching.len() },
    })))
}

async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Json(input): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    state.authorize(&headers)?;
    if !input.is_object() {
        return Err(error(StatusCode::BAD_REQUEST, "body must be a JSON object"));
    }
    let record = state.seed(&resource, input).await;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    state.authorize(&headers)?;
    let records = state.0.records.read().await;
    records
        .get(&resource)
        .and_then(|r| r.iter().find(|rec| field_matches(rec, "id", &id)))
        .cloned()
        .map(Json)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))
}

async fn replace_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state.authorize(&headers)?;
    let Value::Object(mut replacement) = input else {
        return Err(error(StatusCode::BAD_REQUEST, "body must be a JSON object"));
    };
    let mut records = state.0.records.write().await;
    let record = records
        .get_mut(&resource)
        .and_then(|r| r.iter_mut().find(|rec| field_matches(rec, "id", &id)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    replacement.insert("id".to_string(), Value::String(id));
    *record = Value::Object(replacement);
    Ok(Json(record.clone()))
}

async fn update_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    state.authorize(&headers)?;
    let Value::Object(changes) = input else {
        return Err(error(StatusCode::BAD_REQUEST, "body must be a JSON object"));
    };
    let mut records = state.0.records.write().await;
    let record = records
        .get_mut(&resource)
        .and_then(|r| r.iter_mut().find(|rec| field_matches(rec, "id", &id)))
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    if let Value::Object(fields) = record {
        for (k, v) in changes {
            if k != "id" {
                fields.insert(k, v);
            }
        }
    }
    Ok(Json(record.clone()))
}

async fn delete_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.authorize(&headers)?;
    let mut records = state.0.records.write().await;
    let list = records
        .get_mut(&resource)
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "not found"))?;
    let before = list.len();
    list.retain(|rec| !field_matches(rec, "id", &id));
    if list.len() == before {
        return Err(error(StatusCode::NOT_FOUND, "not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_id_assigns_missing_id() {
        let record = with_id(json!({"name": "Rex"}));
        assert_eq!(record["name"], "Rex");
        assert!(Uuid::parse_str(record["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn with_id_keeps_existing_id() {
        let record = with_id(json!({"id": "p1"}));
        assert_eq!(record["id"], "p1");
    }

    #[test]
    fn field_matching_compares_as_text() {
        let record = json!({"status": "paid", "total": 12});
        assert!(field_matches(&record, "status", "paid"));
        assert!(field_matches(&record, "total", "12"));
        assert!(!field_matches(&record, "status", "open"));
        assert!(!field_matches(&record, "missing", "x"));
    }

    #[test]
    fn token_form_fields_are_optional() {
        let form: TokenForm = serde_json::from_str("{}").unwrap();
        assert!(form.client_id.is_none());
        assert!(form.grant_type.is_none());
    }

    #[test]
    fn revoke_clears_issued_tokens() {
        let state = AppState::new("id", "secret");
        state.tokens().insert("abc".to_string());
        state.revoke_tokens();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert!(state.authorize(&headers).is_err());
    }
}
