//! Pipeline behavior against a scripted transport.
//!
//! The transport records every request it receives and replays canned
//! responses in order, so each test can assert exactly which round-trips the
//! client made.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use instinct_core::{
    ApiResult, ClientConfig, HttpMethod, HttpRequest, HttpResponse, InstinctClient, Query,
    ReauthPolicy, Transport, TransportError,
};
use serde_json::json;

#[derive(Default)]
struct StubTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    fn reply(&self, status: u16, body: &str) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }));
        self
    }

    fn timeout(&self) -> &Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(TransportError::Timeout("30s".to_string())));
        self
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn calls_to(&self, suffix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.split('?').next().unwrap().ends_with(suffix))
            .count()
    }
}

impl Transport for StubTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {}", request.url))
    }
}

const TOKEN_OK: &str = r#"{"access_token":"abc","token_type":"Bearer"}"#;

fn setup(config: ClientConfig) -> (Arc<StubTransport>, InstinctClient<Arc<StubTransport>>) {
    let stub = Arc::new(StubTransport::default());
    let client = InstinctClient::with_transport(config, Arc::clone(&stub));
    (stub, client)
}

fn configured() -> ClientConfig {
    ClientConfig::new("client", "secret").with_base_url("https://host/v1/")
}

fn assert_invariant(result: &ApiResult) {
    assert_eq!(result.is_success(), (200..300).contains(&result.status()));
}

#[test]
fn no_credentials_means_no_network() {
    let (stub, client) = setup(ClientConfig::default().with_base_url("https://host/v1/"));

    assert!(client.get("/accounts", None).is_none());
    assert!(client.post("/accounts", &json!({}), None).is_none());
    assert!(client.list_visits(None).is_none());
    assert!(!client.authenticate());
    assert!(stub.requests().is_empty());
}

#[test]
fn bearer_token_attached_after_auth() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(200, r#"{"results":[]}"#);

    let result = client.get("/accounts", None).unwrap();
    assert_eq!(result.status(), 200);

    let requests = stub.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "https://host/v1/auth/token");
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[1].url, "https://host/v1/accounts");
    assert_eq!(requests[1].header("authorization"), Some("Bearer abc"));
    assert_eq!(requests[1].header("accept"), Some("application/json"));
}

#[test]
fn auth_happens_once_for_repeated_calls() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(200, "{}").reply(200, "{}");

    client.get("/accounts", None).unwrap();
    client.get("/accounts", None).unwrap();

    assert_eq!(stub.calls_to("/auth/token"), 1);
    assert_eq!(stub.calls_to("/accounts"), 2);
}

#[test]
fn rejected_auth_returns_absent_without_request() {
    let (stub, client) = setup(configured());
    stub.reply(401, r#"{"message":"invalid client credentials"}"#);

    assert!(client.get("/accounts", None).is_none());
    assert_eq!(stub.calls_to("/auth/token"), 1);
    assert_eq!(stub.calls_to("/accounts"), 0);
    assert!(!client.has_token());
}

#[test]
fn auth_body_without_token_returns_absent() {
    let (stub, client) = setup(configured());
    stub.reply(200, r#"{"token_type":"Bearer"}"#);

    assert!(client.get("/accounts", None).is_none());
    assert_eq!(stub.requests().len(), 1);
}

#[test]
fn auth_transport_failure_returns_absent() {
    let (stub, client) = setup(configured());
    stub.timeout();

    assert!(client.get("/accounts", None).is_none());
    assert_eq!(stub.requests().len(), 1);
}

#[test]
fn not_found_is_normalized_not_absent() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(404, r#"{"message":"not found"}"#);

    let result = client.get("/patients/doesnotexist", None).unwrap();
    assert_eq!(result.status(), 404);
    assert!(!result.is_success());
    assert_eq!(result.data(), &json!({"message": "not found"}));
    assert_eq!(result.raw_body(), r#"{"message":"not found"}"#);
    assert_invariant(&result);
}

#[test]
fn server_error_with_text_body() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(503, "upstream unavailable");

    let result = client.get("/visits", None).unwrap();
    assert_eq!(result.data(), &json!("upstream unavailable"));
    assert_invariant(&result);
}

#[test]
fn request_timeout_returns_absent() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).timeout();

    assert!(client.get("/visits", None).is_none());
    assert!(client.has_token());
}

#[test]
fn every_outcome_respects_the_success_invariant() {
    let statuses = [200u16, 201, 204, 299, 300, 301, 400, 401, 403, 404, 409, 422, 500, 503];
    for status in statuses {
        let (stub, client) = setup(configured().with_reauth_policy(ReauthPolicy::Retain));
        stub.reply(200, TOKEN_OK).reply(status, "{}");
        let result = client.get("/accounts", None).unwrap();
        assert_eq!(result.status(), status);
        assert_invariant(&result);
    }
}

#[test]
fn unauthorized_clears_token_by_default() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK)
        .reply(401, r#"{"message":"token expired"}"#)
        .reply(200, r#"{"access_token":"fresh"}"#)
        .reply(200, "{}");

    let first = client.get("/accounts", None).unwrap();
    assert_eq!(first.status(), 401);
    assert!(!client.has_token());

    client.get("/accounts", None).unwrap();
    assert_eq!(stub.calls_to("/auth/token"), 2);
    let last = stub.requests().pop().unwrap();
    assert_eq!(last.header("authorization"), Some("Bearer fresh"));
}

#[test]
fn retain_policy_keeps_stale_token() {
    let (stub, client) = setup(configured().with_reauth_policy(ReauthPolicy::Retain));
    stub.reply(200, TOKEN_OK).reply(401, "{}").reply(401, "{}");

    client.get("/accounts", None).unwrap();
    assert!(client.has_token());
    client.get("/accounts", None).unwrap();
    assert_eq!(stub.calls_to("/auth/token"), 1);
}

#[test]
fn forbidden_does_not_clear_token() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(403, "{}");

    client.get("/accounts", None).unwrap();
    assert!(client.has_token());
}

#[test]
fn empty_identifier_rejected_before_network() {
    let (stub, client) = setup(configured());

    let result = client.get_account("").unwrap();
    assert_eq!(result.status(), 0);
    assert!(!result.is_success());
    assert_eq!(result.message(), Some("account_id is required"));
    assert!(stub.requests().is_empty());
}

#[test]
fn unknown_catalog_name_rejected_before_network() {
    let (stub, client) = setup(configured());
    let result = client.call("list_spaceships", &[], None, None).unwrap();
    assert_eq!(result.message(), Some("unknown endpoint: list_spaceships"));
    assert!(stub.requests().is_empty());
}

#[test]
fn default_limit_merged_under_caller_query() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(200, "{}").reply(200, "{}");

    client.list_invoices(None).unwrap();
    client
        .list_invoices(Some(&Query::new().with("limit", 5).with("status", "paid")))
        .unwrap();

    let requests = stub.requests();
    assert_eq!(requests[1].url, "https://host/v1/invoices?limit=100");
    assert_eq!(requests[2].url, "https://host/v1/invoices?limit=5&status=paid");
}

#[test]
fn catalog_call_substitutes_path_and_sends_body() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(200, r#"{"id":"a1","email":"x@y.z"}"#);

    let result = client
        .update_account("a1", &json!({"email": "x@y.z"}))
        .unwrap();
    assert!(result.is_success());

    let req = &stub.requests()[1];
    assert_eq!(req.method, HttpMethod::Patch);
    assert_eq!(req.url, "https://host/v1/accounts/a1");
    assert_eq!(req.header("content-type"), Some("application/json"));
}

#[test]
fn delete_carries_no_body() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK).reply(204, "");

    let result = client.cancel_appointment("ap-9").unwrap();
    assert_eq!(result.status(), 204);
    assert!(result.is_success());

    let req = &stub.requests()[1];
    assert_eq!(req.method, HttpMethod::Delete);
    assert!(req.body.is_none());
}

#[test]
fn shared_client_authenticates_once_across_threads() {
    let (stub, client) = setup(configured());
    stub.reply(200, TOKEN_OK);
    for _ in 0..4 {
        stub.reply(200, "{}");
    }

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| client.get("/accounts", None).unwrap());
        }
    });

    assert_eq!(stub.calls_to("/auth/token"), 1);
    assert_eq!(stub.calls_to("/accounts"), 4);
}

/// Issues numbered tokens and holds every resource request until released,
/// answering it with 401.
struct GatedTransport {
    issued: AtomicUsize,
    entered: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl Transport for GatedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request.clone());
        let (status, body) = if request.url.ends_with("/auth/token") {
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            (200, format!(r#"{{"access_token":"t{n}"}}"#))
        } else {
            self.entered.lock().unwrap().send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            (401, r#"{"message":"token expired"}"#.to_string())
        };
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body,
        })
    }
}

#[test]
fn late_unauthorized_keeps_newer_token() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let gated = Arc::new(GatedTransport {
        issued: AtomicUsize::new(0),
        entered: Mutex::new(entered_tx),
        release: Mutex::new(release_rx),
        seen: Mutex::new(Vec::new()),
    });
    let client = InstinctClient::with_transport(configured(), Arc::clone(&gated));

    std::thread::scope(|s| {
        let stale = s.spawn(|| client.get("/accounts", None).unwrap());
        // The request carrying t1 is in flight; replace the token under it.
        entered_rx.recv().unwrap();
        assert!(client.authenticate());
        release_tx.send(()).unwrap();
        assert_eq!(stale.join().unwrap().status(), 401);
    });

    assert!(client.has_token());

    release_tx.send(()).unwrap();
    client.get("/accounts", None).unwrap();
    let seen = gated.seen.lock().unwrap();
    assert_eq!(gated.issued.load(Ordering::SeqCst), 2);
    assert_eq!(seen.last().unwrap().header("authorization"), Some("Bearer t2"));
}
