//! Request pipeline for the partner API.
//!
//! # Design
//! `InstinctClient` owns an immutable `ClientConfig`, a `Session` holding the
//! bearer token, and a `Transport`. Every public call funnels through
//! `try_dispatch`:
//!
//! 1. obtain a token, authenticating lazily if none is held;
//! 2. build the URL from base, path and query;
//! 3. attach `Accept`, `Authorization` and, for POST/PUT/PATCH with a body,
//!    a JSON `Content-Type`;
//! 4. execute, then normalize whatever came back into an `ApiResult`.
//!
//! `dispatch` and the verb helpers fold every failure of steps 1 and 4 into
//! `None` after logging it. An HTTP error status is not a failure at this
//! level; it arrives as an `ApiResult` with `success == false`.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::auth;
use crate::config::{ClientConfig, ReauthPolicy};
use crate::error::ClientError;
use crate::http::{HttpMethod, HttpRequest, Transport, UreqTransport};
use crate::query::{build_url, Query};
use crate::session::Session;
use crate::types::ApiResult;

const UNAUTHORIZED: u16 = 401;

/// Blocking client for the veterinary partner API.
///
/// Calls run one at a time from the caller's point of view: at most two
/// sequential round-trips (token exchange, then the request itself).
#[derive(Debug)]
pub struct InstinctClient<T = UreqTransport> {
    config: ClientConfig,
    session: Session,
    transport: T,
}

impl InstinctClient<UreqTransport> {
    /// Client over the default `ureq` transport, with the configured timeout.
    pub fn new(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout);
        Self::with_transport(config, transport)
    }

    /// Client configured from `INSTINCT_*` environment variables.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }
}

impl<T: Transport> InstinctClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        if let Err(err) = config.validate() {
            warn!(error = %err, "partner API client created with invalid configuration");
        }
        Self {
            config,
            session: Session::new(),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn has_token(&self) -> bool {
        self.session.has_token()
    }

    /// Drop the held token; the next call re-authenticates.
    pub fn clear_token(&self) {
        self.session.clear();
    }

    /// Run the client-credentials exchange now, replacing any held token on
    /// success. On failure the previous token, if any, is kept.
    pub fn authenticate(&self) -> bool {
        match auth::request_token(&self.config, &self.transport) {
            Ok(token) => {
                self.session.store(token);
                info!("authenticated with partner API");
                true
            }
            Err(err) => {
                warn!(error = %err, "partner API authentication failed");
                false
            }
        }
    }

    /// Execute one call, returning `None` when no response could be obtained.
    pub fn dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Option<ApiResult> {
        self.fold(self.try_dispatch(method, path, query, body), method, path)
    }

    /// Same as `dispatch`, but reports why no result was produced.
    #[instrument(skip(self, query, body))]
    pub fn try_dispatch(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&Query>,
        body: Option<&Value>,
    ) -> Result<ApiResult, ClientError> {
        let body = match body {
            Some(body) if method.carries_body() => Some(serde_json::to_string(body)?),
            Some(_) => {
                debug!("ignoring body on {method} request");
                None
            }
            None => None,
        };
        self.send(method, path, query, body)
    }

    fn send(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&Query>,
        body: Option<String>,
    ) -> Result<ApiResult, ClientError> {
        self.config.validate()?;

        let token = self.session.get_or_acquire(|| {
            debug!("no token held, authenticating");
            let token = auth::request_token(&self.config, &self.transport)?;
            info!("authenticated with partner API");
            Ok::<_, ClientError>(token)
        })?;

        let mut headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            ("authorization".to_string(), token.bearer()),
        ];
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }

        let request = HttpRequest {
            method,
            url: build_url(&self.config.base_url, path, query),
            headers,
            body,
        };
        debug!(url = %request.url, "sending request");

        let response = self.transport.execute(&request)?;
        let result = ApiResult::from_response(response);

        if result.status() == UNAUTHORIZED
            && self.config.reauth_policy == ReauthPolicy::ClearOnUnauthorized
        {
            if self.session.clear_if(&token) {
                warn!(path, "request unauthorized, dropping held token");
            } else {
                debug!(path, "request unauthorized with a token already replaced");
            }
        }

        Ok(result)
    }

    fn fold(
        &self,
        outcome: Result<ApiResult, ClientError>,
        method: HttpMethod,
        path: &str,
    ) -> Option<ApiResult> {
        match outcome {
            Ok(result) => Some(result),
            Err(err) => {
                warn!(%method, path, error = %err, "partner API call produced no response");
                None
            }
        }
    }

    pub fn get(&self, path: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.dispatch(HttpMethod::Get, path, query, None)
    }

    pub fn delete(&self, path: &str, query: Option<&Query>) -> Option<ApiResult> {
        self.dispatch(HttpMethod::Delete, path, query, None)
    }

    pub fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        query: Option<&Query>,
    ) -> Option<ApiResult> {
        self.with_body(HttpMethod::Post, path, body, query)
    }

    pub fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        query: Option<&Query>,
    ) -> Option<ApiResult> {
        self.with_body(HttpMethod::Put, path, body, query)
    }

    pub fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        query: Option<&Query>,
    ) -> Option<ApiResult> {
        self.with_body(HttpMethod::Patch, path, body, query)
    }

    fn with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &B,
        query: Option<&Query>,
    ) -> Option<ApiResult> {
        let outcome = serde_json::to_string(body)
            .map_err(ClientError::from)
            .and_then(|body| self.send(method, path, query, Some(body)));
        self.fold(outcome, method, path)
    }
}
