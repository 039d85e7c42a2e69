//! Blocking client core for the Instinct veterinary partner API.
//!
//! # Overview
//! Obtains an OAuth2 client-credentials token on demand, builds requests for
//! a fixed catalog of resource endpoints, and normalizes every response into
//! one `ApiResult` shape.
//!
//! # Design
//! - Every public call returns `Option<ApiResult>`. `None` means no response
//!   was obtained: authentication failed or the transport did. An HTTP error
//!   status is `Some` with `success == false`.
//! - `InstinctClient` owns its token through a `Session`; there is no global
//!   state, and nothing refreshes in the background.
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   default; tests script their own.
//! - Payloads are opaque `serde_json::Value`s.

pub mod auth;
pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod query;
pub mod session;
pub mod types;

pub use client::InstinctClient;
pub use config::{ClientConfig, ReauthPolicy};
pub use endpoints::{endpoint, Endpoint, CATALOG};
pub use error::{AuthError, ClientError, ConfigError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, UreqTransport};
pub use query::{build_url, merge_query, Query};
pub use session::{AccessToken, Session};
pub use types::ApiResult;
