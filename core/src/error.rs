//! Error types for the partner API client.
//!
//! # Design
//! None of these cross the public dispatch boundary. The pipeline folds every
//! `ClientError` into an absent result and logs it; `try_dispatch` is the one
//! entry point that hands the reason back to the caller.
//!
//! `TransportError` covers "no response at all". An HTTP response with an
//! error status is never an error here: it becomes an `ApiResult` with
//! `success == false`.

use thiserror::Error;

/// The transport could not produce a response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Timeout(_) => TransportError::Timeout(err.to_string()),
            ureq::Error::Io(_) => TransportError::Io(err.to_string()),
            other => TransportError::Connection(other.to_string()),
        }
    }
}

/// The client-credentials exchange did not yield a token.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("client id and client secret must both be configured")]
    MissingCredentials,

    #[error("token request failed: {0}")]
    Transport(#[from] TransportError),

    #[error("token request rejected with HTTP {status}")]
    Rejected { status: u16, body: String },

    #[error("token response is not valid JSON: {0}")]
    MalformedBody(#[from] serde_json::Error),

    #[error("token response has no access_token")]
    MissingAccessToken,
}

/// The client configuration is unusable.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("base_url cannot be empty")]
    EmptyBaseUrl,

    #[error("base_url must start with http:// or https://: {0}")]
    InvalidBaseUrl(String),

    #[error("timeout cannot be zero")]
    ZeroTimeout,
}

/// Any reason a dispatch resolved to no result.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request body could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
