//! OAuth2 client-credentials exchange.
//!
//! Builds the form-encoded `POST {base}/auth/token` request and interprets
//! its response. Only an exact 200 carrying a non-empty `access_token` counts
//! as success; no retry happens here.

use serde::Deserialize;
use url::form_urlencoded;

use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::query::build_url;
use crate::session::AccessToken;

pub const TOKEN_PATH: &str = "/auth/token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Build the token request, or fail if either credential is missing.
pub fn build_token_request(config: &ClientConfig) -> Result<HttpRequest, AuthError> {
    let (Some(client_id), Some(client_secret)) = (
        config.client_id.as_deref().filter(|s| !s.is_empty()),
        config.client_secret.as_deref().filter(|s| !s.is_empty()),
    ) else {
        return Err(AuthError::MissingCredentials);
    };

    let body = form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", client_id)
        .append_pair("client_secret", client_secret)
        .append_pair("grant_type", "client_credentials")
        .finish();

    Ok(HttpRequest {
        method: HttpMethod::Post,
        url: build_url(&config.base_url, TOKEN_PATH, None),
        headers: vec![
            (
                "content-type".to_string(),
                "application/x-www-form-urlencoded".to_string(),
            ),
            ("accept".to_string(), "application/json".to_string()),
        ],
        body: Some(body),
    })
}

pub fn parse_token_response(response: &HttpResponse) -> Result<AccessToken, AuthError> {
    if response.status != 200 {
        return Err(AuthError::Rejected {
            status: response.status,
            body: response.body.clone(),
        });
    }
    let parsed: TokenResponse = serde_json::from_str(&response.body)?;
    match parsed.access_token {
        Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
        _ => Err(AuthError::MissingAccessToken),
    }
}

/// Perform one exchange over `transport`.
pub fn request_token<T: Transport + ?Sized>(
    config: &ClientConfig,
    transport: &T,
) -> Result<AccessToken, AuthError> {
    let request = build_token_request(config)?;
    let response = transport.execute(&request)?;
    parse_token_response(&response)
}
