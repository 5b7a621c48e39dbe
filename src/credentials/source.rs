//! Token acquisition strategies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Duration;
use reqwest::blocking::Client;
use serde::Deserialize;
use zeroize::Zeroizing;

use super::{CredentialError, TokenGrant, TokenSource};
use crate::http::describe_send_error;

// ═══════════════════════════════════════════════════════════
// OAuth refresh-token grant
// ═══════════════════════════════════════════════════════════

/// Exchanges a long-lived refresh token for short-lived access tokens.
///
/// The provider rotates refresh tokens: each successful exchange may
/// return a new one, which replaces the held token for the next exchange.
pub struct OAuthRefreshSource {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: Zeroizing<String>,
    refresh_token: Mutex<Zeroizing<String>>,
}

impl OAuthRefreshSource {
    pub fn new(
        client: Client,
        token_url: &str,
        client_id: &str,
        client_secret: Zeroizing<String>,
        refresh_token: Zeroizing<String>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret,
            refresh_token: Mutex::new(refresh_token),
        }
    }
}

/// Successful body from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Error body from the token endpoint (RFC 6749 §5.2).
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenSource for OAuthRefreshSource {
    fn strategy(&self) -> &'static str {
        "oauth_refresh"
    }

    fn fetch_token(&self) -> Result<TokenGrant, CredentialError> {
        let mut refresh_token = self
            .refresh_token
            .lock()
            .map_err(|_| CredentialError::LockPoisoned)?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .map_err(|e| CredentialError::Transport(describe_send_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| CredentialError::Transport(describe_send_error(&e)))?;

        if !status.is_success() {
            return Err(CredentialError::Rejected {
                status: status.as_u16(),
                message: token_error_message(&body),
            });
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| CredentialError::MalformedResponse(e.to_string()))?;

        if parsed.access_token.is_empty() {
            return Err(CredentialError::MalformedResponse(
                "access_token is empty".into(),
            ));
        }

        if let Some(rotated) = parsed.refresh_token.filter(|t| !t.is_empty()) {
            tracing::debug!("Token endpoint rotated the refresh token");
            *refresh_token = Zeroizing::new(rotated);
        }

        Ok(TokenGrant {
            access_token: Zeroizing::new(parsed.access_token),
            expires_in: Some(Duration::seconds(parsed.expires_in.max(0))),
        })
    }
}

fn token_error_message(body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error_description: Some(description),
            ..
        }) => description,
        Ok(TokenErrorResponse {
            error: Some(error), ..
        }) => error,
        _ if body.trim().is_empty() => "no response body".to_string(),
        _ => body.trim().to_string(),
    }
}

// ═══════════════════════════════════════════════════════════
// Static developer token
// ═══════════════════════════════════════════════════════════

/// A fixed token supplied at deployment time. It is handed out once;
/// after the manager invalidates it there is nothing to refresh to.
pub struct StaticTokenSource {
    access_token: Zeroizing<String>,
    issued: AtomicBool,
}

impl StaticTokenSource {
    pub fn new(access_token: Zeroizing<String>) -> Self {
        Self {
            access_token,
            issued: AtomicBool::new(false),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn strategy(&self) -> &'static str {
        "static"
    }

    fn fetch_token(&self) -> Result<TokenGrant, CredentialError> {
        if self.issued.swap(true, Ordering::AcqRel) {
            return Err(CredentialError::NotRenewable);
        }
        Ok(TokenGrant {
            access_token: self.access_token.clone(),
            expires_in: None,
        })
    }
}
