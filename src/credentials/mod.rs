//! Storage-provider bearer credentials.
//!
//! One `CredentialManager` per process owns the cached access token.
//! Token acquisition is delegated to a `TokenSource` (OAuth refresh grant
//! or a fixed developer token) and time to a `Clock`, so expiry and
//! refresh de-duplication are testable without network or wall time.

pub mod manager;
pub mod source;

pub use manager::{CredentialManager, CredentialStatus, EXPIRY_SAFETY_MARGIN_SECS};
pub use source::{OAuthRefreshSource, StaticTokenSource};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Token endpoint rejected the refresh ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Token endpoint unreachable: {0}")]
    Transport(String),

    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    #[error("Static access token was rejected and cannot be renewed")]
    NotRenewable,

    #[error("Credential state lock poisoned")]
    LockPoisoned,
}

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct Credential {
    access_token: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: Zeroizing::new(access_token.into()),
            expires_at,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What a token source hands back: the token and its lifetime.
/// `expires_in == None` means the provider gave no expiry.
pub struct TokenGrant {
    pub access_token: Zeroizing<String>,
    pub expires_in: Option<Duration>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.expires_in
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Exchanges configured secrets for a fresh access token.
/// Implementations perform at most one network round trip per call.
pub trait TokenSource: Send + Sync {
    /// Short name reported by the health endpoint.
    fn strategy(&self) -> &'static str;

    fn fetch_token(&self) -> Result<TokenGrant, CredentialError>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
