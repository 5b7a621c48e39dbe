//! Process-wide access-token cache with serialized refresh.
//!
//! Key properties:
//! - A single `Mutex` covers check-and-refresh, so at most one refresh
//!   round trip is in flight and waiters block until it publishes
//! - Callers that queued behind a failed refresh receive that refresh's
//!   error instead of issuing their own
//! - A failed refresh never leaves a partial credential cached
//! - Nothing is refreshed speculatively

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, TryLockError};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{Clock, Credential, CredentialError, SystemClock, TokenSource};

/// Tokens are treated as expired this long before the provider's expiry.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 300;

#[derive(Default)]
struct TokenState {
    credential: Option<Credential>,
    last_failure: Option<CredentialError>,
}

/// Snapshot for the health endpoint. Never triggers a refresh.
#[derive(Debug, Clone, Serialize)]
pub struct CredentialStatus {
    pub strategy: &'static str,
    pub token_cached: bool,
    pub refreshing: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

pub struct CredentialManager {
    source: Box<dyn TokenSource>,
    clock: Box<dyn Clock>,
    state: Mutex<TokenState>,
    /// Completed refresh attempts. Written only while `state` is held;
    /// read before locking to detect a refresh that finished while waiting.
    attempts: AtomicU64,
}

impl CredentialManager {
    pub fn new(source: Box<dyn TokenSource>) -> Self {
        Self::with_clock(source, Box::new(SystemClock))
    }

    pub fn with_clock(source: Box<dyn TokenSource>, clock: Box<dyn Clock>) -> Self {
        Self {
            source,
            clock,
            state: Mutex::new(TokenState::default()),
            attempts: AtomicU64::new(0),
        }
    }

    /// Return a valid credential, refreshing first if the cached one is
    /// missing, expired, or inside the safety margin.
    pub fn get_token(&self) -> Result<Credential, CredentialError> {
        let seen_attempts = self.attempts.load(Ordering::Acquire);
        let mut state = self.state.lock().map_err(|_| CredentialError::LockPoisoned)?;

        if let Some(credential) = &state.credential {
            if self.is_fresh(credential) {
                return Ok(credential.clone());
            }
        }

        if self.attempts.load(Ordering::Acquire) != seen_attempts {
            if let Some(err) = &state.last_failure {
                tracing::debug!(error = %err, "Sharing failed refresh outcome with waiting caller");
                return Err(err.clone());
            }
        }

        self.refresh_locked(&mut state)
    }

    /// Force the next `get_token()` to refresh.
    pub fn invalidate(&self) -> Result<(), CredentialError> {
        let mut state = self.state.lock().map_err(|_| CredentialError::LockPoisoned)?;
        Self::expire(&mut state);
        Ok(())
    }

    /// Invalidate only if `rejected` is still the cached token. A caller
    /// holding a token that another worker already replaced must not
    /// discard the replacement.
    pub fn invalidate_rejected(&self, rejected: &Credential) -> Result<(), CredentialError> {
        let mut state = self.state.lock().map_err(|_| CredentialError::LockPoisoned)?;
        let is_current = state
            .credential
            .as_ref()
            .is_some_and(|c| c.access_token() == rejected.access_token());
        if is_current {
            tracing::info!("Storage token rejected, invalidating cached credential");
            Self::expire(&mut state);
        } else {
            tracing::debug!("Rejected token already replaced, keeping current credential");
        }
        Ok(())
    }

    pub fn status(&self) -> CredentialStatus {
        let strategy = self.source.strategy();
        match self.state.try_lock() {
            Ok(state) => {
                let fresh = state.credential.as_ref().filter(|c| self.is_fresh(c));
                CredentialStatus {
                    strategy,
                    token_cached: fresh.is_some(),
                    refreshing: false,
                    expires_at: fresh.map(|c| c.expires_at()),
                }
            }
            Err(TryLockError::WouldBlock) => CredentialStatus {
                strategy,
                token_cached: false,
                refreshing: true,
                expires_at: None,
            },
            Err(TryLockError::Poisoned(_)) => CredentialStatus {
                strategy,
                token_cached: false,
                refreshing: false,
                expires_at: None,
            },
        }
    }

    fn is_fresh(&self, credential: &Credential) -> bool {
        let margin = Duration::seconds(EXPIRY_SAFETY_MARGIN_SECS);
        match credential.expires_at().checked_sub_signed(margin) {
            Some(usable_until) => self.clock.now() < usable_until,
            None => false,
        }
    }

    fn expire(state: &mut TokenState) {
        if let Some(credential) = state.credential.as_mut() {
            credential.expires_at = DateTime::<Utc>::MIN_UTC;
        }
    }

    fn refresh_locked(&self, state: &mut TokenState) -> Result<Credential, CredentialError> {
        tracing::info!(strategy = self.source.strategy(), "Refreshing storage access token");

        let outcome = self.source.fetch_token().map(|grant| {
            let expires_at = grant.expires_at(self.clock.now());
            Credential {
                access_token: grant.access_token,
                expires_at,
            }
        });

        match &outcome {
            Ok(credential) => {
                tracing::info!(expires_at = %credential.expires_at(), "Storage access token refreshed");
                state.credential = Some(credential.clone());
                state.last_failure = None;
            }
            Err(err) => {
                tracing::warn!(error = %err, "Storage token refresh failed");
                state.credential = None;
                state.last_failure = Some(err.clone());
            }
        }
        self.attempts.fetch_add(1, Ordering::AcqRel);

        outcome
    }
}
