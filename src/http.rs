//! Shared blocking HTTP client construction.
//!
//! Every outbound call carries an explicit timeout; callers pick the
//! budget for their collaborator (see `config`).

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::{APP_NAME, APP_VERSION};

/// Upper bound on establishing a TCP/TLS connection, independent of the
/// per-request timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a blocking client with the given total request timeout.
///
/// Must be called outside an async context: the blocking client owns its
/// own runtime thread.
pub fn blocking_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(format!("{APP_NAME}/{APP_VERSION}"))
        .build()
}

/// Human-readable cause for a failed `send()`.
pub fn describe_send_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
