//! Service configuration read from the process environment.
//!
//! `.env` is loaded first when present (local development); real
//! deployments inject the same variables directly.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use zeroize::Zeroizing;

/// Application-level constants
pub const APP_NAME: &str = "ocr-relay";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BOX_API_URL: &str = "https://api.box.com/2.0";
pub const DEFAULT_BOX_TOKEN_URL: &str = "https://api.box.com/oauth2/token";
pub const DEFAULT_OCR_API_URL: &str = "https://api.ocr.space/parse/image";
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_PORT: u16 = 8080;

/// Timeout for folder listing, search and content download.
pub const STORAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the OAuth token exchange.
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for a single OCR upload. The provider can be slow on large pages.
pub const OCR_TIMEOUT: Duration = Duration::from_secs(60);

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "ocr_relay=info,tower_http=info"
}

/// Load `.env` into the process environment; variables already set win.
/// Runs before tracing is initialised so `RUST_LOG` may come from the file.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("No storage credentials: set BOX_CLIENT_ID, BOX_CLIENT_SECRET and BOX_REFRESH_TOKEN, or BOX_ACCESS_TOKEN")]
    NoStorageCredentials,

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How the credential manager obtains storage bearer tokens.
pub enum TokenStrategy {
    /// Exchange a long-lived refresh token at the provider's token endpoint.
    OAuthRefresh {
        client_id: String,
        client_secret: Zeroizing<String>,
        refresh_token: Zeroizing<String>,
        token_url: String,
    },
    /// Fixed developer token; cannot be renewed once rejected.
    Static { access_token: Zeroizing<String> },
}

impl TokenStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            TokenStrategy::OAuthRefresh { .. } => "oauth_refresh",
            TokenStrategy::Static { .. } => "static",
        }
    }
}

impl std::fmt::Debug for TokenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenStrategy::OAuthRefresh {
                client_id,
                token_url,
                ..
            } => f
                .debug_struct("OAuthRefresh")
                .field("client_id", client_id)
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            TokenStrategy::Static { .. } => f.write_str("Static"),
        }
    }
}

pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub storage_api_url: String,
    pub token_strategy: TokenStrategy,
    pub ocr_api_url: String,
    pub ocr_api_key: Zeroizing<String>,
    pub ocr_language: String,
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("bind_addr", &self.bind_addr)
            .field("storage_api_url", &self.storage_api_url)
            .field("token_strategy", &self.token_strategy)
            .field("ocr_api_url", &self.ocr_api_url)
            .field("ocr_api_key", &"<redacted>")
            .field("ocr_language", &self.ocr_language)
            .finish()
    }
}

impl ServiceConfig {
    /// Read the process environment. Call `load_dotenv` first.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable lookup. Empty values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let token_strategy = match (
            get("BOX_CLIENT_ID"),
            get("BOX_CLIENT_SECRET"),
            get("BOX_REFRESH_TOKEN"),
        ) {
            (Some(client_id), Some(client_secret), Some(refresh_token)) => {
                TokenStrategy::OAuthRefresh {
                    client_id,
                    client_secret: Zeroizing::new(client_secret),
                    refresh_token: Zeroizing::new(refresh_token),
                    token_url: get("BOX_TOKEN_URL")
                        .unwrap_or_else(|| DEFAULT_BOX_TOKEN_URL.to_string()),
                }
            }
            _ => match get("BOX_ACCESS_TOKEN") {
                Some(token) => TokenStrategy::Static {
                    access_token: Zeroizing::new(token),
                },
                None => return Err(ConfigError::NoStorageCredentials),
            },
        };

        let ocr_api_key = get("OCR_API_KEY").ok_or(ConfigError::Missing("OCR_API_KEY"))?;

        let bind_addr = match (get("BIND_ADDR"), get("PORT")) {
            (Some(addr), _) => addr.parse().map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: format!("{e}"),
            })?,
            (None, Some(port)) => {
                let port: u16 = port.parse().map_err(|e| ConfigError::Invalid {
                    name: "PORT",
                    reason: format!("{e}"),
                })?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
        };

        Ok(Self {
            bind_addr,
            storage_api_url: trim_url(get("BOX_API_URL"), DEFAULT_BOX_API_URL),
            token_strategy,
            ocr_api_url: get("OCR_API_URL").unwrap_or_else(|| DEFAULT_OCR_API_URL.to_string()),
            ocr_api_key: Zeroizing::new(ocr_api_key),
            ocr_language: get("OCR_LANGUAGE").unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
        })
    }
}

fn trim_url(value: Option<String>, default: &str) -> String {
    value
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}
