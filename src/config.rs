use cookie::Cookie;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Base URL of the Ruline console (HTTP API and socket endpoint)
    #[serde(default = "default_console_url")]
    pub console_url: String,

    /// Path of the presence socket endpoint on the console
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Session id sent as a cookie on every request
    pub session_id: Option<String>,

    /// Name of the session cookie
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// How long a closing socket may wait for the server to finish the close handshake
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,

    /// Seed the member list from the editor snapshot endpoint
    #[serde(default = "default_fetch_snapshot")]
    pub fetch_snapshot: bool,
}

impl Config {
    /// Load configuration from `RULINE_*` environment variables or the app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::prefixed("RULINE_").from_env::<Config>() {
            Ok(config) => {
                info!("Configuration loaded for {}", config.console_url);
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(ConfigError::Env(e))
            }
        }
    }

    /// Parsed console URL. Only http and https are accepted.
    pub fn console_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.console_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.console_url, e)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, self.console_url
            ))),
        }
    }

    /// Socket endpoint derived from the console URL (`http` -> `ws`, `https` -> `wss`)
    pub fn ws_url(&self) -> Result<Url, ConfigError> {
        let mut url = self.console_url()?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|_| {
            ConfigError::InvalidUrl(format!("cannot use {} scheme for {}", scheme, url))
        })?;
        url.set_path(&self.ws_path);
        url.set_query(None);
        Ok(url)
    }

    /// `Cookie` header value carrying the session id, if one is configured
    pub fn session_cookie_header(&self) -> Option<String> {
        self.session_id
            .as_deref()
            .filter(|sid| !sid.is_empty())
            .map(|sid| Cookie::new(self.session_cookie.clone(), sid.to_string()).to_string())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            console_url: default_console_url(),
            ws_path: default_ws_path(),
            session_id: None,
            session_cookie: default_session_cookie(),
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
            fetch_snapshot: default_fetch_snapshot(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// Default value functions
fn default_console_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_ws_path() -> String {
    "/ws".to_string()
}

fn default_session_cookie() -> String {
    "sid".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_close_timeout_ms() -> u64 {
    1_000
}

fn default_fetch_snapshot() -> bool {
    true
}
