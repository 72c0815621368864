use reqwest::{header::COOKIE, Client, Url};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::models::{EditorState, PresenceError, ScopeKey};

/// Fetches editor snapshots from the console HTTP API
#[derive(Debug, Clone)]
pub struct EditorClient {
    client: Client,
    base_url: Url,
    session_cookie: Option<String>,
}

impl EditorClient {
    pub fn new(
        base_url: Url,
        session_cookie: Option<String>,
        timeout: Duration,
    ) -> Result<Self, PresenceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            session_cookie,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, PresenceError> {
        Self::new(
            config.console_url()?,
            config.session_cookie_header(),
            config.request_timeout(),
        )
    }

    /// Members currently present on the scope, as seen by the console
    pub async fn get_editor_state(&self, scope: &ScopeKey) -> Result<EditorState, PresenceError> {
        let url = self.editor_url(scope)?;
        debug!("Fetching editor state from {}", url);

        let mut request = self.client.get(url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let state = request
            .send()
            .await?
            .error_for_status()?
            .json::<EditorState>()
            .await?;
        Ok(state)
    }

    /// Editor endpoint of `scope`, with each id percent-encoded as one path segment
    fn editor_url(&self, scope: &ScopeKey) -> Result<Url, PresenceError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        let invalid = || PresenceError::InvalidUrl(format!("{} cannot be a base", self.base_url));
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .clear()
            .extend(scope.editor_segments());
        Ok(url)
    }
}
