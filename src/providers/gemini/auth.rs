//! Cookie credentials and access token lifecycle.
//!
//! The web app has no API keys. Requests are authorized by browser session
//! cookies plus a short-lived access token that the landing page embeds in
//! its markup. [`SessionAuthenticator`] scrapes that token, keeps it behind a
//! lock, and re-scrapes it on a timer.

use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use regex::Regex;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, ORIGIN, REFERER};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::net::HttpClient;
use crate::providers::ProviderError;
use crate::providers::gemini::constants::{
    ACCESS_TOKEN_PATTERN, APP_PATH, COOKIE_PSID, COOKIE_PSIDCC, COOKIE_PSIDTS,
};

static ACCESS_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ACCESS_TOKEN_PATTERN).expect("access token pattern is valid"));

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Browser session cookies.
#[derive(Clone, Default)]
pub struct Credentials {
    pub psid: String,
    pub psidts: Option<String>,
    pub psidcc: Option<String>,
}

impl Credentials {
    pub fn new(psid: impl Into<String>) -> Self {
        Self {
            psid: psid.into(),
            ..Default::default()
        }
    }

    pub fn with_psidts(mut self, psidts: impl Into<String>) -> Self {
        self.psidts = Some(psidts.into());
        self
    }

    pub fn with_psidcc(mut self, psidcc: impl Into<String>) -> Self {
        self.psidcc = Some(psidcc.into());
        self
    }

    /// `Cookie` header value. Empty optional cookies are left out.
    pub fn cookie_header(&self) -> String {
        let mut pairs = vec![format!("{COOKIE_PSID}={}", self.psid)];
        let optional = [(COOKIE_PSIDTS, &self.psidts), (COOKIE_PSIDCC, &self.psidcc)];
        for (name, value) in optional {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                pairs.push(format!("{name}={value}"));
            }
        }
        pairs.join("; ")
    }

    /// Headers every request to the web app must carry.
    pub fn header_map(&self, base_url: &str) -> Result<HeaderMap, ProviderError> {
        if self.psid.trim().is_empty() {
            return Err(ProviderError::Configuration(format!("{COOKIE_PSID} is empty")));
        }

        let mut cookie = HeaderValue::from_str(&self.cookie_header()).map_err(|_| {
            ProviderError::Configuration("session cookies contain invalid characters".to_string())
        })?;
        cookie.set_sensitive(true);

        let origin = HeaderValue::from_str(base_url.trim_end_matches('/'))
            .map_err(|_| ProviderError::Configuration(format!("invalid base URL: {base_url}")))?;
        let referer = HeaderValue::from_str(&format!("{}/", base_url.trim_end_matches('/')))
            .map_err(|_| ProviderError::Configuration(format!("invalid base URL: {base_url}")))?;

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);
        headers.insert(ORIGIN, origin);
        headers.insert(REFERER, referer);
        headers.insert("x-same-domain", HeaderValue::from_static("1"));
        Ok(headers)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("psid", &"[REDACTED]")
            .field("psidts", &self.psidts.as_ref().map(|_| "[REDACTED]"))
            .field("psidcc", &self.psidcc.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Pull the access token out of the landing page markup.
pub fn extract_access_token(html: &str) -> Option<String> {
    ACCESS_TOKEN_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// SessionAuthenticator
// ---------------------------------------------------------------------------

/// Owns the access token and its refresh task.
///
/// The token lock is never held across network I/O: a refresh fetches first
/// and only then takes the write lock to swap the value in.
pub struct SessionAuthenticator {
    http: HttpClient,
    app_url: String,
    token: RwLock<Option<String>>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionAuthenticator {
    /// `http` must already carry the session cookies.
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            app_url: format!("{}{APP_PATH}", base_url.trim_end_matches('/')),
            token: RwLock::new(None),
            refresh_task: Mutex::new(None),
        }
    }

    /// Scrape and store a fresh access token.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<(), ProviderError> {
        let token = self.fetch_token().await?;
        self.store(Some(token));
        info!("Gemini web session initialized");
        Ok(())
    }

    /// Fetch the landing page and extract the token without touching state.
    pub async fn fetch_token(&self) -> Result<String, ProviderError> {
        let response = self.http.get(&self.app_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let html = response.text().await?;
        extract_access_token(&html).ok_or_else(|| {
            ProviderError::Authentication(
                "access token not found; credentials invalid or service markup changed"
                    .to_string(),
            )
        })
    }

    /// Current token, if one has been acquired.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current token or an authentication error when not initialized.
    pub fn require_token(&self) -> Result<String, ProviderError> {
        self.token().ok_or_else(|| {
            ProviderError::Authentication("session not initialized; call init first".to_string())
        })
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn store(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Forget the token; subsequent requests fail until `init` runs again.
    pub fn invalidate(&self) {
        self.store(None);
    }

    /// Spawn the periodic refresh task, replacing any previous one.
    ///
    /// The task holds only a weak reference and exits once the authenticator
    /// is dropped. Failed refreshes are logged and the stale token is kept.
    pub fn start_refresh(self: &Arc<Self>, interval: Duration) {
        if interval.is_zero() {
            debug!("Token refresh disabled");
            return;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(auth) = weak.upgrade() else {
                    break;
                };
                match auth.fetch_token().await {
                    Ok(token) => {
                        auth.store(Some(token));
                        debug!("Access token refreshed");
                    }
                    Err(e) => {
                        warn!(error = %e, "Access token refresh failed, keeping previous token");
                    }
                }
            }
        });

        let mut slot = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
        info!(interval_secs = interval.as_secs(), "Token refresh scheduled");
    }

    /// Abort the refresh task if one is running.
    pub fn stop_refresh(&self) {
        let handle = self
            .refresh_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("Token refresh stopped");
        }
    }
}

impl Drop for SessionAuthenticator {
    fn drop(&mut self) {
        self.stop_refresh();
    }
}
