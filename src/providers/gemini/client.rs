//! Gemini web protocol client.
//!
//! Every exchange with the service runs under one per-client request lock:
//! the web app keeps a single server-side session per cookie jar and does not
//! tolerate interleaved requests against the same continuity state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::net::HttpClient;
use crate::providers::ProviderError;
use crate::providers::gemini::auth::{Credentials, SessionAuthenticator};
use crate::providers::gemini::codec;
use crate::providers::gemini::constants::{
    BATCH_EXECUTE_PATH, BROWSER_USER_AGENT, BUILD_LABEL, DEFAULT_BASE_URL, DEFAULT_LOCALE,
    DEFAULT_REFRESH_INTERVAL, FIELD_ACCESS_TOKEN, FIELD_REQUEST, RETRIEVE_RESEARCH_RPC,
    STREAM_GENERATE_PATH,
};
use crate::providers::gemini::research::DeepResearch;
use crate::providers::gemini::session::GeminiChatSession;
use crate::providers::types::{
    ChatConfig, ChatOption, GenerateConfig, GenerateOption, Response, SessionMetadata,
};

/// Cookie-authenticated client for the Gemini web app.
///
/// Cheap to clone; clones share the session, token and request lock.
#[derive(Clone)]
pub struct GeminiWebClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    auth: Arc<SessionAuthenticator>,
    generate_url: Url,
    batch_url: Url,
    refresh_interval: Duration,
    request_lock: Mutex<()>,
}

impl GeminiWebClient {
    /// Create a new client builder.
    pub fn builder() -> GeminiWebClientBuilder {
        GeminiWebClientBuilder::default()
    }

    /// Acquire the access token and start the refresh timer.
    #[instrument(skip(self))]
    pub async fn init(&self) -> Result<(), ProviderError> {
        self.inner.auth.init().await?;
        self.inner.auth.start_refresh(self.inner.refresh_interval);
        Ok(())
    }

    /// Single-turn generation with no conversation context.
    pub async fn generate_content(
        &self,
        prompt: &str,
        options: &[GenerateOption],
    ) -> Result<Response, ProviderError> {
        let config = GenerateConfig::from_options(options);
        let metadata = SessionMetadata::default();
        with_deadline(config.timeout, async {
            let _guard = self.lock().await;
            self.exchange(prompt, &metadata, &config).await
        })
        .await
    }

    /// Open a conversation bound to this client.
    pub fn start_chat(&self, options: &[ChatOption]) -> GeminiChatSession {
        let config = ChatConfig::from_options(options);
        GeminiChatSession::new(self.clone(), config.model, config.metadata)
    }

    /// Fetch a finished deep research report.
    #[instrument(skip(self))]
    pub async fn retrieve_deep_research(
        &self,
        conversation_id: &str,
    ) -> Result<Response, ProviderError> {
        if conversation_id.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "conversation id is required".to_string(),
            ));
        }

        let _guard = self.lock().await;
        let token = self.inner.auth.require_token()?;
        let freq = codec::encode_retrieve_research(conversation_id);

        let response = self
            .inner
            .http
            .post_form(
                &self.inner.batch_url,
                &[
                    ("rpcids", RETRIEVE_RESEARCH_RPC),
                    ("bl", BUILD_LABEL),
                    ("hl", DEFAULT_LOCALE),
                    ("rt", "c"),
                ],
                &[(FIELD_REQUEST, freq.as_str()), (FIELD_ACCESS_TOKEN, token.as_str())],
            )
            .send()
            .await?;
        let body = read_body(response).await?;

        let mut report = codec::decode_research(&body)?;
        report.conversation_id = Some(conversation_id.to_string());
        info!(
            chars = report.text.len(),
            references = report.references.len(),
            "Deep research retrieved"
        );
        Ok(report)
    }

    /// Stop the refresh timer and drop the token.
    pub fn close(&self) {
        self.inner.auth.stop_refresh();
        self.inner.auth.invalidate();
        info!("Gemini web session closed");
    }

    /// Whether an access token is currently held.
    pub fn is_healthy(&self) -> bool {
        self.inner.auth.has_token()
    }

    /// Serialize against every other exchange on this client.
    pub(crate) async fn lock(&self) -> MutexGuard<'_, ()> {
        self.inner.request_lock.lock().await
    }

    /// One full exchange. The caller must hold [`Self::lock`].
    pub(crate) async fn exchange(
        &self,
        prompt: &str,
        metadata: &SessionMetadata,
        config: &GenerateConfig,
    ) -> Result<Response, ProviderError> {
        if !config.files.is_empty() {
            warn!(
                files = config.files.len(),
                "File attachments are not supported by the web protocol, sending text only"
            );
        }

        if config.deep_research {
            self.run_deep_research(prompt).await
        } else {
            let freq = codec::encode_single_turn(prompt, metadata);
            let body = self.post_generate(&freq).await?;
            codec::decode(&body)
        }
    }

    async fn run_deep_research(&self, prompt: &str) -> Result<Response, ProviderError> {
        let mut workflow = DeepResearch::new(prompt);
        debug!(request_id = %workflow.request_id(), "Starting deep research");

        while let Some(request) = workflow.next_request() {
            let body = self.post_generate(&request.to_freq()).await?;
            let response = codec::decode(&body)?;
            workflow = workflow.advance(response);
        }

        workflow.into_response().ok_or_else(|| {
            ProviderError::MalformedResponse("deep research ended without a reply".to_string())
        })
    }

    async fn post_generate(&self, freq: &str) -> Result<String, ProviderError> {
        let token = self.inner.auth.require_token()?;
        debug!(bytes = freq.len(), "Sending StreamGenerate request");

        let response = self
            .inner
            .http
            .post_form(
                &self.inner.generate_url,
                &[(FIELD_ACCESS_TOKEN, token.as_str())],
                &[(FIELD_ACCESS_TOKEN, token.as_str()), (FIELD_REQUEST, freq)],
            )
            .send()
            .await?;
        read_body(response).await
    }
}

async fn read_body(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::from_status(status, &body));
    }
    Ok(response.text().await?)
}

/// Run `fut`, failing with [`ProviderError::Cancelled`] once `timeout` passes.
/// Dropping the future aborts the exchange before anything is committed.
pub(crate) async fn with_deadline<T, F>(
    timeout: Option<Duration>,
    fut: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            ProviderError::Cancelled(format!("deadline of {}ms exceeded", limit.as_millis()))
        })?,
        None => fut.await,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`GeminiWebClient`].
pub struct GeminiWebClientBuilder {
    credentials: Option<Credentials>,
    base_url: String,
    refresh_interval: Duration,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl Default for GeminiWebClientBuilder {
    fn default() -> Self {
        Self {
            credentials: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            connect_timeout: None,
            request_timeout: None,
        }
    }
}

impl GeminiWebClientBuilder {
    /// Set the session cookies.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the token refresh interval. Zero disables refreshing.
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Build the client. Fails when credentials are missing or malformed.
    pub fn build(self) -> Result<GeminiWebClient, ProviderError> {
        let credentials = self.credentials.ok_or_else(|| {
            ProviderError::Configuration("session credentials are required".to_string())
        })?;
        let base = Url::parse(&self.base_url).map_err(|e| {
            ProviderError::Configuration(format!("invalid base URL {}: {e}", self.base_url))
        })?;
        let join = |path: &str| {
            base.join(path)
                .map_err(|e| ProviderError::Configuration(format!("invalid endpoint {path}: {e}")))
        };
        let generate_url = join(STREAM_GENERATE_PATH)?;
        let batch_url = join(BATCH_EXECUTE_PATH)?;

        let origin = base.as_str().trim_end_matches('/').to_string();
        let mut http = HttpClient::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(credentials.header_map(&origin)?);
        if let Some(timeout) = self.connect_timeout {
            http = http.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            http = http.request_timeout(timeout);
        }
        let http = http
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client: {e}")))?;

        let auth = Arc::new(SessionAuthenticator::new(http.clone(), &origin));
        Ok(GeminiWebClient {
            inner: Arc::new(ClientInner {
                http,
                auth,
                generate_url,
                batch_url,
                refresh_interval: self.refresh_interval,
                request_lock: Mutex::new(()),
            }),
        })
    }
}
