//! Cookie-bearing HTTP transport shared by the session authenticator and the
//! protocol client.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, RequestBuilder};
use url::Url;

/// Fallback user agent when the caller sets none.
pub const USER_AGENT: &str = concat!("ai-bridges/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout. Deep research replies can take minutes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Thin wrapper over [`reqwest::Client`].
///
/// Every request carries the headers given at build time, so the session
/// cookies never have to be threaded through call sites. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    /// Create a new builder.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Authenticated page load.
    pub fn get(&self, url: &str) -> RequestBuilder {
        self.inner.get(url)
    }

    /// Form-encoded POST with query parameters, the shape of every RPC the
    /// web app accepts.
    pub fn post_form(&self, url: &Url, query: &[(&str, &str)], form: &[(&str, &str)]) -> RequestBuilder {
        self.inner.post(url.clone()).query(query).form(form)
    }
}

/// Builder for [`HttpClient`].
pub struct HttpClientBuilder {
    builder: ClientBuilder,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            builder: Client::builder()
                .user_agent(USER_AGENT)
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT),
        }
    }
}

impl HttpClientBuilder {
    /// Set a custom user agent.
    pub fn user_agent(mut self, ua: &str) -> Self {
        self.builder = self.builder.user_agent(ua);
        self
    }

    /// Set connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.connect_timeout(timeout);
        self
    }

    /// Set request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.builder = self.builder.timeout(timeout);
        self
    }

    /// Headers attached to every request (cookies, origin).
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.builder = self.builder.default_headers(headers);
        self
    }

    /// Build the client. Invalid header or TLS settings are an error.
    pub fn build(self) -> Result<HttpClient, reqwest::Error> {
        Ok(HttpClient {
            inner: self.builder.build()?,
        })
    }
}
