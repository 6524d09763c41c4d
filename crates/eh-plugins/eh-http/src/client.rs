//! Shared request plumbing: base URL, bearer tokens, status mapping.

use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Client-side API error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Parses `body` without serde_json's nesting limit. Reply chains have no
/// depth bound, so the parser grows its stack on the heap instead.
pub(crate) fn from_json_unbounded<T: DeserializeOwned>(body: &str) -> serde_json::Result<T> {
    let mut json = serde_json::Deserializer::from_str(body);
    json.disable_recursion_limit();
    let value: T = Deserialize::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}

/// Pluggable token provider. Called before every API request.
///
/// Returns `None` to skip the Authorization header (anonymous).
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn token(&self) -> Option<SecretString>;
}

/// Anonymous requests.
pub struct NoAuth;

#[async_trait::async_trait]
impl TokenSource for NoAuth {
    async fn token(&self) -> Option<SecretString> {
        None
    }
}

/// Bearer token obtained at sign-in and handed over as-is.
pub struct StaticToken(SecretString);

impl StaticToken {
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self(token.into())
    }
}

#[async_trait::async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Option<SecretString> {
        Some(self.0.clone())
    }
}

/// Connection to the portal backend shared by every adapter in this crate.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self::with_http(reqwest::Client::new(), base_url, tokens)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_http(http, base_url, tokens))
    }

    fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `{base}/{segments...}` with every segment percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.get(self.url(path))
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.http.post(self.url(path))
    }

    pub(crate) fn post_to(&self, url: reqwest::Url) -> reqwest::RequestBuilder {
        self.http.post(url)
    }

    /// Attaches the bearer token, if any, and sends the request.
    pub(crate) async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        let builder = match self.tokens.token().await {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };
        let resp = builder.send().await?;
        Self::check(resp).await
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = resp.status();
        if !status.is_success() {
            let code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: code,
                message: body,
            });
        }
        Ok(resp)
    }

    pub(crate) async fn parse<R: DeserializeOwned>(resp: reqwest::Response) -> Result<R, ApiError> {
        let body = resp.text().await?;
        from_json_unbounded(&body).map_err(|e| ApiError::Decode(format!("response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_auth_returns_none() {
        assert!(NoAuth.token().await.is_none());
    }

    #[tokio::test]
    async fn test_static_token_returns_value() {
        let ts = StaticToken::new("my-jwt-token");
        let token = ts.token().await.unwrap();
        assert_eq!(token.expose_secret(), "my-jwt-token");
    }

    #[test]
    fn test_url_joins_without_double_slashes() {
        let client = ApiClient::new("http://localhost:5000/api/", Arc::new(NoAuth));
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(
            client.url("/community/posts"),
            "http://localhost:5000/api/community/posts"
        );
    }

    #[test]
    fn test_endpoint_percent_encodes_segments() {
        let client = ApiClient::new("http://localhost:5000/api/", Arc::new(NoAuth));
        let url = client
            .endpoint(&["community", "posts", "a/b c?", "comments"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/community/posts/a%2Fb%20c%3F/comments"
        );
    }

    #[test]
    fn test_deeply_nested_body_parses() {
        let depth = 1_000;
        let body = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
        let value: serde_json::Value = from_json_unbounded(&body).unwrap();
        assert!(value.is_array());
        // The default parser gives up long before this depth.
        assert!(serde_json::from_str::<serde_json::Value>(&body).is_err());
    }
}
