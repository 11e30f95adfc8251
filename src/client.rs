use std::fmt;
use std::time::Duration;

use reqwest::{
    header::{self, HeaderMap, HeaderValue},
    Method, Response,
};
use serde_json::Value as JsonValue;
use tokio::time::sleep;

use crate::{
    retry::RetryPolicy,
    types::RequestBody,
    wire::{classify_response, parse_error_payload},
    ClientOptions, RequestOptions, Result, RiskRadarError,
};

/// Public Risk Radar deployment used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://riskradar.dev.securitymetricshub.com";

/// Authentication state cached from the last status/profile call.
#[derive(Clone, Debug, Default)]
pub(crate) struct AuthCache {
    pub(crate) authenticated: Option<bool>,
    pub(crate) profile: Option<JsonValue>,
}

#[derive(Clone)]
/// HTTP client for the Risk Radar API.
pub struct RiskRadarClient {
    http: reqwest::Client,
    base_url: String,
    authorization: Option<String>,
    options: ClientOptions,
    pub(crate) auth_cache: AuthCache,
}

impl fmt::Debug for RiskRadarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskRadarClient")
            .field("base_url", &self.base_url)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "<redacted>"),
            )
            .field("options", &self.options)
            .finish()
    }
}

impl Default for RiskRadarClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl RiskRadarClient {
    /// Creates an unauthenticated client. Trailing slashes are stripped from
    /// `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.as_ref().trim().trim_end_matches('/').to_owned(),
            authorization: None,
            options: ClientOptions::default(),
            auth_cache: AuthCache::default(),
        }
    }

    /// Creates a client from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn with_token(base_url: impl AsRef<str>, token: impl AsRef<str>) -> Self {
        let mut client = Self::new(base_url);
        client.authorization = Some(normalize_bearer_authorization(token.as_ref()));
        client
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `RISKRADAR_BASE_URL` — API root, defaults to [`DEFAULT_BASE_URL`]
    /// - `RISKRADAR_TOKEN` — JWT access token (Bearer prefix optional)
    ///
    /// Both are optional, but a variable that is set must not be empty.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use riskradar_client::RiskRadarClient;
    ///
    /// let client = RiskRadarClient::from_env().expect("invalid RISKRADAR_* env vars");
    /// ```
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = match std::env::var("RISKRADAR_BASE_URL") {
            Ok(url) if url.trim().is_empty() => {
                return Err("RISKRADAR_BASE_URL is set but empty".to_owned())
            }
            Ok(url) => url,
            Err(_) => DEFAULT_BASE_URL.to_owned(),
        };
        match std::env::var("RISKRADAR_TOKEN") {
            Ok(token) if token.trim().is_empty() => {
                Err("RISKRADAR_TOKEN is set but empty".to_owned())
            }
            Ok(token) => Ok(Self::with_token(base_url, token)),
            Err(_) => Ok(Self::new(base_url)),
        }
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Replaces the credential and forgets cached authentication state.
    pub fn set_token(&mut self, token: impl AsRef<str>) {
        self.authorization = Some(normalize_bearer_authorization(token.as_ref()));
        self.auth_cache = AuthCache::default();
    }

    /// Drops the credential and forgets cached authentication state.
    pub fn clear_token(&mut self) {
        self.authorization = None;
        self.auth_cache = AuthCache::default();
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn has_token(&self) -> bool {
        self.authorization.is_some()
    }

    /// Result of the last [`is_authenticated`](Self::is_authenticated) call,
    /// reset whenever the credential changes.
    pub fn cached_authentication(&self) -> Option<bool> {
        self.auth_cache.authenticated
    }

    /// Profile stored by the last [`user_profile`](Self::user_profile) call.
    pub fn cached_profile(&self) -> Option<&JsonValue> {
        self.auth_cache.profile.as_ref()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_options(&self.options)
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn build_request(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.extend(options.headers.clone());

        // Caller-supplied credentials take precedence over the configured one.
        if options.authenticate && !headers.contains_key(header::AUTHORIZATION) {
            if let Some(authorization) = &self.authorization {
                let mut value = HeaderValue::from_str(authorization).map_err(|_| {
                    RiskRadarError::InvalidInput(
                        "credential is not a valid header value".to_owned(),
                    )
                })?;
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
            }
        }

        match &options.body {
            RequestBody::Bytes {
                content_type: Some(content_type),
                ..
            } => {
                let value = HeaderValue::from_str(content_type).map_err(|_| {
                    RiskRadarError::InvalidInput(format!("invalid content type: {content_type}"))
                })?;
                headers.insert(header::CONTENT_TYPE, value);
            }
            // reqwest appends its own boundary-carrying content type.
            RequestBody::Multipart { .. } => {
                headers.remove(header::CONTENT_TYPE);
            }
            _ => {}
        }

        let mut request = self
            .http
            .request(method.clone(), url)
            .headers(headers)
            .timeout(Duration::from_millis(self.options.timeout_ms));

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }

        request = match &options.body {
            RequestBody::Empty => request,
            RequestBody::Bytes { contents, .. } => request.body(contents.clone()),
            // Keeps a caller-supplied content type.
            RequestBody::Json(value) => request.json(value),
            RequestBody::Multipart { field, file } => {
                let form = reqwest::multipart::Form::new().part(field.clone(), file.to_part()?);
                request.multipart(form)
            }
        };

        Ok(request)
    }

    /// Sends one logical request, retrying transient failures.
    ///
    /// `path` is relative to the base URL and may carry a query string.
    /// Timeouts, network errors, `429` and `5xx` responses are retried up to
    /// `max_retries` times; a `429` waits for `Retry-After` seconds when the
    /// server provides it, everything else waits `backoff * 2^attempt`
    /// (timeouts retry immediately). All other failures are returned at once
    /// as a classified [`RiskRadarError`].
    ///
    /// The successful response is returned undecoded.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response> {
        let url = self.url_for(path);
        let policy = self.retry_policy();
        let mut attempt = 0usize;

        loop {
            let response = self.build_request(&method, &url, &options)?.send().await;

            match response {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retry_after = RetryPolicy::retry_after(response.headers());
                    let body = response.text().await.unwrap_or_default();
                    let error = classify_response(status, parse_error_payload(status, &body));

                    let delay = match error {
                        RiskRadarError::RateLimited { .. } if policy.has_attempts_left(attempt) => {
                            policy.delay_for(attempt, retry_after)
                        }
                        RiskRadarError::Server { .. } if policy.has_attempts_left(attempt) => {
                            policy.backoff_for(attempt)
                        }
                        terminal => return Err(terminal),
                    };

                    self.wait_before_retry(&method, path, attempt, delay, error.kind())
                        .await;
                    attempt += 1;
                }
                Err(err) if err.is_timeout() => {
                    if !policy.has_attempts_left(attempt) {
                        return Err(RiskRadarError::Timeout {
                            message: "Request timeout after retries".to_owned(),
                        });
                    }
                    self.wait_before_retry(&method, path, attempt, Duration::ZERO, "timeout")
                        .await;
                    attempt += 1;
                }
                Err(err) if err.is_builder() => {
                    return Err(RiskRadarError::InvalidInput(format!(
                        "cannot build request for {url}: {err}"
                    )));
                }
                Err(err) => {
                    if !should_retry_transport(&err) || !policy.has_attempts_left(attempt) {
                        return Err(RiskRadarError::Network(err));
                    }
                    let delay = policy.backoff_for(attempt);
                    self.wait_before_retry(&method, path, attempt, delay, "network")
                        .await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends a request and decodes the success body as JSON.
    pub async fn execute_json(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let response = self.execute(method, path, options).await?;
        decode_json(response).await
    }

    /// Logs the retry and sleeps for `delay`.
    async fn wait_before_retry(
        &self,
        method: &Method,
        path: &str,
        attempt: usize,
        delay: Duration,
        reason: &str,
    ) {
        #[cfg(feature = "tracing")]
        tracing::warn!(
            %method,
            path,
            attempt = attempt + 1,
            wait_secs = delay.as_secs_f64(),
            reason,
            "retrying request"
        );
        #[cfg(not(feature = "tracing"))]
        let _ = (method, path, attempt, reason);

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

/// Transport failures worth another attempt; redirect and decode errors
/// are not.
fn should_retry_transport(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_request() || err.is_body() || err.is_connect()
}

async fn decode_json(response: Response) -> Result<JsonValue> {
    let body = response.text().await.map_err(RiskRadarError::Network)?;
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(&body).map_err(|err| {
        RiskRadarError::Decode(format!("invalid JSON response: {err}; body: {body}"))
    })
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{normalize_bearer_authorization, RiskRadarClient, DEFAULT_BASE_URL};
    use crate::ClientOptions;

    #[test]
    fn normalize_bearer_adds_prefix_when_missing() {
        assert_eq!(
            normalize_bearer_authorization("abc123"),
            "Bearer abc123".to_owned()
        );
    }

    #[test]
    fn normalize_bearer_keeps_existing_prefix() {
        assert_eq!(
            normalize_bearer_authorization("bEaReR abc123"),
            "bEaReR abc123".to_owned()
        );
    }

    #[test]
    fn debug_redacts_authorization_value() {
        let client = RiskRadarClient::with_token("https://rr.local", "secret-token");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = RiskRadarClient::new("https://rr.local/");
        assert_eq!(client.base_url(), "https://rr.local");
        assert_eq!(client.url_for("/api/v1/status"), "https://rr.local/api/v1/status");
        assert_eq!(client.url_for("api/v1/status"), "https://rr.local/api/v1/status");
    }

    #[test]
    fn default_client_targets_public_deployment() {
        let client = RiskRadarClient::default();
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
        assert!(!client.has_token());
        assert_eq!(client.options(), &ClientOptions::default());
        assert_eq!(client.options().timeout_ms, 30_000);
        assert_eq!(client.options().max_retries, 3);
    }

    #[test]
    fn set_token_resets_cached_auth_state() {
        let mut client = RiskRadarClient::with_token("https://rr.local", "old");
        client.auth_cache.authenticated = Some(true);
        client.auth_cache.profile = Some(json!({"username": "analyst"}));

        client.set_token("new");

        assert!(client.has_token());
        assert_eq!(client.cached_authentication(), None);
        assert!(client.cached_profile().is_none());
    }

    #[test]
    fn clear_token_drops_credential() {
        let mut client = RiskRadarClient::with_token("https://rr.local", "tok");
        client.auth_cache.authenticated = Some(false);
        client.clear_token();
        assert!(!client.has_token());
        assert_eq!(client.cached_authentication(), None);
    }
}
