//! Outbound HTTP for page downloads and completion-provider calls.
//!
//! One [`HttpClient`] type serves both: anchored to a provider base URL for
//! API calls, or [`HttpClient::unanchored`] for arbitrary site URLs.
//!
//! - per-request [`RequestOpts`]: timeout, retry budget, [`Auth`], headers, query
//! - 429/5xx and transport failures retried with backoff, honouring `Retry-After`
//! - secrets never logged; `BROCHURE_HTTP_RAW=1` adds redacted curl repro lines
//!
//! ```no_run
//! # async fn demo() -> Result<(), brochure_http::HttpError> {
//! let client = brochure_http::HttpClient::unanchored()?;
//! let html = client
//!     .get_text("https://example.com", brochure_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

const RAW_ENV: &str = "BROCHURE_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;
const REDACTED: &str = "<redacted>";

const SECRET_PARAMS: &[&str] = &["key", "api_key", "access_token", "token", "secret"];

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

/// How a request authenticates.
///
/// ```
/// use brochure_http::Auth;
///
/// let auth = Auth::Query { name: "key", value: "k".into() };
/// assert!(matches!(auth, Auth::Query { name: "key", .. }));
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// `Authorization: Bearer <token>` (OpenAI-compatible endpoints).
    Bearer(&'a str),
    /// Secret passed as a query parameter (native Gemini API).
    Query { name: &'a str, value: Cow<'a, str> },
}

impl Auth<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Query { .. } => "query",
        }
    }
}

/// Per-request overrides. Unset fields fall back to the client defaults.
///
/// ```
/// use brochure_http::RequestOpts;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(10)),
///     retries: Some(0),
///     ..Default::default()
/// };
/// assert!(opts.auth.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

/// Streamed response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, HttpError>>;

#[derive(Clone)]
pub struct HttpClient {
    base: Option<Url>,
    inner: Client,
    pub default_timeout: Option<Duration>,
    pub max_retries: usize,
}

impl HttpClient {
    /// Client whose paths are joined onto `base`.
    ///
    /// ```no_run
    /// use brochure_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1/")?;
    /// assert_eq!(client.default_timeout, Some(Duration::from_secs(15)));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(format!("{base}: {e}")))?;
        Self::build(Some(base))
    }

    /// Client without a base; every path must be an absolute URL.
    pub fn unanchored() -> Result<Self, HttpError> {
        Self::build(None)
    }

    fn build(base: Option<Url>) -> Result<Self, HttpError> {
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Some(Duration::from_secs(15)),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = Some(dur);
        self
    }

    /// Drop the whole-request deadline; only the connect timeout remains.
    pub fn without_timeout(mut self) -> Self {
        self.default_timeout = None;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    /// GET a body as text, e.g. an HTML page. The `Content-Type` charset
    /// decides the decoding, UTF-8 when absent.
    pub async fn get_text(&self, path: &str, opts: RequestOpts<'_>) -> Result<String, HttpError> {
        let (req_id, resp) = self.execute(Method::GET, path, None, &opts).await?;
        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        log_raw_body(&req_id, status, text.as_bytes());
        Ok(text)
    }

    /// POST a JSON body and decode a JSON reply.
    pub async fn post_json_opts<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_json(body)?;
        let (req_id, resp) = self
            .execute(Method::POST, path, Some(payload), &opts)
            .await?;
        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Network(e.to_string()))?;
        log_raw_body(&req_id, status, &bytes);
        decode_json(&bytes)
    }

    /// POST a JSON body and hand back the reply as a live byte stream.
    ///
    /// Attempted exactly once: bytes already handed out cannot be replayed.
    pub async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<ByteStream, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;
        let payload = encode_json(body)?;
        let req_id = new_request_id();

        let resp = self
            .build_request(&Method::POST, &url, Some(&payload), &opts, &req_id, 1)?
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%req_id, error = %e, "http.error");
                HttpError::Network(e.to_string())
            })?;

        let status = resp.status();
        tracing::debug!(%req_id, %status, streaming = true, "http.response.headers");
        if !status.is_success() {
            let headers = resp.headers().clone();
            let body = resp.bytes().await.unwrap_or_default();
            return Err(api_error(&req_id, status, &headers, &body));
        }

        Ok(resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| HttpError::Network(e.to_string())))
            .boxed())
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        let joined = match &self.base {
            Some(base) => base.join(path),
            None => Url::parse(path),
        };
        joined.map_err(|e| HttpError::Url(format!("{path}: {e}")))
    }

    fn build_request(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
        opts: &RequestOpts<'_>,
        req_id: &str,
        attempt: usize,
    ) -> Result<RequestBuilder, HttpError> {
        let mut rb = self.inner.request(method.clone(), url.clone());
        let timeout = opts.timeout.or(self.default_timeout);
        if let Some(t) = timeout {
            rb = rb.timeout(t);
        }
        if let Some(headers) = &opts.headers {
            rb = rb.headers(headers.clone());
        }
        if let Some(bytes) = body {
            rb = rb.header(CONTENT_TYPE, "application/json").body(bytes.to_vec());
        }

        let mut query: Vec<(&str, &str)> = opts
            .query
            .iter()
            .flatten()
            .map(|(k, v)| (*k, v.as_ref()))
            .collect();
        match &opts.auth {
            Some(Auth::Bearer(token)) => rb = rb.bearer_auth(sanitize_api_key(token)?),
            Some(Auth::Query { name, value }) => query.push((*name, value.as_ref())),
            None => {}
        }
        if !query.is_empty() {
            rb = rb.query(&query);
        }

        tracing::debug!(
            %req_id,
            attempt,
            %method,
            target_url = %display_url(url, &query),
            timeout_ms = timeout.map(|t| t.as_millis() as u64),
            auth = opts.auth.as_ref().map_or("none", Auth::kind),
            "http.request.start"
        );
        if raw_enabled() {
            let curl = make_curl(method, &display_url(url, &query), opts.headers.as_ref(), body);
            tracing::debug!(target: "http.raw", %req_id, %curl, "request");
        }
        Ok(rb)
    }

    /// Send with retries and return the first successful response, body
    /// unread, along with the request id used in its log events.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOpts<'_>,
    ) -> Result<(String, Response), HttpError> {
        let url = self.resolve(path)?;
        let budget = opts.retries.unwrap_or(self.max_retries);
        let req_id = new_request_id();

        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let retries_left = attempt <= budget;
            let started = Instant::now();
            let rb = self.build_request(&method, &url, body.as_deref(), opts, &req_id, attempt)?;

            let failure = match rb.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    tracing::debug!(
                        %req_id,
                        %status,
                        duration_ms = started.elapsed().as_millis() as u64,
                        content_length = ?resp.content_length(),
                        upstream_id = %upstream_request_id(resp.headers()),
                        "http.response.headers"
                    );
                    if status.is_success() {
                        return Ok((req_id, resp));
                    }
                    let headers = resp.headers().clone();
                    match resp.bytes().await {
                        Ok(bytes) => {
                            log_raw_body(&req_id, status, &bytes);
                            match retry_delay(status, &headers, attempt) {
                                Some(delay) if retries_left => {
                                    tracing::warn!(
                                        %req_id,
                                        %status,
                                        attempt,
                                        delay_ms = delay.as_millis() as u64,
                                        body_snippet = %snip_body(&bytes),
                                        "http.retrying"
                                    );
                                    sleep(delay).await;
                                    continue;
                                }
                                _ => return Err(api_error(&req_id, status, &headers, &bytes)),
                            }
                        }
                        Err(e) => e.to_string(),
                    }
                }
                Err(e) => e.to_string(),
            };

            if !retries_left {
                tracing::warn!(%req_id, attempt, message = %failure, "http.error");
                return Err(HttpError::Network(failure));
            }
            let delay = backoff(attempt);
            tracing::warn!(%req_id, attempt, delay_ms = delay.as_millis() as u64, message = %failure, "http.retrying");
            sleep(delay).await;
        }
    }
}

/// Debug-log a response body under `http.raw` when raw logging is on.
fn log_raw_body(req_id: &str, status: StatusCode, body: &[u8]) {
    if raw_enabled() {
        let shown = &body[..body.len().min(RAW_MAX_BODY)];
        tracing::debug!(target: "http.raw", %req_id, %status, body = %String::from_utf8_lossy(shown), "response");
    }
}

fn raw_enabled() -> bool {
    matches!(
        std::env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn new_request_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << attempt.saturating_sub(1).min(10)))
}

/// Delay before retrying `status`, or `None` when it is not retryable.
fn retry_delay(status: StatusCode, headers: &HeaderMap, attempt: usize) -> Option<Duration> {
    let throttled = status == StatusCode::TOO_MANY_REQUESTS;
    if !throttled && !status.is_server_error() {
        return None;
    }
    let advised = headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    Some(match advised {
        Some(delay) => delay,
        None if throttled => backoff(attempt).max(Duration::from_millis(1100)),
        None => backoff(attempt),
    })
}

fn encode_json<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, HttpError> {
    serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        tracing::warn!(error = %e, body_snippet = %snippet, "http.response.decode_error");
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn upstream_request_id(headers: &HeaderMap) -> String {
    ["x-request-id", "x-goog-request-id", "x-correlation-id"]
        .iter()
        .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()))
        .unwrap_or("-")
        .to_string()
}

fn api_error(req_id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) -> HttpError {
    let message = extract_error_message(body, status);
    let request_id = upstream_request_id(headers);
    tracing::warn!(%req_id, %status, %message, upstream_id = %request_id, "http.error");
    HttpError::Api {
        status,
        message,
        request_id,
    }
}

/// Best human-readable message from an error body.
fn extract_error_message(body: &[u8], status: StatusCode) -> String {
    // {"error": {"message": ...}} from OpenAI-compatible and Gemini endpoints
    #[derive(Deserialize)]
    struct Envelope {
        error: Detail,
    }
    #[derive(Deserialize)]
    struct Detail {
        message: String,
    }
    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct Flat {
        message: String,
        detail: String,
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Envelope>(body) {
        return env.error.message;
    }
    if let Ok(flat) = serde_json::from_slice::<Flat>(body) {
        if let Some(found) = [flat.message, flat.detail, flat.error]
            .into_iter()
            .find(|m| !m.is_empty())
        {
            return found;
        }
    }
    if body.is_empty() {
        return status.canonical_reason().unwrap_or("unknown status").to_string();
    }
    snip_body(body)
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut idx = max.min(s.len());
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).into_owned();
    if snip.len() > SNIPPET_MAX {
        snip.truncate(floor_char_boundary(&snip, SNIPPET_MAX));
        snip.push_str("...");
    }
    snip
}

/// Strip quotes and whitespace a key picks up from `.env` files and shells.
fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut key = raw.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
    key.retain(|c| !c.is_ascii_whitespace());
    if !key.is_ascii() || key.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build(
            "API key contains non-ASCII or control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {key}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(key)
}

/// `url` plus `extra` query pairs, with secret values replaced.
fn display_url(url: &Url, extra: &[(&str, &str)]) -> String {
    let pairs: Vec<String> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .chain(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())))
        .map(|(k, v)| {
            let shown = if SECRET_PARAMS.contains(&k.to_ascii_lowercase().as_str()) {
                REDACTED.to_string()
            } else {
                v
            };
            format!("{k}={shown}")
        })
        .collect();
    let mut bare = url.clone();
    bare.set_query(None);
    bare.set_fragment(None);
    let mut shown = bare.to_string();
    if !pairs.is_empty() {
        shown.push('?');
        shown.push_str(&pairs.join("&"));
    }
    shown
}

/// Curl repro line; the target is already redacted, auth headers are masked.
fn make_curl(method: &Method, target: &str, headers: Option<&HeaderMap>, body: Option<&[u8]>) -> String {
    let quote = |s: &str| s.replace('\'', r"'\''");
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, value) in headers.into_iter().flatten() {
        let shown = if name.as_str().eq_ignore_ascii_case("authorization") {
            REDACTED
        } else {
            value.to_str().unwrap_or("")
        };
        parts.push(format!("-H '{}: {}'", name, quote(shown)));
    }
    if let Some(bytes) = body {
        let text = String::from_utf8_lossy(bytes);
        let cut = floor_char_boundary(&text, RAW_MAX_BODY);
        parts.push(format!("-d '{}'", quote(&text[..cut])));
    }
    parts.push(format!("'{target}'"));
    parts.join(" ")
}
