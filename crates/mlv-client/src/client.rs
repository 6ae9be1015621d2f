//! JSON client for the `mlv.cgi` endpoint.
//!
//! All calls are plain `GET`s with `Accept: application/json`. Responses are
//! normalised by [`normalize_response`] into the raw JSON payload or an
//! [`ApiError`]; checking the payload's own `status` field is left to the
//! caller. No retries happen at this layer.

use crate::base::resolve_base_url;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE};
use hyper::{Request, Response, StatusCode, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use mlv_core::config::ApiConfig;
use mlv_core::payload::{
    ListPayload, SearchAllPayload, SearchAllRequest, TailPayload, TailRequest, UpdateApplyPayload,
    UpdateCheckPayload,
};
use mlv_core::ApiError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

const DEFAULT_ENDPOINT: &str = "mlv.cgi";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to one `mlv.cgi` endpoint. Cheap to clone; clones share the
/// connection pool.
#[derive(Clone)]
pub struct ApiClient {
    http: Client<HttpConnector, Empty<Bytes>>,
    base: Url,
    endpoint: String,
    authorization: Option<String>,
    cookie: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: Client::builder(TokioExecutor::new()).build_http(),
            base,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            authorization: None,
            cookie: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from the `[api]` config section. `base_override` (the CLI flag)
    /// wins over the configured base URL.
    pub fn from_config(api: &ApiConfig, base_override: Option<&str>) -> Result<Self, ApiError> {
        let base = resolve_base_url(
            base_override.or(api.base_url.as_deref()),
            &api.page_url,
        )?;
        tracing::info!(base = %base, endpoint = %api.endpoint, "api client configured");
        let mut client = Self::new(base)
            .with_endpoint(&api.endpoint)
            .with_timeout(api.timeout());
        client.authorization = api.authorization.clone();
        client.cookie = api.cookie.clone();
        Ok(client)
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_start_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_cookie(mut self, value: impl Into<String>) -> Self {
        self.cookie = Some(value.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `<base><endpoint>?<params>`
    pub fn endpoint_url(&self, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(&self.endpoint)
            .map_err(|err| ApiError::Transport(format!("invalid endpoint: {err}")))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    // -----------------------------------------------------------------------
    // Raw requests
    // -----------------------------------------------------------------------

    /// `api=logs&action=<action>&<params>`
    pub async fn request(&self, action: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.request_in("logs", action, params).await
    }

    /// Like [`ApiClient::request`] for another API family (`update`).
    pub async fn request_in(
        &self,
        family: &str,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let mut all = Vec::with_capacity(params.len() + 2);
        all.push(("api", family));
        all.push(("action", action));
        all.extend_from_slice(params);
        let url = self.endpoint_url(&all)?;

        let exchange = async {
            let response = self.send(&url).await?;
            let status = response.status();
            let content_type = header_str(&response, CONTENT_TYPE).to_string();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|err| ApiError::Transport(err.to_string()))?
                .to_bytes();
            Ok::<_, ApiError>((status, content_type, body))
        };
        let (status, content_type, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Transport(format!("request timed out after {:?}", self.timeout)))??;

        tracing::debug!(
            family,
            action,
            status = status.as_u16(),
            content_type = %content_type,
            bytes = body.len(),
            "api: response"
        );
        normalize_response(status, &content_type, &body)
    }

    async fn send(&self, url: &Url) -> Result<Response<Incoming>, ApiError> {
        let uri: Uri = url
            .as_str()
            .parse()
            .map_err(|err| ApiError::Transport(format!("invalid request URL: {err}")))?;
        let mut builder = Request::get(uri).header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(auth) = &self.authorization {
            builder = builder.header(AUTHORIZATION, auth.as_str());
        }
        if let Some(cookie) = &self.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }
        let request = builder
            .body(Empty::<Bytes>::new())
            .map_err(|err| ApiError::Transport(format!("invalid request: {err}")))?;
        self.http.request(request).await.map_err(|err| {
            tracing::warn!(url = %url, error = %err, "api: request failed");
            ApiError::Transport(transport_message(&err))
        })
    }

    // -----------------------------------------------------------------------
    // Typed calls
    // -----------------------------------------------------------------------

    pub async fn list(&self) -> Result<ListPayload, ApiError> {
        decode(self.request("list", &[]).await?)
    }

    pub async fn tail(&self, request: &TailRequest) -> Result<TailPayload, ApiError> {
        let lines = request.lines.get().to_string();
        decode(
            self.request(
                "tail",
                &[
                    ("id", request.id.as_str()),
                    ("lines", lines.as_str()),
                    ("search", request.search.as_str()),
                    ("case", case_flag(request.case_sensitive)),
                ],
            )
            .await?,
        )
    }

    pub async fn search_all(&self, request: &SearchAllRequest) -> Result<SearchAllPayload, ApiError> {
        let lines = request.lines.get().to_string();
        decode(
            self.request(
                "search_all",
                &[
                    ("search", request.search.as_str()),
                    ("lines", lines.as_str()),
                    ("case", case_flag(request.case_sensitive)),
                ],
            )
            .await?,
        )
    }

    pub async fn check_update(&self) -> Result<UpdateCheckPayload, ApiError> {
        decode(self.request_in("update", "check", &[]).await?)
    }

    pub async fn apply_update(&self) -> Result<UpdateApplyPayload, ApiError> {
        decode(self.request_in("update", "update", &[]).await?)
    }

    /// Stream `download=<id>` into `dest_dir` and return the written path.
    ///
    /// The file name comes from `Content-Disposition` when present, else
    /// from the log id. A JSON response is the server reporting an error.
    pub async fn download(&self, id: &str, dest_dir: &Path) -> Result<PathBuf, ApiError> {
        let url = self.endpoint_url(&[("download", id)])?;
        let response = tokio::time::timeout(self.timeout, self.send(&url))
            .await
            .map_err(|_| ApiError::Transport(format!("request timed out after {:?}", self.timeout)))??;

        let status = response.status();
        let content_type = header_str(&response, CONTENT_TYPE).to_string();
        if !status.is_success() || content_type.contains("application/json") {
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|err| ApiError::Transport(err.to_string()))?
                .to_bytes();
            let payload = normalize_response(status, &content_type, &body)?;
            return Err(ApiError::Server(
                payload_message(&payload).unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
            ));
        }

        let file_name = attachment_name(header_str(&response, CONTENT_DISPOSITION))
            .unwrap_or_else(|| sanitize_file_name(id));
        let path = dest_dir.join(file_name);
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|err| ApiError::Transport(format!("{}: {err}", path.display())))?;

        let mut body = response.into_body();
        let mut written = 0u64;
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|err| ApiError::Transport(err.to_string()))?;
            if let Ok(chunk) = frame.into_data() {
                written += chunk.len() as u64;
                file.write_all(&chunk)
                    .await
                    .map_err(|err| ApiError::Transport(format!("{}: {err}", path.display())))?;
            }
        }
        file.flush()
            .await
            .map_err(|err| ApiError::Transport(format!("{}: {err}", path.display())))?;
        tracing::info!(id, path = %path.display(), bytes = written, "api: download saved");
        Ok(path)
    }
}

// ---------------------------------------------------------------------------
// Response normalisation
// ---------------------------------------------------------------------------

/// Map one HTTP response onto the client's error taxonomy.
///
/// Checks run in a fixed order: content type first, then HTTP status, then
/// JSON parsing.
pub fn normalize_response(
    status: StatusCode,
    content_type: &str,
    body: &[u8],
) -> Result<Value, ApiError> {
    let text = String::from_utf8_lossy(body);
    let http_status = || format!("HTTP {}", status.as_u16());

    if !content_type.to_ascii_lowercase().contains("application/json") {
        let trimmed = text.trim();
        return Err(ApiError::Transport(if trimmed.is_empty() {
            http_status()
        } else {
            trimmed.to_string()
        }));
    }

    if !status.is_success() {
        let message = match serde_json::from_str::<Value>(&text) {
            Ok(payload) => payload_message(&payload),
            Err(_) => (!text.is_empty()).then(|| text.to_string()),
        };
        return Err(ApiError::Server(message.unwrap_or_else(http_status)));
    }

    serde_json::from_str(&text).map_err(|err| {
        tracing::warn!(error = %err, "api: unparseable JSON body");
        ApiError::Malformed
    })
}

/// `message`, else `detail`, when either is a non-empty string.
fn payload_message(payload: &Value) -> Option<String> {
    ["message", "detail"].iter().find_map(|key| {
        payload
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn decode<T: DeserializeOwned>(payload: Value) -> Result<T, ApiError> {
    serde_json::from_value(payload).map_err(|err| {
        tracing::warn!(error = %err, "api: payload did not match the expected shape");
        ApiError::Malformed
    })
}

fn case_flag(case_sensitive: bool) -> &'static str {
    if case_sensitive {
        "1"
    } else {
        "0"
    }
}

fn header_str<B>(response: &Response<B>, name: hyper::header::HeaderName) -> &str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn transport_message(err: &hyper_util::client::legacy::Error) -> String {
    use std::error::Error;
    match err.source() {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

/// `attachment; filename="x.gz"` → `x.gz`
fn attachment_name(disposition: &str) -> Option<String> {
    disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| sanitize_file_name(name.trim_matches('"')))
        .filter(|name| !name.is_empty())
}

/// Keep only the final path component and drop anything unsafe in a file
/// name.
fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = last
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const JSON: &str = "application/json; charset=utf-8";

    #[test]
    fn ok_json_is_returned_raw() {
        let value = normalize_response(StatusCode::OK, JSON, br#"{"status":"error"}"#).unwrap();
        assert_eq!(value["status"], "error");
    }

    #[rstest]
    #[case::html_body("text/html", b"  <h1>Login</h1> \n" as &[u8], "<h1>Login</h1>")]
    #[case::empty_body("", b"" as &[u8], "HTTP 200")]
    #[case::whitespace_body("text/plain", b"   " as &[u8], "HTTP 200")]
    fn non_json_is_transport(#[case] ct: &str, #[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(
            normalize_response(StatusCode::OK, ct, body),
            Err(ApiError::Transport(expected.to_string()))
        );
    }

    #[rstest]
    #[case::message(br#"{"message":"denied","detail":"x"}"# as &[u8], "denied")]
    #[case::detail(br#"{"detail":"token expired"}"# as &[u8], "token expired")]
    #[case::neither(br#"{"status":"error"}"# as &[u8], "HTTP 403")]
    #[case::raw(b"oops" as &[u8], "oops")]
    #[case::empty(b"" as &[u8], "HTTP 403")]
    fn http_error_with_json_type(#[case] body: &[u8], #[case] expected: &str) {
        assert_eq!(
            normalize_response(StatusCode::FORBIDDEN, JSON, body),
            Err(ApiError::Server(expected.to_string()))
        );
    }

    #[test]
    fn unparseable_json_is_malformed() {
        assert_eq!(
            normalize_response(StatusCode::OK, JSON, b"{not json"),
            Err(ApiError::Malformed)
        );
    }

    #[test]
    fn urls_carry_family_action_and_params() {
        let client = ApiClient::new(Url::parse("http://h/cgi/mlv/").unwrap());
        let url = client
            .endpoint_url(&[("api", "logs"), ("action", "tail"), ("search", "a b&c")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://h/cgi/mlv/mlv.cgi?api=logs&action=tail&search=a+b%26c"
        );
    }

    #[rstest]
    #[case("attachment; filename=\"exim.gz\"", Some("exim.gz"))]
    #[case("attachment; filename=../../etc/passwd", Some("passwd"))]
    #[case("inline", None)]
    #[case("", None)]
    fn content_disposition(#[case] header: &str, #[case] expected: Option<&str>) {
        assert_eq!(attachment_name(header).as_deref(), expected);
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("a/b/c.log.gz"), "c.log.gz");
        assert_eq!(sanitize_file_name(".."), "download");
        assert_eq!(sanitize_file_name("x:y"), "x_y");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let client = ApiClient::new(Url::parse("http://127.0.0.1:1/").unwrap())
            .with_timeout(Duration::from_secs(5));
        assert!(matches!(client.list().await, Err(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn https_is_rejected_as_transport() {
        let client = ApiClient::new(Url::parse("https://127.0.0.1:1/").unwrap());
        assert!(matches!(client.list().await, Err(ApiError::Transport(_))));
    }
}
