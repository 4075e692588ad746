//! Authenticated request/response transport
//!
//! Every call the orchestrator makes goes through the [`Transport`] trait: a method, a
//! target (a path under the API base URL, or an absolute URL handed out by the API), and an
//! optional JSON or file body. Responses expose the status line and a body that can be
//! streamed chunk by chunk or collected.
//!
//! [`HttpTransport`] is the reqwest implementation. It is built once per invocation and
//! reused for every call, and it adds the `X-API-Key` header to every request.

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Content type used for uploaded zip archives
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// A local file sent as a multipart form field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    /// Form field name
    pub field: String,
    /// File on disk
    pub path: PathBuf,
    /// File name reported to the server
    pub file_name: String,
    /// MIME type of the part
    pub content_type: String,
}

impl FileUpload {
    /// A zip archive sent in the `file` field, named after the local file
    pub fn zip(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.zip".to_string());
        Self {
            field: "file".to_string(),
            path,
            file_name,
            content_type: ZIP_CONTENT_TYPE.to_string(),
        }
    }
}

/// Request payload
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON document
    Json(serde_json::Value),
    /// Multipart upload streamed from disk
    File(FileUpload),
}

/// A single call to the API
#[derive(Clone, Debug, PartialEq)]
pub struct TransportRequest {
    /// HTTP method
    pub method: Method,
    /// Path under the base URL (`/builder/...`) or absolute URL
    pub target: String,
    /// Payload
    pub body: RequestBody,
}

impl TransportRequest {
    /// GET without a body
    pub fn get(target: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            target: target.into(),
            body: RequestBody::Empty,
        }
    }

    /// POST a serialized JSON body
    pub fn post_json<T: Serialize + ?Sized>(target: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self {
            method: Method::POST,
            target: target.into(),
            body: RequestBody::Json(serde_json::to_value(body)?),
        })
    }

    /// PUT a file as multipart form data
    pub fn put_file(target: impl Into<String>, upload: FileUpload) -> Self {
        Self {
            method: Method::PUT,
            target: target.into(),
            body: RequestBody::File(upload),
        }
    }

    /// PATCH without a body
    pub fn patch(target: impl Into<String>) -> Self {
        Self {
            method: Method::PATCH,
            target: target.into(),
            body: RequestBody::Empty,
        }
    }
}

/// Response body that can be read incrementally
#[async_trait]
pub trait BodyStream: Send {
    /// Next chunk of the body, `None` once exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Body already held in memory, yielded as a single chunk
pub struct MemoryBody(Option<Vec<u8>>);

impl MemoryBody {
    /// Wrap bytes
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self(Some(data.into()))
    }
}

#[async_trait]
impl BodyStream for MemoryBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.0.take().filter(|chunk| !chunk.is_empty()))
    }
}

struct ReqwestBody(reqwest::Response);

#[async_trait]
impl BodyStream for ReqwestBody {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.0.chunk().await?.map(|chunk| chunk.to_vec()))
    }
}

/// Status line plus streaming body
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Reason phrase
    pub reason: String,
    body: Box<dyn BodyStream>,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl TransportResponse {
    /// Assemble a response from its parts
    pub fn new(status: u16, reason: impl Into<String>, body: Box<dyn BodyStream>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body,
        }
    }

    /// Response with an in-memory body and the canonical reason phrase for `status`
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let reason = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();
        Self::new(status, reason, Box::new(MemoryBody::new(body)))
    }

    /// 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into [`Error::Transport`], naming the failed step
    pub fn error_for_status(self, context: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Transport {
                status: self.status,
                reason: self.reason,
                context: context.to_string(),
            })
        }
    }

    /// Next body chunk
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        self.body.next_chunk().await
    }

    /// Collect the whole body
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        while let Some(chunk) = self.body.next_chunk().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(data)
    }

    /// Collect the body as UTF-8 text, replacing invalid sequences
    pub async fn text(self) -> Result<String> {
        let data = self.bytes().await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

/// Performs authenticated calls against the builder API
///
/// Implementations must add the API key to every request. A non-success status is not an
/// error at this layer: it is returned as a response so each step can name what failed.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// reqwest-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Build the client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Resolve a request target to an absolute URL
    ///
    /// Absolute http(s) URLs are used as-is; anything else is appended to the base URL.
    pub fn resolve(&self, target: &str) -> Result<url::Url> {
        if let Ok(url) = url::Url::parse(target)
            && matches!(url.scheme(), "http" | "https")
        {
            return Ok(url);
        }

        let joined = if target.starts_with('/') {
            format!("{}{}", self.base_url, target)
        } else {
            format!("{}/{}", self.base_url, target)
        };
        url::Url::parse(&joined).map_err(|e| {
            Error::config("BaseUrl", format!("cannot build request URL '{}': {}", joined, e))
        })
    }

    async fn multipart(upload: &FileUpload) -> Result<reqwest::multipart::Form> {
        let file = tokio::fs::File::open(&upload.path)
            .await
            .map_err(|e| io_context(e, "open upload", &upload.path))?;
        let length = file
            .metadata()
            .await
            .map_err(|e| io_context(e, "stat upload", &upload.path))?
            .len();

        let stream = tokio_util::io::ReaderStream::new(file);
        let part =
            reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), length)
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)?;

        Ok(reqwest::multipart::Form::new().part(upload.field.clone(), part))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let url = self.resolve(&request.target)?;
        tracing::debug!(method = %request.method, url = %url, "sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .header(API_KEY_HEADER, &self.api_key);

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::File(upload) => builder.multipart(Self::multipart(upload).await?),
        };

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!(
            method = %request.method,
            url = %url,
            status = status.as_u16(),
            "received response"
        );

        Ok(TransportResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            Box::new(ReqwestBody(response)),
        ))
    }
}

/// Wrap an I/O error with the operation and path that failed
pub(crate) fn io_context(e: std::io::Error, action: &str, path: &Path) -> Error {
    Error::Io(std::io::Error::new(
        e.kind(),
        format!("failed to {} '{}': {}", action, path.display(), e),
    ))
}
