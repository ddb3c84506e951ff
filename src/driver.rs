//! The session driver: initialization request, chunk loop, response classification,
//! recovery invocation.

use crate::config::UploadConfig;
use crate::error::{ErrorDocument, UploadError, UploadResult};
use crate::progress::{Progress, ProgressCallback, ProgressHandle};
use crate::range::{format_chunk_range, format_status_query_range, parse_range_header};
use crate::recovery::{RecoveryAction, RecoveryHook, StatusQueryRecovery};
use crate::retry::{ExponentialBackoff, RetryPolicy};
use crate::session::SessionParams;
use crate::source::{UploadSource, Windower};
use bytes::Bytes;
use reqwest::{Client, Method, Response};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

/// The outcome of classifying one HTTP response as a chunk/status-query response.
enum Outcome {
    Success(Bytes),
    Incomplete(u64),
}

/// Builds and runs one resumable upload session.
///
/// Consumed by value on `upload`/`upload_async`; not reusable.
pub struct Upload<R = Value> {
    client: Client,
    params: SessionParams,
    source: Option<UploadSource>,
    progress_callbacks: Vec<Arc<dyn ProgressCallback>>,
    progress_handle: ProgressHandle,
    response_decoder: Option<Arc<dyn Fn(&[u8]) -> Result<R, UploadError> + Send + Sync>>,
    response_callbacks: Vec<Box<dyn Fn(&R) + Send + Sync>>,
    retry_policy: Arc<dyn RetryPolicy>,
    recovery_hook: Arc<dyn RecoveryHook>,
}

impl<R> Upload<R>
where
    R: Send + 'static,
{
    /// Validates arguments at construction: empty method, chunk size not yet set (uses
    /// the default until `with_chunk_size` overrides it, which is validated there).
    pub fn new(
        client: Client,
        path: impl Into<String>,
        method: &str,
        source: UploadSource,
        content_type: impl Into<String>,
    ) -> Result<Self, UploadError> {
        if method.trim().is_empty() {
            return Err(UploadError::InvalidArgument(
                "HTTP method must not be empty".to_string(),
            ));
        }
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| UploadError::InvalidArgument(format!("invalid HTTP method: {}", e)))?;

        let mut params = SessionParams::new(path, method, content_type);
        params.chunk_size = UploadConfig::default().chunk_size;

        Ok(Self {
            client,
            params,
            source: Some(source),
            progress_callbacks: Vec::new(),
            progress_handle: ProgressHandle::new(),
            response_decoder: None,
            response_callbacks: Vec::new(),
            retry_policy: Arc::new(ExponentialBackoff::default()),
            recovery_hook: Arc::new(StatusQueryRecovery),
        })
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.params.metadata = Some(metadata);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Result<Self, UploadError> {
        UploadConfig::validate_chunk_size(chunk_size)?;
        self.params.chunk_size = chunk_size;
        Ok(self)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.params.api_key = Some(key.into());
        self
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.param_bindings = self.params.param_bindings.clone().with_path_param(name, value);
        self
    }

    pub fn with_query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.param_bindings = self.params.param_bindings.clone().with_query_param(name, value);
        self
    }

    pub fn with_progress_subscriber(mut self, cb: impl ProgressCallback + 'static) -> Self {
        self.progress_callbacks.push(Arc::new(cb));
        self
    }

    pub fn with_response_decoder(
        mut self,
        decoder: impl Fn(&[u8]) -> Result<R, UploadError> + Send + Sync + 'static,
    ) -> Self {
        self.response_decoder = Some(Arc::new(decoder));
        self
    }

    pub fn on_response(mut self, cb: impl Fn(&R) + Send + Sync + 'static) -> Self {
        self.response_callbacks.push(Box::new(cb));
        self
    }

    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry_policy = Arc::new(policy);
        self
    }

    pub fn with_recovery_hook(mut self, hook: impl RecoveryHook + 'static) -> Self {
        self.recovery_hook = Arc::new(hook);
        self
    }

    /// A cheaply cloneable handle whose `.snapshot()` returns the latest [`Progress`].
    /// Call before consuming `self` into `upload()`/`upload_async()`.
    pub fn progress_handle(&self) -> ProgressHandle {
        self.progress_handle.clone()
    }

    /// Runs to completion using a token that is never cancelled.
    pub async fn upload(self) -> UploadResult<Progress> {
        self.upload_async(CancellationToken::new()).await
    }

    fn emit(&self, progress: Progress) {
        self.progress_handle.on_progress(progress.clone());
        for cb in &self.progress_callbacks {
            cb.on_progress(progress.clone());
        }
    }

    fn build_init_url(&self) -> Result<Url, UploadError> {
        let path = self.params.param_bindings.resolve_path(&self.params.path);
        let mut url = Url::parse(&path)
            .map_err(|e| UploadError::InvalidArgument(format!("invalid path/url {:?}: {}", path, e)))?;
        url.query_pairs_mut().append_pair("uploadType", "resumable");
        if let Some(key) = &self.params.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        self.params.param_bindings.apply_query(&mut url);
        Ok(url)
    }

    /// Sends the initialization request and returns the session URI from `Location`.
    async fn initialize(&self, total_len: Option<u64>, cancel: &CancellationToken) -> UploadResult<Url> {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let url = self.build_init_url()?;

        info!(
            target: "resumable_upload::driver",
            url = %url,
            total_len = ?total_len,
            "starting resumable upload session"
        );

        let mut attempt = 0u32;
        loop {
            let mut request = self
                .client
                .request(self.params.method.clone(), url.clone())
                .header("X-Upload-Content-Type", &self.params.content_type);
            if let Some(len) = total_len {
                request = request.header("X-Upload-Content-Length", len.to_string());
            }
            if let Some(metadata) = &self.params.metadata {
                let body = serde_json::to_vec(metadata)
                    .map_err(|e| UploadError::InvalidArgument(format!("metadata not serializable: {}", e)))?;
                request = request
                    .header("Content-Type", "application/json; charset=utf-8")
                    .body(body);
            }

            let response = request.send().await.map_err(UploadError::from);
            match response {
                Ok(response) if response.status().is_success() => {
                    let location = response
                        .headers()
                        .get(reqwest::header::LOCATION)
                        .ok_or_else(|| {
                            UploadError::ProtocolViolation(
                                "initialization response missing Location header".to_string(),
                            )
                        })?
                        .to_str()
                        .map_err(|e| {
                            UploadError::ProtocolViolation(format!("non-ASCII Location header: {}", e))
                        })?
                        .to_string();
                    let session_uri = Url::parse(&location).map_err(|e| {
                        UploadError::ProtocolViolation(format!("malformed Location header {:?}: {}", location, e))
                    })?;
                    debug!(target: "resumable_upload::driver", session_uri = %session_uri, "session initialized");
                    return Ok(session_uri);
                }
                Ok(response) => return Err(classify_error_response(response).await),
                Err(e) => {
                    if !e.is_retryable() || !self.retry_policy.should_retry(attempt, &e) {
                        return Err(e);
                    }
                    warn!(target: "resumable_upload::driver", error = %e, attempt, "init request failed, retrying");
                    sleep_with_cancel(self.retry_policy.backoff(attempt), cancel).await?;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_and_classify(&self, request: reqwest::RequestBuilder) -> UploadResult<Outcome> {
        let response = request.send().await.map_err(UploadError::from)?;
        classify_transfer_response(response).await
    }

    /// Runs the full upload: initialization, chunk loop with recovery and retry,
    /// completion. See the session driver state machine this implements.
    pub async fn upload_async(mut self, cancel: CancellationToken) -> UploadResult<Progress> {
        self.emit(Progress::starting());

        let declared_total_len = self
            .source
            .as_ref()
            .expect("source present until windower construction")
            .total_len();
        let session_uri = match self.initialize(declared_total_len, &cancel).await {
            Ok(uri) => uri,
            Err(e) => {
                self.emit(Progress::failed(0, declared_total_len, e.clone()));
                return Err(e);
            }
        };

        if declared_total_len == Some(0) {
            return self.run_empty_payload(session_uri).await;
        }

        let source = self
            .source
            .take()
            .expect("source present until windower construction");
        let mut windower = Windower::new(source, self.params.chunk_size);
        let mut bytes_sent: u64 = 0;
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(UploadError::Cancelled);
            }

            let chunk = match windower.next_chunk(bytes_sent, &cancel).await {
                Ok(chunk) => chunk,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    self.emit(Progress::failed(bytes_sent, windower.total_len(), e.clone()));
                    return Err(e);
                }
            };

            let total_len = chunk.total_len.or(windower.total_len());
            let content_range = format_chunk_range(chunk.start, chunk.bytes.len() as u64, total_len);
            let request = self
                .client
                .put(session_uri.clone())
                .header("Content-Range", content_range)
                .header("Content-Length", chunk.bytes.len().to_string())
                .body(chunk.bytes.clone());

            match self.send_and_classify(request).await {
                Ok(Outcome::Success(body)) => {
                    let final_bytes = bytes_sent + chunk.bytes.len() as u64;
                    return self.finish_success(final_bytes, total_len, body).await;
                }
                Ok(Outcome::Incomplete(next)) => {
                    bytes_sent = next;
                    attempt = 0;
                    self.emit(Progress::uploading(bytes_sent, total_len));
                }
                Err(e) if e.is_retryable() && self.retry_policy.should_retry(attempt, &e) => {
                    warn!(target: "resumable_upload::driver", error = %e, attempt, bytes_sent, "chunk send failed, recovering");
                    if self.recovery_hook.decide(&e) == RecoveryAction::QueryStatus {
                        match self.query_status(&session_uri, total_len).await {
                            Ok(Outcome::Incomplete(next)) => bytes_sent = next,
                            Ok(Outcome::Success(body)) => {
                                return self.finish_success(bytes_sent, total_len, body).await;
                            }
                            Err(status_err) if status_err.is_retryable() => {
                                // leave bytes_sent unchanged; resend the same chunk next attempt
                                debug!(target: "resumable_upload::driver", error = %status_err, "status query also transient");
                            }
                            Err(status_err) => {
                                self.emit(Progress::failed(bytes_sent, total_len, status_err.clone()));
                                return Err(status_err);
                            }
                        }
                    }
                    sleep_with_cancel(self.retry_policy.backoff(attempt), &cancel).await?;
                    attempt += 1;
                }
                Err(e) => {
                    error!(target: "resumable_upload::driver", error = %e, bytes_sent, "chunk send failed, not retryable");
                    self.emit(Progress::failed(bytes_sent, total_len, e.clone()));
                    return Err(e);
                }
            }
        }
    }

    async fn run_empty_payload(&self, session_uri: Url) -> UploadResult<Progress> {
        let request = self
            .client
            .put(session_uri.clone())
            .header("Content-Range", format_chunk_range(0, 0, Some(0)))
            .header("Content-Length", "0")
            .body(Vec::new());

        match self.send_and_classify(request).await {
            Ok(Outcome::Success(body)) => self.finish_success(0, Some(0), body).await,
            Ok(Outcome::Incomplete(_)) => {
                let e = UploadError::ProtocolViolation(
                    "server returned 308 for a zero-length payload".to_string(),
                );
                self.emit(Progress::failed(0, Some(0), e.clone()));
                Err(e)
            }
            Err(e) => {
                self.emit(Progress::failed(0, Some(0), e.clone()));
                Err(e)
            }
        }
    }

    async fn query_status(&self, session_uri: &Url, total_len: Option<u64>) -> UploadResult<Outcome> {
        let request = self
            .client
            .put(session_uri.clone())
            .header("Content-Range", format_status_query_range(total_len))
            .header("Content-Length", "0");
        self.send_and_classify(request).await
    }

    async fn finish_success(&self, bytes_sent: u64, total_len: Option<u64>, body: Bytes) -> UploadResult<Progress> {
        if let Some(decoder) = &self.response_decoder {
            let value = decoder(&body)?;
            for cb in &self.response_callbacks {
                cb(&value);
            }
        }
        let progress = Progress::completed(bytes_sent, total_len);
        self.emit(progress.clone());
        info!(target: "resumable_upload::driver", bytes_sent, "upload completed");
        Ok(progress)
    }
}

async fn sleep_with_cancel(delay: std::time::Duration, cancel: &CancellationToken) -> UploadResult<()> {
    tokio::select! {
        _ = tokio::time::sleep(delay) => Ok(()),
        _ = cancel.cancelled() => Err(UploadError::Cancelled),
    }
}

async fn classify_transfer_response(response: Response) -> UploadResult<Outcome> {
    let status = response.status();
    if status.is_success() {
        let body = response.bytes().await.map_err(UploadError::from)?;
        return Ok(Outcome::Success(body));
    }
    if status.as_u16() == 308 {
        let range = response
            .headers()
            .get("Range")
            .ok_or_else(|| UploadError::ProtocolViolation("308 response missing Range header".to_string()))?
            .to_str()
            .map_err(|e| UploadError::ProtocolViolation(format!("non-ASCII Range header: {}", e)))?;
        let next = parse_range_header(range)?;
        return Ok(Outcome::Incomplete(next));
    }
    if status.is_server_error() {
        let text = response.text().await.unwrap_or_default();
        return Err(UploadError::Transient(format!("HTTP {}: {}", status, text)));
    }
    Err(classify_error_response(response).await)
}

async fn classify_error_response(response: Response) -> UploadError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => UploadError::ServerError { status, document: envelope.error },
        Err(_) => UploadError::ServerErrorOpaque { status, body },
    }
}

#[derive(serde::Deserialize)]
struct ErrorEnvelope {
    error: ErrorDocument,
}
