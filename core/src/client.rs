//! Async client for the s.ee API.
//!
//! # Design
//! `SeeClient` composes the stateless `SeeApi` (request building and
//! response mapping), a `RetryPolicy`, and a shared `Transport`. Clones share
//! one inner state, so the client can be handed to many tasks at once.
//! Per-call state lives on the stack of that call.
//!
//! The client is either open or closed. `close` drops the client's handle on
//! the transport, releasing the connection pool once in-flight calls finish;
//! every later call fails with `SeeError::Closed` before any I/O. Dropping
//! the last clone has the same effect.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::api::SeeApi;
use crate::config::{ClientBuilder, ClientConfig};
use crate::error::SeeError;
use crate::http::HttpRequest;
use crate::retry::RetryDecision;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    CreateShortUrlRequest, CreateShortUrlResponse, CreateTextRequest, CreateTextResponse,
    DeleteFileResponse, DeleteShortUrlRequest, DeleteShortUrlResponse, DeleteTextRequest,
    DeleteTextResponse, DomainResponse, Envelope, TagResponse, UpdateShortUrlRequest,
    UpdateShortUrlResponse, UpdateTextRequest, UpdateTextResponse, UploadFileResponse,
};

#[derive(Clone)]
pub struct SeeClient {
    inner: Arc<Inner>,
}

struct Inner {
    api: SeeApi,
    config: ClientConfig,
    transport: RwLock<Option<Arc<dyn Transport>>>,
}

impl std::fmt::Debug for SeeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeeClient")
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ClientBuilder {
    /// Build a client backed by a pooled reqwest transport.
    pub fn build(self) -> Result<SeeClient, SeeError> {
        let config = self.into_config()?;
        let transport = ReqwestTransport::new(config.timeout, config.proxy.as_deref())?;
        Ok(SeeClient::assemble(config, Arc::new(transport)))
    }

    /// Build a client that sends through `transport` instead of the network.
    pub fn build_with_transport(self, transport: Arc<dyn Transport>) -> Result<SeeClient, SeeError> {
        let config = self.into_config()?;
        Ok(SeeClient::assemble(config, transport))
    }
}

impl SeeClient {
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Client with default settings.
    pub fn new(api_key: impl Into<String>) -> Result<Self, SeeError> {
        Self::builder(api_key).build()
    }

    pub fn from_config(config: ClientConfig) -> Result<Self, SeeError> {
        ClientBuilder::from_config(config).build()
    }

    /// Client configured from `SEE_*` environment variables.
    pub fn from_env() -> Result<Self, SeeError> {
        Self::from_config(ClientConfig::from_env()?)
    }

    fn assemble(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let api = SeeApi::new(&config.base_url, &config.api_key, &config.user_agent);
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                transport: RwLock::new(Some(transport)),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The stateless request builder this client sends through.
    pub fn api(&self) -> &SeeApi {
        &self.inner.api
    }

    /// Release the connection pool. Affects every clone; cannot be undone.
    pub fn close(&self) {
        if self.inner.transport.write().take().is_some() {
            debug!("client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.transport.read().is_none()
    }

    // -----------------------------------------------------------------------
    // Short URLs
    // -----------------------------------------------------------------------

    #[instrument(skip_all, fields(domain = %request.domain))]
    pub async fn create_short_url(
        &self,
        request: &CreateShortUrlRequest,
    ) -> Result<CreateShortUrlResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_create_short_url(request)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all, fields(domain = %request.domain, slug = %request.slug))]
    pub async fn update_short_url(
        &self,
        request: &UpdateShortUrlRequest,
    ) -> Result<UpdateShortUrlResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_update_short_url(request)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all, fields(domain = %request.domain, slug = %request.slug))]
    pub async fn delete_short_url(
        &self,
        request: &DeleteShortUrlRequest,
    ) -> Result<DeleteShortUrlResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_delete_short_url(request)?;
        self.execute(transport, http).await
    }

    /// Domains available for short URLs.
    #[instrument(skip_all)]
    pub async fn get_domains(&self) -> Result<DomainResponse, SeeError> {
        let transport = self.transport()?;
        self.execute(transport, self.inner.api.build_get_domains()).await
    }

    #[instrument(skip_all)]
    pub async fn get_tags(&self) -> Result<TagResponse, SeeError> {
        let transport = self.transport()?;
        self.execute(transport, self.inner.api.build_get_tags()).await
    }

    // -----------------------------------------------------------------------
    // Text sharing
    // -----------------------------------------------------------------------

    #[instrument(skip_all)]
    pub async fn create_text(&self, request: &CreateTextRequest) -> Result<CreateTextResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_create_text(request)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all, fields(domain = %request.domain, slug = %request.slug))]
    pub async fn update_text(&self, request: &UpdateTextRequest) -> Result<UpdateTextResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_update_text(request)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all, fields(domain = %request.domain, slug = %request.slug))]
    pub async fn delete_text(&self, request: &DeleteTextRequest) -> Result<DeleteTextResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_delete_text(request)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all)]
    pub async fn get_text_domains(&self) -> Result<DomainResponse, SeeError> {
        let transport = self.transport()?;
        self.execute(transport, self.inner.api.build_get_text_domains()).await
    }

    // -----------------------------------------------------------------------
    // File sharing
    // -----------------------------------------------------------------------

    /// Upload the file at `path`, using its file name for the form part.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadFileResponse, SeeError> {
        let path = path.as_ref();
        let transport = self.transport()?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SeeError::validation(format!("{} has no usable file name", path.display())))?;
        let bytes = tokio::fs::read(path).await.map_err(|source| SeeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let http = self.inner.api.build_upload_file(file_name, bytes)?;
        self.execute(transport, http).await
    }

    /// Upload in-memory content as `file_name`.
    #[instrument(skip_all, fields(file_name = %file_name, bytes = bytes.len()))]
    pub async fn upload_file_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadFileResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_upload_file(file_name, bytes)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all, fields(hash = %hash))]
    pub async fn delete_file(&self, hash: &str) -> Result<DeleteFileResponse, SeeError> {
        let transport = self.transport()?;
        let http = self.inner.api.build_delete_file(hash)?;
        self.execute(transport, http).await
    }

    #[instrument(skip_all)]
    pub async fn get_file_domains(&self) -> Result<DomainResponse, SeeError> {
        let transport = self.transport()?;
        self.execute(transport, self.inner.api.build_get_file_domains()).await
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn transport(&self) -> Result<Arc<dyn Transport>, SeeError> {
        self.inner.transport.read().clone().ok_or(SeeError::Closed)
    }

    /// Send `request` until it succeeds or the retry policy gives up.
    ///
    /// Each attempt is bounded by the configured timeout. Dropping the
    /// returned future cancels the in-flight attempt.
    async fn execute<T: DeserializeOwned>(
        &self,
        transport: Arc<dyn Transport>,
        request: HttpRequest,
    ) -> Result<Envelope<T>, SeeError> {
        let policy = &self.inner.config.retry;
        let timeout = self.inner.config.timeout;
        let idempotent = request.method.is_idempotent();
        let mut attempt: u32 = 1;

        loop {
            debug!(attempt, method = %request.method, url = %request.url, "sending request");

            let result = match tokio::time::timeout(timeout, transport.send(request.clone())).await {
                Ok(Ok(response)) => {
                    debug!(attempt, status = response.status, "response received");
                    self.inner.api.parse(response)
                }
                Ok(Err(err)) => Err(err),
                Err(_elapsed) => Err(SeeError::timeout(timeout)),
            };

            let err = match result {
                Ok(envelope) => return Ok(envelope),
                Err(err) => err,
            };

            match policy.decide(attempt, idempotent, &err) {
                RetryDecision::Retry(delay) => {
                    warn!(attempt, ?delay, error = %err, "request failed; retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp => {
                    debug!(attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::NetworkErrorKind;
    use crate::http::{HttpMethod, HttpResponse};
    use crate::retry::RetryPolicy;

    enum Step {
        Respond {
            status: u16,
            headers: Vec<(String, String)>,
            body: String,
        },
        Refuse,
        Hang,
    }

    fn respond(status: u16, body: &str) -> Step {
        Step::Respond {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Plays back a fixed sequence of outcomes and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicUsize,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into_iter().collect()),
                ..Self::default()
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SeeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().push(request);
            let step = self.steps.lock().pop_front();
            match step {
                Some(Step::Respond { status, headers, body }) => Ok(HttpResponse { status, headers, body }),
                Some(Step::Refuse) => Err(SeeError::network(NetworkErrorKind::Connect, "connection refused", None)),
                Some(Step::Hang) => std::future::pending().await,
                None => Err(SeeError::network(NetworkErrorKind::Other, "script exhausted", None)),
            }
        }
    }

    const DOMAINS: &str = r#"{"code":200,"message":"Success","data":{"domains":["s.ee"]}}"#;

    fn client(transport: &Arc<ScriptedTransport>, retry: RetryPolicy) -> SeeClient {
        SeeClient::builder("test-key")
            .base_url("https://api.test")
            .timeout(Duration::from_secs(2))
            .retry_policy(retry.with_jitter(0.0).with_base_delay(Duration::from_millis(10)))
            .build_with_transport(transport.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn create_short_url_returns_slug() {
        let transport = ScriptedTransport::new([respond(200, r#"{"code":0,"message":"ok","data":{"slug":"abc123"}}"#)]);
        let client = client(&transport, RetryPolicy::default());

        let request = CreateShortUrlRequest::new("s.ee", "https://example.com/x").unwrap().with_title("t");
        let response = client.create_short_url(&request).await.unwrap();

        assert_eq!(response.data.slug, "abc123");
        assert_eq!(response.message, "ok");
        assert_eq!(transport.calls(), 1);

        let sent = transport.sent.lock();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "https://api.test/v1/shorten");
        assert_eq!(sent[0].header("authorization"), Some("test-key"));
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_transport() {
        let transport = ScriptedTransport::new([]);
        let client = client(&transport, RetryPolicy::default());

        let bad_domain = CreateShortUrlRequest {
            domain: String::new(),
            ..CreateShortUrlRequest::new("s.ee", "https://example.com").unwrap()
        };
        let bad_url = CreateShortUrlRequest {
            target_url: "example.com".to_string(),
            ..CreateShortUrlRequest::new("s.ee", "https://example.com").unwrap()
        };

        for request in [bad_domain, bad_url] {
            let err = client.create_short_url(&request).await.unwrap_err();
            assert!(matches!(err, SeeError::Validation { status: None, .. }));
        }
        assert!(client.delete_file("../x").await.is_err());
        assert!(client.upload_file_bytes("", b"x".to_vec()).await.is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn empty_api_key_fails_without_network() {
        let transport = ScriptedTransport::new([]);
        let err = SeeClient::builder("").build_with_transport(transport.clone()).unwrap_err();
        assert!(matches!(err, SeeError::Validation { .. }));
        assert_eq!(err.to_string(), "API key is required");
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let cases: [(u16, &str, fn(&SeeError) -> bool); 8] = [
            (401, "", |e| matches!(e, SeeError::Authentication { .. })),
            (403, "", |e| matches!(e, SeeError::Authentication { .. })),
            (404, "", |e| matches!(e, SeeError::NotFound { .. })),
            (429, "", |e| matches!(e, SeeError::RateLimited { .. })),
            (400, r#"{"message":"bad slug"}"#, |e| matches!(e, SeeError::Validation { .. })),
            (409, r#"{"message":"taken"}"#, |e| matches!(e, SeeError::Api { .. })),
            (500, "", |e| matches!(e, SeeError::Api { .. })),
            (503, "", |e| matches!(e, SeeError::Api { .. })),
        ];

        for (status, body, check) in cases {
            let transport = ScriptedTransport::new([respond(status, body)]);
            let err = client(&transport, RetryPolicy::none()).get_domains().await.unwrap_err();
            assert!(check(&err), "HTTP {status} mapped to {err:?}");
            assert_eq!(err.status(), Some(status));
            assert_eq!(transport.calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_server_errors_until_success() {
        let transport = ScriptedTransport::new([respond(500, ""), respond(502, ""), respond(200, DOMAINS)]);
        let response = client(&transport, RetryPolicy::default().with_max_attempts(3))
            .get_domains()
            .await
            .unwrap();
        assert_eq!(response.data.domains, vec!["s.ee"]);
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let transport = ScriptedTransport::new((0..5).map(|_| respond(500, "boom")));
        let err = client(&transport, RetryPolicy::default().with_max_attempts(3))
            .get_domains()
            .await
            .unwrap_err();
        assert!(matches!(err, SeeError::Api { status: Some(500), .. }));
        assert_eq!(err.body(), Some("boom"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn application_error_code_is_not_retried() {
        let transport = ScriptedTransport::new((0..3).map(|_| respond(200, r#"{"code":1001,"message":"quota exceeded"}"#)));
        let err = client(&transport, RetryPolicy::default().with_max_attempts(3))
            .get_domains()
            .await
            .unwrap_err();
        assert!(matches!(err, SeeError::Api { status: Some(200), code: Some(1001), .. }), "{err:?}");
        assert!(!err.is_transient());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_retry_after_gives_up_without_panicking() {
        for hint in ["1e30", "99999999999999999999", "600"] {
            let transport = ScriptedTransport::new([
                Step::Respond {
                    status: 429,
                    headers: vec![("Retry-After".to_string(), hint.to_string())],
                    body: String::new(),
                },
                respond(200, DOMAINS),
            ]);
            let err = client(&transport, RetryPolicy::default()).get_domains().await.unwrap_err();
            assert!(matches!(err, SeeError::RateLimited { .. }), "hint {hint}: {err:?}");
            assert_eq!(transport.calls(), 1, "hint {hint}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_is_not_retried_on_server_error() {
        let transport = ScriptedTransport::new([respond(500, ""), respond(200, DOMAINS)]);
        let request = CreateShortUrlRequest::new("s.ee", "https://example.com").unwrap();
        let err = client(&transport, RetryPolicy::default())
            .create_short_url(&request)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn create_is_retried_when_connection_refused() {
        let transport = ScriptedTransport::new([
            Step::Refuse,
            respond(200, r#"{"code":0,"message":"ok","data":{"slug":"abc"}}"#),
        ]);
        let request = CreateShortUrlRequest::new("s.ee", "https://example.com").unwrap();
        let response = client(&transport, RetryPolicy::default())
            .create_short_url(&request)
            .await
            .unwrap();
        assert_eq!(response.data.slug, "abc");
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_for_retry_after() {
        let transport = ScriptedTransport::new([
            Step::Respond {
                status: 429,
                headers: vec![("Retry-After".to_string(), "5".to_string())],
                body: String::new(),
            },
            respond(200, DOMAINS),
        ]);
        let start = tokio::time::Instant::now();
        client(&transport, RetryPolicy::default()).get_domains().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_transport_times_out() {
        let transport = ScriptedTransport::new([Step::Hang]);
        let start = tokio::time::Instant::now();
        let err = client(&transport, RetryPolicy::none()).get_domains().await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(start.elapsed() <= Duration::from_secs(3));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn closed_client_rejects_calls() {
        let transport = ScriptedTransport::new([respond(200, DOMAINS)]);
        let client = client(&transport, RetryPolicy::default());
        let clone = client.clone();

        client.close();
        client.close();

        assert!(clone.is_closed());
        assert!(matches!(client.get_domains().await, Err(SeeError::Closed)));
        assert!(matches!(clone.get_tags().await, Err(SeeError::Closed)));
        let request = CreateShortUrlRequest::new("s.ee", "https://example.com").unwrap();
        assert!(matches!(clone.create_short_url(&request).await, Err(SeeError::Closed)));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_client() {
        let transport = ScriptedTransport::new((0..8).map(|_| respond(200, DOMAINS)));
        let client = client(&transport, RetryPolicy::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.get_domains().await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(transport.calls(), 8);
    }

    #[tokio::test]
    async fn upload_missing_file_is_io_error() {
        let transport = ScriptedTransport::new([]);
        let err = client(&transport, RetryPolicy::default())
            .upload_file("/definitely/not/here.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, SeeError::Io { .. }));
        assert_eq!(transport.calls(), 0);
    }
}
