//! Async client for the s.ee URL shortener, text sharing and file sharing API.
//!
//! # Overview
//! `SeeClient` exposes one async method per API operation. Each call checks
//! the client is open, validates its input locally, sends the request with a
//! per-attempt timeout, retries according to the configured `RetryPolicy`,
//! and decodes the `{code, message, data}` response envelope.
//!
//! # Design
//! - `SeeApi` builds `HttpRequest` values and parses `HttpResponse` values
//!   without touching the network (host-does-IO pattern). `Transport` is the
//!   only I/O seam; `ReqwestTransport` is the default implementation.
//! - Every failure is a `SeeError`. Callers match on the variant instead of
//!   inspecting status codes.
//! - Request and response types are plain serde structs. Optional fields are
//!   omitted from the wire when unset.
//!
//! ```no_run
//! # async fn demo() -> Result<(), see_core::SeeError> {
//! use see_core::{CreateShortUrlRequest, SeeClient};
//!
//! let client = SeeClient::new("your-api-key")?;
//! let request = CreateShortUrlRequest::new("s.ee", "https://example.com")?;
//! let created = client.create_short_url(&request).await?;
//! println!("https://s.ee/{}", created.data.slug);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod retry;
pub mod transport;
pub mod types;

pub use api::SeeApi;
pub use client::SeeClient;
pub use config::{ClientBuilder, ClientConfig};
pub use error::{NetworkErrorKind, SeeError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use retry::{RateLimitRetry, RetryDecision, RetryPolicy};
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    CreateShortUrlRequest, CreateShortUrlResponse, CreateTextRequest, CreateTextResponse,
    DeleteFileResponse, DeleteShortUrlRequest, DeleteShortUrlResponse, DeleteTextRequest,
    DeleteTextResponse, DomainList, DomainResponse, Envelope, EnvelopeCode, ShortUrl, SharedText,
    Tag, TagList, TagResponse, UpdateShortUrlRequest, UpdateShortUrlResponse, UpdateTextRequest,
    UpdateTextResponse, UploadFileResponse, UploadedFile,
};
