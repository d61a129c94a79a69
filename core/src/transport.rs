//! Network execution of `HttpRequest` values.
//!
//! `Transport` is the only place I/O happens. `ReqwestTransport` owns a
//! reqwest connection pool; dropping it releases the pool. Tests substitute
//! their own implementation to script responses and count invocations.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::error::{NetworkErrorKind, SeeError};
use crate::http::{Body, HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Implementations report transport failures as `SeeError::Network` and
/// return every HTTP response, including 4xx/5xx, as `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SeeError>;
}

/// `Transport` backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, SeeError> {
        let mut builder = ReqwestClient::builder().timeout(timeout).connect_timeout(timeout);

        builder = match proxy {
            Some(url) => {
                let proxy = reqwest::Proxy::all(url)
                    .map_err(|e| SeeError::validation(format!("Invalid proxy URL {url:?}: {e}")))?;
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| SeeError::api(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(client: ReqwestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, SeeError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| SeeError::validation(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| SeeError::validation(format!("invalid value for header {}", name.as_str())))?;
            builder = builder.header(name, value);
        }
        builder = match request.body {
            Some(Body::Json(json)) => builder.body(json),
            Some(Body::Multipart(part)) => {
                let file = Part::bytes(part.bytes).file_name(part.file_name);
                builder.multipart(Form::new().part(part.field, file))
            }
            None => builder,
        };

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(network_error)?;
        debug!(status, bytes = body.len(), "received HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn network_error(err: reqwest::Error) -> SeeError {
    let kind = if err.is_timeout() {
        NetworkErrorKind::Timeout
    } else if err.is_connect() {
        NetworkErrorKind::Connect
    } else {
        NetworkErrorKind::Other
    };
    SeeError::network(kind, err.to_string(), Some(Box::new(err)))
}
