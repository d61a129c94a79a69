//! Error types for the s.ee client.
//!
//! # Design
//! One enum covers every failure a call can produce. Pre-flight problems
//! (invalid input, closed client, unreadable upload file) never reach the
//! network. Post-flight problems are derived from the HTTP status, the
//! response envelope, or the transport failure, and keep the raw status and
//! body for debugging. Transport errors are boxed into `Network::source`, so
//! no HTTP library type shows up in the public API.

use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::HttpResponse;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Which kind of transport failure produced a [`SeeError::Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The connection could not be established; the request never left.
    Connect,
    /// No response arrived within the configured timeout.
    Timeout,
    Other,
}

/// Errors returned by `SeeClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum SeeError {
    /// Input rejected locally, or a 400/422 response with a validation body.
    #[error("{message}")]
    Validation {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// HTTP 401/403 or an auth-failure envelope.
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// HTTP 404 or a not-found envelope.
    #[error("not found: {message}")]
    NotFound {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// HTTP 429. `retry_after` carries the server hint when one was sent.
    #[error("rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        status: Option<u16>,
        body: Option<String>,
        retry_after: Option<Duration>,
    },

    /// Any other non-2xx status, or a malformed / failed envelope.
    ///
    /// `code` holds an envelope code outside the HTTP status range.
    #[error("API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        message: String,
        status: Option<u16>,
        code: Option<i64>,
        body: Option<String>,
    },

    /// The request could not be delivered or no response arrived in time.
    #[error("network error: {message}")]
    Network {
        message: String,
        kind: NetworkErrorKind,
        #[source]
        source: Option<BoxError>,
    },

    /// The client was closed before this call.
    #[error("client is closed")]
    Closed,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SeeError {
    pub fn validation(message: impl Into<String>) -> Self {
        SeeError::Validation {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn api(message: impl Into<String>) -> Self {
        SeeError::Api {
            message: message.into(),
            status: None,
            code: None,
            body: None,
        }
    }

    pub fn network(
        kind: NetworkErrorKind,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        SeeError::Network {
            message: message.into(),
            kind,
            source,
        }
    }

    pub fn timeout(after: Duration) -> Self {
        SeeError::network(
            NetworkErrorKind::Timeout,
            format!("request timed out after {after:?}"),
            None,
        )
    }

    /// Map a non-2xx response to the matching variant.
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        let body = (!response.body.is_empty()).then(|| response.body.clone());
        let detail = body_message(&response.body);
        let message = detail
            .clone()
            .unwrap_or_else(|| format!("request failed with HTTP {status}"));

        match status {
            401 | 403 => SeeError::Authentication {
                message,
                status: Some(status),
                body,
            },
            404 => SeeError::NotFound {
                message,
                status: Some(status),
                body,
            },
            429 => SeeError::RateLimited {
                message,
                status: Some(status),
                body,
                retry_after: response.header("retry-after").and_then(parse_retry_after),
            },
            400 | 422 if is_json_object(&response.body) => SeeError::Validation {
                message,
                status: Some(status),
                body,
            },
            _ => SeeError::Api {
                message,
                status: Some(status),
                code: None,
                body,
            },
        }
    }

    /// Map an application-level failure reported inside a 2xx envelope.
    ///
    /// Numeric codes in the HTTP range are classified like HTTP statuses;
    /// anything else becomes `Api` with the HTTP status and the raw code.
    pub fn from_envelope(code: Option<i64>, message: String, response: &HttpResponse) -> Self {
        let body = Some(response.body.clone());
        let status = code
            .filter(|c| (100..=599).contains(c))
            .and_then(|c| u16::try_from(c).ok());
        match status {
            Some(401 | 403) => SeeError::Authentication { message, status, body },
            Some(404) => SeeError::NotFound { message, status, body },
            Some(429) => SeeError::RateLimited {
                message,
                status,
                body,
                retry_after: response.header("retry-after").and_then(parse_retry_after),
            },
            Some(400 | 422) => SeeError::Validation { message, status, body },
            Some(_) => SeeError::Api {
                message,
                status,
                code: None,
                body,
            },
            None => SeeError::Api {
                message,
                status: Some(response.status),
                code,
                body,
            },
        }
    }

    /// Envelope code that did not map to an HTTP status.
    pub fn code(&self) -> Option<i64> {
        match self {
            SeeError::Api { code, .. } => *code,
            _ => None,
        }
    }

    /// HTTP status (or HTTP-like envelope code) behind this error.
    pub fn status(&self) -> Option<u16> {
        match self {
            SeeError::Validation { status, .. }
            | SeeError::Authentication { status, .. }
            | SeeError::NotFound { status, .. }
            | SeeError::RateLimited { status, .. }
            | SeeError::Api { status, .. } => *status,
            SeeError::Network { .. } | SeeError::Closed | SeeError::Io { .. } => None,
        }
    }

    /// Raw response body, when the error came from a response.
    pub fn body(&self) -> Option<&str> {
        match self {
            SeeError::Validation { body, .. }
            | SeeError::Authentication { body, .. }
            | SeeError::NotFound { body, .. }
            | SeeError::RateLimited { body, .. }
            | SeeError::Api { body, .. } => body.as_deref(),
            SeeError::Network { .. } | SeeError::Closed | SeeError::Io { .. } => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SeeError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SeeError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        )
    }

    /// Network failures and 5xx responses.
    pub fn is_transient(&self) -> bool {
        match self {
            SeeError::Network { .. } => true,
            SeeError::Api {
                status: Some(status),
                ..
            } => (500..=599).contains(status),
            _ => false,
        }
    }
}

/// Parse a `Retry-After` value given in delta-seconds.
///
/// HTTP-date values are not used by the service and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

fn is_json_object(body: &str) -> bool {
    matches!(
        serde_json::from_str::<serde_json::Value>(body),
        Ok(serde_json::Value::Object(_))
    )
}

/// Pull a human-readable message out of an error body.
fn body_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|msg| !msg.is_empty())
        .map(str::to_string)
}
