//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. `SeeApi`
//! builds `HttpRequest` values and parses `HttpResponse` values without ever
//! touching the network; a `Transport` executes the actual I/O. Keeping the
//! boundary as data lets the endpoint layer be tested against JSON vectors
//! and lets tests swap the network for a scripted transport.
//!
//! All fields use owned types (`String`, `Vec`) so requests can be cloned for
//! retries without lifetime concerns.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether repeating the request cannot create a second side effect.
    pub fn is_idempotent(self) -> bool {
        !matches!(self, HttpMethod::Post)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file sent as one multipart form field.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Serialized JSON; the matching `content-type` header is set by the builder.
    Json(String),
    /// multipart/form-data with a single file field.
    Multipart(FilePart),
}

impl Body {
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Body::Json(json) => Some(json),
            Body::Multipart(_) => None,
        }
    }
}

/// An HTTP request described as plain data.
///
/// Built by `SeeApi::build_*` methods and executed by a `Transport`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
///
/// Produced by a `Transport`, then passed to `SeeApi::parse` for mapping to
/// an envelope or an error.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_post_is_non_idempotent() {
        assert!(HttpMethod::Get.is_idempotent());
        assert!(HttpMethod::Put.is_idempotent());
        assert!(HttpMethod::Delete.is_idempotent());
        assert!(!HttpMethod::Post.is_idempotent());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = HttpResponse {
            status: 429,
            headers: vec![("Retry-After".to_string(), "7".to_string())],
            body: String::new(),
        };
        assert_eq!(response.header("retry-after"), Some("7"));
        assert_eq!(response.header("x-missing"), None);
    }

    #[test]
    fn file_part_debug_hides_bytes() {
        let part = FilePart {
            field: "file".to_string(),
            file_name: "a.txt".to_string(),
            bytes: vec![1, 2, 3],
        };
        let rendered = format!("{part:?}");
        assert!(rendered.contains("len: 3"));
        assert!(!rendered.contains("[1, 2, 3]"));
    }
}
