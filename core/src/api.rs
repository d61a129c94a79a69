//! Stateless HTTP request builder and response parser for the s.ee API.
//!
//! # Design
//! `SeeApi` holds only the base URL and the header values every request
//! carries. Each endpoint has a `build_*` method that validates its input and
//! produces an `HttpRequest`. A single generic `parse` consumes an
//! `HttpResponse` and yields either a typed `Envelope<T>` or the matching
//! `SeeError`. No I/O happens here; `SeeClient` runs the round-trip.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::SeeError;
use crate::http::{Body, FilePart, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    check, CreateShortUrlRequest, CreateTextRequest, DeleteShortUrlRequest, DeleteTextRequest,
    Envelope, EnvelopeCode, UpdateShortUrlRequest, UpdateTextRequest,
};

pub const SHORTEN_PATH: &str = "/v1/shorten";
pub const DOMAINS_PATH: &str = "/v1/domains";
pub const TAGS_PATH: &str = "/v1/tags";
pub const TEXT_PATH: &str = "/v1/text";
pub const TEXT_DOMAINS_PATH: &str = "/v1/text/domains";
pub const FILE_UPLOAD_PATH: &str = "/v1/file/upload";
pub const FILE_DELETE_PATH: &str = "/v1/file/delete";
pub const FILE_DOMAINS_PATH: &str = "/v1/file/domains";

/// Form field the upload endpoint reads the file from.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Clone)]
pub struct SeeApi {
    base_url: String,
    api_key: String,
    user_agent: String,
}

impl std::fmt::Debug for SeeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeeApi")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl SeeApi {
    pub fn new(base_url: &str, api_key: &str, user_agent: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            user_agent: user_agent.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -- short URLs --------------------------------------------------------

    pub fn build_create_short_url(&self, input: &CreateShortUrlRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Post, SHORTEN_PATH, input)
    }

    pub fn build_update_short_url(&self, input: &UpdateShortUrlRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Put, SHORTEN_PATH, input)
    }

    pub fn build_delete_short_url(&self, input: &DeleteShortUrlRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Delete, SHORTEN_PATH, input)
    }

    pub fn build_get_domains(&self) -> HttpRequest {
        self.request(HttpMethod::Get, DOMAINS_PATH, None)
    }

    pub fn build_get_tags(&self) -> HttpRequest {
        self.request(HttpMethod::Get, TAGS_PATH, None)
    }

    // -- text sharing ------------------------------------------------------

    pub fn build_create_text(&self, input: &CreateTextRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Post, TEXT_PATH, input)
    }

    pub fn build_update_text(&self, input: &UpdateTextRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Put, TEXT_PATH, input)
    }

    pub fn build_delete_text(&self, input: &DeleteTextRequest) -> Result<HttpRequest, SeeError> {
        self.json_request(HttpMethod::Delete, TEXT_PATH, input)
    }

    pub fn build_get_text_domains(&self) -> HttpRequest {
        self.request(HttpMethod::Get, TEXT_DOMAINS_PATH, None)
    }

    // -- file sharing ------------------------------------------------------

    pub fn build_upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<HttpRequest, SeeError> {
        if file_name.trim().is_empty() {
            return Err(SeeError::validation("File name is required"));
        }
        let part = FilePart {
            field: UPLOAD_FIELD.to_string(),
            file_name: file_name.to_string(),
            bytes,
        };
        Ok(self.request(HttpMethod::Post, FILE_UPLOAD_PATH, Some(Body::Multipart(part))))
    }

    pub fn build_delete_file(&self, hash: &str) -> Result<HttpRequest, SeeError> {
        if hash.is_empty() {
            return Err(SeeError::validation("File hash is required"));
        }
        if !hash.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(SeeError::validation(format!("Invalid file hash {hash:?}")));
        }
        let path = format!("{FILE_DELETE_PATH}/{hash}");
        Ok(self.request(HttpMethod::Get, &path, None))
    }

    pub fn build_get_file_domains(&self) -> HttpRequest {
        self.request(HttpMethod::Get, FILE_DOMAINS_PATH, None)
    }

    // -- responses ---------------------------------------------------------

    /// Map a response to its envelope, or to the error it represents.
    ///
    /// A 2xx response can still fail: the envelope's own code, or a
    /// `"success": false` flag, takes precedence over the HTTP status.
    pub fn parse<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<Envelope<T>, SeeError> {
        if !response.is_success() {
            return Err(SeeError::from_response(&response));
        }

        let raw: RawEnvelope = serde_json::from_str(&response.body)
            .map_err(|e| malformed(&response, format!("malformed response envelope: {e}")))?;

        let code = match (raw.code, raw.success) {
            (Some(code), _) => code,
            (None, Some(true)) => EnvelopeCode::default(),
            (None, _) => return Err(malformed(&response, "response envelope has no code".to_string())),
        };

        if raw.success == Some(false) || !code.is_success() {
            let message = if raw.message.is_empty() {
                format!("request failed with code {code}")
            } else {
                raw.message
            };
            return Err(SeeError::from_envelope(code.as_i64(), message, &response));
        }

        let data = serde_json::from_value(raw.data)
            .map_err(|e| malformed(&response, format!("unexpected response data: {e}")))?;

        Ok(Envelope {
            code,
            message: raw.message,
            data,
        })
    }

    // -- helpers -----------------------------------------------------------

    fn json_request<T>(&self, method: HttpMethod, path: &str, input: &T) -> Result<HttpRequest, SeeError>
    where
        T: Serialize + Validate,
    {
        check(input)?;
        let body = serde_json::to_string(input)
            .map_err(|e| SeeError::api(format!("request could not be encoded: {e}")))?;
        Ok(self.request(method, path, Some(Body::Json(body))))
    }

    fn request(&self, method: HttpMethod, path: &str, body: Option<Body>) -> HttpRequest {
        let mut headers = vec![
            ("authorization".to_string(), self.api_key.clone()),
            ("accept".to_string(), "application/json".to_string()),
            ("user-agent".to_string(), self.user_agent.clone()),
        ];
        if matches!(body, Some(Body::Json(_))) {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers,
            body,
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    code: Option<EnvelopeCode>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    success: Option<bool>,
}

fn malformed(response: &HttpResponse, message: String) -> SeeError {
    SeeError::Api {
        message,
        status: Some(response.status),
        code: None,
        body: Some(response.body.clone()),
    }
}
