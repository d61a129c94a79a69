//! Request and response models for the s.ee API.
//!
//! # Design
//! Request records are plain structs with public fields, so callers can use
//! struct literals. The `new` constructors validate eagerly, and the client
//! validates again before sending, so an invalid record never reaches the
//! network. Absent optional fields are `None` and are left out of the JSON.
//! Update requests use `Option<Option<T>>`: `None` leaves the field alone,
//! `Some(None)` sends `null` to clear it, and `Some(Some(v))` sets it.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::SeeError;

// ---------------------------------------------------------------------------
// Short URLs
// ---------------------------------------------------------------------------

/// Request payload for `POST /v1/shorten`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreateShortUrlRequest {
    #[validate(length(min = 1, message = "Domain is required"))]
    pub domain: String,
    #[validate(custom(function = "validate_http_url", message = "Invalid URL: must start with http:// or https://"))]
    pub target_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Unix timestamp in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_http_url", message = "Invalid URL: must start with http:// or https://"))]
    pub expiration_redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<u64>>,
}

impl CreateShortUrlRequest {
    pub fn new(domain: impl Into<String>, target_url: impl Into<String>) -> Result<Self, SeeError> {
        let request = Self {
            domain: domain.into(),
            target_url: target_url.into(),
            custom_slug: None,
            title: None,
            password: None,
            expire_at: None,
            expiration_redirect_url: None,
            tag_ids: None,
        };
        check(&request)?;
        Ok(request)
    }

    pub fn with_custom_slug(mut self, slug: impl Into<String>) -> Self {
        self.custom_slug = Some(slug.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_expire_at(mut self, unix_secs: i64) -> Self {
        self.expire_at = Some(unix_secs);
        self
    }

    pub fn with_expiration_redirect_url(mut self, url: impl Into<String>) -> Self {
        self.expiration_redirect_url = Some(url.into());
        self
    }

    pub fn with_tag_ids(mut self, tag_ids: impl IntoIterator<Item = u64>) -> Self {
        self.tag_ids = Some(tag_ids.into_iter().collect());
        self
    }
}

/// Request payload for `PUT /v1/shorten`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UpdateShortUrlRequest {
    #[validate(length(min = 1, message = "Domain is required"))]
    pub domain: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
    #[validate(custom(function = "validate_http_url", message = "Invalid URL: must start with http:// or https://"))]
    pub target_url: String,
    /// Absent = unchanged, `Some(None)` = clear, `Some(Some(_))` = set.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub title: Option<Option<String>>,
}

impl UpdateShortUrlRequest {
    pub fn new(
        domain: impl Into<String>,
        slug: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Result<Self, SeeError> {
        let request = Self {
            domain: domain.into(),
            slug: slug.into(),
            target_url: target_url.into(),
            title: None,
        };
        check(&request)?;
        Ok(request)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    pub fn clear_title(mut self) -> Self {
        self.title = Some(None);
        self
    }
}

/// Request payload for `DELETE /v1/shorten`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DeleteShortUrlRequest {
    #[validate(length(min = 1, message = "Domain is required"))]
    pub domain: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
}

impl DeleteShortUrlRequest {
    pub fn new(domain: impl Into<String>, slug: impl Into<String>) -> Result<Self, SeeError> {
        let request = Self {
            domain: domain.into(),
            slug: slug.into(),
        };
        check(&request)?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Text sharing
// ---------------------------------------------------------------------------

/// Request payload for `POST /v1/text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreateTextRequest {
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<i64>,
}

impl CreateTextRequest {
    pub fn new(content: impl Into<String>) -> Result<Self, SeeError> {
        let request = Self {
            content: content.into(),
            title: None,
            domain: None,
            custom_slug: None,
            password: None,
            expire_at: None,
        };
        check(&request)?;
        Ok(request)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_custom_slug(mut self, slug: impl Into<String>) -> Self {
        self.custom_slug = Some(slug.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_expire_at(mut self, unix_secs: i64) -> Self {
        self.expire_at = Some(unix_secs);
        self
    }
}

/// Request payload for `PUT /v1/text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UpdateTextRequest {
    #[validate(length(min = 1, message = "Domain is required"))]
    pub domain: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
    #[validate(length(min = 1, message = "Content is required"))]
    pub content: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub title: Option<Option<String>>,
}

impl UpdateTextRequest {
    pub fn new(
        domain: impl Into<String>,
        slug: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Self, SeeError> {
        let request = Self {
            domain: domain.into(),
            slug: slug.into(),
            content: content.into(),
            title: None,
        };
        check(&request)?;
        Ok(request)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(Some(title.into()));
        self
    }

    pub fn clear_title(mut self) -> Self {
        self.title = Some(None);
        self
    }
}

/// Request payload for `DELETE /v1/text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct DeleteTextRequest {
    #[validate(length(min = 1, message = "Domain is required"))]
    pub domain: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
}

impl DeleteTextRequest {
    pub fn new(domain: impl Into<String>, slug: impl Into<String>) -> Result<Self, SeeError> {
        let request = Self {
            domain: domain.into(),
            slug: slug.into(),
        };
        check(&request)?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Status code embedded in a response envelope.
///
/// The service answers with `0`, `200` or `"success"` depending on the
/// endpoint, so both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeCode {
    Numeric(i64),
    Text(String),
}

impl EnvelopeCode {
    pub fn is_success(&self) -> bool {
        match self {
            EnvelopeCode::Numeric(code) => matches!(code, 0 | 200 | 201),
            EnvelopeCode::Text(text) => {
                let text = text.trim();
                ["0", "200", "201", "ok", "success"]
                    .iter()
                    .any(|ok| text.eq_ignore_ascii_case(ok))
            }
        }
    }

    /// Numeric value, parsing textual codes when they are numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EnvelopeCode::Numeric(code) => Some(*code),
            EnvelopeCode::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl Default for EnvelopeCode {
    fn default() -> Self {
        EnvelopeCode::Numeric(0)
    }
}

impl fmt::Display for EnvelopeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvelopeCode::Numeric(code) => write!(f, "{code}"),
            EnvelopeCode::Text(text) => f.write_str(text),
        }
    }
}

/// Response wrapper shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: EnvelopeCode,
    pub message: String,
    pub data: T,
}

/// A created short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub slug: String,
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub custom_slug: Option<String>,
}

/// A created text share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedText {
    pub slug: String,
    #[serde(default)]
    pub short_url: Option<String>,
    #[serde(default)]
    pub custom_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainList {
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    pub tags: Vec<Tag>,
}

/// An uploaded file as reported by `POST /v1/file/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: u64,
    pub filename: String,
    pub hash: String,
    pub url: String,
    #[serde(default, rename = "delete")]
    pub delete_url: Option<String>,
    #[serde(default, rename = "page")]
    pub page_url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub size: Option<u64>,
}

pub type CreateShortUrlResponse = Envelope<ShortUrl>;
pub type UpdateShortUrlResponse = Envelope<serde_json::Value>;
pub type DeleteShortUrlResponse = Envelope<serde_json::Value>;
pub type CreateTextResponse = Envelope<SharedText>;
pub type UpdateTextResponse = Envelope<serde_json::Value>;
pub type DeleteTextResponse = Envelope<serde_json::Value>;
pub type UploadFileResponse = Envelope<UploadedFile>;
pub type DeleteFileResponse = Envelope<serde_json::Value>;
pub type DomainResponse = Envelope<DomainList>;
pub type TagResponse = Envelope<TagList>;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Run the derived rules and report the first failure as `SeeError::Validation`.
///
/// Fields are visited in name order so the reported message is stable.
pub(crate) fn check<T: Validate>(value: &T) -> Result<(), SeeError> {
    let Err(errors) = value.validate() else {
        return Ok(());
    };
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    let message = fields
        .into_iter()
        .find_map(|(field, errs)| {
            errs.first().map(|err| {
                err.message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .unwrap_or_else(|| errors.to_string());
    Err(SeeError::validation(message))
}

fn validate_http_url(value: &str) -> Result<(), validator::ValidationError> {
    let valid = url::Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(validator::ValidationError::new("http_url"))
    }
}
