//! External phone validation and world-time lookup.
//!
//! Defines the [`PhoneService`] trait the contact engine is built against and
//! the wire types shared by implementations. The only production
//! implementation is [`ninjas::NinjasClient`].

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

pub mod ninjas;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// Result of validating a phone number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhoneValidation {
    /// Whether the service considers the number valid.
    #[serde(default)]
    pub is_valid: bool,
    /// Country the number belongs to.
    #[serde(default)]
    pub country: String,
    /// Timezones covering the number's region, most specific first.
    #[serde(default)]
    pub timezones: Vec<String>,
}

impl PhoneValidation {
    /// The first listed timezone, if any.
    pub fn primary_timezone(&self) -> Option<&str> {
        self.timezones.first().map(String::as_str)
    }
}

/// Current local time in a timezone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldTime {
    /// Local date-time as formatted by the service.
    pub datetime: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by a phone service.
#[derive(Debug, thiserror::Error)]
pub enum PhoneServiceError {
    /// No access key was configured for the client.
    #[error("phone service access key is not configured")]
    MissingCredential,
    /// The service answered with a non-2xx status.
    #[error("phone service returned non-success status {status}")]
    ServiceUnavailable {
        /// HTTP status code.
        status: u16,
    },
    /// HTTP transport failure.
    #[error("phone service request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// A 2xx body did not match the expected shape.
    #[error("phone service response parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Remote phone validation and time lookup.
#[async_trait]
pub trait PhoneService: Send + Sync {
    /// Succeeds only if the client holds an access key.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneServiceError::MissingCredential`] when no key is set.
    fn ensure_credential(&self) -> Result<(), PhoneServiceError>;

    /// Validate `number` and return its country and timezones.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneServiceError`] on missing key, transport failure,
    /// non-2xx status or an unparseable body.
    async fn validate_phone(&self, number: &str) -> Result<PhoneValidation, PhoneServiceError>;

    /// Current local time in `timezone`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PhoneService::validate_phone`].
    async fn lookup_time(&self, timezone: &str) -> Result<WorldTime, PhoneServiceError>;
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return the body text.
///
/// A non-2xx status is a single undifferentiated failure; the body is only
/// logged, truncated.
///
/// # Errors
///
/// Returns `PhoneServiceError::Request` on transport failure,
/// `PhoneServiceError::ServiceUnavailable` on non-2xx.
pub async fn check_http_response(
    response: reqwest::Response,
) -> Result<String, PhoneServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        debug!(status = status.as_u16(), body = %truncate_body(&body), "phone service error response");
        return Err(PhoneServiceError::ServiceUnavailable {
            status: status.as_u16(),
        });
    }
    Ok(body)
}

fn truncate_body(raw: &str) -> String {
    const MAX_ERROR_BODY_CHARS: usize = 256;
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = collapsed
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }
    collapsed
}

/// Parse a `validatephone` response body.
///
/// # Errors
///
/// Returns `PhoneServiceError::Parse` if the body is not the expected JSON.
#[doc(hidden)]
pub fn parse_validation(body: &str) -> Result<PhoneValidation, PhoneServiceError> {
    serde_json::from_str(body).map_err(|e| PhoneServiceError::Parse(e.to_string()))
}

/// Parse a `worldtime` response body.
///
/// # Errors
///
/// Returns `PhoneServiceError::Parse` if the body lacks `datetime`.
#[doc(hidden)]
pub fn parse_world_time(body: &str) -> Result<WorldTime, PhoneServiceError> {
    serde_json::from_str(body).map_err(|e| PhoneServiceError::Parse(e.to_string()))
}
