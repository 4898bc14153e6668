//! API Ninjas client for `validatephone` and `worldtime`.

use std::fmt;

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::{
    check_http_response, parse_validation, parse_world_time, PhoneService, PhoneServiceError,
    PhoneValidation, WorldTime,
};

/// Default API Ninjas base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.api-ninjas.com/v1";

/// Header carrying the access key.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// HTTP client for the API Ninjas phone and time endpoints.
#[derive(Clone)]
pub struct NinjasClient {
    validate_url: Url,
    time_url: Url,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for NinjasClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NinjasClient")
            .field("validate_url", &self.validate_url.as_str())
            .field("time_url", &self.time_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl NinjasClient {
    /// Build a client against `base_url`. A blank `api_key` counts as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute http(s) URL.
    pub fn new(base_url: &str, api_key: Option<String>) -> anyhow::Result<Self> {
        let mut base =
            Url::parse(base_url).with_context(|| format!("invalid phone service url {base_url}"))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("phone service url must be http or https: {base_url}");
        }
        // Url::join replaces the last path segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let validate_url = base
            .join("validatephone")
            .context("failed to build validatephone url")?;
        let time_url = base
            .join("worldtime")
            .context("failed to build worldtime url")?;

        Ok(Self {
            validate_url,
            time_url,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client: reqwest::Client::new(),
        })
    }

    /// Full URL of the validation endpoint.
    pub fn validate_url(&self) -> &Url {
        &self.validate_url
    }

    /// Full URL of the time endpoint.
    pub fn time_url(&self) -> &Url {
        &self.time_url
    }

    fn api_key(&self) -> Result<&str, PhoneServiceError> {
        self.api_key
            .as_deref()
            .ok_or(PhoneServiceError::MissingCredential)
    }

    async fn get(&self, url: &Url, param: (&str, &str)) -> Result<String, PhoneServiceError> {
        let key = self.api_key()?;
        debug!(endpoint = url.path(), "phone service request");
        let response = self
            .client
            .get(url.clone())
            .query(&[param])
            .header(API_KEY_HEADER, key)
            .send()
            .await?;
        check_http_response(response).await
    }
}

#[async_trait]
impl PhoneService for NinjasClient {
    fn ensure_credential(&self) -> Result<(), PhoneServiceError> {
        self.api_key().map(|_| ())
    }

    async fn validate_phone(&self, number: &str) -> Result<PhoneValidation, PhoneServiceError> {
        let body = self.get(&self.validate_url, ("number", number)).await?;
        parse_validation(&body)
    }

    async fn lookup_time(&self, timezone: &str) -> Result<WorldTime, PhoneServiceError> {
        let body = self.get(&self.time_url, ("timezone", timezone)).await?;
        parse_world_time(&body)
    }
}
