//! Client configuration.
//!
//! All settings are fixed when the client is built. `ClientConfig::from_env`
//! is a convenience for applications that keep the key in the environment:
//!
//! - `SEE_API_KEY` - API key (required)
//! - `SEE_BASE_URL` - API root (default: `https://s.ee/api`)
//! - `SEE_TIMEOUT_SECS` - per-attempt timeout in seconds (default: 30)
//! - `SEE_MAX_RETRIES` - total attempts per call (default: 3)
//! - `SEE_PROXY` - proxy URL for all requests (optional)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::SeeError;
use crate::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://s.ee/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_USER_AGENT: &str = concat!("see-rust-sdk/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default().with_max_attempts(DEFAULT_MAX_RETRIES),
        }
    }

    /// Load settings from `SEE_*` environment variables.
    pub fn from_env() -> Result<Self, SeeError> {
        let api_key = env::var("SEE_API_KEY").unwrap_or_default();
        let mut config = Self::new(api_key);

        if let Some(base_url) = non_empty_var("SEE_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(secs) = parse_var::<u64>("SEE_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32>("SEE_MAX_RETRIES")? {
            config.retry = config.retry.with_max_attempts(retries);
        }
        config.proxy = non_empty_var("SEE_PROXY");

        config.validate()?;
        Ok(config)
    }

    /// Total attempts per call.
    pub fn max_retries(&self) -> u32 {
        self.retry.attempts()
    }

    pub fn validate(&self) -> Result<(), SeeError> {
        if self.api_key.trim().is_empty() {
            return Err(SeeError::validation("API key is required"));
        }
        let base = url::Url::parse(&self.base_url)
            .map_err(|e| SeeError::validation(format!("Invalid base URL {:?}: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SeeError::validation(format!(
                "Invalid base URL {:?}: scheme must be http or https",
                self.base_url
            )));
        }
        if self.timeout.is_zero() {
            return Err(SeeError::validation("Timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builder for [`crate::SeeClient`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(api_key))
    }

    pub fn from_config(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Bound on each attempt, including connection setup.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_retries(mut self, attempts: u32) -> Self {
        self.config.retry = self.config.retry.with_max_attempts(attempts);
        self
    }

    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Replace the whole retry policy. `max_retries` calls made afterwards
    /// still adjust its attempt count.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn into_config(self) -> Result<ClientConfig, SeeError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, SeeError>
where
    T::Err: fmt::Display,
{
    non_empty_var(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| SeeError::validation(format!("{name} must be a number: {e}")))
        })
        .transpose()
}
