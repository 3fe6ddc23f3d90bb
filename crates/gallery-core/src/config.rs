//! Remote client configuration.

use std::time::Duration;

use url::Url;

use crate::error::{ClientError, ClientResult};

/// Base URL used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
/// Per-request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validated settings for [`crate::client::HttpGalleryClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: Url,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Validate and normalise the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] when the URL does not parse, is not
    /// `http`/`https`, or the timeout is zero.
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let mut url = Url::parse(base_url.trim()).map_err(|_| ClientError::Config {
            field: "base_url",
            reason: "not a valid URL",
            value: Some(base_url.to_string()),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::Config {
                field: "base_url",
                reason: "scheme must be http or https",
                value: Some(base_url.to_string()),
            });
        }
        if timeout.is_zero() {
            return Err(ClientError::Config {
                field: "timeout",
                reason: "must be greater than zero",
                value: None,
            });
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_query(None);
        url.set_fragment(None);
        Ok(Self {
            base_url: url,
            timeout,
            user_agent: format!("gallery-core/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// API root, always ending in `/`.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `User-Agent` header value.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Resolve `segments` below the API root, percent-encoding each one.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}
