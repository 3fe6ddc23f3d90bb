//! Shared CLI plumbing: error type, exit codes, and dependency wiring.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use gallery_core::{
    ClientConfig, ClientError, EventBus, FileStore, Gallery, HttpGalleryClient, KeyValueStore,
    PreferenceStore, SessionStore,
};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";
const STATE_FILE_NAME: &str = "state.json";

/// CLI-level error type separating bad input, failures, and forced re-login.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
    SessionExpired,
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
            Self::SessionExpired => 4,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
            Self::SessionExpired => {
                "your session has expired; run `gallery login` to sign in again".to_string()
            }
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::SessionExpired => Self::SessionExpired,
            ClientError::Validation { .. }
            | ClientError::Authentication { .. }
            | ClientError::Config { .. } => Self::Validation(err.user_message()),
            other => {
                let hint = if other.is_retryable() {
                    " (temporary; try again)"
                } else {
                    ""
                };
                Self::Failure(anyhow!("{}{hint}", other.user_message()))
            }
        }
    }
}

/// Long-lived objects a command handler works with.
pub(crate) struct AppContext {
    pub(crate) gallery: Gallery,
    pub(crate) preferences: PreferenceStore,
}

/// Settings gathered from flags and environment.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionSettings {
    pub(crate) api_url: String,
    pub(crate) timeout_secs: u64,
    pub(crate) state_file: PathBuf,
}

impl AppContext {
    /// Wire storage, session, events, and the HTTP client together.
    pub(crate) fn connect(settings: &ConnectionSettings, trace_id: &str) -> CliResult<Self> {
        let config = ClientConfig::new(&settings.api_url, Duration::from_secs(settings.timeout_secs))?;
        let http = build_http_client(&config, trace_id)?;
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&settings.state_file));
        Ok(Self::with_parts(http, config, storage))
    }

    pub(crate) fn with_parts(
        http: Client,
        config: ClientConfig,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        let session = SessionStore::load(storage.clone());
        let events = EventBus::new();
        let client = HttpGalleryClient::with_http_client(http, config, session.clone(), events.clone());
        Self {
            gallery: Gallery::new(Arc::new(client), session, events),
            preferences: PreferenceStore::load(storage),
        }
    }
}

fn build_http_client(config: &ClientConfig, trace_id: &str) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();
    let request_id = HeaderValue::from_str(trace_id)
        .map_err(|_| CliError::failure(anyhow!("trace identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);

    Client::builder()
        .timeout(config.timeout())
        .user_agent(format!("gallery-cli/{}", env!("CARGO_PKG_VERSION")))
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Default location of the persisted state file.
#[must_use]
pub(crate) fn default_state_file() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(".gallery").join(STATE_FILE_NAME),
        |dir| dir.join("gallery").join(STATE_FILE_NAME),
    )
}

/// Require a signed-in session before commands that need one.
pub(crate) fn require_session(ctx: &AppContext) -> CliResult<()> {
    if ctx.gallery.session().is_authenticated() {
        Ok(())
    } else {
        Err(CliError::validation(
            "not logged in; run `gallery login` first",
        ))
    }
}
