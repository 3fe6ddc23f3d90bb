//! Remote client for the gallery REST API.
//!
//! # Design
//! - [`GalleryApi`] is the seam between the synchronization layer and the
//!   network; [`HttpGalleryClient`] is the reqwest implementation.
//! - Every request carries the session's bearer token when one exists.
//! - A 401 from a session-scoped endpoint clears the session, publishes
//!   [`AppEvent::LoginRequired`], and fails with [`ClientError::SessionExpired`].
//!   The request is never retried. A 401 from a credential endpoint (login,
//!   register) also clears the session and publishes the event, but fails
//!   with [`ClientError::Authentication`] so the server's message survives.
//! - No internal retries for any error.

use async_trait::async_trait;
use gallery_api_models::{
    ApiEnvelope, AuthResponse, FavoriteItemDto, FavoriteListResponse, LoginRequest,
    ProblemEnvelope, RegisterRequest, TemplateListResponse, TemplateResponse,
};
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{AppEvent, EventBus, LoginReason};
use crate::model::{Template, User, templates_from_dtos};
use crate::session::SessionStore;

/// Identity and token returned by a successful login or registration.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthGrant {
    /// Authenticated user.
    pub user: User,
    /// Opaque bearer token.
    pub token: String,
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthGrant")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Logical operations offered by the gallery backend.
#[async_trait]
pub trait GalleryApi: Send + Sync {
    /// Exchange credentials for a session grant.
    async fn authenticate(&self, request: &LoginRequest) -> ClientResult<AuthGrant>;

    /// Create an account and return its session grant.
    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthGrant>;

    /// Tell the server the session is over. Best effort.
    async fn end_session(&self) -> ClientResult<()>;

    /// Full catalog in server order.
    async fn list_templates(&self) -> ClientResult<Vec<Template>>;

    /// Single catalog entry.
    async fn fetch_template(&self, id: &str) -> ClientResult<Template>;

    /// Current user's favorites in server order.
    async fn list_favorites(&self) -> ClientResult<Vec<Template>>;

    /// Add `id` to the current user's favorites.
    async fn add_favorite(&self, id: &str) -> ClientResult<()>;

    /// Remove `id` from the current user's favorites.
    async fn remove_favorite(&self, id: &str) -> ClientResult<()>;
}

/// How a 401 from an endpoint is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    /// Login and registration: a 401 means bad credentials.
    Credentials,
    /// Everything else: a 401 means the session is no longer valid.
    Session,
}

struct Route<'a> {
    method: Method,
    segments: &'a [&'a str],
    label: &'static str,
    scope: Scope,
}

/// [`GalleryApi`] over HTTP.
#[derive(Clone)]
pub struct HttpGalleryClient {
    http: Client,
    config: ClientConfig,
    session: SessionStore,
    events: EventBus,
}

impl HttpGalleryClient {
    /// Build a client with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig, session: SessionStore, events: EventBus) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|err| ClientError::Config {
                field: "http_client",
                reason: "failed to build HTTP client",
                value: Some(err.to_string()),
            })?;
        Ok(Self::with_http_client(http, config, session, events))
    }

    /// Use a caller-configured reqwest client (default headers, proxies).
    #[must_use]
    pub const fn with_http_client(
        http: Client,
        config: ClientConfig,
        session: SessionStore,
        events: EventBus,
    ) -> Self {
        Self {
            http,
            config,
            session,
            events,
        }
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn execute<B>(&self, route: Route<'_>, body: Option<&B>) -> ClientResult<Vec<u8>>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut request = self
            .http
            .request(route.method.clone(), self.config.endpoint(route.segments));
        if let Some(token) = self.session.current_token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|source| {
            tracing::warn!(endpoint = route.label, error = %source, "request failed");
            ClientError::Transport {
                endpoint: route.label,
                source,
            }
        })?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: route.label,
                source,
            })?
            .to_vec();
        tracing::debug!(endpoint = route.label, status = %status, "request completed");

        if status == StatusCode::UNAUTHORIZED {
            self.expire_session(route.label);
            if route.scope == Scope::Session {
                return Err(ClientError::SessionExpired);
            }
        }
        if status.is_success() {
            return Ok(bytes);
        }

        let message = problem_message(&bytes);
        let credential_rejection = route.scope == Scope::Credentials
            && matches!(
                status,
                StatusCode::BAD_REQUEST
                    | StatusCode::UNAUTHORIZED
                    | StatusCode::FORBIDDEN
                    | StatusCode::CONFLICT
                    | StatusCode::UNPROCESSABLE_ENTITY
            );
        if credential_rejection {
            tracing::info!(endpoint = route.label, status = %status, "credentials rejected");
            Err(ClientError::Authentication { status, message })
        } else {
            tracing::warn!(endpoint = route.label, status = %status, "server returned an error");
            Err(ClientError::Server { status, message })
        }
    }

    fn expire_session(&self, label: &'static str) {
        let cleared = self.session.clear_session();
        tracing::info!(endpoint = label, cleared, "request unauthorized; session expired");
        self.events.publish(AppEvent::LoginRequired {
            reason: LoginReason::SessionExpired,
        });
    }

    async fn acknowledge(&self, route: Route<'_>) -> ClientResult<()> {
        let label = route.label;
        let bytes = self.execute::<()>(route, None).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(());
        }
        match serde_json::from_slice::<ProblemEnvelope>(&bytes) {
            Ok(envelope) if !envelope.success => Err(refused(label, &envelope)),
            _ => Ok(()),
        }
    }

    async fn grant(
        &self,
        label: &'static str,
        segments: &[&str],
        body: &(impl Serialize + Sync),
    ) -> ClientResult<AuthGrant> {
        let route = Route {
            method: Method::POST,
            segments,
            label,
            scope: Scope::Credentials,
        };
        let bytes = self.execute(route, Some(body)).await?;
        let envelope: AuthResponse = decode(label, &bytes)?;
        let payload = accepted(label, envelope)?.ok_or_else(|| ClientError::Decode {
            endpoint: label,
            detail: "response carried no credentials".to_string(),
        })?;
        if payload.access_token.is_empty() || payload.user.id.trim().is_empty() {
            return Err(ClientError::IncompleteCredentials);
        }
        Ok(AuthGrant {
            user: User::from(payload.user),
            token: payload.access_token,
        })
    }
}

#[async_trait]
impl GalleryApi for HttpGalleryClient {
    async fn authenticate(&self, request: &LoginRequest) -> ClientResult<AuthGrant> {
        self.grant("POST /auth/login", &["auth", "login"], request).await
    }

    async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthGrant> {
        self.grant("POST /auth/register", &["auth", "register"], request)
            .await
    }

    async fn end_session(&self) -> ClientResult<()> {
        self.acknowledge(Route {
            method: Method::POST,
            segments: &["auth", "logout"],
            label: "POST /auth/logout",
            scope: Scope::Session,
        })
        .await
    }

    async fn list_templates(&self) -> ClientResult<Vec<Template>> {
        const LABEL: &str = "GET /templates";
        let route = Route {
            method: Method::GET,
            segments: &["templates"],
            label: LABEL,
            scope: Scope::Session,
        };
        let bytes = self.execute::<()>(route, None).await?;
        let envelope: TemplateListResponse = decode(LABEL, &bytes)?;
        let dtos = accepted(LABEL, envelope)?.unwrap_or_default();
        Ok(templates_from_dtos(LABEL, dtos))
    }

    async fn fetch_template(&self, id: &str) -> ClientResult<Template> {
        const LABEL: &str = "GET /templates/{id}";
        let route = Route {
            method: Method::GET,
            segments: &["templates", id],
            label: LABEL,
            scope: Scope::Session,
        };
        let bytes = self.execute::<()>(route, None).await?;
        let envelope: TemplateResponse = decode(LABEL, &bytes)?;
        accepted(LABEL, envelope)?
            .and_then(Template::from_dto)
            .ok_or_else(|| ClientError::Decode {
                endpoint: LABEL,
                detail: "response carried no template".to_string(),
            })
    }

    async fn list_favorites(&self) -> ClientResult<Vec<Template>> {
        const LABEL: &str = "GET /favorites";
        let route = Route {
            method: Method::GET,
            segments: &["favorites"],
            label: LABEL,
            scope: Scope::Session,
        };
        let bytes = self.execute::<()>(route, None).await?;
        let envelope: FavoriteListResponse = decode(LABEL, &bytes)?;
        let items = accepted(LABEL, envelope)?.unwrap_or_default();
        Ok(templates_from_dtos(
            LABEL,
            items.into_iter().map(FavoriteItemDto::into_template),
        ))
    }

    async fn add_favorite(&self, id: &str) -> ClientResult<()> {
        self.acknowledge(Route {
            method: Method::POST,
            segments: &["favorites", id],
            label: "POST /favorites/{id}",
            scope: Scope::Session,
        })
        .await
    }

    async fn remove_favorite(&self, id: &str) -> ClientResult<()> {
        self.acknowledge(Route {
            method: Method::DELETE,
            segments: &["favorites", id],
            label: "DELETE /favorites/{id}",
            scope: Scope::Session,
        })
        .await
    }
}

impl std::fmt::Debug for HttpGalleryClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpGalleryClient")
            .field("base_url", &self.config.base_url().as_str())
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(label: &'static str, bytes: &[u8]) -> ClientResult<T> {
    serde_json::from_slice(bytes).map_err(|err| ClientError::Decode {
        endpoint: label,
        detail: err.to_string(),
    })
}

/// Unwrap a decoded envelope, turning `success: false` into an error.
fn accepted<T>(label: &'static str, envelope: ApiEnvelope<T>) -> ClientResult<Option<T>> {
    if envelope.success {
        Ok(envelope.data)
    } else {
        Err(refused(label, &envelope))
    }
}

fn refused<T>(label: &'static str, envelope: &ApiEnvelope<T>) -> ClientError {
    ClientError::Decode {
        endpoint: label,
        detail: envelope
            .reason()
            .unwrap_or("server reported failure")
            .to_string(),
    }
}

fn problem_message(bytes: &[u8]) -> Option<String> {
    let reason = serde_json::from_slice::<ProblemEnvelope>(bytes)
        .ok()
        .and_then(|envelope| envelope.reason().map(str::to_string));
    if reason.is_some() {
        return reason;
    }
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    (!text.is_empty() && !text.starts_with('{')).then(|| text.to_string())
}
