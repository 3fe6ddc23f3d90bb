//! Synchronization layer: the operations a front end invokes.
//!
//! # Design
//! - [`Gallery`] owns the catalog and favorites caches; callers only get
//!   clones out of them.
//! - Cache locks are plain mutexes taken in short, non-async sections and are
//!   never held across an `.await`.
//! - Caches change only after the server acknowledges a request. Failures
//!   leave them at their last known good state.
//! - Favorites are tied to the session: whenever the session has gone away
//!   (logout, expiry) the favorites cache is dropped before it is read.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gallery_api_models::{LoginRequest, RegisterRequest};

use crate::catalog::CatalogCache;
use crate::client::{AuthGrant, GalleryApi};
use crate::error::{ClientError, ClientResult};
use crate::events::{AppEvent, EventBus};
use crate::favorites::{Favorite, FavoritesCache, ToggleIntent, ToggleOutcome, ToggleState};
use crate::filter::{FilterSummary, TemplateQuery, filter_templates};
use crate::model::{Template, User};
use crate::session::SessionStore;
use crate::validation::{LoginForm, RegistrationForm};

/// Client-side state plus the operations that keep it in sync with the server.
pub struct Gallery {
    api: Arc<dyn GalleryApi>,
    session: SessionStore,
    events: EventBus,
    catalog: Mutex<CatalogCache>,
    favorites: Mutex<FavoritesCache>,
}

impl Gallery {
    /// Assemble the layer around an API implementation and shared stores.
    #[must_use]
    pub fn new(api: Arc<dyn GalleryApi>, session: SessionStore, events: EventBus) -> Self {
        Self {
            api,
            session,
            events,
            catalog: Mutex::new(CatalogCache::new()),
            favorites: Mutex::new(FavoritesCache::new()),
        }
    }

    /// Session store shared with the remote client.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Event bus carrying session transitions.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Validate `form`, authenticate, and establish the session.
    ///
    /// # Errors
    ///
    /// [`ClientError::Validation`] before any network call when the form is
    /// invalid; otherwise whatever the remote client reports. The session is
    /// untouched on failure.
    pub async fn login(&self, form: &LoginForm) -> ClientResult<User> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(ClientError::Validation { errors });
        }
        let request = LoginRequest {
            email: form.email.clone(),
            password: form.password.clone(),
        };
        let grant = self.api.authenticate(&request).await?;
        self.establish(grant)
    }

    /// Validate `form`, create the account, and establish the session.
    ///
    /// # Errors
    ///
    /// Same contract as [`Gallery::login`].
    pub async fn register(&self, form: &RegistrationForm) -> ClientResult<User> {
        let errors = form.validate();
        if !errors.is_empty() {
            return Err(ClientError::Validation { errors });
        }
        let request = RegisterRequest {
            email: form.email.clone(),
            password: form.password.clone(),
            name: form.display_name(),
        };
        let grant = self.api.register(&request).await?;
        self.establish(grant)
    }

    fn establish(&self, grant: AuthGrant) -> ClientResult<User> {
        let user = grant.user;
        self.session
            .set_session(user.clone(), grant.token)
            .map_err(|err| {
                tracing::warn!(error = %err, "server granted an unusable session");
                ClientError::IncompleteCredentials
            })?;
        self.lock_favorites().clear();
        self.events.publish(AppEvent::SignedIn {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// End the session. The remote call is best effort; local state is always
    /// cleared and [`AppEvent::SignedOut`] is published.
    pub async fn logout(&self) {
        let remote = if self.session.is_authenticated() {
            self.api.end_session().await
        } else {
            Ok(())
        };
        if let Err(err) = remote {
            tracing::warn!(error = %err, "remote logout failed; clearing local session anyway");
        }
        self.session.clear_session();
        self.lock_favorites().clear();
        self.events.publish(AppEvent::SignedOut);
    }

    /// Refetch the catalog and replace the cache wholesale.
    ///
    /// # Errors
    ///
    /// Returns the remote client's error; the cache keeps its previous
    /// contents in that case.
    pub async fn refresh_catalog(&self) -> ClientResult<usize> {
        let templates = self.api.list_templates().await?;
        let mut catalog = self.lock_catalog();
        catalog.replace(templates);
        tracing::debug!(count = catalog.len(), "catalog refreshed");
        Ok(catalog.len())
    }

    /// Cached template, without touching the network.
    #[must_use]
    pub fn template(&self, id: &str) -> Option<Template> {
        self.lock_catalog().get(id).cloned()
    }

    /// Fetch one template from the server. The cache is not modified.
    ///
    /// # Errors
    ///
    /// Returns the remote client's error.
    pub async fn fetch_template(&self, id: &str) -> ClientResult<Template> {
        self.api.fetch_template(id).await
    }

    /// Every cached template in server order.
    #[must_use]
    pub fn templates(&self) -> Vec<Template> {
        self.lock_catalog().templates().to_vec()
    }

    /// Cached templates matching `query`, in catalog order.
    #[must_use]
    pub fn search(&self, query: &TemplateQuery) -> Vec<Template> {
        filter_templates(self.lock_catalog().templates(), query)
    }

    /// Matches for `query` together with the "N of M" counts.
    #[must_use]
    pub fn search_with_summary(&self, query: &TemplateQuery) -> (Vec<Template>, FilterSummary) {
        let catalog = self.lock_catalog();
        let matches = filter_templates(catalog.templates(), query);
        let summary = FilterSummary {
            shown: matches.len(),
            total: catalog.len(),
        };
        (matches, summary)
    }

    /// Categories present in the cached catalog.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.lock_catalog().categories()
    }

    /// Refetch favorites and replace the cache wholesale. Signed out, this is
    /// a no-op that yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns the remote client's error; the cache keeps its previous
    /// contents in that case.
    pub async fn refresh_favorites(&self) -> ClientResult<Vec<Favorite>> {
        let mark = {
            let mut favorites = self.lock_favorites();
            if !self.session.is_authenticated() {
                return Ok(Vec::new());
            }
            favorites.begin_refresh()
        };
        let templates = match self.api.list_favorites().await {
            Ok(templates) => templates,
            Err(err) => {
                self.lock_favorites().abandon_refresh(mark);
                return Err(err);
            }
        };

        let mut favorites = self.lock_favorites();
        if favorites.apply_refresh(mark, templates) {
            tracing::debug!(count = favorites.len(), "favorites refreshed");
        } else {
            tracing::debug!("favorites refresh superseded; keeping current set");
        }
        Ok(favorites.entries().to_vec())
    }

    /// Current favorites.
    #[must_use]
    pub fn favorites(&self) -> Vec<Favorite> {
        self.lock_favorites().entries().to_vec()
    }

    /// Whether `id` is in the local favorites set.
    #[must_use]
    pub fn is_favorite(&self, id: &str) -> bool {
        self.lock_favorites().contains(id)
    }

    /// Whether a toggle for `id` is in flight.
    #[must_use]
    pub fn is_toggle_pending(&self, id: &str) -> bool {
        self.lock_favorites().is_pending(id)
    }

    /// Lock state for `id`.
    #[must_use]
    pub fn toggle_state(&self, id: &str) -> ToggleState {
        self.lock_favorites().state(id)
    }

    /// Add `id` when it is not a favorite, remove it when it is.
    ///
    /// Returns [`ToggleOutcome::Ignored`] without any network call while an
    /// earlier toggle for `id` is still in flight.
    ///
    /// # Errors
    ///
    /// Returns the remote client's error; the favorites set is unchanged.
    pub async fn toggle_favorite(&self, id: &str) -> ClientResult<ToggleOutcome> {
        let ticket = self.lock_favorites().begin_toggle(id);
        let Some(ticket) = ticket else {
            tracing::warn!(template_id = %id, "toggle already in flight; ignoring");
            return Ok(ToggleOutcome::Ignored);
        };
        let intent = ticket.intent();
        tracing::debug!(template_id = %id, ?intent, "toggling favorite");

        let result = match intent {
            ToggleIntent::Add => self.api.add_favorite(id).await,
            ToggleIntent::Remove => self.api.remove_favorite(id).await,
        };
        let record = match (&result, intent) {
            (Ok(()), ToggleIntent::Add) => self.template(id),
            _ => None,
        };
        self.lock_favorites().finish(ticket, result.is_ok(), record);

        result?;
        Ok(match intent {
            ToggleIntent::Add => ToggleOutcome::Added,
            ToggleIntent::Remove => ToggleOutcome::Removed,
        })
    }

    /// [`Gallery::toggle_favorite`], then reload favorites from the server
    /// when the toggle went through.
    ///
    /// A failed reload is logged and does not change the outcome; the
    /// acknowledged toggle is already applied locally.
    ///
    /// # Errors
    ///
    /// Returns the toggle's error.
    pub async fn toggle_and_refresh(&self, id: &str) -> ClientResult<ToggleOutcome> {
        let outcome = self.toggle_favorite(id).await?;
        if outcome != ToggleOutcome::Ignored {
            if let Err(err) = self.refresh_favorites().await {
                tracing::warn!(template_id = %id, error = %err, "favorites reload failed");
            }
        }
        Ok(outcome)
    }

    fn lock_catalog(&self) -> MutexGuard<'_, CatalogCache> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Favorites guard; drops cached favorites first when the session is gone.
    fn lock_favorites(&self) -> MutexGuard<'_, FavoritesCache> {
        let mut favorites = self.favorites.lock().unwrap_or_else(PoisonError::into_inner);
        if favorites.has_state() && !self.session.is_authenticated() {
            tracing::debug!("session ended; dropping cached favorites");
            favorites.clear();
        }
        favorites
    }
}

impl std::fmt::Debug for Gallery {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Gallery")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LoginReason;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Scripted in-memory backend.
    struct FakeApi {
        session: SessionStore,
        events: EventBus,
        templates: Mutex<Vec<Template>>,
        favorites: Mutex<Vec<String>>,
        fail: AtomicBool,
        expire: AtomicBool,
        gate: Mutex<Option<Arc<Notify>>>,
        list_gate: Mutex<Option<Arc<Notify>>>,
        list_calls: AtomicUsize,
        auth_calls: AtomicUsize,
        logout_calls: AtomicUsize,
        add_calls: AtomicUsize,
        remove_calls: AtomicUsize,
    }

    impl FakeApi {
        fn new(session: &SessionStore, events: &EventBus) -> Self {
            Self {
                session: session.clone(),
                events: events.clone(),
                templates: Mutex::new(vec![
                    template("1", "Portfolio", "Personal"),
                    template("2", "Shop", "E-commerce"),
                ]),
                favorites: Mutex::new(Vec::new()),
                fail: AtomicBool::new(false),
                expire: AtomicBool::new(false),
                gate: Mutex::new(None),
                list_gate: Mutex::new(None),
                list_calls: AtomicUsize::new(0),
                auth_calls: AtomicUsize::new(0),
                logout_calls: AtomicUsize::new(0),
                add_calls: AtomicUsize::new(0),
                remove_calls: AtomicUsize::new(0),
            }
        }

        fn check(&self) -> ClientResult<()> {
            if self.expire.load(Ordering::SeqCst) {
                self.session.clear_session();
                self.events.publish(AppEvent::LoginRequired {
                    reason: LoginReason::SessionExpired,
                });
                return Err(ClientError::SessionExpired);
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Server {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: None,
                });
            }
            Ok(())
        }

        async fn wait_for_gate(&self) {
            let gate = self.gate.lock().expect("gate lock").clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
        }

        fn grant(email: &str) -> AuthGrant {
            AuthGrant {
                user: User {
                    id: format!("id-{email}"),
                    email: email.to_string(),
                    name: None,
                },
                token: format!("token-{email}"),
            }
        }
    }

    #[async_trait]
    impl GalleryApi for FakeApi {
        async fn authenticate(&self, request: &LoginRequest) -> ClientResult<AuthGrant> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            if request.password != "secret" {
                self.session.clear_session();
                self.events.publish(AppEvent::LoginRequired {
                    reason: LoginReason::SessionExpired,
                });
                return Err(ClientError::Authentication {
                    status: StatusCode::UNAUTHORIZED,
                    message: Some("Invalid email or password".into()),
                });
            }
            Ok(Self::grant(&request.email))
        }

        async fn register(&self, request: &RegisterRequest) -> ClientResult<AuthGrant> {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            let mut grant = Self::grant(&request.email);
            grant.user.name.clone_from(&request.name);
            Ok(grant)
        }

        async fn end_session(&self) -> ClientResult<()> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.check()
        }

        async fn list_templates(&self) -> ClientResult<Vec<Template>> {
            self.check()?;
            Ok(self.templates.lock().expect("templates lock").clone())
        }

        async fn fetch_template(&self, id: &str) -> ClientResult<Template> {
            self.check()?;
            self.templates
                .lock()
                .expect("templates lock")
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| ClientError::Server {
                    status: StatusCode::NOT_FOUND,
                    message: Some("Template not found".into()),
                })
        }

        async fn list_favorites(&self) -> ClientResult<Vec<Template>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check()?;
            // Snapshot first so a gated response is older than later writes.
            let ids = self.favorites.lock().expect("favorites lock").clone();
            let gate = self.list_gate.lock().expect("list gate lock").clone();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(ids
                .iter()
                .map(|id| template(id, &format!("Fav {id}"), ""))
                .collect())
        }

        async fn add_favorite(&self, id: &str) -> ClientResult<()> {
            self.add_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_for_gate().await;
            self.check()?;
            self.favorites
                .lock()
                .expect("favorites lock")
                .push(id.to_string());
            Ok(())
        }

        async fn remove_favorite(&self, id: &str) -> ClientResult<()> {
            self.remove_calls.fetch_add(1, Ordering::SeqCst);
            self.wait_for_gate().await;
            self.check()?;
            self.favorites
                .lock()
                .expect("favorites lock")
                .retain(|fav| fav != id);
            Ok(())
        }
    }

    fn template(id: &str, name: &str, category: &str) -> Template {
        Template {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            thumbnail_url: None,
            category: Some(category.to_string()),
        }
    }

    fn setup() -> (Gallery, Arc<FakeApi>) {
        let session = SessionStore::in_memory();
        let events = EventBus::new();
        let api = Arc::new(FakeApi::new(&session, &events));
        let gallery = Gallery::new(api.clone(), session, events);
        (gallery, api)
    }

    fn login_form(password: &str) -> LoginForm {
        LoginForm {
            email: "ada@example.com".into(),
            password: password.into(),
        }
    }

    async fn signed_in() -> (Gallery, Arc<FakeApi>) {
        let (gallery, api) = setup();
        gallery.login(&login_form("secret")).await.expect("login");
        gallery.refresh_catalog().await.expect("catalog");
        (gallery, api)
    }

    #[tokio::test]
    async fn login_establishes_session_and_signals() {
        let (gallery, _api) = setup();
        let mut stream = gallery.events().subscribe();

        let user = gallery.login(&login_form("secret")).await.expect("login");
        assert_eq!(user.email, "ada@example.com");
        assert!(gallery.session().is_authenticated());
        assert_eq!(
            gallery.session().current_token().as_deref(),
            Some("token-ada@example.com")
        );
        let events = stream.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.kind(), "signed_in");
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_server() {
        let (gallery, api) = setup();
        let err = gallery
            .login(&LoginForm::default())
            .await
            .expect_err("invalid");
        assert!(matches!(err, ClientError::Validation { ref errors } if errors.len() == 2));

        let form = RegistrationForm {
            email: "ada@example.com".into(),
            password: "secret".into(),
            confirm_password: "secrets".into(),
            ..RegistrationForm::default()
        };
        assert!(matches!(
            gallery.register(&form).await,
            Err(ClientError::Validation { .. })
        ));
        assert_eq!(api.auth_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_login_signs_out() {
        let (gallery, _api) = signed_in().await;
        let mut stream = gallery.events().subscribe();
        let err = gallery
            .login(&login_form("wrong"))
            .await
            .expect_err("rejected");
        assert!(matches!(err, ClientError::Authentication { .. }));
        assert!(!gallery.session().is_authenticated());
        assert_eq!(stream.drain().len(), 1);
    }

    #[tokio::test]
    async fn register_passes_trimmed_name() {
        let (gallery, _api) = setup();
        let form = RegistrationForm {
            name: "  Ada ".into(),
            email: "ada@example.com".into(),
            password: "secret".into(),
            confirm_password: "secret".into(),
        };
        let user = gallery.register(&form).await.expect("register");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert!(gallery.session().is_authenticated());
    }

    #[tokio::test]
    async fn toggle_follows_last_acknowledgment() {
        let (gallery, api) = signed_in().await;

        assert_eq!(
            gallery.toggle_favorite("1").await.expect("add"),
            ToggleOutcome::Added
        );
        assert!(gallery.is_favorite("1"));
        let favorites = gallery.favorites();
        assert_eq!(
            favorites[0].template.as_ref().map(|t| t.name.as_str()),
            Some("Portfolio")
        );

        assert_eq!(
            gallery.toggle_favorite("1").await.expect("remove"),
            ToggleOutcome::Removed
        );
        assert!(!gallery.is_favorite("1"));
        assert_eq!(api.add_calls.load(Ordering::SeqCst), 1);
        assert_eq!(api.remove_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_toggle_leaves_set_unchanged() {
        let (gallery, api) = signed_in().await;
        gallery.toggle_favorite("1").await.expect("add");

        api.fail.store(true, Ordering::SeqCst);
        let err = gallery.toggle_favorite("1").await.expect_err("remove fails");
        assert!(err.is_retryable());
        assert!(gallery.is_favorite("1"));
        assert!(!gallery.is_toggle_pending("1"));

        api.fail.store(false, Ordering::SeqCst);
        assert_eq!(
            gallery.toggle_favorite("1").await.expect("retry"),
            ToggleOutcome::Removed
        );
    }

    #[tokio::test]
    async fn concurrent_toggle_is_ignored_without_a_request() {
        let (gallery, api) = signed_in().await;
        let gate = Arc::new(Notify::new());
        *api.gate.lock().expect("gate lock") = Some(gate.clone());

        let first = gallery.toggle_favorite("1");
        let second = async {
            tokio::task::yield_now().await;
            assert_eq!(gallery.toggle_state("1"), ToggleState::PendingAdd);
            let outcome = gallery.toggle_favorite("1").await;
            gate.notify_one();
            outcome
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.expect("first"), ToggleOutcome::Added);
        assert_eq!(second.expect("second"), ToggleOutcome::Ignored);
        assert_eq!(api.add_calls.load(Ordering::SeqCst), 1);
        assert!(gallery.is_favorite("1"));
        assert_eq!(gallery.toggle_state("1"), ToggleState::Idle);
    }

    #[tokio::test]
    async fn toggle_acknowledged_during_refresh_survives_it() {
        let (gallery, api) = signed_in().await;
        let gate = Arc::new(Notify::new());
        *api.list_gate.lock().expect("list gate lock") = Some(gate.clone());

        let refresh = gallery.refresh_favorites();
        let toggle = async {
            tokio::task::yield_now().await;
            let outcome = gallery.toggle_favorite("1").await;
            assert!(gallery.is_favorite("1"));
            gate.notify_one();
            outcome
        };
        let (refreshed, toggled) = tokio::join!(refresh, toggle);

        assert_eq!(toggled.expect("toggle"), ToggleOutcome::Added);
        let refreshed = refreshed.expect("refresh");
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].id, "1");
        assert!(gallery.is_favorite("1"));
        assert_eq!(
            *api.favorites.lock().expect("favorites lock"),
            vec!["1".to_string()]
        );
    }

    #[tokio::test]
    async fn removal_acknowledged_during_refresh_survives_it() {
        let (gallery, api) = signed_in().await;
        gallery.toggle_favorite("2").await.expect("add");
        let gate = Arc::new(Notify::new());
        *api.list_gate.lock().expect("list gate lock") = Some(gate.clone());

        let refresh = gallery.refresh_favorites();
        let toggle = async {
            tokio::task::yield_now().await;
            let outcome = gallery.toggle_favorite("2").await;
            gate.notify_one();
            outcome
        };
        let (refreshed, toggled) = tokio::join!(refresh, toggle);

        assert_eq!(toggled.expect("toggle"), ToggleOutcome::Removed);
        assert!(refreshed.expect("refresh").is_empty());
        assert!(!gallery.is_favorite("2"));
    }

    #[tokio::test]
    async fn toggle_and_refresh_reloads_favorites() {
        let (gallery, api) = signed_in().await;
        api.favorites
            .lock()
            .expect("favorites lock")
            .push("2".into());

        let outcome = gallery.toggle_and_refresh("1").await.expect("toggle");
        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
        let ids: Vec<String> = gallery.favorites().into_iter().map(|fav| fav.id).collect();
        assert_eq!(ids, vec!["2".to_string(), "1".to_string()]);

        api.fail.store(true, Ordering::SeqCst);
        assert!(gallery.toggle_and_refresh("1").await.is_err());
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
        assert!(gallery.is_favorite("1"));
    }

    #[tokio::test]
    async fn favorite_without_catalog_entry_is_still_recorded() {
        let (gallery, _api) = signed_in().await;
        gallery.toggle_favorite("ghost").await.expect("add");
        let favorites = gallery.favorites();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "ghost");
        assert!(favorites[0].template.is_none());
    }

    #[tokio::test]
    async fn catalog_refresh_failure_keeps_previous_contents() {
        let (gallery, api) = signed_in().await;
        assert_eq!(gallery.templates().len(), 2);

        api.templates
            .lock()
            .expect("templates lock")
            .push(template("3", "Blog", "Personal"));
        api.fail.store(true, Ordering::SeqCst);
        assert!(gallery.refresh_catalog().await.is_err());
        assert_eq!(gallery.templates().len(), 2);

        api.fail.store(false, Ordering::SeqCst);
        assert_eq!(gallery.refresh_catalog().await.expect("refresh"), 3);
        assert_eq!(gallery.template("3").map(|t| t.name), Some("Blog".into()));
    }

    #[tokio::test]
    async fn search_and_categories_use_cached_catalog() {
        let (gallery, _api) = signed_in().await;
        let (matches, summary) = gallery.search_with_summary(&TemplateQuery::new(Some("shop"), None));
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "2");
        assert_eq!(summary, FilterSummary { shown: 1, total: 2 });
        assert_eq!(
            gallery.search(&TemplateQuery::new(None, Some("personal")))[0].id,
            "1"
        );
        assert_eq!(gallery.categories(), vec!["E-commerce", "Personal"]);
    }

    #[tokio::test]
    async fn fetch_template_does_not_touch_cache() {
        let (gallery, _api) = setup();
        let template = gallery.fetch_template("2").await.expect("fetch");
        assert_eq!(template.name, "Shop");
        assert!(gallery.template("2").is_none());
    }

    #[tokio::test]
    async fn refresh_favorites_requires_session() {
        let (gallery, api) = setup();
        api.favorites
            .lock()
            .expect("favorites lock")
            .push("1".into());
        assert!(gallery.refresh_favorites().await.expect("signed out").is_empty());

        gallery.login(&login_form("secret")).await.expect("login");
        let favorites = gallery.refresh_favorites().await.expect("refresh");
        assert_eq!(favorites.len(), 1);
        assert!(gallery.is_favorite("1"));
    }

    #[tokio::test]
    async fn logout_is_best_effort_and_clears_favorites() {
        let (gallery, api) = signed_in().await;
        gallery.toggle_favorite("1").await.expect("add");
        let mut stream = gallery.events().subscribe();

        api.fail.store(true, Ordering::SeqCst);
        gallery.logout().await;
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
        assert!(!gallery.session().is_authenticated());
        assert!(gallery.favorites().is_empty());
        assert_eq!(stream.drain()[0].event, AppEvent::SignedOut);

        gallery.logout().await;
        assert_eq!(api.logout_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn session_expiry_drops_favorites_and_signals_once() {
        let (gallery, api) = signed_in().await;
        gallery.toggle_favorite("1").await.expect("add");
        let mut stream = gallery.events().subscribe();

        api.expire.store(true, Ordering::SeqCst);
        let err = gallery.toggle_favorite("2").await.expect_err("expired");
        assert!(matches!(err, ClientError::SessionExpired));
        assert!(!gallery.session().is_authenticated());
        assert!(gallery.favorites().is_empty());
        assert!(!gallery.is_toggle_pending("2"));

        let events = stream.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.kind(), "login_required");
    }

    #[tokio::test]
    async fn new_identity_starts_with_empty_favorites() {
        let (gallery, _api) = signed_in().await;
        gallery.toggle_favorite("1").await.expect("add");
        gallery
            .login(&LoginForm {
                email: "grace@example.com".into(),
                password: "secret".into(),
            })
            .await
            .expect("second login");
        assert!(gallery.favorites().is_empty());
    }
}
