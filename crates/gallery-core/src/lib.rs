#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
#![allow(clippy::module_name_repetitions)]

//! Client core for the template gallery.
//!
//! Layout: `session.rs` and `preferences.rs` (persisted stores over
//! `storage.rs`), `client.rs` (remote client and the `GalleryApi` seam),
//! `catalog.rs`/`favorites.rs`/`filter.rs` (caches and queries), `sync.rs`
//! (`Gallery`, the operations a front end calls), `events.rs` (session
//! signals), `validation.rs` (form checks run before any request).

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod filter;
pub mod model;
pub mod preferences;
pub mod session;
pub mod storage;
pub mod sync;
pub mod validation;

pub use catalog::CatalogCache;
pub use client::{AuthGrant, GalleryApi, HttpGalleryClient};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{ClientError, ClientResult, SessionError, StorageError};
pub use events::{AppEvent, EventBus, EventEnvelope, EventId, EventStream, LoginReason};
pub use favorites::{
    Favorite, FavoritesCache, RefreshMark, ToggleIntent, ToggleOutcome, ToggleState, ToggleTicket,
};
pub use filter::{FilterSummary, TemplateQuery, categories, filter_templates};
pub use model::{Session, Template, User};
pub use preferences::{PreferenceStore, ThemeMode};
pub use session::SessionStore;
pub use storage::{FileStore, KeyValueStore, MemoryStore, SESSION_KEY, THEME_KEY};
pub use sync::Gallery;
pub use validation::{FieldError, LoginForm, MIN_PASSWORD_LEN, RegistrationForm};
