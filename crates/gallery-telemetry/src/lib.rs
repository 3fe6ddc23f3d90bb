#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
//! Logging primitives shared across the gallery workspace.
//!
//! This crate centralises subscriber installation and span helpers so the
//! CLI and any future front end adopt a consistent observability story.

mod init;

pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};

use tracing::Span;

/// Root span for a single front-end command, tagged with its trace id.
///
/// Every request and cache event logged while the span is entered inherits
/// `command` and `trace_id`, which is how a user report is correlated with
/// the `x-request-id` header sent to the server.
#[must_use]
pub fn command_span(command: &'static str, trace_id: &str) -> Span {
    tracing::info_span!(
        "command",
        command,
        trace_id = %trace_id,
        build_sha = %build_sha()
    )
}
