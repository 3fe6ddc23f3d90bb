//! Command handlers grouped by concern.

pub(crate) mod auth;
pub(crate) mod favorites;
pub(crate) mod templates;
pub(crate) mod theme;
