#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub)]
#![allow(clippy::multiple_crate_versions)]
//! Shared HTTP DTOs for the template gallery REST API.
//!
//! These types mirror the wire contract exactly (field names, optionality) so
//! the client core can decide how absent and empty fields map onto its domain
//! model. Nothing in this crate performs I/O.
use serde::{Deserialize, Serialize};

/// Standard response envelope wrapping every API payload.
///
/// `data` is optional on the wire: list endpoints may omit it when there is
/// nothing to return, and error responses carry `message`/`error` instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiEnvelope<T> {
    /// Server-side success flag.
    #[serde(default = "default_success")]
    pub success: bool,
    /// Payload, when present.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable status message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Error detail reported by some endpoints in place of `message`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const fn default_success() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    /// Successful envelope carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// Best available human-readable explanation (`message`, then `error`).
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        fn non_blank(value: &Option<String>) -> Option<&str> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
        }
        non_blank(&self.message).or_else(|| non_blank(&self.error))
    }
}

/// Error body shape used when the payload type is unknown or irrelevant.
pub type ProblemEnvelope = ApiEnvelope<serde_json::Value>;

/// User identity as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserDto {
    /// Stable user identifier.
    #[serde(alias = "_id")]
    pub id: String,
    /// Account email address.
    #[serde(default)]
    pub email: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Payload of `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    /// Bearer token to attach to subsequent requests.
    pub access_token: String,
    /// Authenticated user.
    pub user: UserDto,
}

/// Response body of the auth endpoints.
pub type AuthResponse = ApiEnvelope<AuthPayload>;

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// Account email.
    pub email: String,
    /// Plain-text password (sent over TLS).
    pub password: String,
}

/// Request body for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Account email.
    pub email: String,
    /// Plain-text password (sent over TLS).
    pub password: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Catalog entry exactly as served by `GET /templates`.
///
/// Every field is optional because the backend does not guarantee any of
/// them; the client decides which absences are fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateDto {
    /// Template identifier (Mongo-style `_id`).
    #[serde(rename = "_id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Free-text category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Entry of `GET /favorites`.
///
/// Most deployments return bare templates; some wrap them in a favorite
/// record with its own id and creation timestamp. Both decode here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FavoriteItemDto {
    /// Favorite relation record wrapping the template.
    Record {
        /// Relation identifier.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Favorited template.
        template: TemplateDto,
        /// Creation timestamp as sent by the server.
        #[serde(
            rename = "createdAt",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        created_at: Option<String>,
    },
    /// Bare template.
    Template(TemplateDto),
}

impl FavoriteItemDto {
    /// Template carried by this entry, whichever shape it arrived in.
    #[must_use]
    pub fn into_template(self) -> TemplateDto {
        match self {
            Self::Record { template, .. } | Self::Template(template) => template,
        }
    }
}

/// Response body of `GET /templates`.
pub type TemplateListResponse = ApiEnvelope<Vec<TemplateDto>>;

/// Response body of `GET /templates/{id}`.
pub type TemplateResponse = ApiEnvelope<TemplateDto>;

/// Response body of `GET /favorites`.
pub type FavoriteListResponse = ApiEnvelope<Vec<FavoriteItemDto>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_response_decodes_camel_case_token() {
        let body = json!({
            "success": true,
            "data": {
                "accessToken": "tok-1",
                "user": {"id": "u1", "email": "a@b.c"}
            },
            "message": "Login successful"
        });
        let parsed: AuthResponse = serde_json::from_value(body).expect("auth response");
        let data = parsed.data.expect("payload");
        assert_eq!(data.access_token, "tok-1");
        assert_eq!(data.user.id, "u1");
        assert!(data.user.name.is_none());
        assert_eq!(parsed.message.as_deref(), Some("Login successful"));
    }

    #[test]
    fn template_list_keeps_absent_and_empty_distinct() {
        let body = json!({
            "success": true,
            "data": [
                {"_id": "1", "name": "Portfolio", "category": ""},
                {"_id": "2", "name": "Shop"}
            ]
        });
        let parsed: TemplateListResponse = serde_json::from_value(body).expect("list");
        let data = parsed.data.expect("data");
        assert_eq!(data[0].category.as_deref(), Some(""));
        assert_eq!(data[1].category, None);
        assert_eq!(data[1].description, None);
    }

    #[test]
    fn envelope_without_data_decodes() {
        let parsed: TemplateListResponse =
            serde_json::from_value(json!({"success": true})).expect("envelope");
        assert!(parsed.data.is_none());

        // `AuthPayload` has no `Default`; a missing payload still decodes.
        let parsed: AuthResponse =
            serde_json::from_value(json!({"success": false, "message": "Invalid credentials"}))
                .expect("auth envelope");
        assert!(parsed.data.is_none());
        assert_eq!(parsed.reason(), Some("Invalid credentials"));

        let parsed: ProblemEnvelope =
            serde_json::from_value(json!({"message": "nope"})).expect("problem");
        assert!(parsed.success);
        assert_eq!(parsed.reason(), Some("nope"));
    }

    #[test]
    fn reason_falls_back_to_error_and_skips_blank_message() {
        let envelope: ProblemEnvelope = serde_json::from_value(json!({
            "success": false,
            "message": "  ",
            "error": "Invalid token"
        }))
        .expect("problem");
        assert_eq!(envelope.reason(), Some("Invalid token"));
    }

    #[test]
    fn favorites_accept_bare_and_wrapped_items() {
        let body = json!({
            "success": true,
            "data": [
                {"_id": "1", "name": "Portfolio"},
                {"id": "fav-9", "template": {"_id": "2", "name": "Shop"}, "createdAt": "2024-01-01"}
            ]
        });
        let parsed: FavoriteListResponse = serde_json::from_value(body).expect("favorites");
        let ids: Vec<_> = parsed
            .data
            .expect("data")
            .into_iter()
            .map(|item| item.into_template().id)
            .collect();
        assert_eq!(ids, vec![Some("1".to_string()), Some("2".to_string())]);
    }

    #[test]
    fn register_request_omits_missing_name() {
        let body = serde_json::to_value(RegisterRequest {
            email: "a@b.c".into(),
            password: "secret".into(),
            name: None,
        })
        .expect("serialize");
        assert_eq!(body, json!({"email": "a@b.c", "password": "secret"}));
    }
}
