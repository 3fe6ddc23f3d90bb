//! Domain records held by the client caches.
//!
//! # Design
//! - Keep "field absent" (`None`) distinct from "field present but empty".
//! - Convert wire DTOs once, at the client boundary; caches never see DTOs.

use chrono::{DateTime, Utc};
use gallery_api_models::{TemplateDto, UserDto};
use serde::{Deserialize, Serialize};

/// Authenticated user identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable user identifier.
    pub id: String,
    /// Account email address.
    pub email: String,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl User {
    /// Name to greet the user with: display name when set, email otherwise.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

impl From<UserDto> for User {
    fn from(value: UserDto) -> Self {
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
        }
    }
}

/// Read-only view of the current session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// Signed-in user, when authenticated.
    pub user: Option<User>,
    /// Opaque bearer token, when authenticated.
    pub token: Option<String>,
    /// When the current identity was established.
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl Session {
    /// `true` iff both a user and a token are present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

/// Catalog entry. Never mutated locally; replaced wholesale on refetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Preview image URL, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Free-text category label, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Template {
    /// Convert a wire record; `None` when it carries no usable identifier.
    #[must_use]
    pub fn from_dto(dto: TemplateDto) -> Option<Self> {
        let id = dto.id.filter(|id| !id.trim().is_empty())?;
        Some(Self {
            id,
            name: dto.name.unwrap_or_default(),
            description: dto.description.unwrap_or_default(),
            thumbnail_url: dto.thumbnail_url,
            category: dto.category,
        })
    }

    /// Trimmed category, only when present and non-empty.
    #[must_use]
    pub fn category_label(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|category| !category.is_empty())
    }
}

/// Convert a batch of wire records, dropping (and logging) those without an id.
pub(crate) fn templates_from_dtos(
    endpoint: &'static str,
    dtos: impl IntoIterator<Item = TemplateDto>,
) -> Vec<Template> {
    dtos.into_iter()
        .filter_map(|dto| {
            let name = dto.name.clone();
            let converted = Template::from_dto(dto);
            if converted.is_none() {
                tracing::warn!(endpoint, name = ?name, "dropping template without identifier");
            }
            converted
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_from_dto_requires_identifier() {
        assert!(Template::from_dto(TemplateDto::default()).is_none());
        let blank = TemplateDto {
            id: Some("  ".into()),
            ..TemplateDto::default()
        };
        assert!(Template::from_dto(blank).is_none());
    }

    #[test]
    fn template_from_dto_preserves_absent_vs_empty() {
        let dto = TemplateDto {
            id: Some("1".into()),
            name: Some("Portfolio".into()),
            description: None,
            thumbnail_url: None,
            category: Some(String::new()),
        };
        let template = Template::from_dto(dto).expect("template");
        assert_eq!(template.description, "");
        assert_eq!(template.category.as_deref(), Some(""));
        assert_eq!(template.category_label(), None);
    }

    #[test]
    fn category_label_trims() {
        let template = Template {
            id: "1".into(),
            name: "n".into(),
            description: "d".into(),
            thumbnail_url: None,
            category: Some("  Personal ".into()),
        };
        assert_eq!(template.category_label(), Some("Personal"));
    }

    #[test]
    fn display_label_falls_back_to_email() {
        let mut user = User {
            id: "u1".into(),
            email: "ada@example.com".into(),
            name: Some(" ".into()),
        };
        assert_eq!(user.display_label(), "ada@example.com");
        user.name = Some("Ada".into());
        assert_eq!(user.display_label(), "Ada");
    }

    #[test]
    fn templates_from_dtos_skips_missing_ids() {
        let dtos = vec![
            TemplateDto {
                id: Some("1".into()),
                ..TemplateDto::default()
            },
            TemplateDto::default(),
        ];
        let templates = templates_from_dtos("GET /templates", dtos);
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].id, "1");
    }
}
