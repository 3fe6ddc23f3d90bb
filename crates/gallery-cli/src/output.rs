//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use gallery_core::{Favorite, FilterSummary, Template, ThemeMode, ToggleOutcome, User};
use serde::Serialize;
use serde_json::json;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const NAME_WIDTH: usize = 28;

/// Print `value` as pretty JSON.
fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_template_list(
    templates: &[Template],
    summary: FilterSummary,
    favorites: &[Favorite],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "templates": templates,
            "favorites": favorites.iter().map(|fav| fav.id.as_str()).collect::<Vec<_>>(),
            "summary": summary,
        })),
        OutputFormat::Table => {
            println!("{}", summary.describe());
            if templates.is_empty() {
                println!("No templates found");
                return Ok(());
            }
            println!("{:<24} {:<3} {:<NAME_WIDTH$} CATEGORY", "ID", "FAV", "NAME");
            for template in templates {
                let starred = favorites.iter().any(|fav| fav.id == template.id);
                println!(
                    "{:<24} {:<3} {:<NAME_WIDTH$} {}",
                    template.id,
                    if starred { "*" } else { "" },
                    truncate(&template.name, NAME_WIDTH),
                    template.category_label().unwrap_or("-")
                );
            }
            Ok(())
        }
    }
}

pub(crate) fn render_template_detail(template: &Template, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(template),
        OutputFormat::Table => {
            println!("id: {}", template.id);
            println!("name: {}", template.name);
            if let Some(category) = template.category_label() {
                println!("category: {category}");
            }
            if let Some(url) = &template.thumbnail_url {
                println!("thumbnail: {url}");
            }
            if !template.description.is_empty() {
                println!("description: {}", template.description);
            }
            Ok(())
        }
    }
}

pub(crate) fn render_categories(categories: &[String], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(categories),
        OutputFormat::Table => {
            for category in categories {
                println!("{category}");
            }
            Ok(())
        }
    }
}

pub(crate) fn render_favorites(favorites: &[Favorite], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(favorites),
        OutputFormat::Table => {
            if favorites.is_empty() {
                println!("No favorites yet");
                return Ok(());
            }
            println!("{:<24} NAME", "ID");
            for favorite in favorites {
                let name = favorite
                    .template
                    .as_ref()
                    .map_or("<not in catalog>", |template| template.name.as_str());
                println!("{:<24} {name}", favorite.id);
            }
            Ok(())
        }
    }
}

pub(crate) fn render_toggle(id: &str, outcome: ToggleOutcome, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({"id": id, "outcome": outcome})),
        OutputFormat::Table => {
            println!("{}", toggle_message(id, outcome));
            Ok(())
        }
    }
}

pub(crate) fn render_user(user: Option<&User>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({"user": user})),
        OutputFormat::Table => {
            let Some(user) = user else {
                println!("not logged in");
                return Ok(());
            };
            println!("{} <{}> (id: {})", user.display_label(), user.email, user.id);
            Ok(())
        }
    }
}

pub(crate) fn render_theme(theme: ThemeMode, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => print_json(&json!({"theme": theme, "is_dark": theme == ThemeMode::Dark})),
        OutputFormat::Table => {
            println!("theme: {theme}");
            Ok(())
        }
    }
}

#[must_use]
pub(crate) fn toggle_message(id: &str, outcome: ToggleOutcome) -> String {
    match outcome {
        ToggleOutcome::Added => format!("Added {id} to favorites"),
        ToggleOutcome::Removed => format!("Removed {id} from favorites"),
        ToggleOutcome::Ignored => format!("A change to {id} is already in progress"),
    }
}

#[must_use]
pub(crate) fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let mut shortened: String = value.chars().take(width.saturating_sub(1)).collect();
    shortened.push('…');
    shortened
}
