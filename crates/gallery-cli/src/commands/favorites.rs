use crate::cli::{FavoriteToggleArgs, OutputFormat};
use crate::client::{AppContext, CliResult, require_session};
use crate::output::{render_favorites, render_toggle};

pub(crate) async fn handle_favorites_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    require_session(ctx)?;
    // Names come from the catalog, so load it first.
    ctx.gallery.refresh_catalog().await?;
    let favorites = ctx.gallery.refresh_favorites().await?;
    render_favorites(&favorites, format)
}

pub(crate) async fn handle_favorites_toggle(
    ctx: &AppContext,
    args: &FavoriteToggleArgs,
    format: OutputFormat,
) -> CliResult<()> {
    require_session(ctx)?;
    ctx.gallery.refresh_catalog().await?;
    ctx.gallery.refresh_favorites().await?;
    let id = args.id.as_str();
    let outcome = if args.no_reload {
        ctx.gallery.toggle_favorite(id).await?
    } else {
        ctx.gallery.toggle_and_refresh(id).await?
    };
    tracing::info!(template_id = %id, ?outcome, "favorite toggled");
    render_toggle(id, outcome, format)
}
