use gallery_core::TemplateQuery;

use crate::cli::{OutputFormat, TemplateListArgs};
use crate::client::{AppContext, CliResult};
use crate::output::{render_categories, render_template_detail, render_template_list};

pub(crate) async fn handle_templates_list(
    ctx: &AppContext,
    args: &TemplateListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    ctx.gallery.refresh_catalog().await?;
    // Favorite marks are best effort; the catalog is still shown without them.
    let favorites = if ctx.gallery.session().is_authenticated() {
        match ctx.gallery.refresh_favorites().await {
            Ok(favorites) => favorites,
            Err(err) => {
                tracing::warn!(error = %err, "could not load favorites");
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };

    let query = TemplateQuery::new(args.query.as_deref(), args.category.as_deref());
    let (templates, summary) = ctx.gallery.search_with_summary(&query);
    render_template_list(&templates, summary, &favorites, format)
}

pub(crate) async fn handle_templates_show(
    ctx: &AppContext,
    id: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let template = ctx.gallery.fetch_template(id).await?;
    render_template_detail(&template, format)
}

pub(crate) async fn handle_categories(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    ctx.gallery.refresh_catalog().await?;
    render_categories(&ctx.gallery.categories(), format)
}
