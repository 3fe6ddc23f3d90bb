use gallery_core::ThemeMode;

use crate::cli::{OutputFormat, ThemeAction};
use crate::client::{AppContext, CliResult};
use crate::output::render_theme;

pub(crate) fn handle_theme(
    ctx: &AppContext,
    action: ThemeAction,
    format: OutputFormat,
) -> CliResult<()> {
    let theme = match action {
        ThemeAction::Show => ctx.preferences.theme(),
        ThemeAction::Toggle => ctx.preferences.toggle_theme(),
        ThemeAction::Dark => {
            ctx.preferences.set_theme(ThemeMode::Dark);
            ThemeMode::Dark
        }
        ThemeAction::Light => {
            ctx.preferences.set_theme(ThemeMode::Light);
            ThemeMode::Light
        }
    };
    render_theme(theme, format)
}
