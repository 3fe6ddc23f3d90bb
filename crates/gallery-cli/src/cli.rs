//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gallery_core::{AppEvent, DEFAULT_BASE_URL};
use gallery_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, command_span};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult, ConnectionSettings, default_state_file};
use crate::commands::auth::{handle_login, handle_logout, handle_register, handle_whoami};
use crate::commands::favorites::{handle_favorites_list, handle_favorites_toggle};
use crate::commands::templates::{handle_categories, handle_templates_list, handle_templates_show};
use crate::commands::theme::handle_theme;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command, and reports any
/// forced logout. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    if let Err(err) = gallery_telemetry::init_logging(&LoggingConfig {
        level: cli.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
        format: LogFormat::from_name(cli.log_format.as_deref()),
        build_sha: build_sha(),
    }) {
        eprintln!("warning: logging disabled: {err:#}");
    }

    let command_name = command_label(&cli.command);
    let trace_id = Uuid::new_v4().to_string();
    let settings = ConnectionSettings {
        api_url: cli.api_url.clone(),
        timeout_secs: cli.timeout,
        state_file: cli.state_file.clone().unwrap_or_else(default_state_file),
    };
    let ctx = match AppContext::connect(&settings, &trace_id) {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let mut events = ctx.gallery.events().subscribe();
    let result = dispatch(cli, &ctx)
        .instrument(command_span(command_name, &trace_id))
        .await;
    let login_required = events
        .drain()
        .iter()
        .any(|envelope| matches!(envelope.event, AppEvent::LoginRequired { .. }));

    match settle(result, login_required) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// Fold a forced logout into the command result. Rejected credentials keep
/// their own message.
fn settle(result: CliResult<()>, login_required: bool) -> CliResult<()> {
    match result {
        Err(err) if login_required && !matches!(err, CliError::Validation(_)) => {
            Err(CliError::SessionExpired)
        }
        Ok(()) if login_required => {
            eprintln!("note: you have been signed out; run `gallery login` to continue");
            Ok(())
        }
        other => other,
    }
}

async fn dispatch(cli: Cli, ctx: &AppContext) -> CliResult<()> {
    let format = cli.output;
    match cli.command {
        Command::Login(args) => handle_login(ctx, args, format).await,
        Command::Register(args) => handle_register(ctx, args, format).await,
        Command::Logout => handle_logout(ctx).await,
        Command::Whoami => handle_whoami(ctx, format),
        Command::Templates(TemplatesCommand::Ls(args)) => {
            handle_templates_list(ctx, &args, format).await
        }
        Command::Templates(TemplatesCommand::Show(args)) => {
            handle_templates_show(ctx, &args.id, format).await
        }
        Command::Categories => handle_categories(ctx, format).await,
        Command::Favorites(FavoritesCommand::Ls) => handle_favorites_list(ctx, format).await,
        Command::Favorites(FavoritesCommand::Toggle(args)) => {
            handle_favorites_toggle(ctx, &args, format).await
        }
        Command::Theme(args) => handle_theme(ctx, args.action, format),
    }
}

#[derive(Parser)]
#[command(name = "gallery", about = "Browse and favorite templates from a gallery server")]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "GALLERY_API_URL",
        default_value = DEFAULT_BASE_URL
    )]
    api_url: String,
    #[arg(
        long,
        global = true,
        env = "GALLERY_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long,
        global = true,
        env = "GALLERY_STATE_FILE",
        help = "File holding the saved session and theme"
    )]
    state_file: Option<PathBuf>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, env = "GALLERY_LOG")]
    log_level: Option<String>,
    #[arg(long, global = true, env = "GALLERY_LOG_FORMAT", help = "json or pretty")]
    log_format: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sign in with email and password.
    Login(LoginArgs),
    /// Create an account and sign in.
    Register(RegisterArgs),
    /// End the current session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    #[command(subcommand)]
    Templates(TemplatesCommand),
    /// List the categories present in the catalog.
    Categories,
    #[command(subcommand)]
    Favorites(FavoritesCommand),
    /// Show or change the color theme.
    Theme(ThemeArgs),
}

/// Browse the template catalog.
#[derive(Subcommand)]
pub(crate) enum TemplatesCommand {
    /// List templates, optionally filtered.
    Ls(TemplateListArgs),
    /// Show one template.
    Show(TemplateIdArgs),
}

/// Manage favorites for the signed-in user.
#[derive(Subcommand)]
pub(crate) enum FavoritesCommand {
    /// List favorites.
    Ls,
    /// Add or remove a template from favorites.
    Toggle(FavoriteToggleArgs),
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, env = "GALLERY_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct RegisterArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, help = "Optional display name")]
    pub(crate) name: Option<String>,
    #[arg(long, env = "GALLERY_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args, Default)]
pub(crate) struct TemplateListArgs {
    #[arg(long, short, help = "Match against name and description")]
    pub(crate) query: Option<String>,
    #[arg(long, short, help = "Exact category to show")]
    pub(crate) category: Option<String>,
}

#[derive(Args)]
pub(crate) struct TemplateIdArgs {
    #[arg(help = "Template identifier")]
    pub(crate) id: String,
}

#[derive(Args)]
pub(crate) struct FavoriteToggleArgs {
    #[arg(help = "Template identifier")]
    pub(crate) id: String,
    #[arg(long, help = "Skip reloading favorites from the server afterwards")]
    pub(crate) no_reload: bool,
}

#[derive(Args)]
pub(crate) struct ThemeArgs {
    #[arg(value_enum, default_value_t = ThemeAction::Show)]
    pub(crate) action: ThemeAction,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum ThemeAction {
    #[default]
    Show,
    Toggle,
    Dark,
    Light,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

pub(crate) const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Register(_) => "register",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Templates(TemplatesCommand::Ls(_)) => "templates_ls",
        Command::Templates(TemplatesCommand::Show(_)) => "templates_show",
        Command::Categories => "categories",
        Command::Favorites(FavoritesCommand::Ls) => "favorites_ls",
        Command::Favorites(FavoritesCommand::Toggle(_)) => "favorites_toggle",
        Command::Theme(args) => match args.action {
            ThemeAction::Show => "theme_show",
            ThemeAction::Toggle => "theme_toggle",
            ThemeAction::Dark => "theme_dark",
            ThemeAction::Light => "theme_light",
        },
    }
}
