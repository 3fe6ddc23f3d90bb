use std::io::{self, IsTerminal};

use anyhow::anyhow;
use gallery_core::{LoginForm, RegistrationForm};

use crate::cli::{LoginArgs, OutputFormat, RegisterArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_user;

pub(crate) async fn handle_login(
    ctx: &AppContext,
    args: LoginArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let form = LoginForm {
        email: args.email,
        password: resolve_password(args.password, false)?,
    };
    let user = ctx.gallery.login(&form).await?;
    tracing::info!(user_id = %user.id, "signed in");
    render_user(Some(&user), format)
}

pub(crate) async fn handle_register(
    ctx: &AppContext,
    args: RegisterArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let password = resolve_password(args.password, true)?;
    let form = RegistrationForm {
        name: args.name.unwrap_or_default(),
        email: args.email,
        confirm_password: password.clone(),
        password,
    };
    let user = ctx.gallery.register(&form).await?;
    tracing::info!(user_id = %user.id, "account created");
    render_user(Some(&user), format)
}

pub(crate) async fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    if !ctx.gallery.session().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }
    ctx.gallery.logout().await;
    println!("Signed out.");
    Ok(())
}

pub(crate) fn handle_whoami(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let user = ctx.gallery.session().current_user();
    render_user(user.as_ref(), format)
}

/// Use the flag value when given, otherwise prompt on a terminal. Registration
/// prompts twice and refuses a mismatch.
fn resolve_password(flag: Option<String>, confirm: bool) -> CliResult<String> {
    if let Some(value) = flag {
        return Ok(value);
    }

    if !io::stdin().is_terminal() {
        return Err(CliError::validation(
            "password required; supply via --password when running non-interactively",
        ));
    }
    let password = prompt("Password: ")?;
    if confirm && prompt("Confirm password: ")? != password {
        return Err(CliError::validation("Passwords do not match"));
    }
    Ok(password)
}

fn prompt(label: &str) -> CliResult<String> {
    rpassword::prompt_password(label)
        .map_err(|err| CliError::failure(anyhow!("failed to read password from stdin: {err}")))
}
