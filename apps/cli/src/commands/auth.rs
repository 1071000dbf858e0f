//! Authentication commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use escrow_auth::{ClientError, SessionPhase};
use serde_json::json;
use std::io::{self, Write};

/// Login with email and password.
pub async fn login(ctx: &Context, email: Option<String>) -> Result<()> {
    let format = &ctx.format;

    if ctx.session.resolve().await {
        if let Some(user) = ctx.session.identity() {
            output::print_success(&format!("Already logged in as {}", user.email), format);
            return Ok(());
        }
    }

    let email = match email {
        Some(email) => email.trim().to_string(),
        None => {
            print!("Email: ");
            io::stdout().flush()?;
            let mut email = String::new();
            io::stdin().read_line(&mut email)?;
            email.trim().to_string()
        }
    };

    if email.is_empty() {
        output::print_error("Email is required", format);
        return Ok(());
    }

    // Read password without echo
    let password = rpassword::prompt_password("Password: ")?;

    if password.is_empty() {
        output::print_error("Password is required", format);
        return Ok(());
    }

    if *format == OutputFormat::Text {
        println!("Logging in...");
    }

    match ctx.session.login(&email, &password).await {
        Ok(user) => {
            output::print_success(
                &format!("Logged in as {} ({})", user.display_name(), user.role),
                format,
            );
            Ok(())
        }
        Err(ClientError::InvalidCredentials(message)) => {
            output::print_error(&format!("Login failed: {}", message), format);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Logout and clear session.
pub async fn logout(ctx: &Context) -> Result<()> {
    ctx.session.resolve().await;
    ctx.session.logout().await;
    output::print_success("Logged out successfully", &ctx.format);
    Ok(())
}

/// Check authentication status.
pub async fn status(ctx: &Context) -> Result<()> {
    ctx.session.resolve().await;
    let snapshot = ctx.session.snapshot();

    match ctx.format {
        OutputFormat::Text => match (&snapshot.user, snapshot.phase()) {
            (Some(user), SessionPhase::Authenticated) => {
                println!("Auth:     logged in");
                println!("User ID:  {}", user.id);
                println!("Email:    {}", user.email);
                println!("Name:     {}", user.display_name());
                println!("Role:     {}", user.role);
            }
            _ => println!("Auth:     not logged in"),
        },
        OutputFormat::Json => {
            let json = json!({
                "logged_in": snapshot.is_authenticated,
                "state": ctx.session.state(),
                "user": snapshot.user,
            });
            output::print_json(&json)?;
        }
    }

    Ok(())
}
