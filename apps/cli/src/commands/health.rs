use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;

/// Check backend health. Needs no session.
pub async fn health(ctx: &Context) -> Result<()> {
    let status = ctx.api.health().await?;

    match ctx.format {
        OutputFormat::Text => println!("API:      {}", status.status),
        OutputFormat::Json => output::print_json(&status)?,
    }

    Ok(())
}
