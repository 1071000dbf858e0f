//! Party commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{bail, Result};
use escrow_api::{NewParty, PartyUpdate};

/// List parties on an escrow.
pub async fn parties_list(ctx: &Context, escrow_id: i64, role: Option<&str>) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/parties")).await?;
    let parties = ctx.api.list_parties(escrow_id, role).await?;

    match ctx.format {
        OutputFormat::Text => {
            if parties.is_empty() {
                println!("No parties found");
                return Ok(());
            }
            println!("{:<8} {:<10} {:<28} {}", "ID", "Role", "Name", "Email");
            println!("{}", "-".repeat(80));
            for party in &parties {
                println!(
                    "{:<8} {:<10} {:<28} {}",
                    party.id, party.role, party.name, party.email
                );
            }
        }
        OutputFormat::Json => output::print_json(&parties)?,
    }

    Ok(())
}

/// Add a party to an escrow.
pub async fn parties_add(ctx: &Context, escrow_id: i64, party: NewParty) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/parties")).await?;
    let created = ctx.api.create_party(escrow_id, &party).await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("Party added: {} ({})", created.id, created.role),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&created)?,
    }

    Ok(())
}

/// Change a party's details.
pub async fn parties_update(
    ctx: &Context,
    escrow_id: i64,
    party_id: i64,
    update: PartyUpdate,
) -> Result<()> {
    if update.name.is_none() && update.email.is_none() && update.role.is_none() {
        bail!("Nothing to update. Pass --name, --email or --role");
    }

    ctx.require_login(&format!("/escrows/{escrow_id}/parties")).await?;
    let updated = ctx.api.update_party(escrow_id, party_id, &update).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_success(&format!("Party updated: {}", updated.id), &ctx.format)
        }
        OutputFormat::Json => output::print_json(&updated)?,
    }

    Ok(())
}

/// Remove a party from an escrow.
pub async fn parties_remove(ctx: &Context, escrow_id: i64, party_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/parties")).await?;
    ctx.api.delete_party(escrow_id, party_id).await?;
    output::print_success(&format!("Party removed: {}", party_id), &ctx.format);
    Ok(())
}
