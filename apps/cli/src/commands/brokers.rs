//! Broker invitation commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use escrow_api::{BrokerFilters, BrokerInvite};

/// List broker representations on an escrow.
pub async fn brokers_list(ctx: &Context, escrow_id: i64, filters: BrokerFilters) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/brokers")).await?;
    let brokers = ctx.api.list_brokers(escrow_id, &filters).await?;

    match ctx.format {
        OutputFormat::Text => {
            if brokers.is_empty() {
                println!("No brokers found");
                return Ok(());
            }
            println!("{:<8} {:<14} {:<10} {}", "ID", "Invited as", "Status", "Email");
            println!("{}", "-".repeat(70));
            for broker in &brokers {
                println!(
                    "{:<8} {:<14} {:<10} {}",
                    broker.id, broker.invited_as, broker.status, broker.invited_email
                );
            }
        }
        OutputFormat::Json => output::print_json(&brokers)?,
    }

    Ok(())
}

/// Invite a broker to an escrow.
pub async fn brokers_invite(ctx: &Context, escrow_id: i64, invite: BrokerInvite) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/brokers")).await?;
    let created = ctx.api.invite_broker(escrow_id, &invite).await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("Invitation sent to {} ({})", created.invited_email, created.id),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&created)?,
    }

    Ok(())
}

/// Accept or decline a broker invitation.
pub async fn brokers_respond(
    ctx: &Context,
    escrow_id: i64,
    broker_id: i64,
    status: &str,
) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/brokers")).await?;
    let updated = ctx
        .api
        .respond_to_invitation(escrow_id, broker_id, status)
        .await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("Invitation {} is now {}", updated.id, updated.status),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&updated)?,
    }

    Ok(())
}
