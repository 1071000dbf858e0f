//! Commission pool commands.

use super::Context;
use crate::output::{self, or_dash, OutputFormat};
use anyhow::{bail, Context as _, Result};
use escrow_api::{CommissionPool, CommissionPoolUpdate, CommissionShare};

/// Show the commission pool.
pub async fn commission_show(ctx: &Context, escrow_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/commission")).await?;
    let pool = ctx.api.get_commission_pool(escrow_id).await?;

    match ctx.format {
        OutputFormat::Text => print_pool(&pool),
        OutputFormat::Json => output::print_json(&pool)?,
    }

    Ok(())
}

/// Update the pool total and/or its shares.
///
/// Shares are given as `BROKER_REPRESENTATION_ID=AMOUNT`.
pub async fn commission_update(
    ctx: &Context,
    escrow_id: i64,
    total: Option<String>,
    shares: &[String],
) -> Result<()> {
    let shares = shares
        .iter()
        .map(|share| parse_share(share))
        .collect::<Result<Vec<_>>>()?;

    if total.is_none() && shares.is_empty() {
        bail!("Nothing to update. Pass --total or --share");
    }

    let update = CommissionPoolUpdate {
        total_amount: total,
        shares: (!shares.is_empty()).then_some(shares),
    };

    ctx.require_login(&format!("/escrows/{escrow_id}/commission")).await?;
    let pool = ctx.api.update_commission_pool(escrow_id, &update).await?;

    match ctx.format {
        OutputFormat::Text => print_pool(&pool),
        OutputFormat::Json => output::print_json(&pool)?,
    }

    Ok(())
}

/// Lock the commission pool.
pub async fn commission_lock(ctx: &Context, escrow_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/commission")).await?;
    let pool = ctx.api.lock_commission_pool(escrow_id).await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("Commission pool locked at {}", or_dash(pool.locked_at.as_deref())),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&pool)?,
    }

    Ok(())
}

fn parse_share(raw: &str) -> Result<CommissionShare> {
    let (id, amount) = raw
        .split_once('=')
        .with_context(|| format!("Invalid share '{}', expected ID=AMOUNT", raw))?;

    let broker_representation = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid broker representation id '{}'", id))?;

    let amount = amount.trim();
    if amount.is_empty() {
        bail!("Missing amount in share '{}'", raw);
    }

    Ok(CommissionShare {
        id: None,
        broker_representation,
        amount: amount.to_string(),
    })
}

fn print_pool(pool: &CommissionPool) {
    output::print_heading(&format!("Commission pool for escrow {}", pool.escrow));
    output::print_row("Total", &pool.total_amount);
    output::print_row("Locked", if pool.locked { "yes" } else { "no" });
    output::print_row("Locked at", or_dash(pool.locked_at.as_deref()));

    if !pool.shares.is_empty() {
        println!();
        println!("  {:<12} {}", "Broker rep", "Amount");
        for share in &pool.shares {
            println!("  {:<12} {}", share.broker_representation, share.amount);
        }
    }
}
