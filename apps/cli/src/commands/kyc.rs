//! KYC and AML commands.

use super::{Context, OFFICER_ROLES};
use crate::output::{self, or_dash, OutputFormat};
use anyhow::{Context as _, Result};
use escrow_api::NewKycRecord;
use escrow_auth::RouteGuard;
use serde_json::Value;

/// List KYC records on an escrow.
pub async fn kyc_list(ctx: &Context, escrow_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/kyc")).await?;
    let records = ctx.api.list_kyc(escrow_id).await?;

    match ctx.format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No KYC records found");
                return Ok(());
            }
            for record in &records {
                output::print_heading(&format!("Record {}: {}", record.id, record.subject_name));
                output::print_row("Email", or_dash(record.subject_email.as_deref()));
                output::print_row("Status", &record.status);
                if let Value::Object(items) = &record.checklist {
                    for (item, done) in items {
                        let mark = if done.as_bool().unwrap_or(false) { "x" } else { " " };
                        println!("  [{}] {}", mark, item);
                    }
                }
                for check in &record.aml_checks {
                    println!(
                        "  AML {} via {}: {} ({})",
                        check.id,
                        check.provider,
                        check.status,
                        or_dash(check.completed_at.as_deref())
                    );
                }
            }
        }
        OutputFormat::Json => output::print_json(&records)?,
    }

    Ok(())
}

/// Create a KYC record.
pub async fn kyc_create(
    ctx: &Context,
    escrow_id: i64,
    subject_name: String,
    subject_email: Option<String>,
    checklist: Option<&str>,
) -> Result<()> {
    let checklist = match checklist {
        Some(raw) => serde_json::from_str::<Value>(raw).context("Checklist must be valid JSON")?,
        None => Value::Object(Default::default()),
    };

    let record = NewKycRecord {
        subject_name,
        subject_email,
        status: "PENDING".to_string(),
        checklist,
    };

    ctx.require_login(&format!("/escrows/{escrow_id}/kyc")).await?;
    let created = ctx.api.create_kyc(escrow_id, &record).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_success(&format!("KYC record created: {}", created.id), &ctx.format)
        }
        OutputFormat::Json => output::print_json(&created)?,
    }

    Ok(())
}

/// Run the escrow's AML screening for a record.
pub async fn kyc_run_aml(ctx: &Context, escrow_id: i64, record_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}/kyc")).await?;
    let check = ctx.api.run_aml(escrow_id, record_id).await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("AML check {} is {}", check.id, check.status),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&check)?,
    }

    Ok(())
}

/// Record an AML check with a named provider. Compliance officers only.
pub async fn kyc_aml_check(
    ctx: &Context,
    escrow_id: i64,
    record_id: i64,
    provider: &str,
) -> Result<()> {
    let guard = RouteGuard::new().with_roles(OFFICER_ROLES);
    ctx.require(&guard, &format!("/escrows/{escrow_id}/kyc")).await?;
    let check = ctx
        .api
        .create_aml_check(escrow_id, record_id, provider)
        .await?;

    match ctx.format {
        OutputFormat::Text => output::print_success(
            &format!("AML check {} requested from {}", check.id, check.provider),
            &ctx.format,
        ),
        OutputFormat::Json => output::print_json(&check)?,
    }

    Ok(())
}
