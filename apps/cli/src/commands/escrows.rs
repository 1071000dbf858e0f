//! Escrow commands.

use super::{read_upload, Context};
use crate::output::{self, or_dash, OutputFormat};
use anyhow::Result;
use clap::Args;
use escrow_api::{AgreementFile, Escrow, NewEscrow};
use std::path::PathBuf;

/// Fields for a new escrow.
#[derive(Debug, Args)]
pub struct EscrowDraft {
    /// Escrow name
    #[arg(long)]
    pub name: String,
    /// Your role in the transaction (BUYER, SELLER, BROKER)
    #[arg(long)]
    pub role: String,
    /// Currency code
    #[arg(long, default_value = "USD")]
    pub currency: String,
    /// Transaction type
    #[arg(long, default_value = "SALE")]
    pub transaction_type: String,
    /// Property type
    #[arg(long, default_value = "RESIDENTIAL")]
    pub property_type: String,
    /// Property value as a decimal string
    #[arg(long)]
    pub value: String,
    /// Closing date (YYYY-MM-DD)
    #[arg(long)]
    pub closing_date: String,
    /// Property address
    #[arg(long)]
    pub address: String,
    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,
    /// Commission percentage
    #[arg(long)]
    pub commission_percentage: Option<String>,
    /// Who pays the commission
    #[arg(long)]
    pub commission_payer: Option<String>,
    /// Due diligence period in days
    #[arg(long)]
    pub due_diligence_days: Option<u32>,
    /// Retention amount
    #[arg(long)]
    pub retention_amount: Option<String>,
    /// Signed agreement to attach
    #[arg(long)]
    pub agreement: Option<PathBuf>,
}

impl EscrowDraft {
    fn into_payload(self) -> Result<NewEscrow> {
        let agreement_upload = match &self.agreement {
            Some(path) => {
                let (file_name, content_type, data) = read_upload(path)?;
                Some(AgreementFile {
                    file_name,
                    content_type,
                    data,
                })
            }
            None => None,
        };

        Ok(NewEscrow {
            name: self.name,
            description: self.description,
            participant_role: self.role,
            currency: self.currency,
            transaction_type: self.transaction_type,
            property_type: self.property_type,
            property_value: self.value,
            closing_date: self.closing_date,
            property_address: self.address,
            commission_percentage: self.commission_percentage,
            commission_payer: self.commission_payer,
            due_diligence_days: self.due_diligence_days,
            retention_amount: self.retention_amount,
            agreement_upload,
            ..Default::default()
        })
    }
}

/// List escrows.
pub async fn escrows_list(ctx: &Context, status: Option<&str>) -> Result<()> {
    ctx.require_login("/escrows").await?;
    let page = ctx.api.list_escrows(status).await?;

    match ctx.format {
        OutputFormat::Text => {
            if page.results.is_empty() {
                println!("No escrows found");
                return Ok(());
            }
            println!("{:<8} {:<32} {:<12} {:<16} {}", "ID", "Name", "Status", "Value", "Closing");
            println!("{}", "-".repeat(90));
            for escrow in &page.results {
                println!(
                    "{:<8} {:<32} {:<12} {:<16} {}",
                    escrow.id,
                    escrow.name,
                    escrow.status,
                    format!("{} {}", escrow.property_value, escrow.currency),
                    or_dash(escrow.closing_date.as_deref())
                );
            }
            if page.next.is_some() {
                println!("\nShowing {} of {} escrows", page.results.len(), page.count);
            }
        }
        OutputFormat::Json => output::print_json(&page)?,
    }

    Ok(())
}

/// Show escrow details.
pub async fn escrows_show(ctx: &Context, escrow_id: i64) -> Result<()> {
    ctx.require_login(&format!("/escrows/{escrow_id}")).await?;
    let escrow = ctx.api.get_escrow(escrow_id).await?;

    match ctx.format {
        OutputFormat::Text => print_escrow(&escrow),
        OutputFormat::Json => output::print_json(&escrow)?,
    }

    Ok(())
}

/// Create an escrow.
pub async fn escrows_create(ctx: &Context, draft: EscrowDraft) -> Result<()> {
    ctx.require_login("/escrows/new").await?;
    let payload = draft.into_payload()?;
    let escrow = ctx.api.create_escrow(&payload).await?;

    match ctx.format {
        OutputFormat::Text => {
            output::print_success(&format!("Escrow created: {}", escrow.id), &ctx.format)
        }
        OutputFormat::Json => output::print_json(&escrow)?,
    }

    Ok(())
}

fn print_escrow(escrow: &Escrow) {
    output::print_heading(&format!("Escrow {}: {}", escrow.id, escrow.name));
    output::print_row("Status", &escrow.status);
    output::print_row("Your role", &escrow.participant_role);
    output::print_row("Transaction", &escrow.transaction_type);
    output::print_row("Property", &escrow.property_type);
    output::print_row("Address", &escrow.property_address);
    output::print_row(
        "Value",
        &format!("{} {}", escrow.property_value, escrow.currency),
    );
    output::print_row("Closing", or_dash(escrow.closing_date.as_deref()));
    output::print_row("Commission", or_dash(escrow.commission_percentage.as_deref()));
    output::print_row("Created by", &escrow.created_by.email);
    if !escrow.description.is_empty() {
        output::print_row("Description", &escrow.description);
    }

    if !escrow.parties.is_empty() {
        output::print_heading("Parties");
        for party in &escrow.parties {
            println!("  {:<6} {:<10} {} <{}>", party.id, party.role, party.name, party.email);
        }
    }

    if !escrow.broker_representations.is_empty() {
        output::print_heading("Brokers");
        for broker in &escrow.broker_representations {
            println!(
                "  {:<6} {:<14} {:<10} {}",
                broker.id, broker.invited_as, broker.status, broker.invited_email
            );
        }
    }

    if let Some(pool) = &escrow.commission_pool {
        output::print_heading("Commission pool");
        output::print_row("Total", &pool.total_amount);
        output::print_row("Locked", if pool.locked { "yes" } else { "no" });
    }
}
