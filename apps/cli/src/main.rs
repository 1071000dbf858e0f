//! Escrow CLI - Command-line client for the escrow backend.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, EscrowDraft};
use escrow_api::{BrokerFilters, BrokerInvite, NewParty, PartyUpdate};
use escrow_auth::ClientError;
use escrow_config::{init_logging, Config, Paths};
use std::path::PathBuf;
use tracing::debug;

/// Escrow CLI - Manage escrows, parties, brokers, documents and KYC.
#[derive(Parser)]
#[command(name = "escrow")]
#[command(about = "Escrow CLI for authentication and escrow management")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Keep the session in memory only; nothing is written to disk
    #[arg(long, global = true)]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Login with email and password
    Login {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Logout and clear session
    Logout,

    /// Check authentication status
    Status,

    /// Check backend health
    Health,

    /// Manage escrows
    Escrows {
        #[command(subcommand)]
        command: EscrowCommands,
    },

    /// Manage escrow parties
    Parties {
        #[command(subcommand)]
        command: PartyCommands,
    },

    /// Manage broker invitations
    Brokers {
        #[command(subcommand)]
        command: BrokerCommands,
    },

    /// Manage the commission pool
    Commission {
        #[command(subcommand)]
        command: CommissionCommands,
    },

    /// Manage escrow documents
    Documents {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Manage KYC records and AML checks
    Kyc {
        #[command(subcommand)]
        command: KycCommands,
    },
}

#[derive(Subcommand)]
enum EscrowCommands {
    /// List escrows
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Show escrow details
    Show {
        /// Escrow ID
        id: i64,
    },
    /// Create a new escrow
    Create(EscrowDraft),
}

#[derive(Subcommand)]
enum PartyCommands {
    /// List parties
    List {
        /// Escrow ID
        escrow: i64,
        /// Filter by role
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Add a party
    Add {
        /// Escrow ID
        escrow: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// BUYER, SELLER or BROKER
        #[arg(long)]
        role: String,
    },
    /// Update a party
    Update {
        /// Escrow ID
        escrow: i64,
        /// Party ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        role: Option<String>,
    },
    /// Remove a party
    Remove {
        /// Escrow ID
        escrow: i64,
        /// Party ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum BrokerCommands {
    /// List broker representations
    List {
        /// Escrow ID
        escrow: i64,
        /// Filter by invitation type
        #[arg(long)]
        invited_as: Option<String>,
        /// Filter by invitation status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Invite a broker
    Invite {
        /// Escrow ID
        escrow: i64,
        /// Broker email
        #[arg(long)]
        email: String,
        /// CO_BROKER or LISTING
        #[arg(long, default_value = "CO_BROKER")]
        invited_as: String,
    },
    /// Accept or decline an invitation
    Respond {
        /// Escrow ID
        escrow: i64,
        /// Broker representation ID
        id: i64,
        /// New status, e.g. ACCEPTED or DECLINED
        #[arg(long)]
        status: String,
    },
}

#[derive(Subcommand)]
enum CommissionCommands {
    /// Show the commission pool
    Show {
        /// Escrow ID
        escrow: i64,
    },
    /// Update the pool total or shares
    Update {
        /// Escrow ID
        escrow: i64,
        /// New total amount
        #[arg(long)]
        total: Option<String>,
        /// Share as BROKER_REPRESENTATION_ID=AMOUNT (repeatable)
        #[arg(long = "share")]
        shares: Vec<String>,
    },
    /// Lock the pool
    Lock {
        /// Escrow ID
        escrow: i64,
    },
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// List documents
    List {
        /// Escrow ID
        escrow: i64,
    },
    /// Upload a file
    Upload {
        /// Escrow ID
        escrow: i64,
        /// File to upload
        path: PathBuf,
        /// Document name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Document type
        #[arg(long = "type", default_value = "OTHER")]
        document_type: String,
        /// Upload into an existing document instead of creating one
        #[arg(long)]
        document: Option<i64>,
    },
    /// Request signatures for a document
    Envelope {
        /// Escrow ID
        escrow: i64,
        /// Document ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum KycCommands {
    /// List KYC records
    List {
        /// Escrow ID
        escrow: i64,
    },
    /// Create a KYC record
    Create {
        /// Escrow ID
        escrow: i64,
        /// Subject's full name
        #[arg(long)]
        name: String,
        /// Subject's email
        #[arg(long)]
        email: Option<String>,
        /// Checklist as a JSON object
        #[arg(long)]
        checklist: Option<String>,
    },
    /// Run AML screening for a record
    RunAml {
        /// Escrow ID
        escrow: i64,
        /// KYC record ID
        record: i64,
    },
    /// Request an AML check from a provider
    AmlCheck {
        /// Escrow ID
        escrow: i64,
        /// KYC record ID
        record: i64,
        /// Screening provider
        #[arg(long)]
        provider: String,
    },
}

async fn run(ctx: &Context, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login { email } => commands::login(ctx, email).await,
        Commands::Logout => commands::logout(ctx).await,
        Commands::Status => commands::status(ctx).await,
        Commands::Health => commands::health(ctx).await,
        Commands::Escrows { command } => match command {
            EscrowCommands::List { status } => commands::escrows_list(ctx, status.as_deref()).await,
            EscrowCommands::Show { id } => commands::escrows_show(ctx, id).await,
            EscrowCommands::Create(draft) => commands::escrows_create(ctx, draft).await,
        },
        Commands::Parties { command } => match command {
            PartyCommands::List { escrow, role } => {
                commands::parties_list(ctx, escrow, role.as_deref()).await
            }
            PartyCommands::Add {
                escrow,
                name,
                email,
                role,
            } => commands::parties_add(ctx, escrow, NewParty { name, email, role }).await,
            PartyCommands::Update {
                escrow,
                id,
                name,
                email,
                role,
            } => commands::parties_update(ctx, escrow, id, PartyUpdate { name, email, role }).await,
            PartyCommands::Remove { escrow, id } => commands::parties_remove(ctx, escrow, id).await,
        },
        Commands::Brokers { command } => match command {
            BrokerCommands::List {
                escrow,
                invited_as,
                status,
            } => {
                let filters = BrokerFilters { invited_as, status };
                commands::brokers_list(ctx, escrow, filters).await
            }
            BrokerCommands::Invite {
                escrow,
                email,
                invited_as,
            } => {
                let invite = BrokerInvite {
                    invited_email: email,
                    invited_as,
                };
                commands::brokers_invite(ctx, escrow, invite).await
            }
            BrokerCommands::Respond { escrow, id, status } => {
                commands::brokers_respond(ctx, escrow, id, &status).await
            }
        },
        Commands::Commission { command } => match command {
            CommissionCommands::Show { escrow } => commands::commission_show(ctx, escrow).await,
            CommissionCommands::Update {
                escrow,
                total,
                shares,
            } => commands::commission_update(ctx, escrow, total, &shares).await,
            CommissionCommands::Lock { escrow } => commands::commission_lock(ctx, escrow).await,
        },
        Commands::Documents { command } => match command {
            DocumentCommands::List { escrow } => commands::documents_list(ctx, escrow).await,
            DocumentCommands::Upload {
                escrow,
                path,
                name,
                document_type,
                document,
            } => {
                commands::documents_upload(ctx, escrow, &path, name, &document_type, document)
                    .await
            }
            DocumentCommands::Envelope { escrow, id } => {
                commands::documents_envelope(ctx, escrow, id).await
            }
        },
        Commands::Kyc { command } => match command {
            KycCommands::List { escrow } => commands::kyc_list(ctx, escrow).await,
            KycCommands::Create {
                escrow,
                name,
                email,
                checklist,
            } => commands::kyc_create(ctx, escrow, name, email, checklist.as_deref()).await,
            KycCommands::RunAml { escrow, record } => {
                commands::kyc_run_aml(ctx, escrow, record).await
            }
            KycCommands::AmlCheck {
                escrow,
                record,
                provider,
            } => commands::kyc_aml_check(ctx, escrow, record, &provider).await,
        },
    }
}

fn report(error: &anyhow::Error, format: &output::OutputFormat) {
    match error.downcast_ref::<ClientError>() {
        Some(client_error) => match client_error.field_errors() {
            Some(fields) => output::print_field_errors(fields, format),
            None if client_error.requires_reauthentication() => output::print_error(
                "Session expired. Run `escrow login` to sign in again",
                format,
            ),
            None => output::print_error(&client_error.to_string(), format),
        },
        None => output::print_error(&format!("{:#}", error), format),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let paths = match Paths::new() {
        Ok(paths) => paths,
        Err(e) => {
            output::print_error(&e.to_string(), &cli.format);
            std::process::exit(1);
        }
    };

    let config = match Config::load(&paths) {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&format!("Invalid configuration: {}", e), &cli.format);
            std::process::exit(1);
        }
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging("cli", level, &paths, false);
    debug!(base_url = %config.api_base_url, ephemeral = cli.ephemeral, "Starting escrow CLI");

    let result = match Context::new(&paths, &config, cli.ephemeral, cli.format) {
        Ok(ctx) => run(&ctx, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        report(&e, &cli.format);
        std::process::exit(1);
    }
}
