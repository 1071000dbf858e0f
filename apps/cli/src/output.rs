//! Output formatting for the CLI.

use clap::ValueEnum;
use escrow_auth::FieldErrors;
use serde::Serialize;
use serde_json::json;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message.
pub fn print_success(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => println!("{}", message),
        OutputFormat::Json => {
            println!("{}", json!({ "status": "success", "message": message }));
        }
    }
}

/// Print an error message.
pub fn print_error(message: &str, format: &OutputFormat) {
    match format {
        OutputFormat::Text => eprintln!("Error: {}", message),
        OutputFormat::Json => {
            eprintln!("{}", json!({ "status": "error", "message": message }));
        }
    }
}

/// Print validation failures, one field per line.
pub fn print_field_errors(fields: &FieldErrors, format: &OutputFormat) {
    match format {
        OutputFormat::Text => {
            eprintln!("Error: the server rejected the request");
            for (field, messages) in fields {
                eprintln!("  {:<16} {}", format!("{}:", field), messages.join(" "));
            }
        }
        OutputFormat::Json => {
            eprintln!(
                "{}",
                json!({ "status": "error", "message": "validation failed", "fields": fields })
            );
        }
    }
}

/// Print a table row.
pub fn print_row(label: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", label), value);
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "-".repeat(50));
}

/// Print a heading.
pub fn print_heading(text: &str) {
    println!("\n{}", text);
    print_divider();
}

/// Placeholder for absent optional values.
pub fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}
