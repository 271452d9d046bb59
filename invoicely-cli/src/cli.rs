use std::{path::PathBuf, str::FromStr};

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use invoicely::{
    ClientStatus, InvoiceStatus, LineItem, LineItemBuilder,
    pdf::DEFAULT_WEBDRIVER_URL,
    settings::{LogoPosition, Side, Theme},
};

#[derive(Debug, Parser)]
#[command(name = "invoicely", version, about = "Manage clients and invoices, export invoices as PDF")]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "INVOICELY_DB", default_value = "invoicely.db")]
    pub db: PathBuf,

    /// Directory where uploaded assets such as the logo are kept
    #[arg(long, env = "INVOICELY_UPLOADS", default_value = "uploads")]
    pub uploads: PathBuf,

    /// WebDriver endpoint used to print PDFs
    #[arg(long, env = "INVOICELY_WEBDRIVER", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage clients
    #[command(subcommand)]
    Client(ClientCommand),

    /// Manage invoices
    #[command(subcommand)]
    Invoice(InvoiceCommand),

    /// Show or change application settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Store an image as the business logo
    Logo { path: PathBuf },

    /// Summary counts and recent activity
    Dashboard,

    /// Delete every client, invoice and setting
    Reset {
        /// Must be exactly "Delete all content and reset"
        #[arg(long)]
        confirm: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ClientCommand {
    Add {
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        #[arg(long, default_value = "")]
        address: String,
    },
    List {
        /// Only clients whose name or email contains this text
        #[arg(long)]
        search: Option<String>,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long, value_parser = parse_client_status)]
        status: Option<ClientStatus>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct InvoiceFields {
    /// Id of the client to bill
    #[arg(long)]
    pub client: Option<String>,

    /// Line item as DESCRIPTION:QUANTITY:PRICE, repeatable. Replaces all items when editing.
    #[arg(long = "item", value_parser = parse_line_item)]
    pub items: Vec<LineItem>,

    /// Issue date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Due date, YYYY-MM-DD
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub tax_label: Option<String>,

    /// Tax rate in percent
    #[arg(long, value_parser = parse_decimal)]
    pub tax_rate: Option<BigDecimal>,
}

#[derive(Debug, Subcommand)]
pub enum InvoiceCommand {
    Create {
        #[command(flatten)]
        fields: InvoiceFields,

        /// Save as a draft instead of creating the invoice
        #[arg(long)]
        draft: bool,
    },
    List {
        /// Only invoices whose client name or id contains this text
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: String,

        /// Print the rendered HTML document instead of the record
        #[arg(long)]
        html: bool,
    },
    /// Change a draft invoice
    Edit {
        id: String,

        #[command(flatten)]
        fields: InvoiceFields,

        #[arg(long, value_parser = parse_invoice_status)]
        status: Option<InvoiceStatus>,
    },
    /// Mark an issued invoice as sent or paid
    Mark {
        id: String,
        #[arg(value_parser = parse_invoice_status)]
        status: InvoiceStatus,
    },
    Delete {
        id: String,
    },
    /// Print an invoice to PDF
    Export {
        id: String,

        /// File or directory to write the PDF to. Without it the PDF goes to stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    Set(SettingsFields),
}

#[derive(Debug, Args)]
pub struct SettingsFields {
    #[arg(long)]
    pub business_name: Option<String>,
    #[arg(long)]
    pub business_address: Option<String>,
    #[arg(long, value_parser = parse_theme)]
    pub theme: Option<Theme>,
    #[arg(long, value_parser = parse_logo_position)]
    pub logo_position: Option<LogoPosition>,
    #[arg(long, value_parser = parse_side)]
    pub client_position: Option<Side>,
    #[arg(long, value_parser = parse_side)]
    pub amount_position: Option<Side>,
    #[arg(long)]
    pub tax_label: Option<String>,
    #[arg(long, value_parser = parse_decimal)]
    pub tax_rate: Option<BigDecimal>,
    #[arg(long)]
    pub zoom: Option<f64>,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("'{s}': {e}"))
}

fn parse_decimal(s: &str) -> Result<BigDecimal, String> {
    BigDecimal::from_str(s.trim()).map_err(|e| format!("'{s}': {e}"))
}

fn parse_invoice_status(s: &str) -> Result<InvoiceStatus, String> {
    InvoiceStatus::from_str(s).map_err(|e| e.to_string())
}

fn parse_client_status(s: &str) -> Result<ClientStatus, String> {
    ClientStatus::from_str(s).map_err(|e| e.to_string())
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    match s.to_ascii_lowercase().as_str() {
        "light" => Ok(Theme::Light),
        "dark" => Ok(Theme::Dark),
        _ => Err(format!("'{s}' is not one of light, dark")),
    }
}

fn parse_logo_position(s: &str) -> Result<LogoPosition, String> {
    match s.to_ascii_lowercase().as_str() {
        "left" => Ok(LogoPosition::Left),
        "right" => Ok(LogoPosition::Right),
        "center" => Ok(LogoPosition::Center),
        _ => Err(format!("'{s}' is not one of left, right, center")),
    }
}

fn parse_side(s: &str) -> Result<Side, String> {
    match s.to_ascii_lowercase().as_str() {
        "left" => Ok(Side::Left),
        "right" => Ok(Side::Right),
        _ => Err(format!("'{s}' is not one of left, right")),
    }
}

/// `DESCRIPTION:QUANTITY:PRICE`. The description may itself contain colons.
fn parse_line_item(s: &str) -> Result<LineItem, String> {
    let mut parts = s.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(description)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("'{s}' is not DESCRIPTION:QUANTITY:PRICE"));
    };
    let quantity: i32 = quantity
        .trim()
        .parse()
        .map_err(|e| format!("quantity '{quantity}': {e}"))?;
    LineItemBuilder::default()
        .description(description.trim())
        .quantity(quantity)
        .price(parse_decimal(price)?)
        .build()
        .map_err(|e| e.to_string())
}
