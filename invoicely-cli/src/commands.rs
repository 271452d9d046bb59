use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Child,
};

use chrono::Local;
use invoicely::{
    AddContext, ClientBuilder, InvoiceBuilder, InvoiceStatus, LayoutMode, PdfOptions, SaveDialog,
    Settings, SqliteStore, Workspace,
    assets::{asset_data_url, save_asset},
    dashboard::{DashboardStats, RECENT_ACTIVITY_LIMIT, recent_activity},
    export_document_to_pdf, generate_pdf,
    lifecycle::display_status,
    money::format_money,
    pdf::is_port_in_use,
    render_invoice, setup_template_env, start_chromedriver,
    workspace::RESET_CONFIRMATION,
};
use tracing::{info, warn};

use crate::cli::{ClientCommand, InvoiceCommand, InvoiceFields, SettingsCommand, SettingsFields};

pub type Ws = Workspace<SqliteStore>;

fn builder_error(e: impl std::fmt::Display) -> invoicely::Error {
    invoicely::Error::from(e.to_string())
}

pub fn client(ws: &mut Ws, command: ClientCommand) -> Result<(), invoicely::Error> {
    match command {
        ClientCommand::Add {
            name,
            email,
            address,
        } => {
            let client = ClientBuilder::default()
                .name(name)
                .email(email)
                .address(address)
                .build()
                .map_err(builder_error)?;
            let client = ws.add_client(client)?;
            println!("{}", client.id());
        }
        ClientCommand::List { search } => {
            let clients = match &search {
                Some(term) => ws.search_clients(term),
                None => ws.clients().iter().collect(),
            };
            for c in clients {
                println!("{}\t{}\t{}\t{}", c.id(), c.name(), c.email(), c.status());
            }
        }
        ClientCommand::Update {
            id,
            name,
            email,
            address,
            status,
        } => {
            let mut builder = ws
                .client(&id)
                .ok_or_else(|| invoicely::Error::not_found("client", &id))?
                .to_builder();
            if let Some(name) = name {
                builder = builder.name(name);
            }
            if let Some(email) = email {
                builder = builder.email(email);
            }
            if let Some(address) = address {
                builder = builder.address(address);
            }
            if let Some(status) = status {
                builder = builder.status(status);
            }
            ws.update_client(builder.build().map_err(builder_error)?)?;
        }
        ClientCommand::Delete { id } => ws.delete_client(&id)?,
    }
    Ok(())
}

fn apply_fields(mut builder: InvoiceBuilder, fields: InvoiceFields) -> InvoiceBuilder {
    if let Some(client) = fields.client {
        builder = builder.client_id(client);
    }
    if !fields.items.is_empty() {
        builder = builder.items(fields.items);
    }
    if let Some(date) = fields.date {
        builder = builder.date(date);
    }
    if let Some(due) = fields.due {
        builder = builder.due_date(due);
    }
    if let Some(label) = fields.tax_label {
        builder = builder.tax_label(label);
    }
    if let Some(rate) = fields.tax_rate {
        builder = builder.tax_rate(rate);
    }
    builder
}

/// Logo of the current settings as an embeddable image, if one is set and readable.
fn logo_src(settings: &Settings, uploads: &Path) -> Option<String> {
    if !settings.has_logo() {
        return None;
    }
    match asset_data_url(&settings.logo_url, uploads) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(error = %e, "logo could not be loaded, rendering without it");
            None
        }
    }
}

pub async fn invoice(
    ws: &mut Ws,
    command: InvoiceCommand,
    uploads: &Path,
    webdriver: &str,
) -> Result<(), invoicely::Error> {
    match command {
        InvoiceCommand::Create { fields, draft } => {
            let status = if draft {
                InvoiceStatus::Draft
            } else {
                InvoiceStatus::Created
            };
            let builder = InvoiceBuilder::default()
                .client_id("")
                .client_name("")
                .status(status)
                .tax_label(ws.settings().default_tax_label())
                .tax_rate(ws.settings().default_tax_rate());
            let invoice = apply_fields(builder, fields)
                .build()
                .map_err(builder_error)?;
            let invoice = ws.create_invoice(invoice)?;
            println!("{}", invoice.id());
        }
        InvoiceCommand::List { search } => {
            let today = Local::now().date_naive();
            let invoices = match &search {
                Some(term) => ws.search_invoices(term),
                None => ws.invoices().iter().collect(),
            };
            for i in invoices {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    i.id(),
                    i.date(),
                    i.due_date(),
                    i.client_name(),
                    display_status(i, today),
                    format_money(i.total())
                );
            }
        }
        InvoiceCommand::Show { id, html } => {
            if html {
                let doc = ws.document(&id, logo_src(ws.settings(), uploads))?;
                let env = setup_template_env()?;
                println!("{}", render_invoice(&env, &doc, LayoutMode::Screen)?);
            } else {
                let invoice = ws
                    .invoice(&id)
                    .ok_or_else(|| invoicely::Error::not_found("invoice", &id))?;
                println!("{}", serde_json::to_string_pretty(invoice)?);
            }
        }
        InvoiceCommand::Edit { id, fields, status } => {
            let mut builder = apply_fields(ws.edit_invoice(&id)?.to_builder(), fields);
            if let Some(status) = status {
                builder = builder.status(status);
            }
            let invoice = builder.build().map_err(builder_error)?;
            ws.save_invoice(invoice)?;
        }
        InvoiceCommand::Mark { id, status } => {
            ws.advance_invoice(&id, status)?;
        }
        InvoiceCommand::Delete { id } => ws.delete_invoice(&id)?,
        InvoiceCommand::Export { id, out } => export(ws, &id, out, uploads, webdriver).await?,
    }
    Ok(())
}

/// Writes to the path given on the command line, or into it when it names a directory.
struct OutPath(PathBuf);

impl SaveDialog for OutPath {
    fn choose_destination(&self, suggested_name: &str) -> Option<PathBuf> {
        if self.0.is_dir() {
            Some(self.0.join(suggested_name))
        } else {
            Some(self.0.clone())
        }
    }
}

/// Start a local chromedriver for `webdriver_url` unless one is already listening there.
fn ensure_chromedriver(webdriver_url: &str) -> Result<Option<Child>, invoicely::Error> {
    let local = webdriver_url.contains("localhost") || webdriver_url.contains("127.0.0.1");
    let port = webdriver_url
        .trim_end_matches('/')
        .rsplit(':')
        .next()
        .and_then(|p| p.parse::<u16>().ok());
    match port {
        Some(port) if local && !is_port_in_use(port) => Ok(Some(
            start_chromedriver(port).add_context("starting chromedriver in cli")?,
        )),
        _ => Ok(None),
    }
}

fn kill_chrome(chrome_process: &mut Child) -> Result<(), invoicely::Error> {
    chrome_process
        .kill()
        .map_err(invoicely::Error::from)
        .add_context("killing chromedriver process from cli")?;
    Ok(())
}

async fn write_invoice_pdf(
    html: &str,
    id: &str,
    out: Option<PathBuf>,
    options: &PdfOptions,
) -> Result<(), invoicely::Error> {
    match out {
        Some(out) => {
            let suggested = format!("{id}.pdf");
            if let Some(path) =
                export_document_to_pdf(html, &suggested, &OutPath(out), options).await?
            {
                println!("{}", path.display());
            }
        }
        None => {
            let buf = generate_pdf(html, options)
                .await
                .add_context("printing to stdout")?;
            std::io::stdout()
                .write_all(&buf)
                .map_err(invoicely::Error::from)
                .add_context("writing invoice pdf to stdout")?;
            std::io::stdout()
                .flush()
                .map_err(invoicely::Error::from)
                .add_context("flushing stdout")
                .add_context("printing to stdout")?;
        }
    }
    Ok(())
}

async fn export(
    ws: &Ws,
    id: &str,
    out: Option<PathBuf>,
    uploads: &Path,
    webdriver: &str,
) -> Result<(), invoicely::Error> {
    let doc = ws.document(id, logo_src(ws.settings(), uploads))?;
    let env = setup_template_env()?;
    let html = render_invoice(&env, &doc, LayoutMode::Print)?;
    let options = PdfOptions {
        webdriver_url: webdriver.to_string(),
        margins: LayoutMode::Print.print_margins(),
        ..PdfOptions::default()
    };

    let mut chrome_process = ensure_chromedriver(webdriver)?;
    let result = write_invoice_pdf(&html, id, out, &options).await;
    let stopped = chrome_process.as_mut().map_or(Ok(()), kill_chrome);
    finish_export(result, stopped).add_context(&format!("exporting invoice '{id}'"))
}

/// The export outcome wins over a failure to stop chromedriver, which is only logged.
fn finish_export(
    result: Result<(), invoicely::Error>,
    stopped: Result<(), invoicely::Error>,
) -> Result<(), invoicely::Error> {
    if let Err(e) = stopped {
        warn!(error = %e, "failed to stop chromedriver");
    }
    result
}

pub fn settings(ws: &mut Ws, command: SettingsCommand) -> Result<(), invoicely::Error> {
    match command {
        SettingsCommand::Show => println!("{}", serde_json::to_string_pretty(ws.settings())?),
        SettingsCommand::Set(fields) => {
            let SettingsFields {
                business_name,
                business_address,
                theme,
                logo_position,
                client_position,
                amount_position,
                tax_label,
                tax_rate,
                zoom,
            } = fields;
            let mut settings = ws.settings().clone();
            if let Some(v) = business_name {
                settings.business_name = v;
            }
            if let Some(v) = business_address {
                settings.business_address = v;
            }
            if let Some(v) = theme {
                settings.theme = v;
            }
            if let Some(v) = logo_position {
                settings.logo_position = v;
            }
            if let Some(v) = client_position {
                settings.client_details_position = v;
            }
            if let Some(v) = amount_position {
                settings.amount_position = v;
            }
            if tax_label.is_some() {
                settings.tax_label = tax_label;
            }
            if tax_rate.is_some() {
                settings.tax_rate = tax_rate;
            }
            if zoom.is_some() {
                settings.zoom_level = zoom;
            }
            ws.update_settings(settings)?;
        }
    }
    Ok(())
}

pub fn logo(ws: &mut Ws, path: &Path, uploads: &Path) -> Result<(), invoicely::Error> {
    let reference = save_asset(path, uploads)?;
    let settings = Settings {
        logo_url: reference.clone(),
        ..ws.settings().clone()
    };
    ws.update_settings(settings)?;
    println!("{reference}");
    Ok(())
}

pub fn dashboard(ws: &Ws) {
    let settings = ws.settings();
    if !settings.is_onboarded() {
        println!("Set a business name with `invoicely settings set --business-name <name>`.");
    }
    let stats = DashboardStats::compute(ws.invoices(), Local::now().date_naive());
    println!("Invoices:     {}", stats.total_count);
    println!("Drafts:       {}", stats.draft_count);
    println!("Overdue:      {}", stats.overdue_count);
    println!("Outstanding:  ${}", format_money(&stats.outstanding));
    println!();
    println!("Recent activity:");
    let feed = recent_activity(ws.invoices(), RECENT_ACTIVITY_LIMIT);
    if feed.is_empty() {
        println!("  nothing yet");
    }
    for activity in feed {
        println!("  {}  {}", activity.date, activity.description);
    }
}

pub fn reset(ws: &mut Ws, confirm: &str) -> Result<(), invoicely::Error> {
    if confirm != RESET_CONFIRMATION {
        return Err(invoicely::Error::validation(vec![format!(
            "type \"{RESET_CONFIRMATION}\" to confirm"
        )]));
    }
    ws.reset()?;
    info!("all data deleted");
    Ok(())
}
