//! HTML rendering of an invoice document.
//!
//! The page has a header band carrying the logo and a footer band carrying the business name
//! and address. Both repeat on every printed page. Totals shown on the page are always
//! recomputed from the stored line items and tax rate.

use fantoccini::wd::PrintMargins;
use minijinja::Environment;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    client::Client,
    invoice::Invoice,
    money::{Totals, format_money},
    settings::{LogoPosition, Settings, Side},
};

/// Height of the header band in CSS pixels.
pub const HEADER_HEIGHT_PX: u32 = 120;

/// Height of the footer band in CSS pixels.
pub const FOOTER_HEIGHT_PX: u32 = 80;

const TEMPLATE_NAME: &str = "invoice.html";

/// Text shown when neither the client record nor the invoice carries a name.
const CLIENT_NAME_PLACEHOLDER: &str = "Client Name";

// 96 CSS px per inch, 2.54 cm per inch
fn px_to_cm(px: u32) -> f64 {
    f64::from(px) * 2.54 / 96.0
}

/// How the document will be displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// On-screen preview. Bands are absolutely positioned and spacer rows reserve their height.
    Screen,
    /// Paged output. Bands are fixed so they repeat, and the page margins reserve their height.
    Print,
}

impl LayoutMode {
    /// Page margins, in centimetres, to print this layout with.
    pub fn print_margins(&self) -> PrintMargins {
        match self {
            LayoutMode::Screen => PrintMargins {
                top: 0.0,
                bottom: 0.0,
                left: 0.0,
                right: 0.0,
            },
            LayoutMode::Print => PrintMargins {
                top: px_to_cm(HEADER_HEIGHT_PX),
                bottom: px_to_cm(FOOTER_HEIGHT_PX),
                left: 0.0,
                right: 0.0,
            },
        }
    }
}

/// Everything needed to render one invoice.
pub struct InvoiceDocument<'a> {
    pub invoice: &'a Invoice,
    /// The billed client, if it still exists.
    pub client: Option<&'a Client>,
    pub settings: &'a Settings,
    /// Image source for the logo, typically a `data:` URL from [`crate::assets::asset_data_url`].
    pub logo_src: Option<String>,
}

impl<'a> InvoiceDocument<'a> {
    pub fn totals(&self) -> Totals {
        self.invoice.totals()
    }

    /// Whether the total stored with the invoice equals the recomputed one.
    pub fn stored_total_matches(&self) -> bool {
        self.invoice.total() == &self.totals().total
    }

    /// Live client name, then the name snapshotted on the invoice, then a placeholder.
    pub fn client_name(&self) -> &str {
        self.client
            .map(Client::name)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| Some(self.invoice.client_name()).filter(|name| !name.trim().is_empty()))
            .unwrap_or(CLIENT_NAME_PLACEHOLDER)
    }
}

#[derive(Serialize)]
struct ItemView<'a> {
    description: &'a str,
    quantity: i32,
    price: String,
    total: String,
}

#[derive(Serialize)]
struct DocumentView<'a> {
    id: &'a str,
    date: String,
    due_date: String,
    client_name: &'a str,
    client_address: Option<&'a str>,
    items: Vec<ItemView<'a>>,
    subtotal: String,
    tax: String,
    total: String,
    tax_label: &'a str,
    tax_rate: String,
    business_name: &'a str,
    business_address: &'a str,
    logo_src: Option<&'a str>,
    logo_position: &'static str,
    client_position: &'static str,
    amount_position: &'static str,
    print: bool,
    header_px: u32,
    footer_px: u32,
}

fn side_class(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
    }
}

fn logo_class(position: LogoPosition) -> &'static str {
    match position {
        LogoPosition::Left => "left",
        LogoPosition::Right => "right",
        LogoPosition::Center => "center",
    }
}

/// Create the template environment with the invoice template loaded.
pub fn setup_template_env() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, include_str!("../templates/invoice.html"))?;
    Ok(env)
}

/// Render `doc` to a standalone HTML page.
pub fn render_invoice(
    env: &Environment<'static>,
    doc: &InvoiceDocument<'_>,
    mode: LayoutMode,
) -> Result<String, crate::Error> {
    let invoice = doc.invoice;
    let totals = doc.totals();
    if !doc.stored_total_matches() {
        warn!(
            invoice = invoice.id(),
            stored = %invoice.total(),
            computed = %totals.total,
            "stored invoice total disagrees with line items, showing recomputed total"
        );
    }

    let items = invoice
        .items()
        .iter()
        .map(|item| ItemView {
            description: item.description(),
            quantity: item.quantity(),
            price: format_money(item.price()),
            total: format_money(&item.total()),
        })
        .collect();

    let view = DocumentView {
        id: invoice.id(),
        date: invoice.date().format("%Y-%m-%d").to_string(),
        due_date: invoice.due_date().format("%Y-%m-%d").to_string(),
        client_name: doc.client_name(),
        client_address: doc
            .client
            .map(Client::address)
            .filter(|address| !address.trim().is_empty()),
        items,
        subtotal: format_money(&totals.subtotal),
        tax: format_money(&totals.tax),
        total: format_money(&totals.total),
        tax_label: invoice.tax_label(),
        tax_rate: invoice.tax_rate().to_string(),
        business_name: &doc.settings.business_name,
        business_address: &doc.settings.business_address,
        logo_src: doc.logo_src.as_deref(),
        logo_position: logo_class(doc.settings.logo_position),
        client_position: side_class(doc.settings.client_details_position),
        amount_position: side_class(doc.settings.amount_position),
        print: mode == LayoutMode::Print,
        header_px: HEADER_HEIGHT_PX,
        footer_px: FOOTER_HEIGHT_PX,
    };

    let template = env.get_template(TEMPLATE_NAME)?;
    let html = template.render(&view)?;
    debug!(invoice = invoice.id(), ?mode, bytes = html.len(), "rendered invoice");
    Ok(html)
}
