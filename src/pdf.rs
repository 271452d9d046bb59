//! Printing rendered HTML to PDF through a headless Chrome(ium) WebDriver session.

use std::{
    fs,
    net::TcpListener,
    path::PathBuf,
    process::{Child, Command, Stdio},
    thread,
    time::Duration,
};

use base64::{Engine, engine::general_purpose};
use fantoccini::{
    Client, ClientBuilder,
    wd::{PrintConfigurationBuilder, PrintMargins, PrintSize},
};
use serde_json::Map;
use tracing::{debug, info, warn};

use crate::error::AddContext;

/// WebDriver endpoint used when none is configured.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    fn print_size(&self) -> PrintSize {
        match self {
            PageSize::A4 => PrintSize::A4,
            PageSize::Letter => PrintSize::US_LETTER,
        }
    }
}

/// Where and how to print.
pub struct PdfOptions {
    pub webdriver_url: String,
    pub size: PageSize,
    /// Page margins in centimetres, see [`crate::render::LayoutMode::print_margins`].
    pub margins: PrintMargins,
}

impl Default for PdfOptions {
    fn default() -> Self {
        PdfOptions {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            size: PageSize::A4,
            margins: PrintMargins {
                top: 0.0,
                bottom: 0.0,
                left: 0.0,
                right: 0.0,
            },
        }
    }
}

/// Asks the user where an exported document should be written.
pub trait SaveDialog {
    /// `None` means the user cancelled.
    fn choose_destination(&self, suggested_name: &str) -> Option<PathBuf>;
}

/// Starts ChromeDriver as a child process on `port`
///
/// # Returns
/// - [`Child`] once ChromeDriver is listening on `port`
///
/// # Errors
/// - [`crate::Error`] if the chromedriver binary is not in the path, if `port` is not
/// available, or if the chromedriver process fails to start for any other reason
pub fn start_chromedriver(port: u16) -> Result<Child, crate::Error> {
    if is_port_in_use(port) {
        return Err(
            crate::Error::from(format!("Port {port} is already in use"))
                .add_context("starting chromedriver"),
        );
    }

    let mut child = Command::new("chromedriver")
        .arg(format!("--port={port}"))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(crate::Error::from)
        .add_context("spawning chromedriver")?;

    for _ in 0..100 {
        if is_port_in_use(port) {
            info!(port, "chromedriver started");
            return Ok(child);
        }

        if child
            .try_wait()
            .map_err(crate::Error::from)
            .add_context("starting chromedriver")?
            .is_some()
        {
            return Err(
                crate::Error::from(String::from("Chromedriver has stopped unexpectedly"))
                    .add_context("starting chromedriver"),
            );
        }

        thread::sleep(Duration::from_millis(10));
    }

    if !is_port_in_use(port) {
        child.kill()?;
        return Err(
            crate::Error::from(format!("Chromedriver failed to bind to port {port}"))
                .add_context("starting chromedriver"),
        );
    }

    Ok(child)
}

/// `true` if something on localhost is already bound to `port`.
pub fn is_port_in_use(port: u16) -> bool {
    TcpListener::bind(format!("localhost:{port}")).is_err()
}

async fn connect_to_client(webdriver_url: &str) -> Result<Client, fantoccini::error::NewSessionError> {
    let mut caps = Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!({
            "args": ["--headless"]
        }),
    );
    ClientBuilder::native()
        .capabilities(caps)
        .connect(webdriver_url)
        .await
}

async fn print_html(client: &Client, html: &str, options: &PdfOptions) -> Result<Vec<u8>, crate::Error> {
    let encoded = general_purpose::STANDARD.encode(html.as_bytes());
    let data_url = format!("data:text/html;base64,{encoded}");
    client
        .goto(&data_url)
        .await
        .map_err(crate::Error::from)
        .add_context("navigating to document")?;

    let margins = PrintMargins {
        top: options.margins.top,
        bottom: options.margins.bottom,
        left: options.margins.left,
        right: options.margins.right,
    };
    let config = PrintConfigurationBuilder::default()
        .margins(margins)
        .size(options.size.print_size())
        .build()
        .map_err(crate::Error::from)
        .add_context("configuring printer")?;
    client
        .print(config)
        .await
        .map_err(crate::Error::from)
        .add_context("printing pdf")
}

/// Print `html` to PDF bytes.
///
/// A fresh browser session is opened for each call and closed again before returning, whether
/// printing succeeded or not.
///
/// # Errors
///
/// Returns `Err(crate::Error)` if any step fails:
/// - connecting to the WebDriver endpoint
/// - navigating the browser to the generated data URL
/// - configuring the print job or printing to PDF
pub async fn generate_pdf(html: &str, options: &PdfOptions) -> Result<Vec<u8>, crate::Error> {
    let client = connect_to_client(&options.webdriver_url)
        .await
        .map_err(crate::Error::from)
        .add_context(&format!("connecting to webdriver at {}", options.webdriver_url))
        .add_context("generating pdf")?;
    debug!(url = %options.webdriver_url, "opened browser session");

    let result = print_html(&client, html, options).await;
    if let Err(e) = client.close().await {
        warn!(error = ?e, "failed to close browser session");
    }
    result.add_context("generating pdf")
}

/// Ask `dialog` for a destination and, unless the user cancels, print `html` there.
///
/// Returns the written path, or `None` if the user cancelled. The dialog is consulted before any
/// browser session is opened, so a cancelled export does no work.
pub async fn export_document_to_pdf(
    html: &str,
    suggested_name: &str,
    dialog: &dyn SaveDialog,
    options: &PdfOptions,
) -> Result<Option<PathBuf>, crate::Error> {
    let Some(path) = dialog.choose_destination(suggested_name) else {
        info!(suggested_name, "pdf export cancelled");
        return Ok(None);
    };

    let bytes = generate_pdf(html, options)
        .await
        .add_context(&format!("exporting '{suggested_name}'"))?;
    fs::write(&path, &bytes)
        .map_err(crate::Error::from)
        .add_context(&format!("writing pdf to '{}'", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "exported pdf");
    Ok(Some(path))
}
