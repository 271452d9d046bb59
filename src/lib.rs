//! Core of a small-business invoicing application
//!
//! This crate keeps clients, invoices and application settings in an embedded SQLite database,
//! enforces the invoice lifecycle, computes money and tax exactly, renders invoices to HTML and
//! prints them to PDF through a connection to headless chrome(ium).
//!
//! The entry point is a [`Workspace`] opened over an [`InvoiceStore`]:
//!
//! ```rust
//! use bigdecimal::BigDecimal;
//! use invoicely::{ClientBuilder, InvoiceBuilder, InvoiceStatus, LineItemBuilder, SqliteStore, Workspace};
//!
//! let mut workspace = Workspace::open(SqliteStore::open_in_memory().unwrap()).unwrap();
//! let client = workspace
//!     .add_client(ClientBuilder::default().name("Acme").build().unwrap())
//!     .unwrap()
//!     .clone();
//!
//! let invoice = InvoiceBuilder::default()
//!     .client(&client)
//!     .status(InvoiceStatus::Created)
//!     .add_item(
//!         LineItemBuilder::default()
//!             .description("Design")
//!             .quantity(2)
//!             .price(BigDecimal::from(50))
//!             .build()
//!             .unwrap(),
//!     )
//!     .tax_rate(BigDecimal::from(10))
//!     .build()
//!     .unwrap();
//! let saved = workspace.create_invoice(invoice).unwrap();
//! assert_eq!(saved.total().to_string(), "110.00");
//! ```

pub mod assets;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod invoice;
pub mod lifecycle;
pub mod money;
pub mod pdf;
pub mod render;
pub mod settings;
pub mod store;
pub mod validate;
pub mod workspace;

pub use client::{Client, ClientBuilder, ClientBuilderError, ClientStatus};
pub use error::{AddContext, Error, ErrorKind};
pub use invoice::{
    Invoice, InvoiceBuilder, InvoiceBuilderError, InvoiceStatus, LineItem, LineItemBuilder,
    LineItemBuilderError,
};
pub use pdf::{PdfOptions, SaveDialog, export_document_to_pdf, generate_pdf, start_chromedriver};
pub use render::{InvoiceDocument, LayoutMode, render_invoice, setup_template_env};
pub use settings::Settings;
pub use store::{InvoiceStore, SqliteStore};
pub use workspace::Workspace;
