//! # Storage
//!
//! The [`InvoiceStore`] trait is the persistence boundary: the workspace only ever talks to a
//! store through it, so another backend can be dropped in without touching the domain code.
//! [`SqliteStore`] is the embedded implementation used by the application.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::{client::Client, invoice::Invoice, settings::Settings};

/// Durable keyed storage for clients, invoices and the settings singleton.
///
/// Every call is atomic with respect to itself. Updates and deletes of an id that does not exist
/// fail with a `NotFound` error rather than silently doing nothing.
pub trait InvoiceStore {
    fn list_clients(&self) -> Result<Vec<Client>, crate::Error>;

    fn get_client(&self, id: &str) -> Result<Option<Client>, crate::Error>;

    fn insert_client(&self, client: &Client) -> Result<(), crate::Error>;

    fn update_client(&self, client: &Client) -> Result<(), crate::Error>;

    fn delete_client(&self, id: &str) -> Result<(), crate::Error>;

    /// All invoices, with their line items decoded.
    fn list_invoices(&self) -> Result<Vec<Invoice>, crate::Error>;

    fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, crate::Error>;

    fn insert_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error>;

    fn update_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error>;

    fn delete_invoice(&self, id: &str) -> Result<(), crate::Error>;

    /// `None` until settings have been saved once.
    fn get_settings(&self) -> Result<Option<Settings>, crate::Error>;

    fn put_settings(&self, settings: &Settings) -> Result<(), crate::Error>;

    /// Remove every client, invoice and the settings blob, all or nothing.
    fn reset_all(&self) -> Result<(), crate::Error>;
}
