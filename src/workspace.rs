//! # Workspace
//!
//! [`Workspace`] holds the working copy of every client, invoice and the settings for the
//! lifetime of the process. It is created once with [`Workspace::open`] and passed explicitly to
//! whatever needs it.
//!
//! Every mutation follows the same order: check the request, write it to the store, and only
//! then update the working copy. If any step fails the working copy is left exactly as it was.

use bigdecimal::{BigDecimal, Zero};
use rand::Rng;
use tracing::{debug, info};

use crate::{
    client::{Client, generate_client_id},
    error::AddContext,
    invoice::{Invoice, InvoiceStatus},
    lifecycle::{TransitionKind, ensure_editable, transition},
    render::InvoiceDocument,
    settings::Settings,
    store::InvoiceStore,
    validate::{validate_client, validate_invoice},
};

const INVOICE_ID_ATTEMPTS: usize = 100;

/// Phrase a user must type before [`Workspace::reset`] is run on their behalf.
pub const RESET_CONFIRMATION: &str = "Delete all content and reset";

pub struct Workspace<S: InvoiceStore> {
    store: S,
    clients: Vec<Client>,
    invoices: Vec<Invoice>,
    settings: Settings,
}

impl<S: InvoiceStore> Workspace<S> {
    /// Load everything from `store`. Settings fall back to [`Settings::default`] when none have
    /// been saved yet.
    pub fn open(store: S) -> Result<Self, crate::Error> {
        let clients = store.list_clients().add_context("loading clients")?;
        let invoices = store.list_invoices().add_context("loading invoices")?;
        let settings = store
            .get_settings()
            .add_context("loading settings")?
            .unwrap_or_default();
        debug!(
            clients = clients.len(),
            invoices = invoices.len(),
            "loaded workspace"
        );
        Ok(Workspace {
            store,
            clients,
            invoices,
            settings,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id() == id)
    }

    pub fn invoice(&self, id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.id() == id)
    }

    fn invoice_index(&self, id: &str) -> Result<usize, crate::Error> {
        self.invoices
            .iter()
            .position(|i| i.id() == id)
            .ok_or_else(|| crate::Error::not_found("invoice", id))
    }

    fn client_index(&self, id: &str) -> Result<usize, crate::Error> {
        self.clients
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| crate::Error::not_found("client", id))
    }

    /// Save a new client. An empty id is replaced with a generated one.
    pub fn add_client(&mut self, mut client: Client) -> Result<&Client, crate::Error> {
        validate_client(&client).add_context("adding client")?;
        if client.id().is_empty() {
            let mut id = generate_client_id();
            while self.client(&id).is_some() {
                id = generate_client_id();
            }
            client.set_id(id);
        }
        self.store
            .insert_client(&client)
            .add_context("adding client")?;
        info!(client = client.id(), "added client");
        self.clients.push(client);
        Ok(&self.clients[self.clients.len() - 1])
    }

    /// Replace an existing client. Invoices keep the name they were saved with.
    pub fn update_client(&mut self, client: Client) -> Result<(), crate::Error> {
        let context = format!("updating client '{}'", client.id());
        let idx = self.client_index(client.id()).add_context(&context)?;
        validate_client(&client).add_context(&context)?;
        self.store.update_client(&client).add_context(&context)?;
        info!(client = client.id(), "updated client");
        self.clients[idx] = client;
        Ok(())
    }

    /// Remove a client. Its invoices stay and keep showing the snapshotted client name.
    pub fn delete_client(&mut self, id: &str) -> Result<(), crate::Error> {
        let context = format!("deleting client '{id}'");
        let idx = self.client_index(id).add_context(&context)?;
        self.store.delete_client(id).add_context(&context)?;
        info!(client = id, "deleted client");
        self.clients.remove(idx);
        Ok(())
    }

    fn generate_invoice_id(&self) -> Result<String, crate::Error> {
        let mut rng = rand::thread_rng();
        for _ in 0..INVOICE_ID_ATTEMPTS {
            let id = format!("INV-{}", rng.gen_range(0..10000));
            if self.invoice(&id).is_none() {
                return Ok(id);
            }
        }
        Err(crate::Error::from(String::from(
            "could not find an unused invoice number",
        )))
    }

    /// Attach the billed client's current name and recompute the stored total.
    fn prepare(&self, invoice: Invoice) -> Result<Invoice, crate::Error> {
        let client = self
            .client(invoice.client_id())
            .ok_or_else(|| crate::Error::not_found("client", invoice.client_id()))?;
        let mut prepared = invoice
            .to_builder()
            .build()
            .map_err(|e| crate::Error::from(e.to_string()))?;
        prepared.set_client_name(client.name());
        Ok(prepared)
    }

    /// First save of a new invoice, as a draft or as created.
    ///
    /// An empty id is replaced with a fresh `INV-<n>` number.
    pub fn create_invoice(&mut self, invoice: Invoice) -> Result<&Invoice, crate::Error> {
        let context = "creating invoice";
        let current = match invoice.id() {
            "" => None,
            id => self.invoice(id).map(Invoice::status),
        };
        transition(
            invoice.id(),
            current,
            invoice.status(),
            TransitionKind::Create,
        )
        .add_context(context)?;
        validate_invoice(&invoice).add_context(context)?;

        let mut invoice = self.prepare(invoice).add_context(context)?;
        if invoice.id().is_empty() {
            invoice.set_id(self.generate_invoice_id().add_context(context)?);
        }

        self.store.insert_invoice(&invoice).add_context(context)?;
        info!(
            invoice = invoice.id(),
            status = %invoice.status(),
            total = %invoice.total(),
            "created invoice"
        );
        self.invoices.push(invoice);
        Ok(&self.invoices[self.invoices.len() - 1])
    }

    /// Open an invoice for editing. Only drafts can be opened.
    pub fn edit_invoice(&self, id: &str) -> Result<&Invoice, crate::Error> {
        let context = format!("opening invoice '{id}' for editing");
        let invoice = self
            .invoice(id)
            .ok_or_else(|| crate::Error::not_found("invoice", id))
            .add_context(&context)?;
        ensure_editable(invoice).add_context(&context)?;
        Ok(invoice)
    }

    /// Save changes to an existing draft. The new status may be any non-derived status.
    pub fn save_invoice(&mut self, invoice: Invoice) -> Result<&Invoice, crate::Error> {
        let context = format!("saving invoice '{}'", invoice.id());
        let idx = self.invoice_index(invoice.id()).add_context(&context)?;
        transition(
            invoice.id(),
            Some(self.invoices[idx].status()),
            invoice.status(),
            TransitionKind::EditSave,
        )
        .add_context(&context)?;
        validate_invoice(&invoice).add_context(&context)?;
        let invoice = self.prepare(invoice).add_context(&context)?;

        self.store.update_invoice(&invoice).add_context(&context)?;
        info!(
            invoice = invoice.id(),
            status = %invoice.status(),
            total = %invoice.total(),
            "saved invoice"
        );
        self.invoices[idx] = invoice;
        Ok(&self.invoices[idx])
    }

    /// Move an issued invoice forward, e.g. mark it sent or paid. Only the status changes.
    pub fn advance_invoice(
        &mut self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<&Invoice, crate::Error> {
        let context = format!("marking invoice '{id}' as {status}");
        let idx = self.invoice_index(id).add_context(&context)?;
        let mut invoice = self.invoices[idx].clone();
        let next = transition(id, Some(invoice.status()), status, TransitionKind::Advance)
            .add_context(&context)?;
        invoice.set_status(next);

        self.store.update_invoice(&invoice).add_context(&context)?;
        info!(invoice = id, status = %next, "advanced invoice");
        self.invoices[idx] = invoice;
        Ok(&self.invoices[idx])
    }

    /// Delete an invoice in any state.
    pub fn delete_invoice(&mut self, id: &str) -> Result<(), crate::Error> {
        let context = format!("deleting invoice '{id}'");
        let idx = self.invoice_index(id).add_context(&context)?;
        self.store.delete_invoice(id).add_context(&context)?;
        info!(invoice = id, "deleted invoice");
        self.invoices.remove(idx);
        Ok(())
    }

    pub fn update_settings(&mut self, settings: Settings) -> Result<(), crate::Error> {
        if let Some(rate) = &settings.tax_rate {
            if rate < &BigDecimal::zero() {
                return Err(crate::Error::validation(vec![format!(
                    "default tax rate must not be negative, got {rate}"
                )])
                .add_context("updating settings"));
            }
        }
        self.store
            .put_settings(&settings)
            .add_context("updating settings")?;
        info!(business = %settings.business_name, "updated settings");
        self.settings = settings;
        Ok(())
    }

    /// Erase every client, invoice and the settings, returning to a fresh install.
    pub fn reset(&mut self) -> Result<(), crate::Error> {
        self.store.reset_all().add_context("resetting application")?;
        self.clients.clear();
        self.invoices.clear();
        self.settings = Settings::default();
        info!("reset application data");
        Ok(())
    }

    /// Clients whose name or email contains `term`, ignoring case.
    pub fn search_clients(&self, term: &str) -> Vec<&Client> {
        let term = term.trim();
        self.clients.iter().filter(|c| c.matches(term)).collect()
    }

    /// Invoices whose client name or id contains `term`, ignoring case.
    pub fn search_invoices(&self, term: &str) -> Vec<&Invoice> {
        let term = term.trim().to_lowercase();
        self.invoices
            .iter()
            .filter(|i| {
                i.client_name().to_lowercase().contains(&term)
                    || i.id().to_lowercase().contains(&term)
            })
            .collect()
    }

    /// Assemble everything the renderer needs for invoice `id`.
    pub fn document(
        &self,
        id: &str,
        logo_src: Option<String>,
    ) -> Result<InvoiceDocument<'_>, crate::Error> {
        let invoice = self
            .invoice(id)
            .ok_or_else(|| crate::Error::not_found("invoice", id))?;
        Ok(InvoiceDocument {
            invoice,
            client: self.client(invoice.client_id()),
            settings: &self.settings,
            logo_src,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, str::FromStr};

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        client::ClientBuilder,
        invoice::{InvoiceBuilder, LineItem, LineItemBuilder},
        store::SqliteStore,
    };

    /// Delegates to an in-memory SQLite store but can be told to fail every write.
    struct FlakyStore {
        inner: SqliteStore,
        fail: Cell<bool>,
    }

    impl FlakyStore {
        fn new() -> Self {
            FlakyStore {
                inner: SqliteStore::open_in_memory().unwrap(),
                fail: Cell::new(false),
            }
        }

        fn check(&self) -> Result<(), crate::Error> {
            if self.fail.get() {
                Err(crate::Error::from(String::from("disk unavailable")))
            } else {
                Ok(())
            }
        }
    }

    impl InvoiceStore for FlakyStore {
        fn list_clients(&self) -> Result<Vec<Client>, crate::Error> {
            self.inner.list_clients()
        }

        fn get_client(&self, id: &str) -> Result<Option<Client>, crate::Error> {
            self.inner.get_client(id)
        }

        fn insert_client(&self, client: &Client) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.insert_client(client)
        }

        fn update_client(&self, client: &Client) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.update_client(client)
        }

        fn delete_client(&self, id: &str) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.delete_client(id)
        }

        fn list_invoices(&self) -> Result<Vec<Invoice>, crate::Error> {
            self.inner.list_invoices()
        }

        fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, crate::Error> {
            self.inner.get_invoice(id)
        }

        fn insert_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.insert_invoice(invoice)
        }

        fn update_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.update_invoice(invoice)
        }

        fn delete_invoice(&self, id: &str) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.delete_invoice(id)
        }

        fn get_settings(&self) -> Result<Option<Settings>, crate::Error> {
            self.inner.get_settings()
        }

        fn put_settings(&self, settings: &Settings) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.put_settings(settings)
        }

        fn reset_all(&self) -> Result<(), crate::Error> {
            self.check()?;
            self.inner.reset_all()
        }
    }

    fn workspace() -> Workspace<FlakyStore> {
        Workspace::open(FlakyStore::new()).unwrap()
    }

    fn with_client(ws: &mut Workspace<FlakyStore>) -> String {
        let client = ClientBuilder::default()
            .name("Acme")
            .email("billing@acme.io")
            .build()
            .unwrap();
        ws.add_client(client).unwrap().id().to_string()
    }

    fn draft_for(client_id: &str, status: InvoiceStatus) -> Invoice {
        InvoiceBuilder::default()
            .client_id(client_id)
            .client_name("")
            .status(status)
            .date(NaiveDate::from_ymd_opt(2026, 10, 1).unwrap())
            .due_date(NaiveDate::from_ymd_opt(2026, 10, 31).unwrap())
            .add_item(
                LineItemBuilder::default()
                    .description("Design")
                    .quantity(2)
                    .price(BigDecimal::from(50))
                    .build()
                    .unwrap(),
            )
            .add_item(
                LineItemBuilder::default()
                    .description("Hosting")
                    .quantity(1)
                    .price(BigDecimal::from(25))
                    .build()
                    .unwrap(),
            )
            .tax_rate(BigDecimal::from(10))
            .build()
            .unwrap()
    }

    #[test]
    fn fresh_workspace_has_default_settings() {
        let ws = workspace();
        assert!(ws.clients().is_empty());
        assert!(ws.invoices().is_empty());
        assert_eq!(ws.settings(), &Settings::default());
    }

    #[test]
    fn add_client_generates_id_and_persists() {
        let mut ws = workspace();
        let id = with_client(&mut ws);
        assert_eq!(id.len(), 9);
        assert!(ws.store().get_client(&id).unwrap().is_some());
        assert_eq!(ws.client(&id).unwrap().name(), "Acme");
    }

    #[test]
    fn invalid_client_is_rejected_before_the_store() {
        let mut ws = workspace();
        let err = ws
            .add_client(ClientBuilder::default().name("").build().unwrap())
            .unwrap_err();
        assert!(err.is_validation());
        assert!(ws.store().list_clients().unwrap().is_empty());
    }

    #[test]
    fn invalid_invoice_is_rejected_before_the_store() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);

        let empty = draft_for(&client_id, InvoiceStatus::Created)
            .to_builder()
            .items(Vec::<LineItem>::new())
            .build()
            .unwrap();
        let err = ws.create_invoice(empty).unwrap_err();
        assert!(err.is_validation());

        let zero_quantity = draft_for(&client_id, InvoiceStatus::Draft)
            .to_builder()
            .add_item(
                LineItemBuilder::default()
                    .description("Nothing")
                    .quantity(0)
                    .price(BigDecimal::from(10))
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap();
        let err = ws.create_invoice(zero_quantity).unwrap_err();
        assert!(err.is_validation());

        assert!(ws.store().list_invoices().unwrap().is_empty());
        assert!(ws.invoices().is_empty());
    }

    #[test]
    fn create_assigns_number_snapshot_and_total() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let created = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .clone();

        assert!(created.id().starts_with("INV-"));
        assert_eq!(created.client_name(), "Acme");
        assert_eq!(created.total(), &BigDecimal::from_str("137.50").unwrap());
        assert_eq!(ws.store().get_invoice(created.id()).unwrap(), Some(created));
    }

    #[test]
    fn create_rejects_sent_unknown_client_and_duplicates() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);

        let err = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Sent))
            .unwrap_err();
        assert!(err.is_invalid_state());

        let err = ws
            .create_invoice(draft_for("nobody", InvoiceStatus::Draft))
            .unwrap_err();
        assert!(err.is_not_found());

        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .unwrap()
            .id()
            .to_string();
        let dup = draft_for(&client_id, InvoiceStatus::Draft)
            .to_builder()
            .id(id)
            .build()
            .unwrap();
        assert!(ws.create_invoice(dup).unwrap_err().is_invalid_state());
        assert_eq!(ws.invoices().len(), 1);
    }

    #[test]
    fn only_drafts_can_be_edited_and_others_stay_unchanged() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let draft_id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .unwrap()
            .id()
            .to_string();
        let issued = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .clone();

        assert!(ws.edit_invoice(&draft_id).is_ok());
        assert!(ws.edit_invoice(issued.id()).unwrap_err().is_invalid_state());

        let tampered = issued
            .to_builder()
            .status(InvoiceStatus::Draft)
            .tax_rate(BigDecimal::from(50))
            .build()
            .unwrap();
        assert!(ws.save_invoice(tampered).unwrap_err().is_invalid_state());
        assert_eq!(ws.invoice(issued.id()), Some(&issued));
        assert_eq!(ws.store().get_invoice(issued.id()).unwrap(), Some(issued));
    }

    #[test]
    fn saving_a_draft_can_issue_it() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let draft = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .unwrap()
            .clone();

        let edited = ws
            .edit_invoice(draft.id())
            .unwrap()
            .to_builder()
            .status(InvoiceStatus::Created)
            .tax_rate(BigDecimal::zero())
            .build()
            .unwrap();
        let saved = ws.save_invoice(edited).unwrap();
        assert_eq!(saved.status(), InvoiceStatus::Created);
        assert_eq!(saved.total(), &BigDecimal::from_str("125.00").unwrap());
    }

    #[test]
    fn advance_through_sent_to_paid() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .id()
            .to_string();

        ws.advance_invoice(&id, InvoiceStatus::Sent).unwrap();
        ws.advance_invoice(&id, InvoiceStatus::Paid).unwrap();
        assert_eq!(
            ws.store().get_invoice(&id).unwrap().unwrap().status(),
            InvoiceStatus::Paid
        );
        assert!(ws
            .advance_invoice(&id, InvoiceStatus::Sent)
            .unwrap_err()
            .is_invalid_state());
    }

    #[test]
    fn failed_store_write_leaves_working_copy_alone() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .id()
            .to_string();

        ws.store().fail.set(true);
        assert!(ws.advance_invoice(&id, InvoiceStatus::Sent).is_err());
        assert_eq!(ws.invoice(&id).unwrap().status(), InvoiceStatus::Created);

        assert!(ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .is_err());
        assert_eq!(ws.invoices().len(), 1);

        assert!(ws.delete_client(&client_id).is_err());
        assert!(ws.client(&client_id).is_some());

        let renamed = Settings {
            business_name: "Studio North".into(),
            ..Settings::default()
        };
        assert!(ws.update_settings(renamed).is_err());
        assert_eq!(ws.settings(), &Settings::default());

        assert!(ws.reset().is_err());
        assert_eq!(ws.invoices().len(), 1);
    }

    #[test]
    fn deleting_a_client_keeps_invoice_snapshot() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .id()
            .to_string();
        ws.delete_client(&client_id).unwrap();

        let doc = ws.document(&id, None).unwrap();
        assert!(doc.client.is_none());
        assert_eq!(doc.client_name(), "Acme");
    }

    #[test]
    fn delete_invoice_in_any_state() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Created))
            .unwrap()
            .id()
            .to_string();
        ws.advance_invoice(&id, InvoiceStatus::Paid).unwrap();
        ws.delete_invoice(&id).unwrap();
        assert!(ws.invoices().is_empty());
        assert!(ws.delete_invoice(&id).unwrap_err().is_not_found());
    }

    #[test]
    fn negative_default_tax_rate_rejected() {
        let mut ws = workspace();
        let settings = Settings {
            tax_rate: Some(BigDecimal::from(-1)),
            ..Settings::default()
        };
        assert!(ws.update_settings(settings).unwrap_err().is_validation());
    }

    #[test]
    fn reset_clears_everything() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        ws.create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .unwrap();
        ws.update_settings(Settings {
            business_name: "Studio North".into(),
            ..Settings::default()
        })
        .unwrap();

        ws.reset().unwrap();
        assert!(ws.clients().is_empty());
        assert!(ws.invoices().is_empty());
        assert_eq!(ws.settings(), &Settings::default());
        assert!(ws.store().list_clients().unwrap().is_empty());
        assert!(ws.store().list_invoices().unwrap().is_empty());
        assert!(ws.store().get_settings().unwrap().is_none());
    }

    #[test]
    fn search_ignores_case() {
        let mut ws = workspace();
        let client_id = with_client(&mut ws);
        ws.add_client(
            ClientBuilder::default()
                .name("Globex")
                .email("ap@globex.com")
                .build()
                .unwrap(),
        )
        .unwrap();
        let id = ws
            .create_invoice(draft_for(&client_id, InvoiceStatus::Draft))
            .unwrap()
            .id()
            .to_string();

        assert_eq!(ws.search_clients("ACME").len(), 1);
        assert_eq!(ws.search_clients("globex.com").len(), 1);
        assert_eq!(ws.search_clients("").len(), 2);
        assert_eq!(ws.search_invoices("acme").len(), 1);
        assert_eq!(ws.search_invoices(&id.to_lowercase()).len(), 1);
        assert!(ws.search_invoices("globex").is_empty());
    }
}
