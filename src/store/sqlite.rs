use std::{fs, path::Path, str::FromStr};

use rusqlite::{Connection, OptionalExtension, Row, params, types::Value as Cell};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::{
    client::{Client, ClientBuilder, ClientStatus},
    error::AddContext,
    invoice::Invoice,
    settings::{SETTINGS_KEY, Settings},
    store::InvoiceStore,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS clients (
      id TEXT PRIMARY KEY,
      name TEXT,
      email TEXT,
      address TEXT,
      status TEXT
    );
    CREATE TABLE IF NOT EXISTS invoices (
      id TEXT PRIMARY KEY,
      clientId TEXT,
      clientName TEXT,
      date TEXT,
      dueDate TEXT,
      items TEXT,
      status TEXT,
      total TEXT,
      taxLabel TEXT,
      taxRate TEXT
    );
    CREATE TABLE IF NOT EXISTS settings (
      key TEXT PRIMARY KEY,
      value TEXT
    );";

const INVOICE_COLUMNS: &str =
    "id, clientId, clientName, date, dueDate, items, status, total, taxLabel, taxRate";

/// [`InvoiceStore`] backed by a single SQLite database file.
///
/// Monetary columns are written as decimal text. Rows written by older versions with `REAL`
/// amounts are still read correctly.
pub struct SqliteStore {
    conn: Connection,
}

/// Raw cells of one `invoices` row, decoded into an [`Invoice`] outside the rusqlite closure.
struct InvoiceRow {
    id: String,
    client_id: Option<String>,
    client_name: Option<String>,
    date: Option<String>,
    due_date: Option<String>,
    items: Option<String>,
    status: Option<String>,
    total: Cell,
    tax_label: Option<String>,
    tax_rate: Cell,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and bring its schema up to date.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(crate::Error::from)
                .add_context("creating database directory")?;
        }
        let conn = Connection::open(path)
            .map_err(crate::Error::from)
            .add_context(&format!("opening database '{}'", path.display()))?;
        debug!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    /// A private database that lives as long as the store.
    pub fn open_in_memory() -> Result<Self, crate::Error> {
        let conn = Connection::open_in_memory()
            .map_err(crate::Error::from)
            .add_context("opening in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, crate::Error> {
        conn.execute_batch(SCHEMA)
            .map_err(crate::Error::from)
            .add_context("creating tables")?;
        ensure_invoice_columns(&conn).add_context("migrating invoices table")?;
        Ok(SqliteStore { conn })
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Databases created before tax support lack the tax columns.
fn ensure_invoice_columns(conn: &Connection) -> Result<(), crate::Error> {
    for column in ["taxLabel", "taxRate"] {
        if !table_has_column(conn, "invoices", column)? {
            conn.execute(&format!("ALTER TABLE invoices ADD COLUMN {column} TEXT"), [])?;
            info!(column, "added missing column to invoices table");
        }
    }
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, crate::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// id, name, email, address, status
type ClientRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn read_client(row: &Row<'_>) -> rusqlite::Result<ClientRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn decode_client((id, name, email, address, status): ClientRow) -> Result<Client, crate::Error> {
    let status = match status {
        Some(s) => ClientStatus::from_str(&s).add_context(&format!("decoding client '{id}'"))?,
        None => ClientStatus::default(),
    };
    ClientBuilder::default()
        .id(id.clone())
        .name(name.unwrap_or_default())
        .email(email.unwrap_or_default())
        .address(address.unwrap_or_default())
        .status(status)
        .build()
        .map_err(|e| crate::Error::from(e.to_string()))
        .add_context(&format!("decoding client '{id}'"))
}

fn read_invoice(row: &Row<'_>) -> rusqlite::Result<InvoiceRow> {
    Ok(InvoiceRow {
        id: row.get(0)?,
        client_id: row.get(1)?,
        client_name: row.get(2)?,
        date: row.get(3)?,
        due_date: row.get(4)?,
        items: row.get(5)?,
        status: row.get(6)?,
        total: row.get(7)?,
        tax_label: row.get(8)?,
        tax_rate: row.get(9)?,
    })
}

fn decimal_cell(cell: Cell) -> Option<Value> {
    match cell {
        Cell::Text(s) => Some(Value::String(s)),
        Cell::Integer(i) => Some(Value::from(i)),
        Cell::Real(f) => serde_json::Number::from_f64(f).map(Value::Number),
        Cell::Null | Cell::Blob(_) => None,
    }
}

/// Decode a row through the invoice's JSON record shape so stored and exported records share one
/// set of parsing rules.
fn decode_invoice(row: InvoiceRow) -> Result<Invoice, crate::Error> {
    let context = format!("decoding invoice '{}'", row.id);
    let items: Value = match row.items.as_deref() {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)
            .map_err(crate::Error::from)
            .add_context("parsing line items")
            .add_context(&context)?,
        _ => Value::Array(Vec::new()),
    };

    let mut record = Map::new();
    record.insert("id".into(), Value::String(row.id.clone()));
    record.insert("clientId".into(), row.client_id.unwrap_or_default().into());
    record.insert("clientName".into(), row.client_name.unwrap_or_default().into());
    if let Some(date) = row.date {
        record.insert("date".into(), date.into());
    }
    if let Some(due) = row.due_date {
        record.insert("dueDate".into(), due.into());
    }
    record.insert("items".into(), items);
    if let Some(status) = row.status {
        record.insert("status".into(), status.into());
    }
    if let Some(total) = decimal_cell(row.total) {
        record.insert("total".into(), total);
    }
    if let Some(label) = row.tax_label {
        record.insert("taxLabel".into(), label.into());
    }
    if let Some(rate) = decimal_cell(row.tax_rate) {
        record.insert("taxRate".into(), rate);
    }

    serde_json::from_value(Value::Object(record))
        .map_err(crate::Error::from)
        .add_context(&context)
}

impl InvoiceStore for SqliteStore {
    fn list_clients(&self) -> Result<Vec<Client>, crate::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, email, address, status FROM clients")?;
        let rows = stmt
            .query_map([], read_client)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_client).collect()
    }

    fn get_client(&self, id: &str) -> Result<Option<Client>, crate::Error> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, email, address, status FROM clients WHERE id = ?1",
                [id],
                read_client,
            )
            .optional()?;
        row.map(decode_client).transpose()
    }

    fn insert_client(&self, client: &Client) -> Result<(), crate::Error> {
        self.conn
            .execute(
                "INSERT INTO clients (id, name, email, address, status) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    client.id(),
                    client.name(),
                    client.email(),
                    client.address(),
                    client.status().as_str()
                ],
            )
            .map_err(crate::Error::from)
            .add_context(&format!("inserting client '{}'", client.id()))?;
        Ok(())
    }

    fn update_client(&self, client: &Client) -> Result<(), crate::Error> {
        let changed = self
            .conn
            .execute(
                "UPDATE clients SET name = ?1, email = ?2, address = ?3, status = ?4 WHERE id = ?5",
                params![
                    client.name(),
                    client.email(),
                    client.address(),
                    client.status().as_str(),
                    client.id()
                ],
            )
            .map_err(crate::Error::from)
            .add_context(&format!("updating client '{}'", client.id()))?;
        if changed == 0 {
            return Err(crate::Error::not_found("client", client.id()));
        }
        Ok(())
    }

    fn delete_client(&self, id: &str) -> Result<(), crate::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM clients WHERE id = ?1", [id])
            .map_err(crate::Error::from)
            .add_context(&format!("deleting client '{id}'"))?;
        if changed == 0 {
            return Err(crate::Error::not_found("client", id));
        }
        Ok(())
    }

    fn list_invoices(&self) -> Result<Vec<Invoice>, crate::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {INVOICE_COLUMNS} FROM invoices"))?;
        let rows = stmt
            .query_map([], read_invoice)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(decode_invoice).collect()
    }

    fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, crate::Error> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"),
                [id],
                read_invoice,
            )
            .optional()?;
        row.map(decode_invoice).transpose()
    }

    fn insert_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error> {
        let items = serde_json::to_string(invoice.items())?;
        self.conn
            .execute(
                &format!(
                    "INSERT INTO invoices ({INVOICE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    invoice.id(),
                    invoice.client_id(),
                    invoice.client_name(),
                    invoice.date().format("%Y-%m-%d").to_string(),
                    invoice.due_date().format("%Y-%m-%d").to_string(),
                    items,
                    invoice.status().as_str(),
                    invoice.total().to_string(),
                    invoice.tax_label(),
                    invoice.tax_rate().to_string(),
                ],
            )
            .map_err(crate::Error::from)
            .add_context(&format!("inserting invoice '{}'", invoice.id()))?;
        Ok(())
    }

    fn update_invoice(&self, invoice: &Invoice) -> Result<(), crate::Error> {
        let items = serde_json::to_string(invoice.items())?;
        let changed = self
            .conn
            .execute(
                "UPDATE invoices SET clientId = ?1, clientName = ?2, date = ?3, dueDate = ?4, items = ?5, \
                 status = ?6, total = ?7, taxLabel = ?8, taxRate = ?9 WHERE id = ?10",
                params![
                    invoice.client_id(),
                    invoice.client_name(),
                    invoice.date().format("%Y-%m-%d").to_string(),
                    invoice.due_date().format("%Y-%m-%d").to_string(),
                    items,
                    invoice.status().as_str(),
                    invoice.total().to_string(),
                    invoice.tax_label(),
                    invoice.tax_rate().to_string(),
                    invoice.id(),
                ],
            )
            .map_err(crate::Error::from)
            .add_context(&format!("updating invoice '{}'", invoice.id()))?;
        if changed == 0 {
            return Err(crate::Error::not_found("invoice", invoice.id()));
        }
        Ok(())
    }

    fn delete_invoice(&self, id: &str) -> Result<(), crate::Error> {
        let changed = self
            .conn
            .execute("DELETE FROM invoices WHERE id = ?1", [id])
            .map_err(crate::Error::from)
            .add_context(&format!("deleting invoice '{id}'"))?;
        if changed == 0 {
            return Err(crate::Error::not_found("invoice", id));
        }
        Ok(())
    }

    fn get_settings(&self) -> Result<Option<Settings>, crate::Error> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                [SETTINGS_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw)
                    .map_err(crate::Error::from)
                    .add_context("parsing settings")?,
            )),
            None => Ok(None),
        }
    }

    fn put_settings(&self, settings: &Settings) -> Result<(), crate::Error> {
        let raw = serde_json::to_string(settings)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
                params![SETTINGS_KEY, raw],
            )
            .map_err(crate::Error::from)
            .add_context("saving settings")?;
        Ok(())
    }

    fn reset_all(&self) -> Result<(), crate::Error> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM clients;
             DELETE FROM invoices;
             DELETE FROM settings;",
        )
        .map_err(crate::Error::from)
        .add_context("clearing tables")?;
        tx.commit()
            .map_err(crate::Error::from)
            .add_context("committing reset")?;
        info!("cleared all clients, invoices and settings");
        Ok(())
    }
}
