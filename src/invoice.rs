//! Invoice domain types and serialization helpers.
//!
//! This module defines the invoice record, its line items and the persisted status. It also
//! provides custom serde helpers for types that need a stable text form in JSON
//! ([`BigDecimal`] and [`NaiveDate`]). Builders are derived for constructing instances, with
//! custom build logic that fills defaults and computes the stored total.

use std::{collections::HashSet, fmt::Display, str::FromStr};

use bigdecimal::{BigDecimal, Zero};
use chrono::{Local, NaiveDate};
use derive_builder::Builder;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{client::Client, money, money::Totals};

/// Tax label used when neither the invoice nor the settings name one.
pub const DEFAULT_TAX_LABEL: &str = "Tax";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn serialize_bigdecimal<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// Accepts either a JSON string (`"19.99"`) or a JSON number (`19.99`). Records written by older
/// versions of the application stored plain numbers.
pub(crate) fn deserialize_bigdecimal<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    let raw = match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    };
    BigDecimal::from_str(raw.trim()).map_err(serde::de::Error::custom)
}

fn serialize_date<S>(value: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.format(DATE_FORMAT).to_string())
}

fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
}

fn default_tax_label() -> String {
    DEFAULT_TAX_LABEL.to_string()
}

/// Persisted invoice status.
///
/// `Overdue` exists so records carrying it can be read, but no save flow ever writes it. Whether
/// an invoice is overdue is derived at display time, see [`crate::lifecycle::display_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Created,
    Sent,
    Paid,
    Overdue,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Created => "created",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
        }
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "created" => Ok(InvoiceStatus::Created),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            other => Err(crate::Error::from(format!("unknown invoice status '{other}'"))),
        }
    }
}

/// A single billable line: description, quantity and unit price.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), pattern = "owned")]
pub struct LineItem {
    /// Unique within the owning invoice. Left empty, it is assigned when the invoice is built.
    #[builder(default)]
    #[serde(default)]
    id: String,
    description: String,
    quantity: i32,
    #[serde(
        serialize_with = "serialize_bigdecimal",
        deserialize_with = "deserialize_bigdecimal"
    )]
    price: BigDecimal,
}

impl LineItem {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> i32 {
        self.quantity
    }

    /// Return the unit price for this line item.
    pub fn price(&self) -> &BigDecimal {
        &self.price
    }

    /// Return the extended price, `quantity * price`, unrounded.
    pub fn total(&self) -> BigDecimal {
        &self.price * self.quantity
    }
}

/// Invoice record as stored and listed.
///
/// `client_name` is a snapshot of the client's name taken when the invoice was saved, so the
/// invoice stays readable after the client is deleted. `total` is computed by the builder and
/// stored alongside the items for fast listing.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into), pattern = "owned", build_fn(skip))]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    id: String,
    client_id: String,
    client_name: String,
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    date: NaiveDate,
    #[serde(serialize_with = "serialize_date", deserialize_with = "deserialize_date")]
    due_date: NaiveDate,
    items: Vec<LineItem>,
    status: InvoiceStatus,
    #[builder(setter(skip))]
    #[serde(
        serialize_with = "serialize_bigdecimal",
        deserialize_with = "deserialize_bigdecimal"
    )]
    total: BigDecimal,
    #[serde(default = "default_tax_label")]
    tax_label: String,
    #[serde(
        default,
        serialize_with = "serialize_bigdecimal",
        deserialize_with = "deserialize_bigdecimal"
    )]
    tax_rate: BigDecimal,
}

impl Invoice {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// Issue date.
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// Return a reference to the invoice's line items, in display order.
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The persisted status. For the status shown to users see
    /// [`crate::lifecycle::display_status`].
    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    /// The stored total, as computed when this invoice was last built.
    pub fn total(&self) -> &BigDecimal {
        &self.total
    }

    pub fn tax_label(&self) -> &str {
        &self.tax_label
    }

    pub fn tax_rate(&self) -> &BigDecimal {
        &self.tax_rate
    }

    /// Recompute subtotal, tax and total from the items and tax rate.
    pub fn totals(&self) -> Totals {
        Totals::compute(&self.items, &self.tax_rate)
    }

    /// Start a builder pre-filled with this invoice's content, for editing a draft.
    pub fn to_builder(&self) -> InvoiceBuilder {
        InvoiceBuilder::default()
            .id(self.id.clone())
            .client_id(self.client_id.clone())
            .client_name(self.client_name.clone())
            .date(self.date)
            .due_date(self.due_date)
            .items(self.items.clone())
            .status(self.status)
            .tax_label(self.tax_label.clone())
            .tax_rate(self.tax_rate.clone())
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    pub(crate) fn set_client_name(&mut self, name: &str) {
        self.client_name = name.to_string();
    }

    pub(crate) fn set_status(&mut self, status: InvoiceStatus) {
        self.status = status;
    }
}

impl InvoiceBuilder {
    /// Add a [`LineItem`] to the builder's internal list.
    ///
    /// # Example
    /// ```rust
    /// use invoicely::{InvoiceBuilder, LineItemBuilder};
    /// use bigdecimal::BigDecimal;
    /// use std::str::FromStr;
    ///
    /// let line_item = LineItemBuilder::default()
    ///     .description("This is a test")
    ///     .quantity(1)
    ///     .price(BigDecimal::from_str("12.99").unwrap())
    ///     .build().unwrap();
    /// let builder = InvoiceBuilder::default().add_item(line_item);
    /// ```
    pub fn add_item(self, item: LineItem) -> Self {
        match self.items {
            Some(mut l) => {
                l.push(item);
                Self {
                    items: Some(l),
                    ..self
                }
            }
            None => Self {
                items: Some(vec![item]),
                ..self
            },
        }
    }

    /// Bill the invoice to `client`, snapshotting its name.
    pub fn client(self, client: &Client) -> Self {
        self.client_id(client.id()).client_name(client.name())
    }

    /// Finalize the builder into an [`Invoice`], computing `total`.
    ///
    /// Missing optional fields are filled with defaults:
    /// * `id` defaults to empty; the workspace assigns one on creation.
    /// * `date` defaults to today in the local timezone; `due_date` defaults to `date`.
    /// * `items` defaults to an empty vector. Items without an id get the lowest number from 1
    ///   that no other item uses.
    /// * `tax_label` defaults to [`DEFAULT_TAX_LABEL`], `tax_rate` to zero.
    ///
    /// # Errors
    /// [`InvoiceBuilderError::UninitializedField`] if `client_id`, `client_name` or `status` is
    /// missing. There is deliberately no default status: callers choose between saving a draft
    /// and creating the invoice.
    pub fn build(self) -> Result<Invoice, InvoiceBuilderError> {
        let client_id = self
            .client_id
            .ok_or(InvoiceBuilderError::UninitializedField("client_id"))?;
        let client_name = self
            .client_name
            .ok_or(InvoiceBuilderError::UninitializedField("client_name"))?;
        let status = self
            .status
            .ok_or(InvoiceBuilderError::UninitializedField("status"))?;
        let id = self.id.unwrap_or_default();
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        let due_date = self.due_date.unwrap_or(date);
        let tax_label = self.tax_label.unwrap_or_else(default_tax_label);
        let tax_rate = self.tax_rate.unwrap_or_else(BigDecimal::zero);
        let mut items = self.items.unwrap_or_default();
        let mut taken: HashSet<String> = items
            .iter()
            .filter(|item| !item.id.is_empty())
            .map(|item| item.id.clone())
            .collect();
        let mut next = 1usize;
        for item in items.iter_mut().filter(|item| item.id.is_empty()) {
            while taken.contains(&next.to_string()) {
                next += 1;
            }
            item.id = next.to_string();
            taken.insert(item.id.clone());
        }

        let total = money::total(&items, &tax_rate);
        Ok(Invoice {
            id,
            client_id,
            client_name,
            date,
            due_date,
            items,
            status,
            total,
            tax_label,
            tax_rate,
        })
    }
}
