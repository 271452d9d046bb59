//! Local validation run before any record reaches the store.
//!
//! Every problem in a record is collected so the user can fix them in one pass.

use std::collections::HashSet;

use bigdecimal::{BigDecimal, Zero};

use crate::{client::Client, invoice::Invoice};

pub fn validate_client(client: &Client) -> Result<(), crate::Error> {
    let mut problems = Vec::new();
    if client.name().trim().is_empty() {
        problems.push(String::from("client name is required"));
    }
    let email = client.email().trim();
    if !email.is_empty() && !email.contains('@') {
        problems.push(format!("'{email}' is not an email address"));
    }
    finish(problems)
}

/// Check an invoice's content. Status legality is checked separately by
/// [`crate::lifecycle::transition`].
pub fn validate_invoice(invoice: &Invoice) -> Result<(), crate::Error> {
    let mut problems = Vec::new();
    let zero = BigDecimal::zero();

    if invoice.client_id().trim().is_empty() {
        problems.push(String::from("a client must be selected"));
    }
    if invoice.items().is_empty() {
        problems.push(String::from("at least one line item is required"));
    }
    if invoice.tax_rate() < &zero {
        problems.push(format!(
            "tax rate must not be negative, got {}",
            invoice.tax_rate()
        ));
    }
    if invoice.due_date() < invoice.date() {
        problems.push(String::from("due date must not be before the issue date"));
    }

    let mut seen = HashSet::new();
    for (idx, item) in invoice.items().iter().enumerate() {
        let line = idx + 1;
        if item.description().trim().is_empty() {
            problems.push(format!("line {line}: description is required"));
        }
        if item.quantity() < 1 {
            problems.push(format!(
                "line {line}: quantity must be at least 1, got {}",
                item.quantity()
            ));
        }
        if item.price() < &zero {
            problems.push(format!(
                "line {line}: price must not be negative, got {}",
                item.price()
            ));
        }
        if !seen.insert(item.id()) {
            problems.push(format!("line {line}: duplicate line item id '{}'", item.id()));
        }
    }

    finish(problems)
}

fn finish(problems: Vec<String>) -> Result<(), crate::Error> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::validation(problems))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;

    use super::*;
    use crate::{
        ErrorKind,
        client::ClientBuilder,
        invoice::{InvoiceBuilder, InvoiceStatus, LineItem, LineItemBuilder},
    };

    fn item(id: &str, quantity: i32, price: &str) -> LineItem {
        LineItemBuilder::default()
            .id(id)
            .description("work")
            .quantity(quantity)
            .price(BigDecimal::from_str(price).unwrap())
            .build()
            .unwrap()
    }

    fn invoice_with(items: Vec<LineItem>, rate: i32) -> Invoice {
        InvoiceBuilder::default()
            .client_id("c1")
            .client_name("Acme")
            .status(InvoiceStatus::Draft)
            .items(items)
            .tax_rate(BigDecimal::from(rate))
            .build()
            .unwrap()
    }

    fn problems(err: crate::Error) -> Vec<String> {
        match err.kind() {
            ErrorKind::Validation(p) => p.clone(),
            _ => panic!("expected a validation error, got {err}"),
        }
    }

    #[test]
    fn valid_invoice_passes() {
        let inv = invoice_with(vec![item("1", 2, "50.00"), item("2", 1, "0")], 10);
        assert!(validate_invoice(&inv).is_ok());
    }

    #[test]
    fn empty_items_rejected() {
        let err = validate_invoice(&invoice_with(vec![], 0)).unwrap_err();
        assert_eq!(problems(err), vec!["at least one line item is required"]);
    }

    #[test]
    fn bad_quantity_price_and_rate_are_all_reported() {
        let inv = invoice_with(vec![item("1", 0, "5.00"), item("2", 1, "-1.00")], -5);
        let found = problems(validate_invoice(&inv).unwrap_err());
        assert_eq!(found.len(), 3);
        assert!(found.iter().any(|p| p.contains("tax rate")));
        assert!(found.iter().any(|p| p.starts_with("line 1: quantity")));
        assert!(found.iter().any(|p| p.starts_with("line 2: price")));
    }

    #[test]
    fn negative_quantity_rejected() {
        let inv = invoice_with(vec![item("1", -3, "5.00")], 0);
        assert!(validate_invoice(&inv).unwrap_err().is_validation());
    }

    #[test]
    fn duplicate_item_ids_rejected() {
        let inv = invoice_with(vec![item("a", 1, "1"), item("a", 1, "1")], 0);
        let found = problems(validate_invoice(&inv).unwrap_err());
        assert!(found[0].contains("duplicate"));
    }

    #[test]
    fn due_before_issue_rejected() {
        let inv = InvoiceBuilder::default()
            .client_id("c1")
            .client_name("Acme")
            .status(InvoiceStatus::Created)
            .date(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap())
            .due_date(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap())
            .add_item(item("1", 1, "1"))
            .build()
            .unwrap();
        assert!(validate_invoice(&inv).is_err());
    }

    #[test]
    fn client_requires_name_and_plausible_email() {
        let ok = ClientBuilder::default().name("Acme").build().unwrap();
        assert!(validate_client(&ok).is_ok());

        let bad = ClientBuilder::default()
            .name(" ")
            .email("nope")
            .build()
            .unwrap();
        assert_eq!(problems(validate_client(&bad).unwrap_err()).len(), 2);
    }
}
