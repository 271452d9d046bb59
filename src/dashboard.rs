//! Summary figures and the recent activity feed shown on the dashboard.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;

use crate::{
    invoice::{Invoice, InvoiceStatus},
    lifecycle::is_overdue,
    money::round_currency,
};

/// Number of entries the dashboard feed shows.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_count: usize,
    pub draft_count: usize,
    /// Invoices past their due date and not paid, as of the day the stats were computed.
    pub overdue_count: usize,
    /// Sum of stored totals of issued, unpaid invoices.
    pub outstanding: BigDecimal,
}

impl DashboardStats {
    pub fn compute(invoices: &[Invoice], today: NaiveDate) -> DashboardStats {
        let outstanding = invoices
            .iter()
            .filter(|i| !matches!(i.status(), InvoiceStatus::Draft | InvoiceStatus::Paid))
            .fold(BigDecimal::zero(), |acc, i| acc + i.total());
        DashboardStats {
            total_count: invoices.len(),
            draft_count: invoices
                .iter()
                .filter(|i| i.status() == InvoiceStatus::Draft)
                .count(),
            overdue_count: invoices.iter().filter(|i| is_overdue(i, today)).count(),
            outstanding: round_currency(&outstanding),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    InvoiceCreated,
    InvoiceSent,
    PaymentReceived,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub kind: ActivityKind,
    pub invoice_id: String,
    pub date: NaiveDate,
    pub description: String,
}

/// The `limit` most recent invoices by issue date, newest first, described by what last happened
/// to them.
pub fn recent_activity(invoices: &[Invoice], limit: usize) -> Vec<Activity> {
    let mut recent: Vec<&Invoice> = invoices.iter().collect();
    recent.sort_by(|a, b| b.date().cmp(&a.date()));
    recent
        .into_iter()
        .take(limit)
        .map(|invoice| {
            let (kind, description) = match invoice.status() {
                InvoiceStatus::Paid => (
                    ActivityKind::PaymentReceived,
                    format!("Payment received for Invoice #{}", invoice.id()),
                ),
                InvoiceStatus::Sent | InvoiceStatus::Overdue => (
                    ActivityKind::InvoiceSent,
                    format!(
                        "Invoice #{} sent to {}",
                        invoice.id(),
                        invoice.client_name()
                    ),
                ),
                InvoiceStatus::Draft | InvoiceStatus::Created => (
                    ActivityKind::InvoiceCreated,
                    format!(
                        "Invoice #{} created for {}",
                        invoice.id(),
                        invoice.client_name()
                    ),
                ),
            };
            Activity {
                kind,
                invoice_id: invoice.id().to_string(),
                date: invoice.date(),
                description,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::invoice::{InvoiceBuilder, LineItemBuilder};

    fn invoice(id: &str, status: InvoiceStatus, date: (i32, u32, u32), price: &str) -> Invoice {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        InvoiceBuilder::default()
            .id(id)
            .client_id("c1")
            .client_name("Acme")
            .status(status)
            .date(date)
            .due_date(date)
            .add_item(
                LineItemBuilder::default()
                    .description("work")
                    .quantity(1)
                    .price(BigDecimal::from_str(price).unwrap())
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn stats_count_and_sum() {
        let invoices = vec![
            invoice("INV-1", InvoiceStatus::Draft, (2026, 10, 20), "10.00"),
            invoice("INV-2", InvoiceStatus::Created, (2026, 10, 20), "20.00"),
            invoice("INV-3", InvoiceStatus::Sent, (2026, 10, 1), "30.50"),
            invoice("INV-4", InvoiceStatus::Paid, (2026, 9, 1), "99.00"),
        ];
        let stats = DashboardStats::compute(&invoices, today());
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.draft_count, 1);
        assert_eq!(stats.overdue_count, 1);
        assert_eq!(stats.outstanding, BigDecimal::from_str("50.50").unwrap());
    }

    #[test]
    fn empty_dashboard() {
        let stats = DashboardStats::compute(&[], today());
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.outstanding, BigDecimal::from_str("0.00").unwrap());
        assert!(recent_activity(&[], RECENT_ACTIVITY_LIMIT).is_empty());
    }

    #[test]
    fn activity_is_newest_first_and_limited() {
        let invoices: Vec<Invoice> = (1..=7)
            .map(|day| invoice(&format!("INV-{day}"), InvoiceStatus::Created, (2026, 10, day), "1"))
            .collect();
        let feed = recent_activity(&invoices, RECENT_ACTIVITY_LIMIT);
        let ids: Vec<&str> = feed.iter().map(|a| a.invoice_id.as_str()).collect();
        assert_eq!(ids, vec!["INV-7", "INV-6", "INV-5", "INV-4", "INV-3"]);
    }

    #[test]
    fn activity_describes_status() {
        let invoices = vec![
            invoice("INV-1", InvoiceStatus::Paid, (2026, 10, 3), "1"),
            invoice("INV-2", InvoiceStatus::Sent, (2026, 10, 2), "1"),
            invoice("INV-3", InvoiceStatus::Draft, (2026, 10, 1), "1"),
        ];
        let feed = recent_activity(&invoices, 10);
        assert_eq!(feed[0].kind, ActivityKind::PaymentReceived);
        assert_eq!(feed[0].description, "Payment received for Invoice #INV-1");
        assert_eq!(feed[1].kind, ActivityKind::InvoiceSent);
        assert_eq!(feed[1].description, "Invoice #INV-2 sent to Acme");
        assert_eq!(feed[2].kind, ActivityKind::InvoiceCreated);
        assert_eq!(feed[2].description, "Invoice #INV-3 created for Acme");
    }
}
