//! Invoice lifecycle: which status changes are legal, when an invoice may be edited, and the
//! derived overdue status.
//!
//! Legal edges:
//!
//! | kind       | from       | to                          |
//! |------------|------------|-----------------------------|
//! | `Create`   | (new)      | draft, created              |
//! | `EditSave` | draft      | draft, created, sent, paid  |
//! | `Advance`  | created    | sent, paid                  |
//! | `Advance`  | sent       | paid                        |
//!
//! `overdue` is never a target. `paid` has no outgoing edge.

use chrono::NaiveDate;

use crate::invoice::{Invoice, InvoiceStatus};

/// What kind of save is requesting the status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    /// First save of a new invoice.
    Create,
    /// Re-save of an invoice opened in the editor.
    EditSave,
    /// Status-only change of an issued invoice, e.g. marking it sent or paid.
    Advance,
}

/// Check a requested status change and return the resulting status.
///
/// `current` is `None` for an invoice that has never been saved.
///
/// # Errors
/// [`crate::Error`] of kind `InvalidState` when the edge is not legal for `kind`. The error
/// carries `id` and the current status so callers can tell the user what blocked the change.
pub fn transition(
    id: &str,
    current: Option<InvoiceStatus>,
    requested: InvoiceStatus,
    kind: TransitionKind,
) -> Result<InvoiceStatus, crate::Error> {
    use InvoiceStatus::*;

    let legal = match (kind, current, requested) {
        (_, _, Overdue) => false,
        (TransitionKind::Create, None, Draft | Created) => true,
        (TransitionKind::EditSave, Some(Draft), Draft | Created | Sent | Paid) => true,
        (TransitionKind::Advance, Some(Created), Sent | Paid) => true,
        (TransitionKind::Advance, Some(Sent), Paid) => true,
        _ => false,
    };

    if legal {
        return Ok(requested);
    }

    let message = match (kind, current) {
        (_, _) if requested == Overdue => {
            String::from("overdue is derived from the due date and cannot be saved")
        }
        (TransitionKind::Create, Some(_)) => format!("invoice '{id}' already exists"),
        (TransitionKind::Create, None) => {
            format!("a new invoice must be saved as draft or created, not {requested}")
        }
        (TransitionKind::EditSave, Some(status)) => {
            format!("only draft invoices can be edited; invoice '{id}' is {status}")
        }
        (_, None) => format!("invoice '{id}' has not been saved yet"),
        (TransitionKind::Advance, Some(status)) => {
            format!("invoice '{id}' cannot move from {status} to {requested}")
        }
    };
    Err(crate::Error::invalid_state(
        id,
        current.unwrap_or(requested),
        &message,
    ))
}

/// Refuse to open anything but a draft in the editor.
pub fn ensure_editable(invoice: &Invoice) -> Result<(), crate::Error> {
    if invoice.status() == InvoiceStatus::Draft {
        Ok(())
    } else {
        Err(crate::Error::invalid_state(
            invoice.id(),
            invoice.status(),
            &format!(
                "only draft invoices can be edited; invoice '{}' is {}",
                invoice.id(),
                invoice.status()
            ),
        ))
    }
}

/// `true` when an unpaid invoice's due date is strictly before `today`.
pub fn is_overdue(invoice: &Invoice, today: NaiveDate) -> bool {
    invoice.status() != InvoiceStatus::Paid && invoice.due_date() < today
}

/// Status to show in lists and reports. Never write this back to the store.
pub fn display_status(invoice: &Invoice, today: NaiveDate) -> InvoiceStatus {
    if is_overdue(invoice, today) {
        InvoiceStatus::Overdue
    } else if invoice.status() == InvoiceStatus::Overdue {
        // stale persisted value whose due date moved into the future
        InvoiceStatus::Sent
    } else {
        invoice.status()
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use chrono::Days;

    use super::*;
    use crate::invoice::{InvoiceBuilder, LineItemBuilder};
    use InvoiceStatus::*;

    fn invoice(status: InvoiceStatus, due: NaiveDate) -> Invoice {
        InvoiceBuilder::default()
            .id("INV-1")
            .client_id("c1")
            .client_name("Acme")
            .status(status)
            .date(due)
            .due_date(due)
            .add_item(
                LineItemBuilder::default()
                    .description("work")
                    .quantity(1)
                    .price(BigDecimal::from(10))
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
    fn create_allows_only_draft_or_created() {
        assert_eq!(transition("x", None, Draft, TransitionKind::Create).unwrap(), Draft);
        assert_eq!(transition("x", None, Created, TransitionKind::Create).unwrap(), Created);
        for status in [Sent, Paid, Overdue] {
            let err = transition("x", None, status, TransitionKind::Create).unwrap_err();
            assert!(err.is_invalid_state());
        }
    }

    #[test]
    fn edit_save_only_from_draft() {
        for target in [Draft, Created, Sent, Paid] {
            assert_eq!(
                transition("x", Some(Draft), target, TransitionKind::EditSave).unwrap(),
                target
            );
        }
        for from in [Created, Sent, Paid, Overdue] {
            let err = transition("x", Some(from), Draft, TransitionKind::EditSave).unwrap_err();
            assert!(err.is_invalid_state());
        }
    }

    #[test]
    fn advance_moves_forward_only() {
        assert!(transition("x", Some(Created), Sent, TransitionKind::Advance).is_ok());
        assert!(transition("x", Some(Created), Paid, TransitionKind::Advance).is_ok());
        assert!(transition("x", Some(Sent), Paid, TransitionKind::Advance).is_ok());

        assert!(transition("x", Some(Sent), Created, TransitionKind::Advance).is_err());
        assert!(transition("x", Some(Paid), Sent, TransitionKind::Advance).is_err());
        assert!(transition("x", Some(Draft), Sent, TransitionKind::Advance).is_err());
        assert!(transition("x", None, Sent, TransitionKind::Advance).is_err());
    }

    #[test]
    fn overdue_is_never_a_target() {
        for kind in [TransitionKind::Create, TransitionKind::EditSave, TransitionKind::Advance] {
            for from in [None, Some(Draft), Some(Created), Some(Sent)] {
                assert!(transition("x", from, Overdue, kind).is_err());
            }
        }
    }

    #[test]
    fn paid_is_terminal() {
        for target in [Draft, Created, Sent, Paid, Overdue] {
            assert!(transition("x", Some(Paid), target, TransitionKind::Advance).is_err());
            assert!(transition("x", Some(Paid), target, TransitionKind::EditSave).is_err());
        }
    }

    #[test]
    fn ensure_editable_guards_non_drafts() {
        let due = today();
        assert!(ensure_editable(&invoice(Draft, due)).is_ok());
        for status in [Created, Sent, Paid] {
            let err = ensure_editable(&invoice(status, due)).unwrap_err();
            assert!(err.is_invalid_state());
        }
    }

    #[test]
    fn sent_invoice_due_yesterday_is_overdue_but_stays_sent() {
        let yesterday = today().checked_sub_days(Days::new(1)).unwrap();
        let inv = invoice(Sent, yesterday);
        assert!(is_overdue(&inv, today()));
        assert_eq!(display_status(&inv, today()), Overdue);
        assert_eq!(inv.status(), Sent);
    }

    #[test]
    fn due_today_is_not_overdue() {
        let inv = invoice(Created, today());
        assert!(!is_overdue(&inv, today()));
        assert_eq!(display_status(&inv, today()), Created);
    }

    #[test]
    fn paid_is_never_overdue() {
        let long_ago = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(!is_overdue(&invoice(Paid, long_ago), today()));
        assert_eq!(display_status(&invoice(Paid, long_ago), today()), Paid);
        assert!(is_overdue(&invoice(Draft, long_ago), today()));
    }
}
