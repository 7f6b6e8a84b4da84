//! Waterfall allocation of a collected amount across outstanding invoices.
//!
//! Invoices are consumed strictly in the order given. Both functions are pure,
//! so a UI can re-run them on every edit of the amount field.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Invoice, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Paid,
    PartiallyPaid,
    Unpaid,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Paid => "paid",
            LineStatus::PartiallyPaid => "partially_paid",
            LineStatus::Unpaid => "unpaid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineAllocation {
    pub invoice_id: String,
    pub outstanding_amount: Money,
    pub paid_amount: Money,
    pub status: LineStatus,
}

/// Result of one allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub collected_amount: Money,
    pub lines: Vec<LineAllocation>,
    /// Collected money no invoice could absorb. Disposition is the caller's call.
    pub overpayment: Money,
}

impl Allocation {
    pub fn total_paid(&self) -> Money {
        self.lines.iter().map(|l| l.paid_amount).sum()
    }

    pub fn outstanding_total(&self) -> Money {
        self.lines.iter().map(|l| l.outstanding_amount).sum()
    }

    /// Collected less than what the selection owes.
    pub fn is_short(&self) -> bool {
        self.collected_amount < self.outstanding_total()
    }

    pub fn line(&self, invoice_id: &str) -> Option<&LineAllocation> {
        self.lines.iter().find(|l| l.invoice_id == invoice_id)
    }
}

/// Distribute `collected` across `invoices` in order. Negative input is treated as zero.
pub fn allocate(invoices: &[Invoice], collected: Money) -> Allocation {
    let collected = collected.max(Decimal::ZERO);
    let mut remaining = collected;

    let lines = invoices
        .iter()
        .map(|invoice| {
            let outstanding = invoice.outstanding_amount();
            let (paid_amount, status) = if remaining <= Decimal::ZERO {
                (Decimal::ZERO, LineStatus::Unpaid)
            } else if remaining >= outstanding {
                remaining -= outstanding;
                (outstanding, LineStatus::Paid)
            } else {
                let paid = remaining;
                remaining = Decimal::ZERO;
                (paid, LineStatus::PartiallyPaid)
            };

            LineAllocation {
                invoice_id: invoice.invoice_id().to_string(),
                outstanding_amount: outstanding,
                paid_amount,
                status,
            }
        })
        .collect();

    Allocation {
        collected_amount: collected,
        lines,
        overpayment: remaining,
    }
}

/// Longest prefix of `invoices` whose outstanding total fits within `budget`.
///
/// Stops at the first invoice that would exceed the budget; later, smaller
/// invoices are not considered.
pub fn select_by_budget(invoices: &[Invoice], budget: Money) -> &[Invoice] {
    let mut running = Decimal::ZERO;
    let mut count = 0;

    for invoice in invoices {
        let next = running + invoice.outstanding_amount();
        if next > budget {
            break;
        }
        running = next;
        count += 1;
    }

    &invoices[..count]
}
