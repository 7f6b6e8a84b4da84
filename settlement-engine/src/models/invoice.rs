//! Invoice snapshot held by the client for one workflow session.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invoice payment status, derived from the outstanding amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Pending,
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvoiceError {
    #[error("invoice {0}: total amount is negative")]
    NegativeTotal(String),
    #[error("invoice {0}: outstanding amount is negative")]
    NegativeOutstanding(String),
    #[error("invoice {0}: outstanding amount exceeds total")]
    OutstandingExceedsTotal(String),
    #[error("invoice id is empty")]
    MissingId,
}

/// Input for constructing an invoice snapshot.
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub invoice_id: String,
    pub account_id: String,
    pub bill_no: String,
    pub issued_date: NaiveDate,
    pub total_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub age_in_days: u32,
}

/// A billable document owed by an account.
///
/// Amounts are private so `0 <= outstanding <= total` holds for every value of
/// this type; the status is computed rather than stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    invoice_id: String,
    account_id: String,
    bill_no: String,
    issued_date: NaiveDate,
    total_amount: Decimal,
    outstanding_amount: Decimal,
    age_in_days: u32,
}

impl Invoice {
    pub fn new(input: NewInvoice) -> Result<Self, InvoiceError> {
        if input.invoice_id.trim().is_empty() {
            return Err(InvoiceError::MissingId);
        }
        if input.total_amount < Decimal::ZERO {
            return Err(InvoiceError::NegativeTotal(input.invoice_id));
        }
        if input.outstanding_amount < Decimal::ZERO {
            return Err(InvoiceError::NegativeOutstanding(input.invoice_id));
        }
        if input.outstanding_amount > input.total_amount {
            return Err(InvoiceError::OutstandingExceedsTotal(input.invoice_id));
        }

        Ok(Self {
            invoice_id: input.invoice_id,
            account_id: input.account_id,
            bill_no: input.bill_no,
            issued_date: input.issued_date,
            total_amount: input.total_amount,
            outstanding_amount: input.outstanding_amount,
            age_in_days: input.age_in_days,
        })
    }

    pub fn invoice_id(&self) -> &str {
        &self.invoice_id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn bill_no(&self) -> &str {
        &self.bill_no
    }

    pub fn issued_date(&self) -> NaiveDate {
        self.issued_date
    }

    pub fn total_amount(&self) -> Decimal {
        self.total_amount
    }

    pub fn outstanding_amount(&self) -> Decimal {
        self.outstanding_amount
    }

    pub fn age_in_days(&self) -> u32 {
        self.age_in_days
    }

    pub fn status(&self) -> InvoiceStatus {
        if self.outstanding_amount.is_zero() {
            InvoiceStatus::Paid
        } else if self.outstanding_amount == self.total_amount {
            InvoiceStatus::Pending
        } else {
            InvoiceStatus::PartiallyPaid
        }
    }
}
