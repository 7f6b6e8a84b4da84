//! Wire formats exchanged with the settlement backend.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Invoice, InvoiceError, NewInvoice};

/// One entry of the `data` part of a settlement submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLine {
    pub vno: String,
    pub tagno: Option<String>,
    pub amount: Option<Decimal>,
    pub paymethod: String,
    pub remarks: String,
}

/// `{ success, message? }` returned by every write endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Invoice as listed by the tag and account read endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceRecord {
    pub vno: String,
    #[serde(rename = "acno")]
    pub account_id: String,
    #[serde(rename = "billno", default)]
    pub bill_no: String,
    #[serde(rename = "billdate")]
    pub bill_date: NaiveDate,
    pub amount: Decimal,
    pub balance: Decimal,
    #[serde(default)]
    pub days: u32,
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = InvoiceError;

    fn try_from(record: InvoiceRecord) -> Result<Self, Self::Error> {
        Invoice::new(NewInvoice {
            invoice_id: record.vno,
            account_id: record.account_id,
            bill_no: record.bill_no,
            issued_date: record.bill_date,
            total_amount: record.amount,
            outstanding_amount: record.balance,
            age_in_days: record.days,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SendOtpRequest<'a> {
    pub account_id: &'a str,
    pub approver_name: &'a str,
}

#[derive(Debug, Serialize)]
pub struct VerifyOtpRequest<'a> {
    pub account_id: &'a str,
    pub otp: &'a str,
}
