//! The immutable description of one settlement attempt.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::dtos::SettlementLine;
use crate::error::{PreconditionReason, SettlementError};
use crate::models::{Coordinate, Invoice, Money, PaymentMethod, ReasonCode};
use crate::services::allocation::{self, Allocation};
use crate::services::approval::VerifiedOtp;
use crate::services::evidence::{self, EvidenceBundle, EvidenceContext, Photo, ValidationResult};

/// A validated settlement attempt.
///
/// Once built it cannot change, so the same value can be re-submitted after a
/// transport failure without re-running allocation or validation.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementIntent {
    intent_id: Uuid,
    method: PaymentMethod,
    account_id: String,
    tag_id: Option<String>,
    allocation: Allocation,
    evidence: EvidenceBundle,
    coordinates: Coordinate,
    created_at: DateTime<Utc>,
}

impl SettlementIntent {
    pub fn intent_id(&self) -> Uuid {
        self.intent_id
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn tag_id(&self) -> Option<&str> {
        self.tag_id.as_deref()
    }

    pub fn collected_amount(&self) -> Money {
        self.allocation.collected_amount
    }

    pub fn allocation(&self) -> &Allocation {
        &self.allocation
    }

    pub fn evidence(&self) -> &EvidenceBundle {
        &self.evidence
    }

    pub fn coordinates(&self) -> Coordinate {
        self.coordinates
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn invoice_ids(&self) -> impl Iterator<Item = &str> {
        self.allocation.lines.iter().map(|l| l.invoice_id.as_str())
    }

    /// The `data` part: one entry per allocation line, amount omitted for
    /// methods that carry no money.
    pub fn lines(&self) -> Vec<SettlementLine> {
        let remarks = self
            .evidence
            .reason()
            .map(|r| r.remarks().to_string())
            .unwrap_or_default();

        self.allocation
            .lines
            .iter()
            .map(|line| SettlementLine {
                vno: line.invoice_id.clone(),
                tagno: self.tag_id.clone(),
                amount: if self.method.forces_zero_amount() {
                    None
                } else {
                    Some(line.paid_amount)
                },
                paymethod: self.method.as_str().to_string(),
                remarks: remarks.clone(),
            })
            .collect()
    }
}

/// Accumulates form state for one settlement and validates it as a whole.
#[derive(Debug, Clone)]
pub struct SettlementIntentBuilder {
    method: PaymentMethod,
    account_id: String,
    tag_id: Option<String>,
    invoices: Vec<Invoice>,
    collected_amount: Option<Money>,
    evidence: EvidenceBundle,
}

impl SettlementIntentBuilder {
    pub fn new(method: PaymentMethod, account_id: impl Into<String>) -> Self {
        Self {
            method,
            account_id: account_id.into(),
            tag_id: None,
            invoices: Vec::new(),
            collected_amount: None,
            evidence: EvidenceBundle::new(),
        }
    }

    /// Switch the account being settled. A verified OTP for another account is dropped.
    pub fn account(mut self, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        if account_id != self.account_id {
            self.evidence.clear_otp();
            self.account_id = account_id;
        }
        self
    }

    pub fn tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id.into());
        self
    }

    /// Selected invoices in selection order. Repeats are dropped.
    pub fn invoices(mut self, invoices: Vec<Invoice>) -> Self {
        self.invoices.clear();
        for invoice in invoices {
            if !self
                .invoices
                .iter()
                .any(|i| i.invoice_id() == invoice.invoice_id())
            {
                self.invoices.push(invoice);
            }
        }
        self
    }

    pub fn collected_amount(mut self, amount: Money) -> Self {
        self.collected_amount = Some(amount);
        self
    }

    pub fn photo(mut self, photo: Photo) -> Self {
        self.evidence.set_photo(photo);
        self
    }

    pub fn reason(mut self, reason: ReasonCode) -> Self {
        self.evidence = self.evidence.with_reason(reason);
        self
    }

    pub fn coordinates(mut self, coordinates: Coordinate) -> Self {
        self.evidence = self.evidence.with_coordinates(coordinates);
        self
    }

    pub fn verified_otp(mut self, otp: VerifiedOtp) -> Self {
        self.evidence = self.evidence.with_otp(otp);
        self
    }

    pub fn evidence(mut self, evidence: EvidenceBundle) -> Self {
        self.evidence = evidence;
        self
    }

    fn effective_amount(&self) -> Option<Money> {
        if self.method.forces_zero_amount() {
            Some(Decimal::ZERO)
        } else {
            self.collected_amount
        }
    }

    /// Allocation for the current form state; cheap enough to call on every keystroke.
    pub fn preview_allocation(&self) -> Allocation {
        allocation::allocate(
            &self.invoices,
            self.effective_amount().unwrap_or(Decimal::ZERO),
        )
    }

    /// Evidence check for the current form state, without building.
    pub fn check_evidence(&self) -> ValidationResult {
        let outstanding_total: Money =
            self.invoices.iter().map(|i| i.outstanding_amount()).sum();
        evidence::validate(
            self.method,
            &self.evidence,
            &EvidenceContext {
                account_id: &self.account_id,
                collected_amount: self.effective_amount(),
                outstanding_total,
            },
        )
    }

    pub fn build(self) -> Result<SettlementIntent, SettlementError> {
        if self.invoices.is_empty() {
            return Err(PreconditionReason::EmptySelection.into());
        }

        let result = self.check_evidence();
        if !result.is_ready() {
            tracing::debug!(
                method = %self.method,
                missing = ?result.missing(),
                "Settlement evidence incomplete"
            );
            return Err(PreconditionReason::MissingEvidence(result.into_missing()).into());
        }

        let coordinates = self.evidence.coordinates().ok_or_else(|| {
            PreconditionReason::MissingEvidence(vec![evidence::MissingField::Coordinates])
        })?;
        let allocation = self.preview_allocation();

        Ok(SettlementIntent {
            intent_id: Uuid::new_v4(),
            method: self.method,
            account_id: self.account_id,
            tag_id: self.tag_id,
            allocation,
            evidence: self.evidence,
            coordinates,
            created_at: Utc::now(),
        })
    }
}
