//! The client's read-through snapshot for one workflow.
//!
//! A session checks lifecycle preconditions for an intent and applies the
//! acknowledged transition. It never projects outstanding amounts: after a
//! commit it goes stale and must be refreshed from the backend.

use crate::error::{PreconditionReason, SettlementError};
use crate::models::{Invoice, InvoiceStatus, PaymentMethod};
use crate::services::allocation;
use crate::services::intent::SettlementIntent;
use crate::services::lifecycle::{DeliveryState, Tag, Visit};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionContext {
    Collection {
        account_id: String,
        visit: Option<Visit>,
    },
    Delivery {
        tag: Tag,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSession {
    invoices: Vec<Invoice>,
    context: SessionContext,
    stale: bool,
}

impl FieldSession {
    /// A visit, when given, must belong to the session's account.
    pub fn collection(
        account_id: impl Into<String>,
        invoices: Vec<Invoice>,
        visit: Option<Visit>,
    ) -> Result<Self, SettlementError> {
        let account_id = account_id.into();
        if let Some(visit) = &visit {
            if visit.account_id() != account_id {
                return Err(
                    PreconditionReason::AccountMismatch(visit.account_id().to_string()).into(),
                );
            }
        }

        Ok(Self {
            invoices,
            context: SessionContext::Collection { account_id, visit },
            stale: false,
        })
    }

    /// Every invoice of the tag must be present in the snapshot.
    pub fn delivery(tag: Tag, invoices: Vec<Invoice>) -> Result<Self, SettlementError> {
        ensure_tag_covered(&tag, &invoices)?;

        Ok(Self {
            invoices,
            context: SessionContext::Delivery { tag },
            stale: false,
        })
    }

    pub fn invoices(&self) -> &[Invoice] {
        &self.invoices
    }

    pub fn invoice(&self, invoice_id: &str) -> Option<&Invoice> {
        self.invoices.iter().find(|i| i.invoice_id() == invoice_id)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn tag(&self) -> Option<&Tag> {
        match &self.context {
            SessionContext::Delivery { tag } => Some(tag),
            SessionContext::Collection { .. } => None,
        }
    }

    pub fn tag_mut(&mut self) -> Option<&mut Tag> {
        match &mut self.context {
            SessionContext::Delivery { tag } => Some(tag),
            SessionContext::Collection { .. } => None,
        }
    }

    pub fn visit(&self) -> Option<&Visit> {
        match &self.context {
            SessionContext::Collection { visit, .. } => visit.as_ref(),
            SessionContext::Delivery { .. } => None,
        }
    }

    pub fn visit_mut(&mut self) -> Option<&mut Visit> {
        match &mut self.context {
            SessionContext::Collection { visit, .. } => visit.as_mut(),
            SessionContext::Delivery { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Replace the invoice snapshot with freshly fetched data. A delivery snapshot
    /// missing any tag invoice is refused and the session is left as it was.
    pub fn refresh(&mut self, invoices: Vec<Invoice>) -> Result<(), SettlementError> {
        if let SessionContext::Delivery { tag } = &self.context {
            ensure_tag_covered(tag, &invoices)?;
        }
        self.invoices = invoices;
        self.stale = false;
        Ok(())
    }

    /// Resolve a selection, in the caller's order, against the snapshot.
    pub fn select(&self, invoice_ids: &[&str]) -> Result<Vec<Invoice>, SettlementError> {
        if invoice_ids.is_empty() {
            return Err(PreconditionReason::EmptySelection.into());
        }

        let mut selected: Vec<Invoice> = Vec::with_capacity(invoice_ids.len());
        for id in invoice_ids {
            if selected.iter().any(|i| i.invoice_id() == *id) {
                continue;
            }
            let invoice = self
                .invoice(id)
                .ok_or_else(|| PreconditionReason::UnknownInvoice(id.to_string()))?;
            selected.push(invoice.clone());
        }
        Ok(selected)
    }

    /// Lifecycle preconditions for submitting `intent` against this snapshot.
    pub fn check(&self, intent: &SettlementIntent) -> Result<(), SettlementError> {
        if self.stale {
            return Err(PreconditionReason::StaleSnapshot.into());
        }

        let mut selected = Vec::with_capacity(intent.allocation().lines.len());
        for invoice_id in intent.invoice_ids() {
            let invoice = self
                .invoice(invoice_id)
                .ok_or_else(|| PreconditionReason::UnknownInvoice(invoice_id.to_string()))?;
            if invoice.account_id() != intent.account_id() {
                return Err(PreconditionReason::AccountMismatch(invoice_id.to_string()).into());
            }
            selected.push(invoice.clone());
        }

        match &self.context {
            SessionContext::Collection { account_id, .. } => {
                if intent.method() == PaymentMethod::Undelivered {
                    return Err(invalid_for_context(intent.method(), "collection"));
                }
                if account_id != intent.account_id() {
                    return Err(PreconditionReason::AccountMismatch(account_id.clone()).into());
                }
                if let Some(paid) = selected.iter().find(|i| i.status() == InvoiceStatus::Paid) {
                    tracing::debug!(invoice_id = paid.invoice_id(), "Invoice already paid");
                    return Err(PreconditionReason::InvalidTransition {
                        from: InvoiceStatus::Paid.as_str(),
                        to: intent.method().as_str(),
                    }
                    .into());
                }
            }
            SessionContext::Delivery { tag } => {
                if intent.method() == PaymentMethod::Uncollected {
                    return Err(invalid_for_context(intent.method(), "delivery"));
                }
                if intent.tag_id() != Some(tag.tag_id()) {
                    return Err(PreconditionReason::InvalidTransition {
                        from: tag.state().as_str(),
                        to: "foreign_tag",
                    }
                    .into());
                }
                let outcome = delivery_outcome(intent.method());
                for invoice_id in intent.invoice_ids() {
                    tag.ensure_can_record(invoice_id, outcome)?;
                }
            }
        }

        // The intent was allocated against the snapshot the UI saw; a re-fetched
        // snapshot with different balances invalidates it.
        let recomputed = allocation::allocate(&selected, intent.collected_amount());
        if &recomputed != intent.allocation() {
            return Err(PreconditionReason::AllocationMismatch.into());
        }

        Ok(())
    }

    /// Apply the transition for an intent the backend acknowledged.
    pub(crate) fn commit(&mut self, intent: &SettlementIntent) {
        match &mut self.context {
            SessionContext::Collection { visit, .. } => {
                if let Some(visit) = visit.as_mut() {
                    visit.record_settlement();
                }
            }
            SessionContext::Delivery { tag } => {
                let outcome = delivery_outcome(intent.method());
                for invoice_id in intent.invoice_ids() {
                    if let Err(e) = tag.record_outcome(invoice_id, outcome) {
                        tracing::error!(
                            invoice_id,
                            error = %e,
                            "Acknowledged outcome could not be applied locally"
                        );
                    }
                }
            }
        }
        self.stale = true;
    }
}

fn ensure_tag_covered(tag: &Tag, invoices: &[Invoice]) -> Result<(), SettlementError> {
    match tag
        .lines()
        .iter()
        .find(|line| !invoices.iter().any(|i| i.invoice_id() == line.invoice_id))
    {
        Some(missing) => {
            Err(PreconditionReason::UnknownInvoice(missing.invoice_id.clone()).into())
        }
        None => Ok(()),
    }
}

fn delivery_outcome(method: PaymentMethod) -> DeliveryState {
    if method.is_failure_outcome() {
        DeliveryState::Failed
    } else {
        DeliveryState::Delivered
    }
}

fn invalid_for_context(method: PaymentMethod, context: &'static str) -> SettlementError {
    PreconditionReason::InvalidTransition {
        from: context,
        to: method.as_str(),
    }
    .into()
}
