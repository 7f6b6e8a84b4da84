//! Submission of settlement intents to the backend of record.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{PreconditionReason, SettlementError};
use crate::models::{Money, PaymentMethod};
use crate::services::allocation::Allocation;
use crate::services::backend::{SettlementBackend, SettlementSubmission};
use crate::services::intent::SettlementIntent;
use crate::services::lifecycle::{Tag, Visit};
use crate::services::metrics;
use crate::services::session::{FieldSession, SessionContext};

/// What the backend acknowledged for one intent.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub intent_id: Uuid,
    pub method: PaymentMethod,
    pub allocation: Allocation,
    pub overpayment: Money,
    pub message: Option<String>,
    pub acknowledged_at: DateTime<Utc>,
}

/// Sends intents one at a time per invoice and applies acknowledged outcomes.
///
/// Clones share the in-flight registry, so a second submission touching an
/// invoice that is already being settled is refused locally.
pub struct SettlementSubmitter<B: ?Sized> {
    backend: Arc<B>,
    in_flight: Arc<DashMap<String, Uuid>>,
}

impl<B: ?Sized> Clone for SettlementSubmitter<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<B: SettlementBackend + ?Sized> SettlementSubmitter<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn is_in_flight(&self, invoice_id: &str) -> bool {
        self.in_flight.contains_key(invoice_id)
    }

    /// Fetch the open invoices of an account and start a collection session.
    #[instrument(skip(self, visit))]
    pub async fn open_collection(
        &self,
        account_id: &str,
        visit: Option<Visit>,
    ) -> Result<FieldSession, SettlementError> {
        let invoices = self.backend.fetch_invoices_for_account(account_id).await?;
        tracing::debug!(count = invoices.len(), "Fetched account invoices");
        FieldSession::collection(account_id, invoices, visit)
    }

    /// Fetch the invoices of a tag and start a delivery session.
    #[instrument(skip(self, tag), fields(tag_id = %tag.tag_id()))]
    pub async fn open_delivery(&self, tag: Tag) -> Result<FieldSession, SettlementError> {
        let invoices = self.backend.fetch_invoices_for_tag(tag.tag_id()).await?;
        tracing::debug!(count = invoices.len(), "Fetched tag invoices");
        FieldSession::delivery(tag, invoices)
    }

    /// Re-read the snapshot a session was built from.
    pub async fn refresh(&self, session: &mut FieldSession) -> Result<(), SettlementError> {
        let invoices = match session.context() {
            SessionContext::Collection { account_id, .. } => {
                self.backend.fetch_invoices_for_account(account_id).await?
            }
            SessionContext::Delivery { tag } => {
                self.backend.fetch_invoices_for_tag(tag.tag_id()).await?
            }
        };
        session.refresh(invoices)
    }

    /// Submit an intent. Local preconditions are checked before any request is
    /// made; the session only changes when the backend acknowledges.
    #[instrument(
        skip(self, intent, session),
        fields(intent_id = %intent.intent_id(), method = intent.method().as_str())
    )]
    pub async fn submit(
        &self,
        intent: &SettlementIntent,
        session: &mut FieldSession,
    ) -> Result<SettlementReceipt, SettlementError> {
        let result = self.try_submit(intent, session).await;
        match &result {
            Ok(_) => metrics::record_submission(intent.method(), "committed"),
            Err(e) => {
                if let Some(reason) = e.reason() {
                    metrics::record_precondition_failure(reason.code());
                }
                metrics::record_submission(intent.method(), e.kind());
            }
        }
        result
    }

    async fn try_submit(
        &self,
        intent: &SettlementIntent,
        session: &mut FieldSession,
    ) -> Result<SettlementReceipt, SettlementError> {
        session.check(intent)?;
        let _claim = self.claim(intent)?;

        let submission = SettlementSubmission::from_intent(intent);
        let ack = match self.backend.submit_settlement(&submission).await {
            Ok(ack) => ack,
            Err(e) => {
                tracing::warn!(error = %e, "Settlement submission failed");
                return Err(e.into());
            }
        };

        if !ack.success {
            let message = ack
                .message
                .unwrap_or_else(|| "Settlement rejected".to_string());
            tracing::info!(message = %message, "Settlement rejected by backend");
            return Err(SettlementError::ValidationRejected { message });
        }

        session.commit(intent);
        tracing::info!(
            invoice_count = intent.allocation().lines.len(),
            collected = %intent.collected_amount(),
            "Settlement acknowledged"
        );

        Ok(SettlementReceipt {
            intent_id: intent.intent_id(),
            method: intent.method(),
            allocation: intent.allocation().clone(),
            overpayment: intent.allocation().overpayment,
            message: ack.message,
            acknowledged_at: Utc::now(),
        })
    }

    /// Mark every invoice of the intent as in flight, or none of them.
    fn claim(&self, intent: &SettlementIntent) -> Result<InFlightClaim, SettlementError> {
        let mut claim = InFlightClaim {
            registry: Arc::clone(&self.in_flight),
            invoice_ids: Vec::new(),
        };

        for invoice_id in intent.invoice_ids() {
            // The entry guard must be gone before `claim` can roll back on drop.
            let holder = match self.in_flight.entry(invoice_id.to_string()) {
                Entry::Occupied(held) => Some(*held.get()),
                Entry::Vacant(slot) => {
                    slot.insert(intent.intent_id());
                    None
                }
            };

            match holder {
                Some(held_by) => {
                    tracing::debug!(
                        invoice_id,
                        held_by = %held_by,
                        "Invoice already has a submission in flight"
                    );
                    return Err(PreconditionReason::SubmissionInProgress.into());
                }
                None => claim.invoice_ids.push(invoice_id.to_string()),
            }
        }
        Ok(claim)
    }
}

/// Releases in-flight markers when the submission finishes, however it ends.
struct InFlightClaim {
    registry: Arc<DashMap<String, Uuid>>,
    invoice_ids: Vec<String>,
}

impl Drop for InFlightClaim {
    fn drop(&mut self) {
        for invoice_id in &self.invoice_ids {
            self.registry.remove(invoice_id);
        }
    }
}
