//! Legal states and transitions for tags, delivered invoices, visits and punches.
//!
//! Every transition is one-directional. A refused transition is a local
//! `PreconditionFailed`; nothing here performs I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PreconditionReason, SettlementError};
use crate::models::Coordinate;
use crate::services::evidence::{self, EvidenceBundle};
use crate::services::geo::Geofence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupState {
    NotPicked,
    Picked,
}

/// Per-invoice state in the delivery context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryState::Pending => "pending",
            DeliveryState::Delivered => "delivered",
            DeliveryState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryState::Pending)
    }

    pub fn transition(self, to: DeliveryState) -> Result<DeliveryState, SettlementError> {
        match (self, to) {
            (DeliveryState::Pending, DeliveryState::Delivered | DeliveryState::Failed) => Ok(to),
            _ => Err(invalid(self.as_str(), to.as_str())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagState {
    NotPicked,
    Picked,
    OutForDelivery,
}

impl TagState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagState::NotPicked => "not_picked",
            TagState::Picked => "picked",
            TagState::OutForDelivery => "out_for_delivery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitState {
    NotVisited,
    Visited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PunchState {
    Offline,
    Online,
}

impl PunchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchState::Offline => "offline",
            PunchState::Online => "online",
        }
    }

    /// Offline -> Online, only from inside the office geofence.
    pub fn check_punch_in(
        &self,
        office: &Geofence,
        position: Coordinate,
    ) -> Result<(), SettlementError> {
        if *self != PunchState::Offline {
            return Err(invalid(self.as_str(), PunchState::Online.as_str()));
        }
        office.check(position).map(|_| ())
    }

    /// Online -> Offline has no gate beyond being online.
    pub fn check_punch_out(&self) -> Result<(), SettlementError> {
        if *self != PunchState::Online {
            return Err(invalid(self.as_str(), PunchState::Offline.as_str()));
        }
        Ok(())
    }
}

fn invalid(from: &'static str, to: &'static str) -> SettlementError {
    SettlementError::precondition(PreconditionReason::InvalidTransition { from, to })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLine {
    pub invoice_id: String,
    pub pickup: PickupState,
    pub delivery: DeliveryState,
}

/// A day's batch of invoices assigned to one field agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
    tag_id: String,
    agent_id: String,
    tag_date: NaiveDate,
    lines: Vec<TagLine>,
    state: TagState,
}

impl Tag {
    /// A freshly assigned tag: every invoice not yet picked. Duplicate ids collapse.
    pub fn new(
        tag_id: impl Into<String>,
        agent_id: impl Into<String>,
        tag_date: NaiveDate,
        invoice_ids: impl IntoIterator<Item = String>,
    ) -> Result<Self, SettlementError> {
        let mut lines: Vec<TagLine> = Vec::new();
        for invoice_id in invoice_ids {
            if !lines.iter().any(|l| l.invoice_id == invoice_id) {
                lines.push(TagLine {
                    invoice_id,
                    pickup: PickupState::NotPicked,
                    delivery: DeliveryState::Pending,
                });
            }
        }
        Self::from_lines(tag_id, agent_id, tag_date, lines, false)
    }

    /// Restore a tag snapshot. The tag state is derived from the lines unless the
    /// backend reports it already dispatched.
    pub fn from_lines(
        tag_id: impl Into<String>,
        agent_id: impl Into<String>,
        tag_date: NaiveDate,
        lines: Vec<TagLine>,
        dispatched: bool,
    ) -> Result<Self, SettlementError> {
        if lines.is_empty() {
            return Err(PreconditionReason::EmptySelection.into());
        }

        let mut tag = Self {
            tag_id: tag_id.into(),
            agent_id: agent_id.into(),
            tag_date,
            lines,
            state: TagState::NotPicked,
        };
        tag.refresh_pickup_state();
        if dispatched {
            if !tag.all_picked() {
                return Err(tag.not_all_picked());
            }
            tag.state = TagState::OutForDelivery;
        }
        Ok(tag)
    }

    pub fn tag_id(&self) -> &str {
        &self.tag_id
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn tag_date(&self) -> NaiveDate {
        self.tag_date
    }

    pub fn state(&self) -> TagState {
        self.state
    }

    pub fn lines(&self) -> &[TagLine] {
        &self.lines
    }

    pub fn line(&self, invoice_id: &str) -> Option<&TagLine> {
        self.lines.iter().find(|l| l.invoice_id == invoice_id)
    }

    pub fn contains(&self, invoice_id: &str) -> bool {
        self.line(invoice_id).is_some()
    }

    pub fn all_picked(&self) -> bool {
        self.lines.iter().all(|l| l.pickup == PickupState::Picked)
    }

    /// Deliveries and payments are only possible once the tag is out for delivery.
    pub fn is_payment_eligible(&self) -> bool {
        self.state == TagState::OutForDelivery
    }

    pub fn mark_picked(&mut self, invoice_id: &str) -> Result<(), SettlementError> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.invoice_id == invoice_id)
            .ok_or_else(|| PreconditionReason::UnknownInvoice(invoice_id.to_string()))?;
        line.pickup = PickupState::Picked;
        self.refresh_pickup_state();
        Ok(())
    }

    /// Picked -> OutForDelivery, only once every member invoice is picked.
    pub fn dispatch(&mut self) -> Result<(), SettlementError> {
        if self.state == TagState::OutForDelivery {
            return Err(invalid(
                TagState::OutForDelivery.as_str(),
                TagState::OutForDelivery.as_str(),
            ));
        }
        if !self.all_picked() {
            return Err(self.not_all_picked());
        }
        self.state = TagState::OutForDelivery;
        tracing::info!(tag_id = %self.tag_id, invoices = self.lines.len(), "Tag out for delivery");
        Ok(())
    }

    /// Check that `invoice_id` can move from Pending to `to`.
    pub fn ensure_can_record(
        &self,
        invoice_id: &str,
        to: DeliveryState,
    ) -> Result<(), SettlementError> {
        if !self.is_payment_eligible() {
            return Err(if self.all_picked() {
                invalid(self.state.as_str(), TagState::OutForDelivery.as_str())
            } else {
                self.not_all_picked()
            });
        }
        let line = self
            .line(invoice_id)
            .ok_or_else(|| PreconditionReason::UnknownInvoice(invoice_id.to_string()))?;
        line.delivery.transition(to).map(|_| ())
    }

    /// Apply an outcome already acknowledged by the backend.
    pub(crate) fn record_outcome(
        &mut self,
        invoice_id: &str,
        to: DeliveryState,
    ) -> Result<(), SettlementError> {
        self.ensure_can_record(invoice_id, to)?;
        if let Some(line) = self.lines.iter_mut().find(|l| l.invoice_id == invoice_id) {
            line.delivery = to;
        }
        Ok(())
    }

    fn refresh_pickup_state(&mut self) {
        if self.state == TagState::OutForDelivery {
            return;
        }
        self.state = if self.all_picked() {
            TagState::Picked
        } else {
            TagState::NotPicked
        };
    }

    fn not_all_picked(&self) -> SettlementError {
        PreconditionReason::NotAllPicked {
            not_picked: self
                .lines
                .iter()
                .filter(|l| l.pickup == PickupState::NotPicked)
                .map(|l| l.invoice_id.clone())
                .collect(),
        }
        .into()
    }
}

/// How a visit may be marked: by standing near the account, or by evidence.
#[derive(Debug, Clone, Copy)]
pub enum VisitGate<'a> {
    Proximity { position: Coordinate, radius_km: f64 },
    Evidence(&'a EvidenceBundle),
}

/// A collection visit to one account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Visit {
    account_id: String,
    registered_location: Option<Coordinate>,
    state: VisitState,
}

impl Visit {
    pub fn new(account_id: impl Into<String>, registered_location: Option<Coordinate>) -> Self {
        Self {
            account_id: account_id.into(),
            registered_location,
            state: VisitState::NotVisited,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn registered_location(&self) -> Option<Coordinate> {
        self.registered_location
    }

    pub fn state(&self) -> VisitState {
        self.state
    }

    pub fn mark_visited(&mut self, gate: VisitGate<'_>) -> Result<(), SettlementError> {
        if self.state == VisitState::Visited {
            return Err(invalid("visited", "visited"));
        }

        match gate {
            VisitGate::Proximity {
                position,
                radius_km,
            } => {
                // An account without a registered location can only be visited on evidence.
                let registered = self.registered_location.ok_or(
                    PreconditionReason::OutOfRange {
                        distance_km: f64::INFINITY,
                        radius_km,
                    },
                )?;
                Geofence::new(registered, radius_km).check(position)?;
            }
            VisitGate::Evidence(bundle) => {
                let result = evidence::validate_visit(bundle);
                if !result.is_ready() {
                    return Err(PreconditionReason::MissingEvidence(result.into_missing()).into());
                }
            }
        }

        self.state = VisitState::Visited;
        tracing::info!(account_id = %self.account_id, "Visit marked");
        Ok(())
    }

    /// A committed collection settlement also counts as the visit.
    pub(crate) fn record_settlement(&mut self) {
        self.state = VisitState::Visited;
    }
}
