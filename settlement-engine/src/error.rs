//! Settlement error taxonomy.
//!
//! Local checks fail with `PreconditionFailed` before any I/O. Everything that
//! crosses the network is normalised from `AppError` at the submitter boundary.

use service_core::error::AppError;
use thiserror::Error;

use crate::services::evidence::MissingField;

/// Why a transition or submission was refused locally.
#[derive(Debug, Clone, PartialEq)]
pub enum PreconditionReason {
    NotAllPicked { not_picked: Vec<String> },
    OutOfRange { distance_km: f64, radius_km: f64 },
    MissingEvidence(Vec<MissingField>),
    AllocationMismatch,
    SubmissionInProgress,
    InvalidTransition { from: &'static str, to: &'static str },
    StaleSnapshot,
    UnknownInvoice(String),
    AccountMismatch(String),
    EmptySelection,
}

impl PreconditionReason {
    pub fn code(&self) -> &'static str {
        match self {
            PreconditionReason::NotAllPicked { .. } => "NOT_ALL_PICKED",
            PreconditionReason::OutOfRange { .. } => "OUT_OF_RANGE",
            PreconditionReason::MissingEvidence(_) => "MISSING_EVIDENCE",
            PreconditionReason::AllocationMismatch => "ALLOCATION_MISMATCH",
            PreconditionReason::SubmissionInProgress => "SUBMISSION_IN_PROGRESS",
            PreconditionReason::InvalidTransition { .. } => "INVALID_TRANSITION",
            PreconditionReason::StaleSnapshot => "STALE_SNAPSHOT",
            PreconditionReason::UnknownInvoice(_) => "UNKNOWN_INVOICE",
            PreconditionReason::AccountMismatch(_) => "ACCOUNT_MISMATCH",
            PreconditionReason::EmptySelection => "EMPTY_SELECTION",
        }
    }
}

impl std::fmt::Display for PreconditionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreconditionReason::NotAllPicked { not_picked } => {
                write!(f, "{} ({})", self.code(), not_picked.join(", "))
            }
            PreconditionReason::OutOfRange {
                distance_km,
                radius_km,
            } => write!(
                f,
                "{} ({:.3} km from reference, limit {:.3} km)",
                self.code(),
                distance_km,
                radius_km
            ),
            PreconditionReason::MissingEvidence(fields) => {
                let names: Vec<&str> = fields.iter().map(MissingField::as_str).collect();
                write!(f, "{} ({})", self.code(), names.join(", "))
            }
            PreconditionReason::InvalidTransition { from, to } => {
                write!(f, "{} ({} -> {})", self.code(), from, to)
            }
            PreconditionReason::UnknownInvoice(id) | PreconditionReason::AccountMismatch(id) => {
                write!(f, "{} ({})", self.code(), id)
            }
            _ => f.write_str(self.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    #[error("Precondition failed: {0}")]
    PreconditionFailed(PreconditionReason),

    #[error("Rejected by backend: {message}")]
    ValidationRejected { message: String },

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl SettlementError {
    pub fn precondition(reason: PreconditionReason) -> Self {
        SettlementError::PreconditionFailed(reason)
    }

    /// The reason code when this is a local precondition failure.
    pub fn reason(&self) -> Option<&PreconditionReason> {
        match self {
            SettlementError::PreconditionFailed(reason) => Some(reason),
            _ => None,
        }
    }

    /// True when the caller may re-offer the same intent without re-entering data.
    pub fn is_retryable_as_is(&self) -> bool {
        matches!(
            self,
            SettlementError::TransportFailure(_) | SettlementError::Unexpected(_)
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SettlementError::PreconditionFailed(_) => "precondition_failed",
            SettlementError::ValidationRejected { .. } => "validation_rejected",
            SettlementError::TransportFailure(_) => "transport_failure",
            SettlementError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<PreconditionReason> for SettlementError {
    fn from(reason: PreconditionReason) -> Self {
        SettlementError::PreconditionFailed(reason)
    }
}

impl From<AppError> for SettlementError {
    fn from(err: AppError) -> Self {
        if err.is_transport() {
            SettlementError::TransportFailure(err.to_string())
        } else {
            SettlementError::Unexpected(err.to_string())
        }
    }
}
