//! OTP approval for the Approval settlement method.
//!
//! A `VerifiedOtp` can only be obtained from a successful `verify_otp` call and
//! is bound to the account it was verified for.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::error::{PreconditionReason, SettlementError};
use crate::services::backend::SettlementBackend;
use crate::services::evidence::MissingField;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedOtp {
    account_id: String,
    verified_at: DateTime<Utc>,
}

impl VerifiedOtp {
    pub(crate) fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            verified_at: Utc::now(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

#[derive(Clone)]
pub struct ApprovalGate<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: SettlementBackend + ?Sized> ApprovalGate<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Ask the backend to send an OTP to the approver responsible for `account_id`.
    #[instrument(skip(self))]
    pub async fn send_otp(
        &self,
        account_id: &str,
        approver_name: &str,
    ) -> Result<(), SettlementError> {
        if approver_name.trim().is_empty() {
            return Err(PreconditionReason::MissingEvidence(vec![MissingField::OtpVerified]).into());
        }

        let ack = self.backend.send_otp(account_id, approver_name).await?;
        if ack.success {
            tracing::info!("Approval OTP sent");
            Ok(())
        } else {
            Err(SettlementError::ValidationRejected {
                message: ack.message.unwrap_or_else(|| "OTP could not be sent".to_string()),
            })
        }
    }

    #[instrument(skip(self, otp))]
    pub async fn verify_otp(
        &self,
        account_id: &str,
        otp: &str,
    ) -> Result<VerifiedOtp, SettlementError> {
        let otp = otp.trim();
        if otp.is_empty() {
            return Err(PreconditionReason::MissingEvidence(vec![MissingField::OtpVerified]).into());
        }

        let ack = self.backend.verify_otp(account_id, otp).await?;
        if ack.success {
            tracing::info!("Approval OTP verified");
            Ok(VerifiedOtp::new(account_id))
        } else {
            tracing::warn!(message = ?ack.message, "Approval OTP rejected");
            Err(SettlementError::ValidationRejected {
                message: ack.message.unwrap_or_else(|| "Invalid OTP".to_string()),
            })
        }
    }
}
