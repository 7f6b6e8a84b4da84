use serde::{Deserialize, Serialize};

/// How a settlement is being recorded against the selected invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Cheque,
    PayLater,
    Approval,
    Uncollected,
    Undelivered,
}

impl PaymentMethod {
    /// Canonical spelling used in the `paymethod` field of the submission.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::PayLater => "pay_later",
            PaymentMethod::Approval => "approval",
            PaymentMethod::Uncollected => "uncollected",
            PaymentMethod::Undelivered => "undelivered",
        }
    }

    /// Methods where money changes hands and a collected amount must be entered.
    pub fn collects_money(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Cash | PaymentMethod::Upi | PaymentMethod::Cheque
        )
    }

    /// Methods whose collected amount is forced to zero and sent as `null`.
    pub fn forces_zero_amount(&self) -> bool {
        matches!(
            self,
            PaymentMethod::PayLater | PaymentMethod::Uncollected | PaymentMethod::Undelivered
        )
    }

    /// Methods that record a failed visit or delivery rather than a payment.
    pub fn is_failure_outcome(&self) -> bool {
        matches!(self, PaymentMethod::Uncollected | PaymentMethod::Undelivered)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a line was short-paid, uncollected or undelivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    CustomerNotAvailable,
    ShopClosed,
    InsufficientFunds,
    PaymentDisputed,
    AddressNotFound,
    GoodsRefused,
    Other(String),
}

impl ReasonCode {
    /// Text sent in the `remarks` field.
    pub fn remarks(&self) -> &str {
        match self {
            ReasonCode::CustomerNotAvailable => "Customer not available",
            ReasonCode::ShopClosed => "Shop closed",
            ReasonCode::InsufficientFunds => "Insufficient funds",
            ReasonCode::PaymentDisputed => "Payment disputed",
            ReasonCode::AddressNotFound => "Address not found",
            ReasonCode::GoodsRefused => "Goods refused",
            ReasonCode::Other(text) => text.trim(),
        }
    }

    /// A free-text reason with no content does not count as a reason.
    pub fn is_blank(&self) -> bool {
        self.remarks().is_empty()
    }
}
