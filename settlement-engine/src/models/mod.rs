pub mod coordinate;
pub mod invoice;
pub mod method;

pub use coordinate::Coordinate;
pub use invoice::{Invoice, InvoiceError, InvoiceStatus, NewInvoice};
pub use method::{PaymentMethod, ReasonCode};

/// Monetary amounts are exact decimals in the account currency.
pub type Money = rust_decimal::Decimal;
