pub mod config;
pub mod dtos;
pub mod error;
pub mod models;
pub mod services;

pub use config::SettlementConfig;
pub use error::{PreconditionReason, SettlementError};
