//! Counters for settlement outcomes. Exporting them is left to the host.

use metrics::counter;

use crate::models::PaymentMethod;
use crate::services::backend::PunchDirection;

pub fn record_submission(method: PaymentMethod, outcome: &'static str) {
    counter!(
        "settlement_submissions_total",
        "method" => method.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_precondition_failure(reason: &'static str) {
    counter!("settlement_preconditions_failed_total", "reason" => reason).increment(1);
}

pub fn record_punch(direction: PunchDirection, outcome: &'static str) {
    counter!(
        "punch_events_total",
        "direction" => direction.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}
