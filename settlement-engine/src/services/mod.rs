pub mod allocation;
pub mod approval;
pub mod backend;
pub mod device;
pub mod evidence;
pub mod geo;
pub mod intent;
pub mod lifecycle;
pub mod metrics;
pub mod punch;
pub mod session;
pub mod submitter;

pub use allocation::{allocate, select_by_budget, Allocation, LineAllocation, LineStatus};
pub use approval::{ApprovalGate, VerifiedOtp};
pub use backend::{HttpBackend, PunchDirection, SettlementBackend, SettlementSubmission};
pub use device::{acquire_location, collect_evidence, DeviceError, DeviceServices};
pub use evidence::{EvidenceBundle, MissingField, Photo, PhotoKind, ValidationResult};
pub use geo::{distance_km, within_radius, Geofence};
pub use intent::{SettlementIntent, SettlementIntentBuilder};
pub use lifecycle::{
    DeliveryState, PickupState, PunchState, Tag, TagState, Visit, VisitGate, VisitState,
};
pub use punch::PunchClock;
pub use session::{FieldSession, SessionContext};
pub use submitter::{SettlementReceipt, SettlementSubmitter};
