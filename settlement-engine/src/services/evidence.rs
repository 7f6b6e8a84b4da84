//! Proof artifacts and the per-method requirement table.
//!
//! | Method | Photos | Reason | OTP |
//! |--------|--------|--------|-----|
//! | Cash, UPI | payment | when short | no |
//! | Cheque | instrument, receiving | when short | no |
//! | PayLater | receiving | optional | no |
//! | Approval | invoice | no | yes |
//! | Uncollected, Undelivered | proof | always | no |
//!
//! Every settlement also needs a valid position for the `lat`/`long` parts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Coordinate, Money, PaymentMethod, ReasonCode};
use crate::services::approval::VerifiedOtp;

/// Multipart part names, assigned to required photos in table order.
pub const PHOTO_PARTS: [&str; 3] = ["image", "image1", "image2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoKind {
    /// Cash in hand or the UPI confirmation screen.
    Payment,
    /// The cheque itself.
    Instrument,
    /// Signed receiving copy.
    Receiving,
    Invoice,
    /// Shopfront or doorstep proof for a failed visit or delivery.
    Proof,
}

impl PhotoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Payment => "payment_photo",
            PhotoKind::Instrument => "instrument_photo",
            PhotoKind::Receiving => "receiving_photo",
            PhotoKind::Invoice => "invoice_photo",
            PhotoKind::Proof => "proof_photo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub kind: PhotoKind,
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
}

impl Photo {
    pub fn jpeg(kind: PhotoKind, bytes: Vec<u8>) -> Self {
        Self {
            kind,
            bytes,
            mime_type: "image/jpeg".to_string(),
            file_name: format!("{}.jpg", kind.as_str()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Identifier for something the bundle still lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingField {
    Photo(PhotoKind),
    ReasonCode,
    OtpVerified,
    CollectedAmount,
    Coordinates,
}

impl MissingField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingField::Photo(kind) => kind.as_str(),
            MissingField::ReasonCode => "reason_code",
            MissingField::OtpVerified => "otp_verified",
            MissingField::CollectedAmount => "collected_amount",
            MissingField::Coordinates => "coordinates",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonRule {
    Never,
    WhenShort,
    Optional,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirement {
    pub photos: &'static [PhotoKind],
    pub reason: ReasonRule,
    pub otp: bool,
}

pub fn requirement(method: PaymentMethod) -> Requirement {
    match method {
        PaymentMethod::Cash | PaymentMethod::Upi => Requirement {
            photos: &[PhotoKind::Payment],
            reason: ReasonRule::WhenShort,
            otp: false,
        },
        PaymentMethod::Cheque => Requirement {
            photos: &[PhotoKind::Instrument, PhotoKind::Receiving],
            reason: ReasonRule::WhenShort,
            otp: false,
        },
        PaymentMethod::PayLater => Requirement {
            photos: &[PhotoKind::Receiving],
            reason: ReasonRule::Optional,
            otp: false,
        },
        PaymentMethod::Approval => Requirement {
            photos: &[PhotoKind::Invoice],
            reason: ReasonRule::Never,
            otp: true,
        },
        PaymentMethod::Uncollected | PaymentMethod::Undelivered => Requirement {
            photos: &[PhotoKind::Proof],
            reason: ReasonRule::Always,
            otp: false,
        },
    }
}

/// Artifacts gathered for one settlement action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    photos: Vec<Photo>,
    reason: Option<ReasonCode>,
    coordinates: Option<Coordinate>,
    otp: Option<VerifiedOtp>,
}

impl EvidenceBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a photo, replacing any earlier photo of the same kind.
    pub fn with_photo(mut self, photo: Photo) -> Self {
        self.set_photo(photo);
        self
    }

    pub fn set_photo(&mut self, photo: Photo) {
        self.photos.retain(|p| p.kind != photo.kind);
        self.photos.push(photo);
    }

    pub fn with_reason(mut self, reason: ReasonCode) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn with_coordinates(mut self, coordinates: Coordinate) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_otp(mut self, otp: VerifiedOtp) -> Self {
        self.otp = Some(otp);
        self
    }

    pub(crate) fn clear_otp(&mut self) {
        self.otp = None;
    }

    pub fn photo(&self, kind: PhotoKind) -> Option<&Photo> {
        self.photos.iter().find(|p| p.kind == kind && !p.is_empty())
    }

    pub fn reason(&self) -> Option<&ReasonCode> {
        self.reason.as_ref().filter(|r| !r.is_blank())
    }

    pub fn coordinates(&self) -> Option<Coordinate> {
        self.coordinates.filter(Coordinate::is_valid)
    }

    pub fn otp(&self) -> Option<&VerifiedOtp> {
        self.otp.as_ref()
    }

    /// Required photos for `method` paired with their multipart part names.
    pub fn photo_parts(&self, method: PaymentMethod) -> Vec<(&'static str, &Photo)> {
        requirement(method)
            .photos
            .iter()
            .filter_map(|kind| self.photo(*kind))
            .zip(PHOTO_PARTS)
            .map(|(photo, part)| (part, photo))
            .collect()
    }
}

/// Amounts and identity the table's conditional rules are evaluated against.
#[derive(Debug, Clone)]
pub struct EvidenceContext<'a> {
    pub account_id: &'a str,
    pub collected_amount: Option<Money>,
    pub outstanding_total: Money,
}

/// Outcome of `validate`; empty means the bundle may proceed to submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    missing: Vec<MissingField>,
}

impl ValidationResult {
    pub fn is_ready(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn missing(&self) -> &[MissingField] {
        &self.missing
    }

    pub fn contains(&self, field: MissingField) -> bool {
        self.missing.contains(&field)
    }

    pub fn into_missing(self) -> Vec<MissingField> {
        self.missing
    }
}

pub fn validate(
    method: PaymentMethod,
    bundle: &EvidenceBundle,
    context: &EvidenceContext<'_>,
) -> ValidationResult {
    let rule = requirement(method);
    let mut missing = Vec::new();

    if method.collects_money() {
        match context.collected_amount {
            Some(amount) if amount > Decimal::ZERO => {}
            _ => missing.push(MissingField::CollectedAmount),
        }
    }

    for kind in rule.photos {
        if bundle.photo(*kind).is_none() {
            missing.push(MissingField::Photo(*kind));
        }
    }

    let reason_required = match rule.reason {
        ReasonRule::Always => true,
        ReasonRule::WhenShort => context
            .collected_amount
            .map(|amount| amount < context.outstanding_total)
            .unwrap_or(true),
        ReasonRule::Never | ReasonRule::Optional => false,
    };
    if reason_required && bundle.reason().is_none() {
        missing.push(MissingField::ReasonCode);
    }

    if rule.otp {
        let bound = bundle
            .otp()
            .map(|otp| otp.account_id() == context.account_id)
            .unwrap_or(false);
        if !bound {
            missing.push(MissingField::OtpVerified);
        }
    }

    if bundle.coordinates().is_none() {
        missing.push(MissingField::Coordinates);
    }

    ValidationResult { missing }
}

/// The stand-alone mark-as-visited action needs a proof photo and a position.
pub fn validate_visit(bundle: &EvidenceBundle) -> ValidationResult {
    let mut missing = Vec::new();
    if bundle.photo(PhotoKind::Proof).is_none() {
        missing.push(MissingField::Photo(PhotoKind::Proof));
    }
    if bundle.coordinates().is_none() {
        missing.push(MissingField::Coordinates);
    }
    ValidationResult { missing }
}
