#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use settlement_engine::dtos::{BackendAck, SettlementLine};
use settlement_engine::models::{Coordinate, Invoice, NewInvoice};
use settlement_engine::services::backend::{
    PunchDirection, SettlementBackend, SettlementSubmission,
};
use settlement_engine::services::evidence::{Photo, PhotoKind};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const TEST_ACCOUNT_ID: &str = "ACC-1001";
pub const TEST_TAG_ID: &str = "TAG-2026-10-19-07";
pub const TEST_AGENT_ID: &str = "AGENT-42";

pub fn init_test_tracing() {
    let _ = service_core::observability::try_init_tracing("settlement_engine=debug", false);
}

pub fn invoice(id: &str, total: Decimal, outstanding: Decimal) -> Invoice {
    invoice_for(TEST_ACCOUNT_ID, id, total, outstanding)
}

pub fn invoice_for(account_id: &str, id: &str, total: Decimal, outstanding: Decimal) -> Invoice {
    Invoice::new(NewInvoice {
        invoice_id: id.to_string(),
        account_id: account_id.to_string(),
        bill_no: format!("BL/{}", id),
        issued_date: NaiveDate::from_ymd_opt(2026, 9, 15).unwrap(),
        total_amount: total,
        outstanding_amount: outstanding,
        age_in_days: 34,
    })
    .unwrap()
}

pub fn tag_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

/// Customer shop in Indiranagar, Bengaluru.
pub fn shop() -> Coordinate {
    Coordinate::new(12.9784, 77.6408)
}

/// Distribution office in Koramangala, Bengaluru.
pub fn office() -> Coordinate {
    Coordinate::new(12.9352, 77.6245)
}

pub fn photo(kind: PhotoKind) -> Photo {
    Photo::jpeg(kind, vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
}

pub fn ack(success: bool, message: &str) -> BackendAck {
    BackendAck {
        success,
        message: Some(message.to_string()),
    }
}

/// What the fake backend saw for one settlement submission.
#[derive(Debug, Clone)]
pub struct RecordedSubmission {
    pub intent_id: String,
    pub lat: String,
    pub long: String,
    pub data: Vec<SettlementLine>,
    pub parts: Vec<(String, PhotoKind)>,
}

/// In-memory backend with scripted replies. Unscripted writes succeed.
#[derive(Default)]
pub struct ScriptedBackend {
    account_invoices: Mutex<HashMap<String, Vec<Invoice>>>,
    tag_invoices: Mutex<HashMap<String, Vec<Invoice>>>,
    submit_replies: Mutex<VecDeque<Result<BackendAck, AppError>>>,
    otp_replies: Mutex<VecDeque<Result<BackendAck, AppError>>>,
    punch_replies: Mutex<VecDeque<Result<BackendAck, AppError>>>,
    submissions: Mutex<Vec<RecordedSubmission>>,
    punches: Mutex<Vec<PunchDirection>>,
    submit_calls: AtomicUsize,
    otp_calls: AtomicUsize,
    /// When set, submissions park here until released.
    hold: Mutex<Option<Arc<Notify>>>,
    entered: Notify,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account_invoices(&self, account_id: &str, invoices: Vec<Invoice>) {
        self.account_invoices
            .lock()
            .unwrap()
            .insert(account_id.to_string(), invoices);
    }

    pub fn with_tag_invoices(&self, tag_id: &str, invoices: Vec<Invoice>) {
        self.tag_invoices
            .lock()
            .unwrap()
            .insert(tag_id.to_string(), invoices);
    }

    pub fn reply_to_submit(&self, reply: Result<BackendAck, AppError>) {
        self.submit_replies.lock().unwrap().push_back(reply);
    }

    pub fn reply_to_otp(&self, reply: Result<BackendAck, AppError>) {
        self.otp_replies.lock().unwrap().push_back(reply);
    }

    pub fn reply_to_punch(&self, reply: Result<BackendAck, AppError>) {
        self.punch_replies.lock().unwrap().push_back(reply);
    }

    /// Park every submission until the returned handle is notified.
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.hold.lock().unwrap() = Some(Arc::clone(&release));
        release
    }

    /// Resolves once a submission has reached the backend.
    pub async fn submission_entered(&self) {
        self.entered.notified().await
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn otp_calls(&self) -> usize {
        self.otp_calls.load(Ordering::SeqCst)
    }

    pub fn submissions(&self) -> Vec<RecordedSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn punches(&self) -> Vec<PunchDirection> {
        self.punches.lock().unwrap().clone()
    }

    fn next(queue: &Mutex<VecDeque<Result<BackendAck, AppError>>>) -> Result<BackendAck, AppError> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ack(true, "ok")))
    }
}

#[async_trait]
impl SettlementBackend for ScriptedBackend {
    async fn fetch_invoices_for_tag(&self, tag_id: &str) -> Result<Vec<Invoice>, AppError> {
        self.tag_invoices
            .lock()
            .unwrap()
            .get(tag_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("tag {}", tag_id)))
    }

    async fn fetch_invoices_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<Invoice>, AppError> {
        Ok(self
            .account_invoices
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_settlement(
        &self,
        submission: &SettlementSubmission<'_>,
    ) -> Result<BackendAck, AppError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submissions.lock().unwrap().push(RecordedSubmission {
            intent_id: submission.intent_id.clone(),
            lat: submission.lat.clone(),
            long: submission.long.clone(),
            data: submission.data.clone(),
            parts: submission
                .photos
                .iter()
                .map(|(name, photo)| (name.to_string(), photo.kind))
                .collect(),
        });

        let hold = self.hold.lock().unwrap().clone();
        if let Some(release) = hold {
            self.entered.notify_one();
            release.notified().await;
        }

        Self::next(&self.submit_replies)
    }

    async fn send_otp(
        &self,
        _account_id: &str,
        _approver_name: &str,
    ) -> Result<BackendAck, AppError> {
        self.otp_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.otp_replies)
    }

    async fn verify_otp(&self, _account_id: &str, _otp: &str) -> Result<BackendAck, AppError> {
        self.otp_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.otp_replies)
    }

    async fn punch(
        &self,
        direction: PunchDirection,
        _photo: &Photo,
    ) -> Result<BackendAck, AppError> {
        self.punches.lock().unwrap().push(direction);
        Self::next(&self.punch_replies)
    }
}
