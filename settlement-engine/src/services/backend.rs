//! Backend of record for invoices, settlements, approvals and attendance.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use std::time::Duration;
use tracing::instrument;

use crate::config::BackendConfig;
use crate::dtos::{BackendAck, InvoiceRecord, SendOtpRequest, SettlementLine, VerifyOtpRequest};
use crate::models::Invoice;
use crate::services::evidence::Photo;
use crate::services::intent::SettlementIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunchDirection {
    In,
    Out,
}

impl PunchDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            PunchDirection::In => "in",
            PunchDirection::Out => "out",
        }
    }
}

/// The multipart payload for one settlement intent.
#[derive(Debug, Clone)]
pub struct SettlementSubmission<'a> {
    /// Stable across re-submissions of the same intent.
    pub intent_id: String,
    pub lat: String,
    pub long: String,
    pub data: Vec<SettlementLine>,
    pub photos: Vec<(&'static str, &'a Photo)>,
}

impl<'a> SettlementSubmission<'a> {
    pub fn from_intent(intent: &'a SettlementIntent) -> Self {
        let coordinates = intent.coordinates();
        Self {
            intent_id: intent.intent_id().to_string(),
            lat: coordinates.lat_string(),
            long: coordinates.long_string(),
            data: intent.lines(),
            photos: intent.evidence().photo_parts(intent.method()),
        }
    }
}

#[async_trait]
pub trait SettlementBackend: Send + Sync {
    async fn fetch_invoices_for_tag(&self, tag_id: &str) -> Result<Vec<Invoice>, AppError>;

    async fn fetch_invoices_for_account(&self, account_id: &str)
        -> Result<Vec<Invoice>, AppError>;

    async fn submit_settlement(
        &self,
        submission: &SettlementSubmission<'_>,
    ) -> Result<BackendAck, AppError>;

    async fn send_otp(&self, account_id: &str, approver_name: &str)
        -> Result<BackendAck, AppError>;

    async fn verify_otp(&self, account_id: &str, otp: &str) -> Result<BackendAck, AppError>;

    async fn punch(&self, direction: PunchDirection, photo: &Photo)
        -> Result<BackendAck, AppError>;
}

/// REST implementation of [`SettlementBackend`].
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self.config.api_token.expose_secret();
        if token.is_empty() {
            request
        } else {
            request.bearer_auth(token)
        }
    }

    async fn read_invoices(response: Response) -> Result<Vec<Invoice>, AppError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::from_status(status, body));
        }

        let records: Vec<InvoiceRecord> = serde_json::from_str(&body)?;
        records
            .into_iter()
            .map(|record| {
                Invoice::try_from(record).map_err(|e| AppError::BadGateway(e.to_string()))
            })
            .collect()
    }

    /// A parseable `{success, message}` body is the backend's answer whatever the
    /// status code; anything else is a transport or upstream failure.
    async fn read_ack(response: Response) -> Result<BackendAck, AppError> {
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, body = %body, "Backend response");

        match serde_json::from_str::<BackendAck>(&body) {
            Ok(ack) if status.is_success() || !ack.success => Ok(ack),
            Ok(_) => Err(AppError::from_status(status, body)),
            Err(e) if status.is_success() => Err(AppError::BadGateway(format!(
                "Malformed response body: {}",
                e
            ))),
            Err(_) => Err(AppError::from_status(status, body)),
        }
    }

    fn photo_part(photo: &Photo) -> Result<Part, AppError> {
        Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str(&photo.mime_type)
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid photo mime type: {}", e)))
    }
}

#[async_trait]
impl SettlementBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn fetch_invoices_for_tag(&self, tag_id: &str) -> Result<Vec<Invoice>, AppError> {
        let path = format!("/tags/{}/invoices", urlencoding::encode(tag_id));
        let response = self
            .authorized(self.client.get(self.url(&path)))
            .send()
            .await?;
        Self::read_invoices(response).await
    }

    #[instrument(skip(self))]
    async fn fetch_invoices_for_account(
        &self,
        account_id: &str,
    ) -> Result<Vec<Invoice>, AppError> {
        let response = self
            .authorized(
                self.client.get(self.url(&format!(
                    "/accounts/{}/invoices",
                    urlencoding::encode(account_id)
                ))),
            )
            .send()
            .await?;
        Self::read_invoices(response).await
    }

    #[instrument(skip_all, fields(lines = submission.data.len(), photos = submission.photos.len()))]
    async fn submit_settlement(
        &self,
        submission: &SettlementSubmission<'_>,
    ) -> Result<BackendAck, AppError> {
        let data = serde_json::to_string(&submission.data)
            .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

        let mut form = Form::new()
            .text("intent_id", submission.intent_id.clone())
            .text("lat", submission.lat.clone())
            .text("long", submission.long.clone())
            .text("data", data);
        for (name, photo) in &submission.photos {
            form = form.part(*name, Self::photo_part(photo)?);
        }

        let response = self
            .authorized(self.client.post(self.url("/settlements")))
            .header("Idempotency-Key", submission.intent_id.as_str())
            .multipart(form)
            .send()
            .await?;
        Self::read_ack(response).await
    }

    #[instrument(skip(self))]
    async fn send_otp(
        &self,
        account_id: &str,
        approver_name: &str,
    ) -> Result<BackendAck, AppError> {
        let response = self
            .authorized(self.client.post(self.url("/approvals/otp/send")))
            .json(&SendOtpRequest {
                account_id,
                approver_name,
            })
            .send()
            .await?;
        Self::read_ack(response).await
    }

    #[instrument(skip(self, otp))]
    async fn verify_otp(&self, account_id: &str, otp: &str) -> Result<BackendAck, AppError> {
        let response = self
            .authorized(self.client.post(self.url("/approvals/otp/verify")))
            .json(&VerifyOtpRequest { account_id, otp })
            .send()
            .await?;
        Self::read_ack(response).await
    }

    #[instrument(skip(self, direction, photo), fields(direction = direction.as_str()))]
    async fn punch(
        &self,
        direction: PunchDirection,
        photo: &Photo,
    ) -> Result<BackendAck, AppError> {
        let form = Form::new()
            .text("status", direction.as_str())
            .part("image", Self::photo_part(photo)?);

        let response = self
            .authorized(self.client.post(self.url("/attendance/punch")))
            .multipart(form)
            .send()
            .await?;
        Self::read_ack(response).await
    }
}
