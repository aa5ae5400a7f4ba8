//! Document processor client
//!
//! The heavier statement parsing (PDF decrypt, OCR) lives in a separate HTTP
//! service consumed as an opaque collaborator. One in-flight request per
//! file, no retry: a failure is terminal for that file and the caller
//! decides whether to resubmit or fall back to local pattern extraction.

use reqwest::multipart;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extract::CSV_BASE_CONFIDENCE;
use crate::models::{CandidateTransaction, TransactionType};

/// Environment variable for the processor base URL
pub const PROCESSOR_URL_ENV: &str = "KOSH_PROCESSOR_URL";

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// A transaction extracted by the processor service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTransaction {
    pub date: chrono::NaiveDate,
    pub merchant_raw: String,
    pub amount: f64,
    /// "debit", "credit", or "unknown" when the service could not decide
    pub transaction_type: String,
    pub confidence_score: f64,
    #[serde(default)]
    pub description: Option<String>,
}

impl ExtractedTransaction {
    /// Convert to a local candidate. An unknown direction degrades to debit;
    /// the service's confidence is kept but never trusted above the CSV
    /// baseline.
    pub fn into_candidate(self) -> CandidateTransaction {
        let transaction_type = self
            .transaction_type
            .parse()
            .unwrap_or(TransactionType::Debit);
        CandidateTransaction {
            date: self.date,
            merchant_raw: self.merchant_raw,
            amount: self.amount.abs(),
            transaction_type,
            confidence_score: self.confidence_score.min(CSV_BASE_CONFIDENCE),
            description: self.description,
        }
    }
}

/// Consistency cross-check against a statement's own printed footer counts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionValidation {
    pub expected_dr_count: i64,
    pub expected_cr_count: i64,
    pub actual_dr_count: i64,
    pub actual_cr_count: i64,
    pub found_footer: bool,
    /// None when no footer was found to compare against
    pub matches: Option<bool>,
    #[serde(default)]
    pub method: Option<String>,
}

/// Response of the process-document operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub filename: String,
    pub processing_method: String,
    pub transactions: Vec<ExtractedTransaction>,
    pub transaction_count: usize,
    #[serde(default)]
    pub validation: Option<ExtractionValidation>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Service health report. `docling_available` signals whether advanced
/// (AI-assisted) extraction is enabled on the service side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    pub docling_available: bool,
    pub timestamp: String,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

/// HTTP client for the document processor service
#[derive(Debug, Clone)]
pub struct ProcessorClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl ProcessorClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from the `KOSH_PROCESSOR_URL` environment variable, falling
    /// back to the local default.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var(PROCESSOR_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit one document for extraction.
    ///
    /// The optional password unlocks protected PDF statements on the service
    /// side. Errors carry the service's human-readable detail message.
    pub async fn process_document(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        password: Option<&str>,
    ) -> Result<ProcessResponse> {
        let mut form = multipart::Form::new()
            .part("file", multipart::Part::bytes(bytes).file_name(file_name.to_string()));
        if let Some(password) = password {
            form = form.text("password", password.to_string());
        }

        let response = self
            .http_client
            .post(format!("{}/api/process", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<ErrorDetail>()
                .await
                .map(|e| e.detail)
                .unwrap_or_else(|_| format!("HTTP {}", status));
            warn!(%status, %detail, "document processing failed");
            return Err(Error::ExternalService(detail));
        }

        let parsed: ProcessResponse = response.json().await?;
        if !parsed.success {
            return Err(Error::ExternalService(
                parsed
                    .message
                    .unwrap_or_else(|| "processing reported failure".to_string()),
            ));
        }

        if let Some(validation) = &parsed.validation {
            if validation.found_footer && validation.matches == Some(false) {
                warn!(
                    expected_dr = validation.expected_dr_count,
                    actual_dr = validation.actual_dr_count,
                    expected_cr = validation.expected_cr_count,
                    actual_cr = validation.actual_cr_count,
                    "extraction does not match statement footer counts"
                );
            }
        }

        debug!(
            count = parsed.transaction_count,
            method = %parsed.processing_method,
            "document processed"
        );
        Ok(parsed)
    }

    /// Check service availability
    pub async fn health(&self) -> Result<ServiceHealth> {
        let response = self
            .http_client
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "health check failed: HTTP {}",
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}
