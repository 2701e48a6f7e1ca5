//! Client-side contact pipeline.
//!
//! `Idle → ChallengeGenerated → Validating → Submitting → Success | Error`.
//! Field validation runs before the captcha, and the captcha before any
//! network call.

use crate::contact::captcha::CaptchaChallenge;
use crate::contact::form::{ContactForm, ValidationReport};
use crate::storage::{ClientStorage, STORAGE_BACKUP_CORRUPT_KEY, STORAGE_BACKUP_KEY};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Backed-up messages kept in client storage; older entries are evicted.
pub const MAX_BACKUP_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    ChallengeGenerated,
    Validating,
    Submitting,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Honeypot was filled: nothing sent, nothing stored, nothing shown.
    Ignored,
    Invalid(ValidationReport),
    CaptchaFailed,
    Delivered { id: String },
    /// The backend refused the message (validation, rate limit).
    Rejected { error: String },
    /// The backend could not be reached; the message was kept locally.
    SavedLocally { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub name: String,
    pub email: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

enum DeliveryError {
    Unreachable(String),
    Rejected(String),
}

pub struct ContactPipeline {
    client: reqwest::Client,
    endpoint: Option<String>,
    storage: Arc<dyn ClientStorage>,
    state: PipelineState,
    challenge: Option<CaptchaChallenge>,
}

impl ContactPipeline {
    /// `endpoint` is the full URL of `POST /api/contact`; `None` means no
    /// backend is deployed and every valid submission is backed up locally.
    pub fn new(
        client: reqwest::Client,
        endpoint: Option<String>,
        storage: Arc<dyn ClientStorage>,
    ) -> Self {
        Self {
            client,
            endpoint,
            storage,
            state: PipelineState::Idle,
            challenge: None,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn challenge(&self) -> Option<&CaptchaChallenge> {
        self.challenge.as_ref()
    }

    /// Open the form with a fresh challenge.
    pub fn open(&mut self) -> &CaptchaChallenge {
        self.state = PipelineState::ChallengeGenerated;
        self.challenge.insert(CaptchaChallenge::generate())
    }

    pub fn reset(&mut self) {
        self.state = PipelineState::Idle;
        self.challenge = None;
    }

    pub async fn submit(&mut self, form: &ContactForm, captcha_answer: &str) -> SubmitOutcome {
        if form.is_bot() {
            debug!("Honeypot filled, dropping submission");
            return SubmitOutcome::Ignored;
        }

        self.state = PipelineState::Validating;
        let report = form.validate();

        let outcome = if !report.is_valid() {
            SubmitOutcome::Invalid(report)
        } else if !self.consume_challenge(captcha_answer) {
            SubmitOutcome::CaptchaFailed
        } else {
            self.state = PipelineState::Submitting;
            self.deliver(&form.trimmed()).await
        };

        self.state = match outcome {
            SubmitOutcome::Delivered { .. } => PipelineState::Success,
            _ => PipelineState::Error,
        };
        self.challenge = Some(CaptchaChallenge::generate());

        outcome
    }

    fn consume_challenge(&mut self, answer: &str) -> bool {
        self.challenge
            .take()
            .map(|challenge| challenge.check(answer))
            .unwrap_or(false)
    }

    async fn deliver(&self, form: &ContactForm) -> SubmitOutcome {
        let Some(endpoint) = self.endpoint.as_deref() else {
            return self.save_locally(form, "no backend configured");
        };

        match self.post(endpoint, form).await {
            Ok(id) => {
                info!("Contact message delivered ({})", id);
                SubmitOutcome::Delivered { id }
            }
            Err(DeliveryError::Rejected(error)) => {
                warn!("Contact backend rejected message: {}", error);
                SubmitOutcome::Rejected { error }
            }
            Err(DeliveryError::Unreachable(reason)) => {
                warn!("Contact backend unreachable: {}", reason);
                self.save_locally(form, &reason)
            }
        }
    }

    async fn post(&self, endpoint: &str, form: &ContactForm) -> Result<String, DeliveryError> {
        let response = self
            .client
            .post(endpoint)
            .json(form)
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DeliveryError::Unreachable(format!("HTTP {}", status)));
        }

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Unreachable(format!("invalid response: {}", e)))?;

        match (status.is_success() && body.success, body.id) {
            (true, Some(id)) => Ok(id),
            (true, None) => Err(DeliveryError::Unreachable(
                "response without message id".to_string(),
            )),
            (false, _) => Err(DeliveryError::Rejected(
                body.error.unwrap_or_else(|| format!("HTTP {}", status)),
            )),
        }
    }

    fn save_locally(&self, form: &ContactForm, reason: &str) -> SubmitOutcome {
        let entry = BackupEntry {
            name: form.name.clone(),
            email: form.email.clone(),
            message: form.message.clone(),
            timestamp: Utc::now().to_rfc3339(),
            reason: reason.to_string(),
        };

        if let Err(e) = self.append_backup(entry) {
            warn!("Failed to back up contact message: {:#}", e);
        }

        SubmitOutcome::SavedLocally {
            reason: reason.to_string(),
        }
    }

    fn append_backup(&self, entry: BackupEntry) -> Result<()> {
        let mut entries = match self.load_backups() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Setting aside unreadable contact backups: {:#}", e);
                if let Some(raw) = self.storage.get(STORAGE_BACKUP_KEY) {
                    self.storage.set(STORAGE_BACKUP_CORRUPT_KEY, &raw)?;
                }
                Vec::new()
            }
        };
        entries.push(entry);
        if entries.len() > MAX_BACKUP_ENTRIES {
            let excess = entries.len() - MAX_BACKUP_ENTRIES;
            entries.drain(..excess);
        }

        let json = serde_json::to_string(&entries).context("Failed to serialize backups")?;
        self.storage.set(STORAGE_BACKUP_KEY, &json)
    }

    /// Messages kept locally, oldest first. Empty if the stored list is
    /// unreadable.
    pub fn backups(&self) -> Vec<BackupEntry> {
        self.load_backups().unwrap_or_else(|e| {
            warn!("Ignoring unreadable contact backups: {:#}", e);
            Vec::new()
        })
    }

    fn load_backups(&self) -> Result<Vec<BackupEntry>> {
        match self.storage.get(STORAGE_BACKUP_KEY) {
            Some(json) => serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse {}", STORAGE_BACKUP_KEY)),
            None => Ok(Vec::new()),
        }
    }
}
