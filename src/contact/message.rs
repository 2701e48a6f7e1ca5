//! Contact messages persisted as one JSON array in a flat file.
//!
//! Every mutation reads the whole file and rewrites it whole. There is no
//! locking across requests, so two interleaved writes can lose one message.

use crate::contact::form::ContactForm;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    New,
    Read,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    /// RFC 3339
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub status: MessageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<String>,
}

impl ContactMessage {
    pub fn new(form: &ContactForm, ip: Option<String>, user_agent: Option<String>) -> Self {
        let form = form.trimmed();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: form.name,
            email: form.email,
            message: form.message,
            timestamp: Utc::now().to_rfc3339(),
            ip,
            user_agent,
            status: MessageStatus::New,
            read_at: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Message file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize messages: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
pub struct MessageStore {
    path: PathBuf,
}

impl MessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every message. A missing or blank file is an empty list.
    pub fn load_all(&self) -> StoreResult<Vec<ContactMessage>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save_all(&self, messages: &[ContactMessage]) -> StoreResult<()> {
        let write_error = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_error)?;
            }
        }

        let json = serde_json::to_string_pretty(messages)?;
        std::fs::write(&self.path, json).map_err(write_error)?;
        debug!("Wrote {} messages to {}", messages.len(), self.path.display());
        Ok(())
    }

    pub fn append(&self, message: ContactMessage) -> StoreResult<ContactMessage> {
        let mut messages = self.load_all()?;
        messages.push(message.clone());
        self.save_all(&messages)?;
        Ok(message)
    }

    /// Mark a message as read. `readAt` is set on the first call only.
    /// Returns `None` when no message has this id.
    pub fn mark_read(&self, id: &str) -> StoreResult<Option<ContactMessage>> {
        let mut messages = self.load_all()?;
        let Some(message) = messages.iter_mut().find(|message| message.id == id) else {
            return Ok(None);
        };

        if message.status != MessageStatus::Read {
            message.status = MessageStatus::Read;
            message.read_at = Some(Utc::now().to_rfc3339());
        }
        let updated = message.clone();

        self.save_all(&messages)?;
        Ok(Some(updated))
    }

    /// Delete every message, returning how many were removed.
    pub fn clear(&self) -> StoreResult<usize> {
        let count = self.load_all()?.len();
        self.save_all(&[])?;
        Ok(count)
    }
}
