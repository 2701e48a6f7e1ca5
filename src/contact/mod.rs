//! Contact form handling.
//!
//! - `form`: fields and validation rules, shared by both sides
//! - `captcha`: arithmetic challenges and the server-side challenge map
//! - `pipeline`: the client state machine with local backup
//! - `message`: stored messages and the flat-file store behind the backend

mod captcha;
mod form;
mod message;
mod pipeline;

pub use captcha::{CaptchaChallenge, CaptchaStore, CAPTCHA_TTL};
pub use form::{
    is_valid_email, ContactForm, FieldError, ValidationReport, EMAIL_MAX_CHARS, MESSAGE_MAX_CHARS,
    MESSAGE_MIN_CHARS, NAME_MAX_CHARS, NAME_MIN_CHARS,
};
pub use message::{ContactMessage, MessageStatus, MessageStore, StoreError, StoreResult};
pub use pipeline::{BackupEntry, ContactPipeline, PipelineState, SubmitOutcome, MAX_BACKUP_ENTRIES};
