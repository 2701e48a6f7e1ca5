use super::{error::AppError, rate_limit::ClientIp, AppState};
use crate::contact::{CaptchaChallenge, ContactForm, ContactMessage};
use crate::security::verify_admin_key;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    /// Number or string; forms send either.
    #[serde(default)]
    pub captcha: Option<Value>,
    #[serde(default)]
    pub captcha_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    pub key: Option<String>,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "agency-site contact backend",
    }))
}

pub async fn issue_captcha(State(state): State<AppState>) -> Json<CaptchaChallenge> {
    Json(state.captchas.issue())
}

pub async fn submit_contact(
    State(state): State<AppState>,
    client_ip: Option<Extension<ClientIp>>,
    headers: HeaderMap,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!("Rejected contact payload: {}", rejection.body_text());
        AppError::Validation("Invalid request body".to_string())
    })?;

    let form = ContactForm::new(&request.name, &request.email, &request.message);
    let report = form.validate();
    if !report.is_valid() {
        return Err(AppError::Validation(report.summary()));
    }

    if let Some(captcha_id) = request.captcha_id.as_deref() {
        let answer = match &request.captcha {
            Some(Value::String(answer)) => answer.clone(),
            Some(Value::Number(answer)) => answer.to_string(),
            _ => String::new(),
        };
        if !state.captchas.validate(captcha_id, &answer) {
            return Err(AppError::Captcha("Invalid or expired captcha".to_string()));
        }
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let ip = client_ip.map(|Extension(ClientIp(ip))| ip);

    let message = state
        .messages
        .append(ContactMessage::new(&form, ip, user_agent))?;
    info!("Stored contact message {}", message.id);

    Ok(Json(json!({
        "success": true,
        "message": "Thank you! Your message has been received.",
        "id": message.id,
    })))
}

fn authorize(state: &AppState, query: &AdminQuery) -> Result<(), AppError> {
    if verify_admin_key(query.key.as_deref(), &state.config.admin_key) {
        Ok(())
    } else {
        warn!("Admin request with missing or wrong key");
        Err(AppError::Unauthorized)
    }
}

pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &query)?;

    let mut messages = state.messages.load_all()?;
    messages.reverse();

    Ok(Json(json!({
        "success": true,
        "total": messages.len(),
        "messages": messages,
    })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &query)?;

    state
        .messages
        .mark_read(&id)?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Message marked as read",
    })))
}

pub async fn clear_messages(
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&state, &query)?;

    let cleared = state.messages.clear()?;
    info!("Cleared {} contact messages", cleared);

    Ok(Json(json!({
        "success": true,
        "cleared": cleared,
    })))
}
