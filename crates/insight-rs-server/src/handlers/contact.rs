//! Early-access contact form relay.

use super::ok;
use crate::error::{ApiError, ApiJson, FieldIssue};
use crate::mail::OutgoingMail;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use insight_rs_config::MailConfig;
use log::info;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

const MAX_NAME_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ContactRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    organization: Option<String>,
    #[serde(default)]
    interest: Option<String>,
    #[serde(default)]
    message: String,
}

impl ContactRequest {
    fn issues(&self) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        let name = self.name.trim();
        if name.is_empty() {
            issues.push(FieldIssue::new("name", "required"));
        } else if name.chars().count() > MAX_NAME_LEN {
            issues.push(FieldIssue::new(
                "name",
                format!("must be at most {MAX_NAME_LEN} characters"),
            ));
        }
        if self.email.trim().is_empty() {
            issues.push(FieldIssue::new("email", "required"));
        } else if !is_plausible_email(self.email.trim()) {
            issues.push(FieldIssue::new("email", "invalid email address"));
        }
        let message = self.message.trim();
        if message.is_empty() {
            issues.push(FieldIssue::new("message", "required"));
        } else if message.chars().count() > MAX_MESSAGE_LEN {
            issues.push(FieldIssue::new(
                "message",
                format!("must be at most {MAX_MESSAGE_LEN} characters"),
            ));
        }
        issues
    }
}

/// `local@domain.tld` with no whitespace.
fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
}

fn optional_line(value: &Option<String>) -> &str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("-")
}

fn admin_notification(request: &ContactRequest, mail: &MailConfig) -> OutgoingMail {
    let name = request.name.trim();
    let body = format!(
        "Name: {name}\nEmail: {email}\nOrganization: {organization}\nInterest: {interest}\n\n{message}\n",
        email = request.email.trim(),
        organization = optional_line(&request.organization),
        interest = optional_line(&request.interest),
        message = request.message.trim(),
    );
    OutgoingMail {
        to: mail.admin_address.clone(),
        from: mail.from_address.clone(),
        reply_to: Some(request.email.trim().to_string()),
        subject: format!("New {} inquiry from {name}", mail.product_name),
        body,
    }
}

fn auto_reply(request: &ContactRequest, mail: &MailConfig) -> OutgoingMail {
    let body = format!(
        "Hi {name},\n\nThanks for your interest in {product}. We received your message and will get back to you shortly.\n\nThe {product} team\n",
        name = request.name.trim(),
        product = mail.product_name,
    );
    OutgoingMail {
        to: request.email.trim().to_string(),
        from: mail.from_address.clone(),
        reply_to: None,
        subject: format!("Thanks for contacting {}", mail.product_name),
        body,
    }
}

/// POST /api/contact
pub(crate) async fn handle_contact(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> Result<Json<Value>, ApiError> {
    let issues = request.issues();
    if !issues.is_empty() {
        return Err(ApiError::validation(issues));
    }

    let mail = &state.config.mail;
    state.mail.send(admin_notification(&request, mail)).await?;
    state.mail.send(auto_reply(&request, mail)).await?;
    info!(
        "contact request relayed (interest={})",
        optional_line(&request.interest)
    );
    Ok(ok(json!({ "message": "Thanks! We'll be in touch soon." })))
}
