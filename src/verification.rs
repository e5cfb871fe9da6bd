// ✉️ Verification Code Manager
//
// issue:  email → 6-digit code, stored with an expiry and mailed out
// verify: single use; a matching, unexpired code is consumed atomically

use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

pub const BREVO_ENDPOINT: &str = "https://api.brevo.com/v3/smtp/email";

// ============================================================================
// EMAIL SYNTAX
// ============================================================================

/// Syntactic check plus normalization (trimmed, lower-case domain).
/// Deliverability is not checked.
pub fn normalize_email(raw: &str) -> ServiceResult<String> {
    let invalid = |reason: &str| ServiceError::EmailSyntax(format!("{:?}: {}", raw, reason));
    let address = raw.trim();

    let (local, domain) = address
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || local.len() > 64 {
        return Err(invalid("local part must be 1-64 characters"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(invalid("misplaced dot in local part"));
    }
    if local
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "@()<>[]:;,\\\"".contains(c))
    {
        return Err(invalid("illegal character in local part"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(invalid("domain needs a dot"));
    }
    for label in &labels {
        if label.is_empty()
            || label.len() > 63
            || label.starts_with('-')
            || label.ends_with('-')
            || !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(invalid("malformed domain"));
        }
    }
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("malformed top-level domain"));
    }

    Ok(format!("{}@{}", local, domain.to_ascii_lowercase()))
}

pub fn generate_code() -> String {
    let code = rand::thread_rng().gen_range(CODE_MIN..=CODE_MAX);
    format!("{:06}", code)
}

// ============================================================================
// CODE STORE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCode {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub trait CodeStore: Send + Sync {
    /// Store a code, replacing any pending one for the address
    fn put(&self, email: &str, pending: PendingCode);

    /// Remove the entry and return true iff it matches `code` and is live.
    /// Expired entries are removed either way.
    fn take_if_matches(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool;

    fn pending(&self, email: &str) -> Option<PendingCode>;

    /// Drop every expired entry, returning how many went
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;
}

#[derive(Default)]
pub struct InMemoryCodeStore {
    entries: Mutex<HashMap<String, PendingCode>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CodeStore for InMemoryCodeStore {
    fn put(&self, email: &str, pending: PendingCode) {
        self.entries.lock().insert(email.to_string(), pending);
    }

    fn take_if_matches(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();

        match entries.get(email) {
            Some(pending) if pending.is_expired(now) => {
                entries.remove(email);
                false
            }
            Some(pending) if pending.code == code => {
                entries.remove(email);
                true
            }
            _ => false,
        }
    }

    fn pending(&self, email: &str) -> Option<PendingCode> {
        self.entries.lock().get(email).cloned()
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, pending| !pending.is_expired(now));
        before - entries.len()
    }
}

// ============================================================================
// EMAIL SENDER
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("email provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("email provider rejected the message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_code(&self, address: &str, code: &str) -> Result<(), EmailError>;
}

/// Brevo transactional email API
pub struct BrevoEmailSender {
    client: reqwest::Client,
    api_key: String,
    sender_email: String,
    sender_name: String,
    endpoint: String,
}

impl BrevoEmailSender {
    pub fn new(api_key: impl Into<String>, sender_email: impl Into<String>) -> Self {
        BrevoEmailSender {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            sender_email: sender_email.into(),
            sender_name: "AgriCredScore".to_string(),
            endpoint: BREVO_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn message_body(&self, address: &str, code: &str) -> serde_json::Value {
        json!({
            "sender": {"email": self.sender_email, "name": self.sender_name},
            "to": [{"email": address}],
            "subject": "Your Verification Code",
            "htmlContent": format!(
                "<html><body><h1>Your Verification Code</h1><p>{}</p></body></html>",
                code
            ),
        })
    }
}

#[async_trait]
impl EmailSender for BrevoEmailSender {
    async fn send_code(&self, address: &str, code: &str) -> Result<(), EmailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&self.message_body(address, code))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmailError::Rejected(format!("{}: {}", status, body)));
        }

        tracing::debug!(to = %address, "verification email accepted by provider");
        Ok(())
    }
}

/// Used when no provider key is configured: the code only goes to the log
#[derive(Debug, Default)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send_code(&self, address: &str, code: &str) -> Result<(), EmailError> {
        tracing::info!(to = %address, code = %code, "email delivery disabled, logging verification code");
        Ok(())
    }
}

// ============================================================================
// VERIFICATION MANAGER
// ============================================================================

pub struct VerificationManager {
    codes: Arc<dyn CodeStore>,
    sender: Arc<dyn EmailSender>,
    ttl: Duration,
    strict_delivery: bool,
}

impl VerificationManager {
    pub fn new(codes: Arc<dyn CodeStore>, sender: Arc<dyn EmailSender>, ttl: Duration) -> Self {
        VerificationManager {
            codes,
            sender,
            ttl,
            strict_delivery: false,
        }
    }

    /// Fail `issue` when the email can't be delivered (default: log only)
    pub fn with_strict_delivery(mut self, strict: bool) -> Self {
        self.strict_delivery = strict;
        self
    }

    pub async fn issue(&self, email: &str) -> ServiceResult<String> {
        self.issue_at(email, Utc::now()).await
    }

    pub async fn issue_at(&self, email: &str, now: DateTime<Utc>) -> ServiceResult<String> {
        let address = normalize_email(email)?;
        let code = generate_code();

        self.codes.put(
            &address,
            PendingCode {
                code: code.clone(),
                issued_at: now,
                expires_at: now + self.ttl,
            },
        );

        if let Err(e) = self.sender.send_code(&address, &code).await {
            tracing::error!(to = %address, error = %e, "failed to send verification email");
            if self.strict_delivery {
                // An undelivered code must not stay redeemable
                self.codes.take_if_matches(&address, &code, now);
                return Err(ServiceError::EmailDelivery(e.to_string()));
            }
        }

        Ok(code)
    }

    pub fn verify(&self, email: &str, code: &str) -> ServiceResult<()> {
        self.verify_at(email, code, Utc::now())
    }

    pub fn verify_at(&self, email: &str, code: &str, now: DateTime<Utc>) -> ServiceResult<()> {
        let address = normalize_email(email).map_err(|_| ServiceError::InvalidCode)?;

        if self.codes.take_if_matches(&address, code.trim(), now) {
            tracing::info!(email = %address, "email verified");
            Ok(())
        } else {
            Err(ServiceError::InvalidCode)
        }
    }

    pub fn codes(&self) -> &dyn CodeStore {
        self.codes.as_ref()
    }
}

// ============================================================================
// TESTS
// ============================================================================
