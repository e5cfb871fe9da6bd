// ⚙️ Service configuration from environment variables

use crate::codec::UnknownCategoryPolicy;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;

/// How `/login` reports bad credentials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoginFailureMode {
    /// 200 with `{"error": "Invalid credentials"}`
    #[default]
    Soft,
    /// 401 with the same body
    Unauthorized,
}

impl FromStr for LoginFailureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(LoginFailureMode::Soft),
            "unauthorized" | "401" => Ok(LoginFailureMode::Unauthorized),
            other => Err(format!(
                "unknown login failure mode {:?} (expected soft or unauthorized)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub cors_origin: String,
    pub unknown_category: UnknownCategoryPolicy,
    pub login_failure: LoginFailureMode,
    pub code_ttl_secs: i64,
    /// Brevo API key; `None` means codes are only logged
    pub email_api_key: Option<String>,
    pub email_sender: String,
    pub email_strict: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            bind_addr: "0.0.0.0:8000".to_string(),
            db_path: PathBuf::from("agricred.db"),
            model_path: PathBuf::from("model.json"),
            cors_origin: "http://localhost:5173".to_string(),
            unknown_category: UnknownCategoryPolicy::Default,
            login_failure: LoginFailureMode::Soft,
            code_ttl_secs: 600,
            email_api_key: None,
            email_sender: "agridcredscore.verify@gmail.com".to_string(),
            email_strict: false,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = ServiceConfig::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = get("AGRICRED_BIND") {
            config.bind_addr = value;
        }
        if let Some(value) = get("AGRICRED_DB_PATH") {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = get("AGRICRED_MODEL_PATH") {
            config.model_path = PathBuf::from(value);
        }
        if let Some(value) = get("AGRICRED_CORS_ORIGIN") {
            config.cors_origin = value;
        }
        if let Some(value) = get("AGRICRED_UNKNOWN_CATEGORY") {
            config.unknown_category = value
                .parse::<UnknownCategoryPolicy>()
                .map_err(|e: String| anyhow!(e))
                .context("AGRICRED_UNKNOWN_CATEGORY")?;
        }
        if let Some(value) = get("AGRICRED_LOGIN_FAILURE") {
            config.login_failure = value
                .parse::<LoginFailureMode>()
                .map_err(|e: String| anyhow!(e))
                .context("AGRICRED_LOGIN_FAILURE")?;
        }
        if let Some(value) = get("AGRICRED_CODE_TTL_SECS") {
            let ttl: i64 = value
                .trim()
                .parse()
                .with_context(|| format!("AGRICRED_CODE_TTL_SECS={:?}", value))?;
            if ttl <= 0 {
                return Err(anyhow!("AGRICRED_CODE_TTL_SECS must be positive, got {}", ttl));
            }
            config.code_ttl_secs = ttl;
        }
        config.email_api_key = get("EMAIL_API");
        if let Some(value) = get("AGRICRED_EMAIL_SENDER") {
            config.email_sender = value;
        }
        if let Some(value) = get("AGRICRED_EMAIL_STRICT") {
            config.email_strict = parse_bool(&value)
                .ok_or_else(|| anyhow!("AGRICRED_EMAIL_STRICT={:?} is not a boolean", value))?;
        }

        Ok(config)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
