use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::error::ApiError;
use dlgate_utils::http::{http_status_is_ok, post_form, post_json, BoxError};

pub const HCAPTCHA_VERIFY_URL: &str = "https://hcaptcha.com/siteverify";
pub const MAIL_API_URL: &str = "https://api.resend.com";

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub captcha_token: String,
}

impl ContactRequest {
    /// Check fields in a fixed order and report the first failure.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.name.chars().count() < 2 {
            return Err(ApiError::validation("Name must be at least 2 characters"));
        }
        if !EMAIL_REGEX.is_match(&self.email) {
            return Err(ApiError::validation("Invalid email format"));
        }
        if self.message.chars().count() < 10 {
            return Err(ApiError::validation(
                "Message must be at least 10 characters",
            ));
        }
        if self.captcha_token.trim().is_empty() {
            return Err(ApiError::validation("Captcha verification required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl From<&ContactRequest> for ContactMessage {
    fn from(request: &ContactRequest) -> Self {
        Self {
            name: request.name.clone(),
            email: request.email.clone(),
            message: request.message.clone(),
        }
    }
}

/// Server-side captcha check. Implementations must not fail the request
/// pipeline: any verification problem is reported as "not verified".
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> bool;
}

pub struct HcaptchaVerifier {
    secret: String,
    endpoint: String,
}

impl HcaptchaVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self::with_endpoint(secret, HCAPTCHA_VERIFY_URL)
    }

    pub fn with_endpoint(secret: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl CaptchaVerifier for HcaptchaVerifier {
    async fn verify(&self, token: &str) -> bool {
        if self.secret.is_empty() {
            warn!("captcha secret is not configured, rejecting submission");
            return false;
        }
        let url = match self.endpoint.parse() {
            Ok(url) => url,
            Err(_) => return false,
        };
        let params = [
            ("secret", self.secret.as_str()),
            ("response", token),
        ];
        match post_form(url, &HashMap::new(), &params).await {
            Ok(rsp) if http_status_is_ok(rsp.status) => rsp
                .body
                .and_then(|body| serde_json::from_slice::<serde_json::Value>(&body).ok())
                .and_then(|data| data.get("success").and_then(|v| v.as_bool()))
                .unwrap_or(false),
            Ok(rsp) => {
                warn!(status = rsp.status, "captcha verification rejected");
                false
            }
            Err(e) => {
                warn!("captcha verification failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &ContactMessage) -> Result<(), BoxError>;
}

/// Dispatches contact messages through an HTTP mail API with a bearer
/// token, resend-style.
pub struct HttpMailer {
    api_base: String,
    api_key: String,
    from: String,
    to: String,
}

impl HttpMailer {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            api_base: api_base.into(),
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &ContactMessage) -> Result<(), BoxError> {
        let url = format!("{}/emails", self.api_base).parse()?;
        let headers = HashMap::from([(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        )]);
        let body = serde_json::json!({
            "from": self.from,
            "to": self.to,
            "reply_to": message.email,
            "subject": format!("New message from {}", message.name),
            "text": format!(
                "New contact form submission\n\nName: {}\nEmail: {}\n\nMessage:\n{}",
                message.name, message.email, message.message
            ),
        });
        let rsp = post_json(url, &headers, body.to_string()).await?;
        if !http_status_is_ok(rsp.status) {
            return Err(format!("mail API returned status {}", rsp.status).into());
        }
        Ok(())
    }
}
