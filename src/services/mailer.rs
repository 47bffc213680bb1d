//! Outgoing mail
//!
//! Two backends: [`LogMailer`] writes the message to the log (dev mode, or
//! when no SendGrid key is configured) and [`SendGridMailer`] posts it to the
//! SendGrid v3 API.

use async_trait::async_trait;
use chrono::Duration;
use serde_json::json;
use std::time::Duration as StdDuration;
use tracing::{debug, info, warn};

use crate::types::{Result, ScribeError};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// A single plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `mail` from `from`
    async fn send(&self, from: &str, mail: &OutgoingMail) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Logs messages instead of sending them
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, from: &str, mail: &OutgoingMail) -> Result<()> {
        info!(
            from = %from,
            to = %mail.to,
            subject = %mail.subject,
            "Mail (not delivered)"
        );
        debug!("{}", mail.body);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Delivers through the SendGrid HTTP API
#[derive(Clone)]
pub struct SendGridMailer {
    api_key: String,
    http_client: reqwest::Client,
}

impl SendGridMailer {
    pub fn new(api_key: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(15))
            .build()
            .map_err(|e| ScribeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            http_client,
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, from: &str, mail: &OutgoingMail) -> Result<()> {
        let payload = json!({
            "personalizations": [{ "to": [{ "email": mail.to }] }],
            "from": { "email": from },
            "subject": mail.subject,
            "content": [{ "type": "text/plain", "value": mail.body }],
        });

        let response = self
            .http_client
            .post(SENDGRID_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!("SendGrid rejected mail to {}: {} {}", mail.to, status, detail);
            return Err(ScribeError::Mail(format!("SendGrid returned {}", status)));
        }

        info!("Mail sent to {} ({})", mail.to, mail.subject);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }
}

/// Account verification message carrying `token`
pub fn verification_mail(to: &str, client_url: &str, token: &str, ttl: Duration) -> OutgoingMail {
    let link = format!("{}/verify-account/{}", client_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your account".into(),
        body: format!(
            "If you were requested to verify your account, verify now within {} minutes, \
             otherwise ignore this message.\n\n{}\n",
            ttl.num_minutes(),
            link
        ),
    }
}

/// Password reset message carrying `token`
pub fn reset_mail(to: &str, client_url: &str, token: &str, ttl: Duration) -> OutgoingMail {
    let link = format!("{}/reset-password/{}", client_url.trim_end_matches('/'), token);
    OutgoingMail {
        to: to.to_string(),
        subject: "Reset your password".into(),
        body: format!(
            "If you were requested to reset your password, reset now within {} minutes, \
             otherwise ignore this message.\n\n{}\n",
            ttl.num_minutes(),
            link
        ),
    }
}
