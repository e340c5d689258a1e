//! Operator audit trail posted to a Discord webhook.

use std::time::Duration;

use tracing::warn;

#[derive(Clone)]
pub struct AuditLog {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl AuditLog {
    pub fn new(webhook_url: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self { http, webhook_url }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Post one line. Failures are logged and otherwise ignored.
    pub async fn send(&self, content: &str) {
        let Some(url) = &self.webhook_url else {
            return;
        };

        let result = self
            .http
            .post(url)
            .json(&serde_json::json!({
                "content": content,
                "allowed_mentions": { "parse": [] }
            }))
            .send()
            .await
            .and_then(|res| res.error_for_status());

        if let Err(e) = result {
            warn!(error = %e, "failed to post audit log entry");
        }
    }
}
