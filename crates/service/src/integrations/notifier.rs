use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn, instrument};
use uuid::Uuid;

use configs::SmsConfig;

use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_user_id: Option<Uuid>,
    pub phone: Option<String>,
    pub title: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), ServiceError>;
}

/// Sends and logs failures; a notification never fails the calling request.
pub async fn dispatch(notifier: &dyn Notifier, notification: Notification) {
    let title = notification.title.clone();
    if let Err(e) = notifier.notify(notification).await {
        warn!(error = %e, title = %title, "notification_failed");
    }
}

/// Records notifications in the log only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, n: Notification) -> Result<(), ServiceError> {
        info!(recipient = ?n.recipient_user_id, title = %n.title, body = %n.body, "notification");
        Ok(())
    }
}

/// JSON-over-HTTP SMS gateway with bearer auth.
pub struct SmsGateway {
    client: reqwest::Client,
    cfg: SmsConfig,
}

impl SmsGateway {
    pub fn new(client: reqwest::Client, cfg: SmsConfig) -> Self { Self { client, cfg } }
}

#[async_trait]
impl Notifier for SmsGateway {
    #[instrument(skip(self, n), fields(title = %n.title))]
    async fn notify(&self, n: Notification) -> Result<(), ServiceError> {
        let Some(phone) = n.phone.as_deref().filter(|p| !p.trim().is_empty()) else {
            info!(recipient = ?n.recipient_user_id, "sms skipped: no phone number");
            return Ok(());
        };
        let payload = json!({
            "to": phone,
            "from": self.cfg.sender,
            "message": format!("{}: {}", n.title, n.body),
        });
        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServiceError::Integration(format!("sms request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ServiceError::Integration(format!("sms gateway returned {status}")));
        }
        info!("sms_sent");
        Ok(())
    }
}
