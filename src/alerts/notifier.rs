//! Chat webhook notifier
//!
//! Every alerting call site goes through [`Notifier::send`], which never
//! returns an error: delivery is fire-and-forget, and transport failures are
//! reported to the error trigger instead of propagating into the loops.

use std::sync::Arc;
use std::time::Duration;

use crate::errors::ErrorTrigger;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

enum Sink {
    Webhook { client: reqwest::Client, url: String },
    Disabled,
    #[cfg(test)]
    Capture(parking_lot::Mutex<Vec<String>>),
}

pub struct Notifier {
    sink: Sink,
    errors: Arc<ErrorTrigger>,
}

impl Notifier {
    /// A notifier without a webhook URL is a logged no-op.
    pub fn new(webhook_url: Option<String>, errors: Arc<ErrorTrigger>) -> Self {
        let sink = match webhook_url.filter(|url| !url.is_empty()) {
            Some(url) => Sink::Webhook {
                client: reqwest::Client::new(),
                url,
            },
            None => Sink::Disabled,
        };
        Self { sink, errors }
    }

    /// Notifier that records messages in memory instead of sending them
    #[cfg(test)]
    pub fn capture(errors: Arc<ErrorTrigger>) -> Self {
        Self {
            sink: Sink::Capture(parking_lot::Mutex::new(Vec::new())),
            errors,
        }
    }

    /// Messages recorded by a capture notifier
    #[cfg(test)]
    pub fn sent(&self) -> Vec<String> {
        match &self.sink {
            Sink::Capture(messages) => messages.lock().clone(),
            _ => Vec::new(),
        }
    }

    /// Best-effort delivery of a chat message. Never fails the caller.
    pub async fn send(&self, message: &str) {
        match &self.sink {
            Sink::Disabled => {
                tracing::warn!(
                    "Chat message not sent because notifications are disabled \
                     or no webhook URL is configured: {}",
                    message
                );
            }
            #[cfg(test)]
            Sink::Capture(messages) => {
                messages.lock().push(message.to_string());
            }
            Sink::Webhook { client, url } => {
                tracing::info!("Sending chat message: {}", message);

                let payload = serde_json::json!({ "content": message });
                let result = client
                    .post(url)
                    .timeout(SEND_TIMEOUT)
                    .json(&payload)
                    .send()
                    .await;

                match result {
                    Ok(response) if response.status().is_success() => {
                        tracing::debug!("Chat message delivered");
                    }
                    Ok(response) => {
                        let status = response.status();
                        let reason = response.text().await.unwrap_or_default();
                        self.errors.report(
                            format!("webhook returned status {}: {}", status, reason),
                            "failed to deliver chat message, check the webhook configuration",
                        );
                    }
                    Err(e) => {
                        self.errors.report(
                            e,
                            "failed to deliver chat message, check the webhook configuration",
                        );
                    }
                }
            }
        }
    }
}
