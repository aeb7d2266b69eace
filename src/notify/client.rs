use std::time::Duration;

use reqwest::Client;

use super::Notifier;
use super::error::NotifyError;
use super::types::WorkflowEvent;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts each event as JSON to a fixed HTTP endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Notifier for WebhookNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(event)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
