//! Post-transition notification.
//!
//! The engine hands every committed transition to a [`Notifier`] after the
//! task lock is released. Delivery is best-effort: failures are logged and
//! never undo the transition.

pub mod client;
pub mod error;
pub mod types;

use tracing::info;

use crate::config::EngineConfig;

pub use client::WebhookNotifier;
pub use error::NotifyError;
pub use types::{EventKind, WorkflowEvent};

/// Delivers workflow events to whoever needs to hear about them.
#[allow(async_fn_in_trait)]
pub trait Notifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError>;
}

/// Writes events to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        info!(
            task_id = %event.task_id,
            actor = %event.actor,
            status = %event.status,
            event = ?event.kind,
            "workflow event"
        );
        Ok(())
    }
}

/// The notifier selected by configuration: a webhook when one is set,
/// otherwise the log.
pub enum ConfiguredNotifier {
    Log(LogNotifier),
    Webhook(WebhookNotifier),
}

impl ConfiguredNotifier {
    pub fn from_config(config: &EngineConfig) -> Result<Self, NotifyError> {
        match &config.webhook_url {
            Some(url) => Ok(Self::Webhook(WebhookNotifier::new(
                url.clone(),
                config.notify_timeout(),
            )?)),
            None => Ok(Self::Log(LogNotifier)),
        }
    }
}

impl Notifier for ConfiguredNotifier {
    async fn notify(&self, event: &WorkflowEvent) -> Result<(), NotifyError> {
        match self {
            ConfiguredNotifier::Log(n) => n.notify(event).await,
            ConfiguredNotifier::Webhook(n) => n.notify(event).await,
        }
    }
}
