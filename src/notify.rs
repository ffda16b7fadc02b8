//! Best-effort notifications.
//!
//! Slack and email delivery are stubs that log what would be sent. A
//! notification never fails the run.

use crate::config::NotificationsSection;

/// Delivery channel resolved from `[notifications]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Disabled,
    Slack { webhook_url: String },
    Email { to: String },
    Unknown { method: String },
}

pub struct Notifier {
    channel: Channel,
}

impl Notifier {
    pub fn new(config: &NotificationsSection) -> Self {
        let channel = if !config.enabled {
            Channel::Disabled
        } else {
            match config.method.as_str() {
                "slack" => Channel::Slack {
                    webhook_url: config.slack_webhook_url.clone(),
                },
                "email" => Channel::Email {
                    to: config.email_to.clone(),
                },
                other => Channel::Unknown {
                    method: other.to_string(),
                },
            }
        };
        Self { channel }
    }

    pub fn disabled() -> Self {
        Self {
            channel: Channel::Disabled,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn notify(&self, message: &str) {
        match &self.channel {
            Channel::Disabled => tracing::info!("Notification (disabled): {}", message),
            Channel::Slack { webhook_url } => {
                if webhook_url.is_empty() {
                    tracing::warn!("Slack webhook URL not configured, logging instead");
                    tracing::info!("Slack notification: {}", message);
                } else {
                    tracing::info!(webhook = %webhook_url, "Slack notification sent: {}", message);
                }
            }
            Channel::Email { to } => {
                if to.is_empty() {
                    tracing::warn!("Email address not configured, logging instead");
                    tracing::info!("Email notification: {}", message);
                } else {
                    tracing::info!(to = %to, "Email notification sent: {}", message);
                }
            }
            Channel::Unknown { method } => {
                tracing::warn!("Unknown notification method '{}', falling back to log", method);
                tracing::info!("Notification: {}", message);
            }
        }
    }
}
