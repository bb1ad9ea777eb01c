//! Telegram Alert Dispatcher
//!
//! Best-effort push of trade outcomes to a Telegram chat. Missing
//! credentials or alerts disabled in config is a silent no-op, and a failed
//! send is logged and swallowed; an alert never fails an order.
//!
//! Usage:
//!   Set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID in the environment and
//!   enable `logs.telegram` in config.

use async_trait::async_trait;
use serde::Serialize;
use std::env;
use tracing::{debug, warn};

/// Fire-and-forget notification sink.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, message: &str);
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram-backed alert dispatcher.
pub struct TelegramAlerter {
    credentials: Option<(String, String)>,
    enabled: bool,
    client: reqwest::Client,
}

impl TelegramAlerter {
    /// Build from environment credentials; `enabled` comes from the
    /// `logs.telegram` config flag.
    pub fn from_env(enabled: bool) -> Self {
        let credentials = match (env::var("TELEGRAM_BOT_TOKEN"), env::var("TELEGRAM_CHAT_ID")) {
            (Ok(token), Ok(chat_id)) => Some((token, chat_id)),
            _ => None,
        };

        Self {
            credentials,
            enabled,
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.credentials.is_some()
    }
}

#[async_trait]
impl AlertSink for TelegramAlerter {
    async fn send(&self, message: &str) {
        let (token, chat_id) = match &self.credentials {
            Some(credentials) if self.enabled => credentials,
            _ => {
                debug!("Telegram alerts disabled or unconfigured, skipping alert");
                return;
            }
        };

        let url = format!("https://api.telegram.org/bot{}/sendMessage", token);
        let payload = TelegramMessage {
            chat_id,
            text: message,
        };

        match self.client.post(&url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                warn!("Telegram alert rejected: {}", response.status());
            }
            Ok(_) => {}
            Err(e) => warn!("Error sending Telegram alert: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alerter_without_credentials_is_disabled() {
        // Construct directly so the test does not depend on ambient env vars
        let alerter = TelegramAlerter {
            credentials: None,
            enabled: true,
            client: reqwest::Client::new(),
        };
        assert!(!alerter.is_enabled());
    }

    #[test]
    fn config_flag_gates_configured_credentials() {
        let alerter = TelegramAlerter {
            credentials: Some(("token".to_string(), "chat".to_string())),
            enabled: false,
            client: reqwest::Client::new(),
        };
        assert!(!alerter.is_enabled());

        let alerter = TelegramAlerter {
            credentials: Some(("token".to_string(), "chat".to_string())),
            enabled: true,
            client: reqwest::Client::new(),
        };
        assert!(alerter.is_enabled());
    }

    #[tokio::test]
    async fn disabled_send_is_a_silent_no_op() {
        let alerter = TelegramAlerter {
            credentials: None,
            enabled: false,
            client: reqwest::Client::new(),
        };
        // Must return without attempting any network call
        alerter.send("Position opened at 1850").await;
    }
}
