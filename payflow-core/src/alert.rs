//! Alert webhook client
//!
//! Services post structured alerts to the alert sink. An unconfigured
//! webhook URL disables delivery without failing the caller; the pipeline
//! degrades open on observability.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Error,
    Warning,
    Info,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::Error => "error",
            AlertSeverity::Warning => "warning",
            AlertSeverity::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert record exchanged with the alert sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub service: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

pub struct AlertClient {
    webhook_url: Option<String>,
    http: reqwest::Client,
}

impl AlertClient {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }

    pub async fn send(
        &self,
        service: &str,
        severity: AlertSeverity,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            debug!("alert webhook URL not configured, skipping alert from {}", service);
            return Ok(());
        };

        let alert = Alert {
            service: service.to_string(),
            severity,
            message: message.to_string(),
            details,
            timestamp: Utc::now(),
        };

        let response = self
            .http
            .post(url)
            .timeout(Duration::from_secs(10))
            .json(&alert)
            .send()
            .await
            .map_err(|e| Error::Alert(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("alert webhook returned status {}: {}", status, body);
            return Err(Error::Alert(format!("webhook returned status {}: {}", status, body)));
        }

        info!("alert sent: service={} severity={:?} message={}", service, severity, message);

        Ok(())
    }

    pub async fn send_critical(
        &self,
        service: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        self.send(service, AlertSeverity::Critical, message, details).await
    }

    pub async fn send_error(
        &self,
        service: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        self.send(service, AlertSeverity::Error, message, details).await
    }

    pub async fn send_warning(
        &self,
        service: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        self.send(service, AlertSeverity::Warning, message, details).await
    }

    pub async fn send_info(
        &self,
        service: &str,
        message: &str,
        details: Option<serde_json::Value>,
    ) -> Result<()> {
        self.send(service, AlertSeverity::Info, message, details).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_webhook_is_a_no_op() {
        let client = AlertClient::new(None);
        let sent = client
            .send_warning("reconcile-job", "mismatch detected", None)
            .await;
        assert!(sent.is_ok());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AlertSeverity::Warning).unwrap(), r#""warning""#);
    }

    #[test]
    fn test_alert_elides_missing_details() {
        let alert = Alert {
            service: "dlq-monitor".to_string(),
            severity: AlertSeverity::Error,
            message: "dead letter".to_string(),
            details: None,
            timestamp: Utc::now(),
        };
        let value = serde_json::to_value(&alert).unwrap();
        assert!(value.get("details").is_none());
    }
}
