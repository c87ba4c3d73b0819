//! Alert buffer behind a seam for a persistent implementation

use async_trait::async_trait;
use payflow_core::alert::Alert;
use tokio::sync::RwLock;

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, alert: Alert);
    async fn list(&self) -> Vec<Alert>;
    async fn clear(&self);
}

/// Process-scoped buffer; alerts are lost on restart.
#[derive(Default)]
pub struct MemoryAlertStore {
    alerts: RwLock<Vec<Alert>>,
}

impl MemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryAlertStore {
    async fn append(&self, alert: Alert) {
        self.alerts.write().await.push(alert);
    }

    async fn list(&self) -> Vec<Alert> {
        self.alerts.read().await.clone()
    }

    async fn clear(&self) {
        self.alerts.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use payflow_core::alert::AlertSeverity;

    fn alert(message: &str) -> Alert {
        Alert {
            service: "reconcile-job".to_string(),
            severity: AlertSeverity::Warning,
            message: message.to_string(),
            details: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_list_clear() {
        let store = MemoryAlertStore::new();
        assert!(store.list().await.is_empty());

        store.append(alert("first")).await;
        store.append(alert("second")).await;

        let alerts = store.list().await;
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].message, "first");

        store.clear().await;
        assert!(store.list().await.is_empty());
    }
}
