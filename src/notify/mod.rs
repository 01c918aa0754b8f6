//! Alert delivery
//!
//! Sends a completed positive verdict to an operator-configured endpoint.
//! Delivery is advisory: a failed send is logged and never retracts or
//! alters the verdict it describes.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scan::verdict::Verdict;

/// Fixed operator-facing alert message
pub const ALERT_MESSAGE: &str = "Unauthorized slips/papers detected at entry.";

/// Outbound alert channel
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert payload
    async fn send(&self, alert: &AlertPayload) -> anyhow::Result<()>;
}

/// Wire payload describing a positive verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Configured recipient address
    pub to_email: String,
    pub student_name: String,
    pub roll_no: String,
    /// RFC 3339 scan end time
    pub timestamp: String,
    pub alert_message: String,
    /// Evidence still as a `data:image/png;base64,` URL
    pub evidence_image: Option<String>,
}

impl AlertPayload {
    /// Build the payload for a verdict
    pub fn for_verdict(verdict: &Verdict, recipient: &str) -> Self {
        let evidence_image = verdict.evidence_png.as_ref().map(|png| {
            format!(
                "data:image/png;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(png)
            )
        });

        Self {
            to_email: recipient.to_string(),
            student_name: verdict.subject.name.clone(),
            roll_no: verdict.subject.roll_number.clone(),
            timestamp: verdict.timestamp.to_rfc3339(),
            alert_message: ALERT_MESSAGE.to_string(),
            evidence_image,
        }
    }
}

/// JSON POST sink for webhook-style alert endpoints
pub struct WebhookSink {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn send(&self, alert: &AlertPayload) -> anyhow::Result<()> {
        let response = self.client.post(&self.endpoint).json(alert).send().await?;
        response.error_for_status()?;
        Ok(())
    }
}

/// Send an alert for a verdict when it is positive and alerts are enabled.
///
/// Returns whether a delivery succeeded. Failures are logged as advisory;
/// the verdict stands either way.
pub async fn dispatch(
    sink: &dyn AlertSink,
    verdict: &Verdict,
    recipient: &str,
    enabled: bool,
) -> bool {
    if !enabled || !verdict.has_unauthorized_material {
        return false;
    }

    let payload = AlertPayload::for_verdict(verdict, recipient);
    match sink.send(&payload).await {
        Ok(()) => {
            info!("alert delivered for scan {}", verdict.scan_id);
            true
        }
        Err(err) => {
            warn!("alert delivery failed for scan {}: {err:#}", verdict.scan_id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use parking_lot::Mutex;
    use uuid::Uuid;

    use crate::scan::verdict::SubjectIdentity;

    fn verdict(positive: bool) -> Verdict {
        Verdict {
            scan_id: Uuid::new_v4(),
            has_unauthorized_material: positive,
            evidence_png: positive.then(|| vec![137, 80, 78, 71]),
            subject: SubjectIdentity::from_input("Ada", "42"),
            timestamp: Utc::now(),
        }
    }

    /// Sink recording delivered payloads
    #[derive(Default)]
    struct RecordingSink {
        delivered: Mutex<Vec<AlertPayload>>,
    }

    #[async_trait]
    impl AlertSink for RecordingSink {
        async fn send(&self, alert: &AlertPayload) -> anyhow::Result<()> {
            self.delivered.lock().push(alert.clone());
            Ok(())
        }
    }

    /// Sink whose every delivery fails
    struct DeadSink;

    #[async_trait]
    impl AlertSink for DeadSink {
        async fn send(&self, _alert: &AlertPayload) -> anyhow::Result<()> {
            anyhow::bail!("endpoint unreachable")
        }
    }

    #[test]
    fn test_payload_carries_identity_and_data_url() {
        let payload = AlertPayload::for_verdict(&verdict(true), "principal@school.example");

        assert_eq!(payload.to_email, "principal@school.example");
        assert_eq!(payload.student_name, "Ada");
        assert_eq!(payload.roll_no, "42");
        assert_eq!(payload.alert_message, ALERT_MESSAGE);
        let url = payload.evidence_image.unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_payload_wire_format() {
        let payload = AlertPayload::for_verdict(&verdict(true), "p@example.org");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["to_email"], "p@example.org");
        assert_eq!(value["student_name"], "Ada");
        assert_eq!(value["roll_no"], "42");
        assert_eq!(value["alert_message"], ALERT_MESSAGE);
        assert!(value["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_dispatch_delivers_positive_verdicts() {
        let sink = RecordingSink::default();
        assert!(dispatch(&sink, &verdict(true), "p@example.org", true).await);
        assert_eq!(sink.delivered.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_skips_clean_verdicts() {
        let sink = RecordingSink::default();
        assert!(!dispatch(&sink, &verdict(false), "p@example.org", true).await);
        assert!(sink.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_honors_opt_out() {
        let sink = RecordingSink::default();
        assert!(!dispatch(&sink, &verdict(true), "p@example.org", false).await);
        assert!(sink.delivered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        // The verdict stands; dispatch just reports the miss
        let v = verdict(true);
        assert!(!dispatch(&DeadSink, &v, "p@example.org", true).await);
        assert!(v.has_unauthorized_material);
        assert!(v.evidence_png.is_some());
    }
}
