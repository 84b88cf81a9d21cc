use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AutomationEvent<'a> {
    pub event: &'a str,
    pub payload: &'a JsonValue,
    pub sent_at: String,
}

/// Fires events at the external automation tool. Disabled when no webhook
/// URL is configured; delivery failures never fail the caller.
#[derive(Clone)]
pub struct AutomationService {
    client: Client,
    webhook_url: Option<String>,
}

impl AutomationService {
    pub const INTERVIEW_SCHEDULED: &'static str = "interview_scheduled";
    pub const CANDIDATE_STATUS_CHANGED: &'static str = "candidate_status_changed";

    pub fn new(webhook_url: Option<String>, client: Client) -> Self {
        let webhook_url = webhook_url.filter(|url| !url.trim().is_empty());

        if let Some(ref url) = webhook_url {
            info!("Automation webhook enabled: {}", url);
        } else {
            info!("Automation webhook disabled (AUTOMATION_WEBHOOK_URL not set)");
        }

        Self {
            client,
            webhook_url,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Returns whether the webhook accepted the event.
    pub async fn notify(&self, event: &str, payload: &JsonValue) -> bool {
        let Some(url) = &self.webhook_url else {
            return false;
        };

        let body = AutomationEvent {
            event,
            payload,
            sent_at: Utc::now().to_rfc3339(),
        };

        match self.client.post(url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                info!(event, "Automation webhook delivered");
                true
            }
            Ok(response) => {
                warn!(event, status = %response.status(), "Automation webhook rejected event");
                false
            }
            Err(err) => {
                warn!(event, error = ?err, "Automation webhook unreachable");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn disabled_service_sends_nothing() {
        let service = AutomationService::new(Some("  ".into()), Client::new());
        assert!(!service.is_enabled());
        assert!(!service.notify("x", &json!({})).await);
    }

    #[tokio::test]
    async fn event_is_posted_with_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(json!({
                "event": "interview_scheduled",
                "payload": { "candidate_id": 4 }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let service = AutomationService::new(Some(format!("{}/hook", server.uri())), Client::new());
        assert!(
            service
                .notify(
                    AutomationService::INTERVIEW_SCHEDULED,
                    &json!({ "candidate_id": 4 })
                )
                .await
        );
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let service = AutomationService::new(Some(server.uri()), Client::new());
        assert!(!service.notify("x", &json!({})).await);
    }
}
