//! HTTP delivery for webhook payloads.
use std::time::Duration;
use ureq::Agent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one delivery attempt. Never an error for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    HttpError { status: u16, message: String },
    TransportError(String),
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }
}

/// Posts a form-encoded body to a URL.
pub trait WebhookTransport {
    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> DeliveryOutcome;
}

/// Blocking `ureq` transport. Any status other than 200 is an HTTP error.
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookTransport for UreqTransport {
    fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> DeliveryOutcome {
        match self.agent.post(url).send_form(fields.iter().copied()) {
            Ok(response) => {
                let status = response.status();
                if status.as_u16() == 200 {
                    DeliveryOutcome::Delivered
                } else {
                    DeliveryOutcome::HttpError {
                        status: status.as_u16(),
                        message: status.canonical_reason().unwrap_or_default().to_string(),
                    }
                }
            }
            Err(err) => DeliveryOutcome::TransportError(err.to_string()),
        }
    }
}
