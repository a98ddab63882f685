//! Run-status notifications to a Slack-style webhook.
//!
//! The notifier observes one engine run and posts a message per phase.
//! Its public entry point never fails: delivery problems are logged at
//! error level and returned as [`DeliveryOutcome`] values.
mod config;
mod message;
mod transport;

pub use config::{NotifierConfig, DEFAULT_CHANNEL, DEFAULT_USERNAME, DEFAULT_WEBHOOK_URL};
pub use message::{Attachment, MessageBody, MessagePayload, COLOR_DANGER, COLOR_GOOD};
pub use transport::{DeliveryOutcome, UreqTransport, WebhookTransport};

/// Name of the notifier in `handlers.enabled` / `handlers.config`.
pub const HANDLER_NAME: &str = "slack";

/// Lifecycle status of the engine run being reported.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    NotStarted,
    Succeeded { elapsed_secs: f64 },
    Failed { elapsed_secs: f64, cause: Option<Vec<u8>> },
}

impl RunStatus {
    /// Phase label used in toggle diagnostics.
    pub fn phase(&self) -> &'static str {
        match self {
            RunStatus::NotStarted => "start",
            RunStatus::Succeeded { .. } => "success",
            RunStatus::Failed { .. } => "failure",
        }
    }
}

/// Node identity and run-list quoted in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub node: String,
    pub run_list: String,
}

pub struct RunNotifier<T = UreqTransport> {
    config: NotifierConfig,
    transport: T,
}

impl RunNotifier<UreqTransport> {
    pub fn new(config: NotifierConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: WebhookTransport> RunNotifier<T> {
    pub fn with_transport(config: NotifierConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    /// Report `status`, returning the outcome of every delivery made.
    ///
    /// A disabled phase makes no delivery and returns an empty list.
    pub fn report(&self, context: &RunContext, status: &RunStatus) -> Vec<DeliveryOutcome> {
        let enabled = match status {
            RunStatus::NotStarted => self.config.on_start,
            RunStatus::Succeeded { .. } => self.config.on_success,
            RunStatus::Failed { .. } => self.config.on_failure,
        };
        if !enabled {
            tracing::debug!("Slack '{}' handler is not active.", status.phase());
            return Vec::new();
        }

        let node = context.node.as_str();
        let run_list = context.run_list.as_str();
        match status {
            RunStatus::NotStarted => {
                vec![self.send_message(MessageBody::attachment(message::started(node, run_list)))]
            }
            RunStatus::Succeeded { elapsed_secs } => vec![self.send_message(
                MessageBody::attachment(message::succeeded(node, run_list, *elapsed_secs)),
            )],
            RunStatus::Failed {
                elapsed_secs,
                cause,
            } => {
                let mut outcomes = vec![self.send_message(MessageBody::attachment(
                    message::failed(node, run_list, *elapsed_secs),
                ))];
                if let Some(cause) = cause {
                    outcomes.push(self.send_message(MessageBody::Text {
                        text: message::fenced_cause(cause),
                    }));
                }
                outcomes
            }
        }
    }

    /// Build the payload for `body`.
    pub fn payload(&self, body: MessageBody) -> MessagePayload {
        MessagePayload {
            username: self.config.username.clone(),
            channel: self.config.channel.clone(),
            token: self.config.token().to_string(),
            body,
        }
    }

    /// Deliver one message as a `payload=<json>` form POST.
    pub fn send_message(&self, body: MessageBody) -> DeliveryOutcome {
        let payload = self.payload(body);
        let json = match serde_json::to_string(&payload) {
            Ok(json) => json,
            Err(err) => {
                let outcome = DeliveryOutcome::TransportError(err.to_string());
                log_outcome(&outcome, &payload.channel);
                return outcome;
            }
        };
        let outcome = self
            .transport
            .post_form(&self.config.endpoint(), &[("payload", json.as_str())]);
        log_outcome(&outcome, &payload.channel);
        outcome
    }
}

fn log_outcome(outcome: &DeliveryOutcome, channel: &str) {
    match outcome {
        DeliveryOutcome::Delivered => {
            tracing::debug!("Slack handler sent a message to channel '{channel}'");
        }
        DeliveryOutcome::HttpError { status, message } => {
            tracing::error!("We got an error while posting a message to Slack: {status} - {message}");
        }
        DeliveryOutcome::TransportError(err) => {
            tracing::error!("An unhandled exception occurred while posting a message to Slack: {err}");
        }
    }
}
