//! Webhook payload shapes and the per-phase message texts.
use serde::Serialize;

pub const COLOR_GOOD: &str = "good";
pub const COLOR_DANGER: &str = "danger";

/// One webhook delivery. The body is either attachments or plain text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagePayload {
    pub username: String,
    pub channel: String,
    pub token: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageBody {
    Attachments {
        color: Option<String>,
        attachments: Vec<Attachment>,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub pretext: String,
    pub title: String,
    pub title_link: Option<String>,
    pub color: Option<String>,
    pub text: String,
    pub fallback: String,
}

impl MessageBody {
    pub fn attachment(attachment: Attachment) -> Self {
        MessageBody::Attachments {
            color: attachment.color.clone(),
            attachments: vec![attachment],
        }
    }
}

pub(crate) fn started(node: &str, run_list: &str) -> Attachment {
    Attachment {
        pretext: pretext(node),
        title: "Run started!".to_string(),
        title_link: None,
        color: None,
        text: format!("Will run {run_list}"),
        fallback: format!("Chef run started! {node} will run {run_list}."),
    }
}

pub(crate) fn succeeded(node: &str, run_list: &str, elapsed: f64) -> Attachment {
    Attachment {
        pretext: pretext(node),
        title: "Run succeeded!".to_string(),
        title_link: None,
        color: Some(COLOR_GOOD.to_string()),
        text: format!("Just run {run_list} successfully in {elapsed} seconds."),
        fallback: format!(
            "Chef run successfully! {node} run {run_list} successfully in {} seconds.",
            whole_seconds(elapsed)
        ),
    }
}

pub(crate) fn failed(node: &str, run_list: &str, elapsed: f64) -> Attachment {
    Attachment {
        pretext: pretext(node),
        title: "Run FAILED!".to_string(),
        title_link: None,
        color: Some(COLOR_DANGER.to_string()),
        text: format!("Running {run_list} failed in {elapsed} seconds."),
        fallback: format!(
            "Chef FAILED! {node} failed to run {run_list} in {} seconds.",
            whole_seconds(elapsed)
        ),
    }
}

/// Fence a failure cause, replacing invalid UTF-8 with `?`.
pub(crate) fn fenced_cause(cause: &[u8]) -> String {
    let mut text = String::with_capacity(cause.len() + 6);
    text.push_str("```");
    for chunk in cause.utf8_chunks() {
        text.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            text.push('?');
        }
    }
    text.push_str("```");
    text
}

fn pretext(node: &str) -> String {
    format!("Run at {node}")
}

fn whole_seconds(elapsed: f64) -> u64 {
    if elapsed.is_finite() && elapsed > 0.0 {
        elapsed.trunc() as u64
    } else {
        0
    }
}
