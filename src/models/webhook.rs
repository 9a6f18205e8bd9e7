use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

// Delivery notification. The envelope is walked as a `Value` so that null,
// missing or wrong-typed levels read as "no messages" instead of failing.
// Individual messages, contacts and statuses are decoded one at a time and
// skipped with a warning when they do not fit.

#[derive(Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct WebhookPayload(Value);

#[derive(Debug, Deserialize)]
struct Contact {
    #[serde(default)]
    wa_id: Option<String>,
    #[serde(default)]
    profile: Option<ContactProfile>,
}

#[derive(Debug, Deserialize)]
struct ContactProfile {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn decode_each<T: DeserializeOwned>(items: &[Value], what: &'static str) -> Vec<T> {
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, what, "Skipping entry with unexpected shape");
                None
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    id: Option<String>,
    from: Option<String>,
    timestamp: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<RawText>,
    button: Option<RawButton>,
    interactive: Option<RawInteractive>,
}

#[derive(Debug, Deserialize)]
struct RawText {
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawButton {
    text: Option<String>,
    payload: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawInteractive {
    button_reply: Option<RawReplyTitle>,
    list_reply: Option<RawReplyTitle>,
}

#[derive(Debug, Deserialize)]
struct RawReplyTitle {
    title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Button,
    Interactive,
    Other(String),
}

/// A single inbound user message, flattened out of a delivery notification.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: Option<String>,
    pub from: String,
    pub text: String,
    pub kind: MessageKind,
    pub timestamp: Option<String>,
    pub contact_name: Option<String>,
    pub raw: Value,
}

impl InboundMessage {
    /// Text for logs and the interaction log; non-text messages get a type label.
    pub fn describe(&self) -> String {
        match &self.kind {
            MessageKind::Other(kind) if self.text.is_empty() => format!("[{} message]", kind),
            _ => self.text.clone(),
        }
    }

    fn from_raw(raw: Value) -> Option<Self> {
        let parsed: RawMessage = match serde_json::from_value(raw.clone()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping message with unexpected shape");
                return None;
            }
        };

        let from = match parsed.from.filter(|f| !f.is_empty()) {
            Some(f) => f,
            None => {
                tracing::warn!(message_id = ?parsed.id, "Skipping message without sender");
                return None;
            }
        };

        let kind_label = parsed.kind.unwrap_or_else(|| "text".to_string());
        let (kind, text) = match kind_label.as_str() {
            "text" => (
                MessageKind::Text,
                parsed.text.and_then(|t| t.body).unwrap_or_default(),
            ),
            "button" => (
                MessageKind::Button,
                parsed
                    .button
                    .and_then(|b| b.text.or(b.payload))
                    .unwrap_or_default(),
            ),
            "interactive" => (
                MessageKind::Interactive,
                parsed
                    .interactive
                    .and_then(|i| i.button_reply.or(i.list_reply))
                    .and_then(|r| r.title)
                    .unwrap_or_default(),
            ),
            other => (MessageKind::Other(other.to_string()), String::new()),
        };

        Some(InboundMessage {
            id: parsed.id,
            from,
            text,
            kind,
            timestamp: parsed.timestamp,
            contact_name: None,
            raw,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub to: String,
    pub body: String,
}

impl OutboundReply {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            body: body.into(),
        }
    }
}

impl WebhookPayload {
    fn values(&self) -> impl Iterator<Item = &Value> {
        array(&self.0, "entry")
            .iter()
            .flat_map(|e| array(e, "changes").iter())
            .filter_map(|c| c.get("value"))
            .filter(|v| v.is_object())
    }

    /// All user messages across every entry and change, in delivery order.
    pub fn messages(&self) -> Vec<InboundMessage> {
        let mut out = Vec::new();
        for value in self.values() {
            let raw_messages = array(value, "messages");
            if raw_messages.is_empty() {
                continue;
            }
            let contacts: Vec<Contact> = decode_each(array(value, "contacts"), "contact");
            for raw in raw_messages {
                if let Some(mut msg) = InboundMessage::from_raw(raw.clone()) {
                    msg.contact_name = contacts
                        .iter()
                        .find(|c| c.wa_id.as_deref() == Some(msg.from.as_str()))
                        .and_then(|c| c.profile.as_ref())
                        .and_then(|p| p.name.clone());
                    out.push(msg);
                }
            }
        }
        out
    }

    pub fn statuses(&self) -> Vec<StatusUpdate> {
        self.values()
            .flat_map(|v| decode_each::<StatusUpdate>(array(v, "statuses"), "status"))
            .collect()
    }
}
