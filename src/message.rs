use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Platform tag for messages usable on any channel
pub const UNSPECIFIED_PLATFORM: &str = "";

/// Some backends spell out the unspecified platform instead of omitting it
const UNSPECIFIED_MARKER: &str = "PLATFORM_UNSPECIFIED";

const PLATFORM_FIELD: &str = "platform";
const KIND_FIELD: &str = "message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Text,
    Image,
    QuickReplies,
    Card,
    /// A batch of grouped cards; only ever produced by the pipeline
    Cards,
    Payload,
}

impl MessageKind {
    /// Content fields in resolution priority order
    pub const CONTENT_FIELDS: [MessageKind; 5] = [
        MessageKind::Text,
        MessageKind::Image,
        MessageKind::QuickReplies,
        MessageKind::Card,
        MessageKind::Payload,
    ];

    pub fn field_name(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::QuickReplies => "quickReplies",
            MessageKind::Card => "card",
            MessageKind::Cards => "cards",
            MessageKind::Payload => "payload",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::CONTENT_FIELDS
            .into_iter()
            .chain([MessageKind::Cards])
            .find(|kind| kind.field_name() == name)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Platform tags compare case-insensitively
pub fn same_platform(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// A single content block as received from the backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMessage {
    fields: Map<String, Value>,
}

impl RawMessage {
    /// Wrap a JSON object as a message. Legacy `{ "type": n, ... }` messages
    /// are rewritten into the field-per-kind shape. Non-objects are rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::from_fields(fields)),
            other => {
                debug!("Skipping non-object message: {}", other);
                None
            }
        }
    }

    pub fn from_fields(fields: Map<String, Value>) -> Self {
        let has_content = MessageKind::CONTENT_FIELDS
            .iter()
            .any(|kind| fields.contains_key(kind.field_name()));
        match fields.get("type").and_then(Value::as_u64) {
            Some(code) if !has_content => legacy::convert(fields, code),
            _ => Self { fields },
        }
    }

    /// A plain text message, as synthesized from a response's fallback text
    pub fn text(text: &str, platform: &str) -> Self {
        let mut content = Map::new();
        content.insert("text".to_string(), Value::String(text.to_string()));

        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::Object(content));
        let mut message = Self { fields };
        message.set_platform(platform);
        message
    }

    pub fn platform(&self) -> &str {
        match self.fields.get(PLATFORM_FIELD).and_then(Value::as_str) {
            Some(p) if p.eq_ignore_ascii_case(UNSPECIFIED_MARKER) => UNSPECIFIED_PLATFORM,
            Some(p) => p,
            None => UNSPECIFIED_PLATFORM,
        }
    }

    pub fn set_platform(&mut self, platform: &str) {
        self.fields
            .insert(PLATFORM_FIELD.to_string(), Value::String(platform.to_string()));
    }

    pub fn is_unspecified_platform(&self) -> bool {
        self.platform() == UNSPECIFIED_PLATFORM
    }

    /// Case-insensitive platform match
    pub fn matches_platform(&self, filter: &str) -> bool {
        same_platform(self.platform(), filter)
    }

    /// Kind named by an explicit `message` tag, if its content field exists
    pub fn explicit_kind(&self) -> Option<MessageKind> {
        self.fields
            .get(KIND_FIELD)
            .and_then(Value::as_str)
            .and_then(MessageKind::from_field_name)
            .filter(|kind| self.fields.contains_key(kind.field_name()))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn take(&mut self, field: &str) -> Value {
        self.fields.remove(field).unwrap_or(Value::Null)
    }
}

/// Infer a message's kind from its populated content field.
///
/// Fields are checked in [`MessageKind::CONTENT_FIELDS`] order, so a
/// message carrying several content fields always resolves the same way.
/// The reserved `platform` and `message` tags are never candidates.
pub fn resolve_kind(message: &RawMessage) -> Option<MessageKind> {
    MessageKind::CONTENT_FIELDS
        .into_iter()
        .find(|kind| message.get(kind.field_name()).is_some())
}

/// A message with its kind resolved and its content pulled out
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMessage {
    pub platform: String,
    pub kind: MessageKind,
    pub content: Value,
}

impl NormalizedMessage {
    /// Returns `None` for messages without any content field.
    pub fn from_raw(mut raw: RawMessage) -> Option<Self> {
        let kind = raw.explicit_kind().or_else(|| resolve_kind(&raw))?;
        let platform = raw.platform().to_string();
        let content = raw.take(kind.field_name());
        Some(Self {
            platform,
            kind,
            content,
        })
    }
}

/// The top-level fulfillment section of a backend response
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FulfillmentResponse {
    pub text: Option<String>,
    pub messages: Option<Vec<RawMessage>>,
}

impl FulfillmentResponse {
    /// Read either `queryResult { fulfillmentText, fulfillmentMessages }` or the
    /// legacy `result.fulfillment { speech, messages }`. Returns `None` when
    /// neither section exists.
    pub fn from_value(value: &Value) -> Option<Self> {
        if let Some(query_result) = value.get("queryResult").filter(|v| v.is_object()) {
            return Some(Self::from_section(
                query_result,
                "fulfillmentText",
                "fulfillmentMessages",
            ));
        }

        let fulfillment = value
            .get("result")
            .and_then(|result| result.get("fulfillment"))
            .filter(|v| v.is_object())?;
        Some(Self::from_section(fulfillment, "speech", "messages"))
    }

    fn from_section(section: &Value, text_key: &str, messages_key: &str) -> Self {
        let text = section
            .get(text_key)
            .and_then(Value::as_str)
            .map(str::to_string);
        let messages = section.get(messages_key).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .cloned()
                .filter_map(RawMessage::from_value)
                .collect()
        });
        Self { text, messages }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.messages.is_none()
    }
}

/// Text content: `{ "text": "..." }`, or `{ "text": [...] }` for several lines
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub text: TextBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TextBody {
    Line(String),
    Lines(Vec<String>),
}

impl TextContent {
    /// Unwraps a single-line list to a plain string. Returns `None` when
    /// there is no non-empty text to show.
    pub fn from_content(content: &Value) -> Option<Self> {
        let raw = match content {
            Value::String(_) => content,
            other => other.get("text")?,
        };

        let mut lines: Vec<String> = match raw {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => return None,
        };

        if lines.iter().all(String::is_empty) {
            return None;
        }

        let text = if lines.len() == 1 {
            TextBody::Line(lines.remove(0))
        } else {
            TextBody::Lines(lines)
        };
        Some(Self { text })
    }

    pub fn joined(&self, separator: &str) -> String {
        match &self.text {
            TextBody::Line(line) => line.clone(),
            TextBody::Lines(lines) => lines.join(separator),
        }
    }
}

/// A message ready for a platform formatter.
///
/// Serializes as `{ "message": <kind>, "platform": ..., <kind>: <content> }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "message")]
pub enum OutputMessage {
    #[serde(rename = "text")]
    Text { platform: String, text: TextContent },
    #[serde(rename = "image")]
    Image { platform: String, image: Value },
    #[serde(rename = "quickReplies")]
    QuickReplies {
        platform: String,
        #[serde(rename = "quickReplies")]
        quick_replies: Value,
    },
    #[serde(rename = "cards")]
    Cards { platform: String, cards: Vec<Value> },
    #[serde(rename = "payload")]
    Payload { platform: String, payload: Value },
}

impl OutputMessage {
    /// Returns `None` for text messages with nothing to say.
    pub fn from_normalized(message: NormalizedMessage) -> Option<Self> {
        let NormalizedMessage {
            platform,
            kind,
            content,
        } = message;

        let output = match kind {
            MessageKind::Text => OutputMessage::Text {
                text: TextContent::from_content(&content)?,
                platform,
            },
            MessageKind::Image => OutputMessage::Image {
                platform,
                image: content,
            },
            MessageKind::QuickReplies => OutputMessage::QuickReplies {
                platform,
                quick_replies: content,
            },
            MessageKind::Card => OutputMessage::Cards {
                platform,
                cards: vec![content],
            },
            MessageKind::Cards => OutputMessage::Cards {
                platform,
                cards: match content {
                    Value::Array(cards) => cards,
                    _ => return None,
                },
            },
            MessageKind::Payload => OutputMessage::Payload {
                platform,
                payload: content,
            },
        };
        Some(output)
    }

    pub fn platform(&self) -> &str {
        match self {
            OutputMessage::Text { platform, .. }
            | OutputMessage::Image { platform, .. }
            | OutputMessage::QuickReplies { platform, .. }
            | OutputMessage::Cards { platform, .. }
            | OutputMessage::Payload { platform, .. } => platform,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            OutputMessage::Text { .. } => MessageKind::Text,
            OutputMessage::Image { .. } => MessageKind::Image,
            OutputMessage::QuickReplies { .. } => MessageKind::QuickReplies,
            OutputMessage::Cards { .. } => MessageKind::Cards,
            OutputMessage::Payload { .. } => MessageKind::Payload,
        }
    }
}

/// Rewrites v1 messages (`type` 0..=4 with inline fields) into the
/// field-per-kind shape.
mod legacy {
    use serde_json::{Map, Value};
    use tracing::debug;

    use super::{RawMessage, PLATFORM_FIELD};

    pub(super) fn convert(fields: Map<String, Value>, code: u64) -> RawMessage {
        let (name, content) = match code {
            0 => ("text", text(&fields)),
            1 => (
                "card",
                rename(
                    &fields,
                    &[
                        ("title", "title"),
                        ("subtitle", "subtitle"),
                        ("imageUrl", "imageUri"),
                        ("buttons", "buttons"),
                    ],
                ),
            ),
            2 => (
                "quickReplies",
                rename(&fields, &[("title", "title"), ("replies", "quickReplies")]),
            ),
            3 => ("image", rename(&fields, &[("imageUrl", "imageUri")])),
            4 => (
                "payload",
                fields.get("payload").cloned().unwrap_or(Value::Null),
            ),
            other => {
                debug!("Unknown legacy message type {}", other);
                return RawMessage { fields };
            }
        };

        let mut converted = Map::new();
        if let Some(platform) = fields.get(PLATFORM_FIELD) {
            converted.insert(PLATFORM_FIELD.to_string(), platform.clone());
        }
        converted.insert(name.to_string(), content);
        RawMessage { fields: converted }
    }

    fn text(fields: &Map<String, Value>) -> Value {
        let lines = match fields.get("speech") {
            Some(Value::String(s)) => vec![Value::String(s.clone())],
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        let mut content = Map::new();
        content.insert("text".to_string(), Value::Array(lines));
        Value::Object(content)
    }

    fn rename(fields: &Map<String, Value>, mapping: &[(&str, &str)]) -> Value {
        let content: Map<String, Value> = mapping
            .iter()
            .filter_map(|(from, to)| fields.get(*from).map(|v| (to.to_string(), v.clone())))
            .collect();
        Value::Object(content)
    }
}
