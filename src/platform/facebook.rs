use serde_json::{json, Map, Value};

use super::MessageFormatter;
use crate::message::OutputMessage;

/// Facebook Messenger Send API message bodies
pub struct FacebookFormatter;

impl MessageFormatter for FacebookFormatter {
    fn format_message(&self, message: &OutputMessage) -> Option<Value> {
        match message {
            OutputMessage::Text { text, .. } => {
                let text = text.joined("\n");
                (!text.is_empty()).then(|| json!({ "text": text }))
            }
            OutputMessage::QuickReplies { quick_replies, .. } => format_quick_replies(quick_replies),
            OutputMessage::Image { image, .. } => {
                let url = non_empty_str(image.get("imageUri"))?;
                Some(json!({
                    "attachment": {
                        "type": "image",
                        "payload": { "url": url, "is_reusable": true }
                    }
                }))
            }
            OutputMessage::Cards { cards, .. } => {
                if cards.is_empty() {
                    return None;
                }
                let elements: Vec<Value> = cards.iter().map(format_card).collect();
                Some(json!({
                    "attachment": {
                        "type": "template",
                        "payload": { "template_type": "generic", "elements": elements }
                    }
                }))
            }
            OutputMessage::Payload { payload, .. } => payload.get("facebook").cloned(),
        }
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn format_quick_replies(quick_replies: &Value) -> Option<Value> {
    let title = non_empty_str(quick_replies.get("title"))?;
    let replies: Vec<Value> = quick_replies
        .get("quickReplies")
        .and_then(Value::as_array)
        .map(|replies| {
            replies
                .iter()
                .filter_map(Value::as_str)
                .map(|reply| json!({ "content_type": "text", "title": reply, "payload": reply }))
                .collect()
        })
        .unwrap_or_default();

    if replies.is_empty() {
        return Some(json!({ "text": title }));
    }
    Some(json!({ "text": title, "quick_replies": replies }))
}

fn format_card(card: &Value) -> Value {
    let mut element = Map::new();
    element.insert(
        "title".to_string(),
        card.get("title").cloned().unwrap_or(Value::Null),
    );
    let buttons = card
        .get("buttons")
        .and_then(Value::as_array)
        .map(|buttons| Value::Array(buttons.iter().map(format_button).collect()))
        .unwrap_or(Value::Null);
    element.insert("buttons".to_string(), buttons);

    if let Some(subtitle) = non_empty_str(card.get("subtitle")) {
        element.insert("subtitle".to_string(), json!(subtitle));
    }
    if let Some(image_uri) = non_empty_str(card.get("imageUri")) {
        element.insert("image_url".to_string(), json!(image_uri));
    }
    Value::Object(element)
}

fn format_button(button: &Value) -> Value {
    let title = button.get("text").cloned().unwrap_or(Value::Null);
    match non_empty_str(button.get("postback")) {
        Some(url) if url.to_lowercase().starts_with("http") => {
            json!({ "type": "web_url", "title": title, "url": url })
        }
        Some(postback) => json!({ "type": "postback", "title": title, "payload": postback }),
        None => json!({ "type": "postback", "title": title.clone(), "payload": title }),
    }
}
