use serde_json::{json, Map, Value};

use super::MessageFormatter;
use crate::message::OutputMessage;

/// Split long messages for Telegram's message length limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        // A single char wider than the limit still has to go somewhere
        if end == start {
            end = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .or_else(|| text[start..end].rfind(' '))
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

/// Telegram Bot API method payloads.
///
/// Every message renders to an array of `sendMessage`/`sendPhoto` calls,
/// since long text and card batches need more than one.
pub struct TelegramFormatter {
    max_message_len: usize,
}

impl TelegramFormatter {
    pub fn new(max_message_len: usize) -> Self {
        Self {
            max_message_len: max_message_len.max(1),
        }
    }

    fn send_text(&self, text: &str) -> Vec<Value> {
        split_message(text, self.max_message_len)
            .into_iter()
            .map(|chunk| json!({ "method": "sendMessage", "text": chunk }))
            .collect()
    }
}

impl MessageFormatter for TelegramFormatter {
    fn format_message(&self, message: &OutputMessage) -> Option<Value> {
        let calls = match message {
            OutputMessage::Text { text, .. } => {
                let text = text.joined("\n");
                if text.is_empty() {
                    return None;
                }
                self.send_text(&text)
            }
            OutputMessage::Image { image, .. } => {
                let url = non_empty_str(image.get("imageUri"))?;
                vec![json!({ "method": "sendPhoto", "photo": url })]
            }
            OutputMessage::QuickReplies { quick_replies, .. } => {
                let title = non_empty_str(quick_replies.get("title"))?;
                let keyboard: Vec<Value> = quick_replies
                    .get("quickReplies")
                    .and_then(Value::as_array)
                    .map(|replies| {
                        replies
                            .iter()
                            .filter_map(Value::as_str)
                            .map(|reply| json!([{ "text": reply }]))
                            .collect()
                    })
                    .unwrap_or_default();

                let mut call = json!({ "method": "sendMessage", "text": title });
                if !keyboard.is_empty() {
                    call["reply_markup"] = json!({
                        "keyboard": keyboard,
                        "one_time_keyboard": true,
                        "resize_keyboard": true
                    });
                }
                vec![call]
            }
            OutputMessage::Cards { cards, .. } => cards.iter().filter_map(format_card).collect(),
            OutputMessage::Payload { payload, .. } => return payload.get("telegram").cloned(),
        };

        (!calls.is_empty()).then_some(Value::Array(calls))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn format_card(card: &Value) -> Option<Value> {
    let caption = [card.get("title"), card.get("subtitle")]
        .into_iter()
        .filter_map(non_empty_str)
        .collect::<Vec<_>>()
        .join("\n");

    let mut call = Map::new();
    match non_empty_str(card.get("imageUri")) {
        Some(photo) => {
            call.insert("method".to_string(), json!("sendPhoto"));
            call.insert("photo".to_string(), json!(photo));
            if !caption.is_empty() {
                call.insert("caption".to_string(), json!(caption));
            }
        }
        None if caption.is_empty() => return None,
        None => {
            call.insert("method".to_string(), json!("sendMessage"));
            call.insert("text".to_string(), json!(caption));
        }
    }

    let rows: Vec<Value> = card
        .get("buttons")
        .and_then(Value::as_array)
        .map(|buttons| buttons.iter().filter_map(format_button).collect())
        .unwrap_or_default();
    if !rows.is_empty() {
        call.insert(
            "reply_markup".to_string(),
            json!({ "inline_keyboard": rows }),
        );
    }

    Some(Value::Object(call))
}

/// One inline keyboard row per button
fn format_button(button: &Value) -> Option<Value> {
    let text = non_empty_str(button.get("text"))?;
    let button = match non_empty_str(button.get("postback")) {
        Some(url) if url.to_lowercase().starts_with("http") => json!({ "text": text, "url": url }),
        Some(postback) => json!({ "text": text, "callback_data": postback }),
        None => json!({ "text": text, "callback_data": text }),
    };
    Some(json!([button]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{TextBody, TextContent};

    fn text(line: &str) -> OutputMessage {
        OutputMessage::Text {
            platform: "TELEGRAM".to_string(),
            text: TextContent {
                text: TextBody::Line(line.to_string()),
            },
        }
    }

    #[test]
    fn test_split_short_message() {
        assert_eq!(split_message("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_split_prefers_whitespace() {
        assert_eq!(
            split_message("hello world again", 12),
            vec!["hello world ", "again"]
        );
        assert_eq!(split_message("ab\ncd ef", 6), vec!["ab\n", "cd ef"]);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let chunks = split_message("ééééé", 3);
        assert_eq!(chunks.concat(), "ééééé");
        assert!(chunks.iter().all(|c| c.len() <= 3));
    }

    #[test]
    fn test_split_char_wider_than_limit() {
        assert_eq!(split_message("éé", 1), vec!["é", "é"]);
    }

    #[test]
    fn test_long_text_becomes_several_calls() {
        let formatter = TelegramFormatter::new(6);
        assert_eq!(
            formatter.format_message(&text("hello world")),
            Some(json!([
                { "method": "sendMessage", "text": "hello " },
                { "method": "sendMessage", "text": "world" }
            ]))
        );
    }

    #[test]
    fn test_quick_replies_keyboard() {
        let message = OutputMessage::QuickReplies {
            platform: "TELEGRAM".to_string(),
            quick_replies: json!({ "title": "Pick", "quickReplies": ["yes", "no"] }),
        };
        assert_eq!(
            TelegramFormatter::new(4096).format_message(&message),
            Some(json!([{
                "method": "sendMessage",
                "text": "Pick",
                "reply_markup": {
                    "keyboard": [[{ "text": "yes" }], [{ "text": "no" }]],
                    "one_time_keyboard": true,
                    "resize_keyboard": true
                }
            }]))
        );
    }

    #[test]
    fn test_cards_with_buttons() {
        let message = OutputMessage::Cards {
            platform: "TELEGRAM".to_string(),
            cards: vec![
                json!({
                    "title": "Card 1",
                    "subtitle": "sub",
                    "imageUri": "https://example.com/a.png",
                    "buttons": [
                        { "text": "Site", "postback": "https://example.com" },
                        { "text": "Go", "postback": "go" },
                        { "text": "Plain" }
                    ]
                }),
                json!({ "title": "Card 2" }),
                json!({}),
            ],
        };
        assert_eq!(
            TelegramFormatter::new(4096).format_message(&message),
            Some(json!([
                {
                    "method": "sendPhoto",
                    "photo": "https://example.com/a.png",
                    "caption": "Card 1\nsub",
                    "reply_markup": {
                        "inline_keyboard": [
                            [{ "text": "Site", "url": "https://example.com" }],
                            [{ "text": "Go", "callback_data": "go" }],
                            [{ "text": "Plain", "callback_data": "Plain" }]
                        ]
                    }
                },
                { "method": "sendMessage", "text": "Card 2" }
            ]))
        );
    }

    #[test]
    fn test_image_and_payload() {
        let formatter = TelegramFormatter::new(4096);
        let image = OutputMessage::Image {
            platform: "TELEGRAM".to_string(),
            image: json!({ "imageUri": "" }),
        };
        assert_eq!(formatter.format_message(&image), None);

        let payload = OutputMessage::Payload {
            platform: "TELEGRAM".to_string(),
            payload: json!({ "telegram": { "text": "raw" } }),
        };
        assert_eq!(formatter.format_message(&payload), Some(json!({ "text": "raw" })));
    }
}
