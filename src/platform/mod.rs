pub mod facebook;
pub mod passthrough;
pub mod telegram;

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::config::{Config, FormatterKind};
use crate::message::OutputMessage;

/// Renders a grouped message into a platform's native payload.
///
/// Returns `None` when the message has nothing the platform can show.
pub trait MessageFormatter: Send + Sync {
    fn format_message(&self, message: &OutputMessage) -> Option<Value>;
}

/// Formatters keyed by lower-cased platform name, with a mandatory default
pub struct FormatterRegistry {
    formatters: HashMap<String, Box<dyn MessageFormatter>>,
    default: Box<dyn MessageFormatter>,
}

impl FormatterRegistry {
    pub fn new(default: Box<dyn MessageFormatter>) -> Self {
        Self {
            formatters: HashMap::new(),
            default,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let build = |kind: FormatterKind| -> Box<dyn MessageFormatter> {
            match kind {
                FormatterKind::Passthrough => Box::new(passthrough::PassthroughFormatter),
                FormatterKind::Facebook => Box::new(facebook::FacebookFormatter),
                FormatterKind::Telegram => Box::new(telegram::TelegramFormatter::new(
                    config.telegram.max_message_len,
                )),
            }
        };

        let mut registry = Self::new(build(config.formatters.default));
        for (platform, kind) in &config.formatters.platforms {
            info!("Registered formatter: {} -> {}", platform, kind);
            registry.register(platform, build(*kind));
        }
        registry
    }

    pub fn register(&mut self, platform: &str, formatter: Box<dyn MessageFormatter>) {
        self.formatters.insert(platform.to_lowercase(), formatter);
    }

    /// Formatter for a platform, falling back to the default
    pub fn formatter_for(&self, platform: &str) -> &dyn MessageFormatter {
        self.formatters
            .get(&platform.to_lowercase())
            .map(|formatter| &**formatter)
            .unwrap_or_else(|| &*self.default)
    }

    pub fn format_message(&self, message: &OutputMessage) -> Option<Value> {
        self.formatter_for(message.platform()).format_message(message)
    }

    /// Format every message, skipping those with nothing to send
    pub fn format_all(&self, messages: &[OutputMessage]) -> Vec<Value> {
        messages
            .iter()
            .filter_map(|message| {
                let formatted = self.format_message(message);
                if formatted.is_none() {
                    debug!(
                        "No {} content for platform '{}'",
                        message.kind(),
                        message.platform()
                    );
                }
                formatted
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{TextBody, TextContent};
    use serde_json::json;

    fn text(platform: &str, line: &str) -> OutputMessage {
        OutputMessage::Text {
            platform: platform.to_string(),
            text: TextContent {
                text: TextBody::Line(line.to_string()),
            },
        }
    }

    #[test]
    fn test_facebook_platform_uses_facebook_formatter() {
        let registry = FormatterRegistry::from_config(&Config::default());
        assert_eq!(
            registry.format_message(&text("FACEBOOK", "foo bar")),
            Some(json!({ "text": "foo bar" }))
        );
    }

    #[test]
    fn test_unknown_platform_falls_back_to_default() {
        let registry = FormatterRegistry::from_config(&Config::default());
        let message = text("SLACK", "foo bar");
        assert_eq!(
            registry.format_message(&message),
            Some(serde_json::to_value(&message).unwrap())
        );
    }

    #[test]
    fn test_register_is_case_insensitive() {
        let mut registry = FormatterRegistry::new(Box::new(passthrough::PassthroughFormatter));
        registry.register("Facebook", Box::new(facebook::FacebookFormatter));
        assert_eq!(
            registry.format_message(&text("facebook", "hi")),
            Some(json!({ "text": "hi" }))
        );
    }

    #[test]
    fn test_format_all_skips_empty_results() {
        let registry = FormatterRegistry::from_config(&Config::default());
        let messages = vec![
            text("FACEBOOK", "hi"),
            OutputMessage::Image {
                platform: "FACEBOOK".to_string(),
                image: json!({}),
            },
        ];
        assert_eq!(registry.format_all(&messages), vec![json!({ "text": "hi" })]);
    }
}
