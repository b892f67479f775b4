use serde_json::Value;
use tracing::warn;

use super::MessageFormatter;
use crate::message::OutputMessage;

/// Default formatter: hands the grouped message on unchanged
pub struct PassthroughFormatter;

impl MessageFormatter for PassthroughFormatter {
    fn format_message(&self, message: &OutputMessage) -> Option<Value> {
        match serde_json::to_value(message) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to serialize {} message: {}", message.kind(), e);
                None
            }
        }
    }
}
