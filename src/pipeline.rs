use serde_json::Value;
use tracing::debug;

use crate::message::{
    same_platform, FulfillmentResponse, MessageKind, NormalizedMessage, OutputMessage,
    RawMessage, UNSPECIFIED_PLATFORM,
};
use crate::normalize::normalize;

/// Turn a raw backend response into an ordered list of typed messages.
///
/// Embedded wire-format structs are decoded first, then the fulfillment
/// section is grouped with [`group_messages`]. The input is not modified.
pub fn get_messages(response: &Value, platform_filter: Option<&str>) -> Vec<OutputMessage> {
    let normalized = normalize(response);
    match FulfillmentResponse::from_value(&normalized) {
        Some(fulfillment) => group_messages(fulfillment, platform_filter),
        None => {
            debug!("Response has no fulfillment section");
            Vec::new()
        }
    }
}

/// Filter, resolve, and group the messages of a fulfillment.
///
/// Consecutive card messages of one platform are collapsed into a single
/// [`OutputMessage::Cards`] emitted where the run ends. Every other message
/// keeps its relative position. Messages without content, and text messages
/// with empty text, are dropped.
pub fn group_messages(
    response: FulfillmentResponse,
    platform_filter: Option<&str>,
) -> Vec<OutputMessage> {
    if response.is_empty() {
        debug!("Fulfillment has neither text nor messages");
        return Vec::new();
    }

    let filter = platform_filter.filter(|p| !p.is_empty());
    let messages = filter_by_platform(effective_messages(response, filter), filter);

    let mut pending = PendingCards::default();
    let mut output = Vec::new();
    let last = messages.len().saturating_sub(1);

    for (idx, raw) in messages.into_iter().enumerate() {
        match NormalizedMessage::from_raw(raw) {
            Some(NormalizedMessage {
                platform,
                kind: MessageKind::Card,
                content,
            }) => {
                // Another platform's run ends here
                if pending.has_other_than(&platform) {
                    pending.flush_into(&mut output);
                }
                pending.push(platform, content);
                if idx == last {
                    pending.flush_into(&mut output);
                }
            }
            Some(message) => {
                pending.flush_into(&mut output);
                let kind = message.kind;
                match OutputMessage::from_normalized(message) {
                    Some(out) => output.push(out),
                    None => debug!("Dropping empty {} message at {}", kind, idx),
                }
            }
            None => {
                pending.flush_into(&mut output);
                debug!("Dropping message without content at {}", idx);
            }
        }
    }

    output
}

/// The response's messages, or a single text message built from the
/// fallback text when there are none.
fn effective_messages(response: FulfillmentResponse, filter: Option<&str>) -> Vec<RawMessage> {
    let messages = response.messages.unwrap_or_default();
    if !messages.is_empty() {
        return messages;
    }

    match response.text.as_deref() {
        Some(text) if !text.is_empty() => {
            vec![RawMessage::text(text, filter.unwrap_or(UNSPECIFIED_PLATFORM))]
        }
        _ => Vec::new(),
    }
}

/// Keep messages for `filter` only. When nothing matches, fall back to the
/// unspecified-platform messages, re-tagged with the filter.
fn filter_by_platform(messages: Vec<RawMessage>, filter: Option<&str>) -> Vec<RawMessage> {
    let Some(filter) = filter else {
        return messages;
    };

    if messages.is_empty() || messages.iter().any(|m| m.matches_platform(filter)) {
        return messages
            .into_iter()
            .filter(|m| m.matches_platform(filter))
            .collect();
    }

    debug!(
        "No messages for platform {}, falling back to unspecified platform",
        filter
    );
    messages
        .into_iter()
        .filter(RawMessage::is_unspecified_platform)
        .map(|mut m| {
            m.set_platform(filter);
            m
        })
        .collect()
}

/// Cards waiting to be emitted, per platform, in first-seen order.
/// A group keeps the platform spelling of its first card.
#[derive(Debug, Default)]
struct PendingCards {
    groups: Vec<(String, Vec<Value>)>,
}

impl PendingCards {
    fn push(&mut self, platform: String, card: Value) {
        match self.groups.iter_mut().find(|(p, _)| same_platform(p, &platform)) {
            Some((_, cards)) => cards.push(card),
            None => self.groups.push((platform, vec![card])),
        }
    }

    fn has_other_than(&self, platform: &str) -> bool {
        self.groups
            .iter()
            .any(|(p, cards)| !same_platform(p, platform) && !cards.is_empty())
    }

    /// Emit one cards message per platform with pending cards, then clear.
    fn flush_into(&mut self, output: &mut Vec<OutputMessage>) {
        for (platform, cards) in self.groups.drain(..) {
            if !cards.is_empty() {
                output.push(OutputMessage::Cards { platform, cards });
            }
        }
    }
}
