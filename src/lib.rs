//! Normalizes conversational-AI fulfillment responses into ordered,
//! platform-tagged messages and renders them for individual channels.

pub mod config;
pub mod message;
pub mod normalize;
pub mod pipeline;
pub mod platform;
pub mod structjson;

pub use message::{MessageKind, OutputMessage};
pub use pipeline::{get_messages, group_messages};
