use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::message::Message;
use crate::utils::ids::{new_id, now_millis};

/// The query interface a conversation is bound to when it is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    Semantic,
    Bss30,
    Api,
}

impl InterfaceType {
    pub const ALL: [InterfaceType; 3] =
        [InterfaceType::Semantic, InterfaceType::Bss30, InterfaceType::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceType::Semantic => "semantic",
            InterfaceType::Bss30 => "bss30",
            InterfaceType::Api => "api",
        }
    }

    /// Only the semantic interface understands the semantic-thinking switch.
    pub fn supports_semantic_thinking(self) -> bool {
        self == InterfaceType::Semantic
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InterfaceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        InterfaceType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                format!("unknown interface '{value}' (expected one of: semantic, bss30, api)")
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub updated_at: i64,
    pub interface_type: InterfaceType,
    pub backend_url: String,
}

impl ChatSession {
    pub fn new(interface_type: InterfaceType, backend_url: String, name: &str) -> Self {
        Self {
            id: new_id(),
            title: format!("{name} chat"),
            messages: Vec::new(),
            updated_at: now_millis(),
            interface_type,
            backend_url,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }

    pub fn message_mut(&mut self, message_id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == message_id)
    }

    /// The flag actually sent to the backend for this conversation.
    pub fn effective_semantic_thinking(&self, requested: bool) -> bool {
        requested && self.interface_type.supports_semantic_thinking()
    }
}
