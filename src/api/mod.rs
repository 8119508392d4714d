//! Request and response payloads for the two chat backends.

use serde::{Deserialize, Serialize};

/// Body posted to a conversation's own query endpoint.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct BackendRequest {
    pub text: String,
    pub enable_semantic_thinking: bool,
    pub stream: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub thought: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

impl GeminiContent {
    pub fn text(role: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![GeminiPart {
                text: Some(text.into()),
                thought: false,
            }],
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

/// One `data:` payload of a `streamGenerateContent?alt=sse` response.
#[derive(Debug, Deserialize)]
pub struct GeminiStreamResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

impl GeminiStreamResponse {
    /// Visible text of the first candidate; thought parts are skipped.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }
}
