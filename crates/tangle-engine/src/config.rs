//! Session configuration.

use serde::{Deserialize, Serialize};
use tangle_types::{escape_text, unescape_text, SENTINEL};

/// How text values are treated on their way into and out of records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPolicy {
    /// Text passes through unchanged. For formats where text and references
    /// are structurally distinct.
    #[default]
    Verbatim,
    /// Text starting with `<` is escaped so it cannot be read back as a
    /// reference token. For formats that write references as strings.
    EscapeReferenceTokens,
}

/// Configuration for one encode or decode session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Treatment of text values.
    pub text_policy: TextPolicy,
    /// Sentinel written at the head of the stream and required on decode.
    pub version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            text_policy: TextPolicy::Verbatim,
            version: SENTINEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Configuration for adapters that carry references as text tokens.
    pub fn for_text_adapter() -> Self {
        Self {
            text_policy: TextPolicy::EscapeReferenceTokens,
            ..Default::default()
        }
    }

    /// Apply the text policy to an outgoing text value.
    pub fn encode_text(&self, text: &str) -> String {
        match self.text_policy {
            TextPolicy::Verbatim => text.to_string(),
            TextPolicy::EscapeReferenceTokens => escape_text(text).into_owned(),
        }
    }

    /// Reverse [`EngineConfig::encode_text`] on an incoming text value.
    pub fn decode_text(&self, text: &str) -> String {
        match self.text_policy {
            TextPolicy::Verbatim => text.to_string(),
            TextPolicy::EscapeReferenceTokens => unescape_text(text).into_owned(),
        }
    }
}
