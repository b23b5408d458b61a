//! Version sentinel and the text form of references.
//!
//! Adapters that carry references as plain strings write them as
//! `<@{id}@>`. Any text value that starts with `<` is escaped by doubling
//! the `<`, so an escaped text can never be mistaken for a reference and
//! `unescape_text(&escape_text(s)) == s` holds for every `s`.

use std::borrow::Cow;

use crate::record::RecordId;

/// Leading marker of every marshalled stream.
pub const SENTINEL: &str = "@tangle:1@";

/// Lead delimiter of a reference token.
pub const REFERENCE_LEAD: &str = "<@";

/// Trail delimiter of a reference token.
pub const REFERENCE_TRAIL: &str = "@>";

const ESCAPE_CHAR: char = '<';

/// Render a reference as a text token.
pub fn reference_token(id: RecordId) -> String {
    format!("{REFERENCE_LEAD}{id}{REFERENCE_TRAIL}")
}

/// Parse a well-formed reference token, returning `None` for anything else.
pub fn parse_reference_token(text: &str) -> Option<RecordId> {
    let digits = text
        .strip_prefix(REFERENCE_LEAD)?
        .strip_suffix(REFERENCE_TRAIL)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u64>().ok().map(RecordId::new)
}

/// Escape a text value so it cannot collide with a reference token.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if text.starts_with(ESCAPE_CHAR) {
        let mut escaped = String::with_capacity(text.len() + 1);
        escaped.push(ESCAPE_CHAR);
        escaped.push_str(text);
        Cow::Owned(escaped)
    } else {
        Cow::Borrowed(text)
    }
}

/// Reverse [`escape_text`].
pub fn unescape_text(text: &str) -> Cow<'_, str> {
    match text.strip_prefix(ESCAPE_CHAR) {
        Some(rest) => Cow::Owned(rest.to_string()),
        None => Cow::Borrowed(text),
    }
}
