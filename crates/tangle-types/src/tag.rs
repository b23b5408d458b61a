//! Type tag parsing and validation.
//!
//! A tag names a registered class or function by where it lives:
//!
//! ```text
//! scope/path/Leaf.Nested
//! ^^^^^^^^^^ ^^^^^^^^^^^
//! scope path  leaf path
//! ```
//!
//! The scope path is everything before the last `/` and is split on `/`.
//! The leaf path is everything after it and is split on `.` for nested
//! definitions (a class declared inside another class).
//!
//! Valid tags:
//! - Must contain at least one `/` with non-empty text on both sides
//! - Must not contain whitespace, `<`, `>`, `@`, `"`, `'`
//! - Must not contain empty segments (`//`, `..`, leading or trailing `.`)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, MarshalResult};

/// Characters that are forbidden anywhere in a tag.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '<', '>', '@', '"', '\''];

/// Scope used by the built-in collection classes.
pub const BUILTIN_SCOPE: &str = "core";

/// The built-in collection classes, all registered under [`BUILTIN_SCOPE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    List,
    Tuple,
    Map,
    Set,
    FrozenSet,
    Deque,
    DefaultMap,
}

impl Builtin {
    /// Leaf name under the builtin scope.
    pub fn leaf(self) -> &'static str {
        match self {
            Builtin::List => "list",
            Builtin::Tuple => "tuple",
            Builtin::Map => "map",
            Builtin::Set => "set",
            Builtin::FrozenSet => "frozenset",
            Builtin::Deque => "deque",
            Builtin::DefaultMap => "defaultmap",
        }
    }
}

/// Stable, validated name of a class or function.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeTag(String);

impl TypeTag {
    /// Parse and validate a tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use tangle_types::TypeTag;
    ///
    /// assert!(TypeTag::parse("core/list").is_ok());
    /// assert!(TypeTag::parse("app/model/Outer.Inner").is_ok());
    /// assert!(TypeTag::parse("list").is_err());
    /// assert!(TypeTag::parse("app/<lambda>").is_err());
    /// ```
    pub fn parse(tag: &str) -> MarshalResult<Self> {
        validate_tag(tag)?;
        Ok(Self(tag.to_string()))
    }

    /// Build a tag from a scope path and a leaf path.
    pub fn new(scope: &str, leaf: &str) -> MarshalResult<Self> {
        Self::parse(&format!("{scope}/{leaf}"))
    }

    /// Tag of a built-in collection class, e.g. `core/list`.
    pub fn builtin(kind: Builtin) -> Self {
        Self(format!("{BUILTIN_SCOPE}/{}", kind.leaf()))
    }

    /// The full tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last `/`.
    pub fn scope(&self) -> &str {
        self.split().0
    }

    /// Everything after the last `/`.
    pub fn leaf(&self) -> &str {
        self.split().1
    }

    /// The `/`-separated scope segments.
    pub fn scope_segments(&self) -> impl Iterator<Item = &str> {
        self.scope().split('/')
    }

    /// The `.`-separated leaf segments, outermost first.
    pub fn leaf_segments(&self) -> impl Iterator<Item = &str> {
        self.leaf().split('.')
    }

    /// The innermost leaf name.
    pub fn name(&self) -> &str {
        self.leaf().rsplit('.').next().unwrap_or_default()
    }

    fn split(&self) -> (&str, &str) {
        // Validation guarantees a '/' is present.
        self.0.rsplit_once('/').unwrap_or(("", &self.0))
    }
}

fn invalid(tag: &str, reason: impl Into<String>) -> MarshalError {
    MarshalError::InvalidTag {
        tag: tag.to_string(),
        reason: reason.into(),
    }
}

fn validate_tag(tag: &str) -> MarshalResult<()> {
    if tag.is_empty() {
        return Err(invalid(tag, "tag must not be empty"));
    }

    for ch in FORBIDDEN_CHARS {
        if tag.contains(*ch) {
            return Err(invalid(tag, format!("contains forbidden character: {ch:?}")));
        }
    }

    let Some((scope, leaf)) = tag.rsplit_once('/') else {
        return Err(invalid(tag, "missing '/' between scope and leaf"));
    };

    for segment in scope.split('/') {
        if segment.is_empty() {
            return Err(invalid(tag, "scope segments must not be empty"));
        }
    }

    if leaf.contains('/') {
        return Err(invalid(tag, "leaf must not contain '/'"));
    }
    for segment in leaf.split('.') {
        if segment.is_empty() {
            return Err(invalid(tag, "leaf segments must not be empty"));
        }
    }

    Ok(())
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TypeTag {
    type Error = MarshalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_tag(&value)?;
        Ok(Self(value))
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.0
    }
}

impl std::str::FromStr for TypeTag {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_simple_tags() {
        assert!(TypeTag::parse("core/list").is_ok());
        assert!(TypeTag::parse("app/Point").is_ok());
        assert!(TypeTag::parse("my-app/point_2d").is_ok());
    }

    #[test]
    fn valid_nested_tags() {
        let tag = TypeTag::parse("app/model/Outer.Inner").unwrap();
        assert_eq!(tag.scope(), "app/model");
        assert_eq!(tag.leaf(), "Outer.Inner");
        assert_eq!(tag.name(), "Inner");
        assert_eq!(tag.scope_segments().collect::<Vec<_>>(), vec!["app", "model"]);
        assert_eq!(tag.leaf_segments().collect::<Vec<_>>(), vec!["Outer", "Inner"]);
    }

    #[test]
    fn new_joins_scope_and_leaf() {
        let tag = TypeTag::new("geometry", "Polygon").unwrap();
        assert_eq!(tag.as_str(), "geometry/Polygon");
    }

    #[test]
    fn builtin_tags_live_in_core() {
        let tag = TypeTag::builtin(Builtin::Tuple);
        assert_eq!(tag.as_str(), "core/tuple");
        assert_eq!(TypeTag::parse("core/tuple").unwrap(), tag);
    }

    #[test]
    fn every_builtin_tag_is_valid() {
        let all = [
            Builtin::List,
            Builtin::Tuple,
            Builtin::Map,
            Builtin::Set,
            Builtin::FrozenSet,
            Builtin::Deque,
            Builtin::DefaultMap,
        ];
        for kind in all {
            let tag = TypeTag::builtin(kind);
            assert_eq!(TypeTag::parse(tag.as_str()).unwrap(), tag);
            assert_eq!(tag.scope(), BUILTIN_SCOPE);
            assert_eq!(tag.name(), kind.leaf());
        }
    }

    #[test]
    fn reject_empty_tag() {
        assert!(TypeTag::parse("").is_err());
    }

    #[test]
    fn reject_missing_scope() {
        assert!(TypeTag::parse("list").is_err());
        assert!(TypeTag::parse("/list").is_err());
        assert!(TypeTag::parse("core/").is_err());
    }

    #[test]
    fn reject_empty_segments() {
        assert!(TypeTag::parse("a//b").is_err());
        assert!(TypeTag::parse("a/Outer..Inner").is_err());
        assert!(TypeTag::parse("a/.Inner").is_err());
        assert!(TypeTag::parse("a/Outer.").is_err());
    }

    #[test]
    fn reject_forbidden_chars() {
        assert!(TypeTag::parse("a/<lambda>").is_err());
        assert!(TypeTag::parse("a/b c").is_err());
        assert!(TypeTag::parse("a/b@c").is_err());
        assert!(TypeTag::parse("a/\"b\"").is_err());
    }

    #[test]
    fn serde_rejects_invalid_tag() {
        let ok: TypeTag = serde_json::from_str("\"core/map\"").unwrap();
        assert_eq!(ok.as_str(), "core/map");
        assert!(serde_json::from_str::<TypeTag>("\"nope\"").is_err());
    }
}
