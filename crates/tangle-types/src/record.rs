//! The intermediate structure exchanged with format adapters.
//!
//! A marshalled graph is an ordered stream:
//!
//! ```text
//! Sentinel, Record*, Root
//! ```
//!
//! Each [`Record`] stands for one composite. Inside records, composites are
//! never inlined: they appear as [`Encoded::Ref`], which carries only the id
//! of the target record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MarshalError, MarshalResult};
use crate::tag::TypeTag;
use crate::token::SENTINEL;

/// Session-local identifier of a record. Assigned from 1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An encoded value: a scalar, or a reference to a record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Encoded {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Ref(RecordId),
}

/// Items of a record: elements of a sequence or entries of a mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RecordItems {
    Sequence(Vec<Encoded>),
    Mapping(Vec<(Encoded, Encoded)>),
}

impl RecordItems {
    pub fn len(&self) -> usize {
        match self {
            Self::Sequence(v) => v.len(),
            Self::Mapping(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The instance half of a bound callable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundRef {
    /// Record of the receiver instance.
    pub instance: RecordId,
    /// Name of the member to resolve on the receiver.
    pub selector: String,
}

/// Serialized stand-in for one composite value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// Absent only for bound callables.
    pub tag: Option<TypeTag>,
    pub items: Option<RecordItems>,
    pub fields: Option<Vec<(String, Encoded)>>,
    pub bound: Option<BoundRef>,
    pub immutable: bool,
}

impl Record {
    /// A record header carrying only an id and a tag.
    pub fn header(id: RecordId, tag: TypeTag) -> Self {
        Self {
            id,
            tag: Some(tag),
            items: None,
            fields: None,
            bound: None,
            immutable: false,
        }
    }

    /// A bound-callable record.
    pub fn bound(id: RecordId, bound: BoundRef) -> Self {
        Self {
            id,
            tag: None,
            items: None,
            fields: None,
            bound: Some(bound),
            immutable: false,
        }
    }
}

/// One element of the flat marshalled stream.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamItem {
    Sentinel(String),
    Record(Record),
    Root(Encoded),
}

/// A complete marshalled graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Marshalled {
    /// Version sentinel, [`SENTINEL`] for streams written by this crate.
    pub version: String,
    /// Records in first-discovery order.
    pub records: Vec<Record>,
    /// The entry point: a reference for composite roots, else the scalar.
    pub root: Encoded,
}

impl Marshalled {
    /// A stream stamped with the current version sentinel.
    pub fn new(records: Vec<Record>, root: Encoded) -> Self {
        Self {
            version: SENTINEL.to_string(),
            records,
            root,
        }
    }

    /// Fail with [`MarshalError::MalformedInput`] unless the sentinel matches.
    pub fn check_version(&self) -> MarshalResult<()> {
        if self.version != SENTINEL {
            return Err(MarshalError::malformed(format!(
                "unexpected version sentinel {:?}, expected {SENTINEL:?}",
                self.version
            )));
        }
        Ok(())
    }

    /// Flatten into `Sentinel, Record*, Root`.
    pub fn into_stream(self) -> Vec<StreamItem> {
        let mut out = Vec::with_capacity(self.records.len() + 2);
        out.push(StreamItem::Sentinel(self.version));
        out.extend(self.records.into_iter().map(StreamItem::Record));
        out.push(StreamItem::Root(self.root));
        out
    }

    /// Rebuild from a flat stream, rejecting truncated or reordered input.
    pub fn from_stream(items: Vec<StreamItem>) -> MarshalResult<Self> {
        let mut iter = items.into_iter();
        let version = match iter.next() {
            Some(StreamItem::Sentinel(v)) => v,
            Some(_) => return Err(MarshalError::malformed("stream does not start with a sentinel")),
            None => return Err(MarshalError::malformed("empty stream")),
        };

        let mut records = Vec::new();
        let mut root = None;
        for item in iter {
            if root.is_some() {
                return Err(MarshalError::malformed("data after the root"));
            }
            match item {
                StreamItem::Record(r) => records.push(r),
                StreamItem::Root(e) => root = Some(e),
                StreamItem::Sentinel(_) => {
                    return Err(MarshalError::malformed("sentinel inside the stream"))
                }
            }
        }

        let root = root.ok_or_else(|| MarshalError::malformed("truncated stream: missing root"))?;
        let marshalled = Self {
            version,
            records,
            root,
        };
        marshalled.check_version()?;
        Ok(marshalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::Builtin;

    fn sample() -> Marshalled {
        let mut list = Record::header(RecordId::new(1), TypeTag::builtin(Builtin::List));
        list.items = Some(RecordItems::Sequence(vec![
            Encoded::Int(1),
            Encoded::Ref(RecordId::new(1)),
        ]));
        Marshalled::new(vec![list], Encoded::Ref(RecordId::new(1)))
    }

    #[test]
    fn stream_roundtrip() {
        let m = sample();
        let stream = m.clone().into_stream();
        assert_eq!(stream.len(), 3);
        assert!(matches!(stream[0], StreamItem::Sentinel(_)));
        assert!(matches!(stream[2], StreamItem::Root(_)));
        assert_eq!(Marshalled::from_stream(stream).unwrap(), m);
    }

    #[test]
    fn empty_stream_is_malformed() {
        assert!(matches!(
            Marshalled::from_stream(vec![]),
            Err(MarshalError::MalformedInput(_))
        ));
    }

    #[test]
    fn missing_root_is_malformed() {
        let mut stream = sample().into_stream();
        stream.pop();
        assert!(matches!(
            Marshalled::from_stream(stream),
            Err(MarshalError::MalformedInput(_))
        ));
    }

    #[test]
    fn wrong_sentinel_is_malformed() {
        let mut stream = sample().into_stream();
        stream[0] = StreamItem::Sentinel("@other:9@".into());
        assert!(matches!(
            Marshalled::from_stream(stream),
            Err(MarshalError::MalformedInput(_))
        ));
    }

    #[test]
    fn missing_sentinel_is_malformed() {
        let mut stream = sample().into_stream();
        stream.remove(0);
        assert!(Marshalled::from_stream(stream).is_err());
    }

    #[test]
    fn serde_roundtrip_json_and_bincode() {
        let m = sample();
        let json = serde_json::to_string(&m).unwrap();
        let back: Marshalled = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let bytes = bincode::serialize(&m).unwrap();
        let back: Marshalled = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, m);
    }
}
