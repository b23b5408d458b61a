//! Foundation types for Tangle, a marshaller for cyclic object graphs.
//!
//! This crate provides the host-side value graph, the intermediate record
//! structure produced by the encoder, and the shared error taxonomy. Every
//! other Tangle crate depends on `tangle-types`.
//!
//! # Key Types
//!
//! - [`Heap`] — arena holding composite [`Object`]s, addressed by [`Handle`]
//! - [`Value`] — a scalar or a [`Handle`] into the heap
//! - [`TypeTag`] — stable `scope/Leaf` name of a class or function
//! - [`Record`] — serialized stand-in for one composite
//! - [`Encoded`] — a scalar or a reference to a [`RecordId`]
//! - [`Marshalled`] — version sentinel, ordered records, and the root
//! - [`MarshalError`] — the error taxonomy shared by the encoder and decoder

pub mod eq;
pub mod error;
pub mod heap;
pub mod record;
pub mod tag;
pub mod token;

pub use eq::graph_eq;
pub use error::{MarshalError, MarshalResult};
pub use heap::{Fields, Handle, Heap, Items, Object, ObjectKind, Value};
pub use record::{BoundRef, Encoded, Marshalled, Record, RecordId, RecordItems, StreamItem};
pub use tag::{Builtin, TypeTag};
pub use token::{
    escape_text, parse_reference_token, reference_token, unescape_text, SENTINEL,
};
