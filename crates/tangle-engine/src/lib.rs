//! Encoding and decoding of cyclic object graphs.
//!
//! The encoder flattens a [`Heap`](tangle_types::Heap) graph into a
//! [`Marshalled`](tangle_types::Marshalled) stream of records. The decoder
//! rebuilds an equivalent graph, preserving sharing and cycles. Both consult
//! a [`TypeResolver`](tangle_registry::TypeResolver) for class contracts.
//!
//! # Key Types
//!
//! - [`encode`] / [`Encoder`] — graph to records, with deferred population
//! - [`decode`] — records to graph, in two phases
//! - [`IdentityTracker`] — handle to record-id table for one session
//! - [`EngineConfig`] — sentinel and [`TextPolicy`] for a session

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod identity;

pub use config::{EngineConfig, TextPolicy};
pub use decoder::decode;
pub use encoder::{encode, Encoder};
pub use identity::IdentityTracker;
