//! High-level SDK for Tangle.
//!
//! One [`Tangle`] holds a type registry and moves object graphs between the
//! heap and every supported format: the in-memory stream, JSON, XML,
//! framed binary, and SQLite rows.

pub mod binary;
pub mod error;
pub mod tangle;

pub use error::{SdkError, SdkResult};
pub use tangle::Tangle;

// Re-export key types
pub use tangle_engine::{EngineConfig, TextPolicy};
pub use tangle_json::JsonOptions;
pub use tangle_registry::{ClassDef, FunctionDef, Shape, TypeRegistry, TypeResolver};
pub use tangle_types::{graph_eq, Handle, Heap, MarshalError, Marshalled, TypeTag, Value};
