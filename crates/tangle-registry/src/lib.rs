//! Type resolution for the tangle marshaller.
//!
//! Every composite carries a [`TypeTag`](tangle_types::TypeTag). This crate
//! maps tags to explicit definitions registered ahead of time: classes with
//! a declared shape, field list and dispatch table, and free functions.
//! Nothing is discovered reflectively.
//!
//! # Key Types
//!
//! - [`TypeResolver`] — Trait mapping tags to definitions
//! - [`TypeRegistry`] — In-process resolver backed by a scope tree
//! - [`ClassDef`] / [`FunctionDef`] — Registered definitions
//! - [`invoke`] — Call a function, class or bound member stored in a heap

mod builtins;
pub mod definition;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod resolver;

pub use definition::{ClassDef, Definition, FunctionDef, Method, NativeFn, Shape};
pub use error::{expect_args, RegistryError, Result};
pub use invoke::{instantiate, invoke};
pub use registry::TypeRegistry;
pub use resolver::TypeResolver;
