//! The [`TypeResolver`] trait defining how tags map to definitions.
//!
//! The encoder uses it to confirm that every tag it writes can be resolved
//! again, and to look up a class's field contract. The decoder uses it to
//! find the factory for each record.

use tangle_types::{MarshalError, MarshalResult, TypeTag};

use crate::definition::{ClassDef, Definition, FunctionDef, Method};

/// Maps type tags to registered definitions.
///
/// Implementations are read-only during a marshal session and must be
/// shareable across threads.
pub trait TypeResolver: Send + Sync {
    /// Resolve a tag, walking its scope and leaf segments.
    ///
    /// Fails with [`MarshalError::UnresolvableType`] naming the first
    /// segment that could not be found.
    fn resolve(&self, tag: &TypeTag) -> MarshalResult<Definition<'_>>;

    /// Resolve a tag that must name a class.
    fn resolve_class(&self, tag: &TypeTag) -> MarshalResult<&ClassDef> {
        match self.resolve(tag)? {
            Definition::Class(class) => Ok(class),
            Definition::Function(_) => Err(MarshalError::unresolvable(
                tag.as_str(),
                "names a function, not a class",
            )),
        }
    }

    /// Resolve a tag that must name a function.
    fn resolve_function(&self, tag: &TypeTag) -> MarshalResult<&FunctionDef> {
        match self.resolve(tag)? {
            Definition::Function(func) => Ok(func),
            Definition::Class(_) => Err(MarshalError::unresolvable(
                tag.as_str(),
                "names a class, not a function",
            )),
        }
    }

    /// Resolve a bound member of a class.
    fn resolve_member(&self, tag: &TypeTag, selector: &str) -> MarshalResult<Method> {
        self.resolve_class(tag)?.member(selector).ok_or_else(|| {
            MarshalError::unresolvable(
                tag.as_str(),
                format!("no bound member {selector:?} in dispatch table"),
            )
        })
    }
}
