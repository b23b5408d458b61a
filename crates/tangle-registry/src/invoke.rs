//! Calling resolved callables.
//!
//! A decoded graph may hold functions, classes, and bound members as
//! values. [`invoke`] dispatches them through a [`TypeResolver`], which is
//! how a caller uses a reconstructed callable.

use tangle_types::{Fields, Handle, Heap, Items, MarshalResult, ObjectKind, TypeTag, Value};
use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::resolver::TypeResolver;

/// Call the callable stored at `callee`.
///
/// - A function runs its native body.
/// - A class creates an instance: mutable classes start empty, immutable
///   classes take the arguments as their sequence items.
/// - A bound member runs the method against its receiver.
pub fn invoke(
    resolver: &dyn TypeResolver,
    heap: &mut Heap,
    callee: Handle,
    args: &[Value],
) -> Result<Value> {
    let object = heap.get(callee)?;
    let tag = object.tag.clone();
    let target = match &object.kind {
        ObjectKind::Function => Target::Function,
        ObjectKind::Class => Target::Class,
        ObjectKind::Bound { receiver, selector } => Target::Bound(*receiver, selector.clone()),
        _ => return Err(RegistryError::NotCallable(object.type_name())),
    };

    match target {
        Target::Function => {
            let function = resolver.resolve_function(&tag)?;
            function.call(resolver, heap, args)
        }
        Target::Class => Ok(Value::Ref(instantiate(resolver, heap, &tag, args)?)),
        Target::Bound(receiver, selector) => {
            let receiver_tag = heap.get(receiver)?.tag.clone();
            let method = resolver.resolve_member(&receiver_tag, &selector)?;
            debug!(receiver = %receiver, selector = %selector, "invoking bound member");
            method(resolver, heap, receiver, args)
        }
    }
}

enum Target {
    Function,
    Class,
    Bound(Handle, String),
}

/// Create an instance of the class named by `tag`.
pub fn instantiate(
    resolver: &dyn TypeResolver,
    heap: &mut Heap,
    tag: &TypeTag,
    args: &[Value],
) -> MarshalResult<Handle> {
    let class = resolver.resolve_class(tag)?;
    if class.is_immutable() {
        let items = match class.shape().empty_items() {
            Items::Sequence(_) => Items::Sequence(args.to_vec()),
            other => other,
        };
        return class.construct(heap, items, Fields::new());
    }
    class.allocate(heap)
}
