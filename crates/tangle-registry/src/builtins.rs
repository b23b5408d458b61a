//! Built-in collection classes under the `core` scope.
//!
//! # Classes
//!
//! | Tag               | Shape    | Immutable | Members                              |
//! |-------------------|----------|-----------|--------------------------------------|
//! | `core/list`       | sequence | no        | `append`, `len`                      |
//! | `core/tuple`      | sequence | yes       | `len`                                |
//! | `core/map`        | mapping  | no        | `get`, `len`                         |
//! | `core/set`        | sequence | no        | `add`, `len`                         |
//! | `core/frozenset`  | sequence | yes       | `len`                                |
//! | `core/deque`      | sequence | no        | `append`, `appendleft`, `pop`, `popleft`, `len` |
//! | `core/defaultmap` | mapping  | no        | `get`, `len`                         |
//!
//! `core/defaultmap` serializes a `default_factory` field. Its `get` member
//! calls the factory and stores the result when the key is missing.

use tangle_types::{Builtin, Handle, Heap, Items, TypeTag, Value};

use crate::definition::{ClassDef, Shape};
use crate::error::{expect_args, RegistryError, Result};
use crate::invoke::invoke;
use crate::registry::TypeRegistry;
use crate::resolver::TypeResolver;

/// Register every built-in class. Called once on a fresh registry.
pub(crate) fn register_builtins(registry: &mut TypeRegistry) {
    let classes = [
        ClassDef::new(TypeTag::builtin(Builtin::List), Shape::Sequence)
            .method("append", append)
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::Tuple), Shape::Sequence)
            .immutable()
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::Map), Shape::Mapping)
            .method("get", map_get)
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::Set), Shape::Sequence)
            .method("add", set_add)
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::FrozenSet), Shape::Sequence)
            .immutable()
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::Deque), Shape::Sequence)
            .method("append", append)
            .method("appendleft", append_left)
            .method("pop", pop)
            .method("popleft", pop_left)
            .method("len", len),
        ClassDef::new(TypeTag::builtin(Builtin::DefaultMap), Shape::Mapping)
            .field("default_factory")
            .method("get", default_get)
            .method("len", len),
    ];
    for class in classes {
        // Builtins go into an empty registry, so tags cannot collide.
        if let Err(e) = registry.register_class(class) {
            tracing::warn!(error = %e, "skipping builtin");
        }
    }
}

fn len(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("len", args, 0)?;
    let object = heap.get(this)?;
    let count = object.items().map(Items::len).unwrap_or(0);
    Ok(Value::Int(count as i64))
}

fn append(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("append", args, 1)?;
    heap.push(this, args[0].clone())?;
    Ok(Value::Null)
}

fn append_left(
    _: &dyn TypeResolver,
    heap: &mut Heap,
    this: Handle,
    args: &[Value],
) -> Result<Value> {
    expect_args("appendleft", args, 1)?;
    heap.insert_at(this, 0, args[0].clone())?;
    Ok(Value::Null)
}

fn pop(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("pop", args, 0)?;
    let last = heap.sequence(this)?.len().checked_sub(1).ok_or_else(|| empty("pop"))?;
    Ok(heap.remove_at(this, last)?)
}

fn pop_left(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("popleft", args, 0)?;
    if heap.sequence(this)?.is_empty() {
        return Err(empty("popleft"));
    }
    Ok(heap.remove_at(this, 0)?)
}

fn set_add(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("add", args, 1)?;
    if !heap.sequence(this)?.contains(&args[0]) {
        heap.push(this, args[0].clone())?;
    }
    Ok(Value::Null)
}

fn map_get(_: &dyn TypeResolver, heap: &mut Heap, this: Handle, args: &[Value]) -> Result<Value> {
    expect_args("get", args, 1)?;
    Ok(heap.lookup(this, &args[0])?.cloned().unwrap_or(Value::Null))
}

fn default_get(
    resolver: &dyn TypeResolver,
    heap: &mut Heap,
    this: Handle,
    args: &[Value],
) -> Result<Value> {
    expect_args("get", args, 1)?;
    if let Some(found) = heap.lookup(this, &args[0])? {
        return Ok(found.clone());
    }
    let factory = match heap.field(this, "default_factory")? {
        Some(Value::Ref(factory)) => *factory,
        _ => {
            return Err(RegistryError::CallFailed {
                callee: "get".into(),
                reason: "key missing and no default_factory set".into(),
            })
        }
    };
    let made = invoke(resolver, heap, factory, &[])?;
    heap.insert(this, args[0].clone(), made.clone())?;
    Ok(made)
}

fn empty(callee: &str) -> RegistryError {
    RegistryError::CallFailed {
        callee: callee.to_string(),
        reason: "sequence is empty".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::Fields;

    fn call(r: &TypeRegistry, heap: &mut Heap, this: Handle, selector: &str, args: &[Value]) -> Result<Value> {
        let tag = heap.get(this).unwrap().tag.clone();
        let method = r.resolve_member(&tag, selector)?;
        method(r, heap, this, args)
    }

    #[test]
    fn builtins_are_registered() {
        let r = TypeRegistry::with_builtins();
        assert_eq!(r.len(), 7);
        assert!(r.resolve_class(&TypeTag::builtin(Builtin::Tuple)).unwrap().is_immutable());
        assert!(!r.resolve_class(&TypeTag::builtin(Builtin::List)).unwrap().is_immutable());
        assert_eq!(
            r.resolve_class(&TypeTag::builtin(Builtin::DefaultMap)).unwrap().declared_fields(),
            &["default_factory".to_string()]
        );
    }

    #[test]
    fn deque_members() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let d = heap.deque(vec![Value::Int(2)]);
        call(&r, &mut heap, d, "appendleft", &[Value::Int(1)]).unwrap();
        call(&r, &mut heap, d, "append", &[Value::Int(3)]).unwrap();
        assert_eq!(call(&r, &mut heap, d, "len", &[]).unwrap(), Value::Int(3));
        assert_eq!(call(&r, &mut heap, d, "popleft", &[]).unwrap(), Value::Int(1));
        assert_eq!(call(&r, &mut heap, d, "pop", &[]).unwrap(), Value::Int(3));
        call(&r, &mut heap, d, "pop", &[]).unwrap();
        assert!(matches!(
            call(&r, &mut heap, d, "popleft", &[]),
            Err(RegistryError::CallFailed { .. })
        ));
    }

    #[test]
    fn set_add_ignores_duplicates() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let s = heap.set(vec![Value::Int(1)]);
        call(&r, &mut heap, s, "add", &[Value::Int(1)]).unwrap();
        call(&r, &mut heap, s, "add", &[Value::Int(2)]).unwrap();
        assert_eq!(heap.sequence(s).unwrap(), &[Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn tuple_has_no_append() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let t = heap.tuple(vec![]);
        assert!(call(&r, &mut heap, t, "append", &[Value::Null]).is_err());
    }

    #[test]
    fn defaultmap_fills_missing_keys() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let factory = heap.class_ref(TypeTag::builtin(Builtin::List));
        let mut fields = Fields::new();
        fields.set("default_factory", Value::Ref(factory));
        let dm = heap.instance(TypeTag::builtin(Builtin::DefaultMap), Items::Mapping(vec![]), fields);

        let made = call(&r, &mut heap, dm, "get", &["k".into()]).unwrap();
        let list = made.handle().unwrap();
        assert!(heap.sequence(list).unwrap().is_empty());
        assert_eq!(heap.entries(dm).unwrap().len(), 1);

        // Second lookup returns the stored object rather than a new one.
        let again = call(&r, &mut heap, dm, "get", &["k".into()]).unwrap();
        assert_eq!(again, made);
    }

    #[test]
    fn defaultmap_without_factory_fails() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let dm = heap.instance(
            TypeTag::builtin(Builtin::DefaultMap),
            Items::Mapping(vec![]),
            Fields::new(),
        );
        assert!(call(&r, &mut heap, dm, "get", &["k".into()]).is_err());
    }
}
