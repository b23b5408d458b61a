//! The in-process [`TypeRegistry`].
//!
//! Definitions are stored in a tree mirroring their tags: one node per
//! scope segment, then one node per leaf segment, so a nested definition
//! such as `app/Outer.Inner` lives below `app` → `Outer` → `Inner`.
//! Resolution walks that tree segment by segment.

use std::collections::BTreeMap;

use tangle_types::{MarshalError, MarshalResult, TypeTag};
use tracing::debug;

use crate::definition::{ClassDef, Definition, FunctionDef};
use crate::error::{RegistryError, Result};
use crate::resolver::TypeResolver;

#[derive(Clone, Copy, Debug)]
enum Slot {
    Class(usize),
    Function(usize),
}

#[derive(Debug, Default)]
struct MemberNode {
    slot: Option<Slot>,
    nested: BTreeMap<String, MemberNode>,
}

#[derive(Debug, Default)]
struct ScopeNode {
    scopes: BTreeMap<String, ScopeNode>,
    members: BTreeMap<String, MemberNode>,
}

/// Explicit registry of classes and functions, populated ahead of time.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    classes: Vec<ClassDef>,
    functions: Vec<FunctionDef>,
    root: ScopeNode,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in collection classes.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::builtins::register_builtins(&mut registry);
        registry
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.classes.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered tags, sorted.
    pub fn tags(&self) -> Vec<&TypeTag> {
        let mut tags: Vec<&TypeTag> = self
            .classes
            .iter()
            .map(ClassDef::tag)
            .chain(self.functions.iter().map(FunctionDef::tag))
            .collect();
        tags.sort();
        tags
    }

    /// Register a class.
    pub fn register_class(&mut self, class: ClassDef) -> Result<()> {
        let slot = Slot::Class(self.classes.len());
        self.insert(class.tag(), slot)?;
        debug!(tag = %class.tag(), shape = %class.shape(), "registered class");
        self.classes.push(class);
        Ok(())
    }

    /// Register a free function.
    pub fn register_function(&mut self, function: FunctionDef) -> Result<()> {
        let slot = Slot::Function(self.functions.len());
        self.insert(function.tag(), slot)?;
        debug!(tag = %function.tag(), "registered function");
        self.functions.push(function);
        Ok(())
    }

    fn insert(&mut self, tag: &TypeTag, slot: Slot) -> Result<()> {
        let mut scope = &mut self.root;
        for segment in tag.scope_segments() {
            scope = scope.scopes.entry(segment.to_string()).or_default();
        }

        let mut leaves = tag.leaf_segments();
        let first = leaves.next().unwrap_or_default();
        let mut member = scope.members.entry(first.to_string()).or_default();
        for segment in leaves {
            member = member.nested.entry(segment.to_string()).or_default();
        }

        if member.slot.is_some() {
            return Err(RegistryError::DuplicateTag(tag.clone()));
        }
        member.slot = Some(slot);
        Ok(())
    }

    fn lookup(&self, tag: &TypeTag) -> MarshalResult<Slot> {
        let mut scope = &self.root;
        let mut walked: Vec<&str> = Vec::new();
        for segment in tag.scope_segments() {
            walked.push(segment);
            scope = scope.scopes.get(segment).ok_or_else(|| {
                MarshalError::unresolvable(
                    tag.as_str(),
                    format!("scope {} is not registered", walked.join("/")),
                )
            })?;
        }

        let mut leaves = tag.leaf_segments();
        let first = leaves.next().unwrap_or_default();
        let mut member = scope.members.get(first).ok_or_else(|| {
            MarshalError::unresolvable(
                tag.as_str(),
                format!("{first} is not defined in scope {}", tag.scope()),
            )
        })?;
        let mut path = first.to_string();
        for segment in leaves {
            member = member.nested.get(segment).ok_or_else(|| {
                MarshalError::unresolvable(
                    tag.as_str(),
                    format!("{segment} is not defined inside {path}"),
                )
            })?;
            path.push('.');
            path.push_str(segment);
        }

        member.slot.ok_or_else(|| {
            MarshalError::unresolvable(tag.as_str(), format!("{path} is a namespace, not a definition"))
        })
    }
}

impl TypeResolver for TypeRegistry {
    fn resolve(&self, tag: &TypeTag) -> MarshalResult<Definition<'_>> {
        Ok(match self.lookup(tag)? {
            Slot::Class(i) => Definition::Class(&self.classes[i]),
            Slot::Function(i) => Definition::Function(&self.functions[i]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Shape;
    use tangle_types::{Heap, Value};

    fn tag(s: &str) -> TypeTag {
        TypeTag::parse(s).unwrap()
    }

    fn noop(
        _: &dyn TypeResolver,
        _: &mut Heap,
        _: &[Value],
    ) -> crate::Result<Value> {
        Ok(Value::Null)
    }

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::new();
        r.register_class(ClassDef::new(tag("app/model/Outer"), Shape::Fields))
            .unwrap();
        r.register_class(ClassDef::new(tag("app/model/Outer.Inner"), Shape::Fields))
            .unwrap();
        r.register_class(ClassDef::new(tag("app/ns.Deep"), Shape::Sequence))
            .unwrap();
        r.register_function(FunctionDef::new(tag("app/helpers/double"), noop))
            .unwrap();
        r
    }

    #[test]
    fn resolves_top_level_and_nested() {
        let r = registry();
        assert!(matches!(r.resolve(&tag("app/model/Outer")), Ok(Definition::Class(_))));
        let inner = r.resolve_class(&tag("app/model/Outer.Inner")).unwrap();
        assert_eq!(inner.tag().as_str(), "app/model/Outer.Inner");
        assert!(matches!(
            r.resolve(&tag("app/helpers/double")),
            Ok(Definition::Function(_))
        ));
    }

    #[test]
    fn missing_scope_segment_fails() {
        let err = registry().resolve(&tag("app/view/Outer")).unwrap_err();
        match err {
            MarshalError::UnresolvableType { reason, .. } => {
                assert!(reason.contains("app/view"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_nested_segment_fails() {
        let err = registry()
            .resolve(&tag("app/model/Outer.Missing"))
            .unwrap_err();
        match err {
            MarshalError::UnresolvableType { reason, .. } => {
                assert!(reason.contains("Missing"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn namespace_only_nodes_do_not_resolve() {
        // `app/ns` exists only as the parent of `Deep`.
        let err = registry().resolve(&tag("app/ns")).unwrap_err();
        assert!(matches!(err, MarshalError::UnresolvableType { .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = registry();
        let err = r
            .register_class(ClassDef::new(tag("app/model/Outer"), Shape::Mapping))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTag(tag("app/model/Outer")));
    }

    #[test]
    fn kind_mismatch_is_unresolvable() {
        let r = registry();
        assert!(r.resolve_function(&tag("app/model/Outer")).is_err());
        assert!(r.resolve_class(&tag("app/helpers/double")).is_err());
    }

    #[test]
    fn tags_are_sorted() {
        let r = registry();
        let tags: Vec<&str> = r.tags().into_iter().map(TypeTag::as_str).collect();
        assert_eq!(
            tags,
            vec![
                "app/helpers/double",
                "app/model/Outer",
                "app/model/Outer.Inner",
                "app/ns.Deep",
            ]
        );
        assert_eq!(r.len(), 4);
    }
}
