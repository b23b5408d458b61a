//! Class and function definitions.
//!
//! A [`ClassDef`] is the explicit contract a type offers the marshaller:
//! its shape, whether it is immutable, which fields are serialized, and
//! which members may be referenced through a bound callable.

use std::collections::BTreeMap;
use std::fmt;

use tangle_types::{Fields, Handle, Heap, Items, MarshalError, MarshalResult, TypeTag, Value};

use crate::error::Result;
use crate::resolver::TypeResolver;

/// A member callable through a bound reference.
pub type Method = fn(&dyn TypeResolver, &mut Heap, Handle, &[Value]) -> Result<Value>;

/// A free function callable by tag.
pub type NativeFn = fn(&dyn TypeResolver, &mut Heap, &[Value]) -> Result<Value>;

/// Layout of a class's instances.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Named fields only.
    Fields,
    /// Ordered elements, plus optional fields.
    Sequence,
    /// Key/value entries, plus optional fields.
    Mapping,
}

impl Shape {
    /// Empty items of this shape.
    pub fn empty_items(&self) -> Items {
        match self {
            Self::Fields => Items::None,
            Self::Sequence => Items::Sequence(Vec::new()),
            Self::Mapping => Items::Mapping(Vec::new()),
        }
    }

    /// Returns `true` if `items` has this shape.
    pub fn accepts(&self, items: &Items) -> bool {
        matches!(
            (self, items),
            (Self::Fields, Items::None)
                | (Self::Sequence, Items::Sequence(_))
                | (Self::Mapping, Items::Mapping(_))
        )
    }
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fields => "fields",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A registered class.
#[derive(Clone)]
pub struct ClassDef {
    tag: TypeTag,
    shape: Shape,
    immutable: bool,
    fields: Vec<String>,
    methods: BTreeMap<String, Method>,
}

impl ClassDef {
    /// A mutable class with no serialized fields and no members.
    pub fn new(tag: TypeTag, shape: Shape) -> Self {
        Self {
            tag,
            shape,
            immutable: false,
            fields: Vec::new(),
            methods: BTreeMap::new(),
        }
    }

    /// Mark instances as immutable: built in one step, never mutated.
    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Declare a serialized field.
    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }

    /// Declare several serialized fields, in order.
    pub fn fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(names.into_iter().map(Into::into));
        self
    }

    /// Allow `selector` to be referenced through a bound callable.
    pub fn method(mut self, selector: impl Into<String>, method: Method) -> Self {
        self.methods.insert(selector.into(), method);
        self
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Declared field names, in serialization order.
    pub fn declared_fields(&self) -> &[String] {
        &self.fields
    }

    /// Look up a bound member.
    pub fn member(&self, selector: &str) -> Option<Method> {
        self.methods.get(selector).copied()
    }

    /// The declared fields present on `fields`, in declared order.
    ///
    /// Undeclared fields are transient and never serialized.
    pub fn serialized_fields<'f>(
        &'f self,
        fields: &'f Fields,
    ) -> impl Iterator<Item = (&'f str, &'f Value)> + 'f {
        self.fields
            .iter()
            .filter_map(move |name| fields.get(name).map(|v| (name.as_str(), v)))
    }

    /// Allocate an empty, mutable instance of this class.
    pub fn allocate(&self, heap: &mut Heap) -> MarshalResult<Handle> {
        if self.immutable {
            return Err(MarshalError::unresolvable(
                self.tag.as_str(),
                "immutable classes must be constructed with their contents",
            ));
        }
        Ok(heap.instance(self.tag.clone(), self.shape.empty_items(), Fields::new()))
    }

    /// Construct an instance with its contents in one step.
    ///
    /// Immutable classes produce frozen instances.
    pub fn construct(&self, heap: &mut Heap, items: Items, fields: Fields) -> MarshalResult<Handle> {
        if !self.shape.accepts(&items) {
            return Err(MarshalError::malformed(format!(
                "{} expects {} items",
                self.tag, self.shape
            )));
        }
        Ok(if self.immutable {
            heap.frozen_instance(self.tag.clone(), items, fields)
        } else {
            heap.instance(self.tag.clone(), items, fields)
        })
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("tag", &self.tag)
            .field("shape", &self.shape)
            .field("immutable", &self.immutable)
            .field("fields", &self.fields)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A registered free function.
#[derive(Clone)]
pub struct FunctionDef {
    tag: TypeTag,
    func: NativeFn,
}

impl FunctionDef {
    pub fn new(tag: TypeTag, func: NativeFn) -> Self {
        Self { tag, func }
    }

    pub fn tag(&self) -> &TypeTag {
        &self.tag
    }

    /// Call the function.
    pub fn call(&self, resolver: &dyn TypeResolver, heap: &mut Heap, args: &[Value]) -> Result<Value> {
        (self.func)(resolver, heap, args)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef").field("tag", &self.tag).finish()
    }
}

/// Either kind of registered definition.
#[derive(Clone, Copy, Debug)]
pub enum Definition<'a> {
    Class(&'a ClassDef),
    Function(&'a FunctionDef),
}

impl Definition<'_> {
    pub fn tag(&self) -> &TypeTag {
        match self {
            Self::Class(c) => c.tag(),
            Self::Function(f) => f.tag(),
        }
    }
}
