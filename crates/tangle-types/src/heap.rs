//! The host-side object graph.
//!
//! Composite values live in a [`Heap`] arena and are addressed by
//! [`Handle`]. A handle is the identity of a composite: two values are "the
//! same object" exactly when they hold the same handle. Scalars are carried
//! inline in [`Value`] and have no identity.
//!
//! Cycles and sharing are expressed by storing the same handle in several
//! places, including inside the object itself.

use std::fmt;

use crate::error::{MarshalError, MarshalResult};
use crate::tag::{Builtin, TypeTag};

/// Stable identity of a composite stored in a [`Heap`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    /// Position of the object in its heap.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value in the object graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// A composite stored in the heap.
    Ref(Handle),
}

impl Value {
    /// The handle, if this value is a composite.
    pub fn handle(&self) -> Option<Handle> {
        match self {
            Self::Ref(h) => Some(*h),
            _ => None,
        }
    }

    /// The integer, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Handle> for Value {
    fn from(h: Handle) -> Self {
        Self::Ref(h)
    }
}

/// Contents of an items-bearing composite.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Items {
    /// Plain field-bearing object.
    #[default]
    None,
    Sequence(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
}

impl Items {
    /// Number of elements or entries.
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Sequence(v) => v.len(),
            Self::Mapping(m) => m.len(),
        }
    }

    /// Returns `true` if there are no elements or entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named attributes of an instance, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (name, value) in iter {
            fields.set(name, value);
        }
        fields
    }
}

/// What kind of composite an [`Object`] is.
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectKind {
    /// An instance of a registered class.
    Instance { items: Items, fields: Fields },
    /// A registered class used as a value.
    Class,
    /// A registered free function used as a value.
    Function,
    /// A callable bound to a particular instance.
    Bound { receiver: Handle, selector: String },
    /// An anonymous or locally scoped callable. Never marshallable.
    Closure {
        name: Option<String>,
        captures: Vec<Value>,
    },
    /// A partially consumed iteration. Never marshallable.
    Iterator { source: Handle, position: usize },
    /// A value with a host layout the engine cannot describe.
    Foreign { layout: String },
}

/// A composite value stored in a [`Heap`].
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub tag: TypeTag,
    pub kind: ObjectKind,
    /// Immutable composites are created with their contents and never change.
    pub frozen: bool,
}

impl Object {
    /// Human-readable category used in error messages.
    pub fn type_name(&self) -> String {
        match &self.kind {
            ObjectKind::Instance { .. } | ObjectKind::Class | ObjectKind::Function => {
                self.tag.to_string()
            }
            ObjectKind::Bound { selector, .. } => format!("bound method {selector}"),
            ObjectKind::Closure { name: None, .. } => "anonymous function".into(),
            ObjectKind::Closure { name: Some(name), captures } if captures.is_empty() => {
                format!("local function {name}")
            }
            ObjectKind::Closure { name: Some(name), .. } => format!("closure {name}"),
            ObjectKind::Iterator { .. } => "iterator".into(),
            ObjectKind::Foreign { layout } => format!("foreign object ({layout})"),
        }
    }

    /// Items of an instance, `None` for other kinds.
    pub fn items(&self) -> Option<&Items> {
        match &self.kind {
            ObjectKind::Instance { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Fields of an instance, `None` for other kinds.
    pub fn fields(&self) -> Option<&Fields> {
        match &self.kind {
            ObjectKind::Instance { fields, .. } => Some(fields),
            _ => None,
        }
    }
}

/// Arena of composite values.
#[derive(Clone, Debug, Default)]
pub struct Heap {
    objects: Vec<Object>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the heap.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Store an object and return its handle.
    pub fn alloc(&mut self, object: Object) -> Handle {
        self.objects.push(object);
        Handle(self.objects.len() - 1)
    }

    pub fn get(&self, handle: Handle) -> MarshalResult<&Object> {
        self.objects
            .get(handle.0)
            .ok_or(MarshalError::DanglingHandle(handle))
    }

    // ---------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------

    /// A mutable instance with the given contents.
    pub fn instance(&mut self, tag: TypeTag, items: Items, fields: Fields) -> Handle {
        self.alloc(Object {
            tag,
            kind: ObjectKind::Instance { items, fields },
            frozen: false,
        })
    }

    /// An immutable instance. Its contents are fixed from this point on.
    pub fn frozen_instance(&mut self, tag: TypeTag, items: Items, fields: Fields) -> Handle {
        self.alloc(Object {
            tag,
            kind: ObjectKind::Instance { items, fields },
            frozen: true,
        })
    }

    /// A field-bearing object with no items.
    pub fn object(&mut self, tag: TypeTag) -> Handle {
        self.instance(tag, Items::None, Fields::new())
    }

    pub fn list(&mut self, values: Vec<Value>) -> Handle {
        self.instance(TypeTag::builtin(Builtin::List), Items::Sequence(values), Fields::new())
    }

    pub fn tuple(&mut self, values: Vec<Value>) -> Handle {
        self.frozen_instance(
            TypeTag::builtin(Builtin::Tuple),
            Items::Sequence(values),
            Fields::new(),
        )
    }

    pub fn map(&mut self, entries: Vec<(Value, Value)>) -> Handle {
        self.instance(TypeTag::builtin(Builtin::Map), Items::Mapping(entries), Fields::new())
    }

    pub fn set(&mut self, values: Vec<Value>) -> Handle {
        self.instance(TypeTag::builtin(Builtin::Set), Items::Sequence(values), Fields::new())
    }

    pub fn frozenset(&mut self, values: Vec<Value>) -> Handle {
        self.frozen_instance(
            TypeTag::builtin(Builtin::FrozenSet),
            Items::Sequence(values),
            Fields::new(),
        )
    }

    pub fn deque(&mut self, values: Vec<Value>) -> Handle {
        self.instance(TypeTag::builtin(Builtin::Deque), Items::Sequence(values), Fields::new())
    }

    /// A class used as a value.
    pub fn class_ref(&mut self, tag: TypeTag) -> Handle {
        self.alloc(Object {
            tag,
            kind: ObjectKind::Class,
            frozen: true,
        })
    }

    /// A registered function used as a value.
    pub fn function_ref(&mut self, tag: TypeTag) -> Handle {
        self.alloc(Object {
            tag,
            kind: ObjectKind::Function,
            frozen: true,
        })
    }

    /// A callable bound to `receiver`, named by `selector`.
    pub fn bound(&mut self, receiver: Handle, selector: impl Into<String>) -> MarshalResult<Handle> {
        let tag = self.get(receiver)?.tag.clone();
        Ok(self.alloc(Object {
            tag,
            kind: ObjectKind::Bound {
                receiver,
                selector: selector.into(),
            },
            frozen: true,
        }))
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    fn instance_mut(&mut self, handle: Handle) -> MarshalResult<(&mut Items, &mut Fields)> {
        let object = self
            .objects
            .get_mut(handle.0)
            .ok_or(MarshalError::DanglingHandle(handle))?;
        if object.frozen {
            return Err(MarshalError::Frozen(handle));
        }
        match &mut object.kind {
            ObjectKind::Instance { items, fields } => Ok((items, fields)),
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "instance",
            }),
        }
    }

    /// Append an element to a sequence.
    pub fn push(&mut self, handle: Handle, value: Value) -> MarshalResult<()> {
        match self.instance_mut(handle)? {
            (Items::Sequence(values), _) => {
                values.push(value);
                Ok(())
            }
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "sequence",
            }),
        }
    }

    /// Append several elements to a sequence.
    pub fn extend(&mut self, handle: Handle, new: Vec<Value>) -> MarshalResult<()> {
        match self.instance_mut(handle)? {
            (Items::Sequence(values), _) => {
                values.extend(new);
                Ok(())
            }
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "sequence",
            }),
        }
    }

    /// Insert an element into a sequence at `index`.
    pub fn insert_at(&mut self, handle: Handle, index: usize, value: Value) -> MarshalResult<()> {
        match self.instance_mut(handle)? {
            (Items::Sequence(values), _) if index <= values.len() => {
                values.insert(index, value);
                Ok(())
            }
            (Items::Sequence(values), _) => Err(MarshalError::malformed(format!(
                "index {index} out of range for sequence of length {}",
                values.len()
            ))),
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "sequence",
            }),
        }
    }

    /// Remove and return the element of a sequence at `index`.
    pub fn remove_at(&mut self, handle: Handle, index: usize) -> MarshalResult<Value> {
        match self.instance_mut(handle)? {
            (Items::Sequence(values), _) if index < values.len() => Ok(values.remove(index)),
            (Items::Sequence(values), _) => Err(MarshalError::malformed(format!(
                "index {index} out of range for sequence of length {}",
                values.len()
            ))),
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "sequence",
            }),
        }
    }

    /// Insert an entry into a mapping, appending it after existing entries.
    pub fn insert(&mut self, handle: Handle, key: Value, value: Value) -> MarshalResult<()> {
        match self.instance_mut(handle)? {
            (Items::Mapping(entries), _) => {
                entries.push((key, value));
                Ok(())
            }
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "mapping",
            }),
        }
    }

    /// Set a named attribute on an instance.
    pub fn set_field(
        &mut self,
        handle: Handle,
        name: impl Into<String>,
        value: Value,
    ) -> MarshalResult<()> {
        let (_, fields) = self.instance_mut(handle)?;
        fields.set(name, value);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Inspection
    // ---------------------------------------------------------------

    /// Elements of a sequence.
    pub fn sequence(&self, handle: Handle) -> MarshalResult<&[Value]> {
        match self.get(handle)?.items() {
            Some(Items::Sequence(values)) => Ok(values),
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "sequence",
            }),
        }
    }

    /// Entries of a mapping.
    pub fn entries(&self, handle: Handle) -> MarshalResult<&[(Value, Value)]> {
        match self.get(handle)?.items() {
            Some(Items::Mapping(entries)) => Ok(entries),
            _ => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "mapping",
            }),
        }
    }

    /// The value stored under `key` in a mapping.
    pub fn lookup(&self, handle: Handle, key: &Value) -> MarshalResult<Option<&Value>> {
        Ok(self
            .entries(handle)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v))
    }

    /// A named attribute of an instance.
    pub fn field(&self, handle: Handle, name: &str) -> MarshalResult<Option<&Value>> {
        match self.get(handle)?.fields() {
            Some(fields) => Ok(fields.get(name)),
            None => Err(MarshalError::ShapeMismatch {
                handle,
                expected: "instance",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_sequential_handles() {
        let mut heap = Heap::new();
        let a = heap.list(vec![]);
        let b = heap.list(vec![]);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn self_cycle_through_push() {
        let mut heap = Heap::new();
        let a = heap.list(vec![1.into(), 2.into()]);
        heap.push(a, Value::Ref(a)).unwrap();
        assert_eq!(heap.sequence(a).unwrap()[2], Value::Ref(a));
    }

    #[test]
    fn frozen_rejects_mutation() {
        let mut heap = Heap::new();
        let t = heap.tuple(vec!["x".into()]);
        assert_eq!(heap.push(t, Value::Null), Err(MarshalError::Frozen(t)));
        assert_eq!(heap.set_field(t, "a", Value::Null), Err(MarshalError::Frozen(t)));
    }

    #[test]
    fn shape_mismatch_on_wrong_container() {
        let mut heap = Heap::new();
        let m = heap.map(vec![]);
        assert!(matches!(
            heap.push(m, Value::Null),
            Err(MarshalError::ShapeMismatch { expected: "sequence", .. })
        ));
        let l = heap.list(vec![]);
        assert!(matches!(
            heap.insert(l, Value::Null, Value::Null),
            Err(MarshalError::ShapeMismatch { expected: "mapping", .. })
        ));
    }

    #[test]
    fn positional_sequence_edits() {
        let mut heap = Heap::new();
        let d = heap.deque(vec![2.into()]);
        heap.insert_at(d, 0, 1.into()).unwrap();
        assert_eq!(heap.sequence(d).unwrap(), &[Value::Int(1), Value::Int(2)]);
        assert_eq!(heap.remove_at(d, 0).unwrap(), Value::Int(1));
        assert!(heap.remove_at(d, 5).is_err());
        assert!(heap.insert_at(d, 9, Value::Null).is_err());
    }

    #[test]
    fn mapping_lookup_by_key() {
        let mut heap = Heap::new();
        let m = heap.map(vec![("a".into(), 1.into())]);
        assert_eq!(heap.lookup(m, &"a".into()).unwrap(), Some(&Value::Int(1)));
        assert_eq!(heap.lookup(m, &"b".into()).unwrap(), None);
    }

    #[test]
    fn fields_replace_in_place() {
        let mut heap = Heap::new();
        let o = heap.object(TypeTag::parse("app/Point").unwrap());
        heap.set_field(o, "x", 1.into()).unwrap();
        heap.set_field(o, "y", 2.into()).unwrap();
        heap.set_field(o, "x", 3.into()).unwrap();
        let fields = heap.get(o).unwrap().fields().unwrap();
        let names: Vec<&str> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert_eq!(heap.field(o, "x").unwrap(), Some(&Value::Int(3)));
    }

    #[test]
    fn dangling_handle_is_reported() {
        let heap = Heap::new();
        let mut other = Heap::new();
        let h = other.list(vec![]);
        assert_eq!(heap.get(h).unwrap_err(), MarshalError::DanglingHandle(h));
    }

    #[test]
    fn bound_takes_receiver_tag() {
        let mut heap = Heap::new();
        let tag = TypeTag::parse("app/Counter").unwrap();
        let o = heap.object(tag.clone());
        let m = heap.bound(o, "increment").unwrap();
        let obj = heap.get(m).unwrap();
        assert_eq!(obj.tag, tag);
        assert_eq!(obj.type_name(), "bound method increment");
    }

    #[test]
    fn type_names_for_unsupported_kinds() {
        let tag = TypeTag::parse("app/f").unwrap();
        let lambda = Object {
            tag: tag.clone(),
            kind: ObjectKind::Closure { name: None, captures: vec![] },
            frozen: true,
        };
        assert_eq!(lambda.type_name(), "anonymous function");
        let closure = Object {
            tag,
            kind: ObjectKind::Closure {
                name: Some("adder".into()),
                captures: vec![Value::Int(5)],
            },
            frozen: true,
        };
        assert_eq!(closure.type_name(), "closure adder");
    }
}
