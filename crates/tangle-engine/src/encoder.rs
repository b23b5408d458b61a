//! Graph encoder.
//!
//! Walks a value graph and produces a flat [`Marshalled`] stream. Every
//! composite becomes exactly one [`Record`]; later encounters become
//! references to it.
//!
//! Mutable composites have their header appended as soon as they are first
//! seen, and their contents are filled in later from a FIFO queue. This
//! keeps recursion depth bounded by the nesting of immutable values rather
//! than by the length of reference chains. Immutable composites are filled
//! inline and appended after their children, so a decoder can construct
//! them in one step.

use std::collections::VecDeque;

use tangle_registry::{ClassDef, TypeResolver};
use tangle_types::{
    BoundRef, Encoded, Handle, Heap, Items, MarshalError, MarshalResult, Marshalled, ObjectKind,
    Record, RecordItems, Value,
};
use tracing::debug;

use crate::config::EngineConfig;
use crate::identity::IdentityTracker;

/// Deepest chain of immutable composites nested inside one another that
/// [`encode`] accepts. Immutable contents are encoded inline, so this bounds
/// the recursion.
pub const MAX_INLINE_DEPTH: usize = 256;

/// Encode the graph reachable from `root`.
pub fn encode(
    resolver: &dyn TypeResolver,
    heap: &Heap,
    root: &Value,
    config: &EngineConfig,
) -> MarshalResult<Marshalled> {
    let mut encoder = Encoder::new(resolver, heap, config);
    let root = encoder.visit(root)?;
    encoder.drain()?;
    Ok(encoder.finish(root))
}

/// State of one encode session.
pub struct Encoder<'a> {
    resolver: &'a dyn TypeResolver,
    heap: &'a Heap,
    config: &'a EngineConfig,
    tracker: IdentityTracker,
    records: Vec<Record>,
    /// Handles whose headers are emitted but whose contents are not, with
    /// the position of that header in `records`.
    deferred: VecDeque<(Handle, usize)>,
    /// Immutable composites currently being encoded inline.
    depth: usize,
}

impl<'a> Encoder<'a> {
    pub fn new(resolver: &'a dyn TypeResolver, heap: &'a Heap, config: &'a EngineConfig) -> Self {
        Self {
            resolver,
            heap,
            config,
            tracker: IdentityTracker::new(),
            records: Vec::new(),
            deferred: VecDeque::new(),
            depth: 0,
        }
    }

    /// Records emitted so far.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn tracker(&self) -> &IdentityTracker {
        &self.tracker
    }

    /// Encode one value, emitting records for composites not yet seen.
    pub fn visit(&mut self, value: &Value) -> MarshalResult<Encoded> {
        Ok(match value {
            Value::Null => Encoded::Null,
            Value::Bool(b) => Encoded::Bool(*b),
            Value::Int(i) => Encoded::Int(*i),
            Value::Float(f) => Encoded::Float(*f),
            Value::Text(s) => Encoded::Text(self.config.encode_text(s)),
            Value::Ref(h) => self.visit_object(*h)?,
        })
    }

    /// Populate every deferred record.
    pub fn drain(&mut self) -> MarshalResult<()> {
        let mut drained = 0usize;
        while let Some((handle, slot)) = self.deferred.pop_front() {
            let class = self.class_of(handle)?;
            let (items, fields) = self.contents(handle, class)?;
            let record = &mut self.records[slot];
            record.items = items;
            record.fields = Some(fields);
            drained += 1;
        }
        debug!(drained, "deferred queue drained");
        Ok(())
    }

    /// Finish the session.
    pub fn finish(self, root: Encoded) -> Marshalled {
        debug!(records = self.records.len(), "encoded graph");
        Marshalled {
            version: self.config.version.clone(),
            records: self.records,
            root,
        }
    }

    // ---------------------------------------------------------------
    // Composites
    // ---------------------------------------------------------------

    fn visit_object(&mut self, handle: Handle) -> MarshalResult<Encoded> {
        if let Some(id) = self.tracker.get(handle) {
            return Ok(Encoded::Ref(id));
        }

        let heap = self.heap;
        let resolver = self.resolver;
        let object = heap.get(handle)?;

        match &object.kind {
            ObjectKind::Closure { .. } => Err(unsupported(
                object.type_name(),
                "closures and local functions cannot be resolved by name",
            )),
            ObjectKind::Iterator { .. } => Err(unsupported(
                object.type_name(),
                "iteration state cannot be reconstructed",
            )),
            ObjectKind::Foreign { .. } => Err(unsupported(
                object.type_name(),
                "no field contract for a host layout",
            )),
            ObjectKind::Class => {
                resolver.resolve_class(&object.tag)?;
                let (id, _) = self.tracker.id_for(handle);
                self.records.push(Record::header(id, object.tag.clone()));
                Ok(Encoded::Ref(id))
            }
            ObjectKind::Function => {
                resolver.resolve_function(&object.tag)?;
                let (id, _) = self.tracker.id_for(handle);
                self.records.push(Record::header(id, object.tag.clone()));
                Ok(Encoded::Ref(id))
            }
            ObjectKind::Bound { receiver, selector } => {
                let receiver_tag = &heap.get(*receiver)?.tag;
                resolver.resolve_member(receiver_tag, selector)?;
                let (id, _) = self.tracker.id_for(handle);
                let instance = match self.visit_object(*receiver)? {
                    Encoded::Ref(instance) => instance,
                    _ => return Err(MarshalError::malformed("bound receiver is not a composite")),
                };
                self.records.push(Record::bound(
                    id,
                    BoundRef {
                        instance,
                        selector: selector.clone(),
                    },
                ));
                Ok(Encoded::Ref(id))
            }
            ObjectKind::Instance { items, .. } => {
                let class = resolver.resolve_class(&object.tag)?;
                if !class.shape().accepts(items) {
                    return Err(MarshalError::ShapeMismatch {
                        handle,
                        expected: class.shape().name(),
                    });
                }
                if object.frozen != class.is_immutable() {
                    let reason = if object.frozen {
                        "frozen instance of a mutable class"
                    } else {
                        "mutable instance of an immutable class"
                    };
                    return Err(unsupported(object.type_name(), reason));
                }
                if class.is_immutable() && self.depth >= MAX_INLINE_DEPTH {
                    return Err(MarshalError::UnsupportedType {
                        type_name: object.type_name(),
                        reason: format!(
                            "immutable values nested more than {MAX_INLINE_DEPTH} deep"
                        ),
                    });
                }
                let (id, _) = self.tracker.id_for(handle);
                if class.is_immutable() {
                    self.depth += 1;
                    let contents = self.contents(handle, class);
                    self.depth -= 1;
                    let (items, fields) = contents?;
                    self.records.push(Record {
                        items,
                        fields: Some(fields),
                        immutable: true,
                        ..Record::header(id, object.tag.clone())
                    });
                } else {
                    self.deferred.push_back((handle, self.records.len()));
                    self.records.push(Record::header(id, object.tag.clone()));
                }
                Ok(Encoded::Ref(id))
            }
        }
    }

    fn class_of(&self, handle: Handle) -> MarshalResult<&'a ClassDef> {
        let resolver = self.resolver;
        resolver.resolve_class(&self.heap.get(handle)?.tag)
    }

    /// Encode the items and serialized fields of an instance.
    fn contents(
        &mut self,
        handle: Handle,
        class: &ClassDef,
    ) -> MarshalResult<(Option<RecordItems>, Vec<(String, Encoded)>)> {
        let heap = self.heap;
        let object = heap.get(handle)?;
        let (items, fields) = match &object.kind {
            ObjectKind::Instance { items, fields } => (items, fields),
            _ => {
                return Err(MarshalError::ShapeMismatch {
                    handle,
                    expected: "instance",
                })
            }
        };

        let items = match items {
            Items::None => None,
            Items::Sequence(values) => Some(RecordItems::Sequence(
                values
                    .iter()
                    .map(|v| self.visit(v))
                    .collect::<MarshalResult<_>>()?,
            )),
            Items::Mapping(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    out.push((self.visit(k)?, self.visit(v)?));
                }
                Some(RecordItems::Mapping(out))
            }
        };

        let mut out = Vec::new();
        for (name, value) in class.serialized_fields(fields) {
            out.push((name.to_string(), self.visit(value)?));
        }
        Ok((items, out))
    }
}

fn unsupported(type_name: String, reason: &str) -> MarshalError {
    MarshalError::UnsupportedType {
        type_name,
        reason: reason.to_string(),
    }
}
