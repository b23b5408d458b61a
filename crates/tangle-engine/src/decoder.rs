//! Two-phase graph decoder.
//!
//! Phase one walks the records in stream order and allocates one heap
//! object per record: empty shells for mutable classes, finished objects
//! for immutable classes, classes, functions and bound members. Phase two
//! fills every shell. Because all shells exist before any is filled,
//! references may point forwards, backwards, or at the record itself.

use std::collections::{HashMap, HashSet};

use tangle_registry::{Definition, Shape, TypeResolver};
use tangle_types::{
    Encoded, Fields, Handle, Heap, Items, MarshalError, MarshalResult, Marshalled, Record,
    RecordId, RecordItems, Value,
};
use tracing::debug;

use crate::config::EngineConfig;

/// Rebuild the graph described by `marshalled`.
///
/// Returns the new heap and the root value.
pub fn decode(
    resolver: &dyn TypeResolver,
    marshalled: &Marshalled,
    config: &EngineConfig,
) -> MarshalResult<(Heap, Value)> {
    if marshalled.version != config.version {
        return Err(MarshalError::malformed(format!(
            "unexpected version sentinel {:?}, expected {:?}",
            marshalled.version, config.version
        )));
    }
    let mut decoder = Decoder::new(resolver, config, marshalled)?;
    decoder.allocate()?;
    decoder.populate()?;
    let root = decoder.value(&marshalled.root)?;
    debug!(objects = decoder.heap.len(), "decoded graph");
    Ok((decoder.heap, root))
}

struct Decoder<'a> {
    resolver: &'a dyn TypeResolver,
    config: &'a EngineConfig,
    records: &'a [Record],
    /// Every id defined anywhere in the stream.
    declared: HashSet<RecordId>,
    handles: HashMap<RecordId, Handle>,
    /// Shells awaiting population, with the record that fills them.
    shells: Vec<(Handle, &'a Record)>,
    heap: Heap,
}

impl<'a> Decoder<'a> {
    fn new(
        resolver: &'a dyn TypeResolver,
        config: &'a EngineConfig,
        marshalled: &'a Marshalled,
    ) -> MarshalResult<Self> {
        let mut declared = HashSet::with_capacity(marshalled.records.len());
        for record in &marshalled.records {
            if !declared.insert(record.id) {
                return Err(MarshalError::malformed(format!(
                    "record {} is defined more than once",
                    record.id
                )));
            }
        }
        Ok(Self {
            resolver,
            config,
            records: &marshalled.records,
            declared,
            handles: HashMap::new(),
            shells: Vec::new(),
            heap: Heap::new(),
        })
    }

    // ---------------------------------------------------------------
    // Phase 1: allocation
    // ---------------------------------------------------------------

    fn allocate(&mut self) -> MarshalResult<()> {
        let records = self.records;
        for record in records {
            let handle = self.allocate_one(record)?;
            self.handles.insert(record.id, handle);
        }
        debug!(
            records = records.len(),
            shells = self.shells.len(),
            "allocation phase complete"
        );
        Ok(())
    }

    fn allocate_one(&mut self, record: &'a Record) -> MarshalResult<Handle> {
        if let Some(bound) = &record.bound {
            if record.items.is_some() || record.fields.is_some() {
                return Err(MarshalError::malformed(format!(
                    "bound record {} carries contents",
                    record.id
                )));
            }
            let receiver = self.handle(bound.instance)?;
            let receiver_tag = self.heap.get(receiver)?.tag.clone();
            self.resolver.resolve_member(&receiver_tag, &bound.selector)?;
            return self.heap.bound(receiver, bound.selector.as_str());
        }

        let tag = record.tag.as_ref().ok_or_else(|| {
            MarshalError::malformed(format!(
                "record {} has neither a tag nor a bound reference",
                record.id
            ))
        })?;

        let resolver = self.resolver;
        match resolver.resolve(tag)? {
            Definition::Function(_) => {
                if record.items.is_some() || record.fields.is_some() {
                    return Err(MarshalError::malformed(format!(
                        "function record {} carries contents",
                        record.id
                    )));
                }
                Ok(self.heap.function_ref(tag.clone()))
            }
            Definition::Class(_) if record.items.is_none() && record.fields.is_none() => {
                Ok(self.heap.class_ref(tag.clone()))
            }
            Definition::Class(class) if class.is_immutable() => {
                let items = self.items(record, class.shape())?;
                let fields = self.fields(record)?;
                class.construct(&mut self.heap, items, fields)
            }
            Definition::Class(class) => {
                if record.immutable {
                    return Err(MarshalError::malformed(format!(
                        "record {} is marked immutable but {tag} is mutable",
                        record.id
                    )));
                }
                check_shape(record, class.shape())?;
                let shell = class.allocate(&mut self.heap)?;
                self.shells.push((shell, record));
                Ok(shell)
            }
        }
    }

    // ---------------------------------------------------------------
    // Phase 2: population
    // ---------------------------------------------------------------

    fn populate(&mut self) -> MarshalResult<()> {
        let shells = std::mem::take(&mut self.shells);
        for (shell, record) in &shells {
            match &record.items {
                Some(RecordItems::Sequence(values)) => {
                    let values = values
                        .iter()
                        .map(|v| self.value(v))
                        .collect::<MarshalResult<Vec<_>>>()?;
                    self.heap.extend(*shell, values)?;
                }
                Some(RecordItems::Mapping(entries)) => {
                    for (k, v) in entries {
                        let key = self.value(k)?;
                        let value = self.value(v)?;
                        self.heap.insert(*shell, key, value)?;
                    }
                }
                None => {}
            }
            for (name, value) in record.fields.iter().flatten() {
                let value = self.value(value)?;
                self.heap.set_field(*shell, name.as_str(), value)?;
            }
        }
        debug!(populated = shells.len(), "population phase complete");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Values
    // ---------------------------------------------------------------

    fn handle(&self, id: RecordId) -> MarshalResult<Handle> {
        match self.handles.get(&id) {
            Some(handle) => Ok(*handle),
            None if self.declared.contains(&id) => Err(MarshalError::malformed(format!(
                "record {id} is referenced before it is defined"
            ))),
            None => Err(MarshalError::DanglingReference(id)),
        }
    }

    fn value(&self, encoded: &Encoded) -> MarshalResult<Value> {
        Ok(match encoded {
            Encoded::Null => Value::Null,
            Encoded::Bool(b) => Value::Bool(*b),
            Encoded::Int(i) => Value::Int(*i),
            Encoded::Float(f) => Value::Float(*f),
            Encoded::Text(s) => Value::Text(self.config.decode_text(s)),
            Encoded::Ref(id) => Value::Ref(self.handle(*id)?),
        })
    }

    fn items(&self, record: &Record, shape: Shape) -> MarshalResult<Items> {
        check_shape(record, shape)?;
        Ok(match &record.items {
            None => shape.empty_items(),
            Some(RecordItems::Sequence(values)) => Items::Sequence(
                values
                    .iter()
                    .map(|v| self.value(v))
                    .collect::<MarshalResult<_>>()?,
            ),
            Some(RecordItems::Mapping(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    out.push((self.value(k)?, self.value(v)?));
                }
                Items::Mapping(out)
            }
        })
    }

    fn fields(&self, record: &Record) -> MarshalResult<Fields> {
        let mut fields = Fields::new();
        for (name, value) in record.fields.iter().flatten() {
            fields.set(name.as_str(), self.value(value)?);
        }
        Ok(fields)
    }
}

fn check_shape(record: &Record, shape: Shape) -> MarshalResult<()> {
    let fits = matches!(
        (shape, &record.items),
        (_, None)
            | (Shape::Sequence, Some(RecordItems::Sequence(_)))
            | (Shape::Mapping, Some(RecordItems::Mapping(_)))
    );
    if !fits {
        return Err(MarshalError::malformed(format!(
            "record {} has items that contradict the {shape} shape",
            record.id
        )));
    }
    Ok(())
}
