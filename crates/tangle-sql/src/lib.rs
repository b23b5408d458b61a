//! SQLite adapter for Tangle.
//!
//! A stored graph is a tree of `item` rows rooted at a sequence item that
//! holds the sentinel, every record, and the root value. Several graphs can
//! share one database; [`store`] returns the root item id to load it back.
//!
//! # Key Types
//!
//! - [`marshal`] / [`unmarshal`] — graph to rows and back
//! - [`store`] / [`load`] — [`Marshalled`](tangle_types::Marshalled) to rows and back
//! - [`open`] / [`open_in_memory`] — connections with the schema applied

pub mod error;
pub mod load;
pub mod schema;
pub mod store;

pub use error::{SqlError, SqlResult};
pub use load::load;
pub use schema::{create_tables, open, open_in_memory};
pub use store::store;

use rusqlite::Connection;
use tangle_engine::{decode, encode, EngineConfig};
use tangle_registry::TypeResolver;
use tangle_types::{Heap, Value};

/// Engine configuration used by this adapter.
pub fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

/// Encode the graph reachable from `root` into `conn` and return the root item id.
pub fn marshal(
    resolver: &dyn TypeResolver,
    heap: &Heap,
    root: &Value,
    conn: &Connection,
) -> SqlResult<i64> {
    let marshalled = encode(resolver, heap, root, &engine_config())?;
    store(conn, marshalled)
}

/// Decode the graph stored under `item_id`.
pub fn unmarshal(
    resolver: &dyn TypeResolver,
    conn: &Connection,
    item_id: i64,
) -> SqlResult<(Heap, Value)> {
    let marshalled = load(conn, item_id)?;
    Ok(decode(resolver, &marshalled, &engine_config())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;
    use tangle_registry::{ClassDef, Shape, TypeRegistry};
    use tangle_types::{graph_eq, MarshalError, RecordId, TypeTag};

    fn registry() -> TypeRegistry {
        let mut r = TypeRegistry::with_builtins();
        r.register_class(
            ClassDef::new(TypeTag::parse("app/Node").unwrap(), Shape::Fields)
                .fields(["value", "next"]),
        )
        .unwrap();
        r
    }

    fn cyclic(heap: &mut Heap) -> Value {
        let a = heap.object(TypeTag::parse("app/Node").unwrap());
        let b = heap.object(TypeTag::parse("app/Node").unwrap());
        heap.set_field(a, "value", "<@2@>".into()).unwrap();
        heap.set_field(a, "next", Value::Ref(b)).unwrap();
        heap.set_field(b, "value", Value::Null).unwrap();
        heap.set_field(b, "next", Value::Ref(a)).unwrap();
        let pair = heap.tuple(vec![Value::Ref(a), 1.5.into(), true.into()]);
        let index = heap.map(vec![("a".into(), Value::Ref(a)), (7.into(), Value::Ref(pair))]);
        Value::Ref(heap.list(vec![Value::Ref(index), Value::Ref(pair), Value::Ref(b)]))
    }

    #[test]
    fn cyclic_graph_roundtrip_in_memory() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let mut heap = Heap::new();
        let root = cyclic(&mut heap);

        let id = marshal(&r, &heap, &root, &conn).unwrap();
        let (decoded, back) = unmarshal(&r, &conn, id).unwrap();
        assert!(graph_eq(&heap, &root, &decoded, &back));
    }

    #[test]
    fn second_graph_continues_item_ids() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let mut heap = Heap::new();
        let first = cyclic(&mut heap);
        let second = Value::Ref(heap.list(vec!["only".into()]));

        let a = marshal(&r, &heap, &first, &conn).unwrap();
        let max: i64 = conn
            .query_row("SELECT MAX(item_id) FROM item", [], |row| row.get(0))
            .unwrap();
        let b = marshal(&r, &heap, &second, &conn).unwrap();
        assert!(b > max);

        let (h1, v1) = unmarshal(&r, &conn, a).unwrap();
        let (h2, v2) = unmarshal(&r, &conn, b).unwrap();
        assert!(graph_eq(&heap, &first, &h1, &v1));
        assert!(graph_eq(&heap, &second, &h2, &v2));
    }

    #[test]
    fn scalar_root_roundtrip() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let heap = Heap::new();
        let id = marshal(&r, &heap, &Value::Int(-3), &conn).unwrap();
        let (_, back) = unmarshal(&r, &conn, id).unwrap();
        assert_eq!(back, Value::Int(-3));
    }

    #[test]
    fn non_finite_floats_roundtrip() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let mut heap = Heap::new();
        let values = vec![
            f64::NAN.into(),
            f64::INFINITY.into(),
            f64::NEG_INFINITY.into(),
            1.5.into(),
        ];
        let root = Value::Ref(heap.list(values));

        let id = marshal(&r, &heap, &root, &conn).unwrap();
        let (decoded, back) = unmarshal(&r, &conn, id).unwrap();
        assert!(graph_eq(&heap, &root, &decoded, &back));
        let items = decoded.sequence(back.handle().unwrap()).unwrap();
        assert!(matches!(items[0], Value::Float(f) if f.is_nan()));
        assert_eq!(items[1], Value::Float(f64::INFINITY));
        assert_eq!(items[2], Value::Float(f64::NEG_INFINITY));
    }

    #[test]
    fn float_row_with_finite_text_is_malformed() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let heap = Heap::new();
        let id = marshal(&r, &heap, &Value::Float(2.0), &conn).unwrap();
        conn.execute(
            "UPDATE item SET data = '2.0' WHERE kind = 'float'",
            [],
        )
        .unwrap();
        assert!(matches!(
            unmarshal(&r, &conn, id),
            Err(SqlError::Marshal(MarshalError::MalformedInput(_)))
        ));
    }

    #[test]
    fn on_disk_roundtrip() {
        let r = registry();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");
        let mut heap = Heap::new();
        let root = cyclic(&mut heap);

        let id = {
            let conn = open(&path).unwrap();
            marshal(&r, &heap, &root, &conn).unwrap()
        };
        let conn = open(&path).unwrap();
        let (decoded, back) = unmarshal(&r, &conn, id).unwrap();
        assert!(graph_eq(&heap, &root, &decoded, &back));
    }

    #[test]
    fn missing_item_is_malformed() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        assert!(matches!(
            unmarshal(&r, &conn, 42),
            Err(SqlError::Marshal(MarshalError::MalformedInput(_)))
        ));
    }

    #[test]
    fn scalar_item_is_not_a_graph() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "INSERT INTO item (item_id, kind, data) VALUES (1, 'int', 5)",
            [],
        )
        .unwrap();
        assert!(matches!(
            load(&conn, 1),
            Err(SqlError::Marshal(MarshalError::MalformedInput(_)))
        ));
    }

    #[test]
    fn graph_without_root_row_is_truncated() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let mut heap = Heap::new();
        let root = cyclic(&mut heap);
        let id = marshal(&r, &heap, &root, &conn).unwrap();

        conn.execute(
            "DELETE FROM sequence_item WHERE seq_id = ?1 AND ordinal =
                 (SELECT MAX(ordinal) FROM sequence_item WHERE seq_id = ?1)",
            params![id],
        )
        .unwrap();
        assert!(matches!(
            load(&conn, id),
            Err(SqlError::Marshal(MarshalError::MalformedInput(m))) if m.contains("missing root")
        ));
    }

    #[test]
    fn foreign_sentinel_is_rejected_on_load() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let heap = Heap::new();
        let id = marshal(&r, &heap, &Value::Int(1), &conn).unwrap();

        conn.execute(
            "UPDATE item SET data = '@other:9@' WHERE kind = 'text'",
            [],
        )
        .unwrap();
        assert!(matches!(
            load(&conn, id),
            Err(SqlError::Marshal(MarshalError::MalformedInput(m))) if m.contains("sentinel")
        ));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let r = registry();
        let conn = open_in_memory().unwrap();
        let heap = Heap::new();
        let id = marshal(&r, &heap, &Value::Null, &conn).unwrap();

        // Point the root value at a record that was never stored.
        let root_item: i64 = conn
            .query_row(
                "SELECT item_id FROM sequence_item WHERE seq_id = ?1 ORDER BY ordinal DESC LIMIT 1",
                params![id],
                |row| row.get(0),
            )
            .unwrap();
        conn.execute(
            "UPDATE item SET kind = 'reference', data = 9 WHERE item_id = ?1",
            params![root_item],
        )
        .unwrap();

        assert!(matches!(
            unmarshal(&r, &conn, id),
            Err(SqlError::Marshal(MarshalError::DanglingReference(d))) if d == RecordId::new(9)
        ));
    }
}
