//! Writing a [`Marshalled`] stream as rows.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection};
use tangle_types::{
    Encoded, MarshalError, Marshalled, Record, RecordId, RecordItems, StreamItem,
};
use tracing::debug;

use crate::error::{SqlError, SqlResult};

pub(crate) const NULL: &str = "null";
pub(crate) const BOOL: &str = "bool";
pub(crate) const INT: &str = "int";
pub(crate) const FLOAT: &str = "float";
pub(crate) const TEXT: &str = "text";
pub(crate) const REFERENCE: &str = "reference";
pub(crate) const SEQUENCE: &str = "sequence";
pub(crate) const MAP: &str = "map";
pub(crate) const FIELDS: &str = "fields";
pub(crate) const OBJECT: &str = "object";

/// Store a stream and return the item id of its root row.
///
/// The root row is a sequence holding the sentinel, every record, and the
/// root value, in that order. Item ids continue from the largest id already
/// in the database. Transactions are left to the caller.
pub fn store(conn: &Connection, marshalled: Marshalled) -> SqlResult<i64> {
    let start: i64 = conn.query_row("SELECT COALESCE(MAX(item_id), 0) FROM item", [], |row| {
        row.get(0)
    })?;
    let mut writer = RowWriter { conn, next: start };

    let records = marshalled.records.len();
    let stream = marshalled.into_stream();
    let mut members = Vec::with_capacity(stream.len());
    for item in &stream {
        members.push(match item {
            StreamItem::Sentinel(version) => writer.scalar(TEXT, SqlValue::Text(version.clone()))?,
            StreamItem::Record(record) => writer.record(record)?,
            StreamItem::Root(root) => writer.value(root)?,
        });
    }
    let root = writer.sequence(&members)?;

    debug!(root, records, items = writer.next - start, "stored graph");
    Ok(root)
}

struct RowWriter<'c> {
    conn: &'c Connection,
    next: i64,
}

impl RowWriter<'_> {
    fn item(&mut self, kind: &str, data: Option<SqlValue>) -> SqlResult<i64> {
        self.next += 1;
        let id = self.next;
        let data = data.unwrap_or(SqlValue::Integer(id));
        self.conn.execute(
            "INSERT INTO item (item_id, kind, data) VALUES (?1, ?2, ?3)",
            params![id, kind, data],
        )?;
        Ok(id)
    }

    fn scalar(&mut self, kind: &str, data: SqlValue) -> SqlResult<i64> {
        self.item(kind, Some(data))
    }

    fn value(&mut self, value: &Encoded) -> SqlResult<i64> {
        match value {
            Encoded::Null => self.scalar(NULL, SqlValue::Null),
            Encoded::Bool(b) => self.scalar(BOOL, SqlValue::Integer(i64::from(*b))),
            Encoded::Int(i) => self.scalar(INT, SqlValue::Integer(*i)),
            Encoded::Float(f) if f.is_finite() => self.scalar(FLOAT, SqlValue::Real(*f)),
            // SQLite turns NaN into NULL, so non-finite floats are kept as text.
            Encoded::Float(f) => self.scalar(FLOAT, SqlValue::Text(f.to_string())),
            Encoded::Text(s) => self.scalar(TEXT, SqlValue::Text(s.clone())),
            Encoded::Ref(id) => self.scalar(REFERENCE, SqlValue::Integer(record_key(*id)?)),
        }
    }

    fn sequence(&mut self, members: &[i64]) -> SqlResult<i64> {
        let seq_id = self.item(SEQUENCE, None)?;
        for (ordinal, item_id) in members.iter().enumerate() {
            self.conn.execute(
                "INSERT INTO sequence_item (seq_id, item_id, ordinal) VALUES (?1, ?2, ?3)",
                params![seq_id, item_id, ordinal as i64],
            )?;
        }
        Ok(seq_id)
    }

    fn record(&mut self, record: &Record) -> SqlResult<i64> {
        let instance_id = match &record.bound {
            Some(bound) => Some(self.value(&Encoded::Ref(bound.instance))?),
            None => None,
        };

        let items_id = match &record.items {
            Some(RecordItems::Sequence(values)) => {
                let members = values
                    .iter()
                    .map(|v| self.value(v))
                    .collect::<SqlResult<Vec<_>>>()?;
                Some(self.sequence(&members)?)
            }
            Some(RecordItems::Mapping(entries)) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push((self.value(k)?, self.value(v)?));
                }
                let map_id = self.item(MAP, None)?;
                for (ordinal, (key_id, value_id)) in pairs.iter().enumerate() {
                    self.conn.execute(
                        "INSERT INTO map_item (map_id, key_id, value_id, ordinal) VALUES (?1, ?2, ?3, ?4)",
                        params![map_id, key_id, value_id, ordinal as i64],
                    )?;
                }
                Some(map_id)
            }
            None => None,
        };

        let fields_id = match &record.fields {
            Some(fields) => {
                let mut named = Vec::with_capacity(fields.len());
                for (name, value) in fields {
                    named.push((name.as_str(), self.value(value)?));
                }
                let fields_id = self.item(FIELDS, None)?;
                for (ordinal, (name, value_id)) in named.iter().enumerate() {
                    self.conn.execute(
                        "INSERT INTO field_item (fields_id, name, value_id, ordinal) VALUES (?1, ?2, ?3, ?4)",
                        params![fields_id, name, value_id, ordinal as i64],
                    )?;
                }
                Some(fields_id)
            }
            None => None,
        };

        let item_id = self.item(OBJECT, None)?;
        self.conn.execute(
            "INSERT INTO object_item
                (item_id, record_id, tag, instance_id, attribute, immutable, fields_id, items_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                item_id,
                record_key(record.id)?,
                record.tag.as_ref().map(|t| t.as_str()),
                instance_id,
                record.bound.as_ref().map(|b| b.selector.as_str()),
                record.immutable,
                fields_id,
                items_id,
            ],
        )?;
        Ok(item_id)
    }
}

fn record_key(id: RecordId) -> SqlResult<i64> {
    i64::try_from(id.get()).map_err(|_| {
        SqlError::from(MarshalError::malformed(format!(
            "record id {id} exceeds the integer column"
        )))
    })
}
