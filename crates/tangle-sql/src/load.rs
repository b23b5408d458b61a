//! Reading a [`Marshalled`] stream back from rows.

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use tangle_types::{
    BoundRef, Encoded, MarshalError, Marshalled, Record, RecordId, RecordItems, StreamItem,
    TypeTag,
};
use tracing::debug;

use crate::error::SqlResult;
use crate::store::{BOOL, FIELDS, FLOAT, INT, MAP, NULL, OBJECT, REFERENCE, SEQUENCE, TEXT};

/// Load the stream whose root row is `item_id`.
pub fn load(conn: &Connection, item_id: i64) -> SqlResult<Marshalled> {
    let reader = RowReader { conn };
    let (kind, _) = reader.item(item_id)?;
    if kind != SEQUENCE {
        return Err(malformed(format!("item {item_id} is a {kind}, not a stored graph")).into());
    }
    let members = reader.sequence(item_id)?;
    let mut stream = Vec::with_capacity(members.len());
    for (position, member) in members.into_iter().enumerate() {
        let (kind, _) = reader.item(member)?;
        stream.push(if kind == OBJECT {
            StreamItem::Record(reader.record(member)?)
        } else {
            match reader.value(member)? {
                Encoded::Text(version) if position == 0 => StreamItem::Sentinel(version),
                value => StreamItem::Root(value),
            }
        });
    }
    let marshalled = Marshalled::from_stream(stream)?;

    debug!(item_id, records = marshalled.records.len(), "loaded graph");
    Ok(marshalled)
}

struct RowReader<'c> {
    conn: &'c Connection,
}

impl RowReader<'_> {
    fn item(&self, item_id: i64) -> SqlResult<(String, SqlValue)> {
        self.conn
            .query_row(
                "SELECT kind, data FROM item WHERE item_id = ?1",
                params![item_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or_else(|| malformed(format!("item {item_id} does not exist")).into())
    }

    fn value(&self, item_id: i64) -> SqlResult<Encoded> {
        let (kind, data) = self.item(item_id)?;
        let bad = || malformed(format!("item {item_id}: {kind} row holds {data:?}"));
        Ok(match (kind.as_str(), &data) {
            (NULL, SqlValue::Null) => Encoded::Null,
            (BOOL, SqlValue::Integer(i)) => Encoded::Bool(*i != 0),
            (INT, SqlValue::Integer(i)) => Encoded::Int(*i),
            (FLOAT, SqlValue::Real(f)) => Encoded::Float(*f),
            (FLOAT, SqlValue::Integer(i)) => Encoded::Float(*i as f64),
            (FLOAT, SqlValue::Text(s)) => match s.parse::<f64>() {
                Ok(f) if !f.is_finite() => Encoded::Float(f),
                _ => return Err(bad().into()),
            },
            (TEXT, SqlValue::Text(s)) => Encoded::Text(s.clone()),
            (REFERENCE, SqlValue::Integer(i)) => {
                Encoded::Ref(RecordId::new(u64::try_from(*i).map_err(|_| bad())?))
            }
            (NULL | BOOL | INT | FLOAT | TEXT | REFERENCE, _) => return Err(bad().into()),
            (other, _) => {
                return Err(malformed(format!(
                    "item {item_id}: a {other} cannot appear as a value"
                ))
                .into())
            }
        })
    }

    fn sequence(&self, seq_id: i64) -> SqlResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM sequence_item WHERE seq_id = ?1 ORDER BY ordinal")?;
        let rows = stmt.query_map(params![seq_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<i64>, _>>()?)
    }

    fn values(&self, seq_id: i64) -> SqlResult<Vec<Encoded>> {
        self.sequence(seq_id)?
            .into_iter()
            .map(|id| self.value(id))
            .collect()
    }

    fn entries(&self, map_id: i64) -> SqlResult<Vec<(Encoded, Encoded)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key_id, value_id FROM map_item WHERE map_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt.query_map(params![map_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let pairs = rows.collect::<Result<Vec<(i64, i64)>, _>>()?;
        pairs
            .into_iter()
            .map(|(k, v)| Ok((self.value(k)?, self.value(v)?)))
            .collect()
    }

    fn fields(&self, fields_id: i64) -> SqlResult<Vec<(String, Encoded)>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value_id FROM field_item WHERE fields_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt.query_map(params![fields_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let named = rows.collect::<Result<Vec<(String, i64)>, _>>()?;
        named
            .into_iter()
            .map(|(name, id)| Ok((name, self.value(id)?)))
            .collect()
    }

    fn record(&self, item_id: i64) -> SqlResult<Record> {
        let (kind, _) = self.item(item_id)?;
        if kind != OBJECT {
            return Err(malformed(format!("item {item_id} is a {kind}, not a record")).into());
        }

        type Row = (
            i64,
            Option<String>,
            Option<i64>,
            Option<String>,
            bool,
            Option<i64>,
            Option<i64>,
        );
        let (record_id, tag, instance_id, attribute, immutable, fields_id, items_id): Row =
            self.conn
                .query_row(
                    "SELECT record_id, tag, instance_id, attribute, immutable, fields_id, items_id
                     FROM object_item WHERE item_id = ?1",
                    params![item_id],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                        ))
                    },
                )
                .optional()?
                .ok_or_else(|| malformed(format!("object row for item {item_id} is missing")))?;

        let id = u64::try_from(record_id)
            .map(RecordId::new)
            .map_err(|_| malformed(format!("item {item_id}: negative record id")))?;
        let tag = tag.as_deref().map(TypeTag::parse).transpose()?;

        let bound = match (instance_id, attribute) {
            (None, None) => None,
            (Some(instance_id), Some(selector)) => match self.value(instance_id)? {
                Encoded::Ref(instance) => Some(BoundRef { instance, selector }),
                _ => {
                    return Err(
                        malformed(format!("record {id}: instance is not a reference")).into(),
                    )
                }
            },
            _ => {
                return Err(malformed(format!(
                    "record {id}: instance and attribute must appear together"
                ))
                .into())
            }
        };

        let items = match items_id {
            Some(items_id) => {
                let (kind, _) = self.item(items_id)?;
                match kind.as_str() {
                    SEQUENCE => Some(RecordItems::Sequence(self.values(items_id)?)),
                    MAP => Some(RecordItems::Mapping(self.entries(items_id)?)),
                    other => {
                        return Err(malformed(format!(
                            "record {id}: items row is a {other}"
                        ))
                        .into())
                    }
                }
            }
            None => None,
        };

        let fields = match fields_id {
            Some(fields_id) => {
                let (kind, _) = self.item(fields_id)?;
                if kind != FIELDS {
                    return Err(malformed(format!("record {id}: fields row is a {kind}")).into());
                }
                Some(self.fields(fields_id)?)
            }
            None => None,
        };

        Ok(Record {
            id,
            tag,
            items,
            fields,
            bound,
            immutable,
        })
    }
}

fn malformed(reason: impl Into<String>) -> MarshalError {
    MarshalError::malformed(reason)
}
