//! Table layout.
//!
//! Every stored value is an `item` row. Scalars keep their value in
//! `data`; containers and records keep their own item id there and hold
//! their contents in the side tables.
//!
//! - `item` — one row per stored value, with its kind.
//! - `object_item` — one row per record.
//! - `sequence_item` — ordered members of a sequence item.
//! - `map_item` — ordered key/value pairs of a map item.
//! - `field_item` — ordered named values of a fields item.

use rusqlite::Connection;

use crate::error::SqlResult;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS item (
    item_id  INTEGER PRIMARY KEY,
    kind     TEXT NOT NULL,
    data
);

CREATE TABLE IF NOT EXISTS object_item (
    item_id      INTEGER PRIMARY KEY,
    record_id    INTEGER NOT NULL,
    tag          TEXT,
    instance_id  INTEGER,
    attribute    TEXT,
    immutable    INTEGER NOT NULL DEFAULT 0,
    fields_id    INTEGER,
    items_id     INTEGER
);

CREATE TABLE IF NOT EXISTS sequence_item (
    seq_id   INTEGER NOT NULL,
    item_id  INTEGER NOT NULL,
    ordinal  INTEGER NOT NULL,
    PRIMARY KEY (seq_id, ordinal)
);

CREATE TABLE IF NOT EXISTS map_item (
    map_id    INTEGER NOT NULL,
    key_id    INTEGER NOT NULL,
    value_id  INTEGER NOT NULL,
    ordinal   INTEGER NOT NULL,
    PRIMARY KEY (map_id, ordinal)
);

CREATE TABLE IF NOT EXISTS field_item (
    fields_id  INTEGER NOT NULL,
    name       TEXT NOT NULL,
    value_id   INTEGER NOT NULL,
    ordinal    INTEGER NOT NULL,
    PRIMARY KEY (fields_id, ordinal)
);
";

/// Create the tables if they do not exist yet.
pub fn create_tables(conn: &Connection) -> SqlResult<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Open (or create) the database at `path` and apply the schema.
pub fn open(path: impl AsRef<std::path::Path>) -> SqlResult<Connection> {
    let conn = Connection::open(path)?;
    create_tables(&conn)?;
    Ok(conn)
}

/// Open an in-memory database with the schema applied.
pub fn open_in_memory() -> SqlResult<Connection> {
    let conn = Connection::open_in_memory()?;
    create_tables(&conn)?;
    Ok(conn)
}
