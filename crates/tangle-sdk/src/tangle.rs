use std::io::{Read, Write};

use rusqlite::Connection;
use tangle_engine::{decode, encode, EngineConfig};
use tangle_json::JsonOptions;
use tangle_registry::TypeRegistry;
use tangle_types::{Handle, Heap, Marshalled, Value};
use tracing::debug;

use crate::binary;
use crate::error::SdkResult;

/// High-level Tangle API.
///
/// Holds the registry every format resolves tags against. The engine
/// configuration applies to [`marshal`](Self::marshal),
/// [`unmarshal`](Self::unmarshal) and the binary framing; the text
/// adapters pick their own text policy.
pub struct Tangle {
    registry: TypeRegistry,
    config: EngineConfig,
}

impl Default for Tangle {
    fn default() -> Self {
        Self::new(TypeRegistry::with_builtins())
    }
}

impl Tangle {
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            registry,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(registry: TypeRegistry, config: EngineConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ---- Intermediate structure ----

    pub fn marshal(&self, heap: &Heap, root: &Value) -> SdkResult<Marshalled> {
        Ok(encode(&self.registry, heap, root, &self.config)?)
    }

    pub fn unmarshal(&self, marshalled: &Marshalled) -> SdkResult<(Heap, Value)> {
        Ok(decode(&self.registry, marshalled, &self.config)?)
    }

    // ---- JSON ----

    pub fn to_json_string(&self, heap: &Heap, root: &Value) -> SdkResult<String> {
        self.to_json_string_with(heap, root, &JsonOptions::default())
    }

    pub fn to_json_string_with(
        &self,
        heap: &Heap,
        root: &Value,
        options: &JsonOptions,
    ) -> SdkResult<String> {
        Ok(tangle_json::dumps(&self.registry, heap, root, options)?)
    }

    pub fn from_json_str(&self, text: &str) -> SdkResult<(Heap, Value)> {
        Ok(tangle_json::loads(&self.registry, text)?)
    }

    pub fn to_json_writer<W: Write>(
        &self,
        heap: &Heap,
        root: &Value,
        options: &JsonOptions,
        writer: W,
    ) -> SdkResult<()> {
        Ok(tangle_json::to_writer(&self.registry, heap, root, options, writer)?)
    }

    pub fn from_json_reader<R: Read>(&self, reader: R) -> SdkResult<(Heap, Value)> {
        Ok(tangle_json::from_reader(&self.registry, reader)?)
    }

    // ---- XML ----

    pub fn to_xml_string(&self, heap: &Heap, root: &Value) -> SdkResult<String> {
        Ok(tangle_xml::dumps(&self.registry, heap, root)?)
    }

    pub fn from_xml_str(&self, xml: &str) -> SdkResult<(Heap, Value)> {
        Ok(tangle_xml::loads(&self.registry, xml)?)
    }

    pub fn to_xml_writer<W: Write>(&self, heap: &Heap, root: &Value, writer: W) -> SdkResult<()> {
        Ok(tangle_xml::to_writer(&self.registry, heap, root, writer)?)
    }

    pub fn from_xml_reader<R: Read>(&self, reader: R) -> SdkResult<(Heap, Value)> {
        Ok(tangle_xml::from_reader(&self.registry, reader)?)
    }

    // ---- Binary ----

    pub fn to_bytes(&self, heap: &Heap, root: &Value) -> SdkResult<Vec<u8>> {
        let marshalled = self.marshal(heap, root)?;
        let bytes = binary::to_bytes(&marshalled)?;
        debug!(records = marshalled.records.len(), bytes = bytes.len(), "wrote binary");
        Ok(bytes)
    }

    pub fn from_bytes(&self, data: &[u8]) -> SdkResult<(Heap, Value)> {
        let marshalled = binary::from_bytes(data)?;
        self.unmarshal(&marshalled)
    }

    // ---- SQLite ----

    /// Store the graph in one transaction and return its root item id.
    pub fn store_sql(&self, heap: &Heap, root: &Value, conn: &mut Connection) -> SdkResult<i64> {
        let tx = conn.transaction()?;
        tangle_sql::create_tables(&tx)?;
        let item_id = tangle_sql::marshal(&self.registry, heap, root, &tx)?;
        tx.commit()?;
        debug!(item_id, "stored graph in sqlite");
        Ok(item_id)
    }

    pub fn load_sql(&self, conn: &Connection, item_id: i64) -> SdkResult<(Heap, Value)> {
        Ok(tangle_sql::unmarshal(&self.registry, conn, item_id)?)
    }

    // ---- Calls ----

    /// Call a function, class, or bound member held in `heap`.
    pub fn invoke(&self, heap: &mut Heap, callee: Handle, args: &[Value]) -> SdkResult<Value> {
        Ok(tangle_registry::invoke(&self.registry, heap, callee, args)?)
    }
}
