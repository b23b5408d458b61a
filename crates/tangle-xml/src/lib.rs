//! XML adapter for Tangle.
//!
//! References and text are distinct elements in this format, so sessions
//! run with [`TextPolicy::Verbatim`](tangle_engine::TextPolicy).
//!
//! ```text
//! <tangle version="@tangle:1@">
//!   <record id="1" tag="core/list">
//!     <items><list><item><reference id="1"/></item></list></items>
//!     <fields/>
//!   </record>
//!   <root><reference id="1"/></root>
//! </tangle>
//! ```

pub mod error;
mod layout;
pub mod reader;
pub mod writer;

pub use error::{XmlError, XmlResult};
pub use reader::from_xml;
pub use writer::to_xml;

use std::io::{Read, Write};

use tangle_engine::{decode, encode, EngineConfig};
use tangle_registry::TypeResolver;
use tangle_types::{Heap, Value};
use tracing::debug;

/// Engine configuration used by this adapter.
pub fn engine_config() -> EngineConfig {
    EngineConfig::default()
}

/// Encode the graph reachable from `root` as an XML document.
pub fn dumps(resolver: &dyn TypeResolver, heap: &Heap, root: &Value) -> XmlResult<String> {
    let marshalled = encode(resolver, heap, root, &engine_config())?;
    let xml = to_xml(&marshalled)?;
    debug!(records = marshalled.records.len(), bytes = xml.len(), "wrote xml");
    Ok(xml)
}

/// Decode an XML document produced by [`dumps`].
pub fn loads(resolver: &dyn TypeResolver, xml: &str) -> XmlResult<(Heap, Value)> {
    let marshalled = from_xml(xml)?;
    Ok(decode(resolver, &marshalled, &engine_config())?)
}

/// Encode the graph reachable from `root` as XML into `writer`.
pub fn to_writer<W: Write>(
    resolver: &dyn TypeResolver,
    heap: &Heap,
    root: &Value,
    mut writer: W,
) -> XmlResult<()> {
    let xml = dumps(resolver, heap, root)?;
    writer.write_all(xml.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Decode an XML document read from `reader`.
pub fn from_reader<R: Read>(
    resolver: &dyn TypeResolver,
    mut reader: R,
) -> XmlResult<(Heap, Value)> {
    let mut xml = String::new();
    reader.read_to_string(&mut xml)?;
    loads(resolver, &xml)
}
