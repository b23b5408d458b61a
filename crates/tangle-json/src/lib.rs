//! JSON adapter for Tangle.
//!
//! References are written as `"<@N@>"` strings, so sessions run with
//! [`TextPolicy::EscapeReferenceTokens`](tangle_engine::TextPolicy) and text
//! that looks like a token is escaped on the way out.
//!
//! # Key Types
//!
//! - [`dumps`] / [`loads`] — graph to JSON text and back
//! - [`to_writer`] / [`from_reader`] — graph to any byte stream and back
//! - [`to_json`] / [`from_json`] — [`Marshalled`] to a JSON document and back
//! - [`JsonOptions`] — writer options

pub mod codec;
pub mod error;

pub use codec::{from_json, to_json};
pub use error::{JsonError, JsonResult};

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tangle_engine::{decode, encode, EngineConfig};
use tangle_registry::TypeResolver;
use tangle_types::{Heap, Marshalled, Value};
use tracing::debug;

/// Options for writing JSON.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonOptions {
    /// Indent the output.
    pub pretty: bool,
}

impl JsonOptions {
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

/// Engine configuration used by this adapter.
pub fn engine_config() -> EngineConfig {
    EngineConfig::for_text_adapter()
}

/// Serialize a stream as JSON text.
pub fn write_str(marshalled: &Marshalled, options: &JsonOptions) -> JsonResult<String> {
    let json = to_json(marshalled)?;
    let text = if options.pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    debug!(records = marshalled.records.len(), bytes = text.len(), "wrote json");
    Ok(text)
}

/// Parse JSON text into a stream.
pub fn read_str(text: &str) -> JsonResult<Marshalled> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    from_json(&json)
}

/// Serialize a stream as JSON into `writer`.
pub fn write_to<W: Write>(
    marshalled: &Marshalled,
    options: &JsonOptions,
    mut writer: W,
) -> JsonResult<()> {
    let json = to_json(marshalled)?;
    if options.pretty {
        serde_json::to_writer_pretty(&mut writer, &json).map_err(JsonError::from_serde)?;
    } else {
        serde_json::to_writer(&mut writer, &json).map_err(JsonError::from_serde)?;
    }
    writer.flush()?;
    debug!(records = marshalled.records.len(), "wrote json");
    Ok(())
}

/// Parse JSON from `reader` into a stream.
pub fn read_from<R: Read>(reader: R) -> JsonResult<Marshalled> {
    let json: serde_json::Value =
        serde_json::from_reader(reader).map_err(JsonError::from_serde)?;
    from_json(&json)
}

/// Encode the graph reachable from `root` as JSON text.
pub fn dumps(
    resolver: &dyn TypeResolver,
    heap: &Heap,
    root: &Value,
    options: &JsonOptions,
) -> JsonResult<String> {
    let marshalled = encode(resolver, heap, root, &engine_config())?;
    write_str(&marshalled, options)
}

/// Decode JSON text produced by [`dumps`].
pub fn loads(resolver: &dyn TypeResolver, text: &str) -> JsonResult<(Heap, Value)> {
    let marshalled = read_str(text)?;
    Ok(decode(resolver, &marshalled, &engine_config())?)
}

/// Encode the graph reachable from `root` as JSON into `writer`.
pub fn to_writer<W: Write>(
    resolver: &dyn TypeResolver,
    heap: &Heap,
    root: &Value,
    options: &JsonOptions,
    writer: W,
) -> JsonResult<()> {
    let marshalled = encode(resolver, heap, root, &engine_config())?;
    write_to(&marshalled, options, writer)
}

/// Decode JSON read from `reader`, as written by [`to_writer`] or [`dumps`].
pub fn from_reader<R: Read>(
    resolver: &dyn TypeResolver,
    reader: R,
) -> JsonResult<(Heap, Value)> {
    let marshalled = read_from(reader)?;
    Ok(decode(resolver, &marshalled, &engine_config())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tangle_registry::TypeRegistry;
    use tangle_types::{graph_eq, MarshalError, RecordId};

    #[test]
    fn cyclic_graph_roundtrip() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let a = heap.list(vec![1.into(), 2.5.into(), "x".into(), Value::Null, true.into()]);
        let m = heap.map(vec![(Value::Ref(a), Value::Ref(a))]);
        heap.push(a, Value::Ref(m)).unwrap();
        let root = Value::Ref(a);

        let text = dumps(&r, &heap, &root, &JsonOptions::default()).unwrap();
        let (decoded, back) = loads(&r, &text).unwrap();
        assert!(graph_eq(&heap, &root, &decoded, &back));
    }

    #[test]
    fn token_text_is_escaped_on_the_wire() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let l = heap.list(vec!["<@1@>".into(), "<".into()]);
        let root = Value::Ref(l);

        let text = dumps(&r, &heap, &root, &JsonOptions::default()).unwrap();
        assert!(text.contains(r#""<<@1@>""#), "{text}");
        let (decoded, back) = loads(&r, &text).unwrap();
        let items = decoded.sequence(back.handle().unwrap()).unwrap();
        assert_eq!(items, &[Value::from("<@1@>"), Value::from("<")]);
    }

    #[test]
    fn pretty_output_parses() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let t = heap.tuple(vec![1.into()]);
        let text = dumps(&r, &heap, &Value::Ref(t), &JsonOptions::pretty()).unwrap();
        assert!(text.contains('\n'));
        assert!(loads(&r, &text).is_ok());
    }

    #[test]
    fn wrong_sentinel_is_malformed() {
        let r = TypeRegistry::with_builtins();
        let err = loads(&r, r#"["@pickle:1@", [], null]"#).unwrap_err();
        assert!(matches!(err, JsonError::Marshal(MarshalError::MalformedInput(_))));
    }

    #[test]
    fn dangling_reference_is_reported() {
        let r = TypeRegistry::with_builtins();
        let err = loads(&r, r#"["@tangle:1@", [], "<@3@>"]"#).unwrap_err();
        assert!(matches!(
            err,
            JsonError::Marshal(MarshalError::DanglingReference(id)) if id == RecordId::new(3)
        ));
    }

    #[test]
    fn invalid_json_is_a_syntax_error() {
        let r = TypeRegistry::with_builtins();
        assert!(matches!(loads(&r, "[1, 2"), Err(JsonError::Syntax(_))));
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn writer_and_reader_roundtrip() {
        let r = TypeRegistry::with_builtins();
        let mut heap = Heap::new();
        let a = heap.list(vec!["<@1@>".into(), 3.into()]);
        heap.push(a, Value::Ref(a)).unwrap();
        let root = Value::Ref(a);

        let mut buf = Vec::new();
        to_writer(&r, &heap, &root, &JsonOptions::pretty(), &mut buf).unwrap();
        let text = dumps(&r, &heap, &root, &JsonOptions::pretty()).unwrap();
        assert_eq!(buf, text.as_bytes());

        let (decoded, back) = from_reader(&r, buf.as_slice()).unwrap();
        assert!(graph_eq(&heap, &root, &decoded, &back));
    }

    #[test]
    fn transport_failures_are_io_errors() {
        let r = TypeRegistry::with_builtins();
        let heap = Heap::new();
        assert!(matches!(
            to_writer(&r, &heap, &Value::Int(1), &JsonOptions::default(), Broken),
            Err(JsonError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe
        ));
        assert!(matches!(from_reader(&r, Broken), Err(JsonError::Io(_))));
        assert!(matches!(from_reader(&r, &b"[1,"[..]), Err(JsonError::Syntax(_))));
    }
}
