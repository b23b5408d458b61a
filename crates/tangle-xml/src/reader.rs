//! Parsing an XML document into a [`Marshalled`] stream.
//!
//! The reader is a small recursive-descent parser over quick-xml pull
//! events. Whitespace between elements is ignored; text inside a
//! `primitive` element is kept exactly.

use std::collections::HashMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tangle_types::{
    BoundRef, Encoded, MarshalError, Marshalled, Record, RecordId, RecordItems, TypeTag,
};

use crate::error::XmlResult;
use crate::layout::*;

/// Parse an XML document into a stream.
pub fn from_xml(text: &str) -> XmlResult<Marshalled> {
    let mut parser = Parser {
        reader: Reader::from_str(text),
    };
    parser.document()
}

enum Node<'x> {
    Open(BytesStart<'x>),
    Empty(BytesStart<'x>),
    Close(String),
    Eof,
}

struct Parser<'x> {
    reader: Reader<&'x [u8]>,
}

impl<'x> Parser<'x> {
    fn document(&mut self) -> XmlResult<Marshalled> {
        let version = match self.next()? {
            Node::Open(start) if is(&start, DOCUMENT) => attributes(&start)?
                .remove(VERSION)
                .ok_or_else(|| malformed("document has no version"))?,
            _ => return Err(malformed("expected a <tangle> document").into()),
        };

        let mut records = Vec::new();
        let root = loop {
            match self.next()? {
                Node::Open(start) if is(&start, RECORD) => records.push(self.record(&start, false)?),
                Node::Empty(start) if is(&start, RECORD) => records.push(self.record(&start, true)?),
                Node::Open(start) if is(&start, ROOT) => {
                    let root = self.value()?;
                    self.close(ROOT)?;
                    break root;
                }
                _ => return Err(malformed("expected <record> or <root>").into()),
            }
        };
        self.close(DOCUMENT)?;
        match self.next()? {
            Node::Eof => Ok(Marshalled {
                version,
                records,
                root,
            }),
            _ => Err(malformed("data after the document").into()),
        }
    }

    fn record(&mut self, start: &BytesStart<'_>, empty: bool) -> XmlResult<Record> {
        let mut attrs = attributes(start)?;
        let id = attrs
            .remove(ID)
            .ok_or_else(|| malformed("record has no id"))
            .and_then(|id| record_id(&id))?;
        let tag = attrs.remove(TAG).map(|t| TypeTag::parse(&t)).transpose()?;
        let selector = attrs.remove(ATTRIBUTE);
        let immutable = match attrs.remove(IMMUTABLE).as_deref() {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => {
                return Err(malformed(format!("record {id}: bad immutable flag {other:?}")).into())
            }
        };

        let mut record = Record {
            id,
            tag,
            items: None,
            fields: None,
            bound: None,
            immutable,
        };
        let mut instance = None;

        if !empty {
            loop {
                match self.next()? {
                    Node::Close(name) if name == RECORD => break,
                    Node::Open(child) if is(&child, INSTANCE) => {
                        match self.value()? {
                            Encoded::Ref(target) => instance = Some(target),
                            _ => {
                                return Err(malformed(format!(
                                    "record {id}: instance must be a reference"
                                ))
                                .into())
                            }
                        }
                        self.close(INSTANCE)?;
                    }
                    Node::Open(child) if is(&child, ITEMS) => {
                        record.items = Some(self.items()?);
                        self.close(ITEMS)?;
                    }
                    Node::Empty(child) if is(&child, FIELDS) => record.fields = Some(Vec::new()),
                    Node::Open(child) if is(&child, FIELDS) => record.fields = Some(self.fields()?),
                    _ => return Err(malformed(format!("record {id}: unexpected element")).into()),
                }
            }
        }

        record.bound = match (instance, selector) {
            (None, None) => None,
            (Some(instance), Some(selector)) => Some(BoundRef { instance, selector }),
            _ => {
                return Err(malformed(format!(
                    "record {id}: instance and attribute must appear together"
                ))
                .into())
            }
        };
        Ok(record)
    }

    fn items(&mut self) -> XmlResult<RecordItems> {
        match self.next()? {
            Node::Empty(start) if is(&start, LIST) => Ok(RecordItems::Sequence(Vec::new())),
            Node::Empty(start) if is(&start, MAP) => Ok(RecordItems::Mapping(Vec::new())),
            Node::Open(start) if is(&start, LIST) => {
                let mut values = Vec::new();
                loop {
                    match self.next()? {
                        Node::Close(name) if name == LIST => break,
                        Node::Open(item) if is(&item, ITEM) => {
                            values.push(self.value()?);
                            self.close(ITEM)?;
                        }
                        _ => return Err(malformed("expected <item>").into()),
                    }
                }
                Ok(RecordItems::Sequence(values))
            }
            Node::Open(start) if is(&start, MAP) => {
                let mut entries = Vec::new();
                loop {
                    match self.next()? {
                        Node::Close(name) if name == MAP => break,
                        Node::Open(entry) if is(&entry, ENTRY) => {
                            self.open(KEY)?;
                            let key = self.value()?;
                            self.close(KEY)?;
                            self.open(VALUE)?;
                            let value = self.value()?;
                            self.close(VALUE)?;
                            self.close(ENTRY)?;
                            entries.push((key, value));
                        }
                        _ => return Err(malformed("expected <entry>").into()),
                    }
                }
                Ok(RecordItems::Mapping(entries))
            }
            _ => Err(malformed("expected <list> or <map>").into()),
        }
    }

    fn fields(&mut self) -> XmlResult<Vec<(String, Encoded)>> {
        let mut fields = Vec::new();
        loop {
            match self.next()? {
                Node::Close(name) if name == FIELDS => return Ok(fields),
                Node::Open(field) if is(&field, FIELD) => {
                    let name = attributes(&field)?
                        .remove(NAME)
                        .ok_or_else(|| malformed("field has no name"))?;
                    let value = self.value()?;
                    self.close(FIELD)?;
                    fields.push((name, value));
                }
                _ => return Err(malformed("expected <field>").into()),
            }
        }
    }

    fn value(&mut self) -> XmlResult<Encoded> {
        match self.next()? {
            Node::Empty(start) if is(&start, REFERENCE) => reference(&start),
            Node::Open(start) if is(&start, REFERENCE) => {
                let value = reference(&start)?;
                self.close(REFERENCE)?;
                Ok(value)
            }
            Node::Empty(start) if is(&start, PRIMITIVE) => primitive(&start, String::new()),
            Node::Open(start) if is(&start, PRIMITIVE) => {
                let text = self.text(PRIMITIVE)?;
                primitive(&start, text)
            }
            _ => Err(malformed("expected <reference> or <primitive>").into()),
        }
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// The next structural event, skipping whitespace and markup noise.
    fn next(&mut self) -> XmlResult<Node<'x>> {
        loop {
            match self.reader.read_event()? {
                Event::Start(start) => return Ok(Node::Open(start)),
                Event::Empty(start) => return Ok(Node::Empty(start)),
                Event::End(end) => {
                    return Ok(Node::Close(
                        String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    ))
                }
                Event::Eof => return Ok(Node::Eof),
                Event::Text(text) => {
                    if !text.unescape()?.trim().is_empty() {
                        return Err(malformed("unexpected text between elements").into());
                    }
                }
                Event::CData(_) => {
                    return Err(malformed("unexpected CDATA between elements").into())
                }
                _ => {}
            }
        }
    }

    /// Collect text content up to the end of `name`.
    fn text(&mut self, name: &str) -> XmlResult<String> {
        let mut out = String::new();
        loop {
            match self.reader.read_event()? {
                Event::Text(text) => out.push_str(&text.unescape()?),
                Event::CData(data) => out.push_str(&String::from_utf8_lossy(&data.into_inner())),
                Event::End(end) if end.name().as_ref() == name.as_bytes() => return Ok(out),
                Event::Comment(_) => {}
                _ => return Err(malformed(format!("unexpected markup inside <{name}>")).into()),
            }
        }
    }

    fn open(&mut self, name: &str) -> XmlResult<()> {
        match self.next()? {
            Node::Open(start) if is(&start, name) => Ok(()),
            _ => Err(malformed(format!("expected <{name}>")).into()),
        }
    }

    fn close(&mut self, name: &str) -> XmlResult<()> {
        match self.next()? {
            Node::Close(found) if found == name => Ok(()),
            _ => Err(malformed(format!("expected </{name}>")).into()),
        }
    }
}

fn is(start: &BytesStart<'_>, name: &str) -> bool {
    start.name().as_ref() == name.as_bytes()
}

fn attributes(start: &BytesStart<'_>) -> XmlResult<HashMap<String, String>> {
    let mut out = HashMap::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        out.insert(key, attr.unescape_value()?.into_owned());
    }
    Ok(out)
}

fn reference(start: &BytesStart<'_>) -> XmlResult<Encoded> {
    let id = attributes(start)?
        .remove(ID)
        .ok_or_else(|| malformed("reference has no id"))?;
    Ok(Encoded::Ref(record_id(&id)?))
}

fn primitive(start: &BytesStart<'_>, text: String) -> XmlResult<Encoded> {
    let kind = attributes(start)?
        .remove(TYPE)
        .ok_or_else(|| malformed("primitive has no type"))?;
    Ok(match kind.as_str() {
        NULL_TYPE if text.is_empty() => Encoded::Null,
        NULL_TYPE => return Err(invalid(&text, "null").into()),
        BOOL_TYPE => match text.as_str() {
            "true" => Encoded::Bool(true),
            "false" => Encoded::Bool(false),
            _ => return Err(invalid(&text, "bool").into()),
        },
        INT_TYPE => Encoded::Int(text.parse().map_err(|_| invalid(&text, "int"))?),
        FLOAT_TYPE => Encoded::Float(text.parse().map_err(|_| invalid(&text, "float"))?),
        TEXT_TYPE => Encoded::Text(text),
        other => return Err(malformed(format!("unknown primitive type {other:?}")).into()),
    })
}

fn invalid(text: &str, what: &str) -> MarshalError {
    malformed(format!("{text:?} is not a valid {what}"))
}

fn record_id(text: &str) -> Result<RecordId, MarshalError> {
    text.parse::<u64>()
        .map(RecordId::new)
        .map_err(|_| malformed(format!("{text:?} is not a record id")))
}

fn malformed(reason: impl Into<String>) -> MarshalError {
    MarshalError::malformed(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::XmlError;
    use crate::writer::to_xml;
    use tangle_types::Builtin;

    fn sample() -> Marshalled {
        let mut list = Record::header(RecordId::new(1), TypeTag::builtin(Builtin::List));
        list.items = Some(RecordItems::Sequence(vec![
            Encoded::Null,
            Encoded::Bool(false),
            Encoded::Int(-4),
            Encoded::Float(0.1),
            Encoded::Float(2.0),
            Encoded::Text(String::new()),
            Encoded::Text("  padded & <quoted> \"text\"  ".into()),
            Encoded::Ref(RecordId::new(2)),
        ]));
        list.fields = Some(vec![]);

        let mut map = Record::header(RecordId::new(2), TypeTag::builtin(Builtin::Map));
        map.items = Some(RecordItems::Mapping(vec![(
            Encoded::Ref(RecordId::new(1)),
            Encoded::Text("back".into()),
        )]));
        map.fields = Some(vec![("note".into(), Encoded::Int(3))]);

        let tuple = Record {
            items: Some(RecordItems::Mapping(vec![])),
            fields: Some(vec![]),
            immutable: true,
            ..Record::header(RecordId::new(3), TypeTag::builtin(Builtin::Tuple))
        };
        let class = Record::header(RecordId::new(4), TypeTag::builtin(Builtin::Deque));
        let bound = Record::bound(
            RecordId::new(5),
            BoundRef {
                instance: RecordId::new(1),
                selector: "append".into(),
            },
        );
        Marshalled::new(
            vec![list, map, tuple, class, bound],
            Encoded::Ref(RecordId::new(1)),
        )
    }

    #[test]
    fn written_documents_read_back() {
        let m = sample();
        let xml = to_xml(&m).unwrap();
        assert_eq!(from_xml(&xml).unwrap(), m);
    }

    #[test]
    fn whitespace_between_elements_is_ignored() {
        let xml = r#"
            <tangle version="@tangle:1@">
              <record id="1" tag="core/list">
                <items>
                  <list>
                    <item><primitive type="text"> spaced </primitive></item>
                  </list>
                </items>
                <fields/>
              </record>
              <root><reference id="1"/></root>
            </tangle>
        "#;
        let m = from_xml(xml).unwrap();
        assert_eq!(
            m.records[0].items,
            Some(RecordItems::Sequence(vec![Encoded::Text(" spaced ".into())]))
        );
    }

    #[test]
    fn scalar_root() {
        let xml = r#"<tangle version="@tangle:1@"><root><primitive type="float">1.5</primitive></root></tangle>"#;
        assert_eq!(from_xml(xml).unwrap().root, Encoded::Float(1.5));
    }

    #[test]
    fn malformed_documents() {
        let cases = [
            r#"<other/>"#,
            r#"<tangle><root><primitive type="null"/></root></tangle>"#,
            r#"<tangle version="v"><record tag="core/list"/><root><primitive type="null"/></root></tangle>"#,
            r#"<tangle version="v"><root><primitive type="int">x</primitive></root></tangle>"#,
            r#"<tangle version="v"><root><primitive type="blob">x</primitive></root></tangle>"#,
            r#"<tangle version="v"><record id="1" attribute="f"/><root><primitive type="null"/></root></tangle>"#,
            r#"<tangle version="v"><root><primitive type="null"/></root></tangle><extra/>"#,
            r#"<tangle version="v">stray<root><primitive type="null"/></root></tangle>"#,
        ];
        for case in cases {
            let err = from_xml(case).unwrap_err();
            assert!(
                matches!(err, XmlError::Marshal(MarshalError::MalformedInput(_))),
                "{case}: {err}"
            );
        }
    }
}
