//! Rendering a [`Marshalled`] stream as XML.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tangle_types::{Encoded, MarshalError, Marshalled, Record, RecordItems};

use crate::error::XmlResult;
use crate::layout::*;

type Out = Writer<Vec<u8>>;

/// Render a stream as an XML document.
pub fn to_xml(marshalled: &Marshalled) -> XmlResult<String> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Start(
        BytesStart::new(DOCUMENT).with_attributes([(VERSION, marshalled.version.as_str())]),
    ))?;
    for record in &marshalled.records {
        write_record(&mut w, record)?;
    }
    open(&mut w, ROOT)?;
    write_value(&mut w, &marshalled.root)?;
    close(&mut w, ROOT)?;
    close(&mut w, DOCUMENT)?;

    let text = String::from_utf8(w.into_inner())
        .map_err(|e| MarshalError::malformed(format!("writer produced invalid utf-8: {e}")))?;
    Ok(text)
}

fn write_record(w: &mut Out, record: &Record) -> XmlResult<()> {
    let id = record.id.to_string();
    let mut start = BytesStart::new(RECORD).with_attributes([(ID, id.as_str())]);
    if let Some(tag) = &record.tag {
        start.push_attribute((TAG, tag.as_str()));
    }
    if let Some(bound) = &record.bound {
        start.push_attribute((ATTRIBUTE, bound.selector.as_str()));
    }
    if record.immutable {
        start.push_attribute((IMMUTABLE, "true"));
    }

    if record.bound.is_none() && record.items.is_none() && record.fields.is_none() {
        w.write_event(Event::Empty(start))?;
        return Ok(());
    }
    w.write_event(Event::Start(start))?;

    if let Some(bound) = &record.bound {
        open(w, INSTANCE)?;
        write_value(w, &Encoded::Ref(bound.instance))?;
        close(w, INSTANCE)?;
    }

    match &record.items {
        Some(RecordItems::Sequence(values)) => {
            open(w, ITEMS)?;
            if values.is_empty() {
                empty(w, LIST)?;
            } else {
                open(w, LIST)?;
                for value in values {
                    open(w, ITEM)?;
                    write_value(w, value)?;
                    close(w, ITEM)?;
                }
                close(w, LIST)?;
            }
            close(w, ITEMS)?;
        }
        Some(RecordItems::Mapping(entries)) => {
            open(w, ITEMS)?;
            if entries.is_empty() {
                empty(w, MAP)?;
            } else {
                open(w, MAP)?;
                for (key, value) in entries {
                    open(w, ENTRY)?;
                    open(w, KEY)?;
                    write_value(w, key)?;
                    close(w, KEY)?;
                    open(w, VALUE)?;
                    write_value(w, value)?;
                    close(w, VALUE)?;
                    close(w, ENTRY)?;
                }
                close(w, MAP)?;
            }
            close(w, ITEMS)?;
        }
        None => {}
    }

    match &record.fields {
        Some(fields) if fields.is_empty() => empty(w, FIELDS)?,
        Some(fields) => {
            open(w, FIELDS)?;
            for (name, value) in fields {
                w.write_event(Event::Start(
                    BytesStart::new(FIELD).with_attributes([(NAME, name.as_str())]),
                ))?;
                write_value(w, value)?;
                close(w, FIELD)?;
            }
            close(w, FIELDS)?;
        }
        None => {}
    }

    close(w, RECORD)
}

fn write_value(w: &mut Out, value: &Encoded) -> XmlResult<()> {
    let (kind, text) = match value {
        Encoded::Ref(id) => {
            let id = id.to_string();
            w.write_event(Event::Empty(
                BytesStart::new(REFERENCE).with_attributes([(ID, id.as_str())]),
            ))?;
            return Ok(());
        }
        Encoded::Null => {
            w.write_event(Event::Empty(
                BytesStart::new(PRIMITIVE).with_attributes([(TYPE, NULL_TYPE)]),
            ))?;
            return Ok(());
        }
        Encoded::Bool(b) => (BOOL_TYPE, b.to_string()),
        Encoded::Int(i) => (INT_TYPE, i.to_string()),
        Encoded::Float(f) => (FLOAT_TYPE, f.to_string()),
        Encoded::Text(s) => (TEXT_TYPE, s.clone()),
    };
    w.write_event(Event::Start(
        BytesStart::new(PRIMITIVE).with_attributes([(TYPE, kind)]),
    ))?;
    if !text.is_empty() {
        w.write_event(Event::Text(BytesText::new(&text)))?;
    }
    close(w, PRIMITIVE)
}

fn open(w: &mut Out, name: &str) -> XmlResult<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close(w: &mut Out, name: &str) -> XmlResult<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn empty(w: &mut Out, name: &str) -> XmlResult<()> {
    w.write_event(Event::Empty(BytesStart::new(name)))?;
    Ok(())
}
