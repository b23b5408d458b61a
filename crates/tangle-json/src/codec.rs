//! Mapping between [`Marshalled`] and JSON.
//!
//! A stream is a three-element array:
//!
//! ```text
//! ["@tangle:1@", [record, ...], root]
//! ```
//!
//! Each record is an object keyed by short `@` names. References are the
//! strings `"<@N@>"`; the engine escapes any text that could be mistaken
//! for one before it reaches this module.

use serde_json::{Map, Number, Value as Json};
use tangle_types::{
    parse_reference_token, reference_token, BoundRef, Encoded, MarshalError, MarshalResult,
    Marshalled, Record, RecordId, RecordItems, TypeTag,
};

use crate::error::{JsonError, JsonResult};

pub const ID_KEY: &str = "@id";
pub const TAG_KEY: &str = "@t";
pub const ITEMS_KEY: &str = "@i";
pub const MAPPING_KEY: &str = "@m";
pub const FIELDS_KEY: &str = "@f";
pub const INSTANCE_KEY: &str = "@o";
pub const ATTRIBUTE_KEY: &str = "@a";
pub const IMMUTABLE_KEY: &str = "@x";

const RECORD_KEYS: [&str; 8] = [
    ID_KEY,
    TAG_KEY,
    ITEMS_KEY,
    MAPPING_KEY,
    FIELDS_KEY,
    INSTANCE_KEY,
    ATTRIBUTE_KEY,
    IMMUTABLE_KEY,
];

// ---------------------------------------------------------------
// Writing
// ---------------------------------------------------------------

/// Render a stream as a JSON document.
pub fn to_json(marshalled: &Marshalled) -> JsonResult<Json> {
    let records = marshalled
        .records
        .iter()
        .map(record_to_json)
        .collect::<JsonResult<Vec<_>>>()?;
    Ok(Json::Array(vec![
        Json::String(marshalled.version.clone()),
        Json::Array(records),
        encoded_to_json(&marshalled.root)?,
    ]))
}

fn record_to_json(record: &Record) -> JsonResult<Json> {
    let mut obj = Map::new();
    obj.insert(ID_KEY.into(), Json::from(record.id.get()));
    if let Some(tag) = &record.tag {
        obj.insert(TAG_KEY.into(), Json::String(tag.to_string()));
    }
    if let Some(bound) = &record.bound {
        obj.insert(INSTANCE_KEY.into(), Json::String(reference_token(bound.instance)));
        obj.insert(ATTRIBUTE_KEY.into(), Json::String(bound.selector.clone()));
    }
    match &record.items {
        Some(RecordItems::Sequence(values)) => {
            let values = values
                .iter()
                .map(encoded_to_json)
                .collect::<JsonResult<Vec<_>>>()?;
            obj.insert(ITEMS_KEY.into(), Json::Array(values));
        }
        Some(RecordItems::Mapping(entries)) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                pairs.push(Json::Array(vec![encoded_to_json(k)?, encoded_to_json(v)?]));
            }
            obj.insert(MAPPING_KEY.into(), Json::Array(pairs));
        }
        None => {}
    }
    if let Some(fields) = &record.fields {
        let mut out = Map::new();
        for (name, value) in fields {
            out.insert(name.clone(), encoded_to_json(value)?);
        }
        obj.insert(FIELDS_KEY.into(), Json::Object(out));
    }
    if record.immutable {
        obj.insert(IMMUTABLE_KEY.into(), Json::Bool(true));
    }
    Ok(Json::Object(obj))
}

fn encoded_to_json(encoded: &Encoded) -> JsonResult<Json> {
    Ok(match encoded {
        Encoded::Null => Json::Null,
        Encoded::Bool(b) => Json::Bool(*b),
        Encoded::Int(i) => Json::from(*i),
        Encoded::Float(f) => {
            Json::Number(Number::from_f64(*f).ok_or(JsonError::NonFiniteFloat(*f))?)
        }
        Encoded::Text(s) => Json::String(s.clone()),
        Encoded::Ref(id) => Json::String(reference_token(*id)),
    })
}

// ---------------------------------------------------------------
// Reading
// ---------------------------------------------------------------

/// Parse a JSON document into a stream.
pub fn from_json(json: &Json) -> JsonResult<Marshalled> {
    let parts = json
        .as_array()
        .ok_or_else(|| MarshalError::malformed("top level must be an array"))?;
    let [version, records, root] = parts.as_slice() else {
        return Err(MarshalError::malformed(format!(
            "expected [sentinel, records, root], found {} element(s)",
            parts.len()
        ))
        .into());
    };
    let version = version
        .as_str()
        .ok_or_else(|| MarshalError::malformed("sentinel must be a string"))?
        .to_string();
    let records = array(records, "records")?
        .iter()
        .map(record_from_json)
        .collect::<MarshalResult<Vec<_>>>()?;
    let root = encoded_from_json(root)?;
    Ok(Marshalled {
        version,
        records,
        root,
    })
}

fn record_from_json(json: &Json) -> MarshalResult<Record> {
    let obj = json
        .as_object()
        .ok_or_else(|| MarshalError::malformed("record must be an object"))?;
    if let Some(unknown) = obj.keys().find(|k| !RECORD_KEYS.contains(&k.as_str())) {
        return Err(MarshalError::malformed(format!("unknown record key {unknown:?}")));
    }

    let id = obj
        .get(ID_KEY)
        .and_then(Json::as_u64)
        .map(RecordId::new)
        .ok_or_else(|| MarshalError::malformed("record without a numeric @id"))?;

    let tag = match obj.get(TAG_KEY) {
        Some(tag) => Some(TypeTag::parse(text(tag, TAG_KEY)?)?),
        None => None,
    };

    let bound = match (obj.get(INSTANCE_KEY), obj.get(ATTRIBUTE_KEY)) {
        (None, None) => None,
        (Some(instance), Some(selector)) => Some(BoundRef {
            instance: parse_reference_token(text(instance, INSTANCE_KEY)?).ok_or_else(|| {
                MarshalError::malformed(format!("record {id}: @o must be a reference token"))
            })?,
            selector: text(selector, ATTRIBUTE_KEY)?.to_string(),
        }),
        _ => {
            return Err(MarshalError::malformed(format!(
                "record {id}: @o and @a must appear together"
            )))
        }
    };

    let items = match (obj.get(ITEMS_KEY), obj.get(MAPPING_KEY)) {
        (None, None) => None,
        (Some(values), None) => Some(RecordItems::Sequence(
            array(values, ITEMS_KEY)?
                .iter()
                .map(encoded_from_json)
                .collect::<MarshalResult<_>>()?,
        )),
        (None, Some(entries)) => Some(RecordItems::Mapping(
            array(entries, MAPPING_KEY)?
                .iter()
                .map(pair_from_json)
                .collect::<MarshalResult<_>>()?,
        )),
        (Some(_), Some(_)) => {
            return Err(MarshalError::malformed(format!(
                "record {id} has both sequence and mapping items"
            )))
        }
    };

    let fields = match obj.get(FIELDS_KEY) {
        Some(Json::Object(map)) => Some(
            map.iter()
                .map(|(name, value)| Ok((name.clone(), encoded_from_json(value)?)))
                .collect::<MarshalResult<Vec<_>>>()?,
        ),
        Some(_) => {
            return Err(MarshalError::malformed(format!(
                "record {id}: @f must be an object"
            )))
        }
        None => None,
    };

    let immutable = match obj.get(IMMUTABLE_KEY) {
        Some(Json::Bool(flag)) => *flag,
        Some(_) => {
            return Err(MarshalError::malformed(format!(
                "record {id}: @x must be a boolean"
            )))
        }
        None => false,
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

fn pair_from_json(json: &Json) -> MarshalResult<(Encoded, Encoded)> {
    match json.as_array().map(Vec::as_slice) {
        Some([key, value]) => Ok((encoded_from_json(key)?, encoded_from_json(value)?)),
        _ => Err(MarshalError::malformed("mapping entries must be [key, value] pairs")),
    }
}

fn encoded_from_json(json: &Json) -> MarshalResult<Encoded> {
    Ok(match json {
        Json::Null => Encoded::Null,
        Json::Bool(b) => Encoded::Bool(*b),
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Encoded::Int(i),
            _ if n.is_u64() => {
                return Err(MarshalError::malformed(format!("integer {n} out of range")))
            }
            (None, Some(f)) => Encoded::Float(f),
            (None, None) => return Err(MarshalError::malformed(format!("unreadable number {n}"))),
        },
        Json::String(s) => match parse_reference_token(s) {
            Some(id) => Encoded::Ref(id),
            None => Encoded::Text(s.clone()),
        },
        Json::Array(_) | Json::Object(_) => {
            return Err(MarshalError::malformed(
                "composite values must be written as reference tokens",
            ))
        }
    })
}

fn array<'j>(json: &'j Json, what: &str) -> MarshalResult<&'j Vec<Json>> {
    json.as_array()
        .ok_or_else(|| MarshalError::malformed(format!("{what} must be an array")))
}

fn text<'j>(json: &'j Json, what: &str) -> MarshalResult<&'j str> {
    json.as_str()
        .ok_or_else(|| MarshalError::malformed(format!("{what} must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_types::Builtin;
    use serde_json::json;

    #[test]
    fn layout_of_self_referencing_list() {
        let mut list = Record::header(RecordId::new(1), TypeTag::builtin(Builtin::List));
        list.items = Some(RecordItems::Sequence(vec![
            Encoded::Int(1),
            Encoded::Ref(RecordId::new(1)),
        ]));
        list.fields = Some(vec![]);
        let m = Marshalled::new(vec![list], Encoded::Ref(RecordId::new(1)));

        let json = to_json(&m).unwrap();
        assert_eq!(
            json,
            json!([
                "@tangle:1@",
                [{"@id": 1, "@t": "core/list", "@i": [1, "<@1@>"], "@f": {}}],
                "<@1@>"
            ])
        );
        assert_eq!(from_json(&json).unwrap(), m);
    }

    #[test]
    fn bound_and_immutable_records() {
        let json = json!([
            "@tangle:1@",
            [
                {"@id": 2, "@t": "core/tuple", "@i": [], "@f": {}, "@x": true},
                {"@id": 1, "@o": "<@2@>", "@a": "len"}
            ],
            "<@1@>"
        ]);
        let m = from_json(&json).unwrap();
        assert!(m.records[0].immutable);
        assert_eq!(
            m.records[1].bound,
            Some(BoundRef {
                instance: RecordId::new(2),
                selector: "len".into()
            })
        );
        assert_eq!(to_json(&m).unwrap(), json);
    }

    #[test]
    fn mapping_keeps_non_text_keys() {
        let mut map = Record::header(RecordId::new(1), TypeTag::builtin(Builtin::Map));
        map.items = Some(RecordItems::Mapping(vec![
            (Encoded::Int(1), Encoded::Text("one".into())),
            (Encoded::Ref(RecordId::new(1)), Encoded::Null),
        ]));
        let m = Marshalled::new(vec![map], Encoded::Ref(RecordId::new(1)));
        let json = to_json(&m).unwrap();
        assert_eq!(json[1][0]["@m"], json!([[1, "one"], ["<@1@>", null]]));
        assert_eq!(from_json(&json).unwrap(), m);
    }

    #[test]
    fn floats_and_integers_stay_distinct() {
        let m = Marshalled::new(vec![], Encoded::Float(1.0));
        let text = serde_json::to_string(&to_json(&m).unwrap()).unwrap();
        let back = from_json(&serde_json::from_str(&text).unwrap()).unwrap();
        assert_eq!(back.root, Encoded::Float(1.0));

        let m = Marshalled::new(vec![], Encoded::Int(1));
        assert_eq!(from_json(&to_json(&m).unwrap()).unwrap().root, Encoded::Int(1));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let m = Marshalled::new(vec![], Encoded::Float(f64::NAN));
        assert!(matches!(to_json(&m), Err(JsonError::NonFiniteFloat(_))));
    }

    #[test]
    fn malformed_layouts() {
        let cases = [
            json!({"not": "an array"}),
            json!(["@tangle:1@", []]),
            json!(["@tangle:1@", [{"@t": "core/list"}], null]),
            json!(["@tangle:1@", [{"@id": 1, "@i": [], "@m": []}], null]),
            json!(["@tangle:1@", [{"@id": 1, "@o": "<@2@>"}], null]),
            json!(["@tangle:1@", [{"@id": 1, "@i": [[1, 2]]}], null]),
            json!(["@tangle:1@", [{"@id": 1, "@q": 0}], null]),
            json!(["@tangle:1@", [], 18446744073709551615u64]),
        ];
        for case in cases {
            let err = from_json(&case).unwrap_err();
            assert!(
                matches!(err, JsonError::Marshal(MarshalError::MalformedInput(_))),
                "{case}: {err}"
            );
        }
    }
}
