//! Conversions between protobuf `Struct` payloads and `serde_json`.
//!
//! Opaque payloads on the mesh wire (`sly_data`, `chat_context`) are
//! `google.protobuf.Struct`. The backend carries them as
//! `serde_json::Value` and never inspects their contents.

use std::collections::BTreeMap;

use prost_types::value::Kind;
use prost_types::{ListValue, Struct, Value as ProtoValue};
use serde_json::{Map, Value};

use super::proto::{ChatMessageType, ChatResponse};

/// Convert a JSON object into a protobuf `Struct`. Non-object values have
/// no `Struct` representation and yield `None`.
pub fn json_to_struct(value: &Value) -> Option<Struct> {
    match value {
        Value::Object(map) => Some(Struct {
            fields: map
                .iter()
                .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
                .collect::<BTreeMap<_, _>>(),
        }),
        _ => None,
    }
}

pub fn json_to_proto_value(value: &Value) -> ProtoValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(*b),
        Value::Number(n) => Kind::NumberValue(n.as_f64().unwrap_or_default()),
        Value::String(s) => Kind::StringValue(s.clone()),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(_) => match json_to_struct(value) {
            Some(s) => Kind::StructValue(s),
            None => Kind::NullValue(0),
        },
    };
    ProtoValue { kind: Some(kind) }
}

pub fn struct_to_json(value: &Struct) -> Value {
    Value::Object(
        value
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), proto_value_to_json(v)))
            .collect::<Map<_, _>>(),
    )
}

pub fn proto_value_to_json(value: &ProtoValue) -> Value {
    match &value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(*b),
        Some(Kind::NumberValue(n)) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s.clone()),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.iter().map(proto_value_to_json).collect())
        }
        Some(Kind::StructValue(s)) => struct_to_json(s),
    }
}

/// Render a raw stream message as the JSON shape the original wire format
/// uses, for the json-lines streaming endpoint.
pub fn response_to_json(msg: &ChatResponse) -> Value {
    let mut body = Map::new();
    if let Some(response) = msg.response.as_ref() {
        let mut inner = Map::new();
        inner.insert(
            "type".to_string(),
            Value::String(type_name(response.r#type()).to_string()),
        );
        inner.insert("text".to_string(), Value::String(response.text.clone()));
        if !response.origin.is_empty() {
            inner.insert(
                "origin".to_string(),
                Value::Array(
                    response
                        .origin
                        .iter()
                        .map(|o| serde_json::json!({"tool": o.tool}))
                        .collect(),
                ),
            );
        }
        if let Some(ctx) = response.chat_context.as_ref() {
            inner.insert("chat_context".to_string(), struct_to_json(ctx));
        }
        body.insert("response".to_string(), Value::Object(inner));
    }
    Value::Object(body)
}

fn type_name(kind: ChatMessageType) -> &'static str {
    kind.as_str_name()
}
