use crate::domain::{MappedAttribute, UpdateRequest, TIME_INSTANT_ATTRIBUTE};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number, Value};

const DATE_TIME_TYPE: &str = "DateTime";

/// Build the NGSI v2 body of `POST /v2/entities/{id}/attrs`.
///
/// With a timestamp, every attribute carries it as `TimeInstant` metadata
/// and the entity gets a `TimeInstant` attribute of its own.
pub fn build_update_body(request: &UpdateRequest, autocast: bool) -> Map<String, Value> {
    let timestamp = request.timestamp.map(format_timestamp);
    let mut body = Map::new();

    for attribute in &request.attributes {
        let mut entry = Map::new();
        entry.insert("type".to_string(), json!(attribute.attr_type));
        entry.insert("value".to_string(), attribute_value(attribute, autocast));
        if let Some(ts) = &timestamp {
            entry.insert(
                "metadata".to_string(),
                json!({ TIME_INSTANT_ATTRIBUTE: { "type": DATE_TIME_TYPE, "value": ts } }),
            );
        }
        body.insert(attribute.name.clone(), Value::Object(entry));
    }

    if let Some(ts) = timestamp {
        body.insert(
            TIME_INSTANT_ATTRIBUTE.to_string(),
            json!({ "type": DATE_TIME_TYPE, "value": ts }),
        );
    }

    body
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn attribute_value(attribute: &MappedAttribute, autocast: bool) -> Value {
    let text = match (&attribute.value, autocast) {
        (Value::String(text), true) => text,
        (value, _) => return value.clone(),
    };

    match attribute.attr_type.as_str() {
        "Number" | "Integer" | "Float" => text
            .parse::<i64>()
            .map(Value::from)
            .ok()
            .or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
            })
            .unwrap_or_else(|| attribute.value.clone()),
        "Boolean" => match text.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => attribute.value.clone(),
        },
        _ => attribute.value.clone(),
    }
}
