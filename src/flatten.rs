use crate::event::{PropertyValue, Scalar};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

/// Convert a property value tree into plain JSON.
pub fn flatten(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Scalar(scalar) => flatten_scalar(scalar),
        PropertyValue::Sequence(elements) => Value::Array(elements.iter().map(flatten).collect()),
        PropertyValue::Mapping(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key.to_key(), flatten(value)))
                .collect::<Map<_, _>>(),
        ),
        PropertyValue::Structure(properties) => Value::Object(
            properties
                .iter()
                .map(|(name, value)| (name.clone(), flatten(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn flatten_scalar(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::I64(n) => Value::from(*n),
        Scalar::U64(n) => Value::from(*n),
        // NaN and infinities have no JSON form and come out as null.
        Scalar::F64(n) => Value::from(*n),
        Scalar::Str(s) => Value::String(s.clone()),
        Scalar::Enum(label) => Value::String(label.clone()),
        Scalar::Timestamp(ts) => Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)),
        Scalar::Other(text) => Value::String(text.clone()),
    }
}
