use crate::spec::ParameterStyle;
use serde_json::Value;

fn schema_type(schema: Option<&Value>) -> Option<&str> {
    schema.and_then(|s| s.get("type")).and_then(|t| match t {
        Value::String(s) => Some(s.as_str()),
        // `type: [integer, "null"]`: decode by the first non-null type
        Value::Array(types) => types.iter().filter_map(Value::as_str).find(|t| *t != "null"),
        _ => None,
    })
}

fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
    match schema_type(schema) {
        Some("integer") => val
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        Some("number") => val
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(val.to_string())),
        Some("boolean") => val
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        _ => Value::String(val.to_string()),
    }
}

/// Decode a raw parameter string into JSON according to its schema and style.
///
/// Values that do not parse as the declared type stay strings, so schema
/// validation reports them instead of them being silently dropped.
pub fn decode_param_value(
    value: &str,
    schema: Option<&Value>,
    style: Option<ParameterStyle>,
) -> Value {
    match schema_type(schema) {
        Some("array") => {
            let items_schema = schema.and_then(|s| s.get("items"));
            let delim = match style.unwrap_or(ParameterStyle::Form) {
                ParameterStyle::SpaceDelimited => ' ',
                ParameterStyle::PipeDelimited => '|',
                _ => ',',
            };
            Value::Array(
                value
                    .split(delim)
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items_schema))
                    .collect(),
            )
        }
        Some("object") => {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        }
        _ => convert_primitive(value, schema),
    }
}
