//! Remote Result Envelopes
//!
//! Tool servers wrap their answers in protocol layers. [`Envelope`] names
//! each layer explicitly and [`normalize`] peels them off until plain JSON
//! data is left, so the loop never sees a protocol wrapper.

use serde_json::Value;

/// The closed set of shapes a remote result can arrive in
#[derive(Clone, Debug, PartialEq)]
pub enum Envelope {
    /// Structured-content payload of a tool result
    Structured(Box<Envelope>),
    /// Data payload
    Data(Box<Envelope>),
    /// Text payload; parsed as JSON when it holds JSON
    Text(String),
    /// Single-value payload, taken as is
    Value(Value),
    /// Content list
    List(Vec<Envelope>),
    /// Already plain data
    Plain(Value),
}

impl Envelope {
    pub fn structured(inner: Envelope) -> Self {
        Envelope::Structured(Box::new(inner))
    }

    pub fn data(inner: Envelope) -> Self {
        Envelope::Data(Box::new(inner))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Envelope::Text(text.into())
    }
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        Envelope::Plain(value)
    }
}

/// Collapse an envelope to plain data.
///
/// Rules, outermost first: structured content, data, text (JSON if it
/// parses, otherwise the string), single value, one-element list, and a
/// mapping whose only entry is a number. Anything else passes through.
pub fn normalize(envelope: Envelope) -> Value {
    match envelope {
        Envelope::Structured(inner) | Envelope::Data(inner) => normalize(*inner),
        Envelope::Text(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Envelope::Value(value) => value,
        Envelope::List(mut items) => {
            if items.len() == 1 {
                normalize(items.remove(0))
            } else {
                Value::Array(items.into_iter().map(normalize).collect())
            }
        }
        Envelope::Plain(value) => normalize_plain(value),
    }
}

fn normalize_plain(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => normalize_plain(items.remove(0)),
        Value::Object(map) if map.len() == 1 && map.values().all(Value::is_number) => {
            map.into_iter()
                .next()
                .map(|(_, number)| number)
                .unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_structured_data_text() {
        let envelope = Envelope::structured(Envelope::data(Envelope::text(r#"{"temp": 20}"#)));
        assert_eq!(normalize(envelope), json!({"temp": 20}));
    }

    #[test]
    fn test_singleton_list() {
        assert_eq!(normalize(Envelope::Plain(json!(["ok"]))), json!("ok"));
        assert_eq!(normalize(Envelope::List(vec![Envelope::text("ok")])), json!("ok"));
    }

    #[test]
    fn test_text_not_json_stays_string() {
        assert_eq!(normalize(Envelope::text("Clear skies")), json!("Clear skies"));
        assert_eq!(normalize(Envelope::text("59.0")), json!(59.0));
    }

    #[test]
    fn test_single_numeric_mapping() {
        assert_eq!(normalize(Envelope::structured(json!({"result": 59.0}).into())), json!(59.0));
    }

    #[test]
    fn test_mixed_mapping_passes_through() {
        let weather = json!({"conditions": "Clear", "temp_c": 15});
        assert_eq!(normalize(Envelope::structured(weather.clone().into())), weather);

        let place = json!({"name": "New York", "lat": 40.71, "lon": -74.01});
        assert_eq!(normalize(place.clone().into()), place);
    }

    #[test]
    fn test_value_taken_as_is() {
        assert_eq!(normalize(Envelope::Value(json!({"result": 1}))), json!({"result": 1}));
    }

    #[test]
    fn test_multi_item_list_normalizes_each() {
        let envelope = Envelope::List(vec![Envelope::text("a"), Envelope::text("[1]")]);
        assert_eq!(normalize(envelope), json!(["a", [1]]));
    }

    #[test]
    fn test_key_order_preserved() {
        let value = normalize(Envelope::text(r#"{"name": "HQ", "lat": 1, "lon": 2}"#));
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["name", "lat", "lon"]);
    }
}
