use serde_json::Value;

/// Closed set of primitive values carried by normalized records and the
/// overflow attribute map. Anything richer is stringified on the way in.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl AttrValue {
    /// Lift a feed value into the closed variant set. `None` for JSON null;
    /// arrays/objects are stringified so nothing is dropped.
    pub fn from_json(v: &Value) -> Option<AttrValue> {
        match v {
            Value::Null => None,
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttrValue::Int(i))
                } else {
                    n.as_f64().map(AttrValue::Float)
                }
            }
            Value::String(s) => Some(AttrValue::Text(s.clone())),
            other => Some(AttrValue::Text(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttrValue::Int(i) => Value::from(*i),
            AttrValue::Float(f) => Value::from(*f),
            AttrValue::Text(s) => Value::from(s.clone()),
            AttrValue::Bool(b) => Value::from(*b),
        }
    }

}

/// A feed cell counts as missing when the key is absent (handled by the
/// caller) or the value is JSON null.
pub fn is_missing(v: &Value) -> bool {
    v.is_null()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lifts_primitives() {
        assert_eq!(AttrValue::from_json(&json!(7)), Some(AttrValue::Int(7)));
        assert_eq!(
            AttrValue::from_json(&json!(1.5)),
            Some(AttrValue::Float(1.5))
        );
        assert_eq!(
            AttrValue::from_json(&json!("FW")),
            Some(AttrValue::Text("FW".into()))
        );
        assert_eq!(
            AttrValue::from_json(&json!(true)),
            Some(AttrValue::Bool(true))
        );
        assert_eq!(AttrValue::from_json(&Value::Null), None);
    }

    #[test]
    fn stringifies_structured_values() {
        let v = AttrValue::from_json(&json!(["a", "b"])).unwrap();
        assert_eq!(v, AttrValue::Text("[\"a\",\"b\"]".into()));
    }
}
