use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Id = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    /// Identifier of another entity (foreign or owned reference)
    Id,
    /// RFC 3339 timestamp carried as a string
    Date,
}

impl DataType {
    /// Whether a JSON value is acceptable for this data type.
    /// `null` is accepted for every type; requiredness is checked separately.
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::String, Value::String(_)) => true,
            (DataType::Number, Value::Number(_)) => true,
            (DataType::Boolean, Value::Bool(_)) => true,
            (DataType::Object, Value::Object(_)) => true,
            (DataType::Array, Value::Array(_)) => true,
            (DataType::Id, Value::String(_)) | (DataType::Id, Value::Number(_)) => true,
            (DataType::Date, Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            _ => false,
        }
    }
}

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Render a JSON scalar as an identifier string. Strings are taken verbatim,
/// numbers use their canonical form, everything else has no identifier form.
pub fn value_as_id(value: &serde_json::Value) -> Option<Id> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_type_accepts() {
        assert!(DataType::String.accepts(&json!("x")));
        assert!(!DataType::String.accepts(&json!(1)));
        assert!(DataType::Number.accepts(&json!(1.5)));
        assert!(DataType::Id.accepts(&json!(42)));
        assert!(DataType::Boolean.accepts(&json!(null)));
        assert!(DataType::Date.accepts(&json!("2024-01-01T00:00:00Z")));
        assert!(!DataType::Date.accepts(&json!("yesterday")));
    }

    #[test]
    fn test_value_as_id() {
        assert_eq!(value_as_id(&json!("sku-1")), Some("sku-1".to_string()));
        assert_eq!(value_as_id(&json!(7)), Some("7".to_string()));
        assert_eq!(value_as_id(&json!("")), None);
        assert_eq!(value_as_id(&json!(true)), None);
    }
}
