use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::parameter::BindValue;

/// One JDBC result row, keyed by column label in select order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row(pub IndexMap<String, BindValue>);

impl Row {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with(mut self, column: &str, value: impl Into<BindValue>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    /// Column labels are matched case-insensitively, as databases fold them.
    pub fn get(&self, column: &str) -> Option<&BindValue> {
        self.0.get(column).or_else(|| {
            self.0
                .iter()
                .find(|(label, _)| label.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &BindValue> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn from_json(object: &Map<String, Value>) -> Self {
        Self(
            object
                .iter()
                .map(|(k, v)| (k.clone(), BindValue::from_json(v)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parameter::BindValue;
    use crate::results::Row;

    #[test]
    pub fn test_get_ignores_case() {
        let row = Row::new().with("ID0_A_", 1i64).with("name1_a_", "Ann");

        assert_eq!(row.get("id0_a_"), Some(&BindValue::Int(1)));
        assert_eq!(row.get("NAME1_A_"), Some(&BindValue::from("Ann")));
        assert_eq!(row.get("age"), None);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["ID0_A_", "name1_a_"]);
    }

    #[test]
    pub fn test_from_json() {
        let value = json!({ "id": 3, "name": null, "tags": ["a"] });
        let row = Row::from_json(value.as_object().unwrap());

        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id"), Some(&BindValue::Int(3)));
        assert_eq!(row.get("name"), Some(&BindValue::Null));
        assert_eq!(row.get("tags"), Some(&BindValue::Json(json!(["a"]))));
    }
}
