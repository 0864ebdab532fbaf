use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parameter::BindValue;
use crate::plan::LockMode;
use crate::results::{SuffixedCollectionResult, SuffixedEntityResult};
use crate::{QueryError, Result};

/// Column aliases supplied by the user for individual properties.
pub type PropertyResults = IndexMap<String, Vec<String>>;

/// An entity returned at the top level of each row.
#[derive(Debug, Clone, PartialEq)]
pub struct RootReturn {
    pub table_alias: String,
    pub entity_name: String,
    pub lock_mode: LockMode,
    pub property_results: PropertyResults,
}

impl RootReturn {
    pub fn new(table_alias: &str, entity_name: &str) -> Self {
        Self {
            table_alias: table_alias.to_string(),
            entity_name: entity_name.to_string(),
            lock_mode: LockMode::None,
            property_results: PropertyResults::new(),
        }
    }

    pub fn lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn add_property(mut self, property: &str, column_alias: &str) -> Self {
        self.property_results
            .entry(property.to_string())
            .or_default()
            .push(column_alias.to_string());
        self
    }
}

/// A collection returned at the top level; `owner_entity.property` is its role.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReturn {
    pub table_alias: String,
    pub owner_entity: String,
    pub property: String,
    pub lock_mode: LockMode,
    pub property_results: PropertyResults,
}

impl CollectionReturn {
    pub fn new(table_alias: &str, owner_entity: &str, property: &str) -> Self {
        Self {
            table_alias: table_alias.to_string(),
            owner_entity: owner_entity.to_string(),
            property: property.to_string(),
            lock_mode: LockMode::None,
            property_results: PropertyResults::new(),
        }
    }

    pub fn role(&self) -> String {
        format!("{}.{}", self.owner_entity, self.property)
    }

    pub fn add_property(mut self, property: &str, column_alias: &str) -> Self {
        self.property_results
            .entry(property.to_string())
            .or_default()
            .push(column_alias.to_string());
        self
    }
}

/// An association of an already declared alias, fetched in the same row.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchReturn {
    pub table_alias: String,
    pub owner_alias: String,
    pub fetchable_name: String,
    pub lock_mode: LockMode,
    pub property_results: PropertyResults,
}

impl FetchReturn {
    pub fn new(table_alias: &str, owner_alias: &str, fetchable_name: &str) -> Self {
        Self {
            table_alias: table_alias.to_string(),
            owner_alias: owner_alias.to_string(),
            fetchable_name: fetchable_name.to_string(),
            lock_mode: LockMode::None,
            property_results: PropertyResults::new(),
        }
    }

    pub fn lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    String,
    Date,
    Timestamp,
    Uuid,
    Json,
}

impl ScalarType {
    /// Converts a value read from a row to this type.
    pub fn coerce(self, value: BindValue) -> Result<BindValue> {
        if value.is_null() {
            return Ok(value);
        }
        let converted = match (self, &value) {
            (ScalarType::Bool, BindValue::Bool(_))
            | (ScalarType::Int, BindValue::Int(_))
            | (ScalarType::Float, BindValue::Float(_))
            | (ScalarType::String, BindValue::String(_))
            | (ScalarType::Date, BindValue::Date(_))
            | (ScalarType::Timestamp, BindValue::Timestamp(_))
            | (ScalarType::Uuid, BindValue::Uuid(_))
            | (ScalarType::Json, BindValue::Json(_)) => Some(value.clone()),
            (ScalarType::Bool, BindValue::Int(i)) => Some(BindValue::Bool(*i != 0)),
            (ScalarType::Bool, BindValue::String(s)) => s.parse::<bool>().ok().map(BindValue::Bool),
            (ScalarType::Int, BindValue::String(s)) => s.trim().parse::<i64>().ok().map(BindValue::Int),
            (ScalarType::Int, BindValue::Bool(b)) => Some(BindValue::Int(*b as i64)),
            (ScalarType::Float, BindValue::Int(i)) => BindValue::float(*i as f64).ok(),
            (ScalarType::Float, BindValue::String(s)) => {
                s.trim().parse::<f64>().ok().and_then(|f| BindValue::float(f).ok())
            }
            (ScalarType::String, other) => Some(BindValue::String(match other {
                BindValue::String(s) => s.clone(),
                BindValue::Json(v) => v.to_string(),
                v => v.to_string(),
            })),
            (ScalarType::Date, BindValue::String(s)) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").ok().map(BindValue::Date)
            }
            (ScalarType::Date, BindValue::Timestamp(t)) => Some(BindValue::Date(t.date())),
            (ScalarType::Timestamp, BindValue::String(s)) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(BindValue::Timestamp),
            (ScalarType::Uuid, BindValue::String(s)) => Uuid::parse_str(s).ok().map(BindValue::Uuid),
            (ScalarType::Json, BindValue::String(s)) => serde_json::from_str(s).ok().map(BindValue::Json),
            _ => None,
        };
        converted.ok_or_else(|| {
            QueryError::shape(format!(
                "Cannot convert {} value [{}] to {:?}",
                value.type_name(),
                value,
                self
            ))
        })
    }
}

/// A single column returned as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarReturn {
    pub column_alias: String,
    pub scalar_type: Option<ScalarType>,
}

impl ScalarReturn {
    pub fn new(column_alias: &str) -> Self {
        Self {
            column_alias: column_alias.to_string(),
            scalar_type: None,
        }
    }

    pub fn typed(column_alias: &str, scalar_type: ScalarType) -> Self {
        Self {
            column_alias: column_alias.to_string(),
            scalar_type: Some(scalar_type),
        }
    }
}

/// A column exposed under a property name.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyReturn {
    pub property_name: String,
    pub column_alias: String,
}

/// Columns passed as arguments to construct a value of `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct InstantiationReturn {
    pub target: String,
    pub arguments: Vec<ScalarReturn>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultBuilder {
    Root(RootReturn),
    Collection(CollectionReturn),
    Scalar(ScalarReturn),
    Property(PropertyReturn),
    Instantiation(InstantiationReturn),
    /// Entity result with resolved column aliases.
    Entity(SuffixedEntityResult),
    /// Collection result with resolved column aliases.
    CollectionResult(SuffixedCollectionResult),
}

impl ResultBuilder {
    pub fn table_alias(&self) -> Option<&str> {
        match self {
            ResultBuilder::Root(r) => Some(&r.table_alias),
            ResultBuilder::Collection(c) => Some(&c.table_alias),
            ResultBuilder::Entity(e) => Some(&e.table_alias),
            ResultBuilder::CollectionResult(c) => Some(&c.table_alias),
            _ => None,
        }
    }

    pub fn is_scalar_like(&self) -> bool {
        matches!(self, ResultBuilder::Scalar(_) | ResultBuilder::Property(_))
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, ResultBuilder::Root(_) | ResultBuilder::Entity(_))
    }

    pub fn entity_name(&self) -> Option<&str> {
        match self {
            ResultBuilder::Root(r) => Some(&r.entity_name),
            ResultBuilder::Entity(e) => Some(&e.entity_name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::parameter::BindValue;
    use crate::results::{CollectionReturn, RootReturn, ScalarType};
    use crate::QueryError;

    #[test]
    pub fn test_root_property_results() {
        let root = RootReturn::new("p", "Person")
            .add_property("name", "n1")
            .add_property("address", "s")
            .add_property("address", "c");

        assert_eq!(root.property_results["name"], vec!["n1"]);
        assert_eq!(root.property_results["address"], vec!["s", "c"]);
    }

    #[test]
    pub fn test_collection_role() {
        assert_eq!(CollectionReturn::new("ph", "Person", "phones").role(), "Person.phones");
    }

    #[test]
    pub fn test_coerce() {
        assert_eq!(ScalarType::Int.coerce(BindValue::from("42")).unwrap(), BindValue::Int(42));
        assert_eq!(ScalarType::Bool.coerce(BindValue::Int(0)).unwrap(), BindValue::Bool(false));
        assert_eq!(
            ScalarType::Date.coerce(BindValue::from("2024-02-29")).unwrap(),
            BindValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        assert_eq!(ScalarType::String.coerce(BindValue::Int(7)).unwrap(), BindValue::from("7"));
        assert_eq!(ScalarType::Uuid.coerce(BindValue::Null).unwrap(), BindValue::Null);
        assert!(matches!(
            ScalarType::Int.coerce(BindValue::from("seven")),
            Err(QueryError::ResultShape(_))
        ));
    }
}
