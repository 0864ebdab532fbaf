use indexmap::IndexMap;

use crate::metamodel::{MappingMetamodel, TypeName};
use crate::parameter::BindValue;
use crate::results::{
    ComponentFetch, FetchNode, InstantiationReturn, PropertyReturn, ResultBuilder, ResultSetMapping, ResultShape,
    Row, ScalarReturn, SuffixedCollectionResult, SuffixedEntityResult,
};
use crate::{QueryError, Result};

/// An entity instance read from one row.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityValue {
    pub entity_name: String,
    pub id: Vec<BindValue>,
    pub discriminator: Option<BindValue>,
    pub attributes: IndexMap<String, ResultValue>,
}

impl EntityValue {
    pub fn get(&self, attribute: &str) -> Option<&ResultValue> {
        self.attributes.get(attribute)
    }
}

/// One collection entry read from one row.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionValue {
    pub role: String,
    pub key: Vec<BindValue>,
    pub index: Option<Vec<BindValue>>,
    pub element: Vec<BindValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Scalar(BindValue),
    Tuple(Vec<ResultValue>),
    Entity(EntityValue),
    Component(IndexMap<String, ResultValue>),
    Collection(CollectionValue),
    Instantiation { target: String, arguments: Vec<BindValue> },
}

impl ResultValue {
    fn of(value: BindValue) -> Self {
        match value {
            BindValue::Null => ResultValue::Null,
            other => ResultValue::Scalar(other),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResultValue::Null)
    }

    pub fn as_scalar(&self) -> Option<&BindValue> {
        match self {
            ResultValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityValue> {
        match self {
            ResultValue::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum ReaderNode {
    Entity(SuffixedEntityResult, TypeName),
    Collection(SuffixedCollectionResult),
    Scalar(ScalarReturn),
    Property(PropertyReturn),
    Instantiation(InstantiationReturn),
}

/// Materializes rows according to a resolved result set mapping.
#[derive(Debug, Clone)]
pub struct RowReader {
    nodes: Vec<ReaderNode>,
}

impl RowReader {
    pub fn new(mapping: &ResultSetMapping, metamodel: &dyn MappingMetamodel) -> Result<Self> {
        let mut nodes = Vec::with_capacity(mapping.len());
        for builder in mapping.builders() {
            let node = match builder {
                ResultBuilder::Root(root) => {
                    let persister = metamodel.entity(&root.entity_name)?;
                    ReaderNode::Entity(
                        SuffixedEntityResult::from_column_names(root, persister.as_ref()),
                        persister.type_name(),
                    )
                }
                ResultBuilder::Entity(entity) => {
                    let persister = metamodel.entity(&entity.entity_name)?;
                    ReaderNode::Entity(entity.clone(), persister.type_name())
                }
                ResultBuilder::Collection(collection) => {
                    let persister = metamodel.collection(&collection.role())?;
                    ReaderNode::Collection(SuffixedCollectionResult {
                        table_alias: collection.table_alias.clone(),
                        navigable_path: format!("{}({})", collection.role(), collection.table_alias),
                        role: persister.role().to_string(),
                        key_column_aliases: persister.key_column_names(),
                        index_column_aliases: persister.has_index().then(|| persister.index_column_names()),
                        element_column_aliases: persister.element_column_names(),
                    })
                }
                ResultBuilder::CollectionResult(collection) => ReaderNode::Collection(collection.clone()),
                ResultBuilder::Scalar(scalar) => ReaderNode::Scalar(scalar.clone()),
                ResultBuilder::Property(property) => ReaderNode::Property(property.clone()),
                ResultBuilder::Instantiation(instantiation) => ReaderNode::Instantiation(instantiation.clone()),
            };
            nodes.push(node);
        }
        Ok(Self { nodes })
    }

    /// Reader returning every selected column.
    pub fn dynamic() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Shape of the values produced by `read`.
    pub fn shape(&self) -> ResultShape {
        match self.nodes.as_slice() {
            [] => ResultShape::Dynamic,
            [ReaderNode::Entity(_, type_name)] => ResultShape::Entity(type_name.clone()),
            [ReaderNode::Instantiation(instantiation)] => ResultShape::Instantiation {
                target: instantiation.target.clone(),
            },
            [ReaderNode::Collection(_)] => ResultShape::Collection,
            [ReaderNode::Scalar(_) | ReaderNode::Property(_)] => ResultShape::Scalar,
            nodes => ResultShape::Tuple(nodes.len()),
        }
    }

    pub fn read(&self, row: &Row) -> Result<ResultValue> {
        match self.nodes.as_slice() {
            [] => Ok(read_dynamic(row)),
            [node] => read_node(node, row),
            nodes => Ok(ResultValue::Tuple(
                nodes.iter().map(|n| read_node(n, row)).collect::<Result<Vec<_>>>()?,
            )),
        }
    }

    pub fn read_all(&self, rows: &[Row]) -> Result<Vec<ResultValue>> {
        rows.iter().map(|row| self.read(row)).collect()
    }
}

fn read_dynamic(row: &Row) -> ResultValue {
    match row.len() {
        1 => row.values().next().cloned().map(ResultValue::of).unwrap_or(ResultValue::Null),
        _ => ResultValue::Tuple(row.values().cloned().map(ResultValue::of).collect()),
    }
}

fn read_node(node: &ReaderNode, row: &Row) -> Result<ResultValue> {
    match node {
        ReaderNode::Entity(entity, _) => read_entity(entity, row),
        ReaderNode::Collection(collection) => read_collection(collection, row),
        ReaderNode::Scalar(scalar) => {
            let value = required(row, &scalar.column_alias)?;
            let value = match scalar.scalar_type {
                Some(scalar_type) => scalar_type.coerce(value)?,
                None => value,
            };
            Ok(ResultValue::of(value))
        }
        ReaderNode::Property(property) => required(row, &property.column_alias).map(ResultValue::of),
        ReaderNode::Instantiation(instantiation) => {
            let arguments = instantiation
                .arguments
                .iter()
                .map(|argument| {
                    let value = required(row, &argument.column_alias)?;
                    match argument.scalar_type {
                        Some(scalar_type) => scalar_type.coerce(value),
                        None => Ok(value),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(ResultValue::Instantiation {
                target: instantiation.target.clone(),
                arguments,
            })
        }
    }
}

fn required(row: &Row, column: &str) -> Result<BindValue> {
    row.get(column)
        .cloned()
        .ok_or_else(|| QueryError::Execution(format!("Column [{}] not found in result row", column)))
}

fn optional(row: &Row, columns: &[String]) -> ResultValue {
    let mut values: Vec<BindValue> = columns
        .iter()
        .map(|c| row.get(c).cloned().unwrap_or(BindValue::Null))
        .collect();
    match values.len() {
        0 => ResultValue::Null,
        1 => ResultValue::of(values.remove(0)),
        _ if values.iter().all(BindValue::is_null) => ResultValue::Null,
        _ => ResultValue::Tuple(values.into_iter().map(ResultValue::of).collect()),
    }
}

fn read_entity(entity: &SuffixedEntityResult, row: &Row) -> Result<ResultValue> {
    let id = entity
        .id_column_aliases
        .iter()
        .map(|c| required(row, c))
        .collect::<Result<Vec<_>>>()?;
    if id.iter().all(BindValue::is_null) {
        return Ok(ResultValue::Null);
    }

    let discriminator = entity
        .discriminator_alias
        .as_ref()
        .map(|c| row.get(c).cloned().unwrap_or(BindValue::Null));

    let mut attributes = IndexMap::new();
    for (name, columns) in &entity.properties {
        if entity.identifier_property.as_deref() == Some(name.as_str()) {
            continue;
        }
        attributes.insert(name.clone(), optional(row, columns));
    }
    for (name, fetch) in &entity.fetches {
        match fetch {
            FetchNode::Component(component) => {
                attributes.insert(name.clone(), read_component(component, row));
            }
            FetchNode::Legacy(legacy) => {
                if let Some(fetched) = &legacy.entity {
                    attributes.insert(name.clone(), read_entity(fetched, row)?);
                }
            }
        }
    }

    Ok(ResultValue::Entity(EntityValue {
        entity_name: entity.entity_name.clone(),
        id,
        discriminator,
        attributes,
    }))
}

fn read_component(component: &ComponentFetch, row: &Row) -> ResultValue {
    let mut values: IndexMap<String, ResultValue> = component
        .properties
        .iter()
        .map(|(name, columns)| (name.clone(), optional(row, columns)))
        .collect();
    for (name, fetch) in &component.fetches {
        if let FetchNode::Component(nested) = fetch {
            values.insert(name.clone(), read_component(nested, row));
        }
    }
    if values.values().all(ResultValue::is_null) {
        ResultValue::Null
    } else {
        ResultValue::Component(values)
    }
}

fn read_collection(collection: &SuffixedCollectionResult, row: &Row) -> Result<ResultValue> {
    let read = |columns: &[String]| -> Result<Vec<BindValue>> { columns.iter().map(|c| required(row, c)).collect() };

    let key = read(&collection.key_column_aliases)?;
    if key.iter().all(BindValue::is_null) {
        return Ok(ResultValue::Null);
    }
    let index = match &collection.index_column_aliases {
        Some(columns) => Some(read(columns)?),
        None => None,
    };
    Ok(ResultValue::Collection(CollectionValue {
        role: collection.role.clone(),
        key,
        index,
        element: read(&collection.element_column_aliases)?,
    }))
}
