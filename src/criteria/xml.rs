use once_cell::sync::Lazy;
use regex::Regex;

use crate::criteria::{Expression, SortSpecification};
use crate::{QueryError, Result};

static XML_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("xml name pattern"));

/// Names may not start with `xml` in any case; those are reserved.
pub fn validate_xml_name(name: &str) -> Result<()> {
    if !XML_NAME.is_match(name) || name.to_ascii_lowercase().starts_with("xml") {
        return Err(QueryError::criteria(format!("Invalid XML name [{}]", name)));
    }
    Ok(())
}

/// A named expression of `xmlattributes` or `xmlforest`.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNamedValue {
    pub name: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum XmlExpression {
    Element {
        name: String,
        attributes: Vec<XmlNamedValue>,
        content: Vec<Expression>,
    },
    Forest(Vec<XmlNamedValue>),
    Concat(Vec<Expression>),
    ProcessingInstruction {
        target: String,
        content: Option<Expression>,
    },
    Query {
        query: String,
        document: Expression,
    },
    Exists {
        query: String,
        document: Expression,
    },
    Agg {
        value: Expression,
        order_by: Vec<SortSpecification>,
    },
}

impl XmlExpression {
    pub fn element(name: &str) -> Result<Self> {
        validate_xml_name(name)?;
        Ok(XmlExpression::Element {
            name: name.to_string(),
            attributes: Vec::new(),
            content: Vec::new(),
        })
    }

    /// Adds an attribute to an element; fails on other functions.
    pub fn attribute(mut self, name: &str, value: Expression) -> Result<Self> {
        validate_xml_name(name)?;
        let XmlExpression::Element { attributes, .. } = &mut self else {
            return Err(QueryError::criteria("Only xmlelement accepts attributes"));
        };
        if attributes.iter().any(|a| a.name == name) {
            return Err(QueryError::criteria(format!("Duplicate XML attribute [{}]", name)));
        }
        attributes.push(XmlNamedValue {
            name: name.to_string(),
            value,
        });
        Ok(self)
    }

    pub fn content(mut self, value: Expression) -> Result<Self> {
        let XmlExpression::Element { content, .. } = &mut self else {
            return Err(QueryError::criteria("Only xmlelement accepts content"));
        };
        content.push(value);
        Ok(self)
    }

    pub fn forest(entries: Vec<(&str, Expression)>) -> Result<Self> {
        let mut values = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            validate_xml_name(name)?;
            values.push(XmlNamedValue {
                name: name.to_string(),
                value,
            });
        }
        Ok(XmlExpression::Forest(values))
    }

    pub fn concat(values: Vec<Expression>) -> Self {
        XmlExpression::Concat(values)
    }

    pub fn pi(target: &str, content: Option<Expression>) -> Result<Self> {
        validate_xml_name(target)?;
        Ok(XmlExpression::ProcessingInstruction {
            target: target.to_string(),
            content,
        })
    }

    pub fn query(query: &str, document: Expression) -> Self {
        XmlExpression::Query {
            query: query.to_string(),
            document,
        }
    }

    pub fn exists(query: &str, document: Expression) -> Self {
        XmlExpression::Exists {
            query: query.to_string(),
            document,
        }
    }

    pub fn agg(value: Expression, order_by: Vec<SortSpecification>) -> Self {
        XmlExpression::Agg { value, order_by }
    }
}
