//! Effective (dereferenced) schema nodes

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A schema fragment after `$ref` and `allOf` resolution
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(flatten)]
    pub node_type: SchemaNodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Format hint (e.g. "color")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the parent object lists this node as required
    #[serde(rename = "isRequired", skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// Shape of a schema node
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchemaNodeType {
    Null,
    Boolean,
    String,
    #[serde(rename_all = "camelCase")]
    Number {
        integer: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        multiple_of: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Array {
        #[serde(skip_serializing_if = "Option::is_none")]
        items: Option<Box<SchemaNode>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    Object {
        properties: BTreeMap<String, SchemaNode>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        /// Schema for keys not listed in `properties` (variant names, for instance)
        #[serde(skip_serializing_if = "Option::is_none")]
        additional_properties: Option<Box<SchemaNode>>,
    },
    Enum {
        values: Vec<Value>,
    },
    OneOf {
        alternatives: Vec<SchemaNode>,
    },
    AnyOf {
        alternatives: Vec<SchemaNode>,
    },
    /// A reference left unexpanded: a cycle, a depth abort or a missing target
    Ref {
        reference: String,
    },
    /// No type, no composition and no structure to infer one from
    Untyped,
}

impl SchemaNode {
    pub fn new(node_type: SchemaNodeType) -> Self {
        Self {
            node_type,
            title: None,
            description: None,
            format: None,
            default: None,
            required: false,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match &self.node_type {
            SchemaNodeType::Null => "null",
            SchemaNodeType::Boolean => "boolean",
            SchemaNodeType::String => "string",
            SchemaNodeType::Number { integer: true, .. } => "integer",
            SchemaNodeType::Number { .. } => "number",
            SchemaNodeType::Array { .. } => "array",
            SchemaNodeType::Object { .. } => "object",
            SchemaNodeType::Enum { .. } => "enum",
            SchemaNodeType::OneOf { .. } => "oneOf",
            SchemaNodeType::AnyOf { .. } => "anyOf",
            SchemaNodeType::Ref { .. } => "ref",
            SchemaNodeType::Untyped => "untyped",
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(&self.node_type, SchemaNodeType::Object { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(&self.node_type, SchemaNodeType::Array { .. })
    }

    /// True for a reference that could not be expanded
    pub fn is_unexpanded(&self) -> bool {
        matches!(&self.node_type, SchemaNodeType::Ref { .. })
    }

    /// Get object properties if this is an object
    pub fn properties(&self) -> Option<&BTreeMap<String, SchemaNode>> {
        match &self.node_type {
            SchemaNodeType::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// A named child of an object node
    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        match &self.node_type {
            SchemaNodeType::Object {
                properties,
                additional_properties,
                ..
            } => properties
                .get(name)
                .or_else(|| additional_properties.as_deref()),
            _ => None,
        }
    }

    /// Get array items schema if this is an array
    pub fn items(&self) -> Option<&SchemaNode> {
        match &self.node_type {
            SchemaNodeType::Array { items, .. } => items.as_deref(),
            _ => None,
        }
    }

    /// `oneOf`/`anyOf` alternatives, if any
    pub fn alternatives(&self) -> Option<&[SchemaNode]> {
        match &self.node_type {
            SchemaNodeType::OneOf { alternatives } | SchemaNodeType::AnyOf { alternatives } => {
                Some(alternatives)
            }
            _ => None,
        }
    }

    /// Label for this node when shown as one of several alternatives
    pub fn label(&self, index: usize) -> String {
        if let Some(title) = &self.title {
            title.clone()
        } else if let Some(desc) = &self.description {
            desc.clone()
        } else {
            match &self.node_type {
                SchemaNodeType::Enum { values } if values.len() == 1 => display_literal(&values[0]),
                SchemaNodeType::Object { .. } | SchemaNodeType::Ref { .. } | SchemaNodeType::Untyped => {
                    format!("Option {}", index + 1)
                }
                _ => self.type_name().to_string(),
            }
        }
    }
}

/// JSON type name of a value, as JSON Schema spells it
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a literal for display: strings unquoted, everything else as JSON
pub fn display_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(props: Vec<(&str, SchemaNode)>) -> SchemaNode {
        SchemaNode::new(SchemaNodeType::Object {
            properties: props
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            required: vec![],
            additional_properties: Some(Box::new(SchemaNode::new(SchemaNodeType::Boolean))),
        })
    }

    #[test]
    fn test_property_falls_back_to_additional() {
        let node = object(vec![("show", SchemaNode::new(SchemaNodeType::String))]);
        assert_eq!(node.property("show").map(|n| n.type_name()), Some("string"));
        assert_eq!(node.property("other").map(|n| n.type_name()), Some("boolean"));
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let mut node = SchemaNode::new(SchemaNodeType::Number {
            integer: false,
            minimum: Some(8.0),
            maximum: Some(72.0),
            multiple_of: None,
        });
        node.default = Some(json!(12));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            json!({ "type": "number", "integer": false, "minimum": 8.0, "maximum": 72.0, "default": 12 })
        );
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(3)), "integer");
        assert_eq!(json_type_name(&json!(3.5)), "number");
        assert_eq!(json_type_name(&json!({})), "object");
    }

    #[test]
    fn test_alternative_labels() {
        let mut titled = SchemaNode::new(SchemaNodeType::String);
        titled.title = Some("Solid".to_string());
        assert_eq!(titled.label(0), "Solid");

        let literal = SchemaNode::new(SchemaNodeType::Enum {
            values: vec![json!("auto")],
        });
        assert_eq!(literal.label(1), "auto");
        assert_eq!(object(vec![]).label(2), "Option 3");
    }
}
