//! Field classification, default values and one-level validation

use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::schema::node::{display_literal, json_type_name};
use crate::schema::{PropertyPath, SchemaNode, SchemaNodeType, SchemaResolver};

/// Format hints that mark a string as a color
pub const DEFAULT_COLOR_FORMATS: &[&str] = &["color", "hex-color"];

// ============================================================================
// Field Kind
// ============================================================================

/// Semantic kind of form field for a schema node
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind<'a> {
    Enum(&'a [Value]),
    Color,
    Text,
    Number { integer: bool },
    Boolean,
    Array { items: Option<&'a SchemaNode> },
    Object { properties: &'a BTreeMap<String, SchemaNode> },
    Unsupported,
}

impl FieldKind<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Enum(_) => "enum",
            FieldKind::Color => "color",
            FieldKind::Text => "text",
            FieldKind::Number { .. } => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Array { .. } => "array",
            FieldKind::Object { .. } => "object",
            FieldKind::Unsupported => "unsupported",
        }
    }
}

/// Result of validating one pending value
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Validation {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Form Field Resolver
// ============================================================================

/// Maps effective schema nodes and values to form fields
#[derive(Clone)]
pub struct FormFieldResolver {
    resolver: SchemaResolver,
    color_formats: Vec<String>,
}

impl FormFieldResolver {
    pub fn new(resolver: SchemaResolver) -> Self {
        Self {
            resolver,
            color_formats: DEFAULT_COLOR_FORMATS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_color_formats(mut self, formats: Vec<String>) -> Self {
        self.color_formats = formats;
        self
    }

    pub fn resolver(&self) -> &SchemaResolver {
        &self.resolver
    }

    /// Effective schema for the field at `path`
    pub fn field_at(&self, path: &PropertyPath) -> Option<SchemaNode> {
        self.resolver.resolve_path(path)
    }

    /// Decide which field kind renders `node`. Enums win over the declared type.
    pub fn classify<'n>(&self, node: &'n SchemaNode, path: &PropertyPath) -> FieldKind<'n> {
        match &node.node_type {
            SchemaNodeType::Enum { values } => FieldKind::Enum(values),
            SchemaNodeType::String if self.is_color(node, path) => FieldKind::Color,
            SchemaNodeType::String => FieldKind::Text,
            SchemaNodeType::Number { integer, .. } => FieldKind::Number { integer: *integer },
            SchemaNodeType::Boolean => FieldKind::Boolean,
            SchemaNodeType::Array { items, .. } => FieldKind::Array {
                items: items.as_deref(),
            },
            SchemaNodeType::Object { properties, .. } => FieldKind::Object { properties },
            SchemaNodeType::Null
            | SchemaNodeType::OneOf { .. }
            | SchemaNodeType::AnyOf { .. }
            | SchemaNodeType::Ref { .. }
            | SchemaNodeType::Untyped => FieldKind::Unsupported,
        }
    }

    fn is_color(&self, node: &SchemaNode, path: &PropertyPath) -> bool {
        let format_hint = node
            .format
            .as_deref()
            .map(|f| self.color_formats.iter().any(|c| c.eq_ignore_ascii_case(f)))
            .unwrap_or(false);
        let name_hint = path
            .last_key()
            .map(|key| key.to_ascii_lowercase().contains("color"))
            .unwrap_or(false);
        format_hint || name_hint
    }

    /// Value a new field starts with when nothing is stored yet
    pub fn default_value_for(&self, node: &SchemaNode) -> Value {
        if let Some(default) = &node.default {
            return default.clone();
        }
        match &node.node_type {
            SchemaNodeType::Enum { values } => values.first().cloned().unwrap_or(Value::Null),
            SchemaNodeType::String => Value::String(String::new()),
            SchemaNodeType::Number { .. } => json!(0),
            SchemaNodeType::Boolean => Value::Bool(false),
            SchemaNodeType::Array { .. } => Value::Array(vec![]),
            SchemaNodeType::Object { .. } => Value::Object(Map::new()),
            SchemaNodeType::OneOf { alternatives } | SchemaNodeType::AnyOf { alternatives } => {
                alternatives
                    .first()
                    .map(|alt| self.default_value_for(alt))
                    .unwrap_or(Value::Null)
            }
            SchemaNodeType::Null | SchemaNodeType::Ref { .. } | SchemaNodeType::Untyped => {
                Value::Null
            }
        }
    }

    /// Structural check of `value` against `node`, one level deep.
    /// Children of objects and arrays are validated by their own fields.
    pub fn validate(&self, node: &SchemaNode, value: &Value, path: &PropertyPath) -> Validation {
        let label = path.last_key().unwrap_or("value");

        match &node.node_type {
            SchemaNodeType::Enum { values } => {
                if values.contains(value) {
                    Validation::ok()
                } else {
                    let allowed: Vec<String> = values.iter().map(display_literal).collect();
                    Validation::rejected(format!(
                        "{} must be one of: {}",
                        label,
                        allowed.join(", ")
                    ))
                }
            }
            SchemaNodeType::String => expect_type(value.is_string(), label, "a string", value),
            SchemaNodeType::Boolean => expect_type(value.is_boolean(), label, "a boolean", value),
            SchemaNodeType::Null => expect_type(value.is_null(), label, "null", value),
            SchemaNodeType::Object { .. } => expect_type(value.is_object(), label, "an object", value),
            SchemaNodeType::Number {
                integer,
                minimum,
                maximum,
                multiple_of,
            } => {
                let Some(number) = value.as_f64() else {
                    return expect_type(false, label, "a number", value);
                };
                if *integer && number.fract() != 0.0 {
                    return Validation::rejected(format!("{} must be a whole number", label));
                }
                if let Some(min) = minimum {
                    if number < *min {
                        return Validation::rejected(format!("{} must be at least {}", label, min));
                    }
                }
                if let Some(max) = maximum {
                    if number > *max {
                        return Validation::rejected(format!("{} must be at most {}", label, max));
                    }
                }
                if let Some(step) = multiple_of {
                    let ratio = number / step;
                    if *step > 0.0 && (ratio - ratio.round()).abs() > 1e-9 {
                        return Validation::rejected(format!(
                            "{} must be a multiple of {}",
                            label, step
                        ));
                    }
                }
                Validation::ok()
            }
            SchemaNodeType::Array {
                min_items,
                max_items,
                ..
            } => {
                let Some(items) = value.as_array() else {
                    return expect_type(false, label, "a list", value);
                };
                let len = items.len() as u64;
                if let Some(min) = min_items {
                    if len < *min {
                        return Validation::rejected(format!(
                            "{} needs at least {} item(s)",
                            label, min
                        ));
                    }
                }
                if let Some(max) = max_items {
                    if len > *max {
                        return Validation::rejected(format!(
                            "{} allows at most {} item(s)",
                            label, max
                        ));
                    }
                }
                Validation::ok()
            }
            SchemaNodeType::OneOf { alternatives } | SchemaNodeType::AnyOf { alternatives } => {
                if alternatives.is_empty()
                    || alternatives
                        .iter()
                        .any(|alt| self.validate(alt, value, path).valid)
                {
                    Validation::ok()
                } else {
                    Validation::rejected(format!("{} does not match any allowed shape", label))
                }
            }
            SchemaNodeType::Ref { .. } | SchemaNodeType::Untyped => Validation::ok(),
        }
    }

    /// Pick the `oneOf`/`anyOf` alternative that matches the current value,
    /// falling back to the first one.
    pub fn select_alternative(
        &self,
        alternatives: &[SchemaNode],
        value: Option<&Value>,
        path: &PropertyPath,
    ) -> usize {
        let Some(value) = value else {
            return 0;
        };
        alternatives
            .iter()
            .position(|alt| {
                !matches!(alt.node_type, SchemaNodeType::Untyped | SchemaNodeType::Ref { .. })
                    && self.validate(alt, value, path).valid
            })
            .unwrap_or(0)
    }
}

fn expect_type(ok: bool, label: &str, expected: &str, value: &Value) -> Validation {
    if ok {
        Validation::ok()
    } else {
        Validation::rejected(format!(
            "{} must be {}, got {}",
            label,
            expected,
            json_type_name(value)
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RawSchema;
    use std::sync::Arc;

    fn fields() -> FormFieldResolver {
        let schema = RawSchema::from_value(json!({ "type": "object" })).unwrap();
        FormFieldResolver::new(SchemaResolver::new(Arc::new(schema)))
    }

    fn number(min: Option<f64>, max: Option<f64>) -> SchemaNode {
        SchemaNode::new(SchemaNodeType::Number {
            integer: false,
            minimum: min,
            maximum: max,
            multiple_of: None,
        })
    }

    #[test]
    fn test_classify_order() {
        let f = fields();
        let path = PropertyPath::parse("title.fontColor");

        let enum_node = SchemaNode::new(SchemaNodeType::Enum {
            values: vec![json!("Top")],
        });
        assert!(matches!(f.classify(&enum_node, &path), FieldKind::Enum(_)));

        let string = SchemaNode::new(SchemaNodeType::String);
        assert_eq!(f.classify(&string, &path), FieldKind::Color);
        assert_eq!(f.classify(&string, &PropertyPath::parse("title.text")), FieldKind::Text);

        let mut formatted = SchemaNode::new(SchemaNodeType::String);
        formatted.format = Some("color".to_string());
        assert_eq!(f.classify(&formatted, &PropertyPath::parse("solid.value")), FieldKind::Color);

        assert_eq!(
            f.classify(&number(None, None), &path),
            FieldKind::Number { integer: false }
        );
        assert_eq!(
            f.classify(&SchemaNode::new(SchemaNodeType::Untyped), &path),
            FieldKind::Unsupported
        );
        assert_eq!(
            f.classify(&SchemaNode::new(SchemaNodeType::Null), &path),
            FieldKind::Unsupported
        );
    }

    #[test]
    fn test_default_values() {
        let f = fields();
        let mut with_default = number(None, None);
        with_default.default = Some(json!(12));
        assert_eq!(f.default_value_for(&with_default), json!(12));
        assert_eq!(f.default_value_for(&number(None, None)), json!(0));
        assert_eq!(f.default_value_for(&SchemaNode::new(SchemaNodeType::String)), json!(""));
        assert_eq!(f.default_value_for(&SchemaNode::new(SchemaNodeType::Boolean)), json!(false));
        assert_eq!(
            f.default_value_for(&SchemaNode::new(SchemaNodeType::Enum {
                values: vec![json!("Left"), json!("Right")]
            })),
            json!("Left")
        );
        let array = SchemaNode::new(SchemaNodeType::Array {
            items: None,
            min_items: None,
            max_items: None,
        });
        assert_eq!(f.default_value_for(&array), json!([]));
    }

    #[test]
    fn test_validate_numbers() {
        let f = fields();
        let path = PropertyPath::parse("title.fontSize");
        let node = number(Some(8.0), Some(72.0));

        assert!(f.validate(&node, &json!(9), &path).valid);
        let low = f.validate(&node, &json!(5), &path);
        assert!(!low.valid);
        assert_eq!(low.error.as_deref(), Some("fontSize must be at least 8"));
        assert!(!f.validate(&node, &json!(100), &path).valid);
        assert!(!f.validate(&node, &json!("9"), &path).valid);

        let integer = SchemaNode::new(SchemaNodeType::Number {
            integer: true,
            minimum: None,
            maximum: None,
            multiple_of: Some(2.0),
        });
        assert!(f.validate(&integer, &json!(4), &path).valid);
        assert!(!f.validate(&integer, &json!(4.5), &path).valid);
        assert!(!f.validate(&integer, &json!(3), &path).valid);
    }

    #[test]
    fn test_validate_enum_and_arrays() {
        let f = fields();
        let path = PropertyPath::parse("legend.position");
        let node = SchemaNode::new(SchemaNodeType::Enum {
            values: vec![json!("Top"), json!("Bottom")],
        });
        assert!(f.validate(&node, &json!("Top"), &path).valid);
        assert!(!f.validate(&node, &json!("Left"), &path).valid);

        let array = SchemaNode::new(SchemaNodeType::Array {
            items: None,
            min_items: Some(1),
            max_items: Some(2),
        });
        assert!(!f.validate(&array, &json!([]), &path).valid);
        assert!(f.validate(&array, &json!([1, 2]), &path).valid);
        assert!(!f.validate(&array, &json!([1, 2, 3]), &path).valid);
        // children are not inspected
        assert!(f.validate(&array, &json!([{ "anything": true }]), &path).valid);
    }

    #[test]
    fn test_select_alternative() {
        let f = fields();
        let path = PropertyPath::parse("position");
        let alternatives = vec![
            SchemaNode::new(SchemaNodeType::Enum {
                values: vec![json!("auto")],
            }),
            number(None, None),
        ];
        assert_eq!(f.select_alternative(&alternatives, None, &path), 0);
        assert_eq!(f.select_alternative(&alternatives, Some(&json!("auto")), &path), 0);
        assert_eq!(f.select_alternative(&alternatives, Some(&json!(4)), &path), 1);
        assert_eq!(f.select_alternative(&alternatives, Some(&json!(true)), &path), 0);
    }
}
