//! JSON Schema resolution with $ref and allOf support
//!
//! Turns a property path plus the raw schema into one effective, dereferenced
//! `SchemaNode`. Every public call runs its own `Resolution`, which carries the
//! set of `(schema location, $ref)` pairs already followed and the depth bound.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use super::node::{SchemaNode, SchemaNodeType};
use super::path::{PathSegment, PropertyPath};
use super::store::RawSchema;

/// Reference bound on nesting depth for one resolution
pub const DEFAULT_MAX_DEPTH: usize = 10;

const DEFINITIONS_PREFIX: &str = "#/definitions/";
const PROPERTIES_PREFIX: &str = "#/properties/";

// ============================================================================
// Resolver
// ============================================================================

/// Resolves property paths and references against one loaded schema
#[derive(Clone)]
pub struct SchemaResolver {
    schema: Arc<RawSchema>,
    max_depth: usize,
}

impl SchemaResolver {
    pub fn new(schema: Arc<RawSchema>) -> Self {
        Self {
            schema,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn schema(&self) -> &RawSchema {
        &self.schema
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Effective schema at `path`, starting from the root `properties`.
    /// `None` when any segment does not exist.
    pub fn resolve_path(&self, path: &PropertyPath) -> Option<SchemaNode> {
        Resolution::new(&self.schema, self.max_depth).resolve_path(path)
    }

    /// Effective schema for a reference string. Only `#/definitions/...` and
    /// `#/properties/...` are supported; anything else is "not found".
    pub fn resolve_ref(&self, reference: &str) -> Option<SchemaNode> {
        let mut resolution = Resolution::new(&self.schema, self.max_depth);
        let target = resolution.lookup_ref(reference)?;
        resolution.resolve_at(target, reference)
    }

    /// Effective schema for an arbitrary raw fragment of this document
    pub fn resolve_fragment(&self, fragment: &Value) -> Option<SchemaNode> {
        Resolution::new(&self.schema, self.max_depth).resolve_at(fragment, "#")
    }

    /// Style schema for one visual type (`visualStyles.<visual>`)
    pub fn visual_schema(&self, visual_type: &str) -> Option<SchemaNode> {
        self.resolve_path(&PropertyPath::from_keys(["visualStyles", visual_type]))
    }

    /// Style schema for one variant of a visual type (`visualStyles.<visual>.<variant>`)
    pub fn variant_schema(&self, visual_type: &str, variant: &str) -> Option<SchemaNode> {
        self.resolve_path(&PropertyPath::from_keys(["visualStyles", visual_type, variant]))
    }
}

// ============================================================================
// Resolution Context
// ============================================================================

/// Outcome of dereferencing one raw node
enum Effective {
    /// `$ref` followed and `allOf` flattened
    Node(Map<String, Value>),
    /// The node as written, its reference left unexpanded
    Unexpanded(Map<String, Value>),
    /// Depth bound exceeded
    TooDeep,
}

struct Resolution<'a> {
    schema: &'a RawSchema,
    visited: HashSet<(String, String)>,
    max_depth: usize,
}

impl<'a> Resolution<'a> {
    fn new(schema: &'a RawSchema, max_depth: usize) -> Self {
        Self {
            schema,
            visited: HashSet::new(),
            max_depth,
        }
    }

    fn resolve_path(&mut self, path: &PropertyPath) -> Option<SchemaNode> {
        let schema = self.schema;
        let Some((first, rest)) = path.split_first() else {
            return self.resolve_at(schema.root(), "#");
        };

        let first = first.as_key();
        let mut current = self.schema.properties()?.get(&first)?.clone();
        let mut location = format!("{}{}", PROPERTIES_PREFIX, escape(&first));

        for segment in rest.segments() {
            let effective = match self.dereference(&current, &location, 0) {
                Effective::Node(obj) => obj,
                Effective::Unexpanded(_) | Effective::TooDeep => {
                    debug!("Schema path {} stops at unresolvable node {}", path, location);
                    return None;
                }
            };
            let (child, child_location) = self.child(&effective, segment, &location, 0)?;
            current = child;
            location = child_location;
        }

        self.resolve_at(&current, &location)
    }

    /// Dereference and expand the node at `location`; `None` past the depth bound
    fn resolve_at(&mut self, node: &Value, location: &str) -> Option<SchemaNode> {
        match self.dereference(node, location, 0) {
            Effective::Node(obj) => Some(self.build(&obj, location, 0)),
            Effective::Unexpanded(obj) => Some(unexpanded_node(&obj)),
            Effective::TooDeep => {
                debug!("Schema resolution exceeded depth {} at {}", self.max_depth, location);
                None
            }
        }
    }

    /// Expand a child node; past the depth bound it is left as a placeholder
    fn expand(&mut self, node: &Value, location: &str, depth: usize) -> SchemaNode {
        match self.dereference(node, location, depth) {
            Effective::Node(obj) => self.build(&obj, location, depth),
            Effective::Unexpanded(obj) => unexpanded_node(&obj),
            Effective::TooDeep => {
                debug!("Schema expansion exceeded depth {} at {}", self.max_depth, location);
                match node.as_object() {
                    Some(obj) => unexpanded_node(obj),
                    None => SchemaNode::new(SchemaNodeType::Untyped),
                }
            }
        }
    }

    /// Follow `$ref` (local attributes win over the target) and flatten `allOf`
    fn dereference(&mut self, node: &Value, location: &str, depth: usize) -> Effective {
        if depth > self.max_depth {
            return Effective::TooDeep;
        }

        // Boolean schemas (`true`) and malformed fragments accept anything.
        let Some(obj) = node.as_object() else {
            return Effective::Node(Map::new());
        };

        let Some(reference) = obj.get("$ref").and_then(Value::as_str) else {
            return self.flatten_all_of(obj.clone(), location, depth);
        };

        if !self
            .visited
            .insert((location.to_string(), reference.to_string()))
        {
            debug!("Reference cycle through {} at {}", reference, location);
            return Effective::Unexpanded(obj.clone());
        }

        let Some(target) = self.lookup_ref(reference) else {
            debug!("Unresolved reference {} at {}", reference, location);
            return Effective::Unexpanded(obj.clone());
        };

        match self.dereference(target, location, depth + 1) {
            Effective::Node(mut resolved) => {
                for (key, value) in obj {
                    if key != "$ref" {
                        resolved.insert(key.clone(), value.clone());
                    }
                }
                self.flatten_all_of(resolved, location, depth)
            }
            Effective::Unexpanded(_) => Effective::Unexpanded(obj.clone()),
            Effective::TooDeep => Effective::TooDeep,
        }
    }

    /// Union of the `allOf` parts' properties. Later parts win on property name,
    /// type and annotations; `required` lists are unioned; attributes written on
    /// the node itself win over everything composed into it.
    fn flatten_all_of(
        &mut self,
        mut obj: Map<String, Value>,
        location: &str,
        depth: usize,
    ) -> Effective {
        let Some(Value::Array(parts)) = obj.remove("allOf") else {
            return Effective::Node(obj);
        };

        let mut merged = Map::new();
        let mut properties = Map::new();
        let mut required: Vec<Value> = Vec::new();

        for (i, part) in parts.iter().enumerate() {
            let part_location = format!("{}/allOf/{}", location, i);
            match self.dereference(part, &part_location, depth + 1) {
                Effective::Node(p) | Effective::Unexpanded(p) => {
                    absorb(p, &mut merged, &mut properties, &mut required)
                }
                Effective::TooDeep => {
                    debug!("Skipping allOf part at {}: depth exceeded", part_location);
                }
            }
        }
        absorb(obj, &mut merged, &mut properties, &mut required);

        if !properties.is_empty() {
            merged.insert("properties".to_string(), Value::Object(properties));
            merged
                .entry("type")
                .or_insert_with(|| Value::String("object".to_string()));
        }
        if !required.is_empty() {
            merged.insert("required".to_string(), Value::Array(required));
        }

        Effective::Node(merged)
    }

    /// Raw target of a reference
    fn lookup_ref(&self, reference: &str) -> Option<&'a Value> {
        if let Some(rest) = reference.strip_prefix(DEFINITIONS_PREFIX) {
            let (name, pointer) = match rest.split_once('/') {
                Some((name, pointer)) => (name, Some(pointer)),
                None => (rest, None),
            };
            let definition = self.schema.definition(&unescape(name))?;
            return match pointer {
                Some(pointer) => definition.pointer(&format!("/{}", pointer)),
                None => Some(definition),
            };
        }

        if let Some(rest) = reference.strip_prefix(PROPERTIES_PREFIX) {
            return self
                .schema
                .root()
                .get("properties")?
                .pointer(&format!("/{}", rest));
        }

        None
    }

    /// Step from an effective node to the child named by `segment`
    fn child(
        &mut self,
        effective: &Map<String, Value>,
        segment: &PathSegment,
        location: &str,
        depth: usize,
    ) -> Option<(Value, String)> {
        if depth > self.max_depth {
            return None;
        }

        if let PathSegment::Key(key) = segment {
            if let Some(child) = effective
                .get("properties")
                .and_then(Value::as_object)
                .and_then(|props| props.get(key))
            {
                return Some((child.clone(), format!("{}/properties/{}", location, escape(key))));
            }
        }

        if let Some(items) = items_schema(effective) {
            let items_location = format!("{}/items", location);
            if segment.as_index().is_some() {
                return Some((items.clone(), items_location));
            }
            // A key below an array addresses the items' properties.
            let Effective::Node(item) = self.dereference(items, &items_location, depth + 1) else {
                return None;
            };
            return self.child(&item, segment, &items_location, depth + 1);
        }

        if let Some(additional) = effective
            .get("additionalProperties")
            .filter(|v| v.is_object())
        {
            return Some((additional.clone(), format!("{}/additionalProperties", location)));
        }

        for keyword in ["oneOf", "anyOf"] {
            let Some(alternatives) = effective.get(keyword).and_then(Value::as_array) else {
                continue;
            };
            for (i, alternative) in alternatives.iter().enumerate() {
                let alt_location = format!("{}/{}/{}", location, keyword, i);
                if let Effective::Node(alt) = self.dereference(alternative, &alt_location, depth + 1) {
                    if let Some(found) = self.child(&alt, segment, &alt_location, depth + 1) {
                        return Some(found);
                    }
                }
            }
        }

        None
    }

    /// Convert an effective raw node into a typed node, expanding children
    fn build(&mut self, obj: &Map<String, Value>, location: &str, depth: usize) -> SchemaNode {
        let mut node = annotated(SchemaNodeType::Untyped, obj);

        node.node_type = if let Some(values) = obj.get("enum").and_then(Value::as_array) {
            SchemaNodeType::Enum {
                values: values.clone(),
            }
        } else if let Some(constant) = obj.get("const") {
            SchemaNodeType::Enum {
                values: vec![constant.clone()],
            }
        } else if let Some(alternatives) = obj.get("oneOf").and_then(Value::as_array) {
            SchemaNodeType::OneOf {
                alternatives: self.expand_alternatives(alternatives, "oneOf", location, depth),
            }
        } else if let Some(alternatives) = obj.get("anyOf").and_then(Value::as_array) {
            SchemaNodeType::AnyOf {
                alternatives: self.expand_alternatives(alternatives, "anyOf", location, depth),
            }
        } else {
            match effective_type(obj) {
                Some("null") => SchemaNodeType::Null,
                Some("boolean") => SchemaNodeType::Boolean,
                Some("string") => SchemaNodeType::String,
                Some(t @ ("integer" | "number")) => SchemaNodeType::Number {
                    integer: t == "integer",
                    minimum: obj.get("minimum").and_then(Value::as_f64),
                    maximum: obj.get("maximum").and_then(Value::as_f64),
                    multiple_of: obj.get("multipleOf").and_then(Value::as_f64),
                },
                Some("array") => SchemaNodeType::Array {
                    items: items_schema(obj).map(|items| {
                        Box::new(self.expand(items, &format!("{}/items", location), depth + 1))
                    }),
                    min_items: obj.get("minItems").and_then(Value::as_u64),
                    max_items: obj.get("maxItems").and_then(Value::as_u64),
                },
                Some("object") => self.build_object(obj, location, depth),
                _ => SchemaNodeType::Untyped,
            }
        };

        node
    }

    fn build_object(
        &mut self,
        obj: &Map<String, Value>,
        location: &str,
        depth: usize,
    ) -> SchemaNodeType {
        let required: Vec<String> = obj
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| arr.iter().filter_map(Value::as_str).map(String::from).collect())
            .unwrap_or_default();

        let mut properties = std::collections::BTreeMap::new();
        if let Some(props) = obj.get("properties").and_then(Value::as_object) {
            for (name, prop_schema) in props {
                let prop_location = format!("{}/properties/{}", location, escape(name));
                let mut resolved = self.expand(prop_schema, &prop_location, depth + 1);
                resolved.required = required.contains(name);
                properties.insert(name.clone(), resolved);
            }
        }

        let additional_properties = obj
            .get("additionalProperties")
            .filter(|v| v.is_object())
            .map(|additional| {
                let additional_location = format!("{}/additionalProperties", location);
                Box::new(self.expand(additional, &additional_location, depth + 1))
            });

        SchemaNodeType::Object {
            properties,
            required,
            additional_properties,
        }
    }

    fn expand_alternatives(
        &mut self,
        alternatives: &[Value],
        keyword: &str,
        location: &str,
        depth: usize,
    ) -> Vec<SchemaNode> {
        alternatives
            .iter()
            .enumerate()
            .map(|(i, alt)| self.expand(alt, &format!("{}/{}/{}", location, keyword, i), depth + 1))
            .collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Node type, inferring `object`/`array` from structure when `type` is absent.
/// A list of types resolves to its first non-null entry.
fn effective_type(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("type") {
        Some(Value::String(t)) => Some(t.as_str()),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            names
                .iter()
                .copied()
                .find(|t| *t != "null")
                .or_else(|| names.first().copied())
        }
        _ if obj.contains_key("properties") || obj.contains_key("additionalProperties") => {
            Some("object")
        }
        _ if obj.contains_key("items") => Some("array"),
        _ => None,
    }
}

/// Fold one composed part into the running `allOf` union
fn absorb(
    part: Map<String, Value>,
    merged: &mut Map<String, Value>,
    properties: &mut Map<String, Value>,
    required: &mut Vec<Value>,
) {
    for (key, value) in part {
        match (key.as_str(), value) {
            ("$ref", _) => {}
            ("properties", Value::Object(props)) => properties.extend(props),
            ("required", Value::Array(names)) => {
                for name in names {
                    if !required.contains(&name) {
                        required.push(name);
                    }
                }
            }
            (_, value) => {
                merged.insert(key, value);
            }
        }
    }
}

/// `items`, taking the first entry of a tuple-style items list
fn items_schema(obj: &Map<String, Value>) -> Option<&Value> {
    match obj.get("items")? {
        Value::Array(tuple) => tuple.first(),
        items => Some(items),
    }
}

fn annotated(node_type: SchemaNodeType, obj: &Map<String, Value>) -> SchemaNode {
    let mut node = SchemaNode::new(node_type);
    node.title = obj.get("title").and_then(Value::as_str).map(String::from);
    node.description = obj.get("description").and_then(Value::as_str).map(String::from);
    node.format = obj.get("format").and_then(Value::as_str).map(String::from);
    node.default = obj.get("default").cloned();
    node
}

fn unexpanded_node(obj: &Map<String, Value>) -> SchemaNode {
    match obj.get("$ref").and_then(Value::as_str) {
        Some(reference) => annotated(
            SchemaNodeType::Ref {
                reference: reference.to_string(),
            },
            obj,
        ),
        None => annotated(SchemaNodeType::Untyped, obj),
    }
}

/// JSON pointer token escaping
fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

// ============================================================================
// Tests
// ============================================================================
