//! Recursive Form Renderer
//!
//! Mounts one field per schema node, walks schema and value in lockstep and
//! turns edits into whole-subtree replacement values for the parent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

use super::fields::{FieldKind, FormFieldResolver};
use crate::schema::node::display_literal;
use crate::schema::{PathSegment, PropertyPath, SchemaNode, SchemaNodeType};

/// Receives the complete new root value after every committed edit
pub type ChangeHandler = Box<dyn FnMut(&Value) + Send>;

// ============================================================================
// Edit Protocol
// ============================================================================

/// A user edit addressed to one mounted field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EditAction {
    /// Replace the field's value
    Set { value: Value },
    /// Pick one of an enum field's literals by position
    Choose { index: usize },
    /// Add an item built from the items schema's default
    Append,
    RemoveAt { index: usize },
    /// Switch a `oneOf`/`anyOf` field to another alternative
    SelectAlternative { index: usize },
}

/// What happened to an edit
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum EditOutcome {
    /// Accepted; carries the new value of the field that was addressed
    Committed { value: Value },
    /// Failed validation; the field kept its last committed value
    Rejected { error: String },
    /// The control is disabled (bounds reached, index out of range, wrong kind)
    Refused { reason: String },
    /// Unsupported field; never emits
    ReadOnly,
    UnknownField,
}

impl EditOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, EditOutcome::Committed { .. })
    }
}

/// Edit state of a mounted field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldState {
    Idle,
    PendingValidate,
    Committed,
    Rejected,
}

// ============================================================================
// Field View
// ============================================================================

/// Serializable description of a rendered field
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub path: PropertyPath,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(flatten)]
    pub widget: Widget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EnumOption {
    pub label: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "widget", rename_all = "camelCase")]
pub enum Widget {
    Text {
        value: String,
    },
    Color {
        value: String,
    },
    #[serde(rename_all = "camelCase")]
    Number {
        value: Value,
        integer: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    Boolean {
        value: bool,
    },
    Enum {
        options: Vec<EnumOption>,
        selected: Option<usize>,
    },
    Object {
        fields: Vec<FieldView>,
    },
    #[serde(rename_all = "camelCase")]
    Array {
        items: Vec<FieldView>,
        can_append: bool,
        can_remove: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_items: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_items: Option<u64>,
    },
    Alternatives {
        labels: Vec<String>,
        selected: usize,
        inner: Box<FieldView>,
    },
    /// Visible, disabled placeholder
    Unsupported {
        reason: String,
    },
}

impl FieldView {
    /// Find a descendant view by path
    pub fn find(&self, path: &PropertyPath) -> Option<&FieldView> {
        if &self.path == path {
            if let Widget::Alternatives { inner, .. } = &self.widget {
                return Some(inner.find(path).unwrap_or(self));
            }
            return Some(self);
        }
        match &self.widget {
            Widget::Object { fields } => fields.iter().find_map(|f| f.find(path)),
            Widget::Array { items, .. } => items.iter().find_map(|f| f.find(path)),
            Widget::Alternatives { inner, .. } => inner.find(path),
            _ => None,
        }
    }
}

// ============================================================================
// Mounted Fields
// ============================================================================

#[derive(Clone, Debug)]
enum Children {
    None,
    Object(BTreeMap<String, MountedField>),
    Array(Vec<MountedField>),
    Alternative {
        selected: usize,
        inner: Box<MountedField>,
    },
}

#[derive(Clone, Debug)]
struct MountedField {
    path: PropertyPath,
    schema: SchemaNode,
    /// Last committed value; `None` means nothing stored yet and the default is shown
    committed: Option<Value>,
    state: FieldState,
    error: Option<String>,
    children: Children,
}

impl MountedField {
    fn mount(
        fields: &FormFieldResolver,
        path: PropertyPath,
        schema: SchemaNode,
        committed: Option<Value>,
    ) -> Self {
        // Children show what the field shows, the schema default included
        let shown = committed
            .clone()
            .unwrap_or_else(|| fields.default_value_for(&schema));
        let children = mount_children(fields, &path, &schema, &shown);
        Self {
            path,
            schema,
            committed,
            state: FieldState::Idle,
            error: None,
            children,
        }
    }

    fn remount_children(&mut self, fields: &FormFieldResolver) {
        let shown = self.display_value(fields);
        self.children = mount_children(fields, &self.path, &self.schema, &shown);
    }

    fn display_value(&self, fields: &FormFieldResolver) -> Value {
        self.committed
            .clone()
            .unwrap_or_else(|| fields.default_value_for(&self.schema))
    }

    fn transition(&mut self, next: FieldState) {
        debug!(path = %self.path, from = ?self.state, to = ?next, "Field state change");
        self.state = next;
    }

    fn is_read_only(&self) -> bool {
        match &self.schema.node_type {
            SchemaNodeType::OneOf { alternatives } | SchemaNodeType::AnyOf { alternatives } => {
                alternatives.is_empty()
            }
            SchemaNodeType::Null | SchemaNodeType::Ref { .. } | SchemaNodeType::Untyped => true,
            _ => false,
        }
    }

    /// Run the validate-then-commit cycle for a pending value
    fn commit(&mut self, fields: &FormFieldResolver, candidate: Value) -> EditOutcome {
        self.transition(FieldState::PendingValidate);
        let validation = fields.validate(&self.schema, &candidate, &self.path);
        if validation.valid {
            self.accept(candidate)
        } else {
            let error = validation
                .error
                .unwrap_or_else(|| format!("invalid value for {}", self.path));
            self.reject(error)
        }
    }

    fn accept(&mut self, value: Value) -> EditOutcome {
        self.committed = Some(value.clone());
        self.error = None;
        self.transition(FieldState::Committed);
        self.transition(FieldState::Idle);
        EditOutcome::Committed { value }
    }

    fn reject(&mut self, error: String) -> EditOutcome {
        debug!(path = %self.path, error = %error, "Edit rejected");
        self.error = Some(error.clone());
        self.transition(FieldState::Rejected);
        self.transition(FieldState::Idle);
        EditOutcome::Rejected { error }
    }

    fn refuse(&self, reason: impl Into<String>) -> EditOutcome {
        let reason = reason.into();
        debug!(path = %self.path, reason = %reason, "Edit refused");
        EditOutcome::Refused { reason }
    }

    fn apply(
        &mut self,
        fields: &FormFieldResolver,
        rest: &[PathSegment],
        action: EditAction,
    ) -> EditOutcome {
        // Alternatives are transparent: they share the path of the chosen shape
        if let Children::Alternative { inner, .. } = &mut self.children {
            let targets_selector =
                rest.is_empty() && matches!(action, EditAction::SelectAlternative { .. });
            if !targets_selector {
                let snapshot = (**inner).clone();
                return match inner.apply(fields, rest, action) {
                    EditOutcome::Committed { value } => {
                        self.absorb_child(fields, value, |field| {
                            if let Children::Alternative { inner, .. } = &mut field.children {
                                **inner = snapshot;
                                Some(&mut **inner)
                            } else {
                                None
                            }
                        })
                    }
                    other => other,
                };
            }
        }

        match rest.split_first() {
            None => self.apply_here(fields, action),
            Some((segment, rest)) => self.apply_below(fields, segment, rest, action),
        }
    }

    fn apply_here(&mut self, fields: &FormFieldResolver, action: EditAction) -> EditOutcome {
        if self.is_read_only() {
            debug!(path = %self.path, "Edit ignored on read-only field");
            return EditOutcome::ReadOnly;
        }

        match action {
            EditAction::Set { value } => {
                let outcome = self.commit(fields, value);
                if outcome.is_committed() {
                    self.remount_children(fields);
                }
                outcome
            }
            EditAction::Choose { index } => {
                let SchemaNodeType::Enum { values } = &self.schema.node_type else {
                    return self.refuse("field is not an enumeration");
                };
                match values.get(index).cloned() {
                    // Membership is the validation
                    Some(literal) => {
                        self.transition(FieldState::PendingValidate);
                        self.accept(literal)
                    }
                    None => self.refuse(format!("no option at position {}", index)),
                }
            }
            EditAction::Append => {
                let SchemaNodeType::Array {
                    items, max_items, ..
                } = &self.schema.node_type
                else {
                    return self.refuse("field is not a list");
                };
                let mut current = self.current_items(fields);
                if max_items.map_or(false, |max| current.len() as u64 >= max) {
                    return self.refuse("list is at its maximum length");
                }
                let item = items
                    .as_deref()
                    .map(|schema| fields.default_value_for(schema))
                    .unwrap_or(Value::Null);
                current.push(item);
                let outcome = self.commit(fields, Value::Array(current));
                if outcome.is_committed() {
                    self.remount_children(fields);
                }
                outcome
            }
            EditAction::RemoveAt { index } => {
                let SchemaNodeType::Array { min_items, .. } = &self.schema.node_type else {
                    return self.refuse("field is not a list");
                };
                let mut current = self.current_items(fields);
                if current.len() as u64 <= min_items.unwrap_or(0) {
                    return self.refuse("list is at its minimum length");
                }
                if index >= current.len() {
                    return self.refuse(format!("no item at position {}", index));
                }
                current.remove(index);
                let outcome = self.commit(fields, Value::Array(current));
                if outcome.is_committed() {
                    self.remount_children(fields);
                }
                outcome
            }
            EditAction::SelectAlternative { index } => {
                let Some(alternative) = self
                    .schema
                    .alternatives()
                    .and_then(|alts| alts.get(index))
                    .cloned()
                else {
                    return self.refuse(format!("no alternative at position {}", index));
                };
                let value = fields.default_value_for(&alternative);
                let outcome = self.commit(fields, value.clone());
                if outcome.is_committed() {
                    self.children = Children::Alternative {
                        selected: index,
                        inner: Box::new(MountedField::mount(
                            fields,
                            self.path.clone(),
                            alternative,
                            Some(value),
                        )),
                    };
                }
                outcome
            }
        }
    }

    fn apply_below(
        &mut self,
        fields: &FormFieldResolver,
        segment: &PathSegment,
        rest: &[PathSegment],
        action: EditAction,
    ) -> EditOutcome {
        // Object keys and array positions are told apart by the field, not
        // the segment: paths arriving as string arrays only carry keys
        match self.children {
            Children::Object(_) => {
                let key = segment.as_key();
                let Children::Object(children) = &mut self.children else {
                    return EditOutcome::UnknownField;
                };
                let Some(child) = children.get_mut(&key) else {
                    return EditOutcome::UnknownField;
                };
                let snapshot = child.clone();
                let value = match child.apply(fields, rest, action) {
                    EditOutcome::Committed { value } => value,
                    other => return other,
                };

                // Shallow copy of what is shown; only the edited key changes
                let mut object = match self.display_value(fields) {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                object.insert(key.clone(), value);
                self.absorb_child(fields, Value::Object(object), |field| match &mut field.children {
                    Children::Object(children) => children.get_mut(&key).map(|child| {
                        *child = snapshot;
                        child
                    }),
                    _ => None,
                })
            }
            Children::Array(_) => {
                let Some(index) = segment.as_index() else {
                    return EditOutcome::UnknownField;
                };
                let Children::Array(items) = &mut self.children else {
                    return EditOutcome::UnknownField;
                };
                let Some(child) = items.get_mut(index) else {
                    return EditOutcome::UnknownField;
                };
                let snapshot = child.clone();
                let value = match child.apply(fields, rest, action) {
                    EditOutcome::Committed { value } => value,
                    other => return other,
                };

                let mut array = self.current_items(fields);
                if index < array.len() {
                    array[index] = value;
                }
                self.absorb_child(fields, Value::Array(array), |field| match &mut field.children {
                    Children::Array(items) => items.get_mut(index).map(|child| {
                        *child = snapshot;
                        child
                    }),
                    _ => None,
                })
            }
            _ => EditOutcome::UnknownField,
        }
    }

    /// Validate a child's change one level up; on rejection the child is
    /// restored to its previous state and shows the error.
    fn absorb_child<F>(
        &mut self,
        fields: &FormFieldResolver,
        candidate: Value,
        restore: F,
    ) -> EditOutcome
    where
        F: FnOnce(&mut MountedField) -> Option<&mut MountedField>,
    {
        let outcome = self.commit(fields, candidate);
        if let EditOutcome::Rejected { error } = &outcome {
            if let Some(child) = restore(self) {
                child.error = Some(error.clone());
            }
        }
        outcome
    }

    fn current_items(&self, fields: &FormFieldResolver) -> Vec<Value> {
        match self.display_value(fields) {
            Value::Array(items) => items,
            _ => Vec::new(),
        }
    }

    fn find(&self, path: &[PathSegment]) -> Option<&MountedField> {
        if let Children::Alternative { inner, .. } = &self.children {
            if path.is_empty() {
                return Some(inner.find(path).unwrap_or(self));
            }
            return inner.find(path);
        }
        match path.split_first() {
            None => Some(self),
            Some((segment, rest)) => match &self.children {
                Children::Object(children) => children.get(&segment.as_key())?.find(rest),
                Children::Array(items) => items.get(segment.as_index()?)?.find(rest),
                _ => None,
            },
        }
    }

    fn view(&self, fields: &FormFieldResolver) -> FieldView {
        let display = self.display_value(fields);
        let widget = match &self.children {
            Children::Object(children) => Widget::Object {
                fields: children.values().map(|child| child.view(fields)).collect(),
            },
            Children::Array(items) => {
                let (min_items, max_items) = match &self.schema.node_type {
                    SchemaNodeType::Array {
                        min_items,
                        max_items,
                        ..
                    } => (*min_items, *max_items),
                    _ => (None, None),
                };
                let len = items.len() as u64;
                Widget::Array {
                    items: items.iter().map(|item| item.view(fields)).collect(),
                    can_append: max_items.map_or(true, |max| len < max),
                    can_remove: len > min_items.unwrap_or(0),
                    min_items,
                    max_items,
                }
            }
            Children::Alternative { selected, inner } => Widget::Alternatives {
                labels: self
                    .schema
                    .alternatives()
                    .unwrap_or_default()
                    .iter()
                    .enumerate()
                    .map(|(i, alt)| alt.label(i))
                    .collect(),
                selected: *selected,
                inner: Box::new(inner.view(fields)),
            },
            Children::None => self.leaf_widget(fields, display),
        };

        FieldView {
            path: self.path.clone(),
            label: self.label(),
            description: self.schema.description.clone(),
            required: self.schema.required,
            widget,
            error: self.error.clone(),
        }
    }

    fn leaf_widget(&self, fields: &FormFieldResolver, display: Value) -> Widget {
        match fields.classify(&self.schema, &self.path) {
            FieldKind::Enum(values) => Widget::Enum {
                options: values
                    .iter()
                    .map(|v| EnumOption {
                        label: display_literal(v),
                        value: v.clone(),
                    })
                    .collect(),
                selected: values.iter().position(|v| v == &display),
            },
            FieldKind::Color => Widget::Color {
                value: text_of(&display),
            },
            FieldKind::Text => Widget::Text {
                value: text_of(&display),
            },
            FieldKind::Number { integer } => {
                let (minimum, maximum) = match &self.schema.node_type {
                    SchemaNodeType::Number {
                        minimum, maximum, ..
                    } => (*minimum, *maximum),
                    _ => (None, None),
                };
                Widget::Number {
                    value: display,
                    integer,
                    minimum,
                    maximum,
                }
            }
            FieldKind::Boolean => Widget::Boolean {
                value: display.as_bool().unwrap_or(false),
            },
            FieldKind::Array { .. } | FieldKind::Object { .. } | FieldKind::Unsupported => {
                Widget::Unsupported {
                    reason: self.unsupported_reason(),
                }
            }
        }
    }

    fn unsupported_reason(&self) -> String {
        match &self.schema.node_type {
            SchemaNodeType::Ref { reference } => format!("{} is not expanded here", reference),
            SchemaNodeType::Null => "null values are not editable".to_string(),
            SchemaNodeType::OneOf { .. } | SchemaNodeType::AnyOf { .. } => {
                "no alternatives to choose from".to_string()
            }
            _ => "no editable type".to_string(),
        }
    }

    fn label(&self) -> String {
        if let Some(title) = &self.schema.title {
            return title.clone();
        }
        match self.path.last() {
            Some(PathSegment::Key(key)) => key.clone(),
            Some(PathSegment::Index(index)) => format!("#{}", index + 1),
            None => "value".to_string(),
        }
    }
}

fn mount_children(
    fields: &FormFieldResolver,
    path: &PropertyPath,
    schema: &SchemaNode,
    value: &Value,
) -> Children {
    match &schema.node_type {
        SchemaNodeType::Object {
            properties,
            additional_properties,
            ..
        } => {
            let stored = value.as_object();
            let mut children: BTreeMap<String, MountedField> = properties
                .iter()
                .map(|(name, child)| {
                    let child_value = stored.and_then(|map| map.get(name)).cloned();
                    let field =
                        MountedField::mount(fields, path.push_property(name), child.clone(), child_value);
                    (name.clone(), field)
                })
                .collect();

            // Keys outside `properties` (variant names, for instance)
            if let (Some(extra), Some(stored)) = (additional_properties, stored) {
                for (name, child_value) in stored {
                    if !children.contains_key(name) {
                        let field = MountedField::mount(
                            fields,
                            path.push_property(name),
                            extra.as_ref().clone(),
                            Some(child_value.clone()),
                        );
                        children.insert(name.clone(), field);
                    }
                }
            }
            Children::Object(children)
        }
        SchemaNodeType::Array { items, .. } => {
            let item_schema = items
                .as_deref()
                .cloned()
                .unwrap_or_else(|| SchemaNode::new(SchemaNodeType::Untyped));
            let stored = value.as_array().cloned().unwrap_or_default();
            Children::Array(
                stored
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        MountedField::mount(fields, path.push_index(i), item_schema.clone(), Some(item))
                    })
                    .collect(),
            )
        }
        SchemaNodeType::OneOf { alternatives } | SchemaNodeType::AnyOf { alternatives }
            if !alternatives.is_empty() =>
        {
            let selected = fields.select_alternative(alternatives, Some(value), path);
            Children::Alternative {
                selected,
                inner: Box::new(MountedField::mount(
                    fields,
                    path.clone(),
                    alternatives[selected].clone(),
                    Some(value.clone()),
                )),
            }
        }
        _ => Children::None,
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => display_literal(other),
    }
}

// ============================================================================
// Form Session
// ============================================================================

/// A mounted form for one schema node and its value
pub struct FormSession {
    fields: FormFieldResolver,
    root: MountedField,
    on_change: ChangeHandler,
}

impl FormSession {
    /// Mount a form. `path` is where `schema` sits in the theme; edit paths
    /// passed to [`FormSession::edit`] are relative to it.
    pub fn mount(
        fields: FormFieldResolver,
        path: PropertyPath,
        schema: SchemaNode,
        value: Option<Value>,
        on_change: ChangeHandler,
    ) -> Self {
        let root = MountedField::mount(&fields, path, schema, value);
        Self {
            fields,
            root,
            on_change,
        }
    }

    /// Resolve `path` and mount a form for it; `None` when nothing resolves
    pub fn mount_path(
        fields: FormFieldResolver,
        path: PropertyPath,
        value: Option<Value>,
        on_change: ChangeHandler,
    ) -> Option<Self> {
        let schema = fields.field_at(&path)?;
        Some(Self::mount(fields, path, schema, value, on_change))
    }

    pub fn render(&self) -> FieldView {
        self.root.view(&self.fields)
    }

    /// Last committed root value; `None` until something is stored
    pub fn value(&self) -> Option<&Value> {
        self.root.committed.as_ref()
    }

    /// State of the field at a relative path
    pub fn state_at(&self, path: &PropertyPath) -> Option<FieldState> {
        let segments: Vec<PathSegment> = path.segments().cloned().collect();
        self.root.find(&segments).map(|field| field.state)
    }

    /// Apply an edit to the field at a relative path. A committed edit
    /// reaches `on_change` as the complete new root value.
    pub fn edit(&mut self, path: &PropertyPath, action: EditAction) -> EditOutcome {
        let segments: Vec<PathSegment> = path.segments().cloned().collect();
        let outcome = self.root.apply(&self.fields, &segments, action);
        if let EditOutcome::Committed { value } = &outcome {
            (self.on_change)(value);
        }
        outcome
    }
}

/// Render `schema` with `value` without keeping a session around
pub fn render(
    fields: &FormFieldResolver,
    path: &PropertyPath,
    schema: &SchemaNode,
    value: Option<&Value>,
) -> FieldView {
    MountedField::mount(fields, path.clone(), schema.clone(), value.cloned()).view(fields)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{RawSchema, SchemaResolver};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn fields() -> FormFieldResolver {
        let schema = RawSchema::from_value(json!({ "type": "object" })).unwrap();
        FormFieldResolver::new(SchemaResolver::new(Arc::new(schema)))
    }

    fn node(value: Value) -> SchemaNode {
        let schema = RawSchema::from_value(json!({ "type": "object" })).unwrap();
        SchemaResolver::new(Arc::new(schema))
            .resolve_fragment(&value)
            .unwrap()
    }

    fn title_schema() -> SchemaNode {
        node(json!({
            "type": "object",
            "properties": {
                "fontSize": { "type": "number", "minimum": 8, "maximum": 72, "default": 12 },
                "show": { "type": "boolean" },
                "alignment": { "enum": ["left", "center", "right"] },
                "fontColor": { "type": "string" }
            }
        }))
    }

    fn recording() -> (ChangeHandler, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (
            Box::new(move |value: &Value| sink.lock().unwrap().push(value.clone())),
            seen,
        )
    }

    fn number_value(view: &FieldView) -> Value {
        match &view.widget {
            Widget::Number { value, .. } => value.clone(),
            other => panic!("expected number widget, got {:?}", other),
        }
    }

    #[test]
    fn test_font_size_edit_cycle() {
        let (handler, seen) = recording();
        let mut session = FormSession::mount(
            fields(),
            PropertyPath::parse("title"),
            title_schema(),
            None,
            handler,
        );
        let font_size = PropertyPath::parse("title.fontSize");
        let relative = PropertyPath::parse("fontSize");

        assert_eq!(number_value(session.render().find(&font_size).unwrap()), json!(12));

        let outcome = session.edit(&relative, EditAction::Set { value: json!(9) });
        assert_eq!(outcome, EditOutcome::Committed { value: json!({ "fontSize": 9 }) });
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!({ "fontSize": 9 })]);

        let outcome = session.edit(&relative, EditAction::Set { value: json!(5) });
        assert!(matches!(outcome, EditOutcome::Rejected { .. }));
        assert_eq!(seen.lock().unwrap().len(), 1);

        let view = session.render();
        let field = view.find(&font_size).unwrap();
        assert_eq!(number_value(field), json!(9));
        assert!(field.error.is_some());
        assert_eq!(session.state_at(&relative), Some(FieldState::Idle));
        assert_eq!(session.value(), Some(&json!({ "fontSize": 9 })));
    }

    #[test]
    fn test_sibling_edits_keep_other_keys() {
        let (handler, seen) = recording();
        let mut session = FormSession::mount(
            fields(),
            PropertyPath::root(),
            title_schema(),
            Some(json!({ "fontSize": 14, "fontColor": "#000000" })),
            handler,
        );

        session.edit(&PropertyPath::parse("show"), EditAction::Set { value: json!(true) });
        assert_eq!(
            seen.lock().unwrap().last().unwrap(),
            &json!({ "fontSize": 14, "fontColor": "#000000", "show": true })
        );
    }

    #[test]
    fn test_enum_choice_and_color_widget() {
        let (handler, seen) = recording();
        let mut session =
            FormSession::mount(fields(), PropertyPath::root(), title_schema(), None, handler);

        let outcome = session.edit(&PropertyPath::parse("alignment"), EditAction::Choose { index: 2 });
        assert!(outcome.is_committed());
        assert_eq!(seen.lock().unwrap()[0], json!({ "alignment": "right" }));

        let outcome = session.edit(&PropertyPath::parse("alignment"), EditAction::Choose { index: 7 });
        assert!(matches!(outcome, EditOutcome::Refused { .. }));

        let view = session.render();
        let color = view.find(&PropertyPath::parse("fontColor")).unwrap();
        assert!(matches!(color.widget, Widget::Color { .. }));
        match &view.find(&PropertyPath::parse("alignment")).unwrap().widget {
            Widget::Enum { options, selected } => {
                assert_eq!(options.len(), 3);
                assert_eq!(*selected, Some(2));
            }
            other => panic!("expected enum widget, got {:?}", other),
        }
    }

    #[test]
    fn test_array_bounds_gate_controls() {
        let schema = node(json!({
            "type": "array",
            "minItems": 1,
            "maxItems": 2,
            "items": { "type": "object", "properties": { "width": { "type": "number", "default": 1 } } }
        }));
        let (handler, seen) = recording();
        let mut session = FormSession::mount(
            fields(),
            PropertyPath::parse("border"),
            schema,
            Some(json!([{ "width": 1 }])),
            handler,
        );
        let root = PropertyPath::root();

        assert!(matches!(
            session.edit(&root, EditAction::RemoveAt { index: 0 }),
            EditOutcome::Refused { .. }
        ));
        assert!(session.edit(&root, EditAction::Append).is_committed());
        assert_eq!(seen.lock().unwrap()[0], json!([{ "width": 1 }, {}]));
        assert!(matches!(
            session.edit(&root, EditAction::Append),
            EditOutcome::Refused { .. }
        ));

        let outcome = session.edit(&PropertyPath::parse("[1].width"), EditAction::Set { value: json!(3) });
        assert_eq!(outcome, EditOutcome::Committed { value: json!([{ "width": 1 }, { "width": 3 }]) });

        match &session.render().widget {
            Widget::Array {
                items,
                can_append,
                can_remove,
                ..
            } => {
                assert_eq!(items.len(), 2);
                assert!(!can_append);
                assert!(can_remove);
            }
            other => panic!("expected array widget, got {:?}", other),
        }
    }

    #[test]
    fn test_array_default_is_shown_and_edited() {
        let schema = node(json!({
            "type": "array",
            "default": ["#111111", "#222222"],
            "items": { "type": "string", "format": "color" }
        }));
        let (handler, seen) = recording();
        let mut session =
            FormSession::mount(fields(), PropertyPath::parse("dataColors"), schema, None, handler);

        match &session.render().widget {
            Widget::Array { items, .. } => {
                assert_eq!(items.len(), 2);
                assert!(matches!(&items[1].widget, Widget::Color { value } if value == "#222222"));
            }
            other => panic!("expected array widget, got {:?}", other),
        }

        let outcome = session.edit(&PropertyPath::parse("[0]"), EditAction::Set { value: json!("#000000") });
        assert_eq!(outcome, EditOutcome::Committed { value: json!(["#000000", "#222222"]) });

        assert!(session.edit(&PropertyPath::root(), EditAction::Append).is_committed());
        assert_eq!(
            seen.lock().unwrap().last().unwrap(),
            &json!(["#000000", "#222222", ""])
        );
        match &session.render().widget {
            Widget::Array { items, .. } => assert_eq!(items.len(), 3),
            other => panic!("expected array widget, got {:?}", other),
        }
    }

    #[test]
    fn test_object_default_is_shown_and_kept_on_edit() {
        let schema = node(json!({
            "type": "object",
            "default": { "show": true, "text": "x" },
            "properties": {
                "show": { "type": "boolean" },
                "text": { "type": "string" }
            }
        }));
        let (handler, seen) = recording();
        let mut session =
            FormSession::mount(fields(), PropertyPath::parse("title"), schema, None, handler);

        let view = session.render();
        assert!(matches!(
            view.find(&PropertyPath::parse("title.show")).unwrap().widget,
            Widget::Boolean { value: true }
        ));
        assert!(matches!(
            &view.find(&PropertyPath::parse("title.text")).unwrap().widget,
            Widget::Text { value } if value == "x"
        ));

        session.edit(&PropertyPath::parse("text"), EditAction::Set { value: json!("y") });
        assert_eq!(seen.lock().unwrap().as_slice(), &[json!({ "show": true, "text": "y" })]);
    }

    #[test]
    fn test_parent_rejection_restores_child() {
        let schema = node(json!({
            "type": "array",
            "maxItems": 2,
            "items": { "type": "number" }
        }));
        let (handler, seen) = recording();
        let mut session = FormSession::mount(
            fields(),
            PropertyPath::parse("widths"),
            schema,
            Some(json!([1, 2, 3])),
            handler,
        );
        let first = PropertyPath::parse("[0]");

        // The item itself is valid, but the stored list is too long
        let outcome = session.edit(&first, EditAction::Set { value: json!(5) });
        assert!(matches!(outcome, EditOutcome::Rejected { .. }));
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(session.value(), Some(&json!([1, 2, 3])));

        let view = session.render();
        let item = view.find(&PropertyPath::parse("widths[0]")).unwrap();
        assert_eq!(number_value(item), json!(1));
        assert!(item.error.is_some());
        assert_eq!(session.state_at(&first), Some(FieldState::Idle));
    }

    #[test]
    fn test_unsupported_is_read_only() {
        let schema = node(json!({
            "type": "object",
            "properties": { "legacy": {}, "nothing": { "type": "null" } }
        }));
        let (handler, seen) = recording();
        let mut session = FormSession::mount(fields(), PropertyPath::root(), schema, None, handler);

        let outcome = session.edit(&PropertyPath::parse("legacy"), EditAction::Set { value: json!(1) });
        assert_eq!(outcome, EditOutcome::ReadOnly);
        assert!(seen.lock().unwrap().is_empty());

        let view = session.render();
        let legacy = view.find(&PropertyPath::parse("legacy")).unwrap();
        assert!(matches!(legacy.widget, Widget::Unsupported { .. }));
        assert_eq!(
            session.edit(&PropertyPath::parse("missing"), EditAction::Append),
            EditOutcome::UnknownField
        );
    }

    #[test]
    fn test_alternative_selection() {
        let schema = node(json!({
            "oneOf": [
                { "title": "Auto", "enum": ["auto"] },
                { "title": "Fixed", "type": "number", "minimum": 0 }
            ]
        }));
        let (handler, seen) = recording();
        let mut session = FormSession::mount(
            fields(),
            PropertyPath::parse("padding"),
            schema,
            Some(json!(4)),
            handler,
        );

        match &session.render().widget {
            Widget::Alternatives { labels, selected, .. } => {
                assert_eq!(labels, &vec!["Auto".to_string(), "Fixed".to_string()]);
                assert_eq!(*selected, 1);
            }
            other => panic!("expected alternatives, got {:?}", other),
        }

        let root = PropertyPath::root();
        assert!(matches!(
            session.edit(&root, EditAction::Set { value: json!(-1) }),
            EditOutcome::Rejected { .. }
        ));
        assert!(session.edit(&root, EditAction::SelectAlternative { index: 0 }).is_committed());
        assert_eq!(seen.lock().unwrap().last().unwrap(), &json!("auto"));
    }

    #[test]
    fn test_view_serializes_widget_tag() {
        let view = render(
            &fields(),
            &PropertyPath::parse("title"),
            &title_schema(),
            Some(&json!({ "fontSize": 10 })),
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["widget"], "object");
        assert_eq!(json["path"], json!(["title"]));
        let font = view.find(&PropertyPath::parse("title.fontSize")).unwrap();
        assert_eq!(serde_json::to_value(font).unwrap()["value"], json!(10));
    }

    #[test]
    fn test_edit_action_wire_format() {
        let action: EditAction =
            serde_json::from_value(json!({ "action": "set", "value": 3 })).unwrap();
        assert_eq!(action, EditAction::Set { value: json!(3) });
        let action: EditAction = serde_json::from_value(json!({ "action": "append" })).unwrap();
        assert_eq!(action, EditAction::Append);
        let action: EditAction =
            serde_json::from_value(json!({ "action": "removeAt", "index": 1 })).unwrap();
        assert_eq!(action, EditAction::RemoveAt { index: 1 });
    }
}
