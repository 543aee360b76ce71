//! Theme style maps: visual type → variant name → style object

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use super::error::VariantError;

/// Key of the implicit default variant
pub const DEFAULT_VARIANT_KEY: &str = "*";

/// Theme key holding the [`VisualStyleMap`]
pub const VISUAL_STYLES_KEY: &str = "visualStyles";

/// Style of a default variant that was never stored
static EMPTY_STYLE: LazyLock<Value> = LazyLock::new(empty_style);

fn empty_style() -> Value {
    Value::Object(Map::new())
}

// ============================================================================
// Variant Map
// ============================================================================

/// Named style variants of one visual type. The default variant exists
/// implicitly; it is only serialized once something stores it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantMap {
    variants: BTreeMap<String, Value>,
}

impl VariantMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map whose default variant is `style`
    pub fn with_default(style: Value) -> Self {
        let mut variants = BTreeMap::new();
        variants.insert(DEFAULT_VARIANT_KEY.to_string(), style);
        Self { variants }
    }

    /// The default variant's style, `{}` when none is stored
    pub fn get_default(&self) -> &Value {
        self.variants
            .get(DEFAULT_VARIANT_KEY)
            .unwrap_or(&EMPTY_STYLE)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        if name == DEFAULT_VARIANT_KEY {
            return Some(self.get_default());
        }
        self.variants.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        name == DEFAULT_VARIANT_KEY || self.variants.contains_key(name)
    }

    /// Variant names, default first
    pub fn names(&self) -> Vec<&str> {
        let mut names = vec![DEFAULT_VARIANT_KEY];
        names.extend(
            self.variants
                .keys()
                .map(String::as_str)
                .filter(|name| *name != DEFAULT_VARIANT_KEY),
        );
        names
    }

    /// Number of stored variants
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Replace a variant's style. The default variant may be edited.
    pub fn set_variant(&mut self, name: &str, style: Value) -> Result<(), VariantError> {
        if name.trim().is_empty() {
            return Err(VariantError::EmptyName);
        }
        self.variants.insert(name.to_string(), style);
        Ok(())
    }

    pub fn create_variant(
        &mut self,
        visual_type: &str,
        name: &str,
        style: Option<Value>,
    ) -> Result<(), VariantError> {
        validate_new_name(name)?;
        if self.variants.contains_key(name) {
            return Err(VariantError::DuplicateVariant {
                visual_type: visual_type.to_string(),
                name: name.to_string(),
            });
        }
        self.variants
            .insert(name.to_string(), style.unwrap_or_else(empty_style));
        Ok(())
    }

    pub fn rename_variant(
        &mut self,
        visual_type: &str,
        from: &str,
        to: &str,
    ) -> Result<(), VariantError> {
        if from == DEFAULT_VARIANT_KEY {
            return Err(VariantError::DefaultVariantImmutable);
        }
        validate_new_name(to)?;
        if !self.variants.contains_key(from) {
            return Err(VariantError::VariantNotFound {
                visual_type: visual_type.to_string(),
                name: from.to_string(),
            });
        }
        if from == to {
            return Ok(());
        }
        if self.variants.contains_key(to) {
            return Err(VariantError::DuplicateVariant {
                visual_type: visual_type.to_string(),
                name: to.to_string(),
            });
        }
        if let Some(style) = self.variants.remove(from) {
            self.variants.insert(to.to_string(), style);
        }
        Ok(())
    }

    /// Remove a variant and hand back its style
    pub fn delete_variant(&mut self, visual_type: &str, name: &str) -> Result<Value, VariantError> {
        if name == DEFAULT_VARIANT_KEY {
            return Err(VariantError::DefaultVariantImmutable);
        }
        self.variants
            .remove(name)
            .ok_or_else(|| VariantError::VariantNotFound {
                visual_type: visual_type.to_string(),
                name: name.to_string(),
            })
    }
}

fn validate_new_name(name: &str) -> Result<(), VariantError> {
    if name.trim().is_empty() {
        return Err(VariantError::EmptyName);
    }
    if name == DEFAULT_VARIANT_KEY {
        return Err(VariantError::ReservedName(name.to_string()));
    }
    Ok(())
}

// ============================================================================
// Visual Style Map
// ============================================================================

/// The `visualStyles` section of a theme
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualStyleMap {
    visuals: BTreeMap<String, VariantMap>,
}

impl VisualStyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, visual_type: &str) -> Option<&VariantMap> {
        self.visuals.get(visual_type)
    }

    pub fn visual_types(&self) -> Vec<&str> {
        self.visuals.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    fn variants_mut(&mut self, visual_type: &str) -> Result<&mut VariantMap, VariantError> {
        self.visuals
            .get_mut(visual_type)
            .ok_or_else(|| VariantError::VisualNotFound(visual_type.to_string()))
    }

    /// Run `op` on the visual's variants; a missing visual is only added
    /// when `op` succeeds
    fn upsert<T>(
        &mut self,
        visual_type: &str,
        op: impl FnOnce(&mut VariantMap) -> Result<T, VariantError>,
    ) -> Result<T, VariantError> {
        if let Some(variants) = self.visuals.get_mut(visual_type) {
            return op(variants);
        }
        let mut variants = VariantMap::new();
        let out = op(&mut variants)?;
        self.visuals.insert(visual_type.to_string(), variants);
        Ok(out)
    }

    pub fn set_variant(
        &mut self,
        visual_type: &str,
        name: &str,
        style: Value,
    ) -> Result<(), VariantError> {
        let result = self.upsert(visual_type, |variants| variants.set_variant(name, style));
        logged(result, "set", visual_type, name)
    }

    pub fn create_variant(
        &mut self,
        visual_type: &str,
        name: &str,
        style: Option<Value>,
    ) -> Result<(), VariantError> {
        let result = self.upsert(visual_type, |variants| {
            variants.create_variant(visual_type, name, style)
        });
        logged(result, "create", visual_type, name)
    }

    pub fn rename_variant(
        &mut self,
        visual_type: &str,
        from: &str,
        to: &str,
    ) -> Result<(), VariantError> {
        let result = self
            .variants_mut(visual_type)
            .and_then(|variants| variants.rename_variant(visual_type, from, to));
        logged(result, "rename", visual_type, from)
    }

    pub fn delete_variant(&mut self, visual_type: &str, name: &str) -> Result<Value, VariantError> {
        let result = self
            .variants_mut(visual_type)
            .and_then(|variants| variants.delete_variant(visual_type, name));
        logged(result, "delete", visual_type, name)
    }
}

fn logged<T>(
    result: Result<T, VariantError>,
    operation: &str,
    visual_type: &str,
    variant: &str,
) -> Result<T, VariantError> {
    match &result {
        Ok(_) => debug!(operation, visual_type, variant, "Variant map updated"),
        Err(e) => warn!(operation, visual_type, variant, error = %e, "Variant operation refused"),
    }
    result
}

// ============================================================================
// Theme
// ============================================================================

/// A theme value tree: arbitrary top-level properties plus `visualStyles`.
/// Writes back exactly what was read.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(flatten)]
    pub properties: Map<String, Value>,
    #[serde(
        rename = "visualStyles",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub visual_styles: Option<VisualStyleMap>,
}

impl Theme {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// The theme's style map; empty when it has no `visualStyles`
    pub fn styles(&self) -> VisualStyleMap {
        self.visual_styles.clone().unwrap_or_default()
    }

    /// Mutable style map, creating `visualStyles` on first use
    pub fn styles_mut(&mut self) -> &mut VisualStyleMap {
        self.visual_styles.get_or_insert_with(VisualStyleMap::default)
    }
}
