//! Variant merge engine
//!
//! A variant's effective style is its overrides deep-merged onto the
//! visual's default style. Objects merge key by key; anything else,
//! arrays included, is replaced wholesale by the override.

use serde::Serialize;
use serde_json::{Map, Value};

use super::style_map::{VisualStyleMap, DEFAULT_VARIANT_KEY};

/// Merge `override_style` onto `base` without touching either input
pub fn deep_merge(base: &Value, override_style: &Value) -> Value {
    match (base, override_style) {
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged = base.clone();
            for (key, value) in overrides {
                let next = match merged.get(key) {
                    Some(existing @ Value::Object(_)) if value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (_, other) => other.clone(),
    }
}

/// Effective style of `variant_name` for `visual_type`, or `None` when the
/// visual type or the variant does not exist
pub fn compute_variant_style(
    styles: &VisualStyleMap,
    visual_type: &str,
    variant_name: &str,
) -> Option<Value> {
    let variants = styles.get(visual_type)?;
    let overrides = variants.get(variant_name)?;
    Some(deep_merge(variants.get_default(), overrides))
}

/// Style handed to the preview, with the fallback decision made explicit
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStyle {
    pub visual_type: String,
    pub requested: String,
    /// Variant whose style is actually shown
    pub variant: String,
    pub style: Value,
    /// True when the requested variant was missing and the default is shown
    pub fallback: bool,
}

/// Style to preview for a variant. The default variant is read directly;
/// a missing target falls back to the default style unmodified.
pub fn preview_style(styles: &VisualStyleMap, visual_type: &str, variant_name: &str) -> PreviewStyle {
    let default_style = || {
        styles
            .get(visual_type)
            .map(|variants| variants.get_default().clone())
            .unwrap_or_else(|| Value::Object(Map::new()))
    };

    let (variant, style, fallback) = if variant_name == DEFAULT_VARIANT_KEY {
        let found = styles.get(visual_type).is_some();
        (DEFAULT_VARIANT_KEY, default_style(), !found)
    } else {
        match compute_variant_style(styles, visual_type, variant_name) {
            Some(style) => (variant_name, style, false),
            None => (DEFAULT_VARIANT_KEY, default_style(), true),
        }
    };

    PreviewStyle {
        visual_type: visual_type.to_string(),
        requested: variant_name.to_string(),
        variant: variant.to_string(),
        style,
        fallback,
    }
}
