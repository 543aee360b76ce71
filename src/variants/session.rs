//! Style edit session for one visual type
//!
//! Owns the theme's style map while a user edits one visual, tracks the
//! selected variant and caches its effective style until the next change.

use serde_json::Value;
use tracing::info;

use super::error::VariantError;
use super::merge::{compute_variant_style, preview_style, PreviewStyle};
use super::style_map::{VisualStyleMap, DEFAULT_VARIANT_KEY};

pub struct StyleEditSession {
    styles: VisualStyleMap,
    visual_type: String,
    selected: String,
    effective: Option<Value>,
}

impl StyleEditSession {
    pub fn new(styles: VisualStyleMap, visual_type: impl Into<String>) -> Self {
        Self {
            styles,
            visual_type: visual_type.into(),
            selected: DEFAULT_VARIANT_KEY.to_string(),
            effective: None,
        }
    }

    pub fn styles(&self) -> &VisualStyleMap {
        &self.styles
    }

    pub fn into_styles(self) -> VisualStyleMap {
        self.styles
    }

    pub fn visual_type(&self) -> &str {
        &self.visual_type
    }

    pub fn selected(&self) -> &str {
        &self.selected
    }

    /// Variant names of the visual, default first
    pub fn variant_names(&self) -> Vec<String> {
        self.styles
            .get(&self.visual_type)
            .map(|variants| variants.names().into_iter().map(String::from).collect())
            .unwrap_or_else(|| vec![DEFAULT_VARIANT_KEY.to_string()])
    }

    pub fn select(&mut self, name: &str) -> Result<(), VariantError> {
        let exists = name == DEFAULT_VARIANT_KEY
            || self
                .styles
                .get(&self.visual_type)
                .map_or(false, |variants| variants.contains(name));
        if !exists {
            return Err(VariantError::VariantNotFound {
                visual_type: self.visual_type.clone(),
                name: name.to_string(),
            });
        }
        self.selected = name.to_string();
        self.effective = None;
        Ok(())
    }

    /// Stored overrides of the selected variant (not merged)
    pub fn selected_style(&self) -> Option<&Value> {
        self.styles.get(&self.visual_type)?.get(&self.selected)
    }

    /// Effective style of the selected variant, cached until the next change
    pub fn effective_style(&mut self) -> &Value {
        if self.effective.is_none() {
            let style = if self.selected == DEFAULT_VARIANT_KEY {
                None
            } else {
                compute_variant_style(&self.styles, &self.visual_type, &self.selected)
            };
            let style = style.unwrap_or_else(|| self.preview().style);
            self.effective = Some(style);
        }
        self.effective.get_or_insert(Value::Null)
    }

    /// Preview payload for the selected variant
    pub fn preview(&self) -> PreviewStyle {
        preview_style(&self.styles, &self.visual_type, &self.selected)
    }

    /// Store a complete new style for the selected variant
    pub fn update_selected(&mut self, style: Value) -> Result<(), VariantError> {
        let selected = self.selected.clone();
        self.styles.set_variant(&self.visual_type, &selected, style)?;
        self.effective = None;
        Ok(())
    }

    /// Create a variant and select it
    pub fn create_variant(&mut self, name: &str, style: Option<Value>) -> Result<(), VariantError> {
        self.styles.create_variant(&self.visual_type, name, style)?;
        self.selected = name.to_string();
        self.effective = None;
        Ok(())
    }

    pub fn rename_variant(&mut self, from: &str, to: &str) -> Result<(), VariantError> {
        self.styles.rename_variant(&self.visual_type, from, to)?;
        if self.selected == from {
            self.selected = to.to_string();
            self.effective = None;
        }
        Ok(())
    }

    /// Delete a variant; selection returns to the default variant.
    /// References to the deleted name held outside this map are not rewritten.
    pub fn delete_variant(&mut self, name: &str) -> Result<Value, VariantError> {
        let removed = self.styles.delete_variant(&self.visual_type, name)?;
        info!(
            visual_type = %self.visual_type,
            variant = name,
            "Variant deleted, selection reset to default"
        );
        self.selected = DEFAULT_VARIANT_KEY.to_string();
        self.effective = None;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session() -> StyleEditSession {
        let styles = serde_json::from_value(json!({
            "columnChart": {
                "*": { "title": { "fontSize": 12 } },
                "emphasis": { "title": { "fontSize": 20 } }
            }
        }))
        .unwrap();
        StyleEditSession::new(styles, "columnChart")
    }

    #[test]
    fn test_select_and_effective_style() {
        let mut session = session();
        assert_eq!(session.selected(), "*");
        assert_eq!(session.effective_style(), &json!({ "title": { "fontSize": 12 } }));

        session.select("emphasis").unwrap();
        assert_eq!(session.effective_style(), &json!({ "title": { "fontSize": 20 } }));
        assert!(session.select("missing").is_err());
        assert_eq!(session.selected(), "emphasis");
    }

    #[test]
    fn test_update_invalidates_cache() {
        let mut session = session();
        session.select("emphasis").unwrap();
        assert_eq!(session.effective_style()["title"]["fontSize"], json!(20));

        session
            .update_selected(json!({ "title": { "fontSize": 24, "bold": true } }))
            .unwrap();
        assert_eq!(
            session.effective_style(),
            &json!({ "title": { "fontSize": 24, "bold": true } })
        );
    }

    #[test]
    fn test_delete_resets_selection() {
        let mut session = session();
        session.select("emphasis").unwrap();
        session.delete_variant("emphasis").unwrap();
        assert_eq!(session.selected(), "*");
        assert_eq!(session.variant_names(), vec!["*".to_string()]);

        assert_eq!(
            session.delete_variant("*"),
            Err(VariantError::DefaultVariantImmutable)
        );
    }

    #[test]
    fn test_create_and_rename_follow_selection() {
        let mut session = session();
        session.create_variant("muted", None).unwrap();
        assert_eq!(session.selected(), "muted");
        assert_eq!(session.effective_style(), &json!({ "title": { "fontSize": 12 } }));

        session.rename_variant("muted", "quiet").unwrap();
        assert_eq!(session.selected(), "quiet");
        assert_eq!(session.variant_names(), vec!["*", "emphasis", "quiet"]);
    }
}
