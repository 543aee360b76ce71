#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use theme_studio::adapters::api_handler::ApiState;
use theme_studio::config::Settings;
use theme_studio::schema::store::StaticSchemaSource;
use theme_studio::schema::SchemaStore;

/// A trimmed-down theme schema in the shape the editor consumes
pub fn theme_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "dataColors": {
                "type": "array",
                "items": { "$ref": "#/definitions/color" }
            },
            "visualStyles": {
                "type": "object",
                "properties": {
                    "columnChart": {
                        "type": "object",
                        "properties": { "*": { "$ref": "#/definitions/visual-columnChart" } },
                        "additionalProperties": { "$ref": "#/definitions/visual-columnChart" }
                    },
                    "card": {
                        "type": "object",
                        "properties": { "*": { "$ref": "#/definitions/commonCards" } },
                        "additionalProperties": { "$ref": "#/definitions/commonCards" }
                    }
                }
            }
        },
        "definitions": {
            "color": { "type": "string", "format": "color" },
            "fill": {
                "type": "object",
                "properties": {
                    "solid": {
                        "type": "object",
                        "properties": { "color": { "$ref": "#/definitions/color" } }
                    },
                    "gradient": { "$ref": "#/definitions/fill" }
                }
            },
            "commonCards": {
                "type": "object",
                "properties": {
                    "title": {
                        "type": "object",
                        "properties": {
                            "show": { "type": "boolean" },
                            "fontSize": { "type": "number", "minimum": 8, "maximum": 72, "default": 12 },
                            "fontColor": { "$ref": "#/definitions/fill" },
                            "alignment": { "enum": ["left", "center", "right"] }
                        }
                    },
                    "border": {
                        "type": "array",
                        "maxItems": 3,
                        "items": {
                            "type": "object",
                            "properties": { "width": { "type": "integer", "minimum": 0 } }
                        }
                    }
                }
            },
            "visual-columnChart": {
                "allOf": [
                    { "$ref": "#/definitions/commonCards" },
                    {
                        "properties": {
                            "legend": {
                                "type": "object",
                                "properties": {
                                    "position": { "type": "string", "enum": ["Top", "Bottom"] }
                                }
                            }
                        }
                    }
                ]
            },
            "A": { "$ref": "#/definitions/B" },
            "B": { "$ref": "#/definitions/A" }
        }
    })
}

/// A theme's `visualStyles` with a default and an `emphasis` variant
pub fn column_chart_styles() -> Value {
    json!({
        "columnChart": {
            "*": { "title": { "fontSize": 12 } },
            "emphasis": { "title": { "fontSize": 20 } }
        }
    })
}

pub fn static_store(schema: &Value) -> Arc<SchemaStore> {
    Arc::new(SchemaStore::new(Arc::new(StaticSchemaSource::from_value(schema))))
}

pub fn test_state(store: Arc<SchemaStore>) -> ApiState {
    ApiState::new(Settings::default(), store)
}
