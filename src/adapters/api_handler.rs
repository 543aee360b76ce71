//! REST API handlers for the theme editor
//!
//! Exposes schema resolution, form rendering and variant merging to a host UI.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Settings;
use crate::form::{EditAction, EditOutcome, FieldView, FormFieldResolver, FormSession};
use crate::schema::{PropertyPath, SchemaNode, SchemaResolver, SchemaStore};
use crate::variants::{preview_style, PreviewStyle, VariantError, VisualStyleMap};

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub settings: Arc<RwLock<Settings>>,
    pub store: Arc<SchemaStore>,
}

impl ApiState {
    pub fn new(settings: Settings, store: Arc<SchemaStore>) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
            store,
        }
    }

    /// Resolver over the cached schema, loading it on first use
    async fn resolver(&self) -> Result<SchemaResolver, (StatusCode, String)> {
        let schema = self
            .store
            .load()
            .await
            .map_err(|e| (e.status_code(), format!("Cannot load editor: {}", e)))?;
        let max_depth = self.settings.read().await.resolver.max_depth;
        Ok(SchemaResolver::new(schema).with_max_depth(max_depth))
    }

    async fn form_fields(&self) -> Result<FormFieldResolver, (StatusCode, String)> {
        let resolver = self.resolver().await?;
        let color_formats = self.settings.read().await.editor.color_formats.clone();
        Ok(FormFieldResolver::new(resolver).with_color_formats(color_formats))
    }
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn failure<T>((status, message): (StatusCode, String)) -> ApiResult<T> {
    (status, Json(ApiResponse::error(message)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaOverview {
    pub source: String,
    pub visual_types: Vec<String>,
    pub definitions: usize,
}

#[derive(Deserialize)]
pub struct ResolveRequest {
    pub path: PropertyPath,
}

/// One edit, addressed relative to the form's root path
#[derive(Deserialize)]
pub struct EditRequest {
    #[serde(default)]
    pub path: PropertyPath,
    pub edit: EditAction,
}

#[derive(Deserialize)]
pub struct FormRequest {
    pub path: PropertyPath,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub edits: Vec<EditRequest>,
}

#[derive(Serialize)]
pub struct FormResponse {
    pub view: FieldView,
    pub value: Option<Value>,
    pub outcomes: Vec<EditOutcome>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveStyleRequest {
    pub styles: VisualStyleMap,
    pub visual_type: String,
    pub variant: String,
}

#[derive(Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum VariantOperation {
    Create {
        name: String,
        #[serde(default)]
        style: Option<Value>,
    },
    Rename {
        from: String,
        to: String,
    },
    Delete {
        name: String,
    },
    Set {
        name: String,
        style: Value,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantEditRequest {
    pub styles: VisualStyleMap,
    pub visual_type: String,
    pub operation: VariantOperation,
}

// ============================================================================
// Schema Endpoints
// ============================================================================

fn overview(store: &SchemaStore, schema: &crate::schema::RawSchema) -> SchemaOverview {
    let mut visual_types: Vec<String> =
        schema.visual_types().into_iter().map(String::from).collect();
    visual_types.sort();
    SchemaOverview {
        source: store.location(),
        visual_types,
        definitions: schema.definitions().map(|d| d.len()).unwrap_or(0),
    }
}

/// GET /api/schema/visuals - Visual types the schema can style
pub async fn list_visuals(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.load().await {
        Ok(schema) => (
            StatusCode::OK,
            Json(ApiResponse::success(overview(&state.store, &schema))),
        ),
        Err(e) => failure((e.status_code(), format!("Cannot load editor: {}", e))),
    }
}

/// POST /api/schema/resolve - Effective schema at a property path
pub async fn resolve_path(
    State(state): State<ApiState>,
    Json(request): Json<ResolveRequest>,
) -> impl IntoResponse {
    let resolver = match state.resolver().await {
        Ok(resolver) => resolver,
        Err(e) => return failure::<SchemaNode>(e),
    };

    match resolver.resolve_path(&request.path) {
        Some(node) => (StatusCode::OK, Json(ApiResponse::success(node))),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No schema at {}", request.path))),
        ),
    }
}

/// POST /api/schema/form - Render a form, optionally replaying edits
pub async fn render_form(
    State(state): State<ApiState>,
    Json(request): Json<FormRequest>,
) -> impl IntoResponse {
    let fields = match state.form_fields().await {
        Ok(fields) => fields,
        Err(e) => return failure::<FormResponse>(e),
    };

    let Some(mut session) =
        FormSession::mount_path(fields, request.path.clone(), request.value, Box::new(|_| {}))
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("No schema at {}", request.path))),
        );
    };

    let outcomes = request
        .edits
        .into_iter()
        .map(|edit| session.edit(&edit.path, edit.edit))
        .collect();

    let response = FormResponse {
        view: session.render(),
        value: session.value().cloned(),
        outcomes,
    };
    (StatusCode::OK, Json(ApiResponse::success(response)))
}

/// POST /api/schema/reload - Drop the cached schema and fetch it again
pub async fn reload_schema(State(state): State<ApiState>) -> impl IntoResponse {
    match state.store.reload().await {
        Ok(schema) => {
            info!("Theme schema reloaded via API");
            (
                StatusCode::OK,
                Json(ApiResponse::success(overview(&state.store, &schema))),
            )
        }
        Err(e) => failure((e.status_code(), format!("Schema reload failed: {}", e))),
    }
}

// ============================================================================
// Variant Endpoints
// ============================================================================

/// POST /api/variants/effective - Effective style to preview for a variant
pub async fn effective_style(Json(request): Json<EffectiveStyleRequest>) -> impl IntoResponse {
    let preview: PreviewStyle =
        preview_style(&request.styles, &request.visual_type, &request.variant);
    (StatusCode::OK, Json(ApiResponse::success(preview)))
}

/// POST /api/variants/edit - Apply one variant-map operation
///
/// A refused operation returns the error and no map; the caller keeps its own.
pub async fn edit_variants(Json(request): Json<VariantEditRequest>) -> impl IntoResponse {
    let VariantEditRequest {
        mut styles,
        visual_type,
        operation,
    } = request;

    let result: Result<(), VariantError> = match operation {
        VariantOperation::Create { name, style } => {
            styles.create_variant(&visual_type, &name, style)
        }
        VariantOperation::Rename { from, to } => styles.rename_variant(&visual_type, &from, &to),
        VariantOperation::Delete { name } => {
            styles.delete_variant(&visual_type, &name).map(|_| ())
        }
        VariantOperation::Set { name, style } => styles.set_variant(&visual_type, &name, style),
    };

    match result {
        Ok(()) => (StatusCode::OK, Json(ApiResponse::success(styles))),
        Err(e) => (e.status_code(), Json(ApiResponse::error(e.to_string()))),
    }
}
