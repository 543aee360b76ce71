//! # Theme Studio - Schema-Driven Theme Editing
//!
//! Theme Studio resolves a large theme JSON Schema into editable forms and
//! computes the effective style of named visual style variants.
//!
//! ## Features
//!
//! - **Schema Store**: loads the theme schema once, coalescing concurrent loads
//! - **Resolver**: `$ref`/`allOf` resolution with cycle and depth guards
//! - **Forms**: field classification, defaults, validation and a recursive renderer
//! - **Variants**: deep merge of variant overrides onto the default `"*"` style
//! - **Live Reload**: optional schema file watching
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use theme_studio::schema::{PropertyPath, SchemaResolver, SchemaStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SchemaStore::from_location("schema/theme-schema.json");
//!     let schema = store.initialize().await?;
//!     let resolver = SchemaResolver::new(schema);
//!     let title = resolver.resolve_path(&PropertyPath::parse("visualStyles.columnChart.*.title"));
//!     println!("{:?}", title);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **schema**: raw document cache and effective-node resolution
//! - **form**: form fields and the edit state machine
//! - **variants**: style maps and the merge engine
//! - **adapters**: HTTP handlers
//! - **config**: configuration management

pub mod adapters;
pub mod cli;
pub mod config;
pub mod form;
pub mod schema;
pub mod variants;

use crate::adapters::api_handler::{self, ApiState};
use crate::adapters::health_handler::HealthHandler;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Creates the Axum application router with all endpoints configured.
///
/// # Arguments
///
/// * `state` - Shared settings and schema store
///
/// # Returns
///
/// Configured Axum Router
pub fn create_app(state: ApiState) -> Router {
    let health_handler = Arc::new(HealthHandler::new(state.store.clone()));

    let public_router = Router::new()
        .route("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        }))
        .route("/health/ready", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.ready().await }
            }
        }))
        .route("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        }));

    let api_router = Router::new()
        // Schema
        .route("/schema/visuals", get(api_handler::list_visuals))
        .route("/schema/resolve", post(api_handler::resolve_path))
        .route("/schema/form", post(api_handler::render_form))
        .route("/schema/reload", post(api_handler::reload_schema))
        // Variants
        .route("/variants/effective", post(api_handler::effective_style))
        .route("/variants/edit", post(api_handler::edit_variants))
        .with_state(state);

    let router = public_router.nest("/api", api_router);

    router.layer(
        tower_http::cors::CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
    )
}
