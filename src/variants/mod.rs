//! Style variants
//!
//! - `style_map`: the `visualStyles` tree and its edit operations
//! - `merge`: effective style computation
//! - `session`: selection and cached effective style for one visual

pub mod error;
pub mod merge;
pub mod session;
pub mod style_map;

pub use error::VariantError;
pub use merge::{compute_variant_style, deep_merge, preview_style, PreviewStyle};
pub use session::StyleEditSession;
pub use style_map::{Theme, VariantMap, VisualStyleMap, DEFAULT_VARIANT_KEY, VISUAL_STYLES_KEY};
