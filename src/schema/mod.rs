//! Theme schema loading and resolution
//!
//! - `store`: fetches the schema document once and caches it
//! - `resolver`: turns property paths into effective, dereferenced nodes
//! - `node`: the typed node representation
//! - `path`: property paths shared with the theme value tree

pub mod error;
pub mod node;
pub mod path;
pub mod resolver;
pub mod store;

pub use error::SchemaLoadError;
pub use node::{SchemaNode, SchemaNodeType};
pub use path::{PathSegment, PropertyPath};
pub use resolver::{SchemaResolver, DEFAULT_MAX_DEPTH};
pub use store::{RawSchema, SchemaSource, SchemaStore};
