//! Schema-driven form fields
//!
//! - `fields`: classification, defaults and one-level validation
//! - `renderer`: mounted field tree and the edit state machine

pub mod fields;
pub mod renderer;

pub use fields::{FieldKind, FormFieldResolver, Validation};
pub use renderer::{
    render, ChangeHandler, EditAction, EditOutcome, FieldState, FieldView, FormSession, Widget,
};
