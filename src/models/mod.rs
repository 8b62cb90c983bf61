//! # Models
//!
//! Read-side views of the application units the reconciler reasons about.
//! Applications themselves are owned by the store collaborator
//! (see [`crate::services`]); this module only describes what the
//! reconciler reads from them.

pub mod unit;
pub mod unit_view;

pub use unit::Unit;
pub use unit_view::UnitView;
