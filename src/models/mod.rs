//! Data models for the Community Hub backend.
//!
//! Wire format is camelCase JSON to match the frontend interfaces.

mod community;
mod membership;
mod submission;

pub use community::*;
pub use membership::*;
pub use submission::*;
