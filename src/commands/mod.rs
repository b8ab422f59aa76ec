//! CLI command implementations.

pub mod completions;
pub mod detect;
pub mod flags;
pub mod installed;
pub mod render;
pub mod schema;
