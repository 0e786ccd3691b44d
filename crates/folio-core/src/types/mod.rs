//! Value types shared across crates.

pub mod path;
pub mod policy;

pub use policy::{DuplicatePolicy, FolderNameStyle};
