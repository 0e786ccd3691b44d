//! # folio-core
//!
//! Core crate for Folio, the storage layer that gives programs, studies
//! and assays a folder on one of several storage backends. Contains the
//! backend-facing traits, configuration schemas, audit events, value
//! types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Folio crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
