//! Storage client implementations.

#[cfg(any(feature = "enterprise-share", feature = "cloud-drive"))]
mod http;

#[cfg(feature = "cloud-drive")]
pub mod graph;
#[cfg(feature = "local")]
pub mod local;
pub mod object;
#[cfg(feature = "enterprise-share")]
pub mod share;

#[cfg(feature = "cloud-drive")]
pub use graph::CloudDriveClient;
#[cfg(feature = "local")]
pub use local::LocalStorageClient;
pub use object::ObjectStoreClient;
#[cfg(feature = "enterprise-share")]
pub use share::EnterpriseShareClient;

use folio_core::{AppError, AppResult};

/// A folder or file name must be a single path segment.
pub(crate) fn check_name(name: &str) -> AppResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(AppError::validation(format!(
            "'{name}' is not a valid folder or file name"
        )));
    }
    Ok(())
}
