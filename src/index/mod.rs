//! Package index access layer
//!
//! - [`pypi`]: PyPI Simple API client

pub mod pypi;

#[cfg(test)]
use mockall::automock;

use crate::error::IndexError;

/// Trait for fetching published versions from a package index
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait PackageIndex: Send + Sync + 'static {
    /// Fetches all published versions for a package
    ///
    /// # Arguments
    /// * `name` - The name of the package as known to the index
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Versions in the order the index reports them, oldest first
    /// * `Err(IndexError)` - If the fetch fails
    async fn fetch_versions(&self, name: &str) -> Result<Vec<String>, IndexError>;
}
