//! Latest version resolution against the package index

use tracing::{debug, info};

use crate::error::IndexError;
use crate::index::PackageIndex;

/// Resolve the latest published version for a package.
///
/// The index reports versions in its own order, oldest first; the latest
/// version is the last element of that list, taken verbatim. The index's
/// ordering is trusted, there is no semantic version comparison here.
pub async fn resolve_latest_version<I: PackageIndex>(
    index: &I,
    name: &str,
) -> Result<String, IndexError> {
    info!("Fetching current version of {:?}", name);

    let versions = index.fetch_versions(name).await?;
    debug!("Found the following versions for {:?}: {:?}", name, versions);

    let latest = versions
        .last()
        .cloned()
        .ok_or_else(|| IndexError::NoVersions(name.to_string()))?;

    info!("The latest version of {:?} is {:?}", name, latest);
    Ok(latest)
}
