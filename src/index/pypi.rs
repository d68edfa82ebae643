//! PyPI index client for fetching Python package versions

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

use crate::config::{DEFAULT_INDEX_URL, SIMPLE_JSON_ACCEPT};
use crate::error::IndexError;
use crate::index::PackageIndex;

/// PyPI index client speaking the Simple API JSON variant
pub struct PypiIndex {
    client: Client,
    base_url: String,
}

impl Default for PypiIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL.to_string())
    }
}

impl PypiIndex {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

/// Simple API project response, reduced to the field we read
#[derive(Debug, Deserialize)]
struct ProjectResponse {
    /// Versions in index order, oldest first
    versions: Vec<String>,
}

#[async_trait]
impl PackageIndex for PypiIndex {
    async fn fetch_versions(&self, name: &str) -> Result<Vec<String>, IndexError> {
        let url = format!("{}/simple/{}/", self.base_url, name);
        debug!("Fetching project listing: {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, SIMPLE_JSON_ACCEPT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IndexError::Status {
                name: name.to_string(),
                status: response.status(),
            });
        }

        let project: ProjectResponse = response
            .json()
            .await
            .map_err(|e| IndexError::InvalidResponse(e.to_string()))?;

        debug!(
            "Found {} versions for package {}",
            project.versions.len(),
            name
        );

        Ok(project.versions)
    }
}
