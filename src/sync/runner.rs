//! Per-requirement update tasks and the sync run barrier

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info};

use crate::error::{SyncError, UpdateError};
use crate::index::PackageIndex;
use crate::store::RequirementStore;
use crate::sync::resolver::resolve_latest_version;

/// A requirement whose stored version was brought up to date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdatedRequirement {
    pub name: String,
    pub version: String,
}

/// A requirement whose update task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRequirement {
    pub name: String,
    pub reason: String,
}

/// Aggregate result of one sync run
#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub updated: Vec<UpdatedRequirement>,
    pub failed: Vec<FailedRequirement>,
}

impl SyncReport {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.updated.len() + self.failed.len()
    }
}

/// Resolve and persist the latest version of one tracked requirement.
///
/// Writes to the store only after a successful resolution; a failed
/// resolution leaves the stored version untouched.
pub async fn update_requirement<S: RequirementStore, I: PackageIndex>(
    store: &S,
    index: &I,
    name: &str,
) -> Result<String, UpdateError> {
    let version = resolve_latest_version(index, name).await?;

    info!("Updating db record for {:?}", name);
    store.set_current_version(name, &version)?;
    info!("Updated db for {:?}", name);

    Ok(version)
}

/// Run one full sync: load every tracked requirement, spawn one update task
/// per name, and wait for all of them before returning the aggregate report.
///
/// Task failures are captured in the report and never abort sibling tasks;
/// only the initial load is run-fatal.
pub async fn run_sync<S, I>(store: Arc<S>, index: Arc<I>) -> Result<SyncReport, SyncError>
where
    S: RequirementStore,
    I: PackageIndex,
{
    let names = store.list_names()?;
    info!("Loaded {} tracked requirements", names.len());

    let (names, handles): (Vec<_>, Vec<_>) = names
        .into_iter()
        .map(|name| {
            let store = Arc::clone(&store);
            let index = Arc::clone(&index);
            let task_name = name.clone();
            let handle = tokio::spawn(async move {
                update_requirement(store.as_ref(), index.as_ref(), &task_name).await
            });
            (name, handle)
        })
        .unzip();

    let results = join_all(handles).await;

    let mut report = SyncReport::default();
    for (name, settled) in names.into_iter().zip(results) {
        match settled {
            Ok(Ok(version)) => report.updated.push(UpdatedRequirement { name, version }),
            Ok(Err(e)) => {
                error!("Failed to update {:?}: {}", name, e);
                report.failed.push(FailedRequirement {
                    name,
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                error!("Update task for {:?} panicked: {}", name, e);
                report.failed.push(FailedRequirement {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        "Sync run finished: {} updated, {} failed",
        report.updated.len(),
        report.failed.len()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IndexError, StoreError};
    use crate::index::MockPackageIndex;
    use crate::store::{MockRequirementStore, Store};
    use tempfile::TempDir;

    fn create_test_store(names: &[&str]) -> (TempDir, Arc<Store>) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let store = Store::open(&db_path).unwrap();
        for name in names {
            store.add(name).unwrap();
        }
        (temp_dir, Arc::new(store))
    }

    fn stored_version(store: &Store, name: &str) -> Option<String> {
        store
            .all_requirements()
            .unwrap()
            .into_iter()
            .find(|r| r.name == name)
            .unwrap()
            .current_version
    }

    #[tokio::test]
    async fn update_requirement_persists_resolved_version() {
        let (_temp_dir, store) = create_test_store(&["requests"]);

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .withf(|name| name == "requests")
            .times(1)
            .returning(|_| Ok(vec!["2.30.0".to_string(), "2.31.0".to_string()]));

        let version = update_requirement(store.as_ref(), &index, "requests")
            .await
            .unwrap();

        assert_eq!(version, "2.31.0");
        assert_eq!(
            stored_version(&store, "requests"),
            Some("2.31.0".to_string())
        );
    }

    #[tokio::test]
    async fn update_requirement_leaves_row_untouched_on_resolve_failure() {
        let (_temp_dir, store) = create_test_store(&["flask"]);

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .times(1)
            .returning(|_| Ok(vec![]));

        let result = update_requirement(store.as_ref(), &index, "flask").await;

        assert!(matches!(
            result,
            Err(UpdateError::Resolve(IndexError::NoVersions(name))) if name == "flask"
        ));
        assert_eq!(stored_version(&store, "flask"), None);
    }

    #[tokio::test]
    async fn update_requirement_reports_persist_failure() {
        let mut store = MockRequirementStore::new();
        store
            .expect_set_current_version()
            .times(1)
            .returning(|name, _| Err(StoreError::UnknownRequirement(name.to_string())));

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .times(1)
            .returning(|_| Ok(vec!["1.0.0".to_string()]));

        let result = update_requirement(&store, &index, "requests").await;

        assert!(matches!(result, Err(UpdateError::Persist(_))));
    }

    #[tokio::test]
    async fn run_sync_updates_every_tracked_requirement() {
        let (_temp_dir, store) = create_test_store(&["requests", "flask"]);

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .withf(|name| name == "requests")
            .times(1)
            .returning(|_| Ok(vec!["2.30.0".to_string(), "2.31.0".to_string()]));
        index
            .expect_fetch_versions()
            .withf(|name| name == "flask")
            .times(1)
            .returning(|_| Ok(vec!["3.0.0".to_string()]));

        let report = run_sync(store.clone(), Arc::new(index)).await.unwrap();

        assert_eq!(report.total(), 2);
        assert!(!report.has_failures());
        assert_eq!(
            stored_version(&store, "requests"),
            Some("2.31.0".to_string())
        );
        assert_eq!(stored_version(&store, "flask"), Some("3.0.0".to_string()));
    }

    #[tokio::test]
    async fn run_sync_failure_for_one_requirement_does_not_block_others() {
        let (_temp_dir, store) = create_test_store(&["requests", "flask"]);

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .withf(|name| name == "requests")
            .times(1)
            .returning(|_| Ok(vec!["2.30.0".to_string(), "2.31.0".to_string()]));
        index
            .expect_fetch_versions()
            .withf(|name| name == "flask")
            .times(1)
            .returning(|_| Ok(vec![]));

        let report = run_sync(store.clone(), Arc::new(index)).await.unwrap();

        assert_eq!(
            report.updated,
            vec![UpdatedRequirement {
                name: "requests".to_string(),
                version: "2.31.0".to_string(),
            }]
        );
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "flask");
        assert!(report.failed[0].reason.contains("No published versions"));

        // The failed requirement's row is untouched
        assert_eq!(
            stored_version(&store, "requests"),
            Some("2.31.0".to_string())
        );
        assert_eq!(stored_version(&store, "flask"), None);
    }

    #[tokio::test]
    async fn run_sync_continues_when_persist_fails_for_one_requirement() {
        let mut store = MockRequirementStore::new();
        store
            .expect_list_names()
            .times(1)
            .returning(|| Ok(vec!["requests".to_string(), "flask".to_string()]));
        store
            .expect_set_current_version()
            .withf(|name, _| name == "requests")
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_set_current_version()
            .withf(|name, _| name == "flask")
            .times(1)
            .returning(|name, _| Err(StoreError::UnknownRequirement(name.to_string())));

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .times(2)
            .returning(|_| Ok(vec!["1.0.0".to_string()]));

        let report = run_sync(Arc::new(store), Arc::new(index)).await.unwrap();

        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].name, "requests");
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].name, "flask");
        assert!(report.failed[0].reason.contains("Failed to persist"));
    }

    #[tokio::test]
    async fn run_sync_aborts_and_launches_no_tasks_when_load_fails() {
        let mut store = MockRequirementStore::new();
        store
            .expect_list_names()
            .times(1)
            .returning(|| Err(StoreError::LockPoisoned));

        let mut index = MockPackageIndex::new();
        index.expect_fetch_versions().times(0);

        let result = run_sync(Arc::new(store), Arc::new(index)).await;

        assert!(matches!(result, Err(SyncError::Load(_))));
    }

    #[tokio::test]
    async fn run_sync_handles_empty_tracked_set() {
        let (_temp_dir, store) = create_test_store(&[]);

        let mut index = MockPackageIndex::new();
        index.expect_fetch_versions().times(0);

        let report = run_sync(store, Arc::new(index)).await.unwrap();

        assert_eq!(report.total(), 0);
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn run_sync_is_idempotent_against_a_stable_index() {
        let (_temp_dir, store) = create_test_store(&["requests"]);

        let mut index = MockPackageIndex::new();
        index
            .expect_fetch_versions()
            .times(2)
            .returning(|_| Ok(vec!["2.30.0".to_string(), "2.31.0".to_string()]));
        let index = Arc::new(index);

        run_sync(store.clone(), index.clone()).await.unwrap();
        let first = stored_version(&store, "requests");

        run_sync(store.clone(), index).await.unwrap();
        let second = stored_version(&store, "requests");

        assert_eq!(first, Some("2.31.0".to_string()));
        assert_eq!(first, second);
    }
}
