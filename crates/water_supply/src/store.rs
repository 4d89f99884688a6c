use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::{DateTime, Local};
use model::{
    bowser::Bowser,
    deployment::{Deployment, DeploymentStatus},
    Resource,
};
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use utility::id::Id;

use crate::{
    backend::Backend,
    collections::{CollectionFailure, CollectionSet, Collections, Holds},
    envelope, RequestError, RequestResult,
};

/// Outcome of one load.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub sequence: u64,
    /// `false` if a newer load or write landed first and this result was
    /// thrown away.
    pub applied: bool,
    pub failures: Vec<CollectionFailure>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum Refresh {
    Completed(RefreshReport),
    /// Another refresh was still running.
    Skipped,
}

struct Snapshot<C> {
    collections: Arc<C>,
    /// Sequence number of the load or write that produced this snapshot.
    sequence: u64,
    loaded_at: Option<DateTime<Local>>,
}

/// Holds one [`CollectionSet`] in memory and keeps it in step with the
/// backend.
///
/// Readers get an `Arc` to an immutable snapshot, so they never see a
/// half-replaced set. Loads and confirmed writes are numbered; a result
/// older than what is already visible is discarded.
pub struct Store<B: Backend, C: CollectionSet> {
    backend: B,
    snapshot: RwLock<Snapshot<C>>,
    sequence: AtomicU64,
    refreshing: Mutex<()>,
}

impl<B: Backend, C: CollectionSet> Store<B, C> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snapshot: RwLock::new(Snapshot {
                collections: Arc::new(C::default()),
                sequence: 0,
                loaded_at: None,
            }),
            sequence: AtomicU64::new(0),
            refreshing: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// The current collections. Empty until the first load finished.
    pub async fn snapshot(&self) -> Arc<C> {
        self.snapshot.read().await.collections.clone()
    }

    pub async fn loaded_at(&self) -> Option<DateTime<Local>> {
        self.snapshot.read().await.loaded_at
    }

    pub async fn is_loaded(&self) -> bool {
        self.snapshot.read().await.loaded_at.is_some()
    }

    /// Fetches every collection and swaps them in at once. Always runs,
    /// even when another load is in flight; see [`Store::refresh`].
    pub async fn load(&self) -> RefreshReport {
        let sequence = self.next_sequence();
        let (collections, failures) = C::fetch(&self.backend).await;

        let mut snapshot = self.snapshot.write().await;
        if sequence < snapshot.sequence {
            log::debug!(
                "Discarding load #{}, snapshot is already at #{}.",
                sequence,
                snapshot.sequence
            );
            return RefreshReport {
                sequence,
                applied: false,
                failures,
            };
        }
        *snapshot = Snapshot {
            collections: Arc::new(collections),
            sequence,
            loaded_at: Some(Local::now()),
        };
        RefreshReport {
            sequence,
            applied: true,
            failures,
        }
    }

    /// Like [`Store::load`], but does nothing while another refresh is
    /// still running.
    pub async fn refresh(&self) -> Refresh {
        let Ok(_guard) = self.refreshing.try_lock() else {
            log::debug!("Refresh already in flight, skipping.");
            return Refresh::Skipped;
        };
        Refresh::Completed(self.load().await)
    }

    pub async fn get<T>(&self, id: &Id<T>) -> Option<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        Holds::<T>::find(self.snapshot().await.as_ref(), id).cloned()
    }

    pub async fn all<T>(&self) -> Vec<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        Holds::<T>::records(self.snapshot().await.as_ref()).clone()
    }

    /// Applies a confirmed write to the cached collections.
    async fn apply(&self, mutate: impl FnOnce(&mut C)) {
        let sequence = self.next_sequence();
        let mut snapshot = self.snapshot.write().await;
        mutate(Arc::make_mut(&mut snapshot.collections));
        snapshot.sequence = snapshot.sequence.max(sequence);
    }

    async fn ensure_loaded(&self) -> RequestResult<Arc<C>> {
        let snapshot = self.snapshot.read().await;
        if snapshot.loaded_at.is_none() {
            return Err(RequestError::NotLoaded);
        }
        Ok(snapshot.collections.clone())
    }

    /// Creates `record` on the backend and caches it under the id the
    /// backend assigned.
    pub async fn create<T>(&self, record: T) -> RequestResult<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        let collections = self.ensure_loaded().await?;
        collections.validate(&record)?;

        let mut body = serde_json::to_value(&record)?;
        let response = self
            .backend
            .request(Method::POST, T::ENDPOINT, Some(body.clone()))
            .await?;
        envelope::merge(&mut body, &envelope::unwrap_item(response)?);
        let created: T = serde_json::from_value(body)?;
        if created.id().is_blank() {
            return Err(RequestError::Shape(format!(
                "created {} record came back without an id",
                T::NAME
            )));
        }

        let cached = created.clone();
        self.apply(move |collections| collections.records_mut().push(cached))
            .await;
        log::info!("Created {} record {}.", T::NAME, created.id());
        Ok(created)
    }

    /// PUT: the fields in `changes` replace those of the cached record.
    pub async fn update<T>(&self, id: &Id<T>, changes: Value) -> RequestResult<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        self.write(Method::PUT, id, changes).await
    }

    /// PATCH, with the same merge semantics as [`Store::update`].
    pub async fn patch<T>(&self, id: &Id<T>, changes: Value) -> RequestResult<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        self.write(Method::PATCH, id, changes).await
    }

    async fn write<T>(&self, method: Method, id: &Id<T>, changes: Value) -> RequestResult<T>
    where
        T: Resource,
        C: Holds<T>,
    {
        if !changes.is_object() {
            return Err(RequestError::Shape(format!(
                "changes to {} must be a JSON object",
                T::NAME
            )));
        }
        let collections = self.ensure_loaded().await?;
        let existing = collections
            .find(id)
            .ok_or_else(|| RequestError::not_found(id))?;

        let mut merged = serde_json::to_value(existing)?;
        envelope::merge(&mut merged, &changes);
        let candidate: T = serde_json::from_value(merged.clone())?;
        collections.validate(&candidate)?;

        let response = self
            .backend
            .request(method, &T::item_endpoint(id), Some(changes))
            .await?;
        envelope::merge(&mut merged, &envelope::unwrap_item(response)?);
        let mut updated: T = serde_json::from_value(merged)?;
        updated.set_id(id.clone());

        let cached = updated.clone();
        self.apply(move |collections| {
            if let Some(slot) = collections
                .records_mut()
                .iter_mut()
                .find(|record| record.id() == cached.id())
            {
                *slot = cached;
            }
        })
        .await;
        log::info!("Updated {} record {}.", T::NAME, id);
        Ok(updated)
    }

    pub async fn delete<T>(&self, id: &Id<T>) -> RequestResult<()>
    where
        T: Resource,
        C: Holds<T>,
    {
        let collections = self.ensure_loaded().await?;
        if collections.find(id).is_none() {
            return Err(RequestError::not_found(id));
        }
        let response = self
            .backend
            .request(Method::DELETE, &T::item_endpoint(id), None)
            .await?;
        envelope::reject_error(response)?;

        let id = id.clone();
        self.apply(move |collections| {
            collections.records_mut().retain(|record| record.id() != &id)
        })
        .await;
        Ok(())
    }
}

impl<B: Backend> Store<B, Collections> {
    /// Completes a deployment as of today and hands its bowser back to the
    /// pool.
    pub async fn end_deployment(&self, id: &Id<Deployment>) -> RequestResult<Deployment> {
        let today = Local::now().date_naive();
        let ended: Deployment = self
            .update(
                id,
                json!({
                    "status": DeploymentStatus::Completed,
                    "end_date": format!("{}T00:00:00", today.format("%Y-%m-%d")),
                }),
            )
            .await?;
        self.update::<Bowser>(&ended.bowser_id, json!({"status": "active"}))
            .await?;
        Ok(ended)
    }

    pub async fn active_deployments(&self) -> Vec<Deployment> {
        self.snapshot()
            .await
            .active_deployments()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use model::location::Location;

    use super::*;
    use crate::memory::{MemoryBackend, ResponseMode};

    fn backend(mode: ResponseMode) -> Arc<MemoryBackend> {
        Arc::new(
            MemoryBackend::new(mode)
                .with_collection(
                    "/locations",
                    json!([{"id": "LOC001", "name": "Riverside Community Center"}]),
                )
                .with_collection(
                    "/bowsers",
                    json!([
                        {"id": "BWR002", "capacity": 7500, "current_level": 7000, "status": "deployed"},
                        {"id": "BWR003", "capacity": 6000, "current_level": 6000, "status": "standby"}
                    ]),
                )
                .with_collection(
                    "/deployments",
                    json!([{"id": "D1", "bowser_id": "BWR002", "location_id": "LOC001", "status": "active"}]),
                )
                .with_collection("/maintenance", json!([]))
                .with_collection("/alerts", json!([]))
                .with_collection("/users", json!([])),
        )
    }

    fn deployment(bowser: &str, status: &str) -> Deployment {
        serde_json::from_value(json!({
            "bowser_id": bowser, "location_id": "LOC001", "status": status
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn writes_need_a_loaded_store() {
        let store: Store<_, Collections> = Store::new(backend(ResponseMode::Bare));
        assert!(matches!(
            store.create(deployment("BWR003", "active")).await,
            Err(RequestError::NotLoaded)
        ));
        store.load().await;
        assert!(store.is_loaded().await);
        assert!(store.create(deployment("BWR003", "active")).await.is_ok());
    }

    #[tokio::test]
    async fn created_records_adopt_the_server_id() {
        for mode in [ResponseMode::Bare, ResponseMode::Envelope, ResponseMode::IdOnly] {
            let store: Store<_, Collections> = Store::new(backend(mode));
            store.load().await;
            let created = store.create(deployment("BWR003", "scheduled")).await.unwrap();
            assert!(!created.id.is_blank(), "{mode:?}");
            assert_eq!(created.status, DeploymentStatus::Scheduled);
            assert_eq!(store.get(&created.id).await.map(|d| d.id), Some(created.id.clone()));
        }
    }

    #[tokio::test]
    async fn conflicting_deployments_are_rejected_before_sending() {
        let backend = backend(ResponseMode::Bare);
        let store: Store<_, Collections> = Store::new(backend.clone());
        store.load().await;
        let before = backend.requests().await.len();

        let result = store.create(deployment("BWR002", "active")).await;
        assert!(matches!(result, Err(RequestError::Conflict(_))));
        assert_eq!(backend.requests().await.len(), before);
        assert_eq!(store.snapshot().await.deployments.len(), 1);
    }

    #[tokio::test]
    async fn failed_writes_leave_the_cache_alone() {
        let backend = backend(ResponseMode::Bare);
        let store: Store<_, Collections> = Store::new(backend.clone());
        store.load().await;
        backend
            .fail(
                "/bowsers",
                RequestError::Api {
                    message: "read only".to_owned(),
                },
            )
            .await;

        let id = Id::<Bowser>::from("BWR002");
        assert!(store.patch(&id, json!({"current_level": 10})).await.is_err());
        assert!(store.delete(&id).await.is_err());
        let cached = store.get(&id).await.unwrap();
        assert_eq!(cached.current_level, 7000.0);
    }

    #[tokio::test]
    async fn updates_merge_into_the_cache() {
        let store: Store<_, Collections> = Store::new(backend(ResponseMode::IdOnly));
        store.load().await;
        let id = Id::<Bowser>::from("BWR002");
        let updated = store
            .update(&id, json!({"current_level": 1000}))
            .await
            .unwrap();
        assert_eq!(updated.current_level, 1000.0);
        assert_eq!(updated.capacity, 7500.0);
        assert_eq!(store.get(&id).await.unwrap().current_level, 1000.0);

        assert!(matches!(
            store.update(&Id::<Bowser>::from("BWR404"), json!({})).await,
            Err(RequestError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_removes_from_the_cache() {
        let store: Store<_, Collections> = Store::new(backend(ResponseMode::Envelope));
        store.load().await;
        let id = Id::<Location>::from("LOC001");
        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.is_none());
        assert!(matches!(
            store.delete(&id).await,
            Err(RequestError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn ending_a_deployment_frees_the_bowser() {
        let backend = backend(ResponseMode::Bare);
        let store: Store<_, Collections> = Store::new(backend.clone());
        store.load().await;

        let ended = store.end_deployment(&Id::from("D1")).await.unwrap();
        assert_eq!(ended.status, DeploymentStatus::Completed);
        assert_eq!(
            ended.end_date.map(|date| date.date()),
            Some(Local::now().date_naive())
        );
        let bowser = store.get(&Id::<Bowser>::from("BWR002")).await.unwrap();
        assert!(bowser.is_available());
        assert!(store.active_deployments().await.is_empty());

        // the bowser is free for a new active deployment now
        assert!(store.create(deployment("BWR002", "active")).await.is_ok());
        // and the backend agrees
        let stored = backend.collection("/deployments").await;
        assert_eq!(stored[0]["status"], "completed");
    }

    #[tokio::test]
    async fn loads_replace_the_whole_snapshot() {
        let backend = backend(ResponseMode::Envelope);
        let store: Store<_, Collections> = Store::new(backend.clone());
        store.load().await;
        let first = store.snapshot().await;

        backend
            .fail(
                "/bowsers",
                RequestError::Api {
                    message: "down".to_owned(),
                },
            )
            .await;
        let report = store.load().await;
        assert!(report.applied);
        assert_eq!(report.failures.len(), 1);

        let second = store.snapshot().await;
        assert!(second.bowsers.is_empty());
        assert_eq!(second.locations.len(), 1);
        assert_eq!(second.deployments.len(), 1);
        // earlier readers keep their snapshot
        assert_eq!(first.bowsers.len(), 2);
    }

    #[tokio::test]
    async fn stale_loads_are_discarded() {
        let backend = backend(ResponseMode::Bare);
        let store = Arc::new(Store::<_, Collections>::new(backend.clone()));
        backend.delay("/locations", Duration::from_millis(200)).await;

        let slow = tokio::spawn({
            let store = store.clone();
            async move { store.load().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        backend.delay("/locations", Duration::ZERO).await;
        backend
            .set_collection(
                "/locations",
                vec![json!({"id": "LOC001", "name": "Renamed"})],
            )
            .await;
        let fresh = store.load().await;
        assert!(fresh.applied);

        let stale = slow.await.unwrap();
        assert!(!stale.applied);
        assert!(stale.sequence < fresh.sequence);
        let name = store.snapshot().await.locations[0].name.clone();
        assert_eq!(name, "Renamed");
    }

    #[tokio::test]
    async fn overlapping_refreshes_are_skipped() {
        let backend = backend(ResponseMode::Bare);
        let store = Arc::new(Store::<_, Collections>::new(backend.clone()));
        backend.delay("/users", Duration::from_millis(200)).await;

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(matches!(store.refresh().await, Refresh::Skipped));
        assert!(matches!(first.await.unwrap(), Refresh::Completed(_)));
        assert!(matches!(store.refresh().await, Refresh::Completed(_)));
    }
}
