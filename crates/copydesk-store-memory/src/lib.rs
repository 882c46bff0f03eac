//! In-memory document store backend.
//!
//! The reference `DocumentStore` implementation: one hash map per
//! collection, each trait call a single critical section so it has exactly
//! the atomicity one remote conditional write would have. Used by the test
//! suites and by single-node deployments that don't need durability.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

use copydesk_core::{
    Article, Collection, CreateOutcome, DocumentStore, DraftPatch, StoreError, UpdateOutcome,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    drafts: Mutex<HashMap<String, Article>>,
    versions: Mutex<HashMap<String, Article>>,
    publishes: Mutex<HashMap<String, Article>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn shelf(&self, collection: Collection) -> &Mutex<HashMap<String, Article>> {
        match collection {
            Collection::Draft => &self.drafts,
            Collection::Version => &self.versions,
            Collection::Publish => &self.publishes,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Article>, StoreError> {
        let shelf = self.shelf(collection).lock().unwrap();
        Ok(shelf.get(id).cloned())
    }

    #[instrument(skip(self, article), level = "debug")]
    async fn create(
        &self,
        collection: Collection,
        id: Option<&str>,
        article: &Article,
    ) -> Result<CreateOutcome, StoreError> {
        let mut shelf = self.shelf(collection).lock().unwrap();
        let id = match id {
            Some(id) => {
                if shelf.contains_key(id) {
                    debug!("create rejected, {} {} already exists", collection, id);
                    return Ok(CreateOutcome::AlreadyExists);
                }
                id.to_string()
            }
            None => Uuid::new_v4().simple().to_string(),
        };
        shelf.insert(id.clone(), article.clone());
        Ok(CreateOutcome::Created(id))
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: &DraftPatch,
        guard: Option<&str>,
        detect_noop: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut shelf = self.shelf(collection).lock().unwrap();
        let Some(stored) = shelf.get_mut(id) else {
            return Ok(UpdateOutcome::Missing);
        };
        if let Some(expected) = guard {
            if stored.locked_by != expected {
                debug!(
                    "update of {} {} rejected, locked by {:?} not {:?}",
                    collection, id, stored.locked_by, expected
                );
                return Ok(UpdateOutcome::Rejected);
            }
        }
        if detect_noop && stored.matches(patch) {
            return Ok(UpdateOutcome::Unchanged);
        }
        stored.apply(patch);
        Ok(UpdateOutcome::Updated(stored.clone()))
    }

    #[instrument(skip(self, article), level = "debug")]
    async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        article: &Article,
    ) -> Result<(), StoreError> {
        let mut shelf = self.shelf(collection).lock().unwrap();
        shelf.insert(id.to_string(), article.clone());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        let mut shelf = self.shelf(collection).lock().unwrap();
        Ok(shelf.remove(id).is_some())
    }
}
