use std::sync::Arc;

use copydesk_core::{
    Article, Collection, CreateOutcome, DocumentStore, DraftPatch, LifecycleError, StoreError,
    UpdateOutcome,
};

/// Typed access to the three article collections.
///
/// The lifecycle engine is the sole writer of these collections; everything
/// it does goes through here, one store call per method.
#[derive(Clone)]
pub struct ArticleStore {
    store: Arc<dyn DocumentStore>,
}

impl ArticleStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// The identity slice of a draft (no editorial payload), as reported to
    /// a caller that lost a create race.
    pub async fn get_draft_identity(&self, id: &str) -> Result<Option<Article>, StoreError> {
        Ok(self.store.get(Collection::Draft, id).await?.map(|article| Article {
            id: id.to_string(),
            // brand-new drafts don't store a guid yet; their id is the guid
            guid: if article.guid.is_empty() {
                id.to_string()
            } else {
                article.guid
            },
            version: article.version,
            from_version: article.from_version,
            locked_by: article.locked_by,
            ..Article::default()
        }))
    }

    pub async fn get_version(&self, id: &str) -> Result<Option<Article>, StoreError> {
        Ok(self
            .store
            .get(Collection::Version, id)
            .await?
            .map(|article| with_id(article, id)))
    }

    /// Create a brand-new draft under a store-allocated id.
    pub async fn create_draft(&self, article: &Article) -> Result<String, LifecycleError> {
        match self.store.create(Collection::Draft, None, article).await? {
            CreateOutcome::Created(id) => Ok(id),
            CreateOutcome::AlreadyExists => Err(LifecycleError::Internal(
                "store reported a collision on a store-allocated draft id".to_string(),
            )),
        }
    }

    /// Create a draft under `guid`; reports whether the id was free.
    pub async fn create_draft_at(&self, guid: &str, article: &Article) -> Result<bool, StoreError> {
        Ok(matches!(
            self.store.create(Collection::Draft, Some(guid), article).await?,
            CreateOutcome::Created(_)
        ))
    }

    pub async fn update_draft(
        &self,
        id: &str,
        patch: &DraftPatch,
        guard: Option<&str>,
        detect_noop: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        self.store
            .update(Collection::Draft, id, patch, guard, detect_noop)
            .await
    }

    pub async fn delete_draft(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(Collection::Draft, id).await
    }

    pub async fn create_version(
        &self,
        id: &str,
        article: &Article,
    ) -> Result<CreateOutcome, StoreError> {
        self.store.create(Collection::Version, Some(id), article).await
    }

    pub async fn upsert_publish(&self, guid: &str, article: &Article) -> Result<(), StoreError> {
        self.store.upsert(Collection::Publish, guid, article).await
    }

    pub async fn delete_publish(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(Collection::Publish, id).await
    }
}

fn with_id(mut article: Article, id: &str) -> Article {
    article.id = id.to_string();
    article
}
