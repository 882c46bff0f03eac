use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

use copydesk_core::{
    split_article_id, version_id, Article, CreateOutcome, DocumentStore, DraftPatch,
    LifecycleError, UpdateOutcome,
};

use crate::lock::KeyedLocks;
use crate::store::ArticleStore;

/// The seven article lifecycle operations.
///
/// `user` is the authenticated username asserted by the fronting layer.
/// Both the audit decorator and the HTTP handlers program against this
/// trait.
#[async_trait]
pub trait ArticleLifecycle: Send + Sync {
    /// Open a brand-new draft owned by `user`.
    async fn create(&self, user: &str) -> Result<Article, LifecycleError>;

    /// Open a draft of an existing version, locked to `user`.
    async fn edit(&self, user: &str, id: &str) -> Result<Article, LifecycleError>;

    /// Store the editorial payload on a draft `user` owns.
    async fn save(&self, user: &str, id: &str, patch: &DraftPatch) -> Result<(), LifecycleError>;

    /// Finalize a draft into an immutable version. Privileged: bypasses the
    /// draft lock, so any submitter may finalize another user's open edit.
    async fn submit(
        &self,
        user: &str,
        id: &str,
        patch: &DraftPatch,
    ) -> Result<Article, LifecycleError>;

    /// Drop a draft without producing a version.
    async fn discard(&self, user: &str, id: &str) -> Result<(), LifecycleError>;

    /// Point the article's published pointer at a version.
    async fn publish(&self, user: &str, id: &str) -> Result<(), LifecycleError>;

    /// Remove the published pointer.
    async fn unpublish(&self, user: &str, id: &str) -> Result<(), LifecycleError>;
}

/// The lifecycle state machine over a document store.
///
/// Draft and publish mutations are serialized per article id by two
/// independent keyed-lock tables, so a draft edit never contends with a
/// publish of the same article. The locks cover read-then-write sequences
/// within this process only; every individual store call is conditional on
/// the store side, which is what other instances rely on.
pub struct LifecycleEngine {
    articles: ArticleStore,
    draft_locks: KeyedLocks,
    publish_locks: KeyedLocks,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            articles: ArticleStore::new(store),
            draft_locks: KeyedLocks::new(),
            publish_locks: KeyedLocks::new(),
        }
    }
}

#[async_trait]
impl ArticleLifecycle for LifecycleEngine {
    #[instrument(skip(self), level = "debug")]
    async fn create(&self, user: &str) -> Result<Article, LifecycleError> {
        // Only the lock owner and the derivation marker are stored; the
        // store allocates the id, so no keyed lock is needed.
        let draft = Article {
            locked_by: user.to_string(),
            from_version: 0,
            ..Article::default()
        };
        let id = self.articles.create_draft(&draft).await?;
        debug!("created draft {} for {}", id, user);

        let mut created = draft;
        created.guid = id.clone();
        created.id = id;
        created.created_by = user.to_string();
        Ok(created)
    }

    #[instrument(skip(self), level = "debug")]
    async fn edit(&self, user: &str, id: &str) -> Result<Article, LifecycleError> {
        let mut draft = self
            .articles
            .get_version(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("version {} not found", id)))?;

        let (guid, _) = split_article_id(id);
        draft.id = guid.to_string();
        draft.guid = guid.to_string();
        draft.from_version = draft.version;
        draft.version = 0;
        draft.revised_at = None;
        draft.revised_by = user.to_string();
        draft.locked_by = user.to_string();

        let _guard = self.draft_locks.acquire(guid).await;
        if self.articles.create_draft_at(guid, &draft).await? {
            debug!("opened draft {} from version {} for {}", guid, draft.from_version, user);
            return Ok(draft);
        }

        // Lost the race, or an orphaned draft is in the way: report who
        // holds the id.
        match self.articles.get_draft_identity(guid).await? {
            Some(current) => Err(LifecycleError::Conflict { current }),
            // The occupying draft vanished between the failed create and
            // the reload; hand back a bare conflict so the caller retries.
            None => Err(LifecycleError::Conflict {
                current: Article {
                    guid: guid.to_string(),
                    ..Article::default()
                },
            }),
        }
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn save(&self, user: &str, id: &str, patch: &DraftPatch) -> Result<(), LifecycleError> {
        let _guard = self.draft_locks.acquire(id).await;
        match self.articles.update_draft(id, patch, Some(user), true).await? {
            UpdateOutcome::Updated(_) | UpdateOutcome::Unchanged => Ok(()),
            UpdateOutcome::Rejected => Err(LifecycleError::Forbidden(
                "draft is locked by another user".to_string(),
            )),
            UpdateOutcome::Missing => {
                Err(LifecycleError::NotFound(format!("draft {} not found", id)))
            }
        }
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn submit(
        &self,
        user: &str,
        id: &str,
        patch: &DraftPatch,
    ) -> Result<Article, LifecycleError> {
        let guid = id;
        let now = Utc::now();
        let _guard = self.draft_locks.acquire(guid).await;

        // (1) Flush the caller's payload into the draft without a lock
        // check: submit finalizes regardless of who holds the edit.
        let mut version = match self.articles.update_draft(guid, patch, None, false).await? {
            UpdateOutcome::Updated(draft) => draft,
            UpdateOutcome::Missing => {
                return Err(LifecycleError::Internal(format!(
                    "draft {} missing at submit",
                    guid
                )))
            }
            UpdateOutcome::Rejected | UpdateOutcome::Unchanged => {
                return Err(LifecycleError::Internal(format!(
                    "store withheld the updated draft {} at submit",
                    guid
                )))
            }
        };

        // (2) The version identity is the submit instant.
        let ver = now.timestamp_nanos_opt().ok_or_else(|| {
            LifecycleError::Internal("clock out of range for a version timestamp".to_string())
        })?;
        let vid = version_id(guid, ver);

        version.id = vid.clone();
        version.guid = guid.to_string();
        version.version = ver;
        if version.from_version == 0 {
            // first submit of a brand-new article
            version.created_at = Some(now);
            version.created_by = user.to_string();
            version.revised_at = None;
            version.revised_by = String::new();
        } else {
            version.revised_at = Some(now);
            version.revised_by = user.to_string();
        }
        version.locked_by = String::new();

        // (3) Create-only: an identity collision means the clock handed out
        // the same nanosecond twice, which is fatal and never retried.
        match self.articles.create_version(&vid, &version).await? {
            CreateOutcome::Created(_) => {}
            CreateOutcome::AlreadyExists => {
                return Err(LifecycleError::Internal(format!(
                    "version {} already exists",
                    vid
                )))
            }
        }

        // (4) Retire the draft. A failure here leaves it orphaned next to
        // the created version; edit reports that as a conflict, so the
        // inconsistency is recoverable and is not rolled back.
        self.articles.delete_draft(guid).await?;

        debug!("submitted draft {} as version {}", guid, vid);
        Ok(version.strip_body())
    }

    #[instrument(skip(self), level = "debug")]
    async fn discard(&self, _user: &str, id: &str) -> Result<(), LifecycleError> {
        let _guard = self.draft_locks.acquire(id).await;
        if self.articles.delete_draft(id).await? {
            debug!("discarded draft {}", id);
            Ok(())
        } else {
            Err(LifecycleError::NotFound(format!("draft {} not found", id)))
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn publish(&self, _user: &str, id: &str) -> Result<(), LifecycleError> {
        let mut article = self
            .articles
            .get_version(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("version {} not found", id)))?;

        let (guid, _) = split_article_id(id);
        article.id = guid.to_string();
        article.guid = guid.to_string();
        article.locked_by = String::new();

        // No version-ordering check: the pointer is last write wins.
        let _guard = self.publish_locks.acquire(guid).await;
        self.articles.upsert_publish(guid, &article).await?;
        debug!("published {} as {}", id, guid);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn unpublish(&self, _user: &str, id: &str) -> Result<(), LifecycleError> {
        let _guard = self.publish_locks.acquire(id).await;
        if self.articles.delete_publish(id).await? {
            debug!("unpublished {}", id);
            Ok(())
        } else {
            Err(LifecycleError::NotFound(format!(
                "published article {} not found",
                id
            )))
        }
    }
}
