use async_trait::async_trait;

use crate::article::{Article, Collection, DraftPatch};
use crate::error::StoreError;

/// Outcome of a create-only write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The document was created under this id.
    Created(String),
    /// A document with this id already exists; nothing was written.
    AlreadyExists,
}

/// Outcome of a guarded update.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The patch was applied; carries the updated document.
    Updated(Article),
    /// The guard predicate rejected the write; nothing changed.
    Rejected,
    /// No field value differed from what is stored (`detect_noop`).
    Unchanged,
    /// No document with this id exists in the collection.
    Missing,
}

/// Durable document store holding the three article collections.
///
/// Each call must be atomic on the store side: `create` fails rather than
/// overwrites, `update` evaluates its guard against the stored document in
/// the same operation that applies the patch. These per-call guarantees are
/// the only cross-process synchronization in the system; the in-process
/// keyed locks only keep one service instance from racing itself between a
/// read and a dependent write.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. `Ok(None)` if absent.
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Article>, StoreError>;

    /// Create a document, failing if the id is taken. With `id == None` the
    /// store allocates a fresh id and returns it.
    async fn create(
        &self,
        collection: Collection,
        id: Option<&str>,
        article: &Article,
    ) -> Result<CreateOutcome, StoreError>;

    /// Apply an editorial patch to a stored document in one conditional
    /// write.
    ///
    /// With `guard = Some(user)` the patch only applies if the stored
    /// `locked_by` equals `user`; a mismatch reports `Rejected`. With
    /// `detect_noop` set, a patch that changes no field reports `Unchanged`
    /// instead of `Updated`.
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: &DraftPatch,
        guard: Option<&str>,
        detect_noop: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Create or fully replace a document.
    async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        article: &Article,
    ) -> Result<(), StoreError>;

    /// Delete a document. Returns whether it existed.
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError>;
}
