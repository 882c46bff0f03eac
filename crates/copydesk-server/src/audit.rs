use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use copydesk_core::{split_article_id, Article, DraftPatch, LifecycleError};

use crate::engine::ArticleLifecycle;

/// One audit record per lifecycle operation, success or failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub action: &'static str,
    pub user: String,
    pub article_guid: Option<String>,
    pub article_version: Option<i64>,
}

/// Receives one entry after every operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emits audit entries as structured tracing events.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        info!(
            target: "audit",
            action = entry.action,
            user = %entry.user,
            article_guid = entry.article_guid.as_deref(),
            article_version = entry.article_version,
            "article operation"
        );
    }
}

/// Wraps an engine, recording `{action, user}` plus the article identity
/// when the request or the result carries one. Purely observational: the
/// wrapped outcome passes through untouched.
pub struct Audited<L> {
    inner: L,
    sink: Arc<dyn AuditSink>,
}

impl<L> Audited<L> {
    pub fn new(inner: L, sink: Arc<dyn AuditSink>) -> Self {
        Self { inner, sink }
    }

    fn record(&self, action: &'static str, user: &str, id: Option<&str>) {
        let (guid, version) = match id {
            Some(id) => {
                let (guid, version) = split_article_id(id);
                (Some(guid.to_string()), (version > 0).then_some(version))
            }
            None => (None, None),
        };
        self.sink.record(AuditEntry {
            action,
            user: user.to_string(),
            article_guid: guid,
            article_version: version,
        });
    }
}

#[async_trait]
impl<L: ArticleLifecycle> ArticleLifecycle for Audited<L> {
    async fn create(&self, user: &str) -> Result<Article, LifecycleError> {
        let result = self.inner.create(user).await;
        // the only operation whose id exists only after the fact
        let id = result
            .as_ref()
            .ok()
            .map(|draft| draft.id.as_str())
            .filter(|id| !id.is_empty());
        self.record("create", user, id);
        result
    }

    async fn edit(&self, user: &str, id: &str) -> Result<Article, LifecycleError> {
        let result = self.inner.edit(user, id).await;
        self.record("edit", user, Some(id));
        result
    }

    async fn save(&self, user: &str, id: &str, patch: &DraftPatch) -> Result<(), LifecycleError> {
        let result = self.inner.save(user, id, patch).await;
        self.record("save", user, Some(id));
        result
    }

    async fn submit(
        &self,
        user: &str,
        id: &str,
        patch: &DraftPatch,
    ) -> Result<Article, LifecycleError> {
        let result = self.inner.submit(user, id, patch).await;
        self.record("submit", user, Some(id));
        result
    }

    async fn discard(&self, user: &str, id: &str) -> Result<(), LifecycleError> {
        let result = self.inner.discard(user, id).await;
        self.record("discard", user, Some(id));
        result
    }

    async fn publish(&self, user: &str, id: &str) -> Result<(), LifecycleError> {
        let result = self.inner.publish(user, id).await;
        self.record("publish", user, Some(id));
        result
    }

    async fn unpublish(&self, user: &str, id: &str) -> Result<(), LifecycleError> {
        let result = self.inner.unpublish(user, id).await;
        self.record("unpublish", user, Some(id));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use copydesk_store_memory::MemoryStore;

    use crate::engine::LifecycleEngine;

    #[derive(Default)]
    struct RecordingSink {
        entries: Mutex<Vec<AuditEntry>>,
    }

    impl AuditSink for RecordingSink {
        fn record(&self, entry: AuditEntry) {
            self.entries.lock().unwrap().push(entry);
        }
    }

    fn setup() -> (Audited<LifecycleEngine>, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let engine = LifecycleEngine::new(Arc::new(MemoryStore::new()));
        (Audited::new(engine, sink.clone()), sink)
    }

    #[tokio::test]
    async fn test_create_records_the_allocated_id() {
        let (audited, sink) = setup();

        let draft = audited.create("alice").await.unwrap();

        let entries = sink.entries.lock().unwrap();
        assert_eq!(
            entries[..],
            [AuditEntry {
                action: "create",
                user: "alice".to_string(),
                article_guid: Some(draft.id.clone()),
                article_version: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_version_ids_record_guid_and_version() {
        let (audited, sink) = setup();

        let draft = audited.create("alice").await.unwrap();
        let version = audited
            .submit("alice", &draft.id, &DraftPatch::default())
            .await
            .unwrap();
        audited.publish("alice", &version.id).await.unwrap();

        let entries = sink.entries.lock().unwrap();
        let publish = entries.last().unwrap();
        assert_eq!(publish.action, "publish");
        assert_eq!(publish.article_guid.as_deref(), Some(draft.id.as_str()));
        assert_eq!(publish.article_version, Some(version.version));
    }

    #[tokio::test]
    async fn test_failures_are_recorded_and_passed_through() {
        let (audited, sink) = setup();

        let err = audited.discard("alice", "nope").await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, "discard");
        assert_eq!(entries[0].article_guid.as_deref(), Some("nope"));
        assert_eq!(entries[0].article_version, None);
    }
}
