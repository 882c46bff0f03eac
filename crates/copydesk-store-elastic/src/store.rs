use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use copydesk_core::{
    Article, Collection, CreateOutcome, DocumentStore, DraftPatch, StoreError, UpdateOutcome,
};

use crate::client::{EsClient, EsUpdate};

/// Painless script evaluated by Elasticsearch on guarded updates. The lock
/// check and the field writes happen in one server-side operation, which is
/// what keeps `save` correct across service instances.
const SAVE_SCRIPT: &str = r#"
if (params.checkuser && ctx._source.locked_by != params.username) {
  ctx.op = "none"
} else {
  ctx._source.headline = params.headline;
  ctx._source.summary = params.summary;
  ctx._source.content = params.content;
  ctx._source.tags = params.tags;
  ctx._source.note = params.note;
}"#;

/// Elasticsearch-backed document store: one index per collection
/// (`{prefix}-draft`, `{prefix}-version`, `{prefix}-publish`).
pub struct ElasticStore {
    client: EsClient,
    index_prefix: String,
}

impl ElasticStore {
    pub fn new(base_url: &str, index_prefix: &str) -> Self {
        Self {
            client: EsClient::new(base_url),
            index_prefix: index_prefix.to_string(),
        }
    }

    fn index(&self, collection: Collection) -> String {
        format!("{}-{}", self.index_prefix, collection)
    }

    fn to_doc(article: &Article) -> Result<Value, StoreError> {
        serde_json::to_value(article)
            .map_err(|e| StoreError::Serialization(format!("failed to serialize article: {}", e)))
    }

    fn from_doc(source: Value) -> Result<Article, StoreError> {
        serde_json::from_value(source)
            .map_err(|e| StoreError::Serialization(format!("failed to deserialize article: {}", e)))
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Article>, StoreError> {
        match self.client.get_source(&self.index(collection), id).await? {
            Some(source) => Ok(Some(Self::from_doc(source)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, article), level = "debug")]
    async fn create(
        &self,
        collection: Collection,
        id: Option<&str>,
        article: &Article,
    ) -> Result<CreateOutcome, StoreError> {
        let doc = Self::to_doc(article)?;
        let index = self.index(collection);
        match id {
            Some(id) => {
                if self.client.create_doc(&index, id, &doc).await? {
                    Ok(CreateOutcome::Created(id.to_string()))
                } else {
                    Ok(CreateOutcome::AlreadyExists)
                }
            }
            None => Ok(CreateOutcome::Created(
                self.client.index_doc(&index, &doc).await?,
            )),
        }
    }

    #[instrument(skip(self, patch), level = "debug")]
    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: &DraftPatch,
        guard: Option<&str>,
        _detect_noop: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let body = json!({
            "script": {
                "source": SAVE_SCRIPT,
                "lang": "painless",
                "params": {
                    "checkuser": guard.is_some(),
                    "username": guard.unwrap_or(""),
                    "headline": patch.headline,
                    "summary": patch.summary,
                    "content": patch.content,
                    "tags": patch.tags,
                    "note": patch.note,
                },
            },
        });

        let Some(EsUpdate { result, source }) =
            self.client.update_doc(&self.index(collection), id, &body).await?
        else {
            return Ok(UpdateOutcome::Missing);
        };

        match result.as_str() {
            "updated" => {
                let source = source.ok_or_else(|| {
                    StoreError::Internal(format!("update of {}: no source in response", id))
                })?;
                Ok(UpdateOutcome::Updated(Self::from_doc(source)?))
            }
            // The script turns a failed lock check into a no-op, and a
            // scripted update that changes nothing still reports "updated",
            // so with a guard present "noop" always means the guard fired.
            "noop" if guard.is_some() => Ok(UpdateOutcome::Rejected),
            "noop" => Ok(UpdateOutcome::Unchanged),
            other => Err(StoreError::Internal(format!(
                "unknown update result {:?} for {}",
                other, id
            ))),
        }
    }

    #[instrument(skip(self, article), level = "debug")]
    async fn upsert(
        &self,
        collection: Collection,
        id: &str,
        article: &Article,
    ) -> Result<(), StoreError> {
        let body = json!({
            "doc": Self::to_doc(article)?,
            "doc_as_upsert": true,
        });
        match self.client.update_doc(&self.index(collection), id, &body).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::Internal(format!(
                "upsert of {} reported a missing document",
                id
            ))),
        }
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.client.delete_doc(&self.index(collection), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> ElasticStore {
        ElasticStore::new(&server.uri(), "article")
    }

    #[tokio::test]
    async fn test_get_found_parses_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article-draft/_doc/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "article-draft",
                "_id": "a1",
                "found": true,
                "_source": {"guid": "a1", "locked_by": "alice"},
            })))
            .mount(&server)
            .await;

        let article = store(&server)
            .get(Collection::Draft, "a1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(article.guid, "a1");
        assert_eq!(article.locked_by, "alice");
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article-version/_doc/a1:7"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"found": false})))
            .mount(&server)
            .await;

        assert!(store(&server)
            .get(Collection::Version, "a1:7")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_conflict_maps_to_already_exists() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/article-draft/_create/a1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {"type": "version_conflict_engine_exception"},
            })))
            .mount(&server)
            .await;

        let outcome = store(&server)
            .create(Collection::Draft, Some("a1"), &Article::default())
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_without_id_uses_store_allocation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/article-draft/_doc"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_id": "fresh-id",
                "result": "created",
            })))
            .mount(&server)
            .await;

        let outcome = store(&server)
            .create(Collection::Draft, None, &Article::default())
            .await
            .unwrap();
        assert_eq!(outcome, CreateOutcome::Created("fresh-id".to_string()));
    }

    #[tokio::test]
    async fn test_guarded_update_noop_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/article-draft/_update/a1"))
            .and(body_partial_json(json!({
                "script": {"params": {"checkuser": true, "username": "bob"}},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "noop"})))
            .mount(&server)
            .await;

        let outcome = store(&server)
            .update(Collection::Draft, "a1", &DraftPatch::default(), Some("bob"), true)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Rejected));
    }

    #[tokio::test]
    async fn test_update_returns_updated_source() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/article-draft/_update/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "updated",
                "get": {"_source": {"guid": "a1", "content": "x", "locked_by": "alice"}},
            })))
            .mount(&server)
            .await;

        let patch = DraftPatch {
            content: "x".to_string(),
            ..DraftPatch::default()
        };
        let outcome = store(&server)
            .update(Collection::Draft, "a1", &patch, Some("alice"), true)
            .await
            .unwrap();
        let UpdateOutcome::Updated(article) = outcome else {
            panic!("expected Updated");
        };
        assert_eq!(article.content, "x");
    }

    #[tokio::test]
    async fn test_update_missing_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/article-draft/_update/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"type": "document_missing_exception"},
            })))
            .mount(&server)
            .await;

        let outcome = store(&server)
            .update(Collection::Draft, "gone", &DraftPatch::default(), None, false)
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Missing));
    }

    #[tokio::test]
    async fn test_delete_missing_reports_false() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/article-publish/_doc/a1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"result": "not_found"})))
            .mount(&server)
            .await;

        assert!(!store(&server)
            .delete(Collection::Publish, "a1")
            .await
            .unwrap());
    }
}
