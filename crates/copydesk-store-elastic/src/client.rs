use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::{debug, instrument};

use copydesk_core::StoreError;

/// Thin Elasticsearch document-API client.
///
/// Only the operations the lifecycle needs are wrapped: get, create-only
/// index, scripted update and delete. Every wrapper is a single request.
pub(crate) struct EsClient {
    http: HttpClient,
    base_url: String,
}

/// Result of an `_update` call: the `result` field Elasticsearch reports,
/// plus the updated source when the request asked for it.
pub(crate) struct EsUpdate {
    pub(crate) result: String,
    pub(crate) source: Option<Value>,
}

impl EsClient {
    pub(crate) fn new(base_url: &str) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, index: &str, api: &str, id: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            index,
            api,
            urlencoding::encode(id)
        )
    }

    /// Check the response status and parse the JSON body.
    async fn body(
        response: reqwest::Response,
        op: &str,
        index: &str,
        id: &str,
    ) -> Result<Value, StoreError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Io(format!(
                "{} {}/{} failed with status {}: {}",
                op, index, id, status, text
            )));
        }
        response.json::<Value>().await.map_err(|e| {
            StoreError::Serialization(format!("{} {}/{}: invalid response body: {}", op, index, id, e))
        })
    }

    /// GET `_doc`: the document source, or `None` on 404.
    #[instrument(skip(self), level = "debug")]
    pub(crate) async fn get_source(
        &self,
        index: &str,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let response = self
            .http
            .get(self.url(index, "_doc", id))
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("GET {}/{} failed: {}", index, id, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("document not found: {}/{}", index, id);
            return Ok(None);
        }

        let body = Self::body(response, "GET", index, id).await?;
        match body.get("_source") {
            Some(source) => Ok(Some(source.clone())),
            None => Err(StoreError::Internal(format!(
                "GET {}/{}: no _source in response",
                index, id
            ))),
        }
    }

    /// PUT `_create`: create-only write. `false` when the id is taken.
    #[instrument(skip(self, doc), level = "debug")]
    pub(crate) async fn create_doc(
        &self,
        index: &str,
        id: &str,
        doc: &Value,
    ) -> Result<bool, StoreError> {
        let response = self
            .http
            .put(self.url(index, "_create", id))
            .json(doc)
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("CREATE {}/{} failed: {}", index, id, e)))?;

        if response.status() == StatusCode::CONFLICT {
            debug!("create conflict: {}/{}", index, id);
            return Ok(false);
        }

        Self::body(response, "CREATE", index, id).await?;
        Ok(true)
    }

    /// POST `_doc`: index with a store-allocated id, which is returned.
    #[instrument(skip(self, doc), level = "debug")]
    pub(crate) async fn index_doc(&self, index: &str, doc: &Value) -> Result<String, StoreError> {
        let response = self
            .http
            .post(format!("{}/{}/_doc", self.base_url, index))
            .json(doc)
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("INDEX {} failed: {}", index, e)))?;

        let body = Self::body(response, "INDEX", index, "").await?;
        body.get("_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StoreError::Internal(format!("INDEX {}: no _id in response", index)))
    }

    /// POST `_update`, asking for the updated source back. `None` when the
    /// document does not exist.
    #[instrument(skip(self, body), level = "debug")]
    pub(crate) async fn update_doc(
        &self,
        index: &str,
        id: &str,
        body: &Value,
    ) -> Result<Option<EsUpdate>, StoreError> {
        let url = format!("{}?_source=true", self.url(index, "_update", id));
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("UPDATE {}/{} failed: {}", index, id, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("update target not found: {}/{}", index, id);
            return Ok(None);
        }

        let body = Self::body(response, "UPDATE", index, id).await?;
        let result = body
            .get("result")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let source = body.pointer("/get/_source").cloned();
        Ok(Some(EsUpdate { result, source }))
    }

    /// DELETE `_doc`. `false` when the document did not exist.
    #[instrument(skip(self), level = "debug")]
    pub(crate) async fn delete_doc(&self, index: &str, id: &str) -> Result<bool, StoreError> {
        let response = self
            .http
            .delete(self.url(index, "_doc", id))
            .send()
            .await
            .map_err(|e| StoreError::Io(format!("DELETE {}/{} failed: {}", index, id, e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        Self::body(response, "DELETE", index, id).await?;
        debug!("deleted {}/{}", index, id);
        Ok(true)
    }
}
