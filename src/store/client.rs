//! HTTP client wrapper for the Qdrant-backed chunk store.

use crate::store::ChunkStore;
use crate::store::filters::build_topic_filter;
use crate::store::payload::{build_chunk_payload, current_timestamp_rfc3339, generate_chunk_id};
use crate::store::types::{
    NewChunk, QueryResponse, QueryResponseResult, ScoredChunk, StoreError,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};

/// Lightweight HTTP client for chunk storage and similarity search.
pub struct QdrantChunkStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl QdrantChunkStore {
    /// Construct a new client for the given Qdrant endpoint and collection.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().user_agent("paperchat/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(StoreError::InvalidUrl)?;
        let collection = collection.into();
        tracing::debug!(
            url = %base_url,
            collection = %collection,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            collection,
        })
    }

    /// Create the collection when missing and ensure payload indexes exist.
    pub async fn ensure_collection(&self, vector_size: u64) -> Result<(), StoreError> {
        if !self.collection_exists().await? {
            tracing::debug!(
                collection = %self.collection,
                vector_size,
                "Creating collection"
            );
            let body = json!({
                "vectors": {
                    "size": vector_size,
                    "distance": "Cosine"
                }
            });
            let response = self
                .request(Method::PUT, &format!("collections/{}", self.collection))?
                .json(&body)
                .send()
                .await?;
            self.ensure_success(response, || {
                tracing::debug!(collection = %self.collection, "Collection created");
            })
            .await?;
        }

        self.ensure_payload_indexes().await
    }

    /// Ensure keyword indexes exist for the filterable chunk fields.
    async fn ensure_payload_indexes(&self) -> Result<(), StoreError> {
        let fields: [(&str, &str); 3] = [
            ("doc_id", "keyword"),
            ("topic_id", "keyword"),
            ("ingested_at", "datetime"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(
                    Method::PUT,
                    &format!("collections/{}/index", self.collection),
                )?
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(collection = %self.collection, field, schema, "Payload index ensured");
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(collection = %self.collection, field, schema, "Payload index already exists");
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::UnexpectedStatus { status, body };
                tracing::warn!(collection = %self.collection, field, schema, error = %error, "Failed to ensure payload index");
            }
        }

        Ok(())
    }

    async fn collection_exists(&self) -> Result<bool, StoreError> {
        let response = self
            .request(Method::GET, &format!("collections/{}", self.collection))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = StoreError::UnexpectedStatus { status, body };
                tracing::error!(collection = %self.collection, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, StoreError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), StoreError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

#[async_trait]
impl ChunkStore for QdrantChunkStore {
    async fn insert_chunks(&self, chunks: Vec<NewChunk>) -> Result<Vec<String>, StoreError> {
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let now = current_timestamp_rfc3339();
        let mut ids = Vec::with_capacity(chunks.len());
        let serialized: Vec<_> = chunks
            .iter()
            .map(|chunk| {
                let chunk_id = generate_chunk_id();
                let point = json!({
                    "id": chunk_id,
                    "vector": chunk.embedding,
                    "payload": build_chunk_payload(chunk, &now),
                });
                ids.push(chunk_id);
                point
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{}/points", self.collection),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = %self.collection,
                points = point_count,
                "Chunks stored"
            );
        })
        .await?;

        Ok(ids)
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        topic_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>, StoreError> {
        let mut body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });
        let obj = body
            .as_object_mut()
            .expect("query body should remain an object");

        if let Some(filter_value) = build_topic_filter(topic_id) {
            obj.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{}/points/query", self.collection),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = StoreError::UnexpectedStatus { status, body };
            tracing::error!(collection = %self.collection, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points, .. } => points,
        };
        let results = points
            .into_iter()
            .filter_map(|point| {
                crate::store::payload::parse_scored_chunk(
                    stringify_point_id(point.id),
                    point.score,
                    point.payload,
                )
            })
            .collect();

        Ok(results)
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, Method::PUT, MockServer};

    fn test_store(base_url: &str) -> QdrantChunkStore {
        QdrantChunkStore::new(base_url, None, "chunks").expect("store")
    }

    #[tokio::test]
    async fn insert_chunks_uploads_points_and_returns_ids() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chunks/points")
                    .query_param("wait", "true");
                then.status(200).json_body(json!({ "status": "ok" }));
            })
            .await;

        let store = test_store(&server.base_url());
        let ids = store
            .insert_chunks(vec![
                NewChunk {
                    doc_id: "paper.pdf".into(),
                    topic_id: None,
                    page_no: 0,
                    para_no: 0,
                    text: "first".into(),
                    embedding: vec![0.1, 0.2],
                },
                NewChunk {
                    doc_id: "paper.pdf".into(),
                    topic_id: None,
                    page_no: 0,
                    para_no: 1,
                    text: "second".into(),
                    embedding: vec![0.3, 0.4],
                },
            ])
            .await
            .expect("insert");

        mock.assert();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
    }

    #[tokio::test]
    async fn insert_chunks_skips_request_for_empty_batch() {
        let server = MockServer::start_async().await;
        let store = test_store(&server.base_url());
        let ids = store.insert_chunks(Vec::new()).await.expect("insert");
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn search_parses_scored_chunks() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/chunks/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "chunk-1",
                            "score": 0.87,
                            "payload": {
                                "doc_id": "paper.pdf",
                                "topic_id": "topic-7",
                                "page_no": 1,
                                "para_no": 0,
                                "text": "Example",
                                "schema_version": 1
                            }
                        }
                    ]
                }));
            })
            .await;

        let store = test_store(&server.base_url());
        let results = store
            .search(vec![0.1, 0.2], Some("topic-7"), 3)
            .await
            .expect("search request");

        mock.assert();
        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.chunk.id, "chunk-1");
        assert_eq!(hit.chunk.doc_id, "paper.pdf");
        assert_eq!(hit.chunk.topic_id.as_deref(), Some("topic-7"));
        assert_eq!(hit.chunk.page_no, 1);
        assert!((hit.score - 0.87).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn search_surfaces_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/chunks/points/query");
                then.status(500).body("boom");
            })
            .await;

        let store = test_store(&server.base_url());
        let error = store.search(vec![0.1], None, 3).await.unwrap_err();
        assert!(matches!(error, StoreError::UnexpectedStatus { .. }));
    }
}
