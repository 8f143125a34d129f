// Recall Engine — Remote Memory Service Client
//
// The availability backstop: the service embeds and searches on our behalf.
// It reports a single duration (if any), so the engine times the call itself.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::RemoteMemorySearch;
use crate::atoms::types::{RemoteMemory, RemoteSearchResult};
use crate::engine::config::RemoteConfig;
use crate::engine::retrieval::normalize::string_list;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

pub struct RemoteMemoryClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
    max_nodes: usize,
    rank_results: bool,
}

impl RemoteMemoryClient {
    pub fn new(config: &RemoteConfig) -> Self {
        if config.api_key.is_none() {
            warn!("[memory] Remote memory client has no API key — requests will likely be rejected");
        }
        RemoteMemoryClient {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_nodes: config.max_nodes,
            rank_results: config.rank_results,
        }
    }
}

#[async_trait]
impl RemoteMemorySearch for RemoteMemoryClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
        enable_graph_search: bool,
    ) -> EngineResult<RemoteSearchResult> {
        let url = format!("{}/v1/memory/search", self.base_url);
        let body = json!({
            "query": query,
            "enable_agentic_graph": enable_graph_search,
            "rank_results": self.rank_results,
        });

        let mut req = self
            .client
            .post(&url)
            .query(&[("max_memories", limit), ("max_nodes", self.max_nodes)])
            .json(&body)
            .timeout(self.timeout);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-Key", key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(EngineError::Other(format!("memory service {} — {}", status, text)));
        }

        let v: Value = resp.json().await?;
        let result = parse_search_response(&v)?;
        debug!("[memory] Remote search returned {} memories", result.memories.len());
        Ok(result)
    }
}

/// Parse a `{ data: { memories: [...] } }` search response.
/// A response without a memories array is an empty result. A memory that
/// cannot be decoded is logged and skipped; the rest still come back.
pub fn parse_search_response(v: &Value) -> EngineResult<RemoteSearchResult> {
    let items = v["data"]["memories"].as_array().map(Vec::as_slice).unwrap_or_default();
    let memories: Vec<RemoteMemory> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match parse_memory(item) {
            Ok(memory) => Some(memory),
            Err(e) => {
                warn!("[memory] Skipping malformed memory #{} in search response: {}", i, e);
                None
            }
        })
        .collect();
    if memories.len() < items.len() {
        debug!("[memory] Kept {} of {} remote memories", memories.len(), items.len());
    }
    let total_duration_ms = v["latency_ms"]
        .as_f64()
        .or_else(|| v["data"]["search_duration_ms"].as_f64());
    Ok(RemoteSearchResult { memories, total_duration_ms })
}

/// Decode one memory. Numeric ids become strings; `tags`/`topics` given as a
/// comma-separated string or a mixed array become string lists.
fn parse_memory(item: &Value) -> EngineResult<RemoteMemory> {
    let mut item = item.clone();
    if let Some(obj) = item.as_object_mut() {
        if let Some(Value::Number(n)) = obj.get("id") {
            let id = n.to_string();
            obj.insert("id".into(), Value::String(id));
        }
        for key in ["tags", "topics"] {
            let coerced = match obj.get(key) {
                None | Some(Value::Null) => continue,
                Some(v) => string_list(Some(v)),
            };
            obj.insert(key.into(), json!(coerced));
        }
    }
    Ok(serde_json::from_value(item)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_response() {
        let v = json!({
            "data": { "memories": [
                {
                    "id": "m1",
                    "content": "Ship the Q3 roadmap",
                    "similarity_score": 0.82,
                    "tags": ["okr"],
                    "topics": ["planning"],
                    "metadata": { "tier": 0, "similarity_score": 0.4 }
                },
                { "id": "m2", "content": null, "score": 0.3 }
            ]},
            "latency_ms": 123.4
        });
        let result = parse_search_response(&v).unwrap();
        assert_eq!(result.memories.len(), 2);
        assert_eq!(result.memories[0].similarity_score, Some(0.82));
        assert_eq!(result.memories[1].content, None);
        assert_eq!(result.memories[1].score, Some(0.3));
        assert_eq!(result.total_duration_ms, Some(123.4));
    }

    #[test]
    fn test_parse_missing_memories_is_empty() {
        let result = parse_search_response(&json!({ "data": null })).unwrap();
        assert!(result.memories.is_empty());
        assert_eq!(result.total_duration_ms, None);
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let v = json!({ "data": { "memories": [{ "id": "x", "hotness": 9, "pydantic_extra": {} }] } });
        let result = parse_search_response(&v).unwrap();
        assert_eq!(result.memories[0].id.as_deref(), Some("x"));
    }

    #[test]
    fn test_parse_coerces_string_tags_and_numeric_ids() {
        let v = json!({ "data": { "memories": [
            { "id": "good", "similarity_score": 0.9 },
            { "id": "odd", "similarity_score": 0.5, "tags": "a, b", "topics": ["q3", 7] },
            { "id": 42, "score": 0.1 }
        ]}});
        let result = parse_search_response(&v).unwrap();
        assert_eq!(result.memories.len(), 3);
        assert_eq!(result.memories[0].id.as_deref(), Some("good"));
        assert_eq!(result.memories[1].tags, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(result.memories[1].topics, Some(vec!["q3".to_string(), "7".to_string()]));
        assert_eq!(result.memories[2].id.as_deref(), Some("42"));
    }

    #[test]
    fn test_parse_skips_undecodable_memories() {
        let v = json!({ "data": { "memories": [
            { "id": "keep-1", "similarity_score": 0.9 },
            { "id": "bad-score", "similarity_score": "high" },
            "not an object",
            { "id": "keep-2", "content": "still here", "score": 0.4 }
        ]}});
        let result = parse_search_response(&v).unwrap();
        let ids: Vec<&str> = result.memories.iter().filter_map(|m| m.id.as_deref()).collect();
        assert_eq!(ids, vec!["keep-1", "keep-2"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client = RemoteMemoryClient::new(&RemoteConfig {
            base_url: "http://127.0.0.1:9".into(),
            api_key: Some("k".into()),
            timeout_secs: 2,
            ..Default::default()
        });
        let err = client.search("q", 5, false).await.unwrap_err();
        assert!(matches!(err, EngineError::Network(_)), "got {:?}", err);
    }
}
