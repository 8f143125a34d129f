// ── Retrieval: Search Tool Schema ──────────────────────────────────────────
//
// Function-tool description of `search` for realtime voice/chat models, and
// validation of the arguments such a model sends back.

use crate::atoms::constants::{DEFAULT_MAX_MEMORIES, SEARCH_TOOL_ALIASES, SEARCH_TOOL_NAME};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::SearchOptions;
use serde::Deserialize;
use serde_json::{json, Value};

/// Validated arguments of a search tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: usize,
    pub options: SearchOptions,
}

#[derive(Deserialize)]
struct RawSearchArgs {
    query: Option<String>,
    #[serde(default, alias = "enableGraphSearch", alias = "enable_graph_search")]
    enable_agentic_graph: Option<bool>,
    #[serde(default)]
    max_memories: Option<i64>,
    #[serde(default)]
    search_tier0: Option<bool>,
    #[serde(default)]
    search_tier1: Option<bool>,
}

/// OpenAI-style function tool schema for memory search.
pub fn search_tool_schema() -> Value {
    json!({
        "type": "function",
        "name": SEARCH_TOOL_NAME,
        "description": "Search the user's personal memory database using semantic search with optional graph traversal",
        "parameters": {
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "minLength": 1,
                    "description": "A detailed search query (ideally 2-3 sentences) describing exactly what to find in the user's memories, including specific details, context and time frame."
                },
                "enable_agentic_graph": {
                    "type": "boolean",
                    "default": false,
                    "description": "Resolve ambiguous references through the memory graph before searching. Slower; only honored by the remote memory service."
                },
                "max_memories": {
                    "type": "integer",
                    "minimum": 1,
                    "default": DEFAULT_MAX_MEMORIES,
                    "description": "Maximum number of memories to return."
                }
            },
            "required": ["query"]
        }
    })
}

/// True when a function-call `name` refers to the search tool.
pub fn is_search_tool(name: &str) -> bool {
    SEARCH_TOOL_ALIASES.contains(&name.trim())
}

/// Validate a tool-call argument object.
pub fn parse_search_request(args: Value) -> EngineResult<SearchRequest> {
    parse_with_default_limit(args, DEFAULT_MAX_MEMORIES)
}

/// Same as `parse_search_request`, with a caller-chosen limit for calls
/// that omit `max_memories`.
pub fn parse_with_default_limit(args: Value, default_limit: usize) -> EngineResult<SearchRequest> {
    let raw: RawSearchArgs = serde_json::from_value(args)
        .map_err(|e| EngineError::InvalidQuery(format!("malformed arguments: {}", e)))?;

    let query = raw.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(EngineError::InvalidQuery("query must not be empty".into()));
    }

    let limit = match raw.max_memories {
        None => default_limit,
        Some(n) if n >= 1 => n as usize,
        Some(n) => {
            return Err(EngineError::InvalidQuery(format!("max_memories must be >= 1, got {}", n)))
        }
    };

    let defaults = SearchOptions::default();
    Ok(SearchRequest {
        query,
        limit,
        options: SearchOptions {
            enable_graph_search: raw.enable_agentic_graph.unwrap_or(defaults.enable_graph_search),
            search_tier0: raw.search_tier0.unwrap_or(defaults.search_tier0),
            search_tier1: raw.search_tier1.unwrap_or(defaults.search_tier1),
        },
    })
}
