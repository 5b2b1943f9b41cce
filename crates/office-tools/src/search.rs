//! `search_offices` local tool.

use std::sync::Arc;

use agent_core::{
    error::ToolError,
    tool::{LocalTool, ParameterSchema, ToolSchema},
};
use serde_json::{Map, Value};

use crate::index::DocumentIndex;

pub const SEARCH_OFFICES: &str = "search_offices";

/// Returned when no chunk matches the query
pub const NO_RESULTS: &str = "No matching office information found.";

/// Separator between returned chunks
pub const CHUNK_SEPARATOR: &str = "\n---\n";

pub const DEFAULT_TOP_K: usize = 3;

/// Searches the office document index
pub struct SearchOfficesTool {
    index: Arc<DocumentIndex>,
    top_k: usize,
}

impl SearchOfficesTool {
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self {
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn search(&self, query: &str) -> String {
        let hits = self.index.search(query, self.top_k);
        tracing::debug!(query, hits = hits.len(), "Office search");

        if hits.is_empty() {
            return NO_RESULTS.into();
        }
        hits.iter()
            .map(|h| h.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CHUNK_SEPARATOR)
    }
}

impl LocalTool for SearchOfficesTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: SEARCH_OFFICES.into(),
            description: "Search the office database for addresses, headcount and other facts about company offices.".into(),
            parameters: vec![ParameterSchema::required(
                "query",
                "string",
                "What to look for (e.g., 'HQ address', 'Chicago office')",
            )],
            returns: Some("matching office text, or a no-results message".into()),
        }
    }

    fn call(&self, arguments: &Map<String, Value>) -> Result<Value, ToolError> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("'query' must be a string".into()))?;

        Ok(Value::String(self.search(query)))
    }
}
