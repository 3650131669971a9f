use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// One ranked search hit. Produced by the search service, never mutated by
/// the pipeline; `metadata` carries at least a `page` entry for indexed
/// content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Passage {
    pub fn page(&self) -> &str {
        self.metadata.get("page").map(String::as_str).unwrap_or("unknown")
    }
}

// API Request/Response models
#[derive(Debug, Deserialize)]
pub struct QaRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct QaResponse {
    pub request_id: Uuid,
    pub answer: String,
    pub context: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_unknown() {
        let passage = Passage {
            text: "some text".to_string(),
            metadata: HashMap::new(),
        };
        assert_eq!(passage.page(), "unknown");
    }
}
