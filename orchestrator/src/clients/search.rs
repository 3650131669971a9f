//! HTTP client for the vector-search service.
//!
//! The service owns indexing and similarity search; this side only posts a
//! query and a result count and gets ranked passages back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::SearchClient;
use crate::error::SearchError;
use crate::models::Passage;

pub struct HttpSearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSearchClient {
    pub fn new(http: reqwest::Client, base_url: String) -> Self {
        Self { http, base_url }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    k: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    passages: Vec<Passage>,
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, SearchError> {
        let response = self
            .http
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest { query, k })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.passages)
    }
}
