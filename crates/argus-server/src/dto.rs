use serde::{Deserialize, Serialize};

use argus_core::definition::ScraperDefinition;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Scrapers
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperSummary {
    pub name: String,
    pub slug: String,
    pub base_url: String,
    /// Configured page cap; 0 means unbounded.
    pub pages: u32,
}

impl From<&ScraperDefinition> for ScraperSummary {
    fn from(definition: &ScraperDefinition) -> Self {
        Self {
            name: definition.name.clone(),
            slug: definition.slug(),
            base_url: definition.base_url.clone(),
            pages: definition.pagination.max_pages,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScraperListResponse {
    pub scrapers: Vec<ScraperSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterScraperResponse {
    pub name: String,
    pub slug: String,
    /// Where the new source's records are served from.
    pub endpoint: String,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub content: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WriteDocumentRequest {
    pub content: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
