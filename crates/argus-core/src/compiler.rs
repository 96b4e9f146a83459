//! Runtime synthesis of scrapers from declarative payloads.
//!
//! A payload carries a name, a listing URL, a root selector, and
//! field → selector mappings (plus optional pagination). Compiling one
//! validates it, registers the resulting definition, and leaves a trail
//! in the journal. No code generation, no restart: the next run that
//! reads the registry picks the new source up.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;

use crate::definition::{PaginationConfig, PaginationKind, ScraperDefinition};
use crate::error::ScrapeError;
use crate::journal::Journal;
use crate::registry::DefinitionRegistry;

/// Wire shape of a scraper registration request. Every field defaults
/// so that an absent field and an empty one fail validation the same
/// way.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefinitionPayload {
    pub name: String,
    pub url: String,
    pub selector: String,
    /// Output field name -> selector within one listing element.
    pub mappings: HashMap<String, String>,
    pub pagination: Option<PaginationConfig>,
}

/// Validating gate between untrusted payloads and the registry.
pub struct DefinitionCompiler {
    registry: DefinitionRegistry,
    journal: Option<Journal>,
}

impl DefinitionCompiler {
    pub fn new(registry: DefinitionRegistry) -> Self {
        Self {
            registry,
            journal: None,
        }
    }

    /// Also log each registration into `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Validate and register. When this returns Ok the definition is
    /// live: the very next run can scrape it. Registering an existing
    /// name replaces that definition wholesale.
    pub fn compile(&self, payload: DefinitionPayload) -> Result<ScraperDefinition, ScrapeError> {
        let definition = ScraperDefinition {
            name: payload.name,
            base_url: payload.url,
            root_selector: payload.selector,
            field_mappings: payload.mappings,
            pagination: payload.pagination.unwrap_or_default(),
        };
        definition.validate()?;

        let slug = self.registry.upsert(definition.clone());
        tracing::info!(source = %definition.name, %slug, "Registered scraper definition");

        // Journal trouble must not take down a registration that is
        // already live, so it only warns.
        if let Some(journal) = &self.journal {
            log_registration(journal, &definition, &slug);
        }
        Ok(definition)
    }
}

fn log_registration(journal: &Journal, definition: &ScraperDefinition, slug: &str) {
    let description = format!("Scraper for {} listings", definition.name);
    if let Err(error) =
        journal.record_source(&definition.name, &definition.base_url, &description)
    {
        tracing::warn!(source = %definition.name, %error, "Could not record source in journal");
    }
    let title = format!("New Scraper: {}", definition.name);
    if let Err(error) = journal.create_note(&title, &registration_note(definition, slug)) {
        tracing::warn!(source = %definition.name, %error, "Could not write registration note");
    }
}

fn registration_note(definition: &ScraperDefinition, slug: &str) -> String {
    let mut note = format!(
        "Added new scraper for {} on {}.\n\n- URL: {}\n- Root selector: {}\n- Endpoint: /v1/listings/{}",
        definition.name,
        Utc::now().format("%Y-%m-%d"),
        definition.base_url,
        definition.root_selector,
        slug,
    );
    let pagination = &definition.pagination;
    if pagination.mode() != PaginationKind::None {
        let kind = match pagination.mode() {
            PaginationKind::None => "none",
            PaginationKind::Button => "button",
            PaginationKind::Url => "url",
        };
        note.push_str(&format!("\n- Pagination: {kind}"));
        if !pagination.url_template.is_empty() {
            note.push_str(&format!("\n- Page URL template: {}", pagination.url_template));
        }
        if pagination.max_pages > 0 {
            note.push_str(&format!("\n- Max pages: {}", pagination.max_pages));
        }
    }
    note
}
