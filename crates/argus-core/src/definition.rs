use std::collections::HashMap;

use url::Url;

use crate::error::ScrapeError;

/// Placeholder substituted with the 1-based page index in URL templates.
pub const PAGE_PLACEHOLDER: &str = "{{PAGE}}";

/// How a source exposes pages beyond the first one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationKind {
    /// Single page only.
    #[default]
    None,
    /// A clickable "next" control triggers an in-page navigation.
    Button,
    /// Page n is reachable at a templated URL.
    Url,
}

/// Pagination behavior of one source.
///
/// All fields are optional on the wire; a missing `maxPages` deserializes
/// to 0, which means unbounded (follow until the site runs out of pages).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: PaginationKind,
    /// Selector matching pagination links/summary, used to detect the
    /// last page under `kind = Url`. Empty means "trust maxPages".
    pub selector: String,
    /// Template containing [`PAGE_PLACEHOLDER`], required for `kind = Url`.
    pub url_template: String,
    pub max_pages: u32,
    /// Required for `kind = Button`.
    pub next_button_selector: String,
}

impl PaginationConfig {
    /// Single-page config, the default for sources without pagination.
    pub fn single_page() -> Self {
        Self::default()
    }

    /// The kind that actually governs traversal: a disabled config
    /// behaves exactly like `kind = None`.
    pub fn mode(&self) -> PaginationKind {
        if self.enabled {
            self.kind
        } else {
            PaginationKind::None
        }
    }

    /// URL for the given 1-based page index under `kind = Url`.
    pub fn page_url(&self, page: u32) -> String {
        self.url_template
            .replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        match self.mode() {
            PaginationKind::Url if self.url_template.is_empty() => Err(
                ScrapeError::InvalidDefinition("pagination type `url` requires urlTemplate".into()),
            ),
            PaginationKind::Button if self.next_button_selector.is_empty() => {
                Err(ScrapeError::InvalidDefinition(
                    "pagination type `button` requires nextButtonSelector".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Identity and behavior of one source: where to go, what repeats on the
/// page, and which selector feeds which output field.
///
/// Definitions are immutable values; updating a source means registering
/// a whole new definition under the same name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperDefinition {
    /// Human label (e.g., "Bounos Propiedades"). Also the default
    /// `company` value on extracted records.
    pub name: String,
    pub base_url: String,
    /// Selector matching each repeated listing element.
    pub root_selector: String,
    /// Output field name -> selector within one listing element.
    pub field_mappings: HashMap<String, String>,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

impl ScraperDefinition {
    /// Registry key and URL path segment: the name with everything but
    /// ASCII alphanumerics stripped, lowercased.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }

    /// Structural validation shared by the compiler and registry seeding.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        if self.name.trim().is_empty() {
            return Err(ScrapeError::InvalidDefinition("name is required".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(ScrapeError::InvalidDefinition("url is required".into()));
        }
        if self.root_selector.trim().is_empty() {
            return Err(ScrapeError::InvalidDefinition(
                "selector is required".into(),
            ));
        }
        if self.field_mappings.is_empty() {
            return Err(ScrapeError::InvalidDefinition(
                "mappings must contain at least one field".into(),
            ));
        }
        if Url::parse(&self.base_url).is_err() {
            return Err(ScrapeError::InvalidDefinition(format!(
                "url `{}` is not an absolute URL",
                self.base_url
            )));
        }
        self.pagination.validate()
    }
}

/// Strip non-alphanumerics and lowercase, yielding a stable identifier
/// safe for routes and registry keys.
pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}
