use url::Url;

use crate::definition::ScraperDefinition;
use crate::error::ScrapeError;
use crate::record::PropertyRecord;
use crate::session::PageSession;

/// Marker token that starts trailing annotations on price strings
/// (e.g., "$ 1.234.567 CAP +/- Favorito"). Everything from the marker on
/// is discarded before digit filtering.
const PRICE_ANNOTATION_MARKER: &str = "CAP";

/// Attribute read for `imgUrl` fields.
const IMAGE_ATTR: &str = "src";
/// Attribute read for `url`/`link` fields.
const LINK_ATTR: &str = "href";

/// How a mapped field's value is read from its element. The vocabulary
/// is fixed and keyed by field name; definitions only choose selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Element text content.
    Text,
    /// Image-source attribute.
    ImageSource,
    /// Hyperlink-target attribute.
    LinkTarget,
    /// Text content piped through [`normalize_price`].
    Price,
}

impl FieldKind {
    pub fn for_field(name: &str) -> FieldKind {
        match name {
            "price" => FieldKind::Price,
            "imgUrl" => FieldKind::ImageSource,
            "url" | "link" => FieldKind::LinkTarget,
            _ => FieldKind::Text,
        }
    }
}

/// Which [`PropertyRecord`] field a mapped name lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSlot {
    Title,
    Location,
    ImgUrl,
    Link,
    Price,
    Company,
}

impl RecordSlot {
    pub fn for_field(name: &str) -> Option<RecordSlot> {
        match name {
            "title" => Some(RecordSlot::Title),
            "location" => Some(RecordSlot::Location),
            "imgUrl" => Some(RecordSlot::ImgUrl),
            "url" | "link" => Some(RecordSlot::Link),
            "price" => Some(RecordSlot::Price),
            "company" => Some(RecordSlot::Company),
            _ => None,
        }
    }

    fn assign(self, record: &mut PropertyRecord, value: String) {
        match self {
            RecordSlot::Title => record.title = value,
            RecordSlot::Location => record.location = value,
            RecordSlot::ImgUrl => record.img_url = value,
            RecordSlot::Link => record.link = value,
            RecordSlot::Price => record.price = value,
            RecordSlot::Company => record.company = value,
        }
    }
}

/// One field to extract per listing element.
#[derive(Debug, Clone)]
pub struct FieldBinding {
    pub field: String,
    pub selector: String,
    pub kind: FieldKind,
    pub slot: RecordSlot,
}

/// Interprets a definition's selector mappings against a live page.
///
/// There is no per-source code here: a definition compiles to bindings
/// and this one executor runs them all.
#[derive(Debug, Clone)]
pub struct ExtractionStrategy {
    root_selector: String,
    bindings: Vec<FieldBinding>,
}

impl ExtractionStrategy {
    /// Derive bindings from a definition. Mapped names without a record
    /// slot are dropped here, once, instead of erroring per page.
    pub fn from_definition(definition: &ScraperDefinition) -> Self {
        let mut bindings: Vec<FieldBinding> = definition
            .field_mappings
            .iter()
            .filter_map(|(field, selector)| match RecordSlot::for_field(field) {
                Some(slot) => Some(FieldBinding {
                    field: field.clone(),
                    selector: selector.clone(),
                    kind: FieldKind::for_field(field),
                    slot,
                }),
                None => {
                    tracing::debug!(source = %definition.name, %field, "Ignoring unsupported field mapping");
                    None
                }
            })
            .collect();
        // HashMap iteration order is arbitrary; keep logs and tests stable.
        bindings.sort_by(|a, b| a.field.cmp(&b.field));
        Self {
            root_selector: definition.root_selector.clone(),
            bindings,
        }
    }

    pub fn root_selector(&self) -> &str {
        &self.root_selector
    }

    pub fn bindings(&self) -> &[FieldBinding] {
        &self.bindings
    }

    /// Extract one record per root element currently on the page, in DOM
    /// order. Field reads are independently fault-tolerant: a missing
    /// element or failed read leaves that field empty and the record
    /// survives.
    pub async fn extract_page<S: PageSession>(
        &self,
        session: &S,
    ) -> Result<Vec<PropertyRecord>, ScrapeError> {
        let roots = session.query_all(&self.root_selector).await?;
        let base = match session.current_url().await {
            Ok(current) => Url::parse(&current).ok(),
            Err(_) => None,
        };

        let mut records = Vec::with_capacity(roots.len());
        for root in &roots {
            let mut record = PropertyRecord::default();
            for binding in &self.bindings {
                let value = read_field(session, root, binding, base.as_ref()).await;
                binding.slot.assign(&mut record, value);
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Uniform fault-isolated field read: any failure becomes an empty value.
async fn read_field<S: PageSession>(
    session: &S,
    root: &S::Element,
    binding: &FieldBinding,
    base: Option<&Url>,
) -> String {
    match try_read_field(session, root, binding, base).await {
        Ok(value) => value,
        Err(error) => {
            tracing::trace!(field = %binding.field, %error, "Field read failed, using empty value");
            String::new()
        }
    }
}

async fn try_read_field<S: PageSession>(
    session: &S,
    root: &S::Element,
    binding: &FieldBinding,
    base: Option<&Url>,
) -> Result<String, ScrapeError> {
    let Some(element) = session.find_in(root, &binding.selector).await? else {
        return Ok(String::new());
    };
    let value = match binding.kind {
        FieldKind::Text => session.read_text(&element).await?.trim().to_string(),
        FieldKind::Price => normalize_price(&session.read_text(&element).await?),
        FieldKind::ImageSource => {
            resolve_reference(session.read_attribute(&element, IMAGE_ATTR).await?, base)
        }
        FieldKind::LinkTarget => {
            resolve_reference(session.read_attribute(&element, LINK_ATTR).await?, base)
        }
    };
    Ok(value)
}

/// Attribute values may be relative references; resolve them against the
/// page URL so records always carry absolute links.
fn resolve_reference(value: Option<String>, base: Option<&Url>) -> String {
    let Some(raw) = value else {
        return String::new();
    };
    if Url::parse(&raw).is_ok() {
        return raw;
    }
    match base.and_then(|b| b.join(&raw).ok()) {
        Some(resolved) => resolved.to_string(),
        None => raw,
    }
}

/// Reduce a scraped price string to its digits: truncate at the
/// annotation marker, then keep ASCII digits only. Subsumes stripping
/// the currency symbol, `.` thousands separators, and whitespace.
/// Idempotent on already-normalized strings.
pub fn normalize_price(raw: &str) -> String {
    let cut = match raw.find(PRICE_ANNOTATION_MARKER) {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    cut.chars().filter(char::is_ascii_digit).collect()
}
