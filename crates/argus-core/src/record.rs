/// One extracted listing.
///
/// Every field is a plain string and defaults to empty when the source
/// page did not yield a value. Serialized field names are camelCase to
/// match the public API shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyRecord {
    pub title: String,
    pub location: String,
    pub img_url: String,
    pub link: String,
    /// Normalized price, digits only (e.g., "1234567"). Empty when the
    /// source did not expose one.
    pub price: String,
    /// Source label, filled from the definition name when the page
    /// itself did not provide one.
    pub company: String,
}

impl PropertyRecord {
    /// A record is worth keeping only if it can be displayed or followed:
    /// either a title or a link must be present.
    pub fn is_valid(&self) -> bool {
        !self.title.is_empty() || !self.link.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity_requires_title_or_link() {
        let titled = PropertyRecord {
            title: "Depto 2 amb".into(),
            ..Default::default()
        };
        let linked = PropertyRecord {
            link: "https://example.com/p/1".into(),
            ..Default::default()
        };
        let bare = PropertyRecord {
            price: "120000".into(),
            location: "Centro".into(),
            ..Default::default()
        };
        assert!(titled.is_valid());
        assert!(linked.is_valid());
        assert!(!bare.is_valid());
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = PropertyRecord {
            img_url: "https://example.com/a.jpg".into(),
            title: "Casa".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["imgUrl"], "https://example.com/a.jpg");
        assert!(json.get("img_url").is_none());
    }
}
