use serde::{Deserialize, Serialize};

/// Criteria for the provider's discover endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoverFilters {
    /// Provider genre ids; empty means any genre
    #[serde(default)]
    pub genres: Vec<i64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
}

/// Where a session's deck comes from
///
/// Exactly one variant per source type; handlers dispatch on the tag rather
/// than inspecting field shapes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeckSource {
    /// Genre/year discovery through the metadata provider
    Filters(DiscoverFilters),
    /// A webpage (e.g. a published list) scraped into titles
    Url { url: String },
    /// A free-text list of titles, one per line or comma-separated
    TextList { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_source_deserialization() {
        let json = r#"{"type": "filters", "genres": [28, 878], "year_from": 1990, "year_to": 1999}"#;
        let source: DeckSource = serde_json::from_str(json).unwrap();
        assert_eq!(
            source,
            DeckSource::Filters(DiscoverFilters {
                genres: vec![28, 878],
                year_from: Some(1990),
                year_to: Some(1999),
            })
        );
    }

    #[test]
    fn test_filters_source_all_fields_optional() {
        let source: DeckSource = serde_json::from_str(r#"{"type": "filters"}"#).unwrap();
        assert_eq!(source, DeckSource::Filters(DiscoverFilters::default()));
    }

    #[test]
    fn test_url_source_deserialization() {
        let json = r#"{"type": "url", "url": "https://letterboxd.com/user/list/heist-films/"}"#;
        let source: DeckSource = serde_json::from_str(json).unwrap();
        assert!(matches!(source, DeckSource::Url { .. }));
    }

    #[test]
    fn test_text_list_source_deserialization() {
        let json = r#"{"type": "text_list", "text": "Heat\nRonin"}"#;
        let source: DeckSource = serde_json::from_str(json).unwrap();
        assert_eq!(
            source,
            DeckSource::TextList {
                text: "Heat\nRonin".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_source_tag_rejected() {
        let json = r#"{"type": "magic", "text": "Heat"}"#;
        assert!(serde_json::from_str::<DeckSource>(json).is_err());
    }
}
