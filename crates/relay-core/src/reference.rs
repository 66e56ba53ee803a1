//! Reference codes: short human-typeable tokens mapping back to record IDs.
//!
//! Codes are derived, not stored. The current format is `#` plus the last six
//! characters of the record ID, uppercased. A legacy `PREFIX-SUFFIX` format
//! (category-derived prefix) is still parsed but no longer generated.
//!
//! Codes are truncated IDs and therefore not globally unique; resolution is a
//! best-effort ordered search (exact, then prefix, then suffix, then
//! contains) that stops at the first non-empty tier. Exact matches are never
//! shadowed by a looser match.

use crate::error::Result;
use crate::incident::{IdQuery, Incident, IncidentRepository};
use regex::Regex;
use std::sync::OnceLock;

/// Prefix of current-format codes.
pub const CODE_PREFIX: char = '#';

/// Category keywords mapped to legacy code prefixes.
///
/// Matched case-insensitively as substrings of the category name.
const LEGACY_PREFIXES: &[(&str, &str)] = &[
    ("maintenance", "MAIN"),
    ("electrical", "ELEC"),
    ("plumbing", "PLUM"),
    ("cleaning", "CLEAN"),
    ("safety", "SAFE"),
    ("security", "SEC"),
    ("technology", "TECH"),
    ("furniture", "FURN"),
];

/// A parsed reference code, split into its prefix and ID fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReference {
    /// `"#"` for current-format codes, or the legacy category prefix
    pub prefix: String,
    /// Uppercased ID fragment
    pub token: String,
}

fn new_format_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([A-Za-z0-9]{3,8})$").expect("valid reference regex"))
}

fn legacy_format_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([A-Za-z]{3,5})-([A-Za-z0-9]{4,6})$").expect("valid legacy regex"))
}

fn last_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let (idx, _) = s.char_indices().nth(count - n).unwrap_or((0, ' '));
    &s[idx..]
}

/// Encodes a record ID as a current-format reference code.
///
/// IDs longer than eight characters are truncated to their last six; shorter
/// IDs are encoded whole.
pub fn encode(record_id: &str) -> String {
    let token = if record_id.chars().count() > 8 {
        last_chars(record_id, 6)
    } else {
        record_id
    };
    format!("{}{}", CODE_PREFIX, token.to_uppercase())
}

/// Encodes a record ID in the legacy `PREFIX-SUFFIX` format.
///
/// Kept so older codes remain round-trippable in tests; new codes always use
/// [`encode`].
pub fn legacy_encode(record_id: &str, category_name: &str) -> String {
    let suffix = last_chars(record_id, 4);
    format!("{}-{}", legacy_prefix(category_name), suffix.to_uppercase())
}

/// Derives the legacy prefix for a category name.
///
/// Keyword table first; otherwise the first two letters of each of the first
/// two words, or the first four letters of a single word, or `TASK`.
pub fn legacy_prefix(category_name: &str) -> String {
    let lower = category_name.to_lowercase();
    for (keyword, prefix) in LEGACY_PREFIXES {
        if lower.contains(keyword) {
            return (*prefix).to_string();
        }
    }

    let words: Vec<&str> = category_name.split_whitespace().collect();
    match words.len() {
        0 => "TASK".to_string(),
        1 => {
            let word: String = words[0].chars().filter(|c| c.is_alphabetic()).collect();
            if word.len() >= 3 {
                word.chars().take(4).collect::<String>().to_uppercase()
            } else {
                "TASK".to_string()
            }
        }
        _ => {
            let joined: String = words
                .iter()
                .take(2)
                .map(|w| w.chars().take(2).collect::<String>())
                .collect();
            if joined.len() >= 3 {
                joined.to_uppercase()
            } else {
                "TASK".to_string()
            }
        }
    }
}

/// Parses a reference code in either format.
///
/// # Returns
///
/// - `Some(ParsedReference)`: well-formed code
/// - `None`: text is not a reference code
pub fn parse(code: &str) -> Option<ParsedReference> {
    let code = code.trim();
    if let Some(captures) = new_format_regex().captures(code) {
        return Some(ParsedReference {
            prefix: CODE_PREFIX.to_string(),
            token: captures[1].to_uppercase(),
        });
    }
    if let Some(captures) = legacy_format_regex().captures(code) {
        return Some(ParsedReference {
            prefix: captures[1].to_uppercase(),
            token: captures[2].to_uppercase(),
        });
    }
    None
}

/// Whether a chunk of text has the shape of a reference code.
pub fn looks_like_reference(text: &str) -> bool {
    parse(text).is_some()
}

/// Resolves a reference code against the record store.
///
/// Tries, in order and stopping at the first non-empty result: exact ID
/// match, ID-starts-with, ID-ends-with, ID-contains. Multiple records
/// matching the same loose strategy resolve to an arbitrary one (store
/// order); that ambiguity is an accepted consequence of the truncated code
/// space.
///
/// # Returns
///
/// - `Ok(Some(incident))`: a record matched
/// - `Ok(None)`: malformed code or nothing matched
pub async fn resolve(code: &str, store: &dyn IncidentRepository) -> Result<Option<Incident>> {
    let Some(parsed) = parse(code) else {
        return Ok(None);
    };
    let fragment = parsed.token.to_lowercase();

    let queries = [
        IdQuery::Exact(fragment.clone()),
        IdQuery::Prefix(fragment.clone()),
        IdQuery::Suffix(fragment.clone()),
        IdQuery::Contains(fragment),
    ];
    for query in queries {
        let mut matches = store.find_matching(&query).await?;
        if !matches.is_empty() {
            return Ok(Some(matches.remove(0)));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::{Category, IncidentStatus, IncidentUpdate};
    use async_trait::async_trait;
    use chrono::Utc;

    fn incident(id: &str) -> Incident {
        Incident {
            id: id.to_string(),
            description: format!("incident {id}"),
            status: IncidentStatus::Open,
            category: Category::new("Maintenance"),
            subcategory: None,
            location: None,
            reporter: "+15550001".to_string(),
            assigned_to: None,
            reported_at: Utc::now(),
            notes: Vec::new(),
        }
    }

    /// Fixed-content store for resolution tests.
    struct FixedStore {
        records: Vec<Incident>,
    }

    #[async_trait]
    impl IncidentRepository for FixedStore {
        async fn find_by_id(&self, id: &str) -> Result<Option<Incident>> {
            Ok(self.records.iter().find(|r| r.id == id).cloned())
        }

        async fn find_matching(&self, query: &IdQuery) -> Result<Vec<Incident>> {
            Ok(self
                .records
                .iter()
                .filter(|r| query.matches(&r.id))
                .cloned()
                .collect())
        }

        async fn find_open_for(&self, _phone: &str, _limit: usize) -> Result<Vec<Incident>> {
            Ok(Vec::new())
        }

        async fn find_reported_by(&self, _phone: &str, _limit: usize) -> Result<Vec<Incident>> {
            Ok(Vec::new())
        }

        async fn create(&self, incident: Incident) -> Result<Incident> {
            Ok(incident)
        }

        async fn apply_update(&self, id: &str, _update: IncidentUpdate) -> Result<Incident> {
            Ok(incident(id))
        }
    }

    #[test]
    fn test_encode_truncates_long_ids() {
        assert_eq!(encode("cmez3mn6h0002l50405subng0"), "#SUBNG0");
    }

    #[test]
    fn test_encode_keeps_short_ids_whole() {
        assert_eq!(encode("ab12"), "#AB12");
    }

    #[test]
    fn test_parse_round_trip() {
        let parsed = parse("#SUBNG0").unwrap();
        assert_eq!(parsed.prefix, "#");
        assert_eq!(parsed.token, "SUBNG0");
    }

    #[test]
    fn test_parse_legacy_format() {
        let parsed = parse("MAIN-BNG0").unwrap();
        assert_eq!(parsed.prefix, "MAIN");
        assert_eq!(parsed.token, "BNG0");
    }

    #[test]
    fn test_parse_rejects_noise() {
        assert!(parse("hello").is_none());
        assert!(parse("#").is_none());
        assert!(parse("#toolongtoken1").is_none());
        assert!(parse("TOOLONG-1234").is_none());
    }

    #[test]
    fn test_legacy_prefix_table_and_fallbacks() {
        assert_eq!(legacy_prefix("Maintenance"), "MAIN");
        assert_eq!(legacy_prefix("Electrical work"), "ELEC");
        assert_eq!(legacy_prefix("Broken Window"), "BRWI");
        assert_eq!(legacy_prefix("Playground"), "PLAY");
        assert_eq!(legacy_prefix(""), "TASK");
    }

    #[test]
    fn test_legacy_encode_shape() {
        let code = legacy_encode("cmez3mn6h0002l50405subng0", "Maintenance");
        assert_eq!(code, "MAIN-BNG0");
        assert!(looks_like_reference(&code));
    }

    #[tokio::test]
    async fn test_resolution_prefers_exact_over_contains() {
        let store = FixedStore {
            records: vec![incident("xabc123"), incident("abc123")],
        };
        // Both IDs contain "abc123"; only one is the exact match.
        let found = resolve("#ABC123", &store).await.unwrap().unwrap();
        assert_eq!(found.id, "abc123");
    }

    #[tokio::test]
    async fn test_resolution_falls_through_to_suffix() {
        let store = FixedStore {
            records: vec![incident("cmez3mn6h0002l50405subng0")],
        };
        let found = resolve("#SUBNG0", &store).await.unwrap().unwrap();
        assert_eq!(found.id, "cmez3mn6h0002l50405subng0");
    }

    #[tokio::test]
    async fn test_resolution_unknown_code_is_none() {
        let store = FixedStore { records: vec![] };
        assert!(resolve("#ZZZZZZ", &store).await.unwrap().is_none());
        assert!(resolve("not a code", &store).await.unwrap().is_none());
    }
}
