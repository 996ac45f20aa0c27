//! Structural and content-quality checks over articles.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value;

use papercorpus_shared::{Article, Chunk, ValidationConfig};

const INVALID_TITLE: &str = "Missing or invalid title";
const INVALID_DOI: &str = "Missing or invalid DOI";
const INVALID_SECTIONS: &str = "Missing or invalid sections";

/// A chunk as seen by the checks: an id to name in messages and its text.
#[derive(Clone, Copy)]
struct ChunkView<'a> {
    id: &'a dyn fmt::Display,
    text: &'a str,
}

impl<'a> From<&'a Chunk> for ChunkView<'a> {
    fn from(chunk: &'a Chunk) -> Self {
        Self {
            id: &chunk.chunk_id,
            text: &chunk.text,
        }
    }
}

/// Runs the article-level and chunk-level checks.
///
/// Both checks are pure and independent; callers concatenate their output
/// to get an article's error list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Article-level checks on the typed record.
    ///
    /// Title and DOI must be non-empty lists; chunks must be non-empty and
    /// enough of them must be longer than the content threshold.
    pub fn validate_article(&self, article: &Article) -> Vec<String> {
        let mut errors = Vec::new();

        if article.title.is_empty() {
            errors.push(INVALID_TITLE.to_string());
        }
        if article.doi.is_empty() {
            errors.push(INVALID_DOI.to_string());
        }

        let chunks: Vec<ChunkView<'_>> = article.chunks.iter().map(ChunkView::from).collect();
        if chunks.is_empty() {
            errors.push(INVALID_SECTIONS.to_string());
        } else {
            errors.extend(self.section_errors(&chunks));
        }

        errors
    }

    /// Article-level checks on a raw persisted record.
    ///
    /// Here the list checks see the JSON as written: a missing key, a
    /// non-list value, a non-string element, or an empty list all fail.
    pub fn validate_record(&self, record: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        if !is_string_list(record.get("title")) {
            errors.push(INVALID_TITLE.to_string());
        }
        if !is_string_list(record.get("doi")) {
            errors.push(INVALID_DOI.to_string());
        }

        let ids = record_chunk_ids(record);
        match ids.as_deref().and_then(|ids| record_chunks(record, ids)) {
            Some(chunks) if !chunks.is_empty() => errors.extend(self.section_errors(&chunks)),
            _ => errors.push(INVALID_SECTIONS.to_string()),
        }

        errors
    }

    /// Chunk-level checks: empty, too short, and repeated text.
    ///
    /// Only the second and later occurrences of a text are reported as
    /// duplicates; an empty chunk gets no further checks.
    pub fn validate_chunks(&self, chunks: &[Chunk]) -> Vec<String> {
        let views: Vec<ChunkView<'_>> = chunks.iter().map(ChunkView::from).collect();
        self.chunk_errors(&views)
    }

    /// [`validate_chunks`](Self::validate_chunks) over the chunks of a raw record.
    ///
    /// Yields nothing when the record has no well-formed chunk list; that case
    /// is already reported by [`validate_record`](Self::validate_record).
    pub fn validate_record_chunks(&self, record: &Value) -> Vec<String> {
        let ids = record_chunk_ids(record);
        ids.as_deref()
            .and_then(|ids| record_chunks(record, ids))
            .map(|chunks| self.chunk_errors(&chunks))
            .unwrap_or_default()
    }

    fn section_errors(&self, chunks: &[ChunkView<'_>]) -> Vec<String> {
        let threshold = self.config.min_chunk_chars;
        let required = self.config.min_valid_sections;
        let mut errors = Vec::new();

        let valid = chunks
            .iter()
            .filter(|c| trimmed_len(c.text) > threshold)
            .count();
        if valid < required {
            let noun = if required == 1 { "section" } else { "sections" };
            errors.push(format!("Article must have at least {required} valid {noun}"));
        }

        for chunk in chunks {
            if trimmed_len(chunk.text) < threshold {
                errors.push(format!(
                    "Section {} has less than {threshold} characters",
                    chunk.id
                ));
            }
        }

        errors
    }

    fn chunk_errors(&self, chunks: &[ChunkView<'_>]) -> Vec<String> {
        let threshold = self.config.min_chunk_chars;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut errors = Vec::new();

        for chunk in chunks {
            let text = chunk.text.trim();
            if text.is_empty() {
                errors.push(format!("Chunk {} is empty", chunk.id));
                continue;
            }

            if text.chars().count() < threshold {
                errors.push(format!(
                    "Chunk {} is too short (less than {threshold} characters)",
                    chunk.id
                ));
            }

            if !seen.insert(text) {
                errors.push(format!("Chunk {} is duplicated", chunk.id));
            }
        }

        errors
    }
}

fn trimmed_len(text: &str) -> usize {
    text.trim().chars().count()
}

fn is_string_list(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Array(items)) => !items.is_empty() && items.iter().all(Value::is_string),
        _ => false,
    }
}

/// Display forms of the `chunk_id` of every element of `sections`, or
/// `None` when the list itself is malformed.
fn record_chunk_ids(record: &Value) -> Option<Vec<String>> {
    record
        .get("sections")?
        .as_array()?
        .iter()
        .map(|c| match c.get("chunk_id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

/// Views over the record's chunks. Every element must be an object with a
/// `chunk_id` and a string `text`.
fn record_chunks<'a>(record: &'a Value, ids: &'a [String]) -> Option<Vec<ChunkView<'a>>> {
    let items = record.get("sections")?.as_array()?;
    items
        .iter()
        .zip(ids)
        .map(|(item, id)| {
            Some(ChunkView {
                id,
                text: item.get("text")?.as_str()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use papercorpus_shared::ChunkId;
    use serde_json::json;

    fn chunk(seq: u32, text: &str) -> Chunk {
        Chunk {
            chunk_id: ChunkId::new(seq).expect("non-zero"),
            section_title: "Body".into(),
            text: text.into(),
            source_doi: None,
        }
    }

    fn article(chunks: Vec<Chunk>) -> Article {
        Article {
            article_id: "paper".into(),
            title: vec!["Title".into()],
            doi: vec!["10.1000/1".into()],
            authors: vec![],
            chunks,
        }
    }

    fn text(len: usize) -> String {
        "x".repeat(len)
    }

    #[test]
    fn well_formed_article_passes() {
        let a = article(vec![chunk(1, &text(250)), chunk(2, &text(300))]);
        let v = Validator::default();
        assert!(v.validate_article(&a).is_empty());
        assert!(v.validate_chunks(&a.chunks).is_empty());
    }

    #[test]
    fn collects_every_structural_error() {
        let mut a = article(vec![]);
        a.title.clear();
        a.doi.clear();
        assert_eq!(
            Validator::default().validate_article(&a),
            vec![INVALID_TITLE, INVALID_DOI, INVALID_SECTIONS]
        );
    }

    #[test]
    fn short_chunks_are_reported_per_section() {
        let a = article(vec![chunk(1, &text(150)), chunk(2, &text(50))]);
        assert_eq!(
            Validator::default().validate_article(&a),
            vec![
                "Article must have at least 1 valid section",
                "Section chunk_001 has less than 200 characters",
                "Section chunk_002 has less than 200 characters",
            ]
        );
    }

    #[test]
    fn threshold_length_is_neither_valid_nor_short() {
        let a = article(vec![chunk(1, &format!("  {}  ", text(200)))]);
        let v = Validator::default();
        assert_eq!(
            v.validate_article(&a),
            vec!["Article must have at least 1 valid section"]
        );
        assert!(v.validate_chunks(&a.chunks).is_empty());
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // 201 two-byte characters.
        let a = article(vec![chunk(1, &"é".repeat(201))]);
        assert!(Validator::default().validate_article(&a).is_empty());
    }

    #[test]
    fn required_valid_sections_is_configurable() {
        let v = Validator::new(ValidationConfig {
            min_chunk_chars: 300,
            min_valid_sections: 3,
        });
        let a = article(vec![chunk(1, &text(350)), chunk(2, &text(400))]);
        assert_eq!(
            v.validate_article(&a),
            vec!["Article must have at least 3 valid sections"]
        );
    }

    #[test]
    fn duplicates_flag_only_repeats() {
        let a = text(220);
        let b = text(230);
        let c = text(240);
        let v = Validator::default();

        let errors = v.validate_chunks(&[chunk(1, &a), chunk(2, &b), chunk(3, &a)]);
        assert_eq!(errors, vec!["Chunk chunk_003 is duplicated"]);

        assert!(v.validate_chunks(&[chunk(1, &a), chunk(2, &b), chunk(3, &c)]).is_empty());
    }

    #[test]
    fn empty_chunk_skips_other_checks() {
        let errors = Validator::default().validate_chunks(&[
            chunk(1, "   "),
            chunk(2, "\n"),
            chunk(3, "short"),
        ]);
        assert_eq!(
            errors,
            vec![
                "Chunk chunk_001 is empty",
                "Chunk chunk_002 is empty",
                "Chunk chunk_003 is too short (less than 200 characters)",
            ]
        );
    }

    #[test]
    fn short_duplicate_gets_both_errors() {
        let errors =
            Validator::default().validate_chunks(&[chunk(1, "tiny"), chunk(2, " tiny ")]);
        assert_eq!(
            errors,
            vec![
                "Chunk chunk_001 is too short (less than 200 characters)",
                "Chunk chunk_002 is too short (less than 200 characters)",
                "Chunk chunk_002 is duplicated",
            ]
        );
    }

    #[test]
    fn record_list_checks_see_raw_json() {
        let record = json!({
            "article_id": "paper",
            "title": "not a list",
            "doi": ["10.1/x", 7],
            "authors": [],
            "sections": [{"chunk_id": "chunk_001", "section": "Intro", "text": text(210), "source_doi": null}],
        });
        assert_eq!(
            Validator::default().validate_record(&record),
            vec![INVALID_TITLE, INVALID_DOI]
        );
    }

    #[test]
    fn record_with_malformed_sections() {
        let v = Validator::default();
        for sections in [json!(null), json!([]), json!([{"chunk_id": "chunk_001"}]), json!("x")] {
            let record = json!({"title": ["T"], "doi": ["D"], "sections": sections});
            assert_eq!(v.validate_record(&record), vec![INVALID_SECTIONS]);
            assert!(v.validate_record_chunks(&record).is_empty());
        }
    }

    #[test]
    fn record_chunk_checks_match_typed_checks() {
        let a = article(vec![chunk(1, &text(210)), chunk(2, "short"), chunk(3, &text(210))]);
        let record = serde_json::to_value(&a).expect("serialize");
        let v = Validator::default();

        assert_eq!(v.validate_record(&record), v.validate_article(&a));
        assert_eq!(v.validate_record_chunks(&record), v.validate_chunks(&a.chunks));
    }
}
