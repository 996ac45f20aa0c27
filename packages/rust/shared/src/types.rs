//! Core domain types for papercorpus articles, chunks, and reports.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CorpusError;

/// Prefix of the textual chunk identifier (`chunk_001`).
const CHUNK_ID_PREFIX: &str = "chunk_";

// ---------------------------------------------------------------------------
// Author / RawSection
// ---------------------------------------------------------------------------

/// An article author as produced by extraction. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
}

/// A titled block of body text, before filtering and chunking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSection {
    /// Section heading (empty when the section has none).
    pub section_title: String,
    /// Whitespace-normalized section text.
    pub text: String,
}

impl RawSection {
    pub fn new(section_title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            section_title: section_title.into(),
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChunkId
// ---------------------------------------------------------------------------

/// Article-scoped, 1-based chunk sequence number.
///
/// Ordering follows the number; the `chunk_NNN` text form is only cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChunkId(u32);

impl ChunkId {
    /// The first id of every article.
    pub const FIRST: ChunkId = ChunkId(1);

    /// Build an id from its sequence number. Returns `None` for zero.
    pub fn new(seq: u32) -> Option<Self> {
        (seq > 0).then_some(Self(seq))
    }

    /// The 1-based sequence number.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The id that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CHUNK_ID_PREFIX}{:03}", self.0)
    }
}

impl FromStr for ChunkId {
    type Err = CorpusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.strip_prefix(CHUNK_ID_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .and_then(ChunkId::new)
            .ok_or_else(|| CorpusError::serialization(format!("invalid chunk id '{s}'")))
    }
}

impl TryFrom<String> for ChunkId {
    type Error = CorpusError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChunkId> for String {
    fn from(id: ChunkId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// Chunk / Article
// ---------------------------------------------------------------------------

/// A bounded-size unit of section text, persisted and later embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: ChunkId,
    /// Title of the section the chunk was cut from.
    #[serde(rename = "section")]
    pub section_title: String,
    /// Space-joined sentences, in original order.
    pub text: String,
    /// First DOI of the owning article, if any.
    pub source_doi: Option<String>,
}

impl Chunk {
    /// Length of the trimmed text in Unicode scalar values.
    pub fn trimmed_len(&self) -> usize {
        self.text.trim().chars().count()
    }
}

/// One processed input document.
///
/// Title and DOI stay lists because extraction may find zero or several matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub article_id: String,
    pub title: Vec<String>,
    pub doi: Vec<String>,
    pub authors: Vec<Author>,
    /// Ordered chunks of every surviving section.
    #[serde(rename = "sections")]
    pub chunks: Vec<Chunk>,
}

impl Article {
    /// First extracted DOI; stamped onto each chunk as `source_doi`.
    pub fn primary_doi(&self) -> Option<&str> {
        self.doi.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Validation messages collected for a single article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleErrors {
    pub article_id: String,
    pub errors: Vec<String>,
}

/// Corpus-wide quality report (`validation_report.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusReport {
    pub total_articles: usize,
    pub valid_articles: usize,
    pub failed_parsing: usize,
    pub total_chunks: usize,
    /// Mean trimmed chunk length; `0.0` when the corpus has no chunks.
    pub avg_chars_per_chunk: f64,
    pub errors: Vec<ArticleErrors>,
}
