//! Structured-document extraction for scholarly articles.
//!
//! The pipeline only consumes the [`DocumentExtractor`] capability: title,
//! DOI, authors, and raw sections of one document. [`TeiDocument`] implements
//! it for GROBID-style TEI XML, and [`TeiLoader`] opens documents from disk.

mod cleanup;
mod parser;

use std::path::Path;

use tracing::{debug, instrument};

use papercorpus_shared::{Author, CorpusError, RawSection, Result};

pub use cleanup::clean_text;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Read-only view of the fields extracted from one input document.
///
/// Title and DOI are lists: a document may carry zero or several matches.
pub trait DocumentExtractor: Send {
    fn title(&self) -> &[String];
    fn doi(&self) -> &[String];
    fn authors(&self) -> &[Author];
    fn sections(&self) -> &[RawSection];
}

/// Opens a document from disk and hands back its extractor.
///
/// Loaders are shared across worker threads and must not hold mutable state.
pub trait DocumentLoader: Send + Sync {
    /// Parse the document at `path`. Malformed input is an extraction error.
    fn load(&self, path: &Path) -> Result<Box<dyn DocumentExtractor>>;

    /// Human-readable loader name for tracing.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// TEI implementation
// ---------------------------------------------------------------------------

/// Fields extracted from a TEI XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeiDocument {
    pub title: Vec<String>,
    pub doi: Vec<String>,
    pub authors: Vec<Author>,
    pub sections: Vec<RawSection>,
}

impl TeiDocument {
    /// Parse TEI XML text.
    pub fn parse(xml: &str) -> Result<Self> {
        parser::parse_tei(xml)
    }

    /// Read and parse a TEI XML file.
    #[instrument(fields(path = %path.display()))]
    pub fn from_path(path: &Path) -> Result<Self> {
        // Extraction messages end up in reports; name the file, not its location.
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let bytes = std::fs::read(path).map_err(|e| CorpusError::io(path, e))?;
        let xml = String::from_utf8(bytes)
            .map_err(|e| CorpusError::extraction(format!("{file_name} is not valid UTF-8: {e}")))?;

        let doc = Self::parse(&xml).map_err(|e| match e {
            CorpusError::Extraction { message } => {
                CorpusError::extraction(format!("{file_name}: {message}"))
            }
            other => other,
        })?;

        debug!(
            titles = doc.title.len(),
            dois = doc.doi.len(),
            authors = doc.authors.len(),
            sections = doc.sections.len(),
            "TEI document extracted"
        );

        Ok(doc)
    }
}

impl DocumentExtractor for TeiDocument {
    fn title(&self) -> &[String] {
        &self.title
    }

    fn doi(&self) -> &[String] {
        &self.doi
    }

    fn authors(&self) -> &[Author] {
        &self.authors
    }

    fn sections(&self) -> &[RawSection] {
        &self.sections
    }
}

/// Loads TEI XML files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeiLoader;

impl DocumentLoader for TeiLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn DocumentExtractor>> {
        Ok(Box::new(TeiDocument::from_path(path)?))
    }

    fn name(&self) -> &str {
        "tei"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
