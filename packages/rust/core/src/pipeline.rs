//! End-to-end corpus pipeline: directory → extract → filter → chunk →
//! persist per document, then validate and report over the whole corpus.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use papercorpus_chunking::{Chunker, SectionFilter, SentenceSegmenter, UnicodeSentenceSegmenter};
use papercorpus_shared::{
    AppConfig, Article, ChunkerConfig, CorpusError, CorpusReport, RawSection, Result,
    SectionFilterConfig, ValidationConfig,
};
use papercorpus_tei::{DocumentExtractor, DocumentLoader, TeiLoader};
use papercorpus_validation::ReportAggregator;

use crate::assembler::{self, ARTICLE_EXTENSION, FileEntry, MANIFEST_FILE, RunManifest, RunParams};

/// Configuration for [`process_corpus`].
#[derive(Debug, Clone)]
pub struct ProcessCorpusConfig {
    /// Directory of input documents.
    pub input_dir: PathBuf,
    /// Directory receiving one JSON record per article.
    pub output_dir: PathBuf,
    /// Where the validation report is written. The run manifest goes beside it.
    pub report_path: PathBuf,
    /// Input file extension without the dot; other files are skipped.
    pub extension: String,
    /// Maximum number of documents in flight.
    pub concurrency: usize,
    pub filter: SectionFilterConfig,
    pub chunking: ChunkerConfig,
    pub validation: ValidationConfig,
    /// Tool version string recorded in the manifest.
    pub tool_version: String,
}

impl From<&AppConfig> for ProcessCorpusConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_dir: PathBuf::from(&config.paths.input_dir),
            output_dir: PathBuf::from(&config.paths.output_dir),
            report_path: PathBuf::from(&config.paths.report_path),
            extension: config.paths.extension.trim_start_matches('.').to_string(),
            concurrency: config.pipeline.concurrency,
            filter: SectionFilterConfig::from(config),
            chunking: ChunkerConfig::from(config),
            validation: ValidationConfig::from(config),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ProcessCorpusConfig {
    fn run_params(&self) -> RunParams {
        RunParams {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            report_path: self.report_path.clone(),
            extension: self.extension.clone(),
            concurrency: self.concurrency,
            filter: self.filter,
            chunking: self.chunking,
            validation: self.validation,
        }
    }
}

/// A document that produced no article record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub article_id: String,
    pub path: PathBuf,
    /// Message recorded in the report.
    pub reason: String,
}

/// Result of [`process_corpus`].
#[derive(Debug)]
pub struct ProcessCorpusResult {
    pub run_id: Uuid,
    /// Every persisted article, keyed by article id.
    pub articles: BTreeMap<String, Article>,
    pub failures: Vec<DocumentFailure>,
    /// Files ignored for their extension or name.
    pub skipped: usize,
    pub report: CorpusReport,
    pub report_path: PathBuf,
    pub manifest_path: PathBuf,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a document's record has been persisted.
    fn document_processed(&self, article_id: &str, current: usize, total: usize);
    /// Called when a document is dropped from the batch.
    fn document_failed(&self, article_id: &str, reason: &str);
    /// Called when the run completes.
    fn done(&self, result: &ProcessCorpusResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_processed(&self, _article_id: &str, _current: usize, _total: usize) {}
    fn document_failed(&self, _article_id: &str, _reason: &str) {}
    fn done(&self, _result: &ProcessCorpusResult) {}
}

// ---------------------------------------------------------------------------
// Per-document work
// ---------------------------------------------------------------------------

/// Turns one input document into an [`Article`].
///
/// Holds the shared, read-only capabilities (loader and segmenter) and is
/// itself shared across worker threads.
pub struct ArticleBuilder {
    loader: Arc<dyn DocumentLoader>,
    filter: SectionFilter,
    chunker: Chunker,
}

impl ArticleBuilder {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        segmenter: Arc<dyn SentenceSegmenter>,
        filter: SectionFilterConfig,
        chunking: ChunkerConfig,
    ) -> Self {
        Self {
            loader,
            filter: SectionFilter::new(filter),
            chunker: Chunker::new(chunking, segmenter),
        }
    }

    /// TEI loader with Unicode sentence segmentation.
    pub fn from_config(config: &ProcessCorpusConfig) -> Self {
        Self::new(
            Arc::new(TeiLoader),
            Arc::new(UnicodeSentenceSegmenter),
            config.filter,
            config.chunking,
        )
    }

    /// Assemble an article from extracted fields.
    pub fn build(&self, article_id: &str, doc: &dyn DocumentExtractor) -> Article {
        let mut article = Article {
            article_id: article_id.to_string(),
            title: doc.title().to_vec(),
            doi: doc.doi().to_vec(),
            authors: doc.authors().to_vec(),
            chunks: Vec::new(),
        };

        let kept: Vec<&RawSection> = self.filter.apply(doc.sections()).collect();
        let chunks = self
            .chunker
            .chunk_sections(kept.iter().copied(), article.primary_doi());
        article.chunks = chunks;

        debug!(
            article_id,
            sections = doc.sections().len(),
            kept = kept.len(),
            chunks = article.chunks.len(),
            "article assembled"
        );

        article
    }

    /// Load the document at `path` and assemble it under `article_id`.
    pub fn load(&self, article_id: &str, path: &Path) -> Result<Article> {
        debug!(loader = self.loader.name(), path = %path.display(), "loading document");
        let doc = self.loader.load(path)?;
        Ok(self.build(article_id, doc.as_ref()))
    }
}

/// Article id of an input or output file: its name up to the first `.`.
///
/// Returns `None` for names that yield an empty id, such as dotfiles.
pub fn article_id_for(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.split('.').next().unwrap_or_default();
    (!id.is_empty()).then(|| id.to_string())
}

/// Report message for a document that produced no record.
fn failure_reason(err: &CorpusError) -> String {
    match err {
        CorpusError::Extraction { message } => format!("Extraction failed: {message}"),
        other => format!("Processing failed: {other}"),
    }
}

#[derive(Debug, Clone)]
struct InputDocument {
    article_id: String,
    path: PathBuf,
}

/// List input documents, sorted by path. A missing or unreadable
/// directory is fatal.
fn scan_input(input_dir: &Path, extension: &str) -> Result<(Vec<InputDocument>, usize)> {
    let entries = std::fs::read_dir(input_dir).map_err(|e| CorpusError::io(input_dir, e))?;
    let extension = extension.trim_start_matches('.');

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for entry in entries {
        let path = entry.map_err(|e| CorpusError::io(input_dir, e))?.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        match article_id_for(&path) {
            Some(article_id) if matches => documents.push(InputDocument { article_id, path }),
            _ => {
                debug!(path = %path.display(), "skipping file");
                skipped += 1;
            }
        }
    }

    documents.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((documents, skipped))
}

/// File name for report messages, which must not depend on where the corpus lives.
fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Split off documents whose article id was already taken by an earlier path.
fn take_duplicates(documents: Vec<InputDocument>) -> (Vec<InputDocument>, Vec<DocumentFailure>) {
    let mut first_paths: BTreeMap<String, PathBuf> = BTreeMap::new();
    let mut unique = Vec::with_capacity(documents.len());
    let mut duplicates = Vec::new();

    for doc in documents {
        if let Some(first) = first_paths.get(&doc.article_id) {
            warn!(
                article_id = %doc.article_id,
                path = %doc.path.display(),
                "duplicate article id, skipping document"
            );
            duplicates.push(DocumentFailure {
                reason: format!(
                    "Duplicate article id: {} has the same id as {}",
                    display_name(&doc.path),
                    display_name(first)
                ),
                article_id: doc.article_id,
                path: doc.path,
            });
        } else {
            first_paths.insert(doc.article_id.clone(), doc.path.clone());
            unique.push(doc);
        }
    }

    (unique, duplicates)
}

// ---------------------------------------------------------------------------
// Pipeline entry points
// ---------------------------------------------------------------------------

/// Run the corpus pipeline with the TEI loader and Unicode segmentation.
pub async fn process_corpus(
    config: &ProcessCorpusConfig,
    progress: &dyn ProgressReporter,
) -> Result<ProcessCorpusResult> {
    let builder = Arc::new(ArticleBuilder::from_config(config));
    process_corpus_with(config, builder, progress).await
}

/// Run the corpus pipeline with a caller-supplied [`ArticleBuilder`].
///
/// 1. Scan the input directory (fatal if unreadable)
/// 2. Build and persist each document on the blocking pool
/// 3. Wait for every document, then validate the cached articles
/// 4. Write the report and the run manifest
#[instrument(skip_all, fields(input = %config.input_dir.display(), output = %config.output_dir.display()))]
pub async fn process_corpus_with(
    config: &ProcessCorpusConfig,
    builder: Arc<ArticleBuilder>,
    progress: &dyn ProgressReporter,
) -> Result<ProcessCorpusResult> {
    let start = Instant::now();
    let started_at = Utc::now();
    let run_id = Uuid::now_v7();

    if config.concurrency == 0 {
        return Err(CorpusError::config("concurrency must be at least 1"));
    }

    info!(%run_id, "starting corpus run");

    // --- Phase 1: Scan ---
    progress.phase("Scanning input directory");
    let (documents, skipped) = scan_input(&config.input_dir, &config.extension)?;
    let (documents, mut failures) = take_duplicates(documents);
    info!(documents = documents.len(), skipped, "input scanned");

    // --- Phase 2: Extract, chunk, persist ---
    progress.phase("Processing documents");
    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| CorpusError::io(&config.output_dir, e))?;

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut handles = Vec::with_capacity(documents.len());

    for doc in &documents {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| CorpusError::Task(format!("semaphore closed: {e}")))?;
        let builder = Arc::clone(&builder);
        let doc = doc.clone();
        let output_dir = config.output_dir.clone();

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let article = builder.load(&doc.article_id, &doc.path)?;
            let entry = assembler::persist_article(&output_dir, &article)?;
            Ok::<_, CorpusError>((article, entry))
        }));
    }

    // Barrier: every document finishes before aggregation.
    let total = documents.len();
    let mut articles: BTreeMap<String, Article> = BTreeMap::new();
    let mut entries: Vec<FileEntry> = Vec::with_capacity(total);

    for (i, (doc, handle)) in documents.into_iter().zip(handles).enumerate() {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(CorpusError::Task(e.to_string())),
        };

        match outcome {
            Ok((article, entry)) => {
                progress.document_processed(&article.article_id, i + 1, total);
                entries.push(entry);
                articles.insert(article.article_id.clone(), article);
            }
            Err(e) => {
                warn!(path = %doc.path.display(), error = %e, "document failed, continuing batch");
                let reason = failure_reason(&e);
                progress.document_failed(&doc.article_id, &reason);
                failures.push(DocumentFailure {
                    article_id: doc.article_id,
                    path: doc.path,
                    reason,
                });
            }
        }
    }

    // Duplicates were collected before processing; report every failure by path.
    failures.sort_by(|a, b| a.path.cmp(&b.path));

    // --- Phase 3: Validate & report ---
    progress.phase("Validating corpus");
    let aggregator = ReportAggregator::new(config.validation);
    let mut report_builder = aggregator.builder();
    for article in articles.values() {
        report_builder.add_article(article);
    }
    for failure in &failures {
        report_builder.add_failure(&failure.article_id, &failure.reason);
    }
    let report = report_builder.finish();

    progress.phase("Writing report");
    let report_entry = assembler::write_json_atomic(&config.report_path, &report)?;

    // --- Phase 4: Manifest ---
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let manifest = RunManifest {
        run_id: run_id.to_string(),
        tool_version: config.tool_version.clone(),
        started_at,
        completed_at: Utc::now(),
        params: config.run_params(),
        articles: entries,
        report: report_entry,
    };
    let manifest_path = assembler::manifest_path(&config.report_path);
    assembler::write_json_atomic(&manifest_path, &manifest)?;

    let result = ProcessCorpusResult {
        run_id,
        articles,
        failures,
        skipped,
        report,
        report_path: config.report_path.clone(),
        manifest_path,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        %run_id,
        total = result.report.total_articles,
        valid = result.report.valid_articles,
        failed = result.report.failed_parsing,
        chunks = result.report.total_chunks,
        elapsed_ms = result.elapsed.as_millis(),
        "corpus run complete"
    );

    Ok(result)
}

/// Rebuild the validation report from persisted article records.
///
/// Records are validated as written, without re-extracting or re-chunking.
/// A file that cannot be read or parsed counts as a failed article.
#[instrument(skip_all, fields(output = %output_dir.display()))]
pub fn report_corpus(
    output_dir: &Path,
    report_path: &Path,
    validation: ValidationConfig,
) -> Result<CorpusReport> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| CorpusError::io(output_dir, e))?;
    let report_file = std::fs::canonicalize(report_path).ok();

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CorpusError::io(output_dir, e))?.path();
        let is_record = path.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(ARTICLE_EXTENSION)
            && path.file_name().and_then(|n| n.to_str()) != Some(MANIFEST_FILE);
        let is_report =
            report_file.is_some() && std::fs::canonicalize(&path).ok() == report_file;

        match article_id_for(&path) {
            Some(_) if is_record && !is_report => paths.push(path),
            _ => debug!(path = %path.display(), "skipping file"),
        }
    }
    paths.sort();

    let aggregator = ReportAggregator::new(validation);
    let mut builder = aggregator.builder();

    for path in &paths {
        let article_id = article_id_for(path).unwrap_or_default();
        let record = std::fs::read_to_string(path)
            .map_err(|e| format!("Unreadable article record: {e}"))
            .and_then(|content| {
                serde_json::from_str::<Value>(&content)
                    .map_err(|e| format!("Invalid article record: {e}"))
            });

        match record {
            Ok(record) => builder.add_record(&article_id, &record),
            Err(reason) => {
                warn!(path = %path.display(), %reason, "record not readable");
                builder.add_failure(&article_id, reason);
            }
        }
    }

    let report = builder.finish();
    assembler::write_json_atomic(report_path, &report)?;

    info!(
        records = paths.len(),
        valid = report.valid_articles,
        failed = report.failed_parsing,
        "report rebuilt from persisted records"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use papercorpus_shared::Author;

    struct FakeDocument {
        title: Vec<String>,
        doi: Vec<String>,
        authors: Vec<Author>,
        sections: Vec<RawSection>,
    }

    impl DocumentExtractor for FakeDocument {
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

    fn long_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {i} reports energy intake after the test meal."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn builder() -> ArticleBuilder {
        ArticleBuilder::new(
            Arc::new(TeiLoader),
            Arc::new(UnicodeSentenceSegmenter),
            SectionFilterConfig::default(),
            ChunkerConfig::default(),
        )
    }

    #[test]
    fn article_id_is_name_up_to_first_dot() {
        assert_eq!(
            article_id_for(Path::new("data/processed/paper.tei.xml")).as_deref(),
            Some("paper")
        );
        assert_eq!(article_id_for(Path::new("plain")).as_deref(), Some("plain"));
        assert_eq!(article_id_for(Path::new(".hidden.xml")), None);
    }

    #[test]
    fn build_filters_chunks_and_stamps_doi() {
        let doc = FakeDocument {
            title: vec!["Appetite".into()],
            doi: vec!["10.1/first".into(), "10.1/second".into()],
            authors: vec![Author::default()],
            sections: vec![
                RawSection::new("Introduction", long_text(5)),
                RawSection::new("Abbreviations", "BMI: body mass index."),
                RawSection::new("Results", long_text(80)),
            ],
        };

        let article = builder().build("paper", &doc);
        assert_eq!(article.article_id, "paper");
        assert_eq!(article.doi.len(), 2);
        assert_eq!(article.primary_doi(), Some("10.1/first"));
        assert_eq!(article.authors.len(), 1);

        // 5 sentences of 10 words, then 800 words packed into 500-word chunks.
        let ids: Vec<u32> = article.chunks.iter().map(|c| c.chunk_id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(article.chunks[0].section_title, "Introduction");
        assert!(article.chunks[1..].iter().all(|c| c.section_title == "Results"));
        assert!(
            article
                .chunks
                .iter()
                .all(|c| c.source_doi.as_deref() == Some("10.1/first"))
        );
    }

    #[test]
    fn build_without_doi_leaves_source_empty() {
        let doc = FakeDocument {
            title: vec![],
            doi: vec![],
            authors: vec![],
            sections: vec![RawSection::new("Body", long_text(4))],
        };
        let article = builder().build("nodoi", &doc);
        assert_eq!(article.chunks.len(), 1);
        assert_eq!(article.chunks[0].source_doi, None);
    }

    #[test]
    fn failure_reasons() {
        assert_eq!(
            failure_reason(&CorpusError::extraction("bad XML")),
            "Extraction failed: bad XML"
        );
        assert!(
            failure_reason(&CorpusError::Task("panicked".into())).starts_with("Processing failed")
        );
    }

    #[test]
    fn duplicates_keep_first_path() {
        let docs = vec![
            InputDocument {
                article_id: "a".into(),
                path: "in/a.tei.xml".into(),
            },
            InputDocument {
                article_id: "a".into(),
                path: "in/a.v2.xml".into(),
            },
            InputDocument {
                article_id: "b".into(),
                path: "in/b.xml".into(),
            },
        ];
        let (unique, dupes) = take_duplicates(docs);
        assert_eq!(unique.len(), 2);
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].path, PathBuf::from("in/a.v2.xml"));
        assert_eq!(
            dupes[0].reason,
            "Duplicate article id: a.v2.xml has the same id as a.tei.xml"
        );
    }

    #[test]
    fn config_from_app_config() {
        let mut app = AppConfig::default();
        app.paths.extension = ".xml".into();
        app.pipeline.concurrency = 2;
        let config = ProcessCorpusConfig::from(&app);
        assert_eq!(config.extension, "xml");
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.report_path, PathBuf::from("data/validation_report.json"));
        assert_eq!(config.chunking.max_words, 500);
    }
}
