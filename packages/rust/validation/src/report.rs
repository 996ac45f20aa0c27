//! Corpus-level report aggregation.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use papercorpus_shared::{Article, ArticleErrors, CorpusReport, ValidationConfig};

use crate::validator::Validator;

/// Folds validated articles into a [`CorpusReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAggregator {
    validator: Validator,
}

impl ReportAggregator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            validator: Validator::new(config),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Start an incremental report.
    pub fn builder(&self) -> ReportBuilder<'_> {
        ReportBuilder {
            validator: &self.validator,
            report: CorpusReport::default(),
            total_chars: 0,
        }
    }

    /// Report over typed articles, in the order given.
    pub fn aggregate<'a>(&self, articles: impl IntoIterator<Item = &'a Article>) -> CorpusReport {
        let mut builder = self.builder();
        for article in articles {
            builder.add_article(article);
        }
        builder.finish()
    }

    /// Report over raw persisted records, each paired with a fallback article id.
    pub fn aggregate_records<'a>(
        &self,
        records: impl IntoIterator<Item = (&'a str, &'a Value)>,
    ) -> CorpusReport {
        let mut builder = self.builder();
        for (article_id, record) in records {
            builder.add_record(article_id, record);
        }
        builder.finish()
    }
}

/// Accumulates one article at a time; [`finish`](Self::finish) computes the
/// average with a zero guard.
#[derive(Debug)]
pub struct ReportBuilder<'v> {
    validator: &'v Validator,
    report: CorpusReport,
    total_chars: usize,
}

impl ReportBuilder<'_> {
    /// Validate a typed article and count it.
    pub fn add_article(&mut self, article: &Article) {
        let mut errors = self.validator.validate_article(article);
        errors.extend(self.validator.validate_chunks(&article.chunks));

        self.count_chunks(article.chunks.iter().map(|c| c.trimmed_len()));
        self.push(&article.article_id, errors);
    }

    /// Validate a raw persisted record and count it.
    ///
    /// The record's own `article_id` wins over `fallback_id` when it is a string.
    pub fn add_record(&mut self, fallback_id: &str, record: &Value) {
        let mut errors = self.validator.validate_record(record);
        errors.extend(self.validator.validate_record_chunks(record));

        let lengths = record
            .get("sections")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(|c| {
                c.get("text")
                    .and_then(Value::as_str)
                    .map_or(0, |t| t.trim().chars().count())
            });
        self.count_chunks(lengths);

        let article_id = record
            .get("article_id")
            .and_then(Value::as_str)
            .unwrap_or(fallback_id);
        self.push(article_id, errors);
    }

    /// Count an article that never produced a record.
    pub fn add_failure(&mut self, article_id: &str, reason: impl fmt::Display) {
        self.push(article_id, vec![reason.to_string()]);
    }

    pub fn finish(mut self) -> CorpusReport {
        self.report.avg_chars_per_chunk = if self.report.total_chunks == 0 {
            0.0
        } else {
            self.total_chars as f64 / self.report.total_chunks as f64
        };
        self.report
    }

    fn count_chunks(&mut self, lengths: impl Iterator<Item = usize>) {
        for len in lengths {
            self.report.total_chunks += 1;
            self.total_chars += len;
        }
    }

    fn push(&mut self, article_id: &str, errors: Vec<String>) {
        self.report.total_articles += 1;
        if errors.is_empty() {
            self.report.valid_articles += 1;
        } else {
            debug!(article_id, errors = errors.len(), "article failed validation");
            self.report.failed_parsing += 1;
            self.report.errors.push(ArticleErrors {
                article_id: article_id.to_string(),
                errors,
            });
        }
    }
}
