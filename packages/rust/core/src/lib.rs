//! Core pipeline orchestration for papercorpus.
//!
//! This crate ties together TEI extraction, section filtering, chunking,
//! persistence and validation into the batch workflows `process_corpus` and
//! `report_corpus`.

pub mod assembler;
pub mod pipeline;

pub use pipeline::{
    ArticleBuilder, DocumentFailure, ProcessCorpusConfig, ProcessCorpusResult, ProgressReporter,
    SilentProgress, article_id_for, process_corpus, process_corpus_with, report_corpus,
};
