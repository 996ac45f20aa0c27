//! Shared types, error model, and configuration for papercorpus.
//!
//! This crate is the foundation depended on by all other papercorpus crates.
//! It provides:
//! - [`CorpusError`], the unified error type
//! - Domain types ([`Article`], [`Chunk`], [`ChunkId`], [`CorpusReport`])
//! - Configuration ([`AppConfig`], the runtime parameter sets, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkerConfig, ChunkingConfig, FilterConfig, PathsConfig, PipelineSettings,
    SectionFilterConfig, ValidationConfig, ValidationSettings, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{CorpusError, Result};
pub use types::{Article, ArticleErrors, Author, Chunk, ChunkId, CorpusReport, RawSection};
