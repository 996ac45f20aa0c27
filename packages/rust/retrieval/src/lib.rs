//! Retrieval over a processed corpus.
//!
//! Model-backed capabilities stay behind traits: [`EmbeddingService`] turns
//! text into vectors and [`SummarizationService`] generates text from ranked
//! passages. This crate owns the exhaustive [`FlatL2Index`] and the glue that
//! maps index positions back to article chunks.

mod index;
mod search;
mod summarize;

use papercorpus_shared::Result;

pub use index::{FlatL2Index, Neighbor, VectorIndex};
pub use search::{ArticleRetriever, ChunkLocation, EmbeddedCorpus, SearchHit, SemanticSearch};
pub use summarize::{
    GenerationParams, QuerySummary, SummarizationService, join_passages, summarize_query,
};

/// Text embedding capability.
///
/// Implementations must be deterministic for a given model and version and
/// always return vectors of [`dimensions`](Self::dimensions) length.
pub trait EmbeddingService: Send + Sync {
    /// Embed a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts. The default calls [`embed`](Self::embed) in order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Length of every vector this service produces.
    fn dimensions(&self) -> usize;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
