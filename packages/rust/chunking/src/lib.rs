//! Section filtering and sentence-bounded chunking.
//!
//! Sections too short to carry meaning are dropped by [`SectionFilter`];
//! the survivors are packed into word-bounded [`Chunk`]s by [`Chunker`],
//! which only ever cuts on sentence boundaries supplied by a
//! [`SentenceSegmenter`].
//!
//! [`Chunk`]: papercorpus_shared::Chunk

mod chunker;
mod filter;
mod segmenter;

pub use chunker::Chunker;
pub use filter::SectionFilter;
pub use segmenter::{SentenceSegmenter, UnicodeSentenceSegmenter};

/// Whitespace-delimited word count, the unit every size threshold uses.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
