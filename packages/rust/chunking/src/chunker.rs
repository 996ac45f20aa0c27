//! Greedy sentence packing with tail merge.

use std::sync::Arc;

use tracing::warn;

use papercorpus_shared::{Chunk, ChunkId, ChunkerConfig, RawSection};

use crate::segmenter::SentenceSegmenter;
use crate::word_count;

/// Packs section text into chunks of at most `max_words` words.
///
/// Boundaries always fall between sentences. A sentence longer than the
/// budget on its own becomes an oversized chunk and is never split.
#[derive(Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    segmenter: Arc<dyn SentenceSegmenter>,
}

impl std::fmt::Debug for Chunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// A closed chunk buffer: its text and word count.
#[derive(Debug)]
struct Packed {
    text: String,
    words: usize,
}

impl Chunker {
    pub fn new(config: ChunkerConfig, segmenter: Arc<dyn SentenceSegmenter>) -> Self {
        Self { config, segmenter }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split `text` into chunk texts, in order, after the tail merge.
    pub fn split(&self, text: &str) -> Vec<String> {
        let max_words = self.config.max_words;
        let mut packed: Vec<Packed> = Vec::new();
        let mut buffer: Vec<String> = Vec::new();
        let mut size = 0usize;

        for sentence in self.segmenter.segment(text) {
            let words = word_count(&sentence);
            if words > max_words {
                warn!(words, max_words, "sentence exceeds chunk budget, keeping it whole");
            }

            if size + words > max_words {
                if !buffer.is_empty() {
                    packed.push(Packed {
                        text: buffer.join(" "),
                        words: size,
                    });
                }
                buffer = vec![sentence];
                size = words;
            } else {
                buffer.push(sentence);
                size += words;
            }
        }

        if !buffer.is_empty() {
            packed.push(Packed {
                text: buffer.join(" "),
                words: size,
            });
        }

        if packed.len() > 1
            && packed
                .last()
                .is_some_and(|last| last.words < self.config.merge_below_words)
        {
            if let Some(tail) = packed.pop() {
                if let Some(prev) = packed.last_mut() {
                    prev.text.push(' ');
                    prev.text.push_str(&tail.text);
                    prev.words += tail.words;
                }
            }
        }

        packed.into_iter().map(|p| p.text).collect()
    }

    /// Chunk one section, numbering chunks from `next_id` onwards.
    ///
    /// `next_id` is advanced past the last id used, so threading the same
    /// counter through every section of an article keeps ids contiguous.
    pub fn chunk(
        &self,
        text: &str,
        section_title: &str,
        doi: Option<&str>,
        next_id: &mut ChunkId,
    ) -> Vec<Chunk> {
        self.split(text)
            .into_iter()
            .map(|text| {
                let chunk_id = *next_id;
                *next_id = next_id.next();
                Chunk {
                    chunk_id,
                    section_title: section_title.to_string(),
                    text,
                    source_doi: doi.map(str::to_string),
                }
            })
            .collect()
    }

    /// Chunk every section of an article with one article-scoped id counter.
    pub fn chunk_sections<'a>(
        &self,
        sections: impl IntoIterator<Item = &'a RawSection>,
        doi: Option<&str>,
    ) -> Vec<Chunk> {
        let mut next_id = ChunkId::FIRST;
        sections
            .into_iter()
            .flat_map(|section| {
                self.chunk(&section.text, &section.section_title, doi, &mut next_id)
            })
            .collect()
    }
}
