//! Embedding a corpus and answering queries against it.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, instrument};

use papercorpus_shared::{Article, CorpusError, Result};

use crate::EmbeddingService;
use crate::index::{FlatL2Index, VectorIndex};

/// Where an indexed vector came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkLocation {
    pub article_id: String,
    /// Position of the chunk in the article's chunk list.
    pub chunk_position: usize,
}

/// A ranked query result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 0-based rank, nearest first.
    pub rank: usize,
    pub distance: f32,
    pub location: ChunkLocation,
}

/// Every chunk of a corpus embedded into one index, with a location table
/// parallel to the index positions.
#[derive(Debug)]
pub struct EmbeddedCorpus<I = FlatL2Index> {
    index: I,
    locations: Vec<ChunkLocation>,
}

impl EmbeddedCorpus<FlatL2Index> {
    /// Embed every chunk of `articles` into a fresh [`FlatL2Index`].
    pub fn build<'a>(
        articles: impl IntoIterator<Item = &'a Article>,
        embedder: &dyn EmbeddingService,
    ) -> Result<Self> {
        let index = FlatL2Index::with_dimensions(embedder.dimensions())?;
        Self::build_with(index, articles, embedder)
    }
}

impl<I: VectorIndex> EmbeddedCorpus<I> {
    /// Embed every chunk of `articles` into `index`, which must be empty.
    #[instrument(skip_all, fields(embedder = embedder.name()))]
    pub fn build_with<'a>(
        mut index: I,
        articles: impl IntoIterator<Item = &'a Article>,
        embedder: &dyn EmbeddingService,
    ) -> Result<Self> {
        if !index.is_empty() {
            return Err(CorpusError::retrieval("corpus index must start empty"));
        }

        let mut locations = Vec::new();
        for article in articles {
            let texts: Vec<&str> = article.chunks.iter().map(|c| c.text.as_str()).collect();
            if texts.is_empty() {
                continue;
            }
            let vectors = embedder.embed_batch(&texts)?;
            if vectors.len() != texts.len() {
                return Err(CorpusError::retrieval(format!(
                    "{} returned {} vectors for {} texts",
                    embedder.name(),
                    vectors.len(),
                    texts.len()
                )));
            }
            index.add(&vectors)?;
            locations.extend((0..texts.len()).map(|chunk_position| ChunkLocation {
                article_id: article.article_id.clone(),
                chunk_position,
            }));
            debug!(article_id = %article.article_id, chunks = texts.len(), "article embedded");
        }

        info!(vectors = locations.len(), "corpus embedded");
        Ok(Self { index, locations })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn location(&self, position: usize) -> Option<&ChunkLocation> {
        self.locations.get(position)
    }

    pub fn index(&self) -> &I {
        &self.index
    }
}

/// Query embedding plus nearest-neighbour lookup.
pub struct SemanticSearch<'a, I = FlatL2Index> {
    corpus: &'a EmbeddedCorpus<I>,
    embedder: &'a dyn EmbeddingService,
}

impl<'a, I: VectorIndex> SemanticSearch<'a, I> {
    pub fn new(corpus: &'a EmbeddedCorpus<I>, embedder: &'a dyn EmbeddingService) -> Self {
        Self { corpus, embedder }
    }

    /// The `top_k` chunks nearest to `query`, nearest first.
    #[instrument(skip(self), fields(embedder = self.embedder.name()))]
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query_vector = self.embedder.embed(query)?;
        let neighbors = self.corpus.index.search(&query_vector, top_k)?;

        neighbors
            .into_iter()
            .enumerate()
            .map(|(rank, n)| {
                let location = self.corpus.location(n.index).cloned().ok_or_else(|| {
                    CorpusError::retrieval(format!("index position {} has no location", n.index))
                })?;
                Ok(SearchHit {
                    rank,
                    distance: n.distance,
                    location,
                })
            })
            .collect()
    }
}

/// Resolves search hits back to chunk text.
#[derive(Debug)]
pub struct ArticleRetriever<'a> {
    articles: HashMap<&'a str, &'a Article>,
}

impl<'a> ArticleRetriever<'a> {
    pub fn new(articles: impl IntoIterator<Item = &'a Article>) -> Self {
        Self {
            articles: articles
                .into_iter()
                .map(|a| (a.article_id.as_str(), a))
                .collect(),
        }
    }

    /// Text of the chunk at `location`, if the article and chunk exist.
    pub fn chunk_text(&self, location: &ChunkLocation) -> Option<&'a str> {
        self.articles
            .get(location.article_id.as_str())
            .copied()
            .and_then(|a| a.chunks.get(location.chunk_position))
            .map(|c| c.text.as_str())
    }

    /// Texts of the hit chunks, in rank order. Unknown locations are skipped.
    pub fn chunk_texts(&self, hits: &[SearchHit]) -> Vec<String> {
        hits.iter()
            .filter_map(|hit| self.chunk_text(&hit.location))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::LetterEmbedder;
    use papercorpus_shared::{Chunk, ChunkId};

    fn article(id: &str, texts: &[&str]) -> Article {
        Article {
            article_id: id.into(),
            title: vec![],
            doi: vec![],
            authors: vec![],
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Chunk {
                    chunk_id: ChunkId::new(i as u32 + 1).expect("non-zero"),
                    section_title: String::new(),
                    text: (*t).into(),
                    source_doi: None,
                })
                .collect(),
        }
    }

    fn corpus() -> Vec<Article> {
        vec![
            article("a", &["aaaa", "bbbb"]),
            article("empty", &[]),
            article("b", &["cccc", "aaab"]),
        ]
    }

    #[test]
    fn locations_follow_insertion_order() {
        let articles = corpus();
        let embedded = EmbeddedCorpus::build(&articles, &LetterEmbedder).unwrap();
        assert_eq!(embedded.len(), 4);
        assert_eq!(embedded.index().len(), 4);
        assert_eq!(
            embedded.location(3),
            Some(&ChunkLocation {
                article_id: "b".into(),
                chunk_position: 1
            })
        );
    }

    #[test]
    fn search_ranks_and_retrieves() {
        let articles = corpus();
        let embedded = EmbeddedCorpus::build(&articles, &LetterEmbedder).unwrap();
        let search = SemanticSearch::new(&embedded, &LetterEmbedder);

        let hits = search.search("aaaa", 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].rank, 0);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[0].location.article_id, "a");
        assert_eq!(hits[1].location.article_id, "b");

        let retriever = ArticleRetriever::new(&articles);
        assert_eq!(retriever.chunk_texts(&hits), vec!["aaaa", "aaab"]);
    }

    #[test]
    fn unknown_locations_are_skipped() {
        let articles = corpus();
        let retriever = ArticleRetriever::new(&articles);
        let hits = vec![
            SearchHit {
                rank: 0,
                distance: 0.0,
                location: ChunkLocation {
                    article_id: "missing".into(),
                    chunk_position: 0,
                },
            },
            SearchHit {
                rank: 1,
                distance: 1.0,
                location: ChunkLocation {
                    article_id: "a".into(),
                    chunk_position: 9,
                },
            },
            SearchHit {
                rank: 2,
                distance: 2.0,
                location: ChunkLocation {
                    article_id: "a".into(),
                    chunk_position: 1,
                },
            },
        ];
        assert_eq!(retriever.chunk_texts(&hits), vec!["bbbb"]);
    }

    #[test]
    fn non_empty_index_is_rejected() {
        let mut index = FlatL2Index::new();
        index.add(&[vec![0.0; 26]]).unwrap();
        let err = EmbeddedCorpus::build_with(index, &corpus(), &LetterEmbedder).unwrap_err();
        assert!(err.to_string().contains("start empty"));
    }

    struct EmptyVectors;

    impl EmbeddingService for EmptyVectors {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(Vec::new())
        }

        fn dimensions(&self) -> usize {
            0
        }

        fn name(&self) -> &str {
            "empty"
        }
    }

    #[test]
    fn zero_dimension_embedder_is_an_error() {
        let err = EmbeddedCorpus::build(&corpus(), &EmptyVectors).unwrap_err();
        assert!(matches!(err, CorpusError::Retrieval(_)), "got {err:?}");

        let no_articles: Vec<Article> = Vec::new();
        assert!(EmbeddedCorpus::build(&no_articles, &EmptyVectors).is_err());
    }

    #[test]
    fn hits_serialize() {
        let hit = SearchHit {
            rank: 0,
            distance: 1.5,
            location: ChunkLocation {
                article_id: "a".into(),
                chunk_position: 2,
            },
        };
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(json["location"]["chunk_position"], 2);
    }
}
