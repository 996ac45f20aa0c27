//! Query-focused summarization over retrieved chunks.

use serde::Serialize;
use tracing::{info, instrument};

use papercorpus_shared::{CorpusError, Result};

use crate::index::VectorIndex;
use crate::search::{ArticleRetriever, SearchHit, SemanticSearch};

/// Decoding parameters handed to the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GenerationParams {
    /// Input is truncated to this many tokens.
    pub max_input_tokens: usize,
    /// Upper bound on generated length, in tokens.
    pub max_length: usize,
    pub num_beams: usize,
    /// N-grams of this size never repeat in the output.
    pub no_repeat_ngram_size: usize,
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_input_tokens: 1024,
            max_length: 500,
            num_beams: 5,
            no_repeat_ngram_size: 2,
            early_stopping: true,
        }
    }
}

/// Text generation capability.
pub trait SummarizationService: Send + Sync {
    /// Generate bounded-length text from ranked passages, best first.
    fn summarize(&self, passages: &[String], params: &GenerationParams) -> Result<String>;

    fn name(&self) -> &str;
}

/// Passages as one model input, separated by blank lines.
pub fn join_passages(passages: &[String]) -> String {
    passages.join("\n\n")
}

/// Result of [`summarize_query`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySummary {
    pub query: String,
    pub hits: Vec<SearchHit>,
    pub summary: String,
}

/// Search, resolve the hits to chunk text, and summarize them.
#[instrument(skip(search, retriever, summarizer, params), fields(summarizer = summarizer.name()))]
pub fn summarize_query<I: VectorIndex>(
    query: &str,
    top_k: usize,
    search: &SemanticSearch<'_, I>,
    retriever: &ArticleRetriever<'_>,
    summarizer: &dyn SummarizationService,
    params: &GenerationParams,
) -> Result<QuerySummary> {
    let hits = search.search(query, top_k)?;
    let passages = retriever.chunk_texts(&hits);
    if passages.is_empty() {
        return Err(CorpusError::retrieval(format!("no passages found for query '{query}'")));
    }

    let summary = summarizer.summarize(&passages, params)?;
    info!(hits = hits.len(), summary_len = summary.len(), "query summarized");

    Ok(QuerySummary {
        query: query.to_string(),
        hits,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::EmbeddedCorpus;
    use crate::testing::LetterEmbedder;
    use papercorpus_shared::{Article, Chunk, ChunkId};

    /// Echoes the first word of each passage, truncated to `max_length` words.
    struct FirstWords;

    impl SummarizationService for FirstWords {
        fn summarize(&self, passages: &[String], params: &GenerationParams) -> Result<String> {
            let joined = join_passages(passages);
            Ok(joined
                .split("\n\n")
                .filter_map(|p| p.split_whitespace().next())
                .take(params.max_length)
                .collect::<Vec<_>>()
                .join(" "))
        }

        fn name(&self) -> &str {
            "first-words"
        }
    }

    fn article() -> Article {
        Article {
            article_id: "paper".into(),
            title: vec!["T".into()],
            doi: vec![],
            authors: vec![],
            chunks: ["leptin signals", "ghrelin rises", "leptin falls"]
                .iter()
                .enumerate()
                .map(|(i, t)| Chunk {
                    chunk_id: ChunkId::new(i as u32 + 1).expect("non-zero"),
                    section_title: "Body".into(),
                    text: (*t).into(),
                    source_doi: None,
                })
                .collect(),
        }
    }

    #[test]
    fn default_params() {
        let p = GenerationParams::default();
        assert_eq!(
            (p.max_input_tokens, p.max_length, p.num_beams, p.no_repeat_ngram_size),
            (1024, 500, 5, 2)
        );
        assert!(p.early_stopping);
    }

    #[test]
    fn composes_search_retrieve_summarize() {
        let articles = vec![article()];
        let corpus = EmbeddedCorpus::build(&articles, &LetterEmbedder).unwrap();
        let search = SemanticSearch::new(&corpus, &LetterEmbedder);
        let retriever = ArticleRetriever::new(&articles);

        let result = summarize_query(
            "ghrelin rises",
            2,
            &search,
            &retriever,
            &FirstWords,
            &GenerationParams::default(),
        )
        .unwrap();

        assert_eq!(result.hits.len(), 2);
        assert_eq!(result.hits[0].location.chunk_position, 1);
        assert!(result.summary.starts_with("ghrelin"));
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let articles: Vec<Article> = vec![];
        let corpus = EmbeddedCorpus::build(&articles, &LetterEmbedder).unwrap();
        let search = SemanticSearch::new(&corpus, &LetterEmbedder);
        let retriever = ArticleRetriever::new(&articles);

        let err = summarize_query(
            "anything",
            3,
            &search,
            &retriever,
            &FirstWords,
            &GenerationParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CorpusError::Retrieval(_)));
    }

    #[test]
    fn passages_are_blank_line_separated() {
        assert_eq!(join_passages(&["a".into(), "b".into()]), "a\n\nb");
    }
}
