//! In-memory semantic index over one corpus.
//!
//! A [`CorpusIndex`] is built once at startup from a finite document set:
//! every document is chunked on paragraph boundaries and the chunks are
//! embedded in provider batches. It is read-only thereafter; `query`
//! embeds the question, ranks chunks by cosine similarity, and hands the
//! top passages to the generation provider. Vector search is brute-force
//! over all stored vectors.

use std::sync::Arc;

use crate::chunk::chunk_text;
use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::error::QaError;
use crate::generation::GenerationProvider;
use crate::models::{Answer, Document};

struct IndexEntry {
    path: String,
    text: String,
    vector: Vec<f32>,
}

/// Build-time parameters for a [`CorpusIndex`].
#[derive(Debug, Clone, Copy)]
pub struct IndexParams {
    /// Chunking limit, in approximate tokens.
    pub max_tokens: usize,
    /// Number of chunk texts per embedding request.
    pub batch_size: usize,
    /// Number of top-ranked passages handed to the generation provider.
    pub top_k: usize,
}

/// A queryable semantic index over one corpus.
pub struct CorpusIndex {
    corpus_tag: String,
    entries: Vec<IndexEntry>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerationProvider>,
    top_k: usize,
}

impl CorpusIndex {
    /// Chunk and embed `documents` into a queryable index.
    ///
    /// An empty document sequence yields a usable index whose answers
    /// report that no information is available.
    ///
    /// # Errors
    ///
    /// [`QaError::Retrieval`] when the embedding provider fails.
    pub async fn build(
        corpus_tag: impl Into<String>,
        documents: &[Document],
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
        params: IndexParams,
    ) -> Result<Self, QaError> {
        let corpus_tag = corpus_tag.into();

        let mut paths = Vec::new();
        let mut texts = Vec::new();
        for doc in documents {
            for chunk in chunk_text(&doc.content, params.max_tokens) {
                if chunk.trim().is_empty() {
                    continue;
                }
                paths.push(doc.path.clone());
                texts.push(chunk);
            }
        }

        let mut entries = Vec::with_capacity(texts.len());
        let batch_size = params.batch_size.max(1);

        for batch_start in (0..texts.len()).step_by(batch_size) {
            let batch = &texts[batch_start..(batch_start + batch_size).min(texts.len())];
            let vectors = embedder
                .embed_batch(batch)
                .await
                .map_err(QaError::Retrieval)?;

            if vectors.len() != batch.len() {
                return Err(QaError::Retrieval(anyhow::anyhow!(
                    "Embedding provider returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (offset, vector) in vectors.into_iter().enumerate() {
                let i = batch_start + offset;
                entries.push(IndexEntry {
                    path: paths[i].clone(),
                    text: texts[i].clone(),
                    vector,
                });
            }
        }

        Ok(Self {
            corpus_tag,
            entries,
            embedder,
            generator,
            top_k: params.top_k.max(1),
        })
    }

    /// The corpus this index was built from.
    pub fn corpus_tag(&self) -> &str {
        &self.corpus_tag
    }

    /// Number of indexed passages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer a question from this corpus.
    ///
    /// Embeds the question, ranks passages by cosine similarity, and
    /// synthesizes an answer from the top-k. Self-contained and read-only:
    /// independent queries need no ordering between them.
    ///
    /// # Errors
    ///
    /// [`QaError::Retrieval`] when the embedding or generation provider
    /// fails. An empty index never fails — it answers that no information
    /// is available, without invoking either provider.
    pub async fn query(&self, question: &str) -> Result<Answer, QaError> {
        if self.entries.is_empty() {
            return Ok(Answer {
                text: format!(
                    "No information available in the {} corpus.",
                    self.corpus_tag
                ),
                tool: self.corpus_tag.clone(),
                confidence: 0.0,
            });
        }

        let question_vec = embed_query(self.embedder.as_ref(), question)
            .await
            .map_err(QaError::Retrieval)?;

        let mut ranked: Vec<(f64, &IndexEntry)> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    cosine_similarity(&question_vec, &entry.vector) as f64,
                    entry,
                )
            })
            .collect();

        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(self.top_k);

        let confidence = ranked.first().map(|(score, _)| score.clamp(0.0, 1.0)).unwrap_or(0.0);

        let passages: Vec<String> = ranked
            .iter()
            .map(|(_, entry)| format!("[{}]\n{}", entry.path, entry.text))
            .collect();

        let text = self
            .generator
            .generate(question, &passages)
            .await
            .map_err(QaError::Retrieval)?;

        Ok(Answer {
            text,
            tool: self.corpus_tag.clone(),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Deterministic embedder: dimension 0 counts "alpha", dimension 1
    /// counts "beta".
    struct KeywordEmbedder;

    fn keyword_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        vec![
            lower.matches("alpha").count() as f32,
            lower.matches("beta").count() as f32,
        ]
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-stub"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| keyword_vector(t)).collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing-stub"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            anyhow::bail!("embedding provider down")
        }
    }

    /// Generator stub that records the passages it was handed.
    struct RecordingGenerator {
        calls: AtomicUsize,
        passages: Mutex<Vec<String>>,
    }

    impl RecordingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                passages: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for RecordingGenerator {
        fn model_name(&self) -> &str {
            "recording-stub"
        }
        async fn generate(&self, question: &str, passages: &[String]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.passages.lock().unwrap().extend_from_slice(passages);
            Ok(format!("answer to: {}", question))
        }
    }

    fn doc(path: &str, content: &str) -> Document {
        Document {
            corpus_tag: "repository".to_string(),
            path: path.to_string(),
            content: content.to_string(),
            source_url: None,
            updated_at: None,
        }
    }

    fn params() -> IndexParams {
        IndexParams {
            max_tokens: 700,
            batch_size: 2,
            top_k: 1,
        }
    }

    #[tokio::test]
    async fn test_empty_index_answers_without_providers() {
        let generator = Arc::new(RecordingGenerator::new());
        let index = CorpusIndex::build(
            "issues",
            &[],
            Arc::new(FailingEmbedder),
            generator.clone(),
            params(),
        )
        .await
        .unwrap();

        assert!(index.is_empty());
        let answer = index.query("anything at all?").await.unwrap();
        assert!(answer.text.contains("No information available"));
        assert!(answer.text.contains("issues"));
        assert_eq!(answer.confidence, 0.0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_query_retrieves_best_matching_passage() {
        let generator = Arc::new(RecordingGenerator::new());
        let docs = vec![
            doc("a.md", "Everything about alpha widgets."),
            doc("b.md", "Everything about beta gadgets."),
        ];
        let index = CorpusIndex::build(
            "repository",
            &docs,
            Arc::new(KeywordEmbedder),
            generator.clone(),
            params(),
        )
        .await
        .unwrap();

        assert_eq!(index.len(), 2);
        let answer = index.query("tell me about beta").await.unwrap();
        assert_eq!(answer.text, "answer to: tell me about beta");
        assert_eq!(answer.tool, "repository");
        assert!(answer.confidence > 0.9);

        let passages = generator.passages.lock().unwrap();
        assert_eq!(passages.len(), 1);
        assert!(passages[0].contains("[b.md]"));
        assert!(passages[0].contains("beta gadgets"));
    }

    #[tokio::test]
    async fn test_build_surfaces_embedding_failure() {
        let result = CorpusIndex::build(
            "repository",
            &[doc("a.md", "alpha")],
            Arc::new(FailingEmbedder),
            Arc::new(RecordingGenerator::new()),
            params(),
        )
        .await;

        assert!(matches!(result, Err(QaError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_query_surfaces_generation_failure() {
        struct FailingGenerator;

        #[async_trait]
        impl GenerationProvider for FailingGenerator {
            fn model_name(&self) -> &str {
                "failing-stub"
            }
            async fn generate(&self, _q: &str, _p: &[String]) -> Result<String> {
                anyhow::bail!("generation provider down")
            }
        }

        let index = CorpusIndex::build(
            "repository",
            &[doc("a.md", "alpha")],
            Arc::new(KeywordEmbedder),
            Arc::new(FailingGenerator),
            params(),
        )
        .await
        .unwrap();

        let err = index.query("alpha?").await.unwrap_err();
        assert!(matches!(err, QaError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_batching_covers_all_chunks() {
        let docs: Vec<Document> = (0..5)
            .map(|i| doc(&format!("{}.md", i), &format!("alpha number {}", i)))
            .collect();
        let index = CorpusIndex::build(
            "repository",
            &docs,
            Arc::new(KeywordEmbedder),
            Arc::new(RecordingGenerator::new()),
            params(),
        )
        .await
        .unwrap();

        assert_eq!(index.len(), 5);
    }
}
