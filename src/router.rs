//! Question routing over the tool catalog.
//!
//! The router embeds a question, performs nearest-neighbor search over the
//! tool *description* embeddings, and delegates execution to the selected
//! tool(s). Cost per question is O(1) corpus queries, not O(number of
//! corpora): a tool that was not selected is never queried.
//!
//! Selection is deterministic: the top-ranked tool wins, with ties broken
//! by catalog insertion order. With `routing.multiplex` enabled, every
//! tool scoring within the closeness threshold of the best is queried and
//! the highest-confidence answer is returned.

use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::error::QaError;
use crate::models::Answer;
use crate::tool::ToolCatalog;

/// Routes questions to the best-matching tool in a [`ToolCatalog`].
///
/// Immutable after construction; safe to share across reads.
pub struct Router {
    catalog: ToolCatalog,
    embedder: Arc<dyn EmbeddingProvider>,
    closeness_threshold: f64,
    multiplex: bool,
}

impl Router {
    pub fn new(
        catalog: ToolCatalog,
        embedder: Arc<dyn EmbeddingProvider>,
        routing: &RoutingConfig,
    ) -> Self {
        Self {
            catalog,
            embedder,
            closeness_threshold: routing.closeness_threshold,
            multiplex: routing.multiplex,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    /// Select the tool(s) that should answer `question`.
    ///
    /// Returns catalog positions in insertion order. A single-tool catalog
    /// short-circuits without embedding the question.
    ///
    /// # Errors
    ///
    /// [`QaError::NoToolsAvailable`] for an empty catalog;
    /// [`QaError::Retrieval`] when embedding the question fails.
    pub async fn route(&self, question: &str) -> Result<Vec<usize>, QaError> {
        if self.catalog.is_empty() {
            return Err(QaError::NoToolsAvailable);
        }
        if self.catalog.len() == 1 {
            return Ok(vec![0]);
        }

        let question_vec = embed_query(self.embedder.as_ref(), question)
            .await
            .map_err(QaError::Retrieval)?;

        let scores: Vec<f64> = (0..self.catalog.len())
            .map(|i| {
                cosine_similarity(&question_vec, self.catalog.description_vector(i)) as f64
            })
            .collect();

        // Strict-greater comparison: first-registered wins ties
        let mut best = 0usize;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best] {
                best = i;
            }
        }

        if !self.multiplex {
            return Ok(vec![best]);
        }

        let selected: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|(_, score)| scores[best] - **score <= self.closeness_threshold)
            .map(|(i, _)| i)
            .collect();

        Ok(selected)
    }

    /// Route `question` and execute the selected tool(s).
    ///
    /// The default policy queries exactly one tool. Under multiplexing,
    /// every selected tool is queried and the answer with the highest
    /// confidence wins (first-registered on ties). A selected tool's
    /// failure surfaces as [`QaError::ToolExecution`] naming that tool —
    /// there is no fallback to a different tool.
    pub async fn answer(&self, question: &str) -> Result<Answer, QaError> {
        let selected = self.route(question).await?;

        let mut best: Option<Answer> = None;
        for i in selected {
            let tool = self.catalog.tool(i);
            let answer = tool.answer(question).await.map_err(|err| {
                QaError::ToolExecution {
                    tool: tool.name().to_string(),
                    source: Box::new(err),
                }
            })?;

            best = match best {
                Some(current) if current.confidence >= answer.confidence => Some(current),
                _ => Some(answer),
            };
        }

        // route() never returns an empty selection for a non-empty catalog
        best.ok_or(QaError::NoToolsAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Answer;
    use crate::tool::QueryTool;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic embedder: dimension 0 scores repository-flavored
    /// text, dimension 1 scores issue-flavored text.
    struct TopicEmbedder {
        calls: AtomicUsize,
    }

    impl TopicEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    fn topic_vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let issues = ["issue", "issues", "problem", "bug"]
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count() as f32;
        let code = ["codebase", "documentation", "code", "configure"]
            .iter()
            .filter(|kw| lower.contains(*kw))
            .count() as f32;
        if issues == 0.0 && code == 0.0 {
            // Unrecognized text leans toward the code corpus
            vec![1.0, 0.0]
        } else {
            vec![code, issues]
        }
    }

    #[async_trait]
    impl EmbeddingProvider for TopicEmbedder {
        fn model_name(&self) -> &str {
            "topic-stub"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts.iter().map(|t| topic_vector(t)).collect())
        }
    }

    /// Embedder that maps every text to the same vector — all scores tie.
    struct ConstantEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ConstantEmbedder {
        fn model_name(&self) -> &str {
            "constant-stub"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 1.0]).collect())
        }
    }

    struct StubTool {
        name: String,
        description: String,
        confidence: f64,
        fail: bool,
        calls: AtomicUsize,
    }

    impl StubTool {
        fn boxed(name: &str, description: &str, confidence: f64) -> Box<dyn QueryTool> {
            Box::new(Self {
                name: name.to_string(),
                description: description.to_string(),
                confidence,
                fail: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str, description: &str) -> Box<dyn QueryTool> {
            Box::new(Self {
                name: name.to_string(),
                description: description.to_string(),
                confidence: 0.0,
                fail: true,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl QueryTool for StubTool {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            &self.description
        }
        async fn answer(&self, question: &str) -> std::result::Result<Answer, QaError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(QaError::Retrieval(anyhow::anyhow!("provider down")));
            }
            Ok(Answer {
                text: format!("{}: {}", self.name, question),
                tool: self.name.clone(),
                confidence: self.confidence,
            })
        }
    }

    fn two_tool_catalog() -> Vec<Box<dyn QueryTool>> {
        vec![
            StubTool::boxed(
                "repository",
                "Useful for questions related to the codebase or documentation.",
                0.9,
            ),
            StubTool::boxed(
                "issues",
                "Useful for questions related to issues or code problems.",
                0.8,
            ),
        ]
    }

    async fn router_with(
        tools: Vec<Box<dyn QueryTool>>,
        embedder: Arc<dyn EmbeddingProvider>,
        routing: RoutingConfig,
    ) -> Router {
        let catalog = ToolCatalog::build(tools, embedder.as_ref()).await.unwrap();
        Router::new(catalog, embedder, &routing)
    }

    #[tokio::test]
    async fn test_empty_catalog_no_tools_available() {
        let router = router_with(
            Vec::new(),
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        let err = router.route("anything?").await.unwrap_err();
        assert!(matches!(err, QaError::NoToolsAvailable));
    }

    #[tokio::test]
    async fn test_single_tool_always_selected_without_embedding() {
        let embedder = Arc::new(TopicEmbedder::new());
        let router = router_with(
            vec![StubTool::boxed("repository", "the only tool", 1.0)],
            embedder.clone(),
            RoutingConfig::default(),
        )
        .await;
        let calls_after_build = embedder.calls.load(Ordering::SeqCst);

        let selected = router.route("anything, on any topic").await.unwrap();
        assert_eq!(selected, vec![0]);
        // Degenerate single-tool routing never embeds the question
        assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build);
    }

    #[tokio::test]
    async fn test_route_returns_registered_tool() {
        let router = router_with(
            two_tool_catalog(),
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        for question in [
            "How do I configure the embedding model?",
            "Why does issue #42 fail on load?",
            "completely unrelated text",
        ] {
            let selected = router.route(question).await.unwrap();
            assert_eq!(selected.len(), 1);
            assert!(selected[0] < router.catalog().len());
        }
    }

    #[tokio::test]
    async fn test_topic_questions_route_to_matching_tool() {
        let router = router_with(
            two_tool_catalog(),
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        let answer = router
            .answer("How do I configure the embedding model?")
            .await
            .unwrap();
        assert_eq!(answer.tool, "repository");

        let answer = router
            .answer("Why does issue #42 fail on load?")
            .await
            .unwrap();
        assert_eq!(answer.tool, "issues");
    }

    #[tokio::test]
    async fn test_route_idempotent() {
        let router = router_with(
            two_tool_catalog(),
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        let first = router.route("Why does the loader break?").await.unwrap();
        let second = router.route("Why does the loader break?").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_tie_broken_by_insertion_order() {
        let router = router_with(
            two_tool_catalog(),
            Arc::new(ConstantEmbedder),
            RoutingConfig::default(),
        )
        .await;

        let selected = router.route("ambiguous question").await.unwrap();
        assert_eq!(selected, vec![0], "first-registered tool wins ties");
    }

    #[tokio::test]
    async fn test_unselected_tool_never_queried() {
        let tools = vec![
            StubTool::boxed(
                "repository",
                "Useful for questions related to the codebase or documentation.",
                0.9,
            ),
            StubTool::failing(
                "issues",
                "Useful for questions related to issues or code problems.",
            ),
        ];
        let router = router_with(
            tools,
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        // Routes to "repository"; the failing issues tool must not run
        let answer = router
            .answer("How do I configure the documentation build?")
            .await
            .unwrap();
        assert_eq!(answer.tool, "repository");
    }

    #[tokio::test]
    async fn test_selected_tool_failure_surfaces_unchanged() {
        let tools = vec![
            StubTool::failing(
                "repository",
                "Useful for questions related to the codebase or documentation.",
            ),
            StubTool::boxed(
                "issues",
                "Useful for questions related to issues or code problems.",
                0.8,
            ),
        ];
        let router = router_with(
            tools,
            Arc::new(TopicEmbedder::new()),
            RoutingConfig::default(),
        )
        .await;

        let err = router
            .answer("How do I configure the codebase?")
            .await
            .unwrap_err();
        // No fallback to the healthy issues tool
        assert!(matches!(
            err,
            QaError::ToolExecution { ref tool, .. } if tool == "repository"
        ));
    }

    #[tokio::test]
    async fn test_multiplex_selects_close_scores() {
        let routing = RoutingConfig {
            closeness_threshold: 0.5,
            multiplex: true,
        };
        let router = router_with(two_tool_catalog(), Arc::new(ConstantEmbedder), routing).await;

        let selected = router.route("ambiguous question").await.unwrap();
        assert_eq!(selected, vec![0, 1]);

        // Both are queried; the repository tool's higher confidence wins
        let answer = router.answer("ambiguous question").await.unwrap();
        assert_eq!(answer.tool, "repository");
    }

    #[tokio::test]
    async fn test_multiplex_highest_confidence_wins() {
        let tools = vec![
            StubTool::boxed("first", "one description", 0.3),
            StubTool::boxed("second", "another description", 0.7),
        ];
        let routing = RoutingConfig {
            closeness_threshold: 0.5,
            multiplex: true,
        };
        let router = router_with(tools, Arc::new(ConstantEmbedder), routing).await;

        let answer = router.answer("ambiguous question").await.unwrap();
        assert_eq!(answer.tool, "second");
    }
}
