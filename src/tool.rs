//! Query tools and the catalog that indexes their descriptions.
//!
//! A [`QueryTool`] wraps one corpus index behind a short natural-language
//! capability description. The description is the *only* signal used for
//! routing, so it must disambiguate the tool from its siblings (e.g.
//! "codebase or documentation" vs "issues or code problems").
//!
//! The [`ToolCatalog`] is a secondary index over tool descriptions — not
//! over documents. It is built once, after every tool exists, and is
//! immutable thereafter.

use async_trait::async_trait;

use crate::embedding::{embed_query, EmbeddingProvider};
use crate::error::QaError;
use crate::index::CorpusIndex;
use crate::models::Answer;

/// The capability interface the router depends on.
///
/// The router reasons over `description()` and delegates execution to
/// `answer()`; it never depends on concrete tool identity.
#[async_trait]
pub trait QueryTool: Send + Sync {
    /// Stable tool name, used for provenance and error reporting.
    fn name(&self) -> &str;

    /// One-line capability description, used for routing.
    fn description(&self) -> &str;

    /// Answer a question from this tool's corpus.
    async fn answer(&self, question: &str) -> Result<Answer, QaError>;
}

/// A query tool backed by one [`CorpusIndex`].
///
/// `answer` is pure delegation to the wrapped index; retries belong to
/// the ingestion stage, not here.
pub struct CorpusQueryTool {
    name: String,
    description: String,
    index: CorpusIndex,
}

impl CorpusQueryTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        index: CorpusIndex,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            index,
        }
    }
}

#[async_trait]
impl QueryTool for CorpusQueryTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn answer(&self, question: &str) -> Result<Answer, QaError> {
        let mut answer = self.index.query(question).await?;
        answer.tool = self.name.clone();
        Ok(answer)
    }
}

/// An index over the descriptions of all registered tools.
///
/// Tools keep their registration order; vector `i` embeds the description
/// of tool `i`.
pub struct ToolCatalog {
    tools: Vec<Box<dyn QueryTool>>,
    description_vectors: Vec<Vec<f32>>,
}

impl ToolCatalog {
    /// Embed each tool's description and build the catalog.
    ///
    /// # Errors
    ///
    /// [`QaError::Retrieval`] when the embedding provider fails.
    pub async fn build(
        tools: Vec<Box<dyn QueryTool>>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, QaError> {
        let mut description_vectors = Vec::with_capacity(tools.len());
        for tool in &tools {
            let vector = embed_query(embedder, tool.description())
                .await
                .map_err(QaError::Retrieval)?;
            description_vectors.push(vector);
        }

        Ok(Self {
            tools,
            description_vectors,
        })
    }

    /// All registered tools, in registration order.
    pub fn tools(&self) -> &[Box<dyn QueryTool>] {
        &self.tools
    }

    /// The tool at catalog position `i`.
    pub fn tool(&self, i: usize) -> &dyn QueryTool {
        self.tools[i].as_ref()
    }

    /// Description embedding for the tool at catalog position `i`.
    pub fn description_vector(&self, i: usize) -> &[f32] {
        &self.description_vectors[i]
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}
