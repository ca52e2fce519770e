//! Core data models used throughout repo-qa.
//!
//! These types represent the documents, references, and answers that flow
//! through the ingestion and question-answering pipeline.

use chrono::{DateTime, Utc};

/// Immutable unit of ingested text produced by a corpus loader.
///
/// Owned by the [`CorpusIndex`](crate::index::CorpusIndex) that embeds it;
/// never mutated after creation.
#[derive(Debug, Clone)]
pub struct Document {
    /// Which corpus this document belongs to (e.g. `"repository"`, `"issues"`).
    pub corpus_tag: String,
    /// Path or identifier within the corpus (file path, `issues/<number>`).
    pub path: String,
    /// The document body text.
    pub content: String,
    /// Web-browsable URL for the source, when one exists.
    pub source_url: Option<String>,
    /// Last-modified time, when the source reports one.
    pub updated_at: Option<DateTime<Utc>>,
}

/// A git reference identifying which repository snapshot to load.
///
/// Exactly one of branch or commit — the two are mutually exclusive by
/// construction. See [`resolve_selector`](crate::ingest::resolve_selector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Branch(String),
    Commit(String),
}

impl std::fmt::Display for GitRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GitRef::Branch(name) => write!(f, "branch {}", name),
            GitRef::Commit(sha) => write!(f, "commit {}", sha),
        }
    }
}

/// A synthesized answer plus its provenance.
///
/// Exists only for the duration of one question/answer cycle.
#[derive(Debug, Clone)]
pub struct Answer {
    /// The synthesized answer text.
    pub text: String,
    /// Name of the tool (and therefore corpus) that produced the answer.
    pub tool: String,
    /// Best retrieval similarity observed while answering, in [0, 1].
    /// Zero for answers produced without retrieval (empty corpus).
    pub confidence: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_ref_display() {
        assert_eq!(GitRef::Branch("main".to_string()).to_string(), "branch main");
        assert_eq!(
            GitRef::Commit("abc123".to_string()).to_string(),
            "commit abc123"
        );
    }
}
