//! Typed error kinds for the question-answering pipeline.
//!
//! Each variant names the stage that failed, carrying the underlying
//! cause where one exists. Callers match on the kind to decide whether a
//! failure is fatal (content load, bad selector) or recoverable (issue
//! load, a single question failing mid-session).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Debug, Error)]
pub enum QaError {
    /// Both or neither of the branch/commit selectors were supplied.
    #[error("Exactly one of --branch or --commit-sha must be set")]
    InvalidSelector,

    /// A required environment credential is not set.
    #[error("Missing required credential: {0} is not set")]
    MissingCredential(String),

    /// The repository content corpus could not be loaded.
    #[error("Failed to load content from {owner}/{repo} at {reference}")]
    ContentLoad {
        owner: String,
        repo: String,
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    /// The issues corpus could not be loaded. Recoverable: the session
    /// degrades to an empty issues index.
    #[error("Failed to load issues from {owner}/{repo}")]
    IssueLoad {
        owner: String,
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    /// An embedding or generation provider call failed.
    #[error("Retrieval failed")]
    Retrieval(#[source] anyhow::Error),

    /// The tool catalog is empty; no corpus can answer anything.
    #[error("No query tools are available")]
    NoToolsAvailable,

    /// A routed tool failed while answering a question.
    #[error("Tool '{tool}' failed to answer")]
    ToolExecution {
        tool: String,
        #[source]
        source: Box<QaError>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_load_names_repo_and_reference() {
        let err = QaError::ContentLoad {
            owner: "octo".to_string(),
            repo: "project".to_string(),
            reference: "branch main".to_string(),
            source: anyhow::anyhow!("404 Not Found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("octo/project"));
        assert!(msg.contains("branch main"));
    }

    #[test]
    fn test_missing_credential_names_variable() {
        let msg = QaError::MissingCredential("GITHUB_TOKEN".to_string()).to_string();
        assert!(msg.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_tool_execution_wraps_cause() {
        let err = QaError::ToolExecution {
            tool: "issues".to_string(),
            source: Box::new(QaError::Retrieval(anyhow::anyhow!("provider down"))),
        };
        assert!(err.to_string().contains("issues"));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("Retrieval failed"));
    }
}
