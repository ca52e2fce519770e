//! Corpus ingestion: loader traits, selector validation, and the
//! branch-fallback state machine.
//!
//! The primary (repository) corpus gets exactly one fallback attempt:
//! when the configured primary branch fails to load, the configured
//! fallback branch is tried once. The condition is evaluated on the
//! branch *name*, never on the error type, so the one-extra-attempt
//! budget holds for network errors, missing refs, and auth failures
//! alike. Commit-pinned loads never retry — a commit is not
//! substitutable. The issues corpus is a single attempt whose failure is
//! recoverable.

use anyhow::Result;
use async_trait::async_trait;

use crate::error::QaError;
use crate::models::{Document, GitRef};

/// Default primary branch name tried first.
pub const DEFAULT_PRIMARY_BRANCH: &str = "main";
/// Default branch substituted once when the primary fails to load.
pub const DEFAULT_FALLBACK_BRANCH: &str = "master";

/// A content source yielding repository documents for a git reference.
///
/// Implemented by [`RepoReader`](crate::connector_repo::RepoReader);
/// tests substitute stubs that record invocations.
#[async_trait]
pub trait RepoSource: Send + Sync {
    async fn load(&self, reference: &GitRef) -> Result<Vec<Document>>;
}

/// A content source yielding one document per issue.
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Document>>;
}

/// Branch substitution policy for the primary corpus.
#[derive(Debug, Clone)]
pub struct FallbackPolicy {
    /// Branch name that is eligible for one fallback attempt.
    pub primary: String,
    /// Branch name substituted when the primary fails.
    pub fallback: String,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_BRANCH.to_string(),
            fallback: DEFAULT_FALLBACK_BRANCH.to_string(),
        }
    }
}

/// Validate the branch/commit selectors and resolve them into a [`GitRef`].
///
/// Runs before any network or I/O activity. Exactly one selector must be
/// set; the CLI supplies the default branch when neither flag was given.
pub fn resolve_selector(
    branch: Option<String>,
    commit_sha: Option<String>,
) -> Result<GitRef, QaError> {
    match (branch, commit_sha) {
        (Some(_), Some(_)) | (None, None) => Err(QaError::InvalidSelector),
        (Some(branch), None) => Ok(GitRef::Branch(branch)),
        (None, Some(sha)) => Ok(GitRef::Commit(sha)),
    }
}

/// States of the primary-corpus load.
enum IngestState {
    Load(GitRef),
    Done(Vec<Document>, GitRef),
    Failed(anyhow::Error, GitRef),
}

/// Load the primary corpus, applying the one-shot branch fallback.
///
/// Returns the documents together with the reference they were actually
/// loaded from (the fallback branch, when it was used).
///
/// # Errors
///
/// [`QaError::ContentLoad`] naming owner/repo and the last attempted
/// reference, once the fallback budget is exhausted (or immediately for
/// commit-pinned and non-primary-branch references).
pub async fn load_repo_corpus(
    source: &dyn RepoSource,
    reference: GitRef,
    policy: &FallbackPolicy,
    owner: &str,
    repo: &str,
) -> Result<(Vec<Document>, GitRef), QaError> {
    let mut state = IngestState::Load(reference);

    loop {
        state = match state {
            IngestState::Load(reference) => match source.load(&reference).await {
                Ok(documents) => IngestState::Done(documents, reference),
                Err(err) => match reference {
                    // Only the primary default branch earns a fallback, and
                    // only when the fallback is a different name — the
                    // substituted branch can never re-enter this arm.
                    GitRef::Branch(name)
                        if name == policy.primary && policy.primary != policy.fallback =>
                    {
                        eprintln!(
                            "Warning: failed to load data from branch {}. Trying {}",
                            name, policy.fallback
                        );
                        IngestState::Load(GitRef::Branch(policy.fallback.clone()))
                    }
                    reference => IngestState::Failed(err, reference),
                },
            },
            IngestState::Done(documents, reference) => return Ok((documents, reference)),
            IngestState::Failed(err, reference) => {
                return Err(QaError::ContentLoad {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    reference: reference.to_string(),
                    source: err,
                })
            }
        };
    }
}

/// Load the issues corpus: a single attempt, no fallback.
///
/// Failure is terminal for this corpus only; the caller degrades to an
/// empty issues index and keeps the session alive.
pub async fn load_issue_corpus(
    source: &dyn IssueSource,
    owner: &str,
    repo: &str,
) -> Result<Vec<Document>, QaError> {
    source.load().await.map_err(|err| QaError::IssueLoad {
        owner: owner.to_string(),
        repo: repo.to_string(),
        source: err,
    })
}
