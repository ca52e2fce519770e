//! Repository content loader.
//!
//! Produces one [`Document`] per repository file at a given branch or
//! commit. Workflow:
//! 1. Resolve a branch name to its head commit SHA (commits are used as-is).
//! 2. List the full tree recursively.
//! 3. Apply directory-prefix and file-extension allow-lists.
//! 4. Fetch blobs with bounded concurrency and decode their base64 payloads.
//! 5. Sort by path, so index contents never depend on completion order.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::github::GithubClient;
use crate::ingest::RepoSource;
use crate::models::{Document, GitRef};

/// Corpus tag applied to every repository document.
pub const REPO_CORPUS: &str = "repository";

/// Loader for repository source and documentation files.
pub struct RepoReader {
    client: GithubClient,
    owner: String,
    repo: String,
    /// Directory-prefix allow-list; empty means no restriction.
    include_dirs: Vec<String>,
    /// File-extension allow-list (with leading dot); empty means no restriction.
    include_extensions: Vec<String>,
    concurrent_requests: usize,
    verbose: bool,
}

impl RepoReader {
    pub fn new(
        client: GithubClient,
        owner: impl Into<String>,
        repo: impl Into<String>,
        include_dirs: Vec<String>,
        include_extensions: Vec<String>,
        concurrent_requests: usize,
        verbose: bool,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            include_dirs,
            include_extensions,
            concurrent_requests: concurrent_requests.max(1),
            verbose,
        }
    }

    /// Resolve a git reference to a concrete commit SHA.
    async fn resolve_commit(&self, reference: &GitRef) -> Result<String> {
        match reference {
            GitRef::Commit(sha) => Ok(sha.clone()),
            GitRef::Branch(name) => {
                let json = self
                    .client
                    .get_json(&format!(
                        "/repos/{}/{}/branches/{}",
                        self.owner, self.repo, name
                    ))
                    .await?;
                json.get("commit")
                    .and_then(|c| c.get("sha"))
                    .and_then(|s| s.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| anyhow!("Branch response missing commit sha"))
            }
        }
    }

    /// List blob paths and SHAs for the tree at `commit_sha`, filtered.
    async fn list_tree(&self, commit_sha: &str) -> Result<Vec<(String, String)>> {
        let json = self
            .client
            .get_json(&format!(
                "/repos/{}/{}/git/trees/{}?recursive=1",
                self.owner, self.repo, commit_sha
            ))
            .await?;

        let tree = json
            .get("tree")
            .and_then(|t| t.as_array())
            .ok_or_else(|| anyhow!("Tree response missing tree array"))?;

        let mut entries = Vec::new();
        for entry in tree {
            let entry_type = entry.get("type").and_then(|t| t.as_str()).unwrap_or("");
            if entry_type != "blob" {
                continue;
            }
            let path = match entry.get("path").and_then(|p| p.as_str()) {
                Some(p) => p,
                None => continue,
            };
            let sha = match entry.get("sha").and_then(|s| s.as_str()) {
                Some(s) => s,
                None => continue,
            };
            if !self.path_allowed(path) {
                continue;
            }
            entries.push((path.to_string(), sha.to_string()));
        }

        Ok(entries)
    }

    fn path_allowed(&self, path: &str) -> bool {
        if !self.include_dirs.is_empty()
            && !self
                .include_dirs
                .iter()
                .any(|dir| path.starts_with(&format!("{}/", dir.trim_end_matches('/'))))
        {
            return false;
        }

        if !self.include_extensions.is_empty()
            && !self.include_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
        {
            return false;
        }

        true
    }

    /// Fetch and decode one blob into a [`Document`].
    async fn fetch_blob(&self, commit_sha: &str, path: String, blob_sha: String) -> Result<Document> {
        let json = self
            .client
            .get_json(&format!(
                "/repos/{}/{}/git/blobs/{}",
                self.owner, self.repo, blob_sha
            ))
            .await?;

        let encoded = json
            .get("content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| anyhow!("Blob response missing content: {}", path))?;

        // The blobs API base64 payload is newline-wrapped
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact.as_bytes())
            .with_context(|| format!("Invalid base64 blob content: {}", path))?;
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let source_url = format!(
            "https://github.com/{}/{}/blob/{}/{}",
            self.owner, self.repo, commit_sha, path
        );

        Ok(Document {
            corpus_tag: REPO_CORPUS.to_string(),
            path,
            content,
            source_url: Some(source_url),
            updated_at: None,
        })
    }
}

#[async_trait]
impl RepoSource for RepoReader {
    async fn load(&self, reference: &GitRef) -> Result<Vec<Document>> {
        let commit_sha = self.resolve_commit(reference).await?;
        let entries = self.list_tree(&commit_sha).await?;

        if self.verbose {
            eprintln!(
                "Loading {} files from {}/{} at {}",
                entries.len(),
                self.owner,
                self.repo,
                reference
            );
        }

        let mut documents: Vec<Document> = stream::iter(entries.into_iter().map(|(path, sha)| {
            let commit_sha = commit_sha.clone();
            async move { self.fetch_blob(&commit_sha, path, sha).await }
        }))
        .buffer_unordered(self.concurrent_requests)
        .try_collect()
        .await?;

        // Deterministic regardless of fetch completion order
        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }
}
