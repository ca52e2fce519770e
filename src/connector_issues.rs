//! Issue-tracker loader.
//!
//! Produces one [`Document`] per issue (title + body), walking the
//! paginated issues listing. Pull requests appear in the same listing and
//! are skipped.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::github::GithubClient;
use crate::ingest::IssueSource;
use crate::models::Document;

/// Corpus tag applied to every issue document.
pub const ISSUES_CORPUS: &str = "issues";

const PER_PAGE: usize = 100;

/// Loader for issue-tracker text.
pub struct IssueReader {
    client: GithubClient,
    owner: String,
    repo: String,
    verbose: bool,
}

impl IssueReader {
    pub fn new(
        client: GithubClient,
        owner: impl Into<String>,
        repo: impl Into<String>,
        verbose: bool,
    ) -> Self {
        Self {
            client,
            owner: owner.into(),
            repo: repo.into(),
            verbose,
        }
    }
}

#[async_trait]
impl IssueSource for IssueReader {
    async fn load(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page = 1usize;

        loop {
            let json = self
                .client
                .get_json(&format!(
                    "/repos/{}/{}/issues?state=all&per_page={}&page={}",
                    self.owner, self.repo, PER_PAGE, page
                ))
                .await?;

            let issues = json
                .as_array()
                .ok_or_else(|| anyhow!("Issues response is not an array"))?;

            for issue in issues {
                // The issues listing includes pull requests; skip them
                if issue.get("pull_request").is_some() {
                    continue;
                }
                if let Some(doc) = issue_to_document(issue) {
                    documents.push(doc);
                }
            }

            if issues.len() < PER_PAGE {
                break;
            }
            page += 1;
        }

        if self.verbose {
            eprintln!(
                "Loaded {} issues from {}/{}",
                documents.len(),
                self.owner,
                self.repo
            );
        }

        documents.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(documents)
    }
}

fn issue_to_document(issue: &serde_json::Value) -> Option<Document> {
    let number = issue.get("number")?.as_u64()?;
    let title = issue.get("title").and_then(|t| t.as_str()).unwrap_or("");
    let body = issue.get("body").and_then(|b| b.as_str()).unwrap_or("");
    let source_url = issue
        .get("html_url")
        .and_then(|u| u.as_str())
        .map(|u| u.to_string());
    let updated_at = issue
        .get("updated_at")
        .and_then(|u| u.as_str())
        .and_then(|u| u.parse::<DateTime<Utc>>().ok());

    let content = if body.is_empty() {
        title.to_string()
    } else {
        format!("{}\n\n{}", title, body)
    };

    Some(Document {
        corpus_tag: ISSUES_CORPUS.to_string(),
        path: format!("issues/{:06}", number),
        content,
        source_url,
        updated_at,
    })
}
