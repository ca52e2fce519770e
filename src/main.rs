//! # Repo QA CLI (`rqa`)
//!
//! The `rqa` binary ingests a GitHub repository's content and issues,
//! builds a semantic index over each corpus, and starts an interactive
//! question loop that routes every question to the best-matching corpus.
//!
//! ## Usage
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! export OPENAI_API_KEY=sk-...
//! rqa --owner <owner> --repo-name <repo> [--branch <name> | --commit-sha <sha>]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Default branch ("main", falling back to "master" once)
//! rqa --owner octocat --repo-name hello-world
//!
//! # A specific branch
//! rqa --owner octocat --repo-name hello-world --branch develop
//!
//! # A pinned commit (never retried)
//! rqa --owner octocat --repo-name hello-world --commit-sha 4f2a91c
//!
//! # Restrict content and override the chat model
//! rqa --owner octocat --repo-name hello-world \
//!     --include-dirs src,docs --model gpt-4
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use repo_qa::config::{load_config, Config};
use repo_qa::connector_issues::{IssueReader, ISSUES_CORPUS};
use repo_qa::connector_repo::{RepoReader, REPO_CORPUS};
use repo_qa::embedding;
use repo_qa::error::QaError;
use repo_qa::generation;
use repo_qa::github::GithubClient;
use repo_qa::index::{CorpusIndex, IndexParams};
use repo_qa::ingest::{
    load_issue_corpus, load_repo_corpus, resolve_selector, FallbackPolicy,
    DEFAULT_PRIMARY_BRANCH,
};
use repo_qa::router::Router;
use repo_qa::session::run_session;
use repo_qa::tool::{CorpusQueryTool, QueryTool, ToolCatalog};

/// Ask questions about a GitHub repository's code, docs, and issues.
#[derive(Parser)]
#[command(
    name = "rqa",
    about = "Repo QA — ask questions about a GitHub repository's code, docs, and issues",
    version,
    long_about = "Repo QA ingests a repository's content and issue tracker into two semantic \
    indexes, then routes each question to the corpus most likely to answer it. Requires \
    GITHUB_TOKEN, plus OPENAI_API_KEY when using the default OpenAI providers."
)]
struct Cli {
    /// Repository owner (user or organization).
    #[arg(long)]
    owner: String,

    /// Repository name.
    #[arg(long)]
    repo_name: String,

    /// Branch to load content from.
    ///
    /// Defaults to "main" when neither --branch nor --commit-sha is given;
    /// a failed "main" load is retried once against "master". Mutually
    /// exclusive with --commit-sha.
    #[arg(long, conflicts_with = "commit_sha")]
    branch: Option<String>,

    /// Commit SHA to load content from. Never retried.
    #[arg(long)]
    commit_sha: Option<String>,

    /// Chat model for answer synthesis (overrides the config file).
    #[arg(long)]
    model: Option<String>,

    /// File extensions to ingest from the repository.
    #[arg(
        long,
        value_delimiter = ',',
        default_value = ".py,.md,.yml,.yaml,.txt,.ipynb"
    )]
    include_file_extensions: Vec<String>,

    /// Directory prefixes to ingest; empty means the whole tree.
    #[arg(long, value_delimiter = ',', default_value = "")]
    include_dirs: Vec<String>,

    /// Maximum concurrent file downloads.
    #[arg(long, default_value_t = 10)]
    concurrent_requests: usize,

    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print ingestion progress to stderr.
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    if let Some(model) = &cli.model {
        config.generation.model = model.clone();
    }

    // Credential check runs before any network activity
    let token = std::env::var("GITHUB_TOKEN")
        .map_err(|_| QaError::MissingCredential("GITHUB_TOKEN".to_string()))?;

    let branch = match (&cli.branch, &cli.commit_sha) {
        (None, None) => Some(DEFAULT_PRIMARY_BRANCH.to_string()),
        _ => cli.branch.clone(),
    };
    let reference = resolve_selector(branch, cli.commit_sha.clone())?;

    let embedder: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let generator: Arc<dyn generation::GenerationProvider> =
        Arc::from(generation::create_provider(&config.generation)?);

    let client = GithubClient::new(token)?;
    let include_dirs: Vec<String> = cli
        .include_dirs
        .iter()
        .filter(|d| !d.is_empty())
        .cloned()
        .collect();
    let repo_reader = RepoReader::new(
        client.clone(),
        &cli.owner,
        &cli.repo_name,
        include_dirs,
        cli.include_file_extensions.clone(),
        cli.concurrent_requests.max(1),
        cli.verbose,
    );
    let issue_reader = IssueReader::new(client, &cli.owner, &cli.repo_name, cli.verbose);

    let policy = FallbackPolicy::default();
    let (repo_docs, loaded_ref) = load_repo_corpus(
        &repo_reader,
        reference,
        &policy,
        &cli.owner,
        &cli.repo_name,
    )
    .await?;

    // A failed issues load degrades to an empty corpus, not a fatal error
    let issue_docs = match load_issue_corpus(&issue_reader, &cli.owner, &cli.repo_name).await {
        Ok(docs) => docs,
        Err(err) => {
            eprintln!("Warning: {:#}", anyhow::Error::from(err));
            Vec::new()
        }
    };

    let params = IndexParams {
        max_tokens: config.chunking.max_tokens,
        batch_size: config.embedding.batch_size,
        top_k: config.retrieval.top_k,
    };
    let repo_index = CorpusIndex::build(
        REPO_CORPUS,
        &repo_docs,
        embedder.clone(),
        generator.clone(),
        params,
    )
    .await?;
    let issue_index = CorpusIndex::build(
        ISSUES_CORPUS,
        &issue_docs,
        embedder.clone(),
        generator.clone(),
        params,
    )
    .await?;

    let tools: Vec<Box<dyn QueryTool>> = vec![
        Box::new(CorpusQueryTool::new(
            REPO_CORPUS,
            "Useful for questions related to the codebase or documentation.",
            repo_index,
        )),
        Box::new(CorpusQueryTool::new(
            ISSUES_CORPUS,
            "Useful for questions related to issues or code problems.",
            issue_index,
        )),
    ];
    let catalog = ToolCatalog::build(tools, embedder.as_ref()).await?;
    let router = Router::new(catalog, embedder, &config.routing);

    let prompt = format!(
        "Ask a question about {}/{} on {}: ",
        cli.owner, cli.repo_name, loaded_ref
    );
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    run_session(&router, stdin.lock(), &mut stdout, &prompt).await
}
