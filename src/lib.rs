//! # Repo QA
//!
//! A question-answering router over a GitHub repository.
//!
//! Repo QA ingests two corpora from a repository (source files plus
//! documentation, and the issue tracker), builds an in-memory semantic
//! index over each, wraps each index as a described query tool, and
//! routes natural-language questions to the best-matching tool by
//! embedding similarity over the tool descriptions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Connectors  │──▶│   Ingest    │──▶│ CorpusIndex │
//! │ repo/issues  │   │ Chunk+Embed │   │  (per corpus)│
//! └──────────────┘   └─────────────┘   └──────┬──────┘
//!                                             │
//!                                      ┌──────▼──────┐
//!                                      │  QueryTool  │
//!                                      └──────┬──────┘
//!                                             │
//!                    ┌────────────┐    ┌──────▼──────┐
//!                    │  Session   │◀──▶│   Router    │
//!                    │   (rqa)    │    │ ToolCatalog │
//!                    └────────────┘    └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GITHUB_TOKEN=ghp_...
//! export OPENAI_API_KEY=sk-...
//! rqa --owner octocat --repo-name hello-world
//! rqa --owner octocat --repo-name hello-world --branch develop
//! rqa --owner octocat --repo-name hello-world --commit-sha 4f2a91c
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Typed error kinds |
//! | [`models`] | Core data types |
//! | [`github`] | GitHub REST API client |
//! | [`connector_repo`] | Repository content loader |
//! | [`connector_issues`] | Issue tracker loader |
//! | [`ingest`] | Selector validation and branch fallback |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Answer synthesis providers |
//! | [`index`] | In-memory semantic index per corpus |
//! | [`tool`] | Query tools and the tool catalog |
//! | [`router`] | Question routing and delegation |
//! | [`session`] | Interactive question loop |

pub mod chunk;
pub mod config;
pub mod connector_issues;
pub mod connector_repo;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod github;
pub mod index;
pub mod ingest;
pub mod models;
pub mod router;
pub mod session;
pub mod tool;
