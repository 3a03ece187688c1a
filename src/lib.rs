//! # Agent Readiness Score
//!
//! Static analysis engine that rates how amenable a codebase is to
//! autonomous AI coding agents. A scan walks a repository, parses Go,
//! Python, and TypeScript/JavaScript sources with tree-sitter, runs five
//! independent analyzers, and fuses their raw metrics into a composite
//! 1-10 score with a tier classification.
//!
//! ## Pipeline
//!
//! ```text
//! root_dir -> DiscoveryResult -> ParsedBundle -> [AnalysisResult] -> ScoredResult
//! ```
//!
//! - **Discovery** walks the tree, classifies files by language and role,
//!   and honors ignore rules.
//! - **Parsing** produces tree-sitter syntax trees per language.
//! - **Analysis** runs the C1 (code health), C3 (architecture), C4
//!   (documentation), C5 (temporal dynamics), and C6 (testing) analyzers
//!   concurrently; per-analyzer failures never abort the run.
//! - **Scoring** normalizes every raw metric onto a 1-10 scale, aggregates
//!   by configured weights, and assigns a tier.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use agentready::core::config::ArsConfig;
//! use agentready::core::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::new(ArsConfig::default());
//!     let report = pipeline.run("./my-repo").await?;
//!     println!("{} ({})", report.scored.composite, report.scored.tier);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

// Core engine modules
pub mod core {
    //! Core pipeline, configuration, scoring, and error types.

    pub mod config;
    pub mod errors;
    pub mod pipeline;
    pub mod progress;
    pub mod scoring;
}

// File discovery and classification
pub mod discovery;

// Language-specific parsing adapters
pub mod lang {
    //! Language-specific parsing and AST vocabulary.

    pub mod common;
    pub mod go;
    pub mod python;
    pub mod registry;
    pub mod typescript;

    pub use common::{AnalysisTarget, Language, LanguageSpec, ParsedBundle, ParsedFile};
    pub use registry::{parser_for, spec_for};
}

// Category analyzers
pub mod analyzers {
    //! The five static analyzers and their shared helpers.

    pub mod architecture;
    pub mod code_health;
    pub mod common;
    pub mod coverage;
    pub mod documentation;
    pub mod duplication;
    pub mod imports;
    pub mod temporal;
    pub mod testing;

    pub use common::{
        AgentEvaluator, AnalysisResult, Analyzer, AnalyzerContext, Category, CategoryMetrics,
    };
}

// Report rendering
pub mod io {
    //! Output rendering: terminal, JSON, HTML, badge.

    pub mod reports;
}

// Convenient re-exports for library consumers
pub use crate::analyzers::{AnalysisResult, Category};
pub use crate::core::config::ArsConfig;
pub use crate::core::errors::{ArsError, Result};
pub use crate::core::pipeline::{AnalysisReport, Pipeline};
pub use crate::core::scoring::{ScoredResult, Tier};
pub use crate::discovery::{DiscoveryResult, FileClass, SourceFile};
pub use crate::lang::Language;

/// Crate version, as compiled.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
