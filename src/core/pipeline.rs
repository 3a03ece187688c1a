//! Analysis pipeline orchestration.
//!
//! Runs the fixed stage sequence — discovery, parsing, concurrent
//! analysis, scoring — with progress events at every transition and
//! cooperative cancellation. Per-analyzer failures are captured on the
//! failing analyzer's result and never abort peers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::analyzers::architecture::ArchitectureAnalyzer;
use crate::analyzers::code_health::CodeHealthAnalyzer;
use crate::analyzers::common::{
    AgentEvaluator, AnalysisResult, Analyzer, AnalyzerContext, Category, CategoryMetrics,
    Hotspot,
};
use crate::analyzers::documentation::DocumentationAnalyzer;
use crate::analyzers::temporal::TemporalAnalyzer;
use crate::analyzers::testing::TestingAnalyzer;
use crate::core::config::ArsConfig;
use crate::core::errors::{ArsError, Result};
use crate::core::progress::{report, ProgressSink, Stage};
use crate::core::scoring::{score_results, ScoredResult};
use crate::discovery::{discover, DiscoveryResult, FileClass};
use crate::lang::common::AnalysisTarget;
use crate::lang::registry::parse_target;
use crate::lang::ParsedBundle;

/// Complete output of one scan.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    /// Discovery stage output.
    pub discovery: DiscoveryResult,
    /// Per-analyzer results, sorted by category.
    pub results: Vec<AnalysisResult>,
    /// Fused score.
    pub scored: ScoredResult,
    /// Wall-clock duration of the scan, milliseconds.
    pub duration_ms: u64,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    /// Tool version.
    pub version: String,
}

/// The analysis pipeline.
pub struct Pipeline {
    config: Arc<ArsConfig>,
    agent_evaluator: Option<Arc<dyn AgentEvaluator>>,
}

impl Pipeline {
    /// Create a pipeline with the given configuration.
    pub fn new(config: ArsConfig) -> Self {
        Self {
            config: Arc::new(config),
            agent_evaluator: None,
        }
    }

    /// Attach an optional live agent evaluator (C7).
    #[must_use]
    pub fn with_agent_evaluator(mut self, evaluator: Arc<dyn AgentEvaluator>) -> Self {
        self.agent_evaluator = Some(evaluator);
        self
    }

    /// Run a scan with no progress sink and no external cancellation.
    pub async fn run(&self, root: impl AsRef<Path>) -> Result<AnalysisReport> {
        self.run_with(root.as_ref(), None, CancellationToken::new())
            .await
    }

    /// Run a scan, reporting stage transitions and honoring
    /// cancellation. On cancellation all partial results are discarded
    /// and every parse tree is released before returning.
    pub async fn run_with(
        &self,
        root: &Path,
        progress: Option<ProgressSink>,
        cancel: CancellationToken,
    ) -> Result<AnalysisReport> {
        let started = Instant::now();

        report(progress.as_ref(), Stage::Discovery, "walking file tree");
        let discovery = {
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || discover(&root))
                .await
                .map_err(|err| ArsError::pipeline("discovery", err.to_string()))??
        };
        check_cancelled(&cancel)?;

        report(
            progress.as_ref(),
            Stage::Parse,
            &format!("{} files discovered", discovery.files.len()),
        );
        let bundle = {
            let targets = build_targets(&discovery);
            tokio::task::spawn_blocking(move || parse_targets(targets))
                .await
                .map_err(|err| ArsError::pipeline("parse", err.to_string()))??
        };
        check_cancelled(&cancel)?;

        report(
            progress.as_ref(),
            Stage::Analyze,
            &format!("{} files parsed", bundle.file_count()),
        );
        let mut results = self
            .run_analyzers(
                Arc::new(ParsedBundle {
                    root: discovery.root.clone(),
                    languages: bundle.languages,
                }),
                &cancel,
            )
            .await?;
        check_cancelled(&cancel)?;

        cross_reference_hotspots(&mut results, &self.config);

        if let Some(evaluator) = &self.agent_evaluator {
            results.push(run_agent_eval(evaluator.as_ref(), &discovery.root).await);
        }
        results.sort_by_key(|result| result.category);

        report(progress.as_ref(), Stage::Score, "fusing metrics");
        let scored = score_results(&results, &self.config);

        report(
            progress.as_ref(),
            Stage::Render,
            &format!("composite {:.1}", scored.composite),
        );

        Ok(AnalysisReport {
            discovery,
            results,
            scored,
            duration_ms: started.elapsed().as_millis() as u64,
            generated_at: chrono::Utc::now().to_rfc3339(),
            version: crate::VERSION.to_string(),
        })
    }

    /// Run the five static analyzers concurrently over the shared
    /// bundle. The bundle (and every parse tree it owns) drops before
    /// this function returns, on success and error paths alike.
    async fn run_analyzers(
        &self,
        bundle: Arc<ParsedBundle>,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnalysisResult>> {
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(CodeHealthAnalyzer),
            Arc::new(ArchitectureAnalyzer),
            Arc::new(DocumentationAnalyzer),
            Arc::new(TemporalAnalyzer),
            Arc::new(TestingAnalyzer),
        ];

        let handles: Vec<_> = analyzers
            .into_iter()
            .map(|analyzer| {
                let bundle = Arc::clone(&bundle);
                let ctx = AnalyzerContext {
                    config: Arc::clone(&self.config),
                    cancel: cancel.clone(),
                };
                tokio::spawn(async move {
                    let category = analyzer.category();
                    (category, analyzer.analyze(bundle, ctx).await)
                })
            })
            .collect();

        let mut results = Vec::new();
        for joined in join_all(handles).await {
            match joined {
                Ok((_, Ok(output))) => {
                    results.push(AnalysisResult::ok(output.metrics, output.warnings));
                }
                Ok((_, Err(err))) if err.is_cancelled() => return Err(ArsError::Cancelled),
                Ok((category, Err(err))) => {
                    warn!(category = category.id(), error = %err, "analyzer failed");
                    results.push(AnalysisResult::failed(category, err.to_string()));
                }
                Err(join_error) => {
                    // A panicking analyzer is isolated like any failure;
                    // its category falls back to the substitute score.
                    warn!(error = %join_error, "analyzer task aborted");
                }
            }
        }
        Ok(results)
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ArsError::Cancelled)
    } else {
        Ok(())
    }
}

/// One target per language present, with source- and test-role files.
fn build_targets(discovery: &DiscoveryResult) -> Vec<AnalysisTarget> {
    discovery
        .languages_present()
        .into_iter()
        .map(|language| AnalysisTarget {
            language,
            root: discovery.root.clone(),
            files: discovery
                .files
                .iter()
                .filter(|file| {
                    file.language == language
                        && matches!(file.class, FileClass::Source | FileClass::Test)
                })
                .cloned()
                .collect(),
        })
        .collect()
}

fn parse_targets(targets: Vec<AnalysisTarget>) -> Result<ParsedBundle> {
    let mut bundle = ParsedBundle {
        root: PathBuf::new(),
        languages: Vec::new(),
    };
    for target in &targets {
        bundle.root.clone_from(&target.root);
        bundle.languages.push(parse_target(target)?);
    }
    Ok(bundle)
}

/// Derive C5 hotspots from C5 churn and C1 per-file max complexity.
/// Runs after the analyzer join so the analyzers stay independent.
fn cross_reference_hotspots(results: &mut [AnalysisResult], config: &ArsConfig) {
    let mut file_complexity: std::collections::BTreeMap<String, u32> =
        std::collections::BTreeMap::new();
    for result in results.iter() {
        if let Some(CategoryMetrics::CodeHealth(metrics)) = &result.metrics {
            for function in &metrics.functions {
                let entry = file_complexity.entry(function.file.clone()).or_default();
                *entry = (*entry).max(function.cyclomatic);
            }
        }
    }

    for result in results.iter_mut() {
        let Some(CategoryMetrics::Temporal(metrics)) = &mut result.metrics else {
            continue;
        };
        if !metrics.history_available || metrics.commit_counts.is_empty() {
            continue;
        }

        let mut counts: Vec<usize> = metrics.commit_counts.values().copied().collect();
        counts.sort_unstable();
        let p80_index = ((counts.len() as f64 * 0.8) as usize).min(counts.len() - 1);
        let p80 = counts[p80_index];

        metrics.hotspots = metrics
            .commit_counts
            .iter()
            .filter_map(|(file, &commit_count)| {
                let max_complexity = file_complexity.get(file).copied().unwrap_or(0);
                (commit_count > p80
                    && max_complexity > config.temporal.hotspot_complexity_threshold)
                    .then(|| Hotspot {
                        file: file.clone(),
                        commit_count,
                        max_complexity,
                    })
            })
            .collect();
    }
}

async fn run_agent_eval(evaluator: &dyn AgentEvaluator, root: &Path) -> AnalysisResult {
    match evaluator.evaluate(root).await {
        Ok(metrics) => AnalysisResult::ok(CategoryMetrics::AgentEval(metrics), Vec::new()),
        Err(err) => AnalysisResult::failed(Category::AgentEval, err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, name: &str, contents: &str) {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn test_tiny_go_project() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "go.mod", "module example.com/tiny\n");
        write(temp.path(), "main.go", "package main\n\nfunc main() {}\n");

        let report = Pipeline::new(ArsConfig::default())
            .run(temp.path())
            .await
            .unwrap();

        assert_eq!(report.discovery.class_counts["source"], 1);
        let code_health = report
            .results
            .iter()
            .find(|result| result.category == Category::CodeHealth)
            .unwrap();
        let Some(CategoryMetrics::CodeHealth(metrics)) = &code_health.metrics else {
            panic!("missing C1 metrics");
        };
        assert_eq!(metrics.complexity.max, 1);
        assert!((metrics.complexity.average - 1.0).abs() < 1e-9);

        assert!(report.scored.composite >= 3.0 && report.scored.composite <= 6.0);
        assert!(matches!(
            report.scored.tier,
            crate::core::scoring::Tier::AgentLimited | crate::core::scoring::Tier::AgentHostile
        ));
    }

    #[tokio::test]
    async fn test_empty_directory_fails() {
        let temp = TempDir::new().unwrap();
        let err = Pipeline::new(ArsConfig::default())
            .run(temp.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ArsError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_yields_no_report() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.py", "x = 1\n");

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Pipeline::new(ArsConfig::default())
            .run_with(temp.path(), None, cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancellation_mid_run_discards_partials() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def f():\n    pass\n");
        write(temp.path(), "b.py", "import a\n");

        // Cancel the moment the analyze stage begins; analyzers observe
        // the token and the joiner surfaces the terminal condition.
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let progress: ProgressSink = Arc::new(move |stage, _detail| {
            if stage == Stage::Analyze {
                trigger.cancel();
            }
        });

        let err = Pipeline::new(ArsConfig::default())
            .run_with(temp.path(), Some(progress), cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_results_sorted_by_category() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "main.py", "def main():\n    pass\n");

        let report = Pipeline::new(ArsConfig::default())
            .run(temp.path())
            .await
            .unwrap();
        let ids: Vec<&str> = report
            .results
            .iter()
            .map(|result| result.category.id())
            .collect();
        assert_eq!(ids, vec!["C1", "C3", "C4", "C5", "C6"]);
    }

    #[tokio::test]
    async fn test_determinism() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def f(x):\n    if x:\n        return 1\n    return 0\n");
        write(temp.path(), "b.py", "import a\n\ndef g():\n    return a.f(1)\n");

        let pipeline = Pipeline::new(ArsConfig::default());
        let first = pipeline.run(temp.path()).await.unwrap();
        let second = pipeline.run(temp.path()).await.unwrap();

        let left = serde_json::to_value(&first.scored).unwrap();
        let right = serde_json::to_value(&second.scored).unwrap();
        assert_eq!(left, right);
    }
}
