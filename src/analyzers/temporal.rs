//! C5 temporal dynamics analyzer: churn, temporal coupling, and (after
//! the pipeline join) hotspots, from version-control history.
//!
//! Missing history is never an error; the category degrades to empty
//! metrics with `history_available = false`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use git2::{Commit, Repository, Sort};
use tracing::debug;

use crate::analyzers::common::{
    Analyzer, AnalyzerContext, AnalyzerOutput, Category, CategoryMetrics, TemporalMetrics,
};
use crate::core::errors::Result;
use crate::lang::common::path_display;
use crate::lang::ParsedBundle;

/// The C5 analyzer.
pub struct TemporalAnalyzer;

#[async_trait]
impl Analyzer for TemporalAnalyzer {
    fn category(&self) -> Category {
        Category::Temporal
    }

    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput> {
        let config = &ctx.config.temporal;
        let mut metrics = TemporalMetrics {
            window_months: config.lookback_months,
            ..TemporalMetrics::default()
        };

        let Ok(repo) = Repository::discover(&bundle.root) else {
            debug!(root = %bundle.root.display(), "no git repository; temporal metrics empty");
            return Ok(AnalyzerOutput::new(CategoryMetrics::Temporal(metrics)));
        };
        let Ok(head) = repo.head().and_then(|head| head.peel_to_commit()) else {
            debug!("repository has no commits; temporal metrics empty");
            return Ok(AnalyzerOutput::new(CategoryMetrics::Temporal(metrics)));
        };

        metrics.history_available = true;

        // The window anchors at HEAD's commit time so that re-running on
        // identical history yields identical output.
        let cutoff =
            head.time().seconds() - i64::from(config.lookback_months) * 30 * 24 * 3600;
        let scope = scan_prefix(&repo, &bundle.root);

        let mut pair_counts: HashMap<(String, String), usize> = HashMap::new();

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.set_sorting(Sort::TIME)?;

        for oid in revwalk {
            ctx.check_cancelled()?;
            let Ok(oid) = oid else { continue };
            let Ok(commit) = repo.find_commit(oid) else {
                continue;
            };
            if commit.time().seconds() < cutoff {
                break;
            }

            let touched = touched_files(&repo, &commit, scope.as_deref());
            for file in &touched {
                *metrics.commit_counts.entry(file.clone()).or_default() += 1;
            }

            // Huge commits (imports, vendoring) would explode the pair
            // space quadratically; they are skipped for coupling only.
            if touched.len() > config.max_commit_files {
                continue;
            }
            for (index, left) in touched.iter().enumerate() {
                for right in &touched[index + 1..] {
                    let key = if left <= right {
                        (left.clone(), right.clone())
                    } else {
                        (right.clone(), left.clone())
                    };
                    *pair_counts.entry(key).or_default() += 1;
                }
            }
        }

        metrics.high_churn_files = metrics
            .commit_counts
            .values()
            .filter(|&&count| count > config.churn_commit_threshold)
            .count();
        metrics.temporal_coupling_pairs = pair_counts
            .values()
            .filter(|&&count| count > config.coupling_threshold)
            .count();

        Ok(AnalyzerOutput::new(CategoryMetrics::Temporal(metrics)))
    }
}

/// Path prefix of the scan root inside the repository work dir, when
/// the scan targets a subdirectory.
fn scan_prefix(repo: &Repository, root: &Path) -> Option<PathBuf> {
    let workdir = repo.workdir()?;
    let prefix = root.strip_prefix(workdir).ok()?;
    if prefix.as_os_str().is_empty() {
        None
    } else {
        Some(prefix.to_path_buf())
    }
}

/// Files touched by a commit, diffed against its first parent, scoped
/// to the scan root and re-relativized to it.
fn touched_files(repo: &Repository, commit: &Commit<'_>, scope: Option<&Path>) -> Vec<String> {
    let Ok(tree) = commit.tree() else {
        return Vec::new();
    };
    let parent_tree = commit.parent(0).ok().and_then(|parent| parent.tree().ok());

    let Ok(diff) = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None) else {
        return Vec::new();
    };

    let mut files = Vec::new();
    for delta in diff.deltas() {
        let Some(path) = delta.new_file().path().or_else(|| delta.old_file().path()) else {
            continue;
        };
        let scoped = match scope {
            Some(prefix) => match path.strip_prefix(prefix) {
                Ok(inner) => inner,
                Err(_) => continue,
            },
            None => path,
        };
        files.push(path_display(scoped));
    }
    files.sort();
    files.dedup();
    files
}
