//! Scoring engine: normalizes raw analyzer metrics onto a 1-10 scale,
//! aggregates category scores by configured weights, and assigns the
//! final tier.

use serde::Serialize;

use crate::analyzers::common::{AnalysisResult, Category, CategoryMetrics, MetricSummary};
use crate::core::config::{ArsConfig, MetricSpec};

/// Tier classification derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    /// Composite >= 8.5.
    #[serde(rename = "agent-ready")]
    AgentReady,
    /// Composite >= 6.5.
    #[serde(rename = "agent-assisted")]
    AgentAssisted,
    /// Composite >= 4.5.
    #[serde(rename = "agent-limited")]
    AgentLimited,
    /// Everything below.
    #[serde(rename = "agent-hostile")]
    AgentHostile,
}

impl Tier {
    /// The unique tier for a composite score.
    pub fn from_composite(composite: f64) -> Self {
        if composite >= 8.5 {
            Tier::AgentReady
        } else if composite >= 6.5 {
            Tier::AgentAssisted
        } else if composite >= 4.5 {
            Tier::AgentLimited
        } else {
            Tier::AgentHostile
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Tier::AgentReady => "Agent-Ready",
            Tier::AgentAssisted => "Agent-Assisted",
            Tier::AgentLimited => "Agent-Limited",
            Tier::AgentHostile => "Agent-Hostile",
        })
    }
}

/// One normalized metric inside a category.
#[derive(Debug, Clone, Serialize)]
pub struct MetricScore {
    /// Stable metric key.
    pub key: String,
    /// Raw value; `None` when the metric was not applicable.
    pub raw: Option<f64>,
    /// Normalized sub-score in [1, 10]; `None` when not applicable.
    pub score: Option<f64>,
    /// Configured weight inside the category.
    pub weight: f64,
}

/// One scored category.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCategory {
    /// The category.
    pub category: Category,
    /// Category score in [1, 10].
    pub score: f64,
    /// Effective weight in the composite.
    pub weight: f64,
    /// True when the mid-score was substituted for a missing category.
    pub substituted: bool,
    /// Per-metric sub-scores.
    pub metrics: Vec<MetricScore>,
}

/// Final scoring output.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredResult {
    /// Weighted composite in [1, 10].
    pub composite: f64,
    /// Tier classification.
    pub tier: Tier,
    /// Scored categories in fixed C1, C3, C4, C5, C6 (, C7) order.
    pub categories: Vec<ScoredCategory>,
}

/// Fuse analysis results into the composite score.
///
/// Results are consumed in any order; output categories follow the
/// fixed category ordering. A category that failed or produced no
/// applicable metric substitutes the configured mid-score.
pub fn score_results(results: &[AnalysisResult], config: &ArsConfig) -> ScoredResult {
    let has_agent_eval = results
        .iter()
        .any(|result| result.category == Category::AgentEval);
    // When a live evaluation ran, the static weights shrink to leave
    // room for its configured share.
    let static_scale = if has_agent_eval {
        1.0 - config.weights.agent_eval
    } else {
        1.0
    };

    let mut categories = Vec::new();
    let mut composite = 0.0;

    let mut ordered: Vec<Category> = Category::static_categories().to_vec();
    if has_agent_eval {
        ordered.push(Category::AgentEval);
    }

    for category in ordered {
        let weight = if category == Category::AgentEval {
            config.weights.agent_eval
        } else {
            config.weights.weight_of(category) * static_scale
        };

        let result = results.iter().find(|result| result.category == category);
        let scored = score_category(category, result, weight, config);
        composite += scored.score * scored.weight;
        categories.push(scored);
    }

    let composite = composite.clamp(1.0, 10.0);
    ScoredResult {
        composite,
        tier: Tier::from_composite(composite),
        categories,
    }
}

fn score_category(
    category: Category,
    result: Option<&AnalysisResult>,
    weight: f64,
    config: &ArsConfig,
) -> ScoredCategory {
    let specs = config.metric_specs(category);
    let metrics_record = result.and_then(|result| result.metrics.as_ref());

    let mut metrics: Vec<MetricScore> = Vec::with_capacity(specs.len());
    let mut weighted_sum = 0.0;
    let mut weight_present = 0.0;

    for spec in specs {
        let raw = metrics_record.and_then(|record| raw_value(record, &spec.key));
        let score = raw.map(|raw| normalize(raw, spec));
        if let Some(score) = score {
            weighted_sum += score * spec.weight;
            weight_present += spec.weight;
        }
        metrics.push(MetricScore {
            key: spec.key.clone(),
            raw,
            score,
            weight: spec.weight,
        });
    }

    // Inapplicable metrics drop out and the rest renormalize; a fully
    // missing category takes the substitute mid-score.
    let (score, substituted) = if weight_present > 0.0 {
        (weighted_sum / weight_present, false)
    } else {
        (config.scoring.substitute_score, true)
    };

    ScoredCategory {
        category,
        score,
        weight,
        substituted,
        metrics,
    }
}

/// Linear map between the configured endpoints, clamped to [1, 10].
/// Works for both directions because the endpoints encode direction.
fn normalize(raw: f64, spec: &MetricSpec) -> f64 {
    let fraction = (raw - spec.worst) / (spec.ideal - spec.worst);
    1.0 + 9.0 * fraction.clamp(0.0, 1.0)
}

fn summary_value(summary: &MetricSummary, applicable: bool, average: bool) -> Option<f64> {
    if !applicable {
        return None;
    }
    Some(if average {
        summary.average
    } else {
        summary.max as f64
    })
}

/// Pull one raw metric value out of a typed record. `None` marks the
/// metric as not applicable for this scan.
fn raw_value(record: &CategoryMetrics, key: &str) -> Option<f64> {
    match record {
        CategoryMetrics::CodeHealth(metrics) => {
            let has_functions = !metrics.functions.is_empty();
            let has_files = !metrics.file_size.max_entity.is_empty();
            match key {
                "avg_complexity" => summary_value(&metrics.complexity, has_functions, true),
                "max_complexity" => summary_value(&metrics.complexity, has_functions, false),
                "avg_function_length" => {
                    summary_value(&metrics.function_length, has_functions, true)
                }
                "avg_file_size" => summary_value(&metrics.file_size, has_files, true),
                "duplication_rate" => has_files.then_some(metrics.duplication_rate),
                "avg_efferent_coupling" => {
                    let modules = metrics.efferent_coupling.len();
                    (modules > 0).then(|| {
                        metrics.efferent_coupling.values().sum::<usize>() as f64 / modules as f64
                    })
                }
                _ => None,
            }
        }
        CategoryMetrics::Architecture(metrics) => match key {
            "max_directory_depth" => Some(metrics.max_directory_depth as f64),
            "avg_fanout" => Some(metrics.fanout.average),
            "circular_dependencies" => Some(metrics.circular_dependencies.len() as f64),
            "avg_import_complexity" => {
                let applicable = !metrics.import_complexity.max_entity.is_empty();
                summary_value(&metrics.import_complexity, applicable, true)
            }
            "dead_exports" => metrics
                .dead_export_scan_ran
                .then_some(metrics.dead_exports.len() as f64),
            _ => None,
        },
        CategoryMetrics::Documentation(metrics) => match key {
            "readme_word_count" => Some(metrics.readme_word_count as f64),
            "comment_density" => Some(metrics.comment_density),
            "api_doc_coverage" => metrics.api_doc_coverage,
            "changelog_present" => Some(f64::from(metrics.changelog_present)),
            "examples_present" => Some(f64::from(metrics.examples_present)),
            "contributing_present" => Some(f64::from(metrics.contributing_present)),
            "diagrams_present" => Some(f64::from(metrics.diagrams_present)),
            _ => None,
        },
        CategoryMetrics::Temporal(metrics) => {
            if !metrics.history_available {
                return None;
            }
            match key {
                "high_churn_files" => Some(metrics.high_churn_files as f64),
                "temporal_coupling" => Some(metrics.temporal_coupling_pairs as f64),
                "hotspots" => Some(metrics.hotspots.len() as f64),
                _ => None,
            }
        }
        CategoryMetrics::Testing(metrics) => match key {
            "test_ratio" => Some(metrics.test_to_source_ratio),
            "coverage_percent" => metrics.coverage_percent,
            "test_isolation" => metrics.isolation_percent,
            "assertion_density" => {
                (metrics.test_function_count > 0).then_some(metrics.assertion_density.average)
            }
            _ => None,
        },
        CategoryMetrics::AgentEval(metrics) => match key {
            "task_success_rate" => Some(metrics.task_success_rate),
            _ => None,
        },
    }
}
