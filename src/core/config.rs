//! Configuration types for the analysis engine.
//!
//! All weights, normalization endpoints, and thresholds used by the
//! scoring engine live here, with built-in defaults that can be
//! overridden from a YAML file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analyzers::Category;
use crate::core::errors::{ArsError, Result};

/// Main configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArsConfig {
    /// Relative weight of each category in the composite score.
    #[serde(default)]
    pub weights: CategoryWeights,

    /// Metric normalization endpoints and per-metric weights.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Structural duplication detection thresholds.
    #[serde(default)]
    pub duplication: DuplicationConfig,

    /// Version-control history thresholds for the temporal analyzer.
    #[serde(default)]
    pub temporal: TemporalConfig,
}

impl Default for ArsConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            scoring: ScoringConfig::default(),
            duplication: DuplicationConfig::default(),
            temporal: TemporalConfig::default(),
        }
    }
}

impl ArsConfig {
    /// Load a configuration from a YAML file, falling back to defaults for
    /// omitted sections.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            ArsError::io(format!("failed to read config {}", path.display()), err)
        })?;
        let config: Self = serde_yaml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate weight tables: category weights and each category's metric
    /// weights must sum to 1 (within 1e-6).
    pub fn validate(&self) -> Result<()> {
        let total = self.weights.static_total();
        if (total - 1.0).abs() > 1e-6 {
            return Err(ArsError::config_field(
                format!("category weights sum to {total}, expected 1.0"),
                "weights",
            ));
        }

        for (category, specs) in &self.scoring.metrics {
            let sum: f64 = specs.iter().map(|spec| spec.weight).sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(ArsError::config_field(
                    format!("metric weights for {category} sum to {sum}, expected 1.0"),
                    format!("scoring.metrics.{category}"),
                ));
            }
            for spec in specs {
                if (spec.ideal - spec.worst).abs() < f64::EPSILON {
                    return Err(ArsError::config_field(
                        format!("metric {} has equal ideal and worst endpoints", spec.key),
                        format!("scoring.metrics.{category}"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Metric specs for one category, empty when the category is unknown.
    pub fn metric_specs(&self, category: Category) -> &[MetricSpec] {
        self.scoring
            .metrics
            .get(category.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Relative weight of each category in the composite score.
///
/// The five static-analysis weights must sum to 1. `agent_eval` only
/// applies when a live agent evaluator is attached; the static weights
/// are then scaled by `1 - agent_eval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeights {
    /// C1 code health.
    #[serde(default = "CategoryWeights::default_code_health")]
    pub code_health: f64,
    /// C3 architecture.
    #[serde(default = "CategoryWeights::default_architecture")]
    pub architecture: f64,
    /// C4 documentation.
    #[serde(default = "CategoryWeights::default_documentation")]
    pub documentation: f64,
    /// C5 temporal dynamics.
    #[serde(default = "CategoryWeights::default_temporal")]
    pub temporal: f64,
    /// C6 testing.
    #[serde(default = "CategoryWeights::default_testing")]
    pub testing: f64,
    /// C7 live agent evaluation, applied only when an evaluator runs.
    #[serde(default = "CategoryWeights::default_agent_eval")]
    pub agent_eval: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            code_health: Self::default_code_health(),
            architecture: Self::default_architecture(),
            documentation: Self::default_documentation(),
            temporal: Self::default_temporal(),
            testing: Self::default_testing(),
            agent_eval: Self::default_agent_eval(),
        }
    }
}

impl CategoryWeights {
    const fn default_code_health() -> f64 {
        0.25
    }

    const fn default_architecture() -> f64 {
        0.15
    }

    const fn default_documentation() -> f64 {
        0.20
    }

    const fn default_temporal() -> f64 {
        0.15
    }

    const fn default_testing() -> f64 {
        0.25
    }

    const fn default_agent_eval() -> f64 {
        0.15
    }

    /// Weight of one static category.
    pub fn weight_of(&self, category: Category) -> f64 {
        match category {
            Category::CodeHealth => self.code_health,
            Category::Architecture => self.architecture,
            Category::Documentation => self.documentation,
            Category::Temporal => self.temporal,
            Category::Testing => self.testing,
            Category::AgentEval => self.agent_eval,
        }
    }

    /// Sum of the five static-analysis weights.
    pub fn static_total(&self) -> f64 {
        self.code_health + self.architecture + self.documentation + self.temporal + self.testing
    }
}

/// Normalization endpoints and weight for a single metric.
///
/// The direction is encoded by the endpoints: `ideal > worst` means
/// higher raw values are better. The linear map
/// `1 + 9 * clamp01((raw - worst) / (ideal - worst))` covers both
/// directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSpec {
    /// Stable metric key, e.g. `duplication_rate`.
    pub key: String,
    /// Raw value that maps to a score of 10.
    pub ideal: f64,
    /// Raw value that maps to a score of 1.
    pub worst: f64,
    /// Weight inside the owning category; weights sum to 1 per category.
    pub weight: f64,
}

impl MetricSpec {
    fn new(key: &str, ideal: f64, worst: f64, weight: f64) -> Self {
        Self {
            key: key.to_string(),
            ideal,
            worst,
            weight,
        }
    }

    /// True when larger raw values score better.
    pub fn higher_is_better(&self) -> bool {
        self.ideal > self.worst
    }
}

/// Scoring engine configuration: substitution score and per-category
/// metric tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Score substituted for a category that produced no metrics
    /// (e.g. C5 without version control).
    #[serde(default = "ScoringConfig::default_substitute_score")]
    pub substitute_score: f64,

    /// Metric specs keyed by category id (`C1`, `C3`, ...).
    #[serde(default = "ScoringConfig::default_metrics")]
    pub metrics: BTreeMap<String, Vec<MetricSpec>>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            substitute_score: Self::default_substitute_score(),
            metrics: Self::default_metrics(),
        }
    }
}

impl ScoringConfig {
    const fn default_substitute_score() -> f64 {
        5.0
    }

    fn default_metrics() -> BTreeMap<String, Vec<MetricSpec>> {
        let mut metrics = BTreeMap::new();

        metrics.insert(
            "C1".to_string(),
            vec![
                MetricSpec::new("avg_complexity", 2.0, 15.0, 0.25),
                MetricSpec::new("max_complexity", 10.0, 40.0, 0.10),
                MetricSpec::new("avg_function_length", 15.0, 80.0, 0.15),
                MetricSpec::new("avg_file_size", 150.0, 800.0, 0.10),
                MetricSpec::new("duplication_rate", 0.0, 30.0, 0.25),
                MetricSpec::new("avg_efferent_coupling", 3.0, 15.0, 0.15),
            ],
        );

        metrics.insert(
            "C3".to_string(),
            vec![
                MetricSpec::new("max_directory_depth", 3.0, 9.0, 0.15),
                MetricSpec::new("avg_fanout", 3.0, 12.0, 0.20),
                MetricSpec::new("circular_dependencies", 0.0, 8.0, 0.30),
                MetricSpec::new("avg_import_complexity", 1.2, 4.0, 0.10),
                MetricSpec::new("dead_exports", 0.0, 40.0, 0.25),
            ],
        );

        metrics.insert(
            "C4".to_string(),
            vec![
                MetricSpec::new("readme_word_count", 300.0, 0.0, 0.20),
                MetricSpec::new("comment_density", 15.0, 0.0, 0.20),
                MetricSpec::new("api_doc_coverage", 90.0, 0.0, 0.30),
                MetricSpec::new("changelog_present", 1.0, 0.0, 0.075),
                MetricSpec::new("examples_present", 1.0, 0.0, 0.10),
                MetricSpec::new("contributing_present", 1.0, 0.0, 0.075),
                MetricSpec::new("diagrams_present", 1.0, 0.0, 0.05),
            ],
        );

        metrics.insert(
            "C5".to_string(),
            vec![
                MetricSpec::new("high_churn_files", 0.0, 20.0, 0.35),
                MetricSpec::new("temporal_coupling", 0.0, 15.0, 0.30),
                MetricSpec::new("hotspots", 0.0, 10.0, 0.35),
            ],
        );

        metrics.insert(
            "C6".to_string(),
            vec![
                MetricSpec::new("test_ratio", 0.8, 0.0, 0.30),
                MetricSpec::new("coverage_percent", 85.0, 0.0, 0.25),
                MetricSpec::new("test_isolation", 95.0, 20.0, 0.20),
                MetricSpec::new("assertion_density", 3.0, 0.0, 0.25),
            ],
        );

        metrics.insert(
            "C7".to_string(),
            vec![MetricSpec::new("task_success_rate", 100.0, 0.0, 1.0)],
        );

        metrics
    }
}

/// Structural duplication detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicationConfig {
    /// Minimum statements per window.
    #[serde(default = "DuplicationConfig::default_min_statements")]
    pub min_statements: usize,
    /// Minimum physical lines per window.
    #[serde(default = "DuplicationConfig::default_min_lines")]
    pub min_lines: usize,
    /// Maximum recursion depth of the structural fingerprint.
    #[serde(default = "DuplicationConfig::default_max_depth")]
    pub max_depth: usize,
    /// Maximum children folded per node.
    #[serde(default = "DuplicationConfig::default_max_children")]
    pub max_children: usize,
}

impl Default for DuplicationConfig {
    fn default() -> Self {
        Self {
            min_statements: Self::default_min_statements(),
            min_lines: Self::default_min_lines(),
            max_depth: Self::default_max_depth(),
            max_children: Self::default_max_children(),
        }
    }
}

impl DuplicationConfig {
    const fn default_min_statements() -> usize {
        3
    }

    const fn default_min_lines() -> usize {
        6
    }

    const fn default_max_depth() -> usize {
        12
    }

    const fn default_max_children() -> usize {
        24
    }
}

/// Version-control history thresholds for the temporal analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Lookback window in months, anchored at the HEAD commit time.
    #[serde(default = "TemporalConfig::default_lookback_months")]
    pub lookback_months: u32,
    /// Commit count above which a file counts as high churn.
    #[serde(default = "TemporalConfig::default_churn_threshold")]
    pub churn_commit_threshold: usize,
    /// Co-change count above which a file pair counts as temporally coupled.
    #[serde(default = "TemporalConfig::default_coupling_threshold")]
    pub coupling_threshold: usize,
    /// Max function complexity above which a high-churn file is a hotspot.
    #[serde(default = "TemporalConfig::default_hotspot_complexity")]
    pub hotspot_complexity_threshold: u32,
    /// Commits touching more files than this are skipped for pair counting.
    #[serde(default = "TemporalConfig::default_max_commit_files")]
    pub max_commit_files: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            lookback_months: Self::default_lookback_months(),
            churn_commit_threshold: Self::default_churn_threshold(),
            coupling_threshold: Self::default_coupling_threshold(),
            hotspot_complexity_threshold: Self::default_hotspot_complexity(),
            max_commit_files: Self::default_max_commit_files(),
        }
    }
}

impl TemporalConfig {
    const fn default_lookback_months() -> u32 {
        12
    }

    const fn default_churn_threshold() -> usize {
        10
    }

    const fn default_coupling_threshold() -> usize {
        5
    }

    const fn default_hotspot_complexity() -> u32 {
        10
    }

    const fn default_max_commit_files() -> usize {
        100
    }
}
