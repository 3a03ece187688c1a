//! Analyzer trait, category identifiers, and the typed metric records
//! each category produces.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::core::config::ArsConfig;
use crate::core::errors::Result;
use crate::lang::common::SymbolKind;
use crate::lang::ParsedBundle;

/// The analysis categories, in their fixed reporting order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// C1 code health.
    CodeHealth,
    /// C3 architecture.
    Architecture,
    /// C4 documentation quality.
    Documentation,
    /// C5 temporal dynamics.
    Temporal,
    /// C6 testing.
    Testing,
    /// C7 live agent evaluation (optional).
    AgentEval,
}

impl Category {
    /// Stable category id used in configuration and output.
    pub fn id(self) -> &'static str {
        match self {
            Category::CodeHealth => "C1",
            Category::Architecture => "C3",
            Category::Documentation => "C4",
            Category::Temporal => "C5",
            Category::Testing => "C6",
            Category::AgentEval => "C7",
        }
    }

    /// Human-readable title.
    pub fn title(self) -> &'static str {
        match self {
            Category::CodeHealth => "Code Health",
            Category::Architecture => "Architecture",
            Category::Documentation => "Documentation",
            Category::Temporal => "Temporal Dynamics",
            Category::Testing => "Testing",
            Category::AgentEval => "Agent Evaluation",
        }
    }

    /// The five static-analysis categories, in reporting order.
    pub fn static_categories() -> [Category; 5] {
        [
            Category::CodeHealth,
            Category::Architecture,
            Category::Documentation,
            Category::Temporal,
            Category::Testing,
        ]
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// A metric summarized across many entities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricSummary {
    /// Mean across entities.
    pub average: f64,
    /// Largest observed value.
    pub max: usize,
    /// Entity owning the maximum (function, file, or module name).
    pub max_entity: String,
}

impl MetricSummary {
    /// Summarize `(value, entity)` observations. Empty input yields the
    /// zero summary.
    pub fn from_observations<'a, I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut count = 0usize;
        let mut total = 0usize;
        let mut max = 0usize;
        let mut max_entity = String::new();

        for (value, entity) in observations {
            count += 1;
            total += value;
            if value > max || count == 1 {
                max = value;
                max_entity = entity.to_string();
            }
        }

        if count == 0 {
            return Self::default();
        }
        Self {
            average: total as f64 / count as f64,
            max,
            max_entity,
        }
    }
}

/// Per-function metrics from the C1 analyzer.
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMetric {
    /// Owning module (package dir, dotted module, or file stem).
    pub module: String,
    /// Qualified name (`Owner.Name` for methods).
    pub name: String,
    /// Relative file path.
    pub file: String,
    /// 1-based declaration line.
    pub line: usize,
    /// Cyclomatic complexity.
    pub cyclomatic: u32,
    /// Physical lines of the declaration.
    pub line_count: usize,
}

/// One pair of structurally-equivalent statement sequences.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateBlock {
    /// First file (relative path).
    pub file_a: String,
    /// 1-based start line in the first file.
    pub start_a: usize,
    /// 1-based end line in the first file.
    pub end_a: usize,
    /// Second file (relative path).
    pub file_b: String,
    /// 1-based start line in the second file.
    pub start_b: usize,
    /// 1-based end line in the second file.
    pub end_b: usize,
    /// Window length in lines.
    pub line_count: usize,
}

/// An exported symbol with no intra-project reference.
#[derive(Debug, Clone, Serialize)]
pub struct DeadExport {
    /// Owning module or file.
    pub module: String,
    /// Symbol name.
    pub symbol: String,
    /// Relative file path of the declaration.
    pub file: String,
    /// 1-based declaration line.
    pub line: usize,
    /// Symbol kind.
    pub kind: SymbolKind,
}

/// A file that is both high-churn and high-complexity.
#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    /// Relative file path.
    pub file: String,
    /// Commits touching the file inside the lookback window.
    pub commit_count: usize,
    /// Max function complexity in the file (from C1).
    pub max_complexity: u32,
}

/// C1 code health metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CodeHealthMetrics {
    /// Cyclomatic complexity across functions.
    pub complexity: MetricSummary,
    /// Function length across functions.
    pub function_length: MetricSummary,
    /// Physical size across source files.
    pub file_size: MetricSummary,
    /// Percentage of source lines involved in a duplicate pair.
    pub duplication_rate: f64,
    /// All duplicate pairs.
    pub duplicate_blocks: Vec<DuplicateBlock>,
    /// Modules importing each module.
    pub afferent_coupling: BTreeMap<String, usize>,
    /// Modules each module imports.
    pub efferent_coupling: BTreeMap<String, usize>,
    /// Every measured function, for hotspot cross-referencing.
    pub functions: Vec<FunctionMetric>,
}

/// C3 architecture metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchitectureMetrics {
    /// Deepest directory nesting among source files.
    pub max_directory_depth: usize,
    /// Mean directory nesting among source files.
    pub avg_directory_depth: f64,
    /// Outgoing imports per module, over modules with at least one.
    pub fanout: MetricSummary,
    /// Import cycles (strongly-connected components of size >= 2).
    pub circular_dependencies: Vec<Vec<String>>,
    /// Intra-project import path segment counts.
    pub import_complexity: MetricSummary,
    /// Exported symbols never referenced intra-project.
    pub dead_exports: Vec<DeadExport>,
    /// True when dead-export detection ran for at least one language.
    pub dead_export_scan_ran: bool,
}

/// C4 documentation metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentationMetrics {
    /// Root README present.
    pub readme_present: bool,
    /// Whitespace-separated README tokens.
    pub readme_word_count: usize,
    /// Comment lines / total source lines, percent.
    pub comment_density: f64,
    /// Documented public symbols / total public symbols, percent.
    /// `None` when the project exposes no public symbols.
    pub api_doc_coverage: Option<f64>,
    /// Changelog/history file at root.
    pub changelog_present: bool,
    /// Examples directory or fenced code in the README.
    pub examples_present: bool,
    /// Contributing guide at root.
    pub contributing_present: bool,
    /// Architecture/diagram asset under docs/.
    pub diagrams_present: bool,
    /// All public symbols seen.
    pub public_symbols: usize,
    /// Documented public symbols seen.
    pub documented_symbols: usize,
}

/// C5 temporal dynamics metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemporalMetrics {
    /// False when no version-control history was available.
    pub history_available: bool,
    /// Commits per file inside the lookback window.
    pub commit_counts: BTreeMap<String, usize>,
    /// Files whose commit count exceeds the churn threshold.
    pub high_churn_files: usize,
    /// File pairs co-changed above the coupling threshold.
    pub temporal_coupling_pairs: usize,
    /// High-churn, high-complexity files. Filled by the pipeline after
    /// the analyzer join, from C1 complexity data.
    pub hotspots: Vec<Hotspot>,
    /// Lookback window in months.
    pub window_months: u32,
}

/// C6 testing metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestingMetrics {
    /// Test-role file count.
    pub test_file_count: usize,
    /// Test lines / source lines.
    pub test_to_source_ratio: f64,
    /// Parsed coverage percentage; `None` when no report was found.
    pub coverage_percent: Option<f64>,
    /// Detected coverage report format.
    pub coverage_format: Option<String>,
    /// Fraction of test functions without I/O-adjacent imports, percent.
    /// `None` when no test functions exist.
    pub isolation_percent: Option<f64>,
    /// Assertions per test function.
    pub assertion_density: MetricSummary,
    /// Total test functions seen.
    pub test_function_count: usize,
}

/// C7 live-agent evaluation metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentEvalMetrics {
    /// Percentage of evaluation tasks the agent completed.
    pub task_success_rate: f64,
    /// Tasks attempted.
    pub tasks_run: usize,
}

/// Typed metrics union across categories.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryMetrics {
    /// C1.
    CodeHealth(CodeHealthMetrics),
    /// C3.
    Architecture(ArchitectureMetrics),
    /// C4.
    Documentation(DocumentationMetrics),
    /// C5.
    Temporal(TemporalMetrics),
    /// C6.
    Testing(TestingMetrics),
    /// C7.
    AgentEval(AgentEvalMetrics),
}

impl CategoryMetrics {
    /// The category this record belongs to.
    pub fn category(&self) -> Category {
        match self {
            CategoryMetrics::CodeHealth(_) => Category::CodeHealth,
            CategoryMetrics::Architecture(_) => Category::Architecture,
            CategoryMetrics::Documentation(_) => Category::Documentation,
            CategoryMetrics::Temporal(_) => Category::Temporal,
            CategoryMetrics::Testing(_) => Category::Testing,
            CategoryMetrics::AgentEval(_) => Category::AgentEval,
        }
    }
}

/// Output of one analyzer: its metrics record or an error, plus any
/// file-scoped warnings accumulated along the way.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Owning category.
    pub category: Category,
    /// Metrics record; `None` when the analyzer failed.
    pub metrics: Option<CategoryMetrics>,
    /// File- and symbol-scoped warnings.
    pub warnings: Vec<String>,
    /// Analyzer-level failure, captured instead of raised.
    pub error: Option<String>,
}

impl AnalysisResult {
    /// A successful result.
    pub fn ok(metrics: CategoryMetrics, warnings: Vec<String>) -> Self {
        Self {
            category: metrics.category(),
            metrics: Some(metrics),
            warnings,
            error: None,
        }
    }

    /// A captured analyzer failure.
    pub fn failed(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            metrics: None,
            warnings: Vec::new(),
            error: Some(message.into()),
        }
    }
}

/// Everything an analyzer needs besides the parsed bundle.
#[derive(Clone)]
pub struct AnalyzerContext {
    /// Effective configuration.
    pub config: Arc<ArsConfig>,
    /// Cooperative cancellation signal; analyzers check it between
    /// files and return [`crate::core::errors::ArsError::Cancelled`].
    pub cancel: CancellationToken,
}

impl AnalyzerContext {
    /// Fail fast when cancellation was requested.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(crate::core::errors::ArsError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Intermediate analyzer output before the pipeline wraps it into an
/// [`AnalysisResult`].
#[derive(Debug)]
pub struct AnalyzerOutput {
    /// The metrics record.
    pub metrics: CategoryMetrics,
    /// File-scoped warnings.
    pub warnings: Vec<String>,
}

impl AnalyzerOutput {
    /// Wrap a metrics record with no warnings.
    pub fn new(metrics: CategoryMetrics) -> Self {
        Self {
            metrics,
            warnings: Vec::new(),
        }
    }
}

/// One static analyzer. Implementations are pure over the shared
/// read-only bundle; they never mutate shared state.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// The category this analyzer produces.
    fn category(&self) -> Category;

    /// Run the analysis. File-scoped problems become warnings on the
    /// output; only analyzer-level failures return `Err`.
    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput>;
}

/// Optional live agent evaluation (C7), supplied by an external
/// collaborator. The static pipeline only defines the seam.
#[async_trait]
pub trait AgentEvaluator: Send + Sync {
    /// Run the evaluation against the repository root.
    async fn evaluate(&self, root: &Path) -> Result<AgentEvalMetrics>;
}
