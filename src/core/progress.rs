//! Progress reporting for pipeline stage transitions.

use std::fmt;
use std::sync::Arc;

/// Callback invoked at every stage transition with `(stage, detail)`.
///
/// May be called from any thread; implementations must be internally
/// thread-safe.
pub type ProgressSink = Arc<dyn Fn(Stage, &str) + Send + Sync>;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Walking and classifying the file tree.
    Discovery,
    /// Building tree-sitter syntax trees.
    Parse,
    /// Running the category analyzers.
    Analyze,
    /// Fusing metrics into the composite score.
    Score,
    /// Handing results to renderers.
    Render,
}

impl Stage {
    /// Stable lowercase name for logs and progress output.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Discovery => "discovery",
            Stage::Parse => "parse",
            Stage::Analyze => "analyze",
            Stage::Score => "score",
            Stage::Render => "render",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Report a stage transition through an optional sink.
pub fn report(sink: Option<&ProgressSink>, stage: Stage, detail: &str) {
    tracing::debug!(stage = stage.name(), detail, "stage transition");
    if let Some(sink) = sink {
        sink(stage, detail);
    }
}
