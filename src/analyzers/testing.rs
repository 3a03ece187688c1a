//! C6 testing analyzer: test volume, coverage, isolation, and
//! assertion density.

use std::sync::Arc;

use async_trait::async_trait;

use crate::analyzers::common::{
    Analyzer, AnalyzerContext, AnalyzerOutput, Category, CategoryMetrics, MetricSummary,
    TestingMetrics,
};
use crate::analyzers::coverage;
use crate::core::errors::Result;
use crate::lang::common::TestFunctionAssertions;
use crate::lang::{spec_for, ParsedBundle};

/// The C6 analyzer.
pub struct TestingAnalyzer;

#[async_trait]
impl Analyzer for TestingAnalyzer {
    fn category(&self) -> Category {
        Category::Testing
    }

    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput> {
        let mut metrics = TestingMetrics::default();
        let warnings = Vec::new();

        let mut source_lines = 0usize;
        let mut test_lines = 0usize;
        let mut total_functions = 0usize;
        let mut isolated_functions = 0usize;
        let mut assertion_observations: Vec<TestFunctionAssertions> = Vec::new();

        for language_bundle in &bundle.languages {
            ctx.check_cancelled()?;
            let Ok(spec) = spec_for(language_bundle.language) else {
                continue;
            };

            for parsed in language_bundle.sources() {
                source_lines += parsed.line_count();
            }

            for parsed in language_bundle.tests() {
                ctx.check_cancelled()?;
                metrics.test_file_count += 1;
                test_lines += parsed.line_count();

                let file_is_isolated = !spec
                    .raw_imports(parsed)
                    .iter()
                    .any(|import| is_blocked(&import.spec, spec.io_blocklist()));

                let tests = spec.test_assertions(parsed);
                total_functions += tests.len();
                if file_is_isolated {
                    isolated_functions += tests.len();
                }
                assertion_observations.extend(tests);
            }
        }

        metrics.test_to_source_ratio = if source_lines == 0 {
            0.0
        } else {
            test_lines as f64 / source_lines as f64
        };

        if let Some(report) = coverage::find_coverage_report(&bundle.root) {
            metrics.coverage_percent = Some(report.percent);
            metrics.coverage_format = Some(report.format.to_string());
        }

        metrics.test_function_count = total_functions;
        metrics.isolation_percent = (total_functions > 0)
            .then(|| isolated_functions as f64 / total_functions as f64 * 100.0);
        metrics.assertion_density = MetricSummary::from_observations(
            assertion_observations
                .iter()
                .map(|test| (test.assertions, test.name.as_str())),
        );

        Ok(AnalyzerOutput {
            metrics: CategoryMetrics::Testing(metrics),
            warnings,
        })
    }
}

/// An import is blocked when it names a blocklist module or one of its
/// submodules (`net/http` under `net`, `urllib.request` under `urllib`).
fn is_blocked(spec: &str, blocklist: &[&str]) -> bool {
    blocklist.iter().any(|entry| {
        spec == *entry
            || spec.strip_prefix(entry).is_some_and(|rest| {
                rest.starts_with('/') || rest.starts_with('.')
            })
    })
}
