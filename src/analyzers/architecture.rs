//! C3 architecture analyzer: directory depth, module fanout, import
//! cycles, import-path complexity, and dead exports.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::analyzers::common::{
    Analyzer, AnalyzerContext, AnalyzerOutput, ArchitectureMetrics, Category, CategoryMetrics,
    DeadExport, MetricSummary,
};
use crate::analyzers::imports::{build_import_graph, module_key, ImportGraph};
use crate::core::errors::Result;
use crate::lang::common::LanguageBundle;
use crate::lang::{spec_for, ParsedBundle};

/// The C3 analyzer.
pub struct ArchitectureAnalyzer;

#[async_trait]
impl Analyzer for ArchitectureAnalyzer {
    fn category(&self) -> Category {
        Category::Architecture
    }

    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput> {
        let mut metrics = ArchitectureMetrics::default();
        let mut warnings = Vec::new();

        let mut depths: Vec<usize> = Vec::new();
        let mut fanout_observations: Vec<(usize, String)> = Vec::new();
        let mut segment_observations: Vec<(usize, String)> = Vec::new();

        for language_bundle in &bundle.languages {
            ctx.check_cancelled()?;

            for parsed in language_bundle.sources() {
                depths.push(directory_depth(&parsed.file.relative_path));
            }

            let graph = build_import_graph(language_bundle, &bundle.root);

            for (module, targets) in &graph.forward {
                if !targets.is_empty() {
                    fanout_observations.push((targets.len(), module.clone()));
                }
            }
            segment_observations.extend(graph.import_segments.iter().cloned());
            metrics.circular_dependencies.extend(find_cycles(&graph));

            if graph.modules.len() < 2 {
                // Every export of a single-module project would be flagged.
                continue;
            }
            metrics.dead_export_scan_ran = true;
            metrics
                .dead_exports
                .extend(find_dead_exports(language_bundle, &ctx)?);
        }

        metrics.max_directory_depth = depths.iter().copied().max().unwrap_or(0);
        metrics.avg_directory_depth = if depths.is_empty() {
            0.0
        } else {
            depths.iter().sum::<usize>() as f64 / depths.len() as f64
        };
        metrics.fanout = MetricSummary::from_observations(
            fanout_observations
                .iter()
                .map(|(value, entity)| (*value, entity.as_str())),
        );
        metrics.import_complexity = MetricSummary::from_observations(
            segment_observations
                .iter()
                .map(|(value, entity)| (*value, entity.as_str())),
        );

        if metrics.dead_export_scan_ran && !metrics.dead_exports.is_empty() {
            warnings.push(
                "dead-export detection is reference-scan based; symbols reached via dynamic \
                 dispatch or computed imports may be false positives"
                    .to_string(),
            );
        }

        Ok(AnalyzerOutput {
            metrics: CategoryMetrics::Architecture(metrics),
            warnings,
        })
    }
}

/// Path-separator count of a file's relative path.
fn directory_depth(relative: &std::path::Path) -> usize {
    relative.components().count().saturating_sub(1)
}

/// Strongly-connected components of size >= 2 are import cycles.
fn find_cycles(graph: &ImportGraph) -> Vec<Vec<String>> {
    let mut petgraph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for module in &graph.modules {
        nodes.insert(module, petgraph.add_node(module.clone()));
    }
    for (from, targets) in &graph.forward {
        for to in targets {
            if let (Some(&a), Some(&b)) = (nodes.get(from.as_str()), nodes.get(to.as_str())) {
                petgraph.add_edge(a, b, ());
            }
        }
    }

    let mut cycles: Vec<Vec<String>> = kosaraju_scc(&petgraph)
        .into_iter()
        .filter(|component| component.len() >= 2)
        .map(|component| {
            let mut names: Vec<String> = component
                .into_iter()
                .map(|index| petgraph[index].clone())
                .collect();
            names.sort();
            names
        })
        .collect();
    cycles.sort();
    cycles
}

/// Exported symbols with no reference from any other non-test file of
/// the same language.
fn find_dead_exports(
    bundle: &LanguageBundle,
    ctx: &AnalyzerContext,
) -> Result<Vec<DeadExport>> {
    let spec = match spec_for(bundle.language) {
        Ok(spec) => spec,
        Err(_) => return Ok(Vec::new()),
    };

    // name -> indices of source files that mention it.
    let mut mentions: HashMap<String, HashSet<usize>> = HashMap::new();
    let sources: Vec<_> = bundle.sources().collect();

    for (index, parsed) in sources.iter().enumerate() {
        ctx.check_cancelled()?;
        for name in spec.reference_identifiers(parsed) {
            mentions.entry(name).or_default().insert(index);
        }
    }

    let mut dead = Vec::new();
    for (index, parsed) in sources.iter().enumerate() {
        ctx.check_cancelled()?;
        for symbol in spec.exported_symbols(parsed) {
            let referenced_elsewhere = mentions
                .get(&symbol.name)
                .is_some_and(|files| files.iter().any(|&file| file != index));
            if !referenced_elsewhere {
                dead.push(DeadExport {
                    module: module_key(parsed),
                    symbol: symbol.name,
                    file: parsed.rel_display(),
                    line: symbol.line,
                    kind: symbol.kind,
                });
            }
        }
    }
    Ok(dead)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ArsConfig;
    use crate::discovery::{FileClass, SourceFile};
    use crate::lang::common::{Language, ParsedFile};
    use crate::lang::registry::parser_for;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;

    fn parsed_file(name: &str, language: Language, class: FileClass, source: &str) -> ParsedFile {
        let path = PathBuf::from(name);
        let mut parser = parser_for(language, &path).unwrap();
        let tree = parser.parse(source, None).unwrap();
        ParsedFile {
            file: SourceFile {
                path: path.clone(),
                relative_path: path,
                language,
                class,
            },
            source: source.to_string(),
            tree,
        }
    }

    fn ctx() -> AnalyzerContext {
        AnalyzerContext {
            config: Arc::new(ArsConfig::default()),
            cancel: CancellationToken::new(),
        }
    }

    fn python_bundle(files: Vec<ParsedFile>) -> ParsedBundle {
        ParsedBundle {
            root: PathBuf::from("."),
            languages: vec![LanguageBundle {
                language: Language::Python,
                files,
            }],
        }
    }

    #[tokio::test]
    async fn test_python_cycle_reported() {
        let bundle = python_bundle(vec![
            parsed_file("a.py", Language::Python, FileClass::Source, "import b\n"),
            parsed_file("b.py", Language::Python, FileClass::Source, "import a\n"),
        ]);

        let output = ArchitectureAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        let CategoryMetrics::Architecture(metrics) = output.metrics else {
            panic!("wrong metrics variant");
        };
        assert_eq!(metrics.circular_dependencies.len(), 1);
        assert_eq!(metrics.circular_dependencies[0], vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_layered_project_has_no_cycles() {
        let bundle = python_bundle(vec![
            parsed_file("l0.py", Language::Python, FileClass::Source, "x = 1\n"),
            parsed_file("l1.py", Language::Python, FileClass::Source, "import l0\n"),
            parsed_file("l2.py", Language::Python, FileClass::Source, "import l1\nimport l0\n"),
        ]);

        let output = ArchitectureAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        let CategoryMetrics::Architecture(metrics) = output.metrics else {
            panic!("wrong metrics variant");
        };
        assert!(metrics.circular_dependencies.is_empty());
        assert_eq!(metrics.fanout.max, 2);
        assert_eq!(metrics.fanout.max_entity, "l2");
    }

    #[tokio::test]
    async fn test_dead_export_rules() {
        let bundle = python_bundle(vec![
            parsed_file(
                "api.py",
                Language::Python,
                FileClass::Source,
                "def used():\n    pass\n\ndef unused():\n    pass\n\ndef test_only():\n    pass\n",
            ),
            parsed_file(
                "app.py",
                Language::Python,
                FileClass::Source,
                "from api import used\n\nused()\n",
            ),
            parsed_file(
                "test_api.py",
                Language::Python,
                FileClass::Test,
                "from api import test_only\n\ntest_only()\n",
            ),
        ]);

        let output = ArchitectureAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        let CategoryMetrics::Architecture(metrics) = output.metrics else {
            panic!("wrong metrics variant");
        };
        let dead: Vec<&str> = metrics
            .dead_exports
            .iter()
            .map(|export| export.symbol.as_str())
            .collect();
        // A symbol referenced only from tests is still dead.
        assert!(dead.contains(&"unused"));
        assert!(dead.contains(&"test_only"));
        assert!(!dead.contains(&"used"));
    }

    #[tokio::test]
    async fn test_single_module_skips_dead_exports() {
        let bundle = python_bundle(vec![parsed_file(
            "solo.py",
            Language::Python,
            FileClass::Source,
            "def lonely():\n    pass\n",
        )]);

        let output = ArchitectureAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        let CategoryMetrics::Architecture(metrics) = output.metrics else {
            panic!("wrong metrics variant");
        };
        assert!(!metrics.dead_export_scan_ran);
        assert!(metrics.dead_exports.is_empty());
    }

    #[test]
    fn test_directory_depth() {
        assert_eq!(directory_depth(std::path::Path::new("main.go")), 0);
        assert_eq!(directory_depth(std::path::Path::new("a/b/c.go")), 2);
    }
}
