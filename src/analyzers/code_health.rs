//! C1 code health analyzer: cyclomatic complexity, function length,
//! file size, structural duplication, and module coupling.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tree_sitter::Node;

use crate::analyzers::common::{
    Analyzer, AnalyzerContext, AnalyzerOutput, Category, CategoryMetrics, CodeHealthMetrics,
    FunctionMetric, MetricSummary,
};
use crate::analyzers::duplication;
use crate::analyzers::imports::{build_import_graph, module_key};
use crate::core::errors::Result;
use crate::lang::common::{walk_nodes, LanguageSpec, ParsedFile};
use crate::lang::{spec_for, ParsedBundle};

/// The C1 analyzer.
pub struct CodeHealthAnalyzer;

#[async_trait]
impl Analyzer for CodeHealthAnalyzer {
    fn category(&self) -> Category {
        Category::CodeHealth
    }

    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput> {
        let mut metrics = CodeHealthMetrics::default();
        let mut warnings = Vec::new();

        let mut functions: Vec<FunctionMetric> = Vec::new();
        let mut file_sizes: Vec<(usize, String)> = Vec::new();
        let mut rates: Vec<f64> = Vec::new();
        let multi_language = bundle.languages.len() > 1;

        for language_bundle in &bundle.languages {
            ctx.check_cancelled()?;
            let spec = match spec_for(language_bundle.language) {
                Ok(spec) => spec,
                Err(err) => {
                    warnings.push(err.to_string());
                    continue;
                }
            };

            for parsed in language_bundle.sources() {
                ctx.check_cancelled()?;
                functions.extend(measure_functions(parsed, spec));
                file_sizes.push((parsed.line_count(), parsed.rel_display()));
            }

            let outcome = duplication::detect(language_bundle, spec, &ctx.config.duplication);
            rates.push(outcome.rate);
            metrics.duplicate_blocks.extend(outcome.blocks);

            let graph = build_import_graph(language_bundle, &bundle.root);
            for module in &graph.modules {
                let key = if multi_language {
                    format!("{}:{}", language_bundle.language, module)
                } else {
                    module.clone()
                };
                metrics
                    .afferent_coupling
                    .insert(key.clone(), graph.afferent(module));
                metrics.efferent_coupling.insert(key, graph.efferent(module));
            }
        }

        metrics.complexity = MetricSummary::from_observations(
            functions
                .iter()
                .map(|function| (function.cyclomatic as usize, function.name.as_str())),
        );
        metrics.function_length = MetricSummary::from_observations(
            functions
                .iter()
                .map(|function| (function.line_count, function.name.as_str())),
        );
        metrics.file_size = MetricSummary::from_observations(
            file_sizes
                .iter()
                .map(|(lines, entity)| (*lines, entity.as_str())),
        );

        // Multi-language projects average the per-language rates.
        metrics.duplication_rate = if rates.is_empty() {
            0.0
        } else {
            rates.iter().sum::<f64>() / rates.len() as f64
        };
        metrics.functions = functions;

        Ok(AnalyzerOutput {
            metrics: CategoryMetrics::CodeHealth(metrics),
            warnings,
        })
    }
}

/// Per-function complexity and length for one file.
fn measure_functions(parsed: &ParsedFile, spec: &dyn LanguageSpec) -> Vec<FunctionMetric> {
    let module = module_key(parsed);
    let mut functions = Vec::new();

    walk_nodes(parsed.root(), &mut |node| {
        if !spec.is_function(node.kind()) {
            return;
        }

        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let name = spec
            .function_name(node, &parsed.source)
            .unwrap_or_else(|| format!("anonymous@{start_line}"));

        functions.push(FunctionMetric {
            module: module.clone(),
            name,
            file: parsed.rel_display(),
            line: start_line,
            cyclomatic: cyclomatic_complexity(node, parsed, spec),
            line_count: end_line - start_line + 1,
        });
    });

    functions
}

/// Cyclomatic complexity: 1 plus every decision point in the function,
/// excluding nested function bodies (they are measured on their own).
fn cyclomatic_complexity(
    function: Node<'_>,
    parsed: &ParsedFile,
    spec: &dyn LanguageSpec,
) -> u32 {
    1 + decisions_below(function, parsed, spec)
}

fn decisions_below(node: Node<'_>, parsed: &ParsedFile, spec: &dyn LanguageSpec) -> u32 {
    let mut total = 0;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if spec.is_function(child.kind()) {
            continue;
        }
        total += spec.decision_points(child, &parsed.source);
        total += decisions_below(child, parsed, spec);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ArsConfig;
    use crate::discovery::{FileClass, SourceFile};
    use crate::lang::common::{Language, LanguageBundle};
    use crate::lang::registry::parser_for;
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;

    fn parsed_file(name: &str, language: Language, source: &str) -> ParsedFile {
        let path = PathBuf::from(name);
        let mut parser = parser_for(language, &path).unwrap();
        let tree = parser.parse(source, None).unwrap();
        ParsedFile {
            file: SourceFile {
                path: path.clone(),
                relative_path: path,
                language,
                class: FileClass::Source,
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

    fn spec(language: Language) -> &'static dyn LanguageSpec {
        spec_for(language).unwrap()
    }

    #[test]
    fn test_straight_line_function_has_complexity_one() {
        let parsed = parsed_file(
            "a.go",
            Language::Go,
            "package a\n\nfunc Flat() int {\n\tx := 1\n\ty := 2\n\treturn x + y\n}\n",
        );
        let functions = measure_functions(&parsed, spec(Language::Go));
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].cyclomatic, 1);
    }

    #[test]
    fn test_one_if_adds_exactly_one() {
        let flat = parsed_file(
            "flat.py",
            Language::Python,
            "def f(x):\n    return x\n",
        );
        let branched = parsed_file(
            "branched.py",
            Language::Python,
            "def f(x):\n    if x:\n        return 1\n    return x\n",
        );
        let flat_fn = &measure_functions(&flat, spec(Language::Python))[0];
        let branched_fn = &measure_functions(&branched, spec(Language::Python))[0];
        assert_eq!(branched_fn.cyclomatic, flat_fn.cyclomatic + 1);
    }

    #[test]
    fn test_nested_function_not_summed() {
        let parsed = parsed_file(
            "nested.ts",
            Language::TypeScript,
            "function outer(xs: number[]): number[] {\n  const mapped = xs.map((x) => (x > 0 ? x : -x));\n  return mapped;\n}\n",
        );
        let functions = measure_functions(&parsed, spec(Language::TypeScript));
        let outer = functions.iter().find(|f| f.name == "outer").unwrap();
        // The ternary lives in the arrow function, not in outer.
        assert_eq!(outer.cyclomatic, 1);
        let arrow = functions.iter().find(|f| f.name.starts_with("anonymous")).unwrap();
        assert_eq!(arrow.cyclomatic, 2);
    }

    #[tokio::test]
    async fn test_analyzer_end_to_end() {
        let bundle = ParsedBundle {
            root: PathBuf::from("."),
            languages: vec![LanguageBundle {
                language: Language::Go,
                files: vec![parsed_file(
                    "a.go",
                    Language::Go,
                    "package a\n\nfunc F(x int) int {\n\tif x > 0 {\n\t\treturn x\n\t}\n\treturn -x\n}\n",
                )],
            }],
        };

        let output = CodeHealthAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        let CategoryMetrics::CodeHealth(metrics) = output.metrics else {
            panic!("wrong metrics variant");
        };
        assert_eq!(metrics.complexity.max, 2);
        assert_eq!(metrics.complexity.max_entity, "F");
        assert_eq!(metrics.file_size.max, 8);
    }
}
