//! C4 documentation analyzer: README, comment density, API doc
//! coverage, and repository documentation presence checks.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;
use walkdir::WalkDir;

use crate::analyzers::common::{
    Analyzer, AnalyzerContext, AnalyzerOutput, Category, CategoryMetrics, DocumentationMetrics,
};
use crate::core::errors::Result;
use crate::lang::{spec_for, ParsedBundle};

/// The C4 analyzer.
pub struct DocumentationAnalyzer;

/// Image and diagram-source extensions accepted for the diagrams check.
const DIAGRAM_EXTENSIONS: &[&str] = &["png", "svg", "jpg", "jpeg", "gif", "mmd", "mermaid"];

static DIAGRAM_NAMES: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in ["*architecture*", "*diagram*"] {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }
    builder.build().unwrap_or_else(|_| GlobSet::empty())
});

#[async_trait]
impl Analyzer for DocumentationAnalyzer {
    fn category(&self) -> Category {
        Category::Documentation
    }

    async fn analyze(
        &self,
        bundle: Arc<ParsedBundle>,
        ctx: AnalyzerContext,
    ) -> Result<AnalyzerOutput> {
        let mut metrics = DocumentationMetrics::default();
        let warnings = Vec::new();
        let root = bundle.root.clone();

        let readme = find_readme(&root);
        if let Some(readme_text) = &readme {
            metrics.readme_present = true;
            metrics.readme_word_count = readme_text.split_whitespace().count();
        }

        // Per-language densities averaged arithmetically.
        let mut densities: Vec<f64> = Vec::new();
        let mut documented = 0usize;
        let mut total_symbols = 0usize;

        for language_bundle in &bundle.languages {
            ctx.check_cancelled()?;
            let Ok(spec) = spec_for(language_bundle.language) else {
                continue;
            };

            let mut comment_lines = 0usize;
            let mut source_lines = 0usize;
            for parsed in language_bundle.sources() {
                ctx.check_cancelled()?;
                comment_lines += spec.comment_line_count(parsed);
                source_lines += parsed.line_count();

                let coverage = spec.doc_coverage(parsed);
                documented += coverage.documented;
                total_symbols += coverage.total;
            }

            if source_lines > 0 {
                densities.push(comment_lines as f64 / source_lines as f64 * 100.0);
            }
        }

        metrics.comment_density = if densities.is_empty() {
            0.0
        } else {
            densities.iter().sum::<f64>() / densities.len() as f64
        };
        metrics.public_symbols = total_symbols;
        metrics.documented_symbols = documented;
        metrics.api_doc_coverage =
            (total_symbols > 0).then(|| documented as f64 / total_symbols as f64 * 100.0);

        metrics.changelog_present = root_file_with_prefix(&root, &["changelog", "history"]);
        metrics.contributing_present = root_file_with_prefix(&root, &["contributing"]);
        metrics.examples_present = root.join("examples").is_dir()
            || root.join("example").is_dir()
            || readme.as_deref().is_some_and(|text| text.contains("```"));
        metrics.diagrams_present = has_diagram_under_docs(&root);

        Ok(AnalyzerOutput {
            metrics: CategoryMetrics::Documentation(metrics),
            warnings,
        })
    }
}

/// Contents of a root README with any common extension.
fn find_readme(root: &Path) -> Option<String> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.filter_map(std::result::Result::ok) {
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if matches!(
            name.as_str(),
            "readme" | "readme.md" | "readme.rst" | "readme.txt"
        ) {
            return std::fs::read_to_string(entry.path()).ok();
        }
    }
    None
}

/// Case-insensitive prefix match on root file names, e.g. CHANGELOG.md.
fn root_file_with_prefix(root: &Path, prefixes: &[&str]) -> bool {
    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };
    entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_file())
        .any(|entry| {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            prefixes.iter().any(|prefix| name.starts_with(prefix))
        })
}

/// Any `*architecture*`/`*diagram*` asset with an image, SVG, or
/// Mermaid extension under a root `docs/` subtree.
fn has_diagram_under_docs(root: &Path) -> bool {
    let docs = root.join("docs");
    if !docs.is_dir() {
        return false;
    }

    WalkDir::new(&docs)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .any(|entry| {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            let extension_ok = entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    DIAGRAM_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                });
            extension_ok && DIAGRAM_NAMES.is_match(Path::new(&name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ArsConfig;
    use crate::discovery::{FileClass, SourceFile};
    use crate::lang::common::{Language, LanguageBundle, ParsedFile};
    use crate::lang::registry::parser_for;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
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

    async fn run(root: &Path, files: Vec<ParsedFile>) -> DocumentationMetrics {
        let bundle = ParsedBundle {
            root: root.to_path_buf(),
            languages: vec![LanguageBundle {
                language: Language::Go,
                files,
            }],
        };
        let output = DocumentationAnalyzer
            .analyze(Arc::new(bundle), ctx())
            .await
            .unwrap();
        match output.metrics {
            CategoryMetrics::Documentation(metrics) => metrics,
            _ => panic!("wrong metrics variant"),
        }
    }

    #[tokio::test]
    async fn test_presence_checks() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("README.md"),
            "# Demo\n\nUsage:\n\n```go\nfmt.Println(1)\n```\n",
        )
        .unwrap();
        fs::write(temp.path().join("CHANGELOG.md"), "## 1.0\n").unwrap();
        fs::create_dir_all(temp.path().join("docs")).unwrap();
        fs::write(temp.path().join("docs/architecture.mermaid"), "graph TD;\n").unwrap();

        let metrics = run(temp.path(), Vec::new()).await;
        assert!(metrics.readme_present);
        assert_eq!(metrics.readme_word_count, 6);
        assert!(metrics.changelog_present);
        assert!(metrics.examples_present, "fenced code block counts");
        assert!(metrics.diagrams_present);
        assert!(!metrics.contributing_present);
    }

    #[tokio::test]
    async fn test_api_doc_coverage_arithmetic() {
        let temp = TempDir::new().unwrap();
        let source = "package a\n\n// One is documented.\nfunc One() {}\n\nfunc Two() {}\n\nfunc Three() {}\n";
        let metrics = run(temp.path(), vec![parsed_file("a.go", Language::Go, source)]).await;

        let coverage = metrics.api_doc_coverage.unwrap();
        assert!((coverage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fully_documented_is_hundred() {
        let temp = TempDir::new().unwrap();
        let source =
            "package a\n\n// One.\nfunc One() {}\n\n// Two.\nfunc Two() {}\n";
        let metrics = run(temp.path(), vec![parsed_file("a.go", Language::Go, source)]).await;
        assert_eq!(metrics.api_doc_coverage, Some(100.0));
    }

    #[tokio::test]
    async fn test_no_public_symbols_is_not_applicable() {
        let temp = TempDir::new().unwrap();
        let source = "package a\n\nfunc internal() {}\n";
        let metrics = run(temp.path(), vec![parsed_file("a.go", Language::Go, source)]).await;
        assert_eq!(metrics.api_doc_coverage, None);
    }

    #[tokio::test]
    async fn test_comment_density_physical_lines() {
        let temp = TempDir::new().unwrap();
        // 2 comment lines over 8 physical lines.
        let source = "package a\n\n// helper\n// does things\nfunc helper() {\n\tx := 1\n\t_ = x\n}\n";
        let metrics = run(temp.path(), vec![parsed_file("a.go", Language::Go, source)]).await;
        assert!((metrics.comment_density - 25.0).abs() < 1e-9);
    }
}
