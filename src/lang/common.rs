//! Common parsing abstractions shared by the language adapters.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use crate::discovery::{FileClass, SourceFile};

/// Supported languages. `.js`/`.jsx` files are handled by the
/// TypeScript adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Language {
    /// Go sources (`.go`).
    Go,
    /// Python sources (`.py`).
    Python,
    /// TypeScript and JavaScript sources (`.ts`, `.tsx`, `.js`, `.jsx`).
    TypeScript,
    /// Anything else; never analyzed.
    Unknown,
}

impl Language {
    /// Map a file extension to a language.
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "go" => Language::Go,
            "py" => Language::Python,
            "ts" | "tsx" | "js" | "jsx" => Language::TypeScript,
            _ => Language::Unknown,
        }
    }

    /// Stable lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A per-language bundle of files handed to the parsing stage.
#[derive(Debug, Clone)]
pub struct AnalysisTarget {
    /// Language of every file in the target.
    pub language: Language,
    /// Scan root, for relative-path resolution.
    pub root: PathBuf,
    /// Source- and test-role files of this language, in discovery order.
    pub files: Vec<SourceFile>,
}

/// One parsed file: classification, raw source, and its syntax tree.
///
/// The tree owns native parser resources; they are released when the
/// owning [`ParsedBundle`] drops, on every pipeline exit path.
#[derive(Debug)]
pub struct ParsedFile {
    /// The classified file.
    pub file: SourceFile,
    /// Full file contents.
    pub source: String,
    /// Tree-sitter syntax tree.
    pub tree: Tree,
}

impl ParsedFile {
    /// Root node of the syntax tree.
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Physical line count.
    pub fn line_count(&self) -> usize {
        self.source.lines().count()
    }

    /// Relative path as a display string with forward slashes.
    pub fn rel_display(&self) -> String {
        path_display(&self.file.relative_path)
    }

    /// True when the file has the test role.
    pub fn is_test(&self) -> bool {
        self.file.class == FileClass::Test
    }
}

/// All parsed files, grouped by language. Shared read-only across the
/// analyzers via `Arc`.
#[derive(Debug, Default)]
pub struct ParsedBundle {
    /// Scan root.
    pub root: PathBuf,
    /// Parsed files per language, in discovery order.
    pub languages: Vec<LanguageBundle>,
}

impl ParsedBundle {
    /// Bundle for one language, if present.
    pub fn language(&self, language: Language) -> Option<&LanguageBundle> {
        self.languages
            .iter()
            .find(|bundle| bundle.language == language)
    }

    /// Total parsed file count across languages.
    pub fn file_count(&self) -> usize {
        self.languages.iter().map(|bundle| bundle.files.len()).sum()
    }
}

/// Parsed files of a single language.
#[derive(Debug)]
pub struct LanguageBundle {
    /// The language.
    pub language: Language,
    /// Parsed source- and test-role files.
    pub files: Vec<ParsedFile>,
}

impl LanguageBundle {
    /// Source-role files only.
    pub fn sources(&self) -> impl Iterator<Item = &ParsedFile> {
        self.files.iter().filter(|parsed| !parsed.is_test())
    }

    /// Test-role files only.
    pub fn tests(&self) -> impl Iterator<Item = &ParsedFile> {
        self.files.iter().filter(|parsed| parsed.is_test())
    }
}

/// One import statement as written, before project resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImport {
    /// Import spec: Go import path, Python dotted name (leading dots
    /// preserved for relative imports), or TS module specifier.
    pub spec: String,
    /// 1-based line of the import.
    pub line: usize,
}

/// Kind of an exported symbol, for dead-export reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Function or method.
    Function,
    /// Type, class, or interface.
    Type,
    /// Variable or constant.
    Variable,
}

/// A public symbol declared at a file's top level.
#[derive(Debug, Clone)]
pub struct ExportedSymbol {
    /// Symbol name.
    pub name: String,
    /// Symbol kind.
    pub kind: SymbolKind,
    /// 1-based declaration line.
    pub line: usize,
}

/// Public-API documentation tally for one file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocCoverage {
    /// Public symbols with a doc comment or docstring.
    pub documented: usize,
    /// All public symbols.
    pub total: usize,
}

/// Assertion count for one test function.
#[derive(Debug, Clone)]
pub struct TestFunctionAssertions {
    /// Qualified test-function name.
    pub name: String,
    /// Number of recognized assertion calls.
    pub assertions: usize,
}

/// Language-specific AST vocabulary and extraction.
///
/// Every analyzer works through this trait so that per-metric contracts
/// stay semantically equivalent across languages; method names converge
/// on the `Owner.Name` textual format.
pub trait LanguageSpec: Send + Sync {
    /// The language this spec covers.
    fn language(&self) -> Language;

    /// True for function-like declaration nodes (functions, methods,
    /// lambdas, arrow functions).
    fn is_function(&self, kind: &str) -> bool;

    /// Qualified name of a function-like node (`Owner.Name` for
    /// methods), `None` for anonymous functions.
    fn function_name(&self, node: Node<'_>, source: &str) -> Option<String>;

    /// Cyclomatic-complexity contribution of one node: 1 for each
    /// decision point (`if`, loops, non-default `case`, `catch`,
    /// conditional expressions, short-circuit boolean operators).
    fn decision_points(&self, node: Node<'_>, source: &str) -> u32;

    /// True for statement-sequence containers considered by the
    /// duplication detector (function bodies, blocks, class bodies).
    fn is_block(&self, kind: &str) -> bool;

    /// True for identifier nodes; their names are collapsed by the
    /// structural hash.
    fn is_identifier(&self, kind: &str) -> bool;

    /// True for literal nodes; their text is preserved by the
    /// structural hash.
    fn is_literal(&self, kind: &str) -> bool;

    /// True for comment nodes.
    fn is_comment(&self, kind: &str) -> bool;

    /// All import statements in the file, unresolved.
    fn raw_imports(&self, parsed: &ParsedFile) -> Vec<RawImport>;

    /// Top-level symbols with public visibility by language convention.
    fn exported_symbols(&self, parsed: &ParsedFile) -> Vec<ExportedSymbol>;

    /// Every identifier-like token in the file, for reference scans.
    fn reference_identifiers(&self, parsed: &ParsedFile) -> Vec<String>;

    /// Physical comment lines (docstrings included where the language
    /// has them).
    fn comment_line_count(&self, parsed: &ParsedFile) -> usize;

    /// Documented/total public symbols for API doc coverage.
    fn doc_coverage(&self, parsed: &ParsedFile) -> DocCoverage;

    /// Per-test-function assertion counts for a test-role file.
    fn test_assertions(&self, parsed: &ParsedFile) -> Vec<TestFunctionAssertions>;

    /// Import prefixes that mark a test as not isolated (network,
    /// filesystem, database, subprocess).
    fn io_blocklist(&self) -> &'static [&'static str];
}

/// Depth-first visit of every node under `root`, inclusive.
pub fn walk_nodes<'t>(root: Node<'t>, visit: &mut dyn FnMut(Node<'t>)) {
    let mut cursor = root.walk();
    loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
        }
    }
}

/// Node text, empty on encoding failure.
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// 1-based `(start_line, end_line)` of a node.
pub fn node_lines(node: Node<'_>) -> (usize, usize) {
    (
        node.start_position().row + 1,
        node.end_position().row + 1,
    )
}

/// Physical lines spanned by a node.
pub fn node_line_span(node: Node<'_>) -> usize {
    let (start, end) = node_lines(node);
    end - start + 1
}

/// Render a path with forward slashes regardless of platform.
pub fn path_display(path: &std::path::Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
