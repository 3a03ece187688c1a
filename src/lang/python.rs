//! Python language spec backed by tree-sitter-python.

use tree_sitter::Node;

use crate::lang::common::{
    node_lines, node_text, walk_nodes, DocCoverage, ExportedSymbol, LanguageSpec, ParsedFile,
    RawImport, SymbolKind, TestFunctionAssertions,
};
use crate::lang::Language;

/// AST vocabulary for Python.
pub struct PythonSpec;

/// Import prefixes that mark a Python test as performing external I/O.
const PYTHON_IO_IMPORTS: &[&str] = &[
    "socket",
    "subprocess",
    "requests",
    "urllib",
    "http",
    "ftplib",
    "sqlite3",
    "psycopg2",
    "pymysql",
    "sqlalchemy",
    "boto3",
    "paramiko",
    "shutil",
];

impl LanguageSpec for PythonSpec {
    fn language(&self) -> Language {
        Language::Python
    }

    fn is_function(&self, kind: &str) -> bool {
        matches!(kind, "function_definition" | "lambda")
    }

    fn function_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        if node.kind() != "function_definition" {
            return None;
        }
        let name = field_text(node, "name", source)?;
        match enclosing_class_name(node, source) {
            Some(class) => Some(format!("{class}.{name}")),
            None => Some(name),
        }
    }

    fn decision_points(&self, node: Node<'_>, _source: &str) -> u32 {
        match node.kind() {
            "if_statement"
            | "elif_clause"
            | "for_statement"
            | "while_statement"
            | "except_clause"
            | "conditional_expression"
            | "boolean_operator"
            | "case_clause"
            | "for_in_clause"
            | "if_clause" => 1,
            _ => 0,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        matches!(kind, "block" | "module")
    }

    fn is_identifier(&self, kind: &str) -> bool {
        kind == "identifier"
    }

    fn is_literal(&self, kind: &str) -> bool {
        matches!(
            kind,
            "string" | "concatenated_string" | "integer" | "float" | "true" | "false" | "none"
        )
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn raw_imports(&self, parsed: &ParsedFile) -> Vec<RawImport> {
        let mut imports = Vec::new();
        walk_nodes(parsed.root(), &mut |node| match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    match child.kind() {
                        "dotted_name" => push_import(&mut imports, child, &parsed.source),
                        "aliased_import" => {
                            if let Some(name) = child.child_by_field_name("name") {
                                push_import(&mut imports, name, &parsed.source);
                            }
                        }
                        _ => {}
                    }
                }
            }
            "import_from_statement" => {
                if let Some(module) = node.child_by_field_name("module_name") {
                    push_import(&mut imports, module, &parsed.source);
                }
            }
            _ => {}
        });
        imports
    }

    fn exported_symbols(&self, parsed: &ParsedFile) -> Vec<ExportedSymbol> {
        let mut symbols = Vec::new();
        for node in module_level_statements(parsed.root()) {
            let node = unwrap_decorated(node);
            match node.kind() {
                "function_definition" => {
                    push_public(&mut symbols, node, SymbolKind::Function, &parsed.source);
                }
                "class_definition" => {
                    push_public(&mut symbols, node, SymbolKind::Type, &parsed.source);
                }
                "expression_statement" => {
                    if let Some(name) = assignment_target(node, &parsed.source) {
                        if !name.starts_with('_') {
                            symbols.push(ExportedSymbol {
                                name,
                                kind: SymbolKind::Variable,
                                line: node_lines(node).0,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
        symbols
    }

    fn reference_identifiers(&self, parsed: &ParsedFile) -> Vec<String> {
        let mut names = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() == "identifier" {
                names.push(node_text(node, &parsed.source).to_string());
            }
        });
        names
    }

    fn comment_line_count(&self, parsed: &ParsedFile) -> usize {
        let mut lines = 0;
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() == "comment" {
                let (start, end) = node_lines(node);
                lines += end - start + 1;
            } else if is_docstring(node) {
                let (start, end) = node_lines(node);
                lines += end - start + 1;
            }
        });
        lines
    }

    fn doc_coverage(&self, parsed: &ParsedFile) -> DocCoverage {
        let mut coverage = DocCoverage::default();
        walk_nodes(parsed.root(), &mut |node| {
            if !matches!(node.kind(), "function_definition" | "class_definition") {
                return;
            }
            if !is_module_or_class_level(node) {
                return;
            }
            let Some(name) = field_text(node, "name", &parsed.source) else {
                return;
            };
            if name.starts_with('_') {
                return;
            }

            coverage.total += 1;
            if has_docstring(node) {
                coverage.documented += 1;
            }
        });
        coverage
    }

    fn test_assertions(&self, parsed: &ParsedFile) -> Vec<TestFunctionAssertions> {
        let mut tests = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() != "function_definition" {
                return;
            }
            let Some(name) = self.function_name(node, &parsed.source) else {
                return;
            };
            let bare = name.rsplit('.').next().unwrap_or(&name);
            if !bare.starts_with("test_") && bare != "test" {
                return;
            }

            let mut assertions = 0usize;
            walk_nodes(node, &mut |inner| {
                if is_assertion(inner, &parsed.source) {
                    assertions += 1;
                }
            });
            tests.push(TestFunctionAssertions { name, assertions });
        });
        tests
    }

    fn io_blocklist(&self) -> &'static [&'static str] {
        PYTHON_IO_IMPORTS
    }
}

fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source).to_string())
        .filter(|text| !text.is_empty())
}

fn push_import(imports: &mut Vec<RawImport>, node: Node<'_>, source: &str) {
    let spec = node_text(node, source).trim().to_string();
    if !spec.is_empty() {
        imports.push(RawImport {
            spec,
            line: node_lines(node).0,
        });
    }
}

/// Walk up to the nearest enclosing class definition, if any.
fn enclosing_class_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(parent) = current {
        match parent.kind() {
            "class_definition" => return field_text(parent, "name", source),
            // A method nested inside another function is not a class method.
            "function_definition" => return None,
            _ => current = parent.parent(),
        }
    }
    None
}

/// Top-level statements of a module.
fn module_level_statements(root: Node<'_>) -> Vec<Node<'_>> {
    let mut statements = Vec::new();
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        statements.push(child);
    }
    statements
}

fn unwrap_decorated(node: Node<'_>) -> Node<'_> {
    if node.kind() == "decorated_definition" {
        if let Some(definition) = node.child_by_field_name("definition") {
            return definition;
        }
    }
    node
}

fn push_public(
    symbols: &mut Vec<ExportedSymbol>,
    node: Node<'_>,
    kind: SymbolKind,
    source: &str,
) {
    if let Some(name) = field_text(node, "name", source) {
        if !name.starts_with('_') {
            symbols.push(ExportedSymbol {
                name,
                kind,
                line: node_lines(node).0,
            });
        }
    }
}

/// Simple module-level `NAME = value` target.
fn assignment_target(statement: Node<'_>, source: &str) -> Option<String> {
    let child = statement.named_child(0)?;
    if child.kind() != "assignment" {
        return None;
    }
    let left = child.child_by_field_name("left")?;
    if left.kind() != "identifier" {
        return None;
    }
    Some(node_text(left, source).to_string())
}

/// A def/class directly in the module, or directly in a class body.
fn is_module_or_class_level(node: Node<'_>) -> bool {
    let Some(parent) = effective_parent(node) else {
        return true;
    };
    match parent.kind() {
        "module" => true,
        "block" => matches!(
            effective_parent(parent).map(|grand| grand.kind()),
            Some("class_definition")
        ),
        _ => false,
    }
}

/// Parent with `decorated_definition` wrappers collapsed.
fn effective_parent(node: Node<'_>) -> Option<Node<'_>> {
    let parent = node.parent()?;
    if parent.kind() == "decorated_definition" {
        parent.parent()
    } else {
        Some(parent)
    }
}

/// A string literal that is the first statement of a def/class/module
/// body.
fn is_docstring(node: Node<'_>) -> bool {
    if node.kind() != "expression_statement" {
        return false;
    }
    let is_string = node
        .named_child(0)
        .is_some_and(|child| matches!(child.kind(), "string" | "concatenated_string"));
    if !is_string {
        return false;
    }

    let Some(parent) = node.parent() else {
        return false;
    };
    let first = parent.named_child(0);
    let body_owner = matches!(parent.kind(), "module" | "block");
    body_owner && first.is_some_and(|first| first.id() == node.id())
}

fn has_docstring(definition: Node<'_>) -> bool {
    definition
        .child_by_field_name("body")
        .and_then(|body| body.named_child(0))
        .is_some_and(is_docstring)
}

/// `assert` statements, unittest `self.assert*`, and `pytest.raises`.
fn is_assertion(node: Node<'_>, source: &str) -> bool {
    match node.kind() {
        "assert_statement" => true,
        "call" => {
            let Some(function) = node.child_by_field_name("function") else {
                return false;
            };
            if function.kind() != "attribute" {
                return false;
            }
            let attribute = function
                .child_by_field_name("attribute")
                .map(|attr| node_text(attr, source))
                .unwrap_or_default();
            let object = function
                .child_by_field_name("object")
                .map(|obj| node_text(obj, source))
                .unwrap_or_default();
            attribute.starts_with("assert") || (object == "pytest" && attribute == "raises")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{FileClass, SourceFile};
    use crate::lang::registry::parser_for;
    use std::path::PathBuf;

    fn parse(source: &str) -> ParsedFile {
        let path = PathBuf::from("demo.py");
        let mut parser = parser_for(Language::Python, &path).unwrap();
        let tree = parser.parse(source, None).unwrap();
        ParsedFile {
            file: SourceFile {
                path: path.clone(),
                relative_path: path,
                language: Language::Python,
                class: FileClass::Source,
            },
            source: source.to_string(),
            tree,
        }
    }

    #[test]
    fn test_method_name_qualified_by_class() {
        let parsed = parse("class Store:\n    def get(self):\n        return 1\n");
        let mut name = None;
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() == "function_definition" {
                name = PythonSpec.function_name(node, &parsed.source);
            }
        });
        assert_eq!(name.as_deref(), Some("Store.get"));
    }

    #[test]
    fn test_imports_including_relative() {
        let parsed = parse("import os\nimport a.b\nfrom . import sibling\nfrom .util import x\n");
        let specs: Vec<String> = PythonSpec
            .raw_imports(&parsed)
            .into_iter()
            .map(|import| import.spec)
            .collect();
        assert!(specs.contains(&"os".to_string()));
        assert!(specs.contains(&"a.b".to_string()));
        assert!(specs.contains(&".util".to_string()));
    }

    #[test]
    fn test_docstring_coverage() {
        let parsed = parse(
            "def documented():\n    \"\"\"Does a thing.\"\"\"\n    return 1\n\ndef bare():\n    return 2\n\ndef _private():\n    return 3\n",
        );
        let coverage = PythonSpec.doc_coverage(&parsed);
        assert_eq!(coverage.total, 2);
        assert_eq!(coverage.documented, 1);
    }

    #[test]
    fn test_assertion_counting() {
        let parsed = parse(
            "def test_math(self):\n    assert 1 == 1\n    self.assertEqual(2, 2)\n    helper()\n",
        );
        let tests = PythonSpec.test_assertions(&parsed);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].assertions, 2);
    }

    #[test]
    fn test_decision_points_boolean_operators() {
        let parsed = parse("def f(x):\n    if x and x > 1 or x < -1:\n        return 1\n    return 0\n");
        let mut total = 0;
        walk_nodes(parsed.root(), &mut |node| {
            total += PythonSpec.decision_points(node, &parsed.source);
        });
        // if + and + or
        assert_eq!(total, 3);
    }

    #[test]
    fn test_exported_symbols_skip_underscore() {
        let parsed = parse("VERSION = \"1.0\"\n_internal = 2\n\nclass Api:\n    pass\n\ndef _helper():\n    pass\n");
        let names: Vec<String> = PythonSpec
            .exported_symbols(&parsed)
            .into_iter()
            .map(|symbol| symbol.name)
            .collect();
        assert_eq!(names, vec!["VERSION", "Api"]);
    }
}
