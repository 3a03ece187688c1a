//! TypeScript/JavaScript language spec backed by tree-sitter-typescript
//! (and tree-sitter-javascript for `.js`/`.jsx`).

use tree_sitter::Node;

use crate::lang::common::{
    node_lines, node_text, walk_nodes, DocCoverage, ExportedSymbol, LanguageSpec, ParsedFile,
    RawImport, SymbolKind, TestFunctionAssertions,
};
use crate::lang::Language;

/// AST vocabulary for TypeScript and JavaScript.
pub struct TypeScriptSpec;

/// Import specifiers that mark a TS/JS test as performing external I/O.
const TS_IO_IMPORTS: &[&str] = &[
    "fs",
    "net",
    "http",
    "https",
    "child_process",
    "node:fs",
    "node:net",
    "node:http",
    "node:child_process",
    "axios",
    "node-fetch",
    "pg",
    "mysql",
    "mysql2",
    "mongodb",
    "sqlite3",
    "ioredis",
];

impl LanguageSpec for TypeScriptSpec {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn is_function(&self, kind: &str) -> bool {
        matches!(
            kind,
            "function_declaration"
                | "function_expression"
                | "generator_function_declaration"
                | "generator_function"
                | "arrow_function"
                | "method_definition"
        )
    }

    fn function_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                field_text(node, "name", source)
            }
            "method_definition" => {
                let name = field_text(node, "name", source)?;
                match enclosing_class_name(node, source) {
                    Some(class) => Some(format!("{class}.{name}")),
                    None => Some(name),
                }
            }
            "arrow_function" | "function_expression" | "generator_function" => {
                // `const handler = () => {...}` borrows the declarator name.
                let parent = node.parent()?;
                if parent.kind() == "variable_declarator" {
                    field_text(parent, "name", source)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn decision_points(&self, node: Node<'_>, source: &str) -> u32 {
        match node.kind() {
            "if_statement" | "for_statement" | "for_in_statement" | "while_statement"
            | "do_statement" | "catch_clause" | "ternary_expression" => 1,
            // switch_default is a distinct kind and does not count.
            "switch_case" => 1,
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, source))
                    .unwrap_or_default();
                u32::from(matches!(operator, "&&" | "||" | "??"))
            }
            _ => 0,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        matches!(kind, "statement_block" | "class_body" | "program")
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(
            kind,
            "identifier"
                | "property_identifier"
                | "shorthand_property_identifier"
                | "shorthand_property_identifier_pattern"
                | "type_identifier"
        )
    }

    fn is_literal(&self, kind: &str) -> bool {
        matches!(
            kind,
            "string" | "template_string" | "number" | "true" | "false" | "null" | "undefined"
                | "regex"
        )
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn raw_imports(&self, parsed: &ParsedFile) -> Vec<RawImport> {
        let mut imports = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if !matches!(node.kind(), "import_statement" | "export_statement") {
                return;
            }
            if let Some(source_node) = node.child_by_field_name("source") {
                let spec = unquote(node_text(source_node, &parsed.source));
                if !spec.is_empty() {
                    imports.push(RawImport {
                        spec,
                        line: node_lines(node).0,
                    });
                }
            }
        });
        imports
    }

    fn exported_symbols(&self, parsed: &ParsedFile) -> Vec<ExportedSymbol> {
        let mut symbols = Vec::new();
        let root = parsed.root();
        let mut cursor = root.walk();

        for statement in root.children(&mut cursor) {
            if statement.kind() != "export_statement" {
                continue;
            }
            // Re-exports belong to the file that declares the symbol.
            if statement.child_by_field_name("source").is_some() {
                continue;
            }
            collect_export_names(statement, &parsed.source, &mut symbols);
        }
        symbols
    }

    fn reference_identifiers(&self, parsed: &ParsedFile) -> Vec<String> {
        let mut names = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if self.is_identifier(node.kind()) {
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
            }
        });
        lines
    }

    fn doc_coverage(&self, parsed: &ParsedFile) -> DocCoverage {
        let mut coverage = DocCoverage::default();
        let root = parsed.root();
        let mut cursor = root.walk();

        for statement in root.children(&mut cursor) {
            if statement.kind() != "export_statement" {
                continue;
            }
            if statement.child_by_field_name("source").is_some() {
                continue;
            }
            let mut names = Vec::new();
            collect_export_names(statement, &parsed.source, &mut names);
            if names.is_empty() {
                continue;
            }

            coverage.total += 1;
            if has_jsdoc(statement, &parsed.source) {
                coverage.documented += 1;
            }
        }
        coverage
    }

    fn test_assertions(&self, parsed: &ParsedFile) -> Vec<TestFunctionAssertions> {
        let mut tests = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() != "call_expression" {
                return;
            }
            let Some(name) = test_call_name(node, &parsed.source) else {
                return;
            };

            let mut assertions = 0usize;
            walk_nodes(node, &mut |inner| {
                if inner.kind() == "call_expression" && is_assertion_callee(inner, &parsed.source)
                {
                    assertions += 1;
                }
            });
            tests.push(TestFunctionAssertions { name, assertions });
        });
        tests
    }

    fn io_blocklist(&self) -> &'static [&'static str] {
        TS_IO_IMPORTS
    }
}

fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source).to_string())
        .filter(|text| !text.is_empty())
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|ch| ch == '"' || ch == '\'' || ch == '`')
        .to_string()
}

fn enclosing_class_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node.parent();
    while let Some(parent) = current {
        if matches!(parent.kind(), "class_declaration" | "class") {
            return field_text(parent, "name", source);
        }
        current = parent.parent();
    }
    None
}

/// Names introduced by one `export` statement: declarations, variable
/// declarators, and `export {...}` clauses.
fn collect_export_names(
    statement: Node<'_>,
    source: &str,
    symbols: &mut Vec<ExportedSymbol>,
) {
    let mut cursor = statement.walk();
    for child in statement.children(&mut cursor) {
        match child.kind() {
            "function_declaration" | "generator_function_declaration" => {
                push_symbol(symbols, child, "name", SymbolKind::Function, source);
            }
            "class_declaration" | "abstract_class_declaration" => {
                push_symbol(symbols, child, "name", SymbolKind::Type, source);
            }
            "interface_declaration" | "type_alias_declaration" | "enum_declaration" => {
                push_symbol(symbols, child, "name", SymbolKind::Type, source);
            }
            "lexical_declaration" | "variable_declaration" => {
                let mut declarator_cursor = child.walk();
                for declarator in child.children(&mut declarator_cursor) {
                    if declarator.kind() == "variable_declarator" {
                        push_symbol(symbols, declarator, "name", SymbolKind::Variable, source);
                    }
                }
            }
            "export_clause" => {
                let mut specifier_cursor = child.walk();
                for specifier in child.children(&mut specifier_cursor) {
                    if specifier.kind() == "export_specifier" {
                        push_symbol(symbols, specifier, "name", SymbolKind::Variable, source);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_symbol(
    symbols: &mut Vec<ExportedSymbol>,
    node: Node<'_>,
    field: &str,
    kind: SymbolKind,
    source: &str,
) {
    if let Some(name) = field_text(node, field, source) {
        symbols.push(ExportedSymbol {
            name,
            kind,
            line: node_lines(node).0,
        });
    }
}

/// JSDoc block (`/** ... */`) directly above the export, allowing at
/// most one blank line.
fn has_jsdoc(statement: Node<'_>, source: &str) -> bool {
    let Some(previous) = statement.prev_sibling() else {
        return false;
    };
    previous.kind() == "comment"
        && previous.end_position().row + 2 >= statement.start_position().row
        && node_text(previous, source).starts_with("/**")
}

/// Name of an `it("...")`/`test("...")` call, `None` otherwise.
fn test_call_name(call: Node<'_>, source: &str) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    let callee = match function.kind() {
        "identifier" => node_text(function, source).to_string(),
        // it.only / test.each style
        "member_expression" => function
            .child_by_field_name("object")
            .filter(|object| object.kind() == "identifier")
            .map(|object| node_text(object, source).to_string())?,
        _ => return None,
    };
    if callee != "it" && callee != "test" {
        return None;
    }

    let arguments = call.child_by_field_name("arguments")?;
    let first = arguments.named_child(0)?;
    if !matches!(first.kind(), "string" | "template_string") {
        return None;
    }
    Some(unquote(node_text(first, source)))
}

/// `expect(...)` roots and `assert.*` member calls.
fn is_assertion_callee(call: Node<'_>, source: &str) -> bool {
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    match function.kind() {
        "identifier" => node_text(function, source) == "expect",
        "member_expression" => function
            .child_by_field_name("object")
            .is_some_and(|object| {
                object.kind() == "identifier" && node_text(object, source) == "assert"
            }),
        _ => false,
    }
}
