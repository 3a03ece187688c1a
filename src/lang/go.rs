//! Go language spec backed by tree-sitter-go.

use tree_sitter::Node;

use crate::lang::common::{
    node_lines, node_text, walk_nodes, DocCoverage, ExportedSymbol, LanguageSpec, ParsedFile,
    RawImport, SymbolKind, TestFunctionAssertions,
};
use crate::lang::Language;

/// AST vocabulary for Go.
pub struct GoSpec;

/// Import prefixes that mark a Go test as performing external I/O.
const GO_IO_IMPORTS: &[&str] = &[
    "net",
    "net/http",
    "net/rpc",
    "os",
    "os/exec",
    "io/ioutil",
    "database/sql",
    "syscall",
];

impl LanguageSpec for GoSpec {
    fn language(&self) -> Language {
        Language::Go
    }

    fn is_function(&self, kind: &str) -> bool {
        matches!(
            kind,
            "function_declaration" | "method_declaration" | "func_literal"
        )
    }

    fn function_name(&self, node: Node<'_>, source: &str) -> Option<String> {
        match node.kind() {
            "function_declaration" => Some(field_text(node, "name", source)?),
            "method_declaration" => {
                let name = field_text(node, "name", source)?;
                match receiver_type(node, source) {
                    Some(receiver) => Some(format!("{receiver}.{name}")),
                    None => Some(name),
                }
            }
            _ => None,
        }
    }

    fn decision_points(&self, node: Node<'_>, source: &str) -> u32 {
        match node.kind() {
            "if_statement" | "for_statement" => 1,
            // Non-default switch/select arms; default_case is a distinct kind.
            "expression_case" | "type_case" | "communication_case" => 1,
            "binary_expression" => {
                let operator = node
                    .child_by_field_name("operator")
                    .map(|op| node_text(op, source))
                    .unwrap_or_default();
                u32::from(operator == "&&" || operator == "||")
            }
            _ => 0,
        }
    }

    fn is_block(&self, kind: &str) -> bool {
        kind == "block"
    }

    fn is_identifier(&self, kind: &str) -> bool {
        matches!(
            kind,
            "identifier" | "field_identifier" | "type_identifier" | "package_identifier"
                | "label_name"
        )
    }

    fn is_literal(&self, kind: &str) -> bool {
        matches!(
            kind,
            "interpreted_string_literal"
                | "raw_string_literal"
                | "int_literal"
                | "float_literal"
                | "imaginary_literal"
                | "rune_literal"
                | "nil"
                | "true"
                | "false"
        )
    }

    fn is_comment(&self, kind: &str) -> bool {
        kind == "comment"
    }

    fn raw_imports(&self, parsed: &ParsedFile) -> Vec<RawImport> {
        let mut imports = Vec::new();
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() != "import_spec" {
                return;
            }
            if let Some(path_node) = node.child_by_field_name("path") {
                let spec = unquote(node_text(path_node, &parsed.source));
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

        for node in root.children(&mut cursor) {
            match node.kind() {
                "function_declaration" | "method_declaration" => {
                    if let Some(name) = field_text(node, "name", &parsed.source) {
                        push_exported(&mut symbols, name, SymbolKind::Function, node);
                    }
                }
                "type_declaration" => {
                    collect_spec_names(node, "type_spec", &parsed.source, &mut |name, spec| {
                        push_exported(&mut symbols, name, SymbolKind::Type, spec);
                    });
                }
                "var_declaration" | "const_declaration" => {
                    let spec_kind = if node.kind() == "var_declaration" {
                        "var_spec"
                    } else {
                        "const_spec"
                    };
                    collect_spec_names(node, spec_kind, &parsed.source, &mut |name, spec| {
                        push_exported(&mut symbols, name, SymbolKind::Variable, spec);
                    });
                }
                _ => {}
            }
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

        for node in root.children(&mut cursor) {
            let name = match node.kind() {
                "function_declaration" | "method_declaration" => {
                    field_text(node, "name", &parsed.source)
                }
                "type_declaration" => first_spec_name(node, "type_spec", &parsed.source),
                _ => None,
            };
            let Some(name) = name else { continue };
            if !is_exported_name(&name) {
                continue;
            }

            coverage.total += 1;
            if has_adjacent_doc_comment(node) {
                coverage.documented += 1;
            }
        }
        coverage
    }

    fn test_assertions(&self, parsed: &ParsedFile) -> Vec<TestFunctionAssertions> {
        let mut tests = Vec::new();
        let root = parsed.root();
        let mut cursor = root.walk();

        for node in root.children(&mut cursor) {
            if node.kind() != "function_declaration" {
                continue;
            }
            let Some(name) = field_text(node, "name", &parsed.source) else {
                continue;
            };
            if !name.starts_with("Test") && !name.starts_with("Benchmark") {
                continue;
            }

            let mut assertions = 0usize;
            walk_nodes(node, &mut |inner| {
                if inner.kind() == "call_expression" && is_assertion_callee(inner, &parsed.source)
                {
                    assertions += 1;
                }
            });
            tests.push(TestFunctionAssertions { name, assertions });
        }
        tests
    }

    fn io_blocklist(&self) -> &'static [&'static str] {
        GO_IO_IMPORTS
    }
}

fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|child| node_text(child, source).to_string())
        .filter(|text| !text.is_empty())
}

/// Receiver type name for a method declaration, pointer and parens
/// stripped: `(s *Server)` -> `Server`.
fn receiver_type(node: Node<'_>, source: &str) -> Option<String> {
    let receiver = node.child_by_field_name("receiver")?;
    let mut found = None;
    walk_nodes(receiver, &mut |inner| {
        if found.is_none() && inner.kind() == "type_identifier" {
            found = Some(node_text(inner, source).to_string());
        }
    });
    found
}

fn unquote(raw: &str) -> String {
    raw.trim_matches(|ch| ch == '"' || ch == '`').to_string()
}

/// Go visibility convention: an uppercase first letter exports a symbol.
fn is_exported_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn push_exported(
    symbols: &mut Vec<ExportedSymbol>,
    name: String,
    kind: SymbolKind,
    node: Node<'_>,
) {
    if is_exported_name(&name) {
        symbols.push(ExportedSymbol {
            name,
            kind,
            line: node_lines(node).0,
        });
    }
}

/// Collect declared names from `type_spec`/`var_spec`/`const_spec`
/// children, grouped declarations included.
fn collect_spec_names(
    node: Node<'_>,
    spec_kind: &str,
    source: &str,
    found: &mut dyn FnMut(String, Node<'_>),
) {
    walk_nodes(node, &mut |child| {
        if child.kind() != spec_kind {
            return;
        }
        if let Some(name_node) = child.child_by_field_name("name") {
            let text = node_text(name_node, source);
            if !text.is_empty() {
                found(text.to_string(), child);
            }
        } else {
            // var/const specs may declare several names before the type.
            let mut cursor = child.walk();
            for spec_child in child.children(&mut cursor) {
                if spec_child.kind() == "identifier" {
                    found(node_text(spec_child, source).to_string(), child);
                }
            }
        }
    });
}

fn first_spec_name(node: Node<'_>, spec_kind: &str, source: &str) -> Option<String> {
    let mut first = None;
    collect_spec_names(node, spec_kind, source, &mut |name, _| {
        if first.is_none() {
            first = Some(name);
        }
    });
    first
}

/// A declaration is documented when a comment group ends on the line
/// directly above it.
fn has_adjacent_doc_comment(node: Node<'_>) -> bool {
    let Some(previous) = node.prev_sibling() else {
        return false;
    };
    previous.kind() == "comment" && previous.end_position().row + 1 == node.start_position().row
}

/// Recognize `t`/`b` testing helpers and testify-style asserts.
fn is_assertion_callee(call: Node<'_>, source: &str) -> bool {
    let Some(function) = call.child_by_field_name("function") else {
        return false;
    };
    if function.kind() != "selector_expression" {
        return false;
    }

    let operand = function
        .child_by_field_name("operand")
        .map(|node| node_text(node, source))
        .unwrap_or_default();
    let field = function
        .child_by_field_name("field")
        .map(|node| node_text(node, source))
        .unwrap_or_default();

    match operand {
        "t" | "b" => matches!(
            field,
            "Error" | "Errorf" | "Fatal" | "Fatalf" | "Fail" | "FailNow"
        ),
        "assert" | "require" => true,
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
        parse_as(source, FileClass::Source)
    }

    fn parse_as(source: &str, class: FileClass) -> ParsedFile {
        let path = PathBuf::from("demo.go");
        let mut parser = parser_for(Language::Go, &path).unwrap();
        let tree = parser.parse(source, None).unwrap();
        ParsedFile {
            file: SourceFile {
                path: path.clone(),
                relative_path: path,
                language: Language::Go,
                class,
            },
            source: source.to_string(),
            tree,
        }
    }

    #[test]
    fn test_method_name_qualified_by_receiver() {
        let parsed = parse("package a\n\nfunc (s *Server) Start() {}\n");
        let mut name = None;
        walk_nodes(parsed.root(), &mut |node| {
            if node.kind() == "method_declaration" {
                name = GoSpec.function_name(node, &parsed.source);
            }
        });
        assert_eq!(name.as_deref(), Some("Server.Start"));
    }

    #[test]
    fn test_imports_extracted() {
        let parsed = parse(
            "package a\n\nimport (\n\t\"fmt\"\n\t\"example.com/demo/internal/db\"\n)\n",
        );
        let specs: Vec<String> = GoSpec
            .raw_imports(&parsed)
            .into_iter()
            .map(|import| import.spec)
            .collect();
        assert_eq!(specs, vec!["fmt", "example.com/demo/internal/db"]);
    }

    #[test]
    fn test_exported_symbols() {
        let parsed = parse(
            "package a\n\nfunc Public() {}\nfunc private() {}\n\ntype Thing struct{}\n\nvar Count int\n",
        );
        let names: Vec<String> = GoSpec
            .exported_symbols(&parsed)
            .into_iter()
            .map(|symbol| symbol.name)
            .collect();
        assert_eq!(names, vec!["Public", "Thing", "Count"]);
    }

    #[test]
    fn test_doc_coverage_adjacency() {
        let parsed = parse(
            "package a\n\n// Public does a thing.\nfunc Public() {}\n\nfunc Bare() {}\n",
        );
        let coverage = GoSpec.doc_coverage(&parsed);
        assert_eq!(coverage.total, 2);
        assert_eq!(coverage.documented, 1);
    }

    #[test]
    fn test_assertions_counted() {
        let parsed = parse_as(
            "package a\n\nimport \"testing\"\n\nfunc TestThing(t *testing.T) {\n\tt.Error(\"bad\")\n\tassert.Equal(t, 1, 1)\n}\n",
            FileClass::Test,
        );
        let tests = GoSpec.test_assertions(&parsed);
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].assertions, 2);
    }

    #[test]
    fn test_decision_points() {
        let parsed = parse(
            "package a\n\nfunc f(x int) int {\n\tif x > 0 && x < 10 {\n\t\treturn 1\n\t}\n\tfor i := 0; i < x; i++ {\n\t\tx++\n\t}\n\treturn 0\n}\n",
        );
        let mut total = 0;
        walk_nodes(parsed.root(), &mut |node| {
            total += GoSpec.decision_points(node, &parsed.source);
        });
        // if + && + for
        assert_eq!(total, 3);
    }
}
