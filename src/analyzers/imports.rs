//! Intra-project import graph construction.
//!
//! Each language resolves module identity differently: Go groups files
//! by package directory under the module root, Python by dotted path,
//! TypeScript by extension-stripped relative path. The resulting graph
//! shape is identical, so downstream consumers (coupling, fanout,
//! cycles, dead exports) stay language-agnostic.
//!
//! Test-role files are excluded from both edge directions.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::lang::common::{path_display, LanguageBundle, ParsedFile};
use crate::lang::{spec_for, Language};

/// Module key used for files in the scan root's top directory.
pub const ROOT_MODULE: &str = ".";

/// Directed intra-project import graph over module keys.
#[derive(Debug, Default, Clone)]
pub struct ImportGraph {
    /// Every module seen, with or without edges.
    pub modules: BTreeSet<String>,
    /// module -> modules it imports.
    pub forward: BTreeMap<String, BTreeSet<String>>,
    /// module -> modules importing it.
    pub reverse: BTreeMap<String, BTreeSet<String>>,
    /// `(segment_count, import_path)` per resolved intra-project import.
    pub import_segments: Vec<(usize, String)>,
}

impl ImportGraph {
    fn add_module(&mut self, module: String) {
        self.modules.insert(module);
    }

    fn add_edge(&mut self, from: String, to: String) {
        if from == to {
            return;
        }
        self.modules.insert(from.clone());
        self.modules.insert(to.clone());
        self.forward.entry(from.clone()).or_default().insert(to.clone());
        self.reverse.entry(to).or_default().insert(from);
    }

    /// Outgoing edge count for a module.
    pub fn efferent(&self, module: &str) -> usize {
        self.forward.get(module).map_or(0, BTreeSet::len)
    }

    /// Incoming edge count for a module.
    pub fn afferent(&self, module: &str) -> usize {
        self.reverse.get(module).map_or(0, BTreeSet::len)
    }
}

/// Build the import graph for one language bundle.
pub fn build_import_graph(bundle: &LanguageBundle, root: &Path) -> ImportGraph {
    match bundle.language {
        Language::Go => build_go_graph(bundle, root),
        Language::Python => build_python_graph(bundle),
        Language::TypeScript => build_typescript_graph(bundle),
        Language::Unknown => ImportGraph::default(),
    }
}

/// Module key of one file, language-appropriate.
pub fn module_key(parsed: &ParsedFile) -> String {
    match parsed.file.language {
        Language::Go => go_package_key(&parsed.file.relative_path),
        Language::Python => python_module_key(&parsed.file.relative_path),
        Language::TypeScript => typescript_module_key(&parsed.file.relative_path),
        Language::Unknown => parsed.rel_display(),
    }
}

// ---------------------------------------------------------------------------
// Go

fn build_go_graph(bundle: &LanguageBundle, root: &Path) -> ImportGraph {
    let mut graph = ImportGraph::default();
    let module_path = go_module_path(root);
    let Ok(spec) = spec_for(Language::Go) else {
        return graph;
    };

    for parsed in bundle.sources() {
        let from = go_package_key(&parsed.file.relative_path);
        graph.add_module(from.clone());

        for import in spec.raw_imports(parsed) {
            let Some(module_path) = module_path.as_deref() else {
                continue;
            };
            let Some(inner) = strip_go_module_prefix(&import.spec, module_path) else {
                continue;
            };
            let to = if inner.is_empty() {
                ROOT_MODULE.to_string()
            } else {
                inner.to_string()
            };
            let segments = if inner.is_empty() {
                1
            } else {
                inner.split('/').count()
            };
            graph.import_segments.push((segments, import.spec.clone()));
            graph.add_edge(from.clone(), to);
        }
    }
    graph
}

fn strip_go_module_prefix<'a>(spec: &'a str, module_path: &str) -> Option<&'a str> {
    if spec == module_path {
        return Some("");
    }
    spec.strip_prefix(module_path)
        .and_then(|rest| rest.strip_prefix('/'))
}

/// Package identity is the directory of the file, relative to root.
fn go_package_key(relative: &Path) -> String {
    match relative.parent() {
        Some(parent) if parent.as_os_str().is_empty() => ROOT_MODULE.to_string(),
        Some(parent) => path_display(parent),
        None => ROOT_MODULE.to_string(),
    }
}

/// First `module` directive of the root go.mod, when present.
pub fn go_module_path(root: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(root.join("go.mod")).ok()?;
    contents.lines().find_map(|line| {
        line.trim()
            .strip_prefix("module ")
            .map(|path| path.trim().trim_matches('"').to_string())
    })
}

// ---------------------------------------------------------------------------
// Python

fn build_python_graph(bundle: &LanguageBundle) -> ImportGraph {
    let mut graph = ImportGraph::default();
    let Ok(spec) = spec_for(Language::Python) else {
        return graph;
    };

    let known: BTreeSet<String> = bundle
        .sources()
        .map(|parsed| python_module_key(&parsed.file.relative_path))
        .collect();

    for parsed in bundle.sources() {
        let from = python_module_key(&parsed.file.relative_path);
        graph.add_module(from.clone());

        for import in spec.raw_imports(parsed) {
            let Some(resolved) = resolve_python_import(&import.spec, &from, &known) else {
                continue;
            };
            graph
                .import_segments
                .push((resolved.split('.').count(), resolved.clone()));
            graph.add_edge(from.clone(), resolved);
        }
    }
    graph
}

/// Dotted module name of a file: `a/b.py` -> `a.b`, `a/__init__.py` -> `a`.
fn python_module_key(relative: &Path) -> String {
    let mut parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }
    if parts.last().is_some_and(|last| last == "__init__") {
        parts.pop();
    }
    if parts.is_empty() {
        ROOT_MODULE.to_string()
    } else {
        parts.join(".")
    }
}

/// Resolve a (possibly relative) import to a known project module.
/// Trailing segments are stripped until a known module matches, so
/// `from a.b import name` resolves to `a.b`.
fn resolve_python_import(
    spec: &str,
    importer: &str,
    known: &BTreeSet<String>,
) -> Option<String> {
    let absolute = if let Some(stripped) = spec.strip_prefix('.') {
        let dots = 1 + stripped.chars().take_while(|ch| *ch == '.').count();
        let rest = &spec[dots..];

        // One leading dot addresses the importer's own package.
        let mut base: Vec<&str> = importer.split('.').collect();
        for _ in 0..dots {
            base.pop();
        }
        if !rest.is_empty() {
            base.extend(rest.split('.'));
        }
        if base.is_empty() {
            return None;
        }
        base.join(".")
    } else {
        spec.to_string()
    };

    let mut candidate = absolute.as_str();
    loop {
        if known.contains(candidate) {
            return Some(candidate.to_string());
        }
        match candidate.rfind('.') {
            Some(index) => candidate = &candidate[..index],
            None => return None,
        }
    }
}

// ---------------------------------------------------------------------------
// TypeScript / JavaScript

fn build_typescript_graph(bundle: &LanguageBundle) -> ImportGraph {
    let mut graph = ImportGraph::default();
    let Ok(spec) = spec_for(Language::TypeScript) else {
        return graph;
    };

    let known: BTreeSet<String> = bundle
        .sources()
        .map(|parsed| typescript_module_key(&parsed.file.relative_path))
        .collect();

    for parsed in bundle.sources() {
        let from = typescript_module_key(&parsed.file.relative_path);
        graph.add_module(from.clone());

        for import in spec.raw_imports(parsed) {
            // Only relative specifiers can be intra-project.
            if !import.spec.starts_with('.') {
                continue;
            }
            let Some(resolved) =
                resolve_ts_import(&parsed.file.relative_path, &import.spec, &known)
            else {
                continue;
            };
            let segments = resolved.split('/').count();
            graph.import_segments.push((segments, resolved.clone()));
            graph.add_edge(from.clone(), resolved);
        }
    }
    graph
}

/// Module key: relative path with the extension and any trailing
/// `/index` stripped.
fn typescript_module_key(relative: &Path) -> String {
    let mut display = path_display(relative);
    for extension in [".tsx", ".ts", ".jsx", ".js"] {
        if let Some(stripped) = display.strip_suffix(extension) {
            display = stripped.to_string();
            break;
        }
    }
    if let Some(stripped) = display.strip_suffix("/index") {
        display = stripped.to_string();
    }
    if display.is_empty() {
        ROOT_MODULE.to_string()
    } else {
        display
    }
}

fn resolve_ts_import(
    importer: &Path,
    spec: &str,
    known: &BTreeSet<String>,
) -> Option<String> {
    let base = importer.parent().unwrap_or_else(|| Path::new(""));
    let joined = base.join(spec);

    // Collapse `.` and `..` without touching the filesystem.
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::Normal(part) => normalized.push(part),
            _ => {}
        }
    }

    let key = typescript_module_key(&normalized);
    known.contains(&key).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{FileClass, SourceFile};
    use crate::lang::registry::parser_for;

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

    #[test]
    fn test_python_module_keys() {
        assert_eq!(python_module_key(Path::new("a/b.py")), "a.b");
        assert_eq!(python_module_key(Path::new("a/__init__.py")), "a");
        assert_eq!(python_module_key(Path::new("main.py")), "main");
    }

    #[test]
    fn test_typescript_module_keys() {
        assert_eq!(typescript_module_key(Path::new("src/util.ts")), "src/util");
        assert_eq!(typescript_module_key(Path::new("src/db/index.ts")), "src/db");
        assert_eq!(typescript_module_key(Path::new("app.jsx")), "app");
    }

    #[test]
    fn test_python_cycle() {
        let bundle = LanguageBundle {
            language: Language::Python,
            files: vec![
                parsed_file("a.py", Language::Python, "import b\n"),
                parsed_file("b.py", Language::Python, "import a\n"),
            ],
        };
        let graph = build_python_graph(&bundle);
        assert!(graph.forward["a"].contains("b"));
        assert!(graph.forward["b"].contains("a"));
    }

    #[test]
    fn test_python_relative_import() {
        let bundle = LanguageBundle {
            language: Language::Python,
            files: vec![
                parsed_file("pkg/__init__.py", Language::Python, ""),
                parsed_file("pkg/core.py", Language::Python, "from .util import helper\n"),
                parsed_file("pkg/util.py", Language::Python, "helper = 1\n"),
            ],
        };
        let graph = build_python_graph(&bundle);
        assert!(graph.forward["pkg.core"].contains("pkg.util"));
    }

    #[test]
    fn test_typescript_relative_resolution() {
        let bundle = LanguageBundle {
            language: Language::TypeScript,
            files: vec![
                parsed_file(
                    "src/app.ts",
                    Language::TypeScript,
                    "import { helper } from './lib/util';\nimport fs from 'fs';\n",
                ),
                parsed_file("src/lib/util.ts", Language::TypeScript, "export const helper = 1;\n"),
            ],
        };
        let graph = build_typescript_graph(&bundle);
        assert!(graph.forward["src/app"].contains("src/lib/util"));
        // External imports never create edges.
        assert_eq!(graph.forward["src/app"].len(), 1);
    }

    #[test]
    fn test_go_graph_with_module_prefix() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("go.mod"), "module example.com/demo\n").unwrap();

        let bundle = LanguageBundle {
            language: Language::Go,
            files: vec![
                parsed_file(
                    "cmd/main.go",
                    Language::Go,
                    "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/demo/internal/db\"\n)\n",
                ),
                parsed_file("internal/db/db.go", Language::Go, "package db\n"),
            ],
        };
        let graph = build_go_graph(&bundle, temp.path());
        assert!(graph.forward["cmd"].contains("internal/db"));
        assert_eq!(graph.import_segments.len(), 1);
        assert_eq!(graph.import_segments[0].0, 2);
    }

    #[test]
    fn test_self_edges_dropped() {
        let bundle = LanguageBundle {
            language: Language::Python,
            files: vec![parsed_file("solo.py", Language::Python, "import solo\n")],
        };
        let graph = build_python_graph(&bundle);
        assert!(graph.forward.get("solo").is_none());
        assert!(graph.modules.contains("solo"));
    }
}
