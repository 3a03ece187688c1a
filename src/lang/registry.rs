//! Grammar registry and the parsing stage.

use std::path::Path;

use rayon::prelude::*;
use tracing::warn;
use tree_sitter::Parser;

use crate::core::errors::{ArsError, Result};
use crate::lang::common::{
    AnalysisTarget, Language, LanguageBundle, LanguageSpec, ParsedFile,
};
use crate::lang::{go, python, typescript};

/// The language spec (AST vocabulary) for one language.
pub fn spec_for(language: Language) -> Result<&'static dyn LanguageSpec> {
    match language {
        Language::Go => Ok(&go::GoSpec),
        Language::Python => Ok(&python::PythonSpec),
        Language::TypeScript => Ok(&typescript::TypeScriptSpec),
        Language::Unknown => Err(ArsError::toolchain(
            "unknown",
            "no parser registered for this language",
        )),
    }
}

/// Pick the tree-sitter grammar for a file of the given language.
///
/// TypeScript files with JSX syntax (`.tsx`) and plain JavaScript
/// (`.js`/`.jsx`) each need their own grammar.
fn grammar_for(language: Language, path: &Path) -> Result<tree_sitter::Language> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match language {
        Language::Go => Ok(tree_sitter_go::LANGUAGE.into()),
        Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
        Language::TypeScript => match extension.as_str() {
            "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
            "js" | "jsx" => Ok(tree_sitter_javascript::LANGUAGE.into()),
            _ => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        },
        Language::Unknown => Err(ArsError::toolchain(
            "unknown",
            "no grammar registered for this language",
        )),
    }
}

/// A parser configured for one file.
pub fn parser_for(language: Language, path: &Path) -> Result<Parser> {
    let grammar = grammar_for(language, path)?;
    let mut parser = Parser::new();
    parser.set_language(&grammar).map_err(|err| {
        ArsError::toolchain(
            language.name(),
            format!("failed to initialize grammar: {err}"),
        )
    })?;
    Ok(parser)
}

/// Parse every file of a target on the rayon pool.
///
/// Per-file read or parse failures are warnings; the file is skipped.
/// Grammar initialization failure is fatal, checked up front so the
/// error surfaces before any worker runs.
pub fn parse_target(target: &AnalysisTarget) -> Result<LanguageBundle> {
    if let Some(first) = target.files.first() {
        parser_for(target.language, &first.path)?;
    }

    let mut files: Vec<(usize, ParsedFile)> = target
        .files
        .par_iter()
        .enumerate()
        .filter_map(|(index, file)| {
            let source = match std::fs::read_to_string(&file.path) {
                Ok(source) => source,
                Err(err) => {
                    warn!(path = %file.path.display(), error = %err, "failed to read file");
                    return None;
                }
            };

            let mut parser = match parser_for(target.language, &file.path) {
                Ok(parser) => parser,
                Err(err) => {
                    warn!(path = %file.path.display(), error = %err, "failed to build parser");
                    return None;
                }
            };

            let tree = match parser.parse(&source, None) {
                Some(tree) => tree,
                None => {
                    warn!(path = %file.path.display(), "tree-sitter produced no tree; skipping");
                    return None;
                }
            };

            Some((
                index,
                ParsedFile {
                    file: file.clone(),
                    source,
                    tree,
                },
            ))
        })
        .collect();

    // Restore discovery order lost to parallel completion.
    files.sort_by_key(|(index, _)| *index);

    Ok(LanguageBundle {
        language: target.language,
        files: files.into_iter().map(|(_, parsed)| parsed).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::{FileClass, SourceFile};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn target_with(temp: &TempDir, name: &str, language: Language, body: &str) -> AnalysisTarget {
        let path = temp.path().join(name);
        fs::write(&path, body).unwrap();
        AnalysisTarget {
            language,
            root: temp.path().to_path_buf(),
            files: vec![SourceFile {
                path,
                relative_path: PathBuf::from(name),
                language,
                class: FileClass::Source,
            }],
        }
    }

    #[test]
    fn test_parse_each_language() {
        let temp = TempDir::new().unwrap();

        let go = target_with(&temp, "a.go", Language::Go, "package a\nfunc F() {}\n");
        assert_eq!(parse_target(&go).unwrap().files.len(), 1);

        let py = target_with(&temp, "b.py", Language::Python, "def f():\n    pass\n");
        assert_eq!(parse_target(&py).unwrap().files.len(), 1);

        let ts = target_with(&temp, "c.ts", Language::TypeScript, "export const x = 1;\n");
        assert_eq!(parse_target(&ts).unwrap().files.len(), 1);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        let mut target = target_with(&temp, "a.py", Language::Python, "x = 1\n");
        target.files.push(SourceFile {
            path: temp.path().join("missing.py"),
            relative_path: PathBuf::from("missing.py"),
            language: Language::Python,
            class: FileClass::Source,
        });

        let bundle = parse_target(&target).unwrap();
        assert_eq!(bundle.files.len(), 1);
    }
}
