//! File discovery and classification.
//!
//! Walks the scan root, classifies every candidate file by language and
//! role, and honors ignore rules. Only the absence of a recognized
//! project is fatal; symlinks, permission errors, and unreadable files
//! are counted and skipped.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

use crate::core::errors::{ArsError, Result};
use crate::lang::Language;

/// Directories whose entire subtree is pruned from the walk.
const PRUNED_DIRS: &[&str] = &[
    ".git",
    "vendor",
    "node_modules",
    "__pycache__",
    ".venv",
    "dist",
    "build",
    "target",
    "third_party",
];

/// Files whose presence marks a directory as a recognizable project root.
const PROJECT_MARKERS: &[&str] = &[
    "go.mod",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "package.json",
    "tsconfig.json",
];

/// Why a classified file was excluded from analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExcludeReason {
    /// Vendored third-party code.
    Vendor,
    /// Matched a root-level gitignore pattern.
    Gitignore,
    /// Symbolic link (never followed).
    Symlink,
    /// Permission denied or unreadable.
    Permission,
    /// Hidden file or directory.
    Hidden,
    /// Inside `node_modules`.
    NodeModules,
    /// Inside a third-party directory.
    ThirdParty,
    /// File name begins with `_` or `.`.
    UnderscorePrefix,
}

/// Role of a classified file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileClass {
    /// Production source code.
    Source,
    /// Test code by path or naming convention.
    Test,
    /// Tool-generated code bearing a do-not-edit marker.
    Generated,
    /// Excluded from analysis, with a reason.
    Excluded(ExcludeReason),
}

impl FileClass {
    /// Stable bucket label for counting.
    pub fn label(self) -> &'static str {
        match self {
            FileClass::Source => "source",
            FileClass::Test => "test",
            FileClass::Generated => "generated",
            FileClass::Excluded(_) => "excluded",
        }
    }
}

/// One classified file. Insertion order in [`DiscoveryResult::files`]
/// follows the (sorted) walk order for deterministic output.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the scan root.
    pub relative_path: PathBuf,
    /// Detected language.
    pub language: Language,
    /// Role classification.
    pub class: FileClass,
}

/// Result of the discovery stage.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryResult {
    /// Canonicalized scan root.
    pub root: PathBuf,
    /// Every classified file, in walk order.
    pub files: Vec<SourceFile>,
    /// File counts per class label.
    pub class_counts: BTreeMap<&'static str, usize>,
    /// File counts per language.
    pub language_counts: BTreeMap<Language, usize>,
    /// Files skipped due to per-file errors.
    pub skipped: usize,
    /// Symlinks encountered (never followed).
    pub symlinks: usize,
}

impl DiscoveryResult {
    /// Source-role files only.
    pub fn source_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files
            .iter()
            .filter(|file| file.class == FileClass::Source)
    }

    /// Test-role files only.
    pub fn test_files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files
            .iter()
            .filter(|file| file.class == FileClass::Test)
    }

    /// All languages with at least one source- or test-role file.
    pub fn languages_present(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self
            .files
            .iter()
            .filter(|file| matches!(file.class, FileClass::Source | FileClass::Test))
            .map(|file| file.language)
            .collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

/// Walk `root` and classify every candidate file.
///
/// Fails only with [`ArsError::InvalidInput`] when the root is missing,
/// not a directory, or no recognized project is found.
pub fn discover(root: &Path) -> Result<DiscoveryResult> {
    let root = root.canonicalize().map_err(|err| {
        ArsError::invalid_input(
            root,
            format!("directory does not exist or is unreadable ({err}); pass a repository root"),
        )
    })?;
    if !root.is_dir() {
        return Err(ArsError::invalid_input(
            &root,
            "not a directory; pass the repository root to scan",
        ));
    }

    let gitignore = load_root_gitignore(&root);

    let mut files = Vec::new();
    let mut class_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut language_counts: BTreeMap<Language, usize> = BTreeMap::new();
    let mut skipped = 0usize;
    let mut symlinks = 0usize;

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            !should_prune_dir(entry.path(), &root, gitignore.as_ref())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                skipped += 1;
                warn!(error = %err, "skipping unreadable entry");
                continue;
            }
        };

        if entry.path_is_symlink() {
            symlinks += 1;
            continue;
        }
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let language = Language::from_extension(extension);
        if language == Language::Unknown {
            continue;
        }

        let relative = path.strip_prefix(&root).unwrap_or(path).to_path_buf();
        let class = match classify(path, &relative, language, gitignore.as_ref()) {
            Ok(class) => class,
            Err(err) => {
                skipped += 1;
                warn!(path = %path.display(), error = %err, "skipping unreadable file");
                continue;
            }
        };

        *class_counts.entry(class.label()).or_default() += 1;
        *language_counts.entry(language).or_default() += 1;
        files.push(SourceFile {
            path: path.to_path_buf(),
            relative_path: relative,
            language,
            class,
        });
    }

    if files.is_empty() && !has_project_marker(&root) {
        return Err(ArsError::invalid_input(
            &root,
            "no recognized project found (expected a Go module file, Python project file, \
             Node.js manifest, or source files in .go/.py/.ts/.js)",
        ));
    }

    Ok(DiscoveryResult {
        root,
        files,
        class_counts,
        language_counts,
        skipped,
        symlinks,
    })
}

/// Build a matcher from the root-level `.gitignore`, when present.
/// Nested ignore files are intentionally not loaded.
fn load_root_gitignore(root: &Path) -> Option<Gitignore> {
    let ignore_file = root.join(".gitignore");
    if !ignore_file.is_file() {
        return None;
    }

    let mut builder = GitignoreBuilder::new(root);
    if let Some(err) = builder.add(&ignore_file) {
        warn!(error = %err, "failed to parse root .gitignore; ignoring it");
        return None;
    }
    match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(err) => {
            warn!(error = %err, "failed to build gitignore matcher; ignoring it");
            None
        }
    }
}

fn should_prune_dir(path: &Path, root: &Path, gitignore: Option<&Gitignore>) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    if PRUNED_DIRS.contains(&name) {
        return true;
    }
    if name.starts_with('.') {
        return true;
    }

    if let Some(gitignore) = gitignore {
        let relative = path.strip_prefix(root).unwrap_or(path);
        if gitignore.matched(relative, true).is_ignore() {
            return true;
        }
    }

    false
}

fn classify(
    path: &Path,
    relative: &Path,
    language: Language,
    gitignore: Option<&Gitignore>,
) -> std::io::Result<FileClass> {
    if let Some(gitignore) = gitignore {
        if gitignore.matched(relative, false).is_ignore() {
            return Ok(FileClass::Excluded(ExcludeReason::Gitignore));
        }
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    if in_test_directory(relative) || is_test_file_name(name, language) {
        return Ok(FileClass::Test);
    }

    if name.starts_with('_') || name.starts_with('.') {
        return Ok(FileClass::Excluded(ExcludeReason::UnderscorePrefix));
    }

    if is_generated(path)? {
        return Ok(FileClass::Generated);
    }

    Ok(FileClass::Source)
}

/// True when any directory segment of the relative path is a platform
/// test-directory marker.
fn in_test_directory(relative: &Path) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent.components().any(|component| {
        matches!(
            component.as_os_str().to_str(),
            Some("tests") | Some("__tests__")
        )
    })
}

fn is_test_file_name(name: &str, language: Language) -> bool {
    match language {
        Language::Go => name.ends_with("_test.go"),
        Language::Python => {
            (name.starts_with("test_") && name.ends_with(".py"))
                || name.ends_with("_test.py")
                || name == "conftest.py"
        }
        Language::TypeScript => name.contains(".test.") || name.contains(".spec."),
        Language::Unknown => false,
    }
}

/// Sniff the first KiB for an auto-generation marker, scanning comment
/// lines up to the first non-blank, non-comment token.
fn is_generated(path: &Path) -> std::io::Result<bool> {
    let mut head = vec![0u8; 1024];
    let mut file = std::fs::File::open(path)?;
    let read = file.read(&mut head)?;
    head.truncate(read);
    Ok(head_has_generated_marker(&String::from_utf8_lossy(&head)))
}

fn head_has_generated_marker(head: &str) -> bool {
    const COMMENT_TOKENS: &[&str] = &["//", "#", "/*", "*", "<!--"];

    for line in head.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !COMMENT_TOKENS.iter().any(|token| trimmed.starts_with(token)) {
            return false;
        }

        let lower = trimmed.to_ascii_lowercase();
        if (trimmed.contains("Code generated") && trimmed.contains("DO NOT EDIT"))
            || lower.contains("@generated")
            || lower.contains("auto-generated")
            || lower.contains("automatically generated")
        {
            return true;
        }
    }
    false
}

/// Check for a project marker at root or an immediate child directory.
fn has_project_marker(root: &Path) -> bool {
    if PROJECT_MARKERS
        .iter()
        .any(|marker| root.join(marker).is_file())
    {
        return true;
    }

    let Ok(entries) = std::fs::read_dir(root) else {
        return false;
    };
    entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .any(|entry| {
            PROJECT_MARKERS
                .iter()
                .any(|marker| entry.path().join(marker).is_file())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_empty_directory_is_not_a_project() {
        let temp = TempDir::new().unwrap();
        let err = discover(temp.path()).unwrap_err();
        assert!(matches!(err, ArsError::InvalidInput { .. }));
    }

    #[test]
    fn test_counts_invariant() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "go.mod", "module example.com/demo\n");
        touch(temp.path(), "main.go", "package main\nfunc main() {}\n");
        touch(temp.path(), "main_test.go", "package main\n");
        touch(temp.path(), "util.py", "x = 1\n");

        let result = discover(temp.path()).unwrap();
        let class_total: usize = result.class_counts.values().sum();
        let language_total: usize = result.language_counts.values().sum();
        assert_eq!(result.files.len(), class_total);
        assert_eq!(result.files.len(), language_total);
    }

    #[test]
    fn test_language_classification() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.go", "package a\n");
        touch(temp.path(), "b.py", "x = 1\n");
        touch(temp.path(), "c.ts", "const x = 1;\n");
        touch(temp.path(), "d.jsx", "const x = 1;\n");
        touch(temp.path(), "notes.txt", "ignored\n");

        let result = discover(temp.path()).unwrap();
        assert_eq!(result.files.len(), 4);
        assert_eq!(result.language_counts[&Language::Go], 1);
        assert_eq!(result.language_counts[&Language::Python], 1);
        assert_eq!(result.language_counts[&Language::TypeScript], 2);
    }

    #[test]
    fn test_test_conventions() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "pkg_test.go", "package pkg\n");
        touch(temp.path(), "test_app.py", "x = 1\n");
        touch(temp.path(), "conftest.py", "x = 1\n");
        touch(temp.path(), "app.spec.ts", "const x = 1;\n");
        touch(temp.path(), "tests/helper.py", "x = 1\n");
        touch(temp.path(), "src/__tests__/view.ts", "const x = 1;\n");
        touch(temp.path(), "src/app.ts", "const x = 1;\n");

        let result = discover(temp.path()).unwrap();
        assert_eq!(result.class_counts["test"], 6);
        assert_eq!(result.class_counts["source"], 1);
    }

    #[test]
    fn test_pruned_directories() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "main.go", "package main\n");
        touch(temp.path(), "vendor/dep/dep.go", "package dep\n");
        touch(temp.path(), "node_modules/lib/index.js", "module.exports = {};\n");
        touch(temp.path(), ".hidden/secret.py", "x = 1\n");

        let result = discover(temp.path()).unwrap();
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].relative_path, PathBuf::from("main.go"));
    }

    #[test]
    fn test_gitignore_exclusion() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), ".gitignore", "generated/\nscratch.py\n");
        touch(temp.path(), "main.py", "x = 1\n");
        touch(temp.path(), "scratch.py", "x = 1\n");
        touch(temp.path(), "generated/out.py", "x = 1\n");

        let result = discover(temp.path()).unwrap();
        let scratch = result
            .files
            .iter()
            .find(|file| file.relative_path == PathBuf::from("scratch.py"))
            .unwrap();
        assert_eq!(
            scratch.class,
            FileClass::Excluded(ExcludeReason::Gitignore)
        );
        assert!(!result
            .files
            .iter()
            .any(|file| file.relative_path.starts_with("generated")));
    }

    #[test]
    fn test_generated_marker_detection() {
        let temp = TempDir::new().unwrap();
        touch(
            temp.path(),
            "gen.go",
            "// Code generated by protoc-gen-go. DO NOT EDIT.\npackage gen\n",
        );
        touch(temp.path(), "gen.py", "# @generated by thrift\nx = 1\n");
        touch(temp.path(), "hand.go", "package hand\n// Code generated comment later is ignored. DO NOT EDIT.\n");

        let result = discover(temp.path()).unwrap();
        let class_of = |name: &str| {
            result
                .files
                .iter()
                .find(|file| file.relative_path == PathBuf::from(name))
                .unwrap()
                .class
        };
        assert_eq!(class_of("gen.go"), FileClass::Generated);
        assert_eq!(class_of("gen.py"), FileClass::Generated);
        assert_eq!(class_of("hand.go"), FileClass::Source);
    }

    #[test]
    fn test_underscore_prefix_excluded() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "main.py", "x = 1\n");
        touch(temp.path(), "_private.py", "x = 1\n");

        let result = discover(temp.path()).unwrap();
        let private = result
            .files
            .iter()
            .find(|file| file.relative_path == PathBuf::from("_private.py"))
            .unwrap();
        assert_eq!(
            private.class,
            FileClass::Excluded(ExcludeReason::UnderscorePrefix)
        );
    }

    #[test]
    fn test_marker_only_project_is_valid() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "package.json", "{}\n");
        let result = discover(temp.path()).unwrap();
        assert!(result.files.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_counted_not_followed() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "real.py", "x = 1\n");
        std::os::unix::fs::symlink(temp.path().join("real.py"), temp.path().join("link.py"))
            .unwrap();

        let result = discover(temp.path()).unwrap();
        assert_eq!(result.symlinks, 1);
        assert_eq!(result.files.len(), 1);
    }
}
