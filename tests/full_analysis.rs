//! End-to-end pipeline scenarios over fixture repositories.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use agentready::analyzers::{Category, CategoryMetrics};
use agentready::core::config::ArsConfig;
use agentready::core::pipeline::{AnalysisReport, Pipeline};

fn write(root: &Path, name: &str, contents: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

async fn scan(root: &Path) -> AnalysisReport {
    Pipeline::new(ArsConfig::default())
        .run(root)
        .await
        .unwrap()
}

fn metrics_of(report: &AnalysisReport, category: Category) -> &CategoryMetrics {
    report
        .results
        .iter()
        .find(|result| result.category == category)
        .and_then(|result| result.metrics.as_ref())
        .unwrap_or_else(|| panic!("no metrics for {category}"))
}

#[tokio::test]
async fn multi_language_repo() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "README.md", &"readme word ".repeat(200));
    write(root, "CHANGELOG.md", "## 1.0.0\n- initial\n");
    write(root, "docs/architecture.mermaid", "graph TD; a-->b;\n");
    write(root, "go.mod", "module example.com/poly\n");
    write(
        root,
        "server.go",
        "package main\n\n// Serve runs the server.\nfunc Serve(port int) int {\n\tif port == 0 {\n\t\tport = 8080\n\t}\n\treturn port\n}\n",
    );
    write(
        root,
        "worker.py",
        "def process(items):\n    \"\"\"Process items.\"\"\"\n    done = []\n    for item in items:\n        if item:\n            done.append(item)\n    return done\n",
    );
    write(
        root,
        "src/view.ts",
        "export function render(name: string): string {\n  return name ? `<p>${name}</p>` : '';\n}\n",
    );

    let report = scan(root).await;

    let CategoryMetrics::Documentation(docs) = metrics_of(&report, Category::Documentation)
    else {
        panic!("wrong variant");
    };
    assert!(docs.readme_present);
    assert_eq!(docs.readme_word_count, 400);
    assert!(docs.changelog_present);
    assert!(docs.diagrams_present);

    let CategoryMetrics::CodeHealth(health) = metrics_of(&report, Category::CodeHealth) else {
        panic!("wrong variant");
    };
    // One function-metric contribution per language, merged.
    assert!(health.functions.iter().any(|f| f.file.ends_with(".go")));
    assert!(health.functions.iter().any(|f| f.file.ends_with(".py")));
    assert!(health.functions.iter().any(|f| f.file.ends_with(".ts")));
}

#[tokio::test]
async fn rename_only_duplication_scores_high() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    let body = |a: &str, b: &str, c: &str| {
        format!(
            "def compute(values):\n    {a} = 0\n    for value in values:\n        if value > 0:\n            {a} = {a} + value\n        else:\n            {a} = {a} - value\n    {b} = {a} * 2\n    {c} = {b} + 10\n    {c} = {c} * {c}\n    print({a})\n    print({b})\n    print({c})\n    if {c} > 100:\n        {c} = 100\n    while {a} > 0:\n        {a} = {a} - 1\n    print('done')\n    print('really done')\n    return {c}\n"
        )
    };
    write(root, "alpha.py", &body("total", "double", "result"));
    write(root, "beta.py", &body("acc", "twice", "answer"));

    let report = scan(root).await;
    let CategoryMetrics::CodeHealth(health) = metrics_of(&report, Category::CodeHealth) else {
        panic!("wrong variant");
    };
    assert!(
        !health.duplicate_blocks.is_empty(),
        "expected at least one duplicate block"
    );
    assert!(
        health.duplication_rate >= 80.0,
        "rate was {}",
        health.duplication_rate
    );
}

#[tokio::test]
async fn python_import_cycle_detected() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "a.py", "import b\n\ndef use_b():\n    return b.value\n");
    write(root, "b.py", "import a\n\nvalue = 1\n");

    let report = scan(root).await;
    let CategoryMetrics::Architecture(architecture) =
        metrics_of(&report, Category::Architecture)
    else {
        panic!("wrong variant");
    };
    assert_eq!(architecture.circular_dependencies.len(), 1);
    assert_eq!(architecture.circular_dependencies[0], vec!["a", "b"]);
}

#[tokio::test]
async fn coverage_report_feeds_testing_metrics() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, "lib.py", "def f():\n    return 1\n");
    write(root, "test_lib.py", "def test_f():\n    assert f() == 1\n");
    write(root, "lcov.info", "SF:lib.py\nDA:1,1\nDA:2,1\nLF:2\nLH:2\nend_of_record\n");

    let report = scan(root).await;
    let CategoryMetrics::Testing(testing) = metrics_of(&report, Category::Testing) else {
        panic!("wrong variant");
    };
    assert_eq!(testing.coverage_percent, Some(100.0));
    assert_eq!(testing.coverage_format.as_deref(), Some("lcov"));
    assert_eq!(testing.test_file_count, 1);
}

#[tokio::test]
async fn discovery_invariant_holds_on_mixed_repo() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write(root, ".gitignore", "scratch/\n");
    write(root, "go.mod", "module example.com/mixed\n");
    write(root, "main.go", "package main\nfunc main() {}\n");
    write(root, "main_test.go", "package main\n");
    write(
        root,
        "gen.go",
        "// Code generated by stringer. DO NOT EDIT.\npackage main\n",
    );
    write(root, "util.py", "x = 1\n");
    write(root, "scratch/tmp.py", "x = 2\n");

    let report = scan(root).await;
    let discovery = &report.discovery;

    let class_total: usize = discovery.class_counts.values().sum();
    let language_total: usize = discovery.language_counts.values().sum();
    assert_eq!(discovery.files.len(), class_total);
    assert_eq!(discovery.files.len(), language_total);

    assert_eq!(discovery.class_counts["generated"], 1);
    assert_eq!(discovery.class_counts["test"], 1);
    assert!(!discovery
        .files
        .iter()
        .any(|file| file.relative_path.starts_with("scratch")));
}

#[tokio::test]
async fn composite_is_always_in_range() {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    write(root, "only.py", "def f():\n    pass\n");

    let report = scan(root).await;
    assert!(report.scored.composite >= 1.0);
    assert!(report.scored.composite <= 10.0);

    // Tier is the unique mapping of the composite.
    let expected = agentready::Tier::from_composite(report.scored.composite);
    assert_eq!(report.scored.tier, expected);
}
