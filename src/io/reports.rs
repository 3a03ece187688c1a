//! Report rendering: terminal summary, JSON, HTML, and badge URL.
//!
//! Renderers consume the finished [`AnalysisReport`] read-only; nothing
//! here feeds back into the pipeline.

use console::style;
use handlebars::Handlebars;
use serde_json::json;

use crate::core::errors::Result;
use crate::core::pipeline::AnalysisReport;
use crate::core::scoring::Tier;

/// Single-page HTML report template.
const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Agent Readiness Report</title>
<style>
  body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 2rem auto; max-width: 52rem; color: #1f2430; }
  h1 { font-size: 1.6rem; }
  .composite { font-size: 2.6rem; font-weight: 700; }
  .tier { display: inline-block; padding: 0.2rem 0.8rem; border-radius: 1rem; color: #fff; background: {{tier_color}}; }
  table { border-collapse: collapse; width: 100%; margin-top: 1.2rem; }
  th, td { text-align: left; padding: 0.45rem 0.6rem; border-bottom: 1px solid #e3e6ec; }
  .sub { color: #697386; font-size: 0.85rem; }
</style>
</head>
<body>
  <h1>Agent Readiness Report</h1>
  <p class="sub">{{root}} &middot; {{file_count}} files &middot; generated {{generated_at}} &middot; agentready {{version}}</p>
  <p><span class="composite">{{composite}}</span> / 10 <span class="tier">{{tier}}</span></p>
  <table>
    <tr><th>Category</th><th>Score</th><th>Weight</th><th></th></tr>
    {{#each categories}}
    <tr>
      <td>{{id}} {{title}}</td>
      <td>{{score}}</td>
      <td>{{weight}}</td>
      <td class="sub">{{note}}</td>
    </tr>
    {{/each}}
  </table>
  <p><img src="{{badge_url}}" alt="Agent Readiness badge"></p>
</body>
</html>
"#;

/// shields.io color slug for a tier.
fn tier_color(tier: Tier) -> &'static str {
    match tier {
        Tier::AgentReady => "brightgreen",
        Tier::AgentAssisted => "green",
        Tier::AgentLimited => "yellow",
        Tier::AgentHostile => "red",
    }
}

/// shields.io badge URL for the composite score.
pub fn badge_url(report: &AnalysisReport) -> String {
    format!(
        "https://img.shields.io/badge/Agent%20Readiness-{:.1}%2F10-{}",
        report.scored.composite,
        tier_color(report.scored.tier)
    )
}

/// Pretty-printed JSON of the full report, for `--json` output.
pub fn render_json(report: &AnalysisReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Human-readable terminal summary.
pub fn render_terminal(report: &AnalysisReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{}\n",
        style("Agent Readiness Score").bold().underlined()
    ));
    out.push_str(&format!(
        "  {} ({} files, {} skipped, {} symlinks)\n\n",
        report.discovery.root.display(),
        report.discovery.files.len(),
        report.discovery.skipped,
        report.discovery.symlinks,
    ));

    for category in &report.scored.categories {
        let note = if category.substituted {
            style(" (substituted)").dim().to_string()
        } else {
            String::new()
        };
        out.push_str(&format!(
            "  {:<3} {:<20} {:>5.1}{}\n",
            category.category.id(),
            category.category.title(),
            category.score,
            note,
        ));
    }

    let tier = report.scored.tier;
    let tier_styled = match tier {
        Tier::AgentReady => style(tier.to_string()).green().bold(),
        Tier::AgentAssisted => style(tier.to_string()).cyan().bold(),
        Tier::AgentLimited => style(tier.to_string()).yellow().bold(),
        Tier::AgentHostile => style(tier.to_string()).red().bold(),
    };
    out.push_str(&format!(
        "\n  {} {:.1} / 10  {}\n",
        style("Composite").bold(),
        report.scored.composite,
        tier_styled,
    ));

    let warnings: Vec<&String> = report
        .results
        .iter()
        .flat_map(|result| result.warnings.iter())
        .collect();
    if !warnings.is_empty() {
        out.push('\n');
        for warning in warnings {
            out.push_str(&format!("  {} {}\n", style("note:").yellow(), warning));
        }
    }
    for result in &report.results {
        if let Some(error) = &result.error {
            out.push_str(&format!(
                "  {} {} failed: {}\n",
                style("warn:").red(),
                result.category.id(),
                error
            ));
        }
    }

    out
}

/// Standalone HTML report.
pub fn render_html(report: &AnalysisReport) -> Result<String> {
    let mut registry = Handlebars::new();
    registry
        .register_template_string("report", HTML_TEMPLATE)
        .map_err(|err| {
            crate::core::errors::ArsError::internal(format!("template error: {err}"))
        })?;

    let categories: Vec<serde_json::Value> = report
        .scored
        .categories
        .iter()
        .map(|category| {
            json!({
                "id": category.category.id(),
                "title": category.category.title(),
                "score": format!("{:.1}", category.score),
                "weight": format!("{:.2}", category.weight),
                "note": if category.substituted { "substituted" } else { "" },
            })
        })
        .collect();

    let data = json!({
        "root": report.discovery.root.display().to_string(),
        "file_count": report.discovery.files.len(),
        "composite": format!("{:.1}", report.scored.composite),
        "tier": report.scored.tier.to_string(),
        "tier_color": html_tier_color(report.scored.tier),
        "categories": categories,
        "badge_url": badge_url(report),
        "generated_at": report.generated_at,
        "version": report.version,
    });

    registry.render("report", &data).map_err(|err| {
        crate::core::errors::ArsError::internal(format!("template render error: {err}"))
    })
}

fn html_tier_color(tier: Tier) -> &'static str {
    match tier {
        Tier::AgentReady => "#2da44e",
        Tier::AgentAssisted => "#1a7f37",
        Tier::AgentLimited => "#bf8700",
        Tier::AgentHostile => "#cf222e",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ArsConfig;
    use crate::core::pipeline::Pipeline;
    use std::fs;
    use tempfile::TempDir;

    async fn sample_report() -> AnalysisReport {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.py"), "def main():\n    pass\n").unwrap();
        Pipeline::new(ArsConfig::default())
            .run(temp.path())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_json_is_parseable() {
        let report = sample_report().await;
        let rendered = render_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(value["scored"]["composite"].is_number());
        assert_eq!(value["results"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_terminal_lists_every_category() {
        let report = sample_report().await;
        let rendered = render_terminal(&report);
        for id in ["C1", "C3", "C4", "C5", "C6"] {
            assert!(rendered.contains(id), "missing {id}");
        }
        assert!(rendered.contains("Composite"));
    }

    #[tokio::test]
    async fn test_html_renders() {
        let report = sample_report().await;
        let rendered = render_html(&report).unwrap();
        assert!(rendered.contains("<!DOCTYPE html>"));
        assert!(rendered.contains("Agent Readiness Report"));
    }

    #[tokio::test]
    async fn test_badge_url_shape() {
        let report = sample_report().await;
        let url = badge_url(&report);
        assert!(url.starts_with("https://img.shields.io/badge/Agent%20Readiness-"));
        assert!(url.contains("%2F10-"));
    }
}
