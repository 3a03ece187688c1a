//! Coverage report discovery and parsing.
//!
//! Recognizes the Go cover text format (`coverage.out`), LCOV
//! (`lcov.info`), and Cobertura XML (`coverage.xml`/`cobertura.xml`)
//! at the scan root. A missing or malformed report is "n/a", never an
//! error.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::warn;

/// Recognized coverage report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageFormat {
    /// Go cover text profile.
    GoCover,
    /// LCOV tracefile.
    Lcov,
    /// Cobertura XML.
    Cobertura,
}

impl std::fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CoverageFormat::GoCover => "go-cover",
            CoverageFormat::Lcov => "lcov",
            CoverageFormat::Cobertura => "cobertura",
        })
    }
}

/// A parsed coverage report.
#[derive(Debug, Clone, Copy)]
pub struct CoverageReport {
    /// Detected format.
    pub format: CoverageFormat,
    /// Covered / instrumented, percent.
    pub percent: f64,
}

/// Look for a recognized report at the scan root.
pub fn find_coverage_report(root: &Path) -> Option<CoverageReport> {
    let candidates: [(&str, CoverageFormat); 4] = [
        ("coverage.out", CoverageFormat::GoCover),
        ("lcov.info", CoverageFormat::Lcov),
        ("coverage.xml", CoverageFormat::Cobertura),
        ("cobertura.xml", CoverageFormat::Cobertura),
    ];

    for (name, format) in candidates {
        let path = root.join(name);
        if !path.is_file() {
            continue;
        }
        let Ok(contents) = std::fs::read(&path) else {
            warn!(path = %path.display(), "failed to read coverage report");
            continue;
        };

        let percent = match format {
            CoverageFormat::GoCover => parse_go_cover(&String::from_utf8_lossy(&contents)),
            CoverageFormat::Lcov => parse_lcov(&String::from_utf8_lossy(&contents)),
            CoverageFormat::Cobertura => parse_cobertura(&contents),
        };

        match percent {
            Some(percent) => return Some(CoverageReport { format, percent }),
            None => {
                warn!(path = %path.display(), "malformed coverage report; treating as n/a");
            }
        }
    }
    None
}

/// Go cover text: a mode header, then
/// `file:startLine.startCol,endLine.endCol numStatements count` lines.
/// Statements weight the ratio.
fn parse_go_cover(contents: &str) -> Option<f64> {
    let mut lines = contents.lines();
    let header = lines.next()?;
    if !header.starts_with("mode:") {
        return None;
    }

    let mut covered = 0u64;
    let mut total = 0u64;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let _span = fields.next()?;
        let statements: u64 = fields.next()?.parse().ok()?;
        let count: u64 = fields.next()?.parse().ok()?;

        total += statements;
        if count > 0 {
            covered += statements;
        }
    }

    (total > 0).then(|| covered as f64 / total as f64 * 100.0)
}

/// LCOV tracefile: prefer `LF:`/`LH:` summaries, fall back to `DA:`
/// line records.
fn parse_lcov(contents: &str) -> Option<f64> {
    let mut lf_total = 0u64;
    let mut lh_total = 0u64;
    let mut da_total = 0u64;
    let mut da_covered = 0u64;
    let mut saw_record = false;

    for line in contents.lines() {
        let line = line.trim();
        if let Some(value) = line.strip_prefix("LF:") {
            lf_total += value.trim().parse::<u64>().ok()?;
            saw_record = true;
        } else if let Some(value) = line.strip_prefix("LH:") {
            lh_total += value.trim().parse::<u64>().ok()?;
            saw_record = true;
        } else if let Some(value) = line.strip_prefix("DA:") {
            let mut parts = value.split(',');
            let _line_number = parts.next()?;
            let hits: u64 = parts.next()?.trim().parse().ok()?;
            da_total += 1;
            if hits > 0 {
                da_covered += 1;
            }
            saw_record = true;
        }
    }

    if !saw_record {
        return None;
    }
    if lf_total > 0 {
        return Some(lh_total as f64 / lf_total as f64 * 100.0);
    }
    (da_total > 0).then(|| da_covered as f64 / da_total as f64 * 100.0)
}

/// Cobertura XML: `<line number=".." hits=".."/>` entries under
/// `<class filename="..">`.
fn parse_cobertura(contents: &[u8]) -> Option<f64> {
    let mut reader = Reader::from_reader(contents);
    reader.trim_text(true);

    let mut buffer = Vec::new();
    let mut covered = 0u64;
    let mut total = 0u64;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buffer) {
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag)) => match tag.name().as_ref() {
                b"coverage" => saw_root = true,
                b"line" => {
                    let hits: u64 = attribute_value(&tag, b"hits")
                        .and_then(|value| value.parse().ok())
                        .unwrap_or(0);
                    total += 1;
                    if hits > 0 {
                        covered += 1;
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
        buffer.clear();
    }

    if !saw_root {
        return None;
    }
    (total > 0).then(|| covered as f64 / total as f64 * 100.0)
}

fn attribute_value(tag: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    tag.attributes()
        .flatten()
        .find(|attribute| attribute.key.as_ref() == name)
        .and_then(|attribute| {
            attribute
                .unescape_value()
                .ok()
                .map(|value| value.into_owned())
        })
}
