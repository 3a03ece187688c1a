//! Structural duplication detection.
//!
//! Hashes every contiguous statement window of sufficient size with a
//! structural fingerprint that collapses identifier names but preserves
//! node kinds, operators, and literal values, then pairs equal-hash
//! windows across (and within) files.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tree_sitter::Node;
use xxhash_rust::xxh3::xxh3_64;

use crate::analyzers::common::DuplicateBlock;
use crate::core::config::DuplicationConfig;
use crate::lang::common::{walk_nodes, LanguageBundle, LanguageSpec, ParsedFile};

/// Reported duplicate blocks are capped to keep pathological inputs
/// bounded; the duplicated-line accounting still covers every pair.
const MAX_REPORTED_BLOCKS: usize = 10_000;

/// Marker folded into the fingerprint in place of an identifier name.
const IDENTIFIER_TOKEN: &[u8] = b"\x00id\x00";

/// Duplication result for one language.
#[derive(Debug, Default)]
pub struct DuplicationOutcome {
    /// Percent of source lines involved in at least one duplicate pair.
    pub rate: f64,
    /// Every reported duplicate pair.
    pub blocks: Vec<DuplicateBlock>,
}

#[derive(Debug, Clone)]
struct Window {
    file_index: usize,
    start_line: usize,
    end_line: usize,
}

impl Window {
    fn overlaps(&self, other: &Window) -> bool {
        self.file_index == other.file_index
            && self.start_line <= other.end_line
            && other.start_line <= self.end_line
    }
}

/// Detect duplication across the source-role files of one language.
pub fn detect(
    bundle: &LanguageBundle,
    spec: &dyn LanguageSpec,
    config: &DuplicationConfig,
) -> DuplicationOutcome {
    let sources: Vec<&ParsedFile> = bundle.sources().collect();

    let mut windows_by_hash: HashMap<u64, Vec<Window>> = HashMap::new();
    for (file_index, parsed) in sources.iter().enumerate() {
        collect_windows(parsed, file_index, spec, config, &mut windows_by_hash);
    }

    let mut duplicated_lines: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();
    let mut blocks = Vec::new();

    for group in windows_by_hash.values() {
        if group.len() < 2 {
            continue;
        }
        for (index_a, window_a) in group.iter().enumerate() {
            for window_b in &group[index_a + 1..] {
                if window_a.overlaps(window_b) {
                    continue;
                }

                mark_lines(&mut duplicated_lines, window_a);
                mark_lines(&mut duplicated_lines, window_b);

                if blocks.len() < MAX_REPORTED_BLOCKS {
                    blocks.push(DuplicateBlock {
                        file_a: sources[window_a.file_index].rel_display(),
                        start_a: window_a.start_line,
                        end_a: window_a.end_line,
                        file_b: sources[window_b.file_index].rel_display(),
                        start_b: window_b.start_line,
                        end_b: window_b.end_line,
                        line_count: window_a.end_line - window_a.start_line + 1,
                    });
                }
            }
        }
    }

    let total_lines: usize = sources.iter().map(|parsed| parsed.line_count()).sum();
    let dup_lines: usize = duplicated_lines.values().map(BTreeSet::len).sum();
    let rate = if total_lines == 0 {
        0.0
    } else {
        dup_lines as f64 / total_lines as f64 * 100.0
    };

    DuplicationOutcome { rate, blocks }
}

fn mark_lines(duplicated: &mut BTreeMap<usize, BTreeSet<usize>>, window: &Window) {
    let lines = duplicated.entry(window.file_index).or_default();
    lines.extend(window.start_line..=window.end_line);
}

/// Enumerate every qualifying statement window of every block in the
/// file and record its hash.
fn collect_windows(
    parsed: &ParsedFile,
    file_index: usize,
    spec: &dyn LanguageSpec,
    config: &DuplicationConfig,
    windows: &mut HashMap<u64, Vec<Window>>,
) {
    walk_nodes(parsed.root(), &mut |node| {
        if !spec.is_block(node.kind()) {
            return;
        }

        let statements = block_statements(node, spec);
        if statements.len() < config.min_statements {
            return;
        }

        let fingerprints: Vec<u64> = statements
            .iter()
            .map(|statement| statement_hash(*statement, parsed, spec, config))
            .collect();

        for start in 0..statements.len() {
            for end in (start + config.min_statements - 1)..statements.len() {
                let start_line = statements[start].start_position().row + 1;
                let end_line = statements[end].end_position().row + 1;
                if end_line - start_line + 1 < config.min_lines {
                    continue;
                }

                let mut buffer = Vec::with_capacity((end - start + 1) * 8);
                for fingerprint in &fingerprints[start..=end] {
                    buffer.extend_from_slice(&fingerprint.to_le_bytes());
                }
                windows
                    .entry(xxh3_64(&buffer))
                    .or_default()
                    .push(Window {
                        file_index,
                        start_line,
                        end_line,
                    });
            }
        }
    });
}

/// Named, non-comment children of a block are its statements.
fn block_statements<'t>(block: Node<'t>, spec: &dyn LanguageSpec) -> Vec<Node<'t>> {
    let mut statements = Vec::new();
    let mut cursor = block.walk();
    for child in block.children(&mut cursor) {
        if child.is_named() && !spec.is_comment(child.kind()) {
            statements.push(child);
        }
    }
    statements
}

fn statement_hash(
    node: Node<'_>,
    parsed: &ParsedFile,
    spec: &dyn LanguageSpec,
    config: &DuplicationConfig,
) -> u64 {
    let mut buffer = Vec::with_capacity(256);
    fold_node(node, parsed, spec, config.max_depth, config.max_children, &mut buffer);
    xxh3_64(&buffer)
}

/// Deterministic structural fold: node kinds always contribute,
/// identifier names collapse to one token, literal text is preserved.
/// Anonymous children carry operator and keyword kinds.
fn fold_node(
    node: Node<'_>,
    parsed: &ParsedFile,
    spec: &dyn LanguageSpec,
    depth: usize,
    max_children: usize,
    buffer: &mut Vec<u8>,
) {
    let kind = node.kind();
    if spec.is_comment(kind) {
        return;
    }

    buffer.extend_from_slice(&node.kind_id().to_le_bytes());

    if spec.is_identifier(kind) {
        buffer.extend_from_slice(IDENTIFIER_TOKEN);
        return;
    }
    if spec.is_literal(kind) {
        buffer.extend_from_slice(
            node.utf8_text(parsed.source.as_bytes())
                .unwrap_or_default()
                .as_bytes(),
        );
        return;
    }
    if depth == 0 {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor).take(max_children) {
        fold_node(child, parsed, spec, depth - 1, max_children, buffer);
    }
}
