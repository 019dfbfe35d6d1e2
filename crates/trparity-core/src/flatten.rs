//! Pre-order flattening of the source hierarchy.
//!
//! The emitted order is part of the contract: ordinals and the embedded annotations both depend
//! on every consumer reproducing exactly this sequence.

use crate::model::NodeKind;
use crate::source::{ElementKind, NodeShape, SourceDocument, SourceNode, read_node};
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    pub depth: usize,
    /// Display name (caller label, identifier, or the reformatted top-level name).
    pub name: String,
    pub node: SourceNode,
}

impl FlatNode {
    pub fn kind(&self) -> NodeKind {
        match self.node.shape {
            NodeShape::Group => NodeKind::Group,
            NodeShape::Step(_) => NodeKind::Step,
            NodeShape::Measurement(_) => NodeKind::Measurement,
        }
    }
}

fn whitespace_run_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Reformats a top-level container identifier such as
/// `C:\Sequences\UUT_Test.seq#MainSequence` into `UUT Test`.
pub fn top_level_display_name(raw: &str) -> String {
    let before_hash = raw.split('#').next().unwrap_or_default();
    let leaf = before_hash
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let stem = match leaf.len().checked_sub(".seq".len()) {
        Some(cut) if leaf.is_char_boundary(cut) && leaf[cut..].eq_ignore_ascii_case(".seq") => {
            &leaf[..cut]
        }
        _ => leaf,
    };
    let spaced = stem.replace('_', " ");
    whitespace_run_regex()
        .replace_all(spaced.trim(), " ")
        .into_owned()
}

fn display_name(node: &SourceNode, depth: usize) -> String {
    let raw = node.label.as_deref().unwrap_or(node.identifier.as_str());
    if depth == 0 {
        top_level_display_name(raw)
    } else {
        raw.to_string()
    }
}

/// Walks every top-level container depth-first in document order.
///
/// Uses an explicit stack; source depth never turns into call depth.
pub fn flatten(doc: &SourceDocument<'_>) -> Vec<FlatNode> {
    let mut out = Vec::new();
    let roots = doc.roots();
    let mut stack: Vec<(roxmltree::Node<'_, '_>, usize)> =
        roots.into_iter().rev().map(|n| (n, 0)).collect();

    while let Some((element, depth)) = stack.pop() {
        let Some(node) = read_node(element) else {
            continue;
        };
        let is_group = matches!(node.shape, NodeShape::Group);
        out.push(FlatNode {
            depth,
            name: display_name(&node, depth),
            node,
        });

        if is_group {
            let children: Vec<_> = element
                .children()
                .filter(|c| ElementKind::of(*c).is_some())
                .collect();
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
    }

    out
}
