//! Hierarchical paths and execution ordinals for a flattened node stream.
//!
//! The resolver owns all traversal state: the open group scopes, their path segments, and the
//! ordinal counters. A fresh resolver is one extraction run.
//!
//! Every path has exactly `depth + 1` segments. Names are stored through [`encode_segment`] and
//! an empty name is replaced by the placeholder, so no name can add or remove a segment.

use crate::model::{NodeKind, PLACEHOLDER_SEGMENT, canonical_key, encode_segment};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// A group that was visited; holds its position in the node stream.
    Group(usize),
    /// An ancestor level with no materialized node.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub parent_path: String,
    pub path: String,
    pub ordinal: u32,
    pub canonical_key: String,
    /// Stream position of the nearest enclosing group at the parent depth, if it was visited.
    pub parent_index: Option<usize>,
    /// Number of placeholder segments in `parent_path`.
    pub synthesized_segments: usize,
}

#[derive(Debug, Clone)]
pub struct PathOrdinalResolver {
    scopes: Vec<Scope>,
    segments: Vec<String>,
    /// Keyed by full path: segments contain no `/`, so a path fixes both parent and name.
    counters: FxHashMap<(String, NodeKind), u32>,
    placeholder: String,
    visited: usize,
}

impl Default for PathOrdinalResolver {
    fn default() -> Self {
        Self::new(PLACEHOLDER_SEGMENT)
    }
}

impl PathOrdinalResolver {
    pub fn new(placeholder: impl Into<String>) -> Self {
        let placeholder = placeholder.into();
        let placeholder = if placeholder.is_empty() {
            PLACEHOLDER_SEGMENT.to_string()
        } else {
            encode_segment(&placeholder).into_owned()
        };
        Self {
            scopes: Vec::new(),
            segments: Vec::new(),
            counters: FxHashMap::default(),
            placeholder,
            visited: 0,
        }
    }

    fn segment_for(&self, name: &str) -> String {
        if name.is_empty() {
            self.placeholder.clone()
        } else {
            encode_segment(name).into_owned()
        }
    }

    /// Resolves the next node of the stream, visited at `depth`.
    pub fn resolve(&mut self, depth: usize, name: &str, kind: NodeKind) -> ResolvedIdentity {
        // Ascending the tree closes every deeper scope.
        self.scopes.truncate(depth);
        self.segments.truncate(depth);

        let missing = depth - self.segments.len();
        let parent_path = self
            .segments
            .iter()
            .map(String::as_str)
            .chain(std::iter::repeat_n(self.placeholder.as_str(), missing))
            .collect::<Vec<_>>()
            .join("/");
        let segment = self.segment_for(name);
        let path = if depth == 0 {
            segment.clone()
        } else {
            format!("{parent_path}/{segment}")
        };

        let counter = self.counters.entry((path.clone(), kind)).or_insert(0);
        *counter += 1;
        let ordinal = *counter;

        let parent_index = match depth.checked_sub(1).and_then(|d| self.scopes.get(d)) {
            Some(Scope::Group(index)) => Some(*index),
            _ => None,
        };
        let placeholder_scopes = self
            .scopes
            .iter()
            .filter(|s| **s == Scope::Placeholder)
            .count();
        let synthesized_segments = missing + placeholder_scopes;

        let identity = ResolvedIdentity {
            canonical_key: canonical_key(&path, ordinal),
            parent_path,
            path,
            ordinal,
            parent_index,
            synthesized_segments,
        };

        if kind == NodeKind::Group {
            self.open_scope(depth, segment);
        }
        self.visited += 1;
        identity
    }

    fn open_scope(&mut self, depth: usize, segment: String) {
        // `resolve` already truncated both stacks to `depth`; pad any gap below the group.
        while self.scopes.len() < depth {
            self.scopes.push(Scope::Placeholder);
        }
        while self.segments.len() < depth {
            self.segments.push(self.placeholder.clone());
        }
        self.scopes.push(Scope::Group(self.visited));
        self.segments.push(segment);
    }
}
