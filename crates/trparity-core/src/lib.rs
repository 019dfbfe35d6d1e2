#![forbid(unsafe_code)]

//! Canonical test-result records and parity checking (headless).
//!
//! Two independent derivations of the same record array are compared:
//! - the reference, extracted from ATML-style source XML ([`extract_source_file`])
//! - the subject, re-derived from per-node annotations embedded in a rendered artifact
//!   ([`extract_embedded_file`])
//!
//! Design goals:
//! - stable identity keys (`Path|ExecutionOrdinal`) that survive repeated sibling names
//! - deterministic, byte-identical output for identical input
//! - divergence is characterized (dropped / hallucinated / corrupted), not just detected

pub mod annotate;
pub mod compare;
pub mod embedded;
pub mod error;
pub mod extract;
pub mod flatten;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod source;

pub use annotate::render_annotated_html;
pub use compare::{ParityReport, compare, read_canonical_array, values_equal};
pub use embedded::{EmbeddedExtraction, extract_embedded_file, extract_embedded_str};
pub use error::{Error, Result};
pub use extract::{extract_source_file, extract_source_str};
pub use model::{CanonicalRecord, Limits, NodeKind};

pub const DEFAULT_ANNOTATION_PREFIX: &str = "data-tr-";

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Segment used for ancestor depths with no materialized node.
    pub placeholder_segment: String,
    /// Attribute name prefix of the embedded annotations.
    pub annotation_prefix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            placeholder_segment: model::PLACEHOLDER_SEGMENT.to_string(),
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the placeholder path segment (default `Unknown`).
    ///
    /// Both sides of a comparison must agree on it, so this is mostly useful for sources whose
    /// real node names collide with the default.
    pub fn with_placeholder_segment(mut self, segment: impl Into<String>) -> Self {
        self.placeholder_segment = segment.into();
        self
    }

    /// Overrides the annotation attribute prefix (default `data-tr-`).
    pub fn with_annotation_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.annotation_prefix = prefix.into();
        self
    }
}
