//! Typed view over ATML-style test-result XML.
//!
//! Elements are matched by local name so documents with any namespace prefixes (`tr:`, `trc:`,
//! `c:`) or none at all are accepted. Only the shapes below are recognized; everything else in
//! the document is ignored.

use crate::{Error, Result};
use roxmltree::{Document, Node};

pub(crate) const RESULT_SET: &str = "ResultSet";
pub(crate) const TEST_RESULTS: &str = "TestResults";

/// Element kinds the flattener visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    ResultSet,
    TestGroup,
    Test,
    SessionAction,
}

impl ElementKind {
    pub fn of(node: Node<'_, '_>) -> Option<Self> {
        if !node.is_element() {
            return None;
        }
        match node.tag_name().name() {
            RESULT_SET => Some(Self::ResultSet),
            "TestGroup" => Some(Self::TestGroup),
            "Test" => Some(Self::Test),
            "SessionAction" => Some(Self::SessionAction),
            _ => None,
        }
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::ResultSet | Self::TestGroup)
    }
}

/// One comparator/value entry from a `Limits` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLimit {
    pub comparator: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RawLimits {
    #[default]
    Absent,
    /// Candidate bound entries in document order (`LimitPair` or `SingleLimit`).
    Bounds(Vec<RawLimit>),
    Expected(RawLimit),
}

/// Data carried by a test's first `TestResult`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultData {
    pub value: Option<String>,
    pub units: Option<String>,
    pub limits: RawLimits,
}

/// Per-kind payload. Measurement-only data is unreachable from the other variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeShape {
    Group,
    /// A leaf step; result data, when present, is non-numeric.
    Step(Option<ResultData>),
    Measurement(ResultData),
}

/// A recognized source node, without its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceNode {
    /// Caller-assigned label (`callerName`).
    pub label: Option<String>,
    /// Internal identifier (`name`, falling back to `ID`).
    pub identifier: String,
    pub status: Option<String>,
    pub timestamp: Option<String>,
    pub shape: NodeShape,
}

/// A parsed source document and its top-level containers.
pub struct SourceDocument<'input> {
    doc: Document<'input>,
}

impl<'input> SourceDocument<'input> {
    pub fn parse(text: &'input str, origin: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput {
                origin: origin.to_string(),
            });
        }
        let doc = Document::parse(text).map_err(|e| Error::MalformedInput {
            origin: origin.to_string(),
            message: e.to_string(),
        })?;

        let root_name = doc.root_element().tag_name().name();
        if root_name != RESULT_SET && root_name != TEST_RESULTS {
            return Err(Error::MalformedInput {
                origin: origin.to_string(),
                message: format!(
                    "expected a <{TEST_RESULTS}> or <{RESULT_SET}> document element, found <{root_name}>"
                ),
            });
        }

        Ok(Self { doc })
    }

    /// The depth-0 containers, in document order.
    pub fn roots(&self) -> Vec<Node<'_, 'input>> {
        let root = self.doc.root_element();
        if root.has_tag_name(RESULT_SET) {
            return vec![root];
        }
        root.children()
            .filter(|c| ElementKind::of(*c) == Some(ElementKind::ResultSet))
            .collect()
    }
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == local)
}

fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

fn datum_value(node: Node<'_, '_>) -> Option<String> {
    child_element(node, "Datum").and_then(|d| attr(d, "value"))
}

fn read_limit(node: Node<'_, '_>) -> RawLimit {
    RawLimit {
        comparator: attr(node, "comparator"),
        value: datum_value(node),
    }
}

fn read_limits(test_result: Node<'_, '_>) -> RawLimits {
    let Some(limits) =
        child_element(test_result, "TestLimits").and_then(|t| child_element(t, "Limits"))
    else {
        return RawLimits::Absent;
    };

    for shape in limits.children().filter(|c| c.is_element()) {
        match shape.tag_name().name() {
            "LimitPair" => {
                return RawLimits::Bounds(
                    shape
                        .children()
                        .filter(|c| c.is_element() && c.tag_name().name() == "Limit")
                        .map(read_limit)
                        .collect(),
                );
            }
            "SingleLimit" => return RawLimits::Bounds(vec![read_limit(shape)]),
            "Expected" => return RawLimits::Expected(read_limit(shape)),
            _ => {}
        }
    }
    RawLimits::Absent
}

fn read_result_data(test_result: Node<'_, '_>) -> ResultData {
    let datum = child_element(test_result, "TestData").and_then(|d| child_element(d, "Datum"));
    ResultData {
        value: datum.and_then(|d| attr(d, "value")),
        units: datum.and_then(|d| attr(d, "nonStandardUnit").or_else(|| attr(d, "unit"))),
        limits: read_limits(test_result),
    }
}

/// True when `value` reads as a finite number under locale-invariant parsing.
pub(crate) fn is_numeric(value: &str) -> bool {
    value.trim().parse::<f64>().is_ok_and(|v| v.is_finite())
}

fn read_shape(node: Node<'_, '_>, kind: ElementKind) -> NodeShape {
    if kind.is_container() {
        return NodeShape::Group;
    }
    if kind == ElementKind::SessionAction {
        return NodeShape::Step(None);
    }

    let results: Vec<ResultData> = node
        .children()
        .filter(|c| c.is_element() && c.tag_name().name() == "TestResult")
        .map(read_result_data)
        .collect();

    if let Some(numeric) = results
        .iter()
        .find(|r| r.value.as_deref().is_some_and(is_numeric))
    {
        return NodeShape::Measurement(numeric.clone());
    }
    NodeShape::Step(results.into_iter().next())
}

/// Reads a recognized element into a [`SourceNode`]. Returns `None` for anything else.
pub fn read_node(node: Node<'_, '_>) -> Option<SourceNode> {
    let kind = ElementKind::of(node)?;
    let identifier = attr(node, "name")
        .or_else(|| attr(node, "ID"))
        .unwrap_or_default();
    Some(SourceNode {
        label: attr(node, "callerName").filter(|s| !s.trim().is_empty()),
        identifier,
        status: child_element(node, "Outcome").and_then(|o| attr(o, "value")),
        timestamp: attr(node, "startDateTime"),
        shape: read_shape(node, kind),
    })
}
