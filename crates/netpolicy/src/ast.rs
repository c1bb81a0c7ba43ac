use serde::{Deserialize, Serialize};

/// The identity denoting the root of the current-state document.
pub(crate) const CURRENT_STATE: &str = "currentState";

/// A node of a capture expression tree.
///
/// Each node carries the position of the token it was built from; synthetic
/// nodes (the implicit `currentState` input source) carry position 0. A node
/// is exactly one shape: a terminal or a single operator with fixed-arity
/// operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "pos")]
    pub position: usize,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Operator operands are ordered: ternary operators hold
/// `[input_source, path, value]`, merge holds `[lhs_path, rhs_path]` and a
/// pipe wraps the path feeding the downstream operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[serde(rename = "identity")]
    Identity(String),
    #[serde(rename = "string")]
    Str(String),
    #[serde(rename = "number")]
    Number(i64),
    #[serde(rename = "boolean")]
    Boolean(bool),
    #[serde(rename = "path")]
    Path(Vec<Node>),
    #[serde(rename = "eqfilter")]
    EqFilter(Box<[Node; 3]>),
    #[serde(rename = "nefilter")]
    NeFilter(Box<[Node; 3]>),
    #[serde(rename = "replace")]
    Replace(Box<[Node; 3]>),
    #[serde(rename = "merge")]
    Merge(Box<[Node; 2]>),
    #[serde(rename = "pipe")]
    Pipe(Box<Node>),
}

impl Node {
    pub(crate) fn current_state() -> Self {
        Node {
            position: 0,
            kind: NodeKind::Identity(CURRENT_STATE.to_string()),
        }
    }

    pub(crate) fn is_current_state(&self) -> bool {
        matches!(&self.kind, NodeKind::Identity(identity) if identity == CURRENT_STATE)
    }

    pub(crate) fn is_path(&self) -> bool {
        matches!(self.kind, NodeKind::Path(_))
    }

    pub(crate) fn identity(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Identity(identity) => Some(identity),
            _ => None,
        }
    }

    /// Compact single-line rendering for error messages.
    pub(crate) fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}
