use serde_yaml::{Mapping, Value};

use crate::ast::{Node, NodeKind};
use crate::error::Error;
use crate::state::type_name;

/// Cursor over the steps of a path being walked.
#[derive(Clone, Copy)]
pub(crate) struct PathCursor<'a> {
    steps: &'a [Node],
    index: usize,
}

impl<'a> PathCursor<'a> {
    pub(crate) fn new(steps: &'a [Node]) -> Self {
        Self { steps, index: 0 }
    }

    fn step(&self) -> &'a Node {
        &self.steps[self.index]
    }

    fn is_last(&self) -> bool {
        self.index + 1 >= self.steps.len()
    }

    fn next(self) -> Self {
        Self {
            steps: self.steps,
            index: self.index + 1,
        }
    }
}

/// Per-operation policy at each document shape met along a path.
///
/// Hooks return `None` to prune the branch ("no match"); visitors recurse by
/// calling [`visit_next_step`] with themselves.
pub(crate) trait StateVisitor {
    /// The path's final step landed on a mapping.
    fn visit_last_map(&self, map: &Mapping, key: &Node) -> Result<Option<Value>, Error>;

    /// The path's final step landed on a sequence with a numeric step.
    fn visit_last_slice(&self, seq: &[Value], index: &Node) -> Result<Option<Value>, Error>;

    /// An identity step into a mapping, with more steps to go.
    fn visit_map_with_identity(
        &self,
        path: PathCursor<'_>,
        map: &Mapping,
        key: &Node,
    ) -> Result<Option<Value>, Error>;

    /// A numeric step into a sequence, with more steps to go.
    fn visit_slice_with_index(
        &self,
        path: PathCursor<'_>,
        seq: &[Value],
        index: &Node,
    ) -> Result<Option<Value>, Error>;

    /// An identity step met a sequence: the step applies to every element.
    fn visit_slice_without_index(
        &self,
        path: PathCursor<'_>,
        seq: &[Value],
    ) -> Result<Option<Value>, Error>;
}

/// Advance one step into `state`, dispatching on its shape.
pub(crate) fn visit_next_step<V: StateVisitor + ?Sized>(
    visitor: &V,
    path: PathCursor<'_>,
    state: &Value,
) -> Result<Option<Value>, Error> {
    let step = path.step();
    match state {
        Value::Mapping(map) => match &step.kind {
            NodeKind::Identity(_) => {
                if path.is_last() {
                    visitor.visit_last_map(map, step)
                } else {
                    visitor.visit_map_with_identity(path.next(), map, step)
                }
            }
            NodeKind::Number(index) => Err(Error::new(
                format!("invalid path: invalid type map for number step '{index}'"),
                step.position,
            )),
            _ => Err(unsupported_step(step)),
        },
        Value::Sequence(seq) => match &step.kind {
            NodeKind::Number(_) => {
                if path.is_last() {
                    visitor.visit_last_slice(seq, step)
                } else {
                    visitor.visit_slice_with_index(path.next(), seq, step)
                }
            }
            NodeKind::Identity(_) => visitor.visit_slice_without_index(path, seq),
            _ => Err(unsupported_step(step)),
        },
        other => Err(Error::new(
            format!(
                "invalid path: invalid type {} for identity step '{}'",
                type_name(other),
                step_literal(step),
            ),
            step.position,
        )),
    }
}

pub(crate) fn step_key(step: &Node) -> &str {
    match &step.kind {
        NodeKind::Identity(key) => key,
        _ => "",
    }
}

pub(crate) fn step_index(step: &Node) -> Option<usize> {
    match &step.kind {
        NodeKind::Number(index) => usize::try_from(*index).ok(),
        _ => None,
    }
}

fn step_literal(step: &Node) -> String {
    match &step.kind {
        NodeKind::Identity(key) => key.clone(),
        NodeKind::Number(index) => index.to_string(),
        _ => step.render(),
    }
}

fn unsupported_step(step: &Node) -> Error {
    Error::new(
        format!("invalid path: step {} has unsupported format", step.render()),
        step.position,
    )
}
