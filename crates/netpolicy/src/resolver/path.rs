use serde_yaml::Value;

use crate::ast::{Node, NodeKind};
use crate::error::Error;
use crate::state::render;

const CAPTURE_REF: &str = "capture";

/// A path unwrapped for resolution: when the first step is the identity
/// `capture`, the following step names the target capture entry and both are
/// lifted out of the step list.
pub(crate) struct CaptureEntryPath<'a> {
    pub(crate) capture_entry_name: Option<&'a str>,
    pub(crate) steps: &'a [Node],
    pub(crate) position: usize,
}

impl<'a> CaptureEntryPath<'a> {
    pub(crate) fn unwrap_path(node: &'a Node) -> Result<Self, Error> {
        let NodeKind::Path(steps) = &node.kind else {
            return Err(Error::new(
                format!("invalid path: node {} is not a path", node.render()),
                node.position,
            ));
        };
        let is_capture_ref = steps
            .first()
            .and_then(Node::identity)
            .map(|identity| identity == CAPTURE_REF)
            .unwrap_or(false);
        if !is_capture_ref {
            return Ok(Self {
                capture_entry_name: None,
                steps,
                position: node.position,
            });
        }
        let Some(name) = steps.get(1).and_then(Node::identity) else {
            return Err(Error::new(
                "path capture ref is missing capture entry name",
                node.position,
            ));
        };
        Ok(Self {
            capture_entry_name: Some(name),
            steps: &steps[2..],
            position: node.position,
        })
    }

    /// Walk the remaining steps into `state`, requiring a mapping at every
    /// identity step and a sequence at every numeric step.
    pub(crate) fn walk_state(&self, state: &Value) -> Result<Value, Error> {
        let mut walked = state;
        let mut walked_path: Vec<String> = Vec::new();
        for step in self.steps {
            match &step.kind {
                NodeKind::Identity(key) => {
                    walked_path.push(key.clone());
                    let Value::Mapping(map) = walked else {
                        return Err(path_error(
                            format!(
                                "failed walking non map state '{}' with path '{}'",
                                render(walked),
                                render_steps(&walked_path),
                            ),
                            step.position,
                        ));
                    };
                    walked = map.get(key.as_str()).ok_or_else(|| {
                        path_error(
                            format!(
                                "step '{}' from path '{}' not found at map state '{}'",
                                key,
                                render_steps(&walked_path),
                                render(walked),
                            ),
                            step.position,
                        )
                    })?;
                }
                NodeKind::Number(index) => {
                    walked_path.push(index.to_string());
                    let Value::Sequence(seq) = walked else {
                        return Err(path_error(
                            format!(
                                "failed walking non slice state '{}' with path '{}'",
                                render(walked),
                                render_steps(&walked_path),
                            ),
                            step.position,
                        ));
                    };
                    walked = usize::try_from(*index)
                        .ok()
                        .and_then(|index| seq.get(index))
                        .ok_or_else(|| {
                            path_error(
                                format!(
                                    "step '{}' from path '{}' not found at slice state '{}'",
                                    index,
                                    render_steps(&walked_path),
                                    render(walked),
                                ),
                                step.position,
                            )
                        })?;
                }
                _ => {
                    return Err(path_error(
                        format!("step {} has unsupported format", step.render()),
                        step.position,
                    ));
                }
            }
        }
        Ok(walked.clone())
    }
}

fn render_steps(walked_path: &[String]) -> String {
    format!("[{}]", walked_path.join(" "))
}

fn path_error(detail: String, position: usize) -> Error {
    Error::new(format!("invalid path: {detail}"), position)
}
