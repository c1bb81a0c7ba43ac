use serde_yaml::{Mapping, Value};

use crate::ast::Node;
use crate::error::Error;
use crate::state::{render, type_name};

use super::walker::{step_key, step_index, visit_next_step, PathCursor, StateVisitor};

/// Prune `input` down to the branches where the value at `steps` compares to
/// `expected` (equal for the equality filter, unequal for its inverse).
///
/// The result is a projection of the input: along the path only the visited
/// mapping key survives, sequences keep the entries whose subtree matched,
/// and the mapping holding the terminal step is kept whole. `None` means
/// nothing matched.
pub(crate) fn filter(
    input: &Mapping,
    steps: &[Node],
    expected: &Value,
    expected_position: usize,
    inverted: bool,
) -> Result<Option<Mapping>, Error> {
    if steps.is_empty() {
        return Ok(Some(input.clone()));
    }
    let visitor = FilterVisitor {
        expected,
        expected_position,
        inverted,
    };
    let input = Value::Mapping(input.clone());
    let filtered = visit_next_step(&visitor, PathCursor::new(steps), &input)
        .map_err(|err| err.wrap("failed applying operation on the path"))?;
    match filtered {
        None => Ok(None),
        Some(Value::Mapping(map)) => Ok(Some(map)),
        Some(_) => Err(Error::new(
            "failed converting filtering result to a map",
            steps[0].position,
        )),
    }
}

struct FilterVisitor<'a> {
    expected: &'a Value,
    expected_position: usize,
    inverted: bool,
}

impl FilterVisitor<'_> {
    /// Scalar comparison between the value found at the path and the
    /// expected one. Shapes must line up; composite values never compare.
    fn matches(&self, obtained: &Value) -> Result<bool, Error> {
        let comparable = matches!(
            (obtained, self.expected),
            (Value::String(_), Value::String(_))
                | (Value::Number(_), Value::Number(_))
                | (Value::Bool(_), Value::Bool(_))
        );
        if !comparable {
            return Err(Error::new(
                format!(
                    "type missmatch: the value in the path doesn't match the value to filter. \
                     \"{}\" != \"{}\" -> {} != {}",
                    type_name(obtained),
                    type_name(self.expected),
                    render(obtained),
                    render(self.expected),
                ),
                self.expected_position,
            ));
        }
        let equal = obtained == self.expected;
        Ok(equal != self.inverted)
    }
}

impl StateVisitor for FilterVisitor<'_> {
    fn visit_last_map(&self, map: &Mapping, key: &Node) -> Result<Option<Value>, Error> {
        let Some(obtained) = map.get(step_key(key)) else {
            return Ok(None);
        };
        if self.matches(obtained)? {
            Ok(Some(Value::Mapping(map.clone())))
        } else {
            Ok(None)
        }
    }

    fn visit_last_slice(&self, seq: &[Value], index: &Node) -> Result<Option<Value>, Error> {
        let Some(obtained) = step_index(index).and_then(|index| seq.get(index)) else {
            return Ok(None);
        };
        if self.matches(obtained)? {
            Ok(Some(Value::Sequence(vec![obtained.clone()])))
        } else {
            Ok(None)
        }
    }

    fn visit_map_with_identity(
        &self,
        path: PathCursor<'_>,
        map: &Mapping,
        key: &Node,
    ) -> Result<Option<Value>, Error> {
        let Some(value) = map.get(step_key(key)) else {
            return Ok(None);
        };
        let Some(filtered) = visit_next_step(self, path, value)? else {
            return Ok(None);
        };
        let mut projected = Mapping::new();
        projected.insert(Value::String(step_key(key).to_string()), filtered);
        Ok(Some(Value::Mapping(projected)))
    }

    fn visit_slice_with_index(
        &self,
        path: PathCursor<'_>,
        seq: &[Value],
        index: &Node,
    ) -> Result<Option<Value>, Error> {
        let Some(entry) = step_index(index).and_then(|index| seq.get(index)) else {
            return Ok(None);
        };
        Ok(visit_next_step(self, path, entry)?
            .map(|filtered| Value::Sequence(vec![filtered])))
    }

    fn visit_slice_without_index(
        &self,
        path: PathCursor<'_>,
        seq: &[Value],
    ) -> Result<Option<Value>, Error> {
        let mut filtered = Vec::new();
        for entry in seq {
            match visit_next_step(self, path, entry)? {
                Some(value) => filtered.push(value),
                // The inverse filter requires the expected value to match no
                // element; one miss drops the whole sequence.
                None if self.inverted => return Ok(None),
                None => {}
            }
        }
        if filtered.is_empty() {
            Ok(None)
        } else {
            Ok(Some(Value::Sequence(filtered)))
        }
    }
}
