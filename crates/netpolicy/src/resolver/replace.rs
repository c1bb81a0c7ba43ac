use serde_yaml::{Mapping, Value};

use crate::ast::Node;
use crate::error::Error;

use super::walker::{step_key, visit_next_step, PathCursor, StateVisitor};

/// Copy `input` with the value at every position matching `steps` replaced
/// by `replacement`. Branches the path does not reach are left untouched,
/// and a missing key along the path simply leaves that mapping as is.
pub(crate) fn replace(
    input: &Mapping,
    steps: &[Node],
    replacement: &Value,
) -> Result<Mapping, Error> {
    if steps.is_empty() {
        return Ok(input.clone());
    }
    let visitor = ReplaceVisitor { replacement };
    let input = Value::Mapping(input.clone());
    let replaced = visit_next_step(&visitor, PathCursor::new(steps), &input)
        .map_err(|err| err.wrap("failed applying operation on the path"))?;
    match replaced {
        Some(Value::Mapping(map)) => Ok(map),
        _ => Err(Error::new(
            "failed converting result to a map",
            steps[0].position,
        )),
    }
}

struct ReplaceVisitor<'a> {
    replacement: &'a Value,
}

impl StateVisitor for ReplaceVisitor<'_> {
    fn visit_last_map(&self, map: &Mapping, key: &Node) -> Result<Option<Value>, Error> {
        let mut modified = map.clone();
        modified.insert(
            Value::String(step_key(key).to_string()),
            self.replacement.clone(),
        );
        Ok(Some(Value::Mapping(modified)))
    }

    fn visit_last_slice(&self, seq: &[Value], _index: &Node) -> Result<Option<Value>, Error> {
        Ok(Some(Value::Sequence(seq.to_vec())))
    }

    fn visit_map_with_identity(
        &self,
        path: PathCursor<'_>,
        map: &Mapping,
        key: &Node,
    ) -> Result<Option<Value>, Error> {
        let Some(value) = map.get(step_key(key)) else {
            return Ok(Some(Value::Mapping(map.clone())));
        };
        let visited = visit_next_step(self, path, value)?;
        let mut replaced = map.clone();
        if let Some(visited) = visited {
            replaced.insert(Value::String(step_key(key).to_string()), visited);
        }
        Ok(Some(Value::Mapping(replaced)))
    }

    fn visit_slice_with_index(
        &self,
        _path: PathCursor<'_>,
        seq: &[Value],
        _index: &Node,
    ) -> Result<Option<Value>, Error> {
        Ok(Some(Value::Sequence(seq.to_vec())))
    }

    fn visit_slice_without_index(
        &self,
        path: PathCursor<'_>,
        seq: &[Value],
    ) -> Result<Option<Value>, Error> {
        let mut replaced = Vec::with_capacity(seq.len());
        for entry in seq {
            match visit_next_step(self, path, entry)? {
                Some(value) => replaced.push(value),
                None => replaced.push(entry.clone()),
            }
        }
        Ok(Some(Value::Sequence(replaced)))
    }
}
