use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

use crate::error::Error;
use crate::state::RawState;

/// A string is a placeholder when the whole of it is one `{{ … }}` form.
/// Fragments inside longer strings are never substituted.
static CAPTURE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{\{\s*(.+?)\s*\}\}$").expect("placeholder pattern is valid"));

/// Resolves `capture.<name>.<path>` expressions found in desired-state
/// placeholders.
pub trait CapturePathResolver {
    fn resolve_capture_entry_path(&self, capture_path: &str) -> Result<Value, Error>;
}

/// Walks a desired-state document and substitutes every placeholder string
/// with the value its capture expression resolves to.
pub(crate) struct StateExpander<'a> {
    cap_resolver: &'a dyn CapturePathResolver,
}

impl<'a> StateExpander<'a> {
    pub(crate) fn new(cap_resolver: &'a dyn CapturePathResolver) -> Self {
        Self { cap_resolver }
    }

    pub(crate) fn expand(&self, desired_state: &RawState) -> Result<RawState, Error> {
        let state = desired_state
            .to_value()
            .map_err(|err| expand_error(format!("failed unmarshaling the state: {err}")))?;
        let expanded = self
            .expand_state(state)
            .map_err(|err| err.wrap("expand error"))?;
        RawState::from_value(&expanded)
            .map_err(|err| expand_error(format!("failed marshaling the expanded state: {err}")))
    }

    fn expand_state(&self, state: Value) -> Result<Value, Error> {
        match state {
            Value::String(string) => self.expand_string(string),
            Value::Mapping(map) => self.expand_map(map),
            Value::Sequence(seq) => self.expand_slice(seq),
            other => Ok(other),
        }
    }

    fn expand_slice(&self, seq: Vec<Value>) -> Result<Value, Error> {
        let expanded = seq
            .into_iter()
            .map(|value| self.expand_state(value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Sequence(expanded))
    }

    fn expand_map(&self, map: Mapping) -> Result<Value, Error> {
        let mut expanded = Mapping::new();
        for (key, value) in map {
            expanded.insert(key, self.expand_state(value)?);
        }
        Ok(Value::Mapping(expanded))
    }

    fn expand_string(&self, string: String) -> Result<Value, Error> {
        let Some(submatch) = CAPTURE_PLACEHOLDER.captures(&string) else {
            return Ok(Value::String(string));
        };
        let capture_path = submatch
            .get(1)
            .map(|group| group.as_str())
            .filter(|expression| !expression.trim().is_empty())
            .ok_or_else(|| {
                Error::new(format!("the capture expression has wrong format {string}"), 0)
            })?;
        self.cap_resolver.resolve_capture_entry_path(capture_path)
    }
}

fn expand_error(detail: String) -> Error {
    Error::new(detail, 0).wrap("expand error")
}
