mod filter;
mod path;
mod replace;
mod walker;

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use crate::ast::{Node, NodeKind};
use crate::error::Error;
use crate::state::{type_name, RawState};
use crate::types::CapturedState;

use path::CaptureEntryPath;

/// Evaluates a pool of capture ASTs against a current-state document.
///
/// Captures are resolved at most once per run: the memo starts with the
/// cached captured states and accumulates newly resolved ones, so
/// `capture.<name>` references resolve lazily, on demand, in whatever order
/// the expressions require. The capture dependency graph must be acyclic.
#[derive(Debug, Default)]
pub struct Resolver;

/// Resolved captured states, both serialized (for the cache) and in memory
/// (for cross-references and the expander).
#[derive(Debug, Default, Clone)]
pub struct Resolution {
    pub marshaled: IndexMap<String, CapturedState>,
    pub unmarshaled: IndexMap<String, Value>,
}

impl Resolver {
    /// Create a new instance of `Resolver`.
    pub fn new() -> Self {
        Self
    }

    /// Resolve every capture in `ast_pool`, seeding the memo with `cached`
    /// entries, which pass through to the result untouched.
    pub fn resolve(
        &self,
        ast_pool: &IndexMap<String, Node>,
        current_state: &[u8],
        cached: &IndexMap<String, CapturedState>,
    ) -> Result<Resolution, Error> {
        self.resolve_pool(ast_pool, current_state, cached)
            .map_err(|err| err.wrap("resolve error"))
    }

    fn resolve_pool(
        &self,
        ast_pool: &IndexMap<String, Node>,
        current_state: &[u8],
        cached: &IndexMap<String, CapturedState>,
    ) -> Result<Resolution, Error> {
        let mut session = Session::new(ast_pool, current_state, cached)?;
        for name in ast_pool.keys() {
            session.resolve_by_name(name, 0)?;
        }

        let mut resolution = Resolution::default();
        for (name, state) in cached {
            resolution.marshaled.insert(name.clone(), state.clone());
        }
        for (name, entry) in session.memo {
            let CaptureEntryState::Resolved(value) = entry else {
                continue;
            };
            if !cached.contains_key(&name) {
                let state = RawState::from_value(&value).map_err(|err| {
                    Error::new(
                        format!("failed marshaling captured state '{name}': {err}"),
                        0,
                    )
                })?;
                resolution
                    .marshaled
                    .insert(name.clone(), CapturedState::from_state(state));
            }
            resolution.unmarshaled.insert(name, value);
        }
        Ok(resolution)
    }

    /// Resolve a single capture-reference path against already captured
    /// states. Backs the desired-state expander.
    pub fn resolve_entry_path(
        &self,
        path_ast: &Node,
        captured_states: &IndexMap<String, Value>,
    ) -> Result<Value, Error> {
        let path = CaptureEntryPath::unwrap_path(path_ast)?;
        let Some(name) = path.capture_entry_name else {
            return Err(Error::new(
                "not supported capture entry path. Only paths with a capture entry reference are supported",
                path_ast.position,
            ));
        };
        let state = captured_states.get(name).ok_or_else(|| {
            Error::new(format!("capture entry '{name}' not found"), path.position)
        })?;
        path.walk_state(state)
    }
}

enum CaptureEntryState {
    InProgress,
    Resolved(Value),
}

struct Session<'r> {
    current_state: Mapping,
    ast_pool: &'r IndexMap<String, Node>,
    memo: IndexMap<String, CaptureEntryState>,
}

impl<'r> Session<'r> {
    fn new(
        ast_pool: &'r IndexMap<String, Node>,
        current_state: &[u8],
        cached: &IndexMap<String, CapturedState>,
    ) -> Result<Self, Error> {
        let current_state = unmarshal_map(current_state, "current state")?;
        let mut memo = IndexMap::new();
        for (name, state) in cached {
            let value = state.state.to_value().map_err(|err| {
                Error::new(
                    format!("failed unmarshaling cached capture '{name}': {err}"),
                    0,
                )
            })?;
            memo.insert(name.clone(), CaptureEntryState::Resolved(value));
        }
        Ok(Self {
            current_state,
            ast_pool,
            memo,
        })
    }

    fn resolve_by_name(&mut self, name: &str, position: usize) -> Result<Value, Error> {
        match self.memo.get(name) {
            Some(CaptureEntryState::Resolved(value)) => return Ok(value.clone()),
            Some(CaptureEntryState::InProgress) => {
                return Err(Error::new(
                    format!("circular reference detected for capture entry '{name}'"),
                    position,
                ));
            }
            None => {}
        }
        let node = self.ast_pool.get(name).ok_or_else(|| {
            Error::new(format!("capture entry '{name}' not found"), position)
        })?;
        self.memo
            .insert(name.to_string(), CaptureEntryState::InProgress);
        let value = self.resolve_capture(node)?;
        self.memo
            .insert(name.to_string(), CaptureEntryState::Resolved(value.clone()));
        Ok(value)
    }

    fn resolve_capture(&mut self, node: &Node) -> Result<Value, Error> {
        match &node.kind {
            NodeKind::EqFilter(operands) => self
                .resolve_filter(operands, false)
                .map_err(|err| err.wrap("eqfilter error")),
            NodeKind::NeFilter(operands) => self
                .resolve_filter(operands, true)
                .map_err(|err| err.wrap("nefilter error")),
            NodeKind::Replace(operands) => self
                .resolve_replace(operands)
                .map_err(|err| err.wrap("replace error")),
            _ => Err(Error::new(
                "root node has unsupported operation",
                node.position,
            )),
        }
    }

    fn resolve_filter(&mut self, operands: &[Node; 3], inverted: bool) -> Result<Value, Error> {
        let input = self.resolve_input_source(&operands[0])?;
        let steps = relative_path_steps(&operands[1])?;
        let expected = self.resolve_operand_value(&operands[2])?;
        let filtered = filter::filter(&input, steps, &expected, operands[2].position, inverted)?;
        Ok(filtered.map(Value::Mapping).unwrap_or(Value::Null))
    }

    fn resolve_replace(&mut self, operands: &[Node; 3]) -> Result<Value, Error> {
        let input = self.resolve_input_source(&operands[0])?;
        let steps = relative_path_steps(&operands[1])?;
        let replacement = self.resolve_operand_value(&operands[2])?;
        let replaced = replace::replace(&input, steps, &replacement)?;
        Ok(Value::Mapping(replaced))
    }

    /// The document an operation runs against: the current state, or a
    /// capture reference (piped in or spelled directly) walked to a mapping.
    fn resolve_input_source(&mut self, node: &Node) -> Result<Mapping, Error> {
        match &node.kind {
            NodeKind::Identity(_) if node.is_current_state() => Ok(self.current_state.clone()),
            NodeKind::Pipe(inner) => self.input_source_from_path(inner),
            NodeKind::Path(_) => self.input_source_from_path(node),
            _ => Err(Error::new(
                format!(
                    "not supported input source {}. Only capture reference is supported",
                    node.render()
                ),
                node.position,
            )),
        }
    }

    fn input_source_from_path(&mut self, node: &Node) -> Result<Mapping, Error> {
        let path = CaptureEntryPath::unwrap_path(node)?;
        let Some(name) = path.capture_entry_name else {
            return Err(Error::new(
                format!(
                    "not supported input source {}. Only capture reference is supported",
                    node.render()
                ),
                node.position,
            ));
        };
        let state = self.resolve_by_name(name, node.position)?;
        let walked = path.walk_state(&state)?;
        match walked {
            Value::Mapping(map) => Ok(map),
            other => Err(Error::new(
                format!(
                    "invalid input source: expected a map state, got {}",
                    type_name(&other)
                ),
                node.position,
            )),
        }
    }

    /// The value operand of a filter or replace: a literal terminal, or a
    /// capture reference resolved on demand and walked to the referenced
    /// value.
    fn resolve_operand_value(&mut self, node: &Node) -> Result<Value, Error> {
        match &node.kind {
            NodeKind::Str(value) => Ok(Value::String(value.clone())),
            NodeKind::Number(value) => Ok(Value::from(*value)),
            NodeKind::Boolean(value) => Ok(Value::Bool(*value)),
            NodeKind::Path(_) => {
                let path = CaptureEntryPath::unwrap_path(node)?;
                let Some(name) = path.capture_entry_name else {
                    return Err(Error::new(
                        "not supported filtered value path. Only paths with a capture entry reference are supported",
                        node.position,
                    ));
                };
                let state = self.resolve_by_name(name, node.position)?;
                path.walk_state(&state)
            }
            _ => Err(Error::new(
                format!("not supported value {}", node.render()),
                node.position,
            )),
        }
    }
}

/// The path operand of a filter or replace addresses the input source
/// directly; capture references are not allowed there.
fn relative_path_steps(node: &Node) -> Result<&[Node], Error> {
    let path = CaptureEntryPath::unwrap_path(node)?;
    if path.capture_entry_name.is_some() {
        return Err(Error::new(
            "not supported filter path. Only paths relative to the input source are supported",
            node.position,
        ));
    }
    Ok(path.steps)
}

fn unmarshal_map(bytes: &[u8], what: &str) -> Result<Mapping, Error> {
    if bytes.is_empty() {
        return Ok(Mapping::new());
    }
    let value: Value = serde_yaml::from_slice(bytes)
        .map_err(|err| Error::new(format!("failed unmarshaling {what}: {err}"), 0))?;
    match value {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        other => Err(Error::new(
            format!("failed unmarshaling {what}: expected a map, got {}", type_name(&other)),
            0,
        )),
    }
}
