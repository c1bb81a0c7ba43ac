use indexmap::IndexMap;
use serde_yaml::Value;

use crate::ast::Node;
use crate::error::Error;
use crate::expander::CapturePathResolver;
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::state::RawState;
use crate::types::CapturedState;

/// Drives capture resolution: builds the AST pool out of the policy's
/// expressions, short-circuits names the cache already covers and hands the
/// pool to the resolver.
pub(crate) struct Capture {
    lexer: Lexer,
    parser: Parser,
    resolver: Resolver,
}

/// Captured states produced by one run, serialized for the output cache and
/// unmarshaled for placeholder resolution.
#[derive(Debug, Default, Clone)]
pub(crate) struct CaptureResult {
    marshaled: IndexMap<String, CapturedState>,
    unmarshaled: IndexMap<String, Value>,
}

impl Capture {
    pub(crate) fn new() -> Self {
        Self {
            lexer: Lexer::new(),
            parser: Parser::new(),
            resolver: Resolver::new(),
        }
    }

    pub(crate) fn resolve(
        &self,
        capture_expressions: &IndexMap<String, String>,
        captures_cache: &IndexMap<String, CapturedState>,
        current_state: &RawState,
    ) -> Result<CaptureResult, Error> {
        if capture_expressions.is_empty()
            || current_state.is_empty() && captures_cache.is_empty()
        {
            return Ok(CaptureResult::default());
        }

        // Only cache entries that still have an expression pass through; a
        // capture is produced iff its name appears in the policy.
        let cached: IndexMap<String, CapturedState> = capture_expressions
            .keys()
            .filter_map(|name| {
                captures_cache
                    .get(name)
                    .map(|state| (name.clone(), state.clone()))
            })
            .collect();

        let mut ast_pool = IndexMap::new();
        for (name, expression) in capture_expressions {
            if cached.contains_key(name) {
                continue;
            }
            let ast = self.resolve_capture_expression(expression)?;
            ast_pool.insert(name.clone(), ast);
        }

        let resolution = self
            .resolver
            .resolve(&ast_pool, current_state.as_bytes(), &cached)
            .map_err(|err| err.wrap("failed to resolve capture expression, err"))?;

        Ok(CaptureResult {
            marshaled: resolution.marshaled,
            unmarshaled: resolution.unmarshaled,
        })
    }

    fn resolve_capture_expression(&self, expression: &str) -> Result<Node, Error> {
        let tokens = self
            .lexer
            .lex(expression)
            .map_err(|err| err.wrap("failed to resolve capture expression, err"))?;
        self.parser.parse(&tokens).map_err(|err| {
            err.decorate(expression)
                .wrap("failed to resolve capture expression, err")
        })
    }
}

impl CaptureResult {
    pub(crate) fn captured_states(&self) -> &IndexMap<String, CapturedState> {
        &self.marshaled
    }
}

impl CapturePathResolver for CaptureResult {
    /// Lex and parse a placeholder's expression, then resolve it as a
    /// capture-reference path against this run's captured states.
    fn resolve_capture_entry_path(&self, capture_path: &str) -> Result<Value, Error> {
        let tokens = Lexer::new().lex(capture_path)?;
        let path_ast = Parser::new()
            .parse(&tokens)
            .map_err(|err| err.decorate(capture_path))?;
        Resolver::new()
            .resolve_entry_path(&path_ast, &self.unmarshaled)
            .map_err(|err| err.decorate(capture_path))
    }
}
