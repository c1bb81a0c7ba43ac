use std::fmt;

/// An `Error` type for failures raised while lexing, parsing, resolving or
/// expanding capture expressions.
///
/// Every error carries the position of the offending rune, token or path step
/// within the expression it originated from. Callers that know the expression
/// source attach a caret snippet with [`decorate`], so the rendered error
/// points at the failure:
///
/// ```text
/// invalid EQFILTER operation format (b is not equal char)
/// | foo=bar
/// | ....^
/// ```
///
/// Wrapping layers (`eqfilter error: …`, `resolve error: …`) extend the
/// message chain and keep the position and snippet of the innermost error.
///
/// [`decorate`]: Error::decorate
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    message: String,
    position: usize,
    snippet: Option<String>,
}

impl Error {
    pub(crate) fn new<S: Into<String>>(message: S, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
            snippet: None,
        }
    }

    /// Get the error's message chain.
    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    /// Get the position within the expression source where the error begins.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Get the source snippet attached by [`decorate`], if any.
    ///
    /// [`decorate`]: Error::decorate
    pub fn snippet(&self) -> Option<&str> {
        self.snippet.as_deref()
    }

    /// Prefix the message chain, keeping position and snippet.
    pub(crate) fn wrap(mut self, prefix: &str) -> Self {
        self.message = format!("{}: {}", prefix, self.message);
        self
    }

    /// Attach a snippet of `expression` with a caret at the error position.
    /// The first decoration wins; wrapping layers never re-point the caret.
    pub(crate) fn decorate(mut self, expression: &str) -> Self {
        if self.snippet.is_none() {
            self.snippet = snippet(expression, self.position);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(snippet) = &self.snippet {
            write!(f, "\n{snippet}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR@{} {:?}", self.position, self.message)
    }
}

impl std::error::Error for Error {}

/// Renders `expression` with a caret marking `position`:
///
/// ```text
/// | 123456
/// | ...^
/// ```
///
/// Positions past the end of the expression clamp to the final rune; an empty
/// expression yields no snippet.
fn snippet(expression: &str, position: usize) -> Option<String> {
    let len = expression.chars().count();
    if len == 0 {
        return None;
    }
    let clamped = position.min(len - 1);
    Some(format!("| {}\n| {}^", expression, ".".repeat(clamped)))
}
