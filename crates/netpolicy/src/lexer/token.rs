use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Identity,
    Number,
    Str,
    Boolean,

    Dot,  // .
    Pipe, // |

    Replace,  // :=
    EqFilter, // ==
    NeFilter, // !=
    Merge,    // +
}

impl TokenKind {
    /// Operator tokens fold the expression parsed so far into a new node.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Replace
                | TokenKind::EqFilter
                | TokenKind::NeFilter
                | TokenKind::Merge
                | TokenKind::Pipe
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Eof => "EOF",
            TokenKind::Identity => "IDENTITY",
            TokenKind::Number => "NUMBER",
            TokenKind::Str => "STRING",
            TokenKind::Boolean => "BOOLEAN",
            TokenKind::Dot => "DOT",
            TokenKind::Pipe => "PIPE",
            TokenKind::Replace => "REPLACE",
            TokenKind::EqFilter => "EQFILTER",
            TokenKind::NeFilter => "NEFILTER",
            TokenKind::Merge => "MERGE",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub position: usize,
    pub kind: TokenKind,
    pub literal: String,
}

impl Token {
    pub(crate) fn new<S: Into<String>>(position: usize, kind: TokenKind, literal: S) -> Self {
        Self {
            position,
            kind,
            literal: literal.into(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {:?}", self.kind, self.position, self.literal)
    }
}
