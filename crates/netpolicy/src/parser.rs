use crate::ast::{Node, NodeKind};
use crate::error::Error;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, thiserror::Error)]
enum ParseError {
    #[error("invalid expression: {0}")]
    Expression(String),
    #[error("invalid path: {0}")]
    Path(&'static str),
    #[error("invalid equality filter: {0}")]
    EqualityFilter(&'static str),
    #[error("invalid replace: {0}")]
    Replace(&'static str),
    #[error("invalid merge: {0}")]
    Merge(&'static str),
    #[error("invalid pipe: {0}")]
    Pipe(&'static str),
}

/// Which operator an argument belongs to, for error reporting.
#[derive(Clone, Copy)]
enum Operation {
    EqualityFilter,
    Replace,
    Merge,
}

impl Operation {
    fn error(self, detail: &'static str) -> ParseError {
        match self {
            Operation::EqualityFilter => ParseError::EqualityFilter(detail),
            Operation::Replace => ParseError::Replace(detail),
            Operation::Merge => ParseError::Merge(detail),
        }
    }
}

/// Builds the AST of a single capture expression from its token sequence.
///
/// The parser folds the token stream left to right, carrying the last parsed
/// term so binary and ternary operators can pick up their left hand side. A
/// pipe stashes its path until the downstream operator claims it as input
/// source.
///
/// ## Example
/// ```rust
/// use netpolicy::{Lexer, Parser};
///
/// let tokens = Lexer::new().lex(r#"routes.running.destination=="0.0.0.0/0""#).unwrap();
/// let root = Parser::new().parse(&tokens).unwrap();
/// assert_eq!(root.position, 26);
/// ```
#[derive(Debug, Default)]
pub struct Parser;

impl Parser {
    /// Create a new instance of `Parser`.
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, tokens: &[Token]) -> Result<Node, Error> {
        ParserRun::new(tokens).parse()
    }
}

struct ParserRun<'t> {
    tokens: &'t [Token],
    index: usize,
    last_node: Option<Node>,
    piped_in: Option<Node>,
}

impl<'t> ParserRun<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self {
            tokens,
            index: 0,
            last_node: None,
            piped_in: None,
        }
    }

    fn parse(mut self) -> Result<Node, Error> {
        while let Some(token) = self.current() {
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::Identity => {
                    let path = self.parse_path(token)?;
                    self.push_term(path)?;
                }
                TokenKind::Str | TokenKind::Number | TokenKind::Boolean => {
                    let terminal = terminal_node(token)?;
                    self.advance();
                    self.push_term(terminal)?;
                }
                TokenKind::EqFilter => self.parse_filter(token, false)?,
                TokenKind::NeFilter => self.parse_filter(token, true)?,
                TokenKind::Replace => self.parse_replace(token)?,
                TokenKind::Merge => self.parse_merge(token)?,
                TokenKind::Pipe => self.parse_pipe(token)?,
                TokenKind::Dot => {
                    return Err(err(
                        ParseError::Expression(format!("unexpected token `{}`", token.literal)),
                        token.position,
                    ));
                }
            }
        }
        if let Some(pipe) = self.piped_in {
            return Err(err(
                ParseError::Pipe("missing pipe out expression"),
                pipe.position,
            ));
        }
        self.last_node
            .ok_or_else(|| err(ParseError::Expression("missing expression".to_string()), 0))
    }

    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) {
        self.index += 1;
    }

    fn push_term(&mut self, node: Node) -> Result<(), Error> {
        if self.last_node.is_some() {
            return Err(err(
                ParseError::Expression(format!("unexpected token `{}`", self.render_term(&node))),
                node.position,
            ));
        }
        self.last_node = Some(node);
        Ok(())
    }

    fn render_term(&self, node: &Node) -> String {
        match &node.kind {
            NodeKind::Identity(literal) | NodeKind::Str(literal) => literal.clone(),
            NodeKind::Number(number) => number.to_string(),
            NodeKind::Boolean(boolean) => boolean.to_string(),
            _ => node.render(),
        }
    }

    /// Consumes `IDENTITY (DOT (IDENTITY | NUMBER))*`, leaving the cursor on
    /// the token that terminated the path.
    fn parse_path(&mut self, leading: &Token) -> Result<Node, Error> {
        let position = leading.position;
        let mut steps = vec![Node {
            position,
            kind: NodeKind::Identity(leading.literal.clone()),
        }];
        loop {
            self.advance();
            let Some(token) = self.current() else { break };
            match token.kind {
                TokenKind::Dot => {
                    let dot_position = token.position;
                    self.advance();
                    match self.current() {
                        Some(step) if step.kind == TokenKind::Identity => {
                            steps.push(Node {
                                position: step.position,
                                kind: NodeKind::Identity(step.literal.clone()),
                            });
                        }
                        Some(step) if step.kind == TokenKind::Number => {
                            steps.push(Node {
                                position: step.position,
                                kind: NodeKind::Number(parse_number(step)?),
                            });
                        }
                        step => {
                            let position =
                                step.map(|token| token.position).unwrap_or(dot_position);
                            return Err(err(
                                ParseError::Path("missing identity or number after dot"),
                                position,
                            ));
                        }
                    }
                }
                TokenKind::Identity
                | TokenKind::Number
                | TokenKind::Str
                | TokenKind::Boolean => {
                    return Err(err(ParseError::Path("missing dot"), token.position));
                }
                _ => break,
            }
        }
        Ok(Node {
            position,
            kind: NodeKind::Path(steps),
        })
    }

    fn parse_filter(&mut self, operator: &Token, inverted: bool) -> Result<(), Error> {
        let operands = self.parse_ternary_operands(operator, Operation::EqualityFilter)?;
        let position = operands.position;
        self.last_node = Some(Node {
            position,
            kind: if inverted {
                NodeKind::NeFilter(operands.into_array())
            } else {
                NodeKind::EqFilter(operands.into_array())
            },
        });
        Ok(())
    }

    fn parse_replace(&mut self, operator: &Token) -> Result<(), Error> {
        let operands = self.parse_ternary_operands(operator, Operation::Replace)?;
        let position = operands.position;
        self.last_node = Some(Node {
            position,
            kind: NodeKind::Replace(operands.into_array()),
        });
        Ok(())
    }

    fn parse_ternary_operands(
        &mut self,
        operator: &Token,
        operation: Operation,
    ) -> Result<TernaryOperands, Error> {
        let position = operator.position;
        let lhs = self
            .last_node
            .take()
            .ok_or_else(|| err(operation.error("missing left hand argument"), position))?;
        if !lhs.is_path() {
            return Err(err(
                operation.error("left hand argument is not a path"),
                lhs.position,
            ));
        }
        self.advance();
        let rhs = self.parse_argument(operation)?;
        let input_source = self.take_input_source();
        Ok(TernaryOperands {
            position,
            input_source,
            lhs,
            rhs,
        })
    }

    fn parse_merge(&mut self, operator: &Token) -> Result<(), Error> {
        let position = operator.position;
        let lhs = self
            .last_node
            .take()
            .ok_or_else(|| err(ParseError::Merge("missing left hand argument"), position))?;
        if !lhs.is_path() {
            return Err(err(
                ParseError::Merge("left hand argument is not a path"),
                lhs.position,
            ));
        }
        self.advance();
        let rhs = self.parse_argument(Operation::Merge)?;
        if !rhs.is_path() {
            return Err(err(
                ParseError::Merge("right hand argument is not a path"),
                rhs.position,
            ));
        }
        self.last_node = Some(Node {
            position,
            kind: NodeKind::Merge(Box::new([lhs, rhs])),
        });
        Ok(())
    }

    fn parse_pipe(&mut self, operator: &Token) -> Result<(), Error> {
        let position = operator.position;
        if self.piped_in.is_some() {
            // A second pipe while the first is still pending means the first
            // never reached an operator expression.
            return Err(err(
                ParseError::Pipe("missing pipe out expression"),
                position,
            ));
        }
        let lhs = self
            .last_node
            .take()
            .ok_or_else(|| err(ParseError::Pipe("missing pipe in expression"), position))?;
        if !lhs.is_path() {
            return Err(err(
                ParseError::Pipe("only paths can be piped in"),
                lhs.position,
            ));
        }
        self.piped_in = Some(Node {
            position,
            kind: NodeKind::Pipe(Box::new(lhs)),
        });
        self.advance();
        Ok(())
    }

    fn parse_argument(&mut self, operation: Operation) -> Result<Node, Error> {
        let Some(token) = self.current() else {
            return Err(err(
                operation.error("missing right hand argument"),
                self.tokens.last().map(|token| token.position).unwrap_or(0),
            ));
        };
        match token.kind {
            TokenKind::Eof => Err(err(
                operation.error("missing right hand argument"),
                token.position,
            )),
            TokenKind::Identity => self.parse_path(token),
            TokenKind::Str | TokenKind::Number | TokenKind::Boolean => {
                let terminal = terminal_node(token)?;
                self.advance();
                Ok(terminal)
            }
            _ => Err(err(
                operation.error("right hand argument is not a string or identity"),
                token.position,
            )),
        }
    }

    /// The input source of a ternary operator: the pending piped-in path if
    /// one exists, the implicit `currentState` otherwise.
    fn take_input_source(&mut self) -> Node {
        self.piped_in.take().unwrap_or_else(Node::current_state)
    }
}

struct TernaryOperands {
    position: usize,
    input_source: Node,
    lhs: Node,
    rhs: Node,
}

impl TernaryOperands {
    fn into_array(self) -> Box<[Node; 3]> {
        Box::new([self.input_source, self.lhs, self.rhs])
    }
}

fn terminal_node(token: &Token) -> Result<Node, Error> {
    let kind = match token.kind {
        TokenKind::Str => NodeKind::Str(token.literal.clone()),
        TokenKind::Number => NodeKind::Number(parse_number(token)?),
        TokenKind::Boolean => NodeKind::Boolean(token.literal == "true"),
        _ => {
            return Err(err(
                ParseError::Expression(format!("unexpected token `{}`", token.literal)),
                token.position,
            ))
        }
    };
    Ok(Node {
        position: token.position,
        kind,
    })
}

fn parse_number(token: &Token) -> Result<i64, Error> {
    token
        .literal
        .parse::<i64>()
        .map_err(|_| err(ParseError::Path("number token is not an integer"), token.position))
}

fn err(kind: ParseError, position: usize) -> Error {
    Error::new(kind.to_string(), position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use pretty_assertions::assert_eq;

    fn parse(expression: &str) -> Node {
        let tokens = Lexer::new().lex(expression).unwrap();
        Parser::new().parse(&tokens).unwrap()
    }

    fn parse_err(expression: &str) -> Error {
        let tokens = Lexer::new().lex(expression).unwrap();
        Parser::new().parse(&tokens).unwrap_err()
    }

    fn identity(position: usize, name: &str) -> Node {
        Node {
            position,
            kind: NodeKind::Identity(name.to_string()),
        }
    }

    fn number(position: usize, value: i64) -> Node {
        Node {
            position,
            kind: NodeKind::Number(value),
        }
    }

    fn string(position: usize, value: &str) -> Node {
        Node {
            position,
            kind: NodeKind::Str(value.to_string()),
        }
    }

    fn path(position: usize, steps: Vec<Node>) -> Node {
        Node {
            position,
            kind: NodeKind::Path(steps),
        }
    }

    #[test]
    fn bare_path() {
        assert_eq!(
            parse("routes.running.destination"),
            path(
                0,
                vec![
                    identity(0, "routes"),
                    identity(7, "running"),
                    identity(15, "destination"),
                ]
            )
        );
    }

    #[test]
    fn eqfilter_with_string() {
        assert_eq!(
            parse(r#"routes.running.destination=="0.0.0.0/0""#),
            Node {
                position: 26,
                kind: NodeKind::EqFilter(Box::new([
                    Node::current_state(),
                    path(
                        0,
                        vec![
                            identity(0, "routes"),
                            identity(7, "running"),
                            identity(15, "destination"),
                        ]
                    ),
                    string(28, "0.0.0.0/0"),
                ])),
            }
        );
    }

    #[test]
    fn eqfilter_with_capture_reference() {
        assert_eq!(
            parse("interfaces.name==capture.default-gw.routes.running.0.next-hop-interface"),
            Node {
                position: 15,
                kind: NodeKind::EqFilter(Box::new([
                    Node::current_state(),
                    path(0, vec![identity(0, "interfaces"), identity(11, "name")]),
                    path(
                        17,
                        vec![
                            identity(17, "capture"),
                            identity(25, "default-gw"),
                            identity(36, "routes"),
                            identity(43, "running"),
                            number(51, 0),
                            identity(53, "next-hop-interface"),
                        ]
                    ),
                ])),
            }
        );
    }

    #[test]
    fn nefilter_with_string() {
        assert_eq!(
            parse(r#"routes.running.next-hop-interface!="br1""#),
            Node {
                position: 33,
                kind: NodeKind::NeFilter(Box::new([
                    Node::current_state(),
                    path(
                        0,
                        vec![
                            identity(0, "routes"),
                            identity(7, "running"),
                            identity(15, "next-hop-interface"),
                        ]
                    ),
                    string(35, "br1"),
                ])),
            }
        );
    }

    #[test]
    fn piped_replace() {
        assert_eq!(
            parse(r#"capture.base-iface-routes | routes.running.next-hop-interface:="br1""#),
            Node {
                position: 61,
                kind: NodeKind::Replace(Box::new([
                    Node {
                        position: 26,
                        kind: NodeKind::Pipe(Box::new(path(
                            0,
                            vec![identity(0, "capture"), identity(8, "base-iface-routes")]
                        ))),
                    },
                    path(
                        28,
                        vec![
                            identity(28, "routes"),
                            identity(35, "running"),
                            identity(43, "next-hop-interface"),
                        ]
                    ),
                    string(63, "br1"),
                ])),
            }
        );
    }

    #[test]
    fn replace_with_boolean() {
        assert_eq!(
            parse("interfaces.ipv4.enabled:=true"),
            Node {
                position: 23,
                kind: NodeKind::Replace(Box::new([
                    Node::current_state(),
                    path(
                        0,
                        vec![
                            identity(0, "interfaces"),
                            identity(11, "ipv4"),
                            identity(16, "enabled"),
                        ]
                    ),
                    Node {
                        position: 25,
                        kind: NodeKind::Boolean(true),
                    },
                ])),
            }
        );
    }

    #[test]
    fn merge_of_two_capture_references() {
        assert_eq!(
            parse("capture.a.routes.running + capture.b.routes.running"),
            Node {
                position: 25,
                kind: NodeKind::Merge(Box::new([
                    path(
                        0,
                        vec![
                            identity(0, "capture"),
                            identity(8, "a"),
                            identity(10, "routes"),
                            identity(17, "running"),
                        ]
                    ),
                    path(
                        27,
                        vec![
                            identity(27, "capture"),
                            identity(35, "b"),
                            identity(37, "routes"),
                            identity(44, "running"),
                        ]
                    ),
                ])),
            }
        );
    }

    #[test]
    fn dot_alone_is_rejected() {
        let err = parse_err(".");
        assert_eq!(err.message(), "invalid expression: unexpected token `.`");
        assert_eq!(err.position(), 0);
    }

    #[test]
    fn dangling_dot_is_rejected() {
        let err = parse_err("routes.");
        assert_eq!(
            err.message(),
            "invalid path: missing identity or number after dot"
        );
        assert_eq!(err.position(), 6);
    }

    #[test]
    fn double_dot_is_rejected() {
        let err = parse_err("routes..destination");
        assert_eq!(
            err.message(),
            "invalid path: missing identity or number after dot"
        );
    }

    #[test]
    fn adjacent_identities_are_rejected() {
        let err = parse_err("routes destination");
        assert_eq!(err.message(), "invalid path: missing dot");
        assert_eq!(err.position(), 7);
    }

    #[test]
    fn eqfilter_without_lhs_is_rejected() {
        let err = parse_err(r#"=="0.0.0.0/0""#);
        assert_eq!(
            err.message(),
            "invalid equality filter: missing left hand argument"
        );
    }

    #[test]
    fn eqfilter_with_string_lhs_is_rejected() {
        let err = parse_err(r#""foo"=="0.0.0.0/0""#);
        assert_eq!(
            err.message(),
            "invalid equality filter: left hand argument is not a path"
        );
    }

    #[test]
    fn eqfilter_without_rhs_is_rejected() {
        let err = parse_err("routes.running.destination==");
        assert_eq!(
            err.message(),
            "invalid equality filter: missing right hand argument"
        );
    }

    #[test]
    fn replace_without_rhs_is_rejected() {
        let err = parse_err("routes.running.state:=");
        assert_eq!(err.message(), "invalid replace: missing right hand argument");
    }

    #[test]
    fn merge_with_string_rhs_is_rejected() {
        let err = parse_err(r#"capture.a.routes + "foo""#);
        assert_eq!(err.message(), "invalid merge: right hand argument is not a path");
    }

    #[test]
    fn pipe_without_input_is_rejected() {
        let err = parse_err(r#"| routes.running.state:="absent""#);
        assert_eq!(err.message(), "invalid pipe: missing pipe in expression");
    }

    #[test]
    fn pipe_without_operator_is_rejected() {
        let err = parse_err("capture.base-iface-routes | routes.running");
        assert_eq!(err.message(), "invalid pipe: missing pipe out expression");
    }

    #[test]
    fn piped_string_is_rejected() {
        let err = parse_err(r#""foo" | routes.running.state:="absent""#);
        assert_eq!(err.message(), "invalid pipe: only paths can be piped in");
    }

    #[test]
    fn empty_expression_is_rejected() {
        let err = parse_err("");
        assert_eq!(err.message(), "invalid expression: missing expression");
    }
}
