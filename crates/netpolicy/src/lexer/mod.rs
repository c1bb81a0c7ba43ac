mod scanner;
mod token;

use crate::error::Error;

use scanner::{Scanner, EOF_RUNE};

pub use token::{Token, TokenKind};

#[derive(Debug, thiserror::Error)]
enum LexError {
    #[error("illegal rune {0}")]
    IllegalRune(char),
    #[error("invalid {op} operation format ({rune} is not equal char)")]
    OperationFormat { op: &'static str, rune: String },
    #[error("invalid string format (missing {0} terminator)")]
    StringFormat(char),
    #[error("invalid number format ({0} is not a digit)")]
    NumberFormat(char),
    #[error("invalid identity format ({0} is not a valid identity rune)")]
    IdentityFormat(char),
}

/// Splits a capture expression into its token sequence.
///
/// The sequence is always terminated by an `Eof` token whose position is the
/// final rune of the expression. Token positions index the first rune of each
/// token, so errors and the parser can point back into the source.
///
/// ## Example
/// ```rust
/// use netpolicy::{Lexer, TokenKind};
///
/// let tokens = Lexer::new().lex(r#"routes.running.destination=="0.0.0.0/0""#).unwrap();
/// assert_eq!(tokens[0].kind, TokenKind::Identity);
/// assert_eq!(tokens[0].literal, "routes");
/// ```
#[derive(Debug, Default)]
pub struct Lexer;

impl Lexer {
    /// Create a new instance of `Lexer`.
    pub fn new() -> Self {
        Self
    }

    /// Tokenize `expression`. Lexical errors come back decorated with a
    /// snippet of the expression.
    pub fn lex(&self, expression: &str) -> Result<Vec<Token>, Error> {
        self.scan(expression).map_err(|err| err.decorate(expression))
    }

    fn scan(&self, expression: &str) -> Result<Vec<Token>, Error> {
        let mut scanner = Scanner::new(expression);
        let mut tokens = Vec::new();
        loop {
            scanner.next();
            let rune = scanner.rune();
            if rune == EOF_RUNE {
                tokens.push(Token::new(scanner.position(), TokenKind::Eof, ""));
                return Ok(tokens);
            }
            if is_whitespace(rune) {
                continue;
            }
            let token = if is_digit(rune) {
                lex_number(&mut scanner)?
            } else if rune == '"' || rune == '\'' {
                lex_string(&mut scanner)?
            } else if is_letter(rune) {
                lex_identity(&mut scanner)?
            } else {
                lex_operator(&mut scanner)?
            };
            tokens.push(token);
        }
    }
}

fn lex_number(scanner: &mut Scanner) -> Result<Token, Error> {
    let position = scanner.position();
    let mut literal = String::from(scanner.rune());
    loop {
        scanner.next();
        let rune = scanner.rune();
        if rune == EOF_RUNE || is_terminator(rune) {
            scanner.prev();
            return Ok(Token::new(position, TokenKind::Number, literal));
        }
        if !is_digit(rune) {
            return Err(Error::new(
                LexError::NumberFormat(rune).to_string(),
                scanner.position(),
            ));
        }
        literal.push(rune);
    }
}

fn lex_identity(scanner: &mut Scanner) -> Result<Token, Error> {
    let position = scanner.position();
    let mut literal = String::from(scanner.rune());
    loop {
        scanner.next();
        let rune = scanner.rune();
        if rune == EOF_RUNE || is_terminator(rune) {
            scanner.prev();
            break;
        }
        if is_letter(rune) || is_digit(rune) || rune == '-' {
            literal.push(rune);
        } else {
            return Err(Error::new(
                LexError::IdentityFormat(rune).to_string(),
                scanner.position(),
            ));
        }
    }
    // `true` and `false` spelled exactly become booleans; anything longer
    // (`truefoo`) or quoted stays an identity or string.
    let kind = if literal == "true" || literal == "false" {
        TokenKind::Boolean
    } else {
        TokenKind::Identity
    };
    Ok(Token::new(position, kind, literal))
}

fn lex_string(scanner: &mut Scanner) -> Result<Token, Error> {
    let position = scanner.position();
    let quote = scanner.rune();
    let mut literal = String::new();
    loop {
        scanner.next();
        let rune = scanner.rune();
        if rune == EOF_RUNE {
            return Err(Error::new(
                LexError::StringFormat(quote).to_string(),
                scanner.position(),
            ));
        }
        if rune == quote {
            return Ok(Token::new(position, TokenKind::Str, literal));
        }
        literal.push(rune);
    }
}

fn lex_operator(scanner: &mut Scanner) -> Result<Token, Error> {
    let position = scanner.position();
    match scanner.rune() {
        '.' => Ok(Token::new(position, TokenKind::Dot, ".")),
        '|' => Ok(Token::new(position, TokenKind::Pipe, "|")),
        '+' => Ok(Token::new(position, TokenKind::Merge, "+")),
        '=' => lex_equal_pair(scanner, position, "EQFILTER", TokenKind::EqFilter, "=="),
        ':' => lex_equal_pair(scanner, position, "REPLACE", TokenKind::Replace, ":="),
        '!' => lex_equal_pair(scanner, position, "NEFILTER", TokenKind::NeFilter, "!="),
        rune => Err(Error::new(LexError::IllegalRune(rune).to_string(), position)),
    }
}

fn lex_equal_pair(
    scanner: &mut Scanner,
    position: usize,
    op: &'static str,
    kind: TokenKind,
    literal: &str,
) -> Result<Token, Error> {
    scanner.next();
    let rune = scanner.rune();
    if rune != '=' {
        let rune = if rune == EOF_RUNE {
            "EOF".to_string()
        } else {
            rune.to_string()
        };
        return Err(Error::new(
            LexError::OperationFormat { op, rune }.to_string(),
            scanner.position(),
        ));
    }
    Ok(Token::new(position, kind, literal))
}

fn is_whitespace(rune: char) -> bool {
    matches!(rune, ' ' | '\t' | '\n' | '\r')
}

fn is_letter(rune: char) -> bool {
    rune.is_alphabetic()
}

fn is_digit(rune: char) -> bool {
    rune.is_ascii_digit()
}

/// Runes that end an identity or number token; the terminator itself is
/// pushed back and lexed on its own.
fn is_terminator(rune: char) -> bool {
    is_whitespace(rune) || matches!(rune, '.' | '=' | ':' | '!' | '+' | '|')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(expression: &str) -> Vec<Token> {
        Lexer::new().lex(expression).unwrap()
    }

    fn lex_err(expression: &str) -> String {
        Lexer::new().lex(expression).unwrap_err().to_string()
    }

    fn token(position: usize, kind: TokenKind, literal: &str) -> Token {
        Token::new(position, kind, literal)
    }

    #[test]
    fn whitespace_only_yields_eof() {
        assert_eq!(lex("    "), vec![token(3, TokenKind::Eof, "")]);
    }

    #[test]
    fn numbers() {
        assert_eq!(
            lex("    31    03   "),
            vec![
                token(4, TokenKind::Number, "31"),
                token(10, TokenKind::Number, "03"),
                token(14, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn strings_numbers_and_booleans() {
        assert_eq!(
            lex(r#" "foobar1" "foo 1 bar"    " foo bar - " ' bar foo' 789 "" true false "true" "false" truse truefoo falsefoo"#),
            vec![
                token(1, TokenKind::Str, "foobar1"),
                token(11, TokenKind::Str, "foo 1 bar"),
                token(26, TokenKind::Str, " foo bar - "),
                token(40, TokenKind::Str, " bar foo"),
                token(51, TokenKind::Number, "789"),
                token(55, TokenKind::Str, ""),
                token(58, TokenKind::Boolean, "true"),
                token(63, TokenKind::Boolean, "false"),
                token(69, TokenKind::Str, "true"),
                token(76, TokenKind::Str, "false"),
                token(84, TokenKind::Identity, "truse"),
                token(90, TokenKind::Identity, "truefoo"),
                token(98, TokenKind::Identity, "falsefoo"),
                token(105, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn identities_with_dashes_and_digits() {
        assert_eq!(
            lex(" foo f1-o-o fo-o-o1  "),
            vec![
                token(1, TokenKind::Identity, "foo"),
                token(5, TokenKind::Identity, "f1-o-o"),
                token(12, TokenKind::Identity, "fo-o-o1"),
                token(20, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn operators_between_terms() {
        assert_eq!(
            lex(" . foo1.dar1.0.dar2:=foo3 . dar3 ... moo3+boo3|doo3"),
            vec![
                token(1, TokenKind::Dot, "."),
                token(3, TokenKind::Identity, "foo1"),
                token(7, TokenKind::Dot, "."),
                token(8, TokenKind::Identity, "dar1"),
                token(12, TokenKind::Dot, "."),
                token(13, TokenKind::Number, "0"),
                token(14, TokenKind::Dot, "."),
                token(15, TokenKind::Identity, "dar2"),
                token(19, TokenKind::Replace, ":="),
                token(21, TokenKind::Identity, "foo3"),
                token(26, TokenKind::Dot, "."),
                token(28, TokenKind::Identity, "dar3"),
                token(33, TokenKind::Dot, "."),
                token(34, TokenKind::Dot, "."),
                token(35, TokenKind::Dot, "."),
                token(37, TokenKind::Identity, "moo3"),
                token(41, TokenKind::Merge, "+"),
                token(42, TokenKind::Identity, "boo3"),
                token(46, TokenKind::Pipe, "|"),
                token(47, TokenKind::Identity, "doo3"),
                token(50, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn standalone_operator_pairs() {
        assert_eq!(
            lex("doo3 == := := !="),
            vec![
                token(0, TokenKind::Identity, "doo3"),
                token(5, TokenKind::EqFilter, "=="),
                token(8, TokenKind::Replace, ":="),
                token(11, TokenKind::Replace, ":="),
                token(14, TokenKind::NeFilter, "!="),
                token(15, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn numeric_path_step_piped() {
        assert_eq!(
            lex("foo1.3|foo2"),
            vec![
                token(0, TokenKind::Identity, "foo1"),
                token(4, TokenKind::Dot, "."),
                token(5, TokenKind::Number, "3"),
                token(6, TokenKind::Pipe, "|"),
                token(7, TokenKind::Identity, "foo2"),
                token(10, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn single_equal_is_rejected() {
        assert_eq!(
            lex_err("foo=bar"),
            "invalid EQFILTER operation format (b is not equal char)\n| foo=bar\n| ....^"
        );
    }

    #[test]
    fn letter_inside_number_is_rejected() {
        assert_eq!(
            lex_err(" foo 1foo "),
            "invalid number format (f is not a digit)\n|  foo 1foo \n| ......^"
        );
    }

    #[test]
    fn dash_cannot_start_a_token() {
        assert_eq!(
            lex_err(" foo -foo "),
            "illegal rune -\n|  foo -foo \n| .....^"
        );
        assert_eq!(lex_err("155 -44"), "illegal rune -\n| 155 -44\n| ....^");
        assert_eq!(
            lex_err("755 33 44 -.3"),
            "illegal rune -\n| 755 33 44 -.3\n| ..........^"
        );
    }

    #[test]
    fn unterminated_strings_are_rejected() {
        assert_eq!(
            lex_err(r#" "bar1" "foo dar"#),
            "invalid string format (missing \" terminator)\n|  \"bar1\" \"foo dar\n| ...............^"
        );
        assert_eq!(
            lex_err(r#" "bar1" 'foo dar"#),
            "invalid string format (missing ' terminator)\n|  \"bar1\" 'foo dar\n| ...............^"
        );
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert_eq!(
            lex_err("255 1,3"),
            "invalid number format (, is not a digit)\n| 255 1,3\n| .....^"
        );
        assert_eq!(
            lex_err("355 1e3"),
            "invalid number format (e is not a digit)\n| 355 1e3\n| .....^"
        );
        assert_eq!(
            lex_err("455 0xEA"),
            "invalid number format (x is not a digit)\n| 455 0xEA\n| .....^"
        );
        assert_eq!(
            lex_err("655 3333_444_333"),
            "invalid number format (_ is not a digit)\n| 655 3333_444_333\n| ........^"
        );
    }

    #[test]
    fn default_gw_expression() {
        assert_eq!(
            lex(r#"routes.running.destination=="0.0.0.0/0""#),
            vec![
                token(0, TokenKind::Identity, "routes"),
                token(6, TokenKind::Dot, "."),
                token(7, TokenKind::Identity, "running"),
                token(14, TokenKind::Dot, "."),
                token(15, TokenKind::Identity, "destination"),
                token(26, TokenKind::EqFilter, "=="),
                token(28, TokenKind::Str, "0.0.0.0/0"),
                token(38, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn capture_reference_expression() {
        assert_eq!(
            lex("routes.running.next-hop-interface==capture.default-gw.routes.running.0.next-hop-interface"),
            vec![
                token(0, TokenKind::Identity, "routes"),
                token(6, TokenKind::Dot, "."),
                token(7, TokenKind::Identity, "running"),
                token(14, TokenKind::Dot, "."),
                token(15, TokenKind::Identity, "next-hop-interface"),
                token(33, TokenKind::EqFilter, "=="),
                token(35, TokenKind::Identity, "capture"),
                token(42, TokenKind::Dot, "."),
                token(43, TokenKind::Identity, "default-gw"),
                token(53, TokenKind::Dot, "."),
                token(54, TokenKind::Identity, "routes"),
                token(60, TokenKind::Dot, "."),
                token(61, TokenKind::Identity, "running"),
                token(68, TokenKind::Dot, "."),
                token(69, TokenKind::Number, "0"),
                token(70, TokenKind::Dot, "."),
                token(71, TokenKind::Identity, "next-hop-interface"),
                token(88, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn piped_replace_expression() {
        assert_eq!(
            lex(r#"capture.base-iface-routes | routes.running.next-hop-interface:="br1""#),
            vec![
                token(0, TokenKind::Identity, "capture"),
                token(7, TokenKind::Dot, "."),
                token(8, TokenKind::Identity, "base-iface-routes"),
                token(26, TokenKind::Pipe, "|"),
                token(28, TokenKind::Identity, "routes"),
                token(34, TokenKind::Dot, "."),
                token(35, TokenKind::Identity, "running"),
                token(42, TokenKind::Dot, "."),
                token(43, TokenKind::Identity, "next-hop-interface"),
                token(61, TokenKind::Replace, ":="),
                token(63, TokenKind::Str, "br1"),
                token(67, TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn whitespace_only_shifts_positions() {
        let dense = lex(r#"routes.running.destination=="0.0.0.0/0""#);
        let spaced = lex("  routes . running\t.\ndestination ==  \"0.0.0.0/0\"  ");
        let kinds_and_literals = |tokens: &[Token]| {
            tokens
                .iter()
                .map(|token| (token.kind, token.literal.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(kinds_and_literals(&dense), kinds_and_literals(&spaced));
    }

    #[test]
    fn positions_index_the_source() {
        // Whitespace shifts positions but never changes kinds or literals,
        // and every non-string token can be read back out of the source.
        let expression = "capture .\tdefault-gw |  routes.running.0.next-hop-interface := 42";
        for token in lex(expression) {
            match token.kind {
                TokenKind::Eof | TokenKind::Str => continue,
                _ => {}
            }
            let read_back: String = expression
                .chars()
                .skip(token.position)
                .take(token.literal.chars().count())
                .collect();
            assert_eq!(read_back, token.literal);
        }
    }
}
