use tracing::warn;

use crate::ast::{Token, TokenKind};

/// Position of a character in the source, in characters from the start.
pub type Position = usize;

/// Turns source text into tokens.
///
/// Lexing never fails: characters that start no token are skipped with a
/// diagnostic, and an unterminated string runs to the end of the input.
pub struct Lexer {
    input: Vec<char>,
    position: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_while(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if accept(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self) -> String {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return result;
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('\\') => result.push('\\'),
                        Some('"') => result.push('"'),
                        Some(other) => {
                            result.push('\\');
                            result.push(other);
                        }
                        None => {
                            result.push('\\');
                            break;
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        warn!(position = start, "unterminated string, reading to end of input");
        result
    }

    fn double(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.advance();
        Token::symbol(kind)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        Token::symbol(kind)
    }

    /// Returns the next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            self.skip_whitespace();

            let token = match self.current_char()? {
                ch if ch.is_ascii_digit() => {
                    Token::new(TokenKind::Number, self.read_while(|c| c.is_ascii_digit()))
                }
                ch if ch.is_ascii_alphabetic() || ch == '_' => Token::new(
                    TokenKind::Identifier,
                    self.read_while(|c| c.is_ascii_alphanumeric() || c == '_'),
                ),
                '"' => Token::new(TokenKind::String, self.read_string()),
                '=' => match self.peek_char(1) {
                    Some('=') => self.double(TokenKind::EqEq),
                    Some('>') => self.double(TokenKind::FatArrow),
                    _ => self.single(TokenKind::Eq),
                },
                '<' => match self.peek_char(1) {
                    Some('=') => self.double(TokenKind::LtEq),
                    Some('>') => self.double(TokenKind::NotEq),
                    _ => self.single(TokenKind::Lt),
                },
                '>' => match self.peek_char(1) {
                    Some('=') => self.double(TokenKind::GtEq),
                    _ => self.single(TokenKind::Gt),
                },
                '-' => match self.peek_char(1) {
                    Some('>') => self.double(TokenKind::Arrow),
                    _ => self.single(TokenKind::Minus),
                },
                '?' if self.peek_char(1) == Some('>') => self.double(TokenKind::Filter),
                '\\' => self.single(TokenKind::Backslash),
                '+' => self.single(TokenKind::Plus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),
                ';' => self.single(TokenKind::Semicolon),
                ':' => self.single(TokenKind::Colon),
                ch => {
                    warn!(position = self.position, "invalid token: {:?}", ch);
                    self.advance();
                    continue;
                }
            };
            return Some(token);
        }
    }

    /// Lexes the whole input.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }
}

/// Lexes `source` into a flat token sequence.
pub fn lex(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

#[test]
fn test_keywords_are_identifiers() {
    let mut lexer = Lexer::new("foreach x in xs do x rof");
    for word in ["foreach", "x", "in", "xs", "do", "x", "rof"] {
        assert_eq!(
            lexer.next_token(),
            Some(Token::new(TokenKind::Identifier, word))
        );
    }
    assert_eq!(lexer.next_token(), None);
}

#[test]
fn test_pipe() {
    let mut lexer = Lexer::new("xs ?> arg0 > 5 -> len");
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Identifier));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Filter));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Identifier));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Gt));
    assert_eq!(lexer.next_token(), Some(Token::new(TokenKind::Number, "5")));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Arrow));
    assert_eq!(lexer.next_token().map(|t| t.kind), Some(TokenKind::Identifier));
    assert_eq!(lexer.next_token(), None);
}

#[test]
fn test_escaped_quote_stays_inside_the_string() {
    let mut lexer = Lexer::new(r#""x\"y" z"#);
    assert_eq!(lexer.next_token(), Some(Token::new(TokenKind::String, "x\"y")));
    assert_eq!(lexer.next_token(), Some(Token::new(TokenKind::Identifier, "z")));
    assert_eq!(lexer.next_token(), None);
}
