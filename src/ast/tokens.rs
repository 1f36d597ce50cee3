use std::fmt;

/// The closed set of token kinds produced by the lexer.
///
/// Keywords are not token kinds: `let`, `if`, `foreach` and friends are lexed
/// as [`TokenKind::Identifier`] and recognized by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Run of ASCII digits
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 007
    /// ```
    Number,

    /// Name or keyword
    ///
    /// Starts with a letter or underscore, followed by letters, digits, or underscores.
    ///
    /// # Examples
    /// ```text
    /// results
    /// arg0
    /// _1
    /// foreach
    /// ```
    Identifier,

    /// Double-quoted string, escapes already interpreted
    ///
    /// # Examples
    /// ```text
    /// "hello"
    /// "line\nbreak"
    /// ```
    String,

    // Arithmetic
    /// Addition, concatenation, or unary plus
    Plus,
    /// Subtraction or negation
    Minus,
    /// Multiplication
    Star,
    /// Division
    Slash,

    // Delimiters
    /// Left parenthesis for grouping, calls, and parameter lists
    LParen,
    /// Right parenthesis
    RParen,
    /// Left bracket for array literals and indexing
    LBracket,
    /// Right bracket
    RBracket,
    /// Separates arguments, array elements, and `for` bounds
    Comma,
    /// Separates statements
    Semicolon,
    /// Introduces a loop body that collects every iteration's value
    Colon,

    // Comparison and binding
    /// Variable definition (`=`)
    Eq,
    /// Equality (`==`)
    EqEq,
    /// Inequality (`<>`)
    NotEq,
    /// Less than
    Lt,
    /// Greater than
    Gt,
    /// Less than or equal
    LtEq,
    /// Greater than or equal
    GtEq,

    // Pipes
    /// Pipeline operator
    ///
    /// # Examples
    /// ```text
    /// results() -> len
    /// 5 -> double -> str
    /// ```
    Arrow,

    /// Transform pipe stage
    ///
    /// # Examples
    /// ```text
    /// [1, 2, 3] => arg0 * 2
    /// ```
    FatArrow,

    /// Filter pipe stage
    ///
    /// # Examples
    /// ```text
    /// [1, 2, 3, 4] ?> arg0 > 2
    /// ```
    Filter,

    /// Quote operator, defers evaluation of the next expression
    ///
    /// # Examples
    /// ```text
    /// \(1 + 1)
    /// ```
    Backslash,
}

impl TokenKind {
    /// Source text of fixed-spelling tokens.
    pub fn symbol(self) -> Option<&'static str> {
        use TokenKind::*;
        let s = match self {
            Number | Identifier | String => return None,
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Eq => "=",
            EqEq => "==",
            NotEq => "<>",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            Arrow => "->",
            FatArrow => "=>",
            Filter => "?>",
            Backslash => "\\",
        };
        Some(s)
    }
}

/// A lexed token: its kind plus the text it was built from.
///
/// For strings, `text` holds the contents with escapes already applied and
/// without the surrounding quotes.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
        }
    }

    /// Builds a fixed-spelling token from its kind.
    pub fn symbol(kind: TokenKind) -> Self {
        Token::new(kind, kind.symbol().unwrap_or_default())
    }

    /// True if this is the identifier `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::String => write!(f, "String \"{}\"", self.text),
            kind => write!(f, "{:?} {}", kind, self.text),
        }
    }
}
