use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::{
    ast::{BinOp, LoopMode, Node, PipeStage, Program, StageKind, Token, TokenKind, UnaryOp},
    lexer::lex,
};

/// Identifiers that close a block and are never read as values.
const BLOCK_END_WORDS: [&str; 6] = ["rav", "fi", "rof", "else", "done", "elihw"];

/// A structural problem found while parsing.
///
/// Parse errors never escape the parser: they become [`Node::Error`]
/// placeholders in the tree at the point where they occurred.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl From<ParseError> for Node {
    fn from(err: ParseError) -> Self {
        debug!(position = err.position, "parse error: {}", err.message);
        Node::Error(err.message)
    }
}

/// Recursive-descent parser over a token sequence.
///
/// Precedence, loosest first: `;`, `->`, `=>`/`?>`, logical words,
/// comparisons, `+ -`, `* /`, prefix `+ -`, calls and indexing, atoms.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    lambda_count: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            position: 0,
            lambda_count: 0,
        }
    }

    /// Index of the current token.
    pub fn position(&self) -> usize {
        self.position
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn current_kind(&self) -> Option<TokenKind> {
        self.current().map(|t| t.kind)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn retreat(&mut self) {
        self.position = self.position.saturating_sub(1);
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_kind() == Some(kind)
    }

    fn check_word(&self, word: &str) -> bool {
        self.current().is_some_and(|t| t.is_word(word))
    }

    fn at_block_end(&self) -> bool {
        match self.current() {
            None => true,
            Some(t) => {
                matches!(t.kind, TokenKind::RParen | TokenKind::RBracket)
                    || BLOCK_END_WORDS.iter().any(|w| t.is_word(w))
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            position: self.position,
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<(), ParseError> {
        if !self.check(kind) {
            return Err(self.error(message));
        }
        self.advance();
        Ok(())
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if !self.check_word(word) {
            return Err(self.error(format!("Expected '{}'", word)));
        }
        self.advance();
        Ok(())
    }

    fn expect_name(&mut self, after: &str) -> Result<String, ParseError> {
        match self.current() {
            Some(t) if t.kind == TokenKind::Identifier => {
                let name = t.text.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(format!("Expected a name after '{}'", after))),
        }
    }

    /// Parses the whole token sequence.
    ///
    /// Empty statements are skipped, and a token that cannot continue the
    /// current statement becomes an error statement before parsing resumes.
    pub fn parse(&mut self) -> Program {
        let mut statements = Vec::new();

        loop {
            match self.current_kind() {
                None => break,
                Some(TokenKind::Semicolon) => {
                    self.advance();
                    continue;
                }
                Some(_) => {}
            }

            statements.push(Node::Expr(Box::new(self.parse_expression())));

            match self.current() {
                None => break,
                Some(t) if t.kind == TokenKind::Semicolon => self.advance(),
                Some(t) => {
                    let message = format!("Unexpected token: ({})", t);
                    self.advance();
                    statements.push(Node::Expr(Box::new(Node::Error(message))));
                }
            }
        }

        Program::new(statements)
    }

    /// `program := expr (";" expr)*`, stopping at a closing token.
    fn parse_program(&mut self) -> Program {
        let mut statements = vec![Node::Expr(Box::new(self.parse_expression()))];

        while self.check(TokenKind::Semicolon) {
            self.advance();
            if self.at_block_end() {
                break;
            }
            statements.push(Node::Expr(Box::new(self.parse_expression())));
        }

        Program::new(statements)
    }

    pub fn parse_expression(&mut self) -> Node {
        self.parse_pipe()
    }

    fn parse_pipe(&mut self) -> Node {
        let first = self.parse_pipe_ops();
        if !self.check(TokenKind::Arrow) {
            return first;
        }

        let mut stages = vec![first];
        while self.check(TokenKind::Arrow) {
            self.advance();
            stages.push(self.parse_pipe_ops());
        }
        Node::Pipe(stages)
    }

    fn parse_pipe_ops(&mut self) -> Node {
        let input = self.parse_logical();
        let mut stages = Vec::new();

        loop {
            let kind = match self.current_kind() {
                Some(TokenKind::Filter) => StageKind::Filter,
                Some(TokenKind::FatArrow) => StageKind::Transform,
                _ => break,
            };
            self.advance();
            let body = self.parse_logical();
            if body.is_error() {
                return body;
            }
            stages.push(PipeStage { kind, body });
        }

        if stages.is_empty() {
            input
        } else {
            Node::PipeFun {
                input: Box::new(input),
                stages,
            }
        }
    }

    // Logical and comparison operators recurse into themselves on the right,
    // so chains lean right: `a < b < c` is `a < (b < c)`.
    fn parse_logical(&mut self) -> Node {
        let mut left = self.parse_comparison();

        while let Some(op) = self
            .current()
            .filter(|t| t.kind == TokenKind::Identifier)
            .and_then(|t| BinOp::from_word(&t.text))
        {
            self.advance();
            let right = self.parse_logical();
            left = binary(op, left, right);
        }
        left
    }

    fn parse_comparison(&mut self) -> Node {
        let mut left = self.parse_term();

        while let Some(op) = match self.current_kind() {
            Some(TokenKind::Lt) => Some(BinOp::LessThan),
            Some(TokenKind::Gt) => Some(BinOp::GreaterThan),
            Some(TokenKind::LtEq) => Some(BinOp::LessEqual),
            Some(TokenKind::GtEq) => Some(BinOp::GreaterEqual),
            Some(TokenKind::EqEq) => Some(BinOp::Equal),
            Some(TokenKind::NotEq) => Some(BinOp::NotEqual),
            _ => None,
        } {
            self.advance();
            let right = self.parse_comparison();
            left = binary(op, left, right);
        }
        left
    }

    fn parse_term(&mut self) -> Node {
        let mut left = self.parse_factor();

        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_factor();
            left = binary(op, left, right);
        }
        left
    }

    fn parse_factor(&mut self) -> Node {
        let mut left = self.parse_unary();

        loop {
            let op = match self.current_kind() {
                Some(TokenKind::Star) => BinOp::Multiply,
                Some(TokenKind::Slash) => BinOp::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary();
            left = binary(op, left, right);
        }
        left
    }

    fn parse_unary(&mut self) -> Node {
        let op = match self.current_kind() {
            Some(TokenKind::Plus) => UnaryOp::Plus,
            Some(TokenKind::Minus) => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };

        self.advance();
        let operand = self.parse_unary();
        if operand.is_error() {
            return operand;
        }
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Calls and indexing, left-associative: `f(1)(2)[0]`.
    fn parse_postfix(&mut self) -> Node {
        let mut node = self.parse_atom();

        loop {
            match self.current_kind() {
                Some(TokenKind::LParen) => {
                    self.advance();
                    match self.parse_call_args() {
                        Ok(args) => {
                            node = Node::Call {
                                callee: Box::new(node),
                                args,
                            }
                        }
                        Err(err) => return err.into(),
                    }
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let index = self.parse_expression();
                    if let Err(err) = self.expect(TokenKind::RBracket, "Missing matching ']'") {
                        return err.into();
                    }
                    node = Node::Index {
                        object: Box::new(node),
                        index: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        node
    }

    fn parse_call_args(&mut self) -> Result<Vec<Node>, ParseError> {
        if self.check(TokenKind::RParen) {
            self.advance();
            return Ok(vec![]);
        }

        let mut args = vec![self.parse_expression()];
        while self.check(TokenKind::Comma) {
            self.advance();
            args.push(self.parse_expression());
        }

        self.expect(TokenKind::RParen, "Missing matching ')' after arguments")?;
        Ok(args)
    }

    fn parse_atom(&mut self) -> Node {
        let Some(token) = self.current().cloned() else {
            return self.error("Ran out of tokens").into();
        };

        // Closing tokens belong to an enclosing construct; leave them for it.
        let closes = matches!(
            token.kind,
            TokenKind::Semicolon | TokenKind::RParen | TokenKind::RBracket | TokenKind::Comma
        ) || BLOCK_END_WORDS.iter().any(|w| token.is_word(w));
        if closes {
            return self.error(format!("Invalid token: ({})", token)).into();
        }

        self.advance();

        match token.kind {
            TokenKind::Number => match token.text.parse::<f64>() {
                Ok(n) => Node::Number(n),
                Err(_) => self.error(format!("Invalid number: {}", token.text)).into(),
            },
            TokenKind::String => Node::String(token.text),
            TokenKind::Backslash => {
                let quoted = self.parse_atom();
                if quoted.is_error() {
                    return quoted;
                }
                Node::Escape(Rc::new(Program::from_node(quoted)))
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LParen => self.parse_group(),
            TokenKind::Identifier => {
                let parsed = match token.text.as_str() {
                    "let" | "var" | "fun" => self.parse_definition(&token.text),
                    "if" => self.parse_conditional(),
                    "while" => self.parse_while(),
                    "for" => self.parse_for(),
                    "foreach" => self.parse_foreach(),
                    _ => Ok(Node::Word(token.text)),
                };
                parsed.unwrap_or_else(Node::from)
            }
            _ => self.error(format!("Invalid token: ({})", token)).into(),
        }
    }

    /// `"(" program ")"`; a single statement is returned unwrapped.
    fn parse_group(&mut self) -> Node {
        if self.check(TokenKind::RParen) {
            self.advance();
            return Node::Program(Program::default());
        }

        let mut program = self.parse_program();
        if let Err(err) = self.expect(TokenKind::RParen, "Missing matching ')'") {
            return err.into();
        }

        if program.len() == 1 {
            match program.statements.pop() {
                Some(Node::Expr(inner)) => *inner,
                Some(node) => node,
                None => Node::Program(program),
            }
        } else {
            Node::Program(program)
        }
    }

    fn parse_array_literal(&mut self) -> Node {
        let mut items = Vec::new();

        loop {
            match self.current_kind() {
                None => return self.error("Missing matching ']'").into(),
                Some(TokenKind::RBracket) => {
                    self.advance();
                    break;
                }
                Some(TokenKind::Comma) => self.advance(),
                Some(_) => {
                    let start = self.position;
                    items.push(self.parse_expression());
                    if self.position == start {
                        // A closing token that is not ours, e.g. `[1, )`.
                        return self.error("Missing matching ']'").into();
                    }
                }
            }
        }

        Node::Array(items)
    }

    /// `let|var|fun NAME = expr`, `let|var|fun NAME? (params) =? program rav`.
    fn parse_definition(&mut self, keyword: &str) -> Result<Node, ParseError> {
        if self.check(TokenKind::LParen) {
            let name = format!("lambda#{}", self.lambda_count);
            self.lambda_count += 1;
            return self.parse_function(name, true);
        }

        let name = self.expect_name(keyword)?;

        match self.current_kind() {
            Some(TokenKind::LParen) => self.parse_function(name, false),
            Some(TokenKind::Eq) => {
                self.advance();
                let value = self.parse_expression();
                Ok(Node::VarDef {
                    name,
                    value: Box::new(value),
                })
            }
            _ => {
                // Leave the name in the stream so parsing resumes at it.
                self.retreat();
                Err(self.error(format!("Expected '=' or '(' after '{} {}'", keyword, name)))
            }
        }
    }

    fn parse_function(&mut self, name: String, anonymous: bool) -> Result<Node, ParseError> {
        self.advance(); // Consume '('

        let mut params = Vec::new();
        loop {
            match self.current() {
                None => return Err(self.error("Missing ')' in parameter list")),
                Some(t) => match t.kind {
                    TokenKind::RParen => {
                        self.advance();
                        break;
                    }
                    TokenKind::Comma => self.advance(),
                    TokenKind::Identifier => {
                        params.push(t.text.clone());
                        self.advance();
                    }
                    _ => {
                        return Err(self.error(format!("Unexpected ({}) in parameter list", t)));
                    }
                },
            }
        }

        if self.check(TokenKind::Eq) {
            self.advance();
        }

        let body = self.parse_program();
        self.expect_word("rav")?;

        Ok(Node::FuncDef {
            name,
            anonymous,
            params,
            body: Rc::new(body),
        })
    }

    fn parse_loop_mode(&mut self) -> Result<LoopMode, ParseError> {
        let mode = if self.check_word("do") {
            LoopMode::Last
        } else if self.check(TokenKind::Colon) {
            LoopMode::Collect
        } else {
            return Err(self.error("Expected 'do' or ':' before loop body"));
        };
        self.advance();
        Ok(mode)
    }

    fn parse_conditional(&mut self) -> Result<Node, ParseError> {
        let condition = self.parse_expression();
        self.expect_word("do")?;
        let body = self.parse_program();

        let otherwise = if self.check_word("else") {
            self.advance();
            Some(self.parse_program())
        } else {
            None
        };

        if self.check_word("fi") {
            self.advance();
        }

        Ok(Node::If {
            condition: Box::new(condition),
            body,
            otherwise,
        })
    }

    fn parse_while(&mut self) -> Result<Node, ParseError> {
        let condition = self.parse_expression();
        let mode = self.parse_loop_mode()?;
        let body = self.parse_program();

        if ["fi", "elihw", "done"].iter().any(|w| self.check_word(w)) {
            self.advance();
        }

        Ok(Node::While {
            condition: Box::new(condition),
            body,
            mode,
        })
    }

    fn parse_for(&mut self) -> Result<Node, ParseError> {
        let var = self.expect_name("for")?;
        self.expect(TokenKind::Eq, "Expected '=' after for variable")?;
        let start = self.parse_expression();
        self.expect(TokenKind::Comma, "Expected ',' between for bounds")?;
        let end = self.parse_expression();
        let mode = self.parse_loop_mode()?;
        let body = self.parse_program();
        self.expect_word("rof")?;

        Ok(Node::For {
            var,
            start: Box::new(start),
            end: Box::new(end),
            body,
            mode,
        })
    }

    fn parse_foreach(&mut self) -> Result<Node, ParseError> {
        let var = self.expect_name("foreach")?;
        if self.check_word("in") {
            self.advance();
        }
        let iterable = self.parse_expression();
        let mode = self.parse_loop_mode()?;
        let body = self.parse_program();
        self.expect_word("rof")?;

        Ok(Node::ForEach {
            var,
            iterable: Box::new(iterable),
            body,
            mode,
        })
    }
}

/// Builds a binary node, letting a parse error on either side stand in for
/// the whole operation.
fn binary(op: BinOp, left: Node, right: Node) -> Node {
    if left.is_error() {
        return left;
    }
    if right.is_error() {
        return right;
    }
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

/// Parses a token sequence into a program.
pub fn parse(tokens: Vec<Token>) -> Program {
    Parser::new(tokens).parse()
}

/// Lexes and parses `source`.
pub fn parse_source(source: &str) -> Program {
    parse(lex(source))
}
