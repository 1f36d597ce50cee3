use std::fmt;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    // Arithmetic
    /// Addition, concatenation, or element append (`+`)
    Add,
    /// Subtraction or substring removal (`-`)
    Subtract,
    /// Multiplication or string repetition (`*`)
    Multiply,
    /// Division (`/`)
    Divide,

    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`<>`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Logical
    /// Logical AND (`and`)
    And,
    /// Logical OR (`or`)
    Or,
    /// Exclusive OR (`xor`)
    Xor,
    /// Negated AND (`nand`)
    Nand,
}

impl BinOp {
    /// Maps a logical keyword to its operator.
    pub fn from_word(word: &str) -> Option<BinOp> {
        match word {
            "and" => Some(BinOp::And),
            "or" => Some(BinOp::Or),
            "xor" => Some(BinOp::Xor),
            "nand" => Some(BinOp::Nand),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Equal => "==",
            BinOp::NotEqual => "<>",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Nand => "nand",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Unary plus, yields the operand unchanged
    Plus,
    /// Negation, multiplies the operand by -1
    Negate,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Plus => f.write_str("+"),
            UnaryOp::Negate => f.write_str("-"),
        }
    }
}

/// Kind of a per-element pipe stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StageKind {
    /// `?>` keeps the element only if the stage result is truthy
    Filter,
    /// `=>` replaces the element with the stage result
    Transform,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Filter => f.write_str("?>"),
            StageKind::Transform => f.write_str("=>"),
        }
    }
}

/// What a loop evaluates to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopMode {
    /// `do`: the value of the final iteration
    Last,
    /// `:`: an array of every iteration's value
    Collect,
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::Last => f.write_str("do"),
            LoopMode::Collect => f.write_str(":"),
        }
    }
}
