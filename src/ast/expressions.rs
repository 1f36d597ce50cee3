use std::rc::Rc;

use crate::ast::{BinOp, LoopMode, Program, StageKind, UnaryOp};

/// Abstract Syntax Tree node.
///
/// Every syntactic form of the language is one variant. Nodes own their
/// children exclusively; the only sharing is through [`Rc<Program>`], which lets
/// quoted code and closures keep a body alive after the parse tree is dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals
    /// Numeric literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Number(f64),

    /// String literal
    ///
    /// # Example
    /// ```text
    /// "hello"
    /// ```
    String(String),

    /// Bare identifier
    ///
    /// Resolves to its binding, or to its own name as a string when unbound.
    Word(String),

    /// Array literal
    ///
    /// # Example
    /// ```text
    /// [1, "two", x]
    /// ```
    Array(Vec<Node>),

    /// Quoted code, evaluated only when called or passed to `eval`
    ///
    /// # Example
    /// ```text
    /// \(1 + 1)
    /// ```
    Escape(Rc<Program>),

    /// Placeholder for input the parser could not make sense of
    ///
    /// Evaluates to its message.
    Error(String),

    // Operations
    /// Prefix operation
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },

    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Per-element filter/transform chain over an array
    ///
    /// # Example
    /// ```text
    /// results() ?> arg0["Type"] == "Show" => arg0["En_Title"]
    /// ```
    PipeFun {
        input: Box<Node>,
        stages: Vec<PipeStage>,
    },

    /// Pipeline chain, threading each value into the next stage
    ///
    /// The first element is the source.
    ///
    /// # Example
    /// ```text
    /// 5 -> double -> str
    /// ```
    Pipe(Vec<Node>),

    // Definitions
    /// Variable definition
    ///
    /// # Example
    /// ```text
    /// var total = 0
    /// ```
    VarDef {
        name: String,
        value: Box<Node>,
    },

    /// Function definition
    ///
    /// Anonymous functions carry a generated name that is never bound.
    ///
    /// # Examples
    /// ```text
    /// fun double(n) = n * 2 rav
    /// let (a, b) a + b rav
    /// ```
    FuncDef {
        name: String,
        anonymous: bool,
        params: Vec<String>,
        body: Rc<Program>,
    },

    // Control flow
    /// Conditional
    ///
    /// # Example
    /// ```text
    /// if x > 3 do "big" else "small" fi
    /// ```
    If {
        condition: Box<Node>,
        body: Program,
        otherwise: Option<Program>,
    },

    /// Condition-driven loop
    ///
    /// # Example
    /// ```text
    /// while i < 3 : var i = i + 1 done
    /// ```
    While {
        condition: Box<Node>,
        body: Program,
        mode: LoopMode,
    },

    /// Counted loop over the half-open range `[start, end)`
    ///
    /// # Example
    /// ```text
    /// for i = 0, 5 : i * i rof
    /// ```
    For {
        var: String,
        start: Box<Node>,
        end: Box<Node>,
        body: Program,
        mode: LoopMode,
    },

    /// Loop over an array-like value
    ///
    /// # Example
    /// ```text
    /// foreach item in results() do item["En_Title"] rof
    /// ```
    ForEach {
        var: String,
        iterable: Box<Node>,
        body: Program,
        mode: LoopMode,
    },

    // Access
    /// Call of any callable value
    ///
    /// # Examples
    /// ```text
    /// max(1, 2)
    /// meta(id)("Rating")
    /// ```
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },

    /// Property or index access
    ///
    /// # Examples
    /// ```text
    /// items[0]
    /// entry["En_Title"]
    /// ```
    Index {
        object: Box<Node>,
        index: Box<Node>,
    },

    /// A statement in a program
    Expr(Box<Node>),

    /// Nested statement sequence, e.g. from `( a; b )`
    Program(Program),
}

/// One `?>` or `=>` segment of a [`Node::PipeFun`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipeStage {
    pub kind: StageKind,
    pub body: Node,
}

impl Node {
    /// Strips any statement wrappers.
    pub fn inner(&self) -> &Node {
        match self {
            Node::Expr(inner) => inner.inner(),
            node => node,
        }
    }

    /// True if this is a parse error placeholder.
    pub fn is_error(&self) -> bool {
        matches!(self.inner(), Node::Error(_))
    }

    /// Collects the messages of every error placeholder in this subtree.
    pub fn collect_errors<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Error(message) => out.push(message),
            Node::Number(_) | Node::String(_) | Node::Word(_) => {}
            Node::Array(items) => items.iter().for_each(|item| item.collect_errors(out)),
            Node::Escape(program) => program.collect_errors(out),
            Node::Unary { operand, .. } => operand.collect_errors(out),
            Node::Binary { left, right, .. } => {
                left.collect_errors(out);
                right.collect_errors(out);
            }
            Node::PipeFun { input, stages } => {
                input.collect_errors(out);
                stages.iter().for_each(|stage| stage.body.collect_errors(out));
            }
            Node::Pipe(stages) => stages.iter().for_each(|stage| stage.collect_errors(out)),
            Node::VarDef { value, .. } => value.collect_errors(out),
            Node::FuncDef { body, .. } => body.collect_errors(out),
            Node::If {
                condition,
                body,
                otherwise,
            } => {
                condition.collect_errors(out);
                body.collect_errors(out);
                if let Some(otherwise) = otherwise {
                    otherwise.collect_errors(out);
                }
            }
            Node::While {
                condition, body, ..
            } => {
                condition.collect_errors(out);
                body.collect_errors(out);
            }
            Node::For {
                start, end, body, ..
            } => {
                start.collect_errors(out);
                end.collect_errors(out);
                body.collect_errors(out);
            }
            Node::ForEach { iterable, body, .. } => {
                iterable.collect_errors(out);
                body.collect_errors(out);
            }
            Node::Call { callee, args } => {
                callee.collect_errors(out);
                args.iter().for_each(|arg| arg.collect_errors(out));
            }
            Node::Index { object, index } => {
                object.collect_errors(out);
                index.collect_errors(out);
            }
            Node::Expr(inner) => inner.collect_errors(out),
            Node::Program(program) => program.collect_errors(out),
        }
    }
}
