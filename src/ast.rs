//! # AIOL - Abstract Syntax Tree
//!
//! Syntax tree for the AIO calculator language, a small expression language
//! for querying and reshaping a media catalog.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Tree nodes, one per syntactic form
//! - **[operators]** - Binary and prefix operators, pipe stage kinds, loop modes
//! - **[program]** - Statement sequences
//! - **[printer]** - Renders trees back to source text
//!
//! ## Quick Start
//!
//! ```text
//! var xs = [1, 2, 3, 4]; xs ?> arg0 > 2 => arg0 * 10
//! ```
//!
//! This keeps the elements greater than two and scales them, giving `[30, 40]`.
//!
//! ## Core Concepts
//!
//! ### Statements
//!
//! A program is a `;`-separated list of expressions; it evaluates to the last
//! one. There is no separate statement syntax: `var`, `if`, and the loops are
//! all expressions with values.
//!
//! ### Keywords Are Words
//!
//! The lexer knows no keywords. `if`, `rav`, `and` and friends are ordinary
//! identifiers that the parser recognizes by position, so a block closer like
//! `fi` is only special where a block may end.
//!
//! ### Pipes
//!
//! - `a -> f` calls `f(a)`; `a -> f(b)` calls `f(a, b)`
//! - `xs ?> cond` keeps the elements for which `cond` is truthy
//! - `xs => expr` replaces each element with `expr`
//!
//! Inside `?>` and `=>` stages, `arg0` is the element and `arg1` its index.
//!
//! ### Quoted Code
//!
//! ```text
//! var twice = \(arg0 * 2); twice(21)
//! ```
//!
//! A backslash quotes the following atom as a code value instead of
//! evaluating it.
pub mod expressions;
pub mod operators;
pub mod printer;
pub mod program;
pub mod tokens;

pub use expressions::{Node, PipeStage};
pub use operators::{BinOp, LoopMode, StageKind, UnaryOp};
pub use program::Program;
pub use tokens::{Token, TokenKind};
