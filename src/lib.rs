pub mod ast;
pub mod builtins;
pub mod cli;
pub mod convert;
pub mod environment;
pub mod evaluator;
pub mod host;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod value;

pub use ast::{BinOp, Node, Program, Token, TokenKind};
pub use convert::{HostValue, from_host_value};
pub use environment::Environment;
pub use evaluator::{Evaluator, evaluate, evaluate_program};
pub use host::{Entry, EntryKind, Host, HostConfig, HostElement, HostError, VirtualElement};
pub use lexer::{Lexer, Position, lex};
pub use output::{to_json, to_json_pretty};
pub use parser::{ParseError, Parser, parse, parse_source};
pub use value::{Code, Function, Value};
