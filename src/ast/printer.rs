//! Source rendering for syntax trees.
//!
//! The output re-parses to an equivalent tree: every compound form is wrapped
//! in parentheses, so the printer never has to reason about precedence.

use std::fmt::{self, Write};

use crate::ast::{Node, Program};
use crate::value::format_number;

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statements(f, &self.statements)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Number(n) if *n < 0.0 => write!(f, "(-{})", format_number(-n)),
            Node::Number(n) => f.write_str(&format_number(*n)),
            Node::String(s) | Node::Error(s) => write_string_literal(f, s),
            Node::Word(name) => f.write_str(name),
            Node::Array(items) => {
                f.write_char('[')?;
                write_list(f, items)?;
                f.write_char(']')
            }
            Node::Escape(program) => write!(f, "\\({})", program),
            Node::Unary { op, operand } => write!(f, "({}{})", op, operand),
            Node::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Node::PipeFun { input, stages } => {
                write!(f, "({}", input)?;
                for stage in stages {
                    write!(f, " {} {}", stage.kind, stage.body)?;
                }
                f.write_char(')')
            }
            Node::Pipe(stages) => {
                f.write_char('(')?;
                for (i, stage) in stages.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" -> ")?;
                    }
                    write!(f, "{}", stage)?;
                }
                f.write_char(')')
            }
            Node::VarDef { name, value } => write!(f, "(var {} = {})", name, value),
            Node::FuncDef {
                name,
                anonymous,
                params,
                body,
            } => {
                f.write_str("(fun ")?;
                if !anonymous {
                    f.write_str(name)?;
                }
                write!(f, "({}) = {} rav)", params.join(", "), body)
            }
            Node::If {
                condition,
                body,
                otherwise,
            } => {
                write!(f, "(if {} do {}", condition, body)?;
                if let Some(otherwise) = otherwise {
                    write!(f, " else {}", otherwise)?;
                }
                f.write_str(" fi)")
            }
            Node::While {
                condition,
                body,
                mode,
            } => write!(f, "(while {} {} {} done)", condition, mode, body),
            Node::For {
                var,
                start,
                end,
                body,
                mode,
            } => write!(f, "(for {} = {}, {} {} {} rof)", var, start, end, mode, body),
            Node::ForEach {
                var,
                iterable,
                body,
                mode,
            } => write!(f, "(foreach {} in {} {} {} rof)", var, iterable, mode, body),
            Node::Call { callee, args } => {
                write!(f, "{}(", callee)?;
                write_list(f, args)?;
                f.write_char(')')
            }
            Node::Index { object, index } => write!(f, "{}[{}]", object, index),
            Node::Expr(inner) => write!(f, "{}", inner),
            Node::Program(program) => write!(f, "({})", program),
        }
    }
}

fn write_statements(f: &mut fmt::Formatter<'_>, statements: &[Node]) -> fmt::Result {
    for (i, statement) in statements.iter().enumerate() {
        if i > 0 {
            f.write_str("; ")?;
        }
        write!(f, "{}", statement)?;
    }
    Ok(())
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Node]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for c in s.chars() {
        match c {
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_source;

    #[test]
    fn printed_program_reparses_to_same_tree() {
        let sources = [
            "1 + 2 * 3",
            "fun sq(n) = n * n rav; sq(4)",
            "[1, 2, 3] ?> arg0 > 1 => arg0 * 2",
            "for i = 0, 3 : i rof",
            "if x do \"a\\tb\" else -y fi",
            "5 -> double -> str",
            "\\(\"x\\\"y\")",
            "\"a\\\\b\" + \"\\\"\"",
        ];
        for source in sources {
            let program = parse_source(source);
            let printed = program.to_string();
            assert_eq!(parse_source(&printed), program, "printed as {}", printed);
        }
    }
}
