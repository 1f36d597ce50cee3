use crate::ast::Node;

/// Ordered statement sequence.
///
/// A program evaluates to the value of its last statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Node>,
}

impl Program {
    pub fn new(statements: Vec<Node>) -> Self {
        Program { statements }
    }

    /// Wraps a single node, reusing it directly if it already is a program.
    pub fn from_node(node: Node) -> Self {
        match node {
            Node::Program(program) => program,
            Node::Expr(inner) if matches!(*inner, Node::Program(_)) => Program::from_node(*inner),
            node => Program::new(vec![node]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Messages of every parse error in the program, in source order.
    pub fn errors(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_errors(&mut out);
        out
    }

    pub(crate) fn collect_errors<'a>(&'a self, out: &mut Vec<&'a str>) {
        for statement in &self.statements {
            statement.collect_errors(out);
        }
    }
}
