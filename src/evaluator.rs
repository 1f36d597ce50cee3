//! Tree-walking interpreter.
//!
//! Evaluation cannot fail. Parse error placeholders evaluate to their
//! message, and every operator a value does not support falls back as
//! described in [`crate::value`].

use std::rc::Rc;

use tracing::{debug, warn};

use crate::{
    ast::{BinOp, LoopMode, Node, PipeStage, Program, StageKind, UnaryOp},
    environment::{Environment, LAST_VALUE, PIPE_VALUE},
    parser::parse_source,
    value::{Closure, Code, Function, Value},
};

/// Evaluates nodes against a borrowed environment.
pub struct Evaluator<'env> {
    env: &'env mut Environment,
}

impl<'env> Evaluator<'env> {
    pub fn new(env: &'env mut Environment) -> Self {
        Evaluator { env }
    }

    /// Evaluates each statement in order, yielding the last value or `0` for
    /// an empty program.
    pub fn eval_program(&mut self, program: &Program) -> Value {
        let mut last = Value::Number(0.0);
        for statement in &program.statements {
            last = self.eval(statement);
        }
        last
    }

    /// Evaluates one node and records the result as `_1`.
    pub fn eval(&mut self, node: &Node) -> Value {
        let value = self.eval_node(node);
        self.env.set(LAST_VALUE, value.clone());
        value
    }

    fn eval_node(&mut self, node: &Node) -> Value {
        match node {
            Node::Number(n) => Value::Number(*n),
            Node::String(s) => Value::String(s.clone()),
            Node::Word(name) => self.lookup(name),
            Node::Array(items) => Value::array(items.iter().map(|item| self.eval(item)).collect()),
            Node::Escape(program) => Value::Code(Code::new(Rc::clone(program), self.env)),
            Node::Error(message) => {
                warn!("{}", message);
                Value::String(message.clone())
            }
            Node::Unary { op, operand } => {
                let value = self.eval(operand);
                match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Negate => value.mul(&Value::Number(-1.0)),
                }
            }
            Node::Binary { op, left, right } => self.eval_binary(*op, left, right),
            Node::PipeFun { input, stages } => self.eval_pipe_fun(input, stages),
            Node::Pipe(stages) => self.eval_pipe(stages),
            Node::VarDef { name, value } => {
                let value = self.eval(value);
                self.env.set(name.clone(), value.clone());
                value
            }
            Node::FuncDef {
                name,
                anonymous,
                params,
                body,
            } => {
                let function = Value::Function(Function::Closure(Rc::new(Closure {
                    name: name.clone(),
                    anonymous: *anonymous,
                    params: params.clone(),
                    body: Rc::clone(body),
                    env: self.env.copy(),
                })));
                if !anonymous {
                    self.env.set(name.clone(), function.clone());
                }
                function
            }
            Node::If {
                condition,
                body,
                otherwise,
            } => {
                if self.eval(condition).is_truthy() {
                    self.eval_program(body)
                } else if let Some(otherwise) = otherwise {
                    self.eval_program(otherwise)
                } else {
                    Value::Number(0.0)
                }
            }
            Node::While {
                condition,
                body,
                mode,
            } => {
                let mut results = LoopResults::new(*mode);
                while self.eval(condition).is_truthy() {
                    let value = self.eval_program(body);
                    results.push(value);
                }
                results.finish()
            }
            Node::For {
                var,
                start,
                end,
                body,
                mode,
            } => {
                let start = self.eval(start).to_number();
                let end = self.eval(end).to_number();
                let mut results = LoopResults::new(*mode);
                for step in 0..step_count(start, end) {
                    self.env.set(var.clone(), Value::Number(start + step as f64));
                    let value = self.eval_program(body);
                    results.push(value);
                }
                results.finish()
            }
            Node::ForEach {
                var,
                iterable,
                body,
                mode,
            } => {
                let iterable = self.eval(iterable);
                let mut results = LoopResults::new(*mode);
                for i in 0..iterable.len() {
                    let item = iterable.get_attribute(&Value::Number(i as f64));
                    self.env.set(var.clone(), item);
                    let value = self.eval_program(body);
                    results.push(value);
                }
                results.finish()
            }
            Node::Call { callee, args } => {
                // Arguments first, then the callee.
                let args: Vec<Value> = args.iter().map(|arg| self.eval(arg)).collect();
                self.eval(callee).call(args)
            }
            Node::Index { object, index } => {
                let object = self.eval(object);
                let index = self.eval(index);
                object.get_attribute(&index)
            }
            Node::Expr(inner) => self.eval_node(inner),
            Node::Program(program) => self.eval_program(program),
        }
    }

    fn lookup(&self, name: &str) -> Value {
        match self.env.get(name) {
            Some(value) => value,
            None => {
                debug!("{} is unbound, using it as a string", name);
                Value::String(name.to_string())
            }
        }
    }

    fn eval_binary(&mut self, op: BinOp, left: &Node, right: &Node) -> Value {
        let left = self.eval(left);

        // Short-circuit operators decide before touching the right side.
        match op {
            BinOp::And if !left.is_truthy() => return bool_value(false),
            BinOp::Or if left.is_truthy() => return bool_value(true),
            _ => {}
        }

        let right = self.eval(right);

        match op {
            BinOp::Add => left.add(&right),
            BinOp::Subtract => left.sub(&right),
            BinOp::Multiply => left.mul(&right),
            BinOp::Divide => left.div(&right),
            BinOp::Equal => left.equals(&right),
            BinOp::NotEqual => bool_value(!left.equals(&right).is_truthy()),
            BinOp::LessThan => left.less_than(&right),
            BinOp::GreaterThan => left.greater_than(&right),
            BinOp::LessEqual => bool_value(
                left.less_than(&right).is_truthy() || left.equals(&right).is_truthy(),
            ),
            BinOp::GreaterEqual => bool_value(
                left.greater_than(&right).is_truthy() || left.equals(&right).is_truthy(),
            ),
            BinOp::And | BinOp::Or => bool_value(right.is_truthy()),
            BinOp::Xor => bool_value(left.is_truthy() != right.is_truthy()),
            BinOp::Nand => bool_value(!(left.is_truthy() && right.is_truthy())),
        }
    }

    /// `xs ?> a => b`: runs every stage over each element in turn.
    fn eval_pipe_fun(&mut self, input: &Node, stages: &[PipeStage]) -> Value {
        let input = self.eval(input);
        if !matches!(input, Value::Array(_)) {
            warn!("pipe stages expect an array, got {}", input.type_name());
        }

        let mut scope = self.env.copy();
        let mut output = Vec::new();
        'elements: for (index, item) in input.items().into_iter().enumerate() {
            let mut current = item;
            for stage in stages {
                let result = apply_stage(&mut scope, &stage.body, &current, index);
                match stage.kind {
                    StageKind::Filter if !result.is_truthy() => continue 'elements,
                    StageKind::Filter => {}
                    StageKind::Transform => current = result,
                }
            }
            output.push(current);
        }
        Value::array(output)
    }

    /// `a -> f -> g(x)`: threads the running value through each stage.
    fn eval_pipe(&mut self, stages: &[Node]) -> Value {
        let Some((first, rest)) = stages.split_first() else {
            return Value::Number(0.0);
        };

        let mut value = self.eval(first);
        self.env.set(PIPE_VALUE, value.clone());

        for stage in rest {
            value = match stage.inner() {
                Node::Call { callee, args } => {
                    let mut argv = vec![value];
                    argv.extend(args.iter().map(|arg| self.eval(arg)));
                    self.eval(callee).call(argv)
                }
                other => self.eval(other).call(vec![value]),
            };
            self.env.set(PIPE_VALUE, value.clone());
        }
        value
    }
}

/// Accumulates loop iterations according to the loop's mode.
struct LoopResults {
    mode: LoopMode,
    values: Vec<Value>,
}

impl LoopResults {
    fn new(mode: LoopMode) -> Self {
        LoopResults {
            mode,
            values: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) {
        match self.mode {
            LoopMode::Last => self.values = vec![value],
            LoopMode::Collect => self.values.push(value),
        }
    }

    fn finish(self) -> Value {
        match self.mode {
            LoopMode::Last => self.values.into_iter().next().unwrap_or(Value::Number(0.0)),
            LoopMode::Collect => Value::array(self.values),
        }
    }
}

fn bool_value(b: bool) -> Value {
    Value::Number(if b { 1.0 } else { 0.0 })
}

/// Evaluates a stage body in the pipe's scope with `arg0` bound to the element
/// and `arg1` to its index. A body that yields something callable is called
/// with the element, so `xs => str` and `xs => \(arg0 * 2)` both work.
fn apply_stage(scope: &mut Environment, body: &Node, item: &Value, index: usize) -> Value {
    scope.set("arg0", item.clone());
    scope.set("arg1", Value::Number(index as f64));

    let result = Evaluator::new(scope).eval(body);
    match result {
        Value::Function(_) | Value::Code(_) => result.call(vec![item.clone()]),
        other => other,
    }
}

/// Number of unit steps from `start` while below `end`.
///
/// Counted up front so a loop terminates even where adding one to the
/// counter no longer changes it. Non-finite bounds run no steps.
pub(crate) fn step_count(start: f64, end: f64) -> u64 {
    let span = (end - start).ceil();
    if !span.is_finite() {
        warn!("cannot step from {} to {}", start, end);
        return 0;
    }
    if span > 0.0 { span as u64 } else { 0 }
}

/// Evaluates a parsed program in `env`.
pub fn evaluate_program(program: &Program, env: &mut Environment) -> Value {
    Evaluator::new(env).eval_program(program)
}

/// Lexes, parses, and evaluates `source` in `env`.
///
/// # Examples
///
/// ```
/// use aiol_lang::{Environment, Value, evaluate};
///
/// let mut env = Environment::new();
/// assert_eq!(evaluate("2 + 3 * 4", &mut env), Value::Number(14.0));
/// assert_eq!(evaluate("for i = 0, 5 : i rof", &mut env).len(), 5);
/// ```
pub fn evaluate(source: &str, env: &mut Environment) -> Value {
    evaluate_program(&parse_source(source), env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_value_is_recorded() {
        let mut env = Environment::empty();
        evaluate("3; _1 + 1", &mut env);
        assert_eq!(env.get(LAST_VALUE), Some(Value::Number(4.0)));
    }

    #[test]
    fn pipe_value_is_bound() {
        let mut env = Environment::empty();
        evaluate("[1, 2] -> \\(arg0 + [3])", &mut env);
        assert_eq!(
            env.get(PIPE_VALUE),
            Some(Value::array(vec![1.0.into(), 2.0.into(), 3.0.into()]))
        );
    }

    #[test]
    fn steps_are_counted_before_looping() {
        assert_eq!(step_count(0.0, 3.0), 3);
        assert_eq!(step_count(0.5, 3.0), 3);
        assert_eq!(step_count(3.0, 0.0), 0);
        assert_eq!(step_count(0.0, f64::INFINITY), 0);
        assert_eq!(step_count(f64::NAN, 1.0), 0);
        assert_eq!(step_count(9007199254740992.0, 9007199254740994.0), 2);
    }

    #[test]
    fn pipe_stages_share_one_scope() {
        let mut env = Environment::empty();
        let value = evaluate("[1, 2, 3] ?> \\(arg0 > 1) => arg0 * arg1", &mut env);
        assert_eq!(value, Value::array(vec![2.0.into(), 6.0.into()]));
        assert!(env.get("arg0").is_none());
    }
}
