// tests/parser_tests.rs

use std::rc::Rc;

use aiol_lang::ast::{BinOp, LoopMode, Node, PipeStage, Program, StageKind, UnaryOp};
use aiol_lang::parser::parse_source;
use pretty_assertions::assert_eq;

fn parse_one(source: &str) -> Node {
    let program = parse_source(source);
    assert_eq!(program.len(), 1, "expected one statement in {:?}", source);
    program.statements[0].inner().clone()
}

fn num(n: f64) -> Node {
    Node::Number(n)
}

fn word(w: &str) -> Node {
    Node::Word(w.to_string())
}

fn stmt(node: Node) -> Node {
    Node::Expr(Box::new(node))
}

fn bin(op: BinOp, left: Node, right: Node) -> Node {
    Node::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

// ============================================================================
// Precedence and associativity
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    assert_eq!(
        parse_one("2 + 3 * 4"),
        bin(BinOp::Add, num(2.0), bin(BinOp::Multiply, num(3.0), num(4.0)))
    );
}

#[test]
fn test_parentheses() {
    // Should be: Multiply(Add(2, 3), 4)
    assert_eq!(
        parse_one("(2 + 3) * 4"),
        bin(BinOp::Multiply, bin(BinOp::Add, num(2.0), num(3.0)), num(4.0))
    );
}

#[test]
fn test_subtraction_leans_left() {
    assert_eq!(
        parse_one("10 - 4 - 3"),
        bin(BinOp::Subtract, bin(BinOp::Subtract, num(10.0), num(4.0)), num(3.0))
    );
}

#[test]
fn test_comparison_chain_leans_right() {
    // 1 < (2 < 3), not (1 < 2) < 3
    assert_eq!(
        parse_one("1 < 2 < 3"),
        bin(BinOp::LessThan, num(1.0), bin(BinOp::LessThan, num(2.0), num(3.0)))
    );
}

#[test]
fn test_logical_chain_leans_right() {
    assert_eq!(
        parse_one("a and b or c"),
        bin(BinOp::And, word("a"), bin(BinOp::Or, word("b"), word("c")))
    );
}

#[test]
fn test_comparison_binds_tighter_than_logic() {
    assert_eq!(
        parse_one("x > 1 xor y <> 2"),
        bin(
            BinOp::Xor,
            bin(BinOp::GreaterThan, word("x"), num(1.0)),
            bin(BinOp::NotEqual, word("y"), num(2.0))
        )
    );
}

#[test]
fn test_prefix_operators() {
    assert_eq!(
        parse_one("--1"),
        Node::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(Node::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(num(1.0)),
            }),
        }
    );
    assert!(matches!(
        parse_one("+x"),
        Node::Unary {
            op: UnaryOp::Plus,
            ..
        }
    ));
}

// ============================================================================
// Pipes
// ============================================================================

#[test]
fn test_filter_then_transform() {
    assert_eq!(
        parse_one("xs ?> arg0 > 2 => arg0 * 2"),
        Node::PipeFun {
            input: Box::new(word("xs")),
            stages: vec![
                PipeStage {
                    kind: StageKind::Filter,
                    body: bin(BinOp::GreaterThan, word("arg0"), num(2.0)),
                },
                PipeStage {
                    kind: StageKind::Transform,
                    body: bin(BinOp::Multiply, word("arg0"), num(2.0)),
                },
            ],
        }
    );
}

#[test]
fn test_no_stage_means_no_pipe_node() {
    assert_eq!(parse_one("xs"), word("xs"));
}

#[test]
fn test_pipeline_chain() {
    assert_eq!(
        parse_one("5 -> double -> max(1)"),
        Node::Pipe(vec![
            num(5.0),
            word("double"),
            Node::Call {
                callee: Box::new(word("max")),
                args: vec![num(1.0)],
            },
        ])
    );
}

// ============================================================================
// Atoms and postfix
// ============================================================================

#[test]
fn test_calls_and_indexing_chain() {
    assert_eq!(
        parse_one("f(1)(2)[0]"),
        Node::Index {
            object: Box::new(Node::Call {
                callee: Box::new(Node::Call {
                    callee: Box::new(word("f")),
                    args: vec![num(1.0)],
                }),
                args: vec![num(2.0)],
            }),
            index: Box::new(num(0.0)),
        }
    );
}

#[test]
fn test_array_literal_skips_extra_commas() {
    assert_eq!(
        parse_one("[1,, 2,]"),
        Node::Array(vec![num(1.0), num(2.0)])
    );
    assert_eq!(parse_one("[]"), Node::Array(vec![]));
}

#[test]
fn test_quote() {
    assert_eq!(
        parse_one("\\(1 + 1)"),
        Node::Escape(Rc::new(Program::new(vec![bin(
            BinOp::Add,
            num(1.0),
            num(1.0)
        )])))
    );
}

#[test]
fn test_group_is_a_program() {
    assert_eq!(
        parse_one("(1; 2)"),
        Node::Program(Program::new(vec![stmt(num(1.0)), stmt(num(2.0))]))
    );
}

// ============================================================================
// Definitions
// ============================================================================

#[test]
fn test_variable_definition() {
    assert_eq!(
        parse_one("var x = 1 + 2"),
        Node::VarDef {
            name: "x".to_string(),
            value: Box::new(bin(BinOp::Add, num(1.0), num(2.0))),
        }
    );
}

#[test]
fn test_function_definition() {
    assert_eq!(
        parse_one("fun add(a, b) = a + b rav"),
        Node::FuncDef {
            name: "add".to_string(),
            anonymous: false,
            params: vec!["a".to_string(), "b".to_string()],
            body: Rc::new(Program::new(vec![stmt(bin(
                BinOp::Add,
                word("a"),
                word("b")
            ))])),
        }
    );
}

#[test]
fn test_equals_before_body_is_optional() {
    let with = parse_one("fun f(n) = n rav");
    let without = parse_one("fun f(n) n rav");
    assert_eq!(with, without);
}

#[test]
fn test_lambda_gets_generated_name() {
    match parse_one("let (x) x * 2 rav") {
        Node::FuncDef {
            name,
            anonymous,
            params,
            ..
        } => {
            assert!(anonymous);
            assert!(name.starts_with("lambda"), "{}", name);
            assert_eq!(params, vec!["x".to_string()]);
        }
        other => panic!("Expected function definition, got {:?}", other),
    }
}

// ============================================================================
// Control forms
// ============================================================================

#[test]
fn test_conditional() {
    assert_eq!(
        parse_one("if x do 1 else 2 fi"),
        Node::If {
            condition: Box::new(word("x")),
            body: Program::new(vec![stmt(num(1.0))]),
            otherwise: Some(Program::new(vec![stmt(num(2.0))])),
        }
    );
    // `fi` is optional and so is the else branch
    assert!(matches!(
        parse_one("if x do 1"),
        Node::If {
            otherwise: None,
            ..
        }
    ));
}

#[test]
fn test_loop_modes() {
    assert!(matches!(
        parse_one("while x : x done"),
        Node::While {
            mode: LoopMode::Collect,
            ..
        }
    ));
    assert!(matches!(
        parse_one("while x do x elihw"),
        Node::While {
            mode: LoopMode::Last,
            ..
        }
    ));
}

#[test]
fn test_counted_loop() {
    assert_eq!(
        parse_one("for i = 0, 5 : i rof"),
        Node::For {
            var: "i".to_string(),
            start: Box::new(num(0.0)),
            end: Box::new(num(5.0)),
            body: Program::new(vec![stmt(word("i"))]),
            mode: LoopMode::Collect,
        }
    );
}

#[test]
fn test_foreach_in_is_optional() {
    let with = parse_one("foreach x in xs do x rof");
    let without = parse_one("foreach x xs do x rof");
    assert_eq!(with, without);
    assert!(matches!(with, Node::ForEach { mode: LoopMode::Last, .. }));
}

#[test]
fn test_multi_statement_bodies() {
    match parse_one("for i = 0, 2 do var y = i; y * 2 rof") {
        Node::For { body, .. } => assert_eq!(body.len(), 2),
        other => panic!("Expected for loop, got {:?}", other),
    }
}

// ============================================================================
// Error recovery
// ============================================================================

#[test]
fn test_truncated_expression_is_an_error_node() {
    let program = parse_source("1 +");
    assert_eq!(program.len(), 1);
    assert!(program.statements[0].is_error());
    assert_eq!(program.errors().len(), 1);
}

#[test]
fn test_parsing_continues_after_error() {
    let program = parse_source("1 +; var y = 2; y");
    assert_eq!(program.len(), 3);
    assert!(program.statements[0].is_error());
    assert!(matches!(
        program.statements[1].inner(),
        Node::VarDef { .. }
    ));
    assert_eq!(program.statements[2].inner(), &word("y"));
}

#[test]
fn test_missing_close_paren() {
    assert_eq!(
        parse_one("(1 + 2"),
        Node::Error("Missing matching ')'".to_string())
    );
}

#[test]
fn test_stray_token_becomes_error_statement() {
    let program = parse_source("1 ) 2");
    assert_eq!(program.errors().len(), 1);
    assert_eq!(program.statements[0].inner(), &num(1.0));
}

#[test]
fn test_missing_rav() {
    assert!(parse_one("fun f(x) x").is_error());
}

// ============================================================================
// Printing
// ============================================================================

#[test]
fn test_printed_source_is_fully_parenthesized() {
    assert_eq!(parse_source("1 + 2 * 3").to_string(), "(1 + (2 * 3))");
    assert_eq!(parse_source("\"a\\nb\"").to_string(), "\"a\\nb\"");
}
