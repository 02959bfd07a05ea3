//! Parser tests

use super::*;

fn stmt_kinds(source: &str) -> Vec<StmtKind> {
    parse(source).unwrap().into_iter().map(|s| s.kind).collect()
}

fn name(n: &str) -> Expr {
    Expr::Name(n.to_string())
}

#[test]
fn test_precedence() {
    let expr = parse_expression("a + b * c").unwrap();
    assert_eq!(
        expr,
        Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(name("a")),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(name("b")),
                rhs: Box::new(name("c")),
            }),
        }
    );
}

#[test]
fn test_not_binds_looser_than_comparison() {
    let expr = parse_expression("not a == b").unwrap();
    assert!(matches!(expr, Expr::Not(inner) if matches!(*inner, Expr::Compare { op: CompareOp::Eq, .. })));
}

#[test]
fn test_not_in_and_is_not() {
    assert!(matches!(
        parse_expression("a not in b").unwrap(),
        Expr::Compare {
            op: CompareOp::NotIn,
            ..
        }
    ));
    assert!(matches!(
        parse_expression("a is not None").unwrap(),
        Expr::Compare {
            op: CompareOp::IsNot,
            ..
        }
    ));
}

#[test]
fn test_conditional_expression() {
    let expr = parse_expression("'a' if x else 'b'").unwrap();
    assert!(matches!(expr, Expr::Conditional { .. }));
}

#[test]
fn test_postfix_chain() {
    let expr = parse_expression("h.capture('x')[0].name").unwrap();
    match expr {
        Expr::Attribute { object, name } => {
            assert_eq!(name, "name");
            assert!(matches!(*object, Expr::Index { .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_call_with_keywords() {
    match parse_expression("sorted(xs, reverse=True)").unwrap() {
        Expr::Call { args, kwargs, .. } => {
            assert_eq!(args.len(), 1);
            assert_eq!(kwargs[0].0, "reverse");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(parse_expression("f(a=1, b)").is_err());
}

#[test]
fn test_slices() {
    assert!(matches!(
        parse_expression("s[1:]").unwrap(),
        Expr::Slice {
            start: Some(_),
            end: None,
            ..
        }
    ));
    assert!(matches!(
        parse_expression("s[:2]").unwrap(),
        Expr::Slice {
            start: None,
            end: Some(_),
            ..
        }
    ));
}

#[test]
fn test_collections() {
    assert!(matches!(parse_expression("[1, 2,]").unwrap(), Expr::List(items) if items.len() == 2));
    assert!(matches!(parse_expression("(1,)").unwrap(), Expr::Tuple(items) if items.len() == 1));
    assert!(matches!(parse_expression("(1)").unwrap(), Expr::Literal(Literal::Int(1))));
    assert!(matches!(parse_expression("{'a': 1, 'b': 2}").unwrap(), Expr::Dict(entries) if entries.len() == 2));
}

#[test]
fn test_if_elif_else() {
    let kinds = stmt_kinds("if a:\n  x\nelif b:\n  y\nelse:\n  z\n");
    match &kinds[0] {
        StmtKind::If { branches, orelse } => {
            assert_eq!(branches.len(), 2);
            assert_eq!(orelse.as_ref().map(|b| b.len()), Some(1));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_empty_block_is_allowed() {
    let kinds = stmt_kinds("if a: \n\nb\n");
    assert_eq!(kinds.len(), 2);
    assert!(matches!(&kinds[0], StmtKind::If { branches, .. } if branches[0].1.is_empty()));
}

#[test]
fn test_for_with_unpacking() {
    let kinds = stmt_kinds("for i, v in enumerate(xs):\n  pass\n");
    assert!(matches!(
        &kinds[0],
        StmtKind::For { target: Target::Unpack(names), .. } if names.len() == 2
    ));
}

#[test]
fn test_try_except_finally() {
    let kinds = stmt_kinds(
        "try:\n  f()\nexcept (KeyError, IndexError) as e:\n  g(e)\nexcept:\n  pass\nfinally:\n  h()\n",
    );
    match &kinds[0] {
        StmtKind::Try {
            handlers, finally, ..
        } => {
            assert_eq!(handlers.len(), 2);
            assert_eq!(handlers[0].name.as_deref(), Some("e"));
            assert!(handlers[1].matcher.is_none());
            assert!(finally.is_some());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_try_requires_handler() {
    assert!(parse("try:\n  f()\nx = 1\n").is_err());
}

#[test]
fn test_assignments() {
    let kinds = stmt_kinds("x = 1\nd['k'] = 2\na, b = 1, 2\nx += 3\n");
    assert!(matches!(&kinds[0], StmtKind::Assign { target: Target::Name(_), .. }));
    assert!(matches!(&kinds[1], StmtKind::Assign { target: Target::Index { .. }, .. }));
    assert!(matches!(&kinds[2], StmtKind::Assign { target: Target::Unpack(_), value: Expr::Tuple(_) }));
    assert!(matches!(&kinds[3], StmtKind::AugAssign { op: BinaryOp::Add, .. }));
    assert!(parse("f() = 1\n").is_err());
}

#[test]
fn test_statement_lines() {
    let program = parse("\n\nx = 1\nif x:\n  y = 2\n").unwrap();
    assert_eq!(program[0].line, 3);
    assert_eq!(program[1].line, 4);
    match &program[1].kind {
        StmtKind::If { branches, .. } => assert_eq!(branches[0].1[0].line, 5),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_dangling_else_reports_line() {
    let err = parse("x = 1\nelse:\n  y\n").unwrap_err();
    assert_eq!(err.line(), 2);
    assert!(err.to_string().contains("'else'"));
}

#[test]
fn test_unexpected_indent() {
    let err = parse("x = 1\n  y = 2\n").unwrap_err();
    assert!(err.to_string().contains("unexpected indent"));
}

#[test]
fn test_with_statement() {
    let kinds = stmt_kinds("with h.capture('head'):\n  pass\n");
    assert!(matches!(&kinds[0], StmtKind::With { name: None, .. }));
}

#[test]
fn test_break_outside_loop() {
    assert!(parse("break\n").is_err());
    assert!(parse("if x:\n  continue\n").is_err());
    assert!(parse("while x:\n  if y:\n    break\n").is_ok());
}

#[test]
fn test_deep_parentheses_are_rejected() {
    let nested = |n: usize| format!("{}1{}", "(".repeat(n), ")".repeat(n));
    assert!(parse_expression(&nested(50)).is_ok());
    let err = parse_expression(&nested(500)).unwrap_err();
    assert_eq!(err.to_string(), "expression is nested too deeply");
    assert!(parse(&format!("x = {}", "-".repeat(500) + "1")).is_err());
}

#[test]
fn test_deep_blocks_are_rejected() {
    let nested = |n: usize| {
        let mut source = String::new();
        for depth in 0..n {
            source.push_str(&"  ".repeat(depth));
            source.push_str("if x:\n");
        }
        source.push_str(&"  ".repeat(n));
        source.push_str("pass\n");
        source
    };
    assert!(parse(&nested(20)).is_ok());
    let err = parse(&nested(150)).unwrap_err();
    assert_eq!(err.to_string(), "too many levels of indentation");
}
