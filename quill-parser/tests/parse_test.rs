use quill_parser::ast::{BinOp, ElseBranch, Expr, Stmt};
use quill_parser::{parse_program, unescape};

#[test]
fn test_grouping() {
    let prog = parse_program("(1 + 2) * 3").expect("Failed to parse grouping");
    match &prog.stmts[0] {
        Stmt::Expr(Expr::BinOp { op, lhs, .. }) => {
            assert_eq!(*op, BinOp::Mul);
            assert!(matches!(lhs.as_ref(), Expr::BinOp { op: BinOp::Add, .. }));
        }
        other => panic!("expected Mul at the root, got {other:?}"),
    }
}

#[test]
fn test_logical_precedence() {
    // a || b && c parses as a || (b && c)
    let prog = parse_program("a || b && c").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::BinOp { op, rhs, .. }) => {
            assert_eq!(*op, BinOp::Or);
            assert!(matches!(rhs.as_ref(), Expr::BinOp { op: BinOp::And, .. }));
        }
        other => panic!("expected Or at the root, got {other:?}"),
    }
}

#[test]
fn test_fn_declaration_and_return() {
    let prog = parse_program("fn add(a, b) { return a + b }").unwrap();
    match &prog.stmts[0] {
        Stmt::FnDecl {
            name, params, body, ..
        } => {
            assert_eq!(name, "add");
            assert_eq!(params, &["a".to_string(), "b".to_string()]);
            assert!(matches!(&body.stmts[0], Stmt::Return { value: Some(_), .. }));
        }
        other => panic!("expected FnDecl, got {other:?}"),
    }
}

#[test]
fn test_bare_return() {
    let prog = parse_program("fn f() { return }").unwrap();
    let Stmt::FnDecl { body, .. } = &prog.stmts[0] else {
        panic!("expected FnDecl");
    };
    assert!(matches!(&body.stmts[0], Stmt::Return { value: None, .. }));
}

#[test]
fn test_if_else_chain() {
    let prog = parse_program("if a { 1 } else if b { 2 } else { 3 }").unwrap();
    match &prog.stmts[0] {
        Stmt::Expr(Expr::If {
            else_branch: Some(ElseBranch::If(inner)),
            ..
        }) => {
            assert!(matches!(
                inner.as_ref(),
                Expr::If {
                    else_branch: Some(ElseBranch::Block(_)),
                    ..
                }
            ));
        }
        other => panic!("expected else-if chain, got {other:?}"),
    }
}

#[test]
fn test_while_and_assignment() {
    let prog = parse_program("mut i = 0; while i < 10 { i = i + 1 }").unwrap();
    assert_eq!(prog.stmts.len(), 2);
    assert!(matches!(&prog.stmts[0], Stmt::MutDecl { name, .. } if name == "i"));
    let Stmt::While { body, .. } = &prog.stmts[1] else {
        panic!("expected While");
    };
    assert!(matches!(&body.stmts[0], Stmt::Assignment { .. }));
}

#[test]
fn test_block_expression_value() {
    let prog = parse_program("let y = { let t = 2; t * t }").unwrap();
    let Stmt::LetDecl { value, .. } = &prog.stmts[0] else {
        panic!("expected LetDecl");
    };
    match value {
        Expr::Block(block) => assert_eq!(block.stmts.len(), 2),
        other => panic!("expected Block, got {other:?}"),
    }
}

#[test]
fn test_string_literal_is_raw_until_unescaped() {
    let prog = parse_program(r#""a\tb""#).unwrap();
    let Stmt::Expr(Expr::StringLit { value, .. }) = &prog.stmts[0] else {
        panic!("expected StringLit");
    };
    assert_eq!(value, "a\\tb");
    assert_eq!(unescape(value), "a\tb");
}

#[test]
fn test_error_location_points_at_offending_token() {
    let err = parse_program("let x = \n  )").unwrap_err();
    assert_eq!((err.line, err.col), (2, 3));
    assert_eq!(err.message, "expected expression, found `)`");
    assert_eq!(
        err.to_string(),
        "parse error at line 2, col 3: expected expression, found `)`"
    );
}

#[test]
fn test_unclosed_block_reports_eof() {
    let err = parse_program("fn f() { 1").unwrap_err();
    assert!(err.message.contains("end of file"), "{}", err.message);
}
