//! End-to-end tests driving [`lfortran_asr::compile`] from hand-built AST
//! fixtures (there is no parser in this crate) through lowering and the
//! full pass pipeline, exercising the passes the way a real program would
//! hit them rather than by hand-building ASR directly.

use lfortran_asr::asr::{Stmt, StmtKind, Symbol};
use lfortran_asr::ast::{
    Expr, ExprKind, ProgramDecl, SelectArm, SelectPattern, Stmt as AstStmt, StmtKind as AstStmtKind, TranslationUnitAst,
    TypeSpec, VarDecl,
};
use lfortran_asr::config::CompileOptions;
use lfortran_asr::location::Span;
use lfortran_asr::observer::NoopPassObserver;
use pretty_assertions::assert_eq;

fn span() -> Span {
    Span::new(0, 1)
}

fn int_type_spec() -> TypeSpec {
    TypeSpec { name: "integer".to_owned(), kind_expr: None, span: span() }
}

fn int_var(name: &str) -> VarDecl {
    VarDecl {
        name: name.to_owned(),
        type_spec: int_type_spec(),
        dims: Vec::new(),
        intent: None,
        is_parameter: false,
        is_save: false,
        initializer: None,
        span: span(),
    }
}

fn name_expr(name: &str) -> Expr {
    Expr::new(ExprKind::Name(name.to_owned()), span())
}

fn int_expr(n: i64) -> Expr {
    Expr::new(ExprKind::Int(n), span())
}

fn assign(target: &str, value: Expr) -> AstStmt {
    AstStmt::new(AstStmtKind::Assignment { target: name_expr(target), value }, span())
}

/// `program main; integer :: i, n, x; n = 5; x = 1; do i = 1, n; x = x; end
/// do; select case (x); case (1); x = 2; case default; x = 3; end select;
/// end program`
fn fixture() -> TranslationUnitAst {
    let mut ast = TranslationUnitAst::default();
    let do_body = vec![assign("x", name_expr("x"))];
    let do_loop = AstStmt::new(
        AstStmtKind::DoLoop {
            var: "i".to_owned(),
            start: int_expr(1),
            end: name_expr("n"),
            step: None,
            body: do_body,
        },
        span(),
    );
    let select = AstStmt::new(
        AstStmtKind::Select {
            test: name_expr("x"),
            arms: vec![SelectArm {
                patterns: vec![SelectPattern::Value(int_expr(1))],
                body: vec![assign("x", int_expr(2))],
            }],
            default: vec![assign("x", int_expr(3))],
        },
        span(),
    );

    ast.program = Some(ProgramDecl {
        name: "main".to_owned(),
        declarations: vec![int_var("i"), int_var("n"), int_var("x")],
        uses: Vec::new(),
        derived_types: Vec::new(),
        interfaces: Vec::new(),
        subprograms: Vec::new(),
        body: vec![assign("n", int_expr(5)), assign("x", int_expr(1)), do_loop, select],
        span: span(),
    });
    ast
}

#[test]
fn a_do_loop_and_a_select_case_both_survive_the_full_pipeline() {
    let ast = fixture();
    let options = CompileOptions::default();
    let mut observer = NoopPassObserver;
    let unit = lfortran_asr::compile(&ast, &options, &mut observer).expect("fixture compiles cleanly");

    let main_id = unit
        .arena
        .tables
        .get(unit.global_table)
        .get_local("main")
        .expect("main is bound in the global table");
    let Symbol::Program(program) = unit.arena.symbols.get(main_id) else {
        panic!("main should lower to a Program symbol");
    };

    // n = 5; x = 1; i = 1 (loop init); while; if (was select)
    assert_eq!(program.body.len(), 5, "do-loop lowers in place, select-case rewrites in place: {:?}", program.body);

    assert!(matches!(program.body[0].kind, StmtKind::Assignment { .. }));
    assert!(matches!(program.body[1].kind, StmtKind::Assignment { .. }));
    assert!(matches!(program.body[2].kind, StmtKind::Assignment { .. }), "do_loops inserts the index init before the while loop");
    assert!(matches!(program.body[3].kind, StmtKind::WhileLoop { .. }), "a unit-step do loop becomes a while loop");
    assert!(matches!(program.body[4].kind, StmtKind::If { .. }), "select_case collapses to a nested if");

    let StmtKind::WhileLoop { body: while_body, .. } = &program.body[3].kind else { unreachable!() };
    // the loop body keeps its own assignment plus the manual increment
    assert_eq!(while_body.len(), 2);
    assert!(matches!(while_body[1].kind, StmtKind::Assignment { .. }));

    fn innermost_else(stmt: &Stmt) -> &[Stmt] {
        match &stmt.kind {
            StmtKind::If { else_body, .. } => else_body,
            _ => panic!("expected an if chain"),
        }
    }
    let else_body = innermost_else(&program.body[4]);
    assert_eq!(else_body.len(), 1, "the default arm becomes the innermost else");
    assert!(matches!(else_body[0].kind, StmtKind::Assignment { .. }));
}

#[test]
fn a_stepped_do_loop_also_lowers_to_a_while_loop() {
    let mut ast = TranslationUnitAst::default();
    let stepped = AstStmt::new(
        AstStmtKind::DoLoop {
            var: "i".to_owned(),
            start: int_expr(1),
            end: name_expr("n"),
            step: Some(int_expr(2)),
            body: vec![assign("x", name_expr("x"))],
        },
        span(),
    );
    ast.program = Some(ProgramDecl {
        name: "main".to_owned(),
        declarations: vec![int_var("i"), int_var("n"), int_var("x")],
        uses: Vec::new(),
        derived_types: Vec::new(),
        interfaces: Vec::new(),
        subprograms: Vec::new(),
        body: vec![assign("x", int_expr(0)), stepped],
        span: span(),
    });

    let options = CompileOptions::default();
    let mut observer = NoopPassObserver;
    let unit = lfortran_asr::compile(&ast, &options, &mut observer).expect("fixture compiles cleanly");
    let main_id = unit.arena.tables.get(unit.global_table).get_local("main").unwrap();
    let Symbol::Program(program) = unit.arena.symbols.get(main_id) else {
        panic!("main should lower to a Program symbol");
    };

    // x = 0; i = 1 (loop init); while (general condition)
    assert_eq!(program.body.len(), 3);
    assert!(matches!(program.body[1].kind, StmtKind::Assignment { .. }), "do_loops inserts the index init before the while loop");
    assert!(matches!(program.body[2].kind, StmtKind::WhileLoop { .. }), "a stepped do loop also becomes a while loop, using the general condition");
}

#[test]
fn a_compiled_unit_round_trips_through_binary_serialization() {
    let ast = fixture();
    let options = CompileOptions::default();
    let mut observer = NoopPassObserver;
    let unit = lfortran_asr::compile(&ast, &options, &mut observer).expect("fixture compiles cleanly");

    let bytes = lfortran_asr::serialize::dump(&unit, lfortran_asr::serialize::Encoding::Binary);
    let reloaded = lfortran_asr::serialize::load(&bytes, &[], options.intrinsic_module_prefix)
        .expect("the dump round-trips");

    let main_id = reloaded
        .arena
        .tables
        .get(reloaded.global_table)
        .get_local("main")
        .expect("main survives the round trip");
    let Symbol::Program(program) = reloaded.arena.symbols.get(main_id) else {
        panic!("main should still be a Program symbol");
    };
    assert_eq!(program.body.len(), 5);
}
