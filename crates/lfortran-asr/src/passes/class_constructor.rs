//! Validates a derived-type structure-constructor call (`Point(1, 2)`)
//! against its type's component order (§4.3.8): the argument count must
//! match the type's component count exactly, or the call is rejected as a
//! semantic error here rather than left for a downstream emitter to choke
//! on.
//!
//! Lowering (`body_pass::lower_call_expr`) rejects this call shape outright,
//! since the fixed pipeline order runs `verify` immediately after lowering
//! and `verify` requires every `FunctionCall` callee to resolve to a real
//! procedure -- a `DerivedType` never does. So this pass only ever sees a
//! `FunctionCall` whose callee is a `DerivedType` when it's been built by
//! hand directly against the ASR (the pattern this module's own tests use),
//! standing in for a future lowering path that constructs one explicitly.
//!
//! TODO: once ASR gains a dedicated struct-literal node, rewrite the call
//! into that node here instead of merely validating argument count.
use crate::asr::{Expr, ExprKind, Symbol};
use crate::error::{CoreError, SemanticError};
use crate::observer::PassObserver;
use crate::passes::{for_each_body_mut, walk_expr_mut, walk_stmt_exprs_mut, walk_stmts_mut};
use crate::asr::TranslationUnit;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) -> Result<(), CoreError> {
    let component_counts = component_counts(unit);
    let mut error = None;

    for_each_body_mut(unit, |owner, body| {
        walk_stmts_mut(body, &mut |stmt| {
            walk_stmt_exprs_mut(stmt, &mut |expr| {
                walk_expr_mut(expr, &mut |node| {
                    if error.is_some() {
                        return;
                    }
                    match check_constructor(node, &component_counts) {
                        Some(Ok(())) => {
                            if let Some(owner) = owner {
                                tracing::trace!(?owner, "validated a derived-type constructor call's argument count");
                                observer.on_rewrite(
                                    "class_constructor",
                                    owner,
                                    "validated a derived-type constructor call's argument count",
                                );
                            }
                        }
                        Some(Err(e)) => error = Some(e),
                        None => {}
                    }
                });
            });
        });
    });

    match error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn component_counts(unit: &TranslationUnit) -> std::collections::HashMap<crate::asr::SymbolId, usize> {
    let mut counts = std::collections::HashMap::new();
    for (id, sym) in unit.arena.symbols.iter() {
        if let Symbol::DerivedType(dt) = sym {
            let table = unit.arena.tables.get(dt.table);
            counts.insert(id, table.len());
        }
    }
    counts
}

/// `None` if `expr` isn't a constructor call this pass recognizes. `Some(Ok
/// (()))` if it is and the argument count matches its type's component
/// count. `Some(Err(..))` on an arity mismatch.
fn check_constructor(
    expr: &mut Expr,
    component_counts: &std::collections::HashMap<crate::asr::SymbolId, usize>,
) -> Option<Result<(), SemanticError>> {
    let ExprKind::FunctionCall { callee, args } = &expr.kind else { return None };
    let expected = *component_counts.get(callee)?;
    if args.len() == expected {
        Some(Ok(()))
    } else {
        Some(Err(SemanticError::new(
            format!("structure constructor passes {} argument(s) but the type has {expected} component(s)", args.len()),
            expr.span,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Abi, Access, DerivedTypeSym, Intent, ProgramSym, Stmt, StmtKind, Storage, Variable};
    use crate::location::Span;
    use crate::observer::{NoopPassObserver, RecordingPassObserver};
    use crate::symbol_table::SymbolTable;
    use crate::types::{Dimensions, Type};

    #[test]
    fn a_constructor_call_is_recognized_and_reported() {
        let mut unit = TranslationUnit::new();
        let dt_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let x = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "x".to_owned(),
            parent_table: dt_table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: Type::Integer(4, Dimensions::new()),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        unit.arena.tables.get_mut(dt_table).bind("x", x);
        let point = unit.arena.symbols.alloc(Symbol::DerivedType(DerivedTypeSym {
            name: "point".to_owned(),
            table: dt_table,
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("point", point);

        let span = Span::new(0, 1);
        let call = Expr::new(
            ExprKind::FunctionCall {
                callee: point,
                args: vec![Expr::new(ExprKind::ConstantInteger(1), Type::Integer(4, Dimensions::new()), span)],
            },
            Type::Derived(point, Dimensions::new()),
            span,
        );
        let prog_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: prog_table,
            body: vec![Stmt::new(StmtKind::Print { args: vec![call] }, span)],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        let mut observer = RecordingPassObserver::default();
        run(&mut unit, &mut observer).expect("argument count matches the single component");
        assert!(observer.events.iter().any(|e| e.contains("class_constructor")));
    }

    #[test]
    fn a_plain_function_call_is_left_alone() {
        let mut unit = TranslationUnit::new();
        run(&mut unit, &mut NoopPassObserver).expect("no constructor calls to reject");
    }

    #[test]
    fn an_arity_mismatch_is_a_semantic_error() {
        let mut unit = TranslationUnit::new();
        let dt_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let x = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "x".to_owned(),
            parent_table: dt_table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: Type::Integer(4, Dimensions::new()),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        unit.arena.tables.get_mut(dt_table).bind("x", x);
        let point = unit.arena.symbols.alloc(Symbol::DerivedType(DerivedTypeSym {
            name: "point".to_owned(),
            table: dt_table,
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("point", point);

        let span = Span::new(0, 1);
        let call = Expr::new(
            ExprKind::FunctionCall {
                callee: point,
                args: vec![
                    Expr::new(ExprKind::ConstantInteger(1), Type::Integer(4, Dimensions::new()), span),
                    Expr::new(ExprKind::ConstantInteger(2), Type::Integer(4, Dimensions::new()), span),
                ],
            },
            Type::Derived(point, Dimensions::new()),
            span,
        );
        let prog_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: prog_table,
            body: vec![Stmt::new(StmtKind::Print { args: vec![call] }, span)],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        let mut observer = NoopPassObserver;
        let err = run(&mut unit, &mut observer).expect_err("two arguments against one component is an arity mismatch");
        assert!(matches!(err, crate::error::CoreError::Semantic(_)));
    }
}
