//! Lowers every `do` loop into an explicit index initialization followed by
//! a `WhileLoop` with a manual increment (§4.3.5): backends target one
//! looping construct instead of two. A unit-step loop (`step` omitted) gets
//! the simple ascending condition `var <= end`; a loop carrying an explicit
//! step gets the general condition `(step > 0 AND var <= end) OR (step < 0
//! AND var >= end)` (§4.3.3), since the step's runtime sign can't be decided
//! here without evaluating it.
use crate::asr::{BinOpKind, BoolOpKind, CmpOpKind, Expr, ExprKind, Stmt, StmtKind, SymbolId};
use crate::observer::PassObserver;
use crate::passes::for_each_body_mut;
use crate::asr::TranslationUnit;
use crate::types::{Dimensions, Type};
use crate::location::Span;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    for_each_body_mut(unit, |owner, body| {
        let rewritten = rewrite_block(std::mem::take(body), owner, observer);
        *body = rewritten;
    });
}

fn rewrite_block(stmts: Vec<Stmt>, owner: Option<SymbolId>, observer: &mut dyn PassObserver) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(stmts.len());
    for mut stmt in stmts {
        rewrite_nested(&mut stmt, owner, observer);
        match stmt.kind {
            StmtKind::DoLoop { head, body } => {
                let span = stmt.span;
                let var_ty = head.start.ty.clone();
                out.push(Stmt::new(
                    StmtKind::Assignment {
                        target: Expr::new(ExprKind::Var(head.var), var_ty.clone(), span),
                        value: head.start,
                    },
                    span,
                ));
                let increment_by = head.step.clone().unwrap_or_else(|| Expr::new(ExprKind::ConstantInteger(1), var_ty.clone(), span));
                let cond = match &head.step {
                    None => ascending_condition(head.var, &var_ty, &head.end, span),
                    Some(step) => general_condition(head.var, &var_ty, &head.end, step, span),
                };
                let mut while_body = rewrite_block(body, owner, observer);
                while_body.push(Stmt::new(
                    StmtKind::Assignment {
                        target: Expr::new(ExprKind::Var(head.var), var_ty.clone(), span),
                        value: Expr::new(
                            ExprKind::BinOp(
                                BinOpKind::Add,
                                Box::new(Expr::new(ExprKind::Var(head.var), var_ty.clone(), span)),
                                Box::new(increment_by),
                            ),
                            var_ty,
                            span,
                        ),
                    },
                    span,
                ));
                out.push(Stmt::new(StmtKind::WhileLoop { cond, body: while_body }, span));
                tracing::trace!(?owner, "lowered a do loop into a while loop");
                if let Some(owner) = owner {
                    observer.on_rewrite("do_loops", owner, "lowered a do loop into a while loop");
                }
            }
            other => out.push(Stmt { kind: other, span: stmt.span }),
        }
    }
    out
}

/// `var <= end`, the condition for an implicit step of one.
fn ascending_condition(var: SymbolId, var_ty: &Type, end: &Expr, span: Span) -> Expr {
    Expr::new(
        ExprKind::Compare(CmpOpKind::LtE, Box::new(Expr::new(ExprKind::Var(var), var_ty.clone(), span)), Box::new(end.clone())),
        Type::Logical(4, Dimensions::new()),
        span,
    )
}

/// `(step > 0 AND var <= end) OR (step < 0 AND var >= end)` (§4.3.3): the
/// general formula that covers a runtime-determined step sign, since a
/// negative step needs a descending comparison and the sign isn't known
/// until the loop runs.
fn general_condition(var: SymbolId, var_ty: &Type, end: &Expr, step: &Expr, span: Span) -> Expr {
    let logical = Type::Logical(4, Dimensions::new());
    let var_ref = Expr::new(ExprKind::Var(var), var_ty.clone(), span);
    let zero = Expr::new(ExprKind::ConstantInteger(0), var_ty.clone(), span);
    let forward = Expr::new(
        ExprKind::BoolOp(
            BoolOpKind::And,
            vec![
                Expr::new(ExprKind::Compare(CmpOpKind::Gt, Box::new(step.clone()), Box::new(zero.clone())), logical.clone(), span),
                Expr::new(ExprKind::Compare(CmpOpKind::LtE, Box::new(var_ref.clone()), Box::new(end.clone())), logical.clone(), span),
            ],
        ),
        logical.clone(),
        span,
    );
    let backward = Expr::new(
        ExprKind::BoolOp(
            BoolOpKind::And,
            vec![
                Expr::new(ExprKind::Compare(CmpOpKind::Lt, Box::new(step.clone()), Box::new(zero)), logical.clone(), span),
                Expr::new(ExprKind::Compare(CmpOpKind::GtE, Box::new(var_ref), Box::new(end.clone())), logical.clone(), span),
            ],
        ),
        logical.clone(),
        span,
    );
    Expr::new(ExprKind::BoolOp(BoolOpKind::Or, vec![forward, backward]), logical, span)
}

/// Recurses into every nested body that `rewrite_block` itself doesn't
/// already visit (`If`, `WhileLoop`, `DoConcurrentLoop`, `Select`); every
/// `DoLoop` is rewritten directly by `rewrite_block`'s own match, so it
/// needs no entry here.
fn rewrite_nested(stmt: &mut Stmt, owner: Option<SymbolId>, observer: &mut dyn PassObserver) {
    match &mut stmt.kind {
        StmtKind::If { then_body, else_body, .. } => {
            *then_body = rewrite_block(std::mem::take(then_body), owner, observer);
            *else_body = rewrite_block(std::mem::take(else_body), owner, observer);
        }
        StmtKind::WhileLoop { body, .. } | StmtKind::DoConcurrentLoop { body, .. } => {
            *body = rewrite_block(std::mem::take(body), owner, observer);
        }
        StmtKind::Select { arms, default, .. } => {
            for arm in arms.iter_mut() {
                arm.body = rewrite_block(std::mem::take(&mut arm.body), owner, observer);
            }
            *default = rewrite_block(std::mem::take(default), owner, observer);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{DoLoopHead, ProgramSym, Symbol};
    use crate::location::Span;
    use crate::observer::NoopPassObserver;
    use crate::types::Dimensions;

    fn make_loop_var(unit: &mut TranslationUnit, table: crate::symbol_table::SymbolTableId) -> SymbolId {
        unit.arena.symbols.alloc(Symbol::Variable(crate::asr::Variable {
            name: "i".to_owned(),
            parent_table: table,
            intent: crate::asr::Intent::Local,
            storage: crate::asr::Storage::Default,
            ty: Type::Integer(4, Dimensions::new()),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }))
    }

    #[test]
    fn a_unit_step_do_loop_becomes_an_init_plus_a_while_loop() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(crate::symbol_table::SymbolTable::new(Some(unit.global_table), None));
        let var = make_loop_var(&mut unit, table);
        let int = |n| Expr::new(ExprKind::ConstantInteger(n), Type::Integer(4, Dimensions::new()), Span::new(0, 1));
        let do_loop = Stmt::new(
            StmtKind::DoLoop {
                head: DoLoopHead {
                    var,
                    start: int(1),
                    end: int(10),
                    step: None,
                },
                body: vec![Stmt::new(StmtKind::Cycle, Span::new(0, 1))],
            },
            Span::new(0, 1),
        );
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: unit.global_table,
            body: vec![do_loop],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        assert_eq!(p.body.len(), 2);
        assert!(matches!(p.body[0].kind, StmtKind::Assignment { .. }));
        assert!(matches!(p.body[1].kind, StmtKind::WhileLoop { .. }));
    }

    #[test]
    fn a_stepped_do_loop_becomes_an_init_plus_a_while_loop_with_the_general_condition() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(crate::symbol_table::SymbolTable::new(Some(unit.global_table), None));
        let var = make_loop_var(&mut unit, table);
        let int = |n| Expr::new(ExprKind::ConstantInteger(n), Type::Integer(4, Dimensions::new()), Span::new(0, 1));
        let do_loop = Stmt::new(
            StmtKind::DoLoop {
                head: DoLoopHead {
                    var,
                    start: int(10),
                    end: int(1),
                    step: Some(int(-1)),
                },
                body: Vec::new(),
            },
            Span::new(0, 1),
        );
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: unit.global_table,
            body: vec![do_loop],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        assert_eq!(p.body.len(), 2);
        assert!(matches!(p.body[0].kind, StmtKind::Assignment { .. }));
        let StmtKind::WhileLoop { cond, body } = &p.body[1].kind else { panic!("expected a while loop") };
        assert!(body.is_empty());
        let ExprKind::BoolOp(BoolOpKind::Or, arms) = &cond.kind else { panic!("expected `forward OR backward`") };
        assert_eq!(arms.len(), 2);
        for arm in arms {
            assert!(matches!(arm.kind, ExprKind::BoolOp(BoolOpKind::And, _)), "each arm is a `step-sign AND bound` conjunction");
        }
    }
}
