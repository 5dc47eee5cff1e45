//! Recognizes `a * b + c` (in either operand order) and folds it into one
//! `FusedMultiplyAdd` node (§4.3.4): a single rounding step instead of two,
//! left for an emitter to lower to a target's native FMA instruction where
//! one exists.
use crate::asr::{BinOpKind, Expr, ExprKind};
use crate::observer::PassObserver;
use crate::passes::{for_each_body_mut, walk_expr_mut, walk_stmt_exprs_mut, walk_stmts_mut};
use crate::asr::TranslationUnit;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    for_each_body_mut(unit, |owner, body| {
        let mut rewrote = false;
        walk_stmts_mut(body, &mut |stmt| {
            walk_stmt_exprs_mut(stmt, &mut |expr| {
                walk_expr_mut(expr, &mut |node| {
                    if try_fold_fma(node) {
                        rewrote = true;
                    }
                });
            });
        });
        if rewrote {
            if let Some(owner) = owner {
                tracing::trace!(?owner, "folded a multiply-add into a fused multiply-add");
                observer.on_rewrite("fma", owner, "folded a multiply-add into a fused multiply-add");
            }
        }
    });
}

/// Folds `expr` in place, one level, if it is `BinOp(Add, BinOp(Mul, a, b),
/// c)` or `BinOp(Add, c, BinOp(Mul, a, b))`. Driven by [`walk_expr_mut`],
/// which visits every node top-down and then recurses into whatever the
/// rewrite left behind, so a nested multiply-add still folds even though
/// this function itself does not recurse.
fn try_fold_fma(expr: &mut Expr) -> bool {
    if !matches!(&expr.kind, ExprKind::BinOp(BinOpKind::Add, ..)) {
        return false;
    }
    let ExprKind::BinOp(BinOpKind::Add, l, r) = std::mem::replace(&mut expr.kind, ExprKind::ConstantInteger(0)) else {
        unreachable!()
    };

    if let ExprKind::BinOp(BinOpKind::Mul, a, b) = l.kind {
        expr.kind = ExprKind::FusedMultiplyAdd(a, b, r);
        true
    } else if let ExprKind::BinOp(BinOpKind::Mul, a, b) = r.kind {
        expr.kind = ExprKind::FusedMultiplyAdd(a, b, l);
        true
    } else {
        expr.kind = ExprKind::BinOp(BinOpKind::Add, l, r);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{ProgramSym, Stmt, StmtKind, Symbol};
    use crate::location::Span;
    use crate::observer::NoopPassObserver;
    use crate::types::{Dimensions, Type};

    fn real(n: f64) -> Expr {
        Expr::new(ExprKind::ConstantReal(n), Type::Real(4, Dimensions::new()), Span::new(0, 1))
    }

    #[test]
    fn a_times_b_plus_c_folds_into_fma() {
        let mut unit = TranslationUnit::new();
        let mul = Expr::new(ExprKind::BinOp(BinOpKind::Mul, Box::new(real(2.0)), Box::new(real(3.0))), Type::Real(4, Dimensions::new()), Span::new(0, 1));
        let add = Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(mul), Box::new(real(4.0))), Type::Real(4, Dimensions::new()), Span::new(0, 1));
        let print = Stmt::new(StmtKind::Print { args: vec![add] }, Span::new(0, 1));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: unit.global_table,
            body: vec![print],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        let StmtKind::Print { args } = &p.body[0].kind else { panic!() };
        assert!(matches!(args[0].kind, ExprKind::FusedMultiplyAdd(..)));
    }

    #[test]
    fn a_plus_b_is_left_alone() {
        let mut unit = TranslationUnit::new();
        let add = Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(real(2.0)), Box::new(real(3.0))), Type::Real(4, Dimensions::new()), Span::new(0, 1));
        let print = Stmt::new(StmtKind::Print { args: vec![add] }, Span::new(0, 1));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: unit.global_table,
            body: vec![print],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        let StmtKind::Print { args } = &p.body[0].kind else { panic!() };
        assert!(matches!(args[0].kind, ExprKind::BinOp(BinOpKind::Add, ..)));
    }
}
