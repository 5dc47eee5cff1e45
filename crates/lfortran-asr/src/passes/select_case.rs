//! Lowers `select case` into a chain of `If` statements (§4.3.5): backends
//! only need to understand `If`, not a dedicated multi-way-branch construct.
use crate::asr::{CmpOpKind, Expr, ExprKind, SelectPattern, Stmt, StmtKind};
use crate::observer::PassObserver;
use crate::passes::{for_each_body_mut, walk_stmts_mut};
use crate::asr::TranslationUnit;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    for_each_body_mut(unit, |owner, body| {
        walk_stmts_mut(body, &mut |stmt| {
            if let StmtKind::Select { test, arms, default } = &stmt.kind {
                let span = stmt.span;
                let rewritten = lower_select(test, arms, default, span);
                if let Some(owner) = owner {
                    tracing::trace!(?owner, "rewrote select case into an if-chain");
                    observer.on_rewrite("select_case", owner, "rewrote select case into an if-chain");
                }
                *stmt = rewritten;
            }
        });
    });
}

fn lower_select(test: &Expr, arms: &[crate::asr::SelectArm], default: &[Stmt], span: crate::location::Span) -> Stmt {
    let mut chain = default.to_vec();
    for arm in arms.iter().rev() {
        let cond = arm_condition(test, arm, span);
        chain = vec![Stmt::new(
            StmtKind::If {
                cond,
                then_body: arm.body.clone(),
                else_body: chain,
            },
            span,
        )];
    }
    chain.into_iter().next().unwrap_or_else(|| Stmt::new(StmtKind::Return, span))
}

fn arm_condition(test: &Expr, arm: &crate::asr::SelectArm, span: crate::location::Span) -> Expr {
    let logical = crate::types::Type::Logical(4, crate::types::Dimensions::new());
    let mut clauses = arm.patterns.iter().map(|pattern| pattern_condition(test, pattern, span));
    let first = clauses.next().unwrap_or_else(|| Expr::new(ExprKind::ConstantLogical(false), logical.clone(), span));
    clauses.fold(first, |acc, clause| Expr::new(ExprKind::BoolOp(crate::asr::BoolOpKind::Or, vec![acc, clause]), logical.clone(), span))
}

fn pattern_condition(test: &Expr, pattern: &SelectPattern, span: crate::location::Span) -> Expr {
    let logical = crate::types::Type::Logical(4, crate::types::Dimensions::new());
    match pattern {
        SelectPattern::Value(value) => Expr::new(
            ExprKind::Compare(CmpOpKind::Eq, Box::new(test.clone()), Box::new(value.clone())),
            logical,
            span,
        ),
        SelectPattern::Range(lo, hi) => {
            let ge = Expr::new(
                ExprKind::Compare(CmpOpKind::GtE, Box::new(test.clone()), Box::new(lo.clone())),
                logical.clone(),
                span,
            );
            let le = Expr::new(
                ExprKind::Compare(CmpOpKind::LtE, Box::new(test.clone()), Box::new(hi.clone())),
                logical.clone(),
                span,
            );
            Expr::new(ExprKind::BoolOp(crate::asr::BoolOpKind::And, vec![ge, le]), logical, span)
        }
    }
}
