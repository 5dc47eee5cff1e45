//! The rewrite-pass framework (§4.3): shared statement/expression walkers
//! every pass builds on, plus the fixed pipeline order (§5).
pub mod array_op;
pub mod class_constructor;
pub mod do_loops;
pub mod fma;
pub mod implied_do;
pub mod select_case;
pub mod unused_functions;
pub mod wrap_global;

use crate::asr::{Expr, ExprKind, Stmt, StmtKind, Symbol, SymbolId, TranslationUnit};
use crate::config::CompileOptions;
use crate::error::CoreError;
use crate::observer::PassObserver;

/// Recursively applies `rewrite` to every statement reachable from `stmts`,
/// including nested bodies of every block-bearing construct (`If`,
/// `WhileLoop`, `DoLoop`, `DoConcurrentLoop`, `Select` arms and default).
/// Every pass that rewrites statements walks through this helper instead of
/// hand-rolling its own traversal, so none of them can silently stop at
/// `Program`/`WhileLoop` the way an earlier, narrower walker once did.
pub fn walk_stmts_mut(stmts: &mut [Stmt], rewrite: &mut impl FnMut(&mut Stmt)) {
    for stmt in stmts.iter_mut() {
        rewrite(stmt);
        match &mut stmt.kind {
            StmtKind::If { then_body, else_body, .. } => {
                walk_stmts_mut(then_body, rewrite);
                walk_stmts_mut(else_body, rewrite);
            }
            StmtKind::WhileLoop { body, .. } | StmtKind::DoLoop { body, .. } | StmtKind::DoConcurrentLoop { body, .. } => {
                walk_stmts_mut(body, rewrite);
            }
            StmtKind::Select { arms, default, .. } => {
                for arm in arms.iter_mut() {
                    walk_stmts_mut(&mut arm.body, rewrite);
                }
                walk_stmts_mut(default, rewrite);
            }
            StmtKind::Assignment { .. }
            | StmtKind::SubroutineCall { .. }
            | StmtKind::Print { .. }
            | StmtKind::Return
            | StmtKind::Stop { .. }
            | StmtKind::ErrorStop { .. }
            | StmtKind::Exit
            | StmtKind::Cycle
            | StmtKind::GoTo(_)
            | StmtKind::GoToTarget(_)
            | StmtKind::Assert { .. }
            | StmtKind::Allocate(_)
            | StmtKind::Deallocate(_) => {}
        }
    }
}

/// Applies `rewrite` to every `Expr` node reachable from `expr`, depth-first,
/// parent before children.
pub fn walk_expr_mut(expr: &mut Expr, rewrite: &mut impl FnMut(&mut Expr)) {
    rewrite(expr);
    match &mut expr.kind {
        ExprKind::Var(_)
        | ExprKind::Str(_)
        | ExprKind::ConstantInteger(_)
        | ExprKind::ConstantReal(_)
        | ExprKind::ConstantLogical(_)
        | ExprKind::ConstantComplex(..) => {}
        ExprKind::FunctionCall { args, .. } | ExprKind::BoolOp(_, args) | ExprKind::ArrayInitializer(args) => {
            for a in args.iter_mut() {
                walk_expr_mut(a, rewrite);
            }
        }
        ExprKind::BinOp(_, l, r) | ExprKind::Compare(_, l, r) | ExprKind::StrOp(_, l, r) => {
            walk_expr_mut(l, rewrite);
            walk_expr_mut(r, rewrite);
        }
        ExprKind::FusedMultiplyAdd(a, b, c) => {
            walk_expr_mut(a, rewrite);
            walk_expr_mut(b, rewrite);
            walk_expr_mut(c, rewrite);
        }
        ExprKind::UnaryOp(_, e) | ExprKind::ImplicitCast { operand: e, .. } | ExprKind::ExplicitCast { operand: e, .. } => {
            walk_expr_mut(e, rewrite);
        }
        ExprKind::ArrayRef { base, indices } => {
            walk_expr_mut(base, rewrite);
            for i in indices.iter_mut() {
                walk_expr_mut(i, rewrite);
            }
        }
        ExprKind::ArraySize { array, dim } => {
            walk_expr_mut(array, rewrite);
            if let Some(d) = dim {
                walk_expr_mut(d, rewrite);
            }
        }
        ExprKind::ArrayBound { array, dim, .. } => {
            walk_expr_mut(array, rewrite);
            walk_expr_mut(dim, rewrite);
        }
        ExprKind::ArrayReshape { array, shape } => {
            walk_expr_mut(array, rewrite);
            walk_expr_mut(shape, rewrite);
        }
        ExprKind::DerivedRef { base, .. } => walk_expr_mut(base, rewrite),
        ExprKind::ImpliedDoLoop { element, start, end, step, .. } => {
            walk_expr_mut(element, rewrite);
            walk_expr_mut(start, rewrite);
            walk_expr_mut(end, rewrite);
            if let Some(s) = step {
                walk_expr_mut(s, rewrite);
            }
        }
    }
}

/// Applies `rewrite` to every `Expr` that appears directly or indirectly in
/// `stmt` (its own expression fields, and -- via [`walk_stmts_mut`] at the
/// call site -- every nested statement's).
pub fn walk_stmt_exprs_mut(stmt: &mut Stmt, rewrite: &mut impl FnMut(&mut Expr)) {
    match &mut stmt.kind {
        StmtKind::Assignment { target, value } => {
            walk_expr_mut(target, rewrite);
            walk_expr_mut(value, rewrite);
        }
        StmtKind::If { cond, .. } | StmtKind::WhileLoop { cond, .. } => walk_expr_mut(cond, rewrite),
        StmtKind::DoLoop { head, .. } | StmtKind::DoConcurrentLoop { head, .. } => {
            walk_expr_mut(&mut head.start, rewrite);
            walk_expr_mut(&mut head.end, rewrite);
            if let Some(step) = &mut head.step {
                walk_expr_mut(step, rewrite);
            }
        }
        StmtKind::Select { test, arms, .. } => {
            walk_expr_mut(test, rewrite);
            for arm in arms.iter_mut() {
                for pattern in &mut arm.patterns {
                    match pattern {
                        crate::asr::SelectPattern::Value(e) => walk_expr_mut(e, rewrite),
                        crate::asr::SelectPattern::Range(lo, hi) => {
                            walk_expr_mut(lo, rewrite);
                            walk_expr_mut(hi, rewrite);
                        }
                    }
                }
            }
        }
        StmtKind::SubroutineCall { args, .. } | StmtKind::Print { args } | StmtKind::Allocate(args) | StmtKind::Deallocate(args) => {
            for a in args.iter_mut() {
                walk_expr_mut(a, rewrite);
            }
        }
        StmtKind::Stop { code } | StmtKind::ErrorStop { code } => {
            if let Some(c) = code {
                walk_expr_mut(c, rewrite);
            }
        }
        StmtKind::Assert { cond, message } => {
            walk_expr_mut(cond, rewrite);
            if let Some(m) = message {
                walk_expr_mut(m, rewrite);
            }
        }
        StmtKind::Return | StmtKind::Exit | StmtKind::Cycle | StmtKind::GoTo(_) | StmtKind::GoToTarget(_) => {}
    }
}

/// Applies `f` to every statement body owned directly by a symbol
/// (`Program`/`Subroutine`/`Function`), plus `unit.orphan_items` (passed with
/// owner `None`, since top-level orphan statements belong to no symbol).
/// Every pass that operates on whole bodies (rather than within one
/// already-known body) iterates through this helper, so adding a new kind of
/// body-owning symbol only ever requires a change here.
pub fn for_each_body_mut(unit: &mut TranslationUnit, mut f: impl FnMut(Option<SymbolId>, &mut Vec<Stmt>)) {
    let ids: Vec<SymbolId> = unit.arena.symbols.iter().map(|(id, _)| id).collect();
    for id in ids {
        match unit.arena.symbols.get_mut(id) {
            Symbol::Program(p) => f(Some(id), &mut p.body),
            Symbol::Subroutine(s) => f(Some(id), &mut s.body),
            Symbol::Function(func) => f(Some(id), &mut func.body),
            _ => {}
        }
    }
    f(None, &mut unit.orphan_items);
}

/// Runs the fixed pass pipeline (§5): array-op lowering, implied-do
/// expansion, class-constructor rewriting, select-case lowering, do-loop
/// lowering, FMA recognition, then unused-function elimination. Verifies
/// after lowering and, if `options.verify_every_pass`, after every pass.
pub fn run_pipeline(unit: &mut TranslationUnit, options: &CompileOptions, observer: &mut dyn PassObserver) -> Result<(), CoreError> {
    crate::verify::verify(unit)?;

    wrap_global::run(unit, observer);

    let passes: [(&'static str, fn(&mut TranslationUnit, &mut dyn PassObserver)); 2] =
        [("array_op", array_op::run), ("implied_do", implied_do::run)];
    for (name, pass) in passes {
        let _span = tracing::debug_span!("pass", name).entered();
        observer.on_pass_start(name);
        pass(unit, observer);
        observer.on_pass_end(name);
        if options.verify_every_pass {
            crate::verify::verify(unit)?;
        }
    }

    {
        let _span = tracing::debug_span!("pass", name = "class_constructor").entered();
        observer.on_pass_start("class_constructor");
        class_constructor::run(unit, observer)?;
        observer.on_pass_end("class_constructor");
        if options.verify_every_pass {
            crate::verify::verify(unit)?;
        }
    }

    let passes: [(&'static str, fn(&mut TranslationUnit, &mut dyn PassObserver)); 2] =
        [("select_case", select_case::run), ("do_loops", do_loops::run)];
    for (name, pass) in passes {
        let _span = tracing::debug_span!("pass", name).entered();
        observer.on_pass_start(name);
        pass(unit, observer);
        observer.on_pass_end(name);
        if options.verify_every_pass {
            crate::verify::verify(unit)?;
        }
    }

    {
        let _span = tracing::debug_span!("pass", name = "fma").entered();
        observer.on_pass_start("fma");
        fma::run(unit, observer);
        observer.on_pass_end("fma");
        if options.verify_every_pass {
            crate::verify::verify(unit)?;
        }
    }

    {
        let _span = tracing::debug_span!("pass", name = "unused_functions").entered();
        observer.on_pass_start("unused_functions");
        unused_functions::run(unit, observer);
        observer.on_pass_end("unused_functions");
    }

    crate::verify::verify(unit)?;
    Ok(())
}
