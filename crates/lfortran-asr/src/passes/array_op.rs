//! Lowers a whole-array assignment (`a = b + c` where every operand is an
//! array) into an explicit element-at-a-time `do` loop (§4.3.1): later passes
//! and every emitter only ever need to understand scalar assignment inside a
//! loop, never an implicit elementwise array operation.
use crate::asr::{BoundKind, Expr, ExprKind, Stmt, StmtKind, Symbol, SymbolId};
use crate::asr::{DoLoopHead, Intent, Storage, Variable};
use crate::asr::TranslationUnit;
use crate::location::Span;
use crate::observer::PassObserver;
use crate::symbol_table::SymbolTableId;
use crate::types::Dimensions;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    let mut owners: Vec<Option<SymbolId>> = unit
        .arena
        .symbols
        .iter()
        .filter(|(_, s)| matches!(s, Symbol::Program(_) | Symbol::Subroutine(_) | Symbol::Function(_)))
        .map(|(id, _)| Some(id))
        .collect();
    owners.push(None);

    for owner in owners {
        let table = owner_table(unit, owner);
        let mut body = take_body(unit, owner);
        rewrite_block(unit, table, owner, &mut body, observer);
        put_body(unit, owner, body);
    }
}

/// Scope id to allocate the synthetic loop variable into: the table owned
/// by the enclosing procedure/program, or the global table for orphan
/// statements.
fn owner_table(unit: &TranslationUnit, owner: Option<SymbolId>) -> SymbolTableId {
    match owner {
        Some(id) => unit.arena.symbols.get(id).own_table().unwrap_or(unit.global_table),
        None => unit.global_table,
    }
}

fn take_body(unit: &mut TranslationUnit, owner: Option<SymbolId>) -> Vec<Stmt> {
    match owner {
        None => std::mem::take(&mut unit.orphan_items),
        Some(id) => match unit.arena.symbols.get_mut(id) {
            Symbol::Program(p) => std::mem::take(&mut p.body),
            Symbol::Subroutine(s) => std::mem::take(&mut s.body),
            Symbol::Function(f) => std::mem::take(&mut f.body),
            _ => Vec::new(),
        },
    }
}

fn put_body(unit: &mut TranslationUnit, owner: Option<SymbolId>, body: Vec<Stmt>) {
    match owner {
        None => unit.orphan_items = body,
        Some(id) => match unit.arena.symbols.get_mut(id) {
            Symbol::Program(p) => p.body = body,
            Symbol::Subroutine(s) => s.body = body,
            Symbol::Function(f) => f.body = body,
            _ => {}
        },
    }
}

fn rewrite_block(
    unit: &mut TranslationUnit,
    table: SymbolTableId,
    owner: Option<SymbolId>,
    body: &mut Vec<Stmt>,
    observer: &mut dyn PassObserver,
) {
    let mut i = 0;
    while i < body.len() {
        let is_whole_array_assignment = matches!(
            &body[i].kind,
            StmtKind::Assignment { target, value } if target.ty.is_array() && value.ty.is_array() && matches!(target.kind, ExprKind::Var(_))
        );
        if is_whole_array_assignment {
            let stmt = body.remove(i);
            let StmtKind::Assignment { target, value } = stmt.kind else { unreachable!() };
            let span = stmt.span;
            let loop_stmt = build_elementwise_loop(unit, table, target, value, span);
            tracing::trace!(?owner, "lowered a whole-array assignment into an element loop");
            if let Some(owner) = owner {
                observer.on_rewrite("array_op", owner, "lowered a whole-array assignment into an element loop");
            }
            body.insert(i, loop_stmt);
        }
        match &mut body[i].kind {
            StmtKind::If { then_body, else_body, .. } => {
                rewrite_block(unit, table, owner, then_body, observer);
                rewrite_block(unit, table, owner, else_body, observer);
            }
            StmtKind::WhileLoop { body: inner, .. }
            | StmtKind::DoLoop { body: inner, .. }
            | StmtKind::DoConcurrentLoop { body: inner, .. } => {
                rewrite_block(unit, table, owner, inner, observer);
            }
            StmtKind::Select { arms, default, .. } => {
                for arm in arms.iter_mut() {
                    rewrite_block(unit, table, owner, &mut arm.body, observer);
                }
                rewrite_block(unit, table, owner, default, observer);
            }
            _ => {}
        }
        i += 1;
    }
}

/// Builds one fresh loop-index variable and a perfectly nested `do` loop per
/// dimension of `target` (§4.3.1): rank `n`, `n` nested loops, innermost body
/// the single scalar assignment indexed by all `n` loop variables at once.
fn build_elementwise_loop(unit: &mut TranslationUnit, table: SymbolTableId, target: Expr, value: Expr, span: Span) -> Stmt {
    let elem_ty = target.ty.as_scalar();
    let int_ty = crate::types::Type::Integer(4, Dimensions::new());
    let n_dims = target.ty.n_dims();

    let mut index_vars = Vec::with_capacity(n_dims);
    let mut index_exprs = Vec::with_capacity(n_dims);
    for dim in 1..=n_dims {
        let index = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: format!("__array_op_i{dim}"),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: int_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Private,
        }));
        // Not bound into `table`'s name map: this is a compiler-synthesized
        // loop index with no surface-syntax name a later `use`/reference
        // could collide with, so no name binding is needed for it to
        // resolve correctly.
        index_vars.push(index);
        index_exprs.push(Expr::new(ExprKind::Var(index), int_ty.clone(), span));
    }

    let indexed_target = Expr::new(
        ExprKind::ArrayRef { base: Box::new(target.clone()), indices: index_exprs.clone() },
        elem_ty.clone(),
        span,
    );
    let indexed_value = index_operand(value, &index_exprs, &elem_ty, span);
    let assign = Stmt::new(StmtKind::Assignment { target: indexed_target, value: indexed_value }, span);

    let mut body = vec![assign];
    for dim in (1..=n_dims).rev() {
        let dim_const = Expr::new(ExprKind::ConstantInteger(dim as i64), int_ty.clone(), span);
        let lower = Expr::new(
            ExprKind::ArrayBound { array: Box::new(target.clone()), dim: Box::new(dim_const.clone()), bound: BoundKind::Lower },
            int_ty.clone(),
            span,
        );
        let upper = Expr::new(
            ExprKind::ArrayBound { array: Box::new(target.clone()), dim: Box::new(dim_const), bound: BoundKind::Upper },
            int_ty.clone(),
            span,
        );
        body = vec![Stmt::new(
            StmtKind::DoLoop {
                head: DoLoopHead { var: index_vars[dim - 1], start: lower, end: upper, step: None },
                body,
            },
            span,
        )];
    }
    body.into_iter().next().expect("at least one dimension, since this is only called for an array-typed target")
}

/// Applies every loop index to every array-typed leaf of `value` (broadcast
/// semantics: a scalar operand in a mixed scalar/array expression is left
/// unindexed).
fn index_operand(value: Expr, index_exprs: &[Expr], elem_ty: &crate::types::Type, span: Span) -> Expr {
    if !value.ty.is_array() {
        return value;
    }
    if let ExprKind::Var(_) = &value.kind {
        return Expr::new(
            ExprKind::ArrayRef { base: Box::new(value), indices: index_exprs.to_vec() },
            elem_ty.clone(),
            span,
        );
    }
    match value.kind {
        ExprKind::BinOp(op, l, r) => Expr::new(
            ExprKind::BinOp(
                op,
                Box::new(index_operand(*l, index_exprs, elem_ty, span)),
                Box::new(index_operand(*r, index_exprs, elem_ty, span)),
            ),
            elem_ty.clone(),
            span,
        ),
        ExprKind::UnaryOp(op, inner) => Expr::new(ExprKind::UnaryOp(op, Box::new(index_operand(*inner, index_exprs, elem_ty, span))), elem_ty.clone(), span),
        other => Expr::new(other, value.ty, span),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{BinOpKind, ProgramSym};
    use crate::observer::NoopPassObserver;
    use crate::types::{Dimension, Type};

    #[test]
    fn a_whole_array_add_assignment_becomes_a_do_loop() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(crate::symbol_table::SymbolTable::new(Some(unit.global_table), None));
        let mut dims = Dimensions::new();
        dims.push(Dimension::assumed_shape());
        let array_ty = Type::Real(4, dims);

        let a = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "a".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }));
        let b = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "b".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }));
        let c = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "c".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }));

        let span = Span::new(0, 1);
        let assign = Stmt::new(
            StmtKind::Assignment {
                target: Expr::new(ExprKind::Var(a), array_ty.clone(), span),
                value: Expr::new(
                    ExprKind::BinOp(
                        BinOpKind::Add,
                        Box::new(Expr::new(ExprKind::Var(b), array_ty.clone(), span)),
                        Box::new(Expr::new(ExprKind::Var(c), array_ty.clone(), span)),
                    ),
                    array_ty,
                    span,
                ),
            },
            span,
        );

        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table,
            body: vec![assign],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        assert_eq!(p.body.len(), 1);
        assert!(matches!(p.body[0].kind, StmtKind::DoLoop { .. }));
    }

    #[test]
    fn a_rank_two_array_assignment_nests_two_do_loops() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(crate::symbol_table::SymbolTable::new(Some(unit.global_table), None));
        let mut dims = Dimensions::new();
        dims.push(Dimension::assumed_shape());
        dims.push(Dimension::assumed_shape());
        let array_ty = Type::Real(4, dims);

        let a = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "a".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }));
        let b = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "b".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: crate::asr::Abi::Source,
            access: crate::asr::Access::Public,
        }));

        let span = Span::new(0, 1);
        let assign = Stmt::new(
            StmtKind::Assignment {
                target: Expr::new(ExprKind::Var(a), array_ty.clone(), span),
                value: Expr::new(ExprKind::Var(b), array_ty, span),
            },
            span,
        );

        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table,
            body: vec![assign],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        assert_eq!(p.body.len(), 1);
        let StmtKind::DoLoop { body: outer_body, .. } = &p.body[0].kind else { panic!("expected an outer do loop") };
        assert_eq!(outer_body.len(), 1);
        let StmtKind::DoLoop { body: inner_body, .. } = &outer_body[0].kind else { panic!("expected a nested inner do loop") };
        assert_eq!(inner_body.len(), 1);
        let StmtKind::Assignment { target, .. } = &inner_body[0].kind else { panic!("expected the elementwise assignment") };
        let ExprKind::ArrayRef { indices, .. } = &target.kind else { panic!("expected an indexed array reference") };
        assert_eq!(indices.len(), 2, "a rank-2 array needs exactly two loop indices");
    }
}
