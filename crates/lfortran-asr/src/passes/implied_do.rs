//! Expands an implied-do array constructor (`[(i, i = 1, n)]`) into a fresh
//! fixed-size temporary array variable, filled element-by-element by a
//! `DoLoop` inserted immediately before the statement that uses it, with the
//! original `ArrayInitializer` replaced in place by a plain `Var` reference
//! to the temporary (§4.3.7). An `ArrayInitializer` can mix plain elements
//! and implied-do elements (`[1, (i, i = 1, n), 5]`); a running cursor
//! variable tracks the next fill position once any element's size is only
//! known at runtime. Nested implied-do loops (an `ImpliedDoLoop` whose
//! element is itself an `ImpliedDoLoop`, for multi-dimensional constructors)
//! expand outside-in into perfectly nested `DoLoop`s writing into one
//! temporary sized to the product of every nested trip count. Must run
//! before do-loop lowering (§4.3.3), since it emits `DoLoop` nodes for that
//! pass to lower.
use crate::asr::{Abi, Access, BinOpKind, DoLoopHead, Expr, ExprKind, Intent, Storage, Stmt, StmtKind, Symbol, SymbolId, Variable};
use crate::asr::TranslationUnit;
use crate::location::Span;
use crate::observer::PassObserver;
use crate::passes::walk_stmt_exprs_mut;
use crate::symbol_table::SymbolTableId;
use crate::types::{Dimension, Dimensions, Type};

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

fn rewrite_block(unit: &mut TranslationUnit, table: SymbolTableId, owner: Option<SymbolId>, body: &mut Vec<Stmt>, observer: &mut dyn PassObserver) {
    let mut i = 0;
    while i < body.len() {
        let mut prelude = Vec::new();
        let mut expanded = false;
        {
            let stmt = &mut body[i];
            walk_stmt_exprs_mut(stmt, &mut |expr| {
                if expand_array_initializer(unit, table, expr, &mut prelude) {
                    expanded = true;
                }
            });
        }
        if expanded {
            if let Some(owner) = owner {
                tracing::trace!(?owner, "expanded an implied-do array constructor into a do loop filling a temporary");
                observer.on_rewrite("implied_do", owner, "expanded an implied-do array constructor into a do loop filling a temporary");
            }
            let n = prelude.len();
            for (k, stmt) in prelude.into_iter().enumerate() {
                body.insert(i + k, stmt);
            }
            i += n;
        }
        match &mut body[i].kind {
            StmtKind::If { then_body, else_body, .. } => {
                rewrite_block(unit, table, owner, then_body, observer);
                rewrite_block(unit, table, owner, else_body, observer);
            }
            StmtKind::WhileLoop { body: inner, .. } | StmtKind::DoLoop { body: inner, .. } | StmtKind::DoConcurrentLoop { body: inner, .. } => {
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

/// One level of a (possibly nested) implied-do loop, with its trip count
/// precomputed once so the fill statements and the temporary's declared
/// length share the same expression tree.
struct Level {
    var: SymbolId,
    start: Expr,
    end: Expr,
    step: Option<Expr>,
    trip_count: Expr,
}

fn int_ty() -> Type {
    Type::Integer(4, Dimensions::new())
}

fn trip_count(start: &Expr, end: &Expr, step: Option<&Expr>, span: Span) -> Expr {
    let one = Expr::new(ExprKind::ConstantInteger(1), int_ty(), span);
    let diff = Expr::new(ExprKind::BinOp(BinOpKind::Sub, Box::new(end.clone()), Box::new(start.clone())), int_ty(), span);
    let step_expr = step.cloned().unwrap_or_else(|| one.clone());
    let divided = Expr::new(ExprKind::BinOp(BinOpKind::Div, Box::new(diff), Box::new(step_expr)), int_ty(), span);
    Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(divided), Box::new(one)), int_ty(), span)
}

/// Unwraps a chain of nested `ImpliedDoLoop` nodes into its levels
/// (outermost first) plus the innermost scalar element expression.
fn collect_levels(expr: Expr) -> (Vec<Level>, Expr) {
    if let ExprKind::ImpliedDoLoop { element, var, start, end, step } = expr.kind {
        let (mut levels, scalar) = collect_levels(*element);
        let trip = trip_count(&start, &end, step.as_deref(), expr.span);
        levels.insert(0, Level { var, start: *start, end: *end, step: step.map(|s| *s), trip_count: trip });
        (levels, scalar)
    } else {
        (Vec::new(), expr)
    }
}

fn product(exprs: &[Expr], span: Span) -> Expr {
    exprs
        .iter()
        .cloned()
        .reduce(|acc, next| Expr::new(ExprKind::BinOp(BinOpKind::Mul, Box::new(acc), Box::new(next)), int_ty(), span))
        .unwrap_or_else(|| Expr::new(ExprKind::ConstantInteger(1), int_ty(), span))
}

/// Builds the nested `DoLoop`s (or, with no levels, the single assignment)
/// that fill `temp[base_offset ..]` with one implied-do element's values,
/// `base_offset` being the 1-based slot the first value lands on.
fn build_fill(levels: &[Level], level_idx: usize, position_so_far: Option<Expr>, base_offset: &Expr, temp: SymbolId, elem_ty: &Type, scalar: &Expr, span: Span) -> Stmt {
    if level_idx == levels.len() {
        let relative = position_so_far.unwrap_or_else(|| Expr::new(ExprKind::ConstantInteger(0), int_ty(), span));
        let index = Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(base_offset.clone()), Box::new(relative)), int_ty(), span);
        let target = Expr::new(
            ExprKind::ArrayRef { base: Box::new(Expr::new(ExprKind::Var(temp), elem_ty.clone(), span)), indices: vec![index] },
            elem_ty.as_scalar(),
            span,
        );
        return Stmt::new(StmtKind::Assignment { target, value: scalar.clone() }, span);
    }

    let level = &levels[level_idx];
    let idx_ref = Expr::new(ExprKind::Var(level.var), int_ty(), span);
    let relative_here = Expr::new(ExprKind::BinOp(BinOpKind::Sub, Box::new(idx_ref), Box::new(level.start.clone())), int_ty(), span);
    let position = match position_so_far {
        None => relative_here,
        Some(outer) => {
            let scaled = Expr::new(ExprKind::BinOp(BinOpKind::Mul, Box::new(outer), Box::new(level.trip_count.clone())), int_ty(), span);
            Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(scaled), Box::new(relative_here)), int_ty(), span)
        }
    };
    let inner = build_fill(levels, level_idx + 1, Some(position), base_offset, temp, elem_ty, scalar, span);
    Stmt::new(
        StmtKind::DoLoop {
            head: DoLoopHead { var: level.var, start: level.start.clone(), end: level.end.clone(), step: level.step.clone() },
            body: vec![inner],
        },
        span,
    )
}

fn array_type_with_length(elem_ty: &Type, length: Expr, span: Span) -> Type {
    let mut dims = Dimensions::new();
    dims.push(Dimension::fixed(Expr::new(ExprKind::ConstantInteger(1), int_ty(), span), length));
    match elem_ty {
        Type::Integer(k, _) => Type::Integer(*k, dims),
        Type::Real(k, _) => Type::Real(*k, dims),
        Type::Complex(k, _) => Type::Complex(*k, dims),
        Type::Logical(k, _) => Type::Logical(*k, dims),
        Type::Character(k, _) => Type::Character(*k, dims),
        Type::Derived(sym, _) => Type::Derived(*sym, dims),
        other => other.clone(),
    }
}

/// If `expr` is an `ArrayInitializer` with at least one implied-do element,
/// replaces it in place with a `Var` reference to a freshly materialized
/// temporary and appends the fill statements to `prelude`. Returns whether
/// an expansion happened.
fn expand_array_initializer(unit: &mut TranslationUnit, table: SymbolTableId, expr: &mut Expr, prelude: &mut Vec<Stmt>) -> bool {
    let span = expr.span;
    let elem_ty = expr.ty.as_scalar();
    let ExprKind::ArrayInitializer(elements) = &mut expr.kind else { return false };
    if !elements.iter().any(|e| matches!(e.kind, ExprKind::ImpliedDoLoop { .. })) {
        return false;
    }
    let elements = std::mem::take(elements);

    let pieces: Vec<(Vec<Level>, Expr)> = elements.into_iter().map(collect_levels).collect();
    let sizes: Vec<Expr> = pieces
        .iter()
        .map(|(levels, _)| if levels.is_empty() { Expr::new(ExprKind::ConstantInteger(1), int_ty(), span) } else { product(&levels.iter().map(|l| l.trip_count.clone()).collect::<Vec<_>>(), span) })
        .collect();
    let total_size = sizes.iter().cloned().reduce(|acc, s| Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(acc), Box::new(s)), int_ty(), span)).expect("an ArrayInitializer always has at least one element");

    let temp = unit.arena.symbols.alloc(Symbol::Variable(Variable {
        name: format!("__implied_do_tmp{}", table.index()),
        parent_table: table,
        intent: Intent::Local,
        storage: Storage::Default,
        ty: array_type_with_length(&elem_ty, total_size, span),
        initializer: None,
        abi: Abi::Source,
        access: Access::Private,
    }));

    let one = Expr::new(ExprKind::ConstantInteger(1), int_ty(), span);
    if pieces.len() == 1 {
        let (levels, scalar) = &pieces[0];
        prelude.push(build_fill(levels, 0, None, &one, temp, &elem_ty, scalar, span));
    } else {
        let cursor = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: format!("__implied_do_cursor{}", table.index()),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: int_ty(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Private,
        }));
        prelude.push(Stmt::new(StmtKind::Assignment { target: Expr::new(ExprKind::Var(cursor), int_ty(), span), value: one }, span));
        let cursor_ref = Expr::new(ExprKind::Var(cursor), int_ty(), span);
        for (k, (levels, scalar)) in pieces.iter().enumerate() {
            prelude.push(build_fill(levels, 0, None, &cursor_ref, temp, &elem_ty, scalar, span));
            if k + 1 < pieces.len() {
                prelude.push(Stmt::new(
                    StmtKind::Assignment {
                        target: cursor_ref.clone(),
                        value: Expr::new(ExprKind::BinOp(BinOpKind::Add, Box::new(cursor_ref.clone()), Box::new(sizes[k].clone())), int_ty(), span),
                    },
                    span,
                ));
            }
        }
    }

    expr.kind = ExprKind::Var(temp);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Abi, Access, Intent, ProgramSym, Storage, Symbol, Variable};
    use crate::observer::NoopPassObserver;
    use crate::symbol_table::SymbolTable;
    use crate::types::{Dimension, Dimensions};

    #[test]
    fn a_single_implied_do_constructor_expands_into_a_temp_and_a_do_loop() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let mut dims = Dimensions::new();
        dims.push(Dimension::assumed_shape());
        let array_ty = Type::Integer(4, dims);
        let scalar_ty = Type::Integer(4, Dimensions::new());

        let target = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "a".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        let i = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "i".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: scalar_ty.clone(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));

        let span = Span::new(0, 1);
        let int = |n| Expr::new(ExprKind::ConstantInteger(n), scalar_ty.clone(), span);
        let implied = Expr::new(
            ExprKind::ImpliedDoLoop {
                element: Box::new(Expr::new(ExprKind::Var(i), scalar_ty.clone(), span)),
                var: i,
                start: Box::new(int(1)),
                end: Box::new(int(5)),
                step: None,
            },
            array_ty.clone(),
            span,
        );
        let assign = Stmt::new(
            StmtKind::Assignment {
                target: Expr::new(ExprKind::Var(target), array_ty.clone(), span),
                value: Expr::new(ExprKind::ArrayInitializer(vec![implied]), array_ty, span),
            },
            span,
        );

        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym { name: "main".to_owned(), table, body: vec![assign] }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        // [do loop filling the temp, assignment of target = temp]
        assert_eq!(p.body.len(), 2);
        assert!(matches!(p.body[0].kind, StmtKind::DoLoop { .. }));
        let StmtKind::Assignment { value, .. } = &p.body[1].kind else { panic!("expected the original assignment") };
        assert!(matches!(value.kind, ExprKind::Var(_)), "the ArrayInitializer is replaced by a Var reference to the temp");
    }

    #[test]
    fn a_mixed_initializer_uses_a_running_cursor() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let mut dims = Dimensions::new();
        dims.push(Dimension::assumed_shape());
        let array_ty = Type::Integer(4, dims);
        let scalar_ty = Type::Integer(4, Dimensions::new());

        let target = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "a".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: array_ty.clone(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        let i = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "i".to_owned(),
            parent_table: table,
            intent: Intent::Local,
            storage: Storage::Default,
            ty: scalar_ty.clone(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));

        let span = Span::new(0, 1);
        let int = |n| Expr::new(ExprKind::ConstantInteger(n), scalar_ty.clone(), span);
        let implied = Expr::new(
            ExprKind::ImpliedDoLoop {
                element: Box::new(Expr::new(ExprKind::Var(i), scalar_ty.clone(), span)),
                var: i,
                start: Box::new(int(1)),
                end: Box::new(int(3)),
                step: None,
            },
            array_ty.clone(),
            span,
        );
        let assign = Stmt::new(
            StmtKind::Assignment {
                target: Expr::new(ExprKind::Var(target), array_ty.clone(), span),
                value: Expr::new(ExprKind::ArrayInitializer(vec![int(0), implied, int(9)]), array_ty, span),
            },
            span,
        );

        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym { name: "main".to_owned(), table, body: vec![assign] }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        let Symbol::Program(p) = unit.arena.symbols.get(program) else { panic!() };
        // cursor init, fill(0), advance, fill(implied do loop), advance, fill(9), final assignment
        assert!(p.body.len() > 4, "a mixed initializer needs cursor bookkeeping between elements: {:?}", p.body);
        assert!(matches!(p.body.last().unwrap().kind, StmtKind::Assignment { .. }));
    }
}
