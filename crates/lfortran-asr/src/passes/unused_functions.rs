//! Drops a module-level `Subroutine`/`Function` that nothing calls (§4.3.7).
//!
//! A procedure exposed across a compilation-unit boundary (`bind_name`
//! carries an interoperable C name) is always kept, since a caller outside
//! this translation unit may reach it with no in-unit call site to witness.
//! Everything else is kept only if the call graph, walked from every
//! `Program` body, reaches it.
use std::collections::HashSet;

use crate::asr::{Stmt, StmtKind, Expr, ExprKind, Symbol, SymbolId};
use crate::observer::PassObserver;
use crate::asr::TranslationUnit;

pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    let reachable = reachable_procedures(unit);

    let mut to_unbind = Vec::new();
    for (id, sym) in unit.arena.symbols.iter() {
        let keep = match sym {
            Symbol::Subroutine(s) => s.bind_name.is_some() || reachable.contains(&id),
            Symbol::Function(f) => f.bind_name.is_some() || reachable.contains(&id),
            _ => true,
        };
        if !keep {
            to_unbind.push((id, sym.name().to_owned()));
        }
    }

    for (id, name) in to_unbind {
        if unbind_everywhere(unit, &name, id) {
            tracing::trace!(owner = ?id, "removed an unreachable procedure's table binding");
            observer.on_rewrite("unused_functions", id, "removed an unreachable procedure's table binding");
        }
    }
}

fn reachable_procedures(unit: &TranslationUnit) -> HashSet<SymbolId> {
    let mut seen = HashSet::new();
    let mut stack: Vec<SymbolId> = unit
        .arena
        .symbols
        .iter()
        .filter_map(|(id, sym)| matches!(sym, Symbol::Program(_)).then_some(id))
        .collect();

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let body: &[Stmt] = match unit.arena.symbols.get(id) {
            Symbol::Program(p) => &p.body,
            Symbol::Subroutine(s) => &s.body,
            Symbol::Function(f) => &f.body,
            _ => &[],
        };
        for stmt in body {
            collect_calls(unit, stmt, &mut stack);
        }
    }
    seen
}

fn collect_calls(unit: &TranslationUnit, stmt: &Stmt, stack: &mut Vec<SymbolId>) {
    match &stmt.kind {
        StmtKind::Assignment { target, value } => {
            collect_calls_expr(unit, target, stack);
            collect_calls_expr(unit, value, stack);
        }
        StmtKind::If { cond, then_body, else_body } => {
            collect_calls_expr(unit, cond, stack);
            then_body.iter().for_each(|s| collect_calls(unit, s, stack));
            else_body.iter().for_each(|s| collect_calls(unit, s, stack));
        }
        StmtKind::WhileLoop { cond, body } => {
            collect_calls_expr(unit, cond, stack);
            body.iter().for_each(|s| collect_calls(unit, s, stack));
        }
        StmtKind::DoLoop { head, body } | StmtKind::DoConcurrentLoop { head, body } => {
            collect_calls_expr(unit, &head.start, stack);
            collect_calls_expr(unit, &head.end, stack);
            if let Some(step) = &head.step {
                collect_calls_expr(unit, step, stack);
            }
            body.iter().for_each(|s| collect_calls(unit, s, stack));
        }
        StmtKind::Select { test, arms, default } => {
            collect_calls_expr(unit, test, stack);
            for arm in arms {
                for pattern in &arm.patterns {
                    match pattern {
                        crate::asr::SelectPattern::Value(e) => collect_calls_expr(unit, e, stack),
                        crate::asr::SelectPattern::Range(lo, hi) => {
                            collect_calls_expr(unit, lo, stack);
                            collect_calls_expr(unit, hi, stack);
                        }
                    }
                }
                arm.body.iter().for_each(|s| collect_calls(unit, s, stack));
            }
            default.iter().for_each(|s| collect_calls(unit, s, stack));
        }
        StmtKind::SubroutineCall { callee, args } => {
            if let Some(target) = unit.resolve_procedure(*callee) {
                stack.push(target);
            }
            args.iter().for_each(|a| collect_calls_expr(unit, a, stack));
        }
        StmtKind::Print { args } | StmtKind::Allocate(args) | StmtKind::Deallocate(args) => {
            args.iter().for_each(|a| collect_calls_expr(unit, a, stack));
        }
        StmtKind::Stop { code } | StmtKind::ErrorStop { code } => {
            if let Some(c) = code {
                collect_calls_expr(unit, c, stack);
            }
        }
        StmtKind::Assert { cond, message } => {
            collect_calls_expr(unit, cond, stack);
            if let Some(m) = message {
                collect_calls_expr(unit, m, stack);
            }
        }
        StmtKind::Return | StmtKind::Exit | StmtKind::Cycle | StmtKind::GoTo(_) | StmtKind::GoToTarget(_) => {}
    }
}

fn collect_calls_expr(unit: &TranslationUnit, expr: &Expr, stack: &mut Vec<SymbolId>) {
    match &expr.kind {
        ExprKind::FunctionCall { callee, args } => {
            if let Some(target) = unit.resolve_procedure(*callee) {
                stack.push(target);
            }
            args.iter().for_each(|a| collect_calls_expr(unit, a, stack));
        }
        ExprKind::BinOp(_, l, r) | ExprKind::Compare(_, l, r) | ExprKind::StrOp(_, l, r) => {
            collect_calls_expr(unit, l, stack);
            collect_calls_expr(unit, r, stack);
        }
        ExprKind::FusedMultiplyAdd(a, b, c) => {
            collect_calls_expr(unit, a, stack);
            collect_calls_expr(unit, b, stack);
            collect_calls_expr(unit, c, stack);
        }
        ExprKind::UnaryOp(_, e) | ExprKind::ImplicitCast { operand: e, .. } | ExprKind::ExplicitCast { operand: e, .. } => {
            collect_calls_expr(unit, e, stack);
        }
        ExprKind::BoolOp(_, operands) | ExprKind::ArrayInitializer(operands) => {
            operands.iter().for_each(|o| collect_calls_expr(unit, o, stack));
        }
        ExprKind::ArrayRef { base, indices } => {
            collect_calls_expr(unit, base, stack);
            indices.iter().for_each(|i| collect_calls_expr(unit, i, stack));
        }
        ExprKind::ArraySize { array, dim } => {
            collect_calls_expr(unit, array, stack);
            if let Some(d) = dim {
                collect_calls_expr(unit, d, stack);
            }
        }
        ExprKind::ArrayBound { array, dim, .. } => {
            collect_calls_expr(unit, array, stack);
            collect_calls_expr(unit, dim, stack);
        }
        ExprKind::ArrayReshape { array, shape } => {
            collect_calls_expr(unit, array, stack);
            collect_calls_expr(unit, shape, stack);
        }
        ExprKind::DerivedRef { base, .. } => collect_calls_expr(unit, base, stack),
        ExprKind::ImpliedDoLoop { element, start, end, step, .. } => {
            collect_calls_expr(unit, element, stack);
            collect_calls_expr(unit, start, stack);
            collect_calls_expr(unit, end, stack);
            if let Some(s) = step {
                collect_calls_expr(unit, s, stack);
            }
        }
        ExprKind::Var(_)
        | ExprKind::Str(_)
        | ExprKind::ConstantInteger(_)
        | ExprKind::ConstantReal(_)
        | ExprKind::ConstantLogical(_)
        | ExprKind::ConstantComplex(..) => {}
    }
}

/// Removes every table binding pointing at `target` named `name`
/// (case-insensitively). A procedure is normally bound in exactly one
/// table (its own module's, or the global table for a top-level one); this
/// walks every table rather than assuming that to stay correct if a future
/// `use`-renaming scheme ever binds the same id under more than one name.
fn unbind_everywhere(unit: &mut TranslationUnit, name: &str, target: SymbolId) -> bool {
    let mut removed_any = false;
    let table_ids: Vec<_> = unit.arena.tables.iter().map(|(id, _)| id).collect();
    for table_id in table_ids {
        let table = unit.arena.tables.get_mut(table_id);
        if table.get_local(name) == Some(target) {
            table.unbind(name);
            removed_any = true;
        }
    }
    removed_any
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Abi, ProgramSym, StmtKind, SubroutineSym};
    use crate::location::Span;
    use crate::observer::NoopPassObserver;
    use crate::symbol_table::SymbolTable;

    #[test]
    fn an_uncalled_private_subroutine_is_unbound() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let dead = unit.arena.symbols.alloc(Symbol::Subroutine(SubroutineSym {
            name: "dead".to_owned(),
            table,
            args: Vec::new(),
            body: Vec::new(),
            bind_name: None,
            external: None,
            abi: Abi::Source,
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("dead", dead);
        let prog_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: prog_table,
            body: vec![Stmt::new(StmtKind::Return, Span::new(0, 1))],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        assert!(!unit.arena.tables.get(unit.global_table).contains_local("dead"));
    }

    #[test]
    fn a_called_subroutine_survives() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let helper = unit.arena.symbols.alloc(Symbol::Subroutine(SubroutineSym {
            name: "helper".to_owned(),
            table,
            args: Vec::new(),
            body: Vec::new(),
            bind_name: None,
            external: None,
            abi: Abi::Source,
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("helper", helper);
        let prog_table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
            name: "main".to_owned(),
            table: prog_table,
            body: vec![Stmt::new(StmtKind::SubroutineCall { callee: helper, args: Vec::new() }, Span::new(0, 1))],
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("main", program);

        run(&mut unit, &mut NoopPassObserver);

        assert!(unit.arena.tables.get(unit.global_table).contains_local("helper"));
    }

    #[test]
    fn a_bind_c_subroutine_survives_even_if_uncalled() {
        let mut unit = TranslationUnit::new();
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let exported = unit.arena.symbols.alloc(Symbol::Subroutine(SubroutineSym {
            name: "exported".to_owned(),
            table,
            args: Vec::new(),
            body: Vec::new(),
            bind_name: Some("exported_c".to_owned()),
            external: None,
            abi: Abi::BindC,
        }));
        unit.arena.tables.get_mut(unit.global_table).bind("exported", exported);

        run(&mut unit, &mut NoopPassObserver);

        assert!(unit.arena.tables.get(unit.global_table).contains_local("exported"));
    }
}
