//! Wraps top-level orphan statements into a synthetic `Program` symbol
//! (§4.3.6), the interactive-evaluator flow: a REPL session that never wrote
//! an explicit `program` block still ends up with one procedure to emit.
use crate::asr::{ProgramSym, Symbol, TranslationUnit};
use crate::observer::PassObserver;

const SYNTHETIC_PROGRAM_NAME: &str = "__main__";

/// If `unit.orphan_items` is non-empty and no program exists yet, moves them
/// into a freshly allocated `Program` bound in the global table. Idempotent:
/// a second run finds `orphan_items` already empty and does nothing.
pub fn run(unit: &mut TranslationUnit, observer: &mut dyn PassObserver) {
    if unit.orphan_items.is_empty() {
        return;
    }
    if unit.arena.tables.get(unit.global_table).contains_local(SYNTHETIC_PROGRAM_NAME) {
        return;
    }

    let body = std::mem::take(&mut unit.orphan_items);
    let table = unit.global_table;
    let program = unit.arena.symbols.alloc(Symbol::Program(ProgramSym {
        name: SYNTHETIC_PROGRAM_NAME.to_owned(),
        table,
        body,
    }));
    unit.arena.tables.get_mut(unit.global_table).bind(SYNTHETIC_PROGRAM_NAME, program);
    tracing::trace!(owner = ?program, "wrapped top-level statements into a synthetic program");
    observer.on_rewrite("wrap_global", program, "wrapped top-level statements into a synthetic program");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::{Expr, ExprKind, Stmt, StmtKind};
    use crate::location::Span;
    use crate::observer::NoopPassObserver;
    use crate::types::{Dimensions, Type};

    #[test]
    fn orphan_statements_are_wrapped_into_a_program() {
        let mut unit = TranslationUnit::new();
        unit.orphan_items.push(Stmt::new(
            StmtKind::Print {
                args: vec![Expr::new(ExprKind::ConstantInteger(1), Type::Integer(4, Dimensions::new()), Span::new(0, 1))],
            },
            Span::new(0, 1),
        ));

        run(&mut unit, &mut NoopPassObserver);

        assert!(unit.orphan_items.is_empty());
        assert!(unit.arena.tables.get(unit.global_table).contains_local(SYNTHETIC_PROGRAM_NAME));
    }

    #[test]
    fn running_twice_is_a_noop_the_second_time() {
        let mut unit = TranslationUnit::new();
        unit.orphan_items.push(Stmt::new(StmtKind::Return, Span::new(0, 1)));
        run(&mut unit, &mut NoopPassObserver);
        let count_before = unit.arena.symbols.len();
        run(&mut unit, &mut NoopPassObserver);
        assert_eq!(unit.arena.symbols.len(), count_before);
    }

    #[test]
    fn an_empty_orphan_list_allocates_nothing() {
        let mut unit = TranslationUnit::new();
        run(&mut unit, &mut NoopPassObserver);
        assert!(unit.arena.symbols.is_empty());
    }
}
