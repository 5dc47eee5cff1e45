//! The ASR verifier (§4.4): one walk checking every structural invariant
//! (§3.2). A failure here is always a compiler bug, never a user mistake --
//! by the time a `TranslationUnit` reaches `verify`, `lowering` has already
//! rejected every ill-formed *source* program.
use crate::asr::{Expr, ExprKind, Stmt, StmtKind, Symbol, SymbolId, TranslationUnit};
use crate::error::VerifyError;
use crate::symbol_table::SymbolTableId;

/// Walks the whole translation unit, checking every invariant in §3.2 plus
/// the internal consistency checks (parent-pointer consistency, variable
/// binding consistency, `Var` resolution) listed alongside them.
pub fn verify(unit: &TranslationUnit) -> Result<(), VerifyError> {
    if unit.arena.tables.get(unit.global_table).parent.is_some() {
        return Err(VerifyError::new("the global symbol table must have no parent"));
    }

    for (id, table) in unit.arena.tables.iter() {
        if let Some(parent) = table.parent {
            if parent == id {
                return Err(VerifyError::new("a symbol table cannot be its own parent"));
            }
        }
        for (name, sym) in table.local_symbols() {
            verify_binding_consistency(unit, id, name, sym)?;
        }
    }

    for (id, _) in unit.arena.symbols.iter() {
        verify_symbol(unit, id)?;
    }

    for stmt in &unit.orphan_items {
        verify_stmt(unit, stmt)?;
    }

    Ok(())
}

fn verify_binding_consistency(unit: &TranslationUnit, table_id: SymbolTableId, name: &str, sym: SymbolId) -> Result<(), VerifyError> {
    let resolved = unit.arena.symbols.get(sym);
    if resolved.name().to_ascii_lowercase() != name {
        return Err(VerifyError::new(format!(
            "symbol table entry `{name}` in table {table_id:?} points at a symbol named `{}`",
            resolved.name()
        )));
    }
    let parent_table = match resolved {
        Symbol::Variable(v) => Some(v.parent_table),
        Symbol::GenericProcedure(g) => Some(g.parent_table),
        Symbol::ExternalSymbol(e) => Some(e.parent_table),
        _ => None,
    };
    if let Some(parent_table) = parent_table {
        if parent_table != table_id {
            return Err(VerifyError::new(format!(
                "`{name}` is bound in table {table_id:?} but its parent_table points at {parent_table:?}"
            )));
        }
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn verify_symbol(unit: &TranslationUnit, id: SymbolId) -> Result<(), VerifyError> {
    match unit.arena.symbols.get(id) {
        Symbol::Shell { name, .. } => Err(VerifyError::new(format!("unresolved deserialization shell for `{name}` survived past load"))),
        Symbol::Program(p) => verify_body(unit, &p.body),
        Symbol::Module(_) => Ok(()),
        Symbol::Subroutine(s) => {
            verify_args(unit, &s.args)?;
            verify_body(unit, &s.body)
        }
        Symbol::Function(f) => {
            verify_args(unit, &f.args)?;
            match unit.arena.symbols.get(f.return_var) {
                Symbol::Variable(v) if v.intent == crate::asr::Intent::ReturnVar => {}
                _ => return Err(VerifyError::new(format!("function `{}`'s return_var is not a ReturnVar Variable", f.name))),
            }
            verify_body(unit, &f.body)
        }
        Symbol::GenericProcedure(g) => {
            if g.procs.is_empty() {
                return Err(VerifyError::new(format!("generic procedure `{}` has no candidates", g.name)));
            }
            for &proc in &g.procs {
                if unit.resolve_procedure(proc).is_none() {
                    return Err(VerifyError::new(format!(
                        "generic procedure `{}` names a candidate that isn't a procedure",
                        g.name
                    )));
                }
            }
            Ok(())
        }
        Symbol::DerivedType(_) => Ok(()),
        Symbol::Variable(v) => v.initializer.as_ref().map_or(Ok(()), |init| verify_expr(unit, init)),
        Symbol::ExternalSymbol(e) => {
            if let Some(target) = e.external {
                let _ = unit.arena.symbols.get(target);
            }
            Ok(())
        }
    }
}

fn verify_args(unit: &TranslationUnit, args: &[SymbolId]) -> Result<(), VerifyError> {
    for &arg in args {
        match unit.arena.symbols.get(arg) {
            Symbol::Variable(v) if v.intent.is_valid_argument_intent() => {}
            Symbol::Variable(v) => {
                return Err(VerifyError::new(format!("argument `{}` carries the non-argument intent {:?}", v.name, v.intent)));
            }
            _ => return Err(VerifyError::new("a procedure argument must be a Variable")),
        }
    }
    Ok(())
}

fn verify_body(unit: &TranslationUnit, body: &[Stmt]) -> Result<(), VerifyError> {
    body.iter().try_for_each(|s| verify_stmt(unit, s))
}

#[allow(clippy::too_many_lines)]
fn verify_stmt(unit: &TranslationUnit, stmt: &Stmt) -> Result<(), VerifyError> {
    match &stmt.kind {
        StmtKind::Assignment { target, value } => {
            verify_expr(unit, target)?;
            verify_expr(unit, value)
        }
        StmtKind::If { cond, then_body, else_body } => {
            verify_expr(unit, cond)?;
            verify_body(unit, then_body)?;
            verify_body(unit, else_body)
        }
        StmtKind::WhileLoop { cond, body } => {
            verify_expr(unit, cond)?;
            verify_body(unit, body)
        }
        StmtKind::DoLoop { head, body } | StmtKind::DoConcurrentLoop { head, body } => {
            verify_var(unit, head.var)?;
            verify_expr(unit, &head.start)?;
            verify_expr(unit, &head.end)?;
            if let Some(step) = &head.step {
                verify_expr(unit, step)?;
            }
            verify_body(unit, body)
        }
        StmtKind::Select { test, arms, default } => {
            verify_expr(unit, test)?;
            for arm in arms {
                for pattern in &arm.patterns {
                    match pattern {
                        crate::asr::SelectPattern::Value(e) => verify_expr(unit, e)?,
                        crate::asr::SelectPattern::Range(lo, hi) => {
                            verify_expr(unit, lo)?;
                            verify_expr(unit, hi)?;
                        }
                    }
                }
                verify_body(unit, &arm.body)?;
            }
            verify_body(unit, default)
        }
        StmtKind::SubroutineCall { callee, args } => {
            if unit.resolve_procedure(*callee).is_none() {
                return Err(VerifyError::new("SubroutineCall callee does not resolve to a procedure"));
            }
            args.iter().try_for_each(|a| verify_expr(unit, a))
        }
        StmtKind::Print { args } | StmtKind::Allocate(args) | StmtKind::Deallocate(args) => {
            args.iter().try_for_each(|a| verify_expr(unit, a))
        }
        StmtKind::Stop { code } | StmtKind::ErrorStop { code } => code.as_ref().map_or(Ok(()), |c| verify_expr(unit, c)),
        StmtKind::Assert { cond, message } => {
            verify_expr(unit, cond)?;
            message.as_ref().map_or(Ok(()), |m| verify_expr(unit, m))
        }
        StmtKind::Return | StmtKind::Exit | StmtKind::Cycle | StmtKind::GoTo(_) | StmtKind::GoToTarget(_) => Ok(()),
    }
}

fn verify_var(unit: &TranslationUnit, sym: SymbolId) -> Result<(), VerifyError> {
    if unit.resolve_variable(sym).is_none() {
        return Err(VerifyError::new("expected a Variable reference"));
    }
    Ok(())
}

#[allow(clippy::too_many_lines)]
fn verify_expr(unit: &TranslationUnit, expr: &Expr) -> Result<(), VerifyError> {
    match &expr.kind {
        ExprKind::Var(sym) => verify_var(unit, *sym),
        ExprKind::FunctionCall { callee, args } => {
            if unit.resolve_procedure(*callee).is_none() {
                return Err(VerifyError::new("FunctionCall callee does not resolve to a procedure"));
            }
            args.iter().try_for_each(|a| verify_expr(unit, a))
        }
        ExprKind::BinOp(_, l, r) | ExprKind::Compare(_, l, r) | ExprKind::StrOp(_, l, r) => {
            verify_expr(unit, l)?;
            verify_expr(unit, r)
        }
        ExprKind::UnaryOp(_, e)
        | ExprKind::ImplicitCast { operand: e, .. }
        | ExprKind::ExplicitCast { operand: e, .. } => verify_expr(unit, e),
        ExprKind::BoolOp(_, operands) | ExprKind::ArrayInitializer(operands) => {
            operands.iter().try_for_each(|o| verify_expr(unit, o))
        }
        ExprKind::ArrayRef { base, indices } => {
            verify_expr(unit, base)?;
            indices.iter().try_for_each(|i| verify_expr(unit, i))
        }
        ExprKind::ArraySize { array, dim } => {
            verify_expr(unit, array)?;
            dim.as_ref().map_or(Ok(()), |d| verify_expr(unit, d))
        }
        ExprKind::ArrayBound { array, dim, .. } => {
            verify_expr(unit, array)?;
            verify_expr(unit, dim)
        }
        ExprKind::ArrayReshape { array, shape } => {
            verify_expr(unit, array)?;
            verify_expr(unit, shape)
        }
        ExprKind::FusedMultiplyAdd(a, b, c) => {
            verify_expr(unit, a)?;
            verify_expr(unit, b)?;
            verify_expr(unit, c)
        }
        ExprKind::DerivedRef { base, member } => {
            verify_expr(unit, base)?;
            match unit.arena.symbols.get(*member) {
                Symbol::Variable(_) => Ok(()),
                _ => Err(VerifyError::new("DerivedRef member does not resolve to a Variable")),
            }
        }
        ExprKind::ImpliedDoLoop { element, var, start, end, step } => {
            verify_var(unit, *var)?;
            verify_expr(unit, element)?;
            verify_expr(unit, start)?;
            verify_expr(unit, end)?;
            step.as_ref().map_or(Ok(()), |s| verify_expr(unit, s))
        }
        ExprKind::Str(_)
        | ExprKind::ConstantInteger(_)
        | ExprKind::ConstantReal(_)
        | ExprKind::ConstantLogical(_)
        | ExprKind::ConstantComplex(..) => Ok(()),
    }
}
