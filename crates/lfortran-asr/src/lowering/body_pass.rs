//! Phase 2 of AST -> ASR lowering: the body pass (§4.2 Phase 2).
//!
//! Re-walks the same AST Phase 1 already structurally processed, converting
//! every `ast::Stmt`/`ast::Expr` into its typed `asr` counterpart: identifier
//! resolution against the symbol tables Phase 1 built, implicit casts via
//! [`super::casts`], generic-procedure dispatch via [`super::generics`], and
//! intrinsic auto-injection via [`super::intrinsics`].
use crate::asr::{
    BinOpKind, BoolOpKind, BoundKind, CmpOpKind, DoLoopHead, Expr, ExprKind, SelectArm, SelectPattern, Stmt, StmtKind,
    Symbol, SymbolId, TranslationUnit, UnaryOpKind,
};
use crate::ast;
use crate::error::SemanticError;
use crate::location::Span;
use crate::symbol_table::SymbolTableId;
use crate::types::{Dimension, Dimensions, Type, TypeCategory};

use super::casts::{cast_kind_for, numeric_priority};
use super::generics;
use super::intrinsics;
use super::symtab_pass::LoweredSymbols;

/// Fills in every statement body Phase 1 left empty.
pub fn fill_bodies(unit: &mut TranslationUnit, ast: &ast::TranslationUnitAst, lowered: &LoweredSymbols) -> Result<(), SemanticError> {
    for ((module_sym, subprogram_syms), module) in lowered.modules.iter().zip(&ast.modules) {
        let _ = module_sym;
        for (&sym, subprogram) in subprogram_syms.iter().zip(&module.subprograms) {
            fill_subprogram_body(unit, sym, subprogram)?;
        }
    }

    for (&sym, subprogram) in lowered.top_level_subprograms.iter().zip(&ast.top_level_subprograms) {
        fill_subprogram_body(unit, sym, subprogram)?;
    }

    if let (Some((program_sym, internal_syms)), Some(program)) = (&lowered.program, &ast.program) {
        let scope = own_table(unit, *program_sym);
        let body = lower_stmts(unit, scope, &program.body)?;
        set_program_body(unit, *program_sym, body);
        for (&sym, subprogram) in internal_syms.iter().zip(&program.subprograms) {
            fill_subprogram_body(unit, sym, subprogram)?;
        }
    }

    let global_table = unit.global_table;
    unit.orphan_items = lower_stmts(unit, global_table, &ast.orphan_statements)?;

    Ok(())
}

fn own_table(unit: &TranslationUnit, sym: SymbolId) -> SymbolTableId {
    unit.arena.symbols.get(sym).own_table().expect("caller passes a table-owning symbol")
}

fn set_program_body(unit: &mut TranslationUnit, sym: SymbolId, body: Vec<Stmt>) {
    if let Symbol::Program(p) = unit.arena.symbols.get_mut(sym) {
        p.body = body;
    }
}

fn fill_subprogram_body(unit: &mut TranslationUnit, sym: SymbolId, decl: &ast::SubprogramDecl) -> Result<(), SemanticError> {
    let scope = own_table(unit, sym);
    let body = lower_stmts(unit, scope, &decl.body)?;
    match unit.arena.symbols.get_mut(sym) {
        Symbol::Function(f) => f.body = body,
        Symbol::Subroutine(s) => s.body = body,
        _ => unreachable!("a subprogram shell is always Function or Subroutine"),
    }
    Ok(())
}

fn lower_stmts(unit: &mut TranslationUnit, scope: SymbolTableId, stmts: &[ast::Stmt]) -> Result<Vec<Stmt>, SemanticError> {
    stmts.iter().map(|s| lower_stmt(unit, scope, s)).collect()
}

#[allow(clippy::too_many_lines)]
fn lower_stmt(unit: &mut TranslationUnit, scope: SymbolTableId, stmt: &ast::Stmt) -> Result<Stmt, SemanticError> {
    let span = stmt.span;
    let kind = match &stmt.kind {
        ast::StmtKind::Assignment { target, value } => {
            let value = lower_expr(unit, scope, value)?;
            let target = lower_expr(unit, scope, target)?;
            let target_ty = target.ty.clone();
            let value = implicit_cast_to(value, &target_ty)?;
            StmtKind::Assignment { target, value }
        }
        ast::StmtKind::If { cond, then_body, else_body } => {
            let cond = require_logical(lower_expr(unit, scope, cond)?)?;
            let then_body = lower_stmts(unit, scope, then_body)?;
            let else_body = lower_stmts(unit, scope, else_body)?;
            StmtKind::If { cond, then_body, else_body }
        }
        ast::StmtKind::WhileLoop { cond, body } => {
            let cond = require_logical(lower_expr(unit, scope, cond)?)?;
            let body = lower_stmts(unit, scope, body)?;
            StmtKind::WhileLoop { cond, body }
        }
        ast::StmtKind::DoLoop { var, start, end, step, body } => {
            let head = lower_do_loop_head(unit, scope, var, start, end, step.as_ref(), span)?;
            let body = lower_stmts(unit, scope, body)?;
            StmtKind::DoLoop { head, body }
        }
        ast::StmtKind::DoConcurrentLoop { var, start, end, body } => {
            let head = lower_do_loop_head(unit, scope, var, start, end, None, span)?;
            let body = lower_stmts(unit, scope, body)?;
            StmtKind::DoConcurrentLoop { head, body }
        }
        ast::StmtKind::Select { test, arms, default } => {
            let test = lower_expr(unit, scope, test)?;
            let test_ty = test.ty.clone();
            let mut lowered_arms = Vec::with_capacity(arms.len());
            for arm in arms {
                let patterns = arm
                    .patterns
                    .iter()
                    .map(|p| lower_select_pattern(unit, scope, p, &test_ty))
                    .collect::<Result<_, _>>()?;
                let body = lower_stmts(unit, scope, &arm.body)?;
                lowered_arms.push(SelectArm { patterns, body });
            }
            let default = lower_stmts(unit, scope, default)?;
            StmtKind::Select { test, arms: lowered_arms, default }
        }
        ast::StmtKind::Call { callee, args } => {
            let args = lower_exprs(unit, scope, args)?;
            let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
            let target = resolve_callee(unit, scope, callee, &arg_types, span)?;
            match unit.arena.symbols.get(target) {
                Symbol::Subroutine(_) => {}
                Symbol::Function(_) => {
                    return Err(SemanticError::new(format!("`{callee}` is a function, not a subroutine"), span));
                }
                _ => unreachable!("resolve_callee only ever returns a Subroutine or Function"),
            }
            StmtKind::SubroutineCall { callee: target, args }
        }
        ast::StmtKind::Print { args } => StmtKind::Print { args: lower_exprs(unit, scope, args)? },
        ast::StmtKind::Return => StmtKind::Return,
        ast::StmtKind::Stop { code } => StmtKind::Stop { code: lower_opt_expr(unit, scope, code)? },
        ast::StmtKind::ErrorStop { code } => StmtKind::ErrorStop { code: lower_opt_expr(unit, scope, code)? },
        ast::StmtKind::Exit => StmtKind::Exit,
        ast::StmtKind::Cycle => StmtKind::Cycle,
        ast::StmtKind::GoTo(label) => StmtKind::GoTo(*label),
        ast::StmtKind::GoToTarget(label) => StmtKind::GoToTarget(*label),
        ast::StmtKind::Assert { cond, message } => {
            let cond = require_logical(lower_expr(unit, scope, cond)?)?;
            let message = lower_opt_expr(unit, scope, message)?;
            StmtKind::Assert { cond, message }
        }
        ast::StmtKind::Allocate(exprs) => StmtKind::Allocate(lower_exprs(unit, scope, exprs)?),
        ast::StmtKind::Deallocate(exprs) => StmtKind::Deallocate(lower_exprs(unit, scope, exprs)?),
    };
    Ok(Stmt::new(kind, span))
}

fn lower_select_pattern(
    unit: &mut TranslationUnit,
    scope: SymbolTableId,
    pattern: &ast::SelectPattern,
    test_ty: &Type,
) -> Result<SelectPattern, SemanticError> {
    match pattern {
        ast::SelectPattern::Value(e) => {
            let e = implicit_cast_to(lower_expr(unit, scope, e)?, test_ty)?;
            Ok(SelectPattern::Value(e))
        }
        ast::SelectPattern::Range(lo, hi) => {
            let lo = implicit_cast_to(lower_expr(unit, scope, lo)?, test_ty)?;
            let hi = implicit_cast_to(lower_expr(unit, scope, hi)?, test_ty)?;
            Ok(SelectPattern::Range(lo, hi))
        }
    }
}

fn lower_do_loop_head(
    unit: &mut TranslationUnit,
    scope: SymbolTableId,
    var: &str,
    start: &ast::Expr,
    end: &ast::Expr,
    step: Option<&ast::Expr>,
    span: Span,
) -> Result<DoLoopHead, SemanticError> {
    let var_sym = unit
        .resolve(scope, var)
        .ok_or_else(|| SemanticError::new(format!("loop variable `{var}` is not declared"), span))?;
    let int_ty = Type::Integer(4, Dimensions::new());
    let start = implicit_cast_to(lower_expr(unit, scope, start)?, &int_ty)?;
    let end = implicit_cast_to(lower_expr(unit, scope, end)?, &int_ty)?;
    let step = step.map(|s| lower_expr(unit, scope, s)).transpose()?;
    let step = step.map(|s| implicit_cast_to(s, &int_ty)).transpose()?;
    Ok(DoLoopHead { var: var_sym, start, end, step })
}

fn lower_opt_expr(unit: &mut TranslationUnit, scope: SymbolTableId, e: &Option<ast::Expr>) -> Result<Option<Expr>, SemanticError> {
    e.as_ref().map(|e| lower_expr(unit, scope, e)).transpose()
}

fn lower_exprs(unit: &mut TranslationUnit, scope: SymbolTableId, exprs: &[ast::Expr]) -> Result<Vec<Expr>, SemanticError> {
    exprs.iter().map(|e| lower_expr(unit, scope, e)).collect()
}

fn require_logical(e: Expr) -> Result<Expr, SemanticError> {
    if e.ty.category() == TypeCategory::Logical {
        Ok(e)
    } else {
        Err(SemanticError::new("expected a logical expression", e.span))
    }
}

/// Coerces `e` to `target`'s category via an `ImplicitCast`, or returns `e`
/// unchanged if it's already that category.
fn implicit_cast_to(e: Expr, target: &Type) -> Result<Expr, SemanticError> {
    let from = e.ty.category();
    let to = target.category();
    if from == to {
        return Ok(e);
    }
    let Some(kind) = cast_kind_for(from, to) else {
        return Err(SemanticError::new(
            format!("cannot implicitly convert {from:?} to {to:?}"),
            e.span,
        ));
    };
    let span = e.span;
    Ok(Expr::new(
        ExprKind::ImplicitCast { operand: Box::new(e), cast_kind: kind },
        target.clone(),
        span,
    ))
}

/// Casts the lower-priority of `left`/`right` up to the other's type,
/// returning both operands plus the common result type.
fn unify_numeric(left: Expr, right: Expr) -> Result<(Expr, Expr, Type), SemanticError> {
    let (lc, rc) = (left.ty.category(), right.ty.category());
    if lc == rc {
        let ty = left.ty.clone();
        return Ok((left, right, ty));
    }
    if numeric_priority(lc) >= numeric_priority(rc) {
        let target = left.ty.clone();
        let right = implicit_cast_to(right, &target)?;
        Ok((left, right, target))
    } else {
        let target = right.ty.clone();
        let left = implicit_cast_to(left, &target)?;
        Ok((left, right, target))
    }
}

fn variable_type(unit: &TranslationUnit, sym: SymbolId) -> Type {
    match unit.arena.symbols.get(sym) {
        Symbol::Variable(v) => v.ty.clone(),
        _ => unreachable!("variable_type is only ever called on a resolved Variable symbol"),
    }
}

/// Resolves `name` to a callable `Subroutine`/`Function` symbol id, dispatching
/// through a `GenericProcedure` if that's what it names.
fn resolve_callee(
    unit: &TranslationUnit,
    scope: SymbolTableId,
    name: &str,
    arg_types: &[Type],
    span: Span,
) -> Result<SymbolId, SemanticError> {
    let Some(sym) = unit.resolve(scope, name) else {
        return Err(SemanticError::new(format!("`{name}` is not declared"), span));
    };
    match unit.arena.symbols.get(sym) {
        Symbol::Subroutine(_) | Symbol::Function(_) => Ok(sym),
        Symbol::GenericProcedure(g) => generics::dispatch(unit, &g.procs, arg_types)
            .ok_or_else(|| SemanticError::new(format!("no overload of `{name}` matches these argument types"), span)),
        Symbol::ExternalSymbol(_) => unit
            .resolve_procedure(sym)
            .ok_or_else(|| SemanticError::new(format!("`{name}` does not resolve to a procedure"), span)),
        _ => Err(SemanticError::new(format!("`{name}` is not callable"), span)),
    }
}

#[allow(clippy::too_many_lines)]
fn lower_expr(unit: &mut TranslationUnit, scope: SymbolTableId, expr: &ast::Expr) -> Result<Expr, SemanticError> {
    let span = expr.span;
    match &expr.kind {
        ast::ExprKind::Name(name) => {
            let sym = unit
                .resolve(scope, name)
                .ok_or_else(|| SemanticError::new(format!("`{name}` is not declared"), span))?;
            let var_sym = unit
                .resolve_variable(sym)
                .ok_or_else(|| SemanticError::new(format!("`{name}` does not refer to a variable"), span))?;
            let ty = variable_type(unit, var_sym);
            Ok(Expr::new(ExprKind::Var(var_sym), ty, span))
        }
        ast::ExprKind::Int(n) => Ok(Expr::new(ExprKind::ConstantInteger(*n), Type::Integer(4, Dimensions::new()), span)),
        ast::ExprKind::Real(f) => Ok(Expr::new(ExprKind::ConstantReal(*f), Type::Real(4, Dimensions::new()), span)),
        ast::ExprKind::Logical(b) => Ok(Expr::new(ExprKind::ConstantLogical(*b), Type::Logical(4, Dimensions::new()), span)),
        ast::ExprKind::Str(s) => Ok(Expr::new(ExprKind::Str(s.clone()), Type::Character(1, Dimensions::new()), span)),
        ast::ExprKind::Complex(re, im) => {
            Ok(Expr::new(ExprKind::ConstantComplex(*re, *im), Type::Complex(4, Dimensions::new()), span))
        }
        ast::ExprKind::BinOp(op, l, r) => {
            let l = lower_expr(unit, scope, l)?;
            let r = lower_expr(unit, scope, r)?;
            let (l, r, ty) = unify_numeric(l, r)?;
            let op = match op {
                ast::BinOpKind::Add => BinOpKind::Add,
                ast::BinOpKind::Sub => BinOpKind::Sub,
                ast::BinOpKind::Mul => BinOpKind::Mul,
                ast::BinOpKind::Div => BinOpKind::Div,
                ast::BinOpKind::Pow => BinOpKind::Pow,
            };
            Ok(Expr::new(ExprKind::BinOp(op, Box::new(l), Box::new(r)), ty, span))
        }
        ast::ExprKind::UnaryOp(op, e) => {
            let e = lower_expr(unit, scope, e)?;
            match op {
                ast::UnaryOpKind::Neg => {
                    if !matches!(e.ty.category(), TypeCategory::Integer | TypeCategory::Real | TypeCategory::Complex) {
                        return Err(SemanticError::new("unary minus requires a numeric operand", span));
                    }
                    let ty = e.ty.clone();
                    Ok(Expr::new(ExprKind::UnaryOp(UnaryOpKind::Neg, Box::new(e)), ty, span))
                }
                ast::UnaryOpKind::Not => {
                    let e = require_logical(e)?;
                    let ty = e.ty.clone();
                    Ok(Expr::new(ExprKind::UnaryOp(UnaryOpKind::Not, Box::new(e)), ty, span))
                }
            }
        }
        ast::ExprKind::Compare(op, l, r) => {
            let l = lower_expr(unit, scope, l)?;
            let r = lower_expr(unit, scope, r)?;
            let (l, r, _) = unify_numeric(l, r)?;
            let op = match op {
                ast::CmpOpKind::Eq => CmpOpKind::Eq,
                ast::CmpOpKind::NotEq => CmpOpKind::NotEq,
                ast::CmpOpKind::Lt => CmpOpKind::Lt,
                ast::CmpOpKind::LtE => CmpOpKind::LtE,
                ast::CmpOpKind::Gt => CmpOpKind::Gt,
                ast::CmpOpKind::GtE => CmpOpKind::GtE,
            };
            Ok(Expr::new(
                ExprKind::Compare(op, Box::new(l), Box::new(r)),
                Type::Logical(4, Dimensions::new()),
                span,
            ))
        }
        ast::ExprKind::BoolOp(op, operands) => {
            let mut lowered = Vec::with_capacity(operands.len());
            for o in operands {
                lowered.push(require_logical(lower_expr(unit, scope, o)?)?);
            }
            let op = match op {
                ast::BoolOpKind::And => BoolOpKind::And,
                ast::BoolOpKind::Or => BoolOpKind::Or,
            };
            Ok(Expr::new(ExprKind::BoolOp(op, lowered), Type::Logical(4, Dimensions::new()), span))
        }
        ast::ExprKind::Call { callee, args } => lower_call_expr(unit, scope, callee, args, span),
        ast::ExprKind::ArrayInitializer(elements) => {
            let lowered = lower_exprs(unit, scope, elements)?;
            let elem_ty = lowered.first().map_or(Type::Integer(4, Dimensions::new()), |e| e.ty.as_scalar());
            let len = crate::asr::Expr::new(
                ExprKind::ConstantInteger(i64::try_from(lowered.len()).unwrap_or(i64::MAX)),
                Type::Integer(4, Dimensions::new()),
                span,
            );
            let one = crate::asr::Expr::new(ExprKind::ConstantInteger(1), Type::Integer(4, Dimensions::new()), span);
            let mut dims = Dimensions::new();
            dims.push(Dimension::fixed(one, len));
            let ty = apply_dims(elem_ty, dims);
            Ok(Expr::new(ExprKind::ArrayInitializer(lowered), ty, span))
        }
        ast::ExprKind::ImpliedDoLoop { element, var, start, end, step } => {
            let var_sym = unit
                .resolve(scope, var)
                .ok_or_else(|| SemanticError::new(format!("implied-do variable `{var}` is not declared"), span))?;
            let int_ty = Type::Integer(4, Dimensions::new());
            let start = implicit_cast_to(lower_expr(unit, scope, start)?, &int_ty)?;
            let end = implicit_cast_to(lower_expr(unit, scope, end)?, &int_ty)?;
            let step = step
                .as_ref()
                .map(|s| lower_expr(unit, scope, s))
                .transpose()?
                .map(|s| implicit_cast_to(s, &int_ty))
                .transpose()?;
            let element = lower_expr(unit, scope, element)?;
            let mut dims = Dimensions::new();
            dims.push(Dimension::assumed_shape());
            let ty = apply_dims(element.ty.as_scalar(), dims);
            Ok(Expr::new(
                ExprKind::ImpliedDoLoop {
                    element: Box::new(element),
                    var: var_sym,
                    start: Box::new(start),
                    end: Box::new(end),
                    step: step.map(Box::new),
                },
                ty,
                span,
            ))
        }
        ast::ExprKind::DerivedRef { base, field } => {
            let base = lower_expr(unit, scope, base)?;
            let Type::Derived(derived_sym, _) = &base.ty else {
                return Err(SemanticError::new("field access on a non-derived-type expression", span));
            };
            let derived_table = match unit.arena.symbols.get(*derived_sym) {
                Symbol::DerivedType(d) => d.table,
                _ => unreachable!("Type::Derived always names a DerivedType symbol"),
            };
            let Some(member_sym) = unit.arena.tables.get(derived_table).get_local(field) else {
                return Err(SemanticError::new(format!("derived type has no member `{field}`"), span));
            };
            let ty = variable_type(unit, member_sym);
            Ok(Expr::new(ExprKind::DerivedRef { base: Box::new(base), member: member_sym }, ty, span))
        }
    }
}

fn apply_dims(ty: Type, dims: Dimensions) -> Type {
    match ty {
        Type::Integer(k, _) => Type::Integer(k, dims),
        Type::Real(k, _) => Type::Real(k, dims),
        Type::Complex(k, _) => Type::Complex(k, dims),
        Type::Logical(k, _) => Type::Logical(k, dims),
        Type::Character(k, _) => Type::Character(k, dims),
        Type::Derived(s, _) => Type::Derived(s, dims),
        other => other,
    }
}

fn lower_call_expr(
    unit: &mut TranslationUnit,
    scope: SymbolTableId,
    callee: &str,
    args: &[ast::Expr],
    span: Span,
) -> Result<Expr, SemanticError> {
    let args = lower_exprs(unit, scope, args)?;

    if let Some(sym) = unit.resolve(scope, callee) {
        match unit.arena.symbols.get(sym) {
            Symbol::Variable(v) if v.ty.is_array() => {
                let base_ty = v.ty.as_scalar();
                let base = Expr::new(ExprKind::Var(sym), v.ty.clone(), span);
                return Ok(Expr::new(ExprKind::ArrayRef { base: Box::new(base), indices: args }, base_ty, span));
            }
            Symbol::DerivedType(_) => {
                return Err(SemanticError::new(
                    "derived-type constructor expressions are not supported in this layer",
                    span,
                ));
            }
            _ => {}
        }
    }

    if let Some(result) = lower_array_inquiry(callee, &args, span)? {
        return Ok(result);
    }

    let arg_types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
    if let Some(sym) = unit.resolve(scope, callee) {
        let target = match unit.arena.symbols.get(sym) {
            Symbol::GenericProcedure(g) => generics::dispatch(unit, &g.procs, &arg_types)
                .ok_or_else(|| SemanticError::new(format!("no overload of `{callee}` matches these argument types"), span))?,
            Symbol::Function(_) => sym,
            Symbol::Subroutine(_) => {
                return Err(SemanticError::new(format!("`{callee}` is a subroutine, not a function"), span));
            }
            Symbol::ExternalSymbol(_) => unit
                .resolve_procedure(sym)
                .ok_or_else(|| SemanticError::new(format!("`{callee}` does not resolve to a procedure"), span))?,
            _ => return Err(SemanticError::new(format!("`{callee}` is not callable"), span)),
        };
        let ty = match unit.arena.symbols.get(target) {
            Symbol::Function(f) => variable_type(unit, f.return_var),
            _ => return Err(SemanticError::new(format!("`{callee}` is not a function"), span)),
        };
        return Ok(Expr::new(ExprKind::FunctionCall { callee: target, args }, ty, span));
    }

    match callee.to_ascii_lowercase().as_str() {
        "sin" => {
            let target = intrinsics::ensure_sin(unit);
            let ty = match unit.arena.symbols.get(target) {
                Symbol::Function(f) => variable_type(unit, f.return_var),
                _ => unreachable!(),
            };
            Ok(Expr::new(ExprKind::FunctionCall { callee: target, args }, ty, span))
        }
        "present" => {
            let target = intrinsics::ensure_present(unit);
            let ty = match unit.arena.symbols.get(target) {
                Symbol::Function(f) => variable_type(unit, f.return_var),
                _ => unreachable!(),
            };
            Ok(Expr::new(ExprKind::FunctionCall { callee: target, args }, ty, span))
        }
        _ => Err(SemanticError::new(format!("cannot resolve identifier `{callee}`"), span)),
    }
}

/// `size`/`lbound`/`ubound` get dedicated ASR nodes instead of a synthetic
/// `Function` (see `super::intrinsics`); recognized here by name since they
/// never appear as an ordinary bound symbol.
fn lower_array_inquiry(callee: &str, args: &[Expr], span: Span) -> Result<Option<Expr>, SemanticError> {
    let int_ty = || Type::Integer(4, Dimensions::new());
    match callee.to_ascii_lowercase().as_str() {
        "size" => {
            let Some((array, rest)) = args.split_first() else {
                return Err(SemanticError::new("size requires an array argument", span));
            };
            if !array.ty.is_array() {
                return Err(SemanticError::new("size requires an array argument", span));
            }
            let dim = rest.first().map(|d| Box::new(d.clone()));
            Ok(Some(Expr::new(
                ExprKind::ArraySize { array: Box::new(array.clone()), dim },
                int_ty(),
                span,
            )))
        }
        "lbound" | "ubound" => {
            let [array, dim] = args else {
                return Err(SemanticError::new(
                    "lbound/ubound require an explicit dimension argument in this layer",
                    span,
                ));
            };
            if !array.ty.is_array() {
                return Err(SemanticError::new("lbound/ubound require an array argument", span));
            }
            let bound = if callee.eq_ignore_ascii_case("lbound") { BoundKind::Lower } else { BoundKind::Upper };
            Ok(Some(Expr::new(
                ExprKind::ArrayBound { array: Box::new(array.clone()), dim: Box::new(dim.clone()), bound },
                int_ty(),
                span,
            )))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lowering::symtab_pass;
    use crate::location::Span;

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn int_type_spec() -> ast::TypeSpec {
        ast::TypeSpec { name: "integer".to_owned(), kind_expr: None, span: span() }
    }

    fn var(name: &str) -> ast::VarDecl {
        ast::VarDecl {
            name: name.to_owned(),
            type_spec: int_type_spec(),
            dims: Vec::new(),
            intent: None,
            is_parameter: false,
            is_save: false,
            initializer: None,
            span: span(),
        }
    }

    fn name_expr(name: &str) -> ast::Expr {
        ast::Expr::new(ast::ExprKind::Name(name.to_owned()), span())
    }

    fn int_expr(n: i64) -> ast::Expr {
        ast::Expr::new(ast::ExprKind::Int(n), span())
    }

    #[test]
    fn assignment_inserts_an_implicit_cast_when_categories_differ() {
        let mut ast = ast::TranslationUnitAst::default();
        let mut program = ast::ProgramDecl {
            name: "main".to_owned(),
            declarations: Vec::new(),
            uses: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            body: Vec::new(),
            span: span(),
        };
        program.declarations.push(ast::VarDecl {
            type_spec: ast::TypeSpec { name: "real".to_owned(), kind_expr: None, span: span() },
            ..var("x")
        });
        program
            .body
            .push(ast::Stmt::new(ast::StmtKind::Assignment { target: name_expr("x"), value: int_expr(1) }, span()));
        ast.program = Some(program);

        let (mut unit, lowered) = symtab_pass::build(&ast).expect("phase 1 succeeds");
        fill_bodies(&mut unit, &ast, &lowered).expect("phase 2 succeeds");

        let (program_sym, _) = lowered.program.unwrap();
        let Symbol::Program(p) = unit.arena.symbols.get(program_sym) else {
            panic!("expected Program symbol");
        };
        let StmtKind::Assignment { value, .. } = &p.body[0].kind else {
            panic!("expected an assignment");
        };
        assert!(matches!(value.kind, ExprKind::ImplicitCast { .. }));
    }

    #[test]
    fn an_undeclared_identifier_is_a_semantic_error() {
        let mut ast = ast::TranslationUnitAst::default();
        let mut program = ast::ProgramDecl {
            name: "main".to_owned(),
            declarations: Vec::new(),
            uses: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            body: Vec::new(),
            span: span(),
        };
        program.body.push(ast::Stmt::new(
            ast::StmtKind::Assignment { target: name_expr("y"), value: int_expr(1) },
            span(),
        ));
        ast.program = Some(program);

        let (mut unit, lowered) = symtab_pass::build(&ast).expect("phase 1 succeeds");
        let err = fill_bodies(&mut unit, &ast, &lowered).unwrap_err();
        assert!(err.message.contains("not declared"));
    }

    #[test]
    fn calling_sin_auto_injects_the_intrinsic() {
        let mut ast = ast::TranslationUnitAst::default();
        let mut program = ast::ProgramDecl {
            name: "main".to_owned(),
            declarations: Vec::new(),
            uses: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            body: Vec::new(),
            span: span(),
        };
        program.declarations.push(ast::VarDecl {
            type_spec: ast::TypeSpec { name: "real".to_owned(), kind_expr: None, span: span() },
            ..var("y")
        });
        program.body.push(ast::Stmt::new(
            ast::StmtKind::Assignment {
                target: name_expr("y"),
                value: ast::Expr::new(
                    ast::ExprKind::Call { callee: "sin".to_owned(), args: vec![name_expr("y")] },
                    span(),
                ),
            },
            span(),
        ));
        ast.program = Some(program);

        let (mut unit, lowered) = symtab_pass::build(&ast).expect("phase 1 succeeds");
        fill_bodies(&mut unit, &ast, &lowered).expect("phase 2 succeeds");
        assert!(unit.arena.tables.get(unit.global_table).contains_local("sin"));
    }
}
