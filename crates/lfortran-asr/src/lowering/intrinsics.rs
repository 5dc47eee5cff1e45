//! Auto-injection of intrinsic functions on first reference (§4.2).
//!
//! `size`, `lbound`, and `ubound` have dedicated ASR expression nodes
//! (`ArraySize`/`ArrayBound`) because their result type depends on their
//! arguments in a way a single fixed prototype can't express (a bare
//! `size(a)` is scalar `Integer`, but so is `ubound(a, dim)` while a
//! dimension-less `ubound(a)` would be a whole array -- this layer supports
//! only the dimension-given form). Intrinsics whose signature really is
//! fixed (`present`, `sin`) get a synthetic `Function` symbol, constructed
//! once and cached in the global scope.
use crate::asr::{Abi, Access, FunctionSym, Intent, Storage, Symbol, SymbolId, TranslationUnit, Variable};
use crate::location::Span;
use crate::symbol_table::SymbolTable;
use crate::types::{Dimensions, Type};

fn inject_function(
    unit: &mut TranslationUnit,
    name: &str,
    arg_types: &[Type],
    return_type: Type,
) -> SymbolId {
    if let Some(existing) = unit.arena.tables.get(unit.global_table).get_local(name) {
        return existing;
    }

    let table_id = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
    let mut args = Vec::with_capacity(arg_types.len());
    for (i, ty) in arg_types.iter().enumerate() {
        let arg = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: format!("arg{i}"),
            parent_table: table_id,
            intent: Intent::In,
            storage: Storage::Default,
            ty: ty.clone(),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        unit.arena.tables.get_mut(table_id).bind(&format!("arg{i}"), arg);
        args.push(arg);
    }
    let return_var = unit.arena.symbols.alloc(Symbol::Variable(Variable {
        name: name.to_owned(),
        parent_table: table_id,
        intent: Intent::ReturnVar,
        storage: Storage::Default,
        ty: return_type,
        initializer: None,
        abi: Abi::Source,
        access: Access::Public,
    }));
    unit.arena.tables.get_mut(table_id).bind(name, return_var);

    let func = unit.arena.symbols.alloc(Symbol::Function(FunctionSym {
        name: name.to_owned(),
        table: table_id,
        args,
        return_var,
        body: Vec::new(),
        bind_name: None,
        external: None,
        abi: Abi::Source,
    }));
    unit.arena.tables.get_mut(unit.global_table).bind(name, func);
    func
}

/// Ensures the `sin` intrinsic (`Real(4) -> Real(4)`) exists in the global
/// scope, injecting it on first reference.
pub fn ensure_sin(unit: &mut TranslationUnit) -> SymbolId {
    inject_function(
        unit,
        "sin",
        &[Type::Real(4, Dimensions::new())],
        Type::Real(4, Dimensions::new()),
    )
}

/// Ensures the `present` intrinsic (`Logical(4) <- any scalar`) exists in
/// the global scope. The single argument is typed `Logical(4)` here only as
/// a placeholder slot; argument-type checking for `present` is relaxed
/// relative to ordinary calls (any declared optional argument is legal) and
/// is not enforced by this synthetic prototype.
pub fn ensure_present(unit: &mut TranslationUnit) -> SymbolId {
    inject_function(
        unit,
        "present",
        &[Type::Logical(4, Dimensions::new())],
        Type::Logical(4, Dimensions::new()),
    )
}

#[must_use]
pub fn default_span() -> Span {
    Span::new(0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injecting_twice_returns_the_same_symbol() {
        let mut unit = TranslationUnit::new();
        let a = ensure_sin(&mut unit);
        let b = ensure_sin(&mut unit);
        assert_eq!(a, b);
    }

    #[test]
    fn sin_and_present_are_distinct_symbols() {
        let mut unit = TranslationUnit::new();
        let sin = ensure_sin(&mut unit);
        let present = ensure_present(&mut unit);
        assert_ne!(sin, present);
    }
}
