//! Generic-procedure call-site dispatch (§4.2, §9 "Generic procedures").
//!
//! Dispatch is pay-as-you-go: per call site, enumerate `candidates` in
//! declaration order and return the first whose formal argument
//! categories match `arg_types` in order and arity. The caller rewrites the
//! call's callee to the returned concrete symbol directly, so no later pass
//! or emitter ever sees an unresolved generic call.
use crate::asr::{Symbol, SymbolId, TranslationUnit};
use crate::types::Type;

#[must_use]
pub fn dispatch(unit: &TranslationUnit, candidates: &[SymbolId], arg_types: &[Type]) -> Option<SymbolId> {
    'candidates: for &candidate in candidates {
        let Some(resolved) = unit.resolve_procedure(candidate) else {
            continue;
        };
        let formals: &[SymbolId] = match unit.arena.symbols.get(resolved) {
            Symbol::Function(f) => &f.args,
            Symbol::Subroutine(s) => &s.args,
            _ => continue,
        };
        if formals.len() != arg_types.len() {
            continue;
        }
        for (&formal_id, actual_ty) in formals.iter().zip(arg_types) {
            let Symbol::Variable(formal) = unit.arena.symbols.get(formal_id) else {
                continue 'candidates;
            };
            if formal.ty.category() != actual_ty.category() {
                continue 'candidates;
            }
        }
        return Some(resolved);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::dispatch;
    use crate::asr::{Abi, Access, FunctionSym, Intent, Storage, Symbol, Variable};
    use crate::symbol_table::SymbolTable;
    use crate::types::{Dimensions, Type};

    fn make_function(unit: &mut crate::asr::TranslationUnit, name: &str, arg_ty: Type) -> crate::asr::SymbolId {
        let table = unit.arena.tables.alloc(SymbolTable::new(Some(unit.global_table), None));
        let arg = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: "x".to_owned(),
            parent_table: table,
            intent: Intent::In,
            storage: Storage::Default,
            ty: arg_ty,
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        let ret = unit.arena.symbols.alloc(Symbol::Variable(Variable {
            name: name.to_owned(),
            parent_table: table,
            intent: Intent::ReturnVar,
            storage: Storage::Default,
            ty: Type::Integer(4, Dimensions::new()),
            initializer: None,
            abi: Abi::Source,
            access: Access::Public,
        }));
        unit.arena.symbols.alloc(Symbol::Function(FunctionSym {
            name: name.to_owned(),
            table,
            args: vec![arg],
            return_var: ret,
            body: Vec::new(),
            bind_name: None,
            external: None,
            abi: Abi::Source,
        }))
    }

    #[test]
    fn picks_first_category_matching_candidate() {
        let mut unit = crate::asr::TranslationUnit::new();
        let int_variant = make_function(&mut unit, "f_int", Type::Integer(4, Dimensions::new()));
        let real_variant = make_function(&mut unit, "f_real", Type::Real(4, Dimensions::new()));

        let picked = dispatch(&unit, &[int_variant, real_variant], &[Type::Real(4, Dimensions::new())]);
        assert_eq!(picked, Some(real_variant));
    }

    #[test]
    fn no_match_returns_none() {
        let mut unit = crate::asr::TranslationUnit::new();
        let int_variant = make_function(&mut unit, "f_int", Type::Integer(4, Dimensions::new()));
        let picked = dispatch(&unit, &[int_variant], &[Type::Character(1, Dimensions::new())]);
        assert_eq!(picked, None);
    }
}
