//! The two post-reconstruction walks §4.5 runs after a tree comes back off
//! the wire: `fix_parent_symtab` sets every table's lexical `parent`, then
//! `fix_external_symbols` resolves each `use`-imported shell's target.

use crate::asr::{Symbol, TranslationUnit};
use crate::error::SerializeError;
use crate::symbol_table::SymbolTableId;

/// Sets `table.parent` for every table reachable from `unit.global_table`,
/// derived purely from which symbol owns which table -- nothing about this
/// is carried on the wire itself.
pub fn fix_parent_symtab(unit: &mut TranslationUnit) {
    fix_table(unit, unit.global_table);
}

fn fix_table(unit: &mut TranslationUnit, table_id: SymbolTableId) {
    let members: Vec<_> = unit.arena.tables.get(table_id).local_symbols().map(|(_, id)| id).collect();
    for sym_id in members {
        if let Some(child) = unit.arena.symbols.get(sym_id).own_table() {
            unit.arena.tables.get_mut(child).parent = Some(table_id);
            fix_table(unit, child);
        }
    }
}

/// Names one already-resident module table an `ExternalSymbol` may import
/// from. `table` must already live in `unit`'s own arena -- merging a
/// dependency module file into the consuming compilation's arena is the
/// driver's job, not `serialize`'s; this walk only resolves names once both
/// sides are co-resident.
pub struct ModuleTable<'a> {
    pub name: &'a str,
    pub table: SymbolTableId,
}

/// Resolves every `ExternalSymbol.external` in `unit` by looking up
/// `module_name` (rewritten from an intrinsic-module prefix to its short
/// name first) in `modules`, then searching that module's table for
/// `original_name`. Unresolvable names are a fatal load error, per §4.5.
pub fn fix_external_symbols(
    unit: &mut TranslationUnit,
    modules: &[ModuleTable<'_>],
    intrinsic_module_prefix: &str,
) -> Result<(), SerializeError> {
    let pending: Vec<_> = unit
        .arena
        .symbols
        .iter()
        .filter_map(|(id, sym)| match sym {
            Symbol::ExternalSymbol(e) => Some((id, e.module_name.clone(), e.original_name.clone())),
            _ => None,
        })
        .collect();

    for (id, module_name, original_name) in pending {
        let short_name = module_name.strip_prefix(intrinsic_module_prefix).unwrap_or(&module_name);
        let target_table = modules
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(short_name))
            .ok_or_else(|| unresolved(&module_name, &original_name))?
            .table;
        let target = unit
            .resolve(target_table, &original_name)
            .ok_or_else(|| unresolved(&module_name, &original_name))?;
        if let Symbol::ExternalSymbol(e) = unit.arena.symbols.get_mut(id) {
            e.external = Some(target);
        }
    }
    Ok(())
}

fn unresolved(module: &str, name: &str) -> SerializeError {
    SerializeError::UnresolvedExternal {
        module: module.to_owned(),
        name: name.to_owned(),
    }
}
