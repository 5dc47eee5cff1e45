//! Scope-level name -> symbol maps, linked into a parent chain (§3.1).
use indexmap::IndexMap;

use crate::arena::Id;
use crate::asr::SymbolId;

/// Stable identifier for a [`SymbolTable`], used only for serialization
/// identity (§3.1) -- nothing in the lowering or pass framework compares
/// tables by id for any other reason.
pub type SymbolTableId = Id<SymbolTable>;

/// A per-scope map from name to symbol.
///
/// Lookup is case-insensitive (Fortran identifiers are case-insensitive) but
/// the originally-spelled name is preserved for emission: the map key is the
/// lowercased spelling, while each `Symbol` carries its own display name.
#[derive(Debug)]
pub struct SymbolTable {
    /// `None` only for the global symbol table (invariant 1).
    pub parent: Option<SymbolTableId>,
    /// The ASR node (program/module/function/subroutine/derived-type) that
    /// owns this table, supporting upward walks. `None` only for the global
    /// table, which is owned directly by the `TranslationUnit`.
    pub owner: Option<SymbolId>,
    names: IndexMap<String, SymbolId>,
}

impl SymbolTable {
    #[must_use]
    pub fn new(parent: Option<SymbolTableId>, owner: Option<SymbolId>) -> Self {
        Self {
            parent,
            owner,
            names: IndexMap::new(),
        }
    }

    fn normalize(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Binds `name` to `symbol` in this table, returning the previously
    /// bound symbol (if any) so the caller can apply the "already defined"
    /// rule (§4.2).
    pub fn bind(&mut self, name: &str, symbol: SymbolId) -> Option<SymbolId> {
        self.names.insert(Self::normalize(name), symbol)
    }

    /// Removes `name`'s binding (used by the unused-function pass, §4.3.5).
    /// The symbol's arena slot is untouched; only this table's binding to it
    /// is dropped.
    pub fn unbind(&mut self, name: &str) -> Option<SymbolId> {
        self.names.shift_remove(&Self::normalize(name))
    }

    /// Looks up `name` in this table only (no parent-chain walk).
    #[must_use]
    pub fn get_local(&self, name: &str) -> Option<SymbolId> {
        self.names.get(&Self::normalize(name)).copied()
    }

    #[must_use]
    pub fn contains_local(&self, name: &str) -> bool {
        self.names.contains_key(&Self::normalize(name))
    }

    /// Every symbol bound directly in this table, in declaration order.
    pub fn local_symbols(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.names.iter().map(|(k, &v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::SymbolTable;
    use crate::arena::Id;

    #[test]
    fn lookup_is_case_insensitive_but_preserves_no_spelling_itself() {
        let mut table = SymbolTable::new(None, None);
        let id: Id<_> = Id::from_index(0);
        table.bind("MyVar", id);
        assert_eq!(table.get_local("myvar"), Some(id));
        assert_eq!(table.get_local("MYVAR"), Some(id));
    }

    #[test]
    fn unbind_removes_only_the_binding() {
        let mut table = SymbolTable::new(None, None);
        let id: Id<_> = Id::from_index(0);
        table.bind("x", id);
        assert_eq!(table.unbind("x"), Some(id));
        assert_eq!(table.get_local("x"), None);
    }
}
