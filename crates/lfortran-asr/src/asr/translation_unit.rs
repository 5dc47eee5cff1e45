//! The ASR root and the arena that owns every symbol and symbol table (§3.1,
//! §4.1).
use super::{Stmt, Symbol};
use crate::arena::{Id, Store};
use crate::intern::Interner;
use crate::symbol_table::{SymbolTable, SymbolTableId};

/// Stable reference to a [`Symbol`], valid for the life of the owning
/// [`Arena`].
pub type SymbolId = Id<Symbol>;

/// Owns every `Symbol` and `SymbolTable` for one compilation, plus the
/// string interner (§4.1). Dropping the `TranslationUnit` releases all of it
/// in one step; nothing inside is ever individually freed.
#[derive(Debug, Default)]
pub struct Arena {
    pub symbols: Store<Symbol>,
    pub tables: Store<SymbolTable>,
    pub interner: Interner,
}

impl Arena {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Root node of the ASR (§3.1). Exclusively owns the global symbol table and
/// any top-level orphan statements (the interactive-evaluator flow, before
/// `wrap_global_statements` runs, §4.3.6).
#[derive(Debug)]
pub struct TranslationUnit {
    pub arena: Arena,
    pub global_table: SymbolTableId,
    pub orphan_items: Vec<Stmt>,
}

impl TranslationUnit {
    #[must_use]
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let global_table = arena.tables.alloc(SymbolTable::new(None, None));
        Self {
            arena,
            global_table,
            orphan_items: Vec::new(),
        }
    }

    /// Walks `scope`'s parent chain looking up `name` (case-insensitive).
    #[must_use]
    pub fn resolve(&self, scope: SymbolTableId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let table = self.arena.tables.get(id);
            if let Some(sym) = table.get_local(name) {
                return Some(sym);
            }
            current = table.parent;
        }
        None
    }

    /// Resolves a `Var` target through at most one `ExternalSymbol` hop
    /// (invariant 4), returning the id of the underlying `Variable` symbol.
    #[must_use]
    pub fn resolve_variable(&self, sym: SymbolId) -> Option<SymbolId> {
        match self.arena.symbols.get(sym) {
            Symbol::Variable(_) => Some(sym),
            Symbol::ExternalSymbol(ext) => match ext.external.map(|id| self.arena.symbols.get(id)) {
                Some(Symbol::Variable(_)) => ext.external,
                _ => None,
            },
            _ => None,
        }
    }

    /// Resolves a call callee through at most one `ExternalSymbol` hop to a
    /// `Subroutine`/`Function` symbol id.
    #[must_use]
    pub fn resolve_procedure(&self, sym: SymbolId) -> Option<SymbolId> {
        match self.arena.symbols.get(sym) {
            Symbol::Subroutine(_) | Symbol::Function(_) => Some(sym),
            Symbol::ExternalSymbol(ext) => match ext.external.map(|id| self.arena.symbols.get(id)) {
                Some(s) if s.is_procedure() => ext.external,
                _ => None,
            },
            _ => None,
        }
    }
}

impl Default for TranslationUnit {
    fn default() -> Self {
        Self::new()
    }
}
