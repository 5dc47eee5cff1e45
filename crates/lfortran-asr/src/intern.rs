//! String interning for identifiers and literal text.
//!
//! Grounded on `intern.rs` in the teacher: a `Copy` id indexing into owned
//! storage, deduplicated on insert via a side hash map so repeat interning of
//! the same spelling is free.
use ahash::AHashMap;

/// Index into an [`Interner`]'s storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringId(u32);

impl StringId {
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub fn from_index(index: u32) -> Self {
        Self(index)
    }
}

/// Owns every interned string for one `TranslationUnit`.
///
/// Case is preserved exactly as interned; case-insensitive identifier lookup
/// is a property of [`crate::symbol_table::SymbolTable`], not of the
/// interner itself -- two differently-cased spellings of the same
/// identifier intern to two different ids, and the symbol table normalizes
/// at lookup time.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: AHashMap<Box<str>, StringId>,
}

impl Interner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = StringId(u32::try_from(self.strings.len()).expect("too many interned strings"));
        let boxed: Box<str> = s.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, id);
        id
    }

    #[must_use]
    pub fn get(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::Interner;

    #[test]
    fn identical_strings_share_an_id() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        assert_eq!(interner.get(a), "foo");
    }

    #[test]
    fn distinct_strings_get_distinct_ids() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("bar");
        assert_ne!(a, b);
    }
}
