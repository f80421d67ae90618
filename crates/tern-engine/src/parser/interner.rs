//! String interning for identifiers and string literals.
//!
//! Interned strings are stored as `Arc<str>` so later stages (IR constants,
//! property keys in shapes) can share them without copying.

use std::sync::Arc;

use rustc_hash::FxHashMap;

/// An interned string symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Deduplicating string store.
#[derive(Debug, Clone, Default)]
pub struct Interner {
    map: FxHashMap<Arc<str>, Symbol>,
    strings: Vec<Arc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            strings: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning the existing symbol when already present.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(&sym) = self.map.get(s) {
            return sym;
        }
        let sym = Symbol(self.strings.len() as u32);
        let shared: Arc<str> = Arc::from(s);
        self.strings.push(shared.clone());
        self.map.insert(shared, sym);
        sym
    }

    /// Resolve a symbol back to its text.
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not produced by this interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.index()]
    }

    /// Resolve a symbol to its shared string.
    #[inline]
    pub fn resolve_arc(&self, sym: Symbol) -> Arc<str> {
        self.strings[sym.index()].clone()
    }

    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.map.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("length");
        let b = interner.intern("length");
        let c = interner.intern("prototype");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.len(), 2);
        assert_eq!(interner.resolve(c), "prototype");
    }

    #[test]
    fn test_resolve_arc_shares_storage() {
        let mut interner = Interner::new();
        let sym = interner.intern("x");
        let first = interner.resolve_arc(sym);
        let second = interner.resolve_arc(sym);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(interner.lookup("x"), Some(sym));
        assert_eq!(interner.lookup("y"), None);
    }
}
