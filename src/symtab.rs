//! Insertion-ordered interning table for grammar symbols.
//!
//! `Symtab` maintains a bidirectional mapping between symbol names and their
//! integer ids, preserving insertion order. The grammar builder relies on
//! this ordering to keep symbol and production numbering dense and stable.

use indexmap::IndexSet;

/// A symbol table mapping strings to numeric indices.
#[derive(Default, Debug, Clone)]
pub struct Symtab {
    set: IndexSet<String>,
}

impl Symtab {
    pub fn new() -> Self {
        Self {
            set: IndexSet::new(),
        }
    }

    /// Adds a symbol, returning its index. Re-adding returns the existing
    /// index.
    pub fn add(&mut self, sym: &str) -> usize {
        self.set.insert_full(sym.to_owned()).0
    }

    /// Looks up the index of a symbol by name.
    pub fn idx(&self, sym: &str) -> Option<usize> {
        self.set.get_index_of(sym)
    }

    /// Returns the symbol string at a given index.
    pub fn sym(&self, idx: usize) -> Option<&str> {
        self.set.get_index(idx).map(|s| s.as_str())
    }

    /// Iterates over all symbols in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.set.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
