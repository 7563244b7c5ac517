//! LR items and item sets.
//!
//! An item is a production with a dot position; a state is a set of items
//! closed under closure. Lookaheads are stored per item core so that a
//! CLR-style state merges duplicate cores instead of multiplying items.

use std::collections::{btree_map, BTreeMap, BTreeSet};

/// The core of an LR item: production number and dot position in
/// `[0, |rhs|]`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct ItemCore {
    pub prod: usize,
    pub dot: usize,
}

impl ItemCore {
    pub const fn new(prod: usize, dot: usize) -> Self {
        Self { prod, dot }
    }
}

/// Lookahead terminal ids of one item. Empty in the modes that ignore
/// lookaheads.
pub type Lookahead = BTreeSet<usize>;

/// A set of LR items with per-core lookaheads, value-equal on its full
/// contents (cores and lookaheads).
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ItemSet {
    items: BTreeMap<ItemCore, Lookahead>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an item, unioning lookaheads for an existing core. Returns
    /// true if the set changed.
    pub fn insert(&mut self, core: ItemCore, la: Lookahead) -> bool {
        match self.items.entry(core) {
            btree_map::Entry::Vacant(v) => {
                v.insert(la);
                true
            }
            btree_map::Entry::Occupied(mut o) => {
                let before = o.get().len();
                o.get_mut().extend(la);
                o.get().len() > before
            }
        }
    }

    /// Replaces the lookahead of an existing core (LALR-by-SLR post-hoc
    /// attachment). No-op for an absent core.
    pub fn set_lookahead(&mut self, core: ItemCore, la: Lookahead) {
        if let Some(slot) = self.items.get_mut(&core) {
            *slot = la;
        }
    }

    pub fn lookahead(&self, core: &ItemCore) -> Option<&Lookahead> {
        self.items.get(core)
    }

    pub fn contains_core(&self, core: &ItemCore) -> bool {
        self.items.contains_key(core)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ItemCore, &Lookahead)> {
        self.items.iter()
    }

    /// All item cores, ignoring lookaheads.
    pub fn cores(&self) -> BTreeSet<ItemCore> {
        self.items.keys().copied().collect()
    }

    /// Kernel cores: dot not at position 0, plus the start item.
    pub fn kernel(&self) -> BTreeSet<ItemCore> {
        self.items
            .keys()
            .filter(|c| c.dot > 0 || c.prod == 0)
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_unions_lookaheads_for_same_core() {
        let mut s = ItemSet::new();
        let core = ItemCore::new(1, 0);
        assert!(s.insert(core, BTreeSet::from([4])));
        assert!(s.insert(core, BTreeSet::from([5])));
        assert!(!s.insert(core, BTreeSet::from([4, 5])));
        assert_eq!(s.len(), 1);
        assert_eq!(s.lookahead(&core).unwrap().len(), 2);
    }

    #[test]
    fn value_equality_includes_lookaheads() {
        let mut a = ItemSet::new();
        let mut b = ItemSet::new();
        a.insert(ItemCore::new(1, 1), BTreeSet::from([4]));
        b.insert(ItemCore::new(1, 1), BTreeSet::from([5]));
        assert_ne!(a, b);
        assert_eq!(a.cores(), b.cores());
    }

    #[test]
    fn kernel_excludes_closure_items_but_keeps_start() {
        let mut s = ItemSet::new();
        s.insert(ItemCore::new(0, 0), Lookahead::new());
        s.insert(ItemCore::new(2, 0), Lookahead::new());
        s.insert(ItemCore::new(3, 1), Lookahead::new());
        let kernel = s.kernel();
        assert!(kernel.contains(&ItemCore::new(0, 0)));
        assert!(!kernel.contains(&ItemCore::new(2, 0)));
        assert!(kernel.contains(&ItemCore::new(3, 1)));
    }
}
