//! LL(1) parsing table: the (nonterminal × terminal) grid filled from
//! PREDICT sets.
//!
//! Two productions landing in the same cell mean the grammar is not LL(1);
//! the collision is recorded as a conflict and the lower-numbered
//! production stays in the cell. There is no precedence rescue in LL mode.

use crate::grammar::Grammar;

/// One LL(1) cell collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LlConflict {
    pub nonterminal: usize,
    /// Terminal id.
    pub terminal: usize,
    /// The production left in the cell (lower number).
    pub chosen: usize,
    /// The production that collided with it.
    pub other: usize,
}

/// The LL(1) table: `cells[nonterminal][terminal_index]` is the production
/// to expand, or `None` for an error cell.
#[derive(Debug)]
pub struct LlTable {
    pub cells: Vec<Vec<Option<usize>>>,
    pub conflicts: Vec<LlConflict>,
}

impl LlTable {
    pub fn build(g: &Grammar) -> LlTable {
        let sets = g.sets();
        let mut cells = vec![vec![None; g.n_terminals()]; g.n_nonterminals()];
        let mut conflicts = Vec::new();

        for p in g.productions() {
            for &t in &sets.predict[p.num] {
                let slot = &mut cells[p.lhs][g.terminal_index(t)];
                match *slot {
                    None => *slot = Some(p.num),
                    Some(prev) => {
                        let (chosen, other) = if prev <= p.num {
                            (prev, p.num)
                        } else {
                            (p.num, prev)
                        };
                        conflicts.push(LlConflict {
                            nonterminal: p.lhs,
                            terminal: t,
                            chosen,
                            other,
                        });
                        *slot = Some(chosen);
                    }
                }
            }
        }

        log::debug!(
            "LL table: {} nonterminals, {} collisions",
            g.n_nonterminals(),
            conflicts.len()
        );
        LlTable { cells, conflicts }
    }

    pub fn is_ll1(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Cell for a nonterminal and terminal id.
    pub fn cell(&self, g: &Grammar, nonterminal: usize, terminal: usize) -> Option<usize> {
        self.cells[nonterminal][g.terminal_index(terminal)]
    }
}
