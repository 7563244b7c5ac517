//! The canonical collection: the DFA of item sets built by closure and
//! GOTO under the chosen mode.
//!
//! State 0 is the closure of the start item; the worklist unifies each
//! GOTO result with an existing state (full equality for CLR(1), which in
//! the lookahead-free modes degenerates to kernel equality) or allocates
//! the next dense id. LALR(1)-by-CLR(1) builds the CLR collection first and
//! merges states whose cores match; LALR(1)-by-SLR(1) closes the LR(0) DFA
//! and then attaches FOLLOW lookaheads to every reduce item.

use crate::grammar::{Grammar, Mode};
use crate::item::{ItemCore, ItemSet, Lookahead};
use crate::sets::Sets;
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The canonical collection of item sets plus the goto map
/// `(state, symbol) -> state`.
#[derive(Debug, Clone)]
pub struct Collection {
    pub states: Vec<ItemSet>,
    pub transitions: BTreeMap<(usize, usize), usize>,
}

fn clr_lookaheads(mode: Mode) -> bool {
    matches!(mode, Mode::Clr1 | Mode::Lalr1ByClr1)
}

/// Closure: for every item with the dot before a nonterminal `B`, add
/// `B`-productions at dot 0. In the CLR modes the added lookahead is
/// `FIRST(β a)` of the source item `(A -> α·Bβ, a)`.
fn close(g: &Grammar, sets: &Sets, mode: Mode, set: &mut ItemSet) {
    let clr = clr_lookaheads(mode);
    let mut changed = true;
    while changed {
        changed = false;
        let snapshot: Vec<(ItemCore, Lookahead)> =
            set.iter().map(|(c, la)| (*c, la.clone())).collect();
        for (core, la) in snapshot {
            let p = &g.productions()[core.prod];
            if core.dot >= p.rhs.len() {
                continue;
            }
            let b = p.rhs[core.dot];
            if !g.is_nonterminal(b) {
                continue;
            }
            let new_la = if clr {
                let (mut f, beta_nullable) = sets.first_of(&p.rhs[core.dot + 1..]);
                if beta_nullable {
                    f.extend(la.iter().copied());
                }
                f
            } else {
                Lookahead::new()
            };
            for &pn in g.productions_for(b) {
                if set.insert(ItemCore::new(pn, 0), new_la.clone()) {
                    changed = true;
                }
            }
        }
    }
}

/// GOTO: advance the dot over `sym` in every applicable item, then close.
fn goto_set(g: &Grammar, sets: &Sets, mode: Mode, set: &ItemSet, sym: usize) -> ItemSet {
    let mut moved = ItemSet::new();
    for (core, la) in set.iter() {
        let p = &g.productions()[core.prod];
        if core.dot < p.rhs.len() && p.rhs[core.dot] == sym {
            moved.insert(ItemCore::new(core.prod, core.dot + 1), la.clone());
        }
    }
    if !moved.is_empty() {
        close(g, sets, mode, &mut moved);
    }
    moved
}

fn build_canonical(g: &Grammar, mode: Mode) -> Collection {
    let sets = g.sets();
    let mut start = ItemSet::new();
    let start_la = if clr_lookaheads(mode) {
        BTreeSet::from([g.eof()])
    } else {
        Lookahead::new()
    };
    start.insert(ItemCore::new(0, 0), start_la);
    close(g, sets, mode, &mut start);

    let mut states = vec![start.clone()];
    let mut index: HashMap<ItemSet, usize> = HashMap::new();
    index.insert(start, 0);
    let mut transitions = BTreeMap::new();

    let mut i = 0;
    while i < states.len() {
        for sym in 1..g.n_symbols() {
            let nxt = goto_set(g, sets, mode, &states[i], sym);
            if nxt.is_empty() {
                continue;
            }
            let id = match index.get(&nxt) {
                Some(&id) => id,
                None => {
                    let id = states.len();
                    states.push(nxt.clone());
                    index.insert(nxt, id);
                    id
                }
            };
            transitions.insert((i, sym), id);
        }
        i += 1;
    }
    log::debug!("canonical collection: {} states ({})", states.len(), mode.as_str());
    Collection {
        states,
        transitions,
    }
}

/// Merge CLR(1) states whose cores match, unioning per-item lookaheads.
/// Merged ids follow the first occurrence of each core set.
fn merge_by_cores(clr: Collection) -> Collection {
    let mut groups: IndexMap<BTreeSet<ItemCore>, usize> = IndexMap::new();
    let mut map = vec![0usize; clr.states.len()];
    let mut merged: Vec<ItemSet> = Vec::new();

    for (old_id, state) in clr.states.iter().enumerate() {
        let key = state.cores();
        let new_id = match groups.get(&key) {
            Some(&id) => id,
            None => {
                let id = merged.len();
                groups.insert(key, id);
                merged.push(ItemSet::new());
                id
            }
        };
        map[old_id] = new_id;
        for (core, la) in state.iter() {
            merged[new_id].insert(*core, la.clone());
        }
    }

    let mut transitions = BTreeMap::new();
    for ((s, sym), t) in clr.transitions {
        transitions.insert((map[s], sym), map[t]);
    }
    Collection {
        states: merged,
        transitions,
    }
}

/// Attach FOLLOW(lhs) to every reduce item of an LR(0) collection
/// (the LALR(1)-by-SLR(1) route).
fn attach_follow(g: &Grammar, coll: &mut Collection) {
    let follow = g.sets().follow.clone();
    for state in &mut coll.states {
        let finished: Vec<ItemCore> = state
            .iter()
            .filter(|(core, _)| core.dot == g.productions()[core.prod].rhs.len())
            .map(|(core, _)| *core)
            .collect();
        for core in finished {
            let lhs = g.productions()[core.prod].lhs;
            state.set_lookahead(core, follow[lhs].clone());
        }
    }
}

impl Collection {
    /// Builds the collection for the grammar's mode.
    pub fn build(g: &Grammar) -> Collection {
        match g.mode() {
            Mode::Lalr1ByClr1 => merge_by_cores(build_canonical(g, Mode::Lalr1ByClr1)),
            Mode::Lalr1BySlr1 => {
                let mut coll = build_canonical(g, Mode::Lalr1BySlr1);
                attach_follow(g, &mut coll);
                coll
            }
            mode => build_canonical(g, mode),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The state holding the finished start item `$accept -> S ·`.
    pub fn accept_state(&self) -> Option<usize> {
        self.states
            .iter()
            .position(|s| s.contains_core(&ItemCore::new(0, 1)))
    }

    pub fn goto(&self, state: usize, sym: usize) -> Option<usize> {
        self.transitions.get(&(state, sym)).copied()
    }
}
