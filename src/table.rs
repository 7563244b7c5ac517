//! LR parsing table: ACTION/GOTO projection of the canonical collection,
//! conflict detection, and precedence-based resolution.
//!
//! Reduce lookaheads come from the item lookaheads (CLR/LALR), FOLLOW
//! (SLR), or the whole terminal set (LR(0)). Precedence and associativity
//! always apply; the default rules (shift over reduce, lowest production
//! number) only apply when conflict resolution is enabled. Every conflict
//! is recorded, resolved or not.

use crate::collection::Collection;
use crate::grammar::{Assoc, Grammar, Mode};
use std::collections::BTreeSet;

/// One parser action. `Ord` keeps shifts before reduces so composite
/// encodings read `s5/r3`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LrAction {
    Shift(usize),
    Reduce(usize),
    Accept,
}

/// A resolved ACTION cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Entry(LrAction),
    /// Equal precedence with nonassoc: any input reaching this cell is a
    /// parse error.
    NonassocError,
    /// Competing actions left standing, in sorted order.
    Unresolved(Vec<LrAction>),
}

impl std::fmt::Display for LrAction {
    /// Canonical single-character-tag encoding: `s5`, `r3`, `acc`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LrAction::Shift(s) => write!(f, "s{s}"),
            LrAction::Reduce(p) => write!(f, "r{p}"),
            LrAction::Accept => write!(f, "acc"),
        }
    }
}

impl Cell {
    /// Canonical cell encoding: empty for error cells, the action tag
    /// otherwise, slash-separated composites for unresolved conflicts.
    pub fn encode(&self) -> String {
        match self {
            Cell::Empty | Cell::NonassocError => String::new(),
            Cell::Entry(a) => a.to_string(),
            Cell::Unresolved(entries) => entries
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join("/"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResolvedBy {
    Precedence,
    Associativity,
    Nonassoc,
    Default,
    Unresolved,
}

/// Record of one table conflict: where, what competed, and how (or
/// whether) it was settled.
#[derive(Clone, Debug)]
pub struct Conflict {
    pub state: usize,
    /// Terminal id the competing actions share.
    pub symbol: usize,
    pub kind: ConflictKind,
    pub entries: Vec<LrAction>,
    pub resolved_by: ResolvedBy,
}

/// The LR parsing table. ACTION rows are indexed by state and terminal
/// column (`Grammar::terminal_index`), GOTO rows by state and nonterminal
/// id; a cell belongs to exactly one of the two.
#[derive(Debug)]
pub struct LrTable {
    pub mode: Mode,
    pub actions: Vec<Vec<Cell>>,
    pub gotos: Vec<Vec<Option<usize>>>,
    pub conflicts: Vec<Conflict>,
}

impl LrTable {
    pub fn build(g: &Grammar, coll: &Collection, resolve: bool) -> LrTable {
        let n_states = coll.states.len();
        let n_terms = g.n_terminals();
        let n_nt = g.n_nonterminals();

        let mut raw: Vec<Vec<BTreeSet<LrAction>>> =
            vec![vec![BTreeSet::new(); n_terms]; n_states];
        let mut gotos = vec![vec![None; n_nt]; n_states];

        for (&(s, sym), &t) in &coll.transitions {
            if g.is_terminal(sym) {
                raw[s][g.terminal_index(sym)].insert(LrAction::Shift(t));
            } else {
                gotos[s][sym] = Some(t);
            }
        }

        let sets = g.sets();
        for (s, state) in coll.states.iter().enumerate() {
            for (core, la) in state.iter() {
                let p = &g.productions()[core.prod];
                if core.dot != p.rhs.len() {
                    continue;
                }
                if core.prod == 0 {
                    raw[s][g.terminal_index(g.eof())].insert(LrAction::Accept);
                    continue;
                }
                match g.mode() {
                    Mode::Lr0 => {
                        for t in g.terminals() {
                            raw[s][g.terminal_index(t)].insert(LrAction::Reduce(core.prod));
                        }
                    }
                    Mode::Slr1 => {
                        for &t in &sets.follow[p.lhs] {
                            raw[s][g.terminal_index(t)].insert(LrAction::Reduce(core.prod));
                        }
                    }
                    _ => {
                        for &t in la {
                            raw[s][g.terminal_index(t)].insert(LrAction::Reduce(core.prod));
                        }
                    }
                }
            }
        }

        let mut conflicts = Vec::new();
        let mut actions = Vec::with_capacity(n_states);
        for (s, row) in raw.into_iter().enumerate() {
            let mut out = Vec::with_capacity(n_terms);
            for (ti, cell) in row.into_iter().enumerate() {
                out.push(resolve_cell(
                    g,
                    s,
                    n_nt + ti,
                    cell,
                    resolve,
                    &mut conflicts,
                ));
            }
            actions.push(out);
        }

        log::debug!(
            "LR table: {} states, {} conflicts ({} unresolved)",
            n_states,
            conflicts.len(),
            conflicts
                .iter()
                .filter(|c| c.resolved_by == ResolvedBy::Unresolved)
                .count()
        );
        LrTable {
            mode: g.mode(),
            actions,
            gotos,
            conflicts,
        }
    }

    /// ACTION cell for a state and terminal id.
    pub fn action(&self, g: &Grammar, state: usize, terminal: usize) -> &Cell {
        &self.actions[state][g.terminal_index(terminal)]
    }

    pub fn goto_of(&self, state: usize, nonterminal: usize) -> Option<usize> {
        self.gotos[state][nonterminal]
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts
            .iter()
            .filter(|c| c.resolved_by == ResolvedBy::Unresolved)
    }

    pub fn has_unresolved(&self) -> bool {
        self.unresolved().next().is_some()
    }
}

fn resolve_cell(
    g: &Grammar,
    state: usize,
    terminal: usize,
    set: BTreeSet<LrAction>,
    resolve: bool,
    conflicts: &mut Vec<Conflict>,
) -> Cell {
    if set.is_empty() {
        return Cell::Empty;
    }
    if set.len() == 1 {
        if let Some(&only) = set.iter().next() {
            return Cell::Entry(only);
        }
        return Cell::Empty;
    }

    let entries: Vec<LrAction> = set.iter().copied().collect();
    let shifts: Vec<usize> = entries
        .iter()
        .filter_map(|a| match a {
            LrAction::Shift(s) => Some(*s),
            _ => None,
        })
        .collect();
    let reduces: Vec<usize> = entries
        .iter()
        .filter_map(|a| match a {
            LrAction::Reduce(p) => Some(*p),
            _ => None,
        })
        .collect();

    // Accept competing with anything is malformed input to resolution.
    if entries.contains(&LrAction::Accept) || shifts.len() > 1 {
        conflicts.push(Conflict {
            state,
            symbol: terminal,
            kind: ConflictKind::ShiftReduce,
            entries: entries.clone(),
            resolved_by: ResolvedBy::Unresolved,
        });
        return Cell::Unresolved(entries);
    }

    // Reduce-reduce first; the survivor may still face a shift.
    let reduce_prod = reduces[0];
    if reduces.len() > 1 {
        let resolved_by = if resolve {
            ResolvedBy::Default
        } else {
            ResolvedBy::Unresolved
        };
        conflicts.push(Conflict {
            state,
            symbol: terminal,
            kind: ConflictKind::ReduceReduce,
            entries: reduces.iter().map(|&p| LrAction::Reduce(p)).collect(),
            resolved_by,
        });
        if !resolve {
            return Cell::Unresolved(entries);
        }
    }

    if shifts.is_empty() {
        // Pure reduce-reduce, already recorded; lowest number wins.
        return Cell::Entry(LrAction::Reduce(reduce_prod));
    }

    let shift_state = shifts[0];
    let sr_entries = vec![LrAction::Shift(shift_state), LrAction::Reduce(reduce_prod)];
    let prod = &g.productions()[reduce_prod];
    match (g.production_prec(prod), g.operator_of(terminal)) {
        (Some((pp, _)), Some(tp)) => {
            if pp.level > tp.level {
                conflicts.push(Conflict {
                    state,
                    symbol: terminal,
                    kind: ConflictKind::ShiftReduce,
                    entries: sr_entries,
                    resolved_by: ResolvedBy::Precedence,
                });
                Cell::Entry(LrAction::Reduce(reduce_prod))
            } else if pp.level < tp.level {
                conflicts.push(Conflict {
                    state,
                    symbol: terminal,
                    kind: ConflictKind::ShiftReduce,
                    entries: sr_entries,
                    resolved_by: ResolvedBy::Precedence,
                });
                Cell::Entry(LrAction::Shift(shift_state))
            } else {
                match pp.assoc {
                    Assoc::Left => {
                        conflicts.push(Conflict {
                            state,
                            symbol: terminal,
                            kind: ConflictKind::ShiftReduce,
                            entries: sr_entries,
                            resolved_by: ResolvedBy::Associativity,
                        });
                        Cell::Entry(LrAction::Reduce(reduce_prod))
                    }
                    Assoc::Right => {
                        conflicts.push(Conflict {
                            state,
                            symbol: terminal,
                            kind: ConflictKind::ShiftReduce,
                            entries: sr_entries,
                            resolved_by: ResolvedBy::Associativity,
                        });
                        Cell::Entry(LrAction::Shift(shift_state))
                    }
                    Assoc::Nonassoc => {
                        conflicts.push(Conflict {
                            state,
                            symbol: terminal,
                            kind: ConflictKind::ShiftReduce,
                            entries: sr_entries,
                            resolved_by: ResolvedBy::Nonassoc,
                        });
                        Cell::NonassocError
                    }
                }
            }
        }
        _ => {
            if resolve {
                conflicts.push(Conflict {
                    state,
                    symbol: terminal,
                    kind: ConflictKind::ShiftReduce,
                    entries: sr_entries,
                    resolved_by: ResolvedBy::Default,
                });
                Cell::Entry(LrAction::Shift(shift_state))
            } else {
                conflicts.push(Conflict {
                    state,
                    symbol: terminal,
                    kind: ConflictKind::ShiftReduce,
                    entries: sr_entries,
                    resolved_by: ResolvedBy::Unresolved,
                });
                Cell::Unresolved(entries)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::collection::tests::cc_grammar;
    use crate::collection::Collection;
    use crate::grammar::tests::additive_def;
    use crate::grammar::{Grammar, GrammarDef, Mode, RuleAlt};
    use indexmap::IndexMap;

    pub(crate) fn dangling_else(mode: Mode) -> Grammar {
        let mut bnf = IndexMap::new();
        bnf.insert(
            "S".to_owned(),
            vec![
                RuleAlt::new("if E then S"),
                RuleAlt::new("if E then S else S"),
                RuleAlt::new("x"),
            ],
        );
        Grammar::build(GrammarDef {
            bnf,
            mode,
            ..GrammarDef::default()
        })
        .unwrap()
    }

    #[test]
    fn additive_grammar_has_four_shift_reduce_conflicts_all_settled() {
        let g = Grammar::build(additive_def(Mode::Lalr1BySlr1)).unwrap();
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);

        assert_eq!(table.conflicts.len(), 4);
        assert!(table
            .conflicts
            .iter()
            .all(|c| c.kind == ConflictKind::ShiftReduce));
        assert!(!table.has_unresolved());

        let by_resolution = |r: ResolvedBy| {
            table
                .conflicts
                .iter()
                .filter(|c| c.resolved_by == r)
                .count()
        };
        assert_eq!(by_resolution(ResolvedBy::Precedence), 2);
        assert_eq!(by_resolution(ResolvedBy::Associativity), 2);
    }

    #[test]
    fn equal_precedence_left_assoc_reduces() {
        let g = Grammar::build(additive_def(Mode::Lalr1BySlr1)).unwrap();
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        let plus = g.terminal_id("+").unwrap();
        let star = g.terminal_id("*").unwrap();

        // Find the state holding E -> E + E · (production 1, dot 3).
        let s = coll
            .states
            .iter()
            .position(|st| st.contains_core(&crate::item::ItemCore::new(1, 3)))
            .unwrap();
        assert!(matches!(
            table.action(&g, s, plus),
            Cell::Entry(LrAction::Reduce(1))
        ));
        // Lower-precedence production shifts the higher-precedence token.
        assert!(matches!(
            table.action(&g, s, star),
            Cell::Entry(LrAction::Shift(_))
        ));
    }

    #[test]
    fn nonassoc_equal_precedence_forces_error_cell() {
        let mut def = additive_def(Mode::Lalr1BySlr1);
        def.operators[0].assoc = crate::grammar::Assoc::Nonassoc;
        let g = Grammar::build(def).unwrap();
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        let plus = g.terminal_id("+").unwrap();
        let s = coll
            .states
            .iter()
            .position(|st| st.contains_core(&crate::item::ItemCore::new(1, 3)))
            .unwrap();
        assert_eq!(table.action(&g, s, plus), &Cell::NonassocError);
        assert!(table
            .conflicts
            .iter()
            .any(|c| c.resolved_by == ResolvedBy::Nonassoc));
        assert!(!table.has_unresolved());
    }

    #[test]
    fn dangling_else_shift_reduce_defaults_to_shift() {
        let g = dangling_else(Mode::Slr1);
        let coll = Collection::build(&g);

        let unresolved = LrTable::build(&g, &coll, false);
        assert_eq!(unresolved.conflicts.len(), 1);
        let c = &unresolved.conflicts[0];
        assert_eq!(c.kind, ConflictKind::ShiftReduce);
        assert_eq!(g.name(c.symbol), "else");
        assert_eq!(c.resolved_by, ResolvedBy::Unresolved);
        assert!(matches!(
            unresolved.actions[c.state][g.terminal_index(c.symbol)],
            Cell::Unresolved(_)
        ));

        let resolved = LrTable::build(&g, &coll, true);
        assert_eq!(resolved.conflicts.len(), 1);
        assert_eq!(resolved.conflicts[0].resolved_by, ResolvedBy::Default);
        assert!(matches!(
            resolved.actions[c.state][g.terminal_index(c.symbol)],
            Cell::Entry(LrAction::Shift(_))
        ));
    }

    #[test]
    fn reduce_reduce_on_empty_productions_prefers_lower_number() {
        // S -> A | B; A -> ε; B -> ε
        let mut bnf = IndexMap::new();
        bnf.insert("S".to_owned(), vec![RuleAlt::new("A"), RuleAlt::new("B")]);
        bnf.insert("A".to_owned(), vec![RuleAlt::new("")]);
        bnf.insert("B".to_owned(), vec![RuleAlt::new("")]);
        let g = Grammar::build(GrammarDef {
            bnf,
            mode: Mode::Slr1,
            ..GrammarDef::default()
        })
        .unwrap();
        let coll = Collection::build(&g);

        let unresolved = LrTable::build(&g, &coll, false);
        assert_eq!(unresolved.conflicts.len(), 1);
        let c = &unresolved.conflicts[0];
        assert_eq!(c.kind, ConflictKind::ReduceReduce);
        assert_eq!(c.symbol, g.eof());
        assert_eq!(c.resolved_by, ResolvedBy::Unresolved);

        let resolved = LrTable::build(&g, &coll, true);
        assert_eq!(resolved.conflicts.len(), 1);
        assert_eq!(resolved.conflicts[0].resolved_by, ResolvedBy::Default);
        // A -> ε is production 3, B -> ε is production 4.
        let cell = &resolved.actions[c.state][g.terminal_index(g.eof())];
        assert_eq!(cell, &Cell::Entry(LrAction::Reduce(3)));
    }

    #[test]
    fn accept_sits_at_eof_of_the_accept_state() {
        let g = cc_grammar(Mode::Slr1);
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        let acc = coll.accept_state().unwrap();
        assert_eq!(
            table.action(&g, acc, g.eof()),
            &Cell::Entry(LrAction::Accept)
        );
    }

    #[test]
    fn action_and_goto_partition_the_symbols() {
        let g = cc_grammar(Mode::Lalr1BySlr1);
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        for (&(s, sym), &t) in &coll.transitions {
            if g.is_terminal(sym) {
                assert!(matches!(
                    table.action(&g, s, sym),
                    Cell::Entry(LrAction::Shift(ts)) if *ts == t
                ));
            } else {
                assert_eq!(table.goto_of(s, sym), Some(t));
            }
        }
    }

    #[test]
    fn both_lalr_routes_agree_modulo_state_numbering() {
        let g_slr = cc_grammar(Mode::Lalr1BySlr1);
        let g_clr = cc_grammar(Mode::Lalr1ByClr1);
        let coll_slr = Collection::build(&g_slr);
        let coll_clr = Collection::build(&g_clr);
        assert_eq!(coll_slr.len(), coll_clr.len());

        // Correspond states by their cores.
        let mut map = vec![usize::MAX; coll_slr.len()];
        for (i, st) in coll_slr.states.iter().enumerate() {
            let cores = st.cores();
            let j = coll_clr
                .states
                .iter()
                .position(|other| other.cores() == cores)
                .expect("matching LALR state");
            map[i] = j;
        }

        let t_slr = LrTable::build(&g_slr, &coll_slr, true);
        let t_clr = LrTable::build(&g_clr, &coll_clr, true);
        for (i, row) in t_slr.actions.iter().enumerate() {
            for (ti, cell) in row.iter().enumerate() {
                let other = &t_clr.actions[map[i]][ti];
                match (cell, other) {
                    (Cell::Entry(LrAction::Shift(a)), Cell::Entry(LrAction::Shift(b))) => {
                        assert_eq!(map[*a], *b);
                    }
                    (a, b) => assert_eq!(a, b, "state {i} terminal {ti}"),
                }
            }
        }
    }
}
