//! FIRST, FOLLOW, and PREDICT set computation.
//!
//! All three are monotone fixed points over finite lattices, computed by
//! worklist iteration. Epsilon membership in FIRST is carried as a separate
//! nullability flag per symbol rather than a sentinel symbol id.

use crate::grammar::Grammar;
use std::collections::BTreeSet;

/// The computed set family for one grammar. Obtained via
/// [`Grammar::sets`], which memoizes the computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sets {
    /// FIRST set per symbol id (for a terminal `t` this is `{t}`).
    pub first: Vec<BTreeSet<usize>>,
    /// True iff the symbol derives the empty string.
    pub nullable: Vec<bool>,
    /// FOLLOW set per nonterminal id.
    pub follow: Vec<BTreeSet<usize>>,
    /// PREDICT set per production number.
    pub predict: Vec<BTreeSet<usize>>,
}

/// FIRST of a symbol string: union of member FIRSTs up to and including the
/// first non-nullable symbol. The bool is true iff the whole string is
/// nullable.
fn first_of_slice(
    seq: &[usize],
    first: &[BTreeSet<usize>],
    nullable: &[bool],
) -> (BTreeSet<usize>, bool) {
    let mut out = BTreeSet::new();
    for &sym in seq {
        out.extend(first[sym].iter().copied());
        if !nullable[sym] {
            return (out, false);
        }
    }
    (out, true)
}

impl Sets {
    pub fn compute(g: &Grammar) -> Sets {
        let n_sym = g.n_symbols();
        let mut first: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_sym];
        let mut nullable = vec![false; n_sym];
        for t in g.terminals() {
            first[t].insert(t);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for p in g.productions() {
                if p.rhs.is_empty() {
                    if !nullable[p.lhs] {
                        nullable[p.lhs] = true;
                        changed = true;
                    }
                    continue;
                }
                let mut all_nullable = true;
                for &sym in &p.rhs {
                    // Snapshot to avoid borrowing first twice.
                    let first_sym = first[sym].clone();
                    for f in first_sym {
                        if first[p.lhs].insert(f) {
                            changed = true;
                        }
                    }
                    if !nullable[sym] {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable && !nullable[p.lhs] {
                    nullable[p.lhs] = true;
                    changed = true;
                }
            }
        }

        let n_nt = g.n_nonterminals();
        let mut follow: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n_nt];
        follow[0].insert(g.eof());
        changed = true;
        while changed {
            changed = false;
            for p in g.productions() {
                for i in 0..p.rhs.len() {
                    let b = p.rhs[i];
                    if !g.is_nonterminal(b) {
                        continue;
                    }
                    let (first_beta, beta_nullable) =
                        first_of_slice(&p.rhs[i + 1..], &first, &nullable);
                    for f in first_beta {
                        if follow[b].insert(f) {
                            changed = true;
                        }
                    }
                    if beta_nullable {
                        let follow_lhs = follow[p.lhs].clone();
                        for f in follow_lhs {
                            if follow[b].insert(f) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }

        let mut predict = Vec::with_capacity(g.productions().len());
        for p in g.productions() {
            let (mut set, rhs_nullable) = first_of_slice(&p.rhs, &first, &nullable);
            if rhs_nullable {
                set.extend(follow[p.lhs].iter().copied());
            }
            predict.push(set);
        }

        log::debug!(
            "sets computed: {} symbols, {} productions",
            n_sym,
            predict.len()
        );
        Sets {
            first,
            nullable,
            follow,
            predict,
        }
    }

    /// FIRST of an arbitrary symbol string, with its nullability.
    pub fn first_of(&self, seq: &[usize]) -> (BTreeSet<usize>, bool) {
        first_of_slice(seq, &self.first, &self.nullable)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::grammar::{Grammar, GrammarDef, Mode, RuleAlt};
    use indexmap::IndexMap;

    /// The LL(1) arithmetic grammar
    /// `E -> T Ep; Ep -> + T Ep | ε; T -> ( E ) | id`.
    pub(crate) fn ll_arith(mode: Mode) -> Grammar {
        let mut bnf = IndexMap::new();
        bnf.insert("E".to_owned(), vec![RuleAlt::new("T Ep")]);
        bnf.insert(
            "Ep".to_owned(),
            vec![RuleAlt::new("+ T Ep"), RuleAlt::new("")],
        );
        bnf.insert("T".to_owned(), vec![RuleAlt::new("( E )"), "id".into()]);
        Grammar::build(GrammarDef {
            bnf,
            mode,
            ..GrammarDef::default()
        })
        .unwrap()
    }

    fn names(g: &Grammar, set: &std::collections::BTreeSet<usize>) -> Vec<String> {
        set.iter().map(|&id| g.name(id).to_owned()).collect()
    }

    #[test]
    fn first_sets_of_ll_arithmetic() {
        let g = ll_arith(Mode::Ll1);
        let sets = g.sets();
        let e_id = 1; // E is the first user nonterminal
        assert_eq!(names(&g, &sets.first[e_id]), vec!["(", "id"]);
        let ep_id = 2;
        assert_eq!(names(&g, &sets.first[ep_id]), vec!["+"]);
        assert!(sets.nullable[ep_id]);
        assert!(!sets.nullable[e_id]);
    }

    #[test]
    fn follow_sets_of_ll_arithmetic() {
        let g = ll_arith(Mode::Ll1);
        let sets = g.sets();
        let ep_id = 2;
        assert_eq!(names(&g, &sets.follow[ep_id]), vec![")", "$"]);
        // FOLLOW of the start symbol contains $.
        assert!(sets.follow[g.start_symbol()].contains(&g.eof()));
        assert!(sets.follow[0].contains(&g.eof()));
    }

    #[test]
    fn predict_of_nullable_production_includes_follow() {
        let g = ll_arith(Mode::Ll1);
        let sets = g.sets();
        for p in g.productions() {
            let (_, rhs_nullable) = sets.first_of(&p.rhs);
            if rhs_nullable {
                assert!(
                    sets.predict[p.num].is_superset(&sets.follow[p.lhs]),
                    "PREDICT({}) must cover FOLLOW({})",
                    g.production_text(p.num),
                    g.name(p.lhs)
                );
            }
        }
    }

    #[test]
    fn terminal_first_is_itself() {
        let g = ll_arith(Mode::Ll1);
        let sets = g.sets();
        for t in g.terminals() {
            assert_eq!(sets.first[t].len(), 1);
            assert!(sets.first[t].contains(&t));
            assert!(!sets.nullable[t]);
        }
    }

    #[test]
    fn chained_nullability_propagates() {
        // S -> A B; A -> ε; B -> ε  makes S nullable.
        let mut bnf = IndexMap::new();
        bnf.insert("S".to_owned(), vec![RuleAlt::new("A B")]);
        bnf.insert("A".to_owned(), vec![RuleAlt::new("")]);
        bnf.insert("B".to_owned(), vec![RuleAlt::new("")]);
        let g = Grammar::build(GrammarDef {
            bnf,
            mode: Mode::Slr1,
            ..GrammarDef::default()
        })
        .unwrap();
        let sets = g.sets();
        for id in 1..g.n_nonterminals() {
            assert!(sets.nullable[id], "{} should be nullable", g.name(id));
        }
    }

    #[test]
    fn first_of_sequence_stops_at_non_nullable() {
        let g = ll_arith(Mode::Ll1);
        let sets = g.sets();
        let t = 3; // T
        let ep = 2; // Ep
        let (set, nullable) = sets.first_of(&[ep, t]);
        // FIRST(Ep T) = FIRST(Ep) ∪ FIRST(T), since Ep is nullable.
        assert!(!nullable);
        let names: Vec<_> = set.iter().map(|&id| g.name(id)).collect();
        assert_eq!(names, vec!["+", "(", "id"]);
    }
}
