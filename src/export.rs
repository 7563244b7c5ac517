//! Structured export of the finished grammar, sets, collection, and
//! tables, plus the human-readable diagnostic printers.
//!
//! Everything here iterates vectors and ordered maps only, so the export
//! is byte-stable for identical input. Action cells use the canonical
//! `s`/`r`/`acc`/`g` encoding; semantic-action bodies pass through
//! verbatim.

use crate::collection::Collection;
use crate::grammar::Grammar;
use crate::item::{ItemCore, Lookahead};
use crate::lltable::LlTable;
use crate::table::{ConflictKind, LrTable, ResolvedBy};
use std::io::{self, Write};

/// Which set family a diagnostic printout should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetsSelect {
    All,
    First,
    Follow,
    Predict,
}

impl std::str::FromStr for SetsSelect {
    type Err = crate::error::PartabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(SetsSelect::All),
            "first" => Ok(SetsSelect::First),
            "follow" => Ok(SetsSelect::Follow),
            "predict" => Ok(SetsSelect::Predict),
            other => Err(crate::error::PartabError::invalid_grammar(format!(
                "unknown sets selector {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionExport {
    pub num: usize,
    pub lhs: String,
    pub rhs: Vec<String>,
    /// Semantic-action body, verbatim.
    pub action: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateExport {
    pub id: usize,
    pub items: Vec<String>,
}

/// The full deterministic snapshot handed to target-language renderers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Export {
    pub mode: String,
    pub nonterminals: Vec<String>,
    pub terminals: Vec<String>,
    pub productions: Vec<ProductionExport>,
    pub states: Vec<StateExport>,
    /// Encoded ACTION cells, state-major over terminal columns.
    pub action: Vec<Vec<String>>,
    /// Encoded GOTO cells (`g3` or empty), state-major over nonterminals.
    pub goto: Vec<Vec<String>>,
    /// LL cells as production numbers (empty string = error cell).
    pub ll: Vec<Vec<String>>,
    pub first: Vec<(String, Vec<String>)>,
    pub follow: Vec<(String, Vec<String>)>,
    pub predict: Vec<(String, Vec<String>)>,
    pub conflicts: Vec<String>,
}

fn item_text(g: &Grammar, core: &ItemCore, la: &Lookahead) -> String {
    let p = &g.productions()[core.prod];
    let mut rhs: Vec<String> = Vec::with_capacity(p.rhs.len() + 1);
    for (i, &sym) in p.rhs.iter().enumerate() {
        if i == core.dot {
            rhs.push(".".to_owned());
        }
        rhs.push(g.name(sym).to_owned());
    }
    if core.dot == p.rhs.len() {
        rhs.push(".".to_owned());
    }
    let mut out = format!("{} -> {}", g.name(p.lhs), rhs.join(" "));
    if !la.is_empty() {
        let names: Vec<&str> = la.iter().map(|&t| g.name(t)).collect();
        out.push_str(&format!(" [{}]", names.join(", ")));
    }
    out
}

fn set_names(g: &Grammar, set: &std::collections::BTreeSet<usize>, nullable: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(set.len() + 1);
    if nullable {
        out.push("ε".to_owned());
    }
    out.extend(set.iter().map(|&id| g.name(id).to_owned()));
    out
}

/// One conflict, rendered: the competing entries, the lookahead symbol,
/// and how the conflict was settled.
pub fn conflict_text(g: &Grammar, c: &crate::table::Conflict) -> String {
    let entries = c
        .entries
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join("/");
    let kind = match c.kind {
        ConflictKind::ShiftReduce => "shift-reduce",
        ConflictKind::ReduceReduce => "reduce-reduce",
    };
    let resolved = match c.resolved_by {
        ResolvedBy::Precedence => "resolved by precedence",
        ResolvedBy::Associativity => "resolved by associativity",
        ResolvedBy::Nonassoc => "nonassoc (error cell)",
        ResolvedBy::Default => "resolved by default",
        ResolvedBy::Unresolved => "unresolved",
    };
    format!(
        "state {} on {:?}: {kind} ({entries}) {resolved}",
        c.state,
        g.name(c.symbol)
    )
}

impl Export {
    fn base(g: &Grammar) -> Export {
        let sets = g.sets();
        let nonterminals: Vec<String> = g.nonterminals().map(|id| g.name(id).to_owned()).collect();
        let terminals: Vec<String> = g.terminals().map(|id| g.name(id).to_owned()).collect();
        let productions = g
            .productions()
            .iter()
            .map(|p| ProductionExport {
                num: p.num,
                lhs: g.name(p.lhs).to_owned(),
                rhs: p.rhs.iter().map(|&id| g.name(id).to_owned()).collect(),
                action: p.action.clone(),
                text: g.production_text(p.num),
            })
            .collect();
        let first = g
            .nonterminals()
            .map(|id| {
                (
                    g.name(id).to_owned(),
                    set_names(g, &sets.first[id], sets.nullable[id]),
                )
            })
            .collect();
        let follow = g
            .nonterminals()
            .map(|id| (g.name(id).to_owned(), set_names(g, &sets.follow[id], false)))
            .collect();
        let predict = g
            .productions()
            .iter()
            .map(|p| {
                (
                    g.production_text(p.num),
                    set_names(g, &sets.predict[p.num], false),
                )
            })
            .collect();
        Export {
            mode: g.mode().as_str().to_owned(),
            nonterminals,
            terminals,
            productions,
            first,
            follow,
            predict,
            ..Export::default()
        }
    }

    /// Snapshot of an LR construction.
    pub fn from_lr(g: &Grammar, coll: &Collection, table: &LrTable) -> Export {
        let mut ex = Export::base(g);
        ex.states = coll
            .states
            .iter()
            .enumerate()
            .map(|(id, state)| StateExport {
                id,
                items: state
                    .iter()
                    .map(|(core, la)| item_text(g, core, la))
                    .collect(),
            })
            .collect();
        ex.action = table
            .actions
            .iter()
            .map(|row| row.iter().map(|c| c.encode()).collect())
            .collect();
        ex.goto = table
            .gotos
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| match c {
                        Some(s) => format!("g{s}"),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect();
        ex.conflicts = table
            .conflicts
            .iter()
            .map(|c| conflict_text(g, c))
            .collect();
        ex
    }

    /// Snapshot of an LL(1) construction.
    pub fn from_ll(g: &Grammar, table: &LlTable) -> Export {
        let mut ex = Export::base(g);
        ex.ll = table
            .cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| match c {
                        Some(p) => p.to_string(),
                        None => String::new(),
                    })
                    .collect()
            })
            .collect();
        ex.conflicts = table
            .conflicts
            .iter()
            .map(|c| {
                format!(
                    "{} on {:?}: productions {} and {} collide",
                    g.name(c.nonterminal),
                    g.name(c.terminal),
                    c.chosen,
                    c.other
                )
            })
            .collect();
        ex
    }
}

/// Writes the numbered production list.
pub fn write_prods<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    writeln!(out, "Productions ({}):", ex.productions.len())?;
    for p in &ex.productions {
        writeln!(out, "  {:>3}. {}", p.num, p.text)?;
    }
    Ok(())
}

/// Writes the canonical collection, one state block per id.
pub fn write_states<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    writeln!(out, "States ({}):", ex.states.len())?;
    for state in &ex.states {
        writeln!(out, "State {}:", state.id)?;
        for item in &state.items {
            writeln!(out, "  {}", item)?;
        }
    }
    Ok(())
}

/// Writes FIRST/FOLLOW/PREDICT printouts per the selector.
pub fn write_sets<W: Write>(out: &mut W, ex: &Export, which: SetsSelect) -> io::Result<()> {
    if matches!(which, SetsSelect::All | SetsSelect::First) {
        writeln!(out, "FIRST:")?;
        for (name, set) in &ex.first {
            writeln!(out, "  {} = {{{}}}", name, set.join(", "))?;
        }
    }
    if matches!(which, SetsSelect::All | SetsSelect::Follow) {
        writeln!(out, "FOLLOW:")?;
        for (name, set) in &ex.follow {
            writeln!(out, "  {} = {{{}}}", name, set.join(", "))?;
        }
    }
    if matches!(which, SetsSelect::All | SetsSelect::Predict) {
        writeln!(out, "PREDICT:")?;
        for (text, set) in &ex.predict {
            writeln!(out, "  {} : {{{}}}", text, set.join(", "))?;
        }
    }
    Ok(())
}

/// Writes the ACTION/GOTO grid, one state per row.
pub fn write_lr_table<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    write!(out, "{:>6}", "state")?;
    for t in &ex.terminals {
        write!(out, "{:>8}", t)?;
    }
    for nt in ex.nonterminals.iter().skip(1) {
        write!(out, "{:>8}", nt)?;
    }
    writeln!(out)?;
    for (s, row) in ex.action.iter().enumerate() {
        write!(out, "{:>6}", s)?;
        for cell in row {
            write!(out, "{:>8}", cell)?;
        }
        for cell in ex.goto[s].iter().skip(1) {
            write!(out, "{:>8}", cell)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the LL(1) grid, one nonterminal per row.
pub fn write_ll_table<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    write!(out, "{:>12}", "")?;
    for t in &ex.terminals {
        write!(out, "{:>8}", t)?;
    }
    writeln!(out)?;
    for (nt, row) in ex.ll.iter().enumerate().skip(1) {
        write!(out, "{:>12}", ex.nonterminals[nt])?;
        for cell in row {
            write!(out, "{:>8}", cell)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Writes the conflict diagnostics, one line per record.
pub fn write_conflicts<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    if ex.conflicts.is_empty() {
        writeln!(out, "No conflicts.")?;
        return Ok(());
    }
    writeln!(out, "Conflicts ({}):", ex.conflicts.len())?;
    for c in &ex.conflicts {
        writeln!(out, "  {}", c)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::cc_grammar;
    use crate::collection::Collection;
    use crate::grammar::tests::additive_def;
    use crate::grammar::{Grammar, Mode};
    use crate::lltable::LlTable;
    use crate::sets::tests::ll_arith;
    use crate::table::LrTable;

    fn lr_export(mode: Mode) -> Export {
        let g = cc_grammar(mode);
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        Export::from_lr(&g, &coll, &table)
    }

    #[test]
    fn export_is_deterministic() {
        let a = lr_export(Mode::Lalr1BySlr1);
        let b = lr_export(Mode::Lalr1BySlr1);
        assert_eq!(a, b);

        let mut buf_a = Vec::new();
        let mut buf_b = Vec::new();
        for (ex, buf) in [(&a, &mut buf_a), (&b, &mut buf_b)] {
            write_prods(buf, ex).unwrap();
            write_states(buf, ex).unwrap();
            write_sets(buf, ex, SetsSelect::All).unwrap();
            write_lr_table(buf, ex).unwrap();
            write_conflicts(buf, ex).unwrap();
        }
        assert_eq!(buf_a, buf_b);
    }

    #[test]
    fn action_cells_use_canonical_encoding() {
        let ex = lr_export(Mode::Slr1);
        let flat: Vec<&String> = ex.action.iter().flatten().collect();
        assert!(flat.iter().any(|c| c.starts_with('s')));
        assert!(flat.iter().any(|c| c.starts_with('r')));
        assert!(flat.iter().any(|c| c.as_str() == "acc"));
        for cell in ex.goto.iter().flatten() {
            assert!(cell.is_empty() || cell.starts_with('g'));
        }
    }

    #[test]
    fn unresolved_conflicts_render_as_composites() {
        // Drop the operator table so nothing resolves.
        let mut def = additive_def(Mode::Lalr1BySlr1);
        def.operators.clear();
        let g = Grammar::build(def).unwrap();
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        let ex = Export::from_lr(&g, &coll, &table);
        assert!(ex
            .action
            .iter()
            .flatten()
            .any(|c| c.contains('/') && c.starts_with('s')));
        assert!(ex.conflicts.iter().all(|c| c.contains("unresolved")));
    }

    #[test]
    fn item_rendering_marks_dot_and_lookaheads() {
        let g = cc_grammar(Mode::Clr1);
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        let ex = Export::from_lr(&g, &coll, &table);
        let state0 = &ex.states[0];
        assert!(state0
            .items
            .iter()
            .any(|i| i == "$accept -> . S [$]"));
        assert!(state0.items.iter().any(|i| i.contains("[c, d]")));
    }

    #[test]
    fn first_sets_render_epsilon_for_nullable() {
        let g = ll_arith(Mode::Ll1);
        let table = LlTable::build(&g);
        let ex = Export::from_ll(&g, &table);
        let (_, ep_first) = ex.first.iter().find(|(n, _)| n == "Ep").unwrap();
        assert_eq!(ep_first.first().map(String::as_str), Some("ε"));
        assert!(ex.conflicts.is_empty());
    }
}
