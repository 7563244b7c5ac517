//! Renders a finished table as a self-contained Rust source file.
//!
//! The emitted file carries the symbol labels, production metadata,
//! verbatim semantic-action bodies, and the ACTION/GOTO (or LL) table as
//! plain constants, with a diagnostic dump of the construction in a
//! leading comment block. Emission refuses tables with unresolved
//! conflicts.

use crate::collection::Collection;
use crate::error::PartabError;
use crate::export::{self, Export, SetsSelect};
use crate::grammar::Grammar;
use crate::lltable::LlTable;
use crate::table::{Cell, LrAction, LrTable};
use anyhow::{bail, Result};
use std::io::{self, Write};
use std::path::Path;

fn calculate_minimum_unsigned_type(n: usize) -> &'static str {
    assert!(n <= u16::MAX as usize + 1);
    if n <= (u8::MAX as usize) + 1 {
        "u8"
    } else {
        "u16"
    }
}

fn check_target<P: AsRef<Path>>(out_path: &P) -> Result<()> {
    match out_path.as_ref().extension().and_then(|e| e.to_str()) {
        Some("rs") => Ok(()),
        other => bail!(
            "unsupported target language for extension {:?}",
            other.unwrap_or("")
        ),
    }
}

fn write_header<W: Write>(out: &mut W, ex: &Export) -> io::Result<()> {
    writeln!(out, "/*")?;
    writeln!(out, "Produced by parser generator partab ({})", ex.mode)?;
    writeln!(out)?;
    export::write_prods(out, ex)?;
    writeln!(out)?;
    export::write_sets(out, ex, SetsSelect::All)?;
    writeln!(out, "*/")?;
    writeln!(out)?;
    Ok(())
}

fn write_common<W: Write>(out: &mut W, g: &Grammar, ex: &Export) -> io::Result<()> {
    writeln!(out, "pub const N_SYMBOLS: usize = {};", g.n_symbols())?;
    writeln!(
        out,
        "pub const N_NONTERMINALS: usize = {};",
        g.n_nonterminals()
    )?;
    writeln!(out, "pub const N_TERMINALS: usize = {};", g.n_terminals())?;
    writeln!(
        out,
        "pub const N_PRODUCTIONS: usize = {};",
        g.productions().len()
    )?;
    writeln!(out)?;

    writeln!(out, "pub const SYMBOL_LABELS: [&str; N_SYMBOLS] = [")?;
    for id in 0..g.n_symbols() {
        writeln!(out, "    {:?}, // {}", g.name(id), id)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "/// (lhs symbol, rhs length) per production.")?;
    writeln!(out, "pub const PRODS: [(usize, usize); N_PRODUCTIONS] = [")?;
    for p in g.productions() {
        writeln!(
            out,
            "    ({}, {}), // {}",
            p.lhs,
            p.rhs.len(),
            ex.productions[p.num].text
        )?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "/// Semantic-action bodies, verbatim.")?;
    writeln!(out, "pub const ACTIONS: [&str; N_PRODUCTIONS] = [")?;
    for p in g.productions() {
        writeln!(out, "    {:?}, // {}", p.action.as_deref().unwrap_or(""), p.num)?;
    }
    writeln!(out, "];\n")?;
    Ok(())
}

/// Emits the LR automaton as Rust source.
pub fn write_rust_lr<W: Write>(
    g: &Grammar,
    coll: &Collection,
    table: &LrTable,
    out: &mut W,
) -> io::Result<()> {
    let ex = Export::from_lr(g, coll, table);
    write_header(out, &ex)?;
    write_common(out, g, &ex)?;

    let n_states = coll.states.len();
    writeln!(out, "pub const N_STATES: usize = {};", n_states)?;
    writeln!(out)?;

    writeln!(
        out,
        "#[derive(Clone, Copy, Debug, PartialEq, Eq)]\npub enum Action {{"
    )?;
    writeln!(out, "    Error,")?;
    writeln!(out, "    Accept,")?;
    writeln!(
        out,
        "    Shift({}),",
        calculate_minimum_unsigned_type(n_states)
    )?;
    writeln!(
        out,
        "    Reduce({}),",
        calculate_minimum_unsigned_type(g.productions().len())
    )?;
    writeln!(
        out,
        "    Goto({}),",
        calculate_minimum_unsigned_type(n_states)
    )?;
    writeln!(out, "}}\n")?;

    writeln!(
        out,
        "/// Nonterminal columns hold Goto entries, terminal columns the"
    )?;
    writeln!(out, "/// shift/reduce/accept actions.")?;
    writeln!(out, "pub const TAB: [[Action; N_SYMBOLS]; N_STATES] = [")?;
    for s in 0..n_states {
        writeln!(out, "    /* STATE {} */ [", s)?;
        for nt in g.nonterminals() {
            match table.goto_of(s, nt) {
                Some(t) => writeln!(out, "        Action::Goto({}), /* {} */", t, g.name(nt))?,
                None => writeln!(out, "        Action::Error, /* {} */", g.name(nt))?,
            }
        }
        for t in g.terminals() {
            let cell = table.action(g, s, t);
            let rendered = match cell {
                Cell::Entry(LrAction::Shift(n)) => format!("Action::Shift({n})"),
                Cell::Entry(LrAction::Reduce(p)) => format!("Action::Reduce({p})"),
                Cell::Entry(LrAction::Accept) => "Action::Accept".to_owned(),
                Cell::Empty | Cell::NonassocError | Cell::Unresolved(_) => {
                    "Action::Error".to_owned()
                }
            };
            writeln!(out, "        {}, /* {} */", rendered, g.name(t))?;
        }
        writeln!(out, "    ],")?;
    }
    writeln!(out, "];")?;
    Ok(())
}

/// Emits the LL(1) grid as Rust source.
pub fn write_rust_ll<W: Write>(g: &Grammar, table: &LlTable, out: &mut W) -> io::Result<()> {
    let ex = Export::from_ll(g, table);
    write_header(out, &ex)?;
    write_common(out, g, &ex)?;

    writeln!(out, "/// Production to expand, or -1 for an error cell.")?;
    writeln!(
        out,
        "pub const LL_TAB: [[i16; N_TERMINALS]; N_NONTERMINALS] = ["
    )?;
    for nt in g.nonterminals() {
        write!(out, "    /* {} */ [", g.name(nt))?;
        for t in g.terminals() {
            match table.cell(g, nt, t) {
                Some(p) => write!(out, "{}, ", p)?,
                None => write!(out, "-1, ")?,
            }
        }
        writeln!(out, "],")?;
    }
    writeln!(out, "];")?;
    Ok(())
}

/// Generates an LR parser table file; fails on unresolved conflicts and on
/// target languages no renderer exists for.
pub fn generate_lr<P: AsRef<Path>>(
    g: &Grammar,
    coll: &Collection,
    table: &LrTable,
    out_path: P,
) -> Result<()> {
    check_target(&out_path)?;
    if table.has_unresolved() {
        return Err(PartabError::unresolvable(format!(
            "{} conflict(s) remain; refusing to emit",
            table.unresolved().count()
        ))
        .into());
    }
    let mut out = std::fs::File::create(&out_path)?;
    write_rust_lr(g, coll, table, &mut out)?;
    Ok(())
}

/// Generates an LL(1) parser table file; fails on table collisions.
pub fn generate_ll<P: AsRef<Path>>(g: &Grammar, table: &LlTable, out_path: P) -> Result<()> {
    check_target(&out_path)?;
    if !table.is_ll1() {
        return Err(PartabError::unresolvable(format!(
            "{} LL(1) collision(s); refusing to emit",
            table.conflicts.len()
        ))
        .into());
    }
    let mut out = std::fs::File::create(&out_path)?;
    write_rust_ll(g, table, &mut out)?;
    Ok(())
}
