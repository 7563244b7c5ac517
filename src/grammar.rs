//! Symbol and production model plus the grammar builder.
//!
//! Symbols live in a single dense numbering: nonterminals first (id 0 is the
//! synthesized start symbol `$accept`), then terminals in order of first
//! appearance, with the end-of-input marker `$` as the last terminal.
//! Epsilon is not a symbol id; nullability is tracked separately by the sets
//! generator.

use crate::error::PartabError;
use crate::lexgram::LexGrammar;
use crate::sets::Sets;
use crate::symtab::Symtab;
use indexmap::IndexMap;
use once_cell::unsync::OnceCell;

/// Name of the synthesized start symbol of the augmented grammar.
pub const ACCEPT: &str = "$accept";

/// Name of the end-of-input marker.
pub const EOF: &str = "$";

/// Table-construction mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Lr0,
    Slr1,
    Clr1,
    Lalr1BySlr1,
    Lalr1ByClr1,
    Ll1,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Lr0 => "LR0",
            Mode::Slr1 => "SLR1",
            Mode::Clr1 => "CLR1",
            Mode::Lalr1BySlr1 => "LALR1_BY_SLR1",
            Mode::Lalr1ByClr1 => "LALR1_BY_CLR1",
            Mode::Ll1 => "LL1",
        }
    }

    pub fn is_lr(&self) -> bool {
        !matches!(self, Mode::Ll1)
    }

    /// True for the modes whose items carry lookahead sets of their own.
    pub fn item_lookaheads(&self) -> bool {
        matches!(self, Mode::Clr1 | Mode::Lalr1BySlr1 | Mode::Lalr1ByClr1)
    }
}

impl std::str::FromStr for Mode {
    type Err = PartabError;

    /// Case-insensitive; `LALR1` aliases `LALR1_BY_SLR1`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LR0" => Ok(Mode::Lr0),
            "SLR1" => Ok(Mode::Slr1),
            "CLR1" => Ok(Mode::Clr1),
            "LALR1" | "LALR1_BY_SLR1" => Ok(Mode::Lalr1BySlr1),
            "LALR1_BY_CLR1" => Ok(Mode::Lalr1ByClr1),
            "LL1" => Ok(Mode::Ll1),
            other => Err(PartabError::invalid_grammar(format!(
                "unknown mode {other:?}"
            ))),
        }
    }
}

/// Operator associativity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

/// One `%left`/`%right`/`%nonassoc` declaration line.
#[derive(Clone, Debug)]
pub struct OperDecl {
    pub assoc: Assoc,
    pub terminals: Vec<String>,
}

/// Resolved operator entry: precedence level (ascending from 1 in
/// declaration order) and associativity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operator {
    pub level: u32,
    pub assoc: Assoc,
}

/// One rhs alternative of a rule, as delivered by a grammar loader.
///
/// `rhs` is a whitespace-separated symbol string; an empty (or `ε` /
/// `%empty`) rhs is the epsilon alternative. Any `%prec` marker has already
/// been stripped by the loader and lives in `prec`.
#[derive(Clone, Debug, Default)]
pub struct RuleAlt {
    pub rhs: String,
    pub action: Option<String>,
    pub prec: Option<String>,
}

impl RuleAlt {
    pub fn new(rhs: impl Into<String>) -> Self {
        Self {
            rhs: rhs.into(),
            action: None,
            prec: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_prec(mut self, prec: impl Into<String>) -> Self {
        self.prec = Some(prec.into());
        self
    }
}

impl From<&str> for RuleAlt {
    fn from(rhs: &str) -> Self {
        RuleAlt::new(rhs)
    }
}

/// Normalized grammar data accepted by [`Grammar::build`].
///
/// This record is the interface between external grammar-file loaders and
/// the core: `bnf` maps each lhs to its alternatives in source order.
#[derive(Clone, Debug)]
pub struct GrammarDef {
    pub bnf: IndexMap<String, Vec<RuleAlt>>,
    pub start: Option<String>,
    pub operators: Vec<OperDecl>,
    pub lex: Option<LexGrammar>,
    pub mode: Mode,
    pub capture_locations: bool,
}

impl Default for GrammarDef {
    fn default() -> Self {
        Self {
            bnf: IndexMap::new(),
            start: None,
            operators: Vec::new(),
            lex: None,
            mode: Mode::Lalr1BySlr1,
            capture_locations: false,
        }
    }
}

/// A numbered production of the augmented grammar.
///
/// Production 0 is always `$accept -> start`.
#[derive(Clone, Debug)]
pub struct Production {
    pub num: usize,
    pub lhs: usize,
    pub rhs: Vec<usize>,
    /// Semantic-action text, preserved verbatim.
    pub action: Option<String>,
    /// Explicit `%prec` terminal, if any.
    pub prec: Option<usize>,
    /// True iff the rhs is empty.
    pub epsilon: bool,
}

/// An immutable context-free grammar with attached operator table and lex
/// grammar.
#[derive(Debug)]
pub struct Grammar {
    mode: Mode,
    symbols: Symtab,
    n_nonterminals: usize,
    start: usize,
    productions: Vec<Production>,
    by_lhs: Vec<Vec<usize>>,
    operators: IndexMap<String, Operator>,
    lex: LexGrammar,
    capture_locations: bool,
    sets: OnceCell<Sets>,
}

impl Grammar {
    /// Builds the augmented grammar from normalized data.
    ///
    /// Numbering: `$accept` is nonterminal 0 and production 0 is the
    /// synthesized `$accept -> start`; user productions follow in source
    /// order; `$` is appended as the last terminal.
    pub fn build(def: GrammarDef) -> Result<Grammar, PartabError> {
        if def.bnf.is_empty() {
            return Err(PartabError::invalid_grammar("grammar has no productions"));
        }

        let mut symbols = Symtab::new();
        symbols.add(ACCEPT);
        for lhs in def.bnf.keys() {
            if lhs == ACCEPT || lhs == EOF {
                return Err(PartabError::invalid_grammar(format!(
                    "reserved symbol {lhs:?} used as lhs"
                )));
            }
            symbols.add(lhs);
        }
        let n_nonterminals = symbols.len();

        let start_name = match &def.start {
            Some(name) => name.clone(),
            None => def.bnf.keys().next().cloned().unwrap_or_default(),
        };
        let start = symbols
            .idx(&start_name)
            .filter(|&id| id > 0 && id < n_nonterminals)
            .ok_or_else(|| {
                PartabError::invalid_grammar(format!(
                    "start symbol {start_name:?} never appears as an lhs"
                ))
            })?;

        let mut operators: IndexMap<String, Operator> = IndexMap::new();
        for (i, decl) in def.operators.iter().enumerate() {
            let level = i as u32 + 1;
            for term in &decl.terminals {
                if operators
                    .insert(
                        term.clone(),
                        Operator {
                            level,
                            assoc: decl.assoc,
                        },
                    )
                    .is_some()
                {
                    return Err(PartabError::invalid_grammar(format!(
                        "duplicate operator {term:?}"
                    )));
                }
            }
        }

        let mut productions = vec![Production {
            num: 0,
            lhs: 0,
            rhs: vec![start],
            action: None,
            prec: None,
            epsilon: false,
        }];
        let mut rhs_terminals: Vec<usize> = Vec::new();

        for (lhs_name, alts) in &def.bnf {
            let lhs = symbols.idx(lhs_name).unwrap_or_default();
            for alt in alts {
                let trimmed = alt.rhs.trim();
                let epsilon = trimmed.is_empty() || trimmed == "ε" || trimmed == "%empty";
                let rhs: Vec<usize> = if epsilon {
                    Vec::new()
                } else {
                    trimmed
                        .split_whitespace()
                        .map(|name| match symbols.idx(name) {
                            Some(id) => id,
                            None => symbols.add(name),
                        })
                        .collect()
                };
                for &id in &rhs {
                    if id >= n_nonterminals {
                        rhs_terminals.push(id);
                    }
                }
                let prec = match &alt.prec {
                    Some(name) => {
                        let id = match symbols.idx(name) {
                            Some(id) => id,
                            None => symbols.add(name),
                        };
                        if id < n_nonterminals {
                            return Err(PartabError::invalid_grammar(format!(
                                "%prec must name a terminal, got nonterminal {name:?}"
                            )));
                        }
                        Some(id)
                    }
                    None => None,
                };
                productions.push(Production {
                    num: productions.len(),
                    lhs,
                    rhs,
                    action: alt.action.clone(),
                    prec,
                    epsilon,
                });
            }
        }

        symbols.add(EOF);

        let lex = def.lex.unwrap_or_default();
        let known = lex.token_types();
        if !known.is_empty() {
            for &id in &rhs_terminals {
                let name = symbols.sym(id).unwrap_or_default();
                let literal = name.len() >= 2 && name.starts_with('\'') && name.ends_with('\'');
                if !literal && !known.contains(name) {
                    return Err(PartabError::invalid_grammar(format!(
                        "undefined symbol {name:?}: not an lhs and not produced by any lex rule"
                    )));
                }
            }
        }

        let mut by_lhs = vec![Vec::new(); n_nonterminals];
        for p in &productions {
            by_lhs[p.lhs].push(p.num);
        }

        Ok(Grammar {
            mode: def.mode,
            symbols,
            n_nonterminals,
            start,
            productions,
            by_lhs,
            operators,
            lex,
            capture_locations: def.capture_locations,
            sets: OnceCell::new(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The user start symbol (rhs of production 0).
    pub fn start_symbol(&self) -> usize {
        self.start
    }

    pub fn n_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn n_nonterminals(&self) -> usize {
        self.n_nonterminals
    }

    pub fn n_terminals(&self) -> usize {
        self.symbols.len() - self.n_nonterminals
    }

    /// Id of the end-of-input marker (always the last terminal).
    pub fn eof(&self) -> usize {
        self.symbols.len() - 1
    }

    pub fn is_nonterminal(&self, id: usize) -> bool {
        id < self.n_nonterminals
    }

    pub fn is_terminal(&self, id: usize) -> bool {
        id >= self.n_nonterminals && id < self.symbols.len()
    }

    pub fn name(&self, id: usize) -> &str {
        self.symbols.sym(id).unwrap_or("?")
    }

    pub fn nonterminals(&self) -> std::ops::Range<usize> {
        0..self.n_nonterminals
    }

    pub fn terminals(&self) -> std::ops::Range<usize> {
        self.n_nonterminals..self.symbols.len()
    }

    /// Column index of a terminal in ACTION-table space.
    pub fn terminal_index(&self, id: usize) -> usize {
        id - self.n_nonterminals
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, num: usize) -> Option<&Production> {
        self.productions.get(num)
    }

    /// Production numbers whose lhs is the given nonterminal.
    pub fn productions_for(&self, lhs: usize) -> &[usize] {
        self.by_lhs.get(lhs).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn operator_of(&self, id: usize) -> Option<&Operator> {
        self.operators.get(self.name(id))
    }

    /// Effective precedence of a production: the explicit `%prec` terminal
    /// if set, otherwise the rightmost rhs terminal present in the operator
    /// table.
    pub fn production_prec(&self, p: &Production) -> Option<(Operator, usize)> {
        if let Some(tid) = p.prec {
            return self.operator_of(tid).map(|op| (*op, tid));
        }
        p.rhs
            .iter()
            .rev()
            .filter(|&&id| self.is_terminal(id))
            .find_map(|&id| self.operator_of(id).map(|op| (*op, id)))
    }

    /// Maps a token kind to a terminal id, trying the quoted-literal form as
    /// a fallback.
    pub fn terminal_id(&self, kind: &str) -> Option<usize> {
        if let Some(id) = self.symbols.idx(kind).filter(|&id| self.is_terminal(id)) {
            return Some(id);
        }
        self.symbols
            .idx(&format!("'{kind}'"))
            .filter(|&id| self.is_terminal(id))
    }

    pub fn lex(&self) -> &LexGrammar {
        &self.lex
    }

    pub fn capture_locations(&self) -> bool {
        self.capture_locations
    }

    /// FIRST/FOLLOW/PREDICT sets, computed on first use and memoized.
    pub fn sets(&self) -> &Sets {
        self.sets.get_or_init(|| Sets::compute(self))
    }

    /// Human-readable rendering of a production, `ε` for an empty rhs.
    pub fn production_text(&self, num: usize) -> String {
        let p = &self.productions[num];
        let rhs = if p.epsilon {
            "ε".to_owned()
        } else {
            p.rhs
                .iter()
                .map(|&id| self.name(id))
                .collect::<Vec<_>>()
                .join(" ")
        };
        format!("{} -> {}", self.name(p.lhs), rhs)
    }
}
