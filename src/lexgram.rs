//! Lexical grammar model: regex rules with start conditions and
//! token-emitting actions.

use std::collections::BTreeSet;

/// The initial start condition every tokenizer begins in.
pub const INITIAL: &str = "INITIAL";

/// Start-condition stack operation attached to a rule action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CondOp {
    Push(String),
    Pop,
}

/// What a rule does when it matches.
///
/// An empty `emit` list means the match is skipped (whitespace, comments);
/// more than one entry queues the extra token types for subsequent calls.
#[derive(Clone, Debug, Default)]
pub struct LexAction {
    pub cond: Option<CondOp>,
    pub emit: Vec<String>,
}

impl LexAction {
    pub fn skip() -> Self {
        Self::default()
    }

    pub fn emit(kind: impl Into<String>) -> Self {
        Self {
            cond: None,
            emit: vec![kind.into()],
        }
    }

    pub fn emit_seq<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cond: None,
            emit: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn begin(cond: impl Into<String>) -> Self {
        Self {
            cond: Some(CondOp::Push(cond.into())),
            emit: Vec::new(),
        }
    }

    pub fn pop() -> Self {
        Self {
            cond: Some(CondOp::Pop),
            emit: Vec::new(),
        }
    }

    pub fn then_emit(mut self, kind: impl Into<String>) -> Self {
        self.emit.push(kind.into());
        self
    }
}

/// One tokenizer rule: an anchored regex pattern, the start conditions it
/// applies in, and its action.
#[derive(Clone, Debug)]
pub struct LexRule {
    /// Conditions this rule is active in. Empty means `INITIAL` only; the
    /// single entry `*` means every condition.
    pub conditions: Vec<String>,
    pub pattern: String,
    pub action: LexAction,
}

impl LexRule {
    pub fn new(pattern: impl Into<String>, action: LexAction) -> Self {
        Self {
            conditions: Vec::new(),
            pattern: pattern.into(),
            action,
        }
    }

    pub fn in_conditions<I, S>(mut self, conds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions = conds.into_iter().map(Into::into).collect();
        self
    }

    pub fn applies_in(&self, cond: &str) -> bool {
        if self.conditions.is_empty() {
            return cond == INITIAL;
        }
        self.conditions.iter().any(|c| c == "*" || c == cond)
    }
}

/// An embedded lexical grammar: the ordered rule list plus lex-wide flags.
#[derive(Clone, Debug, Default)]
pub struct LexGrammar {
    pub rules: Vec<LexRule>,
    pub case_insensitive: bool,
}

impl LexGrammar {
    pub fn new(rules: Vec<LexRule>) -> Self {
        Self {
            rules,
            case_insensitive: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Appends another lex grammar's rules (external `lex` file merging).
    pub fn merge(&mut self, other: LexGrammar) {
        self.rules.extend(other.rules);
        self.case_insensitive |= other.case_insensitive;
    }

    /// Every token type some rule can emit.
    pub fn token_types(&self) -> BTreeSet<String> {
        self.rules
            .iter()
            .flat_map(|r| r.action.emit.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_without_conditions_applies_in_initial_only() {
        let r = LexRule::new(r"[0-9]+", LexAction::emit("NUMBER"));
        assert!(r.applies_in(INITIAL));
        assert!(!r.applies_in("STRING"));
    }

    #[test]
    fn star_condition_applies_everywhere() {
        let r = LexRule::new(r"\n", LexAction::skip()).in_conditions(["*"]);
        assert!(r.applies_in(INITIAL));
        assert!(r.applies_in("COMMENT"));
    }

    #[test]
    fn merge_appends_rules_and_ors_flags() {
        let mut a = LexGrammar::new(vec![LexRule::new("a", LexAction::emit("A"))]);
        let mut b = LexGrammar::new(vec![LexRule::new("b", LexAction::emit("B"))]);
        b.case_insensitive = true;
        a.merge(b);
        assert_eq!(a.rules.len(), 2);
        assert!(a.case_insensitive);
    }

    #[test]
    fn token_types_collects_all_emits() {
        let g = LexGrammar::new(vec![
            LexRule::new(r"\s+", LexAction::skip()),
            LexRule::new("a", LexAction::emit_seq(["A", "B"])),
            LexRule::new("b", LexAction::emit("B")),
        ]);
        let types = g.token_types();
        assert_eq!(types.len(), 2);
        assert!(types.contains("A"));
        assert!(types.contains("B"));
    }
}
