//! The tokenizer: a regex-rule-driven token stream over an input string
//! with a start-condition stack.
//!
//! Each tick picks the rule subset for the current condition, attempts an
//! anchored match at the cursor, and takes the first rule that matches.
//! Actions may skip, emit one token type, emit a sequence (extras are
//! queued), and push or pop the condition stack. One `$` token is produced
//! at end of input.

use crate::error::{PartabError, Position, Span};
use crate::grammar::EOF;
use crate::lexgram::{CondOp, LexAction, LexGrammar, LexRule, INITIAL};
use regex::{Regex, RegexBuilder};
use smartstring::alias::String;
use std::collections::VecDeque;

/// A token produced by the tokenizer: kind (terminal name), matched
/// lexeme, and source span.
#[derive(Clone, Debug)]
pub struct LexToken {
    pub kind: String,
    pub text: String,
    pub span: Span,
}

impl LexToken {
    pub fn is_eof(&self) -> bool {
        self.kind == EOF
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexerStats {
    pub matches: usize,
    pub tokens: usize,
    pub skipped: usize,
}

struct CompiledRule {
    rule: LexRule,
    regex: Regex,
}

/// Tokenizer state over a borrowed input string.
pub struct Lexer<'i> {
    input: &'i str,
    rules: Vec<CompiledRule>,
    cursor: usize,
    /// 1-based line of the cursor.
    line: usize,
    /// Byte offset where the current line begins (column = cursor - this).
    line_start: usize,
    conditions: Vec<std::string::String>,
    pending: VecDeque<LexToken>,
    eof_sent: bool,
    stats: LexerStats,
}

impl<'i> Lexer<'i> {
    /// Compiles every rule pattern as an anchored regex. Pattern errors are
    /// grammar errors.
    pub fn new(lexgram: &LexGrammar, input: &'i str) -> Result<Self, PartabError> {
        let mut rules = Vec::with_capacity(lexgram.rules.len());
        for rule in &lexgram.rules {
            let regex = RegexBuilder::new(&format!("^(?:{})", rule.pattern))
                .case_insensitive(lexgram.case_insensitive)
                .build()
                .map_err(|e| {
                    PartabError::invalid_grammar(format!(
                        "bad lex pattern {:?}: {e}",
                        rule.pattern
                    ))
                })?;
            rules.push(CompiledRule {
                rule: rule.clone(),
                regex,
            });
        }
        Ok(Self {
            input,
            rules,
            cursor: 0,
            line: 1,
            line_start: 0,
            conditions: vec![INITIAL.to_owned()],
            pending: VecDeque::new(),
            eof_sent: false,
            stats: LexerStats::default(),
        })
    }

    /// Current cursor position.
    pub fn pos(&self) -> Position {
        Position::new(self.line, self.cursor - self.line_start)
    }

    pub fn stats(&self) -> LexerStats {
        self.stats.clone()
    }

    fn advance(&mut self, text: &str) {
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                self.line += 1;
                self.line_start = self.cursor + i + 1;
            }
        }
        self.cursor += text.len();
    }

    /// Returns the next token, `$` once at end of input, then `None`.
    pub fn next_token(&mut self) -> Result<Option<LexToken>, PartabError> {
        if let Some(t) = self.pending.pop_front() {
            self.stats.tokens += 1;
            return Ok(Some(t));
        }
        loop {
            if self.cursor >= self.input.len() {
                if self.eof_sent {
                    return Ok(None);
                }
                self.eof_sent = true;
                self.stats.tokens += 1;
                let p = self.pos();
                return Ok(Some(LexToken {
                    kind: EOF.into(),
                    text: String::new(),
                    span: Span::new(p, p),
                }));
            }

            let cond = self
                .conditions
                .last()
                .cloned()
                .unwrap_or_else(|| INITIAL.to_owned());
            let rest = &self.input[self.cursor..];

            let mut hit: Option<(usize, usize)> = None;
            for (ri, cr) in self.rules.iter().enumerate() {
                if !cr.rule.applies_in(&cond) {
                    continue;
                }
                if let Some(m) = cr.regex.find(rest) {
                    // A zero-length match cannot advance the cursor.
                    if m.end() == 0 {
                        continue;
                    }
                    hit = Some((ri, m.end()));
                    break;
                }
            }
            let Some((ri, len)) = hit else {
                let p = self.pos();
                let lexeme: String = rest.chars().take(10).collect();
                return Err(PartabError::UnexpectedToken {
                    lexeme,
                    span: Span::new(p, p),
                });
            };

            self.stats.matches += 1;
            let text: String = rest[..len].into();
            let start = self.pos();
            self.advance(&text);
            let span = Span::new(start, self.pos());
            let action: LexAction = self.rules[ri].rule.action.clone();
            log::trace!(
                "matched rule {} in <{}>: {:?} -> {:?}",
                ri,
                cond,
                text,
                action.emit
            );

            match &action.cond {
                Some(CondOp::Push(c)) => self.conditions.push(c.clone()),
                Some(CondOp::Pop) => {
                    if self.conditions.len() > 1 {
                        self.conditions.pop();
                    }
                }
                None => {}
            }

            if let [first, queued @ ..] = action.emit.as_slice() {
                for kind in queued {
                    self.pending.push_back(LexToken {
                        kind: kind.as_str().into(),
                        text: text.clone(),
                        span,
                    });
                }
                self.stats.tokens += 1;
                return Ok(Some(LexToken {
                    kind: first.as_str().into(),
                    text,
                    span,
                }));
            }
            self.stats.skipped += 1;
        }
    }

    /// Drains the whole input into a token list (including the final `$`).
    pub fn tokenize_all(&mut self) -> Result<Vec<LexToken>, PartabError> {
        let mut out = Vec::new();
        while let Some(t) = self.next_token()? {
            out.push(t);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexgram::{LexAction, LexGrammar, LexRule};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ident_grammar() -> LexGrammar {
        LexGrammar::new(vec![
            LexRule::new(r"\s+", LexAction::skip()),
            LexRule::new(r"[a-z]+", LexAction::emit("ID")),
        ])
    }

    #[test]
    fn tracks_line_and_column_across_newlines() {
        init_logger();
        let g = ident_grammar();
        let mut lx = Lexer::new(&g, "ab\ncd").unwrap();

        let t1 = lx.next_token().unwrap().unwrap();
        assert_eq!(t1.kind, "ID");
        assert_eq!(t1.span.start, Position::new(1, 0));
        assert_eq!(t1.span.end, Position::new(1, 2));

        let t2 = lx.next_token().unwrap().unwrap();
        assert_eq!(t2.kind, "ID");
        assert_eq!(t2.span.start, Position::new(2, 0));
        assert_eq!(t2.span.end, Position::new(2, 2));

        let end = lx.next_token().unwrap().unwrap();
        assert!(end.is_eof());
        assert!(lx.next_token().unwrap().is_none());
    }

    #[test]
    fn eof_token_emitted_exactly_once() {
        let g = ident_grammar();
        let mut lx = Lexer::new(&g, "").unwrap();
        let t = lx.next_token().unwrap().unwrap();
        assert!(t.is_eof());
        assert_eq!(t.span.start, Position::new(1, 0));
        assert!(lx.next_token().unwrap().is_none());
        assert!(lx.next_token().unwrap().is_none());
    }

    #[test]
    fn first_matching_rule_wins() {
        // Both rules match "if"; the earlier one is chosen.
        let g = LexGrammar::new(vec![
            LexRule::new(r"if", LexAction::emit("IF")),
            LexRule::new(r"[a-z]+", LexAction::emit("ID")),
        ]);
        let mut lx = Lexer::new(&g, "if").unwrap();
        assert_eq!(lx.next_token().unwrap().unwrap().kind, "IF");
    }

    #[test]
    fn emit_sequence_queues_extras_with_same_lexeme() {
        let g = LexGrammar::new(vec![LexRule::new(
            r"x",
            LexAction::emit_seq(["A", "B", "C"]),
        )]);
        let mut lx = Lexer::new(&g, "x").unwrap();
        let toks = lx.tokenize_all().unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["A", "B", "C", "$"]);
        assert_eq!(toks[1].text, "x");
        assert_eq!(toks[1].span, toks[0].span);
    }

    #[test]
    fn start_conditions_gate_rules() {
        let g = LexGrammar::new(vec![
            LexRule::new("\"", LexAction::begin("STR")),
            LexRule::new("\"", LexAction::pop()).in_conditions(["STR"]),
            LexRule::new("[^\"]+", LexAction::emit("CHARS")).in_conditions(["STR"]),
            LexRule::new(r"[a-z]+", LexAction::emit("ID")),
        ]);
        let mut lx = Lexer::new(&g, "\"hi\"ok").unwrap();
        let toks = lx.tokenize_all().unwrap();
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.as_str()).collect();
        assert_eq!(kinds, vec!["CHARS", "ID", "$"]);
        assert_eq!(toks[0].text, "hi");
    }

    #[test]
    fn unmatched_input_is_an_error_with_location() {
        let g = ident_grammar();
        let mut lx = Lexer::new(&g, "ab\n@").unwrap();
        lx.next_token().unwrap();
        let err = lx.next_token().unwrap_err();
        let PartabError::UnexpectedToken { lexeme, span } = err else {
            panic!("expected UnexpectedToken");
        };
        assert_eq!(lexeme, "@");
        assert_eq!(span.start, Position::new(2, 0));
    }

    #[test]
    fn case_insensitive_flag_applies_to_all_rules() {
        let mut g = LexGrammar::new(vec![LexRule::new(r"[a-z]+", LexAction::emit("ID"))]);
        g.case_insensitive = true;
        let mut lx = Lexer::new(&g, "AbC").unwrap();
        assert_eq!(lx.next_token().unwrap().unwrap().kind, "ID");
    }

    #[test]
    fn bad_pattern_is_an_invalid_grammar_error() {
        let g = LexGrammar::new(vec![LexRule::new(r"[", LexAction::emit("X"))]);
        assert!(matches!(
            Lexer::new(&g, ""),
            Err(PartabError::InvalidGrammar(_))
        ));
    }
}
