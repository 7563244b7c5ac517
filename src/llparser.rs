//! Predictive LL(1) interpreter: a symbol stack seeded `[S, $]`, expanded
//! against the LL table, accepting when the stack empties on `$`.

use crate::error::PartabError;
use crate::grammar::Grammar;
use crate::lexer::{Lexer, LexToken};
use crate::lltable::LlTable;
use crate::parser::ParseStats;
use smartstring::alias::String;

/// Result of an accepted LL parse: the leftmost derivation as production
/// numbers in expansion order.
#[derive(Debug)]
pub struct LlOutcome {
    pub derivation: Vec<usize>,
    pub stats: ParseStats,
}

fn parse_err(msg: impl AsRef<str>, token: &LexToken) -> PartabError {
    PartabError::ParseError {
        message: String::from(msg.as_ref()),
        lexeme: token.text.clone(),
        span: token.span,
    }
}

pub struct LlParser<'a> {
    grammar: &'a Grammar,
    table: &'a LlTable,
}

impl<'a> LlParser<'a> {
    pub fn new(grammar: &'a Grammar, table: &'a LlTable) -> Self {
        Self { grammar, table }
    }

    pub fn parse(&self, lexer: &mut Lexer<'_>) -> Result<LlOutcome, PartabError> {
        let g = self.grammar;
        let mut stack: Vec<usize> = vec![g.eof(), g.start_symbol()];
        let mut derivation = Vec::new();
        let mut stats = ParseStats::default();

        let mut token = match lexer.next_token()? {
            Some(t) => t,
            None => {
                return Err(PartabError::ParseError {
                    message: "empty token stream".into(),
                    lexeme: String::new(),
                    span: Default::default(),
                })
            }
        };
        stats.tokens += 1;

        loop {
            let Some(&top) = stack.last() else {
                return Ok(LlOutcome { derivation, stats });
            };
            let tid = g
                .terminal_id(&token.kind)
                .ok_or_else(|| parse_err(format!("unknown token kind {:?}", token.kind), &token))?;

            if g.is_terminal(top) {
                if top != tid {
                    return Err(parse_err(
                        format!("expected {:?}", g.name(top)),
                        &token,
                    ));
                }
                log::trace!("match {:?}", g.name(top));
                stack.pop();
                stats.shifts += 1;
                if top == g.eof() {
                    return Ok(LlOutcome { derivation, stats });
                }
                token = match lexer.next_token()? {
                    Some(t) => t,
                    None => return Err(parse_err("unexpected end of stream", &token)),
                };
                stats.tokens += 1;
                continue;
            }

            let Some(pn) = self.table.cell(g, top, tid) else {
                return Err(parse_err(
                    format!("unexpected token while expanding {}", g.name(top)),
                    &token,
                ));
            };
            log::trace!("expand {}", g.production_text(pn));
            stack.pop();
            derivation.push(pn);
            for &sym in g.productions()[pn].rhs.iter().rev() {
                stack.push(sym);
            }
            stats.reductions += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Grammar, GrammarDef, Mode, RuleAlt};
    use crate::lexgram::{LexAction, LexGrammar, LexRule};
    use crate::lltable::LlTable;
    use indexmap::IndexMap;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn arith_grammar() -> Grammar {
        let mut bnf = IndexMap::new();
        bnf.insert("E".to_owned(), vec![RuleAlt::new("T Ep")]);
        bnf.insert(
            "Ep".to_owned(),
            vec![RuleAlt::new("+ T Ep"), RuleAlt::new("")],
        );
        bnf.insert("T".to_owned(), vec![RuleAlt::new("( E )"), "id".into()]);
        let lex = LexGrammar::new(vec![
            LexRule::new(r"\s+", LexAction::skip()),
            LexRule::new(r"id", LexAction::emit("id")),
            LexRule::new(r"\+", LexAction::emit("+")),
            LexRule::new(r"\(", LexAction::emit("(")),
            LexRule::new(r"\)", LexAction::emit(")")),
        ]);
        Grammar::build(GrammarDef {
            bnf,
            lex: Some(lex),
            mode: Mode::Ll1,
            ..GrammarDef::default()
        })
        .unwrap()
    }

    #[test]
    fn accepts_repeated_addition() {
        init_logger();
        let g = arith_grammar();
        let table = LlTable::build(&g);
        assert!(table.is_ll1());
        let mut lexer = Lexer::new(g.lex(), "id+id+id").unwrap();
        let outcome = LlParser::new(&g, &table).parse(&mut lexer).unwrap();
        // First expansion is the start production E -> T Ep.
        assert_eq!(outcome.derivation.first(), Some(&1));
        // Three ids are matched plus the end marker.
        assert_eq!(outcome.stats.shifts, 6);
    }

    #[test]
    fn accepts_nested_parentheses() {
        init_logger();
        let g = arith_grammar();
        let table = LlTable::build(&g);
        let mut lexer = Lexer::new(g.lex(), "(id+(id))").unwrap();
        assert!(LlParser::new(&g, &table).parse(&mut lexer).is_ok());
    }

    #[test]
    fn rejects_trailing_operator_with_location() {
        init_logger();
        let g = arith_grammar();
        let table = LlTable::build(&g);
        let mut lexer = Lexer::new(g.lex(), "id+").unwrap();
        let err = LlParser::new(&g, &table).parse(&mut lexer).unwrap_err();
        let PartabError::ParseError { span, .. } = err else {
            panic!("expected ParseError");
        };
        assert_eq!(span.start.line, 1);
        assert_eq!(span.start.column, 3);
    }

    #[test]
    fn rejects_unbalanced_parenthesis() {
        let g = arith_grammar();
        let table = LlTable::build(&g);
        let mut lexer = Lexer::new(g.lex(), "(id").unwrap();
        assert!(LlParser::new(&g, &table).parse(&mut lexer).is_err());
    }
}
