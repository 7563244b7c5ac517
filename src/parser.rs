//! Table-driven LR interpreter.
//!
//! A state stack seeded with 0, a value stack aligned with it, and a
//! location stack when capture is enabled. Semantic actions are evaluated
//! through the [`ActionEval`] capability; the default implementation
//! rejects non-empty action text so the core never embeds a scripting
//! runtime.

use crate::error::{PartabError, Span};
use crate::grammar::{Grammar, Production};
use crate::lexer::{Lexer, LexToken};
use crate::table::{Cell, LrAction, LrTable};
use smartstring::alias::String;

/// A semantic value on the interpreter's value stack.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    None,
    Number(i64),
    Text(String),
}

/// Host-supplied evaluation of a production's semantic action over the
/// popped rhs values.
pub trait ActionEval {
    fn evaluate(
        &mut self,
        prod: &Production,
        action: Option<&str>,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, PartabError>;
}

/// The default evaluator: rejects non-empty action text and otherwise
/// forwards the first rhs value (`Value::None` for an empty rhs).
pub struct DefaultEval;

impl ActionEval for DefaultEval {
    fn evaluate(
        &mut self,
        prod: &Production,
        action: Option<&str>,
        mut args: Vec<Value>,
        span: Span,
    ) -> Result<Value, PartabError> {
        if let Some(text) = action {
            if !text.trim().is_empty() {
                return Err(PartabError::ParseError {
                    message: format!(
                        "no evaluator installed for semantic action of production {}",
                        prod.num
                    )
                    .into(),
                    lexeme: String::new(),
                    span,
                });
            }
        }
        if args.is_empty() {
            Ok(Value::None)
        } else {
            Ok(args.swap_remove(0))
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParseStats {
    pub tokens: usize,
    pub shifts: usize,
    pub reductions: usize,
}

/// Result of an accepted parse: the single remaining value-stack entry.
#[derive(Debug)]
pub struct ParseOutcome {
    pub value: Value,
    pub stats: ParseStats,
}

fn parse_err(msg: impl AsRef<str>, token: &LexToken) -> PartabError {
    PartabError::ParseError {
        message: String::from(msg.as_ref()),
        lexeme: token.text.clone(),
        span: token.span,
    }
}

/// The LR stack machine over a grammar and its table.
pub struct LrParser<'a> {
    grammar: &'a Grammar,
    table: &'a LrTable,
}

impl<'a> LrParser<'a> {
    pub fn new(grammar: &'a Grammar, table: &'a LrTable) -> Self {
        Self { grammar, table }
    }

    /// Runs the main loop until accept or error.
    pub fn parse(
        &self,
        lexer: &mut Lexer<'_>,
        eval: &mut dyn ActionEval,
    ) -> Result<ParseOutcome, PartabError> {
        let capture = self.grammar.capture_locations();
        let mut states: Vec<usize> = vec![0];
        let mut values: Vec<Value> = Vec::new();
        let mut spans: Vec<Span> = Vec::new();
        let mut stats = ParseStats::default();

        let mut token = match lexer.next_token()? {
            Some(t) => t,
            None => {
                return Err(PartabError::ParseError {
                    message: "empty token stream".into(),
                    lexeme: String::new(),
                    span: Span::default(),
                })
            }
        };
        stats.tokens += 1;

        loop {
            let state = *states.last().unwrap_or(&0);
            let tid = self.grammar.terminal_id(&token.kind).ok_or_else(|| {
                parse_err(
                    format!("unknown token kind {:?}", token.kind),
                    &token,
                )
            })?;
            let cell = self.table.action(self.grammar, state, tid);
            log::trace!(
                "state {} on {:?}: {}",
                state,
                token.kind,
                cell.encode()
            );

            match cell {
                Cell::Entry(LrAction::Shift(next)) => {
                    values.push(Value::Text(token.text.clone()));
                    spans.push(token.span);
                    states.push(*next);
                    stats.shifts += 1;
                    token = match lexer.next_token()? {
                        Some(t) => t,
                        None => return Err(parse_err("unexpected end of stream", &token)),
                    };
                    stats.tokens += 1;
                }

                Cell::Entry(LrAction::Reduce(pn)) => {
                    let p = &self.grammar.productions()[*pn];
                    let n = p.rhs.len();
                    if values.len() < n || states.len() < n + 1 {
                        return Err(parse_err("value stack underflow", &token));
                    }
                    let args = values.split_off(values.len() - n);
                    let popped = spans.split_off(spans.len() - n);
                    states.truncate(states.len() - n);

                    let span = if capture {
                        popped
                            .iter()
                            .fold(None::<Span>, |acc, s| match acc {
                                Some(a) => Some(a.merge(s)),
                                None => Some(*s),
                            })
                            .unwrap_or(Span::new(token.span.start, token.span.start))
                    } else {
                        Span::default()
                    };

                    let result = eval.evaluate(p, p.action.as_deref(), args, span)?;

                    let top = *states.last().unwrap_or(&0);
                    let next = self.table.goto_of(top, p.lhs).ok_or_else(|| {
                        parse_err(
                            format!("missing goto for {} in state {top}", self.grammar.name(p.lhs)),
                            &token,
                        )
                    })?;
                    values.push(result);
                    spans.push(span);
                    states.push(next);
                    stats.reductions += 1;
                }

                Cell::Entry(LrAction::Accept) => {
                    let value = values.pop().unwrap_or(Value::None);
                    return Ok(ParseOutcome { value, stats });
                }

                Cell::Empty => {
                    return Err(parse_err(
                        format!("unexpected token in state {state}"),
                        &token,
                    ))
                }

                Cell::NonassocError => {
                    return Err(parse_err("nonassociative operator may not chain", &token))
                }

                Cell::Unresolved(_) => {
                    return Err(parse_err(
                        format!("unresolved conflict ({}) in state {state}", cell.encode()),
                        &token,
                    ))
                }
            }
        }
    }
}
