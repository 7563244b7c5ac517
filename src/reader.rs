//! BNF grammar-file loader.
//!
//! File shape: an optional `%lex … /lex` section, declaration lines
//! (`%start`, plus `%left`/`%right`/`%nonassoc` lines read top-to-bottom
//! from lowest to highest precedence), a `%%` separator, and production blocks
//! `Lhs : alt1 { action } | alt2 ;` with optional trailing `%prec SYM`
//! markers. Lex rules are line-oriented: `<COND,…> pattern  action`,
//! the action being `skip`, `return TYPE…`, `begin COND`, or `pop`.
//!
//! The loader strips `%prec` markers out of the rhs and produces the
//! normalized [`GrammarDef`] record the core consumes.

use crate::error::PartabError;
use crate::grammar::{Assoc, GrammarDef, Mode, OperDecl, RuleAlt};
use crate::lexgram::{LexAction, LexGrammar, LexRule};
use anyhow::{Context, Result};
use chumsky::prelude::*;
use indexmap::IndexMap;
use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static LEX_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:<([^>]*)>\s*)?(\S+)(?:\s+(.*))?$").unwrap());

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
enum Tok {
    #[token(":")]
    Colon,
    #[token("|")]
    Pipe,
    #[token(";")]
    Semi,
    #[token("%prec")]
    Prec,
    #[token("%empty")]
    Empty,
    #[regex(r"'[^']*'", |lex| lex.slice().to_owned())]
    Literal(String),
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Ident(String),
    #[token("{", read_action)]
    Action(String),
}

/// Consumes a brace-balanced action body after the opening `{`.
fn read_action(lex: &mut logos::Lexer<Tok>) -> Option<String> {
    let rem = lex.remainder();
    let mut depth = 1usize;
    for (i, c) in rem.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let body = rem[..i].trim().to_owned();
                    lex.bump(i + 1);
                    return Some(body);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Clone)]
struct RawRule {
    lhs: String,
    alts: Vec<RuleAlt>,
}

fn rules_parser<'a>() -> impl Parser<'a, &'a [Tok], Vec<RawRule>> {
    let sym = select! {
        Tok::Ident(s) => s,
        Tok::Literal(s) => s,
        Tok::Empty => "%empty".to_owned(),
    }
    .labelled("symbol");

    let lhs = select! { Tok::Ident(s) => s }.labelled("rule name");
    let action = select! { Tok::Action(s) => s }.labelled("action");

    let alt = sym
        .clone()
        .repeated()
        .collect::<Vec<String>>()
        .then(just(Tok::Prec).ignore_then(sym).or_not())
        .then(action.or_not())
        .map(|((syms, prec), action)| {
            let mut alt = RuleAlt::new(syms.join(" "));
            alt.prec = prec;
            alt.action = action;
            alt
        });

    let rule = lhs
        .then_ignore(just(Tok::Colon))
        .then(alt.separated_by(just(Tok::Pipe)).collect::<Vec<_>>())
        .then_ignore(just(Tok::Semi))
        .map(|(lhs, alts)| RawRule { lhs, alts });

    rule.repeated().collect::<Vec<_>>().then_ignore(end())
}

fn lex_rule_tokens(src: &str) -> Result<Vec<Tok>, PartabError> {
    let mut toks = Vec::new();
    for (tok, span) in Tok::lexer(src).spanned() {
        match tok {
            Ok(t) => toks.push(t),
            Err(()) => {
                let snippet: String = src[span.start..].chars().take(10).collect();
                return Err(PartabError::invalid_grammar(format!(
                    "unexpected input in rules section at {snippet:?}"
                )));
            }
        }
    }
    Ok(toks)
}

fn parse_lex_action(text: Option<&str>) -> Result<LexAction, PartabError> {
    let Some(raw) = text else {
        return Ok(LexAction::skip());
    };
    let mut t = raw.trim();
    // A comment-only action is a skip.
    if t.starts_with("/*") {
        return Ok(LexAction::skip());
    }
    t = t.trim_end_matches(';').trim_end();
    let words: Vec<&str> = t.split_whitespace().collect();

    let mut action = LexAction::skip();
    let mut i = 0;
    while i < words.len() {
        match words[i] {
            "skip" => i += 1,
            "begin" => {
                let Some(cond) = words.get(i + 1) else {
                    return Err(PartabError::invalid_grammar(
                        "lex action `begin` needs a condition name",
                    ));
                };
                action.cond = Some(crate::lexgram::CondOp::Push((*cond).to_owned()));
                i += 2;
            }
            "pop" => {
                action.cond = Some(crate::lexgram::CondOp::Pop);
                i += 1;
            }
            "return" => {
                for w in &words[i + 1..] {
                    action.emit.push((*w).to_owned());
                }
                i = words.len();
            }
            w => {
                action.emit.push(w.to_owned());
                i += 1;
            }
        }
    }
    Ok(action)
}

fn parse_lex_lines(lines: &[&str]) -> Result<LexGrammar, PartabError> {
    let mut lexgram = LexGrammar::default();
    for line in lines {
        let t = line.trim();
        if t.is_empty() || t.starts_with("//") || t == "%%" {
            continue;
        }
        if let Some(rest) = t.strip_prefix("%options") {
            if rest.split_whitespace().any(|w| w == "case-insensitive") {
                lexgram.case_insensitive = true;
            }
            continue;
        }
        // Start-condition declarations; conditions are implied by use.
        if t.starts_with("%s") || t.starts_with("%x") {
            continue;
        }
        let Some(cap) = LEX_RULE_RE.captures(t) else {
            return Err(PartabError::invalid_grammar(format!(
                "unrecognized lex rule line {t:?}"
            )));
        };
        let action = parse_lex_action(cap.get(3).map(|m| m.as_str()))?;
        let mut rule = LexRule::new(&cap[2], action);
        if let Some(conds) = cap.get(1) {
            rule = rule.in_conditions(
                conds
                    .as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned),
            );
        }
        lexgram.rules.push(rule);
    }
    Ok(lexgram)
}

/// Parses a standalone lex grammar file (the `--lex` merge input), which
/// has the same line format as a `%lex` section body.
pub fn parse_lex_text(text: &str) -> Result<LexGrammar, PartabError> {
    let lines: Vec<&str> = text.lines().collect();
    parse_lex_lines(&lines)
}

/// Parses BNF grammar text into a normalized [`GrammarDef`]. The mode is
/// left at its default; callers set it from options or file extension.
pub fn parse_text(text: &str) -> Result<GrammarDef, PartabError> {
    let mut lex_lines: Vec<&str> = Vec::new();
    let mut other_lines: Vec<&str> = Vec::new();
    let mut in_lex = false;
    for line in text.lines() {
        let t = line.trim();
        if !in_lex && t == "%lex" {
            in_lex = true;
            continue;
        }
        if in_lex && t == "/lex" {
            in_lex = false;
            continue;
        }
        if in_lex {
            lex_lines.push(line);
        } else {
            other_lines.push(line);
        }
    }
    if in_lex {
        return Err(PartabError::invalid_grammar("unterminated %lex section"));
    }
    let lex = if lex_lines.is_empty() {
        None
    } else {
        Some(parse_lex_lines(&lex_lines)?)
    };

    let mut decl_lines: Vec<&str> = Vec::new();
    let mut rule_lines: Vec<&str> = Vec::new();
    let mut seen_sep = false;
    for line in other_lines {
        if !seen_sep && line.trim() == "%%" {
            seen_sep = true;
            continue;
        }
        if seen_sep {
            rule_lines.push(line);
        } else {
            decl_lines.push(line);
        }
    }
    if !seen_sep {
        std::mem::swap(&mut rule_lines, &mut decl_lines);
    }

    let mut start = None;
    let mut operators = Vec::new();
    for line in decl_lines {
        let t = line.trim();
        if t.is_empty() || t.starts_with("//") {
            continue;
        }
        if let Some(rest) = t.strip_prefix("%start") {
            start = Some(rest.trim().to_owned());
        } else if let Some(rest) = t.strip_prefix("%left") {
            operators.push(OperDecl {
                assoc: Assoc::Left,
                terminals: rest.split_whitespace().map(str::to_owned).collect(),
            });
        } else if let Some(rest) = t.strip_prefix("%right") {
            operators.push(OperDecl {
                assoc: Assoc::Right,
                terminals: rest.split_whitespace().map(str::to_owned).collect(),
            });
        } else if let Some(rest) = t.strip_prefix("%nonassoc") {
            operators.push(OperDecl {
                assoc: Assoc::Nonassoc,
                terminals: rest.split_whitespace().map(str::to_owned).collect(),
            });
        } else {
            return Err(PartabError::invalid_grammar(format!(
                "unknown declaration {t:?}"
            )));
        }
    }

    let rules_src = rule_lines.join("\n");
    let toks = lex_rule_tokens(&rules_src)?;
    let raw = rules_parser()
        .parse(&toks[..])
        .into_result()
        .map_err(|_| PartabError::invalid_grammar("syntax error in grammar rules"))?;

    let mut bnf: IndexMap<String, Vec<RuleAlt>> = IndexMap::new();
    for rule in raw {
        bnf.entry(rule.lhs).or_default().extend(rule.alts);
    }

    Ok(GrammarDef {
        bnf,
        start,
        operators,
        lex,
        ..GrammarDef::default()
    })
}

/// Maps a grammar-file extension to a mode; anything unrecognized gets the
/// LALR(1)-by-SLR(1) default.
pub fn mode_from_extension(path: &Path) -> Mode {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(|e| e.parse::<Mode>().ok())
        .unwrap_or(Mode::Lalr1BySlr1)
}

/// Reads and parses a grammar file; the explicit mode wins over the
/// extension.
pub fn load_file<P: AsRef<Path>>(path: P, mode: Option<Mode>) -> Result<GrammarDef> {
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("can't read grammar file {:?}", path.as_ref()))?;
    let mut def = parse_text(&text)?;
    def.mode = mode.unwrap_or_else(|| mode_from_extension(path.as_ref()));
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Collection;
    use crate::grammar::Grammar;
    use crate::lexer::Lexer;
    use crate::lexgram::CondOp;
    use crate::parser::{tests::CalcEval, LrParser, Value};
    use crate::table::LrTable;

    const CALC: &str = r#"
%lex
%%
\s+            skip
[0-9]+         return NUMBER
\+             return '+'
\*             return '*'
/lex

%start E
%left '+'
%left '*'

%%

E : E '+' E { $1 + $3 }
  | E '*' E { $1 * $3 }
  | NUMBER
  ;
"#;

    #[test]
    fn parses_the_calculator_grammar_file() {
        let def = parse_text(CALC).unwrap();
        assert_eq!(def.start.as_deref(), Some("E"));
        assert_eq!(def.operators.len(), 2);
        assert_eq!(def.operators[0].terminals, vec!["'+'"]);
        assert_eq!(def.operators[1].assoc, Assoc::Left);

        let lex = def.lex.as_ref().unwrap();
        assert_eq!(lex.rules.len(), 4);
        assert!(lex.rules[0].action.emit.is_empty());
        assert_eq!(lex.rules[1].action.emit, vec!["NUMBER"]);
        assert_eq!(lex.rules[2].action.emit, vec!["'+'"]);

        let alts = &def.bnf["E"];
        assert_eq!(alts.len(), 3);
        assert_eq!(alts[0].rhs, "E '+' E");
        assert_eq!(alts[0].action.as_deref(), Some("$1 + $3"));
        assert!(alts[2].action.is_none());
    }

    #[test]
    fn loaded_grammar_parses_arithmetic_end_to_end() {
        let mut def = parse_text(CALC).unwrap();
        def.mode = Mode::Lalr1BySlr1;
        let g = Grammar::build(def).unwrap();
        let coll = Collection::build(&g);
        let table = LrTable::build(&g, &coll, false);
        assert!(!table.has_unresolved());

        let mut lexer = Lexer::new(g.lex(), "1+2*3").unwrap();
        let outcome = LrParser::new(&g, &table)
            .parse(&mut lexer, &mut CalcEval)
            .unwrap();
        assert_eq!(outcome.value, Value::Number(7));
    }

    #[test]
    fn prec_marker_is_stripped_from_the_rhs() {
        let src = r#"
%nonassoc UMINUS
%%
E : '-' E %prec UMINUS { -$2 }
  | NUMBER
  ;
"#;
        let def = parse_text(src).unwrap();
        let alt = &def.bnf["E"][0];
        assert_eq!(alt.rhs, "'-' E");
        assert_eq!(alt.prec.as_deref(), Some("UMINUS"));
        assert_eq!(alt.action.as_deref(), Some("-$2"));
    }

    #[test]
    fn empty_marker_and_bare_empty_alternative_parse() {
        let src = r#"
%%
A : x A | %empty ;
B : ;
"#;
        let def = parse_text(src).unwrap();
        assert_eq!(def.bnf["A"][1].rhs, "%empty");
        assert_eq!(def.bnf["B"][0].rhs, "");
    }

    #[test]
    fn lex_conditions_and_stack_ops_parse() {
        let src = r#"
%options case-insensitive
%s STRING
%%
"                begin STRING
<STRING>"        pop
<STRING>[^"]+    return CHARS
<*>\n            skip
"#;
        let lexgram = parse_lex_text(src).unwrap();
        assert!(lexgram.case_insensitive);
        assert_eq!(lexgram.rules.len(), 4);
        assert_eq!(
            lexgram.rules[0].action.cond,
            Some(CondOp::Push("STRING".to_owned()))
        );
        assert_eq!(lexgram.rules[1].action.cond, Some(CondOp::Pop));
        assert_eq!(lexgram.rules[1].conditions, vec!["STRING"]);
        assert_eq!(lexgram.rules[3].conditions, vec!["*"]);
    }

    #[test]
    fn unknown_declaration_is_rejected() {
        let err = parse_text("%wat x\n%%\nE : x ;\n").unwrap_err();
        assert!(matches!(err, PartabError::InvalidGrammar(_)));
    }

    #[test]
    fn unterminated_lex_section_is_rejected() {
        let err = parse_text("%lex\nfoo return FOO\n").unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }

    #[test]
    fn garbage_in_rules_section_is_rejected() {
        assert!(parse_text("%%\nE : x ;\n@@").is_err());
    }

    #[test]
    fn mode_comes_from_extension_with_fallback() {
        assert_eq!(mode_from_extension(Path::new("g.ll1")), Mode::Ll1);
        assert_eq!(mode_from_extension(Path::new("g.clr1")), Mode::Clr1);
        assert_eq!(
            mode_from_extension(Path::new("g.lalr1")),
            Mode::Lalr1BySlr1
        );
        assert_eq!(mode_from_extension(Path::new("g.bnf")), Mode::Lalr1BySlr1);
    }
}
