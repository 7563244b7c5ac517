//! Grammar-driven parser generator.
//!
//! `partab` normalizes a context-free grammar (with an optional embedded
//! lexical grammar), computes FIRST/FOLLOW/PREDICT sets, and builds either
//! an LL(1) table or an LR-family table (LR(0), SLR(1), CLR(1), or
//! LALR(1) by the SLR or CLR route) with precedence-based conflict
//! resolution. The resulting tables drive the in-crate interpreters or are
//! exported in a deterministic structured form for code generation; a Rust
//! table-file renderer is included.
//!
//! The typical pipeline:
//!
//! ```rust
//! use partab::{Collection, Grammar, LrTable, reader};
//!
//! let def = reader::parse_text("%%\nS : a S | a ;\n").unwrap();
//! let grammar = Grammar::build(def).unwrap();
//! let collection = Collection::build(&grammar);
//! let table = LrTable::build(&grammar, &collection, true);
//! assert!(!table.has_unresolved());
//! ```

pub mod collection;
pub mod error;
pub mod export;
pub mod generate;
pub mod grammar;
pub mod item;
pub mod lexer;
pub mod lexgram;
pub mod llparser;
pub mod lltable;
pub mod parser;
pub mod reader;
pub mod sets;
pub mod symtab;
pub mod table;

pub use crate::collection::Collection;
pub use crate::error::{PartabError, Position, Span};
pub use crate::export::{Export, SetsSelect};
pub use crate::grammar::{Assoc, Grammar, GrammarDef, Mode, OperDecl, Operator, Production, RuleAlt};
pub use crate::item::{ItemCore, ItemSet};
pub use crate::lexer::{LexToken, Lexer, LexerStats};
pub use crate::lexgram::{CondOp, LexAction, LexGrammar, LexRule};
pub use crate::llparser::{LlOutcome, LlParser};
pub use crate::lltable::{LlConflict, LlTable};
pub use crate::parser::{ActionEval, DefaultEval, LrParser, ParseOutcome, ParseStats, Value};
pub use crate::sets::Sets;
pub use crate::symtab::Symtab;
pub use crate::table::{Cell, Conflict, ConflictKind, LrAction, LrTable, ResolvedBy};
