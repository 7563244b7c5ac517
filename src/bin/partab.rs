//! Command-line front-end: loads a grammar file, builds the requested
//! tables, prints diagnostics, interprets input, and emits table files.

use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use partab::{
    export, generate, reader, Collection, Export, Grammar, LexAction, LexGrammar, LexRule,
    Lexer, LlParser, LlTable, LrParser, LrTable, Mode, SetsSelect, Value,
};
use partab::DefaultEval;
use std::path::PathBuf;

#[derive(ClapParser, Debug)]
#[command(version, about = "Grammar-driven parser generator", long_about = None)]
struct Args {
    /// Grammar file
    #[arg(short, long)]
    grammar: PathBuf,

    /// External lex grammar file, appended to the grammar's lex rules
    #[arg(long)]
    lex: Option<PathBuf>,

    /// Mode: LR0, SLR1, CLR1, LALR1, LALR1_BY_SLR1, LALR1_BY_CLR1, LL1
    /// (default: inferred from the grammar-file extension)
    #[arg(short, long)]
    mode: Option<Mode>,

    /// String to parse
    #[arg(short, long)]
    parse: Option<String>,

    /// File whose contents to parse
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print the parsing table
    #[arg(long)]
    table: bool,

    /// Print the canonical collection
    #[arg(long)]
    collection: bool,

    /// Print sets: all, first, follow, or predict
    #[arg(long)]
    sets: Option<SetsSelect>,

    /// Print the token listing for the input
    #[arg(long)]
    tokenize: bool,

    /// Inject a whitespace-skipping lex rule when no lex grammar exists
    #[arg(long = "ignore-whitespaces")]
    ignore_whitespaces: bool,

    /// Case-insensitive lexing
    #[arg(long = "case-insensitive")]
    case_insensitive: bool,

    /// Capture locations
    #[arg(long)]
    loc: bool,

    /// Resolve remaining conflicts by default rules (shift, lowest
    /// production number)
    #[arg(long = "resolve-conflicts")]
    resolve_conflicts: bool,

    /// Emit a parser table file; target language from the extension
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report conflicts without emitting
    #[arg(long)]
    validate: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    run(args)
}

fn run(args: Args) -> Result<()> {
    let mut def = reader::load_file(&args.grammar, args.mode)?;

    if let Some(lex_path) = &args.lex {
        let text = std::fs::read_to_string(lex_path)
            .with_context(|| format!("can't read lex file {lex_path:?}"))?;
        let extra = reader::parse_lex_text(&text)?;
        match &mut def.lex {
            Some(lexgram) => lexgram.merge(extra),
            None => def.lex = Some(extra),
        }
    }
    if args.ignore_whitespaces && def.lex.as_ref().map_or(true, LexGrammar::is_empty) {
        let mut lexgram = def.lex.take().unwrap_or_default();
        lexgram.rules.push(LexRule::new(r"\s+", LexAction::skip()));
        def.lex = Some(lexgram);
    }
    if args.case_insensitive {
        def.lex.get_or_insert_with(LexGrammar::default).case_insensitive = true;
    }
    def.capture_locations = args.loc;

    let grammar = Grammar::build(def)?;

    let input = match (&args.parse, &args.file) {
        (Some(s), _) => Some(s.clone()),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("can't read input file {path:?}"))?,
        ),
        (None, None) => None,
    };

    if args.tokenize {
        let Some(text) = &input else {
            bail!("--tokenize needs --parse or --file");
        };
        let mut lexer = Lexer::new(grammar.lex(), text)?;
        for t in lexer.tokenize_all()? {
            println!(
                "{} {:?} at {}:{}",
                t.kind, t.text, t.span.start.line, t.span.start.column
            );
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if grammar.mode() == Mode::Ll1 {
        let table = LlTable::build(&grammar);
        let ex = Export::from_ll(&grammar, &table);
        if let Some(which) = args.sets {
            export::write_sets(&mut out, &ex, which)?;
        }
        if args.table {
            export::write_ll_table(&mut out, &ex)?;
        }
        if args.validate {
            export::write_conflicts(&mut out, &ex)?;
            return Ok(());
        }
        if !table.is_ll1() {
            export::write_conflicts(&mut out, &ex)?;
            bail!("grammar is not LL(1)");
        }
        if let Some(out_path) = &args.output {
            generate::generate_ll(&grammar, &table, out_path)?;
        }
        if let Some(text) = &input {
            let mut lexer = Lexer::new(grammar.lex(), text)?;
            let outcome = LlParser::new(&grammar, &table).parse(&mut lexer)?;
            println!("accept ({} expansions)", outcome.derivation.len());
        }
        return Ok(());
    }

    let coll = Collection::build(&grammar);
    let table = LrTable::build(&grammar, &coll, args.resolve_conflicts);
    let ex = Export::from_lr(&grammar, &coll, &table);

    if let Some(which) = args.sets {
        export::write_sets(&mut out, &ex, which)?;
    }
    if args.collection {
        export::write_states(&mut out, &ex)?;
    }
    if args.table {
        export::write_lr_table(&mut out, &ex)?;
    }
    if args.validate {
        export::write_conflicts(&mut out, &ex)?;
        return Ok(());
    }
    if let Some(out_path) = &args.output {
        generate::generate_lr(&grammar, &coll, &table, out_path)?;
    }
    if let Some(text) = &input {
        let mut lexer = Lexer::new(grammar.lex(), text)?;
        let outcome = LrParser::new(&grammar, &table).parse(&mut lexer, &mut DefaultEval)?;
        match outcome.value {
            Value::Number(n) => println!("accept: {n}"),
            Value::Text(t) => println!("accept: {t}"),
            Value::None => println!("accept"),
        }
        log::debug!(
            "parse stats: {} tokens, {} shifts, {} reductions",
            outcome.stats.tokens,
            outcome.stats.shifts,
            outcome.stats.reductions
        );
    }
    Ok(())
}
