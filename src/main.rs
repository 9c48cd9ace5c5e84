use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use relang::{Alphabet, Automaton, Config, NfaGenerator};

/// Compile a pattern into an automaton and test strings against it.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Pattern to compile.
    pattern: String,

    /// Strings to test. Read from stdin, one per line, when omitted.
    inputs: Vec<String>,

    /// Print every line of FILE that contains a match of the pattern.
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Extra literal symbols, e.g. " _".
    #[arg(short, long, default_value = "")]
    symbols: String,

    /// Disable every cache.
    #[arg(long)]
    no_cache: bool,

    /// Log compilation details.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn report(nfa: &Automaton, input: &str) {
    let start = Instant::now();
    let accepted = nfa.accepts(input);
    let elapsed = start.elapsed();
    let verdict = if accepted { "accepted" } else { "rejected" };
    println!("'{}' {} in {:?}", input, verdict, elapsed);
}

fn search(nfa: &Automaton, path: &PathBuf) -> Result<()> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut matches = 0;
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if nfa.accepts(&line) {
            matches += 1;
            println!("{}: {}", number + 1, line);
        }
    }
    info!("{} matching lines", matches);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let alphabet = Alphabet::new().with_symbols(args.symbols.chars());
    let mut config = Config::default().with_alphabet(alphabet);
    if args.no_cache {
        config = config.without_caching();
    }
    let mut generator = NfaGenerator::with_config(config);

    let pattern = match args.file {
        Some(_) => format!(".*({}).*", args.pattern),
        None => args.pattern.clone(),
    };
    let start = Instant::now();
    let nfa = generator
        .generate(&pattern)
        .with_context(|| format!("Failed to compile '{}'", args.pattern))?;
    println!(
        "Compiled '{}' into {} states in {:?}",
        args.pattern,
        nfa.state_count(),
        start.elapsed()
    );

    if let Some(path) = &args.file {
        return search(&nfa, path);
    }

    if !args.inputs.is_empty() {
        for input in &args.inputs {
            report(&nfa, input);
        }
        return Ok(());
    }

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']);
        if input.is_empty() {
            break;
        }
        report(&nfa, input);
    }
    Ok(())
}
