use clap::{Arg, ArgAction, ArgGroup, Command};
use color_eyre::eyre::{Result, WrapErr};
use lexsim::dfa::DFA;
use lexsim::fa::FA;
use lexsim::inspect::{describe_state, save_dot};
use lexsim::{check_balanced, load_dfa, Grammar, Lexer, Token};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = fmt::layer().with_target(false).with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()
        .wrap_err("Failed to initialize logging")?;

    Ok(())
}

fn automaton_file_name(grammar: Grammar) -> String {
    format!("{}_dfa.json", grammar.name())
}

fn build_lexer(load_dir: Option<&PathBuf>) -> Result<Lexer> {
    let Some(dir) = load_dir else {
        return Ok(Lexer::new());
    };

    let load = |grammar: Grammar| -> Result<DFA> {
        let path = dir.join(automaton_file_name(grammar));
        let dfa = load_dfa(&path)
            .wrap_err_with(|| format!("Failed to load the {} DFA from {:?}", grammar, path))?;
        tracing::info!(%grammar, states = dfa.get_num_states(), "loaded DFA");
        Ok(dfa)
    };

    Ok(Lexer::from_dfas(
        load(Grammar::Identifier)?,
        load(Grammar::Number)?,
    ))
}

fn write_tokens<W: Write>(out: &mut W, token_list: &[Token], as_json: bool) -> Result<()> {
    if as_json {
        serde_json::to_writer_pretty(&mut *out, token_list)?;
        writeln!(out)?;
        return Ok(());
    }

    for token in token_list {
        writeln!(
            out,
            "{}:{}\t({}, {})",
            token.get_line(),
            token.get_column(),
            token.get_text(),
            token.get_kind()
        )?;
    }
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Command::new("lexsim")
                        .version("0.1")
                        .about("Builds NFAs for identifiers and numbers, determinizes them and uses the DFAs to tokenize source text")
                        .arg(
                            Arg::new("input")
                            .short('i')
                            .long("input")
                            .help("The program source file which should be scanned and tokenized")
                            .value_name("INPUT SOURCE FILE")
                            .value_parser(clap::value_parser!(PathBuf))
                        )
                        .arg(
                            Arg::new("text")
                            .short('t')
                            .long("text")
                            .help("Source text to scan, given directly on the command line")
                            .value_name("SOURCE TEXT")
                            .value_parser(clap::value_parser!(String))
                        )
                        .group(
                            ArgGroup::new("source")
                            .args(["input", "text"])
                            .required(true)
                        )
                        .arg(
                            Arg::new("output")
                            .short('o')
                            .long("output")
                            .help("The output file to store the token list. Printed to stdout if not provided")
                            .value_name("OUTPUT RESULT FILE")
                            .value_parser(clap::value_parser!(PathBuf))
                        )
                        .arg(
                            Arg::new("json")
                            .long("json")
                            .help("Write the token list as JSON")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("check-balance")
                            .short('b')
                            .long("check-balance")
                            .help("Check that parentheses, braces and brackets in the source are balanced")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("trace")
                            .long("trace")
                            .help("Print the DFA states visited while matching the first token")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("describe")
                            .long("describe")
                            .help("Print every state of both DFAs with its NFA set and outgoing transitions")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("save-nfa")
                            .short('n')
                            .long("save-nfa")
                            .help("Save the NFAs after Thompson Construction as Graphviz dot files")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("save-dfa")
                            .short('d')
                            .long("save-dfa")
                            .help("Save the DFAs obtained after Subset Construction as Graphviz dot files")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("save-automata")
                            .short('s')
                            .long("save-automata")
                            .help("Save both DFAs as JSON so they can be loaded again with --load-automata")
                            .action(ArgAction::SetTrue)
                        )
                        .arg(
                            Arg::new("load-automata")
                            .short('l')
                            .long("load-automata")
                            .help("Load both DFAs from the JSON files in this directory instead of constructing them")
                            .value_name("DIRECTORY")
                            .value_parser(clap::value_parser!(PathBuf))
                        )
                        .arg(
                            Arg::new("verbose")
                            .short('v')
                            .long("verbose")
                            .help("Log at debug level")
                            .action(ArgAction::SetTrue)
                        )
                        .get_matches();

    init_logging(args.get_flag("verbose"))?;

    let source: Vec<u8> = if let Some(src_file_path) = args.get_one::<PathBuf>("input") {
        std::fs::read(src_file_path)
            .wrap_err_with(|| format!("Failed to read the source file {:?}", src_file_path))?
    } else if let Some(text) = args.get_one::<String>("text") {
        text.clone().into_bytes()
    } else {
        unreachable!("clap requires one of --input or --text")
    };

    let lexer = build_lexer(args.get_one::<PathBuf>("load-automata"))?;

    for grammar in Grammar::ALL {
        if args.get_flag("save-nfa") {
            save_dot(&grammar.construct_nfa(), format!("{}_nfa.dot", grammar.name()))?;
        }
        if args.get_flag("save-dfa") {
            save_dot(lexer.get_dfa(grammar), format!("{}_dfa.dot", grammar.name()))?;
        }
        if args.get_flag("save-automata") {
            let file_name = automaton_file_name(grammar);
            lexer.get_dfa(grammar).save(&file_name)?;
            tracing::info!(%grammar, path = %file_name, "saved DFA");
        }
    }

    let token_list = lexer.tokenize(&source);

    match args.get_one::<PathBuf>("output") {
        Some(out_file_path) => {
            let mut out_file = File::create(out_file_path)?;
            write_tokens(&mut out_file, &token_list, args.get_flag("json"))?;
            tracing::info!(tokens = token_list.len(), path = ?out_file_path, "wrote token list");
        }
        None => write_tokens(&mut io::stdout().lock(), &token_list, args.get_flag("json"))?,
    }

    if args.get_flag("check-balance") {
        if check_balanced(&source) {
            println!("Syntax: PDA accepts, delimiters are balanced");
        } else {
            println!("Syntax: PDA rejects, delimiters are unbalanced");
        }
    }

    if args.get_flag("trace") {
        match lexer.trace_first_token(&source) {
            Some((grammar, trace)) => {
                let path: Vec<String> = trace
                    .get_states()
                    .iter()
                    .map(|state| state.to_string())
                    .collect();
                println!(
                    "Trace ({} DFA, matched {} bytes): {}",
                    grammar,
                    trace.get_matched_len(),
                    path.join(" -> ")
                );
            }
            None => println!("Trace: the first token is not an identifier or a number"),
        }
    }

    if args.get_flag("describe") {
        for grammar in Grammar::ALL {
            println!("== {} DFA ==", grammar);
            print_states(lexer.get_dfa(grammar))?;
        }
    }

    Ok(())
}

fn print_states(dfa: &DFA) -> Result<()> {
    for state in 0..dfa.get_num_states() {
        println!("{}", describe_state(dfa, state)?);
    }
    Ok(())
}
