//! Command line for the translator.
//!
//! `coropp <input> [flags forwarded to the host parser...]` with `-v`
//! (syntax tree dump), `-l` (line directives) and `-p <dir>` (include
//! sandbox). Output goes to stdout, diagnostics to stderr; exit code 1 on
//! misuse, sandbox violations and wrong-context resumable constructs.

use std::io::Write;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use coropp_translate::{Error, Options, translate_file};

pub fn build_cli() -> Command {
    Command::new("coropp")
        .about("Resumable lambdas for C++ by source-to-source translation")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Input translation unit"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::SetTrue)
                .help("Dump the host syntax tree to standard error"),
        )
        .arg(
            Arg::new("line_directives")
                .short('l')
                .action(ArgAction::SetTrue)
                .help("Emit #line directives against the original source"),
        )
        .arg(
            Arg::new("sandbox")
                .short('p')
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Restrict transitively included files to realpaths under DIR"),
        )
        .arg(
            Arg::new("passthrough")
                .value_name("FLAGS")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Flags forwarded to the host parser"),
        )
}

pub struct RunArgs {
    pub input: PathBuf,
    pub verbose: bool,
    pub line_directives: bool,
    pub sandbox: Option<PathBuf>,
}

impl RunArgs {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            input: matches
                .get_one::<PathBuf>("input")
                .expect("clap enforces the input")
                .clone(),
            verbose: matches.get_flag("verbose"),
            line_directives: matches.get_flag("line_directives"),
            sandbox: matches.get_one::<PathBuf>("sandbox").cloned(),
        }
    }
}

/// Translate one unit; returns the process exit code.
pub fn run(args: RunArgs) -> u8 {
    let options = Options {
        verbose: args.verbose,
        line_directives: args.line_directives,
        sandbox_dir: args.sandbox.clone(),
    };

    match translate_file(&args.input, &options) {
        Ok(result) => {
            if args.verbose {
                eprintln!("** processing: {}", args.input.display());
                for file in &result.entered_files {
                    eprintln!("** entering: {}", file.display());
                }
                if let Some(dump) = &result.tree_dump {
                    eprint!("{dump}");
                }
            }
            let mut stdout = std::io::stdout().lock();
            if stdout.write_all(result.output.as_bytes()).is_err() {
                return 1;
            }
            0
        }
        Err(err) => {
            report(&args, &err);
            1
        }
    }
}

fn report(args: &RunArgs, err: &Error) {
    match err {
        Error::ParseFailed(diagnostics) | Error::ResumableContext(diagnostics) => {
            // Diagnostic spans address the encoded buffer; re-encode the
            // input so the carets line up.
            let source = std::fs::read_to_string(&args.input).unwrap_or_default();
            let encoded = coropp_translate::encode::encode(&source);
            let path = args.input.display().to_string();
            eprint!(
                "{}",
                diagnostics
                    .printer()
                    .source(&encoded.text)
                    .path(&path)
                    .render()
            );
            eprintln!();
        }
        other => eprintln!("error: {other}"),
    }
}
