mod cli;


use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = cli::build_cli().get_matches();
    let args = cli::RunArgs::from_matches(&matches);
    ExitCode::from(cli::run(args))
}
