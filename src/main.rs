use colored::Colorize;
use talenttrack::app::CliError;

fn main() {
    match talenttrack::app::run_cli() {
        Ok(()) => {}
        Err(CliError::Reported) => std::process::exit(1),
        Err(CliError::Message(e)) => {
            eprintln!("{} {e}", "error:".bold().red());
            std::process::exit(1);
        }
    }
}
