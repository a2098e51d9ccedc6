use clap::Parser;

use pedigree::cli::args::Cli;
use pedigree::cli::commands::execute_command;
use pedigree::observability::init_logging;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = std::io::stdout();
    if let Err(e) = execute_command(&cli, &mut stdout.lock()) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
