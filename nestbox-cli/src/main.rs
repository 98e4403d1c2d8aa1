mod cli;
mod commands;

use clap::Parser;

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    nestbox::util::init_tracing(&cli.global.log_level);

    let result = match cli.command {
        Commands::Classical(args) => commands::classical::execute(args, &cli.global),
        Commands::ThreeStep(args) => commands::three_step::execute(args, &cli.global),
        Commands::Premature(args) => commands::premature::execute(args, &cli.global),
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
