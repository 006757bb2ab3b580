mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands};
use commands::{classify, polygonize};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    logging::init(cli.verbose);
    match &cli.command {
        Commands::Classify(args) => classify::run(&cli, args),
        Commands::Polygonize(args) => polygonize::run(&cli, args),
    }
}

fn main() -> anyhow::Result<()> { run() }
