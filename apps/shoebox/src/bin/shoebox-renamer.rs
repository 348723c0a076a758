use clap::Parser;
use shoebox::commands::renamer::{self, RenamerArgs};

#[derive(Parser)]
#[command(name = "shoebox-renamer", about = "Rename media by capture time", version)]
struct Cli {
    #[command(flatten)]
    args: RenamerArgs,
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    renamer::run(&Cli::parse().args)
}
