use clap::Parser;
use shoebox::commands::tiles::{self, TilesArgs};

#[derive(Parser)]
#[command(name = "shoebox-tiles", about = "Browse a directory of media", version)]
struct Cli {
    #[command(flatten)]
    args: TilesArgs,
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    tiles::run(&Cli::parse().args)
}
