use clap::Parser;
use shoebox::commands::clipedit::{self, ClipeditArgs};

#[derive(Parser)]
#[command(name = "shoebox-clipedit", about = "Apply clip edits and render", version)]
struct Cli {
    #[command(flatten)]
    args: ClipeditArgs,
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    clipedit::run(&Cli::parse().args)
}
