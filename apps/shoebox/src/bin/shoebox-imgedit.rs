use clap::Parser;
use shoebox::commands::imgedit::{self, ImgeditArgs};

#[derive(Parser)]
#[command(name = "shoebox-imgedit", about = "Apply image edits and save", version)]
struct Cli {
    #[command(flatten)]
    args: ImgeditArgs,
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    imgedit::run(&Cli::parse().args)
}
