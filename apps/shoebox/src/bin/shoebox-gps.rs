use clap::Parser;
use shoebox::commands::gps::{self, GpsArgs};

#[derive(Parser)]
#[command(name = "shoebox-gps", about = "Print or stamp GPS coordinates", version)]
struct Cli {
    #[command(flatten)]
    args: GpsArgs,
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    gps::run(&Cli::parse().args)
}
