use clap::{Parser, Subcommand};
use shoebox::commands::{clipedit, faces, gps, imgedit, renamer, tiles};

#[derive(Parser)]
#[command(name = "shoebox", about = "Media shoebox toolbox", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse a directory of media.
    Tiles(tiles::TilesArgs),
    /// Apply image edits and save.
    Imgedit(imgedit::ImgeditArgs),
    /// Apply clip edits and render.
    Clipedit(clipedit::ClipeditArgs),
    /// Print or stamp GPS coordinates.
    Gps(gps::GpsArgs),
    /// Rename media by capture time.
    Renamer(renamer::RenamerArgs),
    /// List the face catalog.
    Faces(faces::FacesArgs),
}

fn main() -> anyhow::Result<()> {
    shoebox::init_tracing();
    match Cli::parse().command {
        Commands::Tiles(args) => tiles::run(&args),
        Commands::Imgedit(args) => imgedit::run(&args),
        Commands::Clipedit(args) => clipedit::run(&args),
        Commands::Gps(args) => gps::run(&args),
        Commands::Renamer(args) => renamer::run(&args),
        Commands::Faces(args) => faces::run(&args),
    }
}
