//! List the face catalog.

use std::path::PathBuf;

use app_settings::AppSettings;
use catalog::FaceDb;
use clap::Args;

#[derive(Args, Debug)]
pub struct FacesArgs {
    /// Face database folder; defaults to the configured one.
    #[arg(long)]
    pub db: Option<PathBuf>,
}

pub fn run(args: &FacesArgs) -> anyhow::Result<()> {
    let settings = AppSettings::load().unwrap_or_default();
    let root = args
        .db
        .clone()
        .unwrap_or_else(|| settings.db_face_folder.clone());
    if root.as_os_str().is_empty() {
        anyhow::bail!("no face database configured; pass --db");
    }

    let db = FaceDb::load(&root)?;
    if db.is_empty() {
        println!("no enrolled faces in {}", root.display());
        return Ok(());
    }
    for name in db.known_names() {
        let filenames = db.known_filenames(Some(&name));
        println!("{name} ({})", filenames.len());
        for filename in filenames {
            println!("  {filename}");
        }
    }
    Ok(())
}
