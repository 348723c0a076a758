//! Headless tile view: list the working set and exercise navigation.

use std::path::PathBuf;

use anyhow::Context;
use app_settings::AppSettings;
use clap::Args;
use core_types::MediaKind;
use model::{BackupBin, MediaController, MediaModel, PHOTO_KINDS, VIDEO_KINDS};

#[derive(Args, Debug)]
pub struct TilesArgs {
    /// Directory to browse; defaults to the generated sample set.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Walk the full listing with next-media navigation and print each stop.
    #[arg(long)]
    pub walk: bool,

    /// Restrict walking to photos or videos.
    #[arg(long, value_parser = ["photo", "video"])]
    pub only: Option<String>,
}

pub fn run(args: &TilesArgs) -> anyhow::Result<()> {
    let settings = AppSettings::load().unwrap_or_default();
    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => crate::sample::dir()?,
    };
    let bin = BackupBin::new(dir.join(&settings.renamer.backup_foldername));
    let mut controller = MediaController::new(MediaModel::new(), Box::new(bin));

    controller.update_dirpath(&dir);
    let files = controller.model().files().to_vec();
    if files.is_empty() {
        anyhow::bail!("no media files in {}", dir.display());
    }

    let cols = settings.tiles.max_col.max(1) as usize;
    for row in files.chunks(cols) {
        let line: Vec<String> = row
            .iter()
            .map(|p| {
                let marker = match MediaKind::of(p) {
                    MediaKind::Video => "▶",
                    _ => " ",
                };
                format!(
                    "{marker}{}",
                    p.file_name().and_then(|n| n.to_str()).unwrap_or("?")
                )
            })
            .collect();
        println!("{}", line.join("  "));
    }

    if args.walk {
        let filter = match args.only.as_deref() {
            Some("photo") => Some(PHOTO_KINDS),
            Some("video") => Some(VIDEO_KINDS),
            _ => None,
        };
        println!("--");
        for _ in 0..files.len() {
            controller.select_next_media(filter);
            let selected = controller
                .model()
                .media_path()
                .context("navigation left no selection")?;
            println!("{}", selected.display());
        }
    }
    Ok(())
}
