//! Plan and apply capture-time renames.

use std::path::PathBuf;

use app_settings::AppSettings;
use clap::Args;
use renamer::{apply, ApplyOptions, RenameStatus, Registry};
use tracing::warn;

#[derive(Args, Debug)]
pub struct RenamerArgs {
    /// Directory whose media files are renamed; defaults to the
    /// generated sample set.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Perform the renames; without this flag only the plan is printed.
    #[arg(long)]
    pub apply: bool,

    /// Destination-name builder tag.
    #[arg(long, default_value = "datetime")]
    pub builder: String,
}

pub fn run(args: &RenamerArgs) -> anyhow::Result<()> {
    let settings = AppSettings::load().unwrap_or_default();
    let opts = ApplyOptions {
        create_backup: settings.renamer.create_backup,
        backup_foldername: settings.renamer.backup_foldername.clone(),
        delete_duplicate: settings.renamer.delete_duplicate,
    };

    let dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => crate::sample::dir()?,
    };
    let registry = Registry::default();
    let plans = registry.plan_dir(&dir, &args.builder)?;
    if plans.is_empty() {
        anyhow::bail!("no media files in {}", dir.display());
    }

    let mut failures = 0usize;
    for plan in &plans {
        let status = match plan.status {
            RenameStatus::ExifOnly => "exif_only",
            RenameStatus::FileTime => "filetime",
            RenameStatus::Skipped => "skipped",
        };
        println!(
            "{status:9} {} -> {}",
            plan.src.display(),
            plan.dest.display()
        );
        if args.apply {
            if let Err(err) = apply(plan, &opts) {
                warn!(src = %plan.src.display(), %err, "rename failed");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        anyhow::bail!("{failures} of {} renames failed", plans.len());
    }
    Ok(())
}
