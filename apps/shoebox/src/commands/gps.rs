//! Print or stamp GPS coordinates.

use std::path::PathBuf;

use clap::Args;
use core_types::MediaKind;
use metadata::ExifCodec;
use tracing::warn;

#[derive(Args, Debug)]
pub struct GpsArgs {
    /// Directory whose JPEGs are scanned for coordinates; defaults to
    /// the generated sample set.
    #[arg(long, conflicts_with = "file")]
    pub dir: Option<PathBuf>,

    /// Single file to inspect or stamp.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Write coordinates as `lat,lng` into `--file`.
    #[arg(long, requires = "file")]
    pub set: Option<String>,
}

pub fn run(args: &GpsArgs) -> anyhow::Result<()> {
    if let Some(spec) = &args.set {
        let file = args.file.as_ref().expect("clap enforces --file");
        let (lat, lng) = parse_coords(spec)?;
        let mut meta = ExifCodec::read(file)?;
        meta.set_gps_coordinates(lat, lng);
        ExifCodec::write(file, &meta)?;
        println!("{}: {lat}, {lng}", file.display());
        return Ok(());
    }

    let files: Vec<PathBuf> = match (&args.dir, &args.file) {
        (None, Some(file)) => vec![file.clone()],
        (dir, None) => {
            let dir = match dir {
                Some(dir) => dir.clone(),
                None => crate::sample::dir()?,
            };
            let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| MediaKind::of(p) == MediaKind::PhotoJpg)
                .collect();
            files.sort();
            files
        }
        (Some(_), Some(_)) => unreachable!("clap rejects --dir with --file"),
    };

    for file in files {
        match ExifCodec::read(&file) {
            Ok(meta) => match meta.gps_coordinates() {
                Some((lat, lng)) => println!("{}: {lat}, {lng}", file.display()),
                None => println!("{}: -", file.display()),
            },
            Err(err) => warn!(file = %file.display(), %err, "unreadable metadata"),
        }
    }
    Ok(())
}

fn parse_coords(spec: &str) -> anyhow::Result<(f64, f64)> {
    match spec.split_once(',') {
        Some((lat, lng)) => Ok((lat.trim().parse()?, lng.trim().parse()?)),
        None => anyhow::bail!("coordinates must be lat,lng, got {spec:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_parse_with_spaces() {
        let (lat, lng) = parse_coords("1.3051, 103.8218").unwrap();
        assert!((lat - 1.3051).abs() < 1e-9);
        assert!((lng - 103.8218).abs() < 1e-9);
        assert!(parse_coords("1.0").is_err());
    }
}
