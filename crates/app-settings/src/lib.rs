//! Application configuration.
//!
//! One JSON document holding the face-database location plus a
//! sub-object per window. Key names are fixed by the on-disk format, so
//! they are mapped explicitly rather than derived from field names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppSettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings path unavailable")]
    MissingSettingsPath,
}

pub type Result<T> = std::result::Result<T, AppSettingsError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    #[serde(rename = "DB_FACE_FOLDER")]
    pub db_face_folder: PathBuf,

    #[serde(rename = "MainRenamerWindow")]
    pub renamer: RenamerSettings,

    #[serde(rename = "ClipEditorWindow")]
    pub clip_editor: ClipEditorSettings,

    #[serde(rename = "MainTileWindow")]
    pub tiles: TileSettings,

    #[serde(rename = "FaceEditorWindow")]
    pub face_editor: FaceEditorSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenamerSettings {
    #[serde(rename = "CREATE_BACKUP")]
    pub create_backup: bool,

    #[serde(rename = "BACKUP_FOLDERNAME")]
    pub backup_foldername: String,

    #[serde(rename = "DELETE_DUPLICATE")]
    pub delete_duplicate: bool,
}

impl Default for RenamerSettings {
    fn default() -> Self {
        Self {
            create_backup: true,
            backup_foldername: "backup".to_string(),
            delete_duplicate: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipEditorSettings {
    #[serde(rename = "AUTOPLAY")]
    pub autoplay: bool,
}

impl Default for ClipEditorSettings {
    fn default() -> Self {
        Self { autoplay: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    #[serde(rename = "MAX_COL")]
    pub max_col: u32,

    #[serde(rename = "TILES_THUMBNAIL_SIZE")]
    pub tiles_thumbnail_size: u32,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            max_col: 4,
            tiles_thumbnail_size: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceEditorSettings {
    #[serde(rename = "DB_FOLDER")]
    pub db_folder: PathBuf,
}

impl AppSettings {
    /// Loads from the per-user config location; absence yields defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_file_path()?)
    }

    /// Loads from an explicit path; absence yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.home_dir().to_path_buf();
    path.push("Library");
    path.push("Preferences");
    path.push("com.shoebox");
    std::fs::create_dir_all(&path)?;
    path.push("settings.json");
    Ok(path)
}

#[cfg(not(target_os = "macos"))]
fn settings_file_path() -> Result<PathBuf> {
    let base = directories::BaseDirs::new().ok_or(AppSettingsError::MissingSettingsPath)?;
    let mut path = base.config_dir().to_path_buf();
    path.push("shoebox");
    std::fs::create_dir_all(&path)?;
    path.push("settings.json");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let settings = AppSettings::load_from(&dir.path().join("settings.json")).unwrap();
        assert!(settings.renamer.create_backup);
        assert_eq!(settings.renamer.backup_foldername, "backup");
        assert_eq!(settings.tiles.max_col, 4);
    }

    #[test]
    fn save_uses_the_on_disk_key_names() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        AppSettings::default().save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        for key in [
            "DB_FACE_FOLDER",
            "MainRenamerWindow",
            "CREATE_BACKUP",
            "ClipEditorWindow",
            "AUTOPLAY",
            "MainTileWindow",
            "TILES_THUMBNAIL_SIZE",
            "FaceEditorWindow",
            "DB_FOLDER",
        ] {
            assert!(raw.contains(key), "missing key {key}");
        }
    }

    #[test]
    fn partial_document_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"DB_FACE_FOLDER": "/faces", "MainRenamerWindow": {"DELETE_DUPLICATE": true}}"#,
        )
        .unwrap();

        let settings = AppSettings::load_from(&path).unwrap();
        assert_eq!(settings.db_face_folder, PathBuf::from("/faces"));
        assert!(settings.renamer.delete_duplicate);
        assert!(settings.renamer.create_backup);
        assert!(settings.clip_editor.autoplay);
    }

    #[test]
    fn round_trips_modified_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.db_face_folder = PathBuf::from("/data/faces");
        settings.tiles.max_col = 7;
        settings.save_to(&path).unwrap();

        let back = AppSettings::load_from(&path).unwrap();
        assert_eq!(back.db_face_folder, PathBuf::from("/data/faces"));
        assert_eq!(back.tiles.max_col, 7);
    }
}
