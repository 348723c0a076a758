//! Container I/O behind a trait, so the edit pipeline and player never
//! touch libav directly.

use std::path::Path;

use crate::{Clip, Result};

pub trait ClipCodec: Send + Sync {
    /// Decodes the whole file into frames and PCM audio.
    fn open(&self, path: &Path) -> Result<Clip>;

    /// Encodes `clip` to `path`, container chosen by extension.
    fn save(&self, clip: &Clip, path: &Path) -> Result<()>;
}

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::ClipCodec;
    use crate::{Clip, ClipError, Result};

    /// Path-keyed clip store standing in for a real container codec.
    #[derive(Default, Clone)]
    pub(crate) struct MemoryCodec {
        store: Arc<Mutex<HashMap<PathBuf, Clip>>>,
        fail_saves: Arc<AtomicBool>,
    }

    impl MemoryCodec {
        pub(crate) fn insert(&self, path: impl Into<PathBuf>, clip: Clip) {
            self.store.lock().unwrap().insert(path.into(), clip);
        }

        pub(crate) fn get(&self, path: impl AsRef<Path>) -> Option<Clip> {
            self.store.lock().unwrap().get(path.as_ref()).cloned()
        }

        pub(crate) fn set_fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }
    }

    impl ClipCodec for MemoryCodec {
        fn open(&self, path: &Path) -> Result<Clip> {
            self.get(path)
                .ok_or_else(|| ClipError::Codec(format!("no clip at {}", path.display())))
        }

        fn save(&self, clip: &Clip, path: &Path) -> Result<()> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(ClipError::Codec("save rejected".into()));
            }
            self.insert(path, clip.clone());
            Ok(())
        }
    }
}
