//! Remote state storage.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{OnboardingError, OnboardingResult};

const BACKUP_SUFFIX: &str = ".backup";

/// Object store holding the last applied allowlist state.
pub trait StateBucket {
    /// Human-readable bucket name, for error messages.
    fn name(&self) -> String;

    fn exists(&self) -> bool;

    /// Object contents, or `None` when the object does not exist.
    fn load(&self, object: &str) -> OnboardingResult<Option<String>>;

    /// Create `object` empty.
    fn create(&self, object: &str) -> OnboardingResult<()>;

    /// Replace `object` with `contents`, keeping a backup until the write lands.
    fn replace(&self, object: &str, contents: &str) -> OnboardingResult<()>;
}

/// Bucket backed by a local directory; object names may contain `/`.
#[derive(Debug, Clone)]
pub struct FsBucket {
    root: PathBuf,
}

impl FsBucket {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, object: &str) -> PathBuf {
        self.root.join(object)
    }

    fn write(path: &Path, contents: &str) -> OnboardingResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| OnboardingError::io(parent, e))?;
        }
        fs::write(path, contents).map_err(|e| OnboardingError::io(path, e))
    }
}

impl StateBucket for FsBucket {
    fn name(&self) -> String {
        self.root.display().to_string()
    }

    fn exists(&self) -> bool {
        self.root.is_dir()
    }

    fn load(&self, object: &str) -> OnboardingResult<Option<String>> {
        let path = self.object_path(object);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OnboardingError::io(path, e)),
        }
    }

    fn create(&self, object: &str) -> OnboardingResult<()> {
        Self::write(&self.object_path(object), "")
    }

    fn replace(&self, object: &str, contents: &str) -> OnboardingResult<()> {
        let path = self.object_path(object);
        let backup = self.object_path(&format!("{}{}", object, BACKUP_SUFFIX));

        debug!(object, "replacing remote state");
        fs::rename(&path, &backup).map_err(|e| OnboardingError::io(&path, e))?;
        Self::write(&path, contents)?;
        fs::remove_file(&backup).map_err(|e| OnboardingError::io(&backup, e))
    }
}
