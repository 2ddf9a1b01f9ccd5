// Static root module
// The directory every request is served from, fixed at startup

use std::io;
use std::path::{Path, PathBuf};
use url::Url;

/// Canonical static root directory and its `file:` base URL.
///
/// The base URL always ends with a slash, so a module URL is inside the root
/// exactly when it starts with the base URL.
#[derive(Debug, Clone)]
pub struct StaticRoot {
    dir: PathBuf,
    base_url: Url,
}

impl StaticRoot {
    /// Canonicalize `dir` and derive its base URL.
    ///
    /// Fails if the directory does not exist or is not a directory.
    pub fn new(dir: &Path) -> io::Result<Self> {
        let dir = dir.canonicalize().map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Static root '{}' is not accessible: {e}", dir.display()),
            )
        })?;

        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Static root '{}' is not a directory", dir.display()),
            ));
        }

        let base_url = Url::from_directory_path(&dir).map_err(|()| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Static root '{}' cannot be expressed as a file URL", dir.display()),
            )
        })?;

        Ok(Self { dir, base_url })
    }

    /// Resolve the configured root against the working directory.
    pub fn from_working_dir(root: &str) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::new(&cwd.join(root))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a canonical path lies inside the root
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.dir)
    }
}
