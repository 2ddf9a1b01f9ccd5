//! Static file serving module
//!
//! Maps request paths onto files under the static root and loads them.

use hyper::body::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use url::Url;

use crate::config::StaticRoot;
use crate::http::mime;
use crate::logger;

/// A file found under the static root
#[derive(Debug)]
pub struct StaticFile {
    /// Location the client addressed, index file name included. Relative
    /// imports in the file resolve against this, not against `path`.
    pub url: Url,
    /// Canonical path of the file that was read
    pub path: PathBuf,
    pub content: Bytes,
    pub content_type: &'static str,
}

impl StaticFile {
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }
}

/// Outcome of looking up a request path
#[derive(Debug)]
pub enum Lookup {
    File(StaticFile),
    /// A directory was requested without its trailing slash
    Redirect(String),
    NotFound,
}

/// Load the file a request path refers to
///
/// The path is percent-decoded and resolved against the static root.
/// Directories are served through the first existing index file, once the
/// client has been redirected to the slash-terminated path. Paths that escape
/// the root are `NotFound`.
pub async fn load(root: &StaticRoot, request_path: &str, index_files: &[String]) -> Lookup {
    let relative = request_path.trim_start_matches('/');
    let Ok(mut url) = root.base_url().join(relative) else {
        return Lookup::NotFound;
    };
    if url.scheme() != "file" {
        return Lookup::NotFound;
    }
    let Ok(file_path) = url.to_file_path() else {
        return Lookup::NotFound;
    };

    let Some(mut canonical) = canonicalize_inside(root, request_path, &file_path).await else {
        return Lookup::NotFound;
    };

    if is_dir(&canonical).await {
        if !url.path().ends_with('/') {
            return Lookup::Redirect(format!("{request_path}/"));
        }
        let Some(index_file) = find_index_file(&canonical, index_files).await else {
            return Lookup::NotFound;
        };
        let Some(index_path) =
            canonicalize_inside(root, request_path, &canonical.join(index_file)).await
        else {
            return Lookup::NotFound;
        };
        let Ok(index_url) = url.join(index_file) else {
            return Lookup::NotFound;
        };
        canonical = index_path;
        url = index_url;
    }

    let content = match fs::read(&canonical).await {
        Ok(c) => c,
        Err(e) => {
            logger::log_error(&format!(
                "Failed to read file '{}': {}",
                canonical.display(),
                e
            ));
            return Lookup::NotFound;
        }
    };

    let content_type = mime::get_content_type(canonical.extension().and_then(|e| e.to_str()));

    Lookup::File(StaticFile {
        url,
        path: canonical,
        content: Bytes::from(content),
        content_type,
    })
}

/// Canonicalize `path`, rejecting anything that ends up outside the root
async fn canonicalize_inside(root: &StaticRoot, request_path: &str, path: &Path) -> Option<PathBuf> {
    // File not found is common (404), no need to log at warning level
    let canonical = fs::canonicalize(path).await.ok()?;
    if !root.contains(&canonical) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            request_path,
            canonical.display()
        ));
        return None;
    }
    Some(canonical)
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn find_index_file<'a>(dir: &Path, index_files: &'a [String]) -> Option<&'a str> {
    for index_file in index_files {
        if fs::metadata(dir.join(index_file)).await.is_ok_and(|m| m.is_file()) {
            return Some(index_file);
        }
    }
    None
}
