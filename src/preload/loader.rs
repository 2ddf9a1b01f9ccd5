//! Module source loading.

use std::future::Future;
use url::Url;

use super::error::{GraphError, GraphResult};

/// Source of module text for the graph resolver.
pub trait ModuleLoader {
    /// Load the source text of the module at `url`.
    fn load(&self, url: &Url) -> impl Future<Output = GraphResult<String>>;
}

/// Reads `file:` modules from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl ModuleLoader for FsLoader {
    async fn load(&self, url: &Url) -> GraphResult<String> {
        let path = url
            .to_file_path()
            .map_err(|()| GraphError::NotAFile { url: url.clone() })?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| GraphError::Read {
                url: url.clone(),
                source,
            })
    }
}

#[cfg(test)]
pub use memory::MemoryLoader;
