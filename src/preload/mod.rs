//! Module preload module
//!
//! Resolves the import graph of a served script and turns it into a
//! `link` header of `rel="modulepreload"` hints, so clients can fetch every
//! dependency in parallel.

pub mod error;
pub mod graph;
pub mod header;
pub mod loader;
pub mod scan;

use url::Url;

use error::GraphResult;
use graph::{GraphResolver, ResolveOptions};
use header::build_link_header;
use loader::FsLoader;

use crate::config::{PreloadConfig, StaticRoot};
use crate::logger;

/// Compute the `link` header value for a served script.
///
/// `entry` is the script's location as the client addressed it (under the
/// root's base URL, symlinks not followed), `request_path` the path the
/// client asked for and `origin` the scheme, host and port to prefix each
/// entry with. `Ok(None)` means the script has no dependencies.
pub async fn preload_header(
    root: &StaticRoot,
    options: &PreloadConfig,
    entry: &Url,
    request_path: &str,
    origin: &str,
) -> GraphResult<Option<String>> {
    let resolve_options = ResolveOptions {
        follow_dynamic_imports: options.follow_dynamic_imports,
    };
    let graph = GraphResolver::new(&FsLoader, root.base_url(), resolve_options)
        .build(entry.clone())
        .await?;

    let header = build_link_header(&graph, root.base_url(), request_path, origin);
    logger::log_preload_resolved(request_path, graph.len(), graph.externals().count());
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preload::error::GraphError;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, StaticRoot) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "import { b } from './b.js';").unwrap();
        fs::write(dir.path().join("b.js"), "export * from './lib/c.js';").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/c.js"), "export const c = 1;").unwrap();
        let root = StaticRoot::new(dir.path()).unwrap();
        (dir, root)
    }

    #[tokio::test]
    async fn test_preload_header_from_disk() {
        let (_dir, root) = setup();
        let entry = root.base_url().join("a.js").unwrap();
        let header = preload_header(&root, &PreloadConfig::default(), &entry, "/a.js", "http://host")
            .await
            .unwrap();
        assert_eq!(
            header.as_deref(),
            Some("<http://host/b.js>; rel=\"modulepreload\", <http://host/lib/c.js>; rel=\"modulepreload\"")
        );
    }

    #[tokio::test]
    async fn test_preload_header_leaf() {
        let (_dir, root) = setup();
        let entry = root.base_url().join("lib/c.js").unwrap();
        let header = preload_header(&root, &PreloadConfig::default(), &entry, "/lib/c.js", "http://host")
            .await
            .unwrap();
        assert_eq!(header, None);
    }

    #[tokio::test]
    async fn test_preload_header_missing_dependency() {
        let (_dir, root) = setup();
        fs::remove_file(root.dir().join("lib/c.js")).unwrap();
        let entry = root.base_url().join("a.js").unwrap();
        let result =
            preload_header(&root, &PreloadConfig::default(), &entry, "/a.js", "http://host").await;
        assert!(matches!(result, Err(GraphError::Read { .. })));
    }
}
