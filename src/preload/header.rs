//! `link: <...>; rel="modulepreload"` header construction.

use url::Url;

use super::graph::ModuleGraph;

/// Path of `url` relative to the static root, with a leading slash.
///
/// Returns `None` for URLs outside `base`. The query string is kept so it
/// matches what the client will request.
pub fn site_path(url: &Url, base: &Url) -> Option<String> {
    let rest = url.as_str().strip_prefix(base.as_str())?;
    Some(format!("/{rest}"))
}

/// Build the `link` header value for `graph`.
///
/// Every module except the entry becomes `<origin/path>; rel="modulepreload"`,
/// in the graph's URL order, joined with `", "`. The entry is recognised both
/// by its site path matching `request_path` and by being the graph root.
/// Returns `None` when nothing is left to preload.
pub fn build_link_header(
    graph: &ModuleGraph,
    base: &Url,
    request_path: &str,
    origin: &str,
) -> Option<String> {
    let entries: Vec<String> = graph
        .modules()
        .filter(|node| &node.url != graph.root())
        .filter_map(|node| site_path(&node.url, base))
        .filter(|path| path != request_path)
        .map(|path| format!("<{origin}{path}>; rel=\"modulepreload\""))
        .collect();

    if entries.is_empty() {
        None
    } else {
        Some(entries.join(", "))
    }
}
