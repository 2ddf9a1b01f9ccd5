//! Module dependency graph.
//!
//! Resolves every module reachable from an entry module by scanning each
//! module's imports until no new modules turn up.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use url::Url;

use super::error::{GraphError, GraphResult};
use super::loader::ModuleLoader;
use super::scan::{scan_imports, ImportKind};
use crate::logger;

/// A resolved import edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Specifier as written in the importing module.
    pub specifier: String,
    pub url: Url,
    pub kind: ImportKind,
}

/// One resolved module in the graph.
#[derive(Debug, Clone)]
pub struct ModuleNode {
    pub url: Url,
    /// Local dependencies in source order.
    pub dependencies: Vec<Dependency>,
}

/// All modules transitively reachable from one entry, including the entry.
///
/// Modules are keyed by URL, so iteration is in lexicographic URL order and
/// a module can only appear once.
#[derive(Debug, Clone)]
pub struct ModuleGraph {
    root: Url,
    modules: BTreeMap<Url, ModuleNode>,
    /// Remote or non-file specifiers that were seen but not followed.
    externals: BTreeSet<Url>,
}

impl ModuleGraph {
    /// The entry module.
    pub const fn root(&self) -> &Url {
        &self.root
    }

    /// Number of modules, entry included.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Always false for a resolved graph, which holds at least its entry.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.modules.contains_key(url)
    }

    pub fn get(&self, url: &Url) -> Option<&ModuleNode> {
        self.modules.get(url)
    }

    /// Modules in lexicographic URL order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values()
    }

    pub fn externals(&self) -> impl Iterator<Item = &Url> {
        self.externals.iter()
    }
}

/// Options controlling which edges the resolver follows.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub follow_dynamic_imports: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            follow_dynamic_imports: true,
        }
    }
}

/// Outcome of resolving a single specifier.
#[derive(Debug, PartialEq, Eq)]
enum Resolved {
    Module(Url),
    External(Url),
}

/// Builds [`ModuleGraph`]s for modules under one static root.
pub struct GraphResolver<'a, L> {
    loader: &'a L,
    /// `file:` URL of the static root, with a trailing slash.
    base: &'a Url,
    options: ResolveOptions,
}

impl<'a, L: ModuleLoader> GraphResolver<'a, L> {
    pub const fn new(loader: &'a L, base: &'a Url, options: ResolveOptions) -> Self {
        Self {
            loader,
            base,
            options,
        }
    }

    /// Resolve the graph of `entry`.
    ///
    /// Fails if any reachable module cannot be read, scanned or resolved.
    /// Each module is loaded at most once, so import cycles terminate.
    pub async fn build(&self, entry: Url) -> GraphResult<ModuleGraph> {
        self.check_inside_root(&entry)?;

        let mut modules: BTreeMap<Url, ModuleNode> = BTreeMap::new();
        let mut externals: BTreeSet<Url> = BTreeSet::new();
        let mut queued: HashSet<Url> = HashSet::new();
        let mut queue: VecDeque<Url> = VecDeque::new();

        queued.insert(entry.clone());
        queue.push_back(entry.clone());

        while let Some(url) = queue.pop_front() {
            let source = self.loader.load(&url).await?;
            let imports = scan_imports(&source).map_err(|source| GraphError::Scan {
                url: url.clone(),
                source,
            })?;

            let mut dependencies = Vec::with_capacity(imports.len());
            for import in imports {
                if import.kind == ImportKind::Dynamic && !self.options.follow_dynamic_imports {
                    continue;
                }
                match self.resolve_specifier(&import.specifier, &url)? {
                    Resolved::External(external) => {
                        logger::log_debug(&format!(
                            "[PRELOAD] Not following external module {external} (from {url})"
                        ));
                        externals.insert(external);
                    }
                    Resolved::Module(dep_url) => {
                        self.check_inside_root(&dep_url)?;
                        if queued.insert(dep_url.clone()) {
                            queue.push_back(dep_url.clone());
                        }
                        dependencies.push(Dependency {
                            specifier: import.specifier,
                            url: dep_url,
                            kind: import.kind,
                        });
                    }
                }
            }

            modules.insert(
                url.clone(),
                ModuleNode {
                    url,
                    dependencies,
                },
            );
        }

        Ok(ModuleGraph {
            root: entry,
            modules,
            externals,
        })
    }

    /// Resolve `specifier` as imported by `referrer`.
    ///
    /// Root-relative specifiers (`/x.js`) resolve against the static root,
    /// the same way a browser resolves them against the serving origin.
    fn resolve_specifier(&self, specifier: &str, referrer: &Url) -> GraphResult<Resolved> {
        let invalid = |source: url::ParseError| GraphError::InvalidSpecifier {
            specifier: specifier.to_string(),
            referrer: referrer.clone(),
            source,
        };

        let mut url = if specifier.starts_with("//") {
            let remote = Url::parse(&format!("https:{specifier}")).map_err(invalid)?;
            return Ok(Resolved::External(remote));
        } else if let Some(rest) = specifier.strip_prefix('/') {
            self.base.join(rest).map_err(invalid)?
        } else if specifier.starts_with("./") || specifier.starts_with("../") {
            referrer.join(specifier).map_err(invalid)?
        } else {
            match Url::parse(specifier) {
                Ok(url) => url,
                Err(url::ParseError::RelativeUrlWithoutBase) => {
                    return Err(GraphError::UnsupportedSpecifier {
                        specifier: specifier.to_string(),
                        referrer: referrer.clone(),
                    });
                }
                Err(e) => return Err(invalid(e)),
            }
        };

        url.set_fragment(None);
        if url.scheme() == "file" {
            Ok(Resolved::Module(url))
        } else {
            Ok(Resolved::External(url))
        }
    }

    fn check_inside_root(&self, url: &Url) -> GraphResult<()> {
        if url.scheme() == "file" && url.as_str().starts_with(self.base.as_str()) {
            Ok(())
        } else {
            Err(GraphError::OutsideRoot { url: url.clone() })
        }
    }
}
