//! The extension manager: scans directories, reads manifests, and binds
//! extension declarations to registered points.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use tracing::{debug, info, warn};
use quench_pack::{DeclarationStyle, ExtensionDecl, PropertyValue, RuntimeTarget};

use super::candidate::CandidatePack;
use super::compat::{can_load_target, ensure_runner_can_load};
use super::points::{Capability, ExtensionHost, ExtensionNode, ExtensionPoint};
use super::tracker::CandidateTracker;
use crate::addons::{AddonsEntry, AddonsFile};
use crate::env::{HostEnv, INSTALL_RECEIPT_FILE};
use crate::error::{EngineError, Result};
use crate::fs::{Directory, DirectoryFinder, FileSystem, FsFile};

/// Patterns tried against each ancestor of the engine install when
/// locating extension packages.
const EXTENSION_DIR_PATTERNS: &[&str] = &["quench-ext-*/**/tools/", "quench-ext-*/**/tools/*/"];

/// Layout used instead when the install carries a package-manager
/// receipt.
const VERIFIED_DIR_PATTERNS: &[&str] =
    &["quench-extension-*/tools/", "quench-extension-*/tools/*/"];

const MANIFEST_PATTERN: &str = "*.addons";
const CANDIDATE_PATTERN: &str = "*.qpack";

/// Lifecycle of an [`ExtensionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// No scan has run.
    NotStarted,
    /// Candidates are queued but not yet materialized into nodes.
    Scanning,
    /// Nodes are built; accessors serve from memory.
    Loaded,
}

/// Discovers extensions and binds them to registered extension points.
///
/// Scanning only queues candidates; nodes are materialized once, on the
/// first accessor that needs them. Further scans after that are additive
/// and materialize on the next access.
pub struct ExtensionManager {
    fs: Arc<dyn FileSystem>,
    finder: DirectoryFinder,
    env: HostEnv,
    state: DiscoveryState,
    points: Vec<ExtensionPoint>,
    path_index: HashMap<String, usize>,
    nodes: Vec<ExtensionNode>,
    tracker: CandidateTracker,
    visited: HashSet<(PathBuf, bool)>,
    materialized: HashSet<PathBuf>,
    installed_names: HashSet<String>,
}

impl ExtensionManager {
    pub fn new(fs: Arc<dyn FileSystem>, env: HostEnv) -> Self {
        ExtensionManager {
            fs,
            finder: DirectoryFinder::new(),
            env,
            state: DiscoveryState::NotStarted,
            points: Vec::new(),
            path_index: HashMap::new(),
            nodes: Vec::new(),
            tracker: CandidateTracker::new(),
            visited: HashSet::new(),
            materialized: HashSet::new(),
            installed_names: HashSet::new(),
        }
    }

    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Registers the extension points the given hosts declare. Two hosts
    /// may not claim the same path. Once nodes are loaded the point set
    /// is frozen and further registrations are ignored.
    pub fn register_extension_points(&mut self, hosts: &[ExtensionHost]) -> Result<()> {
        if self.state == DiscoveryState::Loaded {
            debug!("extension points are frozen after load; ignoring registration");
            return Ok(());
        }
        for host in hosts {
            for decl in &host.points {
                let path = decl.resolved_path();
                if self.path_index.contains_key(&path) {
                    return Err(EngineError::DuplicateExtensionPoint(path));
                }
                debug!(host = %host.name, point = %path, "registering extension point");
                self.path_index.insert(path.clone(), self.points.len());
                self.points.push(ExtensionPoint::new(
                    path,
                    decl.capability,
                    decl.description.clone(),
                ));
            }
        }
        Ok(())
    }

    /// Registers the engine's own points.
    pub fn register_default_points(&mut self) -> Result<()> {
        self.register_extension_points(&ExtensionHost::engine_defaults())
    }

    /// Registered points, in registration order.
    pub fn extension_points(&self) -> impl Iterator<Item = &ExtensionPoint> {
        self.points.iter()
    }

    pub fn find_extension_point(&self, path: &str) -> Option<&ExtensionPoint> {
        self.path_index.get(path).map(|&index| &self.points[index])
    }

    /// Queues every candidate reachable from `start`. Directories with an
    /// addons manifest are scanned through it; directories without one
    /// have every pack taken as a wildcard candidate.
    pub fn find_candidates(&mut self, start: &Path) -> Result<()> {
        let dir = self
            .fs
            .directory(start)
            .ok_or_else(|| EngineError::InvalidArgument {
                name: "start",
                reason: format!("no such directory: {}", start.display()),
            })?;
        self.state = DiscoveryState::Scanning;
        self.process_directory(&dir, false)
    }

    /// Queues candidates from extension packages installed near the
    /// engine, climbing from `install_dir` to the filesystem root and
    /// applying the package layout patterns at each level.
    pub fn find_candidates_for_host(&mut self, install_dir: &Path) -> Result<()> {
        let start = self
            .fs
            .directory(install_dir)
            .ok_or_else(|| EngineError::InvalidArgument {
                name: "install_dir",
                reason: format!("no such directory: {}", install_dir.display()),
            })?;
        self.state = DiscoveryState::Scanning;

        let verified = self.fs.file_exists(&install_dir.join(INSTALL_RECEIPT_FILE));
        let patterns = if verified {
            debug!("install receipt present; using the verified package layout");
            VERIFIED_DIR_PATTERNS
        } else {
            EXTENSION_DIR_PATTERNS
        };

        let mut current = Some(start);
        while let Some(dir) = current {
            for pattern in patterns {
                for found in self.finder.directories(&dir, pattern) {
                    self.process_directory(&found, true)?;
                }
            }
            current = dir.parent();
        }
        Ok(())
    }

    /// Every discovered extension node. Triggers materialization.
    pub fn extensions(&mut self) -> Result<&[ExtensionNode]> {
        self.ensure_loaded()?;
        Ok(&self.nodes)
    }

    /// Nodes installed on the point at `path`. Unknown paths yield an
    /// empty set.
    pub fn extensions_for_path(&mut self, path: &str) -> Result<Vec<&ExtensionNode>> {
        self.ensure_loaded()?;
        let Some(&index) = self.path_index.get(path) else {
            return Ok(Vec::new());
        };
        Ok(self.points[index]
            .node_indices
            .iter()
            .map(|&i| &self.nodes[i])
            .collect())
    }

    /// Nodes installed on any point with the given capability.
    pub fn extensions_for_capability(&mut self, capability: Capability) -> Result<Vec<&ExtensionNode>> {
        self.ensure_loaded()?;
        Ok(self
            .points
            .iter()
            .filter(|point| point.capability == capability)
            .flat_map(|point| point.node_indices.iter().map(|&i| &self.nodes[i]))
            .collect())
    }

    /// Enabled nodes only.
    pub fn active_extensions(&mut self) -> Result<impl Iterator<Item = &ExtensionNode>> {
        self.ensure_loaded()?;
        Ok(self.nodes.iter().filter(|node| node.is_enabled()))
    }

    /// Enables or disables every node whose entry matches. Returns
    /// whether any node matched.
    pub fn enable_extension(&mut self, entry: &str, enabled: bool) -> Result<bool> {
        self.ensure_loaded()?;
        let mut found = false;
        for node in &mut self.nodes {
            if node.entry() == entry {
                node.set_enabled(enabled);
                found = true;
            }
        }
        Ok(found)
    }

    fn process_directory(&mut self, dir: &Arc<dyn Directory>, from_wildcard: bool) -> Result<()> {
        let key = (dir.path().to_path_buf(), from_wildcard);
        if !self.visited.insert(key) {
            warn!(
                path = %dir.path().display(),
                "directory was already visited in this scan; skipping"
            );
            return Ok(());
        }
        info!(
            path = %dir.path().display(),
            wildcard = from_wildcard,
            "scanning directory for extensions"
        );

        let manifests = dir.files(MANIFEST_PATTERN);
        if manifests.is_empty() {
            // No manifest: every pack in the directory is a candidate,
            // found by glob and treated accordingly.
            for file in dir.files(CANDIDATE_PATTERN) {
                self.process_candidate(&file, true)?;
            }
        } else {
            for manifest in manifests {
                self.process_manifest(dir, &manifest, from_wildcard)?;
            }
        }
        Ok(())
    }

    fn process_manifest(
        &mut self,
        base: &Arc<dyn Directory>,
        manifest: &Arc<dyn FsFile>,
        from_wildcard: bool,
    ) -> Result<()> {
        debug!(manifest = %manifest.path().display(), "reading extension manifest");
        let origin = manifest.path().display().to_string();
        let file = AddonsFile::read(manifest.open()?, &origin)?;
        for entry in file.entries() {
            self.process_manifest_entry(base, entry, from_wildcard)?;
        }
        Ok(())
    }

    fn process_manifest_entry(
        &mut self,
        base: &Arc<dyn Directory>,
        entry: &AddonsEntry,
        from_wildcard: bool,
    ) -> Result<()> {
        // Wildcard taint is contagious: it spreads from the manifest's own
        // origin and from any glob in the entry itself.
        let is_wild = from_wildcard || entry.is_pattern();

        let (start, pattern) = if entry.is_fully_qualified() {
            let (root, rest) = split_rooted(entry.text());
            match self.fs.directory(&root) {
                Some(dir) => (dir, rest),
                None => {
                    warn!(entry = %entry.text(), "entry names an unknown filesystem root; skipping");
                    return Ok(());
                }
            }
        } else {
            (Arc::clone(base), entry.text().to_string())
        };

        if entry.is_directory() {
            for dir in self.finder.directories(&start, &pattern) {
                self.process_directory(&dir, is_wild)?;
            }
        } else {
            for file in self.finder.files(&start, &pattern)? {
                self.process_candidate(&file, is_wild)?;
            }
        }
        Ok(())
    }

    fn process_candidate(&mut self, file: &Arc<dyn FsFile>, from_wildcard: bool) -> Result<()> {
        let path = file.path();
        if !self.tracker.mark_evaluated(path) {
            debug!(path = %path.display(), "candidate already evaluated; skipping");
            return Ok(());
        }
        debug!(
            path = %path.display(),
            wildcard = from_wildcard,
            "evaluating candidate pack"
        );
        match CandidatePack::from_file(file, from_wildcard) {
            Ok(candidate) => {
                self.tracker.add_or_update(candidate);
                Ok(())
            }
            Err(source) if from_wildcard => {
                warn!(
                    path = %path.display(),
                    error = %source,
                    "skipping unreadable wildcard candidate"
                );
                Ok(())
            }
            Err(source) => Err(EngineError::CandidateLoad {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Builds nodes from the queued candidates. Runs once per candidate;
    /// a candidate that fails here is not retried on later accesses.
    fn ensure_loaded(&mut self) -> Result<()> {
        if self.state == DiscoveryState::Loaded {
            return Ok(());
        }
        ensure_runner_can_load(&self.env.runtime)?;

        let mut pending = Vec::new();
        for candidate in self.tracker.winners() {
            if self.materialized.contains(candidate.path()) {
                continue;
            }
            pending.push(PendingInstall {
                path: candidate.path().to_path_buf(),
                name: candidate.name().to_string(),
                version: candidate.version().clone(),
                target: candidate.target().cloned(),
                from_wildcard: candidate.from_wildcard(),
                decls: candidate
                    .declared_extensions()
                    .map(|(decl, style)| (decl.clone(), style))
                    .collect(),
            });
        }
        for item in pending {
            // Marked per candidate so a failure leaves the untried ones
            // eligible on the next access.
            self.materialized.insert(item.path.clone());
            self.install_candidate(item)?;
        }
        self.state = DiscoveryState::Loaded;
        Ok(())
    }

    fn install_candidate(&mut self, item: PendingInstall) -> Result<()> {
        if let Some(target) = &item.target {
            if !can_load_target(&self.env.runtime, target)? {
                if item.from_wildcard {
                    info!(
                        path = %item.path.display(),
                        target = %target,
                        "candidate targets an incompatible runtime; skipping"
                    );
                    return Ok(());
                }
                return Err(EngineError::IncompatibleTarget {
                    path: item.path,
                    runner: self.env.runtime.to_string(),
                    target: target.to_string(),
                });
            }
        }
        if !self.installed_names.insert(item.name.clone()) {
            warn!(
                pack = %item.name,
                path = %item.path.display(),
                "a pack with this name was already installed; skipping"
            );
            return Ok(());
        }
        for (decl, style) in item.decls {
            self.install_declaration(&item.path, &item.version, decl, style)?;
        }
        Ok(())
    }

    fn install_declaration(
        &mut self,
        pack_path: &Path,
        pack_version: &Version,
        decl: ExtensionDecl,
        style: DeclarationStyle,
    ) -> Result<()> {
        if let Some(required) = &decl.engine_version {
            if *required > self.env.engine_version {
                warn!(
                    entry = %decl.entry,
                    required = %required,
                    host = %self.env.engine_version,
                    "extension requires a newer engine; not installing"
                );
                return Ok(());
            }
        }

        let point_index = match &decl.path {
            Some(path) => {
                self.path_index
                    .get(path)
                    .copied()
                    .ok_or_else(|| EngineError::UnknownExtensionPath {
                        pack: pack_path.to_path_buf(),
                        entry: decl.entry.clone(),
                        path: path.clone(),
                    })?
            }
            None => {
                let capability = decl.capability.as_deref().and_then(Capability::from_name);
                capability
                    .and_then(|wanted| {
                        self.points.iter().position(|point| point.capability == wanted)
                    })
                    .ok_or_else(|| EngineError::UnmatchedCapability {
                        pack: pack_path.to_path_buf(),
                        entry: decl.entry.clone(),
                    })?
            }
        };

        let point_path = self.points[point_index].path.clone();
        let properties = decl
            .properties
            .into_iter()
            .map(|(name, value)| {
                let values = match value {
                    PropertyValue::One(one) => vec![one],
                    PropertyValue::Many(many) => many,
                };
                (name, values)
            })
            .collect();

        debug!(entry = %decl.entry, point = %point_path, "installing extension");
        let node = ExtensionNode::new(
            pack_path.to_path_buf(),
            pack_version.clone(),
            decl.entry,
            point_path,
            decl.description,
            decl.enabled,
            style == DeclarationStyle::Addin,
            properties,
        );
        let node_index = self.nodes.len();
        self.nodes.push(node);
        self.points[point_index].node_indices.push(node_index);
        Ok(())
    }
}

struct PendingInstall {
    path: PathBuf,
    name: String,
    version: Version,
    target: Option<RuntimeTarget>,
    from_wildcard: bool,
    decls: Vec<(ExtensionDecl, DeclarationStyle)>,
}

/// Splits an absolute entry into its filesystem root and the pattern to
/// resolve beneath it.
fn split_rooted(text: &str) -> (PathBuf, String) {
    if let Some(rest) = text.strip_prefix('/') {
        return (PathBuf::from("/"), rest.to_string());
    }
    match text.split_once(":/") {
        Some((drive, rest)) => (PathBuf::from(format!("{drive}:/")), rest.to_string()),
        None => (PathBuf::from("/"), text.to_string()),
    }
}
