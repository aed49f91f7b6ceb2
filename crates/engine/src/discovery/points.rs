//! Extension points and the nodes installed on them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use once_cell::sync::OnceCell;
use semver::Version;

/// Built-in capability kinds an extension can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Supplies drivers for additional test frameworks.
    DriverFactory,
    /// Writes result documents in additional formats.
    ResultWriter,
    /// Loads project files that reference test packs.
    ProjectLoader,
    /// Observes progress reports during a run.
    EventListener,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::DriverFactory,
        Capability::ResultWriter,
        Capability::ProjectLoader,
        Capability::EventListener,
    ];

    /// Name used in pack headers.
    pub fn name(self) -> &'static str {
        match self {
            Capability::DriverFactory => "DriverFactory",
            Capability::ResultWriter => "ResultWriter",
            Capability::ProjectLoader => "ProjectLoader",
            Capability::EventListener => "EventListener",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Capability::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Path synthesized for points declared by capability alone.
    pub fn default_path(self) -> String {
        format!("/Quench/Engine/TypeExtensions/{}", self.name())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One extension point offered by a host.
#[derive(Debug, Clone)]
pub struct PointDecl {
    /// Explicit path; synthesized from the capability when absent.
    pub path: Option<String>,
    pub capability: Capability,
    pub description: Option<String>,
}

impl PointDecl {
    pub fn resolved_path(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| self.capability.default_path())
    }
}

/// A component that offers extension points.
#[derive(Debug, Clone)]
pub struct ExtensionHost {
    pub name: String,
    pub points: Vec<PointDecl>,
}

impl ExtensionHost {
    pub fn new(name: impl Into<String>) -> Self {
        ExtensionHost {
            name: name.into(),
            points: Vec::new(),
        }
    }

    /// Adds a point with an explicit path.
    pub fn point(mut self, path: impl Into<String>, capability: Capability) -> Self {
        self.points.push(PointDecl {
            path: Some(path.into()),
            capability,
            description: None,
        });
        self
    }

    /// Adds a point at the capability's synthesized path.
    pub fn capability_point(mut self, capability: Capability, description: &str) -> Self {
        self.points.push(PointDecl {
            path: None,
            capability,
            description: Some(description.to_string()),
        });
        self
    }

    /// The points the engine itself offers.
    pub fn engine_defaults() -> Vec<ExtensionHost> {
        vec![ExtensionHost::new("quench-engine")
            .capability_point(
                Capability::DriverFactory,
                "Supplies drivers for frameworks the engine does not know",
            )
            .capability_point(Capability::ResultWriter, "Writes results in other formats")
            .capability_point(Capability::ProjectLoader, "Expands project files into packs")
            .capability_point(Capability::EventListener, "Observes test progress reports")]
    }
}

/// A registered plugin slot and the nodes installed on it.
#[derive(Debug)]
pub struct ExtensionPoint {
    pub(crate) path: String,
    pub(crate) capability: Capability,
    pub(crate) description: Option<String>,
    pub(crate) node_indices: Vec<usize>,
}

impl ExtensionPoint {
    pub(crate) fn new(path: String, capability: Capability, description: Option<String>) -> Self {
        ExtensionPoint {
            path,
            capability,
            description,
            node_indices: Vec::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True if no extension has been installed on this point.
    pub fn is_vacant(&self) -> bool {
        self.node_indices.is_empty()
    }
}

/// One discovered extension, bound to the point it extends.
#[derive(Debug)]
pub struct ExtensionNode {
    pack_path: PathBuf,
    pack_version: Version,
    entry: String,
    point_path: String,
    description: Option<String>,
    enabled: bool,
    legacy: bool,
    properties: BTreeMap<String, Vec<String>>,
    object: OnceCell<ExtensionObject>,
}

impl ExtensionNode {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pack_path: PathBuf,
        pack_version: Version,
        entry: String,
        point_path: String,
        description: Option<String>,
        enabled: bool,
        legacy: bool,
        properties: BTreeMap<String, Vec<String>>,
    ) -> Self {
        ExtensionNode {
            pack_path,
            pack_version,
            entry,
            point_path,
            description,
            enabled,
            legacy,
            properties,
            object: OnceCell::new(),
        }
    }

    /// Pack file this extension lives in.
    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    pub fn pack_version(&self) -> &Version {
        &self.pack_version
    }

    /// Exported entry identifier within the pack.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Path of the point this node is installed on.
    pub fn point_path(&self) -> &str {
        &self.point_path
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// True for extensions declared in the pre-3.0 `[[addin]]` style.
    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// Values declared for a property, empty when absent.
    pub fn property(&self, name: &str) -> &[String] {
        self.properties
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// The activated form of this extension. Created on first call and
    /// cached for the node's lifetime.
    pub fn object(&self) -> &ExtensionObject {
        self.object.get_or_init(|| {
            ExtensionObject::new(self.pack_path.clone(), self.entry.clone(), self.legacy)
        })
    }
}

/// An activated extension. For legacy addins, operation names are
/// translated from the engine's convention to the addin's on first use
/// and cached.
#[derive(Debug)]
pub struct ExtensionObject {
    pack_path: PathBuf,
    entry: String,
    legacy_names: Option<Mutex<BTreeMap<String, String>>>,
}

impl ExtensionObject {
    fn new(pack_path: PathBuf, entry: String, legacy: bool) -> Self {
        ExtensionObject {
            pack_path,
            entry,
            legacy_names: legacy.then(|| Mutex::new(BTreeMap::new())),
        }
    }

    pub fn pack_path(&self) -> &Path {
        &self.pack_path
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The operation name to invoke for an engine-convention name.
    /// Current-style extensions use the name as given; legacy addins use
    /// the old snake_case convention.
    pub fn operation_name(&self, canonical: &str) -> String {
        match &self.legacy_names {
            None => canonical.to_string(),
            Some(cache) => {
                let mut cache = cache.lock().unwrap_or_else(|e| e.into_inner());
                cache
                    .entry(canonical.to_string())
                    .or_insert_with(|| snake_case(canonical))
                    .clone()
            }
        }
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
