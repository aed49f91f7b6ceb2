//! The TOML header carried by every test pack.

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::target::RuntimeTarget;

/// Parsed header of a test pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackHeader {
    pub pack: PackInfo,

    /// Frameworks the pack was built against.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Requirement>,

    /// Extensions the pack contributes, current declaration style.
    #[serde(default, rename = "extension", skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<ExtensionDecl>,

    /// Extensions declared in the pre-3.0 style. Read for compatibility;
    /// new packs should use `[[extension]]`.
    #[serde(default, rename = "addin", skip_serializing_if = "Vec::is_empty")]
    pub addins: Vec<ExtensionDecl>,

    /// Present only in framework packs that ship a test controller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<FrameworkInfo>,
}

impl PackHeader {
    /// Every extension declaration with the style it was written in.
    pub fn declared_extensions(&self) -> impl Iterator<Item = (&ExtensionDecl, DeclarationStyle)> {
        self.extensions
            .iter()
            .map(|decl| (decl, DeclarationStyle::Current))
            .chain(
                self.addins
                    .iter()
                    .map(|decl| (decl, DeclarationStyle::Addin)),
            )
    }

    /// Checks structural rules the TOML grammar cannot express.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.pack.name.is_empty() {
            return Err("pack name may not be empty".to_string());
        }
        for (decl, _) in self.declared_extensions() {
            if decl.entry.is_empty() {
                return Err("extension entry may not be empty".to_string());
            }
        }
        if let Some(framework) = &self.framework {
            if framework.controller.is_empty() {
                return Err("framework controller may not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// The `[pack]` table: identity and build facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackInfo {
    pub name: String,
    pub version: Version,

    /// Runtime the pack was built for. Absent means the pack carries no
    /// runtime constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RuntimeTarget>,

    /// Marks a pack that ships tooling rather than tests.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub tool: bool,
}

/// One `[[requires]]` entry: a framework reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirement {
    pub name: String,
    pub version: Version,
}

impl Requirement {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Requirement {
            name: name.into(),
            version,
        }
    }
}

/// How an extension was declared in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationStyle {
    /// `[[extension]]`, the 3.x style.
    Current,
    /// `[[addin]]`, the legacy style with renamed operations.
    Addin,
}

/// One `[[extension]]` or `[[addin]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDecl {
    /// Exported entry identifier within the pack.
    pub entry: String,

    /// Explicit extension point path. When absent the point is deduced
    /// from `capability`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Declared capability name, such as `DriverFactory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capability: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Extensions start enabled unless declared otherwise.
    #[serde(default = "default_enabled", skip_serializing_if = "Clone::clone")]
    pub enabled: bool,

    /// Minimum engine version able to host this extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<Version>,

    /// Free-form consumer-visible properties. A key may carry one value or
    /// a list of values.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertyValue>,
}

fn default_enabled() -> bool {
    true
}

/// One or many string values for an extension property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    One(String),
    Many(Vec<String>),
}

impl PropertyValue {
    pub fn values(&self) -> &[String] {
        match self {
            PropertyValue::One(value) => std::slice::from_ref(value),
            PropertyValue::Many(values) => values,
        }
    }
}

/// The `[framework]` table of a framework pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameworkInfo {
    /// Controller executable, relative to the framework pack's directory.
    pub controller: String,
}

/// Parses a header from TOML text.
pub fn parse(text: &str) -> std::result::Result<PackHeader, toml::de::Error> {
    toml::from_str(text)
}
