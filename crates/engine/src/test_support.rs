//! Builders shared by unit tests.

use std::collections::BTreeMap;

use semver::Version;
use quench_pack::{
    ExtensionDecl, FrameworkInfo, PackBuilder, PackFile, PackHeader, PackInfo, Requirement,
    RuntimeTarget,
};

use crate::discovery::CandidatePack;

pub(crate) fn version(text: &str) -> Version {
    Version::parse(text).unwrap()
}

pub(crate) fn header(name: &str, pack_version: &str, target: Option<&str>) -> PackHeader {
    PackHeader {
        pack: PackInfo {
            name: name.to_string(),
            version: version(pack_version),
            target: target.map(|t| RuntimeTarget::parse(t).unwrap()),
            tool: false,
        },
        requires: Vec::new(),
        extensions: Vec::new(),
        addins: Vec::new(),
        framework: None,
    }
}

pub(crate) fn decl(
    entry: &str,
    path: Option<&str>,
    capability: Option<&str>,
) -> ExtensionDecl {
    ExtensionDecl {
        entry: entry.to_string(),
        path: path.map(str::to_string),
        capability: capability.map(str::to_string),
        description: None,
        enabled: true,
        engine_version: None,
        properties: BTreeMap::new(),
    }
}

pub(crate) fn bytes_for(header: PackHeader) -> Vec<u8> {
    PackBuilder::new(header)
        .payload(b"payload".as_slice())
        .to_bytes()
        .unwrap()
}

/// A pack declaring extensions in the current style.
pub(crate) fn pack_with_extensions(
    name: &str,
    pack_version: &str,
    decls: Vec<ExtensionDecl>,
) -> Vec<u8> {
    let mut header = header(name, pack_version, None);
    header.extensions = decls;
    bytes_for(header)
}

/// A pack declaring extensions in the legacy addin style.
pub(crate) fn pack_with_addins(
    name: &str,
    pack_version: &str,
    decls: Vec<ExtensionDecl>,
) -> Vec<u8> {
    let mut header = header(name, pack_version, None);
    header.addins = decls;
    bytes_for(header)
}

/// A pack with no extension declarations and an optional runtime target.
pub(crate) fn plain_pack(name: &str, pack_version: &str, target: Option<&str>) -> Vec<u8> {
    bytes_for(header(name, pack_version, target))
}

/// A tool pack carrying extensions.
pub(crate) fn tool_pack(name: &str, pack_version: &str, decls: Vec<ExtensionDecl>) -> Vec<u8> {
    let mut header = header(name, pack_version, None);
    header.pack.tool = true;
    header.extensions = decls;
    bytes_for(header)
}

/// A test pack referencing a framework.
pub(crate) fn test_pack(name: &str, framework: &str, framework_version: &str) -> Vec<u8> {
    let mut header = header(name, "1.0.0", Some("modern-6.0"));
    header.requires = vec![Requirement::new(framework, version(framework_version))];
    bytes_for(header)
}

/// A framework pack shipping a controller executable.
pub(crate) fn framework_pack(name: &str, pack_version: &str, controller: &str) -> Vec<u8> {
    let mut header = header(name, pack_version, Some("modern-6.0"));
    header.framework = Some(FrameworkInfo {
        controller: controller.to_string(),
    });
    bytes_for(header)
}

/// A candidate whose pack never touched a real filesystem.
pub(crate) fn mem_candidate(
    path: &str,
    name: &str,
    pack_version: &str,
    from_wildcard: bool,
) -> CandidatePack {
    let bytes = plain_pack(name, pack_version, None);
    let pack = PackFile::read_from(bytes.as_slice(), path).unwrap();
    CandidatePack::from_pack(pack, from_wildcard)
}
