//! A pack file under consideration as an extension carrier.

use std::path::Path;
use std::sync::Arc;

use semver::Version;
use quench_pack::{DeclarationStyle, ExtensionDecl, PackFile, RuntimeTarget};

use crate::fs::FsFile;

/// A candidate pack found during discovery, with its header read and the
/// glob-origin flag that decides how its failures are treated.
#[derive(Debug)]
pub struct CandidatePack {
    pack: PackFile,
    from_wildcard: bool,
}

impl CandidatePack {
    /// Reads a candidate's header through the filesystem abstraction.
    pub fn from_file(file: &Arc<dyn FsFile>, from_wildcard: bool) -> quench_pack::Result<Self> {
        let pack = PackFile::read_from(file.open()?, file.path())?;
        Ok(CandidatePack {
            pack,
            from_wildcard,
        })
    }

    /// Wraps an already opened pack. Used when a candidate arrives by
    /// explicit path rather than through a scan.
    pub fn from_pack(pack: PackFile, from_wildcard: bool) -> Self {
        CandidatePack {
            pack,
            from_wildcard,
        }
    }

    pub fn path(&self) -> &Path {
        self.pack.path()
    }

    pub fn name(&self) -> &str {
        self.pack.name()
    }

    pub fn version(&self) -> &Version {
        self.pack.version()
    }

    pub fn target(&self) -> Option<&RuntimeTarget> {
        self.pack.target()
    }

    /// True if this candidate was reached through a glob or inherited a
    /// wildcard origin from its manifest chain.
    pub fn from_wildcard(&self) -> bool {
        self.from_wildcard
    }

    pub fn declared_extensions(&self) -> impl Iterator<Item = (&ExtensionDecl, DeclarationStyle)> {
        self.pack.declared_extensions()
    }

    pub fn pack(&self) -> &PackFile {
        &self.pack
    }
}
