//! Reader and writer for Quench test pack artifacts.
//!
//! A test pack is a single file carrying a small binary envelope, a TOML
//! header describing the pack, and an opaque payload. The header is the only
//! part the engine interprets: it names the pack, the runtime it targets,
//! the frameworks it references, and any extensions it contributes.

pub mod archive;
pub mod error;
pub mod header;
pub mod settings;
pub mod target;

pub use archive::{PackBuilder, PackFile, PACK_FILE_EXTENSIONS, PACK_FORMAT_VERSION, PACK_MAGIC};
pub use error::{PackError, Result};
pub use header::{
    DeclarationStyle, ExtensionDecl, FrameworkInfo, PackHeader, PackInfo, PropertyValue,
    Requirement,
};
pub use settings::PackSettings;
pub use target::{RuntimeFamily, RuntimeTarget};

use std::path::Path;

/// True if the path carries one of the recognized pack extensions.
pub fn is_pack_file_type(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => PACK_FILE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_pack_file_types() {
        assert!(is_pack_file_type(Path::new("/opt/tests/suite.qpack")));
        assert!(is_pack_file_type(Path::new("runner.qexe")));
        assert!(is_pack_file_type(Path::new("UPPER.QPACK")));
        assert!(!is_pack_file_type(Path::new("suite.zip")));
        assert!(!is_pack_file_type(Path::new("no-extension")));
    }
}
