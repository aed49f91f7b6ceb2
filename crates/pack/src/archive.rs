//! Binary container around the pack header and payload.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic      6 bytes   "QPACK\0"
//! format     u16       container format version
//! length     u32       header length in bytes
//! header     TOML      see `header`
//! payload    opaque    everything after the header
//! ```

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use semver::Version;

use crate::error::{PackError, Result};
use crate::header::{self, DeclarationStyle, ExtensionDecl, PackHeader, Requirement};
use crate::target::RuntimeTarget;

/// Magic bytes at the start of every pack.
pub const PACK_MAGIC: &[u8; 6] = b"QPACK\0";

/// Newest container format this library writes.
pub const PACK_FORMAT_VERSION: u16 = 2;

/// File extensions recognized as packs.
pub const PACK_FILE_EXTENSIONS: &[&str] = &["qpack", "qexe"];

/// Upper bound on the header frame; anything larger is a corrupt file.
const MAX_HEADER_LEN: u32 = 1 << 20;

/// A test pack opened for reading.
///
/// Only the header is read eagerly. The payload stays on disk and is
/// exposed as a reader when the pack was opened from a file.
#[derive(Debug)]
pub struct PackFile {
    path: PathBuf,
    format: u16,
    header: PackHeader,
    payload_offset: u64,
    file: Option<File>,
}

impl PackFile {
    /// Opens a pack on disk, keeping the file handle for payload access.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)?;
        let (format, header, payload_offset) = read_envelope(&mut file, path)?;
        Ok(PackFile {
            path: path.to_path_buf(),
            format,
            header,
            payload_offset,
            file: Some(file),
        })
    }

    /// Reads a pack's header from an arbitrary stream. `origin` names the
    /// source in errors. The payload is not retained.
    pub fn read_from(mut reader: impl Read, origin: impl AsRef<Path>) -> Result<Self> {
        let origin = origin.as_ref();
        let (format, header, payload_offset) = read_envelope(&mut reader, origin)?;
        Ok(PackFile {
            path: origin.to_path_buf(),
            format,
            header,
            payload_offset,
            file: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format_version(&self) -> u16 {
        self.format
    }

    pub fn header(&self) -> &PackHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.pack.name
    }

    pub fn version(&self) -> &Version {
        &self.header.pack.version
    }

    pub fn target(&self) -> Option<&RuntimeTarget> {
        self.header.pack.target.as_ref()
    }

    pub fn is_tool(&self) -> bool {
        self.header.pack.tool
    }

    pub fn requires(&self) -> &[Requirement] {
        &self.header.requires
    }

    /// Every extension declaration with the style it was written in.
    pub fn declared_extensions(&self) -> impl Iterator<Item = (&ExtensionDecl, DeclarationStyle)> {
        self.header.declared_extensions()
    }

    /// Reader positioned at the start of the payload. Fails for packs read
    /// from a stream rather than opened from disk.
    pub fn payload(&self) -> Result<impl Read + '_> {
        let mut file = match &self.file {
            Some(file) => file.try_clone()?,
            None => {
                return Err(PackError::PayloadUnavailable {
                    path: self.path.clone(),
                });
            }
        };
        file.seek(SeekFrom::Start(self.payload_offset))?;
        Ok(file)
    }
}

fn read_envelope(reader: &mut impl Read, origin: &Path) -> Result<(u16, PackHeader, u64)> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(|err| truncated(origin, err))?;
    if &magic != PACK_MAGIC {
        return Err(PackError::BadMagic {
            path: origin.to_path_buf(),
        });
    }

    let format = reader
        .read_u16::<LittleEndian>()
        .map_err(|err| truncated(origin, err))?;
    if format == 0 || format > PACK_FORMAT_VERSION {
        return Err(PackError::UnsupportedFormat {
            path: origin.to_path_buf(),
            version: format,
        });
    }

    let length = reader
        .read_u32::<LittleEndian>()
        .map_err(|err| truncated(origin, err))?;
    if length > MAX_HEADER_LEN {
        return Err(PackError::MalformedHeader {
            path: origin.to_path_buf(),
            reason: format!("header length {length} exceeds the {MAX_HEADER_LEN} byte limit"),
        });
    }

    let mut raw = vec![0u8; length as usize];
    reader.read_exact(&mut raw).map_err(|err| truncated(origin, err))?;
    let text = String::from_utf8(raw).map_err(|_| PackError::MalformedHeader {
        path: origin.to_path_buf(),
        reason: "header is not valid UTF-8".to_string(),
    })?;

    let header = header::parse(&text).map_err(|err| PackError::InvalidHeader {
        path: origin.to_path_buf(),
        source: Box::new(err),
    })?;
    header.validate().map_err(|reason| PackError::HeaderRule {
        path: origin.to_path_buf(),
        reason,
    })?;

    let payload_offset = (PACK_MAGIC.len() + 2 + 4) as u64 + u64::from(length);
    Ok((format, header, payload_offset))
}

fn truncated(origin: &Path, err: io::Error) -> PackError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        PackError::MalformedHeader {
            path: origin.to_path_buf(),
            reason: "file is truncated".to_string(),
        }
    } else {
        PackError::Io(err)
    }
}

/// Writes pack files. Used by build tooling and tests.
#[derive(Debug, Clone)]
pub struct PackBuilder {
    header: PackHeader,
    payload: Vec<u8>,
    format: u16,
}

impl PackBuilder {
    pub fn new(header: PackHeader) -> Self {
        PackBuilder {
            header,
            payload: Vec::new(),
            format: PACK_FORMAT_VERSION,
        }
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Overrides the container format version written to the envelope.
    pub fn format_version(mut self, format: u16) -> Self {
        self.format = format;
        self
    }

    /// Serializes the pack to a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.header
            .validate()
            .map_err(|reason| PackError::HeaderRule {
                path: PathBuf::from(&self.header.pack.name),
                reason,
            })?;
        let text = toml::to_string(&self.header)?;
        // The reader enforces the same cap; a pack we write must open.
        let length = u32::try_from(text.len())
            .ok()
            .filter(|len| *len <= MAX_HEADER_LEN)
            .ok_or_else(|| PackError::MalformedHeader {
                path: PathBuf::from(&self.header.pack.name),
                reason: format!(
                    "header length {} exceeds the {MAX_HEADER_LEN} byte limit",
                    text.len()
                ),
            })?;
        let mut out = Vec::with_capacity(PACK_MAGIC.len() + 6 + text.len() + self.payload.len());
        out.extend_from_slice(PACK_MAGIC);
        out.write_u16::<LittleEndian>(self.format)?;
        out.write_u32::<LittleEndian>(length)?;
        out.extend_from_slice(text.as_bytes());
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// Writes the pack to a file, replacing any existing content.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        Ok(())
    }
}
