//! On-disk framing shared by encoder and model artifacts.
//!
//! An artifact is a zstd stream holding a 4-byte magic, a little-endian format
//! version and a bincode payload.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use bincode::{Decode, Encode};

use crate::errors::{Result, WebcompatError};

const FORMAT_VERSION: u32 = 2;
const ZSTD_LEVEL: i32 = 19;

/// Magic bytes identifying the artifact kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ArtifactKind {
    Vectorizer,
    LabelEncoder,
    Model,
}

impl ArtifactKind {
    const fn magic(self) -> &'static [u8; 4] {
        match self {
            Self::Vectorizer => b"WCVZ",
            Self::LabelEncoder => b"WCLE",
            Self::Model => b"WCGB",
        }
    }
}

pub(crate) fn write_to<T, W>(value: &T, kind: ArtifactKind, wtr: &mut W) -> Result<()>
where
    T: Encode,
    W: Write,
{
    let mut f = zstd::Encoder::new(wtr, ZSTD_LEVEL)?;
    f.write_all(kind.magic())?;
    f.write_all(&FORMAT_VERSION.to_le_bytes())?;
    bincode::encode_into_std_write(value, &mut f, bincode::config::standard())?;
    f.finish()?;
    Ok(())
}

pub(crate) fn read_from<T, R>(kind: ArtifactKind, rdr: &mut R) -> Result<T>
where
    T: Decode<()>,
    R: Read,
{
    let mut f = zstd::Decoder::new(rdr)?;
    let mut magic = [0; 4];
    f.read_exact(&mut magic)?;
    if &magic != kind.magic() {
        return Err(WebcompatError::invalid_artifact(format!(
            "expected a {kind:?} artifact, found magic {magic:?}"
        )));
    }
    let mut version = [0; 4];
    f.read_exact(&mut version)?;
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(WebcompatError::invalid_artifact(format!(
            "unsupported format version {version} (expected {FORMAT_VERSION})"
        )));
    }
    Ok(bincode::decode_from_std_read(&mut f, bincode::config::standard())?)
}

/// Writes an artifact, replacing any existing file at `path`.
pub(crate) fn save<T>(value: &T, kind: ArtifactKind, path: &Path) -> Result<()>
where
    T: Encode,
{
    let mut f = BufWriter::new(File::create(path)?);
    write_to(value, kind, &mut f)?;
    f.flush()?;
    Ok(())
}

pub(crate) fn load<T>(kind: ArtifactKind, path: &Path) -> Result<T>
where
    T: Decode<()>,
{
    let mut f = File::open(path)?;
    read_from(kind, &mut f)
}
