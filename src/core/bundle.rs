// src/core/bundle.rs

//! # Bundles
//!
//! A bundle is a copy of the `woostproject` executable with a snapshot of a project
//! appended to it. When such a file runs, it notices the trailer and installs the
//! embedded project instead of offering the normal command set.
//!
//! ```text
//! [executable][base64 payload][bincode manifest][payload len: u64 LE][manifest len: u64 LE][WOOSTBDL]
//! ```
//!
//! The payload is the project directory as a (compressed) tar archive, base64 encoded
//! in independent chunks. The manifest records the compression, the settings that
//! become the installer's defaults, and a blake3 digest of the archive.

use crate::constants::{BUNDLE_MAGIC, DECODE_CHUNK_SIZE, ENCODE_CHUNK_SIZE};
use crate::core::namespace::Overrides;
use crate::models::Compression;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use thiserror::Error;

// Chunks must hold whole base64 quanta, or padding would land mid-stream.
const _: () = assert!(ENCODE_CHUNK_SIZE % 3 == 0);
const _: () = assert!(DECODE_CHUNK_SIZE % 4 == 0);

const LENGTH_FIELD: usize = 8;
const TRAILER_LEN: usize = 2 * LENGTH_FIELD + BUNDLE_MAGIC.len();

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not build the project archive: {0}")]
    Archive(#[source] std::io::Error),
    #[error("Could not extract the embedded project: {0}")]
    Extract(#[source] std::io::Error),
    #[error("The embedded project data is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("The embedded project data could not be decompressed: {0}")]
    Decompress(String),
    #[error("Failed to serialize the bundle manifest: {0}")]
    ManifestEncode(#[from] bincode::error::EncodeError),
    #[error("Failed to read the bundle manifest: {0}")]
    ManifestDecode(#[from] bincode::error::DecodeError),
    #[error("The bundle trailer is corrupt.")]
    CorruptTrailer,
    #[error("The embedded project data is damaged (expected digest {expected}, found {found}).")]
    DigestMismatch { expected: String, found: String },
}

impl BundleError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Metadata stored next to the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub compression: Compression,
    /// Settings supplied when the bundle was made; they become the defaults of the
    /// embedded installer.
    pub defaults: Overrides,
    /// Hex encoded blake3 digest of the archive.
    pub digest: String,
}

// --- Base64 chunk codec ---

/// Encodes `data` chunk by chunk. The concatenation is a single valid base64 text.
pub fn encode_payload(data: &[u8]) -> String {
    let mut encoded = String::with_capacity(data.len().div_ceil(3) * 4);
    for chunk in data.chunks(ENCODE_CHUNK_SIZE) {
        STANDARD.encode_string(chunk, &mut encoded);
    }
    encoded
}

pub fn decode_payload(text: &[u8]) -> Result<Vec<u8>, BundleError> {
    let mut decoded = Vec::with_capacity(text.len() / 4 * 3);
    for chunk in text.chunks(DECODE_CHUNK_SIZE) {
        STANDARD.decode_vec(chunk, &mut decoded)?;
    }
    Ok(decoded)
}

// --- Archives ---

/// Archives `source_dir` as `arcname/...`. Symbolic links are stored as links.
pub fn create_archive(
    source_dir: &Path,
    arcname: &str,
    compression: Compression,
) -> Result<Vec<u8>, BundleError> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    builder
        .append_dir_all(arcname, source_dir)
        .map_err(BundleError::Archive)?;
    let tarball = builder.into_inner().map_err(BundleError::Archive)?;
    log::debug!(
        "Archived '{}' into {} bytes (before compression).",
        source_dir.display(),
        tarball.len()
    );

    match compression {
        Compression::Gz => {
            let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(&tarball).map_err(BundleError::Archive)?;
            encoder.finish().map_err(BundleError::Archive)
        }
        Compression::Lz4 => Ok(lz4_flex::compress_prepend_size(&tarball)),
        Compression::Uncompressed => Ok(tarball),
    }
}

pub fn extract_archive(
    archive: &[u8],
    compression: Compression,
    dest: &Path,
) -> Result<(), BundleError> {
    let tarball = match compression {
        Compression::Gz => {
            let mut tarball = Vec::new();
            GzDecoder::new(archive)
                .read_to_end(&mut tarball)
                .map_err(|e| BundleError::Decompress(e.to_string()))?;
            tarball
        }
        Compression::Lz4 => lz4_flex::decompress_size_prepended(archive)
            .map_err(|e| BundleError::Decompress(e.to_string()))?,
        Compression::Uncompressed => archive.to_vec(),
    };
    tar::Archive::new(tarball.as_slice())
        .unpack(dest)
        .map_err(BundleError::Extract)
}

pub fn digest(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

// --- Self-extracting executables ---

/// A project embedded in an executable.
#[derive(Debug, Clone)]
pub struct EmbeddedBundle {
    pub manifest: Manifest,
    payload: Vec<u8>,
}

impl EmbeddedBundle {
    /// Decodes, verifies and unpacks the project into `dest`.
    pub fn extract_to(&self, dest: &Path) -> Result<(), BundleError> {
        let archive = decode_payload(&self.payload)?;
        let found = digest(&archive);
        if found != self.manifest.digest {
            return Err(BundleError::DigestMismatch {
                expected: self.manifest.digest.clone(),
                found,
            });
        }
        extract_archive(&archive, self.manifest.compression, dest)
    }
}

fn read_u64_le(bytes: &[u8]) -> Option<usize> {
    let array: [u8; LENGTH_FIELD] = bytes.try_into().ok()?;
    usize::try_from(u64::from_le_bytes(array)).ok()
}

/// Splits a file into (program, payload, manifest). `Ok(None)` if it carries no bundle.
fn split(bytes: &[u8]) -> Result<Option<(&[u8], &[u8], &[u8])>, BundleError> {
    if !bytes.ends_with(BUNDLE_MAGIC) {
        return Ok(None);
    }
    let trailer_start = bytes
        .len()
        .checked_sub(TRAILER_LEN)
        .ok_or(BundleError::CorruptTrailer)?;
    let trailer = bytes.get(trailer_start..).ok_or(BundleError::CorruptTrailer)?;

    let payload_len = trailer
        .get(..LENGTH_FIELD)
        .and_then(read_u64_le)
        .ok_or(BundleError::CorruptTrailer)?;
    let manifest_len = trailer
        .get(LENGTH_FIELD..2 * LENGTH_FIELD)
        .and_then(read_u64_le)
        .ok_or(BundleError::CorruptTrailer)?;

    let manifest_start = trailer_start
        .checked_sub(manifest_len)
        .ok_or(BundleError::CorruptTrailer)?;
    let payload_start = manifest_start
        .checked_sub(payload_len)
        .ok_or(BundleError::CorruptTrailer)?;

    match (
        bytes.get(..payload_start),
        bytes.get(payload_start..manifest_start),
        bytes.get(manifest_start..trailer_start),
    ) {
        (Some(program), Some(payload), Some(manifest)) => Ok(Some((program, payload, manifest))),
        _ => Err(BundleError::CorruptTrailer),
    }
}

/// The executable without any embedded bundle.
pub fn strip_bundle(bytes: &[u8]) -> Result<&[u8], BundleError> {
    Ok(split(bytes)?.map_or(bytes, |(program, _, _)| program))
}

/// Reads the bundle embedded in a file's bytes, if any.
pub fn parse_embedded(bytes: &[u8]) -> Result<Option<EmbeddedBundle>, BundleError> {
    let Some((_, payload, manifest)) = split(bytes)? else {
        return Ok(None);
    };
    let (manifest, _): (Manifest, usize) =
        bincode::serde::decode_from_slice(manifest, bincode::config::standard())?;
    Ok(Some(EmbeddedBundle {
        manifest,
        payload: payload.to_vec(),
    }))
}

/// Reads the bundle embedded in the executable at `path`, if any.
pub fn read_embedded(path: &Path) -> Result<Option<EmbeddedBundle>, BundleError> {
    let bytes = fs::read(path).map_err(|e| BundleError::io(path, e))?;
    parse_embedded(&bytes)
}

/// Appends `archive` to `program` as a bundle.
pub fn assemble(
    program: &[u8],
    archive: &[u8],
    compression: Compression,
    defaults: Overrides,
) -> Result<Vec<u8>, BundleError> {
    let program = strip_bundle(program)?;
    let manifest = Manifest {
        compression,
        defaults,
        digest: digest(archive),
    };
    let manifest_bytes = bincode::serde::encode_to_vec(&manifest, bincode::config::standard())?;
    let payload = encode_payload(archive);

    let mut bundle =
        Vec::with_capacity(program.len() + payload.len() + manifest_bytes.len() + TRAILER_LEN);
    bundle.extend_from_slice(program);
    bundle.extend_from_slice(payload.as_bytes());
    bundle.extend_from_slice(&manifest_bytes);
    bundle.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bundle.extend_from_slice(&(manifest_bytes.len() as u64).to_le_bytes());
    bundle.extend_from_slice(BUNDLE_MAGIC);
    Ok(bundle)
}

/// Archives `source_dir` and writes an executable installer for it to `output`.
pub fn write_bundle(
    program_path: &Path,
    source_dir: &Path,
    arcname: &str,
    compression: Compression,
    defaults: Overrides,
    output: &Path,
) -> Result<(), BundleError> {
    let program = fs::read(program_path).map_err(|e| BundleError::io(program_path, e))?;
    let archive = create_archive(source_dir, arcname, compression)?;
    let bundle = assemble(&program, &archive, compression, defaults)?;

    fs::write(output, &bundle).map_err(|e| BundleError::io(output, e))?;
    fs::set_permissions(output, fs::Permissions::from_mode(0o755))
        .map_err(|e| BundleError::io(output, e))?;
    log::debug!("Wrote a {} byte bundle to '{}'.", bundle.len(), output.display());
    Ok(())
}
