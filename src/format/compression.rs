//! Transparent compression for file-backed adapters.
//!
//! Detection is extension-first (`.gz`, `.gzip`), falling back to magic
//! bytes on the read side so renamed files still decompress. With the
//! `compression-gzip` feature disabled both helpers are plain buffered
//! pass-throughs.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

#[cfg(feature = "compression-gzip")]
use std::io::BufRead;

#[cfg(feature = "compression-gzip")]
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[cfg(feature = "compression-gzip")]
fn has_gzip_extension(path: &Path) -> bool {
    let path = path.to_string_lossy().to_lowercase();
    path.ends_with(".gz") || path.ends_with(".gzip")
}

/// Opens a file for reading, decompressing transparently when the path or
/// the leading magic bytes identify a gzip stream.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn Read>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    wrap_reader(file, path)
}

/// Creates a file for writing, compressing transparently when the path
/// identifies a gzip target.
///
/// # Errors
///
/// Returns an error if the file cannot be created.
pub fn open_writer(path: impl AsRef<Path>) -> Result<Box<dyn Write>> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    wrap_writer(file, path)
}

#[cfg(feature = "compression-gzip")]
pub(crate) fn wrap_reader<R: Read + 'static>(reader: R, path: &Path) -> Result<Box<dyn Read>> {
    use flate2::read::GzDecoder;

    if has_gzip_extension(path) {
        return Ok(Box::new(GzDecoder::new(BufReader::new(reader))));
    }
    let mut buffered = BufReader::new(reader);
    let peeked = buffered
        .fill_buf()
        .with_context(|| format!("probe {}", path.display()))?;
    if peeked.starts_with(&GZIP_MAGIC) {
        return Ok(Box::new(GzDecoder::new(buffered)));
    }
    Ok(Box::new(buffered))
}

#[cfg(not(feature = "compression-gzip"))]
pub(crate) fn wrap_reader<R: Read + 'static>(reader: R, _path: &Path) -> Result<Box<dyn Read>> {
    Ok(Box::new(BufReader::new(reader)))
}

#[cfg(feature = "compression-gzip")]
pub(crate) fn wrap_writer<W: Write + 'static>(writer: W, path: &Path) -> Result<Box<dyn Write>> {
    use flate2::Compression;
    use flate2::write::GzEncoder;

    if has_gzip_extension(path) {
        return Ok(Box::new(GzEncoder::new(
            BufWriter::new(writer),
            Compression::default(),
        )));
    }
    Ok(Box::new(BufWriter::new(writer)))
}

#[cfg(not(feature = "compression-gzip"))]
pub(crate) fn wrap_writer<W: Write + 'static>(writer: W, _path: &Path) -> Result<Box<dyn Write>> {
    Ok(Box::new(BufWriter::new(writer)))
}
