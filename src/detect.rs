use crate::error::{Gff2MgvError, Result};
use std::path::{Path, PathBuf};

/// Supported compression formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Returns true when the input is compressed.
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// use gff2mgv::detect::Compression;
    ///
    /// assert!(Compression::Gzip.is_compressed());
    /// assert!(!Compression::None.is_compressed());
    /// ```
    pub fn is_compressed(self) -> bool {
        !matches!(self, Compression::None)
    }
}

/// Where annotation lines come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Standard input, read uncompressed.
    Stdin,
    /// A `.gff`/`.gff3` file with the given compression.
    File(Compression),
}

/// Detects how an input path should be opened.
///
/// `-` means standard input. Otherwise the extension must be `gff` or
/// `gff3`, optionally followed by `gz`/`gzip`.
///
/// # Errors
///
/// Returns an error if the file extension is not supported.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::detect::detect_input;
/// use std::path::Path;
///
/// let source = detect_input(Path::new("MGI.gff3.gz"))?;
/// // Returns InputSource::File(Compression::Gzip)
/// ```
pub fn detect_input(path: &Path) -> Result<InputSource> {
    if path.as_os_str() == "-" {
        return Ok(InputSource::Stdin);
    }

    let unsupported = || Gff2MgvError::UnsupportedExtension(path.display().to_string());
    let ext = extension_lowercase(path).ok_or_else(unsupported)?;

    if let Some(compression) = compression_from_extension(&ext) {
        let inner = nested_extension(path).ok_or_else(unsupported)?;
        if !is_gff_extension(&inner) {
            return Err(unsupported());
        }
        return Ok(InputSource::File(compression));
    }

    if is_gff_extension(&ext) {
        Ok(InputSource::File(Compression::None))
    } else {
        Err(unsupported())
    }
}

/// Detects the compression of an assembly FASTA file.
///
/// The extension must be `fa`, `fasta` or `fna`, optionally followed by
/// `gz`/`gzip`.
///
/// # Errors
///
/// Returns an error if the file extension is not supported.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::detect::detect_fasta;
/// use std::path::Path;
///
/// let compression = detect_fasta(Path::new("GRCm39.fa.gz"))?;
/// // Returns Compression::Gzip
/// ```
pub fn detect_fasta(path: &Path) -> Result<Compression> {
    let unsupported = || Gff2MgvError::UnsupportedExtension(path.display().to_string());
    let ext = extension_lowercase(path).ok_or_else(unsupported)?;

    let (compression, inner) = match compression_from_extension(&ext) {
        Some(compression) => (compression, nested_extension(path).ok_or_else(unsupported)?),
        None => (Compression::None, ext),
    };
    if is_fasta_extension(&inner) {
        Ok(compression)
    } else {
        Err(unsupported())
    }
}

fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_gff_extension(ext: &str) -> bool {
    matches!(ext, "gff" | "gff3")
}

fn is_fasta_extension(ext: &str) -> bool {
    matches!(ext, "fa" | "fasta" | "fna")
}

fn compression_from_extension(ext: &str) -> Option<Compression> {
    match ext {
        "gz" | "gzip" => Some(Compression::Gzip),
        _ => None,
    }
}

/// Returns the inner extension for compressed files (`.gff3.gz` -> `gff3`).
fn nested_extension(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    extension_lowercase(&PathBuf::from(stem))
}
