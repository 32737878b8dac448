use crate::gff3::ParseError;
use thiserror::Error;

/// Error type for gff2mgv operations.
#[derive(Debug, Error)]
pub enum Gff2MgvError {
    /// Input extension is missing or not supported.
    #[error("unsupported input extension: {0}")]
    UnsupportedExtension(String),
    /// A feature line could not be tokenized.
    #[error("malformed record at line {line}: {source} ({record:?})")]
    MalformedRecord {
        line: usize,
        record: String,
        #[source]
        source: ParseError,
    },
    /// A transform unit met a feature without an attribute it relies on.
    #[error("{unit}: feature {feature:?} has no {attribute:?} attribute")]
    MissingAttribute {
        unit: &'static str,
        attribute: &'static str,
        feature: String,
    },
    /// A configured filter name is not in the registry.
    #[error("unknown filter unit: {0}")]
    UnknownFilter(String),
    /// The cross-reference miner has no pattern for this taxon.
    #[error("{unit}: no cross-reference pattern for taxon {taxon:?}")]
    UnknownTaxon { unit: &'static str, taxon: String },
    /// A `##name` reference points at a pragma the header does not carry.
    #[error("header has no ##{0} pragma")]
    MissingPragma(String),
    /// Configuration values are inconsistent or unparseable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wraps regex compilation errors from configured patterns.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
    /// Wraps JSON errors from config and index files.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wraps standard I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for gff2mgv operations.
pub type Result<T> = std::result::Result<T, Gff2MgvError>;
