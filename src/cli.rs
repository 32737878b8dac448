//! Streaming GFF3 gene-model importer for chunked genome-viewer stores
//! Alejandro Gonzales-Irribarren, 2025

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Parser, Debug)]
#[clap(
    name = "gff2mgv",
    version = env!("CARGO_PKG_VERSION"),
    author = "Alejandro Gonzales-Irribarren <alejandrxgzi@gmail.com>",
    about = "import GFF3 gene models into a chunked genome-viewer store"
)]
pub struct Args {
    /// GFF3 annotation to import.
    ///
    /// Plain or gzip-compressed (`.gff3.gz`); `-` reads standard input.
    #[clap(
        short = 'i',
        long = "input",
        help = "Path to GFF3 file, or - for stdin",
        value_name = "GFF3",
        required = true
    )]
    pub input: PathBuf,

    /// Root output directory; the genome is written below it.
    #[clap(
        short = 'o',
        long = "output",
        help = "Output directory [default: ./output]",
        value_name = "DIR"
    )]
    pub output: Option<PathBuf>,

    /// Genome name, literal or a ##pragma reference; default ##genome-name.
    #[clap(short = 'g', long = "genome-name", value_name = "NAME")]
    pub genome_name: Option<String>,

    #[clap(
        short = 'p',
        long = "genome-path",
        help = "Genome directory name [default: sanitized genome name]",
        value_name = "PATH"
    )]
    pub genome_path: Option<String>,

    #[clap(
        short = 'x',
        long = "taxonid",
        help = "NCBI taxon id, literal or ##pragma",
        value_name = "TAXON"
    )]
    pub taxon_id: Option<String>,

    #[clap(
        short = 'T',
        long = "timestamp",
        help = "Timestamp, literal or ##pragma [default: now]",
        value_name = "TIME"
    )]
    pub timestamp: Option<String>,

    /// Chromosome list as `name[:length],...` or a ##pragma such as ##sequence-region.
    #[clap(short = 'c', long = "chromosomes", value_name = "CHROMS")]
    pub chromosomes: Option<String>,

    #[clap(
        short = 'r',
        long = "chr-regex",
        help = "Keep only chromosomes matching this regex [default: .*]",
        value_name = "REGEX"
    )]
    pub chr_regex: Option<String>,

    #[clap(
        long = "include",
        help = "Feature types to keep (comma-separated)",
        value_name = "TYPES",
        value_delimiter = ','
    )]
    pub include: Option<Vec<String>>,

    #[clap(
        long = "exclude",
        help = "Feature types to drop (comma-separated)",
        value_name = "TYPES",
        value_delimiter = ','
    )]
    pub exclude: Option<Vec<String>>,

    /// Transform units, applied in the given order.
    #[clap(
        short = 'f',
        long = "filters",
        help = "Transform units to apply (comma-separated)",
        value_name = "UNITS",
        value_delimiter = ','
    )]
    pub filters: Option<Vec<String>>,

    /// 0 = one transcript file, 1 = one per chromosome, K = per chromosome and K-base block.
    #[clap(short = 'k', long = "chunk-size", value_name = "K")]
    pub chunk_size: Option<u64>,

    #[clap(long = "sort", help = "Buffer and sort all models before writing")]
    pub sort: bool,

    #[clap(long = "build", help = "Assembly label for MGI IDs", value_name = "BUILD")]
    pub build: Option<String>,

    #[clap(
        long = "xrefs",
        help = "MGI/Ensembl association TSV",
        value_name = "TSV"
    )]
    pub xrefs: Option<PathBuf>,

    /// Assembly FASTA (`.fa`, `.fasta`, `.fna`, optionally `.gz`).
    #[clap(
        long = "fasta",
        help = "Assembly FASTA to split per chromosome",
        value_name = "FASTA"
    )]
    pub fasta: Option<PathBuf>,

    #[clap(
        long = "config",
        help = "Genome configuration JSON",
        value_name = "JSON"
    )]
    pub config: Option<PathBuf>,

    #[clap(short = 'v', long = "verbose", help = "Debug logging")]
    pub verbose: bool,
}

impl Args {
    /// Checks all the arguments for validity using validate_args()
    pub fn check(&self) -> Result<(), ArgError> {
        self.validate_args()
    }

    /// The input must exist and be non-empty, unless it is stdin.
    fn check_input(&self) -> Result<(), ArgError> {
        if self.input.as_os_str() == "-" {
            return Ok(());
        }
        let meta = std::fs::metadata(&self.input)
            .map_err(|_| ArgError::InvalidInput(format!("file {:?} does not exist", self.input)))?;
        if meta.len() == 0 {
            let err = format!("file {:?} is empty", self.input);
            Err(ArgError::InvalidInput(err))
        } else {
            Ok(())
        }
    }

    fn check_config(&self) -> Result<(), ArgError> {
        match &self.config {
            Some(path) if !path.is_file() => {
                let err = format!("file {:?} does not exist", path);
                Err(ArgError::InvalidConfig(err))
            }
            _ => Ok(()),
        }
    }

    fn check_xrefs(&self) -> Result<(), ArgError> {
        match &self.xrefs {
            Some(path) if !path.is_file() => {
                let err = format!("file {:?} does not exist", path);
                Err(ArgError::InvalidXrefs(err))
            }
            _ => Ok(()),
        }
    }

    fn check_fasta(&self) -> Result<(), ArgError> {
        match &self.fasta {
            Some(path) if !path.is_file() => {
                let err = format!("file {:?} does not exist", path);
                Err(ArgError::InvalidFasta(err))
            }
            _ => Ok(()),
        }
    }

    /// Validates all the arguments
    fn validate_args(&self) -> Result<(), ArgError> {
        self.check_input()?;
        self.check_config()?;
        self.check_xrefs()?;
        self.check_fasta()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ArgError {
    /// The input file does not exist or is empty.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The genome configuration file does not exist.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The cross-reference snapshot does not exist.
    #[error("Invalid xrefs: {0}")]
    InvalidXrefs(String),

    /// The assembly FASTA does not exist.
    #[error("Invalid fasta: {0}")]
    InvalidFasta(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_lists() {
        let args = Args::parse_from([
            "gff2mgv",
            "-i",
            "-",
            "--exclude",
            "chromosome,biological_region",
            "-f",
            "stripPrefix,curieIds",
            "-k",
            "0",
        ]);
        assert_eq!(
            args.exclude.clone().unwrap(),
            vec!["chromosome", "biological_region"]
        );
        assert_eq!(args.filters.clone().unwrap(), vec!["stripPrefix", "curieIds"]);
        assert_eq!(args.chunk_size, Some(0));
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_check_input() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty.gff3");
        std::fs::File::create(&empty).unwrap();
        let args = Args::parse_from(["gff2mgv", "-i", empty.to_str().unwrap()]);
        assert!(matches!(args.check(), Err(ArgError::InvalidInput(_))));

        let full = dir.path().join("full.gff3");
        writeln!(std::fs::File::create(&full).unwrap(), "##gff-version 3").unwrap();
        let args = Args::parse_from(["gff2mgv", "-i", full.to_str().unwrap()]);
        assert!(args.check().is_ok());

        let missing = dir.path().join("missing.gff3");
        let args = Args::parse_from(["gff2mgv", "-i", missing.to_str().unwrap()]);
        assert!(matches!(args.check(), Err(ArgError::InvalidInput(_))));
    }

    #[test]
    fn test_check_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("GRCm39.fa");
        let args = Args::parse_from(["gff2mgv", "-i", "-", "--fasta", missing.to_str().unwrap()]);
        assert!(matches!(args.check(), Err(ArgError::InvalidFasta(_))));

        writeln!(std::fs::File::create(&missing).unwrap(), ">1").unwrap();
        let args = Args::parse_from(["gff2mgv", "-i", "-", "--fasta", missing.to_str().unwrap()]);
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_negative_chunk_size_rejected() {
        assert!(Args::try_parse_from(["gff2mgv", "-i", "-", "-k", "-1"]).is_err());
    }
}
