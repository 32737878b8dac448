use crate::cli::Args;
use crate::error::{Gff2MgvError, Result};
use crate::filter::{is_registered, FilterContext, Selection};
use crate::gff3::Header;
use crate::index::{parse_chromosome_list, parse_sequence_regions, Chromosome};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR: &str = "./output";
pub const DEFAULT_CHUNK_SIZE: u64 = 1;
pub const DEFAULT_CHR_REGEX: &str = ".*";
pub const GENOME_NAME_PRAGMA: &str = "genome-name";
pub const TAXON_PRAGMA: &str = "taxonid";

// asctime(3) layout
const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// A genome-level value given literally or as a `##pragma` reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderValue {
    Literal(String),
    Pragma(String),
}

impl HeaderValue {
    /// `##name` becomes a pragma reference; anything else is literal.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix("##") {
            Some(name) => HeaderValue::Pragma(name.to_string()),
            None => HeaderValue::Literal(text.to_string()),
        }
    }

    fn first(&self, header: &Header) -> Option<String> {
        match self {
            HeaderValue::Literal(value) => Some(value.clone()),
            HeaderValue::Pragma(name) => header.get(name).map(|v| v.first().to_string()),
        }
    }

    fn first_or_missing(&self, header: &Header) -> Result<String> {
        self.first(header).ok_or_else(|| self.missing())
    }

    fn missing(&self) -> Gff2MgvError {
        match self {
            HeaderValue::Pragma(name) => Gff2MgvError::MissingPragma(name.clone()),
            HeaderValue::Literal(value) => Gff2MgvError::InvalidConfig(value.clone()),
        }
    }
}

/// Optional genome configuration file; command-line values win.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenomeConfig {
    pub name: Option<String>,
    pub genome_path: Option<String>,
    pub taxonid: Option<String>,
    pub timestamp: Option<String>,
    pub chromosomes: Option<String>,
    pub chr_regex: Option<String>,
    pub include_types: Option<Vec<String>>,
    pub exclude_types: Option<Vec<String>>,
    pub filters: Option<Vec<String>>,
    pub chunk_size: Option<u64>,
    pub sort: Option<bool>,
    pub build: Option<String>,
    pub xrefs: Option<PathBuf>,
    pub fasta: Option<PathBuf>,
}

impl GenomeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Normalized configuration for an import run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Input GFF3 path, or `-` for standard input.
    pub input: PathBuf,
    /// Root output directory; the genome lands in `<output_dir>/<genome path>`.
    pub output_dir: PathBuf,
    pub genome_name: HeaderValue,
    /// Directory name for the genome; defaults to the sanitized genome name.
    pub genome_path: Option<String>,
    /// `None` reads `##taxonid` when present.
    pub taxon_id: Option<HeaderValue>,
    /// `None` stamps the current local time.
    pub timestamp: Option<HeaderValue>,
    pub chromosomes: Option<HeaderValue>,
    pub chr_regex: String,
    pub include_types: Option<Vec<String>>,
    pub exclude_types: Vec<String>,
    /// Transform unit names, applied in order.
    pub filters: Vec<String>,
    /// Transcript chunk size: 0 single file, 1 per chromosome, K per block.
    pub chunk_size: u64,
    pub sort: bool,
    /// Assembly label appended to MGI top-level IDs.
    pub build: Option<String>,
    /// MGI/Ensembl association snapshot.
    pub xref_file: Option<PathBuf>,
    /// Assembly FASTA split into `assembly/<seqid>.txt` after the models.
    pub fasta: Option<PathBuf>,
}

/// Genome metadata once header references are resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenomeInfo {
    pub name: String,
    pub path: String,
    pub taxon_id: Option<String>,
    pub timestamp: String,
    pub chromosomes: Option<Vec<Chromosome>>,
}

impl Config {
    /// Defaults for everything but the input and output locations.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            genome_name: HeaderValue::Pragma(GENOME_NAME_PRAGMA.to_string()),
            genome_path: None,
            taxon_id: None,
            timestamp: None,
            chromosomes: None,
            chr_regex: DEFAULT_CHR_REGEX.to_string(),
            include_types: None,
            exclude_types: Vec::new(),
            filters: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            sort: false,
            build: None,
            xref_file: None,
            fasta: None,
        }
    }

    /// Builds an import config from CLI arguments.
    ///
    /// # Arguments
    ///
    /// * `args` - Command-line arguments; a `--config` file fills in any
    ///   value not given on the command line
    ///
    /// # Returns
    ///
    /// Returns a validated Config.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome config file cannot be read or if a
    /// filter name is not registered.
    ///
    /// # Example
    ///
    /// ```rust, ignore
    /// use clap::Parser;
    /// use gff2mgv::{Args, Config};
    ///
    /// let args = Args::parse_from(["gff2mgv", "-i", "MGI.gff3", "-o", "out", "-f", "mgiGff"]);
    /// let config = Config::from_args(&args)?;
    /// ```
    pub fn from_args(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => GenomeConfig::from_file(path)?,
            None => GenomeConfig::default(),
        };
        let config = Self::layered(args, file);
        config.validate()?;
        Ok(config)
    }

    fn layered(args: &Args, file: GenomeConfig) -> Self {
        let mut config = Self::new(
            args.input.clone(),
            args.output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        );

        if let Some(name) = args.genome_name.as_ref().or(file.name.as_ref()) {
            config.genome_name = HeaderValue::parse(name);
        }
        config.genome_path = args.genome_path.clone().or(file.genome_path);
        config.taxon_id = args
            .taxon_id
            .as_deref()
            .or(file.taxonid.as_deref())
            .map(HeaderValue::parse);
        config.timestamp = args
            .timestamp
            .as_deref()
            .or(file.timestamp.as_deref())
            .map(HeaderValue::parse);
        config.chromosomes = args
            .chromosomes
            .as_deref()
            .or(file.chromosomes.as_deref())
            .map(HeaderValue::parse);
        if let Some(re) = args.chr_regex.clone().or(file.chr_regex) {
            config.chr_regex = re;
        }
        config.include_types = args.include.clone().or(file.include_types);
        config.exclude_types = args
            .exclude
            .clone()
            .or(file.exclude_types)
            .unwrap_or_default();
        config.filters = args.filters.clone().or(file.filters).unwrap_or_default();
        config.chunk_size = args
            .chunk_size
            .or(file.chunk_size)
            .unwrap_or(DEFAULT_CHUNK_SIZE);
        config.sort = args.sort || file.sort.unwrap_or(false);
        config.build = args.build.clone().or(file.build);
        config.xref_file = args.xrefs.clone().or(file.xrefs);
        config.fasta = args.fasta.clone().or(file.fasta);
        config
    }

    /// Rejects unknown filter names and bad regexes before any data is read.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.filters.iter().find(|name| !is_registered(name)) {
            return Err(Gff2MgvError::UnknownFilter(name.clone()));
        }
        self.selection()?;
        Ok(())
    }

    pub fn selection(&self) -> Result<Selection> {
        Selection::new(
            &self.chr_regex,
            self.include_types.as_deref(),
            &self.exclude_types,
        )
    }

    /// Resolves `##pragma` references against the parsed header.
    ///
    /// # Errors
    ///
    /// Returns `MissingPragma` for references the header cannot satisfy,
    /// except the implicit `##taxonid` lookup.
    pub fn resolve(&self, header: &Header) -> Result<GenomeInfo> {
        let name = self.genome_name.first_or_missing(header)?;
        let path = self
            .genome_path
            .clone()
            .unwrap_or_else(|| sanitize_name(&name));

        let taxon_id = match &self.taxon_id {
            Some(value) => Some(value.first_or_missing(header)?),
            None => header.get(TAXON_PRAGMA).map(|v| v.first().to_string()),
        };

        let timestamp = match &self.timestamp {
            Some(value) => value.first_or_missing(header)?,
            None => current_timestamp(),
        };

        let chromosomes = match &self.chromosomes {
            None => None,
            Some(HeaderValue::Literal(list)) => Some(parse_chromosome_list(list)?),
            Some(HeaderValue::Pragma(name)) => {
                let values = header
                    .get(name)
                    .ok_or_else(|| Gff2MgvError::MissingPragma(name.clone()))?;
                Some(parse_sequence_regions(values.values())?)
            }
        };

        Ok(GenomeInfo {
            name,
            path,
            taxon_id,
            timestamp,
            chromosomes,
        })
    }

    pub fn filter_context(&self, genome: &GenomeInfo) -> FilterContext {
        FilterContext {
            genome_name: genome.name.clone(),
            taxon_id: genome.taxon_id.clone(),
            build: self.build.clone(),
            xref_file: self.xref_file.clone(),
        }
    }
}

/// Directory-safe genome name: `/` removed, lower-cased.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::config::sanitize_name;
///
/// assert_eq!(sanitize_name("C57BL/6J"), "c57bl6j");
/// ```
pub fn sanitize_name(name: &str) -> String {
    name.replace('/', "").to_lowercase()
}

fn current_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}
