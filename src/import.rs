use crate::config::{Config, GenomeInfo};
use crate::detect::{detect_fasta, detect_input, Compression, InputSource};
use crate::error::Result;
use crate::filter::{Chain, Selection, XrefCache};
use crate::group::{ModelReader, ModelSource};
use crate::index::{resolve_chromosomes, ChromosomeRegistry, GenomeIndex};
use crate::stats::max_mem_usage_mb;
use crate::writer::{ChunkedWriter, WriteCounts};
use flate2::read::MultiGzDecoder;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

pub const MODELS_DIR: &str = "models";
pub const ASSEMBLY_DIR: &str = "assembly";
const SEQUENCE_EXT: &str = "txt";

/// Counts for one split assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    /// Sequences written, one file each.
    pub sequences: usize,
    /// Sequences whose ID fails the chromosome regex.
    pub skipped: usize,
    pub bases: u64,
    pub assembly_dir: PathBuf,
}

/// Summary statistics for an import run.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Wall clock time spent in the import.
    pub elapsed: Duration,
    /// Delta in maximum RSS memory usage, in MB.
    pub mem_delta_mb: f64,
    /// Models produced by the grouper.
    pub models_read: usize,
    /// Models removed by the transform chain.
    pub models_dropped: usize,
    /// Children whose parent never appeared.
    pub orphans: usize,
    pub written: WriteCounts,
    /// `<output_dir>/<genome path>`.
    pub genome_dir: PathBuf,
    pub index_path: PathBuf,
    /// Present when an assembly FASTA was configured.
    pub assembly: Option<AssemblyStats>,
}

/// Runs an import with the provided configuration.
///
/// Opens the input (gzip-aware), groups features into models, runs the
/// transform chain, writes the chunked store and finally `index.json`.
/// When `config.fasta` is set the assembly is split into the same genome
/// directory afterwards.
///
/// # Arguments
///
/// * `config` - Configuration containing all import parameters
///
/// # Returns
///
/// Returns RunStats with timing, memory and record counts.
///
/// # Errors
///
/// Returns an error on malformed input, missing header pragmas, transform
/// unit failures and any I/O failure. Orphans are not errors.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::{run, Config};
///
/// let mut config = Config::new("MGI.gff3.gz", "./output");
/// config.filters = vec!["mgiGff".to_string()];
/// let stats = run(&config)?;
/// println!("{} models in {:?}", stats.written.models, stats.elapsed);
/// ```
pub fn run(config: &Config) -> Result<RunStats> {
    let source = detect_input(&config.input)?;
    let reader = open_input(&config.input, source)?;
    import(reader, config)
}

/// Same as [`run`], reading GFF3 text from `reader`.
pub fn import<R: BufRead>(reader: R, config: &Config) -> Result<RunStats> {
    let start = Instant::now();
    let start_mem = max_mem_usage_mb();

    config.validate()?;
    let selection = config.selection()?;

    let reader = ModelReader::new(reader)?;
    if config.sort {
        log::info!("Sorting models before writing");
        import_models(reader.sorted()?, config, selection, start, start_mem)
    } else {
        import_models(reader, config, selection, start, start_mem)
    }
}

fn import_models<S: ModelSource>(
    mut source: S,
    config: &Config,
    selection: Selection,
    start: Instant,
    start_mem: f64,
) -> Result<RunStats> {
    let genome = config.resolve(source.header())?;
    let genome_dir = config.output_dir.join(&genome.path);
    log::info!("Importing {:?} into {}", genome.name, genome_dir.display());

    let mut cache = XrefCache::default();
    let mut chain = Chain::build(
        &config.filters,
        selection,
        &config.filter_context(&genome),
        &mut cache,
    )?;
    log::info!("Transform units: {:?}", chain.names());

    let models_dir = genome_dir.join(MODELS_DIR);
    clear_dir(&models_dir)?;
    let mut writer = ChunkedWriter::create(&models_dir, config.chunk_size)?;

    let mut models_read = 0;
    let mut models_dropped = 0;
    for model in source.by_ref() {
        models_read += 1;
        match chain.apply(model?)? {
            Some(model) => writer.write_model(model)?,
            None => models_dropped += 1,
        }
    }
    let orphans = source.orphans().len();

    let (registry, written) = writer.finish()?;
    let index_path = write_index(&genome, &genome_dir, config, &registry, &chain)?;
    let assembly = match &config.fasta {
        Some(path) => Some(import_fasta(path, &genome_dir, chain.selection())?),
        None => None,
    };

    let elapsed = start.elapsed();
    let mem_delta_mb = (max_mem_usage_mb() - start_mem).max(0.0);

    log::info!(
        "{} models read, {} dropped, {} written ({} transcripts in {} chunk files)",
        models_read,
        models_dropped,
        written.models,
        written.transcripts,
        written.chunk_files
    );

    Ok(RunStats {
        elapsed,
        mem_delta_mb,
        models_read,
        models_dropped,
        orphans,
        written,
        genome_dir,
        index_path,
        assembly,
    })
}

fn write_index(
    genome: &GenomeInfo,
    genome_dir: &Path,
    config: &Config,
    registry: &ChromosomeRegistry,
    chain: &Chain,
) -> Result<PathBuf> {
    let chromosomes = resolve_chromosomes(genome.chromosomes.clone(), registry, |name| {
        chain.selection().accepts_seqid(name)
    });
    let index = GenomeIndex::new(
        genome.name.clone(),
        genome.taxon_id.clone(),
        genome.timestamp.clone(),
        chromosomes,
        config.chunk_size,
    );
    let path = index.write(genome_dir)?;
    log::info!("Wrote {}", path.display());
    Ok(path)
}

/// Splits an assembly FASTA into `<genome_dir>/assembly/<seqid>.txt`.
///
/// Each kept sequence is written as one line of raw residues with no
/// defline. Sequences are kept when their ID (the first word of the
/// defline) passes the chromosome regex. The assembly directory is emptied
/// first.
///
/// # Errors
///
/// Returns an error for an unsupported extension or any I/O failure.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::filter::Selection;
/// use gff2mgv::import::import_fasta;
/// use std::path::Path;
///
/// let selection = Selection::new(r"\d+|X|Y|MT", None, &[])?;
/// let stats = import_fasta(Path::new("GRCm39.fa.gz"), Path::new("output/c57bl6j"), &selection)?;
/// println!("{} sequences, {} bases", stats.sequences, stats.bases);
/// ```
pub fn import_fasta(path: &Path, genome_dir: &Path, selection: &Selection) -> Result<AssemblyStats> {
    let compression = detect_fasta(path)?;
    let reader = open_input(path, InputSource::File(compression))?;

    let assembly_dir = genome_dir.join(ASSEMBLY_DIR);
    clear_dir(&assembly_dir)?;
    log::info!("Splitting assembly into {}", assembly_dir.display());

    let stats = split_fasta(reader, &assembly_dir, selection)?;
    log::info!(
        "{} sequences written ({} bases), {} skipped",
        stats.sequences,
        stats.bases,
        stats.skipped
    );
    Ok(stats)
}

/// Same as [`import_fasta`] over an open reader, into an existing directory.
pub fn split_fasta<R: BufRead>(
    reader: R,
    assembly_dir: &Path,
    selection: &Selection,
) -> Result<AssemblyStats> {
    let mut stats = AssemblyStats {
        assembly_dir: assembly_dir.to_path_buf(),
        ..Default::default()
    };
    let mut current: Option<BufWriter<File>> = None;

    for line in reader.lines() {
        let line = line?;
        if let Some(defline) = line.strip_prefix('>') {
            if let Some(mut previous) = current.take() {
                previous.flush()?;
            }
            let seqid = defline.split_whitespace().next().unwrap_or("");
            if !seqid.is_empty() && selection.accepts_seqid(seqid) {
                let file = assembly_dir.join(format!("{seqid}.{SEQUENCE_EXT}"));
                log::debug!("Writing {}", file.display());
                current = Some(BufWriter::new(File::create(file)?));
                stats.sequences += 1;
            } else {
                log::debug!("Skipping >{}", defline);
                stats.skipped += 1;
            }
        } else if let Some(out) = current.as_mut() {
            let residues = line.trim();
            out.write_all(residues.as_bytes())?;
            stats.bases += residues.len() as u64;
        }
    }

    if let Some(mut last) = current.take() {
        last.flush()?;
    }
    Ok(stats)
}

/// Opens the input as a buffered line reader.
///
/// # Errors
///
/// Returns an error if the file cannot be opened.
pub fn open_input(path: &Path, source: InputSource) -> Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = match source {
        InputSource::Stdin => {
            log::info!("Reading from standard input");
            Box::new(BufReader::new(io::stdin()))
        }
        InputSource::File(Compression::Gzip) => {
            log::info!("Reading gzip input {}", path.display());
            Box::new(BufReader::new(MultiGzDecoder::new(File::open(path)?)))
        }
        InputSource::File(Compression::None) => {
            log::info!("Reading {}", path.display());
            Box::new(BufReader::new(File::open(path)?))
        }
    };
    Ok(reader)
}

/// Empties `dir`, creating it when missing.
fn clear_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn test_split_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let fasta = indoc! {"
            stray line before any defline
            >1 dna:chromosome chromosome:GRCm39:1:1:195154279:1 REF
            ACGTNNACGT
            acgt\r
            >JH584295.1 dna:scaffold
            TTTT
            >MT
            GATC
        "};
        let selection = Selection::new(r"\d+|X|Y|MT", None, &[]).unwrap();
        let stats = split_fasta(fasta.as_bytes(), dir.path(), &selection).unwrap();

        assert_eq!(stats.sequences, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.bases, 18);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("1.txt")).unwrap(),
            "ACGTNNACGTacgt"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("MT.txt")).unwrap(), "GATC");
        assert!(!dir.path().join("JH584295.1.txt").exists());
    }
}
