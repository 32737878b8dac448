//! # gff2mgv
//!
//! Imports a GFF3 annotation into a chunked genome-viewer store.
//!
//! ## Usage
//!
//! ```bash
//! gff2mgv -i <GFF3> [-o <DIR>] [OPTIONS]
//!
//! Required arguments:
//!   -i, --input <GFF3>           Path to GFF3 file (.gff3, .gff3.gz), or - for stdin
//!
//! Optional arguments:
//!   -o, --output <DIR>           Output directory [default: ./output]
//!   -g, --genome-name <NAME>     Genome name or ##pragma [default: ##genome-name]
//!   -p, --genome-path <PATH>     Genome directory name [default: sanitized name]
//!   -x, --taxonid <TAXON>        Taxon id or ##pragma [default: ##taxonid]
//!   -T, --timestamp <TIME>       Timestamp or ##pragma [default: now]
//!   -c, --chromosomes <CHROMS>   name[:length],... or ##sequence-region
//!   -r, --chr-regex <REGEX>      Chromosomes to keep [default: .*]
//!       --include <TYPES>        Feature types to keep
//!       --exclude <TYPES>        Feature types to drop
//!   -f, --filters <UNITS>        Transform units, in order
//!   -k, --chunk-size <K>         Transcript chunking [default: 1]
//!       --sort                   Sort models before writing
//!       --build <BUILD>          Assembly label for MGI IDs
//!       --xrefs <TSV>            MGI/Ensembl associations
//!       --fasta <FASTA>          Assembly to split per chromosome
//!       --config <JSON>          Genome configuration file
//!   -v, --verbose                Debug logging
//! ```
//!
//! ## Examples
//!
//! ### MGI annotation, one transcript file per chromosome
//!
//! ```bash
//! gff2mgv -i MGI.gff3.gz -o output -g C57BL/6J -x 10090 -f mgiGff --build GRCm39
//! ```
//!
//! ### Ensembl annotation in 4 Mb blocks
//!
//! ```bash
//! gff2mgv -i Mus_musculus.GRCm39.110.gff3.gz -g C57BL/6J -x 10090 \
//!     -f ensemblMouse --xrefs mgi_ensembl.tsv -k 4000000 \
//!     -r '\d+|X|Y|MT' --exclude chromosome,biological_region
//! ```
use clap::Parser;
use gff2mgv::{run, Args, Config};
use log::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose { Level::Debug } else { Level::Info };
    simple_logger::init_with_level(level)?;

    log::debug!("{:?}", args);
    args.check()?;

    let config = Config::from_args(&args)?;
    log::info!("Input: {}", config.input.display());

    let stats = run(&config)?;
    if let Some(assembly) = &stats.assembly {
        log::info!(
            "Assembly: {} sequences in {}",
            assembly.sequences,
            assembly.assembly_dir.display()
        );
    }
    if stats.orphans > 0 {
        log::warn!("{} orphan records were not imported", stats.orphans);
    }
    log::info!("Elapsed: {:.4?} secs", stats.elapsed.as_secs_f32());
    log::info!("Memory: {:.2} MB", stats.mem_delta_mb);

    Ok(())
}
