//! # gff2mgv
//!
//! Imports GFF3 gene annotations into the chunked, file-based store read by
//! a genome viewer.
//!
//! The pipeline streams features from a (possibly gzip-compressed) GFF3
//! file, reassembles them into gene models even when nested loci interleave
//! their lines, normalizes each model through an ordered chain of named
//! provider-specific transform units, and writes:
//!
//! - `models/genes/0.gff3` with every top-level feature and its `tCount`
//! - `models/transcripts/...` chunk files with compacted `exons`/`cds`
//! - `index.json` describing the genome, its chromosomes and its tracks
//! - optionally `assembly/<seqid>.txt`, one raw sequence per kept chromosome
//!
//! ## Usage
//!
//! ```rust, ignore
//! use gff2mgv::{run, Config};
//!
//! let mut config = Config::new("Mus_musculus.GRCm39.110.gff3.gz", "./output");
//! config.filters = vec!["ensemblMouse".to_string()];
//! config.exclude_types = vec!["chromosome".to_string(), "biological_region".to_string()];
//! config.chr_regex = r"\d+|X|Y|MT".to_string();
//! config.chunk_size = 4_000_000;
//!
//! let stats = run(&config)?;
//! println!("Import completed in {:?}", stats.elapsed);
//! println!("Memory used: {:.2} MB", stats.mem_delta_mb);
//! ```
//!
//! ## Reading models directly
//!
//! ```rust, ignore
//! use gff2mgv::group::ModelReader;
//! use std::io::BufReader;
//!
//! let reader = ModelReader::new(BufReader::new(std::fs::File::open("MGI.gff3")?))?;
//! for model in reader {
//!     let model = model?;
//!     println!("{} features", model.len());
//! }
//! ```

pub mod cli;
pub mod config;
pub mod detect;
pub mod error;
pub mod filter;
pub mod gff3;
pub mod group;
pub mod import;
pub mod index;
pub mod model;
pub mod stats;
pub mod writer;

pub use cli::Args;
pub use config::Config;
pub use error::{Gff2MgvError, Result};
pub use gff3::{format_line, parse_line, Feature};
pub use import::{import_fasta, run, AssemblyStats, RunStats};
pub use model::Model;
pub use stats::max_mem_usage_mb;
