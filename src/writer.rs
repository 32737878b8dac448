//! Chunked on-disk store for filtered models.
//!
//! Layout under the `models` directory:
//!
//! ```text
//! genes/0.gff3                 every top-level feature
//! transcripts/0.gff3           all transcripts            (chunk size 0)
//! transcripts/<chr>/0.gff3     one file per chromosome    (chunk size 1)
//! transcripts/<chr>/<b>.gff3   one file per block b       (chunk size K > 1)
//! ```

use crate::error::Result;
use crate::gff3::{AttrValue, Feature};
use crate::index::ChromosomeRegistry;
use crate::model::Model;
use hashbrown::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

pub const GENES_TRACK: &str = "genes";
pub const TRANSCRIPTS_TRACK: &str = "transcripts";
const CHUNK_EXT: &str = "gff3";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub models: usize,
    pub genes: usize,
    pub transcripts: usize,
    /// Transcript lines, counting a transcript once per block it overlaps.
    pub transcript_lines: usize,
    pub chunk_files: usize,
}

/// Blocks a `[start, end]` span overlaps for chunk size `k`.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::writer::block_range;
///
/// assert_eq!(block_range(900, 2100, 1000), 0..=2);
/// assert_eq!(block_range(900, 2100, 1), 0..=0);
/// ```
pub fn block_range(start: u64, end: u64, k: u64) -> RangeInclusive<u64> {
    if k <= 1 {
        0..=0
    } else {
        start / k..=end / k
    }
}

/// Path of the transcript chunk file for `seqid` and `block`.
pub fn transcript_chunk_path(models_dir: &Path, chunk_size: u64, seqid: &str, block: u64) -> PathBuf {
    let track = models_dir.join(TRANSCRIPTS_TRACK);
    match chunk_size {
        0 => track.join(format!("0.{CHUNK_EXT}")),
        _ => track.join(seqid).join(format!("{block}.{CHUNK_EXT}")),
    }
}

pub fn genes_path(models_dir: &Path) -> PathBuf {
    models_dir.join(GENES_TRACK).join(format!("0.{CHUNK_EXT}"))
}

/// `offset_length` token of an exon relative to its transcript.
///
/// An exon reaching past the transcript is clipped to it with a warning; one
/// entirely outside it yields no token.
fn exon_token(transcript: &Feature, exon: &Feature) -> Option<String> {
    let start = exon.start.max(transcript.start);
    let end = exon.end.min(transcript.end);
    if start > end {
        log::warn!(
            "Dropped exon {} at {}-{}: outside transcript {} ({}-{})",
            exon.id().unwrap_or("."),
            exon.start,
            exon.end,
            transcript.id().unwrap_or("."),
            transcript.start,
            transcript.end
        );
        return None;
    }
    if (start, end) != (exon.start, exon.end) {
        log::warn!(
            "Clipped exon {} at {}-{} to transcript {} ({}-{})",
            exon.id().unwrap_or("."),
            exon.start,
            exon.end,
            transcript.id().unwrap_or("."),
            transcript.start,
            transcript.end
        );
    }
    Some(format!("{}_{}", start - transcript.start, end + 1 - start))
}

/// A model split into what goes to the gene file and what goes to the
/// transcript chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compacted {
    pub genes: Vec<Feature>,
    pub transcripts: Vec<Feature>,
}

enum Role {
    Gene { transcripts: usize },
    Transcript { exons: Vec<String>, cds: Option<String> },
    Leaf,
}

/// Compacts a model for writing.
///
/// Top-level features get `tCount`, the number of their direct children.
/// Features that are parents of something get `exons` (offset/length
/// tokens sorted by start) and, when they have CDS children, a single
/// `cds=id|proteinId|start|end` summary. Leaf features are folded into
/// their parents and not written.
pub fn compact_model(model: Model) -> Compacted {
    let roles = {
        let children = model.children_index();
        model
            .features
            .iter()
            .map(|feature| {
                let kids = feature.id().and_then(|id| children.get(id));
                if feature.is_top_level() {
                    return Role::Gene {
                        transcripts: kids.map_or(0, Vec::len),
                    };
                }
                let Some(kids) = kids else {
                    return Role::Leaf;
                };

                let mut exons = kids
                    .iter()
                    .map(|&idx| &model.features[idx])
                    .filter(|f| f.kind == "exon")
                    .collect::<Vec<_>>();
                exons.sort_by_key(|e| e.start);

                let mut cdss = kids
                    .iter()
                    .map(|&idx| &model.features[idx])
                    .filter(|f| f.kind == "CDS")
                    .collect::<Vec<_>>();
                cdss.sort_by_key(|c| c.start);

                let cds = match (cdss.first(), cdss.last()) {
                    (Some(first), Some(last)) => {
                        let protein = first
                            .attributes
                            .get_str("protein_id")
                            .or_else(|| first.attributes.get_str("curie"))
                            .unwrap_or("");
                        Some(format!(
                            "{}|{}|{}|{}",
                            first.id().unwrap_or(""),
                            protein,
                            first.start,
                            last.end
                        ))
                    }
                    _ => None,
                };

                Role::Transcript {
                    exons: exons.iter().filter_map(|e| exon_token(feature, e)).collect(),
                    cds,
                }
            })
            .collect::<Vec<_>>()
    };

    let mut compacted = Compacted::default();
    for (mut feature, role) in model.features.into_iter().zip(roles) {
        match role {
            Role::Gene { transcripts } => {
                feature
                    .attributes
                    .insert("tCount", transcripts.to_string());
                compacted.genes.push(feature);
            }
            Role::Transcript { exons, cds } => {
                feature.attributes.insert("exons", AttrValue::List(exons));
                if let Some(cds) = cds {
                    feature.attributes.insert("cds", cds);
                }
                compacted.transcripts.push(feature);
            }
            Role::Leaf => {}
        }
    }
    compacted
}

/// Writes models into the chunked layout and tracks chromosome extents.
///
/// Only one transcript chunk file is open at a time. Switching back to a
/// file written earlier in the run reopens it in append mode.
pub struct ChunkedWriter {
    models_dir: PathBuf,
    chunk_size: u64,
    genes: BufWriter<File>,
    current: Option<(PathBuf, BufWriter<File>)>,
    opened: HashSet<PathBuf>,
    registry: ChromosomeRegistry,
    counts: WriteCounts,
}

impl ChunkedWriter {
    /// Creates `genes/0.gff3` under `models_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or the gene file cannot be created.
    pub fn create(models_dir: &Path, chunk_size: u64) -> Result<Self> {
        let genes_file = genes_path(models_dir);
        if let Some(dir) = genes_file.parent() {
            fs::create_dir_all(dir)?;
        }
        log::info!("Writing genes to {}", genes_file.display());

        Ok(Self {
            models_dir: models_dir.to_path_buf(),
            chunk_size,
            genes: BufWriter::new(File::create(&genes_file)?),
            current: None,
            opened: HashSet::new(),
            registry: ChromosomeRegistry::new(),
            counts: WriteCounts::default(),
        })
    }

    /// Writes one model.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures; nothing already written is rolled back.
    pub fn write_model(&mut self, model: Model) -> Result<()> {
        if model.is_empty() {
            return Ok(());
        }
        self.registry.observe_model(&model);
        let seqid = model.seqid().to_string();

        let Compacted { genes, transcripts } = compact_model(model);
        for gene in &genes {
            self.genes.write_all(gene.to_line().as_bytes())?;
        }
        self.counts.models += 1;
        self.counts.genes += genes.len();
        self.counts.transcripts += transcripts.len();

        let Some(span) = transcripts
            .iter()
            .map(|t| block_range(t.start, t.end, self.chunk_size))
            .reduce(|a, b| *a.start().min(b.start())..=*a.end().max(b.end()))
        else {
            return Ok(());
        };

        for block in span {
            let lines = transcripts
                .iter()
                .filter(|t| block_range(t.start, t.end, self.chunk_size).contains(&block))
                .map(Feature::to_line)
                .collect::<Vec<_>>();
            if lines.is_empty() {
                continue;
            }
            let path = transcript_chunk_path(&self.models_dir, self.chunk_size, &seqid, block);
            self.write_chunk(&path, &lines)?;
        }
        Ok(())
    }

    fn write_chunk(&mut self, path: &Path, lines: &[String]) -> Result<()> {
        self.switch_to(path)?;
        if let Some((_, writer)) = self.current.as_mut() {
            for line in lines {
                writer.write_all(line.as_bytes())?;
            }
        }
        self.counts.transcript_lines += lines.len();
        Ok(())
    }

    fn switch_to(&mut self, path: &Path) -> Result<()> {
        if matches!(&self.current, Some((current, _)) if current == path) {
            return Ok(());
        }
        if let Some((_, mut previous)) = self.current.take() {
            previous.flush()?;
        }

        let file = if self.opened.contains(path) {
            OpenOptions::new().append(true).open(path)?
        } else {
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)?;
            }
            log::info!("Opened chunk {}", chunk_label(path));
            self.opened.insert(path.to_path_buf());
            self.counts.chunk_files += 1;
            File::create(path)?
        };
        self.current = Some((path.to_path_buf(), BufWriter::new(file)));
        Ok(())
    }

    /// Flushes every open file and hands back the observed chromosomes.
    pub fn finish(mut self) -> Result<(ChromosomeRegistry, WriteCounts)> {
        self.genes.flush()?;
        if let Some((_, mut writer)) = self.current.take() {
            writer.flush()?;
        }
        Ok((self.registry, self.counts))
    }
}

// "<dir>/<file>"
fn chunk_label(path: &Path) -> String {
    let name = |p: Option<&Path>| {
        p.and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    };
    format!("{}/{}", name(path.parent()), name(Some(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff3::parse_line;

    fn model(lines: &[&str]) -> Model {
        Model::new(lines.iter().map(|l| parse_line(l).unwrap()).collect())
    }

    #[test]
    fn test_block_range() {
        assert_eq!(block_range(1000, 2000, 0), 0..=0);
        assert_eq!(block_range(1000, 2000, 1), 0..=0);
        assert_eq!(block_range(999, 2000, 1000), 0..=2);
        assert_eq!(block_range(1000, 1999, 1000), 1..=1);
    }

    #[test]
    fn test_chunk_paths() {
        let root = Path::new("out/models");
        assert_eq!(
            transcript_chunk_path(root, 0, "1", 0),
            Path::new("out/models/transcripts/0.gff3")
        );
        assert_eq!(
            transcript_chunk_path(root, 1, "X", 0),
            Path::new("out/models/transcripts/X/0.gff3")
        );
        assert_eq!(
            transcript_chunk_path(root, 5000, "X", 3),
            Path::new("out/models/transcripts/X/3.gff3")
        );
        assert_eq!(genes_path(root), Path::new("out/models/genes/0.gff3"));
    }

    #[test]
    fn test_compact_model() {
        let m = model(&[
            "1\ts\tgene\t1000\t2000\t.\t+\t.\tID=g1",
            "1\ts\tmRNA\t1000\t2000\t.\t+\t.\tID=t1;Parent=g1",
            "1\ts\texon\t1800\t2000\t.\t+\t.\tID=e2;Parent=t1",
            "1\ts\texon\t1000\t1200\t.\t+\t.\tID=e1;Parent=t1",
            "1\ts\tCDS\t1850\t1900\t.\t+\t0\tID=c1;Parent=t1;protein_id=P1",
            "1\ts\tCDS\t1100\t1200\t.\t+\t0\tID=c1;Parent=t1;protein_id=P1",
            "1\ts\tncRNA\t1000\t1500\t.\t+\t.\tID=t2;Parent=g1",
        ]);
        let out = compact_model(m);

        assert_eq!(out.genes.len(), 1);
        assert_eq!(out.genes[0].attributes.get_str("tCount"), Some("2"));

        assert_eq!(out.transcripts.len(), 1);
        let t1 = &out.transcripts[0];
        assert_eq!(t1.attributes.get_list("exons"), &["0_201", "800_201"]);
        assert_eq!(t1.attributes.get_str("cds"), Some("c1|P1|1100|1900"));
    }

    #[test]
    fn test_exons_stay_inside_transcript() {
        let m = model(&[
            "1\ts\tgene\t900\t2600\t.\t+\t.\tID=g1",
            "1\ts\tmRNA\t1000\t2000\t.\t+\t.\tID=t1;Parent=g1",
            "1\ts\texon\t900\t1100\t.\t+\t.\tID=e1;Parent=t1",
            "1\ts\texon\t1500\t1600\t.\t+\t.\tID=e2;Parent=t1",
            "1\ts\texon\t1900\t2100\t.\t+\t.\tID=e3;Parent=t1",
            "1\ts\texon\t2500\t2600\t.\t+\t.\tID=e4;Parent=t1",
        ]);
        let out = compact_model(m);
        let t1 = &out.transcripts[0];
        let exons = t1.attributes.get_list("exons");
        assert_eq!(exons, &["0_101", "500_101", "900_101"]);

        let length = t1.len();
        let mut previous_end = 0;
        for token in exons {
            let (offset, len) = token.split_once('_').unwrap();
            let (offset, len) = (offset.parse::<u64>().unwrap(), len.parse::<u64>().unwrap());
            assert!(offset >= previous_end);
            assert!(offset + len <= length);
            previous_end = offset + len;
        }
    }

    #[test]
    fn test_cds_protein_falls_back_to_curie() {
        let m = model(&[
            "1\ts\tgene\t1\t100\t.\t-\t.\tID=g1",
            "1\ts\tmRNA\t1\t100\t.\t-\t.\tID=t1;Parent=g1",
            "1\ts\tCDS\t10\t90\t.\t-\t0\tID=c1;Parent=t1;curie=UniProt:Q1",
        ]);
        let out = compact_model(m);
        assert_eq!(out.transcripts[0].attributes.get_str("cds"), Some("c1|UniProt:Q1|10|90"));
        assert_eq!(out.transcripts[0].attributes.get_list("exons"), &[] as &[String]);
    }
}
