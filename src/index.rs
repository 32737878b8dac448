//! Chromosome bookkeeping and the per-genome `index.json` document.

use crate::error::{Gff2MgvError, Result};
use crate::gff3::Feature;
use crate::model::Model;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.json";
pub const TRACK_READER: &str = "ChunkedGff3FileReader";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chromosome {
    pub name: String,
    pub length: u64,
}

impl Chromosome {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Chromosomes in order of first appearance, each with the largest end
/// coordinate seen on it.
#[derive(Debug, Clone, Default)]
pub struct ChromosomeRegistry {
    order: Vec<Chromosome>,
    position: HashMap<String, usize>,
}

impl ChromosomeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, feature: &Feature) {
        let idx = match self.position.get(feature.seqid.as_str()) {
            Some(&idx) => idx,
            None => {
                self.order.push(Chromosome::new(feature.seqid.clone(), 0));
                self.position
                    .insert(feature.seqid.clone(), self.order.len() - 1);
                self.order.len() - 1
            }
        };
        let chromosome = &mut self.order[idx];
        chromosome.length = chromosome.length.max(feature.end);
    }

    pub fn observe_model(&mut self, model: &Model) {
        model.iter().for_each(|f| self.observe(f));
    }

    pub fn get(&self, name: &str) -> Option<&Chromosome> {
        self.position.get(name).map(|&idx| &self.order[idx])
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Parses a literal `name[:length],name[:length],...` list.
///
/// A missing length is stored as 0 and filled in later from observed data.
///
/// # Errors
///
/// Returns `InvalidConfig` when a length is not an integer.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::index::parse_chromosome_list;
///
/// let chrs = parse_chromosome_list("1:195154279,2,X:169476592")?;
/// assert_eq!(chrs[1].length, 0);
/// ```
pub fn parse_chromosome_list(text: &str) -> Result<Vec<Chromosome>> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| match item.split_once(':') {
            Some((name, length)) => Ok(Chromosome::new(name, parse_length(length)?)),
            None => Ok(Chromosome::new(item, 0)),
        })
        .collect()
}

/// Parses `##sequence-region` values (`seqid start end`); the length is the
/// last token.
///
/// # Errors
///
/// Returns `InvalidConfig` on a value without a numeric last token.
pub fn parse_sequence_regions(values: &[String]) -> Result<Vec<Chromosome>> {
    values
        .iter()
        .map(|value| {
            let tokens = value.split_whitespace().collect::<Vec<_>>();
            match tokens.as_slice() {
                [name, .., last] => Ok(Chromosome::new(*name, parse_length(last)?)),
                _ => Err(Gff2MgvError::InvalidConfig(format!(
                    "bad sequence-region {value:?}"
                ))),
            }
        })
        .collect()
}

fn parse_length(text: &str) -> Result<u64> {
    text.trim()
        .parse::<u64>()
        .map_err(|_| Gff2MgvError::InvalidConfig(format!("bad chromosome length {text:?}")))
}

/// Final chromosome list for the index.
///
/// Without an override the observed list is used as is. With one, entries
/// rejected by `keep` are dropped and zero lengths are taken from the
/// observed maxima.
pub fn resolve_chromosomes(
    overrides: Option<Vec<Chromosome>>,
    observed: &ChromosomeRegistry,
    keep: impl Fn(&str) -> bool,
) -> Vec<Chromosome> {
    let Some(overrides) = overrides else {
        return observed.chromosomes().to_vec();
    };
    overrides
        .into_iter()
        .filter(|c| keep(&c.name))
        .map(|mut c| {
            if c.length == 0 {
                c.length = observed.get(&c.name).map_or(0, |o| o.length);
            }
            c
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackReader {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "chunkSize")]
    pub chunk_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub reader: TrackReader,
}

impl Track {
    pub fn chunked(name: &str, chunk_size: u64) -> Self {
        Self {
            name: name.to_string(),
            reader: TrackReader {
                kind: TRACK_READER.to_string(),
                chunk_size,
            },
        }
    }
}

/// Contents of `<genome>/index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeIndex {
    pub name: String,
    pub taxonid: Option<String>,
    pub timestamp: String,
    pub chromosomes: Vec<Chromosome>,
    pub tracks: Vec<Track>,
}

impl GenomeIndex {
    /// Index with the `genes` (unchunked) and `transcripts` tracks.
    pub fn new(
        name: impl Into<String>,
        taxonid: Option<String>,
        timestamp: impl Into<String>,
        chromosomes: Vec<Chromosome>,
        chunk_size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            taxonid,
            timestamp: timestamp.into(),
            chromosomes,
            tracks: vec![
                Track::chunked("genes", 0),
                Track::chunked("transcripts", chunk_size),
            ],
        }
    }

    /// Writes `index.json` into `dir` and returns its path.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(INDEX_FILE);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff3::parse_line;

    #[test]
    fn test_registry_keeps_first_seen_order_and_max_end() {
        let mut registry = ChromosomeRegistry::new();
        for line in [
            "2\ts\tgene\t10\t500\t.\t+\t.\tID=a",
            "1\ts\tgene\t10\t300\t.\t+\t.\tID=b",
            "2\ts\texon\t10\t900\t.\t+\t.\tParent=a",
            "2\ts\tgene\t10\t20\t.\t+\t.\tID=c",
        ] {
            registry.observe(&parse_line(line).unwrap());
        }
        assert_eq!(
            registry.chromosomes(),
            &[Chromosome::new("2", 900), Chromosome::new("1", 300)]
        );
    }

    #[test]
    fn test_parse_chromosome_list() {
        let chrs = parse_chromosome_list("1:195154279, 2,X:169476592").unwrap();
        assert_eq!(
            chrs,
            vec![
                Chromosome::new("1", 195154279),
                Chromosome::new("2", 0),
                Chromosome::new("X", 169476592),
            ]
        );
        assert!(parse_chromosome_list("1:big").is_err());
    }

    #[test]
    fn test_parse_sequence_regions() {
        let values = vec!["1 1 195154279".to_string(), "MT 1 16299".to_string()];
        let chrs = parse_sequence_regions(&values).unwrap();
        assert_eq!(chrs[1], Chromosome::new("MT", 16299));
        assert!(parse_sequence_regions(&["1".to_string()]).is_err());
    }

    #[test]
    fn test_resolve_fills_and_filters() {
        let mut observed = ChromosomeRegistry::new();
        observed.observe(&parse_line("2\ts\tgene\t1\t777\t.\t+\t.\tID=a").unwrap());

        let overrides = vec![
            Chromosome::new("1", 100),
            Chromosome::new("2", 0),
            Chromosome::new("JH584295.1", 10),
        ];
        let chrs = resolve_chromosomes(Some(overrides), &observed, |name| !name.contains('.'));
        assert_eq!(chrs, vec![Chromosome::new("1", 100), Chromosome::new("2", 777)]);

        let chrs = resolve_chromosomes(None, &observed, |_| false);
        assert_eq!(chrs, vec![Chromosome::new("2", 777)]);
    }

    #[test]
    fn test_index_json_shape() {
        let index = GenomeIndex::new(
            "C57BL/6J",
            Some("10090".to_string()),
            "Mon Oct 19 10:00:00 2026",
            vec![Chromosome::new("1", 195154279)],
            4000000,
        );
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["name"], "C57BL/6J");
        assert_eq!(json["taxonid"], "10090");
        assert_eq!(json["chromosomes"][0]["length"], 195154279);
        assert_eq!(json["tracks"][0]["name"], "genes");
        assert_eq!(json["tracks"][0]["reader"]["chunkSize"], 0);
        assert_eq!(json["tracks"][1]["reader"]["type"], "ChunkedGff3FileReader");
        assert_eq!(json["tracks"][1]["reader"]["chunkSize"], 4000000);
    }
}
