use super::{map_id, map_parents, FilterContext, Transform};
use crate::error::{Gff2MgvError, Result};
use crate::gff3::Feature;
use hashbrown::HashMap;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

/// Removes a `gene:`, `transcript:` or `CDS:` prefix from an identifier.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::filter::strip_type_prefix;
///
/// assert_eq!(strip_type_prefix("transcript:ENSMUST00000134716"), "ENSMUST00000134716");
/// assert_eq!(strip_type_prefix("MGI:97490"), "MGI:97490");
/// ```
pub fn strip_type_prefix(id: &str) -> &str {
    match id.split_once(':') {
        Some(("gene" | "transcript" | "CDS", rest)) => rest,
        _ => id,
    }
}

fn promote_protein_coding(feature: &mut Feature) {
    if feature.kind == "gene" && feature.attributes.get_str("biotype") == Some("protein_coding") {
        feature.kind = "protein_coding_gene".to_string();
    }
}

/// Strips type prefixes from `ID` and every `Parent`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripPrefix;

impl Transform for StripPrefix {
    fn name(&self) -> &'static str {
        "stripPrefix"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        map_id(&mut feature, |id| strip_type_prefix(id).to_string());
        map_parents(&mut feature, |p| strip_type_prefix(p).to_string());
        Ok(Some(feature))
    }
}

/// Retypes `gene` features with `biotype=protein_coding` as `protein_coding_gene`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromoteBiotype;

impl Transform for PromoteBiotype {
    fn name(&self) -> &'static str {
        "promoteBiotype"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        promote_protein_coding(&mut feature);
        Ok(Some(feature))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefEntry {
    pub curie: String,
    pub symbol: String,
}

/// Ensembl gene ID to MGI curie/symbol associations.
///
/// Loaded from a whitespace-separated snapshot with three columns per line:
/// MGI ID, symbol and Ensembl gene ID. Short lines are skipped.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    by_ensembl: HashMap<String, XrefEntry>,
}

impl XrefTable {
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut by_ensembl = HashMap::new();
        for line in reader.lines() {
            let line = line?;
            let cols = line.split_whitespace().collect::<Vec<_>>();
            if cols.len() < 3 {
                continue;
            }
            by_ensembl.insert(
                cols[2].to_string(),
                XrefEntry {
                    curie: cols[0].to_string(),
                    symbol: cols[1].to_string(),
                },
            );
        }
        Ok(Self { by_ensembl })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        log::info!("Loading MGI/Ensembl associations from {}", path.display());
        let table = Self::parse(BufReader::new(File::open(path)?))?;
        log::info!("{} associations loaded", table.len());
        Ok(table)
    }

    pub fn get(&self, ensembl_id: &str) -> Option<&XrefEntry> {
        self.by_ensembl.get(ensembl_id)
    }

    pub fn len(&self) -> usize {
        self.by_ensembl.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ensembl.is_empty()
    }
}

/// Snapshots loaded during one run, keyed by the snapshot path.
///
/// Every unit that asks for the same snapshot shares one table.
#[derive(Debug, Default)]
pub struct XrefCache {
    tables: HashMap<PathBuf, Rc<XrefTable>>,
}

impl XrefCache {
    pub fn get_or_load(&mut self, path: &Path) -> Result<Rc<XrefTable>> {
        if let Some(table) = self.tables.get(path) {
            return Ok(Rc::clone(table));
        }
        let table = Rc::new(XrefTable::from_file(path)?);
        self.tables.insert(path.to_path_buf(), Rc::clone(&table));
        Ok(table)
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, table: XrefTable) {
        self.tables.insert(path.into(), Rc::new(table));
    }
}

/// Ensembl mouse GFF3: prefix stripping, biotype promotion, MGI tagging of
/// projected genes and `ENSEMBL:` curies on transcript/protein IDs.
#[derive(Debug, Clone, Default)]
pub struct EnsemblMouse {
    xrefs: Option<Rc<XrefTable>>,
}

impl EnsemblMouse {
    pub fn new(ctx: &FilterContext, cache: &mut XrefCache) -> Result<Self> {
        let xrefs = match &ctx.xref_file {
            Some(path) => Some(cache.get_or_load(path)?),
            None => {
                log::warn!("ensemblMouse: no cross-reference snapshot, projected genes keep Ensembl IDs");
                None
            }
        };
        Ok(Self { xrefs })
    }

    pub fn with_table(table: Rc<XrefTable>) -> Self {
        Self { xrefs: Some(table) }
    }
}

fn ensembl_curie(value: &str) -> String {
    if value.contains(':') {
        value.to_string()
    } else {
        format!("ENSEMBL:{value}")
    }
}

impl Transform for EnsemblMouse {
    fn name(&self) -> &'static str {
        "ensemblMouse"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        promote_protein_coding(&mut feature);
        map_id(&mut feature, |id| strip_type_prefix(id).to_string());
        map_parents(&mut feature, |p| strip_type_prefix(p).to_string());

        if let Some(projected) = feature.attributes.get_str("projection_parent_gene") {
            let eid = projected.split('.').next().unwrap_or(projected).to_string();
            let entry = self.xrefs.as_ref().and_then(|t| t.get(&eid)).cloned();
            let (curie, symbol) = match entry {
                Some(entry) => (entry.curie, entry.symbol),
                None => (eid.clone(), eid),
            };
            feature.attributes.insert("curie", curie);
            feature.attributes.insert("Name", symbol);
        }

        for name in ["transcript_id", "protein_id"] {
            if let Some(value) = feature.attributes.get_str(name) {
                let value = ensembl_curie(value);
                feature.attributes.insert(name, value);
            }
        }
        Ok(Some(feature))
    }
}

// taxon id, source attribute, pattern, curie prefix
const TAXON_PATTERNS: [(&str, &str, &str, &str); 6] = [
    ("7955", "description", r"Source:ZFIN.*Acc:([A-Z0-9-]+)", "ZFIN:"),
    ("9606", "description", r"Acc:HGNC:(\d+)", "HGNC:"),
    ("10116", "description", r"Source:RGD.*Acc:(\d+)", "RGD:"),
    ("559292", "description", r"Source:SGD.*Acc:(S\d+)", "SGD:"),
    ("7227", "gene_id", r"(.+)", "FB:"),
    ("6239", "gene_id", r"(.+)", "WB:"),
];

static TAXON_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TAXON_PATTERNS
        .iter()
        .map(|(_, _, re, _)| Regex::new(re).expect("valid taxon pattern"))
        .collect()
});

/// Ensembl GFF3 for organisms other than mouse: biotype promotion plus a
/// `curie` mined from a taxon-specific attribute.
#[derive(Debug, Clone)]
pub struct EnsemblNonMouse {
    attribute: &'static str,
    pattern: &'static Regex,
    prefix: &'static str,
}

impl EnsemblNonMouse {
    /// # Errors
    ///
    /// Returns `UnknownTaxon` when the genome's taxon has no pattern.
    pub fn new(ctx: &FilterContext) -> Result<Self> {
        let taxon = ctx.taxon_id.as_deref().unwrap_or("");
        Self::for_taxon(taxon)
    }

    pub fn for_taxon(taxon: &str) -> Result<Self> {
        let idx = TAXON_PATTERNS
            .iter()
            .position(|(t, _, _, _)| *t == taxon)
            .ok_or_else(|| Gff2MgvError::UnknownTaxon {
                unit: "ensemblNonMouse",
                taxon: taxon.to_string(),
            })?;
        let (_, attribute, _, prefix) = TAXON_PATTERNS[idx];
        Ok(Self {
            attribute,
            pattern: &TAXON_REGEXES[idx],
            prefix,
        })
    }
}

impl Transform for EnsemblNonMouse {
    fn name(&self) -> &'static str {
        "ensemblNonMouse"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        promote_protein_coding(&mut feature);
        let curie = feature
            .attributes
            .get_str(self.attribute)
            .and_then(|value| self.pattern.captures(value))
            .map(|caps| format!("{}{}", self.prefix, &caps[1]));
        if let Some(curie) = curie {
            feature.attributes.insert("curie", curie);
        }
        Ok(Some(feature))
    }
}
