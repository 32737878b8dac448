//! Units for the Alliance of Genome Resources GFF3 submissions.
//!
//! Every provider unit applies the shared Alliance normalization first and
//! then its own fix-ups.

use super::curie::curie_or_keep;
use super::{rename_attribute, FilterContext, Transform};
use crate::error::Result;
use crate::gff3::{Attributes, Feature};
use crate::model::Model;

fn so_term_to_type(soid: &str) -> Option<&'static str> {
    match soid {
        "SO:0001217" => Some("protein_coding_gene"),
        "SO:0000336" => Some("pseudogene"),
        "SO:0001263" => Some("ncRNA_gene"),
        _ => None,
    }
}

/// Drops `description` and sets the type from `so_term_name`, or else from
/// the first `SO:` term of `Ontology_term`.
fn normalize(feature: &mut Feature) {
    feature.attributes.remove("description");

    if let Some(so_term) = feature.attributes.remove("so_term_name") {
        if let Some(kind) = so_term.as_str() {
            feature.kind = kind.to_string();
        }
        return;
    }

    let soid = feature
        .attributes
        .get_list("Ontology_term")
        .iter()
        .find(|term| term.starts_with("SO:"))
        .and_then(|term| so_term_to_type(term));
    if let Some(kind) = soid {
        feature.kind = kind.to_string();
    }
}

fn strip_chr_prefix(seqid: &str) -> &str {
    seqid.strip_prefix("chr").unwrap_or(seqid)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AllianceGff;

impl Transform for AllianceGff {
    fn name(&self) -> &'static str {
        "allianceGff"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        Ok(Some(feature))
    }
}

/// RGD carries models from several providers; only models with an NCBI
/// feature are kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct RgdGff;

impl Transform for RgdGff {
    fn name(&self) -> &'static str {
        "rgdGff"
    }

    fn process_model(&mut self, model: Model) -> Result<Option<Model>> {
        if model.iter().any(|f| f.source == "NCBI") {
            Ok(Some(model))
        } else {
            Ok(None)
        }
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        Ok(Some(feature))
    }
}

/// SGD models are intron-less: transcripts carry no exons and CDS segments
/// have no IDs, and children may precede their parents.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgdGff {
    has_cds: bool,
}

fn sgd_level(feature: &Feature) -> u8 {
    if feature.is_top_level() {
        0
    } else if matches!(feature.kind.as_str(), "transcript" | "mRNA") {
        1
    } else {
        2
    }
}

impl Transform for SgdGff {
    fn name(&self) -> &'static str {
        "sgdGff"
    }

    fn process_model(&mut self, mut model: Model) -> Result<Option<Model>> {
        model
            .features
            .sort_by_key(|f| (sgd_level(f), f.end));

        let mut exons = Vec::new();
        self.has_cds = false;
        for feature in model.features.iter_mut() {
            if matches!(feature.kind.as_str(), "transcript" | "mRNA") {
                if let Some(id) = feature.id() {
                    let mut attributes = Attributes::new();
                    attributes.insert("Parent", vec![id.to_string()]);
                    exons.push(Feature {
                        kind: "exon".to_string(),
                        phase: None,
                        attributes,
                        ..feature.clone()
                    });
                }
            } else if feature.kind == "CDS" {
                self.has_cds = true;
                if let Some(pid) = feature.parents().first().cloned() {
                    let mut cid = pid.replace("mRNA", "CDS");
                    if cid == pid {
                        cid = format!("{pid}_CDS");
                    }
                    feature.attributes.insert("ID", cid);
                }
            }
        }
        model.features.extend(exons);
        Ok(Some(model))
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);

        if feature.seqid.starts_with("chr") {
            let seqid = match strip_chr_prefix(&feature.seqid) {
                "mt" => "Mito".to_string(),
                other => other.to_string(),
            };
            feature.seqid = seqid;
        }

        if feature.kind == "gene" {
            if self.has_cds {
                feature.kind = "protein_coding_gene".to_string();
            }
            if feature.attributes.contains("gene") {
                rename_attribute(&mut feature, "gene", "Name");
                rename_attribute(&mut feature, "display", "long_name");
            }
        }
        Ok(Some(feature))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZfinGff;

impl Transform for ZfinGff {
    fn name(&self) -> &'static str {
        "zfinGff"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        if !feature.is_top_level() {
            rename_attribute(&mut feature, "curie", "transcript_id");
        }
        rename_attribute(&mut feature, "full_name", "long_name");

        if feature.kind == "CDS" {
            let protein = feature
                .id()
                .and_then(|id| id.strip_prefix("CDS:"))
                .map(curie_or_keep);
            if let Some(protein) = protein {
                feature.attributes.insert("protein_id", protein);
            }
        }
        Ok(Some(feature))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FlyBaseGff;

impl Transform for FlyBaseGff {
    fn name(&self) -> &'static str {
        "flybaseGff"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        if feature.kind == "CDS" {
            let id = feature
                .id()
                .and_then(|id| id.strip_prefix("CDS:"))
                .map(str::to_string);
            if let Some(id) = id {
                feature.attributes.insert("ID", id);
            }
        }
        Ok(Some(feature))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WormBaseGff;

impl Transform for WormBaseGff {
    fn name(&self) -> &'static str {
        "wormbaseGff"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        let transcript = feature
            .id()
            .and_then(|id| id.strip_prefix("Transcript:"))
            .map(|id| format!("WB:{id}"));
        if let Some(transcript) = transcript {
            feature.attributes.insert("transcript_id", transcript);
        }
        Ok(Some(feature))
    }
}

/// Xenbase. For *X. laevis* genomes named `<name>.L` or `<name>.S` only the
/// matching subgenome's chromosomes are kept.
#[derive(Debug, Clone, Default)]
pub struct XenbaseGff {
    subgenome: Option<char>,
}

impl XenbaseGff {
    pub fn new(ctx: &FilterContext) -> Self {
        Self {
            subgenome: laevis_subgenome(&ctx.genome_name),
        }
    }
}

fn laevis_subgenome(genome_name: &str) -> Option<char> {
    if !genome_name.contains("laevis") {
        return None;
    }
    let mut tail = genome_name.chars().rev();
    let last = tail.next()?;
    (tail.next()? == '.').then_some(last)
}

impl Transform for XenbaseGff {
    fn name(&self) -> &'static str {
        "xenbaseGff"
    }

    fn process_model(&mut self, model: Model) -> Result<Option<Model>> {
        let Some(top) = model.top() else {
            return Ok(None);
        };
        let from_xenbase = top
            .attributes
            .get_str("curie")
            .is_some_and(|curie| curie.starts_with("Xenbase"));
        if !from_xenbase {
            return Ok(None);
        }
        if let Some(subgenome) = self.subgenome {
            if !top.seqid.ends_with(subgenome) {
                return Ok(None);
            }
        }
        Ok(Some(model))
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        normalize(&mut feature);
        let lower = feature.seqid.to_ascii_lowercase();
        if lower.starts_with("chr0") {
            feature.seqid = feature.seqid[4..].to_string();
        } else if lower.starts_with("chr") {
            feature.seqid = feature.seqid[3..].to_string();
        }
        Ok(Some(feature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gff3::parse_line;

    fn feature(unit: &mut dyn Transform, line: &str) -> Feature {
        unit.process_feature(parse_line(line).unwrap())
            .unwrap()
            .unwrap()
    }

    fn model(lines: &[&str]) -> Model {
        Model::new(lines.iter().map(|l| parse_line(l).unwrap()).collect())
    }

    #[test]
    fn test_alliance_type_from_so_term_name() {
        let f = feature(
            &mut AllianceGff,
            "1\tRGD\tgene\t1\t10\t.\t+\t.\tID=RGD:1;so_term_name=lncRNA_gene;description=long",
        );
        assert_eq!(f.kind, "lncRNA_gene");
        assert!(!f.attributes.contains("description"));
        assert!(!f.attributes.contains("so_term_name"));
    }

    #[test]
    fn test_alliance_type_from_ontology_term() {
        let f = feature(
            &mut AllianceGff,
            "1\tZFIN\tgene\t1\t10\t.\t+\t.\tID=ZFIN:1;Ontology_term=GO:0005634,SO:0000336",
        );
        assert_eq!(f.kind, "pseudogene");

        let f = feature(
            &mut AllianceGff,
            "1\tZFIN\tgene\t1\t10\t.\t+\t.\tID=ZFIN:2;Ontology_term=SO:0000704",
        );
        assert_eq!(f.kind, "gene");
    }

    #[test]
    fn test_rgd_keeps_ncbi_models_only() {
        let ncbi = model(&[
            "1\tNCBI\tgene\t1\t10\t.\t+\t.\tID=RGD:1",
            "1\tNCBI\tmRNA\t1\t10\t.\t+\t.\tID=t1;Parent=RGD:1",
        ]);
        assert!(RgdGff.process_model(ncbi).unwrap().is_some());

        let ensembl = model(&["1\tEnsembl\tgene\t1\t10\t.\t+\t.\tID=RGD:2"]);
        assert!(RgdGff.process_model(ensembl).unwrap().is_none());
    }

    #[test]
    fn test_sgd_resort_exons_and_cds_ids() {
        let mut unit = SgdGff::default();
        let m = model(&[
            "chrI\tSGD\tCDS\t335\t649\t.\t+\t0\tParent=YAL069W_mRNA",
            "chrI\tSGD\tgene\t335\t649\t.\t+\t.\tID=YAL069W;gene=YAL069W;display=Dubious ORF",
            "chrI\tSGD\tmRNA\t335\t649\t.\t+\t.\tID=YAL069W_mRNA;Parent=YAL069W",
        ]);
        let m = unit.process_model(m).unwrap().unwrap();
        let kinds = m.iter().map(|f| f.kind.as_str()).collect::<Vec<_>>();
        assert_eq!(kinds, vec!["gene", "mRNA", "CDS", "exon"]);
        assert_eq!(m.features[2].id(), Some("YAL069W_CDS"));
        assert_eq!(m.features[3].parents(), &["YAL069W_mRNA"]);
        assert_eq!((m.features[3].start, m.features[3].end), (335, 649));

        let gene = unit.process_feature(m.features[0].clone()).unwrap().unwrap();
        assert_eq!(gene.seqid, "I");
        assert_eq!(gene.kind, "protein_coding_gene");
        assert_eq!(gene.attributes.get_str("Name"), Some("YAL069W"));
        assert_eq!(gene.attributes.get_str("long_name"), Some("Dubious ORF"));
    }

    #[test]
    fn test_sgd_cds_id_without_mrna_suffix() {
        let mut unit = SgdGff::default();
        let m = model(&[
            "chrmt\tSGD\tgene\t1\t10\t.\t+\t.\tID=Q0050",
            "chrmt\tSGD\ttranscript\t1\t10\t.\t+\t.\tID=Q0050_tx;Parent=Q0050",
            "chrmt\tSGD\tCDS\t1\t10\t.\t+\t0\tParent=Q0050_tx",
        ]);
        let m = unit.process_model(m).unwrap().unwrap();
        assert_eq!(m.features[2].id(), Some("Q0050_tx_CDS"));
        let f = unit.process_feature(m.features[0].clone()).unwrap().unwrap();
        assert_eq!(f.seqid, "Mito");
    }

    #[test]
    fn test_zfin_transcript_and_protein_ids() {
        let mut unit = ZfinGff;
        let f = feature(
            &mut unit,
            "1\tZFIN\tmRNA\t1\t10\t.\t+\t.\tID=t1;Parent=ZDB-GENE-1;curie=ENSEMBL:ENSDART00000001;full_name=some gene",
        );
        assert_eq!(
            f.attributes.get_str("transcript_id"),
            Some("ENSEMBL:ENSDART00000001")
        );
        assert!(!f.attributes.contains("curie"));
        assert_eq!(f.attributes.get_str("long_name"), Some("some gene"));

        let f = feature(
            &mut unit,
            "1\tZFIN\tCDS\t1\t10\t.\t+\t0\tID=CDS:ENSDARP00000001;Parent=t1",
        );
        assert_eq!(
            f.attributes.get_str("protein_id"),
            Some("ENSEMBL:ENSDARP00000001")
        );
    }

    #[test]
    fn test_flybase_and_wormbase_ids() {
        let f = feature(
            &mut FlyBaseGff,
            "2L\tFlyBase\tCDS\t1\t10\t.\t+\t0\tID=CDS:FBpp0078316;Parent=FBtr0078962",
        );
        assert_eq!(f.id(), Some("FBpp0078316"));

        let f = feature(
            &mut WormBaseGff,
            "I\tWormBase\tmRNA\t1\t10\t.\t+\t.\tID=Transcript:Y74C9A.3.1;Parent=Gene:WBGene00022277",
        );
        assert_eq!(f.attributes.get_str("transcript_id"), Some("WB:Y74C9A.3.1"));
    }

    #[test]
    fn test_xenbase_filters_and_chromosomes() {
        let ctx = FilterContext {
            genome_name: "X.laevis.L".to_string(),
            ..Default::default()
        };
        let mut unit = XenbaseGff::new(&ctx);

        let keep = model(&["chr1L\tXenbase\tgene\t1\t10\t.\t+\t.\tID=g1;curie=Xenbase:XB-GENE-1"]);
        assert!(unit.process_model(keep).unwrap().is_some());

        let other_half = model(&["chr1S\tXenbase\tgene\t1\t10\t.\t+\t.\tID=g2;curie=Xenbase:XB-GENE-2"]);
        assert!(unit.process_model(other_half).unwrap().is_none());

        let foreign = model(&["chr1L\tXenbase\tgene\t1\t10\t.\t+\t.\tID=g3;curie=NCBI:1"]);
        assert!(unit.process_model(foreign).unwrap().is_none());

        let f = feature(&mut unit, "Chr01L\tXenbase\tgene\t1\t10\t.\t+\t.\tID=g1");
        assert_eq!(f.seqid, "1L");
    }

    #[test]
    fn test_laevis_subgenome() {
        assert_eq!(laevis_subgenome("X.laevis.S"), Some('S'));
        assert_eq!(laevis_subgenome("X.laevis"), None);
        assert_eq!(laevis_subgenome("X.tropicalis.L"), None);
    }
}
