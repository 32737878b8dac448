use super::Transform;
use crate::error::Result;
use crate::gff3::Feature;
use regex::Regex;
use std::sync::LazyLock;

// Matched at the start of a bare accession.
static CURIE_PATTERNS: LazyLock<[(Regex, &'static str); 3]> = LazyLock::new(|| {
    [
        (Regex::new(r"^ENS[A-Z]+[GTP]+\d+").expect("valid regex"), "ENSEMBL"),
        (Regex::new(r"^MGP_[A-Z0-9]+_[GTP]\d+").expect("valid regex"), "ENSEMBL"),
        (Regex::new(r"^[NX][RMP]_\d+").expect("valid regex"), "RefSeq"),
    ]
});

/// Prefixes a bare accession with the database it lexically belongs to.
///
/// Values that already contain `:` are returned unchanged. Returns `None`
/// when no known pattern matches.
///
/// # Example
///
/// ```rust, ignore
/// use gff2mgv::filter::curie_ize;
///
/// assert_eq!(curie_ize("ENSMUST00000134716").as_deref(), Some("ENSEMBL:ENSMUST00000134716"));
/// assert_eq!(curie_ize("NM_001011874").as_deref(), Some("RefSeq:NM_001011874"));
/// assert_eq!(curie_ize("MGI:97490").as_deref(), Some("MGI:97490"));
/// assert_eq!(curie_ize("Xkr4-201"), None);
/// ```
pub fn curie_ize(ident: &str) -> Option<String> {
    if ident.contains(':') {
        return Some(ident.to_string());
    }
    CURIE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(ident))
        .map(|(_, prefix)| format!("{prefix}:{ident}"))
}

/// Curie-ized `value`, or `value` itself when no pattern matches.
pub(crate) fn curie_or_keep(value: &str) -> String {
    curie_ize(value).unwrap_or_else(|| value.to_string())
}

/// Sets `transcript_id` on transcripts and `protein_id` on CDS segments as
/// curies, defaulting to the feature's own `ID`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurieIds;

impl Transform for CurieIds {
    fn name(&self) -> &'static str {
        "curieIds"
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        if feature.is_top_level() || feature.kind == "exon" {
            return Ok(Some(feature));
        }
        let target = if feature.kind == "CDS" {
            "protein_id"
        } else {
            "transcript_id"
        };
        let value = feature
            .attributes
            .get_str(target)
            .or_else(|| feature.id())
            .map(curie_or_keep);
        if let Some(value) = value {
            feature.attributes.insert(target, value);
        }
        Ok(Some(feature))
    }
}
