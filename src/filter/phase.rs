use super::Transform;
use crate::error::Result;
use crate::model::Model;
use hashbrown::HashMap;

/// Recomputes CDS phases per transcript.
///
/// Segments are walked in transcript order (descending coordinates on the
/// minus strand). The first segment keeps its phase; every later segment
/// gets `(3 - covered % 3) % 3`, where `covered` counts the coding bases
/// before it, including the partial codon the first phase skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct CdsPhase;

impl Transform for CdsPhase {
    fn name(&self) -> &'static str {
        "cdsPhase"
    }

    fn process_model(&mut self, mut model: Model) -> Result<Option<Model>> {
        let mut by_transcript: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, feature) in model.features.iter().enumerate() {
            if feature.kind != "CDS" {
                continue;
            }
            for parent in feature.parents() {
                by_transcript.entry(parent.clone()).or_default().push(idx);
            }
        }

        for segments in by_transcript.values_mut() {
            segments.sort_by_key(|&idx| model.features[idx].start);
            if model.features[segments[0]].strand.is_reverse() {
                segments.reverse();
            }

            let first = model.features[segments[0]].phase.unwrap_or(0);
            let mut covered = u64::from((3 - first) % 3);
            for &idx in segments.iter() {
                let segment = &mut model.features[idx];
                segment.phase = Some(((3 - covered % 3) % 3) as u8);
                covered += segment.len();
            }
        }

        Ok(Some(model))
    }
}
