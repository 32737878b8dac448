use super::curie::curie_or_keep;
use super::{rename_attribute, FilterContext, Transform};
use crate::error::{Gff2MgvError, Result};
use crate::gff3::Feature;
use crate::model::Model;

/// MGI GFF3.
///
/// With a build label, top-level IDs become `<id>_<build>` so models of two
/// assemblies can coexist in one viewer.
#[derive(Debug, Clone, Default)]
pub struct MgiGff {
    build: Option<String>,
}

impl MgiGff {
    pub fn new(ctx: &FilterContext) -> Self {
        Self {
            build: ctx.build.clone(),
        }
    }
}

impl Transform for MgiGff {
    fn name(&self) -> &'static str {
        "mgiGff"
    }

    fn process_model(&mut self, mut model: Model) -> Result<Option<Model>> {
        let Some(build) = &self.build else {
            return Ok(Some(model));
        };
        let Some(old_id) = model.top().and_then(Feature::id).map(str::to_string) else {
            return Ok(Some(model));
        };
        let new_id = format!("{old_id}_{build}");

        for feature in model.features.iter_mut() {
            if feature.is_top_level() {
                if feature.id() == Some(old_id.as_str()) {
                    feature.attributes.insert("ID", new_id.clone());
                }
            } else if feature.parents().iter().any(|p| *p == old_id) {
                let parents = feature
                    .parents()
                    .iter()
                    .map(|p| if *p == old_id { new_id.clone() } else { p.clone() })
                    .collect::<Vec<_>>();
                feature.attributes.insert("Parent", parents);
            }
        }
        Ok(Some(model))
    }

    fn process_feature(&mut self, mut feature: Feature) -> Result<Option<Feature>> {
        if matches!(feature.kind.as_str(), "gene" | "pseudogene") {
            let so_term = feature
                .attributes
                .remove("so_term_name")
                .and_then(|v| v.as_str().map(str::to_string))
                .ok_or_else(|| Gff2MgvError::MissingAttribute {
                    unit: "mgiGff",
                    attribute: "so_term_name",
                    feature: feature.id().unwrap_or(".").to_string(),
                })?;
            feature.kind = so_term;
            rename_attribute(&mut feature, "description", "long_name");
        }

        for name in ["transcript_id", "protein_id"] {
            if let Some(value) = feature.attributes.get_str(name) {
                let value = curie_or_keep(value);
                feature.attributes.insert(name, value);
            }
        }
        Ok(Some(feature))
    }
}
