//! Per-provider normalization of gene models.
//!
//! A [`Chain`] runs an ordered list of named [`Transform`] units over every
//! model. For each unit the model-level hook runs first, then every feature
//! that passes the universal [`Selection`] goes through the feature-level
//! hook. Units are looked up by name once, when the chain is built.

mod alliance;
mod curie;
mod ensembl;
mod mgi;
mod phase;

pub use alliance::{AllianceGff, FlyBaseGff, RgdGff, SgdGff, WormBaseGff, XenbaseGff, ZfinGff};
pub use curie::{curie_ize, CurieIds};
pub use ensembl::{
    strip_type_prefix, EnsemblMouse, EnsemblNonMouse, PromoteBiotype, StripPrefix, XrefCache,
    XrefTable,
};
pub use mgi::MgiGff;
pub use phase::CdsPhase;

use crate::error::{Gff2MgvError, Result};
use crate::gff3::Feature;
use crate::model::Model;
use hashbrown::HashSet;
use regex::Regex;
use std::path::PathBuf;

/// A named model/feature rewrite.
///
/// Returning `Ok(None)` drops the model or feature. Returning an error aborts
/// the run: units fail loudly rather than write a wrong type or ID.
pub trait Transform {
    /// Registry name of the unit.
    fn name(&self) -> &'static str;

    fn process_model(&mut self, model: Model) -> Result<Option<Model>> {
        Ok(Some(model))
    }

    fn process_feature(&mut self, feature: Feature) -> Result<Option<Feature>> {
        Ok(Some(feature))
    }
}

/// Registered unit names, in no particular order.
pub const UNIT_NAMES: [&str; 14] = [
    "stripPrefix",
    "promoteBiotype",
    "curieIds",
    "cdsPhase",
    "ensemblMouse",
    "ensemblNonMouse",
    "allianceGff",
    "mgiGff",
    "rgdGff",
    "sgdGff",
    "zfinGff",
    "flybaseGff",
    "wormbaseGff",
    "xenbaseGff",
];

pub fn is_registered(name: &str) -> bool {
    UNIT_NAMES.contains(&name)
}

/// Genome-level values some units need when they are built.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    pub genome_name: String,
    pub taxon_id: Option<String>,
    pub build: Option<String>,
    pub xref_file: Option<PathBuf>,
}

/// Builds one unit from its registry name.
///
/// # Errors
///
/// Returns `UnknownFilter` for names outside [`UNIT_NAMES`], and whatever
/// the unit's own constructor reports (unknown taxon, unreadable snapshot).
pub fn build_unit(
    name: &str,
    ctx: &FilterContext,
    cache: &mut XrefCache,
) -> Result<Box<dyn Transform>> {
    let unit: Box<dyn Transform> = match name {
        "stripPrefix" => Box::new(StripPrefix),
        "promoteBiotype" => Box::new(PromoteBiotype),
        "curieIds" => Box::new(CurieIds),
        "cdsPhase" => Box::new(CdsPhase),
        "ensemblMouse" => Box::new(EnsemblMouse::new(ctx, cache)?),
        "ensemblNonMouse" => Box::new(EnsemblNonMouse::new(ctx)?),
        "allianceGff" => Box::new(AllianceGff),
        "mgiGff" => Box::new(MgiGff::new(ctx)),
        "rgdGff" => Box::new(RgdGff),
        "sgdGff" => Box::new(SgdGff::default()),
        "zfinGff" => Box::new(ZfinGff),
        "flybaseGff" => Box::new(FlyBaseGff),
        "wormbaseGff" => Box::new(WormBaseGff),
        "xenbaseGff" => Box::new(XenbaseGff::new(ctx)),
        other => return Err(Gff2MgvError::UnknownFilter(other.to_string())),
    };
    Ok(unit)
}

/// Chromosome and feature-type checks applied before every unit's feature hook.
#[derive(Debug, Clone)]
pub struct Selection {
    chromosomes: Regex,
    include: Option<HashSet<String>>,
    exclude: HashSet<String>,
}

impl Selection {
    /// `chr_re` is matched against the whole seqid.
    ///
    /// # Errors
    ///
    /// Returns an error if `chr_re` does not compile.
    pub fn new(chr_re: &str, include: Option<&[String]>, exclude: &[String]) -> Result<Self> {
        Ok(Self {
            chromosomes: Regex::new(&format!("^(?:{chr_re})$"))?,
            include: include.map(|types| types.iter().cloned().collect()),
            exclude: exclude.iter().cloned().collect(),
        })
    }

    pub fn accepts_seqid(&self, seqid: &str) -> bool {
        self.chromosomes.is_match(seqid)
    }

    pub fn accepts(&self, feature: &Feature) -> bool {
        if !self.accepts_seqid(&feature.seqid) {
            return false;
        }
        if self.exclude.contains(feature.kind.as_str()) {
            return false;
        }
        match &self.include {
            Some(include) => include.contains(feature.kind.as_str()),
            None => true,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            chromosomes: Regex::new("^(?:.*)$").expect("valid default regex"),
            include: None,
            exclude: HashSet::new(),
        }
    }
}

/// Ordered transform units plus the universal selection.
pub struct Chain {
    selection: Selection,
    units: Vec<Box<dyn Transform>>,
}

impl Chain {
    pub fn new(selection: Selection, units: Vec<Box<dyn Transform>>) -> Self {
        Self { selection, units }
    }

    /// Resolves every name through the registry before any data flows.
    ///
    /// # Errors
    ///
    /// Returns the first unit construction error.
    pub fn build(
        names: &[String],
        selection: Selection,
        ctx: &FilterContext,
        cache: &mut XrefCache,
    ) -> Result<Self> {
        let units = names
            .iter()
            .map(|name| build_unit(name, ctx, cache))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(selection, units))
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.units.iter().map(|u| u.name()).collect()
    }

    /// Runs the chain over one model.
    ///
    /// Returns `Ok(None)` when a unit drops the model, when every feature was
    /// filtered out, or when the top-level feature did not survive.
    ///
    /// # Errors
    ///
    /// Propagates unit errors.
    pub fn apply(&mut self, model: Model) -> Result<Option<Model>> {
        let mut model = model;

        if self.units.is_empty() {
            model.features.retain(|f| self.selection.accepts(f));
        }

        for unit in &mut self.units {
            model = match unit.process_model(model)? {
                Some(model) => model,
                None => {
                    log::debug!("{}: model dropped", unit.name());
                    return Ok(None);
                }
            };

            let mut kept = Vec::with_capacity(model.len());
            for feature in model.features {
                if !self.selection.accepts(&feature) {
                    continue;
                }
                if let Some(feature) = unit.process_feature(feature)? {
                    kept.push(feature);
                }
            }
            model = Model::new(kept);
        }

        if model.is_empty() {
            return Ok(None);
        }

        let label = model
            .top()
            .map(|f| f.id().unwrap_or(&f.kind).to_string())
            .unwrap_or_default();
        let pruned = model.prune_dangling();
        if pruned.is_none() {
            log::warn!("model {label} dropped: top-level feature filtered out");
        }
        Ok(pruned)
    }
}

/// Replaces `ID` with `f(ID)` when the feature has one.
pub(crate) fn map_id(feature: &mut Feature, f: impl Fn(&str) -> String) {
    if let Some(id) = feature.id() {
        let id = f(id);
        feature.attributes.insert("ID", id);
    }
}

/// Replaces every `Parent` value with `f(value)`.
pub(crate) fn map_parents(feature: &mut Feature, f: impl Fn(&str) -> String) {
    if feature.attributes.contains("Parent") {
        let parents = feature
            .parents()
            .iter()
            .map(|p| f(p.as_str()))
            .collect::<Vec<_>>();
        feature.attributes.insert("Parent", parents);
    }
}

/// Moves attribute `from` to `to` (appended or replaced in place).
pub(crate) fn rename_attribute(feature: &mut Feature, from: &str, to: &str) {
    if let Some(value) = feature.attributes.remove(from) {
        feature.attributes.insert(to, value);
    }
}
