//! Gene models: a top-level feature followed by all of its descendants.

use crate::gff3::Feature;
use hashbrown::{HashMap, HashSet};

/// One gene (or pseudogene) and its transcripts, exons and CDS segments.
///
/// By convention `features[0]` is the top-level feature. Transform units may
/// reorder, drop or synthesize features; [`Model::prune_dangling`] restores the
/// convention afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Model {
    pub features: Vec<Feature>,
}

impl Model {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn top(&self) -> Option<&Feature> {
        self.features.first()
    }

    pub fn seqid(&self) -> &str {
        self.top().map_or("", |f| f.seqid.as_str())
    }

    pub fn start(&self) -> u64 {
        self.top().map_or(0, |f| f.start)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Maps each parent ID to the positions of its direct children.
    pub fn children_index(&self) -> HashMap<&str, Vec<usize>> {
        let mut index: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, feature) in self.features.iter().enumerate() {
            for parent in feature.parents() {
                index.entry(parent.as_str()).or_default().push(idx);
            }
        }
        index
    }

    /// Drops features whose parents are no longer in the model.
    ///
    /// Runs to a fixpoint so whole subtrees disappear with their root, trims
    /// `Parent` lists to the surviving parents and moves the top-level
    /// feature to the front. Returns `None` when no top-level feature is left.
    pub fn prune_dangling(mut self) -> Option<Self> {
        loop {
            let ids = self
                .features
                .iter()
                .filter_map(|f| f.id().map(str::to_string))
                .collect::<HashSet<_>>();
            let before = self.features.len();

            self.features.retain_mut(|f| {
                if f.is_top_level() {
                    return true;
                }
                let parents = f.parents();
                let kept = parents
                    .iter()
                    .filter(|p| ids.contains(p.as_str()))
                    .cloned()
                    .collect::<Vec<_>>();
                if kept.is_empty() {
                    return false;
                }
                if kept.len() != parents.len() {
                    f.attributes.insert("Parent", kept);
                }
                true
            });

            if self.features.len() == before {
                break;
            }
        }

        let top = self.features.iter().position(Feature::is_top_level)?;
        if top != 0 {
            let feature = self.features.remove(top);
            self.features.insert(0, feature);
        }
        Some(self)
    }
}

impl From<Vec<Feature>> for Model {
    fn from(features: Vec<Feature>) -> Self {
        Self::new(features)
    }
}

impl IntoIterator for Model {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}
