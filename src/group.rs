//! Turns a flat GFF3 feature stream into a stream of gene models.
//!
//! Providers disagree on line order. Some write every model as a contiguous
//! block, some interleave the lines of a gene nested inside another gene's
//! span, and a few are out of order altogether. [`Deinterleaver`] handles the
//! first two in a single forward pass; [`ModelReader::sorted`] handles the
//! third by materializing every model and sorting on `(seqid, start)`.

use crate::error::{Gff2MgvError, Result};
use crate::gff3::{Feature, Header};
use crate::model::Model;
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::io::BufRead;

const GROUP_SEPARATOR: &str = "###";

#[derive(Debug)]
struct Group {
    serial: u64,
    features: Vec<Feature>,
}

impl Group {
    /// A group is closed once the stream moved to another sequence or past
    /// the end of its top-level feature.
    fn is_closed_by(&self, incoming: &Feature) -> bool {
        match self.features.first() {
            Some(top) => top.seqid != incoming.seqid || top.end < incoming.start,
            None => true,
        }
    }
}

/// Incremental de-interleaving grouper.
///
/// Feed features with [`push`](Self::push) and call [`finish`](Self::finish)
/// once at end of input. Within a sequence, top-level features must arrive in
/// non-decreasing start order; children may arrive before their parents.
#[derive(Debug, Default)]
pub struct Deinterleaver {
    buffer: VecDeque<Group>,
    next_serial: u64,
    index: HashMap<String, u64>,
    pending: HashMap<String, Vec<u64>>,
    waiting: HashMap<u64, Feature>,
    arrivals: u64,
}

impl Deinterleaver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the next feature; returns the models it closed, in input order.
    pub fn push(&mut self, feature: Feature) -> Vec<Model> {
        self.arrivals += 1;

        if feature.is_top_level() {
            let mut flushed = Vec::new();
            // only a contiguous prefix may be flushed: an earlier open group
            // can still receive children
            while self
                .buffer
                .front()
                .is_some_and(|group| group.is_closed_by(&feature))
            {
                if let Some(group) = self.buffer.pop_front() {
                    flushed.push(self.release(group));
                }
            }

            let serial = self.next_serial;
            self.next_serial += 1;
            self.buffer.push_back(Group {
                serial,
                features: Vec::new(),
            });
            self.attach(serial, feature);
            return flushed;
        }

        let mut serials = feature
            .parents()
            .iter()
            .filter_map(|p| self.index.get(p.as_str()).copied())
            .collect::<Vec<_>>();
        serials.sort_unstable();
        serials.dedup();

        // A child waits only while none of its parents is known. Once one
        // parent's group exists the child joins it, and parents that show up
        // later do not pick it up again.
        match serials.split_last() {
            None => {
                let arrival = self.arrivals;
                for parent in feature.parents() {
                    self.pending.entry(parent.clone()).or_default().push(arrival);
                }
                self.waiting.insert(arrival, feature);
            }
            Some((&last, rest)) => {
                for &serial in rest {
                    self.attach(serial, feature.clone());
                }
                self.attach(last, feature);
            }
        }

        Vec::new()
    }

    /// Flushes every buffered group, in buffer order.
    pub fn finish(&mut self) -> Vec<Model> {
        let groups = self.buffer.drain(..).collect::<Vec<_>>();
        self.index.clear();
        groups
            .into_iter()
            .map(|group| Model::new(group.features))
            .collect()
    }

    /// Children whose parent never showed up, in arrival order.
    pub fn take_orphans(&mut self) -> Vec<Feature> {
        let mut waiting = self.waiting.drain().collect::<Vec<_>>();
        waiting.sort_by_key(|(arrival, _)| *arrival);
        self.pending.clear();
        waiting.into_iter().map(|(_, f)| f).collect()
    }

    fn group_mut(&mut self, serial: u64) -> Option<&mut Group> {
        let front = self.buffer.front()?.serial;
        let offset = serial.checked_sub(front)?;
        self.buffer.get_mut(offset as usize)
    }

    /// Appends a feature to a group, indexes its ID and pulls in any
    /// children that were waiting for it (transitively).
    fn attach(&mut self, serial: u64, feature: Feature) {
        let mut queue = VecDeque::from([feature]);
        while let Some(feature) = queue.pop_front() {
            let id = feature.id().map(str::to_string);
            match self.group_mut(serial) {
                Some(group) => group.features.push(feature),
                None => continue,
            }

            let Some(id) = id else {
                continue;
            };
            if let Some(arrivals) = self.pending.remove(&id) {
                for arrival in arrivals {
                    if let Some(child) = self.waiting.remove(&arrival) {
                        queue.push_back(child);
                    }
                }
            }
            self.index.insert(id, serial);
        }
    }

    fn release(&mut self, group: Group) -> Model {
        for feature in &group.features {
            if let Some(id) = feature.id() {
                if self.index.get(id) == Some(&group.serial) {
                    self.index.remove(id);
                }
            }
        }
        Model::new(group.features)
    }
}

/// Anything that yields models for an import run.
pub trait ModelSource: Iterator<Item = Result<Model>> {
    /// Header parsed before the first feature.
    fn header(&self) -> &Header;

    /// Orphaned children, complete once the source is exhausted.
    fn orphans(&self) -> &[Feature];
}

/// Pull-based, single-pass model reader over a GFF3 stream.
///
/// The header is read eagerly by [`ModelReader::new`]; models are then
/// produced on demand. Reading stops at a `>` line or a `##FASTA` pragma.
pub struct ModelReader<R> {
    reader: R,
    header: Header,
    grouper: Deinterleaver,
    ready: VecDeque<Model>,
    lookahead: Option<(usize, String)>,
    orphans: Vec<Feature>,
    line_no: usize,
    done: bool,
}

impl<R: BufRead> ModelReader<R> {
    /// Reads the header block and positions the reader at the first feature.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reader fails.
    pub fn new(reader: R) -> Result<Self> {
        let mut this = Self {
            reader,
            header: Header::default(),
            grouper: Deinterleaver::new(),
            ready: VecDeque::new(),
            lookahead: None,
            orphans: Vec::new(),
            line_no: 0,
            done: false,
        };

        while let Some((line_no, line)) = this.read_line()? {
            if is_section_end(&line) {
                this.done = true;
                break;
            }
            if line.starts_with('#') {
                if line.trim() != GROUP_SEPARATOR {
                    this.header.push_line(&line);
                }
                continue;
            }
            if line.trim().is_empty() {
                continue;
            }
            this.lookahead = Some((line_no, line));
            break;
        }

        if this.lookahead.is_none() {
            this.done = true;
        }

        Ok(this)
    }

    /// Materializes every model and reorders them by `(seqid, start)` of
    /// their top-level feature. Memory grows with the whole input.
    ///
    /// # Errors
    ///
    /// Returns the first read or parse error met while draining the input.
    pub fn sorted(mut self) -> Result<SortedModels> {
        let mut models = Vec::new();
        for model in self.by_ref() {
            models.push(model?);
        }
        models.sort_by(|a, b| (a.seqid(), a.start()).cmp(&(b.seqid(), b.start())));

        Ok(SortedModels {
            header: self.header,
            models: models.into_iter(),
            orphans: self.orphans,
        })
    }

    fn read_line(&mut self) -> Result<Option<(usize, String)>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some((self.line_no, line)))
    }

    fn advance(&mut self) -> Result<()> {
        let next = match self.lookahead.take() {
            Some(entry) => Some(entry),
            None => self.read_line()?,
        };

        let Some((line_no, line)) = next else {
            self.close();
            return Ok(());
        };

        if is_section_end(&line) {
            self.close();
            return Ok(());
        }
        if line.starts_with('#') || line.trim().is_empty() {
            return Ok(());
        }

        let feature = Feature::parse(&line).map_err(|source| Gff2MgvError::MalformedRecord {
            line: line_no,
            record: line.clone(),
            source,
        })?;
        self.ready.extend(self.grouper.push(feature));
        Ok(())
    }

    fn close(&mut self) {
        self.ready.extend(self.grouper.finish());
        self.orphans = self.grouper.take_orphans();
        self.done = true;

        if !self.orphans.is_empty() {
            log::warn!("{} orphan records detected", self.orphans.len());
            for orphan in &self.orphans {
                log::warn!("orphan: {orphan}");
            }
        }
    }
}

impl<R: BufRead> Iterator for ModelReader<R> {
    type Item = Result<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(model) = self.ready.pop_front() {
                return Some(Ok(model));
            }
            if self.done {
                return None;
            }
            if let Err(err) = self.advance() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

impl<R: BufRead> ModelSource for ModelReader<R> {
    fn header(&self) -> &Header {
        &self.header
    }

    fn orphans(&self) -> &[Feature] {
        &self.orphans
    }
}

/// Fully buffered models in `(seqid, start)` order.
pub struct SortedModels {
    header: Header,
    models: std::vec::IntoIter<Model>,
    orphans: Vec<Feature>,
}

impl Iterator for SortedModels {
    type Item = Result<Model>;

    fn next(&mut self) -> Option<Self::Item> {
        self.models.next().map(Ok)
    }
}

impl ModelSource for SortedModels {
    fn header(&self) -> &Header {
        &self.header
    }

    fn orphans(&self) -> &[Feature] {
        &self.orphans
    }
}

fn is_section_end(line: &str) -> bool {
    line.starts_with('>') || line.trim() == "##FASTA"
}
