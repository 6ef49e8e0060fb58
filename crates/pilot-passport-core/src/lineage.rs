//! Lineage reconstruction over the `career.extends` forest.
//!
//! A new career row is written whenever a pilot is promoted, transferred or
//! re-enlisted, each pointing at its predecessor. The graph is loaded once per
//! request and traversed in memory: an upward walk to the root followed by a
//! breadth-first downward closure over a child index.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::records::{CareerId, CareerRecord, PilotId, ROOT_SENTINEL};

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum LineageError {
    #[error("career {0} does not exist")]
    UnknownCareer(CareerId),
    #[error("career chain loops back to career {0}")]
    Cycle(CareerId),
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Lineage {
    pub members: BTreeSet<CareerId>,
    pub tip: CareerId,
    /// Set when the tip had to be chosen among zero or several terminal careers.
    pub ambiguous_tip: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CareerGraph {
    nodes: BTreeMap<CareerId, CareerRecord>,
    children: BTreeMap<CareerId, Vec<CareerId>>,
    extended: BTreeSet<CareerId>,
}

impl CareerGraph {
    #[must_use]
    pub fn new(records: impl IntoIterator<Item = CareerRecord>) -> Self {
        let mut graph = Self::default();
        for record in records {
            if record.extends != ROOT_SENTINEL {
                graph.children.entry(record.extends).or_default().push(record.id);
                graph.extended.insert(record.extends);
            }
            graph.nodes.insert(record.id, record);
        }
        for children in graph.children.values_mut() {
            children.sort_unstable();
            children.dedup();
        }
        graph
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Root careers in ascending id order.
    pub fn roots(&self) -> impl Iterator<Item = &CareerRecord> {
        self.nodes.values().filter(|record| record.is_root())
    }

    /// Resolve the full lineage containing `seed` and pick its tip.
    ///
    /// # Errors
    /// Returns [`LineageError::UnknownCareer`] when `seed` is not in the graph and
    /// [`LineageError::Cycle`] when the predecessor chain revisits a career.
    pub fn resolve(&self, seed: CareerId) -> Result<Lineage, LineageError> {
        let ancestors = self.ancestors(seed)?;
        let members = self.close_downward(&ancestors);
        let (tip, ambiguous_tip) = self.select_tip(&members);
        Ok(Lineage { members, tip, ambiguous_tip })
    }

    fn ancestors(&self, seed: CareerId) -> Result<BTreeSet<CareerId>, LineageError> {
        if !self.nodes.contains_key(&seed) {
            return Err(LineageError::UnknownCareer(seed));
        }

        let mut visited = BTreeSet::new();
        let mut current = seed;
        loop {
            if !visited.insert(current) {
                return Err(LineageError::Cycle(current));
            }
            let Some(record) = self.nodes.get(&current) else {
                break;
            };
            // A predecessor missing from the table ends the walk like a root.
            if record.is_root() || !self.nodes.contains_key(&record.extends) {
                break;
            }
            current = record.extends;
        }
        Ok(visited)
    }

    /// Add every career that extends a member, transitively, until nothing changes.
    #[must_use]
    pub fn close_downward(&self, members: &BTreeSet<CareerId>) -> BTreeSet<CareerId> {
        let mut closed = members.clone();
        let mut queue = members.iter().copied().collect::<VecDeque<_>>();
        while let Some(id) = queue.pop_front() {
            let Some(children) = self.children.get(&id) else {
                continue;
            };
            for child in children {
                if closed.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }
        closed
    }

    /// Choose the member that no other career extends. Ties and the degenerate
    /// no-candidate case fall back to the highest career id.
    fn select_tip(&self, members: &BTreeSet<CareerId>) -> (CareerId, bool) {
        let terminal = members
            .iter()
            .copied()
            .filter(|id| !self.extended.contains(id))
            .collect::<Vec<_>>();
        match terminal.as_slice() {
            [only] => (*only, false),
            [.., last] => (*last, true),
            [] => (members.last().copied().unwrap_or(ROOT_SENTINEL), true),
        }
    }

    /// Pilot ids owning the member careers, ascending and without duplicates.
    #[must_use]
    pub fn pilot_ids(&self, lineage: &Lineage) -> Vec<PilotId> {
        lineage
            .members
            .iter()
            .filter_map(|id| self.nodes.get(id).and_then(|record| record.player_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn tip_pilot_id(&self, lineage: &Lineage) -> Option<PilotId> {
        self.nodes.get(&lineage.tip).and_then(|record| record.player_id)
    }
}
