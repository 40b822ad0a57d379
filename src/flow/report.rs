use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::movement::{Classification, MovementId, MovementSet, UnmatchedReason};
use crate::tracker::ClassId;

/// Counts for one camera over one window (or the whole session).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlowReport {
    /// Trajectories per movement
    pub movements: BTreeMap<MovementId, u64>,
    /// Per-movement breakdown by object class
    pub by_class: BTreeMap<MovementId, BTreeMap<ClassId, u64>>,
    /// Trajectories that matched no movement
    pub unmatched: u64,
    pub unmatched_by_reason: BTreeMap<UnmatchedReason, u64>,
}

impl FlowReport {
    pub(crate) fn add(&mut self, classification: Classification, class_id: ClassId) {
        match classification {
            Classification::Movement(id) => {
                *self.movements.entry(id).or_default() += 1;
                *self
                    .by_class
                    .entry(id)
                    .or_default()
                    .entry(class_id)
                    .or_default() += 1;
            }
            Classification::Unmatched(reason) => {
                self.unmatched += 1;
                *self.unmatched_by_reason.entry(reason).or_default() += 1;
            }
        }
    }

    pub(crate) fn merge(&mut self, other: &FlowReport) {
        for (&id, &n) in &other.movements {
            *self.movements.entry(id).or_default() += n;
        }
        for (&id, classes) in &other.by_class {
            let entry = self.by_class.entry(id).or_default();
            for (&class_id, &n) in classes {
                *entry.entry(class_id).or_default() += n;
            }
        }
        self.unmatched += other.unmatched;
        for (&reason, &n) in &other.unmatched_by_reason {
            *self.unmatched_by_reason.entry(reason).or_default() += n;
        }
    }

    pub fn count(&self, movement: MovementId) -> u64 {
        self.movements.get(&movement).copied().unwrap_or(0)
    }

    pub fn class_count(&self, movement: MovementId, class_id: ClassId) -> u64 {
        self.by_class
            .get(&movement)
            .and_then(|classes| classes.get(&class_id))
            .copied()
            .unwrap_or(0)
    }

    /// Matched plus unmatched trajectories.
    pub fn total(&self) -> u64 {
        self.movements.values().sum::<u64>() + self.unmatched
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Render as a plain-text table, listing every movement of `movements`
    /// (zero counts included) followed by the unmatched bucket.
    pub fn table<'a>(&'a self, movements: &'a MovementSet) -> FlowTable<'a> {
        FlowTable {
            report: self,
            movements,
        }
    }
}

pub struct FlowTable<'a> {
    report: &'a FlowReport,
    movements: &'a MovementSet,
}

impl fmt::Display for FlowTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .movements
            .iter()
            .map(|m| m.label.len())
            .max()
            .unwrap_or(0)
            .max("unmatched".len());

        writeln!(f, "{:>4}  {:<width$}  {:>8}", "id", "movement", "count")?;
        for movement in self.movements.iter() {
            writeln!(
                f,
                "{:>4}  {:<width$}  {:>8}",
                movement.id,
                movement.label,
                self.report.count(movement.id)
            )?;
        }
        writeln!(f, "{:>4}  {:<width$}  {:>8}", "-", "unmatched", self.report.unmatched)?;
        write!(f, "{:>4}  {:<width$}  {:>8}", "", "total", self.report.total())
    }
}
