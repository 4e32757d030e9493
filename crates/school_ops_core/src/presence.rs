//! crates/school_ops_core/src/presence.rs
//!
//! Partitions a roster into present and absent members from a day's event log,
//! and exports the result as CSV.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::classifier::RosterFilter;
use crate::domain::{AttendanceEvent, RosterMember};

/// Derived, never-persisted view of who is in for one day and one filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    pub total: usize,
    /// Roster order is preserved.
    pub present: Vec<RosterMember>,
    pub absent: Vec<RosterMember>,
    /// Integer percentage, 0 when `total` is 0.
    pub rate: u8,
}

impl PresenceSnapshot {
    pub fn present_count(&self) -> usize {
        self.present.len()
    }

    pub fn absent_count(&self) -> usize {
        self.absent.len()
    }
}

/// Computes presence over the members of `class_filter` (everyone when `None`).
pub fn compute_presence(
    roster: &[RosterMember],
    events: &[AttendanceEvent],
    class_filter: Option<&str>,
) -> PresenceSnapshot {
    compute_presence_filtered(roster, events, &RosterFilter::from_class(class_filter))
}

/// Same as [`compute_presence`] for any [`RosterFilter`].
///
/// Counts are taken over the roster: an event whose subject is not in the filtered
/// roster is ignored.
pub fn compute_presence_filtered(
    roster: &[RosterMember],
    events: &[AttendanceEvent],
    filter: &RosterFilter,
) -> PresenceSnapshot {
    let entered: HashSet<&str> = events
        .iter()
        .filter(|e| e.counts_as_entry())
        .map(|e| e.subject_id.as_str())
        .collect();

    let (present, absent): (Vec<RosterMember>, Vec<RosterMember>) = filter
        .apply(roster)
        .into_iter()
        .cloned()
        .partition(|m| entered.contains(m.id.as_str()));

    let total = present.len() + absent.len();
    PresenceSnapshot {
        total,
        rate: presence_rate(present.len(), total),
        present,
        absent,
    }
}

/// `round(present / total * 100)`, guarded against an empty roster.
pub fn presence_rate(present: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (present as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

//=========================================================================================
// CSV Export
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

const CSV_HEADER: [&str; 4] = ["Name", "Class", "Status", "Date"];

/// Renders `Name,Class,Status,Date` rows, present members first. The header is
/// always written, even for an empty snapshot.
pub fn export_csv(snapshot: &PresenceSnapshot, day: &str) -> Result<String, ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    let present = snapshot.present.iter().map(|m| (m, "Present"));
    let absent = snapshot.absent.iter().map(|m| (m, "Absent"));
    for (member, status) in present.chain(absent) {
        wtr.write_record([member.name.as_str(), member.class_code.as_str(), status, day])?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Buffer(e.to_string()))
}
