//! Row selection and the delete request built from it.
//!
//! Selection is tracked by measurement timestamp, never by render index, so it survives
//! re-rendering and downsampling. Toggling an aggregated row toggles every member of its
//! group together: if any member is selected the whole group is deselected, otherwise the
//! whole group is selected. Deleting an aggregated row therefore deletes all of the
//! measurements averaged into it. The synthetic group timestamp is never sent to the store.

use crate::data::downsample::RenderPoint;
use crate::measurement::MeasurementSequence;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Timestamps of the measurements currently marked by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    timestamps: BTreeSet<i64>,
}

impl SelectionSet {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selected measurements.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Whether `timestamp` is selected.
    pub fn contains(&self, timestamp: i64) -> bool {
        self.timestamps.contains(&timestamp)
    }

    /// Selected timestamps in ascending order.
    pub fn timestamps(&self) -> &BTreeSet<i64> {
        &self.timestamps
    }

    /// Flip a single measurement. Returns whether it is now selected.
    pub fn toggle(&mut self, timestamp: i64) -> bool {
        if self.timestamps.remove(&timestamp) {
            false
        } else {
            self.timestamps.insert(timestamp);
            true
        }
    }

    /// Flip a rendered row. Aggregated rows flip all their members together.
    ///
    /// Returns whether the row is now selected.
    pub fn toggle_point(&mut self, point: &RenderPoint) -> bool {
        let members = point.source.member_timestamps();
        if members.iter().any(|ts| self.timestamps.contains(ts)) {
            for ts in &members {
                self.timestamps.remove(ts);
            }
            false
        } else {
            self.timestamps.extend(members);
            true
        }
    }

    /// Selection restricted to timestamps still present in `visible`.
    pub fn restricted_to(&self, visible: &MeasurementSequence) -> Self {
        visible
            .timestamps()
            .filter(|ts| self.timestamps.contains(ts))
            .collect()
    }

    /// Selection without `removed`.
    pub fn without(&self, removed: &BTreeSet<i64>) -> Self {
        Self {
            timestamps: self.timestamps.difference(removed).copied().collect(),
        }
    }

    /// Build the delete request for the current selection, `None` if nothing is selected.
    pub fn delete_request(&self) -> Option<DeleteRequest> {
        if self.is_empty() {
            return None;
        }
        Some(DeleteRequest::new(self.timestamps.iter().copied()))
    }
}

impl FromIterator<i64> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        Self {
            timestamps: iter.into_iter().collect(),
        }
    }
}

/// Body of the batch delete call: `{"action": "delete", "timestamps": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    /// Always [`DeleteRequest::ACTION`]
    pub action: String,
    /// Measurements to delete
    pub timestamps: Vec<i64>,
}

impl DeleteRequest {
    /// Action name expected by the device.
    pub const ACTION: &'static str = "delete";

    /// Request deleting `timestamps`.
    pub fn new(timestamps: impl IntoIterator<Item = i64>) -> Self {
        Self {
            action: Self::ACTION.to_string(),
            timestamps: timestamps.into_iter().collect(),
        }
    }

    /// Requested timestamps as a set.
    pub fn timestamp_set(&self) -> BTreeSet<i64> {
        self.timestamps.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::downsample::PointSource;
    use crate::measurement::Measurement;

    fn group_point(members: Vec<i64>) -> RenderPoint {
        RenderPoint {
            label: "group".into(),
            value: 1.0,
            source: PointSource::Group {
                summary: Measurement::new(members[members.len() / 2], 1.0),
                members,
            },
            selected: false,
        }
    }

    #[test]
    fn toggle_flips_single_timestamp() {
        let mut selection = SelectionSet::new();
        assert!(selection.toggle(1000));
        assert!(selection.contains(1000));
        assert!(!selection.toggle(1000));
        assert!(selection.is_empty());
    }

    #[test]
    fn toggling_group_selects_every_member() {
        let mut selection = SelectionSet::new();
        let point = group_point(vec![10, 20, 30]);

        assert!(selection.toggle_point(&point));
        assert_eq!(selection.len(), 3);

        let request = selection.delete_request().unwrap();
        assert_eq!(request.timestamps, vec![10, 20, 30]);
    }

    #[test]
    fn toggling_partially_selected_group_clears_it() {
        let mut selection: SelectionSet = [20, 99].into_iter().collect();
        let point = group_point(vec![10, 20, 30]);

        assert!(!selection.toggle_point(&point));
        assert_eq!(selection.timestamps().iter().copied().collect::<Vec<_>>(), vec![99]);
    }

    #[test]
    fn empty_selection_builds_no_request() {
        assert!(SelectionSet::new().delete_request().is_none());
    }

    #[test]
    fn restricts_to_visible_measurements() {
        let selection: SelectionSet = [1000, 2000].into_iter().collect();
        let visible: MeasurementSequence = vec![Measurement::new(2000, 1.0)].into();
        let restricted = selection.restricted_to(&visible);
        assert!(!restricted.contains(1000));
        assert!(restricted.contains(2000));
    }

    #[test]
    fn delete_request_wire_format() {
        let json = serde_json::to_string(&DeleteRequest::new([1000, 2000])).unwrap();
        assert_eq!(json, r#"{"action":"delete","timestamps":[1000,2000]}"#);
    }
}
