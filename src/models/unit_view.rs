//! # Unit View
//!
//! Per-dispatch projection over an application's units, restricted to the
//! unit names a message asked about.
//!
//! The view is built by scanning the application's units once per requested
//! name, in request order. Names that match no unit are kept as unresolved
//! slots after the matched units: they count as "not started" and report the
//! empty status, so a request for a unit the store has not registered yet is
//! treated as transitional rather than silently ignored.
//!
//! An empty request selects nothing (see
//! [`EMPTY_SELECTION_SELECTS_NO_UNITS`](crate::constants::selection::EMPTY_SELECTION_SELECTS_NO_UNITS)):
//! `started()` is vacuously true and `state()` is empty regardless of the
//! application's real unit statuses.

use crate::constants::selection::EMPTY_SELECTION_SELECTS_NO_UNITS;
use crate::constants::unit_status;
use crate::models::Unit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitView {
    selected: Vec<Unit>,
    unresolved: Vec<String>,
}

impl UnitView {
    /// Select units from `units` by the requested names.
    pub fn select<S: AsRef<str>>(units: &[Unit], requested: &[S]) -> Self {
        let mut view = Self::default();

        if requested.is_empty() && !EMPTY_SELECTION_SELECTS_NO_UNITS {
            view.selected = units.to_vec();
            return view;
        }

        for name in requested {
            let name = name.as_ref();
            match units.iter().find(|unit| unit.name == name) {
                Some(unit) => view.selected.push(unit.clone()),
                None => view.unresolved.push(name.to_string()),
            }
        }

        view
    }

    /// True iff every selected unit is started. Vacuously true for an empty view.
    pub fn started(&self) -> bool {
        self.unresolved.is_empty() && self.selected.iter().all(Unit::is_started)
    }

    /// The status shared by every unit in the view, or `""` when the statuses
    /// differ or the view is empty.
    pub fn state(&self) -> &str {
        if !self.unresolved.is_empty() {
            return unit_status::UNRESOLVED;
        }

        let Some(first) = self.selected.first() else {
            return "";
        };

        if self.selected.iter().all(|unit| unit.status == first.status) {
            &first.status
        } else {
            ""
        }
    }

    /// First resolved unit, in request order.
    pub fn first(&self) -> Option<&Unit> {
        self.selected.first()
    }

    pub fn units(&self) -> &[Unit] {
        &self.selected
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.selected.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
