//! Category and availability matchers

use super::config::CategoryMatchMode;
use crate::{Categories, Club, MeetingSlot};

/// Whether any requested category matches the club's categories.
///
/// Several matching categories still count once.
pub fn category_matches(requested: &[String], categories: &Categories, mode: CategoryMatchMode) -> bool {
    match mode {
        CategoryMatchMode::Substring => {
            let joined = categories.joined().to_lowercase();
            requested
                .iter()
                .map(|c| c.trim().to_lowercase())
                .any(|c| !c.is_empty() && joined.contains(&c))
        }
        CategoryMatchMode::Label => requested
            .iter()
            .filter(|c| !c.trim().is_empty())
            .any(|c| categories.contains_label(c)),
    }
}

/// Outcome of comparing requested slots with a club's meeting slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailabilityMatch {
    /// Requested slots the club meets in
    pub matched: usize,
    /// Requested slots considered, malformed ones included
    pub requested: usize,
}

impl AvailabilityMatch {
    pub fn any(&self) -> bool {
        self.matched > 0
    }
}

/// Count requested `"<Day>-<TimeSlot>"` slots that exactly equal one of the
/// club's meeting slots. Malformed requests are non-matches.
pub fn match_availability(requested: &[String], club: &Club) -> AvailabilityMatch {
    let matched = requested
        .iter()
        .filter_map(|raw| MeetingSlot::parse(raw))
        .filter(|slot| club.has_slot(slot))
        .count();
    AvailabilityMatch {
        matched,
        requested: requested.len(),
    }
}
