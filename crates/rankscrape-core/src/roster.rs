//! The fixed set of detail categories (characters) a profile reports levels for.

use std::collections::{BTreeMap, BTreeSet};

/// Categories left out of the filtered level total unless configured otherwise.
pub const DEFAULT_EXCLUDED_CATEGORIES: [u32; 2] = [1051, 1052];

const KNOWN_CATEGORIES: [(u32, &str); 11] = [
    (1031, "Kaho"),
    (1032, "Sayaka"),
    (1033, "Rurino"),
    (1021, "Kozue"),
    (1022, "Tsuzuri"),
    (1023, "Megumi"),
    (1041, "Ginko"),
    (1042, "Kosuzu"),
    (1043, "Hime"),
    (1051, "Izumi"),
    (1052, "Celestine"),
];

/// Known category ids in display order plus the exclusion set for the
/// filtered aggregate.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<(u32, String)>,
    excluded: BTreeSet<u32>,
}

impl Roster {
    #[must_use]
    pub fn new(members: Vec<(u32, String)>, excluded: BTreeSet<u32>) -> Self {
        Self { members, excluded }
    }

    /// The built-in category table with the given exclusion set.
    #[must_use]
    pub fn with_exclusions(excluded: BTreeSet<u32>) -> Self {
        let members = KNOWN_CATEGORIES
            .iter()
            .map(|(id, name)| (*id, (*name).to_string()))
            .collect();
        Self::new(members, excluded)
    }

    #[must_use]
    pub fn members(&self) -> &[(u32, String)] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, category_id: u32) -> bool {
        self.members.iter().any(|(id, _)| *id == category_id)
    }

    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<u32> {
        &self.excluded
    }

    /// A zeroed level map with one entry per known category.
    #[must_use]
    pub fn empty_levels(&self) -> BTreeMap<u32, u32> {
        self.members.iter().map(|(id, _)| (*id, 0)).collect()
    }

    /// Returns `(total, filtered_total)` where the filtered total skips the
    /// excluded categories.
    #[must_use]
    pub fn aggregate(&self, levels: &BTreeMap<u32, u32>) -> (u32, u32) {
        let total = levels.values().fold(0u32, |acc, l| acc.saturating_add(*l));
        let filtered = levels
            .iter()
            .filter(|(id, _)| !self.excluded.contains(id))
            .fold(0u32, |acc, (_, l)| acc.saturating_add(*l));
        (total, filtered)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::with_exclusions(DEFAULT_EXCLUDED_CATEGORIES.iter().copied().collect())
    }
}
