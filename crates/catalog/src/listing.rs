//! Per-category ordered record sequences.
//!
//! A [`Listing`] is both what the catalog holds (a [`Snapshot`]) and what
//! filtering produces (a [`View`]), so filters compose and statistics can be
//! computed from either.

use crate::category::Category;
use crate::record::FileRecord;
use std::sync::Arc;

/// Mapping from every [`Category`] to an ordered sequence of records.
///
/// Each category's records sit behind their own [`Arc`], so cloning a
/// listing is cheap and replacing one category never copies the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    slots: [Arc<[FileRecord]>; 2],
}

/// Everything found by the most recent successful scans.
pub type Snapshot = Listing;
/// A (possibly filtered) listing derived from a [`Snapshot`].
pub type View = Listing;

impl Listing {
    /// A listing with no records in any category.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder-style replacement of one category's records.
    pub fn with(mut self, category: Category, records: impl Into<Arc<[FileRecord]>>) -> Self {
        self.replace(category, records);
        self
    }

    pub fn get(&self, category: Category) -> &[FileRecord] {
        &self.slots[category.index()]
    }

    /// Shared handle to one category's records.
    pub fn shared(&self, category: Category) -> Arc<[FileRecord]> {
        Arc::clone(&self.slots[category.index()])
    }

    /// Swap one category's records wholesale.
    pub fn replace(&mut self, category: Category, records: impl Into<Arc<[FileRecord]>>) {
        self.slots[category.index()] = records.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[FileRecord])> {
        Category::ALL.into_iter().map(|category| (category, self.get(category)))
    }

    /// Total number of records across all categories.
    pub fn len(&self) -> usize {
        self.slots.iter().map(|slot| slot.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
