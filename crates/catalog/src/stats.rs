//! Statistics Aggregator

use crate::category::Category;
use crate::listing::Listing;
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts and sizes derived from a listing. Sizes are raw bytes; turning
/// them into human units is left to whoever displays them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub per_category: BTreeMap<Category, usize>,
    pub total_count: usize,
    pub total_size_bytes: u64,
}

impl Stats {
    pub fn count(&self, category: Category) -> usize {
        self.per_category.get(&category).copied().unwrap_or(0)
    }
}

/// Aggregate whatever listing is given, filtered or not.
pub fn aggregate(listing: &Listing) -> Stats {
    listing.iter().fold(Stats::default(), |mut stats, (category, records)| {
        stats.per_category.insert(category, records.len());
        stats.total_count += records.len();
        stats.total_size_bytes += records.iter().map(|record| record.size()).sum::<u64>();
        stats
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileRecord;
    use time::OffsetDateTime;

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord::new(name, size, OffsetDateTime::UNIX_EPOCH)
    }

    #[test]
    fn test_empty_listing() {
        let stats = aggregate(&Listing::empty());
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.total_size_bytes, 0);
        for category in Category::ALL {
            assert_eq!(stats.count(category), 0);
        }
    }

    #[test]
    fn test_totals() {
        let listing = Listing::empty()
            .with(Category::Mobile, vec![record("a.apk", 1024), record("b.apk", 2048)])
            .with(Category::Desktop, vec![record("c.exe", 4096)]);
        let stats = aggregate(&listing);
        assert_eq!(stats.count(Category::Mobile), 2);
        assert_eq!(stats.count(Category::Desktop), 1);
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.total_size_bytes, 7168);
    }

    #[test]
    fn test_serialization() {
        let listing = Listing::empty().with(Category::Desktop, vec![record("c.exe", 10)]);
        let json = serde_json::to_value(aggregate(&listing)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "perCategory": {"mobile": 0, "desktop": 1},
                "totalCount": 1,
                "totalSizeBytes": 10,
            })
        );
    }
}
