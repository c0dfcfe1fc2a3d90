//! Search/Filter Engine
//!
//! Filtering is a pure function of a listing and a [`SearchTerm`]. Views are
//! always recomputed from the latest snapshot rather than narrowed from an
//! older view.

use crate::listing::{Listing, View};
use crate::record::FileRecord;
use std::fmt;

/// A normalised search term: trimmed and lower-cased.
///
/// The empty term matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_lowercase())
    }

    /// The term that matches every record.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive substring match against the record's name.
    pub fn matches(&self, record: &FileRecord) -> bool {
        self.is_empty() || record.name().to_lowercase().contains(&self.0)
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchTerm {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Keep the records of every category whose name contains `term`,
/// preserving their order.
///
/// An empty term returns the listing unchanged.
pub fn filter(listing: &Listing, term: &SearchTerm) -> View {
    if term.is_empty() {
        return listing.clone();
    }
    listing.iter().fold(Listing::empty(), |view, (category, records)| {
        let kept: Vec<FileRecord> = records.iter().filter(|record| term.matches(record)).cloned().collect();
        view.with(category, kept)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use rstest::rstest;
    use time::OffsetDateTime;

    fn listing() -> Listing {
        let record = |name: &str| FileRecord::new(name, 1, OffsetDateTime::UNIX_EPOCH);
        Listing::empty()
            .with(Category::Mobile, vec![record("Alpha.apk"), record("beta.apk"), record("gamma.apk")])
            .with(Category::Desktop, vec![record("ALPHA-setup.exe"), record("delta.exe")])
    }

    fn names(view: &View, category: Category) -> Vec<&str> {
        view.get(category).iter().map(FileRecord::name).collect()
    }

    #[rstest]
    #[case("  Foo ", "foo")]
    #[case("", "")]
    #[case("\t\n", "")]
    #[case("ÄPFEL", "äpfel")]
    fn test_normalisation(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(SearchTerm::new(raw).as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_blank_term_is_identity(#[case] raw: &str) {
        let listing = listing();
        assert_eq!(filter(&listing, &SearchTerm::new(raw)), listing);
    }

    #[test]
    fn test_case_insensitive_substring() {
        let view = filter(&listing(), &SearchTerm::new(" ALPHA"));
        assert_eq!(names(&view, Category::Mobile), ["Alpha.apk"]);
        assert_eq!(names(&view, Category::Desktop), ["ALPHA-setup.exe"]);
    }

    #[test]
    fn test_preserves_order() {
        let view = filter(&listing(), &SearchTerm::new("a.apk"));
        assert_eq!(names(&view, Category::Mobile), ["Alpha.apk", "beta.apk", "gamma.apk"]);
        assert!(view.get(Category::Desktop).is_empty());
    }

    #[rstest]
    #[case("a")]
    #[case("ta")]
    #[case("nothing")]
    fn test_idempotent(#[case] raw: &str) {
        let term = SearchTerm::new(raw);
        let once = filter(&listing(), &term);
        assert_eq!(filter(&once, &term), once);
    }
}
