//! Filtered and sorted projections of the catalog. Nothing here mutates the
//! store; callers recompute on every search or sort change.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    /// Newest first.
    #[default]
    DateDescending,
    /// Case-insensitive ascending.
    Name,
    SizeAscending,
    PageCount,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "date" | "datedescending" | "date_descending" => Ok(SortKey::DateDescending),
            "name" => Ok(SortKey::Name),
            "size" | "sizeascending" | "size_ascending" => Ok(SortKey::SizeAscending),
            "pages" | "pagecount" | "page_count" => Ok(SortKey::PageCount),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortKey::DateDescending => write!(f, "date"),
            SortKey::Name => write!(f, "name"),
            SortKey::SizeAscending => write!(f, "size"),
            SortKey::PageCount => write!(f, "pages"),
        }
    }
}

fn compare(a: &CatalogEntry, b: &CatalogEntry, key: SortKey) -> Ordering {
    match key {
        SortKey::DateDescending => b.created_at().cmp(&a.created_at()),
        SortKey::Name => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
        SortKey::SizeAscending => a.byte_size().cmp(&b.byte_size()),
        SortKey::PageCount => a.page_count().cmp(&b.page_count()),
    }
}

/// Entries whose name contains `search_text` (case-insensitive; empty text
/// matches all), ordered by `sort`. Ties keep their input order.
pub fn project(entries: &[CatalogEntry], search_text: &str, sort: SortKey) -> Vec<CatalogEntry> {
    let needle = search_text.to_lowercase();

    let mut projected: Vec<CatalogEntry> = entries
        .iter()
        .filter(|e| needle.is_empty() || e.name().to_lowercase().contains(&needle))
        .cloned()
        .collect();

    projected.sort_by(|a, b| compare(a, b, sort));
    projected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(name: &str, minutes: i64, size: u64, pages: u32) -> CatalogEntry {
        let base = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        CatalogEntry::new(
            name,
            base + Duration::minutes(minutes),
            pages,
            size,
            vec![],
            format!("/docs/{}.pdf", name),
        )
    }

    fn names(entries: &[CatalogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name()).collect()
    }

    fn sample() -> Vec<CatalogEntry> {
        vec![
            entry("beta Report", 10, 300, 2),
            entry("alpha", 30, 100, 5),
            entry("Report final", 20, 200, 1),
            entry("gamma", 0, 200, 2),
        ]
    }

    #[test]
    fn test_empty_search_date_descending() {
        let projected = project(&sample(), "", SortKey::DateDescending);
        assert_eq!(
            names(&projected),
            vec!["alpha", "Report final", "beta Report", "gamma"]
        );
    }

    #[test]
    fn test_search_then_name_sort() {
        let projected = project(&sample(), "report", SortKey::Name);
        assert_eq!(names(&projected), vec!["beta Report", "Report final"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let projected = project(&sample(), "ALPHA", SortKey::Name);
        assert_eq!(names(&projected), vec!["alpha"]);
    }

    #[test]
    fn test_search_whitespace_is_significant() {
        let projected = project(&sample(), "report ", SortKey::Name);
        assert_eq!(names(&projected), vec!["Report final"]);

        let spaced = project(&sample(), " ", SortKey::Name);
        assert_eq!(names(&spaced), vec!["beta Report", "Report final"]);
    }

    #[test]
    fn test_size_ties_keep_input_order() {
        let projected = project(&sample(), "", SortKey::SizeAscending);
        assert_eq!(
            names(&projected),
            vec!["alpha", "Report final", "gamma", "beta Report"]
        );
    }

    #[test]
    fn test_page_count_sort() {
        let projected = project(&sample(), "", SortKey::PageCount);
        assert_eq!(
            names(&projected),
            vec!["Report final", "beta Report", "gamma", "alpha"]
        );
    }

    #[test]
    fn test_no_match() {
        assert!(project(&sample(), "zzz", SortKey::Name).is_empty());
    }

    #[test]
    fn test_input_untouched() {
        let entries = sample();
        let before = entries.clone();
        let _ = project(&entries, "a", SortKey::Name);
        assert_eq!(entries, before);
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!("date".parse::<SortKey>().unwrap(), SortKey::DateDescending);
        assert_eq!("Name".parse::<SortKey>().unwrap(), SortKey::Name);
        assert_eq!("size".parse::<SortKey>().unwrap(), SortKey::SizeAscending);
        assert_eq!("pages".parse::<SortKey>().unwrap(), SortKey::PageCount);
        assert!("colour".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default(), SortKey::DateDescending);
    }
}
