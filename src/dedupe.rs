//! Set-difference between freshly scraped postings and persisted state.
//!
//! The fingerprint is the `details` text alone. That is deliberately coarse:
//! two distinct postings sharing boilerplate descriptions collide, and
//! title/company differences do not matter. Known limitation, kept as-is.

use crate::postings::ScrapedPosting;
use std::collections::HashSet;

/// Filter out postings whose `details` fingerprint is already in the store.
/// Input order is preserved. Pure; the caller is responsible for reading the
/// fingerprint set freshly before filtering (read-then-filter is not atomic
/// against concurrent writers — single-runner operation is assumed).
pub fn dedupe(
    freshly_scraped: Vec<ScrapedPosting>,
    existing_details: &HashSet<String>,
) -> Vec<ScrapedPosting> {
    freshly_scraped
        .into_iter()
        .filter(|posting| !existing_details.contains(&posting.details))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraped(details: &str, url: &str) -> ScrapedPosting {
        ScrapedPosting {
            details: details.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_filters_known_fingerprints() {
        let existing: HashSet<String> = ["known posting text".to_string()].into();

        let fresh = vec![
            scraped("known posting text", "https://example.com/a"),
            scraped("brand new posting", "https://example.com/b"),
        ];

        let new = dedupe(fresh, &existing);
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].details, "brand new posting");
    }

    #[test]
    fn test_order_preserved() {
        let existing = HashSet::new();

        let fresh = vec![
            scraped("first", "u1"),
            scraped("second", "u2"),
            scraped("third", "u3"),
        ];

        let new = dedupe(fresh, &existing);
        let details: Vec<&str> = new.iter().map(|p| p.details.as_str()).collect();
        assert_eq!(details, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_identical_details_different_url_is_duplicate() {
        let existing: HashSet<String> = ["same description".to_string()].into();

        let fresh = vec![scraped("same description", "https://example.com/other")];

        assert!(dedupe(fresh, &existing).is_empty());
    }

    #[test]
    fn test_idempotent_across_runs() {
        let mut existing = HashSet::new();

        let fresh = vec![scraped("posting a", "u1"), scraped("posting b", "u2")];

        let first_run = dedupe(fresh.clone(), &existing);
        assert_eq!(first_run.len(), 2);

        // simulate persistence updating the fingerprint set
        for posting in &first_run {
            existing.insert(posting.details.clone());
        }

        let second_run = dedupe(fresh, &existing);
        assert!(second_run.is_empty());
    }
}
