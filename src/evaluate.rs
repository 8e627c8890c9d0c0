//! Freshness and seniority filtering of stored postings.
//!
//! The board only reports a relative listing age ("5d ago") and that string
//! is captured once at crawl time. The real age at evaluation time is the
//! captured age plus the days elapsed since the crawl.

use crate::postings::Posting;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Postings older than this many reconstructed days are no longer candidates.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Titles containing any of these (substring, lowercased) are excluded.
pub fn default_excluded_title_terms() -> Vec<String> {
    ["senior", "lead", "manager"]
        .into_iter()
        .map(String::from)
        .collect()
}

static LEADING_INT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)").expect("static regex"));

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AgeParseError {
    #[error("no leading integer in listing age {0:?}")]
    NoLeadingInteger(String),
}

/// Parse the captured age string by taking its leading integer and dropping
/// whatever unit token trails it ("d ago", "days ago", ...).
pub fn parse_listing_age(raw: &str) -> Result<i64, AgeParseError> {
    let captures = LEADING_INT
        .captures(raw)
        .ok_or_else(|| AgeParseError::NoLeadingInteger(raw.to_string()))?;

    captures[1]
        .parse::<i64>()
        .map_err(|_| AgeParseError::NoLeadingInteger(raw.to_string()))
}

/// Reconstruct how old the listing is right now.
pub fn effective_age_days(posting: &Posting, now: DateTime<Utc>) -> Result<i64, AgeParseError> {
    let captured = parse_listing_age(&posting.listing_age)?;
    let elapsed = (now - posting.date_crawled).num_days();
    Ok(captured + elapsed)
}

/// Whether a stored posting is still worth evaluating: fresh enough and not
/// carrying an excluded seniority signal in its title.
///
/// Total and side-effect-free. A malformed age string makes the posting a
/// non-candidate instead of failing the run. The seniority check is a plain
/// substring match ("manager" rejects "Account Manager") — intentionally
/// broad, do not narrow to word boundaries.
pub fn is_candidate(
    posting: &Posting,
    now: DateTime<Utc>,
    max_age_days: i64,
    excluded_title_terms: &[String],
) -> bool {
    let effective_age = match effective_age_days(posting, now) {
        Ok(age) => age,
        Err(err) => {
            log::warn!("posting {}: {err}, treating as stale", posting.id);
            return false;
        }
    };

    if effective_age > max_age_days {
        return false;
    }

    let title = posting.title.to_lowercase();
    if excluded_title_terms
        .iter()
        .any(|term| title.contains(term.as_str()))
    {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn posting(title: &str, listing_age: &str, crawled_days_ago: i64) -> (Posting, DateTime<Utc>) {
        let now = Utc::now();
        let posting = Posting {
            id: 1,
            title: title.to_string(),
            listing_age: listing_age.to_string(),
            date_crawled: now - Duration::days(crawled_days_ago),
            ..Default::default()
        };
        (posting, now)
    }

    #[test]
    fn test_parse_listing_age() {
        assert_eq!(parse_listing_age("5d ago"), Ok(5));
        assert_eq!(parse_listing_age("30d ago"), Ok(30));
        assert_eq!(parse_listing_age("12 days ago"), Ok(12));
        assert_eq!(parse_listing_age(" 3d"), Ok(3));
    }

    #[test]
    fn test_parse_listing_age_malformed() {
        assert!(parse_listing_age("Featured").is_err());
        assert!(parse_listing_age("").is_err());
        assert!(parse_listing_age("d ago").is_err());
    }

    #[test]
    fn test_effective_age_reconstruction() {
        // captured 10d old, crawled 25 days ago: 35 days old now
        let (p, now) = posting("Junior Developer", "10d ago", 25);
        assert_eq!(effective_age_days(&p, now), Ok(35));
    }

    #[test]
    fn test_stale_posting_rejected_regardless_of_title() {
        let (p, now) = posting("Junior Developer", "10d ago", 25);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));
    }

    #[test]
    fn test_fresh_junior_posting_accepted() {
        let (p, now) = posting("Junior Developer", "2d ago", 0);
        assert!(is_candidate(&p, now, 30, &default_excluded_title_terms()));
    }

    #[test]
    fn test_excluded_term_is_substring_match() {
        // "manager" hides inside "Account Manager"
        let (p, now) = posting("Account Manager", "1d ago", 0);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));

        let (p, now) = posting("Team Lead Developer", "1d ago", 0);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));

        let (p, now) = posting("SENIOR Engineer", "1d ago", 0);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));
    }

    #[test]
    fn test_malformed_age_is_non_candidate() {
        let (p, now) = posting("Junior Developer", "Featured", 0);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));
    }

    #[test]
    fn test_boundary_age_still_candidate() {
        // exactly max_age_days is not "older than"
        let (p, now) = posting("Junior Developer", "30d ago", 0);
        assert!(is_candidate(&p, now, 30, &default_excluded_title_terms()));

        let (p, now) = posting("Junior Developer", "31d ago", 0);
        assert!(!is_candidate(&p, now, 30, &default_excluded_title_terms()));
    }
}
