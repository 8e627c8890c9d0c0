use crate::postings::{BackendCsv, PostingQuery, PostingStore, ScrapedPosting};
use chrono::Utc;

fn fresh_store() -> (BackendCsv, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let csv_path = tmp.path().join("postings.csv");
    let store = BackendCsv::load(csv_path.to_str().unwrap()).unwrap();
    (store, tmp)
}

fn scraped(title: &str, details: &str, keywords: &[&str]) -> ScrapedPosting {
    ScrapedPosting {
        title: title.to_string(),
        company: "Acme Corp".to_string(),
        location: "Sydney".to_string(),
        details: details.to_string(),
        category: "Engineering".to_string(),
        salary: None,
        url: format!("https://board.example.com/{}", title.replace(' ', "-")),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        listing_age: "2d ago".to_string(),
        date_scraped: Utc::now(),
    }
}

// --- save / load roundtrip ---

#[test]
fn save_load_roundtrip_preserves_data() {
    let tmp = tempfile::tempdir().unwrap();
    let csv_path = tmp.path().join("postings.csv");
    let path_str = csv_path.to_str().unwrap();

    {
        let store = BackendCsv::load(path_str).unwrap();

        let mut first = scraped("Junior Developer", "React and Node role", &["React", "node"]);
        first.salary = Some("$80k".to_string());
        store.save(first).unwrap();

        store
            .save(scraped("Graduate Analyst", "SQL reporting, details with, commas", &["sql"]))
            .unwrap();
    }

    // reload from disk
    let store = BackendCsv::load(path_str).unwrap();
    let all = store.find(&PostingQuery::default()).unwrap();
    assert_eq!(all.len(), 2);

    let first = &all[0];
    assert_eq!(first.id, 0);
    assert_eq!(first.title, "Junior Developer");
    assert_eq!(first.company, "Acme Corp");
    assert_eq!(first.details, "React and Node role");
    assert_eq!(first.salary.as_deref(), Some("$80k"));
    assert_eq!(first.keywords, vec!["React", "node"]);
    assert_eq!(first.listing_age, "2d ago");

    let second = &all[1];
    assert_eq!(second.id, 1);
    assert_eq!(second.salary, None);
    assert_eq!(second.details, "SQL reporting, details with, commas");
}

#[test]
fn save_assigns_sequential_ids() {
    let (store, _tmp) = fresh_store();

    for i in 0..5 {
        let posting = store
            .save(scraped(&format!("Role {i}"), &format!("details {i}"), &[]))
            .unwrap();
        assert_eq!(posting.id, i);
    }
}

#[test]
fn save_sets_date_crawled_from_scrape() {
    let (store, _tmp) = fresh_store();

    let record = scraped("Junior Developer", "details", &[]);
    let scraped_at = record.date_scraped;

    let posting = store.save(record).unwrap();
    assert_eq!(posting.date_crawled, scraped_at);
    assert_eq!(posting.date_scraped, scraped_at);
}

// --- distinct_details ---

#[test]
fn distinct_details_returns_fingerprint_set() {
    let (store, _tmp) = fresh_store();

    store.save(scraped("A", "shared details", &[])).unwrap();
    store.save(scraped("B", "other details", &[])).unwrap();

    let details = store.distinct_details().unwrap();
    assert_eq!(details.len(), 2);
    assert!(details.contains("shared details"));
    assert!(details.contains("other details"));
}

#[test]
fn distinct_details_empty_store() {
    let (store, _tmp) = fresh_store();
    assert!(store.distinct_details().unwrap().is_empty());
}

// --- find filter semantics ---

#[test]
fn find_filters_by_title_pattern_case_insensitive() {
    let (store, _tmp) = fresh_store();

    store
        .save(scraped("JUNIOR developer", "a", &["React"]))
        .unwrap();
    store
        .save(scraped("Principal Architect", "b", &["React"]))
        .unwrap();

    let query = PostingQuery {
        title_pattern: Some("(Junior|Graduate)".to_string()),
        ..Default::default()
    };

    let found = store.find(&query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "JUNIOR developer");
}

#[test]
fn find_requires_keyword_intersection() {
    let (store, _tmp) = fresh_store();

    store
        .save(scraped("Junior Dev", "a", &["React", "node"]))
        .unwrap();
    store.save(scraped("Junior QA", "b", &["selenium"])).unwrap();
    store.save(scraped("Junior Ops", "c", &[])).unwrap();

    let query = PostingQuery {
        keywords: Some(vec!["react".to_string(), "sql".to_string()]),
        ..Default::default()
    };

    // keyword comparison is case-insensitive, empty keyword sets never match
    let found = store.find(&query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Junior Dev");
}

#[test]
fn find_combines_title_and_keywords() {
    let (store, _tmp) = fresh_store();

    store.save(scraped("Junior Dev", "a", &["React"])).unwrap();
    store
        .save(scraped("Junior Dev Two", "b", &["cobol"]))
        .unwrap();
    store
        .save(scraped("Staff Engineer", "c", &["React"]))
        .unwrap();

    let query = PostingQuery {
        title_pattern: Some("Junior".to_string()),
        keywords: Some(vec!["React".to_string()]),
        ..Default::default()
    };

    let found = store.find(&query).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Junior Dev");
}

#[test]
fn find_without_filters_returns_all() {
    let (store, _tmp) = fresh_store();

    store.save(scraped("A", "a", &[])).unwrap();
    store.save(scraped("B", "b", &[])).unwrap();

    let found = store.find(&PostingQuery::default()).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn find_respects_limit() {
    let (store, _tmp) = fresh_store();

    for i in 0..10 {
        store
            .save(scraped(&format!("Role {i}"), &format!("d{i}"), &[]))
            .unwrap();
    }

    let query = PostingQuery {
        limit: Some(3),
        ..Default::default()
    };

    assert_eq!(store.find(&query).unwrap().len(), 3);
}

#[test]
fn find_rejects_invalid_pattern() {
    let (store, _tmp) = fresh_store();

    let query = PostingQuery {
        title_pattern: Some("([unclosed".to_string()),
        ..Default::default()
    };

    assert!(store.find(&query).is_err());
}
