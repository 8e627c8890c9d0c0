use anyhow::anyhow;
use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    hash::Hash,
    io::ErrorKind,
    sync::{Arc, RwLock},
    time::Instant,
};

/// A persisted job posting. `details` doubles as the dedup fingerprint:
/// two postings with identical details text are the same posting.
#[derive(Debug, Clone, Eq, Default, Serialize, Deserialize)]
pub struct Posting {
    pub id: u64,

    pub title: String,
    pub company: String,
    pub location: String,
    pub details: String,
    pub category: String,
    pub salary: Option<String>,
    pub url: String,

    /// Vocabulary keywords found in `details` at scrape time.
    /// Computed once, never recomputed.
    pub keywords: Vec<String>,

    /// Raw relative age as shown by the board ("5d ago") at crawl time.
    pub listing_age: String,

    pub date_crawled: DateTime<Utc>,
    pub date_scraped: DateTime<Utc>,
}

impl Hash for Posting {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Posting {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A freshly scraped posting, before the store has assigned an id.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScrapedPosting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub details: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    pub url: String,
    pub keywords: Vec<String>,
    pub listing_age: String,
    pub date_scraped: DateTime<Utc>,
}

/// Store-side filter. `title_pattern` is a case-insensitive regex;
/// `keywords` matches any intersection with the posting's keyword set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostingQuery {
    pub title_pattern: Option<String>,
    pub keywords: Option<Vec<String>>,

    #[serde(default)]
    pub limit: Option<usize>,
}

pub trait PostingStore: Send + Sync {
    fn find(&self, query: &PostingQuery) -> anyhow::Result<Vec<Posting>>;
    fn distinct_details(&self) -> anyhow::Result<HashSet<String>>;
    fn save(&self, posting: ScrapedPosting) -> anyhow::Result<Posting>;
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<Posting>>>,
    path: String,
}

const CSV_HEADERS: [&str; 12] = [
    "id",
    "title",
    "company",
    "location",
    "category",
    "salary",
    "url",
    "keywords",
    "listing_age",
    "date_crawled",
    "date_scraped",
    "details",
];

fn parse_timestamp(field: &str, value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("couldnt parse record {field}: {err}"))
}

impl BackendCsv {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new database at {path}");
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(path)?;
        let iter = csv_reader.records();

        let mut postings = vec![];
        for record in iter {
            let record = record?;
            let get = |idx: usize, name: &str| {
                record
                    .get(idx)
                    .map(|v| v.to_string())
                    .ok_or(anyhow!("couldnt get record {name}"))
            };

            let id = get(0, "id")?.parse::<u64>()?;
            let salary = get(5, "salary")?;
            let keywords = get(7, "keywords")?;

            let posting = Posting {
                id,
                title: get(1, "title")?,
                company: get(2, "company")?,
                location: get(3, "location")?,
                category: get(4, "category")?,
                salary: if salary.is_empty() {
                    None
                } else {
                    Some(salary)
                },
                url: get(6, "url")?,
                keywords: keywords
                    .split(',')
                    .filter(|k| !k.is_empty())
                    .map(|k| k.to_string())
                    .collect(),
                listing_age: get(8, "listing_age")?,
                date_crawled: parse_timestamp("date_crawled", &get(9, "date_crawled")?)?,
                date_scraped: parse_timestamp("date_scraped", &get(10, "date_scraped")?)?,
                details: get(11, "details")?,
            };

            postings.push(posting);
        }

        log::debug!(
            "took {}ms to read csv",
            now.elapsed().as_micros() as f64 / 1000.0
        );

        let mgr = BackendCsv {
            list: Arc::new(RwLock::new(postings)),
            path: path.to_string(),
        };

        Ok(mgr)
    }

    fn persist(&self) -> anyhow::Result<()> {
        let postings = self.list.write().unwrap();

        let temp_path = format!("{}-tmp", &self.path);
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for posting in postings.iter() {
            csv_wrt.write_record([
                &posting.id.to_string(),
                &posting.title,
                &posting.company,
                &posting.location,
                &posting.category,
                &posting.salary.clone().unwrap_or_default(),
                &posting.url,
                &posting.keywords.join(","),
                &posting.listing_age,
                &posting.date_crawled.to_rfc3339(),
                &posting.date_scraped.to_rfc3339(),
                &posting.details,
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

}

impl PostingStore for BackendCsv {
    fn save(&self, scraped: ScrapedPosting) -> anyhow::Result<Posting> {
        let id = if let Some(last_posting) = self.list.write().unwrap().last() {
            last_posting.id + 1
        } else {
            0
        };

        let posting = Posting {
            id,
            title: scraped.title,
            company: scraped.company,
            location: scraped.location,
            details: scraped.details,
            category: scraped.category,
            salary: scraped.salary,
            url: scraped.url,
            keywords: scraped.keywords,
            listing_age: scraped.listing_age,
            // first persistence of this record: the scrape that produced it
            // is also the crawl that discovered it
            date_crawled: scraped.date_scraped,
            date_scraped: scraped.date_scraped,
        };

        self.list.write().unwrap().push(posting.clone());

        self.persist()?;

        Ok(posting)
    }

    fn distinct_details(&self) -> anyhow::Result<HashSet<String>> {
        let postings = self.list.read().unwrap();

        Ok(postings.iter().map(|p| p.details.clone()).collect())
    }

    fn find(&self, query: &PostingQuery) -> anyhow::Result<Vec<Posting>> {
        let postings = self.list.read().unwrap();

        let title_re = match &query.title_pattern {
            Some(pattern) => Some(
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| anyhow!("invalid title pattern: {err}"))?,
            ),
            None => None,
        };

        let query_keywords = query.keywords.as_ref().map(|kws| {
            kws.iter()
                .map(|k| k.to_lowercase())
                .collect::<Vec<_>>()
        });

        let mut output = vec![];

        for posting in postings.iter() {
            if let Some(re) = &title_re {
                if !re.is_match(&posting.title) {
                    continue;
                }
            }

            if let Some(keywords) = &query_keywords {
                let has_intersection = posting
                    .keywords
                    .iter()
                    .any(|k| keywords.iter().any(|q| q == &k.to_lowercase()));

                if !has_intersection {
                    continue;
                }
            }

            output.push(posting.clone());

            let limit_reached =
                query.limit.is_some() && output.len() >= query.limit.unwrap_or_default();
            if limit_reached {
                break;
            }
        }

        Ok(output)
    }
}
