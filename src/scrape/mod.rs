//! Job board scraping.
//!
//! Fetches paginated search results over plain HTTP and extracts posting
//! records with CSS selectors. Every selector is configuration — boards
//! shuffle their markup often enough that none of it belongs in code.
//! A page that fails to fetch or a card that fails to parse is skipped;
//! scraping degrades, it does not abort.

use crate::config::ScrapeConfig;
use crate::postings::ScrapedPosting;
use anyhow::{anyhow, Context};
use chrono::Utc;
use reqwest::StatusCode;
use scraper::{ElementRef, Html, Selector};
use std::{error::Error, thread::sleep, time::Duration};

const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:124.0) Gecko/20100101 Firefox/124.0";

/// Source of raw posting records. The pipeline only sees this seam.
pub trait Scraper: Send + Sync {
    fn scrape(&self) -> anyhow::Result<Vec<ScrapedPosting>>;
}

fn rand_jitter() -> u64 {
    rand::random::<u64>() % 2000
}

fn get_error(error: &reqwest::Error) -> String {
    match error.source() {
        Some(e) => match e.source() {
            Some(e) => e.to_string(),
            None => e.to_string(),
        },
        None => error.to_string(),
    }
}

/// GET with retries and backoff. Client errors other than 429 give up
/// immediately; 429 sleeps progressively before retrying.
pub fn fetch_with_retries(url: &str) -> Option<(StatusCode, String)> {
    let mut r = 0;

    loop {
        if r >= 5 {
            return None;
        }

        if r > 0 {
            log::debug!("{url}: retrying");
        }

        r += 1;

        let client = match reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT_DEFAULT)
            .timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(10))
            .build()
        {
            Ok(client) => client,
            Err(err) => {
                log::error!("{url}: client build failed: {err}");
                return None;
            }
        };

        log::debug!("{url}: requesting");

        let resp = match client.get(url).send() {
            Ok(resp) => resp,
            Err(err) => {
                log::error!("{url}: {err}: {:#?}", get_error(&err));
                continue;
            }
        };

        let status = resp.status();

        if status == StatusCode::OK {
            let text = match resp.text() {
                Ok(text) => text,
                Err(err) => {
                    log::debug!("{url}: body read failed (timeout: {})", err.is_timeout());
                    continue;
                }
            };

            return Some((status, text));
        }

        log::debug!("{url}: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            sleep(Duration::from_secs(r * 4) + Duration::from_millis(rand_jitter()));
            continue;
        }

        if status.is_client_error() {
            // no need to try again, it's over...
            return None;
        }
    }
}

struct CardSelectors {
    card: Selector,
    title: Selector,
    company: Selector,
    details: Selector,
    category: Selector,
    location: Selector,
    listing_age: Selector,
    salary: Selector,
    total_count: Selector,
}

fn parse_selector(name: &str, value: &str) -> anyhow::Result<Selector> {
    Selector::parse(value).map_err(|err| anyhow!("bad {name} selector {value:?}: {err}"))
}

impl CardSelectors {
    fn from_config(config: &ScrapeConfig) -> anyhow::Result<Self> {
        let sel = &config.selectors;
        Ok(Self {
            card: parse_selector("card", &sel.card)?,
            title: parse_selector("title", &sel.title)?,
            company: parse_selector("company", &sel.company)?,
            details: parse_selector("details", &sel.details)?,
            category: parse_selector("category", &sel.category)?,
            location: parse_selector("location", &sel.location)?,
            listing_age: parse_selector("listing_age", &sel.listing_age)?,
            salary: parse_selector("salary", &sel.salary)?,
            total_count: parse_selector("total_count", &sel.total_count)?,
        })
    }
}

/// Scrapes a paginated job board search with blocking HTTP.
pub struct BoardScraper {
    config: ScrapeConfig,
    vocabulary: Vec<String>,
}

impl BoardScraper {
    pub fn new(config: ScrapeConfig, vocabulary: Vec<String>) -> Self {
        Self { config, vocabulary }
    }

    fn search_url(&self, page: u32) -> String {
        let url = self
            .config
            .search_url_template
            .replace("{title}", &self.config.job_title.replace(' ', "-"))
            .replace("{location}", &self.config.location.replace(' ', "-"));

        format!("{url}&page={page}")
    }

    /// Total result pages, read from the results-count element of the first
    /// page.
    fn num_pages(&self, document: &Html, selectors: &CardSelectors) -> u32 {
        let total_jobs = document
            .select(&selectors.total_count)
            .next()
            .map(|el| element_text(&el))
            .and_then(|text| leading_int(&text));

        match total_jobs {
            Some(total) => {
                let per_page = self.config.per_page.max(1);
                ((total + per_page - 1) / per_page) as u32
            }
            None => {
                log::warn!("couldnt read total results count, scraping first page only");
                1
            }
        }
    }

    fn parse_cards(&self, document: &Html, selectors: &CardSelectors) -> Vec<ScrapedPosting> {
        let mut postings = vec![];

        for card in document.select(&selectors.card) {
            match self.parse_card(&card, selectors) {
                Ok(posting) => postings.push(posting),
                Err(err) => {
                    log::warn!("skipping unparsable job card: {err}");
                }
            }
        }

        postings
    }

    fn parse_card(
        &self,
        card: &ElementRef,
        selectors: &CardSelectors,
    ) -> anyhow::Result<ScrapedPosting> {
        let title_el = card
            .select(&selectors.title)
            .next()
            .context("no title element")?;
        let title = element_text(&title_el);

        let url = title_el
            .value()
            .attr("href")
            .map(|href| self.absolute_url(href))
            .context("title element has no href")?;

        let select_text = |selector: &Selector| {
            card.select(selector)
                .next()
                .map(|el| element_text(&el))
                .unwrap_or_default()
        };

        let details = select_text(&selectors.details);
        let salary = card
            .select(&selectors.salary)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty());

        Ok(ScrapedPosting {
            title,
            company: select_text(&selectors.company),
            location: select_text(&selectors.location),
            category: select_text(&selectors.category),
            listing_age: select_text(&selectors.listing_age),
            keywords: extract_keywords(&details, &self.vocabulary),
            details,
            salary,
            url,
            date_scraped: Utc::now(),
        })
    }

    fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }

        match url::Url::parse(&self.config.base_url).and_then(|base| base.join(href)) {
            Ok(joined) => joined.to_string(),
            Err(_) => href.to_string(),
        }
    }
}

impl Scraper for BoardScraper {
    fn scrape(&self) -> anyhow::Result<Vec<ScrapedPosting>> {
        let selectors = CardSelectors::from_config(&self.config)?;

        let first_url = self.search_url(1);
        let (_, first_html) = fetch_with_retries(&first_url)
            .ok_or_else(|| anyhow!("failed to fetch first results page {first_url}"))?;

        let first_document = Html::parse_document(&first_html);
        let num_pages = self.num_pages(&first_document, &selectors);
        log::info!("scraping {num_pages} result pages");

        let mut postings = self.parse_cards(&first_document, &selectors);

        for page in 2..=num_pages {
            let page_url = self.search_url(page);
            let Some((_, html)) = fetch_with_retries(&page_url) else {
                log::warn!("page {page}: fetch failed, skipping");
                continue;
            };

            let document = Html::parse_document(&html);
            postings.extend(self.parse_cards(&document, &selectors));
        }

        log::info!("scraped {} postings", postings.len());

        Ok(postings)
    }
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn leading_int(text: &str) -> Option<u64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == ',')
        .filter(|ch| ch.is_ascii_digit())
        .collect();

    digits.parse().ok()
}

/// The subset of the vocabulary present in `details`, case-insensitively,
/// preserving vocabulary order. Computed once at scrape time.
pub fn extract_keywords(details: &str, vocabulary: &[String]) -> Vec<String> {
    let details_lower = details.to_lowercase();

    vocabulary
        .iter()
        .filter(|keyword| details_lower.contains(&keyword.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScrapeConfig;

    const FIXTURE: &str = r#"
    <html><body>
      <span data-automation="totalJobsCount">43 jobs found</span>
      <article data-card-type="JobCard">
        <a data-automation="jobTitle" href="/job/123">Junior Developer</a>
        <a data-automation="jobCompany">Initech</a>
        <span data-automation="jobShortDescription">Work with React and Node on internal tools</span>
        <a data-automation="jobSubClassification">Engineering</a>
        <a data-automation="jobLocation">Sydney</a>
        <span data-automation="jobListingDate">3d ago</span>
        <span data-automation="jobSalary">$80k</span>
      </article>
      <article data-card-type="JobCard">
        <a data-automation="jobTitle" href="https://board.example.com/job/456">Graduate Analyst</a>
        <a data-automation="jobCompany">Hooli</a>
        <span data-automation="jobShortDescription">SQL reporting role</span>
        <a data-automation="jobSubClassification">Data</a>
        <a data-automation="jobLocation">Melbourne</a>
        <span data-automation="jobListingDate">1d ago</span>
      </article>
      <article data-card-type="JobCard">
        <span data-automation="jobShortDescription">card with no title link</span>
      </article>
    </body></html>"#;

    fn scraper() -> BoardScraper {
        BoardScraper::new(
            ScrapeConfig::default(),
            vec!["React".to_string(), "sql".to_string(), "kubernetes".to_string()],
        )
    }

    #[test]
    fn test_parse_cards_from_fixture() {
        let scraper = scraper();
        let selectors = CardSelectors::from_config(&scraper.config).unwrap();
        let document = Html::parse_document(FIXTURE);

        let postings = scraper.parse_cards(&document, &selectors);

        // third card has no title and is skipped
        assert_eq!(postings.len(), 2);

        let first = &postings[0];
        assert_eq!(first.title, "Junior Developer");
        assert_eq!(first.company, "Initech");
        assert_eq!(first.listing_age, "3d ago");
        assert_eq!(first.salary.as_deref(), Some("$80k"));
        assert_eq!(first.keywords, vec!["React".to_string()]);
        assert!(first.url.starts_with("https://"));
        assert!(first.url.ends_with("/job/123"));

        let second = &postings[1];
        assert_eq!(second.salary, None);
        assert_eq!(second.keywords, vec!["sql".to_string()]);
        assert_eq!(second.url, "https://board.example.com/job/456");
    }

    #[test]
    fn test_num_pages_from_count() {
        let scraper = scraper();
        let selectors = CardSelectors::from_config(&scraper.config).unwrap();
        let document = Html::parse_document(FIXTURE);

        // 43 jobs at 20 per page
        assert_eq!(scraper.num_pages(&document, &selectors), 3);
    }

    #[test]
    fn test_num_pages_defaults_to_one() {
        let scraper = scraper();
        let selectors = CardSelectors::from_config(&scraper.config).unwrap();
        let document = Html::parse_document("<html><body></body></html>");

        assert_eq!(scraper.num_pages(&document, &selectors), 1);
    }

    #[test]
    fn test_extract_keywords_case_insensitive() {
        let vocabulary = vec![
            "Junior".to_string(),
            "React".to_string(),
            "work from home".to_string(),
        ];

        let keywords = extract_keywords(
            "JUNIOR role, react experience required. Work From Home ok.",
            &vocabulary,
        );

        assert_eq!(keywords, vocabulary);
    }

    #[test]
    fn test_extract_keywords_none_found() {
        let vocabulary = vec!["Rust".to_string()];
        assert!(extract_keywords("a COBOL position", &vocabulary).is_empty());
    }

    #[test]
    fn test_leading_int() {
        assert_eq!(leading_int("43 jobs found"), Some(43));
        assert_eq!(leading_int("1,204 jobs"), Some(1204));
        assert_eq!(leading_int("no digits"), None);
    }

    #[test]
    fn test_search_url_substitution() {
        let scraper = scraper();
        let url = scraper.search_url(2);
        assert!(url.contains("Software-Engineer"));
        assert!(url.contains("page=2"));
    }
}
