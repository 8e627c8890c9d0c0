use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const POSTINGS_FILE: &str = "postings.csv";
const CONFIG_FILE: &str = "config.yaml";

/// Default worker threads for feedback generation
const FEEDBACK_MAX_WORKERS: usize = 4;

/// Vocabulary scanned for in posting details at scrape time. The same list
/// drives the store-side keyword filter during evaluation.
fn default_keyword_vocabulary() -> Vec<String> {
    [
        "Junior",
        "Graduate/Junior",
        "Graduate",
        "React",
        "Javascript",
        "angular",
        "Vue",
        ".net",
        "sql",
        "node",
        "typescript",
        "remote",
        "work from home",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_title_pattern() -> String {
    "(Junior|Graduate/Junior|Graduate|React|Javascript|Vue|.NET)".to_string()
}

fn default_max_age_days() -> i64 {
    crate::evaluate::DEFAULT_MAX_AGE_DAYS
}

fn default_excluded_title_terms() -> Vec<String> {
    crate::evaluate::default_excluded_title_terms()
}

/// Configuration for the job board scraper
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Board origin, used to absolutize relative posting links
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Search URL with {title} and {location} placeholders;
    /// the page number is appended as a query parameter
    #[serde(default = "default_search_url_template")]
    pub search_url_template: String,

    #[serde(default = "default_job_title")]
    pub job_title: String,

    #[serde(default = "default_job_location")]
    pub location: String,

    /// Results per page as rendered by the board
    #[serde(default = "default_per_page")]
    pub per_page: u64,

    #[serde(default)]
    pub selectors: SelectorConfig,
}

fn default_base_url() -> String {
    "https://www.seek.com.au".to_string()
}

fn default_search_url_template() -> String {
    "https://www.seek.com.au/{title}-jobs?where={location}".to_string()
}

fn default_job_title() -> String {
    "Software Engineer".to_string()
}

fn default_job_location() -> String {
    "New York".to_string()
}

fn default_per_page() -> u64 {
    20
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            search_url_template: default_search_url_template(),
            job_title: default_job_title(),
            location: default_job_location(),
            per_page: default_per_page(),
            selectors: SelectorConfig::default(),
        }
    }
}

/// CSS selectors for the board's search result markup
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub total_count: String,
    pub card: String,
    pub title: String,
    pub company: String,
    pub details: String,
    pub category: String,
    pub location: String,
    pub listing_age: String,
    pub salary: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            total_count: "span[data-automation=\"totalJobsCount\"]".to_string(),
            card: "article[data-card-type=\"JobCard\"]".to_string(),
            title: "a[data-automation=\"jobTitle\"]".to_string(),
            company: "a[data-automation=\"jobCompany\"]".to_string(),
            details: "span[data-automation=\"jobShortDescription\"]".to_string(),
            category: "a[data-automation=\"jobSubClassification\"]".to_string(),
            location: "a[data-automation=\"jobLocation\"]".to_string(),
            listing_age: "span[data-automation=\"jobListingDate\"]".to_string(),
            salary: "span[data-automation=\"jobSalary\"]".to_string(),
        }
    }
}

/// Configuration for the retrieval corpus
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Directory of personal documents, relative to the data dir unless
    /// absolute
    #[serde(default = "default_corpus_dir")]
    pub dir: String,

    /// Embedding model name (e.g. "all-MiniLM-L6-v2")
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default)]
    pub chunk_overlap: usize,

    /// Chunks retrieved per posting query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Timeout for embedding model download in seconds
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_corpus_dir() -> String {
    "docs".to_string()
}

fn default_embedding_model() -> String {
    crate::corpus::DEFAULT_MODEL.to_string()
}

fn default_chunk_size() -> usize {
    crate::corpus::DEFAULT_CHUNK_SIZE
}

fn default_top_k() -> usize {
    crate::corpus::DEFAULT_TOP_K
}

fn default_download_timeout_secs() -> u64 {
    300
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
            model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            top_k: default_top_k(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

/// Configuration for feedback generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Completion model name
    #[serde(default = "default_completion_model")]
    pub model: String,

    /// Worker threads for the per-posting fan-out
    #[serde(default = "feedback_max_workers")]
    pub max_workers: usize,
}

fn default_completion_model() -> String {
    "gpt-4o-mini".to_string()
}

fn feedback_max_workers() -> usize {
    FEEDBACK_MAX_WORKERS
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            max_workers: feedback_max_workers(),
        }
    }
}

/// Configuration for digest delivery. Credentials live in the environment
/// (SMTP_USERNAME / SMTP_PASSWORD), never here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub from: String,

    #[serde(default)]
    pub to: String,

    #[serde(default = "default_mail_subject")]
    pub subject: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_mail_subject() -> String {
    "New Job Opportunities".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            from: String::new(),
            to: String::new(),
            subject: default_mail_subject(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_keyword_vocabulary")]
    pub keyword_vocabulary: Vec<String>,

    /// Case-insensitive regex the stored posting title must match to be
    /// evaluated
    #[serde(default = "default_title_pattern")]
    pub title_pattern: String,

    #[serde(default = "default_max_age_days")]
    pub max_age_days: i64,

    #[serde(default = "default_excluded_title_terms")]
    pub excluded_title_terms: Vec<String>,

    #[serde(default)]
    pub scrape: ScrapeConfig,

    #[serde(default)]
    pub corpus: CorpusConfig,

    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyword_vocabulary: default_keyword_vocabulary(),
            title_pattern: default_title_pattern(),
            max_age_days: default_max_age_days(),
            excluded_title_terms: default_excluded_title_terms(),
            scrape: ScrapeConfig::default(),
            corpus: CorpusConfig::default(),
            feedback: FeedbackConfig::default(),
            mail: MailConfig::default(),
            base_path: String::new(),
        }
    }
}

impl Config {
    fn validate(&mut self) {
        if self.max_age_days <= 0 {
            panic!("max_age_days must be positive, got {}", self.max_age_days);
        }

        if let Err(err) = regex::RegexBuilder::new(&self.title_pattern)
            .case_insensitive(true)
            .build()
        {
            panic!("title_pattern is not a valid regex: {err}");
        }

        if self.corpus.chunk_size == 0 {
            panic!("corpus.chunk_size must be greater than 0");
        }

        if self.corpus.chunk_overlap >= self.corpus.chunk_size {
            panic!(
                "corpus.chunk_overlap must be smaller than chunk_size, got {} >= {}",
                self.corpus.chunk_overlap, self.corpus.chunk_size
            );
        }

        if self.corpus.download_timeout_secs == 0 {
            panic!("corpus.download_timeout_secs must be greater than 0");
        }

        if self.feedback.max_workers == 0 {
            self.feedback.max_workers = 1
        }

        if self.scrape.per_page == 0 {
            self.scrape.per_page = default_per_page()
        }
    }

    pub fn load_with(base_path: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_path)?;

        let config_path = Path::new(base_path).join(CONFIG_FILE);

        // create new if does not exist
        if std::fs::metadata(&config_path).is_err() {
            log::info!("Creating default config at {}", config_path.display());
            write_atomic(&config_path, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str = std::fs::read_to_string(&config_path)?;
        let mut config: Self = serde_yml::from_str(&config_str)
            .map_err(|err| anyhow::anyhow!("config is malformed: {err}"))?;

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Path::new(&self.base_path).join(CONFIG_FILE);
        write_atomic(&config_path, serde_yml::to_string(&self)?.as_bytes())
    }

    pub fn base_path(&self) -> &Path {
        Path::new(&self.base_path)
    }

    /// Location of the posting CSV database.
    pub fn postings_path(&self) -> PathBuf {
        self.base_path().join(POSTINGS_FILE)
    }

    /// Corpus directory, resolved against the data dir when relative.
    pub fn corpus_dir(&self) -> PathBuf {
        let dir = Path::new(&self.corpus.dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_path().join(dir)
        }
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");
    std::fs::write(&temp_path, data)?;
    std::fs::rename(&temp_path, path)?;
    Ok(())
}
