//! Pipeline orchestration.
//!
//! `App` owns the store handle and configuration and drives the two stages:
//! scrape+persist and evaluate+notify. Store failures abort the run; every
//! per-item failure downstream of persistence is contained to the item.

use crate::config::Config;
use crate::corpus::Retriever;
use crate::dedupe::dedupe;
use crate::digest;
use crate::evaluate::is_candidate;
use crate::feedback;
use crate::notify::Notifier;
use crate::openai::CompletionModel;
use crate::postings::{Posting, PostingQuery, PostingStore};
use crate::scrape::Scraper;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    /// Postings the scraper produced
    pub scraped: usize,
    /// Fingerprints already present in the store
    pub existing: usize,
    /// Postings surviving dedup
    pub new: usize,
    /// Postings actually persisted
    pub saved: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateReport {
    /// Stored postings matching the title/keyword filter
    pub matched: usize,
    /// Postings still fresh and not seniority-excluded
    pub candidates: usize,
    /// Candidates that got feedback
    pub feedback_generated: usize,
    /// Whether the digest was delivered
    pub notified: bool,
}

pub struct App {
    store: Arc<dyn PostingStore>,
    config: Arc<RwLock<Config>>,
}

impl App {
    pub fn new(store: Arc<dyn PostingStore>, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    /// Scrape the board and persist postings not yet in the store.
    ///
    /// The fingerprint set is read fresh immediately before filtering; with
    /// a single runner this makes persistence of any fingerprint
    /// at-most-once across repeated runs.
    pub fn run_scrape(&self, scraper: &dyn Scraper) -> anyhow::Result<ScrapeReport> {
        let scraped = scraper.scrape().context("scrape stage failed")?;

        let existing = self
            .store
            .distinct_details()
            .context("reading store fingerprints failed")?;

        let new = dedupe(scraped.clone(), &existing);

        log::info!("Total jobs: {}", scraped.len());
        log::info!("Existing jobs: {}", existing.len());
        log::info!("New jobs: {}", new.len());

        let new_count = new.len();
        let mut saved = 0usize;
        for posting in new {
            let stored = self
                .store
                .save(posting)
                .with_context(|| format!("persist stage failed after {saved} postings"))?;
            log::debug!("saved posting {} ({})", stored.id, stored.title);
            saved += 1;
        }

        Ok(ScrapeReport {
            scraped: scraped.len(),
            existing: existing.len(),
            new: new_count,
            saved,
        })
    }

    /// Stored postings that pass the title/keyword filter and the
    /// freshness/seniority evaluation.
    pub fn candidates(&self, now: DateTime<Utc>) -> anyhow::Result<(usize, Vec<Posting>)> {
        let config = self.config.read().unwrap();

        let query = PostingQuery {
            title_pattern: Some(config.title_pattern.clone()),
            keywords: Some(config.keyword_vocabulary.clone()),
            limit: None,
        };

        let matched = self
            .store
            .find(&query)
            .context("querying store for postings failed")?;
        let matched_count = matched.len();

        let candidates: Vec<Posting> = matched
            .into_iter()
            .filter(|posting| {
                is_candidate(
                    posting,
                    now,
                    config.max_age_days,
                    &config.excluded_title_terms,
                )
            })
            .collect();

        Ok((matched_count, candidates))
    }

    /// Evaluate stored postings, generate feedback and deliver the digest.
    ///
    /// Delivery failure is logged and reported, not propagated: by this
    /// point persistence already succeeded, so the run is still a success.
    pub fn run_evaluate(
        &self,
        retriever: &dyn Retriever,
        model: &dyn CompletionModel,
        notifier: &dyn Notifier,
        now: DateTime<Utc>,
    ) -> anyhow::Result<EvaluateReport> {
        let (matched, candidates) = self.candidates(now)?;

        log::info!(
            "{} stored postings matched, {} candidates after evaluation",
            matched,
            candidates.len()
        );

        let (top_k, max_workers) = {
            let config = self.config.read().unwrap();
            (config.corpus.top_k, config.feedback.max_workers)
        };

        let feedbacks = feedback::generate_all(&candidates, retriever, model, top_k, max_workers);
        let feedback_generated = feedbacks.len();

        let candidate_count = candidates.len();
        let digest = digest::assemble(candidates, feedbacks);

        let notified = match notifier.send(&digest) {
            Ok(confirmation) => {
                log::info!("digest delivered: {confirmation}");
                true
            }
            Err(err) => {
                log::error!("digest delivery failed: {err}");
                false
            }
        };

        Ok(EvaluateReport {
            matched,
            candidates: candidate_count,
            feedback_generated,
            notified,
        })
    }
}
