use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::anyhow;
use clap::Parser;

mod app;
mod cli;
mod config;
mod corpus;
mod dedupe;
mod digest;
mod evaluate;
mod feedback;
mod notify;
mod openai;
mod postings;
mod scrape;
#[cfg(test)]
mod tests;

use app::App;
use config::Config;
use corpus::{CorpusIndex, EmbeddingModel, TextSplitter};
use notify::{Notifier, SmtpNotifier, StdoutNotifier};
use openai::OpenAiClient;
use postings::BackendCsv;
use scrape::BoardScraper;

fn default_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("JOBHOUND_HOME") {
        return Ok(PathBuf::from(home));
    }

    let home = homedir::my_home()?
        .ok_or_else(|| anyhow!("couldnt determine home directory, set JOBHOUND_HOME"))?;

    Ok(home.join(".jobhound"))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = match args.data_dir {
        Some(dir) => PathBuf::from(dir),
        None => default_data_dir()?,
    };
    let base_path = base_path
        .to_str()
        .ok_or_else(|| anyhow!("data dir is not valid utf8"))?
        .to_string();

    let config = Arc::new(RwLock::new(Config::load_with(&base_path)?));

    let postings_path = config.read().unwrap().postings_path();
    let store = Arc::new(BackendCsv::load(
        postings_path
            .to_str()
            .ok_or_else(|| anyhow!("postings path is not valid utf8"))?,
    )?);

    let app = App::new(store, config.clone());

    match args.command {
        cli::Command::Scrape {} => {
            let report = scrape_stage(&app)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        cli::Command::Evaluate { dry_run } => {
            let report = evaluate_stage(&app, dry_run)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }

        cli::Command::Run { dry_run } => {
            let scrape_report = scrape_stage(&app)?;
            println!("{}", serde_json::to_string_pretty(&scrape_report)?);

            let evaluate_report = evaluate_stage(&app, dry_run)?;
            println!("{}", serde_json::to_string_pretty(&evaluate_report)?);
            Ok(())
        }
    }
}

fn scrape_stage(app: &App) -> anyhow::Result<app::ScrapeReport> {
    let (scrape_config, vocabulary) = {
        let config = app.config();
        let config = config.read().unwrap();
        (config.scrape.clone(), config.keyword_vocabulary.clone())
    };

    let scraper = BoardScraper::new(scrape_config, vocabulary);

    app.run_scrape(&scraper)
}

fn evaluate_stage(app: &App, dry_run: bool) -> anyhow::Result<app::EvaluateReport> {
    let (corpus_config, feedback_config, mail_config, corpus_dir, base_path) = {
        let config = app.config();
        let config = config.read().unwrap();
        (
            config.corpus.clone(),
            config.feedback.clone(),
            config.mail.clone(),
            config.corpus_dir(),
            config.base_path().to_path_buf(),
        )
    };

    let documents = corpus::load_directory(&corpus_dir)?;

    let embedding_model = EmbeddingModel::new(
        &corpus_config.model,
        base_path,
        Some(Duration::from_secs(corpus_config.download_timeout_secs)),
    )?;

    let splitter = TextSplitter::new(corpus_config.chunk_size, corpus_config.chunk_overlap);
    let index = CorpusIndex::build(embedding_model, &documents, &splitter)?;

    let llm = OpenAiClient::from_env()?.with_model(feedback_config.model);

    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(StdoutNotifier)
    } else {
        Box::new(SmtpNotifier::new(mail_config))
    };

    app.run_evaluate(&index, &llm, notifier.as_ref(), chrono::Utc::now())
}
