//! Retrieval-augmented feedback generation.
//!
//! For each candidate posting: retrieve the most relevant corpus chunks,
//! build a prompt around them and the posting, and ask the completion model
//! for a fit assessment. Each posting is independent, so the batch fans out
//! across a bounded pool of worker threads; a failed completion loses that
//! posting's feedback and nothing else.

use crate::corpus::{Chunk, CorpusError, Retriever};
use crate::openai::{CompletionError, CompletionModel};
use crate::postings::Posting;
use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Arc, Mutex};

/// A per-run assessment keyed to a posting. Never persisted; lives only
/// until the digest is assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub posting_id: u64,
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] CorpusError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),
}

/// Build the completion prompt from retrieved chunks and the posting.
fn build_prompt(chunks: &[Chunk], posting: &Posting) -> String {
    let mut prompt = String::from(
        "You are an HR assistant helping a candidate screen job postings. \
         Using the excerpts from the candidate's documents below, give a short \
         assessment of how well the candidate matches the posting: strengths, \
         gaps, and whether applying is worthwhile.\n\n",
    );

    if chunks.is_empty() {
        prompt.push_str("Candidate documents: (none available)\n\n");
    } else {
        prompt.push_str("Candidate documents:\n");
        for chunk in chunks {
            prompt.push_str(&chunk.text);
            prompt.push_str("\n---\n");
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "Job posting:\n{} at {}\n{}\n",
        posting.title, posting.company, posting.details
    ));

    prompt
}

/// Generate feedback for a single posting. Independent per call; no shared
/// mutable state.
pub fn generate_feedback(
    posting: &Posting,
    retriever: &dyn Retriever,
    model: &dyn CompletionModel,
    top_k: usize,
) -> Result<Feedback, FeedbackError> {
    let chunks = retriever.retrieve(&posting.details, top_k)?;
    let prompt = build_prompt(&chunks, posting);
    let text = model.complete(&prompt)?;

    Ok(Feedback {
        posting_id: posting.id,
        text,
    })
}

/// Generate feedback for a whole batch with bounded concurrency.
///
/// Completion order is irrelevant — the digest joins by posting id. A
/// posting whose generation fails is logged and dropped from the result;
/// the batch always completes.
pub fn generate_all(
    postings: &[Posting],
    retriever: &dyn Retriever,
    model: &dyn CompletionModel,
    top_k: usize,
    max_workers: usize,
) -> Vec<Feedback> {
    if postings.is_empty() {
        return vec![];
    }

    let workers = max_workers.max(1).min(postings.len());

    let (job_tx, job_rx) = mpsc::channel::<&Posting>();
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = mpsc::channel::<Feedback>();

    for posting in postings {
        // receiver outlives all sends within this function
        job_tx.send(posting).expect("job channel open");
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();

            scope.spawn(move || loop {
                let posting = match job_rx.lock().unwrap().recv() {
                    Ok(posting) => posting,
                    Err(_) => break,
                };

                match generate_feedback(posting, retriever, model, top_k) {
                    Ok(feedback) => {
                        log::debug!("feedback generated for posting {}", posting.id);
                        let _ = result_tx.send(feedback);
                    }
                    Err(err) => {
                        log::warn!(
                            "posting {} ({}): feedback generation failed: {err}, skipping",
                            posting.id,
                            posting.title
                        );
                    }
                }
            });
        }

        drop(result_tx);
    });

    let feedbacks: Vec<Feedback> = result_rx.iter().collect();

    log::info!(
        "generated feedback for {}/{} postings",
        feedbacks.len(),
        postings.len()
    );

    feedbacks
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Retriever with no corpus behind it.
    struct EmptyRetriever;

    impl Retriever for EmptyRetriever {
        fn retrieve(&self, _text: &str, _k: usize) -> Result<Vec<Chunk>, CorpusError> {
            Ok(vec![])
        }
    }

    struct CannedModel;

    impl CompletionModel for CannedModel {
        fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            assert!(prompt.contains("Job posting:"));
            Ok("looks like a fit".to_string())
        }
    }

    struct FailingModel;

    impl CompletionModel for FailingModel {
        fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Network("connection refused".into()))
        }
    }

    /// Completion model that fails for one specific posting's details.
    struct SelectiveModel {
        poison: String,
    }

    impl CompletionModel for SelectiveModel {
        fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            if prompt.contains(&self.poison) {
                return Err(CompletionError::Api("rate limited".into()));
            }
            Ok("ok".to_string())
        }
    }

    fn posting(id: u64, details: &str) -> Posting {
        Posting {
            id,
            title: format!("Posting {id}"),
            company: "Acme".to_string(),
            details: details.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_prompt_includes_posting() {
        let posting = posting(7, "Junior Rust developer");
        let prompt = build_prompt(&[], &posting);
        assert!(prompt.contains("Junior Rust developer"));
        assert!(prompt.contains("(none available)"));
    }

    #[test]
    fn test_generate_feedback_keys_by_posting_id() {
        let posting = posting(42, "some role");
        let feedback = generate_feedback(&posting, &EmptyRetriever, &CannedModel, 4).unwrap();
        assert_eq!(feedback.posting_id, 42);
        assert_eq!(feedback.text, "looks like a fit");
    }

    #[test]
    fn test_generate_all_skips_failures() {
        let postings = vec![
            posting(1, "good job"),
            posting(2, "poison job"),
            posting(3, "fine job"),
        ];
        let model = SelectiveModel {
            poison: "poison job".to_string(),
        };

        let feedbacks = generate_all(&postings, &EmptyRetriever, &model, 4, 2);

        let ids: Vec<u64> = feedbacks.iter().map(|f| f.posting_id).collect();
        assert_eq!(feedbacks.len(), 2);
        assert!(ids.contains(&1));
        assert!(ids.contains(&3));
        assert!(!ids.contains(&2));
    }

    #[test]
    fn test_generate_all_total_failure_yields_empty() {
        let postings = vec![posting(1, "a"), posting(2, "b")];

        let feedbacks = generate_all(&postings, &EmptyRetriever, &FailingModel, 4, 2);
        assert!(feedbacks.is_empty());
    }

    #[test]
    fn test_generate_all_empty_batch() {
        let feedbacks = generate_all(&[], &EmptyRetriever, &CannedModel, 4, 2);
        assert!(feedbacks.is_empty());
    }

    #[test]
    fn test_generate_all_more_workers_than_postings() {
        let postings = vec![posting(1, "only one")];
        let feedbacks = generate_all(&postings, &EmptyRetriever, &CannedModel, 4, 16);
        assert_eq!(feedbacks.len(), 1);
    }
}
