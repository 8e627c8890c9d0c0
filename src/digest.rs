//! Digest assembly and rendering.
//!
//! Joins candidate postings with their generated feedback and renders the
//! notification body. Assembly is a pure left-outer join: a posting with no
//! feedback still appears in the digest, with an empty assessment.

use crate::feedback::Feedback;
use crate::postings::Posting;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DigestEntry {
    pub posting: Posting,
    pub feedback: String,
}

#[derive(Debug, Clone, Default)]
pub struct Digest {
    pub entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Left-outer-join postings to feedbacks on posting id.
///
/// Output order follows `postings` regardless of the order feedbacks were
/// completed in. Duplicated feedback for the same id keeps the last one.
pub fn assemble(postings: Vec<Posting>, feedbacks: Vec<Feedback>) -> Digest {
    let mut by_id: HashMap<u64, String> = feedbacks
        .into_iter()
        .map(|f| (f.posting_id, f.text))
        .collect();

    let entries = postings
        .into_iter()
        .map(|posting| {
            let feedback = by_id.remove(&posting.id).unwrap_or_default();
            DigestEntry { posting, feedback }
        })
        .collect();

    Digest { entries }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the digest as the job-card HTML email body.
pub fn render_html(digest: &Digest) -> String {
    let mut cards = String::new();

    for entry in &digest.entries {
        let posting = &entry.posting;
        cards.push_str(&format!(
            r#"    <div class="job-card">
      <h2 class="job-title">{title}</h2>
      <p><strong>Company:</strong> {company}</p>
      <p><strong>Location:</strong> {location}</p>
      <p class="job-details"><strong>Job Description:</strong></p>
      <p>{details}</p>
      <p class="job-details"><strong>HR Helper Feedback:</strong></p>
      <p>"{feedback}"</p>
      <p><strong>Link:</strong> <a class="job-link" href="{url}">{url}</a></p>
      <p class="job-keywords"><strong>Keywords:</strong> {keywords}</p>
    </div>
"#,
            title = escape_html(&posting.title),
            company = escape_html(&posting.company),
            location = escape_html(&posting.location),
            details = escape_html(&posting.details),
            feedback = escape_html(&entry.feedback),
            url = escape_html(&posting.url),
            keywords = escape_html(&posting.keywords.join(", ")),
        ));
    }

    format!(
        r#"<html>
  <head>
    <style>
      .job-card {{
        border: 1px solid #ccc;
        padding: 10px;
        margin-bottom: 20px;
      }}

      .job-title {{
        color: #333;
        margin-bottom: 10px;
      }}

      .job-details {{
        margin-bottom: 10px;
      }}

      .job-link {{
        color: blue;
        text-decoration: underline;
      }}

      .job-keywords {{
        margin-top: 10px;
      }}
    </style>
  </head>
  <body>
{cards}  </body>
</html>"#
    )
}
