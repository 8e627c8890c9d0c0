//! Corpus document loading from a local directory.
//!
//! Supported extensions: `.txt`/`.md` read as text, `.pdf` via pdf-extract,
//! `.docx` via docx-rs. Anything else is skipped. A file that fails to parse
//! is logged and skipped; the corpus must never take the pipeline down.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct RawDocument {
    pub path: PathBuf,
    pub text: String,
}

/// Load every supported document directly under `dir`.
///
/// A missing directory yields an empty corpus, matching the empty-index
/// contract downstream. Files are visited in name order so chunk ids are
/// stable across runs.
pub fn load_directory(dir: &Path) -> anyhow::Result<Vec<RawDocument>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log::warn!("corpus directory {}: {err}, continuing with empty corpus", dir.display());
            return Ok(vec![]);
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = vec![];
    for path in paths {
        match load_file(&path) {
            Ok(Some(text)) => {
                if text.trim().is_empty() {
                    log::warn!("{}: no extractable text, skipping", path.display());
                    continue;
                }
                documents.push(RawDocument { path, text });
            }
            Ok(None) => {
                log::debug!("{}: unsupported extension, skipping", path.display());
            }
            Err(err) => {
                log::warn!("{}: {err}, skipping", path.display());
            }
        }
    }

    log::info!("loaded {} corpus documents from {}", documents.len(), dir.display());

    Ok(documents)
}

/// Extract text from a single file. `Ok(None)` means the extension is not
/// supported.
fn load_file(path: &Path) -> anyhow::Result<Option<String>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    let text = match extension.as_str() {
        "txt" | "md" => std::fs::read_to_string(path)?,
        "pdf" => pdf_extract::extract_text(path)?,
        "docx" => extract_docx_text(path)?,
        _ => return Ok(None),
    };

    Ok(Some(text))
}

fn extract_docx_text(path: &Path) -> anyhow::Result<String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let buf = std::fs::read(path)?;
    let docx = docx_rs::read_docx(&buf)
        .map_err(|err| anyhow::anyhow!("docx parse failed: {err:?}"))?;

    let mut text = String::new();
    for child in docx.document.children {
        let DocumentChild::Paragraph(paragraph) = child else {
            continue;
        };

        for para_child in paragraph.children {
            let ParagraphChild::Run(run) = para_child else {
                continue;
            };

            for run_child in run.children {
                if let RunChild::Text(t) = run_child {
                    text.push_str(&t.text);
                }
            }
        }
        text.push('\n');
    }

    Ok(text)
}
