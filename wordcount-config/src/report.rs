//! Human and machine readable renderings of a finished job.

use std::fmt::Write as _;

use serde::Serialize;
use wordcount_core::CountsTabulatedForDocuments;
use wordcount_model::{DocumentKey, ProcessingStatus};

#[derive(Debug, Serialize)]
pub struct RenderedReport<'a> {
    pub documents: Vec<DocumentLine<'a>>,
    pub total_words: u64,
    pub distinct_words: usize,
    pub words: Vec<WordLine>,
}

#[derive(Debug, Serialize)]
pub struct DocumentLine<'a> {
    pub document: &'a DocumentKey,
    pub status: ProcessingStatus,
}

#[derive(Debug, Serialize)]
pub struct WordLine {
    pub word: String,
    pub count: u64,
}

impl<'a> RenderedReport<'a> {
    /// `top` limits the word list; `None` keeps every word.
    pub fn new(report: &'a CountsTabulatedForDocuments, top: Option<usize>) -> Self {
        let documents = report
            .documents
            .iter()
            .map(|document| DocumentLine {
                document,
                status: report.status_of(document).unwrap_or_default(),
            })
            .collect();

        let ranked = report.counts.ranked();
        let limit = top.unwrap_or(ranked.len());
        let words = ranked
            .into_iter()
            .take(limit)
            .map(|(word, count)| WordLine { word, count })
            .collect();

        Self {
            documents,
            total_words: report.counts.total_words(),
            distinct_words: report.counts.len(),
            words,
        }
    }
}

pub fn render_json(report: &CountsTabulatedForDocuments) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&RenderedReport::new(report, None))
}

pub fn render_table(report: &CountsTabulatedForDocuments, top: usize) -> String {
    let rendered = RenderedReport::new(report, Some(top));
    let mut out = String::new();

    let doc_width = rendered
        .documents
        .iter()
        .map(|line| line.document.as_str().len())
        .max()
        .unwrap_or(0)
        .max("DOCUMENT".len());
    let _ = writeln!(out, "{:<doc_width$}  STATUS", "DOCUMENT");
    for line in &rendered.documents {
        let _ = writeln!(out, "{:<doc_width$}  {}", line.document.as_str(), line.status);
    }

    let word_width = rendered
        .words
        .iter()
        .map(|line| line.word.chars().count())
        .max()
        .unwrap_or(0)
        .max("WORD".len());
    let _ = writeln!(out);
    let _ = writeln!(out, "{:<word_width$}  COUNT", "WORD");
    for line in &rendered.words {
        let _ = writeln!(out, "{:<word_width$}  {}", line.word, line.count);
    }
    let _ = writeln!(
        out,
        "\n{} words, {} distinct",
        rendered.total_words, rendered.distinct_words
    );
    out
}
