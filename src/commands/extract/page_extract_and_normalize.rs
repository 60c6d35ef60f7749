use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use tracing::debug;

use super::patterns::BenchmarkPatterns;
use super::types::DocumentLines;

const LINE_SEPARATOR: char = '\u{2028}';
const SOFT_HYPHEN: char = '\u{00AD}';
const PRIVATE_USE_BULLET: char = '\u{F0B7}';

/// Cleans one extracted line: separator and soft-hyphen artifacts, stray
/// bullet glyphs and whitespace runs all collapse to single spaces.
pub(crate) fn normalize_line(input: &str) -> String {
    let cleaned = input
        .chars()
        .filter(|character| *character != SOFT_HYPHEN)
        .map(|character| match character {
            LINE_SEPARATOR | PRIVATE_USE_BULLET => ' ',
            other => other,
        })
        .collect::<String>();

    cleaned.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FooterState {
    Normal,
    SkippingFooter,
}

/// Removes page-number footers and the "CIS Controls" footer block from one
/// page. State does not carry over between calls.
pub(crate) fn filter_page_noise<I>(patterns: &BenchmarkPatterns, lines: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut state = FooterState::Normal;
    let mut kept = Vec::new();

    for line in lines {
        if patterns.is_page_footer(&line) {
            continue;
        }

        if patterns.is_controls_footer_start(&line) {
            state = FooterState::SkippingFooter;
            continue;
        }

        if state == FooterState::SkippingFooter {
            if patterns.is_footer_block_token(&line) {
                continue;
            }
            state = FooterState::Normal;
        }

        kept.push(line);
    }

    kept
}

/// Builds the segmenter stream (normalized, filtered, blank line after each
/// page) alongside the raw per-page lines used by the index scan.
pub(crate) fn assemble_document_lines(
    patterns: &BenchmarkPatterns,
    pages: &[String],
) -> DocumentLines {
    let page_lines = pages
        .iter()
        .map(|page| page.lines().map(str::to_string).collect::<Vec<String>>())
        .collect::<Vec<Vec<String>>>();

    let mut lines = Vec::<String>::new();
    for page in &page_lines {
        let normalized = page.iter().map(|line| normalize_line(line));
        lines.extend(filter_page_noise(patterns, normalized));
        lines.push(String::new());
    }

    DocumentLines {
        lines,
        total_pages: u32::try_from(page_lines.len()).unwrap_or(u32::MAX),
        page_lines,
    }
}

/// Splits pdftotext output into pages. pdftotext ends every page with a form
/// feed, so the empty chunk after the final one is not a page.
pub(crate) fn split_pdftotext_pages(raw: &str) -> Vec<String> {
    let mut pages = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect::<Vec<String>>();

    if raw.ends_with('\u{000C}') || raw.is_empty() {
        pages.pop();
    }

    pages
}

pub(crate) fn collect_document_lines(
    patterns: &BenchmarkPatterns,
    pdf_path: &Path,
    max_pages: Option<usize>,
) -> Result<DocumentLines> {
    let pages = extract_pages_with_pdftotext(pdf_path, max_pages)?;
    let mut document = assemble_document_lines(patterns, &pages);

    // A capped read sees fewer pages than the document has; index page
    // numbers are still bounded by the full page count.
    if max_pages.is_some() {
        apply_document_page_count(&mut document, read_document_page_count(pdf_path)?);
    }

    debug!(
        path = %pdf_path.display(),
        pages = document.total_pages,
        pages_read = document.page_lines.len(),
        lines = document.lines.len(),
        "collected document lines"
    );

    Ok(document)
}

pub(crate) fn apply_document_page_count(document: &mut DocumentLines, page_count: u32) {
    document.total_pages = document.total_pages.max(page_count);
}

/// Reads the `Pages:` field of `pdfinfo` output.
pub(crate) fn parse_pdfinfo_page_count(stdout: &str) -> Option<u32> {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Pages:"))
        .and_then(|value| value.trim().parse::<u32>().ok())
}

fn read_document_page_count(pdf_path: &Path) -> Result<u32> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .with_context(|| format!("failed to execute pdfinfo for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdfinfo returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_pdfinfo_page_count(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("pdfinfo reported no page count for {}", pdf_path.display()))
}

fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8").arg("-f").arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    Ok(split_pdftotext_pages(&raw))
}
