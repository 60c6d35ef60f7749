use std::collections::HashSet;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use regex::Regex;

use super::page_extract_and_normalize::normalize_line;
use super::patterns::BenchmarkPatterns;
use super::types::{OutlineEntry, TableOfContents, TocEntry, TocSource};

/// Outline first, front-matter scan second; an empty index is not an error.
pub(crate) fn extract_table_of_contents(
    patterns: &BenchmarkPatterns,
    outline: &[OutlineEntry],
    page_lines: &[Vec<String>],
    total_pages: u32,
    max_toc_pages: usize,
) -> TableOfContents {
    let from_outline = toc_from_outline(patterns, outline);
    if !from_outline.is_empty() {
        return TableOfContents {
            source: TocSource::Outline,
            total_pages,
            entries: from_outline,
        };
    }

    let scanned = toc_from_pattern_scan(patterns, page_lines, total_pages, max_toc_pages);
    let source = if scanned.is_empty() {
        TocSource::None
    } else {
        TocSource::PatternScan
    };

    TableOfContents {
        source,
        total_pages,
        entries: scanned,
    }
}

/// Maps outline bookmarks to index rows in outline order. A numbered title
/// overrides the bookmark depth with its own dotted depth.
pub(crate) fn toc_from_outline(
    patterns: &BenchmarkPatterns,
    outline: &[OutlineEntry],
) -> Vec<TocEntry> {
    outline
        .iter()
        .filter_map(|entry| {
            let normalized = normalize_line(&entry.title);
            let title = patterns.clean_toc_title(&normalized);
            if title.is_empty() {
                return None;
            }

            let id = patterns
                .relaxed_id(&normalized)
                .unwrap_or_default()
                .to_string();
            let level = if id.is_empty() {
                entry.level.max(1)
            } else {
                id_level(&id)
            };

            Some(TocEntry {
                level,
                id,
                title,
                page: entry.page,
            })
        })
        .collect()
}

/// Scans the first `max_toc_pages` pages for dot-leader lines
/// (`6.2.16 Title ....... 597`).
pub(crate) fn toc_from_pattern_scan(
    patterns: &BenchmarkPatterns,
    page_lines: &[Vec<String>],
    total_pages: u32,
    max_toc_pages: usize,
) -> Vec<TocEntry> {
    let last_page = max_toc_pages.min(total_pages as usize);
    let mut seen = HashSet::<(String, String)>::new();
    let mut entries = Vec::<TocEntry>::new();

    for page in page_lines.iter().take(last_page) {
        for raw in page {
            let line = normalize_line(raw);
            if patterns.looks_like_page_noise(&line) {
                continue;
            }

            let Some(candidate) = patterns.toc_line(&line) else {
                continue;
            };

            let title = patterns.clean_toc_title(candidate.title);
            if patterns.looks_like_page_noise(&title) {
                continue;
            }
            if !title.chars().any(char::is_alphabetic) {
                continue;
            }

            let Ok(page_number) = candidate.page.parse::<u32>() else {
                continue;
            };
            if page_number < 1 || page_number > total_pages {
                continue;
            }
            if !patterns.is_relaxed_id_shape(candidate.id) {
                continue;
            }

            let id = candidate.id.to_string();
            if !seen.insert((id.clone(), title.clone())) {
                continue;
            }

            entries.push(TocEntry {
                level: id_level(&id),
                id,
                title,
                page: page_number,
            });
        }
    }

    entries.sort_by(|left, right| {
        natural_id_key(&left.id)
            .cmp(&natural_id_key(&right.id))
            .then(left.page.cmp(&right.page))
    });
    entries
}

fn id_level(id: &str) -> u32 {
    1 + id.matches('.').count() as u32
}

/// Dotted-decimal sort key: `2.9` sorts before `2.10`.
pub(crate) fn natural_id_key(id: &str) -> Vec<u64> {
    id.split('.')
        .filter_map(|component| component.parse::<u64>().ok())
        .collect()
}

pub(crate) fn read_native_outline(pdf_path: &Path) -> Result<Vec<OutlineEntry>> {
    let output = Command::new("pdftohtml")
        .arg("-xml")
        .arg("-i")
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg("1")
        .arg(pdf_path)
        .arg("-stdout")
        .output()
        .with_context(|| format!("failed to execute pdftohtml for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftohtml returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    parse_outline_xml(&String::from_utf8_lossy(&output.stdout))
}

/// Walks the nested `<outline>` lists of pdftohtml's XML output; nesting depth
/// becomes the bookmark level. A missing page number reads as 0.
pub(crate) fn parse_outline_xml(xml: &str) -> Result<Vec<OutlineEntry>> {
    let token_regex = Regex::new(
        r#"(?s)(?P<open><outline\b[^>]*>)|(?P<close></outline>)|<item\b(?P<attrs>[^>]*)>(?P<title>.*?)</item>"#,
    )
    .context("failed to compile outline token regex")?;
    let page_regex =
        Regex::new(r#"\bpage="(\d+)""#).context("failed to compile outline page regex")?;
    let tag_regex = Regex::new(r"<[^>]+>").context("failed to compile markup regex")?;

    let mut depth = 0u32;
    let mut entries = Vec::<OutlineEntry>::new();

    for captures in token_regex.captures_iter(xml) {
        if captures.name("open").is_some() {
            depth += 1;
            continue;
        }
        if captures.name("close").is_some() {
            depth = depth.saturating_sub(1);
            continue;
        }

        let page = captures
            .name("attrs")
            .and_then(|attrs| page_regex.captures(attrs.as_str()))
            .and_then(|page| page.get(1))
            .and_then(|value| value.as_str().parse::<u32>().ok())
            .unwrap_or(0);
        let raw_title = captures
            .name("title")
            .map(|value| value.as_str())
            .unwrap_or("");
        let title = normalize_outline_label(&tag_regex.replace_all(raw_title, ""));

        entries.push(OutlineEntry {
            level: depth.max(1),
            title,
            page,
        });
    }

    Ok(entries)
}

fn normalize_outline_label(raw_label: &str) -> String {
    let decoded = raw_label
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace('\u{00a0}', " ")
        .replace("&amp;", "&");
    normalize_line(&decoded)
}
