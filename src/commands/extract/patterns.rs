use anyhow::{Context, Result};
use regex::Regex;

use super::page_extract_and_normalize::normalize_line;
use super::types::SectionName;

const FOOTER_BLOCK_TOKENS: [&str; 6] = [
    "controls",
    "version",
    "control",
    "ig 1 ig 2 ig 3",
    "v8",
    "v8\"",
];

/// A table-of-contents line split into its id, raw title and page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TocLineMatch<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) page: &'a str,
}

/// Anchor patterns shared by the segmenter, the noise filter and the index extractor.
#[derive(Debug)]
pub(crate) struct BenchmarkPatterns {
    strict_id: Regex,
    relaxed_id: Regex,
    relaxed_id_full: Regex,
    section_headers: Vec<(SectionName, Regex)>,
    page_footer_bar: Regex,
    page_footer_word: Regex,
    controls_footer: Regex,
    toc_dotted_line: Regex,
    toc_leader_suffix: Regex,
    page_noise: Regex,
}

impl BenchmarkPatterns {
    pub(crate) fn new() -> Result<Self> {
        let mut section_headers = Vec::with_capacity(SectionName::ALL.len());
        for section in SectionName::ALL {
            let pattern = format!(r"(?i)^{}:?$", regex::escape(section.label()));
            let regex = Regex::new(&pattern).with_context(|| {
                format!("failed to compile section header regex for {}", section.label())
            })?;
            section_headers.push((section, regex));
        }

        Ok(Self {
            strict_id: Regex::new(r"^(\d+(?:\.\d+)+)\b")
                .context("failed to compile strict id regex")?,
            relaxed_id: Regex::new(r"^(\d+(?:\.\d+){0,6})\b")
                .context("failed to compile relaxed id regex")?,
            relaxed_id_full: Regex::new(r"^\d+(?:\.\d+){0,6}$")
                .context("failed to compile relaxed id shape regex")?,
            section_headers,
            page_footer_bar: Regex::new(r"(?i)^\d+\s*\|\s*P\s*a\s*g\s*e$")
                .context("failed to compile page footer regex")?,
            page_footer_word: Regex::new(r"(?i)^Page\s+\d+$")
                .context("failed to compile page number regex")?,
            controls_footer: Regex::new(r"(?i)^CIS\s+Controls:?\s*$")
                .context("failed to compile controls footer regex")?,
            toc_dotted_line: Regex::new(r"^(\d+(?:\.\d+){0,6})\s+(.+?)\s*\.{2,}\s*(\d+)\s*$")
                .context("failed to compile table-of-contents line regex")?,
            toc_leader_suffix: Regex::new(r"\.{2,}\s*\d+\s*$")
                .context("failed to compile dot-leader regex")?,
            page_noise: Regex::new(r"(?i)\bP\s*a\s*g\s*e\b")
                .context("failed to compile page noise regex")?,
        })
    }

    /// Returns the dotted id (at least one dot) that opens a recommendation.
    pub(crate) fn strict_id<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.strict_id
            .captures(line.trim())
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
    }

    pub(crate) fn is_strict_id(&self, line: &str) -> bool {
        self.strict_id.is_match(line.trim())
    }

    pub(crate) fn relaxed_id<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.relaxed_id
            .captures(line.trim())
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str())
    }

    pub(crate) fn is_relaxed_id_shape(&self, value: &str) -> bool {
        self.relaxed_id_full.is_match(value)
    }

    pub(crate) fn section_header(&self, line: &str) -> Option<SectionName> {
        let line = line.trim();
        self.section_headers
            .iter()
            .find(|(_, regex)| regex.is_match(line))
            .map(|(section, _)| *section)
    }

    pub(crate) fn is_page_footer(&self, line: &str) -> bool {
        let line = line.trim();
        self.page_footer_bar.is_match(line) || self.page_footer_word.is_match(line)
    }

    pub(crate) fn is_controls_footer_start(&self, line: &str) -> bool {
        self.controls_footer.is_match(line.trim())
    }

    pub(crate) fn is_footer_block_token(&self, line: &str) -> bool {
        let lowered = line.trim().to_lowercase();
        FOOTER_BLOCK_TOKENS.contains(&lowered.as_str())
    }

    pub(crate) fn looks_like_page_noise(&self, text: &str) -> bool {
        let text = text.trim();
        text.is_empty() || self.page_noise.is_match(text)
    }

    pub(crate) fn toc_line<'a>(&self, line: &'a str) -> Option<TocLineMatch<'a>> {
        let captures = self.toc_dotted_line.captures(line)?;
        Some(TocLineMatch {
            id: captures.get(1)?.as_str(),
            title: captures.get(2)?.as_str(),
            page: captures.get(3)?.as_str(),
        })
    }

    /// Drops a trailing dot-leader with its page number and stray dots or spaces.
    pub(crate) fn clean_toc_title(&self, title: &str) -> String {
        let normalized = normalize_line(title);
        let without_leader = self.toc_leader_suffix.replace(&normalized, "");
        without_leader
            .trim_matches(|character| character == ' ' || character == '.')
            .to_string()
    }
}
