use std::collections::BTreeMap;

use serde::Serialize;

/// Named subsections of a recommendation, in the order they are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum SectionName {
    ProfileApplicability,
    Description,
    Rationale,
    Impact,
    Audit,
    Remediation,
    DefaultValue,
    References,
}

impl SectionName {
    pub(crate) const ALL: [SectionName; 8] = [
        SectionName::ProfileApplicability,
        SectionName::Description,
        SectionName::Rationale,
        SectionName::Impact,
        SectionName::Audit,
        SectionName::Remediation,
        SectionName::DefaultValue,
        SectionName::References,
    ];

    /// Sections carried into output; References only bounds Default Value.
    pub(crate) const EXPORTED: [SectionName; 7] = [
        SectionName::ProfileApplicability,
        SectionName::Description,
        SectionName::Rationale,
        SectionName::Impact,
        SectionName::Audit,
        SectionName::Remediation,
        SectionName::DefaultValue,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            SectionName::ProfileApplicability => "Profile Applicability",
            SectionName::Description => "Description",
            SectionName::Rationale => "Rationale",
            SectionName::Impact => "Impact",
            SectionName::Audit => "Audit",
            SectionName::Remediation => "Remediation",
            SectionName::DefaultValue => "Default Value",
            SectionName::References => "References",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecommendationRecord {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) sections: BTreeMap<SectionName, String>,
}

impl RecommendationRecord {
    pub(crate) fn section(&self, name: SectionName) -> &str {
        self.sections.get(&name).map(String::as_str).unwrap_or("")
    }

    /// True when the record carries remediation or default-value text.
    pub(crate) fn is_actionable(&self) -> bool {
        !self.section(SectionName::Remediation).is_empty()
            || !self.section(SectionName::DefaultValue).is_empty()
    }
}

/// Flat, serializable view of a record in output column order.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecommendationExport<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) profile_applicability: &'a str,
    pub(crate) description: &'a str,
    pub(crate) rationale: &'a str,
    pub(crate) impact: &'a str,
    pub(crate) audit: &'a str,
    pub(crate) remediation: &'a str,
    pub(crate) default_value: &'a str,
}

impl<'a> From<&'a RecommendationRecord> for RecommendationExport<'a> {
    fn from(record: &'a RecommendationRecord) -> Self {
        Self {
            id: &record.id,
            title: &record.title,
            profile_applicability: record.section(SectionName::ProfileApplicability),
            description: record.section(SectionName::Description),
            rationale: record.section(SectionName::Rationale),
            impact: record.section(SectionName::Impact),
            audit: record.section(SectionName::Audit),
            remediation: record.section(SectionName::Remediation),
            default_value: record.section(SectionName::DefaultValue),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SegmentationOutcome {
    pub(crate) records: Vec<RecommendationRecord>,
    pub(crate) found_count: usize,
    pub(crate) kept_count: usize,
    pub(crate) discarded_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TocEntry {
    pub(crate) level: u32,
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum TocSource {
    Outline,
    PatternScan,
    None,
}

impl TocSource {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            TocSource::Outline => "outline",
            TocSource::PatternScan => "pattern_scan",
            TocSource::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct TableOfContents {
    pub(crate) source: TocSource,
    pub(crate) total_pages: u32,
    pub(crate) entries: Vec<TocEntry>,
}

/// One bookmark from the document's native outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutlineEntry {
    pub(crate) level: u32,
    pub(crate) title: String,
    pub(crate) page: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DocumentLines {
    /// Normalized, noise-filtered lines with a blank line after every page.
    pub(crate) lines: Vec<String>,
    /// Raw lines per page, unfiltered.
    pub(crate) page_lines: Vec<Vec<String>>,
    pub(crate) total_pages: u32,
}
