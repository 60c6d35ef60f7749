use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use tracing::{debug, warn};

use crate::util::{ensure_directory, write_json_pretty, write_text_file};

use super::types::{RecommendationExport, RecommendationRecord, SectionName, TableOfContents};

const RECOMMENDATION_CSV_HEADER: [&str; 9] = [
    "ID",
    "Title",
    "Profile Applicability",
    "Description",
    "Rationale",
    "Impact",
    "Audit",
    "Remediation",
    "Default Value",
];
const TOC_CSV_HEADER: [&str; 4] = ["Level", "ID", "Title", "Page"];

pub(crate) fn write_recommendations_json(path: &Path, records: &[RecommendationRecord]) -> Result<()> {
    let rows = records
        .iter()
        .map(RecommendationExport::from)
        .collect::<Vec<RecommendationExport<'_>>>();
    write_json_pretty(path, &rows)
}

pub(crate) fn write_toc_json(path: &Path, toc: &TableOfContents) -> Result<()> {
    write_json_pretty(path, toc)
}

/// Writes `<id>.md` per record and returns how many distinct files exist.
/// A repeated id keeps the last record's file.
pub(crate) fn write_markdown_files(dir: &Path, records: &[RecommendationRecord]) -> Result<usize> {
    ensure_directory(dir)?;

    let mut written = HashSet::<String>::new();
    for record in records {
        let file_stem = safe_file_stem(&record.id);
        if file_stem.is_empty() {
            warn!(title = %record.title, "skipping markdown for recommendation without id");
            continue;
        }

        let path = dir.join(format!("{file_stem}.md"));
        write_text_file(&path, &render_markdown(record))?;
        if written.insert(file_stem) {
            debug!(path = %path.display(), "wrote markdown recommendation");
        } else {
            warn!(
                id = %record.id,
                path = %path.display(),
                "repeated recommendation id overwrote markdown file"
            );
        }
    }

    Ok(written.len())
}

pub(crate) fn render_markdown(record: &RecommendationRecord) -> String {
    let mut lines = vec![format!("# {} - {}", record.id, record.title), String::new()];

    for section in SectionName::EXPORTED {
        let content = record.section(section).trim();
        if content.is_empty() {
            continue;
        }
        lines.push(format!("## {}", section.label()));
        lines.push(String::new());
        lines.push(content.to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}

fn safe_file_stem(id: &str) -> String {
    let mut out = id
        .chars()
        .map(|ch| if ch.is_ascii_digit() || ch == '.' { ch } else { '_' })
        .collect::<String>();

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    out.trim_matches('_').to_string()
}

pub(crate) fn write_recommendations_csv(path: &Path, records: &[RecommendationRecord]) -> Result<()> {
    let mut rows = vec![
        RECOMMENDATION_CSV_HEADER
            .iter()
            .map(|cell| cell.to_string())
            .collect::<Vec<String>>(),
    ];

    for record in records {
        let row = RecommendationExport::from(record);
        rows.push(
            [
                row.id,
                row.title,
                row.profile_applicability,
                row.description,
                row.rationale,
                row.impact,
                row.audit,
                row.remediation,
                row.default_value,
            ]
            .iter()
            .map(|cell| cell.to_string())
            .collect(),
        );
    }

    write_text_file(path, &format!("{}\n", table_to_csv(&rows)))
}

pub(crate) fn write_toc_csv(path: &Path, toc: &TableOfContents) -> Result<()> {
    let mut rows = vec![
        TOC_CSV_HEADER
            .iter()
            .map(|cell| cell.to_string())
            .collect::<Vec<String>>(),
    ];

    for entry in &toc.entries {
        rows.push(vec![
            entry.level.to_string(),
            entry.id.clone(),
            entry.title.clone(),
            entry.page.to_string(),
        ]);
    }

    write_text_file(path, &format!("{}\n", table_to_csv(&rows)))
}

pub(crate) fn table_to_csv(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| escape_csv_cell(cell))
                .collect::<Vec<String>>()
                .join(",")
        })
        .collect::<Vec<String>>()
        .join("\n")
}

fn escape_csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
