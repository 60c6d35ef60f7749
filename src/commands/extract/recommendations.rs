use std::collections::BTreeMap;
use std::ops::Range;

use tracing::{debug, trace};

use super::page_extract_and_normalize::normalize_line;
use super::patterns::BenchmarkPatterns;
use super::types::{RecommendationRecord, SectionName, SegmentationOutcome};

/// Walks the filtered line stream once and emits one record per strict-id
/// line. Records without remediation or default-value text are counted as
/// discarded and left out of the result.
pub(crate) fn segment_recommendations(
    patterns: &BenchmarkPatterns,
    lines: &[String],
) -> SegmentationOutcome {
    let total = lines.len();
    let mut outcome = SegmentationOutcome::default();
    let mut current_index = 0usize;

    while current_index < total {
        let Some(id) = patterns.strict_id(&lines[current_index]) else {
            current_index += 1;
            continue;
        };
        outcome.found_count += 1;

        let title_end = capture_title_end(patterns, lines, current_index);
        let title = normalize_line(&lines[current_index..title_end].join(" "));
        let end_of_item = next_strict_id_or_end(patterns, lines, title_end);
        let headers = find_section_headers(patterns, lines, title_end, end_of_item);

        let sections = resolve_section_spans(&headers, end_of_item)
            .into_iter()
            .map(|(section, span)| (section, extract_block(lines, span)))
            .collect::<BTreeMap<SectionName, String>>();

        let record = RecommendationRecord {
            id: id.to_string(),
            title,
            sections,
        };

        if record.is_actionable() {
            trace!(id = %record.id, "kept recommendation");
            outcome.records.push(record);
            outcome.kept_count += 1;
        } else {
            debug!(
                id = %record.id,
                line = current_index,
                "discarded recommendation without remediation or default value"
            );
            outcome.discarded_count += 1;
        }

        debug_assert!(end_of_item > current_index);
        current_index = end_of_item;
    }

    outcome
}

/// Index one past the last title line: the title runs until a blank line, a
/// section header or another strict id.
fn capture_title_end(patterns: &BenchmarkPatterns, lines: &[String], id_index: usize) -> usize {
    let mut end = id_index + 1;
    while end < lines.len() {
        let line = lines[end].trim();
        if line.is_empty() || patterns.section_header(line).is_some() || patterns.is_strict_id(line)
        {
            break;
        }
        end += 1;
    }
    end
}

fn next_strict_id_or_end(patterns: &BenchmarkPatterns, lines: &[String], start: usize) -> usize {
    lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| patterns.is_strict_id(line))
        .map(|(index, _)| index)
        .unwrap_or(lines.len())
}

/// First header line of each section within `[start, end)`, ordered by
/// position.
pub(crate) fn find_section_headers(
    patterns: &BenchmarkPatterns,
    lines: &[String],
    start: usize,
    end: usize,
) -> Vec<(SectionName, usize)> {
    let mut headers = Vec::<(SectionName, usize)>::with_capacity(SectionName::ALL.len());

    for (index, line) in lines.iter().enumerate().take(end).skip(start) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if index != start && patterns.is_strict_id(line) {
            break;
        }
        let Some(section) = patterns.section_header(line) else {
            continue;
        };
        if headers.iter().all(|(seen, _)| *seen != section) {
            headers.push((section, index));
        }
    }

    headers
}

/// Text span for every present section except References. Remediation stops
/// at Default Value and Default Value stops at References when those headers
/// exist; everything else stops at the next header in document order.
pub(crate) fn resolve_section_spans(
    headers: &[(SectionName, usize)],
    end_of_item: usize,
) -> Vec<(SectionName, Range<usize>)> {
    let position_of = |wanted: SectionName| {
        headers
            .iter()
            .find(|(section, _)| *section == wanted)
            .map(|(_, index)| *index)
    };
    let naive_next = |slot: usize| {
        headers
            .get(slot + 1)
            .map(|(_, index)| *index)
            .unwrap_or(end_of_item)
    };

    headers
        .iter()
        .enumerate()
        .filter_map(|(slot, &(section, index))| {
            let end = match section {
                SectionName::References => return None,
                SectionName::Remediation => position_of(SectionName::DefaultValue)
                    .unwrap_or_else(|| naive_next(slot)),
                SectionName::DefaultValue => position_of(SectionName::References)
                    .unwrap_or_else(|| naive_next(slot)),
                _ => naive_next(slot),
            };
            Some((section, index + 1..end))
        })
        .collect()
}

fn extract_block(lines: &[String], span: Range<usize>) -> String {
    let end = span.end.min(lines.len());
    let Some(block) = lines.get(span.start..end) else {
        return String::new();
    };

    block
        .iter()
        .map(|line| normalize_line(line))
        .collect::<Vec<String>>()
        .join("\n")
        .trim()
        .to_string()
}
