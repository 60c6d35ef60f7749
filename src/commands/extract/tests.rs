use std::fs;

use chrono::Utc;
use rusqlite::Connection;

use crate::model::PdfEntry;

use super::db_setup::{count_rows, ensure_schema, store_benchmark};
use super::ids_and_outline::{
    extract_table_of_contents, natural_id_key, parse_outline_xml, toc_from_outline,
    toc_from_pattern_scan,
};
use super::output_writers::{render_markdown, table_to_csv, write_markdown_files};
use super::page_extract_and_normalize::{
    apply_document_page_count, assemble_document_lines, filter_page_noise, normalize_line,
    parse_pdfinfo_page_count, split_pdftotext_pages,
};
use super::patterns::BenchmarkPatterns;
use super::recommendations::{find_section_headers, resolve_section_spans, segment_recommendations};
use super::tools_and_manifest::doc_id_for;
use super::types::{OutlineEntry, SectionName, TocEntry, TocSource};

fn patterns() -> BenchmarkPatterns {
    BenchmarkPatterns::new().expect("benchmark patterns should compile")
}

fn owned(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

fn pages(pages: &[&[&str]]) -> Vec<Vec<String>> {
    pages.iter().map(|page| owned(page)).collect()
}

#[test]
fn normalize_line_strips_extraction_artifacts() {
    assert_eq!(normalize_line("  Ensure\u{00AD}d   the\tthing  "), "Ensured the thing");
    assert_eq!(normalize_line("first\u{2028}second"), "first second");
    assert_eq!(normalize_line("\u{F0B7} Level 1 \u{F0B7}\u{F0B7}  Server"), "Level 1 Server");
    assert_eq!(normalize_line("   "), "");
}

#[test]
fn patterns_distinguish_strict_and_relaxed_ids() {
    let patterns = patterns();
    assert_eq!(patterns.strict_id("2.1.1 Ensure X"), Some("2.1.1"));
    assert_eq!(patterns.strict_id("2 Services"), None);
    assert_eq!(patterns.relaxed_id("2 Services"), Some("2"));
    assert!(patterns.is_relaxed_id_shape("6.2.16"));
    assert!(!patterns.is_relaxed_id_shape("6.2."));
}

#[test]
fn section_headers_match_whole_line_with_optional_colon() {
    let patterns = patterns();
    assert_eq!(patterns.section_header("Default Value:"), Some(SectionName::DefaultValue));
    assert_eq!(patterns.section_header("remediation"), Some(SectionName::Remediation));
    assert_eq!(
        patterns.section_header("PROFILE APPLICABILITY:"),
        Some(SectionName::ProfileApplicability)
    );
    assert_eq!(patterns.section_header("Audit the configuration:"), None);
}

#[test]
fn filter_page_noise_drops_page_footers() {
    let patterns = patterns();
    let filtered = filter_page_noise(
        &patterns,
        owned(&["body", "21 | P a g e", "Page 4", "12|Page", "more body"]),
    );
    assert_eq!(filtered, owned(&["body", "more body"]));
}

#[test]
fn filter_page_noise_skips_controls_footer_block_until_first_other_line() {
    let patterns = patterns();
    let filtered = filter_page_noise(
        &patterns,
        owned(&[
            "Audit:",
            "CIS Controls:",
            "Controls",
            "Version",
            "21 | P a g e",
            "IG 1 IG 2 IG 3",
            "v8",
            "4.8 Uninstall or Disable Unnecessary Services",
            "v8",
        ]),
    );
    assert_eq!(
        filtered,
        owned(&[
            "Audit:",
            "4.8 Uninstall or Disable Unnecessary Services",
            "v8",
        ])
    );
}

#[test]
fn split_pdftotext_pages_drops_chunk_after_final_form_feed() {
    assert_eq!(
        split_pdftotext_pages("page one\n\u{000C}page two\u{0000}\n\u{000C}"),
        vec!["page one\n".to_string(), "page two\n".to_string()]
    );
    assert!(split_pdftotext_pages("").is_empty());
}

#[test]
fn assemble_document_lines_filters_per_page_and_separates_pages() {
    let patterns = patterns();
    let document = assemble_document_lines(
        &patterns,
        &["Remediation:\ncmd 1\n7 | P a g e\n".to_string(), "cmd  2\n".to_string()],
    );

    assert_eq!(document.total_pages, 2);
    assert_eq!(document.lines, owned(&["Remediation:", "cmd 1", "", "cmd 2", ""]));
    assert_eq!(document.page_lines[0][2], "7 | P a g e");
}

#[test]
fn parse_pdfinfo_page_count_reads_pages_field() {
    let stdout = "Title:           CIS Oracle Linux 7 Benchmark\nProducer:        Microsoft Word\nPages:           600\nEncrypted:       no\n";
    assert_eq!(parse_pdfinfo_page_count(stdout), Some(600));
    assert_eq!(parse_pdfinfo_page_count("Title: none\n"), None);
}

#[test]
fn capped_read_keeps_index_entries_beyond_last_read_page() {
    let patterns = patterns();
    let mut document = assemble_document_lines(
        &patterns,
        &[
            "Table of Contents\n6.2.16 Title of control ....... 597\n".to_string(),
            "Overview\n".to_string(),
        ],
    );
    assert_eq!(document.total_pages, 2);

    apply_document_page_count(&mut document, 600);
    assert_eq!(document.total_pages, 600);
    assert_eq!(document.page_lines.len(), 2);

    let toc = extract_table_of_contents(
        &patterns,
        &[],
        &document.page_lines,
        document.total_pages,
        60,
    );
    assert_eq!(toc.source, TocSource::PatternScan);
    assert_eq!(toc.total_pages, 600);
    assert_eq!(
        toc.entries,
        vec![TocEntry {
            level: 3,
            id: "6.2.16".to_string(),
            title: "Title of control".to_string(),
            page: 597,
        }]
    );
}

#[test]
fn apply_document_page_count_never_shrinks_read_pages() {
    let patterns = patterns();
    let mut document =
        assemble_document_lines(&patterns, &["a\n".to_string(), "b\n".to_string()]);
    apply_document_page_count(&mut document, 1);
    assert_eq!(document.total_pages, 2);
}

#[test]
fn segmenter_bounds_record_before_next_id() {
    let patterns = patterns();
    let lines = owned(&[
        "2.1.1 Ensure X",
        "Description:",
        "line A",
        "Remediation:",
        "cmd 1",
        "Default Value:",
        "N/A",
        "2.1.2 Ensure Y",
        "Description:",
        "narrative only",
    ]);

    let outcome = segment_recommendations(&patterns, &lines);

    assert_eq!(outcome.found_count, 2);
    assert_eq!(outcome.kept_count, 1);
    assert_eq!(outcome.discarded_count, 1);
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.id, "2.1.1");
    assert_eq!(record.title, "2.1.1 Ensure X");
    assert_eq!(record.section(SectionName::Description), "line A");
    assert_eq!(record.section(SectionName::Remediation), "cmd 1");
    assert_eq!(record.section(SectionName::DefaultValue), "N/A");
    assert_eq!(record.section(SectionName::Audit), "");
}

#[test]
fn segmenter_joins_wrapped_title_and_stops_sections_at_next_header() {
    let patterns = patterns();
    let lines = owned(&[
        "1.1.1 Ensure cramfs kernel module is",
        "not available (Automated)",
        "Profile Applicability:",
        "• Level 1 - Server",
        "Rationale:",
        "Removing support reduces the attack surface.",
        "Audit:",
        "# lsmod | grep cramfs",
        "Remediation:",
        "# modprobe -r cramfs",
        "References:",
        "1. NIST SP 800-53",
    ]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(
        record.title,
        "1.1.1 Ensure cramfs kernel module is not available (Automated)"
    );
    assert_eq!(record.section(SectionName::ProfileApplicability), "• Level 1 - Server");
    assert_eq!(
        record.section(SectionName::Rationale),
        "Removing support reduces the attack surface."
    );
    assert_eq!(record.section(SectionName::Audit), "# lsmod | grep cramfs");
    assert_eq!(record.section(SectionName::Remediation), "# modprobe -r cramfs");
    assert!(!record.sections.contains_key(&SectionName::References));
}

#[test]
fn segmenter_title_stops_at_blank_line() {
    let patterns = patterns();
    let lines = owned(&["6.1 Short title", "", "stray text", "Remediation:", "fix"]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.records[0].title, "6.1 Short title");
    assert_eq!(outcome.records[0].section(SectionName::Remediation), "fix");
}

#[test]
fn remediation_never_reaches_default_value_header() {
    let patterns = patterns();
    let lines = owned(&[
        "3.3 Ensure logging",
        "Remediation:",
        "step one",
        "",
        "step two",
        "Default Value:",
        "disabled",
        "Impact:",
        "none",
    ]);

    let outcome = segment_recommendations(&patterns, &lines);
    let record = &outcome.records[0];
    assert_eq!(record.section(SectionName::Remediation), "step one\n\nstep two");
    assert_eq!(record.section(SectionName::DefaultValue), "disabled");
    assert_eq!(record.section(SectionName::Impact), "none");
}

#[test]
fn default_value_ahead_of_remediation_leaves_remediation_empty() {
    let patterns = patterns();
    let lines = owned(&[
        "1.2 Odd ordering",
        "Default Value:",
        "dv",
        "Remediation:",
        "fix",
        "References:",
        "ref",
    ]);

    let outcome = segment_recommendations(&patterns, &lines);
    let record = &outcome.records[0];
    assert_eq!(record.section(SectionName::Remediation), "");
    assert_eq!(record.section(SectionName::DefaultValue), "dv\nRemediation:\nfix");
}

#[test]
fn record_with_only_references_is_discarded() {
    let patterns = patterns();
    let lines = owned(&["3.1 Narrative", "Description:", "text", "References:", "1. CIS"]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.found_count, 1);
    assert_eq!(outcome.kept_count, 0);
    assert_eq!(outcome.discarded_count, 1);
    assert!(outcome.records.is_empty());
}

#[test]
fn empty_default_value_is_kept_when_remediation_has_text() {
    let patterns = patterns();
    let lines = owned(&[
        "3.2 Ensure Y",
        "Remediation:",
        "fix it",
        "Default Value:",
        "",
        "References:",
        "https://example.invalid",
    ]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.kept_count, 1);
    assert_eq!(outcome.records[0].section(SectionName::Remediation), "fix it");
    assert_eq!(outcome.records[0].section(SectionName::DefaultValue), "");
}

#[test]
fn trailing_default_value_runs_to_end_of_document() {
    let patterns = patterns();
    let lines = owned(&["5.1 Last control", "Default Value:", "final text", "", "appendix"]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(
        outcome.records[0].section(SectionName::DefaultValue),
        "final text\n\nappendix"
    );
}

#[test]
fn page_footer_leaves_no_gap_in_section_text() {
    let patterns = patterns();
    let page = filter_page_noise(
        &patterns,
        owned(&["4.1 Ensure Z", "Remediation:", "step one", "21 | P a g e", "step two"]),
    );

    let outcome = segment_recommendations(&patterns, &page);
    assert_eq!(
        outcome.records[0].section(SectionName::Remediation),
        "step one\nstep two"
    );
}

#[test]
fn consecutive_ids_terminate_without_records() {
    let patterns = patterns();
    let lines = owned(&["1.1", "1.2", "1.3 Title", "plain", "1.4"]);

    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.found_count, 4);
    assert_eq!(outcome.discarded_count, 4);
}

#[test]
fn segmenter_is_deterministic() {
    let patterns = patterns();
    let lines = owned(&[
        "intro",
        "2.1 A",
        "Remediation:",
        "a",
        "2.2 B",
        "Default Value:",
        "b",
    ]);

    let first = segment_recommendations(&patterns, &lines);
    let second = segment_recommendations(&patterns, &lines);
    assert_eq!(first, second);
    assert_eq!(first.kept_count, 2);
}

#[test]
fn section_spans_follow_document_order() {
    let patterns = patterns();
    let lines = owned(&[
        "Audit:",
        "a",
        "Description:",
        "d",
        "Remediation:",
        "r",
        "Description:",
        "ignored duplicate",
    ]);

    let headers = find_section_headers(&patterns, &lines, 0, lines.len());
    assert_eq!(
        headers,
        vec![
            (SectionName::Audit, 0),
            (SectionName::Description, 2),
            (SectionName::Remediation, 4),
        ]
    );

    let spans = resolve_section_spans(&headers, lines.len());
    assert_eq!(
        spans,
        vec![
            (SectionName::Audit, 1..2),
            (SectionName::Description, 3..4),
            (SectionName::Remediation, 5..8),
        ]
    );
}

#[test]
fn toc_scan_reads_dot_leader_lines() {
    let patterns = patterns();
    let page_lines = pages(&[&[
        "Table of Contents",
        "6.2.16 Title of control ....... 597",
        "6.2.17 Title of control",
    ]]);

    let entries = toc_from_pattern_scan(&patterns, &page_lines, 600, 60);
    assert_eq!(
        entries,
        vec![TocEntry {
            level: 3,
            id: "6.2.16".to_string(),
            title: "Title of control".to_string(),
            page: 597,
        }]
    );
}

#[test]
fn toc_scan_sorts_ids_naturally() {
    let patterns = patterns();
    let page_lines = pages(&[&[
        "2.10 Ten ........ 5",
        "2.9 Nine ........ 5",
        "2.2 Two ........ 5",
    ]]);

    let entries = toc_from_pattern_scan(&patterns, &page_lines, 10, 60);
    let ids = entries
        .iter()
        .map(|entry| entry.id.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(ids, vec!["2.2", "2.9", "2.10"]);
    assert_eq!(natural_id_key("2.10"), vec![2, 10]);
}

#[test]
fn toc_scan_rejects_noise_and_out_of_range_rows() {
    let patterns = patterns();
    let page_lines = pages(&[
        &[
            "1.1 Beyond the document ..... 999",
            "3 P a g e ..... 4",
            "1.2 2019 ..... 5",
            "1.3 Kept entry ..... 6",
        ],
        &["1.3 Kept entry ..... 6", "1 Initial Setup ..... 7"],
        &["1.4 Outside window ..... 8"],
    ]);

    let entries = toc_from_pattern_scan(&patterns, &page_lines, 10, 2);
    assert_eq!(
        entries,
        vec![
            TocEntry {
                level: 1,
                id: "1".to_string(),
                title: "Initial Setup".to_string(),
                page: 7,
            },
            TocEntry {
                level: 2,
                id: "1.3".to_string(),
                title: "Kept entry".to_string(),
                page: 6,
            },
        ]
    );
}

#[test]
fn toc_from_outline_derives_levels_from_ids() {
    let patterns = patterns();
    let outline = vec![
        OutlineEntry {
            level: 1,
            title: "1 Initial Setup".to_string(),
            page: 10,
        },
        OutlineEntry {
            level: 1,
            title: "1.1.2 Configure /tmp".to_string(),
            page: 12,
        },
        OutlineEntry {
            level: 0,
            title: "Appendix: Summary Table".to_string(),
            page: 300,
        },
        OutlineEntry {
            level: 2,
            title: "  ".to_string(),
            page: 5,
        },
    ];

    let entries = toc_from_outline(&patterns, &outline);
    assert_eq!(entries.len(), 3);
    assert_eq!((entries[0].level, entries[0].id.as_str()), (1, "1"));
    assert_eq!(entries[0].title, "1 Initial Setup");
    assert_eq!((entries[1].level, entries[1].id.as_str()), (3, "1.1.2"));
    assert_eq!((entries[2].level, entries[2].id.as_str()), (1, ""));
    assert_eq!(entries[2].page, 300);
}

#[test]
fn extract_table_of_contents_prefers_outline_then_falls_back() {
    let patterns = patterns();
    let page_lines = pages(&[&["1.1 Scanned ..... 2"]]);
    let outline = vec![OutlineEntry {
        level: 1,
        title: "2 Services".to_string(),
        page: 3,
    }];

    let from_outline = extract_table_of_contents(&patterns, &outline, &page_lines, 3, 60);
    assert_eq!(from_outline.source, TocSource::Outline);
    assert_eq!(from_outline.entries[0].id, "2");

    let blank_outline = vec![OutlineEntry {
        level: 1,
        title: String::new(),
        page: 0,
    }];
    let scanned = extract_table_of_contents(&patterns, &blank_outline, &page_lines, 3, 60);
    assert_eq!(scanned.source, TocSource::PatternScan);
    assert_eq!(scanned.entries[0].id, "1.1");

    let nothing = extract_table_of_contents(&patterns, &[], &pages(&[&["prose"]]), 1, 60);
    assert_eq!(nothing.source, TocSource::None);
    assert!(nothing.entries.is_empty());
}

#[test]
fn table_of_contents_serializes_source_in_snake_case() {
    let patterns = patterns();
    let page_lines = pages(&[&["1.1 Scanned ..... 2"]]);
    let toc = extract_table_of_contents(&patterns, &[], &page_lines, 3, 60);

    let value = serde_json::to_value(&toc).expect("toc should serialize");
    assert_eq!(value["source"], "pattern_scan");
    assert_eq!(value["total_pages"], 3);
    assert_eq!(value["entries"][0]["id"], "1.1");
    assert_eq!(value["entries"][0]["level"], 2);
}

#[test]
fn parse_outline_xml_tracks_nesting_depth() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<pdf2xml producer="poppler" version="22.02.0">
<page number="1" position="absolute" top="0" left="0" height="1188" width="918">
<text top="100" left="80" width="300" height="20" font="0">Cover</text>
</page>
<outline>
<item page="3">Overview</item>
<outline>
<item page="4">Intended Audience</item>
</outline>
<item page="10">1 Initial Setup &amp; Hardening</item>
<outline>
<item page="11">1.1 Filesystem</item>
<outline>
<item>1.1.1 Configure</item>
</outline>
</outline>
</outline>
</pdf2xml>
"#;

    let entries = parse_outline_xml(xml).expect("outline xml should parse");
    let summary = entries
        .iter()
        .map(|entry| (entry.level, entry.title.as_str(), entry.page))
        .collect::<Vec<(u32, &str, u32)>>();
    assert_eq!(
        summary,
        vec![
            (1, "Overview", 3),
            (2, "Intended Audience", 4),
            (1, "1 Initial Setup & Hardening", 10),
            (2, "1.1 Filesystem", 11),
            (3, "1.1.1 Configure", 0),
        ]
    );
}

#[test]
fn render_markdown_lists_non_empty_sections_in_order() {
    let patterns = patterns();
    let lines = owned(&[
        "1.4 Ensure bootloader password",
        "Remediation:",
        "set it",
        "Description:",
        "why",
    ]);
    let outcome = segment_recommendations(&patterns, &lines);

    let markdown = render_markdown(&outcome.records[0]);
    assert_eq!(
        markdown,
        "# 1.4 - 1.4 Ensure bootloader password\n\n## Description\n\nwhy\n\n## Remediation\n\nset it\n"
    );
}

#[test]
fn write_markdown_files_counts_repeated_id_once() {
    let patterns = patterns();
    let lines = owned(&[
        "1.1 First wording",
        "Remediation:",
        "first fix",
        "1.1 Second wording",
        "Remediation:",
        "second fix",
        "1.2 Other",
        "Default Value:",
        "off",
    ]);
    let outcome = segment_recommendations(&patterns, &lines);
    assert_eq!(outcome.kept_count, 3);

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let dir = std::env::temp_dir().join(format!(
        "cisbench_markdown_{}_{}",
        std::process::id(),
        stamp
    ));

    let written = write_markdown_files(&dir, &outcome.records).expect("markdown should write");
    assert_eq!(written, 2);

    let repeated = fs::read_to_string(dir.join("1.1.md")).expect("markdown file should exist");
    assert!(repeated.contains("1.1 Second wording"));
    assert!(repeated.contains("second fix"));
    assert_eq!(fs::read_dir(&dir).expect("markdown dir").count(), 2);

    fs::remove_dir_all(&dir).expect("temp markdown dir should be removed");
}

#[test]
fn table_to_csv_quotes_cells_that_need_it() {
    let rows = vec![
        vec!["ID".to_string(), "Title".to_string()],
        vec!["1.1".to_string(), "a, \"b\"\nc".to_string()],
    ];
    assert_eq!(table_to_csv(&rows), "ID,Title\n1.1,\"a, \"\"b\"\"\nc\"");
}

#[test]
fn store_benchmark_replaces_previous_rows_for_document() {
    let patterns = patterns();
    let mut connection = Connection::open_in_memory().expect("in-memory db should open");
    ensure_schema(&connection).expect("schema should initialize");

    let pdf = PdfEntry {
        filename: "CIS_Oracle_Linux_7_Benchmark_v3.1.1.pdf".to_string(),
        path: "/tmp/CIS_Oracle_Linux_7_Benchmark_v3.1.1.pdf".to_string(),
        benchmark: "Oracle Linux 7".to_string(),
        version: "3.1.1".to_string(),
        sha256: "abc123".to_string(),
    };
    let doc_id = doc_id_for(&pdf);
    assert_eq!(doc_id, "cis_oracle_linux_7_benchmark_v3_1_1");

    let lines = owned(&[
        "1.1 First",
        "Remediation:",
        "a",
        "1.2 Second",
        "Default Value:",
        "b",
    ]);
    let outcome = segment_recommendations(&patterns, &lines);
    let page_lines = pages(&[&["1.1 First ..... 1", "1.2 Second ..... 1"]]);
    let toc = extract_table_of_contents(&patterns, &[], &page_lines, 1, 60);

    store_benchmark(&mut connection, &doc_id, &pdf, &outcome.records, &toc)
        .expect("first store should succeed");
    store_benchmark(&mut connection, &doc_id, &pdf, &outcome.records[..1], &toc)
        .expect("second store should succeed");

    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM recommendations").expect("count"),
        1
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM toc_entries").expect("count"),
        2
    );
    assert_eq!(
        count_rows(&connection, "SELECT COUNT(*) FROM docs").expect("count"),
        1
    );

    let remediation: String = connection
        .query_row(
            "SELECT remediation FROM recommendations WHERE doc_id = ?1 AND rec_id = '1.1'",
            [&doc_id],
            |row| row.get(0),
        )
        .expect("stored recommendation should be readable");
    assert_eq!(remediation, "a");
}
