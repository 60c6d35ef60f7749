use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::{ExtractArgs, OutputFormat};
use crate::commands::inventory;
use crate::model::{
    DocumentSummary, ExtractCounts, ExtractPaths, ExtractRunManifest, PdfEntry,
    PdfInventoryManifest,
};
use crate::util::{ensure_directory, now_utc_string, utc_compact_string, write_json_pretty};

use super::db_setup::{DB_SCHEMA_VERSION, count_rows, open_store, store_benchmark};
use super::ids_and_outline::{extract_table_of_contents, read_native_outline};
use super::output_writers::{
    write_markdown_files, write_recommendations_csv, write_recommendations_json, write_toc_csv,
    write_toc_json,
};
use super::page_extract_and_normalize::collect_document_lines;
use super::patterns::BenchmarkPatterns;
use super::recommendations::segment_recommendations;
use super::tools_and_manifest::{collect_tool_versions, doc_id_for, render_extract_command};
use super::types::{OutlineEntry, SegmentationOutcome, TableOfContents, TocSource};

const ALL_FORMATS: [OutputFormat; 3] = [OutputFormat::Json, OutputFormat::Markdown, OutputFormat::Csv];

pub fn run(args: ExtractArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let run_manifest_path = args.run_manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!(
            "extract_run_{}.json",
            utc_compact_string(started_ts)
        ))
    });
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| cache_root.join("output"));
    let db_path = if args.no_db {
        None
    } else {
        Some(
            args.db_path
                .clone()
                .unwrap_or_else(|| cache_root.join("cis_benchmarks.sqlite")),
        )
    };

    info!(cache_root = %cache_root.display(), run_id = %run_id, "starting extract");

    let sources = resolve_sources(&args, &manifest_dir)?;
    let tool_versions = collect_tool_versions()?;
    let patterns = BenchmarkPatterns::new()?;
    let formats = if args.formats.is_empty() {
        ALL_FORMATS.to_vec()
    } else {
        args.formats.clone()
    };

    let mut connection = match &db_path {
        Some(path) => Some(open_store(path)?),
        None => None,
    };

    let mut counts = ExtractCounts {
        pdf_count: sources.len(),
        ..ExtractCounts::default()
    };
    let mut documents = Vec::<DocumentSummary>::with_capacity(sources.len());
    let mut warnings = Vec::<String>::new();

    for pdf in &sources {
        let doc_id = doc_id_for(pdf);
        let pdf_path = Path::new(&pdf.path);
        info!(doc_id = %doc_id, path = %pdf_path.display(), "processing benchmark");

        let extracted = extract_benchmark(
            &patterns,
            pdf_path,
            args.max_pages,
            args.max_toc_pages,
            &mut warnings,
        )?;

        let doc_output_dir = output_dir.join(&doc_id);
        let markdown_written = write_outputs(&doc_output_dir, &formats, &extracted)?;

        if let Some(connection) = connection.as_mut() {
            store_benchmark(
                connection,
                &doc_id,
                pdf,
                &extracted.outcome.records,
                &extracted.toc,
            )?;
        }

        counts.processed_pdf_count += 1;
        counts.pages_total += extracted.toc.total_pages as usize;
        counts.lines_total += extracted.line_count;
        counts.records_found += extracted.outcome.found_count;
        counts.records_kept += extracted.outcome.kept_count;
        counts.records_discarded += extracted.outcome.discarded_count;
        counts.toc_entries += extracted.toc.entries.len();
        counts.markdown_files_written += markdown_written;
        match extracted.toc.source {
            TocSource::Outline => counts.toc_outline_docs += 1,
            TocSource::PatternScan => counts.toc_fallback_docs += 1,
            TocSource::None => {}
        }

        info!(
            doc_id = %doc_id,
            found = extracted.outcome.found_count,
            kept = extracted.outcome.kept_count,
            discarded = extracted.outcome.discarded_count,
            toc_source = extracted.toc.source.as_str(),
            toc_entries = extracted.toc.entries.len(),
            "benchmark extracted"
        );

        documents.push(DocumentSummary {
            doc_id,
            filename: pdf.filename.clone(),
            total_pages: extracted.toc.total_pages,
            line_count: extracted.line_count,
            records_found: extracted.outcome.found_count,
            records_kept: extracted.outcome.kept_count,
            records_discarded: extracted.outcome.discarded_count,
            toc_source: extracted.toc.source.as_str().to_string(),
            toc_entries: extracted.toc.entries.len(),
            output_dir: doc_output_dir.display().to_string(),
        });
    }

    if let Some(connection) = connection.as_ref() {
        let stored = count_rows(connection, "SELECT COUNT(*) FROM recommendations")?;
        info!(recommendations = stored, "database updated");
    }

    let manifest = ExtractRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        command: render_extract_command(&args),
        tool_versions,
        paths: ExtractPaths {
            cache_root: cache_root.display().to_string(),
            manifest_dir: manifest_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
            db_path: db_path.as_ref().map(|path| path.display().to_string()),
        },
        counts,
        documents,
        source_hashes: sources,
        warnings,
    };

    write_json_pretty(&run_manifest_path, &manifest)?;

    info!(path = %run_manifest_path.display(), "wrote extract run manifest");
    info!(
        records = manifest.counts.records_kept,
        toc_entries = manifest.counts.toc_entries,
        "extract completed"
    );

    Ok(())
}

#[derive(Debug)]
struct ExtractedBenchmark {
    line_count: usize,
    outcome: SegmentationOutcome,
    toc: TableOfContents,
}

fn extract_benchmark(
    patterns: &BenchmarkPatterns,
    pdf_path: &Path,
    max_pages: Option<usize>,
    max_toc_pages: usize,
    warnings: &mut Vec<String>,
) -> Result<ExtractedBenchmark> {
    let document = collect_document_lines(patterns, pdf_path, max_pages)?;
    let outcome = segment_recommendations(patterns, &document.lines);

    let outline = native_outline_or_empty(pdf_path, warnings);
    let toc = extract_table_of_contents(
        patterns,
        &outline,
        &document.page_lines,
        document.total_pages,
        max_toc_pages,
    );
    if toc.source == TocSource::None {
        info!(path = %pdf_path.display(), "no table of contents could be extracted");
    }

    Ok(ExtractedBenchmark {
        line_count: document.lines.len(),
        outcome,
        toc,
    })
}

/// The outline is optional: a failing pdftohtml only disables the primary
/// index strategy.
pub(crate) fn native_outline_or_empty(
    pdf_path: &Path,
    warnings: &mut Vec<String>,
) -> Vec<OutlineEntry> {
    match read_native_outline(pdf_path) {
        Ok(outline) => outline,
        Err(error) => {
            let message = format!(
                "outline read failed for {}: {:#}",
                pdf_path.display(),
                error
            );
            warn!(path = %pdf_path.display(), error = %error, "outline read failed");
            warnings.push(message);
            Vec::new()
        }
    }
}

fn write_outputs(
    doc_output_dir: &Path,
    formats: &[OutputFormat],
    extracted: &ExtractedBenchmark,
) -> Result<usize> {
    let records = &extracted.outcome.records;
    let mut markdown_written = 0usize;

    for format in formats {
        match format {
            OutputFormat::Json => {
                write_recommendations_json(&doc_output_dir.join("recommendations.json"), records)?;
                write_toc_json(&doc_output_dir.join("toc.json"), &extracted.toc)?;
            }
            OutputFormat::Markdown => {
                markdown_written += write_markdown_files(&doc_output_dir.join("markdown"), records)?;
            }
            OutputFormat::Csv => {
                write_recommendations_csv(&doc_output_dir.join("recommendations.csv"), records)?;
                write_toc_csv(&doc_output_dir.join("toc.csv"), &extracted.toc)?;
            }
        }
    }

    info!(
        path = %doc_output_dir.display(),
        formats = %formats.iter().map(|format| format.as_str()).collect::<Vec<&str>>().join(","),
        "wrote benchmark outputs"
    );

    Ok(markdown_written)
}

fn resolve_sources(args: &ExtractArgs, manifest_dir: &Path) -> Result<Vec<PdfEntry>> {
    if !args.pdfs.is_empty() {
        return args
            .pdfs
            .iter()
            .map(|path| inventory::describe_pdf(path))
            .collect();
    }

    let inventory_manifest_path: PathBuf = args
        .inventory_manifest_path
        .clone()
        .unwrap_or_else(|| manifest_dir.join("pdf_inventory.json"));
    let inventory = load_or_refresh_inventory(
        &args.cache_root,
        &inventory_manifest_path,
        args.refresh_inventory,
    )?;
    Ok(inventory.pdfs)
}

fn load_or_refresh_inventory(
    cache_root: &Path,
    inventory_manifest_path: &Path,
    refresh_inventory: bool,
) -> Result<PdfInventoryManifest> {
    if refresh_inventory || !inventory_manifest_path.exists() {
        let manifest = inventory::build_manifest(cache_root)?;
        write_json_pretty(inventory_manifest_path, &manifest)?;
        info!(
            path = %inventory_manifest_path.display(),
            pdf_count = manifest.pdf_count,
            "refreshed inventory manifest"
        );
        return Ok(manifest);
    }

    let raw = fs::read(inventory_manifest_path)
        .with_context(|| format!("failed to read {}", inventory_manifest_path.display()))?;
    let manifest: PdfInventoryManifest = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", inventory_manifest_path.display()))?;

    info!(
        path = %inventory_manifest_path.display(),
        pdf_count = manifest.pdf_count,
        "loaded existing inventory manifest"
    );

    Ok(manifest)
}
