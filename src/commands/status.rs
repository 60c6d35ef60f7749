use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::{ExtractRunManifest, PdfInventoryManifest};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let inventory_path = manifest_dir.join("pdf_inventory.json");
    let mut recorded_db_path: Option<String> = None;

    info!(cache_root = %args.cache_root.display(), "status requested");

    match latest_run_manifest(&manifest_dir)? {
        Some(run_manifest_path) => {
            let raw = fs::read(&run_manifest_path)
                .with_context(|| format!("failed to read {}", run_manifest_path.display()))?;
            let manifest: ExtractRunManifest = serde_json::from_slice(&raw)
                .with_context(|| format!("failed to parse {}", run_manifest_path.display()))?;

            info!(
                path = %run_manifest_path.display(),
                run_id = %manifest.run_id,
                status = %manifest.status,
                started_at = %manifest.started_at,
                updated_at = %manifest.updated_at,
                pdftotext = %manifest.tool_versions.pdftotext,
                processed_pdfs = manifest.counts.processed_pdf_count,
                records_found = manifest.counts.records_found,
                records_kept = manifest.counts.records_kept,
                records_discarded = manifest.counts.records_discarded,
                toc_entries = manifest.counts.toc_entries,
                warnings = manifest.warnings.len(),
                "loaded latest extract run manifest"
            );

            for document in &manifest.documents {
                info!(
                    doc_id = %document.doc_id,
                    pages = document.total_pages,
                    kept = document.records_kept,
                    discarded = document.records_discarded,
                    toc_source = %document.toc_source,
                    toc_entries = document.toc_entries,
                    "document summary"
                );
            }

            recorded_db_path = manifest.paths.db_path;
        }
        None => warn!(path = %manifest_dir.display(), "no extract run manifest found"),
    }

    if inventory_path.exists() {
        let raw = fs::read(&inventory_path)
            .with_context(|| format!("failed to read {}", inventory_path.display()))?;
        let inventory: PdfInventoryManifest = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse {}", inventory_path.display()))?;

        info!(
            generated_at = %inventory.generated_at,
            pdf_count = inventory.pdf_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    let db_path = status_db_path(&args.cache_root, recorded_db_path.as_deref());
    if db_path.exists() {
        let conn = Connection::open(&db_path)
            .with_context(|| format!("failed to open {}", db_path.display()))?;
        let docs_count = query_count(&conn, "SELECT COUNT(*) FROM docs").unwrap_or(0);
        let recommendations_count =
            query_count(&conn, "SELECT COUNT(*) FROM recommendations").unwrap_or(0);
        let toc_count = query_count(&conn, "SELECT COUNT(*) FROM toc_entries").unwrap_or(0);

        info!(
            path = %db_path.display(),
            docs = docs_count,
            recommendations = recommendations_count,
            toc_entries = toc_count,
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}

/// The latest run's `--db-path` wins over the default store location.
fn status_db_path(cache_root: &Path, recorded_db_path: Option<&str>) -> PathBuf {
    recorded_db_path
        .map(PathBuf::from)
        .unwrap_or_else(|| cache_root.join("cis_benchmarks.sqlite"))
}

/// Run manifests carry a compact UTC stamp, so the lexically greatest name is the newest.
fn latest_run_manifest(manifest_dir: &Path) -> Result<Option<PathBuf>> {
    if !manifest_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(manifest_dir)
        .with_context(|| format!("failed to read {}", manifest_dir.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let path = entry
            .with_context(|| format!("failed to read entry in {}", manifest_dir.display()))?
            .path();
        let is_run_manifest = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.starts_with("extract_run_") && name.ends_with(".json"))
            .unwrap_or(false);
        if !is_run_manifest {
            continue;
        }
        if latest.as_ref().map(|current| path > *current).unwrap_or(true) {
            latest = Some(path);
        }
    }

    Ok(latest)
}

fn query_count(conn: &Connection, sql: &str) -> Result<i64> {
    let count = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
