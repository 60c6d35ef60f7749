use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::info;

use crate::cli::InventoryArgs;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

const UNKNOWN_VERSION: &str = "unknown";

pub fn run(args: InventoryArgs) -> Result<()> {
    let manifest = build_manifest(&args.cache_root)?;

    if args.dry_run {
        info!(
            pdf_count = manifest.pdf_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| args.cache_root.join("manifests").join("pdf_inventory.json"));

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(pdf_count = manifest.pdf_count, "inventory completed");

    Ok(())
}

pub fn build_manifest(cache_root: &Path) -> Result<PdfInventoryManifest> {
    let pattern = benchmark_filename_regex()?;

    let mut pdf_paths = discover_pdfs(cache_root)?;
    pdf_paths.sort();

    if pdf_paths.is_empty() {
        bail!("no PDFs found in {}", cache_root.display());
    }

    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        pdfs.push(describe_pdf_with(&path, &pattern)?);
    }

    pdfs.sort_by(|a, b| {
        a.benchmark
            .cmp(&b.benchmark)
            .then(a.version.cmp(&b.version))
            .then(a.filename.cmp(&b.filename))
    });

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: cache_root.display().to_string(),
        pdf_count: pdfs.len(),
        pdfs,
    })
}

/// Inventory entry for a single PDF given on the command line.
pub fn describe_pdf(path: &Path) -> Result<PdfEntry> {
    let pattern = benchmark_filename_regex()?;
    describe_pdf_with(path, &pattern)
}

fn benchmark_filename_regex() -> Result<Regex> {
    Regex::new(r"(?i)^CIS_(.+?)_Benchmark_v(\d+(?:\.\d+)*)")
        .context("failed to compile benchmark filename regex")
}

fn describe_pdf_with(path: &Path, pattern: &Regex) -> Result<PdfEntry> {
    if !path.is_file() {
        bail!("PDF not found: {}", path.display());
    }

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    let (benchmark, version) = parse_benchmark_version(&filename, pattern);
    let sha256 = sha256_file(path)?;

    Ok(PdfEntry {
        filename,
        path: path.display().to_string(),
        benchmark,
        version,
        sha256,
    })
}

fn discover_pdfs(cache_root: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries = fs::read_dir(cache_root)
        .with_context(|| format!("failed to read {}", cache_root.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", cache_root.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}

/// `CIS_Oracle_Linux_7_Benchmark_v3.1.1.pdf` → ("Oracle Linux 7", "3.1.1").
/// Names outside the CIS convention keep their stem and an unknown version.
fn parse_benchmark_version(filename: &str, pattern: &Regex) -> (String, String) {
    if let Some(captures) = pattern.captures(filename) {
        let benchmark = captures
            .get(1)
            .map(|value| value.as_str().replace('_', " "))
            .unwrap_or_default();
        let version = captures
            .get(2)
            .map(|value| value.as_str().to_string())
            .unwrap_or_else(|| UNKNOWN_VERSION.to_string());
        return (benchmark, version);
    }

    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);
    (stem.to_string(), UNKNOWN_VERSION.to_string())
}
