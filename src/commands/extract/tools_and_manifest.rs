use std::process::Command;

use anyhow::{Context, Result, bail};

use crate::cli::ExtractArgs;
use crate::model::{PdfEntry, ToolVersions};

pub(crate) fn collect_tool_versions() -> Result<ToolVersions> {
    Ok(ToolVersions {
        pdftotext: command_version("pdftotext", &["-v"])?,
        pdftohtml: command_version_optional("pdftohtml", &["-v"]),
        pdfinfo: command_version_optional("pdfinfo", &["-v"]),
    })
}

fn first_output_line(stdout: &[u8], stderr: &[u8]) -> Option<String> {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim().to_string()
    } else {
        stdout.trim().to_string()
    };

    source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
}

fn command_version_optional(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    first_output_line(&output.stdout, &output.stderr)
}

// poppler tools print their version on stderr and exit 0 for `-v`.
fn command_version(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{} {} failed: {}", program, args.join(" "), stderr.trim());
    }

    Ok(first_output_line(&output.stdout, &output.stderr).unwrap_or_else(|| "unknown".to_string()))
}

/// Stable identifier derived from the PDF file name.
pub(crate) fn doc_id_for(pdf: &PdfEntry) -> String {
    let stem = pdf
        .filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&pdf.filename);
    let id = sanitize_for_id(stem);
    if id.is_empty() {
        format!("doc_{}", &pdf.sha256.get(..12).unwrap_or("unknown"))
    } else {
        id
    }
}

fn sanitize_for_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push('_');
        }
    }

    while out.contains("__") {
        out = out.replace("__", "_");
    }

    out.trim_matches('_').to_string()
}

pub(crate) fn render_extract_command(args: &ExtractArgs) -> String {
    let mut command = vec![
        "cisbench".to_string(),
        "extract".to_string(),
        "--cache-root".to_string(),
        args.cache_root.display().to_string(),
    ];

    for pdf in &args.pdfs {
        command.push("--pdf".to_string());
        command.push(pdf.display().to_string());
    }
    if let Some(path) = &args.inventory_manifest_path {
        command.push("--inventory-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    if args.refresh_inventory {
        command.push("--refresh-inventory".to_string());
    }
    if let Some(path) = &args.output_dir {
        command.push("--output-dir".to_string());
        command.push(path.display().to_string());
    }
    if let Some(path) = &args.db_path {
        command.push("--db-path".to_string());
        command.push(path.display().to_string());
    }
    if args.no_db {
        command.push("--no-db".to_string());
    }
    if let Some(path) = &args.run_manifest_path {
        command.push("--run-manifest-path".to_string());
        command.push(path.display().to_string());
    }
    for format in &args.formats {
        command.push("--format".to_string());
        command.push(format.as_str().to_string());
    }
    command.push("--max-toc-pages".to_string());
    command.push(args.max_toc_pages.to_string());
    if let Some(max_pages) = args.max_pages {
        command.push("--max-pages".to_string());
        command.push(max_pages.to_string());
    }

    command.join(" ")
}
