use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::TocArgs;
use crate::commands::extract::{
    BenchmarkPatterns, TableOfContents, TocSource, collect_document_lines,
    extract_table_of_contents, native_outline_or_empty,
};

pub fn run(args: TocArgs) -> Result<()> {
    let patterns = BenchmarkPatterns::new()?;
    let document = collect_document_lines(&patterns, &args.pdf, None)?;

    let mut warnings = Vec::<String>::new();
    let outline = native_outline_or_empty(&args.pdf, &mut warnings);
    let toc = extract_table_of_contents(
        &patterns,
        &outline,
        &document.page_lines,
        document.total_pages,
        args.max_toc_pages,
    );

    match toc.source {
        TocSource::Outline => info!(entries = toc.entries.len(), "index read from embedded outline"),
        TocSource::PatternScan => info!(
            entries = toc.entries.len(),
            max_toc_pages = args.max_toc_pages,
            "index built by front-matter scan"
        ),
        TocSource::None => warn!(path = %args.pdf.display(), "no table of contents could be extracted"),
    }

    if args.json {
        write_json_response(&toc)
    } else {
        write_text_response(&toc)
    }
}

fn write_json_response(toc: &TableOfContents) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, toc).context("failed to serialize toc json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

fn write_text_response(toc: &TableOfContents) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());

    writeln!(
        output,
        "Source: {} | pages={} | entries={}",
        toc.source.as_str(),
        toc.total_pages,
        toc.entries.len()
    )?;

    for entry in &toc.entries {
        let indent = "  ".repeat(entry.level.saturating_sub(1) as usize);
        if entry.id.is_empty() {
            writeln!(output, "{indent}{} .... {}", entry.title, entry.page)?;
        } else {
            writeln!(output, "{indent}{} {} .... {}", entry.id, entry.title, entry.page)?;
        }
    }

    output.flush()?;
    Ok(())
}
