mod db_setup;
mod ids_and_outline;
mod output_writers;
mod page_extract_and_normalize;
mod patterns;
mod recommendations;
mod run;
#[cfg(test)]
mod tests;
mod tools_and_manifest;
mod types;

pub use run::run;

pub(crate) use ids_and_outline::extract_table_of_contents;
pub(crate) use page_extract_and_normalize::collect_document_lines;
pub(crate) use patterns::BenchmarkPatterns;
pub(crate) use run::native_outline_or_empty;
pub(crate) use types::{TableOfContents, TocSource};
