use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "cisbench",
    version,
    about = "Extract recommendations and the table of contents from CIS benchmark PDFs"
)]
pub struct Cli {
    /// Raise the default log level (-v debug, -vv trace) when RUST_LOG is unset.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Inventory(InventoryArgs),
    Extract(ExtractArgs),
    Toc(TocArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long, default_value = ".cache/cisbench")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, default_value = ".cache/cisbench")]
    pub cache_root: PathBuf,

    /// Benchmark PDF to process; repeatable. Defaults to every PDF in the inventory.
    #[arg(long = "pdf")]
    pub pdfs: Vec<PathBuf>,

    #[arg(long)]
    pub inventory_manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub refresh_inventory: bool,

    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_db: bool,

    #[arg(long)]
    pub run_manifest_path: Option<PathBuf>,

    #[arg(long = "format", value_enum)]
    pub formats: Vec<OutputFormat>,

    /// Front-matter pages scanned for the index when the PDF has no outline.
    #[arg(long, default_value_t = 60)]
    pub max_toc_pages: usize,

    #[arg(long)]
    pub max_pages: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct TocArgs {
    #[arg(long)]
    pub pdf: PathBuf,

    #[arg(long, default_value_t = 60)]
    pub max_toc_pages: usize,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/cisbench")]
    pub cache_root: PathBuf,
}
