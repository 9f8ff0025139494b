//! CLI binary for pdf2boq.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractConfig` and prints the breakdown as JSON.
//!
//! Exit codes: 0 success, 1 missing argument, 2 file not found,
//! 3 extraction/parse error.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2boq::{
    BudgetBreakdown, ExtractConfig, ExtractProgressCallback, Extractor, ExtractError,
    ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner reporting decode and strategy progress on stderr,
/// keeping stdout clean for the JSON result.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractProgressCallback for CliProgress {
    fn on_decode_start(&self) {
        self.bar.set_message("decoding text…");
    }

    fn on_page_decoded(&self, page_num: usize, total: usize) {
        self.bar
            .set_message(format!("clustering page {page_num}/{total}"));
    }

    fn on_strategy_complete(&self, strategy: &str, candidates: usize) {
        self.bar.println(format!(
            "  {} {:<12} {}",
            green("✓"),
            strategy,
            dim(&format!("{candidates} candidates")),
        ));
    }

    fn on_complete(&self, items: usize, sections: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} items, {} sections",
            green("✔"),
            bold(&items.to_string()),
            sections
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract a budget breakdown (pretty JSON on stdout)
  pdf2boq budget.pdf

  # Write to a file, compact JSON
  pdf2boq budget.pdf -o breakdown.json --compact

  # Text strategies only (skip the positional fallback)
  pdf2boq --text-only budget.pdf

  # Extract from a procurement-portal URL
  pdf2boq https://portal.example.com/tenders/boq-2041.pdf

  # Inspect PDF metadata (no extraction)
  pdf2boq --inspect-only budget.pdf

EXIT CODES:
  0  success
  1  missing input argument
  2  input file not found
  3  extraction or parse error

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH  Path to an existing libpdfium — skips system lookup
"#;

/// Extract structured cost breakdowns from construction budget PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2boq",
    version,
    about = "Extract cost line items, section subtotals, and a grand total from budget PDFs",
    long_about = "Extract a structured bill-of-quantities breakdown from a construction budget \
PDF. Tolerates lossy text flattening (broken columns, merged cells, split words) through a \
layered chain of recognition heuristics, with a positional-clustering fallback for documents \
the text layer cannot crack.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: Option<String>,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "PDF2BOQ_OUTPUT")]
    output: Option<PathBuf>,

    /// Emit compact JSON instead of pretty-printed.
    #[arg(long, env = "PDF2BOQ_COMPACT")]
    compact: bool,

    /// Skip the positional-clustering fallback (text strategies only).
    #[arg(long, env = "PDF2BOQ_TEXT_ONLY")]
    text_only: bool,

    /// Pages decoded by the positional fallback.
    #[arg(long, env = "PDF2BOQ_PAGES_CAP", default_value_t = 12)]
    pages_cap: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2BOQ_PASSWORD")]
    password: Option<String>,

    /// Print PDF metadata only, no extraction.
    #[arg(long)]
    inspect_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2BOQ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2BOQ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the JSON result.
    #[arg(short, long, env = "PDF2BOQ_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2BOQ_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library logs
    // quiet unless the user asks for them.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    let Some(input) = cli.input.clone() else {
        eprintln!("{} missing input argument (a PDF path or URL)", red("error:"));
        eprintln!("Usage: pdf2boq <INPUT>  (see --help)");
        return ExitCode::from(1);
    };

    match run(&cli, &input, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", red("error:"));
            ExitCode::from(exit_code_for(&e))
        }
    }
}

/// Map error chains to the documented exit codes.
fn exit_code_for(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<ExtractError>() {
        Some(ExtractError::FileNotFound { .. }) | Some(ExtractError::PermissionDenied { .. }) => 2,
        _ => 3,
    }
}

async fn run(cli: &Cli, input: &str, show_progress: bool) -> Result<()> {
    let extractor = Extractor::new();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let meta = extractor.inspect(input).await?;
        println!("File:         {input}");
        if let Some(ref t) = meta.title {
            println!("Title:        {t}");
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {a}");
        }
        if let Some(ref s) = meta.subject {
            println!("Subject:      {s}");
        }
        println!("Pages:        {}", meta.page_count);
        println!("PDF Version:  {}", meta.pdf_version);
        if let Some(ref p) = meta.producer {
            println!("Producer:     {p}");
        }
        if let Some(ref c) = meta.creator {
            println!("Creator:      {c}");
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ExtractConfig::builder()
        .text_only(cli.text_only)
        .positional_page_cap(cli.pages_cap)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if show_progress {
        let cb: ProgressCallback = CliProgress::new();
        builder = builder.progress_callback(cb);
    }
    let config = builder.build().context("invalid configuration")?;

    // ── Run extraction ───────────────────────────────────────────────────
    let breakdown = extractor.extract(input, &config).await?;

    let json = if cli.compact {
        serde_json::to_string(&breakdown).context("failed to serialise breakdown")?
    } else {
        serde_json::to_string_pretty(&breakdown).context("failed to serialise breakdown")?
    };

    match cli.output {
        Some(ref path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !cli.quiet {
                print_summary(&breakdown, Some(path));
            }
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .context("failed to write to stdout")?;
            handle.write_all(b"\n").ok();
            if !cli.quiet && !show_progress {
                print_summary(&breakdown, None);
            }
        }
    }

    Ok(())
}

fn print_summary(breakdown: &BudgetBreakdown, path: Option<&PathBuf>) {
    let target = path
        .map(|p| format!("  →  {}", bold(&p.display().to_string())))
        .unwrap_or_default();
    eprintln!(
        "{} {} — {} items, {} sections, total {}{}",
        green("✔"),
        breakdown.mode,
        breakdown.items.len(),
        breakdown.sections.len(),
        bold(&format!("{:.2}", breakdown.total_all)),
        target,
    );
}
