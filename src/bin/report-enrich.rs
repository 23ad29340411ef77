//! CLI binary for report-enrich.
//!
//! The trigger of an enrichment run: maps flags to `EnrichConfig`, runs the
//! passes once against a Google Sheets worksheet and prints the
//! acknowledgement (or the JSON run report).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use report_enrich::{
    enrich_sheet, ColumnNames, EnrichConfig, EnrichProgressCallback, FieldSettings,
    GoogleSheetsStore, PassKind, PassReport, ProgressCallback, RowOutcome, ACKNOWLEDGEMENT,
};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One progress bar per pass, replaced when the next pass starts.
struct CliProgressCallback {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            failures: AtomicUsize::new(0),
        })
    }
}

impl EnrichProgressCallback for CliProgressCallback {
    fn on_pass_start(&self, pass: PassKind, rows: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>4}/{len} rows  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.failures.store(0, Ordering::SeqCst);
        self.bar.set_style(style);
        self.bar.set_length(rows as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(pass.to_string());
        self.bar.reset_elapsed();
    }

    fn on_row_complete(&self, _pass: PassKind, row: usize, outcome: RowOutcome) {
        if outcome == RowOutcome::Failed {
            self.failures.fetch_add(1, Ordering::SeqCst);
            self.bar.println(format!("  {} row {:>4}  {}", red("✗"), row, dim("取得失敗")));
        }
        self.bar.inc(1);
    }

    fn on_pass_complete(&self, report: &PassReport) {
        let mark = if self.failures.load(Ordering::SeqCst) == 0 {
            green("✓")
        } else {
            cyan("⚠")
        };
        self.bar.println(format!(
            "{} {:<16} {} updated  {}",
            mark,
            bold(report.pass.as_str()),
            report.updated,
            dim(&format!(
                "{} filled / {} failed / {} excluded / {} unresolved  {:.1}s",
                report.filled,
                report.failed,
                report.excluded,
                report.unresolved,
                report.duration_ms as f64 / 1000.0
            )),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full run over one worksheet
  report-enrich run --spreadsheet 1AbC... --sheet 統合報告書

  # Only the organization-name passes
  report-enrich run --spreadsheet 1AbC... --only name-text --only name-image --only name-merge

  # JSON run report on stdout
  report-enrich run --spreadsheet 1AbC... --json > report.json

  # Show the pass order and the column each pass fills
  report-enrich passes

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY              Google Gemini API key (default provider)
  OPENAI_API_KEY              OpenAI API key
  ANTHROPIC_API_KEY           Anthropic API key
  GOOGLE_SHEETS_ACCESS_TOKEN  OAuth access token with the spreadsheets scope
  REPORT_ENRICH_SPREADSHEET   Spreadsheet ID
  REPORT_ENRICH_SHEET         Worksheet name
  PDFIUM_LIB_PATH             Path to an existing libpdfium (skips auto-download)
"#;

/// Fill a report spreadsheet with LLM-extracted organization names, value
/// statements and securities codes.
#[derive(Parser, Debug)]
#[command(
    name = "report-enrich",
    version,
    about = "Enrich a spreadsheet of report PDFs using LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "REPORT_ENRICH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "REPORT_ENRICH_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the enrichment passes once.
    Run(RunArgs),
    /// List the passes in run order with their target columns.
    Passes,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Spreadsheet ID (the long token in the sheet URL).
    #[arg(long, env = "REPORT_ENRICH_SPREADSHEET")]
    spreadsheet: String,

    /// Worksheet name.
    #[arg(long, env = "REPORT_ENRICH_SHEET", default_value = "Sheet1")]
    sheet: String,

    /// OAuth access token for the Sheets API.
    #[arg(long, env = "GOOGLE_SHEETS_ACCESS_TOKEN", hide_env_values = true)]
    access_token: String,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "REPORT_ENRICH_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (default: gemini-2.0-flash).
    #[arg(long, env = "REPORT_ENRICH_MODEL")]
    model: Option<String>,

    /// Run only these passes (repeatable). Run order is always fixed.
    #[arg(long = "only", value_name = "PASS", value_parser = parse_pass)]
    only: Vec<PassKind>,

    /// Rendering DPI for the image passes (72–400).
    #[arg(long, env = "REPORT_ENRICH_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Page-count threshold for the organization-name passes.
    #[arg(long, env = "REPORT_ENRICH_MIN_PAGES", default_value_t = 15.0)]
    min_pages: f64,

    /// PDF download timeout for the organization-name passes, in seconds.
    #[arg(long, env = "REPORT_ENRICH_NAME_TIMEOUT", default_value_t = 15)]
    name_timeout: u64,

    /// PDF download timeout for the value passes, in seconds.
    #[arg(long, env = "REPORT_ENRICH_VALUE_TIMEOUT", default_value_t = 20)]
    value_timeout: u64,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "REPORT_ENRICH_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "REPORT_ENRICH_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Print the run report as JSON instead of the acknowledgement.
    #[arg(long, env = "REPORT_ENRICH_JSON")]
    json: bool,

    /// Disable progress bars.
    #[arg(long, env = "REPORT_ENRICH_NO_PROGRESS")]
    no_progress: bool,
}

fn parse_pass(s: &str) -> std::result::Result<PassKind, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = match cli.command {
        Command::Run(ref args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Passes => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Passes => {
            print_passes(&ColumnNames::default());
            Ok(())
        }
        Command::Run(args) => run(&args, show_progress).await,
    }
}

async fn run(args: &RunArgs, show_progress: bool) -> Result<()> {
    let selected: Vec<PassKind> = if args.only.is_empty() {
        PassKind::ALL.to_vec()
    } else {
        args.only.clone()
    };

    let bars = show_progress.then(CliProgressCallback::new);
    let progress = bars
        .clone()
        .map(|cb| cb as Arc<dyn EnrichProgressCallback>);
    let config = build_config(args, progress)?;

    if show_progress && selected.iter().any(PassKind::reads_pdfs) && !pdfium_auto::is_pdfium_cached() {
        download_pdf_engine()?;
    }

    let sheet = Arc::new(GoogleSheetsStore::new(
        &args.spreadsheet,
        &args.sheet,
        &args.access_token,
    ));
    let report = enrich_sheet(sheet, config, &selected).await;
    if let Some(cb) = bars {
        cb.bar.finish_and_clear();
    }
    let report = report.context("Enrichment run failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        println!("{ACKNOWLEDGEMENT}");
    }
    Ok(())
}

/// Map CLI args to `EnrichConfig`.
fn build_config(args: &RunArgs, progress: Option<ProgressCallback>) -> Result<EnrichConfig> {
    let name = FieldSettings {
        fetch_timeout_secs: args.name_timeout,
        ..FieldSettings::organization_name()
    };
    let value = FieldSettings {
        fetch_timeout_secs: args.value_timeout,
        ..FieldSettings::value_statement()
    };

    let mut builder = EnrichConfig::builder()
        .name_settings(name)
        .value_settings(value)
        .min_page_count(args.min_pages)
        .dpi(args.dpi)
        .temperature(args.temperature)
        .api_timeout_secs(args.api_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// First-run pdfium download with a byte progress bar.
fn download_pdf_engine() -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    bar.set_prefix("PDF engine");
    bar.enable_steady_tick(Duration::from_millis(80));

    let progress = bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if progress.length().unwrap_or(0) != t {
                    progress.set_length(t);
                }
            }
            progress.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    bar.finish_with_message("ready ✓");
    Ok(())
}

fn print_passes(columns: &ColumnNames) {
    for pass in PassKind::ALL {
        let target = match pass {
            PassKind::NameText => &columns.org_name_text,
            PassKind::NameImage => &columns.org_name_image,
            PassKind::NameMerge => &columns.org_name,
            PassKind::ValueText => &columns.value_text,
            PassKind::ValueImage => &columns.value_image,
            PassKind::ValueMerge => &columns.value_final,
            PassKind::SecuritiesCode => &columns.securities_code,
        };
        println!("{:<16} → {}", pass.as_str(), target);
    }
}
