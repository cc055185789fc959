//! CLI binary for fiscaldoc.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints the `{tipo, conteudo}` JSON document.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use fiscaldoc::{
    extract, extract_to_file, ClassifierProfile, ExtractError, ExtractionConfig,
    ExtractionProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Printed on stderr when neither the text layer nor OCR produced text.
const NO_TEXT_MESSAGE: &str = "Erro: Não foi possível extrair texto do PDF.";

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live OCR progress on stderr. The bar stays hidden until the OCR phase
/// starts, so documents with a text layer print nothing.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()),
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_ocr_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("OCR");
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(Duration::from_millis(80));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_ocr_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} pages recognised", green("✔"), success_count);
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
                red("✘"),
                success_count,
                total_pages,
                failed
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the JSON result
  extract_text nota.pdf

  # Write it to a file instead
  extract_text nota.pdf -o nota.json

  # Scanned guides: recognise DARF / FGTS / GPS too
  extract_text --extended guia.pdf

OUTPUT:
  {
      "tipo": "NFS-e",
      "conteudo": "..."
  }

ENVIRONMENT VARIABLES:
  FISCALDOC_DPI           Rendering DPI for OCR
  FISCALDOC_CONCURRENCY   Pages recognised in parallel
  FISCALDOC_LANGUAGES     Tesseract languages (default por+eng)
  FISCALDOC_TESSERACT     Path to the tesseract binary
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override the log filter

OCR needs pdfium and tesseract with the por and eng language packs.
Documents with an embedded text layer need neither.
"#;

/// Extract and classify the text of Brazilian fiscal PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "extract_text",
    version,
    about = "Extract and classify the text of Brazilian fiscal PDFs",
    long_about = "Reads the embedded text layer of a fiscal PDF (NF-e, NFS-e, NFC-e, NF3-e, \
CT-e, boletos, faturas), falling back to OCR when there is none, and prints the document \
type and normalized text as JSON.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the PDF file.
    pdf_path: PathBuf,

    /// Write the JSON document to this file instead of stdout.
    #[arg(short, long, env = "FISCALDOC_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering DPI for OCR (72–600).
    #[arg(long, env = "FISCALDOC_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Pages recognised in parallel [default: available CPUs].
    #[arg(short, long, env = "FISCALDOC_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Tesseract languages, joined with '+'.
    #[arg(long, env = "FISCALDOC_LANGUAGES", default_value = "por+eng")]
    languages: String,

    /// Path to the tesseract binary.
    #[arg(long, env = "FISCALDOC_TESSERACT", default_value = "tesseract")]
    tesseract: PathBuf,

    /// Path to the pdfium shared library or its directory.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Per-page OCR timeout in seconds (0 disables).
    #[arg(long, env = "FISCALDOC_PAGE_TIMEOUT", default_value_t = 120)]
    page_timeout: u64,

    /// Also recognise tax guides (DARF, FGTS, GPS), checked before invoices.
    #[arg(long, env = "FISCALDOC_EXTENDED")]
    extended: bool,

    /// Disable the OCR progress bar.
    #[arg(long, env = "FISCALDOC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FISCALDOC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FISCALDOC_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                // Usage errors exit 1, not clap's default 2.
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(&cli, progress.clone().map(|cb| cb as ProgressCallback))?;

    let result = match cli.output {
        Some(ref output_path) => extract_to_file(&cli.pdf_path, output_path, &config).await,
        None => extract(&cli.pdf_path, &config).await,
    };

    if let Some(ref cb) = progress {
        cb.finish();
    }

    let output = match result {
        Ok(output) => output,
        Err(ExtractError::NoTextExtracted { .. }) => {
            eprintln!("{NO_TEXT_MESSAGE}");
            return Ok(());
        }
        Err(e) => return Err(e).context("Extraction failed"),
    };

    match cli.output {
        Some(ref output_path) => {
            if !cli.quiet {
                eprintln!(
                    "{}  {}  ({:?}, {}ms)  →  {}",
                    green("✔"),
                    output.result.tipo,
                    output.method,
                    output.stats.total_duration_ms,
                    output_path.display()
                );
            }
        }
        None => {
            let json = output
                .result
                .to_json_pretty()
                .context("Failed to serialise output")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let languages: Vec<&str> = cli
        .languages
        .split('+')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut builder = ExtractionConfig::builder()
        .dpi(cli.dpi)
        .languages(languages)
        .tesseract_path(&cli.tesseract)
        .page_timeout_secs(cli.page_timeout)
        .classifier(if cli.extended {
            ClassifierProfile::Extended
        } else {
            ClassifierProfile::Standard
        });

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
