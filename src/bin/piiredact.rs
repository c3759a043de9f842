//! CLI binary for pii-redact.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RedactionConfig`, reads OCR spans from JSON sidecar files, and prints
//! results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pii_redact::{
    detect, redact_batch, FillMode, OcrPool, OutputTarget, PiiLabel, ProgressCallback,
    RedactionConfig, RedactionProgressCallback, SidecarOcr, SpanSource,
};
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per
/// image. Images complete out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Display names, indexed like the batch.
    names: Vec<String>,
    start_times: Mutex<Vec<Option<Instant>>>,
}

impl CliProgressCallback {
    fn new(names: Vec<String>) -> Arc<Self> {
        let bar = ProgressBar::new(names.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Redacting");
        bar.enable_steady_tick(Duration::from_millis(80));

        let start_times = Mutex::new(vec![None; names.len()]);
        Arc::new(Self {
            bar,
            names,
            start_times,
        })
    }

    fn name(&self, index: usize) -> &str {
        self.names.get(index).map(String::as_str).unwrap_or("?")
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut t| t.get_mut(index).and_then(Option::take))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RedactionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Redacting {total} image(s)…"))
        ));
    }

    fn on_input_start(&self, index: usize, _total: usize) {
        if let Ok(mut t) = self.start_times.lock() {
            if let Some(slot) = t.get_mut(index) {
                *slot = Some(Instant::now());
            }
        }
        self.bar.set_message(self.name(index).to_string());
    }

    fn on_input_complete(&self, index: usize, _total: usize, rects_applied: usize) {
        let detail = if rects_applied == 0 {
            dim("no PII detected")
        } else {
            format!("{rects_applied} region(s) masked")
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            green("✓"),
            self.name(index),
            detail,
            dim(&format!("{:.1}s", self.elapsed_secs(index))),
        ));
        self.bar.inc(1);
    }

    fn on_input_error(&self, index: usize, _total: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        let msg = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            self.name(index),
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs(index))),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();
        if failed == 0 {
            eprintln!(
                "{} {} image(s) processed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} image(s) processed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Spans next to the image (card.json beside card.jpg) → card_masked.jpg
  piiredact card.jpg

  # One span file, explicit output
  piiredact card.jpg --spans card_ocr.json -o redacted.jpg

  # A folder of scans with a folder of span files, 8 at a time
  piiredact scans/*.png --spans ocr/ --out-dir masked/ --concurrency 8

  # Only numbers, white boxes with a little margin
  piiredact card.png --labels aadhaar,phone --fill white --padding 4

  # See what would be masked, as JSON
  piiredact card.png --detect-only --json

SPAN FILES:
  JSON array of EasyOCR results, e.g.
    [[[[10,10],[100,10],[100,30],[10,30]], "1234 5678 9012", 0.98], ...]
  or objects {"boundary": [[x,y],...], "text": "...", "confidence": 0.98}.
  Coordinates are in the pixel space of the full-size image.

LABELS:
  aadhaar  phone  dob  email  name  address

ENVIRONMENT VARIABLES:
  PIIREDACT_SPANS         Default for --spans
  PIIREDACT_OUT_DIR       Default for --out-dir
  PIIREDACT_FILL          Default for --fill
  PIIREDACT_LABELS        Default for --labels
  PIIREDACT_CONCURRENCY   Default for --concurrency
  RUST_LOG                Overrides the log filter (e.g. pii_redact=debug)
"#;

/// Mask personal data on photographed or scanned identity documents.
#[derive(Parser, Debug)]
#[command(
    name = "piiredact",
    version,
    about = "Mask personal data on photographed or scanned identity documents",
    long_about = "Detect Aadhaar numbers, phone numbers, dates of birth, emails, names and \
addresses in OCR output for an identity-document image, and write a copy of the image \
with those regions painted over. The output keeps the input's image format.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image files (PNG, JPEG).
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// OCR span JSON file, or a directory holding `<stem>.json` per image.
    /// Default: `<image>.json` next to each image.
    #[arg(short, long, env = "PIIREDACT_SPANS")]
    spans: Option<PathBuf>,

    /// Output file (single input only). Default: `<stem>_masked.<ext>`.
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Write outputs into this directory as `<stem>_masked.<ext>`.
    #[arg(long, env = "PIIREDACT_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// How to paint redacted regions.
    #[arg(long, env = "PIIREDACT_FILL", value_enum, default_value = "black")]
    fill: FillArg,

    /// Gaussian sigma for `--fill blur`.
    #[arg(long, env = "PIIREDACT_BLUR_SIGMA", default_value_t = 12.0)]
    blur_sigma: f32,

    /// Extra pixels around each region.
    #[arg(long, env = "PIIREDACT_PADDING", default_value_t = 0)]
    padding: u32,

    /// Comma-separated labels to redact. Default: all.
    #[arg(long, env = "PIIREDACT_LABELS", value_delimiter = ',')]
    labels: Vec<PiiLabel>,

    /// Minimum length of a punctuated line treated as an address.
    #[arg(long, env = "PIIREDACT_ADDRESS_MIN_CHARS", default_value_t = 25)]
    address_min_chars: usize,

    /// Reject inputs larger than this many bytes.
    #[arg(long, env = "PIIREDACT_MAX_BYTES", default_value_t = 10 * 1024 * 1024)]
    max_bytes: u64,

    /// Images processed at once.
    #[arg(short, long, env = "PIIREDACT_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Recognitions run at once.
    #[arg(long, env = "PIIREDACT_OCR_WORKERS", default_value_t = 1)]
    ocr_workers: usize,

    /// Print detected regions without writing any image.
    #[arg(long)]
    detect_only: bool,

    /// Print JSON reports on stdout.
    #[arg(long, env = "PIIREDACT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PIIREDACT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PIIREDACT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PIIREDACT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FillArg {
    Black,
    White,
    Blur,
}

impl FillArg {
    fn into_fill(self, sigma: f32) -> FillMode {
        match self {
            FillArg::Black => FillMode::BLACK,
            FillArg::White => FillMode::WHITE,
            FillArg::Blur => FillMode::Blur { sigma },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose brings them back.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.detect_only;
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

    if cli.output.is_some() && cli.inputs.len() > 1 {
        anyhow::bail!("--output takes a single input; use --out-dir for several");
    }

    let source = match cli.spans {
        Some(ref p) => SpanSource::from_path(p),
        None => SpanSource::Adjacent,
    };

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let names = cli.inputs.iter().map(|p| p.display().to_string()).collect();
        Some(CliProgressCallback::new(names) as Arc<dyn RedactionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let ocr = OcrPool::from_config(Arc::new(SidecarOcr::new(source)), &config);

    if cli.detect_only {
        return run_detect(&cli, &ocr, &config).await;
    }

    // ── Run redaction ────────────────────────────────────────────────────
    let target = match (&cli.output, &cli.out_dir) {
        (Some(p), _) => OutputTarget::File(p.clone()),
        (None, Some(dir)) => OutputTarget::Directory(dir.clone()),
        (None, None) => OutputTarget::Beside,
    };
    let items = redact_batch(cli.inputs.clone(), target, &ocr, &config).await;
    let failed = items.iter().filter(|i| i.result.is_err()).count();

    if cli.json {
        let reports: Vec<serde_json::Value> = items
            .iter()
            .map(|item| match &item.result {
                Ok(report) => serde_json::to_value(report).unwrap_or_default(),
                Err(e) => serde_json::json!({
                    "input": item.input.display().to_string(),
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialise reports")?
        );
    } else if !cli.quiet && !show_progress {
        for item in &items {
            match &item.result {
                Ok(report) => match report.output {
                    Some(ref out) => eprintln!(
                        "{}  {}  {} region(s)  →  {}",
                        green("✔"),
                        item.input.display(),
                        report.stats.rects_applied,
                        bold(&out.display().to_string())
                    ),
                    None => eprintln!(
                        "{}  {}  {}",
                        green("✔"),
                        item.input.display(),
                        dim(report.message())
                    ),
                },
                Err(e) => eprintln!("{}  {}  {}", red("✘"), item.input.display(), e),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} image(s) failed", items.len());
    }
    Ok(())
}

/// `--detect-only`: list regions per input, write nothing.
async fn run_detect(cli: &Cli, ocr: &OcrPool, config: &RedactionConfig) -> Result<()> {
    let mut all = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let regions = detect(input, ocr, config)
            .await
            .with_context(|| format!("Detection failed for {}", input.display()))?;

        if !cli.json && !cli.quiet {
            println!("{}", bold(&input.display().to_string()));
            if regions.is_empty() {
                println!("  {}", dim("No PII detected"));
            }
            for r in &regions {
                println!(
                    "  {:<8} ({:>4},{:>4}) – ({:>4},{:>4})  {}",
                    r.label.as_str(),
                    r.rect.x1,
                    r.rect.y1,
                    r.rect.x2,
                    r.rect.y2,
                    dim(&format!("conf {:.2}", r.confidence)),
                );
            }
        }
        all.push(serde_json::json!({
            "input": input.display().to_string(),
            "regions": regions,
        }));
    }

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&all).context("Failed to serialise regions")?
        );
    }
    Ok(())
}

/// Map CLI args to `RedactionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RedactionConfig> {
    let labels = if cli.labels.is_empty() {
        PiiLabel::ALL.to_vec()
    } else {
        cli.labels.clone()
    };

    let mut builder = RedactionConfig::builder()
        .fill(cli.fill.into_fill(cli.blur_sigma))
        .padding(cli.padding)
        .labels(labels)
        .address_min_chars(cli.address_min_chars)
        .max_upload_bytes(cli.max_bytes)
        .concurrency(cli.concurrency)
        .ocr_workers(cli.ocr_workers);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
