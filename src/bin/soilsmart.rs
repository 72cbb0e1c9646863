//! CLI binary for soilsmart.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use soilsmart::{
    analyze, analyze_to_file, extract_only, AnalysisConfig, AnalysisOutput,
    AnalysisProgressCallback, Language, ProgressCallback, Stage, StageTemperatures,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one spinner naming the running stage, one log line
/// per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    summary_errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Analysing");
        bar.set_message("opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            summary_errors: AtomicUsize::new(0),
        })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<22} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_summary_error(&self, language: Language, error: &str) {
        self.summary_errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            let mut s: String = error.chars().take(79).collect();
            s.push('\u{2026}');
            s
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} summary {:<14} {}",
            red("✗"),
            language.prompt_name(),
            red(&msg)
        ));
    }

    fn on_analysis_complete(&self, total_ms: u64) {
        self.bar.finish_and_clear();
        let failed = self.summary_errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} analysis complete in {}",
                green("✔"),
                bold(&format!("{:.1}s", total_ms as f64 / 1000.0))
            );
        } else {
            eprintln!(
                "{} analysis complete in {:.1}s  ({} summary failed)",
                cyan("⚠"),
                total_ms as f64 / 1000.0,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Full report to stdout (French report + Wolof and Bambara summaries)
  soilsmart analyse_sol.pdf

  # Payload JSON {report, summary_wo, summary_bm} to a file
  soilsmart analyse_sol.pdf -o rapport.json

  # Recommendations grounded in local agronomy notes
  soilsmart --knowledge-dir knowledge/ analyse_sol.pdf

  # Only extract and normalise the parameters
  soilsmart --params-only analyse_sol.pdf

  # From a URL, with a specific model
  soilsmart --provider openai --model gpt-4o https://labo.example.org/rapport.pdf

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  SOILSMART_*             Every flag below, e.g. SOILSMART_KNOWLEDGE_DIR

KNOWLEDGE BASE:
  --knowledge-dir takes a directory of .md / .txt notes. Notes are split into
  paragraphs, embedded once, and cached as index.json in the same directory.
  A path to a saved index.json is accepted too.
"#;

/// Analyse soil-report PDFs with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "soilsmart",
    version,
    about = "Turn soil-analysis PDF reports into agronomic reports with Wolof and Bambara summaries",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write the payload JSON to this file instead of printing the report.
    #[arg(short, long, env = "SOILSMART_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (default: gpt-4o-mini).
    #[arg(long, env = "SOILSMART_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "SOILSMART_PROVIDER")]
    provider: Option<String>,

    /// Report language: fr, wo, bm.
    #[arg(long, env = "SOILSMART_LANGUAGE", default_value = "fr", value_parser = parse_language)]
    language: Language,

    /// Directory of agronomy notes (or a saved index.json) for retrieval.
    #[arg(long, env = "SOILSMART_KNOWLEDGE_DIR")]
    knowledge_dir: Option<PathBuf>,

    /// Knowledge passages per recommendation.
    #[arg(long, env = "SOILSMART_TOP_K", default_value_t = 3)]
    top_k: usize,

    /// Do not transcribe scanned pages with the vision model.
    #[arg(long, env = "SOILSMART_NO_OCR")]
    no_ocr: bool,

    /// Rendering DPI for scanned pages (72–400).
    #[arg(long, env = "SOILSMART_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Longest edge in pixels for rendered scans.
    #[arg(long, env = "SOILSMART_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SOILSMART_PASSWORD")]
    password: Option<String>,

    /// Max output tokens for the report stages.
    #[arg(long, env = "SOILSMART_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Max output tokens per regional summary.
    #[arg(long, env = "SOILSMART_SUMMARY_MAX_TOKENS", default_value_t = 500)]
    summary_max_tokens: usize,

    /// Temperature for parameter extraction.
    #[arg(long, env = "SOILSMART_EXTRACTION_TEMPERATURE", default_value_t = 0.3)]
    extraction_temperature: f32,

    /// Temperature for the interpretation.
    #[arg(long, env = "SOILSMART_INTERPRETATION_TEMPERATURE", default_value_t = 0.3)]
    interpretation_temperature: f32,

    /// Temperature for the recommendations.
    #[arg(long, env = "SOILSMART_RECOMMENDATION_TEMPERATURE", default_value_t = 0.4)]
    recommendation_temperature: f32,

    /// Temperature for the regional summaries.
    #[arg(long, env = "SOILSMART_SUMMARY_TEMPERATURE", default_value_t = 0.2)]
    summary_temperature: f32,

    /// Temperature for OCR of scanned pages.
    #[arg(long, env = "SOILSMART_OCR_TEMPERATURE", default_value_t = 0.1)]
    ocr_temperature: f32,

    /// Retries per model call.
    #[arg(long, env = "SOILSMART_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Initial retry backoff in milliseconds (doubled per retry).
    #[arg(long, env = "SOILSMART_RETRY_BACKOFF_MS", default_value_t = 500)]
    retry_backoff_ms: u64,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "SOILSMART_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SOILSMART_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Write extracted_text.txt and raw_parameters.json here.
    #[arg(long, env = "SOILSMART_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,

    /// Print JSON instead of Markdown.
    #[arg(long, env = "SOILSMART_JSON")]
    json: bool,

    /// Stop after parameter extraction; print the parameter table.
    #[arg(long)]
    params_only: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "SOILSMART_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SOILSMART_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SOILSMART_QUIET")]
    quiet: bool,
}

fn parse_language(s: &str) -> std::result::Result<Language, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides the feedback that matters; keep library INFO
    // logs out of its way unless --verbose.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Parameters-only mode ─────────────────────────────────────────────
    if cli.params_only {
        let report = extract_only(&cli.input, &config)
            .await
            .context("Parameter extraction failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise parameters")?
            );
        } else {
            println!("{}", report.table);
        }
        if !cli.quiet {
            eprintln!("{} {} parameters", green("✔"), report.rows.len());
        }
        return Ok(());
    }

    // ── Full analysis ────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let output = analyze_to_file(&cli.input, output_path, &config)
            .await
            .context("Analysis failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} parameters  {}ms  →  {}",
                if output.summary_errors().is_empty() {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                output.parameters.len(),
                output.timings.total_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = analyze(&cli.input, &config)
            .await
            .context("Analysis failed")?;

        if cli.json {
            let json = serde_json::to_string_pretty(&output.payload())
                .context("Failed to serialise payload")?;
            println!("{json}");
        } else {
            print_report(&output)?;
        }

        if !cli.quiet && !show_progress {
            eprintln!(
                "Analysed {} parameters in {}ms",
                output.parameters.len(),
                output.timings.total_ms
            );
            for err in output.summary_errors() {
                eprintln!("  {}", err);
            }
        }
    }

    Ok(())
}

/// Report, then each summary under its own heading.
fn print_report(output: &AnalysisOutput) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(output.report.as_bytes())
        .context("Failed to write to stdout")?;
    for summary in &output.summaries {
        write!(
            handle,
            "\n---\n\n## 🗣️ {}\n\n{}\n",
            summary.language.prompt_name(),
            summary.text.trim()
        )
        .context("Failed to write to stdout")?;
    }
    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let temperatures = StageTemperatures {
        ocr: cli.ocr_temperature,
        extraction: cli.extraction_temperature,
        interpretation: cli.interpretation_temperature,
        recommendation: cli.recommendation_temperature,
        summary: cli.summary_temperature,
    };

    let mut builder = AnalysisConfig::builder()
        .report_language(cli.language)
        .top_k(cli.top_k)
        .temperatures(temperatures)
        .max_tokens(cli.max_tokens)
        .summary_max_tokens(cli.summary_max_tokens)
        .max_retries(cli.max_retries)
        .retry_backoff_ms(cli.retry_backoff_ms)
        .api_timeout_secs(cli.api_timeout)
        .ocr_fallback(!cli.no_ocr)
        .dpi(cli.dpi)
        .max_rendered_pixels(cli.max_pixels)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref dir) = cli.knowledge_dir {
        builder = builder.knowledge_dir(dir);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref dir) = cli.debug_dir {
        builder = builder.debug_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
