//! CLI binary for docimprover.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ImproveConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use docimprover::pipeline::{decompose, input};
use docimprover::{improve_to_file, ImproveConfig, OpenAiGateway};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Improve a document (writes report.improved.docx next to the input)
  docimprove report.docx

  # Explicit output path and model
  docimprove report.docx -o polished.docx --model gpt-4

  # Keep the extracted images on disk
  docimprove report.docx --media-dir ./media

  # Extract text and images without calling the LLM (no API key needed)
  docimprove report.docx --extract-only --media-dir ./media

  # Print the decomposed text to stdout instead of improving
  docimprove report.docx --dump-text

  # Non-default endpoint (Azure, local proxy, vLLM, …)
  OPENAI_BASE_URL=http://localhost:8000/v1 docimprove report.docx

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY    API key for the rewrite endpoint (required unless
                    --extract-only or --dump-text)
  OPENAI_BASE_URL   Override the API endpoint (default: https://api.openai.com/v1)

SETUP:
  1. Set API key:  export OPENAI_API_KEY=sk-...
  2. Improve:      docimprove report.docx -o report.improved.docx
"#;

/// Improve the prose of a Word document with an LLM, preserving images.
#[derive(Parser, Debug)]
#[command(
    name = "docimprove",
    version,
    about = "Improve the prose of a Word document with an LLM, preserving images",
    long_about = "Improve the clarity and grammar of a .docx document using an \
OpenAI-compatible chat endpoint. Embedded images are carried through the round \
trip untouched and re-embedded at their original positions.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the input .docx file.
    input: PathBuf,

    /// Output path. Default: `<input stem>.improved.docx` next to the input.
    #[arg(short, long, env = "DOCIMPROVE_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID sent to the endpoint.
    #[arg(long, env = "DOCIMPROVE_MODEL", default_value = "gpt-4")]
    model: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "DOCIMPROVE_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max tokens the endpoint may generate.
    #[arg(long, env = "DOCIMPROVE_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Per-call HTTP timeout in seconds.
    #[arg(long, env = "DOCIMPROVE_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Per-image size threshold in megabytes; larger images are dropped with
    /// an in-document marker.
    #[arg(long, env = "DOCIMPROVE_MAX_IMAGE_MB", default_value_t = 10)]
    max_image_mb: u64,

    /// Aggregate image size threshold in megabytes; exceeding it aborts.
    #[arg(long, env = "DOCIMPROVE_MAX_TOTAL_IMAGE_MB", default_value_t = 50)]
    max_total_image_mb: u64,

    /// Persistent directory for extracted media files.
    #[arg(long, env = "DOCIMPROVE_MEDIA_DIR")]
    media_dir: Option<PathBuf>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "DOCIMPROVE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Decompose only: extract text and media, skip the LLM call.
    #[arg(long)]
    extract_only: bool,

    /// Print the decomposed text (placeholders included) to stdout and exit.
    #[arg(long)]
    dump_text: bool,

    /// Print run statistics as JSON to stderr.
    #[arg(long, env = "DOCIMPROVE_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCIMPROVE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOCIMPROVE_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    // ── Extract-only modes (no API key needed) ───────────────────────────
    if cli.extract_only || cli.dump_text {
        let bytes = input::read_docx(&cli.input).context("Failed to read input document")?;
        let decomposition =
            decompose::decompose(&bytes, &config).context("Failed to decompose document")?;

        if cli.dump_text {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(decomposition.text.as_bytes())?;
            if !decomposition.text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }

        if let Some(ref dir) = config.media_dir {
            let session = docimprover::session::Session::new()?;
            session.extract_media(&decomposition.registry, dir)?;
            if !cli.quiet {
                eprintln!(
                    "{} {} images extracted to {}",
                    green("✔"),
                    decomposition.registry.len(),
                    bold(&dir.display().to_string()),
                );
            }
        } else if cli.extract_only && !cli.quiet {
            eprintln!(
                "{} {} paragraphs, {} images (pass --media-dir to keep the images)",
                green("✔"),
                decomposition.paragraph_count,
                decomposition.registry.len(),
            );
        }
        return Ok(());
    }

    // ── Full improvement run ─────────────────────────────────────────────
    let gateway = OpenAiGateway::from_env(&config)
        .context("Gateway setup failed (is OPENAI_API_KEY set?)")?;

    let output_path = cli.output.clone().unwrap_or_else(|| default_output(&cli.input));

    let spinner = if !cli.quiet {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Improving");
        bar.set_message(cli.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    let result = improve_to_file(&cli.input, &output_path, &gateway, &config);

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = result.context("Improvement failed")?;

    if cli.json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&output.stats).context("Failed to serialise stats")?
        );
    }

    if !cli.quiet {
        eprintln!(
            "{}  {} paragraphs, {}/{} images  {}ms  →  {}",
            if output.embed_errors.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.paragraphs,
            output.stats.images_embedded,
            output.stats.images_registered,
            output.stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        for err in &output.embed_errors {
            eprintln!("   {} {}", cyan("⚠"), err);
        }
        if let Some(ref dir) = output.media_dir {
            eprintln!("   {}", dim(&format!("media: {}", dir.display())));
        }
    }

    Ok(())
}

/// Map CLI args to `ImproveConfig`.
fn build_config(cli: &Cli) -> Result<ImproveConfig> {
    let mut builder = ImproveConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .gateway_timeout_secs(cli.timeout)
        .max_image_bytes(cli.max_image_mb * 1024 * 1024)
        .max_total_image_bytes(cli.max_total_image_mb * 1024 * 1024);

    if let Some(ref dir) = cli.media_dir {
        builder = builder.media_dir(dir);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// `report.docx` → `report.improved.docx`.
fn default_output(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}.improved.docx"))
}
