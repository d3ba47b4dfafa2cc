//! CLI binary for convertai.
//!
//! A thin shim over the library crate: one subcommand per tool, mapped to a
//! `ToolJob`, with artifacts written into the output directory.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use convertai::{
    present, Artifact, FileIntake, Pipeline, ProgressCallback, SourceFile, ToolId, ToolJob,
    ToolProgressCallback, ToolkitConfigBuilder, TOOLS,
};
use convertai::state::ErrorInfo;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Percentage bar for one tool run, plus a log line per finished unit.
struct CliProgressCallback {
    bar: ProgressBar,
    /// "page" or "file", for the per-unit lines.
    unit: &'static str,
}

impl CliProgressCallback {
    fn new(unit: &'static str) -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar, unit })
    }
}

impl ToolProgressCallback for CliProgressCallback {
    fn on_run_start(&self, tool: ToolId, initial_progress: u8) {
        self.bar.set_prefix(tool.descriptor().title);
        self.bar.set_position(initial_progress as u64);
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(percent as u64);
    }

    fn on_unit_complete(&self, unit: usize, total: usize) {
        self.bar.println(format!(
            "  {} {} {:>3}/{:<3}",
            green("✓"),
            self.unit,
            unit,
            total
        ));
    }

    fn on_run_complete(&self, artifacts: &[Artifact]) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} artifact(s) ready",
            green("✔"),
            bold(&artifacts.len().to_string())
        );
    }

    fn on_run_error(&self, error: &ErrorInfo) {
        self.bar.finish_and_clear();
        eprintln!("{} {}", red("✘"), red(&error.message));
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Merge PDFs in the order given
  convertai merge-pdf a.pdf b.pdf c.pdf -o out/

  # Pages 2 to 5 of a document
  convertai split-pdf --start 2 --end 5 report.pdf

  # Every page as a JPEG
  convertai pdf-to-jpg slides.pdf -o pages/

  # Tables out of a scanned PDF (needs an API key)
  convertai pdf-to-excel invoice.pdf

  # AI text tools; print the result instead of writing a file
  convertai summarize notes.txt --stdout
  convertai translate --to de notes.txt
  convertai correct-text draft.txt

  # AI image tools
  convertai remove-background photo.jpg
  convertai edit-image --prompt "make the sky purple" photo.png

  # QR code (no input file)
  convertai qr-generator "https://convertai.life" --dark "#1e3a8a"

  # What is available
  convertai list --json

ENVIRONMENT VARIABLES:
  API_KEY                 Gemini API key (wins over GEMINI_API_KEY)
  GEMINI_API_KEY          Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Route text AI through an edgequake-llm provider
  EDGEQUAKE_MODEL         Model ID for that provider
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  CONVERTAI_OUTPUT_DIR    Default output directory
  RUST_LOG                Override the log filter

NOTES:
  Image editing and background removal need the Gemini backend; other
  providers return text only.
  PDF tools need the pdfium shared library. Text and QR tools do not.
"##;

/// Convert documents and images, and run AI text and image tools.
#[derive(Parser, Debug)]
#[command(
    name = "convertai",
    version,
    about = "Convert documents and images, and run AI text and image tools",
    long_about = "Convert between PDF, DOCX, text and image formats, and run AI-backed tools \
(summarise, translate, correct, background removal, image editing, table extraction) over \
Google Gemini or any edgequake-llm provider.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory to write artifacts into.
    #[arg(short, long, global = true, env = "CONVERTAI_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print text artifacts to stdout instead of writing files.
    #[arg(long, global = true)]
    stdout: bool,

    /// Gemini API key.
    #[arg(long, global = true, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST base URL.
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    /// edgequake-llm provider (openai, anthropic, gemini, ollama, auto).
    #[arg(
        long,
        global = true,
        long_help = "Route AI calls through an edgequake-llm provider instead of the Gemini \
          REST backend. `auto` picks EDGEQUAKE_LLM_PROVIDER/EDGEQUAKE_MODEL, then whatever API \
          key is present in the environment."
    )]
    provider: Option<String>,

    /// Model for text tools and table extraction.
    #[arg(long, global = true)]
    model: Option<String>,

    /// Model for image tools.
    #[arg(long, global = true)]
    image_model: Option<String>,

    /// HTTP timeout for AI calls, in seconds (none by default).
    #[arg(long, global = true, env = "CONVERTAI_TIMEOUT")]
    timeout: Option<u64>,

    /// Render scale for PDF → JPG.
    #[arg(long, global = true)]
    jpg_scale: Option<f32>,

    /// JPEG quality for PDF → JPG (1–100).
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpg_quality: Option<u8>,

    /// Path to libpdfium (file or directory).
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Disable progress bar.
    #[arg(long, global = true, env = "CONVERTAI_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONVERTAI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "CONVERTAI_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct Inputs {
    /// Input files, processed in the order given.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct Input {
    /// Input file.
    file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every tool.
    List {
        /// Print the catalog as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Merge PDFs into one document.
    MergePdf(Inputs),
    /// Extract a page range into a new PDF.
    SplitPdf {
        #[command(flatten)]
        input: Input,
        /// First page (1-based).
        #[arg(long)]
        start: usize,
        /// Last page (inclusive).
        #[arg(long)]
        end: usize,
    },
    /// Render every page to a JPEG.
    PdfToJpg(Input),
    /// Extract PDF text into a DOCX.
    PdfToWord(Input),
    /// Extract tables from a PDF into CSV (AI).
    PdfToExcel(Input),
    /// Compress a PDF (coming soon).
    CompressPdf(Input),
    /// Lay out DOCX text as a PDF.
    WordToPdf(Input),
    /// Extract DOCX text.
    DocxToText(Input),
    /// Excel to PDF (coming soon).
    ExcelToPdf(Input),
    /// One PDF page per image.
    ImageToPdf(Inputs),
    /// Summarise a text file (AI).
    Summarize(Input),
    /// Translate a text file (AI).
    Translate {
        #[command(flatten)]
        input: Input,
        /// Target language, as a code (de) or a name (German).
        #[arg(long)]
        to: String,
    },
    /// Fix grammar and spelling (AI).
    CorrectText(Input),
    /// Remove an image's background (AI).
    RemoveBackground(Input),
    /// Edit an image from an instruction (AI).
    EditImage {
        #[command(flatten)]
        input: Input,
        /// What to change.
        #[arg(long)]
        prompt: String,
    },
    /// Generate a QR code PNG.
    QrGenerator {
        /// Text or URL to encode.
        #[arg(default_value = "https://convertai.life")]
        text: String,
        /// Foreground colour.
        #[arg(long, default_value = "#000000")]
        dark: String,
        /// Background colour.
        #[arg(long, default_value = "#ffffff")]
        light: String,
    },
}

impl Command {
    /// The job and its input paths. `None` for `list`.
    fn job(self) -> Option<(ToolJob, Vec<PathBuf>)> {
        let one = |i: Input| vec![i.file];
        Some(match self {
            Command::List { .. } => return None,
            Command::MergePdf(i) => (ToolJob::MergePdf, i.files),
            Command::SplitPdf { input, start, end } => (ToolJob::SplitPdf { start, end }, one(input)),
            Command::PdfToJpg(i) => (ToolJob::PdfToJpg, one(i)),
            Command::PdfToWord(i) => (ToolJob::PdfToWord, one(i)),
            Command::PdfToExcel(i) => (ToolJob::PdfToExcel, one(i)),
            Command::CompressPdf(i) => (ToolJob::CompressPdf, one(i)),
            Command::WordToPdf(i) => (ToolJob::WordToPdf, one(i)),
            Command::DocxToText(i) => (ToolJob::DocxToText, one(i)),
            Command::ExcelToPdf(i) => (ToolJob::ExcelToPdf, one(i)),
            Command::ImageToPdf(i) => (ToolJob::ImageToPdf, i.files),
            Command::Summarize(i) => (ToolJob::Summarize, one(i)),
            Command::Translate { input, to } => (ToolJob::Translate { language: to }, one(input)),
            Command::CorrectText(i) => (ToolJob::CorrectGrammar, one(i)),
            Command::RemoveBackground(i) => (ToolJob::RemoveBackground, one(i)),
            Command::EditImage { input, prompt } => {
                (ToolJob::EditImage { instruction: prompt }, one(input))
            }
            Command::QrGenerator { text, dark, light } => {
                (ToolJob::QrCode { text, dark, light }, Vec::new())
            }
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
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

    if let Command::List { json } = cli.command {
        return list_tools(json);
    }

    let config = build_config(&cli)?;
    let quiet = cli.quiet;
    let to_stdout = cli.stdout;
    let output_dir = cli.output_dir.clone();
    let Some((job, paths)) = cli.command.job() else {
        return Ok(());
    };
    let tool = job.tool_id();
    let descriptor = tool.descriptor();

    if descriptor.is_coming_soon {
        eprintln!("{} {} is coming soon.", cyan("◆"), bold(descriptor.title));
        return Ok(());
    }

    // ── Intake ───────────────────────────────────────────────────────────
    let mut intake = FileIntake::new(descriptor.accept, descriptor.mode);
    if !paths.is_empty() {
        let mut drop = Vec::with_capacity(paths.len());
        for path in &paths {
            drop.push(
                SourceFile::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            );
        }
        let report = intake.accept(drop).context("No usable input files")?;
        if let Some(warning) = report.warning(&descriptor.accept) {
            if !quiet {
                eprintln!("{} {}", cyan("⚠"), warning);
            }
        }
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let mut pipeline = Pipeline::for_tool(config, tool).context("Failed to initialise engines")?;
    if show_progress {
        let unit = match tool {
            ToolId::MergePdf | ToolId::ImageToPdf => "file",
            _ => "page",
        };
        let cb: ProgressCallback = CliProgressCallback::new(unit);
        pipeline = pipeline.with_callback(cb);
    }

    let artifacts = pipeline
        .run(&intake.files(), &job)
        .await
        .with_context(|| format!("{} failed", descriptor.title))?;

    // ── Present ──────────────────────────────────────────────────────────
    if to_stdout && artifacts.iter().all(|a| a.text().is_some()) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for artifact in &artifacts {
            let text = artifact.text().unwrap_or_default();
            handle
                .write_all(text.as_bytes())
                .context("Failed to write to stdout")?;
            if !text.ends_with('\n') {
                handle.write_all(b"\n").ok();
            }
        }
        return Ok(());
    }

    let written = present::save_artifacts(&output_dir, &artifacts)
        .await
        .context("Failed to save results")?;
    if !quiet {
        eprintln!("{}", present::describe(&pipeline.state()));
        for path in &written {
            eprintln!("   {} {}", dim("→"), bold(&path.display().to_string()));
        }
    }
    Ok(())
}

/// Map CLI args onto the environment-derived config.
fn build_config(cli: &Cli) -> Result<convertai::ToolkitConfig> {
    let mut b = ToolkitConfigBuilder::from_env();
    if let Some(ref key) = cli.api_key {
        b = b.api_key(key);
    }
    if let Some(ref url) = cli.api_base_url {
        b = b.api_base_url(url);
    }
    if let Some(ref provider) = cli.provider {
        b = b.provider_name(provider);
    }
    if let Some(ref model) = cli.model {
        b = b.text_model(model);
    }
    if let Some(ref model) = cli.image_model {
        b = b.image_model(model);
    }
    if let Some(secs) = cli.timeout {
        b = b.request_timeout_secs(secs);
    }
    if let Some(scale) = cli.jpg_scale {
        b = b.jpg_scale(scale);
    }
    if let Some(q) = cli.jpg_quality {
        b = b.jpg_quality(q);
    }
    if let Some(ref path) = cli.pdfium_lib {
        b = b.pdfium_library_path(path);
    }
    b.build().context("Invalid configuration")
}

fn list_tools(json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&TOOLS[..]).context("Failed to serialise catalog")?
        );
        return Ok(());
    }
    for t in TOOLS.iter() {
        let status = if t.is_coming_soon {
            dim("coming soon")
        } else {
            String::new()
        };
        println!(
            "{:<18} {:<10} {:<22} {}",
            bold(t.id.as_str()),
            t.category.to_string(),
            t.title,
            status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn long_help_keeps_every_example() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains(r##""#1e3a8a""##), "help: {help}");
        assert!(help.contains("pdfium shared library"));
    }

    #[test]
    fn qr_colours_parse_into_the_job() {
        let cli = Cli::try_parse_from(["convertai", "qr-generator", "hello", "--dark", "#1e3a8a"])
            .unwrap();
        let (job, inputs) = cli.command.job().unwrap();
        assert!(inputs.is_empty());
        assert_eq!(
            job,
            ToolJob::QrCode {
                text: "hello".into(),
                dark: "#1e3a8a".into(),
                light: "#ffffff".into(),
            }
        );
    }

    #[test]
    fn split_takes_an_inclusive_range() {
        let cli = Cli::try_parse_from(["convertai", "split-pdf", "a.pdf", "--start", "2", "--end", "4"])
            .unwrap();
        let (job, inputs) = cli.command.job().unwrap();
        assert_eq!(job, ToolJob::SplitPdf { start: 2, end: 4 });
        assert_eq!(inputs, vec![PathBuf::from("a.pdf")]);
    }
}
