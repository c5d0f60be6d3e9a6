//! fereader command-line shell
//!
//! Drives the reader core from the terminal: inspect documents, render pages
//! to PNG, replay navigation commands and run conversions.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fereader::config::ReaderConfig;
use fereader::convert::{ConversionJob, ConversionMode};
use fereader::document::{Orientation, PasswordPrompt, ScriptedPrompt, ViewMode, Viewport};
use fereader::formats::LoadedDocument;
use fereader::session::{Command, PageView, ReaderSession};

#[derive(Parser)]
#[command(name = "fereader", version, about = "PDF/EPUB reader core")]
struct Cli {
    /// JSON settings file (defaults to FEREADER_* environment variables)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct OpenArgs {
    /// PDF or EPUB file
    path: PathBuf,

    /// Password for protected PDFs (prompted on stdin when omitted)
    #[arg(long)]
    password: Option<String>,

    /// Viewport width used for the initial fit
    #[arg(long, default_value_t = 1024.0)]
    width: f32,

    /// Viewport height used for the initial fit
    #[arg(long, default_value_t = 768.0)]
    height: f32,
}

#[derive(Subcommand)]
enum Commands {
    /// Print page count, zoom and metadata
    Info(OpenArgs),

    /// Render one page (or spread) to PNG, or dump an EPUB page's HTML
    Render {
        #[command(flatten)]
        open: OpenArgs,

        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: usize,

        /// Zoom in percent (defaults to fit-to-viewport)
        #[arg(long)]
        zoom: Option<f32>,

        /// Render the two-page spread starting at the page
        #[arg(long)]
        spread: bool,

        /// Output file
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Replay navigation and zoom commands, printing the status after each
    Walk {
        #[command(flatten)]
        open: OpenArgs,

        /// Comma-separated: next, prev, zoom-in, zoom-out, zoom=<percent>,
        /// horizontal, vertical, single, continuous
        #[arg(long, value_delimiter = ',')]
        commands: Vec<String>,
    },

    /// Generate a PDF or EPUB
    Convert {
        #[arg(value_enum)]
        mode: ModeArg,

        /// Input files (one text file, or images in page order)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long, short)]
        output: PathBuf,

        /// Encrypt PDF output with this password
        #[arg(long)]
        password: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    TextToPdf,
    TextToEpub,
    ImagesToPdf,
}

impl From<ModeArg> for ConversionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::TextToPdf => ConversionMode::TextToPdf,
            ModeArg::TextToEpub => ConversionMode::TextToEpub,
            ModeArg::ImagesToPdf => ConversionMode::ImagesToPdf,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fereader=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ReaderConfig::load_file(path)?,
        None => ReaderConfig::from_env(),
    };

    match cli.command {
        Commands::Info(open) => {
            let session = open_session(config, &open)?;
            print_info(&session);
        }
        Commands::Render {
            open,
            page,
            zoom,
            spread,
            out,
        } => {
            let mut session = open_session(config, &open)?;
            if spread {
                session.apply(Command::SetOrientation(Orientation::Horizontal));
            }
            if let Some(percent) = zoom {
                session.apply(Command::SetZoomPercent(percent));
            }
            session.go_to(page);
            write_view(&mut session, &out)?;
            println!("{} -> {}", session.status_line(), out.display());
        }
        Commands::Walk { open, commands } => {
            let mut session = open_session(config, &open)?;
            println!("{}", status(&session));
            for raw in &commands {
                let command = parse_command(raw)?;
                let changed = session.apply(command);
                // Materialize so cache rebuilds show up in the log
                session.current_view()?;
                println!("{raw:>12} {} {}", if changed { "*" } else { " " }, status(&session));
            }
        }
        Commands::Convert {
            mode,
            inputs,
            output,
            password,
        } => {
            let mut job = ConversionJob::new(mode.into(), inputs, &output);
            job.password = password;
            job.run()
                .with_context(|| format!("{} failed", job.mode.label()))?;
            println!("Wrote {}", output.display());
        }
    }

    Ok(())
}

fn open_session(config: ReaderConfig, args: &OpenArgs) -> Result<ReaderSession> {
    let mut session = ReaderSession::new(config);
    let viewport = Viewport::new(args.width, args.height);

    let result = match &args.password {
        Some(password) => {
            let mut prompt = ScriptedPrompt::new([password.clone()]);
            session.open(&args.path, &mut prompt, viewport)
        }
        None => session.open(&args.path, &mut StdinPrompt, viewport),
    };
    result.with_context(|| format!("Failed to open {}", args.path.display()))?;
    Ok(session)
}

/// Asks on stderr, reads one line from stdin; an empty line cancels
struct StdinPrompt;

impl PasswordPrompt for StdinPrompt {
    fn request_password(&mut self, attempt: u32) -> Option<String> {
        eprint!("Password (attempt {attempt}): ");
        std::io::stderr().flush().ok()?;
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        let password = line.trim_end_matches(['\r', '\n']).to_string();
        (!password.is_empty()).then_some(password)
    }
}

fn status(session: &ReaderSession) -> String {
    match session.zoom_percent() {
        Some(percent) => format!("{} | {}%", session.status_line(), percent),
        None => session.status_line(),
    }
}

fn print_info(session: &ReaderSession) {
    println!("{}", status(session));
    let Some(info) = session.info() else {
        return;
    };
    println!("path:  {}", info.path.display());
    println!("kind:  {}", info.kind.label());
    println!("pages: {}", session.page_count());
    if let Some(LoadedDocument::Markup(epub)) = session.document() {
        let metadata = epub.metadata();
        if let Some(title) = &metadata.title {
            println!("title: {title}");
        }
        if let Some(creator) = &metadata.creator {
            println!("by:    {creator}");
        }
        println!("workspace: {}", epub.workspace().root().display());
    }
}

fn write_view(session: &mut ReaderSession, out: &Path) -> Result<()> {
    match session.current_view()? {
        PageView::Raster(bitmap) => {
            let image = bitmap
                .to_image()
                .context("Rendered bitmap has an inconsistent buffer")?;
            image
                .save(out)
                .with_context(|| format!("Failed to write {}", out.display()))?;
        }
        PageView::Markup { html, .. } => {
            std::fs::write(out, html).with_context(|| format!("Failed to write {}", out.display()))?;
        }
        PageView::Continuous(_) | PageView::Empty => bail!("Nothing to render"),
    }
    Ok(())
}

fn parse_command(raw: &str) -> Result<Command> {
    let command = match raw.trim() {
        "next" => Command::Next,
        "prev" => Command::Prev,
        "zoom-in" => Command::ZoomIn,
        "zoom-out" => Command::ZoomOut,
        "horizontal" => Command::SetOrientation(Orientation::Horizontal),
        "vertical" => Command::SetOrientation(Orientation::Vertical),
        "single" => Command::SetViewMode(ViewMode::Single),
        "continuous" => Command::SetViewMode(ViewMode::Continuous),
        other => match other.strip_prefix("zoom=") {
            Some(percent) => Command::SetZoomPercent(
                percent
                    .parse()
                    .with_context(|| format!("Invalid zoom percent: {percent}"))?,
            ),
            None => bail!("Unknown command: {other}"),
        },
    };
    Ok(command)
}
