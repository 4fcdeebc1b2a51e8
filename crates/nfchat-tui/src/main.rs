use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nfchat_core::{ChatController, Config, GeminiClient, PdfExtractor};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

const DEFAULT_LOG_FILTER: &str = "nfchat=info,nfchat_core=info";

#[derive(Parser)]
#[command(name = "nfchat", version)]
#[command(about = "Chat with Gemini in the terminal, with PDF attachments")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Gemini model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// API root, or a relay that adds the API key server-side
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Log file for the chat screen (default: <cache dir>/nfchat/nfchat.log)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chat screen (default)
    Chat,
    /// Send one message and print the reply
    Ask {
        /// Your message
        prompt: String,
        /// PDF whose text is attached to the message
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Save settings (--model and --endpoint are saved too) and print them
    Config {
        /// Gemini API key (GEMINI_API_KEY takes precedence when set)
        #[arg(long)]
        api_key: Option<String>,
        /// Directory containing the pdfium shared library
        #[arg(long)]
        pdfium_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None | Some(Commands::Chat) => {
            init_file_logging(cli.log_file.clone())?;
            let config = load_config();
            let (client, extractor) = build_clients(&cli, &config);
            run_chat(client, extractor).await
        }
        Some(Commands::Ask { ref prompt, ref pdf }) => {
            init_stderr_logging();
            let config = load_config();
            let (client, extractor) = build_clients(&cli, &config);
            ask(&client, &extractor, prompt, pdf.as_deref()).await
        }
        Some(Commands::Config { ref api_key, ref pdfium_dir }) => {
            init_stderr_logging();
            update_config(&cli, api_key.clone(), pdfium_dir.clone())
        }
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// The terminal belongs to the chat screen, so logs go to a file.
fn init_file_logging(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(p) => p,
        None => dirs::cache_dir()
            .context("Could not determine cache directory; pass --log-file")?
            .join("nfchat")
            .join("nfchat.log"),
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();

    Ok(())
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!("Ignoring unreadable config: {}", e);
        Config::new()
    })
}

fn build_clients(cli: &Cli, config: &Config) -> (GeminiClient, PdfExtractor) {
    let model = cli.model.as_deref().unwrap_or(config.model());
    let endpoint = cli.endpoint.as_deref().unwrap_or(config.endpoint());

    info!(model, endpoint, "using Gemini endpoint");

    let client = GeminiClient::new(endpoint, model, config.api_key());
    let extractor = PdfExtractor::new(config.pdfium_dir.clone());
    (client, extractor)
}

async fn run_chat(client: GeminiClient, extractor: PdfExtractor) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(client, extractor, events.sender());

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}

async fn ask(
    client: &GeminiClient,
    extractor: &PdfExtractor,
    prompt: &str,
    pdf: Option<&std::path::Path>,
) -> Result<()> {
    let mut controller = ChatController::new();

    if let Some(path) = pdf {
        controller.upload(extractor, path).await;
    }

    if let Some(reply) = controller.send(client, prompt).await {
        println!("{}", reply.content);
    }

    Ok(())
}

fn update_config(cli: &Cli, api_key: Option<String>, pdfium_dir: Option<PathBuf>) -> Result<()> {
    let mut config = load_config();

    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(endpoint) = &cli.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(key) = api_key {
        config.api_key = Some(key);
    }
    if let Some(dir) = pdfium_dir {
        config.pdfium_dir = Some(dir);
    }
    config.save()?;

    let path = Config::get_config_path()?;
    println!("Config: {}", path.display());
    println!("  model:      {}", config.model());
    println!("  endpoint:   {}", config.endpoint());
    println!("  api key:    {}", mask_key(config.api_key.as_deref()));
    println!(
        "  pdfium dir: {}",
        config
            .pdfium_dir
            .as_ref()
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(system)".to_string())
    );
    Ok(())
}

/// Mask the key, showing only the last 4 characters
fn mask_key(key: Option<&str>) -> String {
    match key {
        None => "(not set)".to_string(),
        Some(k) if k.chars().count() <= 4 => "*".repeat(k.chars().count()),
        Some(k) => {
            let count = k.chars().count();
            let last_four: String = k.chars().skip(count - 4).collect();
            format!("{}{}", "*".repeat((count - 4).min(20)), last_four)
        }
    }
}
