use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use epub_illustrator::auth::{self, AuthStorage, Provider, require_api_key};
use epub_illustrator::banner::{BannerInfo, print_banner, print_run_summary};
use epub_illustrator::cache::sqlite::SqliteCache;
use epub_illustrator::cache::{ImageCache, NoCache};
use epub_illustrator::config::{self, Config};
use epub_illustrator::consts::{
    DEFAULT_IMAGE_MODEL, DEFAULT_MAX_RETRIES, DEFAULT_MIN_CHARS, DEFAULT_RETRY_DELAY,
    DEFAULT_TEXT_MODEL, default_db_path, default_output_path,
};
use epub_illustrator::engine::illustrate::IllustrateEngine;
use epub_illustrator::engine::{Engine, IllustrateConfig};
use epub_illustrator::painter::stability::StabilityPainter;
use epub_illustrator::planner::gemini::GeminiPlanner;

#[derive(Parser)]
#[command(
    name = "epub-illustrator",
    version,
    about = "EPUB Illustrator - Add AI-generated illustrations to EPUB files",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to the input EPUB file
    epub_path: Option<PathBuf>,

    /// Path for the output illustrated EPUB (default: inputname_illustrated.epub)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum number of files to process (for testing)
    #[arg(short, long)]
    max_files: Option<usize>,

    /// Gemini model that places the illustrations
    #[arg(long)]
    model: Option<String>,

    /// Stability stable-image service (core, ultra, sd3)
    #[arg(long)]
    image_model: Option<String>,

    /// Skip chapters shorter than this many characters
    #[arg(long, default_value_t = DEFAULT_MIN_CHARS)]
    min_chars: usize,

    /// Attempts per chapter when the text model is overloaded
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY.as_secs())]
    retry_delay: u64,

    /// SQLite database for cache, credentials and config (default: ~/.epub-illustrator/illustrator.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Neither read nor write the image cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Store an API key for a provider
    Login {
        #[arg(value_enum)]
        provider: Provider,
    },
    /// Remove the stored API key for a provider
    Logout {
        #[arg(value_enum)]
        provider: Provider,
    },
    /// Read or change persistent settings (text_model, image_model)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Manage the image cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Get { key: String },
    Set { key: String, value: String },
    Unset { key: String },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Number of cached images
    Stats,
    /// Delete every cached image
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => default_db_path()?,
    };
    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let db = db_path.to_string_lossy().into_owned();

    if let Some(command) = &cli.command {
        return match command {
            Command::Login { provider } => handle_login(&db, *provider),
            Command::Logout { provider } => {
                auth::logout(&db, *provider)?;
                println!("✓ Logged out from {}.", provider.as_str());
                Ok(())
            }
            Command::Config { action } => handle_config(&db, action),
            Command::Cache { action } => handle_cache(&db, action).await,
        };
    }

    let Some(input) = cli.epub_path.clone() else {
        bail!("no EPUB given. Usage: epub-illustrator <EPUB_PATH> (see --help)");
    };
    if !input.is_file() {
        bail!("EPUB file not found: {}", input.display());
    }
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&input));

    let settings = Config::open(&db)?;
    let text_model = settings.resolve(config::TEXT_MODEL, cli.model.clone(), DEFAULT_TEXT_MODEL)?;
    let image_model = settings.resolve(
        config::IMAGE_MODEL,
        cli.image_model.clone(),
        DEFAULT_IMAGE_MODEL,
    )?;

    let storage = AuthStorage::open(&db)?;
    let google_key = require_api_key(&storage, Provider::Google)?;
    let stability_key = require_api_key(&storage, Provider::Stability)?;

    let cache: Box<dyn ImageCache> = if cli.no_cache {
        Box::new(NoCache)
    } else {
        Box::new(SqliteCache::new(&db)?)
    };
    let cache_label = if cli.no_cache {
        "disabled".to_string()
    } else {
        format!("{} ({} images)", db, cache.len().await?)
    };

    print_banner(&BannerInfo {
        input: &input,
        output: &output,
        text_model: &text_model,
        text_auth: storage.status(Provider::Google)?,
        image_model: &image_model,
        image_auth: storage.status(Provider::Stability)?,
        cache: &cache_label,
    });

    let planner = Box::new(GeminiPlanner::new(google_key, Some(text_model)));
    let painter = Box::new(StabilityPainter::new(stability_key, Some(image_model)));
    let config = IllustrateConfig {
        max_files: cli.max_files,
        min_chars: cli.min_chars,
        max_retries: cli.max_retries,
        retry_delay: Duration::from_secs(cli.retry_delay),
        show_progress: io::stderr().is_terminal(),
    };

    let mut engine = IllustrateEngine::new(planner, painter, cache, config);

    // Ctrl+C abandons the run; the scratch directory is cleaned up on drop.
    tokio::select! {
        result = engine.run(&input, &output) => {
            let report = result?;
            println!();
            print_run_summary(&report, &output);
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n\ninterrupted");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "epub_illustrator=debug"
    } else {
        "epub_illustrator=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn handle_login(db: &str, provider: Provider) -> anyhow::Result<()> {
    println!("Storing an API key for {}.\n", provider.as_str());

    // Try to open browser, silently ignore failures (e.g. headless/SSH)
    let _ = open::that(provider.key_page());

    println!("Create a key here if you don't have one:\n");
    println!("  {}\n", provider.key_page());

    print!("Paste the API key: ");
    io::stdout().flush()?;
    let mut key = String::new();
    io::stdin().read_line(&mut key)?;

    auth::login(db, provider, &key)?;

    println!("\n✓ Saved {} API key.", provider.as_str());
    println!("  Credentials stored in {db}");
    Ok(())
}

fn handle_config(db: &str, action: &ConfigAction) -> anyhow::Result<()> {
    let settings = Config::open(db)?;
    match action {
        ConfigAction::Get { key } => match settings.get(key)? {
            Some(value) => println!("{value}"),
            None => println!("{key} is not set"),
        },
        ConfigAction::Set { key, value } => {
            settings.set(key, value)?;
            println!("✓ {key} = {value}");
        }
        ConfigAction::Unset { key } => {
            settings.remove(key)?;
            println!("✓ {key} unset");
        }
    }
    Ok(())
}

async fn handle_cache(db: &str, action: &CacheAction) -> anyhow::Result<()> {
    let cache = SqliteCache::new(db)?;
    match action {
        CacheAction::Stats => println!("{} cached images in {db}", cache.len().await?),
        CacheAction::Clear => {
            let count = cache.len().await?;
            cache.clear().await?;
            println!("✓ Removed {count} cached images.");
        }
    }
    Ok(())
}
