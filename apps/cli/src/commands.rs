//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use krishimitra_core::{
    AdvisoryFlow, AdvisoryRequest, Conversation, MarketFlow, ProgressReporter, WeatherPoller,
    diagnose,
};
use krishimitra_markdown::{
    AdvisoryKind, ExtractorRegistry, html_to_blocks, render_recommendation,
};
use krishimitra_services::{
    AssistantClient, BlogClient, DiseaseClient, NewsClient, NewsFeed, Upload, VideoCategory,
    VideoClient, blogs,
};
use krishimitra_shared::{
    AppConfig, Coordinates, FallbackPolicy, SessionContext, UserProfile, init_config, load_config,
    load_config_from,
};

use crate::render;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// KrishiMitra+: crop diagnosis, weather advisories and market insight.
#[derive(Parser)]
#[command(
    name = "krishimitra",
    version,
    about = "Crop disease diagnosis, weather advisories, farming news and market insight.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.krishimitra/krishimitra.toml.
    #[arg(long, global = true, env = "KRISHIMITRA_CONFIG")]
    pub config: Option<PathBuf>,

    /// HTTP timeout in seconds (overrides [http].timeout_secs).
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Print results as JSON instead of formatted text.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Diagnose a plant disease from a leaf image.
    Diagnose {
        /// Image file to classify.
        image: Option<PathBuf>,
    },

    /// Talk to the farming assistant.
    Chat {
        /// Send a single message and exit. Without it, start an interactive session.
        message: Option<String>,

        /// Send a recorded audio question instead of text.
        #[arg(long, conflicts_with = "message")]
        voice: Option<PathBuf>,
    },

    /// Weather conditions, alerts and growing advice for a location.
    Advise {
        /// Place name to geocode.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        place: Option<String>,

        /// Latitude (requires --lon).
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude (requires --lat).
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Plant to tailor the advice to.
        #[arg(long)]
        plant: Option<String>,

        /// Email for alert subscriptions.
        #[arg(long)]
        email: Option<String>,

        /// Keep polling until interrupted.
        #[arg(long)]
        watch: bool,

        /// Seconds between polls (overrides [weather].poll_interval_secs).
        #[arg(long, requires = "watch")]
        interval: Option<u64>,
    },

    /// Agriculture news.
    News {
        /// Only show articles mentioning this term.
        #[arg(short, long)]
        search: Option<String>,

        /// Number of pages to load.
        #[arg(long, default_value = "1")]
        pages: u32,
    },

    /// Plant-care videos.
    Videos {
        /// Category: all, soil-health, crop-rotation, pest-management, irrigation, harvest-techniques.
        #[arg(short, long, default_value = "all")]
        category: VideoCategory,

        /// Cursor from a previous page.
        #[arg(long)]
        page_token: Option<String>,
    },

    /// Plant-disease blog posts.
    Blogs {
        /// Only show posts mentioning this term.
        #[arg(short, long)]
        search: Option<String>,

        /// Fetch and render one article.
        #[arg(long, conflicts_with = "search")]
        read: Option<String>,
    },

    /// Market prices, comparison, forecast and recommendations.
    Market {
        /// Crop to look up.
        #[arg(long, default_value = "Wheat")]
        crop: String,

        /// Market to look up.
        #[arg(long, default_value = "Wholesale Hub")]
        market: String,

        /// What to do when a panel fails (overrides [market].fallback).
        #[arg(long)]
        fallback: Option<FallbackArg>,

        /// Forecast horizon in days (overrides [market].forecast_days).
        #[arg(long)]
        days: Option<u32>,
    },

    /// Render recommendation or advisory text from a file (or stdin with `-`).
    Render {
        /// Input file, or `-` for stdin.
        input: PathBuf,

        /// How to interpret the text.
        #[arg(short, long, default_value = "recommendation")]
        kind: RenderKind,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FallbackArg {
    Surface,
    Synthesize,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Surface => FallbackPolicy::Surface,
            FallbackArg::Synthesize => FallbackPolicy::Synthesize,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum RenderKind {
    Recommendation,
    Soil,
    Seasonal,
    Plants,
    Html,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "krishimitra=warn",
        1 => "krishimitra=info",
        2 => "krishimitra=debug",
        _ => "krishimitra=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    let out = Output { json: cli.json };

    match cli.command {
        Command::Diagnose { image } => cmd_diagnose(&config, image.as_deref(), out).await,
        Command::Chat { message, voice } => {
            cmd_chat(&config, message.as_deref(), voice.as_deref(), out).await
        }
        Command::Advise {
            place,
            lat,
            lon,
            plant,
            email,
            watch,
            interval,
        } => {
            let request = AdvisoryRequest {
                place,
                coordinates: lat.zip(lon).map(|(lat, lon)| Coordinates::new(lat, lon)),
                plant_name: plant,
            };
            cmd_advise(&config, request, email, watch, interval, out).await
        }
        Command::News { search, pages } => cmd_news(&config, search.as_deref(), pages, out).await,
        Command::Videos {
            category,
            page_token,
        } => cmd_videos(&config, category, page_token.as_deref(), out).await,
        Command::Blogs { search, read } => {
            cmd_blogs(&config, search.as_deref(), read.as_deref(), out).await
        }
        Command::Market {
            crop,
            market,
            fallback,
            days,
        } => {
            let mut config = config;
            if let Some(fallback) = fallback {
                config.market.fallback = fallback.into();
            }
            if let Some(days) = days {
                config.market.forecast_days = days;
            }
            cmd_market(&config, &crop, &market, out).await
        }
        Command::Render { input, kind } => cmd_render(&input, kind, out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

/// Load the config file, then apply global flag overrides.
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    Ok(config)
}

/// Chooses between formatted text and JSON for results.
#[derive(Clone, Copy)]
struct Output {
    json: bool,
}

impl Output {
    fn emit<T: Serialize>(self, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", text(value));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_diagnose(config: &AppConfig, image: Option<&Path>, out: Output) -> Result<()> {
    let client = DiseaseClient::from_config(config)?;
    let upload = match image {
        Some(path) => Some(Upload::from_path(path).await?),
        None => None,
    };

    let spinner = CliProgress::new();
    spinner.phase("Analyzing image");
    let result = diagnose(&client, upload).await;
    spinner.clear();

    out.emit(&result?, render::diagnosis)
}

async fn cmd_chat(
    config: &AppConfig,
    message: Option<&str>,
    voice: Option<&Path>,
    out: Output,
) -> Result<()> {
    let mut conversation = Conversation::new(AssistantClient::from_config(config)?);

    if let Some(path) = voice {
        let audio = Upload::from_path(path).await?;
        let reply = conversation.send_voice(audio).await.clone();
        return out.emit(&reply, render::chat_message);
    }

    if let Some(message) = message {
        return match conversation.send(message).await {
            Some(reply) => {
                let reply = reply.clone();
                out.emit(&reply, render::chat_message)
            }
            None => Err(eyre!("message is empty")),
        };
    }

    print!("{}", render::chat_message(&conversation.messages()[0]));
    println!("Try: {}", conversation.suggestions().join(" | "));
    println!("Commands: /reset, /quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/reset" => {
                conversation.reset().await;
                print!("{}", render::chat_message(&conversation.messages()[0]));
            }
            text => {
                if let Some(reply) = conversation.send(text).await {
                    print!("{}", render::chat_message(reply));
                }
            }
        }
    }
    Ok(())
}

async fn cmd_advise(
    config: &AppConfig,
    request: AdvisoryRequest,
    email: Option<String>,
    watch: bool,
    interval: Option<u64>,
    out: Output,
) -> Result<()> {
    let flow = AdvisoryFlow::from_config(config)?;
    let mut session = SessionContext::default();
    if let Some(email) = email {
        session = session.with_user(UserProfile {
            id: "cli".into(),
            display_name: "CLI user".into(),
            email: Some(email),
        });
    }

    let spinner = CliProgress::new();
    spinner.phase("Fetching weather advisory");
    let result = flow.advise(&request, &mut session).await;
    spinner.clear();
    let (target, report) = result?;
    out.emit(&report, render::advisory_report)?;

    if !watch {
        return Ok(());
    }

    let period = interval.unwrap_or(config.weather.poll_interval_secs);
    info!(period, "watching for weather changes");
    eprintln!("Refreshing every {period}s. Press Ctrl-C to stop.");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let polls = WeatherPoller::new(&flow, target, Duration::from_secs(period))
        .run(
            |result| match result {
                Ok(report) => {
                    if let Err(e) = out.emit(&report, render::advisory_report) {
                        eprintln!("could not print advisory: {e}");
                    }
                }
                Err(e) => eprintln!("Refresh failed: {}", e.user_message()),
            },
            shutdown,
        )
        .await;

    info!(polls, "stopped watching");
    Ok(())
}

async fn cmd_news(config: &AppConfig, search: Option<&str>, pages: u32, out: Output) -> Result<()> {
    let client = NewsClient::from_config(config)?;
    let mut feed = NewsFeed::new();

    let spinner = CliProgress::new();
    for page in 1..=pages.max(1) {
        if !feed.has_more() {
            break;
        }
        spinner.phase(&format!("Loading news page {page}"));
        feed.load_more(&client).await?;
    }
    spinner.clear();

    let articles = feed.search(search.unwrap_or_default());
    out.emit(&articles, |articles| {
        articles
            .iter()
            .map(|a| {
                let when = a
                    .published_at
                    .map(|t| t.format("%d %b %Y").to_string())
                    .unwrap_or_default();
                format!(
                    "{}\n  {} {}\n  {}\n  {}\n\n",
                    a.title,
                    a.source.as_deref().unwrap_or("Unknown source"),
                    when,
                    a.content,
                    a.url
                )
            })
            .collect()
    })
}

async fn cmd_videos(
    config: &AppConfig,
    category: VideoCategory,
    page_token: Option<&str>,
    out: Output,
) -> Result<()> {
    let client = VideoClient::from_config(config)?;

    let spinner = CliProgress::new();
    spinner.phase(&format!("Searching {}", category.label()));
    let page = client.search(category, page_token).await;
    spinner.clear();

    out.emit(&page?, |page| {
        let mut text: String = page
            .videos
            .iter()
            .map(|v| {
                format!(
                    "{}\n  {}\n  {}\n\n",
                    v.title,
                    v.channel.as_deref().unwrap_or("Unknown channel"),
                    v.embed_url()
                )
            })
            .collect();
        if let Some(token) = &page.next_page_token {
            text.push_str(&format!("More: --page-token {token}\n"));
        }
        text
    })
}

async fn cmd_blogs(
    config: &AppConfig,
    search: Option<&str>,
    read: Option<&str>,
    out: Output,
) -> Result<()> {
    let client = BlogClient::from_config(config)?;
    let spinner = CliProgress::new();

    if let Some(url) = read {
        spinner.phase("Fetching article");
        let article = client.article(url).await;
        spinner.clear();
        return out.emit(&article?, |article| render::blocks(&article.blocks));
    }

    spinner.phase("Fetching blog listing");
    let posts = client.list().await;
    spinner.clear();
    let posts = posts?;

    let shown = blogs::search(&posts, search.unwrap_or_default());
    out.emit(&shown, |shown| {
        shown
            .iter()
            .map(|p| {
                format!(
                    "{}\n  {}\n  {}\n\n",
                    p.title,
                    p.description,
                    p.url.as_deref().unwrap_or("(no link)")
                )
            })
            .collect()
    })
}

async fn cmd_market(config: &AppConfig, crop: &str, market: &str, out: Output) -> Result<()> {
    let flow = MarketFlow::from_config(config)?;
    let progress = CliProgress::new();
    let dashboard = flow.dashboard(crop, market, &progress).await;
    progress.clear();

    out.emit(&dashboard?, render::dashboard)
}

async fn cmd_render(input: &Path, kind: RenderKind, out: Output) -> Result<()> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut tokio::io::stdin(), &mut buf).await?;
        buf
    } else {
        tokio::fs::read_to_string(input)
            .await
            .map_err(|e| eyre!("cannot read {}: {e}", input.display()))?
    };

    let registry = ExtractorRegistry::new();
    let advisory_kind = match kind {
        RenderKind::Recommendation => {
            return out.emit(&render_recommendation(&text), render::recommendation);
        }
        RenderKind::Html => {
            let blocks = html_to_blocks(&text)?;
            return out.emit(&blocks, |b| render::blocks(b));
        }
        RenderKind::Soil => AdvisoryKind::Soil,
        RenderKind::Seasonal => AdvisoryKind::Seasonal,
        RenderKind::Plants => AdvisoryKind::Plants,
    };
    out.emit(&registry.render(advisory_kind, &text), render::advisory)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    fn clear(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn warn(&self, message: &str) {
        self.spinner.println(format!("  warning: {message}"));
    }

    fn done(&self, _summary: &str) {
        self.spinner.finish_and_clear();
    }
}
