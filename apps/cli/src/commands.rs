//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use newsdesk_backend::{Backend, BackendOptions, HttpBackend};
use newsdesk_core::{Desk, EnrichmentEntry, EnrichmentOrchestrator, SelectionToggle};
use newsdesk_shared::{
    AppConfig, Article, ArticleId, DateRange, FilterState, SortOrder, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Newsdesk: pull the day's news, triage it, and draft a digest.
#[derive(Parser)]
#[command(
    name = "newsdesk",
    version,
    about = "Run news ingestion, filter and rank stories, and build a top-stories digest.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend base URL. Overrides `[backend].base_url`.
    #[arg(long, env = "NEWSDESK_BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run ingestion and print the resulting stories.
    Run(RunArgs),

    /// Fetch a deep summary for a single article.
    Summarize {
        /// Article headline.
        #[arg(long)]
        title: String,

        /// Article URL.
        #[arg(long)]
        url: String,
    },

    /// List the source catalog.
    Sources,

    /// Check that the backend is reachable.
    Health,

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// First day of the window (YYYY-MM-DD). Defaults to the last day.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Catalog source id to ingest (repeatable). Defaults to `[defaults].sources`.
    #[arg(long = "source")]
    pub sources: Vec<String>,

    /// Case-insensitive text search over title, source, category and tags.
    #[arg(long)]
    pub search: Option<String>,

    /// Keep only these categories (repeatable).
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Keep only stories from these publishers (repeatable).
    #[arg(long = "publisher")]
    pub publishers: Vec<String>,

    /// Keep only stories carrying every one of these tags (repeatable).
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Keep only stories covered by several outlets.
    #[arg(long)]
    pub only_duplicates: bool,

    /// Keep only stories covered by a single outlet.
    #[arg(long)]
    pub only_unique: bool,

    /// Keep only the first ten stories.
    #[arg(long)]
    pub top_ranked: bool,

    /// Sort order: newest or oldest.
    #[arg(long)]
    pub sort: Option<SortOrder>,

    /// Article id to add to the top stories (repeatable, at most five).
    #[arg(long = "select")]
    pub select: Vec<String>,

    /// Article id to fetch a deep summary for (repeatable).
    #[arg(long = "deep")]
    pub deep: Vec<String>,

    /// Print the digest email for the selected stories.
    #[arg(long)]
    pub digest: bool,

    /// Print the visible stories as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "newsdesk=info",
        1 => "newsdesk=debug",
        _ => "newsdesk=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let backend_url = cli.backend_url;
    match cli.command {
        Command::Run(args) => cmd_run(backend_url.as_deref(), args).await,
        Command::Summarize { title, url } => {
            cmd_summarize(backend_url.as_deref(), &title, &url).await
        }
        Command::Sources => cmd_sources(),
        Command::Health => cmd_health(backend_url.as_deref()).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(backend_url.as_deref()),
        },
    }
}

/// Config file values with CLI overrides applied.
fn resolved_config(backend_url: Option<&str>) -> Result<AppConfig> {
    let mut config = load_config()?;
    if let Some(url) = backend_url {
        config.backend.base_url = url.to_string();
        config.validate()?;
    }
    Ok(config)
}

fn http_backend(config: &AppConfig) -> Result<HttpBackend> {
    Ok(HttpBackend::new(BackendOptions::from_config(config)?)?)
}

fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    Ok(spinner)
}

/// Missing ends default to today; a missing start collapses to the end day.
fn resolve_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<DateRange> {
    match (from, to) {
        (None, None) => Ok(DateRange::today()),
        (from, to) => {
            let to = to.unwrap_or_else(|| Utc::now().date_naive());
            Ok(DateRange::days(from.unwrap_or(to), to)?)
        }
    }
}

fn apply_filter_args(filter: &FilterState, args: &RunArgs) -> FilterState {
    let mut next = filter.clone();
    if let Some(search) = &args.search {
        next = next.with_search(search.as_str());
    }
    for category in &args.categories {
        next = next.toggle_category(category);
    }
    for publisher in &args.publishers {
        next = next.toggle_source(publisher);
    }
    for tag in &args.tags {
        next = next.toggle_tag(tag);
    }
    if let Some(order) = args.sort {
        next = next.with_sort_order(order);
    }
    next.with_only_duplicates(args.only_duplicates)
        .with_only_unique(args.only_unique)
        .with_only_top_ranked(args.top_ranked)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(backend_url: Option<&str>, args: RunArgs) -> Result<()> {
    let mut config = resolved_config(backend_url)?;
    if !args.sources.is_empty() {
        config.defaults.sources = args.sources.clone();
        config.validate()?;
    }
    let range = resolve_range(args.from, args.to)?;
    let desk = Arc::new(Desk::new(http_backend(&config)?, &config));

    info!(
        from = %range.from,
        to = %range.to,
        sources = ?desk.run_sources(),
        "starting run"
    );

    let progress = spinner(format!(
        "Running ingestion for {} source(s)...",
        desk.run_sources().len()
    ))?;
    let outcome = desk.run(range).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    println!();
    println!("  Run complete!");
    println!("  Run:        {}", outcome.run_id);
    println!("  Articles:   {}", outcome.article_count);
    println!("  Duplicates: {}", outcome.duplicate_groups);
    println!("  Time:       {:.1}s", outcome.elapsed.as_secs_f64());
    if !outcome.executive_summary.is_empty() {
        println!();
        println!("  Executive summary:");
        for line in outcome.executive_summary.lines() {
            println!("    {line}");
        }
    }
    println!();

    desk.update_filter(|f| apply_filter_args(f, &args));
    let visible = desk.visible();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
    } else {
        print_stories(&visible);
    }

    for id in &args.select {
        match desk.toggle_selection(&ArticleId::from(id.as_str()))? {
            SelectionToggle::Added => info!(article = %id, "added to top stories"),
            SelectionToggle::Removed => info!(article = %id, "removed from top stories"),
            SelectionToggle::Ignored => {
                warn!(article = %id, "top stories already full, selection ignored")
            }
        }
    }

    if !args.deep.is_empty() {
        let handles = args
            .deep
            .iter()
            .map(|id| {
                let id = ArticleId::from(id.as_str());
                desk.spawn_deep_summary(&id).map(|handle| (id, handle))
            })
            .collect::<newsdesk_shared::Result<Vec<_>>>()?;

        let progress = spinner(format!("Fetching {} deep summary(ies)...", handles.len()))?;
        let mut finished = Vec::with_capacity(handles.len());
        for (id, handle) in handles {
            let entry = handle.await?.unwrap_or_else(|| desk.enrichment(&id));
            finished.push((id, entry));
        }
        progress.finish_and_clear();

        for (id, entry) in &finished {
            print_deep_summary(id.as_str(), entry);
        }
    }

    let stats = desk.stats();
    println!(
        "  Showing {} of {} stories, {} selected.",
        stats.visible, stats.articles, stats.selected
    );

    if args.digest {
        if !desk.can_open_digest() {
            return Err(eyre!("no stories selected: pass --select <ID> to build a digest"));
        }
        println!();
        print!("{}", desk.digest(&range, &config.digest.recipient).render_text());
    }

    Ok(())
}

fn print_stories(stories: &[Article]) {
    if stories.is_empty() {
        println!("  No stories match the current filters.");
        println!();
        return;
    }

    for story in stories {
        let published = story
            .published_at
            .map(|t| t.format("%d %b %H:%M").to_string())
            .unwrap_or_else(|| "undated".to_string());
        let coverage = if story.is_duplicate_group {
            format!(" [{} outlets]", story.coverage_count)
        } else {
            String::new()
        };
        println!("  {}  {}", story.id, story.title);
        println!("      {} · {published}{coverage}", story.source);
        let mut labels: Vec<&str> = story.category.iter().map(String::as_str).collect();
        labels.extend(story.tags.iter().map(String::as_str));
        if !labels.is_empty() {
            println!("      {}", labels.join(", "));
        }
    }
    println!();
}

fn print_deep_summary(label: &str, entry: &EnrichmentEntry) {
    let text = entry.result.as_deref().unwrap_or_default();
    let marker = if entry.is_extraction_warning() { " (warning)" } else { "" };
    println!("  Deep summary for {label}{marker}:");
    for line in text.lines() {
        println!("    {line}");
    }
    println!();
}

async fn cmd_summarize(backend_url: Option<&str>, title: &str, url: &str) -> Result<()> {
    let config = resolved_config(backend_url)?;
    let enrichment = EnrichmentOrchestrator::new(Arc::new(http_backend(&config)?));
    let article = Article::new("adhoc", title, "").with_url(url);

    let progress = spinner("Generating deep summary...")?;
    let entry = enrichment.request(&article).await;
    progress.finish_and_clear();

    match entry {
        Some(entry) => print_deep_summary(title, &entry),
        None => warn!("deep summary discarded"),
    }
    Ok(())
}

fn cmd_sources() -> Result<()> {
    let config = load_config()?;
    for source in &config.sources {
        let default = if config.defaults.sources.contains(&source.id) { "*" } else { " " };
        println!(
            "  {default} {:<14} {:<24} {:<8} {}",
            source.id,
            source.name,
            source.kind.to_string(),
            source.status
        );
    }
    println!();
    println!("  * included in runs by default");
    Ok(())
}

async fn cmd_health(backend_url: Option<&str>) -> Result<()> {
    let config = resolved_config(backend_url)?;
    let backend = http_backend(&config)?;
    let health = backend.health().await?;

    println!("  Backend: {}", backend.base_url());
    println!("  Status:  {}", health.status);
    if !health.message.is_empty() {
        println!("  Message: {}", health.message);
    }

    if health.is_ok() {
        Ok(())
    } else {
        Err(eyre!("backend reported status '{}'", health.status))
    }
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(backend_url: Option<&str>) -> Result<()> {
    let config = resolved_config(backend_url)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
