use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info};
use serde_json::json;
use simplelog::{Config, WriteLogger};

use etymon::colorize::breakdown;
use etymon::dom::{Document, PageDom, TextRange};
use etymon::event_source::ReaderEventSource;
use etymon::gateway::cache::word_of_key;
use etymon::gateway::{
    AnalysisError, AnalysisService, BoundedCache, CacheStore, EtymologyRecord, Gateway,
    GeminiProvider, JsonFileCache, cache_key,
};
use etymon::geometry::{Point, ScrollOffset};
use etymon::highlight::{Layer, infer_style_mode};
use etymon::interactivity::{interactive_ancestor, is_hover_eligible};
use etymon::locator::{neighbor_words, sentence_at, word_at_point};
use etymon::panic_handler;
use etymon::popup::translation_label;
use etymon::positioner::{PopupPlacement, icon_position, popup_placement};
use etymon::runtime::ContentScript;
use etymon::session::SessionOptions;
use etymon::settings;
use etymon::surface::UiSurface;
use etymon::timers::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "etymon", about = "Word etymology lookups and page-session tools", version)]
struct Cli {
    /// Log verbosity written to etymon.log.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Settings file to use instead of the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up the etymology of one or more words.
    Lookup {
        #[arg(required = true)]
        words: Vec<String>,
        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Inspect or evict the persisted etymology cache.
    #[command(subcommand)]
    Cache(CacheCommand),
    /// Show or change settings.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Report what hovering a point of an HTML page would do.
    Inspect {
        file: PathBuf,
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
        #[arg(long, default_value_t = 0.0)]
        scroll_y: f64,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a recorded page session against an HTML page.
    Replay {
        page: PathBuf,
        /// JSON lines of session inputs.
        events: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// List cached words.
    List,
    /// Remove every cached record.
    Clear,
    /// Remove one word's record.
    Remove { word: String },
    /// Print the cache file location.
    Path,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective settings.
    Show,
    /// Allow or forbid lookups inside links, buttons and other controls.
    SetInteractive {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

fn main() -> ExitCode {
    panic_handler::initialize_panic_handler();

    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.log_level.into()) {
        eprintln!("warning: logging disabled: {e}");
    }

    settings::set_config_path(cli.config.clone());
    settings::load_settings();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: LevelFilter) -> Result<()> {
    let dir = dirs::data_dir()
        .map(|data| data.join("etymon"))
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join("etymon.log");
    let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    WriteLogger::init(level, Config::default(), file)?;
    info!("etymon {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Lookup { words, json } => handle_lookup(&words, json),
        Command::Cache(command) => handle_cache(command),
        Command::Config(command) => handle_config(command),
        Command::Inspect {
            file,
            x,
            y,
            scroll_y,
            json,
        } => handle_inspect(&file, Point::new(x, y), scroll_y, json),
        Command::Replay { page, events } => handle_replay(&page, &events),
    }
}

/// The cache the settings ask for: bounded in memory, or the JSON file.
fn open_cache() -> Result<Box<dyn CacheStore + Send>> {
    let cache_settings = settings::get_cache_settings();
    if let Some(capacity) = cache_settings.capacity {
        info!("Using in-memory cache bounded to {capacity} records");
        return Ok(Box::new(BoundedCache::new(capacity)));
    }
    let path = settings::get_cache_path();
    Ok(Box::new(JsonFileCache::open(&path)?))
}

fn open_provider() -> Result<GeminiProvider> {
    let provider = settings::get_provider();
    let api_key = settings::get_api_key().ok_or(AnalysisError::MissingApiKey)?;
    Ok(GeminiProvider::new(
        provider.base_url,
        provider.model,
        api_key,
    )?)
}

fn handle_lookup(words: &[String], as_json: bool) -> Result<()> {
    let mut gateway = Gateway::new(open_cache()?, open_provider()?);
    let mut records = Vec::with_capacity(words.len());
    for word in words {
        let record = gateway
            .lookup(word)
            .with_context(|| format!("looking up '{word}'"))?;
        records.push((word.trim().to_string(), record));
    }

    if as_json {
        let payload: Vec<_> = records
            .iter()
            .map(|(word, record)| json!({ "word": word, "etymology": record }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for (word, record) in &records {
            print_record(word, record);
        }
    }
    Ok(())
}

fn print_record(word: &str, record: &EtymologyRecord) {
    println!("{word} {}", translation_label(Some(record)));
    println!("  {}", breakdown(word, record));
    for (label, value) in [
        ("prefix", &record.prefix),
        ("root", &record.root),
        ("suffix", &record.suffix),
    ] {
        if !value.trim().is_empty() {
            println!("  {label:<7}{}", value.trim());
        }
    }
    if !record.desc.trim().is_empty() {
        println!("  {}", record.desc.trim());
    }
}

fn handle_cache(command: CacheCommand) -> Result<()> {
    let path = settings::get_cache_path();
    match command {
        CacheCommand::Path => println!("{}", path.display()),
        CacheCommand::List => {
            let cache = JsonFileCache::open(&path)?;
            for key in cache.keys() {
                println!("{}", word_of_key(&key).unwrap_or(&key));
            }
        }
        CacheCommand::Clear => {
            let mut cache = JsonFileCache::open(&path)?;
            let count = cache.len();
            cache.clear()?;
            println!("Removed {count} cached records");
        }
        CacheCommand::Remove { word } => {
            let mut cache = JsonFileCache::open(&path)?;
            if cache.remove(&cache_key(&word))? {
                println!("Removed '{}'", word.trim());
            } else {
                println!("'{}' is not cached", word.trim());
            }
        }
    }
    Ok(())
}

fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let mut current = settings::snapshot();
            if current.provider.api_key.is_some() {
                current.provider.api_key = Some("<hidden>".to_string());
            }
            print!("{}", serde_yaml::to_string(&current)?);
            if let Some(path) = settings::config_path() {
                println!("# from {}", path.display());
            }
        }
        ConfigCommand::SetInteractive { enabled } => {
            settings::set_allow_interactive_hover(enabled);
            println!("allow_interactive_hover: {enabled}");
        }
    }
    Ok(())
}

fn load_page(path: &Path) -> Result<Document> {
    let html =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Document::from_html(&html).with_context(|| format!("parsing {}", path.display()))
}

fn handle_inspect(path: &Path, point: Point, scroll_y: f64, as_json: bool) -> Result<()> {
    let mut doc = load_page(path)?;
    doc.set_scroll(ScrollOffset::new(0.0, scroll_y));

    let Some(hit) = word_at_point(&doc, point) else {
        println!("No word at ({}, {})", point.x, point.y);
        return Ok(());
    };

    let scroll = doc.scroll_offset();
    let interactive = interactive_ancestor(&doc, hit.range.start.node);
    let eligible = is_hover_eligible(interactive.as_ref(), settings::allow_interactive_hover());
    let neighbors = neighbor_words(&doc, &hit.range, 2);
    let ring = |n: usize| -> Vec<String> {
        neighbors.ring(n).into_iter().map(|w| w.text.clone()).collect()
    };
    let sentence = sentence_at(&doc, hit.range.start).map(|r| doc.range_text(&r));
    let mode = infer_style_mode(&doc, hit.range.start.node);
    let rect = doc.bounding_rect(&hit.range);
    let icon = rect.map(|r| icon_position(&r, scroll));
    let placement = rect.map(|r| popup_placement(&r, scroll));

    if as_json {
        let payload = json!({
            "word": hit.text,
            "interactive": interactive.as_ref().map(|i| format!("{:?}", i.kind)),
            "eligible": eligible,
            "near": ring(0),
            "far": ring(1),
            "sentence": sentence,
            "style_mode": format!("{mode:?}"),
            "icon": icon,
            "popup": placement.map(|p| json!({
                "left": p.left,
                "top": p.top,
                "side": format!("{:?}", p.side),
            })),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!("word:        {}", hit.text);
    match &interactive {
        Some(found) => println!("interactive: {:?} (eligible: {eligible})", found.kind),
        None => println!("interactive: no"),
    }
    println!("near:        {}", ring(0).join(", "));
    println!("far:         {}", ring(1).join(", "));
    println!("sentence:    {}", sentence.as_deref().unwrap_or("-"));
    println!("style:       {mode:?}");
    if let Some(icon) = icon {
        println!("icon:        ({:.0}, {:.0})", icon.x, icon.y);
    }
    if let Some(placement) = placement {
        println!(
            "popup:       {:?} at ({:.0}, {:.0})",
            placement.side, placement.left, placement.top
        );
    }
    Ok(())
}

fn handle_replay(page: &Path, events: &Path) -> Result<()> {
    let doc = load_page(page)?;
    let file = File::open(events).with_context(|| format!("opening {}", events.display()))?;
    let mut source = ReaderEventSource::new(BufReader::new(file));

    let service = AnalysisService::spawn(Gateway::new(open_cache()?, open_provider()?));
    let options = SessionOptions::from(&settings::snapshot());
    let mut script = ContentScript::new(options, PrintSurface::default(), SystemClock::new(), service);
    script.run(&mut source, &doc)
}

/// Prints every surface call on its own line.
#[derive(Debug, Default)]
struct PrintSurface {
    icon: bool,
    popup: bool,
}

impl UiSurface for PrintSurface {
    fn create_icon(&mut self, word: &str, position: Point) {
        self.icon = true;
        println!("icon      + {word:?} at ({:.0}, {:.0})", position.x, position.y);
    }

    fn move_icon(&mut self, position: Point) {
        println!("icon      > ({:.0}, {:.0})", position.x, position.y);
    }

    fn remove_icon(&mut self) {
        self.icon = false;
        println!("icon      -");
    }

    fn show_popup(&mut self, word: &str, placement: PopupPlacement, html: &str) {
        self.popup = true;
        println!(
            "popup     + {word:?} {:?} at ({:.0}, {:.0})",
            placement.side, placement.left, placement.top
        );
        println!("popup     = {html}");
    }

    fn set_popup_html(&mut self, html: &str) {
        println!("popup     = {html}");
    }

    fn set_popup_opacity(&mut self, opacity: f64) {
        println!("popup     opacity {opacity:.2}");
    }

    fn set_popup_visible(&mut self, visible: bool) {
        println!("popup     {}", if visible { "shown" } else { "hidden" });
    }

    fn remove_popup(&mut self) {
        self.popup = false;
        println!("popup     -");
    }

    fn track_pointer(&mut self, enabled: bool) {
        println!("tracking  {}", if enabled { "on" } else { "off" });
    }

    fn set_highlight(&mut self, layer: Layer, ranges: &[TextRange]) {
        println!("highlight {} x{}", layer.name(), ranges.len());
    }

    fn delete_highlight(&mut self, layer: Layer) {
        log::trace!("highlight {} cleared", layer.name());
    }

    fn prevent_default(&mut self) {
        println!("click     default prevented");
    }

    fn has_icon(&self) -> bool {
        self.icon
    }

    fn has_popup(&self) -> bool {
        self.popup
    }
}
