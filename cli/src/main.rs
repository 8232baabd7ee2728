use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use placard_core::config::{default_config_path, load_or_default};
use placard_core::{Arity, MemoryEngine, PermissionEngine, PlaceholderProvider, Resolution};
use placard_types::{DurationStyle, PlaceholderConfig};
use tracing_subscriber::filter::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(version, about = "Resolve permission placeholders against a snapshot")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve placeholders for one player
    Resolve {
        /// Snapshot TOML with users, groups and tracks
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Username or UUID
        #[arg(short, long)]
        player: String,

        /// Placeholder config (defaults to the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Evaluate expiries at this RFC 3339 instant instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,

        #[arg(required = true)]
        placeholders: Vec<String>,
    },
    /// List registered placeholders
    List,
    /// Format a number of seconds
    FormatDuration {
        seconds: u64,

        #[arg(short, long, value_enum, default_value_t = Style::Concise)]
        style: Style,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Style {
    Long,
    Concise,
    ConciseLowAccuracy,
}

impl From<Style> for DurationStyle {
    fn from(style: Style) -> Self {
        match style {
            Style::Long => DurationStyle::Long,
            Style::Concise => DurationStyle::Concise,
            Style::ConciseLowAccuracy => DurationStyle::ConciseLowAccuracy,
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Resolve {
            snapshot,
            player,
            config,
            at,
            placeholders,
        } => resolve(&snapshot, &player, config.as_deref(), at, &placeholders),
        Commands::List => list(),
        Commands::FormatDuration { seconds, style } => {
            println!("{}", DurationStyle::from(style).formatter().format_secs(seconds));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PlaceholderConfig, String> {
    let Some(path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        return Ok(PlaceholderConfig::default());
    };
    load_or_default(&path).map_err(|e| e.to_string())
}

fn resolve(
    snapshot: &Path,
    player: &str,
    config: Option<&Path>,
    at: Option<DateTime<Utc>>,
    placeholders: &[String],
) -> Result<(), String> {
    let config = load_config(config)?;
    let engine = MemoryEngine::load(snapshot).map_err(|e| e.to_string())?;

    let user = match Uuid::parse_str(player) {
        Ok(uuid) => engine.user(uuid),
        Err(_) => engine.user_by_name(player),
    }
    .ok_or_else(|| format!("no user '{player}' in {}", snapshot.display()))?;
    let subject = engine.subject(&user);

    let provider = PlaceholderProvider::new(config.boolean.clone(), Arc::new(engine))
        .map_err(|e| e.to_string())?
        .with_config(&config);
    let now = at.unwrap_or_else(Utc::now);

    for placeholder in placeholders {
        let name = placeholder.trim_matches('%');
        let name = name.strip_prefix("luckperms_").unwrap_or(name);
        match provider.on_placeholder_request_at(&subject, name, now) {
            Resolution::Text(text) => println!("{placeholder}\t{text}"),
            Resolution::Absent => println!("{placeholder}\t<absent>"),
            Resolution::Unhandled => println!("{placeholder}\t<unknown>"),
        }
    }
    Ok(())
}

fn list() -> Result<(), String> {
    let provider = PlaceholderProvider::new(
        PlaceholderConfig::default().boolean,
        Arc::new(MemoryEngine::new()),
    )
    .map_err(|e| e.to_string())?;

    for (name, arity) in provider.placeholders().definitions() {
        match arity {
            Arity::Fixed => println!("{name}"),
            Arity::Variable => println!("{name}_<argument>"),
        }
    }
    Ok(())
}
