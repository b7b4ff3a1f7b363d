use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jscal_convert::{ConvertOptions, event_from_json_str, event_to_json_string, to_component};
use jscal_core::config::load_config;
use jscal_rfc::rfc::ical::core::Component;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "jscal")]
#[command(about = "Convert JSCalendar event objects to iCalendar and back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert an event object file into a VCALENDAR and print it
    Check { event: PathBuf },
    /// Convert an event object to a VCALENDAR and back, printing the result
    Roundtrip {
        event: PathBuf,

        /// Only return these members (comma separated)
        #[arg(short, long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    /// Create an event, apply an update object to it and print the VCALENDAR
    Update { event: PathBuf, patch: PathBuf },
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn create(path: &Path, options: &ConvertOptions) -> Result<Component> {
    let json = read(path)?;
    let calendar = event_from_json_str(&json, None, options)
        .with_context(|| format!("converting {}", path.display()))?;
    Ok(calendar)
}

fn main() -> Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    tracing::debug!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping warn");
    }

    let options = config.convert;
    match cli.command {
        Commands::Check { event } => {
            let calendar = create(&event, &options)?;
            print!("{calendar}");
        }
        Commands::Roundtrip { event, fields } => {
            let calendar = create(&event, &options)?;
            let wanted: Vec<&str> = fields.iter().map(String::as_str).collect();
            let wanted = (!wanted.is_empty()).then_some(wanted.as_slice());
            println!("{}", event_to_json_string(&calendar, wanted, &options)?);
        }
        Commands::Update { event, patch } => {
            let calendar = create(&event, &options)?;
            let patch: serde_json::Value = serde_json::from_str(&read(&patch)?)?;
            let serde_json::Value::Object(patch) = patch else {
                anyhow::bail!("update must be a JSON object");
            };
            let updated = to_component(&patch, Some(&calendar), &options)?;
            tracing::info!(children = updated.children.len(), "Update applied");
            print!("{updated}");
        }
    }

    Ok(())
}
