use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use arc_timers_lib::countdown::format_countdown;
use arc_timers_lib::models::{sort_for_display, EventTimer};
use arc_timers_lib::scraping::{self, metaforge_html, ScrapeContext};
use arc_timers_lib::timezone::DisplayZone;

/// Checks the MetaForge connection and shows what the board would display.
#[derive(Parser)]
#[command(name = "arc-timers-probe")]
struct Cli {
    /// Parse a saved page (e.g. the debug dump) instead of fetching
    #[arg(long, value_name = "FILE", conflicts_with = "source")]
    html: Option<PathBuf>,

    /// Only query one source (see --list-sources)
    #[arg(long)]
    source: Option<String>,

    /// IANA timezone for converted times; defaults to the system zone
    #[arg(long)]
    timezone: Option<String>,

    /// Print events as JSON
    #[arg(long)]
    json: bool,

    /// Skip writing the debug dump of the fetched page
    #[arg(long)]
    no_dump: bool,

    /// List the configured sources and exit
    #[arg(long)]
    list_sources: bool,
}

fn print_events(events: &[EventTimer], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(events)?);
        return Ok(());
    }
    if events.is_empty() {
        println!("No events parsed.");
        return Ok(());
    }
    for event in events {
        println!(
            "✓ {} - {} - {} [{}]",
            event.name,
            event.status.label(),
            format_countdown(event.countdown_seconds),
            event.locations.join(", ")
        );
        if !event.time_info.is_empty() {
            println!("    window: {}", event.time_info);
        }
        for window in &event.upcoming_windows {
            println!("    next:   {window}");
        }
    }
    println!("\n{} events", events.len());
    Ok(())
}

fn main() -> Result<()> {
    arc_timers_lib::logging::init_logging();
    let cli = Cli::parse();

    if cli.list_sources {
        for source in scraping::list_sources() {
            println!("{:<16} {}", source.id, source.url);
        }
        return Ok(());
    }

    let zone = DisplayZone::from_setting(cli.timezone.as_deref())?;
    let events = if let Some(path) = cli.html.as_ref() {
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        metaforge_html::parse_document(&html, zone, Utc::now().date_naive())
    } else {
        let dump = (!cli.no_dump).then(arc_timers_lib::debug_dump_path);
        let ctx = ScrapeContext::new(zone, dump);
        match cli.source.as_deref() {
            Some(id) => scraping::run_single(id, &ctx)?,
            None => scraping::fetch_events(&ctx),
        }
    };

    print_events(&sort_for_display(events), cli.json)
}
