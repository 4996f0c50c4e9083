use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, ensure};
use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};

use spoticast_calendar::format::{format_date, format_duration, format_episode_count, truncate_text};
use spoticast_calendar::{
    CalendarEvent, Color, Environment, FetchEvent, MAX_SELECTED_PODCASTS, NoopReporter,
    PodcastCatalog, ProgressReporter, ReqwestClient, Session, SessionOptions,
    SharedProgressReporter, SpotifyClient,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static CALENDAR: Emoji<'_, '_> = Emoji("📅 ", "[#] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
static DOWNLOAD: Emoji<'_, '_> = Emoji("📥 ", "[v] ");

/// Lay out Spotify podcast episodes on a calendar
#[derive(Parser, Debug)]
#[command(name = "spoticast")]
#[command(about = "Search Spotify podcasts and list their episodes by day")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON file with runtime configuration overriding the environment
    #[arg(long, global = true)]
    runtime_env: Option<PathBuf>,

    /// Quiet mode - suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search podcasts by name or topic
    Search {
        /// Free-text query
        query: String,
    },

    /// Show episodes of up to five podcasts between two dates
    Calendar {
        /// One query per podcast; the top search hit is selected
        #[arg(required = true, num_args = 1..=MAX_SELECTED_PODCASTS)]
        queries: Vec<String>,

        /// First day to show (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,

        /// Last day to show (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Progress reporter using an indicatif spinner
struct SpinnerReporter {
    bar: ProgressBar,
}

impl SpinnerReporter {
    fn new() -> Self {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { bar }
    }
}

impl ProgressReporter for SpinnerReporter {
    fn report(&self, event: FetchEvent) {
        match event {
            FetchEvent::FetchingPage {
                podcast_name,
                offset,
                ..
            } => {
                self.bar.set_message(format!(
                    "{DOWNLOAD}Fetching episodes of {} (offset {})",
                    podcast_name.bold(),
                    offset.to_string().cyan()
                ));
            }

            FetchEvent::PageMerged {
                podcast_name,
                new_episodes,
                has_more,
                ..
            } => {
                self.bar.set_message(format!(
                    "{} • {} new{}",
                    podcast_name.bold().green(),
                    new_episodes.to_string().cyan(),
                    if has_more { "" } else { ", all loaded" }
                ));
            }

            FetchEvent::FetchFailed {
                podcast_name,
                error,
                ..
            } => {
                self.bar.println(format!(
                    "{WARNING}{} - {}",
                    podcast_name.red(),
                    error.dimmed()
                ));
            }

            FetchEvent::BackfillTriggered {
                podcast_name,
                visible_start,
                ..
            } => {
                self.bar.set_message(format!(
                    "{CALENDAR}Loading older episodes of {} for {}",
                    podcast_name.bold(),
                    visible_start.to_string().yellow()
                ));
            }
        }
    }
}

impl SpinnerReporter {
    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn paint(text: &str, color: Color) -> String {
    match color.rgb() {
        Some((r, g, b)) => text.truecolor(r, g, b).bold().to_string(),
        None => text.bold().to_string(),
    }
}

fn print_calendar(events: &[CalendarEvent], from: NaiveDate, to: NaiveDate) {
    let mut by_day: BTreeMap<NaiveDate, Vec<&CalendarEvent>> = BTreeMap::new();
    for event in events {
        let day = event.start.date_naive();
        if (from..=to).contains(&day) {
            by_day.entry(day).or_default().push(event);
        }
    }

    if by_day.is_empty() {
        println!("{}", "No episodes in this range.".dimmed());
        return;
    }

    for (day, mut events) in by_day {
        events.sort_by(|a, b| a.title.cmp(&b.title));
        println!("\n{CALENDAR}{}", format_date(day).bold());
        for event in events {
            println!(
                "  {} {} {}",
                paint("■", event.background_color),
                truncate_text(&event.title, 70),
                format_duration(event.episode.duration_ms).dimmed()
            );
        }
    }
}

async fn run_search(
    session: &mut Session<impl PodcastCatalog>,
    spinner: Option<&SpinnerReporter>,
    query: &str,
) {
    let results = session.search(query).await;
    if let Some(spinner) = spinner {
        spinner.finish();
    }

    if let Some(error) = session.search_error() {
        eprintln!("{WARNING}{}", error.red());
        return;
    }

    println!("{SEARCH}{} results for {}\n", results.len(), query.cyan());
    for podcast in results {
        println!(
            "  {} {} • {} {}",
            podcast.name.bold(),
            podcast.publisher.dimmed(),
            format_episode_count(podcast.total_episodes).cyan(),
            podcast.id.dimmed()
        );
    }
}

async fn run_calendar(
    session: &mut Session<impl PodcastCatalog>,
    spinner: Option<&SpinnerReporter>,
    queries: &[String],
    from: NaiveDate,
    to: NaiveDate,
    json: bool,
) -> Result<()> {
    let mut picked = Vec::new();
    for query in queries {
        let results = session.search(query).await;
        match results.into_iter().next() {
            Some(podcast) => picked.push(podcast),
            None => eprintln!("{WARNING}No podcast found for {}", query.yellow()),
        }
    }
    ensure!(!picked.is_empty(), "None of the queries matched a podcast");

    session.select_podcasts(picked).await;

    // Walk the calendar back a week at a time, like a user paging through it
    let mut window_start = to;
    loop {
        window_start = window_start
            .checked_sub_days(Days::new(7))
            .unwrap_or(from)
            .max(from);
        session.on_view_range_change(window_start, to).await;
        if window_start == from {
            break;
        }
    }
    while session.on_view_range_change(from, to).await {}

    if let Some(spinner) = spinner {
        spinner.finish();
    }

    if let Some(error) = session.episode_error() {
        eprintln!("{WARNING}{}", error.yellow());
    }

    let events = session.calendar_events();
    if json {
        let in_range: Vec<_> = events
            .iter()
            .filter(|e| (from..=to).contains(&e.start.date_naive()))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&in_range).context("Failed to serialize events")?
        );
        return Ok(());
    }

    for podcast in session.selected() {
        if let Some(color) = session.color_of(&podcast.id) {
            println!("{} {}", paint("■", color), podcast.name.bold());
        }
    }
    print_calendar(session.calendar_events(), from, to);
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let env = Environment::load(args.runtime_env.as_deref())
        .context("Failed to load configuration")?;
    env.require_credentials()
        .context("Spotify credentials are required")?;
    log::debug!("Running in {} mode", env.app_env);

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "spoticast".bold().magenta(),
            "- Podcast Calendar".dimmed()
        );
    }

    let spinner = (!args.quiet).then(|| Arc::new(SpinnerReporter::new()));
    let reporter: SharedProgressReporter = match &spinner {
        Some(spinner) => spinner.clone(),
        None => NoopReporter::shared(),
    };

    let catalog = Arc::new(SpotifyClient::from_environment(ReqwestClient::new(), &env));
    let options = SessionOptions {
        reporter,
        ..SessionOptions::default()
    };
    let mut session = Session::new(catalog, options).context("Invalid color configuration")?;

    match args.command {
        Command::Search { query } => run_search(&mut session, spinner.as_deref(), &query).await,
        Command::Calendar {
            queries,
            from,
            to,
            json,
        } => {
            let to = to.unwrap_or_else(|| Local::now().date_naive());
            ensure!(from <= to, "--from {from} is after --to {to}");
            run_calendar(&mut session, spinner.as_deref(), &queries, from, to, json).await?;
        }
    }

    Ok(())
}
