use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use talkbot::config::{Config, SeminarConfig};
use talkbot::feed::talks_page_url;
use talkbot::notify::{self, Mode, Outcome, StdoutDispatcher};
use talkbot::talk::Talk;

#[derive(Parser, Debug)]
#[command(
    name = "talkbot",
    about = "Announce upcoming seminar talks from talks.bham.ac.uk"
)]
struct Args {
    /// Seminar configuration file
    #[arg(long, value_name = "FILE", default_value = "talkbot.toml")]
    config: PathBuf,

    /// Append logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send the "upcoming talk" announcement if it is due this hour
    Announce(SendArgs),
    /// Send the day-of reminder if it is due this hour
    Remind(SendArgs),
    /// Print the next talk and its schedule without sending anything
    Show {
        /// Only this seminar (by configured name)
        #[arg(long)]
        seminar: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
struct SendArgs {
    /// Send now, ignoring the schedule and placeholder checks
    #[arg(long)]
    force: bool,

    /// Only this seminar (by configured name)
    #[arg(long)]
    seminar: Option<String>,
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            // stdout carries the dispatched messages
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn select_seminars<'a>(config: &'a Config, name: Option<&str>) -> Result<Vec<&'a SeminarConfig>> {
    match name {
        Some(name) => {
            let seminar = config
                .seminar(name)
                .with_context(|| format!("No seminar named '{}' in config", name))?;
            Ok(vec![seminar])
        }
        None => Ok(config.seminars.iter().collect()),
    }
}

fn print_talk(talk: &Talk) {
    println!("{}", talk.series);
    println!("  Title:     {}", talk.title);
    println!("  Speaker:   {}", talk.speaker_line());
    println!("  When:      {}", talk.long_datetime());
    println!("  Where:     {}", talk.room);
    println!("  Link:      {}", talk.link);
    println!("  Announce:  {}", talk.announce_at.format("%a %d %b %Y %H:%M"));
    println!("  Reminder:  {}", talk.reminder_at.format("%a %d %b %Y %H:%M"));
    if talk.has_missing_components {
        println!("  Warning:   title or abstract is still a placeholder");
    }
    println!();
    println!("{}", talk.wrapped_abstract);
    println!();
}

// Single-threaded: one blocking-style GET per seminar, nothing concurrent
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;

    let (mode, force, seminar_filter) = match &args.command {
        Command::Announce(send) => (Some(Mode::Announce), send.force, send.seminar.as_deref()),
        Command::Remind(send) => (Some(Mode::Reminder), send.force, send.seminar.as_deref()),
        Command::Show { seminar } => (None, false, seminar.as_deref()),
    };

    let seminars = select_seminars(&config, seminar_filter)?;
    let client = reqwest::Client::new();
    let mut dispatcher = StdoutDispatcher::new(std::io::stdout());

    for seminar in seminars {
        let talk = talkbot::find_next_talk(&client, &config.base_url, config.window_days, seminar)
            .await
            .with_context(|| format!("Failed to get next talk for '{}'", seminar.name))?;

        let Some(talk) = talk else {
            continue;
        };

        let Some(mode) = mode else {
            print_talk(&talk);
            continue;
        };

        let talks_page = talks_page_url(&config.base_url, seminar.talks_id);
        let now = Local::now().naive_local();
        let outcome = notify::deliver(
            &mut dispatcher,
            &talk,
            mode,
            &seminar.recipients,
            &talks_page,
            now,
            force,
        )
        .with_context(|| format!("Failed to send {} for '{}'", mode, seminar.name))?;

        tracing::debug!(seminar = %seminar.name, outcome = ?outcome, "Seminar done");
        if outcome == Outcome::Suppressed {
            eprintln!(
                "Warning: {} announcement held back: \"{}\" has placeholder content",
                seminar.name, talk.title
            );
        }
    }

    Ok(())
}
