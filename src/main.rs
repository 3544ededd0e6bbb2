use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::Emoji;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use podpost::config::DEFAULT_DB_FILE;
use podpost::{
    FeedOutcome, FeedProfile, MastodonClient, ProgressEvent, ProgressReporter, PublishError,
    Publisher, ReqwestClient, RunOptions, SharedProgressReporter, TracingReporter, export_entries,
    import_entries, load_feeds_file, resolve_access_token, run_feeds,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static MEGAPHONE: Emoji<'_, '_> = Emoji("📣 ", "[>] ");
static MEMO: Emoji<'_, '_> = Emoji("📝 ", "[-] ");
static BROOM: Emoji<'_, '_> = Emoji("🧹 ", "[c] ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "[*] ");
static CROSS: Emoji<'_, '_> = Emoji("✗ ", "x ");

/// Post new podcast episodes to Mastodon
#[derive(Parser, Debug)]
#[command(name = "podpost")]
#[command(about = "Post new podcast episodes from RSS feeds to Mastodon")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file for a single feed
    #[arg(short, long, default_value = ".env")]
    env_file: PathBuf,

    /// JSON file listing several feeds (replaces --env-file)
    #[arg(short, long, value_name = "FILE")]
    feeds_file: Option<PathBuf>,

    /// Render posts without publishing or recording anything
    #[arg(long)]
    dry_run: bool,

    /// Keep old records in the store
    #[arg(long)]
    skip_clean: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Quiet mode - log instead of printing progress
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export store records to a JSON file
    Export {
        /// Store file to read
        #[arg(long, default_value = DEFAULT_DB_FILE)]
        database: PathBuf,

        /// JSON file to write
        #[arg(long)]
        json_file: PathBuf,

        /// Feed name for records that have none
        #[arg(long)]
        podcast_name: String,
    },

    /// Import records from a JSON file into a store
    Import {
        /// JSON file to read
        #[arg(long)]
        json_file: PathBuf,

        /// Store file to write, created if missing
        #[arg(long, default_value = DEFAULT_DB_FILE)]
        database: PathBuf,

        /// Feed name for entries that have none
        #[arg(long)]
        podcast_name: String,
    },
}

/// Progress reporter printing a colored summary to the terminal
struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FeedStarted {
                feed,
                feed_url,
                dry_run,
            } => {
                println!(
                    "{SEARCH}{} {}{}",
                    feed.bold(),
                    feed_url.cyan(),
                    if dry_run {
                        " (dry run)".yellow().to_string()
                    } else {
                        String::new()
                    }
                );
            }

            ProgressEvent::FeedFetched { episodes, .. } => {
                println!("  {HEADPHONES}{} episodes fetched", episodes.to_string().cyan());
            }

            ProgressEvent::EpisodesFiltered {
                total_episodes,
                new_episodes,
                ..
            } => {
                println!(
                    "  {} of {} episodes are new",
                    new_episodes.to_string().yellow(),
                    total_episodes.to_string().cyan()
                );
            }

            ProgressEvent::PostPublished { episode_title, .. } => {
                println!("  {MEGAPHONE}{}", truncate_title(&episode_title, 60).green());
            }

            ProgressEvent::PostFailed {
                episode_title,
                error,
                ..
            } => {
                println!(
                    "  {FAILURE}{} - {}",
                    truncate_title(&episode_title, 40).red(),
                    error.red()
                );
            }

            ProgressEvent::PostRendered {
                episode_title,
                content,
                ..
            } => {
                println!("  {MEMO}{}", truncate_title(&episode_title, 60).yellow());
                for line in content.lines() {
                    println!("    {}", line.dimmed());
                }
            }

            ProgressEvent::RecordsEvicted { count, .. } => {
                if count > 0 {
                    println!("  {BROOM}{} old records removed", count.to_string().cyan());
                }
            }

            ProgressEvent::FeedFailed { feed, stage, error } => {
                println!(
                    "  {FAILURE}{} failed during {}: {}",
                    feed.red().bold(),
                    stage,
                    error.red()
                );
            }

            ProgressEvent::FeedCompleted { posted, failed, .. } => {
                println!(
                    "  {SUCCESS}{} posted, {} failed",
                    posted.to_string().green().bold(),
                    if failed > 0 {
                        failed.to_string().red().bold()
                    } else {
                        failed.to_string().green()
                    }
                );
            }
        }
    }
}

fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        title.to_string()
    } else {
        let cut: String = title.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("podpost=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_profiles(args: &Args) -> Result<Vec<FeedProfile>> {
    match &args.feeds_file {
        Some(path) => load_feeds_file(path)
            .with_context(|| format!("Failed to load feeds file {}", path.display())),
        None => FeedProfile::from_env_file(&args.env_file)
            .map(|profile| vec![profile])
            .with_context(|| format!("Failed to load settings from {}", args.env_file.display())),
    }
}

fn print_failures(outcomes: &[FeedOutcome]) {
    let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_success()).collect();
    if failed.is_empty() {
        return;
    }

    println!("\n{}", "Failed feeds:".red().bold());
    for outcome in failed {
        if let Err(failure) = &outcome.result {
            println!(
                "  {}{} - {}",
                CROSS,
                outcome.feed.yellow(),
                failure.to_string().dimmed()
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.debug);

    match &args.command {
        Some(Command::Export {
            database,
            json_file,
            podcast_name,
        }) => {
            let count = export_entries(database, json_file, podcast_name)
                .await
                .context("Failed to export records")?;
            if count == 0 {
                println!("No entries to export.");
                return Ok(());
            }
            println!(
                "{SUCCESS}Exported {} records to {}",
                count.to_string().green().bold(),
                json_file.display().to_string().cyan()
            );
            return Ok(());
        }
        Some(Command::Import {
            json_file,
            database,
            podcast_name,
        }) => {
            let count = import_entries(json_file, database, podcast_name)
                .await
                .context("Failed to import records")?;
            println!(
                "{SUCCESS}Imported {} records into {}",
                count.to_string().green().bold(),
                database.display().to_string().cyan()
            );
            return Ok(());
        }
        None => {}
    }

    let profiles = load_profiles(&args)?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podpost".bold().magenta(),
            "- Podcast Episode Announcer".dimmed()
        );
    }

    let client = ReqwestClient::new();
    let http = client.inner().clone();
    let make_publisher = |profile: &FeedProfile| -> Result<Box<dyn Publisher>, PublishError> {
        let token = resolve_access_token(profile.mastodon.secret.expose_secret())?;
        let mastodon = MastodonClient::new(http.clone(), &profile.mastodon.api_url, token)?;
        Ok(Box::new(mastodon))
    };

    let options = RunOptions {
        dry_run: args.dry_run,
        skip_cleanup: args.skip_clean,
        ..Default::default()
    };

    let reporter: SharedProgressReporter = if args.quiet {
        TracingReporter::shared()
    } else {
        Arc::new(ConsoleReporter)
    };

    let outcomes = run_feeds(&client, &profiles, make_publisher, &options, &reporter).await;

    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    if !args.quiet {
        print_failures(&outcomes);
        println!(
            "\n{PARTY}{} {} of {} feeds processed\n",
            "Done:".bold().green(),
            succeeded.to_string().green().bold(),
            outcomes.len().to_string().cyan()
        );
    }

    if succeeded < outcomes.len() {
        std::process::exit(1);
    }

    Ok(())
}
