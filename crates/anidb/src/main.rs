//! AniDB command-line client.

use anidb::{AnidbClient, Anime};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{Config, LogConfig};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "anidb.toml")]
    config: PathBuf,

    /// Override the cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Override the title language
    #[arg(long)]
    lang: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search the title index
    Search {
        /// Case-insensitive part of a title
        term: String,
    },
    /// Fetch and show one anime
    Show {
        /// AniDB anime id
        aid: u32,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Download the title index if it is older than a day
    Refresh {
        /// Download even if the cached index is fresh
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    if let Some(cache_dir) = args.cache_dir {
        config.anidb.cache_dir = Some(cache_dir);
    }
    if let Some(lang) = args.lang {
        config.anidb.lang = lang;
    }

    let mut log_config = LogConfig::from_settings("anidb", config.log_dir(), &config.logging);
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    let mut client = AnidbClient::new(config.anidb.clone()).context("Failed to create AniDB client")?;

    match args.command {
        Command::Search { term } => {
            let results = client
                .search(&term)
                .with_context(|| format!("Search for '{}' failed", term))?;
            info!(term = %term, results = results.len(), "Search finished");
            for stub in results {
                let title = stub
                    .title(None, None)
                    .map(|t| t.text.as_str())
                    .unwrap_or("<untitled>");
                println!("{:>6}  {}", stub.id, title);
            }
        }
        Command::Show { aid, json } => {
            let anime = client.fetch(aid)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&anime)?);
            } else {
                print_anime(&anime);
            }
        }
        Command::Refresh { force } => {
            let downloaded = client
                .download_titles(force)
                .context("Failed to refresh title index")?;
            if downloaded {
                println!("Title index downloaded to {}", client.titles_path().display());
            } else {
                println!("Title index is up to date");
            }
        }
    }

    Ok(())
}

fn print_anime(anime: &Anime) {
    let title = anime
        .title(None, None)
        .map(|t| t.text.as_str())
        .unwrap_or("<untitled>");
    println!("{} [{}]", title, anime.id);

    if let Some(kind) = &anime.anime_type {
        println!("Type:        {}", kind);
    }
    match (anime.start_date, anime.end_date) {
        (Some(start), Some(end)) => println!("Aired:       {} to {}", start, end),
        (Some(start), None) => println!("Aired:       from {}", start),
        _ => {}
    }
    if let Some(rating) = &anime.ratings.permanent {
        println!("Rating:      {}", rating);
    }
    if let Some(picture) = &anime.picture {
        println!("Picture:     {}", picture);
    }
    let synonyms: Vec<String> = anime.synonyms().map(|t| t.to_string()).collect();
    if !synonyms.is_empty() {
        println!("Synonyms:    {}", synonyms.join(", "));
    }
    if !anime.tags.is_empty() {
        let tags: Vec<String> = anime.tags.iter().rev().map(|t| t.to_string()).collect();
        println!("Tags:        {}", tags.join(", "));
    }
    if let Some(description) = &anime.description {
        println!("\n{}\n", description);
    }

    for episode in &anime.all_episodes {
        let title = episode
            .title(None)
            .or_else(|| episode.titles.first())
            .map(|t| t.text.as_str())
            .unwrap_or("");
        let airdate = episode.airdate.map(|d| d.to_string()).unwrap_or_default();
        println!("{:>5}  {:<10}  {}", episode.number.to_string(), airdate, title);
    }
}
