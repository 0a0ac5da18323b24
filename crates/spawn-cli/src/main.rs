//! Command-line interface for SPAwn.
//!
//! Thin plumbing over the library: `crawl` walks a directory and extracts
//! metadata for every discovered file, `extract` handles a single file.
//! Unrecovered errors become a non-zero exit with a readable message.

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use spawn::crawler::{CrawlPolicy, CrawlPolicyBuilder, Crawler};
use spawn::{extract_directory, extract_metadata, SpawnConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spawn", version, about = "Crawl directories and extract file metadata")]
struct Cli {
    /// Path to the configuration file (default: spawn.yaml search paths)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl a directory and extract metadata for discovered files
    Crawl {
        /// The directory to crawl
        directory: PathBuf,

        /// Glob pattern to exclude from crawling (repeatable)
        #[arg(short = 'e', long = "exclude")]
        exclude: Vec<String>,

        /// Glob pattern to include in crawling (repeatable)
        #[arg(short = 'i', long = "include")]
        include: Vec<String>,

        /// Regex pattern to exclude from crawling (repeatable)
        #[arg(short = 'E', long = "exclude-regex")]
        exclude_regex: Vec<String>,

        /// Regex pattern to include in crawling (repeatable)
        #[arg(short = 'I', long = "include-regex")]
        include_regex: Vec<String>,

        /// Maximum depth to crawl
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,

        /// Follow symbolic links
        #[arg(long, overrides_with = "no_follow_symlinks")]
        follow_symlinks: bool,

        /// Do not follow symbolic links (default)
        #[arg(long = "no-follow-symlinks", overrides_with = "follow_symlinks")]
        no_follow_symlinks: bool,

        /// Time in seconds to wait between file operations
        #[arg(short = 'p', long)]
        polling_rate: Option<f64>,

        /// Ignore directories starting with a dot (default)
        #[arg(long, overrides_with = "include_dot_dirs")]
        ignore_dot_dirs: bool,

        /// Crawl directories starting with a dot
        #[arg(long = "include-dot-dirs", overrides_with = "ignore_dot_dirs")]
        include_dot_dirs: bool,

        /// Save metadata to a JSON file in the output directory
        #[arg(long)]
        save_json: bool,

        /// Directory to save JSON metadata in (default from configuration)
        #[arg(long)]
        json_dir: Option<PathBuf>,

        /// Only list files that would be indexed, without extracting metadata
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract metadata from a single file
    Extract {
        /// The file to extract metadata from
        file: PathBuf,

        /// Save the metadata next to the output directory instead of
        /// printing it
        #[arg(long)]
        save_json: bool,

        /// Directory to save JSON metadata in (default from configuration)
        #[arg(long)]
        json_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => SpawnConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => SpawnConfig::discover().context("failed to load configuration")?,
    };

    match cli.command {
        Command::Crawl {
            directory,
            exclude,
            include,
            exclude_regex,
            include_regex,
            max_depth,
            follow_symlinks,
            no_follow_symlinks: _,
            polling_rate,
            ignore_dot_dirs: _,
            include_dot_dirs,
            save_json,
            json_dir,
            dry_run,
        } => {
            anyhow::ensure!(
                directory.is_dir(),
                "{} is not a directory",
                directory.display()
            );

            // Config-level regex lists compose with the flags.
            let mut exclude_regex = exclude_regex;
            exclude_regex.extend(config.crawler.exclude_regex.iter().cloned());
            let mut include_regex = include_regex;
            include_regex.extend(config.crawler.include_regex.iter().cloned());

            let mut builder: CrawlPolicyBuilder = CrawlPolicy::builder(&directory)
                .include_globs(include)
                .exclude_globs(exclude)
                .include_regex(include_regex)
                .exclude_regex(exclude_regex)
                .max_depth(max_depth)
                .follow_symlinks(follow_symlinks)
                .ignore_dot_dirs(!include_dot_dirs);
            if let Some(seconds) = polling_rate {
                builder = builder.polling_rate(seconds);
            }
            let policy = builder.build_with(&config)?;

            if dry_run {
                let mut count = 0usize;
                for path in Crawler::new(&policy) {
                    println!("{}", path.display());
                    count += 1;
                }
                eprintln!("Discovered {} files (dry run)", count);
                return Ok(());
            }

            let metadata = extract_directory(&policy);
            eprintln!("Extracted metadata for {} files", metadata.len());

            if save_json || config.metadata.save_json {
                let output_dir = json_dir.unwrap_or_else(|| config.metadata_json_dir());
                let path = spawn::save_metadata_json(&metadata, &output_dir)?;
                eprintln!("Saved metadata to {}", path.display());
            } else {
                serde_json::to_writer_pretty(std::io::stdout().lock(), &metadata)?;
                println!();
            }
        }

        Command::Extract {
            file,
            save_json,
            json_dir,
        } => {
            anyhow::ensure!(file.is_file(), "{} is not a file", file.display());

            let document = extract_metadata(&file)
                .with_context(|| format!("failed to extract metadata from {}", file.display()))?;

            if save_json || config.metadata.save_json {
                let output_dir = json_dir.unwrap_or_else(|| config.metadata_json_dir());
                let path = spawn::save_file_metadata_json(&file, &document, &output_dir)?;
                eprintln!("Saved metadata to {}", path.display());
            } else {
                serde_json::to_writer_pretty(std::io::stdout().lock(), &document)?;
                println!();
            }
        }
    }

    Ok(())
}
