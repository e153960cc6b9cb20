/// # audible2sheet CLI interface
///
/// Command parsing and orchestration for the `audible2sheet` binary. All
/// business logic (normalizing, caching, reconciling) lives in
/// [`audible2sheet_core`]; this module wires the configured clients into it
/// and prints results.
///
/// ## Data sources
/// Every subcommand works on the user's library. By default it is fetched live
/// (refreshing the raw cache and the book cache on the way); with `--cached`
/// the raw cache from the last fetch is replayed instead and no network call is
/// made for the library.
///
/// ## Output
/// Data goes to stdout. Diagnostics go through `tracing` to stderr.
use crate::audible::AudibleConfig;
use crate::load_config::{load_config, sheet_token, CliConfig};
use crate::sheet::SheetClient;
use anyhow::{Context, Result};
use audible2sheet_core::cache::CacheStore;
use audible2sheet_core::config::Config;
use audible2sheet_core::fetch::fetch_library;
use audible2sheet_core::inspect::{field_names, field_values, raw_lines, select_fields};
use audible2sheet_core::synchronise::{library_from_raw_cache, refresh_library, synchronise};
use audible2sheet_core::{Library, RawItem};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI for audible2sheet: export an Audible library into a Google Sheet.
#[derive(Parser, Debug)]
#[clap(
    name = "audible2sheet",
    version,
    about = "Export the books of an Audible library and append new ones to a Google Sheet"
)]
pub struct Cli {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: PathBuf,

    /// Log progress to stderr
    #[clap(short, long)]
    pub verbose: bool,

    /// Use the raw cache from the last fetch instead of calling the API
    #[clap(short = 'A', long)]
    pub cached: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the book list in cache format
    List,
    /// Print every raw library item as one JSON line
    Raw,
    /// List raw field names with the number of items that carry them
    Fields,
    /// List the distinct values of one raw field with their counts
    Values {
        field: String,
    },
    /// Print the chosen raw fields, `|`-separated
    Select {
        #[clap(required = true, num_args = 1..)]
        fields: Vec<String>,
        /// Only print the item with this ASIN
        #[clap(long)]
        asin: Option<String>,
    },
    /// Append books missing from the sheet
    Sync,
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let app = load_config(&cli.config)?;
    let config = app.core_config();
    config.trace_loaded();

    match cli.command {
        Commands::List => {
            let library = library(&app, &config, cli.cached).await?;
            print!("{}", CacheStore::render(&library));
        }
        Commands::Raw => {
            let items = raw_items(&app, &config, cli.cached).await?;
            print_lines(raw_lines(&items).context("Failed to serialize raw items")?);
        }
        Commands::Fields => {
            let items = raw_items(&app, &config, cli.cached).await?;
            print_lines(field_names(&items));
        }
        Commands::Values { field } => {
            let items = raw_items(&app, &config, cli.cached).await?;
            print_lines(field_values(&items, &field));
        }
        Commands::Select { fields, asin } => {
            let items = raw_items(&app, &config, cli.cached).await?;
            print_lines(select_fields(&items, &fields, asin.as_deref()));
        }
        Commands::Sync => {
            // Settle the destination before any fetch so a bad setup fails fast.
            let sheet = app.sheet()?.clone();
            let token = sheet_token()?;
            let destination =
                SheetClient::new(sheet, token).context("Failed to construct sheet client")?;

            let library = library(&app, &config, cli.cached).await?;
            tracing::info!(command = "sync", books = library.len(), "Starting synchronisation");
            match synchronise(&library, &destination).await {
                Ok(report) => {
                    tracing::info!(command = "sync", ?report, "Synchronisation complete");
                    println!(
                        "Appended {} new book(s); {} row(s) were already in the sheet",
                        report.appended, report.existing
                    );
                }
                Err(e) => {
                    tracing::error!(command = "sync", error = %e, "Synchronisation failed");
                    return Err(anyhow::Error::new(e).context("Synchronisation failed"));
                }
            }
        }
    }

    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

fn connect(app: &CliConfig) -> Result<crate::audible::AudibleClient> {
    let audible: AudibleConfig = app.audible();
    audible
        .connect()
        .with_context(|| format!("Could not authenticate with the {} marketplace", audible.locale))
}

/// The normalized library, refreshing the book cache either way.
async fn library(app: &CliConfig, config: &Config, cached: bool) -> Result<Library> {
    let raw_cache = config.raw_cache();
    let book_cache = config.book_cache();
    if cached {
        let library = library_from_raw_cache(&raw_cache, &config.filters)
            .context("Failed to read the raw cache; run once without --cached first")?;
        book_cache
            .save(&library)
            .context("Failed to write the book cache")?;
        Ok(library)
    } else {
        let client = connect(app)?;
        refresh_library(&client, &config.fetch, &config.filters, &raw_cache, &book_cache)
            .await
            .context("Failed to refresh the library")
    }
}

async fn raw_items(app: &CliConfig, config: &Config, cached: bool) -> Result<Vec<RawItem>> {
    let raw_cache = config.raw_cache();
    if cached {
        raw_cache
            .load()
            .context("Failed to read the raw cache; run once without --cached first")
    } else {
        let client = connect(app)?;
        fetch_library(&client, &config.fetch, Some(&raw_cache))
            .await
            .context("Failed to fetch the library")
    }
}
