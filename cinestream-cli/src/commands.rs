//! CLI command implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use cinestream_core::config::CinestreamConfig;
use cinestream_core::{HttpFetcher, ProductionFetcher};
use cinestream_search::{
    CatalogEntry, ContentResolver, MediaExtractor, MediaKind, SiteDescriptor, builtin_descriptors,
    load_descriptors,
};
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// List the registered sites
    Sites,
    /// Search all sites and show identified results
    Search {
        /// Title to search for
        query: String,
        /// Kind of content to search for
        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
    },
    /// Search, then resolve streams for one of the results
    Streams {
        /// Title to search for
        query: String,
        /// Kind of content to search for
        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
        /// 1-based index of the result to resolve
        #[arg(short, long, default_value = "1")]
        pick: usize,
    },
    /// Search, then show the stored entry for one of the results
    Meta {
        /// Title to search for
        query: String,
        /// Kind of content to search for
        #[arg(short, long, default_value = "movie")]
        kind: MediaKind,
        /// 1-based index of the result to show
        #[arg(short, long, default_value = "1")]
        pick: usize,
    },
    /// Fetch a single page and list the media references found on it
    Extract {
        /// Page URL
        url: String,
    },
}

/// Options shared by every command
#[derive(Debug, Default)]
pub struct GlobalOptions {
    pub sites: Option<PathBuf>,
    pub json: bool,
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands, options: &GlobalOptions) -> Result<()> {
    let config = CinestreamConfig::from_env();
    tracing::debug!(?config, "Loaded configuration");

    match command {
        Commands::Sites => list_sites(options),
        Commands::Search { query, kind } => search(&config, options, &query, kind).await,
        Commands::Streams { query, kind, pick } => {
            streams(&config, options, &query, kind, pick).await
        }
        Commands::Meta { query, kind, pick } => meta(&config, options, &query, kind, pick).await,
        Commands::Extract { url } => extract(&config, options, &url).await,
    }
}

/// List the registered sites
///
/// # Errors
/// - Site file could not be loaded
pub fn list_sites(options: &GlobalOptions) -> Result<()> {
    let descriptors = site_descriptors(options)?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    println!("Registered Sites");
    println!("{:-<60}", "");
    for descriptor in &descriptors {
        println!("{:<16} {}", descriptor.name, descriptor.base_url);
    }

    Ok(())
}

/// Search all sites and print identified results
///
/// # Errors
/// - Site file or descriptors are invalid
/// - HTTP client could not be built
pub async fn search(
    config: &CinestreamConfig,
    options: &GlobalOptions,
    query: &str,
    kind: MediaKind,
) -> Result<()> {
    let resolver = build_resolver(config, options)?;
    let catalog = resolver.catalog(query, kind).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&catalog)?);
    } else if catalog.is_empty() {
        println!("No results for '{query}'.");
    } else {
        println!("Results for '{query}' ({kind})");
        println!("{:-<60}", "");
        for (index, entry) in catalog.iter().enumerate() {
            print_entry(index + 1, entry);
        }
    }

    resolver.shutdown().await;
    Ok(())
}

/// Search, then resolve streams for the picked result
///
/// # Errors
/// - Site file or descriptors are invalid
/// - HTTP client could not be built
/// - `pick` is out of range
pub async fn streams(
    config: &CinestreamConfig,
    options: &GlobalOptions,
    query: &str,
    kind: MediaKind,
    pick: usize,
) -> Result<()> {
    let resolver = build_resolver(config, options)?;
    let catalog = resolver.catalog(query, kind).await;
    let entry = picked(&catalog, query, pick)?;

    let streams = resolver.streams(&entry.id).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&streams)?);
    } else if streams.is_empty() {
        println!("No streams found for '{}'.", entry.result.title);
    } else {
        println!("Streams for '{}'", entry.result.title);
        println!("{:-<60}", "");
        for stream in &streams {
            println!("{} [{}]", stream.name, stream.display_title);
            println!("  {}", stream.play_url);
        }
    }

    resolver.shutdown().await;
    Ok(())
}

/// Search, then print the stored entry of the picked result
///
/// # Errors
/// - Site file or descriptors are invalid
/// - HTTP client could not be built
/// - `pick` is out of range
pub async fn meta(
    config: &CinestreamConfig,
    options: &GlobalOptions,
    query: &str,
    kind: MediaKind,
    pick: usize,
) -> Result<()> {
    let resolver = build_resolver(config, options)?;
    let catalog = resolver.catalog(query, kind).await;
    let id = picked(&catalog, query, pick)?.id.clone();

    let Some(entry) = resolver.entry(&id) else {
        bail!("identifier {id} is no longer stored");
    };

    if options.json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("Entry {}", entry.id);
        println!("{:-<60}", "");
        println!("Title:   {}", entry.title);
        println!("Source:  {}", entry.source_name);
        println!("URL:     {}", entry.source_url);
        println!("Stored:  {}", entry.created_at.to_rfc3339());
    }

    resolver.shutdown().await;
    Ok(())
}

/// Fetch a page and print its media candidates
///
/// # Errors
/// - HTTP client could not be built
/// - The page could not be fetched
pub async fn extract(config: &CinestreamConfig, options: &GlobalOptions, url: &str) -> Result<()> {
    let fetcher = ProductionFetcher::new(&config.fetch).context("failed to build HTTP client")?;
    let html = fetcher
        .fetch(url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?;

    let candidates = MediaExtractor::new()?.extract(&html, url);

    if options.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
    } else if candidates.is_empty() {
        println!("No media references found.");
    } else {
        for candidate in &candidates {
            println!(
                "{:<18} {:<8} {}",
                candidate.format.as_str(),
                candidate.quality,
                candidate.url
            );
        }
    }

    Ok(())
}

fn site_descriptors(options: &GlobalOptions) -> Result<Vec<SiteDescriptor>> {
    match &options.sites {
        Some(path) => Ok(load_descriptors(path)?),
        None => Ok(builtin_descriptors()),
    }
}

fn build_resolver(config: &CinestreamConfig, options: &GlobalOptions) -> Result<ContentResolver> {
    let fetcher: Arc<dyn HttpFetcher> =
        Arc::new(ProductionFetcher::new(&config.fetch).context("failed to build HTTP client")?);
    let resolver = ContentResolver::new(config, fetcher, site_descriptors(options)?)?;
    Ok(resolver)
}

/// Entry at 1-based position `pick`
fn picked<'a>(catalog: &'a [CatalogEntry], query: &str, pick: usize) -> Result<&'a CatalogEntry> {
    if catalog.is_empty() {
        bail!("no results for '{query}'");
    }
    pick.checked_sub(1)
        .and_then(|index| catalog.get(index))
        .with_context(|| format!("--pick must be between 1 and {}", catalog.len()))
}

fn print_entry(position: usize, entry: &CatalogEntry) {
    println!(
        "{position:>2}. {} [{}]",
        entry.result.title, entry.result.source_name
    );
    println!("    id:     {}", entry.id);
    println!("    url:    {}", entry.result.detail_url);
    if let Some(poster) = &entry.result.poster_url {
        println!("    poster: {poster}");
    }
}

#[cfg(test)]
mod tests {
    use cinestream_search::SearchResult;

    use super::*;

    fn entry(id: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            result: SearchResult {
                title: id.to_string(),
                detail_url: format!("https://site.example/{id}"),
                poster_url: None,
                media_kind: MediaKind::Movie,
                source_name: "Site".to_string(),
            },
        }
    }

    #[test]
    fn test_pick_is_one_based() {
        let catalog = vec![entry("a"), entry("b")];

        assert_eq!(picked(&catalog, "q", 1).unwrap().id, "a");
        assert_eq!(picked(&catalog, "q", 2).unwrap().id, "b");
        assert!(picked(&catalog, "q", 0).is_err());
        assert!(picked(&catalog, "q", 3).is_err());
        assert!(picked(&[], "q", 1).is_err());
    }

    #[test]
    fn test_builtin_sites_without_file() {
        let descriptors = site_descriptors(&GlobalOptions::default()).unwrap();
        assert_eq!(descriptors.len(), 5);
    }
}
