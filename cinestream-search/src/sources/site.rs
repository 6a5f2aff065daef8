//! Data-driven scraping source.
//!
//! Every supported site runs the same algorithm; what differs is captured by
//! a [`SiteDescriptor`]: where the site lives and which selectors find result
//! containers, titles, links and posters in its templates. Each field has an
//! ordered list of selector groups and the first group that yields a value
//! wins, which keeps working across template revisions.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cinestream_core::HttpFetcher;
use cinestream_core::config::SearchConfig;
use futures::StreamExt;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ContentSource;
use crate::errors::MediaSearchError;
use crate::extractor::{MediaExtractor, resolve_reference};
use crate::types::{MediaCandidate, MediaKind, ResolvedStream, SearchResult};

/// Static scraping configuration for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteDescriptor {
    pub name: String,
    pub base_url: String,
    /// Query parameter carrying the search term
    #[serde(default = "default_search_param")]
    pub search_param: String,
    pub container_selectors: Vec<String>,
    pub title_selectors: Vec<String>,
    #[serde(default = "default_link_selectors")]
    pub link_selectors: Vec<String>,
    #[serde(default = "default_poster_selectors")]
    pub poster_selectors: Vec<String>,
    /// Attributes read from the poster element, in order
    #[serde(default = "default_poster_attributes")]
    pub poster_attributes: Vec<String>,
}

fn default_search_param() -> String {
    "s".to_string()
}

fn default_link_selectors() -> Vec<String> {
    vec!["a[href]".to_string()]
}

fn default_poster_selectors() -> Vec<String> {
    vec!["img".to_string()]
}

fn default_poster_attributes() -> Vec<String> {
    ["src", "data-src", "data-lazy-src"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl SiteDescriptor {
    /// Descriptor with default link, poster and search parameter settings.
    pub fn new(name: &str, base_url: &str, containers: &[&str], titles: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            search_param: default_search_param(),
            container_selectors: containers.iter().map(|s| s.to_string()).collect(),
            title_selectors: titles.iter().map(|s| s.to_string()).collect(),
            link_selectors: default_link_selectors(),
            poster_selectors: default_poster_selectors(),
            poster_attributes: default_poster_attributes(),
        }
    }

    /// Search page URL for `query`.
    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/?{}={}",
            self.base_url.trim_end_matches('/'),
            self.search_param,
            urlencoding::encode(query.trim())
        )
    }
}

#[derive(Debug, Clone)]
struct CompiledSelectors {
    containers: Vec<Selector>,
    titles: Vec<Selector>,
    links: Vec<Selector>,
    posters: Vec<Selector>,
}

impl CompiledSelectors {
    fn compile(descriptor: &SiteDescriptor) -> Result<Self, MediaSearchError> {
        let compile_group = |selectors: &[String]| -> Result<Vec<Selector>, MediaSearchError> {
            selectors
                .iter()
                .map(|selector| {
                    Selector::parse(selector).map_err(|e| MediaSearchError::InvalidDescriptor {
                        source_name: descriptor.name.clone(),
                        selector: selector.clone(),
                        reason: e.to_string(),
                    })
                })
                .collect()
        };

        Ok(Self {
            containers: compile_group(&descriptor.container_selectors)?,
            titles: compile_group(&descriptor.title_selectors)?,
            links: compile_group(&descriptor.link_selectors)?,
            posters: compile_group(&descriptor.poster_selectors)?,
        })
    }
}

/// Scraping source driven by a [`SiteDescriptor`].
pub struct SiteSource {
    descriptor: SiteDescriptor,
    selectors: CompiledSelectors,
    extractor: MediaExtractor,
    fetcher: Arc<dyn HttpFetcher>,
    per_source_limit: usize,
    embed_concurrency: usize,
}

impl fmt::Debug for SiteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteSource")
            .field("name", &self.descriptor.name)
            .field("base_url", &self.descriptor.base_url)
            .field("per_source_limit", &self.per_source_limit)
            .finish_non_exhaustive()
    }
}

impl SiteSource {
    /// Compiles the descriptor's selectors into a ready source.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidDescriptor` - A selector does not parse
    /// - `MediaSearchError::InvalidPattern` - The extraction rules failed to compile
    pub fn new(
        descriptor: SiteDescriptor,
        fetcher: Arc<dyn HttpFetcher>,
        config: &SearchConfig,
    ) -> Result<Self, MediaSearchError> {
        let selectors = CompiledSelectors::compile(&descriptor)?;
        Ok(Self {
            descriptor,
            selectors,
            extractor: MediaExtractor::new()?,
            fetcher,
            per_source_limit: config.per_source_limit,
            embed_concurrency: config.embed_concurrency.max(1),
        })
    }

    /// Parses a search results page into at most `per_source_limit` results.
    ///
    /// Containers without a title or link are skipped.
    pub fn parse_search_results(&self, html: &str, kind: MediaKind) -> Vec<SearchResult> {
        let document = Html::parse_document(html);
        let base = Url::parse(&self.descriptor.base_url).ok();

        let Some(containers) = self
            .selectors
            .containers
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|matches| !matches.is_empty())
        else {
            return Vec::new();
        };

        let mut results = Vec::new();
        for container in containers {
            if results.len() >= self.per_source_limit {
                break;
            }

            let Some(title) = self.container_title(container) else {
                tracing::trace!(source = %self.descriptor.name, "Skipping container without title");
                continue;
            };
            let Some(detail_url) = self
                .container_link(container)
                .and_then(|href| resolve_reference(base.as_ref(), href))
            else {
                tracing::trace!(source = %self.descriptor.name, title = %title, "Skipping container without link");
                continue;
            };
            let poster_url = self
                .container_poster(container)
                .and_then(|src| resolve_reference(base.as_ref(), src));

            results.push(SearchResult {
                title,
                detail_url,
                poster_url,
                media_kind: kind,
                source_name: self.descriptor.name.clone(),
            });
        }

        results
    }

    fn container_title(&self, container: ElementRef<'_>) -> Option<String> {
        self.selectors.titles.iter().find_map(|selector| {
            container
                .select(selector)
                .next()
                .map(|element| collapse_whitespace(&element.text().collect::<String>()))
                .filter(|title| !title.is_empty())
        })
    }

    fn container_link<'a>(&self, container: ElementRef<'a>) -> Option<&'a str> {
        self.selectors.links.iter().find_map(|selector| {
            container
                .select(selector)
                .next()
                .and_then(|element| element.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
        })
    }

    fn container_poster<'a>(&self, container: ElementRef<'a>) -> Option<&'a str> {
        self.selectors.posters.iter().find_map(|selector| {
            let element = container.select(selector).next()?;
            self.descriptor
                .poster_attributes
                .iter()
                .filter_map(|name| element.value().attr(name))
                .map(str::trim)
                .find(|value| !value.is_empty())
        })
    }

    /// Streams offered by one candidate of the detail page.
    ///
    /// Embeds cost exactly one more fetch; embeds found behind an embed are
    /// ignored.
    async fn expand_candidate(&self, candidate: MediaCandidate) -> Vec<ResolvedStream> {
        if candidate.format.is_playable() {
            return vec![ResolvedStream::from_candidate(&self.descriptor.name, candidate)];
        }

        let embed_html = match self.fetcher.fetch(&candidate.url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(source = %self.descriptor.name, embed = %candidate.url, error = %e, "Embed hop failed");
                return Vec::new();
            }
        };

        let streams: Vec<ResolvedStream> = self
            .extractor
            .extract(&embed_html, &candidate.url)
            .into_iter()
            .filter(|nested| nested.format.is_playable())
            .map(|nested| ResolvedStream::from_candidate(&self.descriptor.name, nested))
            .collect();

        tracing::debug!(
            source = %self.descriptor.name,
            embed = %candidate.url,
            found = streams.len(),
            "Followed embed"
        );
        streams
    }
}

#[async_trait]
impl ContentSource for SiteSource {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn base_url(&self) -> &str {
        &self.descriptor.base_url
    }

    async fn search(
        &self,
        query: &str,
        kind: MediaKind,
    ) -> Result<Vec<SearchResult>, MediaSearchError> {
        let url = self.descriptor.search_url(query);

        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(source = %self.descriptor.name, error = %e, "Search request failed");
                return Ok(Vec::new());
            }
        };

        let results = self.parse_search_results(&html, kind);
        tracing::debug!(
            source = %self.descriptor.name,
            query = %query,
            found = results.len(),
            "Search completed"
        );
        Ok(results)
    }

    async fn resolve_streams(
        &self,
        detail_url: &str,
    ) -> Result<Vec<ResolvedStream>, MediaSearchError> {
        let html = match self.fetcher.fetch(detail_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(source = %self.descriptor.name, url = %detail_url, error = %e, "Detail page fetch failed");
                return Ok(Vec::new());
            }
        };

        let candidates = self.extractor.extract(&html, detail_url);
        if candidates.is_empty() {
            tracing::debug!(source = %self.descriptor.name, url = %detail_url, "No media candidates on detail page");
            return Ok(Vec::new());
        }

        let streams: Vec<ResolvedStream> = futures::stream::iter(candidates)
            .map(|candidate| self.expand_candidate(candidate))
            .buffered(self.embed_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        tracing::info!(
            source = %self.descriptor.name,
            url = %detail_url,
            streams = streams.len(),
            "Resolved streams"
        );
        Ok(streams)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use cinestream_core::{NetworkError, SimulatedFetcher};

    use super::*;
    use crate::types::MediaFormat;

    const BASE: &str = "https://moviesmod.net";

    fn descriptor() -> SiteDescriptor {
        SiteDescriptor::new(
            "MoviesMode",
            BASE,
            &[".post-item", ".movie-item", ".item"],
            &["h2 a", ".title a", "h3 a"],
        )
    }

    fn source_with(fetcher: Arc<SimulatedFetcher>) -> SiteSource {
        SiteSource::new(descriptor(), fetcher, &SearchConfig::default()).unwrap()
    }

    fn result_item(i: usize) -> String {
        format!(
            r#"<div class="item"><a href="/movie-{i}/"><img data-src="/posters/{i}.jpg"></a><h3><a href="/movie-{i}/">Movie   {i}</a></h3></div>"#
        )
    }

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            descriptor().search_url("the dark knight"),
            "https://moviesmod.net/?s=the%20dark%20knight"
        );
    }

    #[test]
    fn test_descriptor_json_defaults() {
        let json = r#"{
            "name": "Example",
            "base_url": "https://example.org",
            "container_selectors": [".result"],
            "title_selectors": ["h2"]
        }"#;
        let parsed: SiteDescriptor = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.search_param, "s");
        assert_eq!(parsed.link_selectors, vec!["a[href]"]);
        assert_eq!(parsed.poster_attributes[0], "src");
    }

    #[test]
    fn test_invalid_selector_is_rejected() {
        let mut bad = descriptor();
        bad.title_selectors = vec!["h2 >> a[".to_string()];

        let result = SiteSource::new(
            bad,
            Arc::new(SimulatedFetcher::new()),
            &SearchConfig::default(),
        );
        assert!(matches!(
            result,
            Err(MediaSearchError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_parse_results_uses_fallback_groups() {
        let source = source_with(Arc::new(SimulatedFetcher::new()));
        let html = format!(
            "<html><body>{}{}<div class=\"item\"><p>no title</p></div></body></html>",
            result_item(1),
            result_item(2)
        );

        let results = source.parse_search_results(&html, MediaKind::Series);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Movie 1");
        assert_eq!(results[0].detail_url, "https://moviesmod.net/movie-1/");
        assert_eq!(
            results[0].poster_url.as_deref(),
            Some("https://moviesmod.net/posters/1.jpg")
        );
        assert_eq!(results[0].media_kind, MediaKind::Series);
        assert_eq!(results[0].source_name, "MoviesMode");
    }

    #[test]
    fn test_first_matching_container_group_wins() {
        let source = source_with(Arc::new(SimulatedFetcher::new()));
        let html = r#"
            <div class="post-item"><h2><a href="/a/">From post item</a></h2></div>
            <div class="item"><h3><a href="/b/">From item</a></h3></div>
        "#;

        let results = source.parse_search_results(html, MediaKind::Movie);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "From post item");
        assert!(results[0].poster_url.is_none());
    }

    #[test]
    fn test_results_capped_per_source() {
        let source = source_with(Arc::new(SimulatedFetcher::new()));
        let html: String = (0..15).map(result_item).collect();

        assert_eq!(source.parse_search_results(&html, MediaKind::Movie).len(), 10);
    }

    #[tokio::test]
    async fn test_search_degrades_on_network_error() {
        let fetcher = Arc::new(SimulatedFetcher::new());
        let url = descriptor().search_url("x");
        fetcher.add_failure(&url, NetworkError::Timeout { url: url.clone() });

        let results = source_with(fetcher).search("x", MediaKind::Movie).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_fetches_descriptor_url() {
        let fetcher = Arc::new(SimulatedFetcher::new());
        fetcher.add_page(&descriptor().search_url("movie"), &result_item(3));

        let results = source_with(Arc::clone(&fetcher))
            .search("movie", MediaKind::Movie)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(fetcher.total_fetches(), 1);
    }

    #[tokio::test]
    async fn test_resolve_follows_one_embed_level() {
        let detail = "https://moviesmod.net/movie-1/";
        let embed = "https://player.example/e/1";
        let nested = "https://player.example/e/nested";

        let fetcher = Arc::new(
            SimulatedFetcher::new()
                .with_page(
                    detail,
                    &format!(
                        r#"<iframe src="{embed}"></iframe><a href="/files/direct.mp4">mp4</a>"#
                    ),
                )
                .with_page(
                    embed,
                    &format!(
                        r#"<iframe src="{nested}"></iframe><video><source src="/hls/master.m3u8"></video>"#
                    ),
                )
                .with_page(nested, r#"<a href="/deep.mp4">deep</a>"#),
        );

        let streams = source_with(Arc::clone(&fetcher))
            .resolve_streams(detail)
            .await
            .unwrap();

        assert_eq!(fetcher.fetch_count(detail), 1);
        assert_eq!(fetcher.fetch_count(embed), 1);
        assert_eq!(fetcher.fetch_count(nested), 0);
        assert_eq!(fetcher.total_fetches(), 2);

        let urls: Vec<&str> = streams.iter().map(|s| s.play_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://player.example/hls/master.m3u8",
                "https://moviesmod.net/files/direct.mp4"
            ]
        );
        assert_eq!(streams[0].media_format, MediaFormat::AdaptivePlaylist);
        assert_eq!(streams[0].display_title, "MoviesMode - M3U8");
        assert_eq!(streams[1].display_title, "MoviesMode - MP4");
        assert_eq!(streams[1].name, "MoviesMode - 720p");
    }

    #[tokio::test]
    async fn test_failed_embed_does_not_abort_siblings() {
        let detail = "https://moviesmod.net/movie-2/";
        let broken = "https://broken.example/e/1";
        let working = "https://player.example/e/2";

        let fetcher = Arc::new(
            SimulatedFetcher::new()
                .with_page(
                    detail,
                    &format!(r#"<iframe src="{broken}"></iframe><iframe src="{working}"></iframe>"#),
                )
                .with_page(working, r#"<a href="https://cdn.example/720p/file.mp4">go</a>"#),
        );
        fetcher.add_failure(
            broken,
            NetworkError::ConnectionFailed {
                url: broken.to_string(),
                reason: "refused".to_string(),
            },
        );

        let streams = source_with(fetcher).resolve_streams(detail).await.unwrap();

        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].play_url, "https://cdn.example/720p/file.mp4");
    }

    #[tokio::test]
    async fn test_resolve_degrades_on_detail_failure() {
        let fetcher = Arc::new(SimulatedFetcher::new());
        let streams = source_with(fetcher)
            .resolve_streams("https://moviesmod.net/missing/")
            .await
            .unwrap();
        assert!(streams.is_empty());
    }

    #[tokio::test]
    async fn test_relative_references_resolve_against_detail_page() {
        let detail = "https://moviesmod.net/movie/heat-1995/";
        let fetcher = Arc::new(
            SimulatedFetcher::new()
                .with_page(
                    detail,
                    r#"<iframe src="embed/1"></iframe><a href="files/Heat.1080p.mp4">mp4</a>"#,
                )
                .with_page(
                    "https://moviesmod.net/movie/heat-1995/embed/1",
                    r#"<video><source src="hls/master.m3u8"></video>"#,
                ),
        );

        let streams = source_with(Arc::clone(&fetcher))
            .resolve_streams(detail)
            .await
            .unwrap();

        let urls: Vec<&str> = streams.iter().map(|s| s.play_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://moviesmod.net/movie/heat-1995/embed/hls/master.m3u8",
                "https://moviesmod.net/movie/heat-1995/files/Heat.1080p.mp4",
            ]
        );
        assert_eq!(fetcher.fetch_count("https://moviesmod.net/embed/1"), 0);
    }
}
