//! Heuristic discovery of media references in arbitrary HTML.
//!
//! Content pages share no markup conventions, so extraction runs three fixed
//! rules over the whole document and concatenates their hits rule by rule:
//!
//! 1. `iframe` elements (`src`, else `data-src`) as embeds
//! 2. `video source` elements and anchors pointing at `.mp4` / `.m3u8` files
//! 3. `div` containers exposing `data-src` / `data-url`, as embeds
//!
//! Extraction never fails. Malformed markup yields whatever the HTML parser
//! recovers, and references that cannot be resolved to an absolute
//! `http(s)` URL are dropped.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::errors::MediaSearchError;
use crate::types::{MediaCandidate, MediaFormat};

/// Quality assumed for direct links that carry no resolution marker.
pub const DEFAULT_DIRECT_QUALITY: &str = "720p";

/// Quality reported when nothing is known.
pub const UNKNOWN_QUALITY: &str = "Unknown";

const IFRAME_SELECTOR: &str = "iframe";
const DIRECT_SELECTOR: &str = r#"video source, a[href*=".mp4"], a[href*=".m3u8"]"#;
const EMBED_CONTAINER_SELECTOR: &str = "div[data-src], div[data-url]";
const QUALITY_PATTERN: &str = r"(?i)(?:^|[^0-9])(2160|1440|1080|720|480|360)p";

/// Compiled extraction rules.
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    iframes: Selector,
    direct_links: Selector,
    embed_containers: Selector,
    quality: Regex,
}

impl MediaExtractor {
    /// Compiles the extraction rules.
    ///
    /// # Errors
    /// - `MediaSearchError::InvalidPattern` - A built-in selector or pattern failed to compile
    pub fn new() -> Result<Self, MediaSearchError> {
        Ok(Self {
            iframes: compile_selector(IFRAME_SELECTOR)?,
            direct_links: compile_selector(DIRECT_SELECTOR)?,
            embed_containers: compile_selector(EMBED_CONTAINER_SELECTOR)?,
            quality: Regex::new(QUALITY_PATTERN).map_err(|e| MediaSearchError::InvalidPattern {
                pattern: QUALITY_PATTERN.to_string(),
                reason: e.to_string(),
            })?,
        })
    }

    /// Finds candidate media references in `html`, resolving them against `base_url`.
    pub fn extract(&self, html: &str, base_url: &str) -> Vec<MediaCandidate> {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();
        if base.is_none() {
            tracing::debug!(base_url = %base_url, "Base URL does not parse, keeping absolute references only");
        }

        let mut candidates = Vec::new();

        for element in document.select(&self.iframes) {
            let reference = attribute(element, &["src", "data-src"]);
            if let Some(url) = reference.and_then(|r| resolve_reference(base.as_ref(), r)) {
                candidates.push(MediaCandidate {
                    url,
                    format: MediaFormat::Embed,
                    quality: UNKNOWN_QUALITY.to_string(),
                });
            }
        }

        for element in document.select(&self.direct_links) {
            let Some(reference) = attribute(element, &["href", "src"]) else {
                continue;
            };
            let Some(format) = classify_direct(reference) else {
                continue;
            };
            if let Some(url) = resolve_reference(base.as_ref(), reference) {
                candidates.push(MediaCandidate {
                    quality: self.infer_quality(&url),
                    url,
                    format,
                });
            }
        }

        for element in document.select(&self.embed_containers) {
            let reference = attribute(element, &["data-src", "data-url"]);
            if let Some(url) = reference.and_then(|r| resolve_reference(base.as_ref(), r)) {
                candidates.push(MediaCandidate {
                    url,
                    format: MediaFormat::Embed,
                    quality: UNKNOWN_QUALITY.to_string(),
                });
            }
        }

        tracing::trace!(base_url = %base_url, found = candidates.len(), "Extracted media candidates");
        candidates
    }

    /// Resolution marker in `url`, or the direct-link placeholder.
    fn infer_quality(&self, url: &str) -> String {
        self.quality
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| format!("{}p", m.as_str()))
            .unwrap_or_else(|| DEFAULT_DIRECT_QUALITY.to_string())
    }
}

fn compile_selector(selector: &str) -> Result<Selector, MediaSearchError> {
    Selector::parse(selector).map_err(|e| MediaSearchError::InvalidPattern {
        pattern: selector.to_string(),
        reason: e.to_string(),
    })
}

/// First non-blank value among `names`, trimmed.
fn attribute<'a>(element: ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Playlist links win over file links when both markers appear.
fn classify_direct(reference: &str) -> Option<MediaFormat> {
    if reference.contains(".m3u8") {
        Some(MediaFormat::AdaptivePlaylist)
    } else if reference.contains(".mp4") {
        Some(MediaFormat::DirectFile)
    } else {
        None
    }
}

/// Resolves `reference` to an absolute `http(s)` URL.
pub(crate) fn resolve_reference(base: Option<&Url>, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }

    let resolved = match base {
        Some(base) => base.join(reference).ok()?,
        None => Url::parse(reference).ok()?,
    };

    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://vegamovies.nl/inception-2010/";

    fn extractor() -> MediaExtractor {
        MediaExtractor::new().unwrap()
    }

    #[test]
    fn test_fixture_with_one_of_each() {
        let html = r#"
            <html><body>
              <a href="https://cdn.example/files/inception.mp4">Download</a>
              <iframe src="https://player.example/embed/42"></iframe>
              <a href="/hls/inception.m3u8">Stream</a>
            </body></html>
        "#;

        let candidates = extractor().extract(html, BASE);
        let formats: Vec<MediaFormat> = candidates.iter().map(|c| c.format).collect();

        assert_eq!(
            formats,
            vec![
                MediaFormat::Embed,
                MediaFormat::DirectFile,
                MediaFormat::AdaptivePlaylist
            ]
        );
        assert_eq!(candidates[0].url, "https://player.example/embed/42");
        assert_eq!(candidates[0].quality, UNKNOWN_QUALITY);
        assert_eq!(candidates[1].quality, DEFAULT_DIRECT_QUALITY);
        assert_eq!(candidates[2].url, "https://vegamovies.nl/hls/inception.m3u8");
    }

    #[test]
    fn test_iframe_falls_back_to_data_src() {
        let html = r#"<iframe data-src="//player.example/e/7"></iframe>"#;
        let candidates = extractor().extract(html, BASE);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://player.example/e/7");
    }

    #[test]
    fn test_video_source_and_embed_containers() {
        let html = r#"
            <div data-url="/embed/9">player</div>
            <video><source src="media/clip.mp4" type="video/mp4"></video>
            <video><source src="media/clip.webm" type="video/webm"></video>
        "#;
        let candidates = extractor().extract(html, BASE);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].format, MediaFormat::DirectFile);
        assert_eq!(
            candidates[0].url,
            "https://vegamovies.nl/inception-2010/media/clip.mp4"
        );
        assert_eq!(candidates[1].format, MediaFormat::Embed);
        assert_eq!(candidates[1].url, "https://vegamovies.nl/embed/9");
    }

    #[test]
    fn test_quality_marker_is_used() {
        let html = r#"<a href="https://cdn.example/Movie.2010.1080p.mp4">1080</a>"#;
        let candidates = extractor().extract(html, BASE);

        assert_eq!(candidates[0].quality, "1080p");
    }

    #[test]
    fn test_non_http_references_are_dropped() {
        let html = r#"
            <iframe src="about:blank"></iframe>
            <iframe src="javascript:void(0)"></iframe>
            <iframe src="   "></iframe>
            <div data-src="mailto:someone@example.com"></div>
        "#;

        assert!(extractor().extract(html, BASE).is_empty());
    }

    #[test]
    fn test_malformed_html_is_tolerated() {
        let html = r#"<div><iframe src="https://player.example/x"<a href="/x.mp4">"#;
        let candidates = extractor().extract(html, BASE);
        assert!(candidates.len() <= 2);

        assert!(extractor().extract("", BASE).is_empty());
        assert!(extractor().extract("not html at all", BASE).is_empty());
    }

    #[test]
    fn test_unparseable_base_keeps_absolute_references() {
        let html = r#"
            <iframe src="/relative/embed"></iframe>
            <iframe src="https://player.example/abs"></iframe>
        "#;
        let candidates = extractor().extract(html, "not a base");

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://player.example/abs");
    }

    #[test]
    fn test_classify_direct() {
        assert_eq!(
            classify_direct("/a/b.m3u8?token=1"),
            Some(MediaFormat::AdaptivePlaylist)
        );
        assert_eq!(classify_direct("/a/b.mp4"), Some(MediaFormat::DirectFile));
        assert_eq!(classify_direct("/a/b.mkv"), None);
    }
}
