//! Headline link discovery over a paginated tag listing.
//!
//! # URL Pattern
//!
//! The first listing page is the bare tag URL; page `N > 1` lives at
//! `{tag_url}/page/N/`. Article links resolve to absolute URLs like
//! `https://www.bleepingcomputer.com/news/security/some-article-slug/`.
//!
//! # Filters
//!
//! An anchor becomes an [`ArticleLink`] only if its resolved URL is on the
//! target origin, its path contains the article-path segment and no
//! promotional marker, and its visible text has at least three words (nav
//! links and "Read more" buttons are short).

use crate::config::{ConfigError, SiteConfig};
use crate::fetcher::{FetchError, PageKind, PageSource, listing_page_url};
use crate::models::ArticleLink;
use crate::utils::{clean_text, word_count};
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

/// Walks listing pages and collects unique, filter-passing article links.
#[derive(Debug, Clone)]
pub struct LinkDiscoverer {
    listing_url: String,
    base: Url,
    article_path: String,
    excluded_markers: Vec<String>,
    min_title_words: usize,
}

impl LinkDiscoverer {
    pub fn new(site: &SiteConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&site.base_url).map_err(|source| ConfigError::Url {
            url: site.base_url.clone(),
            source,
        })?;
        Ok(Self {
            listing_url: site.listing_url.clone(),
            base,
            article_path: site.article_path.to_lowercase(),
            excluded_markers: site
                .excluded_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            min_title_words: site.min_title_words,
        })
    }

    /// Every anchor on one listing page that passes the filters, in document
    /// order. Duplicates are kept; [`discover`](Self::discover) removes them.
    pub fn candidate_links(&self, html: &str, page_url: &str) -> Vec<ArticleLink> {
        let document = Html::parse_document(html);
        let resolve_base = Url::parse(page_url).unwrap_or_else(|_| self.base.clone());

        document
            .select(&ANCHOR)
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?.trim();
                let url = self.accept_url(&resolve_base, href)?;
                let title = clean_text(
                    &anchor
                        .text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .join(" "),
                );
                if title.is_empty() || word_count(&title) < self.min_title_words {
                    return None;
                }
                Some(ArticleLink { title, url })
            })
            .collect()
    }

    /// Resolve `href` and return its canonical form if it is an article URL
    /// on the target origin.
    fn accept_url(&self, resolve_base: &Url, href: &str) -> Option<String> {
        let mut url = resolve_base.join(href).ok()?;
        if url.origin() != self.base.origin() {
            return None;
        }
        let path = url.path().to_lowercase();
        if !path.contains(&self.article_path) {
            return None;
        }
        if self.excluded_markers.iter().any(|m| path.contains(m.as_str())) {
            return None;
        }
        url.set_fragment(None);
        Some(url.to_string())
    }

    /// Crawl up to `max_pages` listing pages and return at most `max_links`
    /// unique links in discovery order.
    ///
    /// Stops early once `max_links` is reached, or after the first page that
    /// contributes no new link (the listing is exhausted or looping).
    ///
    /// # Errors
    ///
    /// A failed listing fetch aborts the whole discovery and is returned as is.
    #[instrument(level = "info", skip(self, source), fields(listing_url = %self.listing_url))]
    pub async fn discover<S: PageSource>(
        &self,
        source: &S,
        max_links: usize,
        max_pages: usize,
    ) -> Result<Vec<ArticleLink>, FetchError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut links: Vec<ArticleLink> = Vec::new();
        if max_links == 0 {
            return Ok(links);
        }

        for page in 1..=max_pages {
            let page_url = listing_page_url(&self.listing_url, page);
            let html = source.fetch(&page_url, PageKind::Listing).await?;

            let mut fresh = 0usize;
            for link in self.candidate_links(&html, &page_url) {
                if !seen.insert(link.url.clone()) {
                    continue;
                }
                links.push(link);
                fresh += 1;
                if links.len() >= max_links {
                    info!(page, count = links.len(), "Reached link limit");
                    return Ok(links);
                }
            }

            debug!(page, fresh, total = links.len(), "Scanned listing page");
            if fresh == 0 {
                info!(page, "Listing page added no new links; stopping pagination");
                break;
            }
        }

        info!(count = links.len(), "Discovered article links");
        Ok(links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    const LISTING: &str = "https://www.bleepingcomputer.com/tag/data-breach/";

    fn discoverer() -> LinkDiscoverer {
        LinkDiscoverer::new(&SiteConfig::default()).unwrap()
    }

    fn page(anchors: &[(&str, &str)]) -> String {
        let body: String = anchors
            .iter()
            .map(|(href, text)| format!("<li><a href=\"{href}\">{text}</a></li>"))
            .collect();
        format!("<html><body><ul>{body}</ul></body></html>")
    }

    #[test]
    fn test_candidate_links_apply_filters() {
        let html = page(&[
            ("/news/security/hackers-steal-data-from-retailer/", "Hackers steal data from retailer"),
            ("/news/security/short/", "Read more"),
            ("/news/security/webinar-on-breaches/", "Join our breach webinar today"),
            ("/news/microsoft/windows-update-breaks-things/", "Windows update breaks things"),
            ("https://evil.example.com/news/security/fake/", "A fake security story"),
            ("/news/security/empty/", "   "),
        ]);

        let links = discoverer().candidate_links(&html, LISTING);
        assert_eq!(
            links,
            vec![ArticleLink {
                title: "Hackers steal data from retailer".to_string(),
                url: "https://www.bleepingcomputer.com/news/security/hackers-steal-data-from-retailer/"
                    .to_string(),
            }]
        );
    }

    #[test]
    fn test_candidate_links_collapse_nested_anchor_text() {
        let html = r#"<a href="/news/security/x/#comments"><span>Insurer</span>
            <b>discloses</b> breach   affecting millions</a>"#;
        let links = discoverer().candidate_links(html, LISTING);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, "Insurer discloses breach affecting millions");
        assert_eq!(links[0].url, "https://www.bleepingcomputer.com/news/security/x/");
    }

    #[tokio::test]
    async fn test_discover_dedupes_by_url_keeping_first() {
        let source = FakeSource::new().page(
            LISTING,
            &page(&[
                ("/news/security/a/", "First headline about a breach"),
                ("/news/security/a/", "Same story different anchor text"),
                ("/news/security/b/", "Second headline about a leak"),
            ]),
        );

        let links = discoverer().discover(&source, 10, 1).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "First headline about a breach");
        assert_eq!(links[1].url, "https://www.bleepingcomputer.com/news/security/b/");
    }

    #[tokio::test]
    async fn test_discover_stops_at_page_without_new_links() {
        let source = FakeSource::new()
            .page(LISTING, &page(&[("/news/security/a/", "Breach number one here")]))
            .page(
                &format!("{LISTING}page/2/"),
                &page(&[
                    ("/news/security/a/", "Breach number one here"),
                    ("/news/security/b/", "Breach number two here"),
                ]),
            )
            .page(
                &format!("{LISTING}page/3/"),
                &page(&[("/news/security/b/", "Breach number two here"), ("/about/", "About our company page")]),
            )
            .page(&format!("{LISTING}page/4/"), &page(&[("/news/security/c/", "Breach number three here")]));

        let links = discoverer().discover(&source, 50, 10).await.unwrap();
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.bleepingcomputer.com/news/security/a/",
                "https://www.bleepingcomputer.com/news/security/b/",
            ]
        );
        assert_eq!(source.requested().len(), 3);
    }

    #[tokio::test]
    async fn test_discover_stops_at_link_limit() {
        let source = FakeSource::new().page(
            LISTING,
            &page(&[
                ("/news/security/a/", "Breach number one here"),
                ("/news/security/b/", "Breach number two here"),
                ("/news/security/c/", "Breach number three here"),
            ]),
        );

        let links = discoverer().discover(&source, 2, 5).await.unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(source.requested(), vec![LISTING.to_string()]);
    }

    #[tokio::test]
    async fn test_discover_respects_max_pages() {
        let source = FakeSource::new()
            .page(LISTING, &page(&[("/news/security/a/", "Breach number one here")]))
            .page(&format!("{LISTING}page/2/"), &page(&[("/news/security/b/", "Breach number two here")]));

        let links = discoverer().discover(&source, 50, 1).await.unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(source.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_discover_propagates_listing_failure() {
        let source = FakeSource::new()
            .page(LISTING, &page(&[("/news/security/a/", "Breach number one here")]))
            .fail(
                &format!("{LISTING}page/2/"),
                FetchError::Status {
                    url: format!("{LISTING}page/2/"),
                    status: 404,
                },
            );

        let err = discoverer().discover(&source, 50, 3).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_discover_zero_limit_fetches_nothing() {
        let source = FakeSource::new();
        let links = discoverer().discover(&source, 0, 3).await.unwrap();
        assert!(links.is_empty());
        assert!(source.requested().is_empty());
    }

    #[tokio::test]
    async fn test_discovered_links_are_unique_and_wordy() {
        let source = FakeSource::new().page(
            LISTING,
            &page(&[
                ("/news/security/a/", "Breach number one here"),
                ("/news/security/a/#top", "Breach number one again"),
                ("/news/security/b/", "Two words"),
                ("/news/security/c/", "Another breach story today"),
            ]),
        );

        let links = discoverer().discover(&source, 50, 1).await.unwrap();
        let unique: HashSet<_> = links.iter().map(|l| l.url.clone()).collect();
        assert_eq!(unique.len(), links.len());
        assert!(links.iter().all(|l| word_count(&l.title) >= 3));
        assert_eq!(links.len(), 2);
    }
}
