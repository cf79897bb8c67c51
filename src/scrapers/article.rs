//! Field extraction from a single article page.
//!
//! The extractor never fails: a field whose whole cascade finds nothing
//! resolves to a sentinel (`None` for title and summary, [`UNKNOWN`] for
//! author and date). Fetching the page is the caller's job, so the result is
//! a pure function of `(html, url)`.
//!
//! # Cascades
//!
//! | Field | Strategies, in order |
//! |-------|----------------------|
//! | title | first `h1` |
//! | published | `.bc_article_date`, `time`, generic date classes |
//! | author | `.bc_article_author`, generic author classes, `a[rel=author]` wrapping `[itemprop=name]`, any `[itemprop=name]`, "By Name" in the header region |
//! | body | paragraphs of `div#bc_article_content`, then older containers |
//!
//! Selectors come from [`ExtractionConfig`]; the table shows the defaults.

use crate::config::{ConfigError, ExtractionConfig};
use crate::models::{ArticleRecord, UNKNOWN};
use crate::utils::{clean_text, word_count};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static BYLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[Bb]y\s+([A-Z][A-Za-z.'-]*(?:\s+[A-Z][A-Za-z.'-]*)*)").unwrap());
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.?!]\s+").unwrap());

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

fn compile_all(selectors: &[String]) -> Result<Vec<Selector>, ConfigError> {
    selectors.iter().map(|s| compile(s)).collect()
}

const DATELINE_WORDS: [&str; 25] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December", "Jan", "Feb", "Mar", "Apr", "Jun", "Jul", "Aug", "Sep",
    "Sept", "Oct", "Nov", "Dec", "Updated",
];

/// Concatenated, whitespace-collapsed text of an element.
fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}

/// Text nodes of an element joined with spaces, so sibling inline elements
/// stay separate words.
fn spaced_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().map(str::trim).filter(|t| !t.is_empty()).join(" "))
}

/// The capitalized name after "By", cut before a dateline that follows it.
fn byline_name(text: &str) -> Option<String> {
    let caps = BYLINE.captures(text)?;
    let name = caps[1]
        .split_whitespace()
        .take_while(|token| !DATELINE_WORDS.contains(&token.trim_end_matches(['.', ','])))
        .join(" ");
    (!name.is_empty()).then_some(name)
}

/// One way of reading a field out of a parsed page.
#[derive(Debug, Clone)]
pub enum FieldStrategy {
    /// Text of the first matching element that has any.
    FirstText(Selector),
    /// Text of an `inner` element found inside an `outer` match.
    Nested { outer: Selector, inner: Selector },
    /// The capitalized name following "By" in a matching region's text.
    Byline(Selector),
}

impl FieldStrategy {
    pub fn apply(&self, document: &Html) -> Option<String> {
        match self {
            FieldStrategy::FirstText(selector) => document
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty()),
            FieldStrategy::Nested { outer, inner } => document
                .select(outer)
                .flat_map(|el| el.select(inner))
                .map(element_text)
                .find(|text| !text.is_empty()),
            FieldStrategy::Byline(region) => document
                .select(region)
                .find_map(|el| byline_name(&spaced_text(el))),
        }
    }
}

/// Run `strategies` in order and return the first value `clean` keeps.
fn cascade(
    strategies: &[FieldStrategy],
    document: &Html,
    clean: impl Fn(String) -> Option<String>,
) -> Option<String> {
    strategies
        .iter()
        .find_map(|strategy| strategy.apply(document).and_then(&clean))
}

fn strip_by_prefix(author: String) -> Option<String> {
    let author = match author.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("by ") => author[3..].trim().to_string(),
        _ => author,
    };
    (!author.is_empty()).then_some(author)
}

/// Split text into sentences at `.`, `?` or `!` followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        sentences.push(text[start..m.start() + 1].trim());
        start = m.end();
    }
    if start < text.len() {
        sentences.push(text[start..].trim());
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

/// The result of running every cascade over one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// The record with `similarity` still unset.
    pub record: ArticleRecord,
    /// All surviving paragraphs joined, used for scoring.
    pub body: String,
    /// How many paragraphs survived filtering.
    pub paragraph_count: usize,
}

impl Extraction {
    /// True when author, date and body all came up empty, which points at a
    /// page layout none of the cascades know.
    pub fn layout_unrecognized(&self) -> bool {
        self.record.author == UNKNOWN && self.record.published == UNKNOWN && self.paragraph_count == 0
    }
}

/// Compiled selector cascades plus the body/summary rules.
#[derive(Debug, Clone)]
pub struct ArticleExtractor {
    title: Vec<FieldStrategy>,
    published: Vec<FieldStrategy>,
    author: Vec<FieldStrategy>,
    body: Vec<Selector>,
    min_paragraph_words: usize,
    skip_prefixes: Vec<String>,
    summary_paragraphs: usize,
    summary_sentences: usize,
    truncate_chars: usize,
}

impl ArticleExtractor {
    /// Compile every configured selector, failing on the first invalid one.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let title = compile_all(&config.title_selectors)?
            .into_iter()
            .map(FieldStrategy::FirstText)
            .collect();
        let published = compile_all(&config.date_selectors)?
            .into_iter()
            .map(FieldStrategy::FirstText)
            .collect();

        let mut author: Vec<FieldStrategy> = compile_all(&config.author_selectors)?
            .into_iter()
            .map(FieldStrategy::FirstText)
            .collect();
        author.extend(
            compile_all(&config.generic_author_selectors)?
                .into_iter()
                .map(FieldStrategy::FirstText),
        );
        author.push(FieldStrategy::Nested {
            outer: compile(&config.author_link_selector)?,
            inner: compile(&config.author_name_selector)?,
        });
        author.extend(
            compile_all(&config.microdata_name_selectors)?
                .into_iter()
                .map(FieldStrategy::FirstText),
        );
        author.extend(
            compile_all(&config.byline_region_selectors)?
                .into_iter()
                .map(FieldStrategy::Byline),
        );

        let mut body = vec![compile(&config.body_selector)?];
        body.extend(compile_all(&config.fallback_body_selectors)?);

        Ok(Self {
            title,
            published,
            author,
            body,
            min_paragraph_words: config.min_paragraph_words,
            skip_prefixes: config
                .skip_paragraph_prefixes
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
            summary_paragraphs: config.summary_paragraphs,
            summary_sentences: config.summary_sentences,
            truncate_chars: config.truncate_chars,
        })
    }

    /// Extract every field of the article at `url` from its markup.
    pub fn extract(&self, html: &str, url: &str) -> Extraction {
        let document = Html::parse_document(html);

        let title = cascade(&self.title, &document, Some);
        let published = cascade(&self.published, &document, Some).unwrap_or_else(|| UNKNOWN.to_string());
        let author = cascade(&self.author, &document, strip_by_prefix).unwrap_or_else(|| UNKNOWN.to_string());

        let paragraphs = self.paragraphs(&document);
        let summary_text = paragraphs.iter().take(self.summary_paragraphs).join(" ");
        let summary = self.summarize(&summary_text);

        Extraction {
            record: ArticleRecord {
                title,
                url: url.to_string(),
                author,
                published,
                summary,
                similarity: None,
                error: None,
            },
            body: paragraphs.join(" "),
            paragraph_count: paragraphs.len(),
        }
    }

    /// Paragraphs of the first body container that yields any usable one.
    fn paragraphs(&self, document: &Html) -> Vec<String> {
        for selector in &self.body {
            let paragraphs: Vec<String> = document
                .select(selector)
                .map(|p| clean_text(&p.text().map(str::trim).filter(|t| !t.is_empty()).join(" ")))
                .filter(|text| self.keep_paragraph(text))
                .collect();
            if !paragraphs.is_empty() {
                return paragraphs;
            }
        }
        Vec::new()
    }

    fn keep_paragraph(&self, text: &str) -> bool {
        if word_count(text) < self.min_paragraph_words {
            return false;
        }
        let lower = text.to_lowercase();
        !self.skip_prefixes.iter().any(|p| lower.starts_with(p.as_str()))
    }

    /// First few sentences of `text`; a long run-on text without any
    /// sentence break is cut to `truncate_chars` plus `...` instead.
    fn summarize(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let has_break = SENTENCE_END.is_match(text);
        if !has_break && text.chars().count() > self.truncate_chars {
            let cut: String = text.chars().take(self.truncate_chars).collect();
            return Some(format!("{}...", cut.trim_end()));
        }
        let summary = split_sentences(text)
            .into_iter()
            .take(self.summary_sentences)
            .join(" ");
        Some(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.bleepingcomputer.com/news/security/example/";

    fn extractor() -> ArticleExtractor {
        ArticleExtractor::from_config(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn test_scenario_full_article() {
        let html = r#"<html><body>
            <h1>Breach   at Example Co</h1>
            <div class="bc_article_date"> March 3, 2024 </div>
            <div class="bc_article_author">Bill Toulas</div>
            <div id="bc_article_content">
              <p>Example Co disclosed a breach on Monday.</p>
              <p>Attackers   accessed customer names and emails.</p>
              <p>The company reset all employee passwords.</p>
            </div>
        </body></html>"#;

        let extraction = extractor().extract(html, URL);
        let record = &extraction.record;
        assert_eq!(record.title.as_deref(), Some("Breach at Example Co"));
        assert_eq!(record.published, "March 3, 2024");
        assert_eq!(record.author, "Bill Toulas");
        assert_eq!(record.url, URL);
        let summary = record.summary.as_deref().unwrap();
        assert!(summary.contains("Example Co disclosed a breach on Monday."));
        assert!(summary.contains("Attackers accessed customer names and emails."));
        assert!(summary.contains("The company reset all employee passwords."));
        assert_eq!(extraction.paragraph_count, 3);
        assert!(!extraction.layout_unrecognized());
    }

    #[test]
    fn test_scenario_unrecognized_layout() {
        let html = "<html><body><h1>Odd page</h1><div class=\"x\">Hi</div></body></html>";
        let extraction = extractor().extract(html, URL);
        assert_eq!(extraction.record.author, UNKNOWN);
        assert_eq!(extraction.record.published, UNKNOWN);
        assert!(extraction.record.summary.is_none());
        assert_eq!(extraction.body, "");
        assert!(extraction.layout_unrecognized());
    }

    #[test]
    fn test_missing_title_is_none() {
        let extraction = extractor().extract("<p>nothing</p>", URL);
        assert!(extraction.record.title.is_none());
    }

    #[test]
    fn test_date_falls_back_to_time_then_generic_class() {
        let with_time = r#"<time datetime="2024-03-03">Mar 3, 2024</time><span class="date">ignored</span>"#;
        assert_eq!(extractor().extract(with_time, URL).record.published, "Mar 3, 2024");

        let generic = r#"<span class="post_date">April 1, 2023</span>"#;
        assert_eq!(extractor().extract(generic, URL).record.published, "April 1, 2023");
    }

    #[test]
    fn test_empty_dedicated_date_falls_through() {
        let html = r#"<div class="bc_article_date">  </div><time>June 9, 2022</time>"#;
        assert_eq!(extractor().extract(html, URL).record.published, "June 9, 2022");
    }

    #[test]
    fn test_author_from_rel_link_with_name() {
        let html = r#"<a rel="author" href="/author/x/"><span itemprop="name">Sergiu Gatlan</span></a>
                      <span itemprop="name">Publisher Inc</span>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Sergiu Gatlan");
    }

    #[test]
    fn test_author_from_microdata_name() {
        let html = r#"<div itemprop="author"><span itemprop="name">Ionut Ilascu</span></div>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Ionut Ilascu");
    }

    #[test]
    fn test_author_from_generic_class_strips_by() {
        let html = r#"<span class="author">By Lawrence Abrams</span>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Lawrence Abrams");
    }

    #[test]
    fn test_author_from_byline_scan() {
        let html = r#"<div class="bc_article_top">Security news by Mayank Parmar</div>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Mayank Parmar");
    }

    #[test]
    fn test_author_class_beats_breadcrumb_microdata() {
        let html = r#"<ol itemscope itemtype="https://schema.org/BreadcrumbList">
              <li itemprop="itemListElement"><span itemprop="name">News</span></li>
            </ol>
            <span class="author">By Lawrence Abrams</span>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Lawrence Abrams");
    }

    #[test]
    fn test_byline_scan_separates_adjacent_elements() {
        let html = r#"<div class="bc_article_top"><span>Security</span><span>By Mayank Parmar</span></div>"#;
        assert_eq!(extractor().extract(html, URL).record.author, "Mayank Parmar");
    }

    #[test]
    fn test_byline_name_stops_before_dateline() {
        assert_eq!(byline_name("By Bill Toulas March 3, 2024").as_deref(), Some("Bill Toulas"));
        assert_eq!(byline_name("by Ax Sharma, Jan. 5").as_deref(), Some("Ax Sharma"));
        assert_eq!(byline_name("Written by O'Neil Smith-Jones").as_deref(), Some("O'Neil Smith-Jones"));
        assert_eq!(byline_name("By March 2024"), None);
        assert_eq!(byline_name("no byline here"), None);
    }

    #[test]
    fn test_body_filters_short_and_related_paragraphs() {
        let html = r#"<div id="bc_article_content">
            <p>Too short here</p>
            <p>Related: Another breach story you might like</p>
            <p>RELATED: shouting cross link spam text</p>
            <p>This paragraph is long enough to keep.</p>
        </div>"#;
        let extraction = extractor().extract(html, URL);
        assert_eq!(extraction.paragraph_count, 1);
        assert_eq!(extraction.body, "This paragraph is long enough to keep.");
    }

    #[test]
    fn test_body_falls_back_to_older_layouts() {
        let old = r#"<div id="bc_article_content_old"><p>The older layout still has text.</p></div>"#;
        assert_eq!(extractor().extract(old, URL).body, "The older layout still has text.");

        let generic = r#"<div id="bc_article_content"><p>tiny</p></div>
                         <article><p>Generic article markup carries the body.</p></article>"#;
        assert_eq!(
            extractor().extract(generic, URL).body,
            "Generic article markup carries the body."
        );
    }

    #[test]
    fn test_paragraph_text_joins_inline_elements() {
        let html = r#"<div id="bc_article_content"><p>The <a href="/x">threat actor</a>
            posted   samples online.</p></div>"#;
        assert_eq!(
            extractor().extract(html, URL).body,
            "The threat actor posted samples online."
        );
    }

    #[test]
    fn test_summary_caps_sentences_and_paragraphs() {
        let paragraphs: String = (1..=8)
            .map(|i| format!("<p>Paragraph number {i} has words. Second sentence {i} here!</p>"))
            .collect();
        let html = format!("<div id=\"bc_article_content\">{paragraphs}</div>");
        let extraction = extractor().extract(&html, URL);

        assert_eq!(
            extraction.record.summary.as_deref(),
            Some("Paragraph number 1 has words. Second sentence 1 here! Paragraph number 2 has words.")
        );
        assert_eq!(extraction.paragraph_count, 8);
        assert!(extraction.body.contains("Paragraph number 8"));
    }

    #[test]
    fn test_summary_truncates_run_on_text() {
        let long = "word ".repeat(200);
        let html = format!("<div id=\"bc_article_content\"><p>{long}</p></div>");
        let summary = extractor().extract(&html, URL).record.summary.unwrap();
        assert!(summary.ends_with("..."));
        assert!(summary.chars().count() <= 403);
    }

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two? Three! Four"),
            vec!["One.", "Two?", "Three!", "Four"]
        );
        assert_eq!(split_sentences("Version 1.2 shipped."), vec!["Version 1.2 shipped."]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = r#"<h1>Same</h1><time>May 5, 2021</time>
            <div id="bc_article_content"><p>Identical input gives identical output.</p></div>"#;
        let first = extractor().extract(html, URL);
        let second = extractor().extract(html, URL);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first.record).unwrap(),
            serde_json::to_string(&second.record).unwrap()
        );
    }

    #[test]
    fn test_invalid_selector_is_a_config_error() {
        let config = ExtractionConfig {
            body_selector: "div[[".to_string(),
            ..ExtractionConfig::default()
        };
        let err = ArticleExtractor::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Selector { .. }));
    }
}
